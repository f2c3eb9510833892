use std::collections::HashMap;

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::BridgeError;
use crate::transport::WireMessage;

/// Event received from the telephony provider.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TelephonyEvent {
    Connected {
        #[serde(default)]
        protocol: Option<String>,
    },
    Start {
        start: StreamStart,
    },
    Media {
        media: MediaPayload,
    },
    Stop {
        #[serde(default)]
        stop: Option<serde_json::Value>,
    },
    /// `mark`, `dtmf` and anything newer
    #[serde(other)]
    Other,
}

impl TelephonyEvent {
    /// Decode one transport message.
    pub fn parse(message: &WireMessage) -> Result<Self, BridgeError> {
        let event = match message {
            WireMessage::Text(text) => serde_json::from_str(text),
            WireMessage::Binary(data) => serde_json::from_slice(data),
        };
        event.map_err(|e| BridgeError::ProtocolViolation(format!("bad telephony event: {}", e)))
    }
}

/// Payload of the `start` event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamStart {
    pub stream_sid: String,
    #[serde(default)]
    pub call_sid: Option<String>,
    #[serde(default)]
    pub account_sid: Option<String>,
    #[serde(default)]
    pub tracks: Vec<String>,
    #[serde(default)]
    pub media_format: Option<MediaFormat>,
    #[serde(default)]
    pub custom_parameters: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaFormat {
    pub encoding: String,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Direction of a `media` event's audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Track {
    Inbound,
    Outbound,
    #[serde(other)]
    Unknown,
}

/// Payload of the `media` event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MediaPayload {
    pub track: Track,
    /// Base64-encoded μ-law audio
    pub payload: String,
    #[serde(default)]
    pub chunk: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl MediaPayload {
    pub fn decode_audio(&self) -> Result<Vec<u8>, BridgeError> {
        base64::engine::general_purpose::STANDARD
            .decode(&self.payload)
            .map_err(|e| BridgeError::ProtocolViolation(format!("bad media payload: {}", e)))
    }
}

/// Command sent to the telephony provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TelephonyCommand {
    Media {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        media: OutboundMedia,
    },
    Clear {
        #[serde(rename = "streamSid")]
        stream_sid: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMedia {
    /// Base64-encoded μ-law audio
    pub payload: String,
}

impl TelephonyCommand {
    /// Play `audio` to the caller.
    pub fn media(stream_sid: &str, audio: &[u8]) -> Self {
        TelephonyCommand::Media {
            stream_sid: stream_sid.to_string(),
            media: OutboundMedia {
                payload: base64::engine::general_purpose::STANDARD.encode(audio),
            },
        }
    }

    /// Discard whatever the caller still has buffered for playback.
    pub fn clear(stream_sid: &str) -> Self {
        TelephonyCommand::Clear {
            stream_sid: stream_sid.to_string(),
        }
    }

    pub fn to_wire(&self) -> Result<WireMessage, BridgeError> {
        Ok(WireMessage::Text(serde_json::to_string(self)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(json: &str) -> WireMessage {
        WireMessage::Text(json.to_string())
    }

    #[test]
    fn test_parse_start() {
        let event = TelephonyEvent::parse(&text(
            r#"{
                "event": "start",
                "sequenceNumber": "1",
                "start": {
                    "accountSid": "AC123",
                    "streamSid": "MZ456",
                    "callSid": "CA789",
                    "tracks": ["inbound"],
                    "mediaFormat": {"encoding": "audio/x-mulaw", "sampleRate": 8000, "channels": 1},
                    "customParameters": {"caller": "test"}
                },
                "streamSid": "MZ456"
            }"#,
        ))
        .unwrap();

        match event {
            TelephonyEvent::Start { start } => {
                assert_eq!(start.stream_sid, "MZ456");
                assert_eq!(start.call_sid.as_deref(), Some("CA789"));
                assert_eq!(start.media_format.unwrap().sample_rate, 8000);
                assert_eq!(start.custom_parameters["caller"], "test");
            }
            other => panic!("expected start, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_media() {
        let event = TelephonyEvent::parse(&text(
            r#"{"event":"media","sequenceNumber":"3","media":{"track":"inbound","chunk":"1","timestamp":"5","payload":"AAEC"},"streamSid":"MZ456"}"#,
        ))
        .unwrap();

        match event {
            TelephonyEvent::Media { media } => {
                assert_eq!(media.track, Track::Inbound);
                assert_eq!(media.decode_audio().unwrap(), vec![0, 1, 2]);
            }
            other => panic!("expected media, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_connected_stop_and_unknown() {
        assert!(matches!(
            TelephonyEvent::parse(&text(r#"{"event":"connected","protocol":"Call","version":"1.0.0"}"#)),
            Ok(TelephonyEvent::Connected { .. })
        ));
        assert!(matches!(
            TelephonyEvent::parse(&text(r#"{"event":"stop","stop":{"callSid":"CA789"}}"#)),
            Ok(TelephonyEvent::Stop { .. })
        ));
        assert_eq!(
            TelephonyEvent::parse(&text(r#"{"event":"mark","mark":{"name":"m1"}}"#)).unwrap(),
            TelephonyEvent::Other
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(TelephonyEvent::parse(&text("not json")).is_err());
        assert!(TelephonyEvent::parse(&text(r#"{"media":{}}"#)).is_err());
        assert!(TelephonyEvent::parse(&text(r#"{"event":"start"}"#)).is_err());
    }

    #[test]
    fn test_bad_base64_is_protocol_violation() {
        let media = MediaPayload {
            track: Track::Inbound,
            payload: "***".to_string(),
            chunk: None,
            timestamp: None,
        };
        assert!(matches!(
            media.decode_audio(),
            Err(BridgeError::ProtocolViolation(_))
        ));
    }

    #[test]
    fn test_media_command_wire_format() {
        let wire = TelephonyCommand::media("MZ456", &[0xFF, 0x7F]).to_wire().unwrap();
        let WireMessage::Text(json) = wire else {
            panic!("commands are text messages");
        };
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["event"], "media");
        assert_eq!(value["streamSid"], "MZ456");
        assert_eq!(value["media"]["payload"], "/38=");
    }

    #[test]
    fn test_clear_command_wire_format() {
        let wire = TelephonyCommand::clear("MZ456").to_wire().unwrap();
        assert_eq!(
            wire,
            WireMessage::Text(r#"{"event":"clear","streamSid":"MZ456"}"#.to_string())
        );
    }
}
