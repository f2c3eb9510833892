use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::BridgeError;
use crate::transport::WireMessage;

/// A message received from the agent.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentMessage {
    /// μ-law audio to play to the caller
    AudioPayload(Vec<u8>),
    Control(ControlEvent),
}

impl AgentMessage {
    /// Classify a transport message. Text that is not a valid control
    /// message is a protocol violation.
    pub fn decode(message: WireMessage) -> Result<Self, BridgeError> {
        match message {
            WireMessage::Binary(audio) => Ok(AgentMessage::AudioPayload(audio)),
            WireMessage::Text(text) => serde_json::from_str(&text)
                .map(AgentMessage::Control)
                .map_err(|e| {
                    BridgeError::ProtocolViolation(format!("bad agent control message: {}", e))
                }),
        }
    }
}

/// Control event sent by the agent, discriminated by `type`.
///
/// Fields the bridge only logs are kept as raw JSON so an unexpected value
/// shape never ends a call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ControlEvent {
    Welcome {
        #[serde(default)]
        request_id: Option<Value>,
    },
    SettingsApplied,
    ConversationText {
        #[serde(default)]
        role: Option<Value>,
        #[serde(default)]
        content: Option<Value>,
    },
    /// Barge-in: the caller started talking over the agent
    UserStartedSpeaking,
    AgentThinking {
        #[serde(default)]
        content: Option<Value>,
    },
    AgentStartedSpeaking {
        #[serde(default)]
        total_latency: Option<Value>,
    },
    AgentAudioDone,
    FunctionCallRequest {
        #[serde(default)]
        functions: Vec<FunctionCall>,
    },
    Error {
        #[serde(default)]
        description: Option<Value>,
        #[serde(default)]
        code: Option<Value>,
    },
    Warning {
        #[serde(default)]
        description: Option<Value>,
        #[serde(default)]
        code: Option<Value>,
    },
    #[serde(other)]
    Other,
}

/// One function the agent wants called.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub id: String,
    pub name: String,
    /// JSON-encoded arguments
    #[serde(default)]
    pub arguments: String,
    /// Only client-side calls are executed by the bridge
    #[serde(default)]
    pub client_side: bool,
}

/// Message the bridge sends to the agent (besides audio and the settings
/// handshake).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AgentCommand {
    FunctionCallResponse {
        id: String,
        name: String,
        content: String,
    },
}

impl AgentCommand {
    pub fn to_wire(&self) -> Result<WireMessage, BridgeError> {
        Ok(WireMessage::Text(serde_json::to_string(self)?))
    }
}
