use tracing::{debug, info, warn, Span};

use super::messages::{TelephonyEvent, Track};
use crate::audio::{slice_batches, AudioFrame, INBOUND_BATCH_BYTES};
use crate::error::BridgeError;
use crate::session::{SessionHandle, SessionState, Shutdown};
use crate::transport::MessageSource;

/// Where the inbound adapter is in the telephony stream lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundState {
    WaitingForStart,
    Streaming,
    Stopped,
}

/// Consumes telephony events, batches inbound call audio onto the session's
/// audio queue and announces the stream identifier.
///
/// Audio is queued in [`INBOUND_BATCH_BYTES`] slices. Whatever is left in the
/// accumulator when the stream stops is dropped.
pub struct InboundAdapter {
    state: InboundState,
    buffer: Vec<u8>,
    session: SessionHandle,
}

impl InboundAdapter {
    pub fn new(session: SessionHandle) -> Self {
        Self {
            state: InboundState::WaitingForStart,
            buffer: Vec::with_capacity(INBOUND_BATCH_BYTES),
            session,
        }
    }

    pub fn state(&self) -> InboundState {
        self.state
    }

    /// Bytes accumulated but not yet queued.
    pub fn pending_bytes(&self) -> usize {
        self.buffer.len()
    }

    /// Apply one telephony event.
    pub fn handle_event(&mut self, event: TelephonyEvent) -> Result<InboundState, BridgeError> {
        match event {
            TelephonyEvent::Connected { protocol } => {
                debug!("Telephony connected (protocol: {:?})", protocol);
            }

            TelephonyEvent::Start { start } => {
                if self.state != InboundState::WaitingForStart {
                    warn!("Ignoring repeated start event for {}", start.stream_sid);
                    return Ok(self.state);
                }
                info!(
                    "Telephony stream started: {} (call: {:?})",
                    start.stream_sid, start.call_sid
                );
                Span::current().record("stream_sid", start.stream_sid.as_str());
                self.session.publish_stream_sid(start.stream_sid);
                self.session.advance(SessionState::Active);
                self.state = InboundState::Streaming;
            }

            TelephonyEvent::Media { media } => {
                let audio = media.decode_audio()?;
                if media.track == Track::Inbound {
                    self.buffer.extend_from_slice(&audio);
                }
            }

            TelephonyEvent::Stop { .. } => {
                if !self.buffer.is_empty() {
                    debug!("Dropping {} bytes of partial inbound audio", self.buffer.len());
                    self.buffer.clear();
                }
                info!("Telephony stream stopped");
                self.state = InboundState::Stopped;
                return Ok(self.state);
            }

            TelephonyEvent::Other => {}
        }

        self.flush_batches()?;
        Ok(self.state)
    }

    fn flush_batches(&mut self) -> Result<(), BridgeError> {
        if self.buffer.len() < INBOUND_BATCH_BYTES {
            return Ok(());
        }

        let (batches, remainder) = slice_batches(std::mem::take(&mut self.buffer), INBOUND_BATCH_BYTES);
        self.buffer = remainder;

        let producer = self.session.producer();
        for batch in batches {
            producer.push(AudioFrame::new(batch)?)?;
        }
        Ok(())
    }

    /// Read telephony events until `stop`, a decode failure, the stream
    /// closing, or session shutdown.
    pub async fn run(
        mut self,
        mut source: Box<dyn MessageSource>,
        mut shutdown: Shutdown,
    ) -> Result<(), BridgeError> {
        info!("Inbound adapter started");

        let result = loop {
            let message = tokio::select! {
                _ = shutdown.cancelled() => break Ok(()),
                message = source.recv() => message,
            };

            let Some(message) = message else {
                break Err(BridgeError::TransportClosed(
                    "telephony stream ended".to_string(),
                ));
            };

            let event = message.and_then(|m| TelephonyEvent::parse(&m));
            match event.and_then(|e| self.handle_event(e)) {
                Ok(InboundState::Stopped) => break Ok(()),
                Ok(_) => {}
                Err(e) => break Err(e),
            }
        };

        self.state = InboundState::Stopped;
        info!("Inbound adapter stopped");
        result
    }
}
