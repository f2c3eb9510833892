use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{debug, info};

use super::control::ControlEventHandler;
use super::messages::AgentMessage;
use crate::error::BridgeError;
use crate::session::{SessionHandle, Shutdown};
use crate::telephony::TelephonyCommand;
use crate::tools::ToolRegistry;
use crate::transport::{MessageSource, SharedSink, WireMessage};

/// Routes agent traffic: audio to the caller, control events to the
/// [`ControlEventHandler`].
pub struct AgentReceiver {
    session: SessionHandle,
    tools: Arc<ToolRegistry>,
}

impl AgentReceiver {
    pub fn new(session: SessionHandle, tools: Arc<ToolRegistry>) -> Self {
        Self { session, tools }
    }

    /// Nothing is routed until the stream identifier is known. Messages the
    /// agent sends before then are held and routed in order afterwards; the
    /// agent closing its stream in that window still ends the session.
    pub async fn run(
        self,
        mut source: Box<dyn MessageSource>,
        telephony: SharedSink,
        agent: SharedSink,
        mut shutdown: Shutdown,
    ) -> Result<(), BridgeError> {
        info!("Agent receiver started");

        let mut early = VecDeque::new();
        let stream_sid = loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Agent receiver stopped before stream start");
                    return Ok(());
                }
                sid = self.session.wait_for_stream_sid() => match sid {
                    Some(sid) => break sid,
                    None => return Ok(()),
                },
                message = source.recv() => match message {
                    Some(Ok(message)) => early.push_back(message),
                    Some(Err(e)) => return Err(e),
                    None => {
                        return Err(BridgeError::TransportClosed(
                            "agent stream ended before stream start".to_string(),
                        ))
                    }
                },
            }
        };
        debug!(
            "Agent receiver routing for stream {} ({} held messages)",
            stream_sid,
            early.len()
        );

        let handler = ControlEventHandler::new(
            stream_sid.clone(),
            self.session.clone(),
            Arc::clone(&self.tools),
        );

        while let Some(message) = early.pop_front() {
            self.route(message, &stream_sid, &handler, &telephony, &agent)
                .await?;
        }

        let result = loop {
            let message = tokio::select! {
                _ = shutdown.cancelled() => break Ok(()),
                message = source.recv() => message,
            };

            let Some(message) = message else {
                break Err(BridgeError::TransportClosed("agent stream ended".to_string()));
            };

            let routed = match message {
                Ok(message) => {
                    self.route(message, &stream_sid, &handler, &telephony, &agent)
                        .await
                }
                Err(e) => Err(e),
            };
            if let Err(e) = routed {
                break Err(e);
            }
        };

        info!("Agent receiver stopped");
        result
    }

    async fn route(
        &self,
        message: WireMessage,
        stream_sid: &str,
        handler: &ControlEventHandler,
        telephony: &SharedSink,
        agent: &SharedSink,
    ) -> Result<(), BridgeError> {
        match AgentMessage::decode(message)? {
            AgentMessage::AudioPayload(audio) => {
                self.relay_audio(stream_sid, &audio, telephony).await
            }
            AgentMessage::Control(event) => handler.handle(event, telephony, agent).await,
        }
    }

    async fn relay_audio(
        &self,
        stream_sid: &str,
        audio: &[u8],
        telephony: &SharedSink,
    ) -> Result<(), BridgeError> {
        let media = TelephonyCommand::media(stream_sid, audio).to_wire()?;
        telephony.lock().await.send(media).await?;
        self.session.counters().record_audio_to_caller();
        Ok(())
    }
}
