use tracing::{debug, info};

use crate::audio::{AudioConsumer, AudioFrame};
use crate::error::BridgeError;
use crate::session::{SessionHandle, Shutdown};
use crate::transport::{SharedSink, WireMessage};

/// Drains the session's audio queue into the agent connection.
pub struct AgentSender {
    consumer: AudioConsumer,
    agent: SharedSink,
    session: SessionHandle,
}

impl AgentSender {
    pub fn new(consumer: AudioConsumer, agent: SharedSink, session: SessionHandle) -> Self {
        Self {
            consumer,
            agent,
            session,
        }
    }

    /// Forward frames in queue order until shutdown.
    ///
    /// On shutdown the queue is closed to new frames and whatever was already
    /// queued is still forwarded. A send failure ends the loop with an error.
    pub async fn run(mut self, mut shutdown: Shutdown) -> Result<(), BridgeError> {
        info!("Agent sender started");

        loop {
            let frame = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                frame = self.consumer.pop() => frame,
            };
            match frame {
                Some(frame) => self.forward(frame).await?,
                None => break,
            }
        }

        self.consumer.close();
        let pending = self.consumer.len();
        if pending > 0 {
            debug!("Forwarding {} queued frames before shutdown", pending);
        }
        while let Some(frame) = self.consumer.try_pop() {
            self.forward(frame).await?;
        }

        info!("Agent sender stopped");
        Ok(())
    }

    async fn forward(&self, frame: AudioFrame) -> Result<(), BridgeError> {
        let bytes = frame.as_bytes().len();
        self.agent
            .lock()
            .await
            .send(WireMessage::Binary(frame.into_bytes()))
            .await?;
        self.session.counters().record_frame_to_agent(bytes);
        Ok(())
    }
}
