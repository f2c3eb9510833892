use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, error, field, info, info_span, warn, Instrument};

use super::config::SessionConfig;
use super::handle::SessionHandle;
use super::shutdown::shutdown_scope;
use super::state::SessionState;
use super::stats::SessionStats;
use crate::agent::{AgentReceiver, AgentSender};
use crate::audio::{audio_queue, AudioConsumer};
use crate::error::BridgeError;
use crate::telephony::InboundAdapter;
use crate::tools::ToolRegistry;
use crate::transport::{shared_sink, Connection, MessageSource, SharedSink, WireMessage};

/// The three loops that make up a running session.
#[derive(Debug, Clone, Copy)]
enum SessionLoop {
    Inbound,
    AgentSender,
    AgentReceiver,
}

/// One bridged call: a telephony connection, an agent connection and the
/// audio queue between them.
pub struct CallSession {
    config: SessionConfig,
    tools: Arc<ToolRegistry>,
    handle: SessionHandle,
    consumer: AudioConsumer,
}

impl CallSession {
    pub fn new(config: SessionConfig, tools: Arc<ToolRegistry>) -> Self {
        let (producer, consumer) = audio_queue();
        Self {
            config,
            tools,
            handle: SessionHandle::new(producer),
            consumer,
        }
    }

    /// Handle for observing the session and feeding its audio queue while
    /// it runs.
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Bridge the two connections until either side ends the call.
    ///
    /// Sends the agent settings handshake, then runs the inbound adapter,
    /// agent sender and agent receiver concurrently. The first loop to finish
    /// cancels the other two. A normal hang-up on either side returns the
    /// final stats; protocol violations are returned as errors.
    pub async fn run(
        self,
        telephony: Connection,
        agent: Connection,
    ) -> Result<SessionStats, BridgeError> {
        let span = info_span!(
            "session",
            connection_id = %self.handle.connection_id(),
            stream_sid = field::Empty,
        );
        self.run_inner(telephony, agent).instrument(span).await
    }

    async fn run_inner(
        self,
        telephony: Connection,
        agent: Connection,
    ) -> Result<SessionStats, BridgeError> {
        let CallSession {
            config,
            tools,
            handle,
            consumer,
        } = self;

        info!("Starting call session");

        let telephony_sink = shared_sink(telephony.sink);
        let agent_sink = shared_sink(agent.sink);

        let outcome = match send_settings(&agent_sink, &config).await {
            Ok(()) => {
                run_loops(
                    &handle,
                    tools,
                    consumer,
                    telephony.source,
                    agent.source,
                    &telephony_sink,
                    &agent_sink,
                )
                .await
            }
            Err(e) => {
                error!("Failed to send agent settings: {}", e);
                Err(e)
            }
        };

        handle.advance(SessionState::Closed);
        close_sink("telephony", &telephony_sink).await;
        close_sink("agent", &agent_sink).await;

        let stats = handle.stats();
        info!(
            "Call session closed: {} frames ({} bytes) to agent, {} audio messages to caller, {} clears",
            stats.frames_to_agent,
            stats.bytes_to_agent,
            stats.audio_messages_to_caller,
            stats.clears_sent
        );

        match outcome {
            Ok(()) => Ok(stats),
            Err(e) if e.is_transport_closed() => Ok(stats),
            Err(e) => Err(e),
        }
    }
}

async fn send_settings(agent: &SharedSink, config: &SessionConfig) -> Result<(), BridgeError> {
    let settings = serde_json::to_string(&config.agent_settings)
        .map_err(|e| BridgeError::Config(format!("agent settings: {}", e)))?;
    agent.lock().await.send(WireMessage::Text(settings)).await?;
    debug!("Sent agent settings");
    Ok(())
}

async fn run_loops(
    handle: &SessionHandle,
    tools: Arc<ToolRegistry>,
    consumer: AudioConsumer,
    telephony_source: Box<dyn MessageSource>,
    agent_source: Box<dyn MessageSource>,
    telephony_sink: &SharedSink,
    agent_sink: &SharedSink,
) -> Result<(), BridgeError> {
    let (trigger, shutdown) = shutdown_scope();
    let mut loops = JoinSet::new();

    let inbound = InboundAdapter::new(handle.clone());
    let inbound_shutdown = shutdown.clone();
    loops.spawn(
        async move {
            let result = inbound.run(telephony_source, inbound_shutdown).await;
            (SessionLoop::Inbound, result)
        }
        .in_current_span(),
    );

    let sender = AgentSender::new(consumer, Arc::clone(agent_sink), handle.clone());
    let sender_shutdown = shutdown.clone();
    loops.spawn(
        async move {
            let result = sender.run(sender_shutdown).await;
            (SessionLoop::AgentSender, result)
        }
        .in_current_span(),
    );

    let receiver = AgentReceiver::new(handle.clone(), tools);
    let telephony = Arc::clone(telephony_sink);
    let agent = Arc::clone(agent_sink);
    loops.spawn(
        async move {
            let result = receiver.run(agent_source, telephony, agent, shutdown).await;
            (SessionLoop::AgentReceiver, result)
        }
        .in_current_span(),
    );

    // Whichever loop ends first decides the outcome; the rest are cancelled.
    let outcome = match loops.join_next().await {
        Some(Ok((which, result))) => {
            match &result {
                Ok(()) => info!("{:?} finished, ending session", which),
                Err(e) if e.is_transport_closed() => info!("{:?} finished: {}", which, e),
                Err(e) => error!("{:?} failed: {}", which, e),
            }
            result
        }
        Some(Err(e)) => {
            error!("Session loop panicked: {}", e);
            Err(BridgeError::TransportClosed(format!("session loop aborted: {}", e)))
        }
        None => Ok(()),
    };

    trigger.trigger();

    while let Some(joined) = loops.join_next().await {
        match joined {
            Ok((which, Ok(()))) => debug!("{:?} stopped", which),
            Ok((which, Err(e))) => debug!("{:?} stopped during shutdown: {}", which, e),
            Err(e) => warn!("Session loop panicked during shutdown: {}", e),
        }
    }

    outcome
}

async fn close_sink(side: &str, sink: &SharedSink) {
    if let Err(e) = sink.lock().await.close().await {
        debug!("Closing {} connection: {}", side, e);
    }
}
