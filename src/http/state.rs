use crate::agent::AgentDialer;
use crate::session::{SessionConfig, SessionHandle};
use crate::synthesis::SynthesisPipeline;
use crate::tools::ToolRegistry;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Active calls (stream_sid → session)
    pub sessions: Arc<RwLock<HashMap<String, SessionHandle>>>,

    /// Opens the agent leg for each new call
    pub dialer: Arc<dyn AgentDialer>,

    /// Text-to-speech into a call's audio queue
    pub synthesis: Arc<SynthesisPipeline>,

    /// Tools the agent may call
    pub tools: Arc<ToolRegistry>,

    pub session_config: SessionConfig,
}

impl AppState {
    pub fn new(
        dialer: Arc<dyn AgentDialer>,
        synthesis: Arc<SynthesisPipeline>,
        tools: Arc<ToolRegistry>,
        session_config: SessionConfig,
    ) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            dialer,
            synthesis,
            tools,
            session_config,
        }
    }
}
