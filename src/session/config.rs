use serde::{Deserialize, Serialize};

/// Per-session settings handed to each new call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Settings document sent to the agent once, before any audio.
    pub agent_settings: serde_json::Value,
}

impl SessionConfig {
    pub fn new(agent_settings: serde_json::Value) -> Self {
        Self { agent_settings }
    }
}
