use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::SessionState;

/// Live counters updated by the session loops.
#[derive(Debug, Default)]
pub struct SessionCounters {
    frames_to_agent: AtomicU64,
    bytes_to_agent: AtomicU64,
    audio_messages_to_caller: AtomicU64,
    clears_sent: AtomicU64,
    tool_calls: AtomicU64,
}

impl SessionCounters {
    pub fn record_frame_to_agent(&self, bytes: usize) {
        self.frames_to_agent.fetch_add(1, Ordering::Relaxed);
        self.bytes_to_agent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_audio_to_caller(&self) {
        self.audio_messages_to_caller.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_clear(&self) {
        self.clears_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tool_call(&self) {
        self.tool_calls.fetch_add(1, Ordering::Relaxed);
    }
}

/// Snapshot of a call session, as reported over HTTP.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Local identifier of the telephony connection
    pub connection_id: String,

    /// Stream identifier assigned by the telephony provider, once known
    pub stream_sid: Option<String>,

    pub state: SessionState,

    /// When the telephony connection was accepted
    pub started_at: DateTime<Utc>,

    /// Seconds since `started_at`
    pub duration_secs: f64,

    /// Queue items forwarded to the agent
    pub frames_to_agent: u64,

    /// Audio bytes forwarded to the agent
    pub bytes_to_agent: u64,

    /// Agent audio messages relayed to the caller
    pub audio_messages_to_caller: u64,

    /// Barge-in `clear` commands sent to the caller
    pub clears_sent: u64,

    /// Client-side tool calls executed for the agent
    pub tool_calls: u64,
}

impl SessionStats {
    pub(crate) fn capture(
        connection_id: String,
        stream_sid: Option<String>,
        state: SessionState,
        started_at: DateTime<Utc>,
        counters: &SessionCounters,
    ) -> Self {
        let duration = Utc::now().signed_duration_since(started_at);
        Self {
            connection_id,
            stream_sid,
            state,
            started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            frames_to_agent: counters.frames_to_agent.load(Ordering::Relaxed),
            bytes_to_agent: counters.bytes_to_agent.load(Ordering::Relaxed),
            audio_messages_to_caller: counters.audio_messages_to_caller.load(Ordering::Relaxed),
            clears_sent: counters.clears_sent.load(Ordering::Relaxed),
            tool_calls: counters.tool_calls.load(Ordering::Relaxed),
        }
    }
}
