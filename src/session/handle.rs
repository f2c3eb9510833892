use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::warn;
use uuid::Uuid;

use super::state::SessionState;
use super::stats::{SessionCounters, SessionStats};
use crate::audio::AudioProducer;

struct Shared {
    connection_id: Uuid,
    started_at: DateTime<Utc>,
    state: watch::Sender<SessionState>,
    stream_sid: watch::Sender<Option<String>>,
    counters: SessionCounters,
    producer: AudioProducer,
}

/// Cloneable view of a running session.
///
/// Carries the stream identifier handoff between the inbound adapter and the
/// agent receiver, the lifecycle state, counters, and a producer for the
/// session's audio queue.
#[derive(Clone)]
pub struct SessionHandle {
    shared: Arc<Shared>,
}

impl SessionHandle {
    pub(crate) fn new(producer: AudioProducer) -> Self {
        let (state, _) = watch::channel(SessionState::Pending);
        let (stream_sid, _) = watch::channel(None);
        Self {
            shared: Arc::new(Shared {
                connection_id: Uuid::new_v4(),
                started_at: Utc::now(),
                state,
                stream_sid,
                counters: SessionCounters::default(),
                producer,
            }),
        }
    }

    pub fn connection_id(&self) -> Uuid {
        self.shared.connection_id
    }

    pub fn stream_sid(&self) -> Option<String> {
        self.shared.stream_sid.borrow().clone()
    }

    /// Wait until the telephony side has announced the stream identifier.
    pub async fn wait_for_stream_sid(&self) -> Option<String> {
        let mut rx = self.shared.stream_sid.subscribe();
        let stream_sid = match rx.wait_for(|sid| sid.is_some()).await {
            Ok(sid) => sid.clone(),
            Err(_) => None,
        };
        stream_sid
    }

    /// Publish the stream identifier. Only the first call has any effect;
    /// returns whether this call was it.
    pub fn publish_stream_sid(&self, stream_sid: String) -> bool {
        self.shared.stream_sid.send_if_modified(|current| {
            if current.is_none() {
                *current = Some(stream_sid);
                true
            } else {
                false
            }
        })
    }

    pub fn state(&self) -> SessionState {
        *self.shared.state.borrow()
    }

    /// Move to `target` if the transition is valid.
    pub fn advance(&self, target: SessionState) -> bool {
        let advanced = self.shared.state.send_if_modified(|current| {
            if current.can_transition_to(target) {
                *current = target;
                true
            } else {
                false
            }
        });
        if !advanced && self.state() != target {
            warn!(
                "Ignoring invalid session state transition: {:?} -> {:?}",
                self.state(),
                target
            );
        }
        advanced
    }

    /// Producer for this session's audio queue.
    pub fn producer(&self) -> AudioProducer {
        self.shared.producer.clone()
    }

    pub fn counters(&self) -> &SessionCounters {
        &self.shared.counters
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats::capture(
            self.shared.connection_id.to_string(),
            self.stream_sid(),
            self.state(),
            self.shared.started_at,
            &self.shared.counters,
        )
    }
}
