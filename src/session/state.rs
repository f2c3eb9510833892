use serde::{Deserialize, Serialize};

/// Lifecycle state of a call session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Connections are up, waiting for the telephony `start` event.
    Pending,
    /// Stream identifier known, audio is flowing.
    Active,
    /// Both connections are torn down. Terminal.
    Closed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        self == SessionState::Closed
    }

    /// Valid transitions: Pending -> Active, Pending -> Closed, Active -> Closed.
    pub fn can_transition_to(self, target: SessionState) -> bool {
        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, target),
            (SessionState::Pending, SessionState::Active)
                | (SessionState::Pending, SessionState::Closed)
                | (SessionState::Active, SessionState::Closed)
        )
    }
}
