use thiserror::Error;

/// Errors raised while bridging a call.
///
/// `TransportClosed` marks an ordinary teardown (either side hung up). The
/// other variants are faults: a protocol violation ends the session, while
/// codec and synthesis failures only fail the `speak` call that hit them.
#[derive(Error, Debug, Clone)]
pub enum BridgeError {
    #[error("transport closed: {0}")]
    TransportClosed(String),

    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("unsupported audio format: {0}")]
    UnsupportedFormat(String),

    #[error("synthesis failed: {0}")]
    SynthesisFailed(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl BridgeError {
    /// Whether this error is a normal end of a connection rather than a fault.
    pub fn is_transport_closed(&self) -> bool {
        matches!(self, BridgeError::TransportClosed(_))
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::ProtocolViolation(err.to_string())
    }
}
