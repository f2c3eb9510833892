//! Message-level transport abstraction
//!
//! Both legs of a call are message streams carrying either text (JSON control
//! traffic) or binary payloads. The bridge only ever sees [`WireMessage`]s:
//! - [`websocket`]: telephony leg (axum) and agent leg (tokio-tungstenite)
//! - [`channel`]: in-memory pair for tests and local wiring

pub mod channel;
pub mod websocket;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::BridgeError;

/// A single message on either transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireMessage {
    Text(String),
    Binary(Vec<u8>),
}

/// Outgoing half of a connection.
#[async_trait]
pub trait MessageSink: Send {
    async fn send(&mut self, message: WireMessage) -> Result<(), BridgeError>;

    /// Close the connection. Closing twice is not an error.
    async fn close(&mut self) -> Result<(), BridgeError>;
}

/// Incoming half of a connection.
#[async_trait]
pub trait MessageSource: Send {
    /// Next message, or `None` once the peer has closed the stream.
    ///
    /// Implementations must be cancel-safe: the session drops this future on
    /// teardown and must not lose a message by doing so.
    async fn recv(&mut self) -> Option<Result<WireMessage, BridgeError>>;
}

/// Both halves of one live connection.
pub struct Connection {
    pub sink: Box<dyn MessageSink>,
    pub source: Box<dyn MessageSource>,
}

impl Connection {
    pub fn new(sink: Box<dyn MessageSink>, source: Box<dyn MessageSource>) -> Self {
        Self { sink, source }
    }
}

/// Sink shared between tasks that write to the same connection.
pub type SharedSink = Arc<Mutex<Box<dyn MessageSink>>>;

pub fn shared_sink(sink: Box<dyn MessageSink>) -> SharedSink {
    Arc::new(Mutex::new(sink))
}
