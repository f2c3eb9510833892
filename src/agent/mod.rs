//! Speech-to-speech agent leg
//!
//! The agent endpoint speaks a persistent WebSocket: JSON control messages
//! keyed by `type`, and binary μ-law audio in both directions.

pub mod connector;
pub mod control;
pub mod messages;
pub mod receiver;
pub mod sender;

pub use connector::{AgentDialer, WebSocketDialer};
pub use control::ControlEventHandler;
pub use messages::{AgentCommand, AgentMessage, ControlEvent, FunctionCall};
pub use receiver::AgentReceiver;
pub use sender::AgentSender;
