//! Call session management
//!
//! One [`CallSession`] per bridged call. It owns:
//! - The audio queue between the inbound adapter and the agent sender
//! - Both transport connections
//! - The stream identifier handoff and lifecycle state
//! - Session statistics

mod config;
mod handle;
mod session;
mod shutdown;
mod state;
mod stats;

pub use config::SessionConfig;
pub use handle::SessionHandle;
pub use session::CallSession;
pub use shutdown::{shutdown_scope, Shutdown, ShutdownTrigger};
pub use state::SessionState;
pub use stats::{SessionCounters, SessionStats};
