//! HTTP and WebSocket surface
//!
//! - GET /twilio - Telephony media stream (WebSocket), one call session each
//! - GET /sessions - Stats for all active calls
//! - GET /sessions/:stream_sid - Stats for one call
//! - POST /sessions/:stream_sid/speak - Synthesize text into a call's audio queue
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use handlers::{run_call, SpeakRequest, SpeakResponse};
pub use routes::create_router;
pub use state::AppState;
