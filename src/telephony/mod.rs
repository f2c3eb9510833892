//! Telephony media-stream leg
//!
//! JSON events over a WebSocket with base64 μ-law audio:
//! - Inbound: `connected`, `start`, `media`, `stop`
//! - Outbound: `media` (audio to the caller), `clear` (flush caller playback)

pub mod inbound;
pub mod messages;

pub use inbound::{InboundAdapter, InboundState};
pub use messages::{MediaFormat, MediaPayload, StreamStart, TelephonyCommand, TelephonyEvent, Track};
