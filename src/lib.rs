pub mod agent;
pub mod audio;
pub mod config;
pub mod error;
pub mod http;
pub mod session;
pub mod synthesis;
pub mod telephony;
pub mod tools;
pub mod transport;

pub use agent::{AgentDialer, AgentMessage, ControlEvent, WebSocketDialer};
pub use audio::{synthesize_to_frames, AudioFrame, FramedAudio, FRAME_BYTES, SILENCE_BYTE};
pub use config::Config;
pub use error::BridgeError;
pub use http::{create_router, AppState};
pub use session::{CallSession, SessionConfig, SessionHandle, SessionState, SessionStats};
pub use synthesis::{HttpSynthesizer, SpeechSynthesizer, SynthesisPipeline};
pub use telephony::{TelephonyCommand, TelephonyEvent};
pub use tools::{FnTool, Tool, ToolError, ToolRegistry};
pub use transport::{Connection, WireMessage};
