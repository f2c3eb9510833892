//! Text-to-speech as an alternate audio source
//!
//! [`SynthesisPipeline::speak`] fetches a waveform from the synthesis service,
//! converts it to telephony frames and pushes them onto a session's audio
//! queue, so the agent hears it like caller audio.

pub mod client;
pub mod pipeline;

pub use client::{HttpSynthesizer, SpeechSynthesizer};
pub use pipeline::SynthesisPipeline;
