use std::sync::Arc;

use tracing::info;

use super::client::SpeechSynthesizer;
use crate::audio::{synthesize_to_frames, AudioProducer};
use crate::error::BridgeError;

/// Speaks text into a session's audio queue.
pub struct SynthesisPipeline {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    default_model: String,
}

impl SynthesisPipeline {
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>, default_model: impl Into<String>) -> Self {
        Self {
            synthesizer,
            default_model: default_model.into(),
        }
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Synthesize `text` and queue the resulting frames in order. Returns the
    /// number of frames queued.
    ///
    /// Frames queued before a failure stay queued.
    pub async fn speak(
        &self,
        text: &str,
        voice_model: Option<&str>,
        queue: &AudioProducer,
    ) -> Result<usize, BridgeError> {
        if text.trim().is_empty() {
            return Err(BridgeError::SynthesisFailed("nothing to say".to_string()));
        }
        let model = voice_model.unwrap_or(&self.default_model);

        let waveform = self.synthesizer.synthesize(text, model).await?;
        let audio = synthesize_to_frames(&waveform)?;

        let mut queued = 0;
        for frame in audio.frames() {
            queue.push(frame)?;
            queued += 1;
        }

        info!(
            "Queued {} synthesized frames ({} ms, model {})",
            queued,
            audio.duration_ms(),
            model
        );
        Ok(queued)
    }
}
