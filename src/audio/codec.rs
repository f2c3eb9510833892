use std::io::Cursor;
use std::slice::Chunks;
use std::sync::Arc;

use hound::{SampleFormat, WavReader};
use tracing::debug;

use super::frame::{AudioFrame, FRAME_BYTES, TELEPHONY_SAMPLE_RATE};
use super::{mulaw, resample};
use crate::error::BridgeError;

/// Speech converted to the telephony sample rate, ready to be cut into frames.
///
/// Holds 8 kHz mono PCM; μ-law encoding happens lazily as [`Frames`] is
/// iterated, so a long utterance can be streamed onto the audio queue without
/// materializing every frame. Cloning is cheap and `frames()` can be called
/// any number of times.
#[derive(Debug, Clone)]
pub struct FramedAudio {
    samples: Arc<[i16]>,
}

impl FramedAudio {
    /// Build from PCM already at 8 kHz mono.
    pub fn from_telephony_pcm(samples: Vec<i16>) -> Self {
        Self {
            samples: samples.into(),
        }
    }

    /// Iterate the audio as 160-byte μ-law frames, padding the last one.
    pub fn frames(&self) -> Frames<'_> {
        Frames {
            chunks: self.samples.chunks(FRAME_BYTES),
        }
    }

    pub fn frame_count(&self) -> usize {
        self.samples.len().div_ceil(FRAME_BYTES)
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn duration_ms(&self) -> u64 {
        self.samples.len() as u64 * 1000 / TELEPHONY_SAMPLE_RATE as u64
    }
}

/// Lazy iterator of telephony frames over a [`FramedAudio`].
pub struct Frames<'a> {
    chunks: Chunks<'a, i16>,
}

impl Iterator for Frames<'_> {
    type Item = AudioFrame;

    fn next(&mut self) -> Option<AudioFrame> {
        self.chunks
            .next()
            .map(|chunk| AudioFrame::padded(mulaw::encode(chunk)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.chunks.size_hint()
    }
}

impl ExactSizeIterator for Frames<'_> {}

/// Convert a synthesized WAV waveform into telephony frames.
///
/// The waveform must be 16-bit signed PCM. Multi-channel audio is averaged
/// down to mono and any sample rate other than 8 kHz is linearly resampled.
pub fn synthesize_to_frames(waveform: &[u8]) -> Result<FramedAudio, BridgeError> {
    let reader = WavReader::new(Cursor::new(waveform))
        .map_err(|e| BridgeError::UnsupportedFormat(format!("invalid WAV container: {}", e)))?;

    let spec = reader.spec();
    if spec.sample_format != SampleFormat::Int || spec.bits_per_sample != 16 {
        return Err(BridgeError::UnsupportedFormat(format!(
            "expected 16-bit signed PCM, got {}-bit {:?}",
            spec.bits_per_sample, spec.sample_format
        )));
    }
    if spec.sample_rate == 0 || spec.channels == 0 {
        return Err(BridgeError::UnsupportedFormat(format!(
            "invalid stream parameters: {}Hz, {} channels",
            spec.sample_rate, spec.channels
        )));
    }

    let samples: Vec<i16> = reader
        .into_samples::<i16>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| BridgeError::UnsupportedFormat(format!("failed to read samples: {}", e)))?;

    let mono = resample::downmix(&samples, spec.channels);
    let pcm = resample::resample_linear(&mono, spec.sample_rate, TELEPHONY_SAMPLE_RATE);

    debug!(
        "Converted waveform: {}Hz {}ch, {} samples -> {} samples at {}Hz",
        spec.sample_rate,
        spec.channels,
        samples.len(),
        pcm.len(),
        TELEPHONY_SAMPLE_RATE
    );

    Ok(FramedAudio::from_telephony_pcm(pcm))
}
