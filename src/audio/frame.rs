use crate::error::BridgeError;

/// Sample rate of the telephony leg (μ-law narrowband).
pub const TELEPHONY_SAMPLE_RATE: u32 = 8000;

/// One 20 ms frame of 8 kHz μ-law audio.
pub const FRAME_BYTES: usize = 160;

/// Inbound call audio is batched 20 frames at a time before it is queued
/// for the agent, to amortize per-message overhead on the agent socket.
pub const INBOUND_BATCH_BYTES: usize = 20 * FRAME_BYTES;

/// μ-law encoding of a zero sample; used to pad short final frames.
pub const SILENCE_BYTE: u8 = 0x7F;

/// Immutable buffer of μ-law audio holding a whole number of 20 ms frames.
///
/// Frames produced by the codec are exactly one frame long; inbound call
/// audio travels as batches of [`INBOUND_BATCH_BYTES`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    data: Vec<u8>,
}

impl AudioFrame {
    /// Wrap an already frame-aligned buffer.
    pub fn new(data: Vec<u8>) -> Result<Self, BridgeError> {
        if data.is_empty() || data.len() % FRAME_BYTES != 0 {
            return Err(BridgeError::ProtocolViolation(format!(
                "audio buffer of {} bytes is not a whole number of {}-byte frames",
                data.len(),
                FRAME_BYTES
            )));
        }
        Ok(Self { data })
    }

    /// Right-pad `data` with [`SILENCE_BYTE`] up to the next frame boundary.
    pub fn padded(mut data: Vec<u8>) -> Self {
        let target = data.len().div_ceil(FRAME_BYTES).max(1) * FRAME_BYTES;
        data.resize(target, SILENCE_BYTE);
        Self { data }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Number of 20 ms frames in this buffer.
    pub fn frame_count(&self) -> usize {
        self.data.len() / FRAME_BYTES
    }

    pub fn duration_ms(&self) -> u64 {
        self.frame_count() as u64 * 20
    }
}

/// Split `buffer` into as many `batch_size` slices as it holds, returning
/// them along with the leftover bytes.
///
/// Panics if `batch_size` is zero.
pub fn slice_batches(mut buffer: Vec<u8>, batch_size: usize) -> (Vec<Vec<u8>>, Vec<u8>) {
    let whole = buffer.len() / batch_size * batch_size;
    let remainder = buffer.split_off(whole);
    let batches = buffer.chunks_exact(batch_size).map(<[u8]>::to_vec).collect();
    (batches, remainder)
}
