pub mod codec;
pub mod frame;
pub mod mulaw;
pub mod queue;
pub mod resample;

pub use codec::{synthesize_to_frames, FramedAudio, Frames};
pub use frame::{
    slice_batches, AudioFrame, FRAME_BYTES, INBOUND_BATCH_BYTES, SILENCE_BYTE, TELEPHONY_SAMPLE_RATE,
};
pub use queue::{audio_queue, AudioConsumer, AudioProducer};
