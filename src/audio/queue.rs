use tokio::sync::mpsc;

use super::frame::AudioFrame;
use crate::error::BridgeError;

/// Create a session's audio queue: an unbounded FIFO with any number of
/// producers and exactly one consumer.
pub fn audio_queue() -> (AudioProducer, AudioConsumer) {
    let (tx, rx) = mpsc::unbounded_channel();
    (AudioProducer { tx }, AudioConsumer { rx })
}

/// Push side of the audio queue. Clone it to add another producer.
#[derive(Debug, Clone)]
pub struct AudioProducer {
    tx: mpsc::UnboundedSender<AudioFrame>,
}

impl AudioProducer {
    /// Append a frame. Fails once the consumer has closed the queue.
    pub fn push(&self, frame: AudioFrame) -> Result<(), BridgeError> {
        self.tx
            .send(frame)
            .map_err(|_| BridgeError::TransportClosed("audio queue closed".to_string()))
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Pop side of the audio queue, owned by the agent sender.
#[derive(Debug)]
pub struct AudioConsumer {
    rx: mpsc::UnboundedReceiver<AudioFrame>,
}

impl AudioConsumer {
    /// Wait for the next frame. Cancel-safe: dropping the future never loses
    /// a frame. Returns `None` once the queue is closed and drained.
    pub async fn pop(&mut self) -> Option<AudioFrame> {
        self.rx.recv().await
    }

    /// Take the next frame if one is already queued.
    pub fn try_pop(&mut self) -> Option<AudioFrame> {
        self.rx.try_recv().ok()
    }

    /// Reject further pushes. Frames already queued can still be popped.
    pub fn close(&mut self) {
        self.rx.close();
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
