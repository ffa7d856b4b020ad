//! Unbounded FIFO of motion samples between the interrupt context and the main loop
//!
//! The producer side is synchronous and never blocks, so it can be called
//! from the GPIO interrupt thread. The consumer side suspends the calling
//! task until a sample arrives.

use super::level::MotionSample;
use tokio::sync::mpsc;
use tracing::warn;

/// Constructor for a connected producer/consumer pair
pub struct EventQueue;

impl EventQueue {
    pub fn channel() -> (QueueProducer, QueueConsumer) {
        let (tx, rx) = mpsc::unbounded_channel();
        (QueueProducer { tx }, QueueConsumer { rx })
    }
}

/// Interrupt-side handle; cheap to clone for multiple producers
#[derive(Debug, Clone)]
pub struct QueueProducer {
    tx: mpsc::UnboundedSender<MotionSample>,
}

impl QueueProducer {
    /// Enqueue a sample. Never blocks and never fails back to the caller.
    pub fn push(&self, sample: MotionSample) {
        if self.tx.send(sample).is_err() {
            warn!(level = %sample.level(), "Motion queue consumer gone, sample dropped");
        }
    }
}

/// Application-side handle; there is exactly one consumer
#[derive(Debug)]
pub struct QueueConsumer {
    rx: mpsc::UnboundedReceiver<MotionSample>,
}

impl QueueConsumer {
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Dequeue without waiting
    pub fn try_pop(&mut self) -> Option<MotionSample> {
        self.rx.try_recv().ok()
    }

    /// Wait until a sample is available and dequeue it.
    ///
    /// Returns `None` only once every producer has been dropped and the
    /// queue is drained.
    pub async fn pop_blocking(&mut self) -> Option<MotionSample> {
        self.rx.recv().await
    }
}
