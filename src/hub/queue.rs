//! Per-subscriber frame queue
//!
//! A bounded FIFO with a single consumer. The backlog check and the push
//! happen under the same lock, so a frame is either queued or dropped in
//! one step.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::frame::Frame;

/// Outcome of offering a frame to a queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    /// Frame was appended
    Queued,
    /// Backlog at or above the watermark; frame discarded for this subscriber
    Dropped,
    /// Queue no longer accepts frames
    Closed,
}

/// Bounded frame queue for one subscriber
#[derive(Debug)]
pub struct FrameQueue {
    frames: Mutex<VecDeque<Frame>>,
    /// Hard bound on queued frames
    capacity: usize,
    /// Backlog at which new frames are dropped
    watermark: usize,
    closed: AtomicBool,
    notify: Notify,
}

impl FrameQueue {
    /// Create a queue; `watermark` is clamped to `capacity`
    pub fn new(capacity: usize, watermark: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            frames: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            watermark: watermark.clamp(1, capacity),
            closed: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    /// Append `frame` unless the backlog has reached the watermark
    ///
    /// Never blocks on the consumer.
    pub fn offer(&self, frame: Frame) -> Offer {
        if self.is_closed() {
            return Offer::Closed;
        }

        {
            let mut frames = self.frames.lock();
            if frames.len() >= self.watermark {
                return Offer::Dropped;
            }
            frames.push_back(frame);
        }

        self.notify.notify_one();
        Offer::Queued
    }

    /// Wait for the next frame
    ///
    /// After `close`, frames already queued are still returned; `None`
    /// means the queue is closed and empty.
    pub async fn recv(&self) -> Option<Frame> {
        loop {
            {
                let mut frames = self.frames.lock();
                if let Some(frame) = frames.pop_front() {
                    return Some(frame);
                }
                if self.is_closed() {
                    return None;
                }
            }
            // notify_one stores a permit if nobody is waiting yet, so a push
            // between the check above and this await is not lost
            self.notify.notified().await;
        }
    }

    /// Take the next frame without waiting
    pub fn try_recv(&self) -> Option<Frame> {
        self.frames.lock().pop_front()
    }

    /// Stop accepting frames and wake the consumer
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.notify.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Number of frames waiting
    pub fn len(&self) -> usize {
        self.frames.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn watermark(&self) -> usize {
        self.watermark
    }
}
