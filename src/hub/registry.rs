//! Frame hub and subscriber registry
//!
//! The registry maps subscriber ids to their queues. Publishing holds the
//! read lock for a whole pass over the map, so every publish sees one
//! consistent set of subscribers; registration and deregistration take the
//! write lock and happen between publishes.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use uuid::Uuid;

use super::queue::{FrameQueue, Offer};
use super::subscription::Subscription;
use crate::frame::Frame;

/// Unique identifier for a subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    /// Generate a new random id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Configuration for the frame hub
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Hard bound on frames queued per subscriber
    pub queue_capacity: usize,
    /// Backlog at which frames are dropped for a subscriber
    pub backlog_watermark: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 10,
            backlog_watermark: 5,
        }
    }
}

/// Per-publish delivery counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Subscribers that queued the frame
    pub delivered: usize,
    /// Subscribers that dropped it because of backlog
    pub dropped: usize,
}

/// Hub counters
#[derive(Debug, Clone, Default, Serialize)]
pub struct HubStats {
    pub subscribers: usize,
    pub frames_published: u64,
    pub deliveries: u64,
    pub drops: u64,
}

/// Owns the subscriber registry and distributes frames
pub struct FrameHub {
    subscribers: RwLock<HashMap<SubscriberId, Arc<FrameQueue>>>,
    config: HubConfig,
    closed: AtomicBool,
    frames_published: AtomicU64,
    deliveries: AtomicU64,
    drops: AtomicU64,
}

impl FrameHub {
    /// Create a new frame hub
    pub fn new(config: HubConfig) -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            config,
            closed: AtomicBool::new(false),
            frames_published: AtomicU64::new(0),
            deliveries: AtomicU64::new(0),
            drops: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Create a queue, register it under a fresh id and hand back the handle
    pub fn subscribe(self: &Arc<Self>) -> Subscription {
        let id = SubscriberId::new();
        let queue = Arc::new(FrameQueue::new(
            self.config.queue_capacity,
            self.config.backlog_watermark,
        ));

        self.register(id, Arc::clone(&queue));
        Subscription::new(Arc::clone(self), id, queue)
    }

    /// Insert a subscriber queue into the registry
    ///
    /// Ids are random UUIDs; registering an id twice replaces the older queue.
    /// A queue registered after `close` is closed immediately.
    pub fn register(&self, id: SubscriberId, queue: Arc<FrameQueue>) {
        let mut subscribers = self.subscribers.write();
        if self.is_closed() {
            queue.close();
        }
        subscribers.insert(id, queue);

        tracing::debug!(subscriber_id = %id, subscribers = subscribers.len(), "Registered subscriber");
    }

    /// Remove a subscriber; unknown ids are ignored
    ///
    /// Returns true if the id was registered.
    pub fn deregister(&self, id: &SubscriberId) -> bool {
        let mut subscribers = self.subscribers.write();
        let removed = subscribers.remove(id).is_some();

        if removed {
            tracing::debug!(subscriber_id = %id, subscribers = subscribers.len(), "Removed subscriber");
        }
        removed
    }

    /// Offer `frame` to every registered subscriber
    ///
    /// Never blocks: subscribers at their backlog watermark drop the frame.
    pub fn publish(&self, frame: &Frame) -> PublishReport {
        let subscribers = self.subscribers.read();
        self.frames_published.fetch_add(1, Ordering::Relaxed);

        if subscribers.is_empty() {
            return PublishReport::default();
        }

        let mut report = PublishReport::default();
        for queue in subscribers.values() {
            match queue.offer(frame.clone()) {
                Offer::Queued => report.delivered += 1,
                Offer::Dropped => report.dropped += 1,
                Offer::Closed => {}
            }
        }

        self.deliveries
            .fetch_add(report.delivered as u64, Ordering::Relaxed);
        self.drops.fetch_add(report.dropped as u64, Ordering::Relaxed);

        tracing::trace!(
            sequence = frame.sequence(),
            subscribers = subscribers.len(),
            delivered = report.delivered,
            dropped = report.dropped,
            "Sent frame"
        );

        report
    }

    /// Close every queue and refuse future deliveries
    ///
    /// Sessions drain what is already queued and then end.
    pub fn close(&self) {
        let subscribers = self.subscribers.write();
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        for queue in subscribers.values() {
            queue.close();
        }

        tracing::info!(subscribers = subscribers.len(), "Frame hub closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Get the current subscriber count
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Check whether an id is currently registered
    pub fn is_registered(&self, id: &SubscriberId) -> bool {
        self.subscribers.read().contains_key(id)
    }

    pub fn stats(&self) -> HubStats {
        HubStats {
            subscribers: self.subscriber_count(),
            frames_published: self.frames_published.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            drops: self.drops.load(Ordering::Relaxed),
        }
    }
}

impl Default for FrameHub {
    fn default() -> Self {
        Self::new(HubConfig::default())
    }
}
