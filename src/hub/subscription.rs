//! Subscription handle
//!
//! A `Subscription` is the session's side of a registry entry. Dropping it
//! deregisters the subscriber, so cleanup runs exactly once whichever way a
//! session ends, including when the transport drops a handler future.

use std::sync::Arc;

use super::queue::FrameQueue;
use super::registry::{FrameHub, SubscriberId};
use crate::frame::Frame;

/// A registered receive queue
pub struct Subscription {
    hub: Arc<FrameHub>,
    id: SubscriberId,
    queue: Arc<FrameQueue>,
}

impl Subscription {
    pub(super) fn new(hub: Arc<FrameHub>, id: SubscriberId, queue: Arc<FrameQueue>) -> Self {
        Self { hub, id, queue }
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Wait for the next frame; `None` once the hub has closed and the
    /// queue is drained
    pub async fn recv(&mut self) -> Option<Frame> {
        self.queue.recv().await
    }

    pub fn try_recv(&self) -> Option<Frame> {
        self.queue.try_recv()
    }

    /// Frames waiting to be consumed
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn is_closed(&self) -> bool {
        self.queue.is_closed()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.deregister(&self.id);
        self.queue.close();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("pending", &self.queue.len())
            .finish()
    }
}
