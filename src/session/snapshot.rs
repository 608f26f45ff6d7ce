//! Snapshot session
//!
//! Registers like a streaming session but takes exactly one frame: the
//! next one published after registration.

use tokio_util::sync::CancellationToken;

use super::error::SessionError;
use crate::frame::Frame;
use crate::hub::Subscription;

/// One-shot frame capture
pub struct SnapshotSession {
    subscription: Subscription,
    cancel: CancellationToken,
}

impl SnapshotSession {
    pub fn new(subscription: Subscription, cancel: CancellationToken) -> Self {
        Self {
            subscription,
            cancel,
        }
    }

    /// Wait for the next frame, then deregister
    pub async fn capture(mut self) -> Result<Frame, SessionError> {
        let id = self.subscription.id();

        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(SessionError::Cancelled),
            frame = self.subscription.recv() => frame.ok_or(SessionError::HubClosed),
        };

        drop(self.subscription);

        match &result {
            Ok(frame) => tracing::debug!(
                subscriber_id = %id,
                sequence = frame.sequence(),
                bytes = frame.len(),
                "Captured snapshot"
            ),
            Err(e) => tracing::debug!(subscriber_id = %id, error = %e, "Snapshot aborted"),
        }

        result
    }
}
