//! Write side of a session
//!
//! `PartSink` is the seam between protocol rendering and the transport.
//! The HTTP implementation pushes chunks into a bounded channel that the
//! response body streams from.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc::{self, error::SendTimeoutError};
use tokio_util::sync::CancellationToken;

use super::error::SinkError;

/// Destination for rendered response chunks
#[async_trait]
pub trait PartSink: Send {
    /// Write one chunk; an error fails only this write
    async fn write(&mut self, chunk: Bytes) -> Result<(), SinkError>;
}

/// Sink feeding a streaming response body
#[derive(Debug)]
pub struct ChannelSink {
    tx: mpsc::Sender<Bytes>,
    write_timeout: Duration,
}

impl ChannelSink {
    /// Create a sink and the receiver the response body reads from
    pub fn channel(capacity: usize, write_timeout: Duration) -> (Self, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx, write_timeout }, rx)
    }

    /// Cancel `cancel` as soon as the body receiver is dropped
    ///
    /// The watcher exits when either side finishes, so the session must
    /// cancel the token (e.g. through a drop guard) when it ends.
    pub fn watch_disconnect(&self, cancel: CancellationToken) {
        let body = self.tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = body.closed() => {
                    tracing::trace!("Response body dropped by client");
                    cancel.cancel();
                }
                _ = cancel.cancelled() => {}
            }
        });
    }
}

#[async_trait]
impl PartSink for ChannelSink {
    async fn write(&mut self, chunk: Bytes) -> Result<(), SinkError> {
        match self.tx.send_timeout(chunk, self.write_timeout).await {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Timeout(_)) => Err(SinkError::Timeout(self.write_timeout)),
            Err(SendTimeoutError::Closed(_)) => Err(SinkError::Closed),
        }
    }
}
