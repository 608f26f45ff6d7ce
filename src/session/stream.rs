//! Streaming session
//!
//! Waits on "next frame or disconnect" and renders each frame as a MIME
//! part. Write failures are counted; once more than
//! `max_consecutive_errors` happen in a row the connection is given up.
//! A successful part resets the count.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::multipart::MultipartWriter;
use super::sink::PartSink;
use crate::hub::{SubscriberId, Subscription};

/// Streaming session settings
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Consecutive write failures tolerated before the connection is dropped
    pub max_consecutive_errors: u32,
    /// How long a single write may wait for the client
    pub write_timeout: Duration,
    /// Chunks buffered between the session and the response body
    pub body_buffer: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            max_consecutive_errors: 5,
            write_timeout: Duration::from_secs(5),
            body_buffer: 8,
        }
    }
}

/// Why a streaming session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Client went away (or the server is shutting down)
    ClientClosed,
    /// Write failures exceeded the threshold
    TooManyErrors,
    /// The hub closed and every queued frame was written
    HubClosed,
}

/// Summary returned when a session ends
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub outcome: SessionOutcome,
    pub frames_written: u64,
    pub write_errors: u64,
    /// Failure streak at the moment the session ended
    pub consecutive_errors: u32,
}

/// One `multipart/x-mixed-replace` client
pub struct StreamSession<S> {
    subscription: Subscription,
    writer: MultipartWriter<S>,
    cancel: CancellationToken,
    max_consecutive_errors: u32,
    frames_written: u64,
    write_errors: u64,
    consecutive_errors: u32,
}

impl<S: PartSink> StreamSession<S> {
    /// Wrap a registered subscription
    pub fn new(
        subscription: Subscription,
        writer: MultipartWriter<S>,
        cancel: CancellationToken,
        config: &StreamConfig,
    ) -> Self {
        Self {
            subscription,
            writer,
            cancel,
            max_consecutive_errors: config.max_consecutive_errors,
            frames_written: 0,
            write_errors: 0,
            consecutive_errors: 0,
        }
    }

    pub fn id(&self) -> SubscriberId {
        self.subscription.id()
    }

    /// Stream frames until the session ends, then deregister
    pub async fn run(mut self) -> SessionReport {
        let id = self.subscription.id();
        // Ending the session releases anything waiting on the token
        let _cancel_on_exit = self.cancel.clone().drop_guard();

        tracing::debug!(subscriber_id = %id, "Stream session started");

        let outcome = loop {
            let frame = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break SessionOutcome::ClientClosed,
                frame = self.subscription.recv() => frame,
            };

            let Some(frame) = frame else {
                break SessionOutcome::HubClosed;
            };

            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break SessionOutcome::ClientClosed,
                result = self.writer.write_part(&frame) => result,
            };

            match result {
                Ok(()) => {
                    self.frames_written += 1;
                    self.consecutive_errors = 0;
                }
                Err(e) => {
                    self.write_errors += 1;
                    self.consecutive_errors += 1;
                    tracing::error!(
                        subscriber_id = %id,
                        sequence = frame.sequence(),
                        error = %e,
                        "Unable to process image"
                    );

                    if self.consecutive_errors > self.max_consecutive_errors {
                        tracing::error!(subscriber_id = %id, "Too many errors, killing connection");
                        break SessionOutcome::TooManyErrors;
                    }
                }
            }
        };

        if outcome == SessionOutcome::HubClosed {
            if let Err(e) = self.writer.finish().await {
                tracing::debug!(subscriber_id = %id, error = %e, "Failed to write closing boundary");
            }
        }

        let report = SessionReport {
            outcome,
            frames_written: self.frames_written,
            write_errors: self.write_errors,
            consecutive_errors: self.consecutive_errors,
        };

        // Deregisters from the hub
        drop(self.subscription);

        tracing::debug!(
            subscriber_id = %id,
            outcome = ?report.outcome,
            frames_written = report.frames_written,
            write_errors = report.write_errors,
            "Stream session ended"
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;
    use crate::hub::{FrameHub, HubConfig};
    use crate::session::{ChannelSink, SinkError, BOUNDARY};
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::Arc;

    /// Fails the first `failures` writes, then accepts everything
    struct FlakySink {
        failures: usize,
        accepted: Vec<Bytes>,
    }

    impl FlakySink {
        fn failing(failures: usize) -> Self {
            Self {
                failures,
                accepted: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl PartSink for FlakySink {
        async fn write(&mut self, chunk: Bytes) -> Result<(), SinkError> {
            if self.failures > 0 {
                self.failures -= 1;
                return Err(SinkError::Closed);
            }
            self.accepted.push(chunk);
            Ok(())
        }
    }

    fn frame(sequence: u64) -> Frame {
        let mut data = vec![0xFF, 0xD8];
        data.extend_from_slice(&sequence.to_be_bytes());
        data.extend_from_slice(&[0xFF, 0xD9]);
        Frame::new(sequence, Bytes::from(data)).unwrap()
    }

    fn roomy_hub() -> Arc<FrameHub> {
        Arc::new(FrameHub::new(HubConfig {
            queue_capacity: 10,
            backlog_watermark: 10,
        }))
    }

    #[tokio::test]
    async fn test_six_consecutive_failures_terminate() {
        let hub = roomy_hub();
        let subscription = hub.subscribe();
        for i in 0..8 {
            hub.publish(&frame(i));
        }

        let writer = MultipartWriter::new(FlakySink::failing(6), BOUNDARY);
        let session = StreamSession::new(
            subscription,
            writer,
            CancellationToken::new(),
            &StreamConfig::default(),
        );

        let report = session.run().await;
        assert_eq!(report.outcome, SessionOutcome::TooManyErrors);
        assert_eq!(report.write_errors, 6);
        assert_eq!(report.frames_written, 0);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_success_resets_error_count() {
        let hub = roomy_hub();
        let subscription = hub.subscribe();
        for i in 0..6 {
            hub.publish(&frame(i));
        }
        hub.close();

        let writer = MultipartWriter::new(FlakySink::failing(5), BOUNDARY);
        let session = StreamSession::new(
            subscription,
            writer,
            CancellationToken::new(),
            &StreamConfig::default(),
        );

        let report = session.run().await;
        assert_eq!(report.outcome, SessionOutcome::HubClosed);
        assert_eq!(report.write_errors, 5);
        assert_eq!(report.frames_written, 1);
        assert_eq!(report.consecutive_errors, 0);
    }

    #[tokio::test]
    async fn test_immediate_disconnect_leaves_no_subscriber() {
        let hub = Arc::new(FrameHub::default());
        let subscription = hub.subscribe();
        assert_eq!(hub.subscriber_count(), 1);

        let config = StreamConfig::default();
        let (sink, body) = ChannelSink::channel(config.body_buffer, config.write_timeout);
        let cancel = CancellationToken::new();
        sink.watch_disconnect(cancel.clone());
        drop(body);

        let session = StreamSession::new(
            subscription,
            MultipartWriter::new(sink, BOUNDARY),
            cancel,
            &config,
        );

        let report = tokio::time::timeout(Duration::from_secs(1), session.run())
            .await
            .expect("session did not observe disconnect");
        assert_eq!(report.outcome, SessionOutcome::ClientClosed);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_frames_reach_body_in_order() {
        let hub = Arc::new(FrameHub::default());
        let subscription = hub.subscribe();

        let config = StreamConfig::default();
        let (sink, mut body) = ChannelSink::channel(config.body_buffer, config.write_timeout);
        let cancel = CancellationToken::new();
        let session = StreamSession::new(
            subscription,
            MultipartWriter::new(sink, BOUNDARY),
            cancel.clone(),
            &config,
        );
        let handle = tokio::spawn(session.run());

        for i in 0..3 {
            hub.publish(&frame(i));
            let header = body.recv().await.unwrap();
            assert!(header.starts_with(b"--") || header.starts_with(b"\r\n--"));
            let payload = body.recv().await.unwrap();
            assert_eq!(payload, frame(i).into_bytes());
        }

        cancel.cancel();
        let report = handle.await.unwrap();
        assert_eq!(report.outcome, SessionOutcome::ClientClosed);
        assert_eq!(report.frames_written, 3);
        assert_eq!(hub.subscriber_count(), 0);
    }
}
