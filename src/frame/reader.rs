//! Frame reader
//!
//! The single long-lived loop between the encoder pipe and the hub. It
//! blocks only on the pipe read; each validated frame is published from the
//! loop itself, which keeps delivery in stream order for every subscriber.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::error::ReaderError;
use super::scanner::{FrameScanner, Scanned};
use crate::hub::FrameHub;

/// Read loop settings
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Bytes requested from the pipe per read
    pub read_chunk_bytes: usize,
    /// Largest frame the buffer may hold before the stream is declared broken
    pub max_frame_bytes: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            read_chunk_bytes: 16 * 1024,      // 16 KB
            max_frame_bytes: 8 * 1024 * 1024, // 8 MB
        }
    }
}

/// Counters shared between the reader and the health endpoint
#[derive(Debug, Default)]
pub struct ReaderStats {
    bytes_read: AtomicU64,
    frames_accepted: AtomicU64,
    frames_rejected: AtomicU64,
}

/// Point-in-time copy of [`ReaderStats`]
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ReaderStatsSnapshot {
    pub bytes_read: u64,
    pub frames_accepted: u64,
    pub frames_rejected: u64,
}

impl ReaderStats {
    pub fn snapshot(&self) -> ReaderStatsSnapshot {
        ReaderStatsSnapshot {
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            frames_accepted: self.frames_accepted.load(Ordering::Relaxed),
            frames_rejected: self.frames_rejected.load(Ordering::Relaxed),
        }
    }
}

/// Reads the encoder stream and publishes every frame it contains
pub struct FrameReader<R> {
    source: R,
    scanner: FrameScanner,
    config: ReaderConfig,
    stats: Arc<ReaderStats>,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Create a reader over `source`
    pub fn new(source: R, config: ReaderConfig) -> Self {
        Self {
            source,
            scanner: FrameScanner::new(config.max_frame_bytes),
            config,
            stats: Arc::new(ReaderStats::default()),
        }
    }

    /// Report into an existing set of counters
    pub fn with_stats(mut self, stats: Arc<ReaderStats>) -> Self {
        self.stats = stats;
        self
    }

    pub fn stats(&self) -> Arc<ReaderStats> {
        Arc::clone(&self.stats)
    }

    /// Run until the input fails, publishing frames to `hub`
    ///
    /// Never returns while the stream is healthy. The returned error is
    /// fatal for the whole service.
    pub async fn run(mut self, hub: &FrameHub) -> ReaderError {
        tracing::debug!(
            read_chunk_bytes = self.config.read_chunk_bytes,
            max_frame_bytes = self.config.max_frame_bytes,
            "Frame reader started"
        );

        loop {
            if let Err(e) = self.fill().await {
                return e;
            }

            self.drain(hub);

            if self.scanner.is_exhausted() {
                return ReaderError::BufferExhausted {
                    buffered: self.scanner.buffered(),
                    limit: self.scanner.max_buffer(),
                };
            }
        }
    }

    /// Read the next chunk into the scanner buffer
    async fn fill(&mut self) -> Result<usize, ReaderError> {
        self.scanner.reserve(self.config.read_chunk_bytes);

        loop {
            match self.source.read_buf(self.scanner.buffer_mut()).await {
                Ok(0) => return Err(ReaderError::EndOfStream),
                Ok(n) => {
                    self.stats.bytes_read.fetch_add(n as u64, Ordering::Relaxed);
                    return Ok(n);
                }
                Err(e)
                    if matches!(
                        e.kind(),
                        std::io::ErrorKind::Interrupted | std::io::ErrorKind::WouldBlock
                    ) =>
                {
                    tracing::trace!(error = %e, "Retrying read");
                    tokio::task::yield_now().await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Publish every complete frame currently buffered
    fn drain(&mut self, hub: &FrameHub) -> usize {
        let mut published = 0;

        while let Some(scanned) = self.scanner.next_frame() {
            match scanned {
                Scanned::Frame(frame) => {
                    self.stats.frames_accepted.fetch_add(1, Ordering::Relaxed);
                    hub.publish(&frame);
                    published += 1;
                }
                Scanned::Invalid(bytes) => {
                    self.stats.frames_rejected.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(bytes = bytes.len(), "Found invalid JPEG, skipping");
                }
            }
        }

        published
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::HubConfig;
    use std::collections::VecDeque;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::{AsyncWriteExt, ReadBuf};

    /// Replays a fixed sequence of reads and errors, then reports EOF
    struct ScriptedSource {
        steps: VecDeque<io::Result<Vec<u8>>>,
    }

    impl ScriptedSource {
        fn new(steps: Vec<io::Result<Vec<u8>>>) -> Self {
            Self {
                steps: steps.into(),
            }
        }
    }

    impl AsyncRead for ScriptedSource {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            match self.steps.pop_front() {
                Some(Ok(data)) => {
                    buf.put_slice(&data);
                    Poll::Ready(Ok(()))
                }
                Some(Err(e)) => Poll::Ready(Err(e)),
                None => Poll::Ready(Ok(())),
            }
        }
    }

    fn jpeg(fill: u8, len: usize) -> Vec<u8> {
        let mut data = vec![0xFF, 0xD8];
        data.extend(std::iter::repeat(fill).take(len));
        data.extend_from_slice(&[0xFF, 0xD9]);
        data
    }

    #[tokio::test]
    async fn test_reader_publishes_frames_until_eof() {
        let hub = Arc::new(FrameHub::new(HubConfig {
            queue_capacity: 10,
            backlog_watermark: 10,
        }));
        let subscription = hub.subscribe();

        let sources: Vec<Vec<u8>> = (1..=4u8).map(|i| jpeg(i, i as usize * 100)).collect();
        let mut stream = sources.concat();
        // Garbage ending in EOI between frames
        stream.splice(0..0, [0x01, 0x02, 0xFF, 0xD9]);

        let (mut writer, reader_side) = tokio::io::duplex(64);
        let writer_task = tokio::spawn(async move {
            for chunk in stream.chunks(37) {
                writer.write_all(chunk).await.unwrap();
            }
        });

        let reader = FrameReader::new(
            reader_side,
            ReaderConfig {
                read_chunk_bytes: 50,
                max_frame_bytes: 4096,
            },
        );
        let stats = reader.stats();
        let error = reader.run(&hub).await;
        writer_task.await.unwrap();

        assert!(matches!(error, ReaderError::EndOfStream));

        let received: Vec<_> = std::iter::from_fn(|| subscription.try_recv()).collect();
        assert_eq!(received.len(), sources.len());
        for (frame, source) in received.iter().zip(&sources) {
            assert_eq!(frame.data().as_ref(), source.as_slice());
        }

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.frames_accepted, 4);
        assert_eq!(snapshot.frames_rejected, 1);
        assert_eq!(
            snapshot.bytes_read,
            sources.iter().map(Vec::len).sum::<usize>() as u64 + 4
        );
    }

    #[tokio::test]
    async fn test_reader_fails_on_oversized_frame() {
        let hub = FrameHub::default();
        let mut stream = vec![0xFF, 0xD8];
        stream.extend(std::iter::repeat(0x10).take(300));

        let reader = FrameReader::new(
            std::io::Cursor::new(stream),
            ReaderConfig {
                read_chunk_bytes: 64,
                max_frame_bytes: 128,
            },
        );

        let error = reader.run(&hub).await;
        assert!(matches!(
            error,
            ReaderError::BufferExhausted { limit: 128, .. }
        ));
    }

    #[tokio::test]
    async fn test_reader_retries_interrupted_reads() {
        let hub = Arc::new(FrameHub::default());
        let subscription = hub.subscribe();

        let source = ScriptedSource::new(vec![
            Ok(vec![0xFF, 0xD8, 0x01]),
            Err(io::Error::from(io::ErrorKind::Interrupted)),
            Err(io::Error::from(io::ErrorKind::WouldBlock)),
            Ok(vec![0x02, 0xFF, 0xD9]),
            Err(io::Error::from(io::ErrorKind::BrokenPipe)),
        ]);

        let reader = FrameReader::new(source, ReaderConfig::default());
        let stats = reader.stats();
        let error = reader.run(&hub).await;

        match error {
            ReaderError::Io(e) => assert_eq!(e.kind(), io::ErrorKind::BrokenPipe),
            other => panic!("expected IO error, got {:?}", other),
        }

        let frame = subscription.try_recv().expect("frame spanning the retry");
        assert_eq!(
            frame.data().as_ref(),
            &[0xFF, 0xD8, 0x01, 0x02, 0xFF, 0xD9]
        );
        assert!(subscription.try_recv().is_none());
        assert_eq!(stats.snapshot().frames_accepted, 1);
        assert_eq!(stats.snapshot().bytes_read, 6);
    }

    #[tokio::test]
    async fn test_reader_empty_read_is_end_of_stream() {
        let hub = FrameHub::default();
        let source = ScriptedSource::new(vec![Ok(vec![0xFF, 0xD8])]);

        let error = FrameReader::new(source, ReaderConfig::default())
            .run(&hub)
            .await;
        assert!(matches!(error, ReaderError::EndOfStream));
    }
}
