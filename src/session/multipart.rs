//! `multipart/x-mixed-replace` rendering
//!
//! Wire layout of a stream:
//!
//! ```text
//! --<boundary>\r\n
//! Content-Type: image/jpeg\r\n
//! Content-Length: <n>\r\n
//! \r\n
//! <jpeg bytes>
//! \r\n--<boundary>\r\n
//! ...
//! \r\n--<boundary>--\r\n
//! ```

use bytes::Bytes;

use super::error::SinkError;
use super::sink::PartSink;
use crate::frame::Frame;

/// Boundary token used by the stream endpoint
pub const BOUNDARY: &str = "--boundary";

/// Renders frames as MIME parts onto a sink
pub struct MultipartWriter<S> {
    sink: S,
    boundary: String,
    /// Whether a delimiter has been emitted yet
    started: bool,
}

impl<S: PartSink> MultipartWriter<S> {
    pub fn new(sink: S, boundary: impl Into<String>) -> Self {
        Self {
            sink,
            boundary: boundary.into(),
            started: false,
        }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Value for the response `Content-Type` header
    pub fn content_type(&self) -> String {
        format!("multipart/x-mixed-replace;boundary={}", self.boundary)
    }

    /// Write one frame as a body part
    ///
    /// If the part headers cannot be written the image is skipped.
    pub async fn write_part(&mut self, frame: &Frame) -> Result<(), SinkError> {
        let header = self.part_header(frame.len());
        self.started = true;

        self.sink.write(header).await?;
        self.sink.write(frame.data().clone()).await
    }

    /// Write the closing delimiter
    pub async fn finish(&mut self) -> Result<(), SinkError> {
        let prefix = if self.started { "\r\n--" } else { "--" };
        let trailer = format!("{}{}--\r\n", prefix, self.boundary);
        self.sink.write(Bytes::from(trailer)).await
    }

    pub fn get_ref(&self) -> &S {
        &self.sink
    }

    pub fn into_inner(self) -> S {
        self.sink
    }

    fn part_header(&self, content_length: usize) -> Bytes {
        let prefix = if self.started { "\r\n--" } else { "--" };
        Bytes::from(format!(
            "{prefix}{boundary}\r\n\
             Content-Type: image/jpeg\r\n\
             Content-Length: {content_length}\r\n\
             \r\n",
            boundary = self.boundary,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    #[derive(Default)]
    struct BufferSink(Vec<u8>);

    #[async_trait]
    impl PartSink for BufferSink {
        async fn write(&mut self, chunk: Bytes) -> Result<(), SinkError> {
            self.0.extend_from_slice(&chunk);
            Ok(())
        }
    }

    /// Fails every write after the first `allowed`
    struct LimitedSink {
        allowed: usize,
        written: Vec<Bytes>,
    }

    #[async_trait]
    impl PartSink for LimitedSink {
        async fn write(&mut self, chunk: Bytes) -> Result<(), SinkError> {
            if self.written.len() >= self.allowed {
                return Err(SinkError::Closed);
            }
            self.written.push(chunk);
            Ok(())
        }
    }

    fn frame(payload: &[u8]) -> Frame {
        let mut data = vec![0xFF, 0xD8];
        data.extend_from_slice(payload);
        data.extend_from_slice(&[0xFF, 0xD9]);
        Frame::new(0, Bytes::from(data)).unwrap()
    }

    #[test]
    fn test_content_type() {
        let writer = MultipartWriter::new(BufferSink::default(), BOUNDARY);
        assert_eq!(
            writer.content_type(),
            "multipart/x-mixed-replace;boundary=--boundary"
        );
    }

    #[tokio::test]
    async fn test_parts_and_trailer() {
        let mut writer = MultipartWriter::new(BufferSink::default(), "frame");
        writer.write_part(&frame(b"a")).await.unwrap();
        writer.write_part(&frame(b"bc")).await.unwrap();
        writer.finish().await.unwrap();

        let mut expected = Vec::new();
        expected.extend_from_slice(b"--frame\r\nContent-Type: image/jpeg\r\nContent-Length: 5\r\n\r\n");
        expected.extend_from_slice(&[0xFF, 0xD8, b'a', 0xFF, 0xD9]);
        expected.extend_from_slice(b"\r\n--frame\r\nContent-Type: image/jpeg\r\nContent-Length: 6\r\n\r\n");
        expected.extend_from_slice(&[0xFF, 0xD8, b'b', b'c', 0xFF, 0xD9]);
        expected.extend_from_slice(b"\r\n--frame--\r\n");

        assert_eq!(writer.into_inner().0, expected);
    }

    #[tokio::test]
    async fn test_failed_header_skips_payload() {
        let sink = LimitedSink {
            allowed: 0,
            written: Vec::new(),
        };
        let mut writer = MultipartWriter::new(sink, "frame");

        assert!(writer.write_part(&frame(b"a")).await.is_err());
        assert!(writer.get_ref().written.is_empty());
    }

    #[tokio::test]
    async fn test_failed_payload_is_reported() {
        let sink = LimitedSink {
            allowed: 1,
            written: Vec::new(),
        };
        let mut writer = MultipartWriter::new(sink, "frame");

        let err = writer.write_part(&frame(b"a")).await.unwrap_err();
        assert!(matches!(err, SinkError::Closed));
        assert_eq!(writer.get_ref().written.len(), 1);
    }
}
