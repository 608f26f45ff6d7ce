//! Sliding-window frame scanner
//!
//! Holds the bytes read from the encoder that have not yet been cut into
//! frames. Everything before the front of the buffer has been emitted as a
//! frame or discarded; everything in the buffer is unparsed.
//!
//! Frames are split off with `BytesMut::split_to` and frozen, so each one is
//! an immutable `Bytes` that stays valid while the buffer keeps sliding.
//! Reserving space for the next read compacts the remaining bytes to the
//! front of the allocation (or moves them to a fresh one while frames still
//! reference the old one).

use bytes::{Bytes, BytesMut};

use super::types::{Frame, JPEG_EOI};

/// Result of cutting one candidate out of the buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scanned {
    /// A valid JPEG frame
    Frame(Frame),
    /// Bytes ending in EOI that did not start with SOI
    Invalid(Bytes),
}

/// Stream buffer that recovers JPEG frame boundaries
#[derive(Debug)]
pub struct FrameScanner {
    buf: BytesMut,
    /// Prefix of `buf` already searched for EOI without a match
    scanned: usize,
    next_sequence: u64,
    max_buffer: usize,
}

impl FrameScanner {
    /// Create a scanner that tolerates up to `max_buffer` unparsed bytes
    pub fn new(max_buffer: usize) -> Self {
        Self {
            buf: BytesMut::new(),
            scanned: 0,
            next_sequence: 0,
            max_buffer,
        }
    }

    /// Append raw stream bytes
    pub fn extend_from_slice(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Make room for at least `additional` more bytes
    pub fn reserve(&mut self, additional: usize) {
        self.buf.reserve(additional);
    }

    /// Buffer for direct reads (`AsyncReadExt::read_buf`)
    pub(crate) fn buffer_mut(&mut self) -> &mut BytesMut {
        &mut self.buf
    }

    /// Number of unparsed bytes
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Maximum number of unparsed bytes before the stream is considered broken
    pub fn max_buffer(&self) -> usize {
        self.max_buffer
    }

    /// True once the unparsed region has reached the limit with no EOI in it
    pub fn is_exhausted(&self) -> bool {
        self.buf.len() >= self.max_buffer
    }

    /// Cut the next candidate out of the buffer
    ///
    /// Returns `None` when the unparsed region holds no end-of-image marker;
    /// the caller should read more input and try again. One read may yield
    /// any number of candidates, so call this until it returns `None`.
    pub fn next_frame(&mut self) -> Option<Scanned> {
        // Step back one byte so an FF..D9 pair split across reads is found
        let start = self.scanned.saturating_sub(JPEG_EOI.len() - 1);

        let Some(pos) = find_marker(&self.buf[start..], &JPEG_EOI) else {
            self.scanned = self.buf.len();
            return None;
        };

        let end = start + pos + JPEG_EOI.len();
        let candidate = self.buf.split_to(end).freeze();
        self.scanned = 0;

        match Frame::new(self.next_sequence, candidate.clone()) {
            Some(frame) => {
                self.next_sequence += 1;
                Some(Scanned::Frame(frame))
            }
            None => Some(Scanned::Invalid(candidate)),
        }
    }
}

/// Position of the first occurrence of `marker` in `haystack`
fn find_marker(haystack: &[u8], marker: &[u8]) -> Option<usize> {
    haystack
        .windows(marker.len())
        .position(|window| window == marker)
}
