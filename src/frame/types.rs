//! Core frame type
//!
//! A `Frame` is one complete JPEG image cut out of the encoder stream.
//! Frames are cheap to clone: the payload is a reference-counted `Bytes`
//! shared by every subscriber that receives it.

use bytes::Bytes;

/// JPEG start-of-image marker
pub const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];

/// JPEG end-of-image marker
pub const JPEG_EOI: [u8; 2] = [0xFF, 0xD9];

/// One complete, validated JPEG image
///
/// Always starts with [`JPEG_SOI`] and ends with [`JPEG_EOI`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Position of this frame in the stream, counting only valid frames
    sequence: u64,
    /// Image bytes, markers included
    data: Bytes,
}

impl Frame {
    /// Validate a candidate and wrap it as a frame
    ///
    /// Returns `None` unless `data` starts with SOI and ends with EOI.
    pub fn new(sequence: u64, data: Bytes) -> Option<Self> {
        if is_complete_jpeg(&data) {
            Some(Self { sequence, data })
        } else {
            None
        }
    }

    /// Sequence number assigned by the scanner
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Raw JPEG bytes
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Size of the image in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always false for a valid frame; provided for API symmetry
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Consume the frame, returning the image bytes
    pub fn into_bytes(self) -> Bytes {
        self.data
    }
}

/// Check that `data` is delimited by the JPEG SOI and EOI markers
///
/// The shortest accepted input is `FF D8 FF D9`; the markers may not overlap.
pub fn is_complete_jpeg(data: &[u8]) -> bool {
    data.len() >= JPEG_SOI.len() + JPEG_EOI.len()
        && data.starts_with(&JPEG_SOI)
        && data.ends_with(&JPEG_EOI)
}
