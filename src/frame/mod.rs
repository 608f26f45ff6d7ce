//! Frame Extraction
//!
//! Recovers discrete JPEG frames from the encoder's unframed byte stream:
//!
//! - **types**: `Frame` and the JPEG marker constants
//! - **scanner**: `FrameScanner`, the sliding-window stream buffer
//! - **reader**: `FrameReader`, the async read loop that feeds the hub
//! - **error**: Error types
//!
//! # Architecture
//!
//! ```text
//!   encoder stdout ──read──► BytesMut ──scan EOI──► candidate
//!                                                      │
//!                                   SOI prefix? ───────┤
//!                                     yes              no
//!                                      ▼               ▼
//!                               FrameHub::publish   discard + count
//! ```

pub mod error;
pub mod reader;
pub mod scanner;
pub mod types;

pub use error::ReaderError;
pub use reader::{FrameReader, ReaderConfig, ReaderStats, ReaderStatsSnapshot};
pub use scanner::{FrameScanner, Scanned};
pub use types::{Frame, JPEG_EOI, JPEG_SOI};
