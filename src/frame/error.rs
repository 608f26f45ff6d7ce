//! Frame reader error types
//!
//! Every variant is fatal: the reader has no recovery path and the process
//! is expected to be restarted by its supervisor.

use thiserror::Error;

/// Errors that stop the frame reader
#[derive(Error, Debug)]
pub enum ReaderError {
    /// The input pipe failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The encoder closed its output
    #[error("Input stream ended")]
    EndOfStream,

    /// No end-of-image marker found within the buffer limit
    #[error("Frame buffer exhausted: {buffered} bytes without an end-of-image marker (limit: {limit})")]
    BufferExhausted { buffered: usize, limit: usize },
}
