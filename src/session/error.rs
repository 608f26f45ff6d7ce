//! Session error types

use std::time::Duration;
use thiserror::Error;

/// A single failed write to a client
#[derive(Error, Debug)]
pub enum SinkError {
    /// The client side of the response is gone
    #[error("Client connection closed")]
    Closed,

    /// The client did not accept data in time
    #[error("Write timed out after {0:?}")]
    Timeout(Duration),
}

/// Reasons a session ends without delivering
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    /// The client disconnected or the server is shutting down
    #[error("Session cancelled")]
    Cancelled,

    /// The frame source is gone
    #[error("Frame hub closed")]
    HubClosed,
}
