//! Response bodies

use serde::Serialize;

/// Body of `GET /health`
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `waiting` before the first frame, `streaming` afterwards,
    /// `stopped` once the hub has closed
    pub status: String,
    pub subscribers: usize,
    pub frames_published: u64,
    pub frames_dropped: u64,
    pub frames_invalid: u64,
    pub bytes_read: u64,
    pub uptime_seconds: u64,
    pub version: String,
}
