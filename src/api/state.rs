//! Application State
//!
//! Shared state accessible by all handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::frame::ReaderStats;
use crate::hub::FrameHub;
use crate::session::StreamConfig;

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Frame hub every session subscribes to
    pub hub: Arc<FrameHub>,
    /// Counters from the frame reader
    pub reader_stats: Arc<ReaderStats>,
    /// HTTP configuration
    pub config: Arc<ApiConfig>,
    /// Cancelled on shutdown; every session token is a child of it
    pub shutdown: CancellationToken,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    pub fn new(hub: Arc<FrameHub>, reader_stats: Arc<ReaderStats>, config: ApiConfig) -> Self {
        Self::with_shutdown(hub, reader_stats, config, CancellationToken::new())
    }

    /// Create state tied to an existing shutdown token
    pub fn with_shutdown(
        hub: Arc<FrameHub>,
        reader_stats: Arc<ReaderStats>,
        config: ApiConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            hub,
            reader_stats,
            config: Arc::new(config),
            shutdown,
            start_time: Instant::now(),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Listen address, `host:port` or `:port`
    pub listen: String,
    /// Streaming session settings
    pub stream: StreamConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen: ":3000".to_string(),
            stream: StreamConfig::default(),
        }
    }
}

impl ApiConfig {
    pub fn new(listen: impl Into<String>) -> Self {
        Self {
            listen: listen.into(),
            ..Default::default()
        }
    }

    /// Get the socket address string
    ///
    /// A bare `:port` binds every interface.
    pub fn addr(&self) -> String {
        if self.listen.starts_with(':') {
            format!("0.0.0.0{}", self.listen)
        } else {
            self.listen.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addr() {
        assert_eq!(ApiConfig::default().addr(), "0.0.0.0:3000");
        assert_eq!(ApiConfig::new("127.0.0.1:8080").addr(), "127.0.0.1:8080");
    }
}
