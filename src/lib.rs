//! # MJPEG Relay
//!
//! Re-serves the MJPEG output of an external encoder to any number of HTTP
//! clients, as a live `multipart/x-mixed-replace` feed or as single
//! snapshots.
//!
//! ## Modules
//!
//! - [`frame`]: Recovers JPEG frames from the encoder's byte stream
//! - [`hub`]: Subscriber registry and non-blocking fan-out
//! - [`session`]: Per-connection streaming and snapshot protocol
//! - [`api`]: HTTP server with Axum
//! - [`encoder`]: Spawns the external encoder process
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mjpeg_relay::frame::{FrameReader, ReaderConfig};
//! use mjpeg_relay::hub::FrameHub;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let hub = Arc::new(FrameHub::default());
//!     let mut viewer = hub.subscribe();
//!
//!     let reader = FrameReader::new(tokio::io::stdin(), ReaderConfig::default());
//!     let reader_hub = Arc::clone(&hub);
//!     tokio::spawn(async move {
//!         let error = reader.run(&reader_hub).await;
//!         eprintln!("reader stopped: {}", error);
//!         reader_hub.close();
//!     });
//!
//!     while let Some(frame) = viewer.recv().await {
//!         println!("frame {} ({} bytes)", frame.sequence(), frame.len());
//!     }
//! }
//! ```

pub mod api;
pub mod config;
pub mod encoder;
pub mod frame;
pub mod hub;
pub mod session;

// Re-export top-level types for convenience
pub use frame::{Frame, FrameReader, FrameScanner, ReaderConfig, ReaderError, ReaderStats};

pub use hub::{FrameHub, HubConfig, HubStats, PublishReport, SubscriberId, Subscription};

pub use session::{
    MultipartWriter, PartSink, SessionError, SessionOutcome, SessionReport, SnapshotSession,
    StreamConfig, StreamSession,
};

pub use api::{build_router, serve, ApiConfig, ApiError, AppState};

pub use encoder::{EncoderConfig, EncoderError, EncoderProcess};

pub use config::{Config, ConfigError, LoggingConfig};
