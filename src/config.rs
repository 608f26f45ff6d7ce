//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides; the
//! binary applies command-line flags on top.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::ApiConfig;
use crate::encoder::EncoderConfig;
use crate::frame::ReaderConfig;
use crate::hub::HubConfig;
use crate::session::StreamConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub hub: HubSettings,

    #[serde(default)]
    pub reader: ReaderSettings,

    #[serde(default)]
    pub stream: StreamSettings,

    #[serde(default)]
    pub encoder: EncoderSettings,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
}

fn default_listen() -> String {
    ":3000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

/// Subscriber queue configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HubSettings {
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    #[serde(default = "default_backlog_watermark")]
    pub backlog_watermark: usize,
}

fn default_queue_capacity() -> usize {
    10
}

fn default_backlog_watermark() -> usize {
    5
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            backlog_watermark: default_backlog_watermark(),
        }
    }
}

/// Frame reader configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ReaderSettings {
    #[serde(default = "default_read_chunk")]
    pub read_chunk_bytes: usize,

    #[serde(default = "default_max_frame")]
    pub max_frame_bytes: usize,
}

fn default_read_chunk() -> usize {
    16 * 1024 // 16 KB
}

fn default_max_frame() -> usize {
    8 * 1024 * 1024 // 8 MB
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            read_chunk_bytes: default_read_chunk(),
            max_frame_bytes: default_max_frame(),
        }
    }
}

/// Streaming session configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StreamSettings {
    #[serde(default = "default_max_errors")]
    pub max_consecutive_errors: u32,

    #[serde(default = "default_write_timeout")]
    pub write_timeout_ms: u64,

    #[serde(default = "default_body_buffer")]
    pub body_buffer: usize,
}

fn default_max_errors() -> u32 {
    5
}

fn default_write_timeout() -> u64 {
    5000 // 5 seconds
}

fn default_body_buffer() -> usize {
    8
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            max_consecutive_errors: default_max_errors(),
            write_timeout_ms: default_write_timeout(),
            body_buffer: default_body_buffer(),
        }
    }
}

/// Encoder configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EncoderSettings {
    #[serde(default = "default_program")]
    pub program: String,

    #[serde(default = "default_device")]
    pub device: String,

    #[serde(default = "default_input_format")]
    pub input_format: String,

    #[serde(default = "default_width")]
    pub width: u32,

    #[serde(default = "default_height")]
    pub height: u32,

    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,

    #[serde(default = "default_quality")]
    pub quality: u32,

    /// Read the MJPEG stream from stdin instead of spawning the encoder
    #[serde(default)]
    pub stdin: bool,
}

fn default_program() -> String {
    "ffmpeg".to_string()
}

fn default_device() -> String {
    "/dev/video0".to_string()
}

fn default_input_format() -> String {
    "yuyv422".to_string()
}

fn default_width() -> u32 {
    1280
}

fn default_height() -> u32 {
    720
}

fn default_frame_rate() -> u32 {
    10
}

fn default_quality() -> u32 {
    5
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            program: default_program(),
            device: default_device(),
            input_format: default_input_format(),
            width: default_width(),
            height: default_height(),
            frame_rate: default_frame_rate(),
            quality: default_quality(),
            stdin: false,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Default config file locations, in search order
    pub fn default_paths() -> Vec<PathBuf> {
        [
            dirs::config_dir().map(|p| p.join("mjpeg-relay").join("config.toml")),
            Some(PathBuf::from("/etc/mjpeg-relay/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Load from default locations or environment
    ///
    /// Returns the path the config came from, if any.
    pub fn load_default() -> Result<(Self, Option<PathBuf>), ConfigError> {
        Self::load_first(&Self::default_paths())
    }

    /// Load the first file in `paths` that exists
    ///
    /// A file that exists but cannot be read or parsed is an error; later
    /// paths are not tried. With no file at all, defaults plus environment
    /// overrides are used.
    pub fn load_first(paths: &[PathBuf]) -> Result<(Self, Option<PathBuf>), ConfigError> {
        match paths.iter().find(|path| path.exists()) {
            Some(path) => Ok((Self::load_with_env(path)?, Some(path.clone()))),
            None => Ok((Self::from_env(), None)),
        }
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        if let Ok(listen) = std::env::var("MJPEG_RELAY_LISTEN") {
            self.server.listen = listen;
        }
        if let Ok(device) = std::env::var("MJPEG_RELAY_DEVICE") {
            self.encoder.device = device;
        }
        if let Ok(level) = std::env::var("MJPEG_RELAY_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("MJPEG_RELAY_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            listen: self.server.listen.clone(),
            stream: self.stream_config(),
        }
    }

    pub fn hub_config(&self) -> HubConfig {
        HubConfig {
            queue_capacity: self.hub.queue_capacity,
            backlog_watermark: self.hub.backlog_watermark,
        }
    }

    pub fn reader_config(&self) -> ReaderConfig {
        ReaderConfig {
            read_chunk_bytes: self.reader.read_chunk_bytes,
            max_frame_bytes: self.reader.max_frame_bytes,
        }
    }

    pub fn stream_config(&self) -> StreamConfig {
        StreamConfig {
            max_consecutive_errors: self.stream.max_consecutive_errors,
            write_timeout: Duration::from_millis(self.stream.write_timeout_ms),
            body_buffer: self.stream.body_buffer,
        }
    }

    pub fn encoder_config(&self) -> EncoderConfig {
        EncoderConfig {
            program: self.encoder.program.clone(),
            device: self.encoder.device.clone(),
            input_format: self.encoder.input_format.clone(),
            width: self.encoder.width,
            height: self.encoder.height,
            frame_rate: self.encoder.frame_rate,
            quality: self.encoder.quality,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# MJPEG Relay Configuration
#
# Environment variables override these settings:
# - MJPEG_RELAY_LISTEN
# - MJPEG_RELAY_DEVICE
# - MJPEG_RELAY_LOG_LEVEL
# - MJPEG_RELAY_LOG_FORMAT

[server]
# Address to listen on (":port" binds all interfaces)
listen = ":3000"

[hub]
# Frames a subscriber queue can hold
queue_capacity = 10

# Queued frames at which new frames are dropped for that subscriber
backlog_watermark = 5

[reader]
# Bytes requested from the encoder pipe per read
read_chunk_bytes = 16384

# Largest accepted JPEG frame (bytes)
max_frame_bytes = 8388608

[stream]
# Consecutive write failures before a client is disconnected
max_consecutive_errors = 5

# How long one write may wait for a slow client (ms)
write_timeout_ms = 5000

# Response chunks buffered per client
body_buffer = 8

[encoder]
# Encoder executable
program = "ffmpeg"

# Video device to read from
device = "/dev/video0"

# Pixel format requested from the device
input_format = "yuyv422"

# Frame size and rate
width = 1280
height = 720
frame_rate = 10

# JPEG quality (2..31, lower is better)
quality = 5

# Read the MJPEG stream from stdin instead of spawning the encoder
stdin = false

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
