//! Encoder Process
//!
//! Spawns the external encoder (ffmpeg) that captures the video device and
//! writes concatenated JPEG images to its stdout. The relay only consumes
//! that byte stream; restarting a dead encoder is left to the supervisor of
//! the whole process.

use std::process::Stdio;

use thiserror::Error;
use tokio::process::{Child, ChildStdout, Command};

/// Encoder invocation settings
#[derive(Debug, Clone)]
pub struct EncoderConfig {
    /// Encoder executable
    pub program: String,
    /// Video device to read from
    pub device: String,
    /// Pixel format requested from the device
    pub input_format: String,
    pub width: u32,
    pub height: u32,
    /// Frames per second
    pub frame_rate: u32,
    /// JPEG quality scale, 2 (best) to 31 (worst)
    pub quality: u32,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            program: "ffmpeg".to_string(),
            device: "/dev/video0".to_string(),
            input_format: "yuyv422".to_string(),
            width: 1280,
            height: 720,
            frame_rate: 10,
            quality: 5,
        }
    }
}

impl EncoderConfig {
    /// Check the settings before spawning
    pub fn validate(&self) -> Result<(), EncoderError> {
        if !(2..=31).contains(&self.quality) {
            return Err(EncoderError::InvalidConfig(format!(
                "quality must be between 2 and 31, got {}",
                self.quality
            )));
        }
        if self.width == 0 || self.height == 0 {
            return Err(EncoderError::InvalidConfig(format!(
                "frame size must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if self.frame_rate == 0 {
            return Err(EncoderError::InvalidConfig(
                "frame rate must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Command-line arguments for an MJPEG pipe from a V4L2 device
    pub fn args(&self) -> Vec<String> {
        vec![
            "-f".into(),
            "video4linux2".into(),
            "-input_format".into(),
            self.input_format.clone(),
            "-s".into(),
            format!("{}x{}", self.width, self.height),
            "-r".into(),
            self.frame_rate.to_string(),
            "-i".into(),
            self.device.clone(),
            "-c:v".into(),
            "mjpeg".into(),
            "-q:v".into(),
            self.quality.to_string(),
            "-boundary_tag".into(),
            "ffmpeg".into(),
            "-f".into(),
            "image2pipe".into(),
            "-".into(),
        ]
    }
}

/// A running encoder
///
/// The child is killed when this value is dropped.
pub struct EncoderProcess {
    child: Child,
}

impl EncoderProcess {
    /// Spawn the encoder with stdout piped and stderr passed through
    pub fn spawn(config: &EncoderConfig) -> Result<(Self, ChildStdout), EncoderError> {
        config.validate()?;

        let mut child = Command::new(&config.program)
            .args(config.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EncoderError::Spawn {
                program: config.program.clone(),
                error: e,
            })?;

        let stdout = child.stdout.take().ok_or(EncoderError::MissingStdout)?;

        tracing::debug!(
            program = %config.program,
            device = %config.device,
            pid = child.id(),
            "Encoder spawned"
        );

        Ok((Self { child }, stdout))
    }

    /// Kill the encoder and wait for it to exit
    pub async fn shutdown(mut self) {
        if let Err(e) = self.child.kill().await {
            tracing::debug!(error = %e, "Encoder already exited");
        }
    }
}

/// Encoder errors
#[derive(Error, Debug)]
pub enum EncoderError {
    #[error("Invalid encoder configuration: {0}")]
    InvalidConfig(String),

    #[error("Unable to spawn {program}: {error}")]
    Spawn {
        program: String,
        error: std::io::Error,
    },

    #[error("Encoder stdout was not captured")]
    MissingStdout,
}
