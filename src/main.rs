//! MJPEG Relay
//!
//! Spawns the encoder, cuts its output into JPEG frames and serves them
//! over HTTP.
//!
//! Run with: cargo run -- --input /dev/video0 --listen :3000
//!
//! # Configuration
//!
//! Settings come from a TOML file (`--config`, or the default locations),
//! then `MJPEG_RELAY_*` environment variables, then command-line flags.
//! `RUST_LOG` overrides the configured log level.

use anyhow::Context;
use clap::Parser;
use mjpeg_relay::api::{serve, AppState};
use mjpeg_relay::config::{generate_default_config, Config, LoggingConfig};
use mjpeg_relay::encoder::EncoderProcess;
use mjpeg_relay::frame::{FrameReader, ReaderStats};
use mjpeg_relay::hub::FrameHub;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "mjpeg-relay")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Serve a video device as an MJPEG stream over HTTP")]
pub struct Cli {
    /// Config file (default: search standard locations)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print a default config file and exit
    #[arg(long)]
    pub print_config: bool,

    /// Video device to read from
    #[arg(short = 'i', long = "input")]
    pub device: Option<String>,

    /// Frame rate to show in MJPEG
    #[arg(short = 'r', long = "rate")]
    pub frame_rate: Option<u32>,

    /// Width of video frames
    #[arg(short, long)]
    pub width: Option<u32>,

    /// Height of video frames
    #[arg(long)]
    pub height: Option<u32>,

    /// Image quality (2..31)
    #[arg(short, long)]
    pub quality: Option<u32>,

    /// Port/IP to listen on
    #[arg(long)]
    pub listen: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (pretty, json)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Read the MJPEG stream from stdin instead of spawning the encoder
    #[arg(long)]
    pub stdin: bool,
}

impl Cli {
    /// Apply flags on top of the loaded configuration
    fn apply(&self, config: &mut Config) {
        if let Some(device) = &self.device {
            config.encoder.device = device.clone();
        }
        if let Some(rate) = self.frame_rate {
            config.encoder.frame_rate = rate;
        }
        if let Some(width) = self.width {
            config.encoder.width = width;
        }
        if let Some(height) = self.height {
            config.encoder.height = height;
        }
        if let Some(quality) = self.quality {
            config.encoder.quality = quality;
        }
        if let Some(listen) = &self.listen {
            config.server.listen = listen.clone();
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.logging.format = format.clone();
        }
        if self.stdin {
            config.encoder.stdin = true;
        }
    }
}

type Input = Box<dyn AsyncRead + Unpin + Send>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.print_config {
        print!("{}", generate_default_config());
        return Ok(());
    }

    // Logging is not set up yet, so config errors abort with the error itself
    let (mut config, source) = match &cli.config {
        Some(path) => (Config::load_with_env(path)?, Some(path.clone())),
        None => Config::load_default()?,
    };
    cli.apply(&mut config);

    init_logging(&config.logging);

    tracing::info!("Starting MJPEG relay v{}", env!("CARGO_PKG_VERSION"));
    match &source {
        Some(path) => tracing::info!("Loaded config from {:?}", path),
        None => tracing::info!("Using default config with environment overrides"),
    }

    let hub = Arc::new(FrameHub::new(config.hub_config()));
    let reader_stats = Arc::new(ReaderStats::default());
    let shutdown = CancellationToken::new();

    // HTTP server
    let api_config = config.api_config();
    let state = AppState::with_shutdown(
        Arc::clone(&hub),
        Arc::clone(&reader_stats),
        api_config.clone(),
        shutdown.clone(),
    );
    let mut server = tokio::spawn(async move { serve(state, &api_config).await });
    tracing::debug!("HTTP server spawned");

    // Frame source
    let (encoder, input): (Option<EncoderProcess>, Input) = if config.encoder.stdin {
        tracing::info!("Reading MJPEG stream from stdin");
        (None, Box::new(tokio::io::stdin()))
    } else {
        let encoder_config = config.encoder_config();
        let (process, stdout) =
            EncoderProcess::spawn(&encoder_config).context("Unable to start encoder")?;
        tracing::info!(
            device = %encoder_config.device,
            size = %format!("{}x{}", encoder_config.width, encoder_config.height),
            frame_rate = encoder_config.frame_rate,
            "Encoder started"
        );
        (Some(process), Box::new(stdout))
    };

    let reader = FrameReader::new(input, config.reader_config()).with_stats(reader_stats);
    let reader_hub = Arc::clone(&hub);
    let mut reader_task = tokio::spawn(async move { reader.run(&reader_hub).await });

    let result = tokio::select! {
        stopped = &mut reader_task => {
            let error = stopped.context("Frame reader panicked")?;
            tracing::error!(error = %error, "Failed to read encoder output");

            // No frames will ever arrive again: end every session and the server
            hub.close();
            shutdown.cancel();
            match server.await {
                Ok(Err(e)) => tracing::error!(error = %e, "HTTP server error during shutdown"),
                Err(e) => tracing::error!(error = %e, "HTTP server task failed"),
                Ok(Ok(())) => {}
            }

            Err(anyhow::Error::new(error).context("Frame reader stopped"))
        }
        served = &mut server => {
            hub.close();
            reader_task.abort();
            served
                .context("HTTP server task failed")?
                .context("HTTP server has gone")
        }
    };

    if let Some(encoder) = encoder {
        encoder.shutdown().await;
    }

    tracing::info!("MJPEG relay stopped");
    result
}

/// Initialize tracing from the logging config; `RUST_LOG` takes precedence
fn init_logging(config: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "mjpeg_relay={},tower_http=info",
            config.level
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);

    if config.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
