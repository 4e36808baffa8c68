//! subtrim - trim videos and burn in subtitles with ffmpeg
//!
//! # Usage
//!
//! ```bash
//! subtrim check
//! subtrim probe --input video.mp4
//! subtrim process --input video.mp4 --output clip.mp4 --start 00:01:00 --end 00:02:00
//! subtrim process -i video.mp4 -o subbed.mp4 --subtitles video.srt --json
//! subtrim log "export finished"
//! ```

use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};

use subtrim::adapters::{init_logging, AppConfig};
use subtrim::app::AppContext;
use subtrim::cli::{commands, Cli, Commands};

/// Upper bound on waiting for jobs to wind down at exit
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Precedence: CLI > env > file > defaults
    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    config
        .apply_env_overrides()
        .context("Invalid environment configuration")?;
    cli.apply_overrides(&mut config);
    config.validate().context("Invalid configuration")?;

    init_logging(&config.logging).context("Failed to initialise logging")?;
    debug!(?config, "Configuration resolved");
    info!("Starting subtrim");

    let ctx = AppContext::new(config);

    let outcome = match cli.command {
        Commands::Check => commands::check(&ctx).await,
        Commands::Probe(args) => commands::probe(&ctx, args).await,
        Commands::Process(args) => commands::process(&ctx, args).await,
        Commands::LogPath => Ok(commands::log_path(&ctx)),
        Commands::Log(args) => commands::log(&ctx, args),
    };

    ctx.shutdown(SHUTDOWN_TIMEOUT).await;
    outcome
}
