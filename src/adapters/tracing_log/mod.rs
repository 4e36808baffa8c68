// Tracing log adapter - Structured logging using tracing crate

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer, Registry};

use crate::adapters::toml_config::LoggingConfig;
use crate::error::{SubtrimError, SubtrimResult};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the configured level. Output goes to stderr, as
/// text or JSON, and is mirrored into the append-only log file when one is
/// configured. Calling this again after a subscriber is set is a no-op.
pub fn init_logging(config: &LoggingConfig) -> SubtrimResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| SubtrimError::config(format!("Invalid log filter: {}", e)))?;

    let mut layers: Vec<BoxedLayer> = Vec::with_capacity(2);

    layers.push(if config.json {
        fmt::layer()
            .json()
            .with_current_span(false)
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_writer(std::io::stderr)
            .boxed()
    });

    if let Some(ref path) = config.file {
        let file = Mutex::new(open_log_file(path)?);
        layers.push(if config.json {
            fmt::layer().json().with_writer(file).boxed()
        } else {
            fmt::layer().with_ansi(false).with_writer(file).boxed()
        });
    }

    let _ = tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init();

    Ok(())
}

/// Open `path` for appending, creating it and its directory if needed
pub fn open_log_file(path: &Path) -> SubtrimResult<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            SubtrimError::config(format!(
                "Failed to create log directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| {
            SubtrimError::config(format!(
                "Failed to open log file {}: {}",
                path.display(),
                e
            ))
        })
}
