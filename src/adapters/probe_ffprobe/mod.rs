//! FFprobe adapter for media file probing
//!
//! One-shot `ffprobe` invocations; nothing here is tracked by the registry.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{SubtrimError, SubtrimResult};
use crate::ports::ProbePort;

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    format: ProbeFormat,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<DurationField>,
}

/// ffprobe prints the duration as a string; some builds emit a number
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DurationField {
    Text(String),
    Number(f64),
}

/// FFprobe-based probe adapter
#[derive(Debug, Clone)]
pub struct FFprobeAdapter {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl FFprobeAdapter {
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    async fn launches(program: &Path) -> bool {
        let status = Command::new(program)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await;

        match status {
            Ok(status) if status.success() => true,
            Ok(status) => {
                warn!(program = %program.display(), code = ?status.code(), "Tool check failed");
                false
            }
            Err(e) => {
                warn!(program = %program.display(), error = %e, "Tool not launchable");
                false
            }
        }
    }
}

impl Default for FFprobeAdapter {
    fn default() -> Self {
        Self::new("ffmpeg", "ffprobe")
    }
}

#[async_trait]
impl ProbePort for FFprobeAdapter {
    async fn probe_duration(&self, file_path: &Path) -> SubtrimResult<f64> {
        debug!(file = %file_path.display(), "Probing duration");

        let output = Command::new(&self.ffprobe)
            .args(["-v", "quiet", "-print_format", "json", "-show_format"])
            .arg(file_path)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                SubtrimError::probe(format!(
                    "Failed to spawn {}: {}. Make sure ffprobe is installed and in PATH.",
                    self.ffprobe.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            return Err(SubtrimError::probe(format!(
                "ffprobe failed with exit code: {:?}",
                output.status.code()
            )));
        }

        parse_duration(&output.stdout)
    }

    async fn is_available(&self) -> bool {
        let (ffmpeg, ffprobe) = tokio::join!(
            Self::launches(&self.ffmpeg),
            Self::launches(&self.ffprobe)
        );
        ffmpeg && ffprobe
    }
}

/// Duration in seconds from `ffprobe -print_format json -show_format` output
pub fn parse_duration(stdout: &[u8]) -> SubtrimResult<f64> {
    let probe: ProbeOutput = serde_json::from_slice(stdout)
        .map_err(|e| SubtrimError::probe(format!("Failed to parse ffprobe output: {}", e)))?;

    let seconds = match probe.format.duration {
        Some(DurationField::Text(text)) => text
            .trim()
            .parse::<f64>()
            .map_err(|e| SubtrimError::probe(format!("Failed to parse duration: {}", e)))?,
        Some(DurationField::Number(value)) => value,
        None => return Err(SubtrimError::probe("ffprobe reported no duration")),
    };

    if !seconds.is_finite() || seconds < 0.0 {
        return Err(SubtrimError::probe(format!("Invalid duration: {}", seconds)));
    }
    Ok(seconds)
}
