// Domain models - Core types and data structures

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::DomainError;

/// Output containers ffmpeg is asked to write
pub const SUPPORTED_CONTAINERS: &[&str] = &["mp4", "avi", "mov", "mkv", "webm"];

/// Time specification - seconds with fractional precision
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct TimeSpec {
    pub seconds: f64,
}

impl TimeSpec {
    /// Create a new TimeSpec from seconds
    pub fn from_seconds(seconds: f64) -> Self {
        Self { seconds }
    }

    /// Parse seconds, MM:SS.ms or HH:MM:SS.ms
    pub fn parse(time_str: &str) -> Result<Self, DomainError> {
        let trimmed = time_str.trim();

        if let Ok(seconds) = trimmed.parse::<f64>() {
            if !seconds.is_finite() || seconds < 0.0 {
                return Err(DomainError::BadArgs(format!(
                    "Time must be a non-negative number: {}",
                    time_str
                )));
            }
            return Ok(Self::from_seconds(seconds));
        }

        let parts: Vec<&str> = trimmed.split(':').collect();
        let (hours, minutes, seconds_part) = match parts.as_slice() {
            [m, s] => (0, parse_component(m, "minutes")?, parse_seconds(s)?),
            [h, m, s] => {
                let minutes = parse_component(m, "minutes")?;
                if minutes >= 60 {
                    return Err(DomainError::BadArgs(
                        "Minutes must be less than 60".to_string(),
                    ));
                }
                (parse_component(h, "hours")?, minutes, parse_seconds(s)?)
            }
            _ => {
                return Err(DomainError::BadArgs(format!(
                    "Invalid time format '{}'. Supported formats: seconds (e.g., 123.45), MM:SS.ms (e.g., 2:30.5), HH:MM:SS.ms (e.g., 1:02:30.5)",
                    time_str
                )))
            }
        };

        Ok(Self::from_seconds(
            hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds_part,
        ))
    }

    /// Format as HH:MM:SS.ms or MM:SS.ms
    pub fn format_hms(&self) -> String {
        let total_millis = (self.seconds * 1000.0).round() as u64;
        let hours = total_millis / 3_600_000;
        let minutes = (total_millis % 3_600_000) / 60_000;
        let seconds = (total_millis % 60_000) / 1000;
        let milliseconds = total_millis % 1000;

        if hours > 0 {
            format!("{}:{:02}:{:02}.{:03}", hours, minutes, seconds, milliseconds)
        } else {
            format!("{}:{:02}.{:03}", minutes, seconds, milliseconds)
        }
    }
}

impl fmt::Display for TimeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_hms())
    }
}

fn parse_component(value: &str, name: &str) -> Result<u32, DomainError> {
    value
        .parse::<u32>()
        .map_err(|_| DomainError::BadArgs(format!("Invalid {} format: {}", name, value)))
}

fn parse_seconds(value: &str) -> Result<f64, DomainError> {
    let seconds = value
        .parse::<f64>()
        .map_err(|_| DomainError::BadArgs(format!("Invalid seconds format: {}", value)))?;
    if !(0.0..60.0).contains(&seconds) {
        return Err(DomainError::BadArgs(
            "Seconds must be less than 60".to_string(),
        ));
    }
    Ok(seconds)
}

/// Opaque job identifier, never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// Generate a fresh identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for JobId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| DomainError::BadArgs(format!("Invalid job ID: {}", s)))
    }
}

/// Lifecycle state of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobState {
    /// Terminal states admit no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Failed | JobState::Cancelled
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobState::Pending => "pending",
            JobState::Running => "running",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// What to do when a start arrives while another job is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BusyPolicy {
    /// Refuse the new job
    #[default]
    RejectIfBusy,
    /// Cancel running jobs, then start the new one
    Supersede,
}

impl FromStr for BusyPolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "reject-if-busy" | "reject" => Ok(BusyPolicy::RejectIfBusy),
            "supersede" => Ok(BusyPolicy::Supersede),
            other => Err(DomainError::BadArgs(format!(
                "Invalid busy policy: {}. Valid policies: reject-if-busy, supersede",
                other
            ))),
        }
    }
}

/// Handling of a trim range with only one bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HalfOpenTrimPolicy {
    /// Exactly one bound is a validation error
    #[default]
    Reject,
    /// Emit only the bound that is present
    Allow,
}

impl FromStr for HalfOpenTrimPolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "reject" => Ok(HalfOpenTrimPolicy::Reject),
            "allow" => Ok(HalfOpenTrimPolicy::Allow),
            other => Err(DomainError::BadArgs(format!(
                "Invalid half-open trim policy: {}. Valid policies: reject, allow",
                other
            ))),
        }
    }
}

/// Kept interval `[start, end)` of the source media
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimWindow {
    pub start: f64,
    pub end: f64,
}

impl TrimWindow {
    pub fn new(start: f64, end: f64) -> Result<Self, DomainError> {
        if !start.is_finite() || !end.is_finite() {
            return Err(DomainError::InvalidTimeRange(
                "trim bounds must be finite".to_string(),
            ));
        }
        if start < 0.0 {
            return Err(DomainError::InvalidTimeRange(format!(
                "start ({}) cannot be negative",
                start
            )));
        }
        if end <= start {
            return Err(DomainError::InvalidTimeRange(format!(
                "start ({}) must be less than end ({})",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Percent for an elapsed time on the output timeline (starts at zero)
    pub fn percent_at(&self, elapsed: f64) -> f64 {
        crate::engine::progress::percent_complete(elapsed, Some(self.duration()))
    }

    /// Percent for a position on the source timeline
    pub fn percent_at_source(&self, position: f64) -> f64 {
        self.percent_at(position - self.start)
    }
}

/// Parameters of one processing request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingParams {
    pub input_file: PathBuf,
    pub output_file: PathBuf,
    #[serde(default)]
    pub start_time: Option<f64>,
    #[serde(default)]
    pub end_time: Option<f64>,
    #[serde(default)]
    pub subtitle_file: Option<PathBuf>,
    /// Probed duration of the input, used for untrimmed percentages
    #[serde(default)]
    pub source_duration: Option<f64>,
}

impl ProcessingParams {
    pub fn new(input_file: impl Into<PathBuf>, output_file: impl Into<PathBuf>) -> Self {
        Self {
            input_file: input_file.into(),
            output_file: output_file.into(),
            start_time: None,
            end_time: None,
            subtitle_file: None,
            source_duration: None,
        }
    }

    pub fn with_trim(mut self, start: f64, end: f64) -> Self {
        self.start_time = Some(start);
        self.end_time = Some(end);
        self
    }

    pub fn with_subtitles(mut self, subtitle_file: impl Into<PathBuf>) -> Self {
        self.subtitle_file = Some(subtitle_file.into());
        self
    }

    pub fn with_source_duration(mut self, seconds: f64) -> Self {
        self.source_duration = Some(seconds);
        self
    }

    /// Check invariants; file existence is left to ffmpeg
    pub fn validate(&self, half_open: HalfOpenTrimPolicy) -> Result<(), DomainError> {
        if self.input_file.as_os_str().is_empty() {
            return Err(DomainError::BadArgs("Input file is required".to_string()));
        }
        if self.output_file.as_os_str().is_empty() {
            return Err(DomainError::BadArgs("Output file is required".to_string()));
        }
        validate_container(&self.output_file)?;

        for (name, value) in [("start", self.start_time), ("end", self.end_time)] {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return Err(DomainError::InvalidTimeRange(format!(
                        "{} time must be a non-negative number, got {}",
                        name, v
                    )));
                }
            }
        }

        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => TrimWindow::new(start, end).map(|_| ()),
            (Some(_), None) | (None, Some(_)) if half_open == HalfOpenTrimPolicy::Reject => {
                Err(DomainError::InvalidTimeRange(
                    "both start and end time are required to trim".to_string(),
                ))
            }
            (None, Some(end)) if end <= 0.0 => Err(DomainError::InvalidTimeRange(
                "end time must be greater than zero".to_string(),
            )),
            _ => Ok(()),
        }?;

        if matches!(self.source_duration, Some(d) if !d.is_finite() || d <= 0.0) {
            return Err(DomainError::BadArgs(
                "source duration must be a positive number".to_string(),
            ));
        }

        Ok(())
    }

    /// Trim window when both bounds are set and ordered
    pub fn trim_window(&self) -> Option<TrimWindow> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => TrimWindow::new(start, end).ok(),
            _ => None,
        }
    }

    /// Length of the output in seconds, when it can be known
    pub fn progress_span(&self) -> Option<f64> {
        match (self.start_time, self.end_time, self.source_duration) {
            (Some(start), Some(end), _) => Some(end - start),
            (None, Some(end), _) => Some(end),
            (Some(start), None, Some(total)) => Some(total - start),
            (None, None, Some(total)) => Some(total),
            _ => None,
        }
        .filter(|span| *span > 0.0)
    }
}

fn validate_container(path: &Path) -> Result<(), DomainError> {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    if SUPPORTED_CONTAINERS.contains(&ext.as_str()) {
        Ok(())
    } else {
        Err(DomainError::UnsupportedContainer(format!(
            "Invalid output extension: '{}'. Supported formats: {}",
            ext,
            SUPPORTED_CONTAINERS.join(", ")
        )))
    }
}

/// One progress observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSample {
    pub job_id: JobId,
    #[serde(rename = "seconds")]
    pub elapsed_seconds: f64,
    pub percent: f64,
}

/// Lifecycle event pushed to subscribers; always tagged with its job
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum JobEvent {
    Progress(ProgressSample),
    #[serde(rename_all = "camelCase")]
    Completed { job_id: JobId },
    #[serde(rename_all = "camelCase")]
    Failed { job_id: JobId, error: String },
    #[serde(rename_all = "camelCase")]
    Cancelled { job_id: JobId },
}

impl JobEvent {
    pub fn job_id(&self) -> JobId {
        match self {
            JobEvent::Progress(sample) => sample.job_id,
            JobEvent::Completed { job_id }
            | JobEvent::Failed { job_id, .. }
            | JobEvent::Cancelled { job_id } => *job_id,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobEvent::Progress(_))
    }

    /// Event channel name used by the desktop front end
    pub fn channel(&self) -> &'static str {
        match self {
            JobEvent::Progress(_) => "ffmpeg-progress",
            JobEvent::Completed { .. } => "ffmpeg-complete",
            JobEvent::Failed { .. } => "ffmpeg-error",
            JobEvent::Cancelled { .. } => "ffmpeg-cancelled",
        }
    }
}

/// Read-only view of a registered job
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub id: JobId,
    pub state: JobState,
    pub cancel_requested: bool,
    pub pid: Option<u32>,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub params: Arc<ProcessingParams>,
}

#[cfg(test)]
mod tests;
