//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;

use crate::domain::errors::DomainError;
use crate::domain::model::{BusyPolicy, ProcessingParams, TimeSpec};

/// Arguments for the probe command
#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Input media file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the process command
#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output video file path
    #[arg(short, long)]
    pub output: PathBuf,

    /// Trim start (HH:MM:SS.ms, MM:SS.ms, or seconds)
    #[arg(short, long)]
    pub start: Option<String>,

    /// Trim end (HH:MM:SS.ms, MM:SS.ms, or seconds)
    #[arg(short, long)]
    pub end: Option<String>,

    /// Subtitle file to burn into the video
    #[arg(long)]
    pub subtitles: Option<PathBuf>,

    /// Behaviour when another job is running (reject-if-busy, supersede)
    #[arg(long)]
    pub policy: Option<BusyPolicy>,

    /// Emit events as JSON lines
    #[arg(long)]
    pub json: bool,

    /// Show job id and trim window before the progress bar
    #[arg(short, long)]
    pub verbose: bool,
}

/// Arguments for the log command
#[derive(Args, Debug)]
pub struct LogArgs {
    /// Line to append to the log file
    #[arg(required = true)]
    pub message: Vec<String>,
}

impl LogArgs {
    pub fn line(&self) -> String {
        self.message.join(" ")
    }
}

impl ProcessArgs {
    /// Parse the time arguments into processing parameters
    pub fn to_params(&self) -> Result<ProcessingParams, DomainError> {
        let mut params = ProcessingParams::new(self.input.clone(), self.output.clone());
        params.start_time = parse_time("start", self.start.as_deref())?;
        params.end_time = parse_time("end", self.end.as_deref())?;
        params.subtitle_file = self.subtitles.clone();
        Ok(params)
    }
}

fn parse_time(which: &str, value: Option<&str>) -> Result<Option<f64>, DomainError> {
    value
        .map(|raw| {
            TimeSpec::parse(raw)
                .map(|time| time.seconds)
                .map_err(|e| DomainError::BadArgs(format!("Invalid {} time '{}': {}", which, raw, e)))
        })
        .transpose()
}
