//! Job engine: argument building, progress parsing and the job lifecycle

use std::path::PathBuf;
use std::time::Duration;

use crate::domain::model::BusyPolicy;

pub mod command;
pub mod events;
pub mod job;
pub mod progress;
pub mod registry;

pub use command::{build_ffmpeg_args, EncodingOptions};
pub use events::{EventEmitter, Subscription};
pub use registry::{CancelOutcome, JobRegistry};

/// Runtime settings for the job engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// ffmpeg executable
    pub ffmpeg_path: PathBuf,
    /// Codec and trim handling
    pub encoding: EncodingOptions,
    /// Start-while-busy behaviour
    pub busy_policy: BusyPolicy,
    /// Time between the termination signal and a forced kill
    pub cancel_grace: Duration,
    /// Diagnostic lines kept for failure reports
    pub diagnostic_tail_lines: usize,
    /// How long the exit handler waits for the diagnostic reader to drain
    pub reader_drain_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            encoding: EncodingOptions::default(),
            busy_policy: BusyPolicy::default(),
            cancel_grace: Duration::from_secs(5),
            diagnostic_tail_lines: 20,
            reader_drain_timeout: Duration::from_secs(2),
        }
    }
}
