// Process interactor - Starts, cancels and queries trim jobs

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::model::{JobId, ProcessingParams};
use crate::engine::{CancelOutcome, JobRegistry};
use crate::error::SubtrimResult;
use crate::ports::ProbePort;

/// Interactor for the processing use case
pub struct ProcessInteractor {
    registry: JobRegistry,
    probe_port: Arc<dyn ProbePort>,
}

impl ProcessInteractor {
    /// Create new process interactor with injected ports
    pub fn new(registry: JobRegistry, probe_port: Arc<dyn ProbePort>) -> Self {
        Self {
            registry,
            probe_port,
        }
    }

    /// Start a job; returns once ffmpeg is running
    pub fn start(&self, params: ProcessingParams) -> SubtrimResult<JobId> {
        info!(
            input = %params.input_file.display(),
            output = %params.output_file.display(),
            start = ?params.start_time,
            end = ?params.end_time,
            subtitles = params.subtitle_file.is_some(),
            "Starting processing"
        );
        self.registry.start(params)
    }

    /// Fill in the source duration when the job needs it, then start.
    ///
    /// Only untrimmed jobs use the source duration. A failed probe or a
    /// non-positive duration is logged and the job starts without it.
    pub async fn start_with_probe(&self, mut params: ProcessingParams) -> SubtrimResult<JobId> {
        params.validate(self.registry.config().encoding.half_open_trim)?;

        if params.source_duration.is_none() && params.trim_window().is_none() {
            match self.probe_port.probe_duration(&params.input_file).await {
                Ok(seconds) if seconds > 0.0 => params = params.with_source_duration(seconds),
                Ok(seconds) => warn!(seconds, "Probed duration unusable, progress percent unavailable"),
                Err(e) => warn!(error = %e, "Duration probe failed, progress percent unavailable"),
            }
        }
        self.start(params)
    }

    pub fn cancel(&self, job_id: JobId) -> CancelOutcome {
        let outcome = self.registry.cancel(job_id);
        info!(job_id = %job_id, ?outcome, "Cancel requested");
        outcome
    }
}
