use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::adapters::tracing_log::open_log_file;
use crate::adapters::{AppConfig, FFprobeAdapter};
use crate::app::{inspect_interactor::InspectInteractor, process_interactor::ProcessInteractor};
use crate::domain::model::{JobId, ProcessingParams};
use crate::engine::{CancelOutcome, EventEmitter, JobRegistry, Subscription};
use crate::error::SubtrimResult;
use crate::ports::ProbePort;

pub trait AppContainer: Send + Sync {
    fn process_interactor(&self) -> Arc<ProcessInteractor>;
    fn inspect_interactor(&self) -> Arc<InspectInteractor>;
}

/// Explicit application context handed to every command handler.
///
/// Owns the job registry for its whole lifetime; `shutdown` cancels
/// whatever is still running.
pub struct AppContext {
    config: AppConfig,
    registry: JobRegistry,
    process_interactor: Arc<ProcessInteractor>,
    inspect_interactor: Arc<InspectInteractor>,
}

impl AppContext {
    pub fn new(config: AppConfig) -> Self {
        let probe = Arc::new(FFprobeAdapter::new(
            config.tools.ffmpeg.clone(),
            config.tools.ffprobe.clone(),
        ));
        Self::with_probe(config, probe)
    }

    /// Build with a custom probe port
    pub fn with_probe(config: AppConfig, probe_port: Arc<dyn ProbePort>) -> Self {
        let registry = JobRegistry::new(config.engine_config(), EventEmitter::new());

        let process_interactor = Arc::new(ProcessInteractor::new(
            registry.clone(),
            Arc::clone(&probe_port),
        ));
        let inspect_interactor = Arc::new(InspectInteractor::new(probe_port));

        Self {
            config,
            registry,
            process_interactor,
            inspect_interactor,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    pub async fn check_tool_availability(&self) -> bool {
        self.inspect_interactor.check_tool_availability().await
    }

    pub async fn probe_duration(&self, file_path: &Path) -> SubtrimResult<f64> {
        self.inspect_interactor.probe_duration(file_path).await
    }

    pub fn start_processing(&self, params: ProcessingParams) -> SubtrimResult<JobId> {
        self.process_interactor.start(params)
    }

    pub fn cancel_processing(&self, job_id: JobId) -> CancelOutcome {
        self.process_interactor.cancel(job_id)
    }

    /// Attach an event subscriber; subscribe before starting to see every event
    pub fn subscribe(&self) -> Subscription {
        self.registry.subscribe()
    }

    /// Append-only log file, the configured one or the default location
    pub fn log_file_path(&self) -> PathBuf {
        self.config.logging.log_path()
    }

    /// Append one timestamped line to the log file and return its path
    pub fn write_log(&self, message: &str) -> SubtrimResult<PathBuf> {
        let path = self.log_file_path();
        let mut file = open_log_file(&path)?;
        writeln!(
            file,
            "[{}] {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            message
        )?;
        Ok(path)
    }

    /// Cancel every job and wait up to `timeout` for the registry to empty
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        self.registry.shutdown(timeout).await
    }
}

impl AppContainer for AppContext {
    fn process_interactor(&self) -> Arc<ProcessInteractor> {
        Arc::clone(&self.process_interactor)
    }

    fn inspect_interactor(&self) -> Arc<InspectInteractor> {
        Arc::clone(&self.inspect_interactor)
    }
}
