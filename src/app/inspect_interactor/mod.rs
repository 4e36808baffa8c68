// Inspect interactor - Tool discovery and duration queries

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::error::SubtrimResult;
use crate::ports::ProbePort;

/// Interactor for the stateless media queries
pub struct InspectInteractor {
    probe_port: Arc<dyn ProbePort>,
}

impl InspectInteractor {
    /// Create new inspect interactor with injected ports
    pub fn new(probe_port: Arc<dyn ProbePort>) -> Self {
        Self { probe_port }
    }

    pub async fn check_tool_availability(&self) -> bool {
        let available = self.probe_port.is_available().await;
        info!(available, "Checked ffmpeg and ffprobe availability");
        available
    }

    pub async fn probe_duration(&self, file_path: &Path) -> SubtrimResult<f64> {
        let seconds = self.probe_port.probe_duration(file_path).await?;
        info!(file = %file_path.display(), seconds, "Probed media duration");
        Ok(seconds)
    }
}
