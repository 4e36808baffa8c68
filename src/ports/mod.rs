// Ports - Interface definitions (contracts)

use std::path::Path;

use async_trait::async_trait;

use crate::error::SubtrimResult;

/// Port for media duration probing and tool discovery
#[async_trait]
pub trait ProbePort: Send + Sync {
    /// Container duration of `file_path` in seconds
    async fn probe_duration(&self, file_path: &Path) -> SubtrimResult<f64>;

    /// True only when both the transcoder and the prober can be launched
    async fn is_available(&self) -> bool;
}
