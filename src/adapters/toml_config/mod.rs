// TOML config adapter - Configuration loading with file, env and default layers

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::model::{BusyPolicy, HalfOpenTrimPolicy};
use crate::engine::{EncodingOptions, EngineConfig};
use crate::error::{SubtrimError, SubtrimResult};

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "subtrim.toml";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Full application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub tools: ToolsConfig,
    pub encoding: EncodingConfig,
    pub jobs: JobsConfig,
    pub logging: LoggingConfig,
}

/// External executables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodingConfig {
    pub video_codec: String,
    pub audio_codec: String,
    pub overwrite: bool,
    pub half_open_trim: HalfOpenTrimPolicy,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        let defaults = EncodingOptions::default();
        Self {
            video_codec: defaults.video_codec,
            audio_codec: defaults.audio_codec,
            overwrite: defaults.overwrite,
            half_open_trim: defaults.half_open_trim,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    pub busy_policy: BusyPolicy,
    pub cancel_grace_ms: u64,
    pub diagnostic_tail_lines: usize,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            busy_policy: BusyPolicy::default(),
            cancel_grace_ms: 5000,
            diagnostic_tail_lines: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl LoggingConfig {
    /// The configured log file, or `subtrim/logs/subtrim.log` under the
    /// local data directory
    pub fn log_path(&self) -> PathBuf {
        self.file.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("subtrim")
                .join("logs")
                .join("subtrim.log")
        })
    }
}

impl AppConfig {
    /// Load from `path`, or from `subtrim.toml` when present, else defaults.
    ///
    /// An explicitly given path must exist.
    pub fn load(path: Option<&Path>) -> SubtrimResult<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::from_file(fallback)
                } else {
                    debug!("No config file found, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> SubtrimResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SubtrimError::config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        let config = Self::from_toml_str(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> SubtrimResult<Self> {
        toml::from_str(content)
            .map_err(|e| SubtrimError::config(format!("Failed to parse TOML config: {}", e)))
    }

    /// Apply `SUBTRIM_*` variables from the process environment
    pub fn apply_env_overrides(&mut self) -> SubtrimResult<()> {
        self.apply_env_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides using `lookup` as the environment
    pub fn apply_env_overrides_from<F>(&mut self, lookup: F) -> SubtrimResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut applied = 0usize;

        if let Some(value) = lookup("SUBTRIM_FFMPEG") {
            self.tools.ffmpeg = PathBuf::from(value);
            applied += 1;
        }
        if let Some(value) = lookup("SUBTRIM_FFPROBE") {
            self.tools.ffprobe = PathBuf::from(value);
            applied += 1;
        }
        if let Some(value) = lookup("SUBTRIM_BUSY_POLICY") {
            self.jobs.busy_policy = value
                .parse()
                .map_err(|e| SubtrimError::config(format!("SUBTRIM_BUSY_POLICY: {}", e)))?;
            applied += 1;
        }
        if let Some(value) = lookup("SUBTRIM_CANCEL_GRACE_MS") {
            self.jobs.cancel_grace_ms = value.trim().parse().map_err(|e| {
                SubtrimError::config(format!("SUBTRIM_CANCEL_GRACE_MS: {}: {}", value, e))
            })?;
            applied += 1;
        }
        if let Some(value) = lookup("SUBTRIM_LOG_LEVEL") {
            self.logging.level = value;
            applied += 1;
        }
        if let Some(value) = lookup("SUBTRIM_LOG_FILE") {
            self.logging.file = Some(PathBuf::from(value));
            applied += 1;
        }

        if applied > 0 {
            debug!(applied, "Applied environment overrides");
        }
        Ok(())
    }

    pub fn validate(&self) -> SubtrimResult<()> {
        let level = self.logging.level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(SubtrimError::config(format!(
                "Invalid log level: {}. Valid levels: {}",
                self.logging.level,
                LOG_LEVELS.join(", ")
            )));
        }
        if self.jobs.diagnostic_tail_lines == 0 {
            return Err(SubtrimError::config(
                "jobs.diagnostic_tail_lines must be at least 1",
            ));
        }
        if self.encoding.video_codec.trim().is_empty() || self.encoding.audio_codec.trim().is_empty()
        {
            return Err(SubtrimError::config("Codec names cannot be empty"));
        }
        Ok(())
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            ffmpeg_path: self.tools.ffmpeg.clone(),
            encoding: EncodingOptions {
                video_codec: self.encoding.video_codec.clone(),
                audio_codec: self.encoding.audio_codec.clone(),
                overwrite: self.encoding.overwrite,
                half_open_trim: self.encoding.half_open_trim,
            },
            busy_policy: self.jobs.busy_policy,
            cancel_grace: Duration::from_millis(self.jobs.cancel_grace_ms),
            diagnostic_tail_lines: self.jobs.diagnostic_tail_lines,
            ..EngineConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.tools.ffmpeg, PathBuf::from("ffmpeg"));
        assert_eq!(config.jobs.busy_policy, BusyPolicy::RejectIfBusy);
        assert_eq!(config.encoding.half_open_trim, HalfOpenTrimPolicy::Reject);
        assert!(config.logging.file.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_log_path_falls_back_to_data_dir() {
        let mut logging = LoggingConfig::default();
        let default = logging.log_path();
        assert!(default.ends_with("subtrim/logs/subtrim.log"));

        logging.file = Some(PathBuf::from("custom.log"));
        assert_eq!(logging.log_path(), PathBuf::from("custom.log"));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [jobs]
            busy_policy = "supersede"

            [encoding]
            half_open_trim = "allow"
            "#,
        )
        .unwrap();

        assert_eq!(config.jobs.busy_policy, BusyPolicy::Supersede);
        assert_eq!(config.jobs.cancel_grace_ms, 5000);
        assert_eq!(config.encoding.half_open_trim, HalfOpenTrimPolicy::Allow);
        assert_eq!(config.encoding.video_codec, "libx264");
    }

    #[test]
    fn test_unknown_enum_value_is_config_error() {
        let err = AppConfig::from_toml_str("[jobs]\nbusy_policy = \"queue\"\n").unwrap_err();
        assert!(matches!(err, SubtrimError::Config { .. }));
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config =
            AppConfig::from_toml_str("[tools]\nffmpeg = \"/opt/ffmpeg\"\n").unwrap();
        config
            .apply_env_overrides_from(env(&[
                ("SUBTRIM_FFMPEG", "/usr/local/bin/ffmpeg"),
                ("SUBTRIM_BUSY_POLICY", "supersede"),
                ("SUBTRIM_CANCEL_GRACE_MS", "250"),
                ("SUBTRIM_LOG_FILE", "/tmp/subtrim.log"),
            ]))
            .unwrap();

        assert_eq!(config.tools.ffmpeg, PathBuf::from("/usr/local/bin/ffmpeg"));
        assert_eq!(config.jobs.busy_policy, BusyPolicy::Supersede);
        assert_eq!(config.logging.file, Some(PathBuf::from("/tmp/subtrim.log")));

        let engine = config.engine_config();
        assert_eq!(engine.cancel_grace, Duration::from_millis(250));
        assert_eq!(engine.busy_policy, BusyPolicy::Supersede);
    }

    #[test]
    fn test_bad_env_values_are_rejected() {
        let mut config = AppConfig::default();
        assert!(config
            .apply_env_overrides_from(env(&[("SUBTRIM_CANCEL_GRACE_MS", "soon")]))
            .is_err());
        assert!(config
            .apply_env_overrides_from(env(&[("SUBTRIM_BUSY_POLICY", "queue")]))
            .is_err());
    }

    #[test]
    fn test_validation() {
        let mut config = AppConfig::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.jobs.diagnostic_tail_lines = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[logging]\nlevel = \"debug\"\njson = true\n").unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);

        assert!(AppConfig::load(Some(&dir.path().join("missing.toml"))).is_err());
    }
}
