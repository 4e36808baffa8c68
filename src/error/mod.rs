//! Error handling module for subtrim

use thiserror::Error;

use crate::domain::errors::DomainError;
use crate::domain::model::JobId;

/// Main error type for subtrim operations
#[derive(Error, Debug)]
pub enum SubtrimError {
    /// Processing parameters rejected before anything was spawned
    #[error("Invalid processing parameters: {0}")]
    InvalidParams(#[from] DomainError),

    /// Executable missing or not launchable
    #[error("Failed to spawn {program}: {source}. Make sure it is installed and in PATH.")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Media probe error
    #[error("Failed to probe media file: {message}")]
    Probe { message: String },

    /// A job is already running and the busy policy refuses new ones
    #[error("Job {active} is still running")]
    Busy { active: JobId },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SubtrimError {
    pub(crate) fn probe(message: impl Into<String>) -> Self {
        SubtrimError::Probe {
            message: message.into(),
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        SubtrimError::Config {
            message: message.into(),
        }
    }
}

/// Result type alias for subtrim operations
pub type SubtrimResult<T> = std::result::Result<T, SubtrimError>;
