//! subtrim library
//!
//! Job lifecycle management for trimming videos and burning in subtitles
//! with an external ffmpeg process: argument building, progress parsing,
//! cancellation and event delivery.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod domain;
pub mod engine;
pub mod error;
pub mod ports;

// Re-export commonly used types
pub use app::AppContext;
pub use domain::errors::DomainError;
pub use domain::model::{JobEvent, JobId, JobSnapshot, JobState, ProcessingParams, ProgressSample};
pub use engine::{CancelOutcome, EngineConfig, EventEmitter, JobRegistry, Subscription};
pub use error::{SubtrimError, SubtrimResult};
