// Domain rules - Job lifecycle policies

use crate::domain::errors::*;
use crate::domain::model::*;

/// Allowed job state transitions
pub struct JobTransitions;

impl JobTransitions {
    /// Whether `from -> to` is a legal step of the lifecycle
    pub fn is_allowed(from: JobState, to: JobState) -> bool {
        matches!(
            (from, to),
            (JobState::Pending, JobState::Running)
                | (JobState::Pending, JobState::Failed)
                | (JobState::Pending, JobState::Cancelled)
                | (JobState::Running, JobState::Completed)
                | (JobState::Running, JobState::Failed)
                | (JobState::Running, JobState::Cancelled)
        )
    }

    /// Apply a transition, refusing anything out of a terminal state
    pub fn apply(from: JobState, to: JobState) -> Result<JobState, DomainError> {
        if Self::is_allowed(from, to) {
            Ok(to)
        } else {
            Err(DomainError::InvalidTransition(format!(
                "{} -> {}",
                from, to
            )))
        }
    }
}

/// How the subprocess ended, as observed by the job worker
#[derive(Debug, Clone, PartialEq)]
pub enum ExitObservation {
    /// Process exited; `None` when it was killed by a signal
    Exited { code: Option<i32> },
    /// Waiting on the process failed
    WaitFailed { message: String },
}

impl ExitObservation {
    pub fn is_success(&self) -> bool {
        matches!(self, ExitObservation::Exited { code: Some(0) })
    }
}

/// Terminal state for an exit, given whether cancellation was requested first
pub fn resolve_exit(cancel_requested: bool, exit: &ExitObservation) -> JobState {
    if cancel_requested {
        JobState::Cancelled
    } else if exit.is_success() {
        JobState::Completed
    } else {
        JobState::Failed
    }
}
