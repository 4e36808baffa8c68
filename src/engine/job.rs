//! One ffmpeg invocation: control block, worker and exit handling

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::io::AsyncRead;
use tokio::process::Child;
use tokio::sync::oneshot;
use tracing::{debug, error, info, trace, warn};

use crate::adapters::exec_ffmpeg::{force_kill, request_termination};
use crate::domain::errors::DomainError;
use crate::domain::model::{JobEvent, JobId, JobSnapshot, JobState, ProcessingParams};
use crate::domain::rules::{resolve_exit, ExitObservation, JobTransitions};
use crate::engine::events::EventEmitter;
use crate::engine::progress::{DiagnosticLines, ProgressTracker};

/// Result of a cancel request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CancelOutcome {
    /// Termination was requested now
    Requested,
    /// An earlier cancel is still in flight
    AlreadyRequested,
    /// The job already reached a terminal state
    NotRunning,
    /// No such job (never existed or already cleared)
    NotFound,
}

/// Mutable lifecycle state; every transition happens under this lock
struct JobControl {
    state: JobState,
    cancel_requested: bool,
    cancel_tx: Option<oneshot::Sender<()>>,
}

/// Registry-owned record of a job
pub(crate) struct JobSlot {
    id: JobId,
    params: Arc<ProcessingParams>,
    pid: Option<u32>,
    started_at: DateTime<Utc>,
    control: Mutex<JobControl>,
}

impl JobSlot {
    /// New slot in `Pending`, plus the receiving end of its cancel signal
    pub(crate) fn new(
        id: JobId,
        params: Arc<ProcessingParams>,
        pid: Option<u32>,
    ) -> (Self, oneshot::Receiver<()>) {
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let slot = Self {
            id,
            params,
            pid,
            started_at: Utc::now(),
            control: Mutex::new(JobControl {
                state: JobState::Pending,
                cancel_requested: false,
                cancel_tx: Some(cancel_tx),
            }),
        };
        (slot, cancel_rx)
    }

    fn control(&self) -> MutexGuard<'_, JobControl> {
        self.control
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn state(&self) -> JobState {
        self.control().state
    }

    pub(crate) fn mark_running(&self) -> Result<(), DomainError> {
        let mut control = self.control();
        control.state = JobTransitions::apply(control.state, JobState::Running)?;
        Ok(())
    }

    pub(crate) fn snapshot(&self) -> JobSnapshot {
        let control = self.control();
        JobSnapshot {
            id: self.id,
            state: control.state,
            cancel_requested: control.cancel_requested,
            pid: self.pid,
            started_at: self.started_at,
            params: Arc::clone(&self.params),
        }
    }

    /// Flag the job as cancelled and wake its worker; idempotent
    pub(crate) fn request_cancel(&self) -> CancelOutcome {
        let mut control = self.control();
        if control.state.is_terminal() {
            return CancelOutcome::NotRunning;
        }
        if control.cancel_requested {
            return CancelOutcome::AlreadyRequested;
        }

        control.cancel_requested = true;
        if let Some(tx) = control.cancel_tx.take() {
            // The worker may already be past its wait; the flag still decides.
            let _ = tx.send(());
        }
        info!(job_id = %self.id, "Cancellation requested");
        CancelOutcome::Requested
    }

    /// Exit handling: pick the terminal state and emit its event atomically
    fn finish(&self, exit: &ExitObservation, tail: &[String], emitter: &EventEmitter) -> JobState {
        let mut control = self.control();
        let next = resolve_exit(control.cancel_requested, exit);

        match JobTransitions::apply(control.state, next) {
            Ok(state) => control.state = state,
            Err(e) => {
                error!(job_id = %self.id, error = %e, "Refusing second terminal transition");
                return control.state;
            }
        }
        control.cancel_tx = None;

        let job_id = self.id;
        let event = match next {
            JobState::Completed => JobEvent::Completed { job_id },
            JobState::Cancelled => JobEvent::Cancelled { job_id },
            _ => JobEvent::Failed {
                job_id,
                error: failure_detail(exit, tail),
            },
        };
        emitter.emit(event);
        next
    }
}

/// Error text for a failed job: exit reason followed by the diagnostic tail
pub(crate) fn failure_detail(exit: &ExitObservation, tail: &[String]) -> String {
    let mut detail = match exit {
        ExitObservation::Exited { code: Some(code) } => format!("ffmpeg exited with code {}", code),
        ExitObservation::Exited { code: None } => "ffmpeg was terminated by a signal".to_string(),
        ExitObservation::WaitFailed { message } => format!("Process error: {}", message),
    };
    if !tail.is_empty() {
        detail.push('\n');
        detail.push_str(&tail.join("\n"));
    }
    detail
}

/// Timing and buffer limits a worker runs with
#[derive(Debug, Clone, Copy)]
pub(crate) struct WorkerLimits {
    pub cancel_grace: Duration,
    pub tail_lines: usize,
    pub drain_timeout: Duration,
}

/// Background owner of the subprocess and its diagnostic stream
pub(crate) struct JobWorker {
    slot: Arc<JobSlot>,
    child: Child,
    cancel_rx: oneshot::Receiver<()>,
    emitter: EventEmitter,
    limits: WorkerLimits,
}

impl JobWorker {
    pub(crate) fn new(
        slot: Arc<JobSlot>,
        child: Child,
        cancel_rx: oneshot::Receiver<()>,
        emitter: EventEmitter,
        limits: WorkerLimits,
    ) -> Self {
        Self {
            slot,
            child,
            cancel_rx,
            emitter,
            limits,
        }
    }

    /// Drive the job to a terminal state; returns that state
    pub(crate) async fn run(mut self) -> JobState {
        let job_id = self.slot.id;
        let tracker = ProgressTracker::new(job_id, self.slot.params.progress_span());

        let reader = self.child.stderr.take().map(|stderr| {
            tokio::spawn(read_diagnostics(
                stderr,
                tracker,
                self.emitter.clone(),
                self.limits.tail_lines,
            ))
        });

        let exit = self.wait_for_exit().await;
        debug!(job_id = %job_id, ?exit, "Transcoder exited");

        let tail: Vec<String> = match reader {
            Some(mut handle) => {
                match tokio::time::timeout(self.limits.drain_timeout, &mut handle).await {
                    Ok(Ok(tail)) => tail.into(),
                    Ok(Err(e)) => {
                        warn!(job_id = %job_id, error = %e, "Diagnostic reader failed");
                        Vec::new()
                    }
                    Err(_) => {
                        warn!(job_id = %job_id, "Diagnostic stream still open after exit, dropping reader");
                        handle.abort();
                        let _ = handle.await;
                        Vec::new()
                    }
                }
            }
            None => Vec::new(),
        };

        let state = self.slot.finish(&exit, &tail, &self.emitter);
        info!(job_id = %job_id, %state, "Job finished");
        state
    }

    async fn wait_for_exit(&mut self) -> ExitObservation {
        tokio::select! {
            status = self.child.wait() => return observe(status),
            Ok(()) = &mut self.cancel_rx => {}
        }

        request_termination(&mut self.child);

        match tokio::time::timeout(self.limits.cancel_grace, self.child.wait()).await {
            Ok(status) => observe(status),
            Err(_) => {
                warn!(
                    job_id = %self.slot.id,
                    grace_ms = self.limits.cancel_grace.as_millis() as u64,
                    "Transcoder ignored termination, killing"
                );
                force_kill(&mut self.child);
                observe(self.child.wait().await)
            }
        }
    }
}

fn observe(status: std::io::Result<std::process::ExitStatus>) -> ExitObservation {
    match status {
        Ok(status) => ExitObservation::Exited {
            code: status.code(),
        },
        Err(e) => {
            error!(error = %e, "Failed to wait for transcoder");
            ExitObservation::WaitFailed {
                message: e.to_string(),
            }
        }
    }
}

async fn read_diagnostics<R: AsyncRead + Unpin>(
    stderr: R,
    mut tracker: ProgressTracker,
    emitter: EventEmitter,
    tail_lines: usize,
) -> VecDeque<String> {
    let mut lines = DiagnosticLines::new(stderr);
    let mut tail = VecDeque::with_capacity(tail_lines);

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                trace!(%line, "ffmpeg");
                if let Some(sample) = tracker.observe(&line) {
                    emitter.emit(JobEvent::Progress(sample));
                }
                if tail.len() == tail_lines {
                    tail.pop_front();
                }
                if tail_lines > 0 {
                    tail.push_back(line);
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Error reading diagnostic stream");
                break;
            }
        }
    }

    tail
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot() -> (JobSlot, oneshot::Receiver<()>) {
        let params = Arc::new(ProcessingParams::new("a.mp4", "b.mp4").with_trim(10.0, 20.0));
        let (slot, rx) = JobSlot::new(JobId::new(), params, Some(42));
        slot.mark_running().unwrap();
        (slot, rx)
    }

    #[test]
    fn test_cancel_is_idempotent_and_signals_once() {
        let (slot, mut rx) = slot();

        assert_eq!(slot.request_cancel(), CancelOutcome::Requested);
        assert_eq!(slot.request_cancel(), CancelOutcome::AlreadyRequested);
        assert!(rx.try_recv().is_ok());
        assert!(slot.snapshot().cancel_requested);
    }

    #[test]
    fn test_cancel_after_exit_overrides_success() {
        let (slot, _rx) = slot();
        let emitter = EventEmitter::new();
        let mut sub = emitter.subscribe();

        slot.request_cancel();
        let state = slot.finish(&ExitObservation::Exited { code: Some(0) }, &[], &emitter);

        assert_eq!(state, JobState::Cancelled);
        assert_eq!(
            sub.try_recv(),
            Some(JobEvent::Cancelled { job_id: slot.id })
        );
    }

    #[test]
    fn test_finish_emits_exactly_one_terminal_event() {
        let (slot, _rx) = slot();
        let emitter = EventEmitter::new();
        let mut sub = emitter.subscribe();

        let exit = ExitObservation::Exited { code: Some(0) };
        assert_eq!(slot.finish(&exit, &[], &emitter), JobState::Completed);
        assert_eq!(slot.finish(&exit, &[], &emitter), JobState::Completed);

        assert!(sub.try_recv().is_some());
        assert!(sub.try_recv().is_none());
        assert_eq!(slot.request_cancel(), CancelOutcome::NotRunning);
    }

    #[test]
    fn test_failed_event_carries_diagnostic_tail() {
        let (slot, _rx) = slot();
        let emitter = EventEmitter::new();
        let mut sub = emitter.subscribe();
        let tail = vec!["a.mp4: No such file or directory".to_string()];

        slot.finish(&ExitObservation::Exited { code: Some(1) }, &tail, &emitter);

        match sub.try_recv() {
            Some(JobEvent::Failed { job_id, error }) => {
                assert_eq!(job_id, slot.id);
                assert!(error.starts_with("ffmpeg exited with code 1"));
                assert!(error.contains("No such file or directory"));
            }
            other => panic!("expected failed event, got {other:?}"),
        }
    }

    #[test]
    fn test_failure_detail_variants() {
        assert_eq!(
            failure_detail(&ExitObservation::Exited { code: None }, &[]),
            "ffmpeg was terminated by a signal"
        );
        assert_eq!(
            failure_detail(
                &ExitObservation::WaitFailed {
                    message: "broken".to_string()
                },
                &[]
            ),
            "Process error: broken"
        );
    }

    #[tokio::test]
    async fn test_reader_emits_progress_and_keeps_bounded_tail() {
        let emitter = EventEmitter::new();
        let mut sub = emitter.subscribe();
        let job_id = JobId::new();
        let tracker = ProgressTracker::new(job_id, Some(10.0));
        let stream: &[u8] = b"header\nframe=1 time=00:00:05.00\rtrailer one\ntrailer two\n";

        let tail = read_diagnostics(stream, tracker, emitter.clone(), 2).await;

        assert_eq!(
            tail,
            VecDeque::from(vec!["trailer one".to_string(), "trailer two".to_string()])
        );
        match sub.try_recv() {
            Some(JobEvent::Progress(sample)) => {
                assert_eq!(sample.job_id, job_id);
                assert_eq!(sample.elapsed_seconds, 5.0);
                assert!((sample.percent - 50.0).abs() < 1e-9);
            }
            other => panic!("expected progress, got {other:?}"),
        }
        assert!(sub.try_recv().is_none());
    }
}
