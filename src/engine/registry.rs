//! Job registry: the single source of truth for which jobs are running

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::Notify;
use tracing::{info, warn};

use crate::adapters::exec_ffmpeg::spawn_transcoder;
use crate::domain::model::{BusyPolicy, JobId, JobSnapshot, ProcessingParams};
use crate::engine::command::build_ffmpeg_args;
use crate::engine::events::{EventEmitter, Subscription};
use crate::engine::job::{JobSlot, JobWorker, WorkerLimits};
use crate::engine::EngineConfig;
use crate::error::{SubtrimError, SubtrimResult};

pub use crate::engine::job::CancelOutcome;

type Slots = HashMap<JobId, Arc<JobSlot>>;

/// Thread-safe map of job id to job.
///
/// Lock order is map, then job. The exit handler releases the job lock
/// before it takes the map lock to clear its slot.
#[derive(Clone)]
pub struct JobRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    config: EngineConfig,
    emitter: EventEmitter,
    jobs: Mutex<Slots>,
    idle: Notify,
}

impl RegistryInner {
    fn jobs(&self) -> MutexGuard<'_, Slots> {
        self.jobs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl JobRegistry {
    pub fn new(config: EngineConfig, emitter: EventEmitter) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                config,
                emitter,
                jobs: Mutex::new(HashMap::new()),
                idle: Notify::new(),
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn emitter(&self) -> &EventEmitter {
        &self.inner.emitter
    }

    pub fn subscribe(&self) -> Subscription {
        self.inner.emitter.subscribe()
    }

    /// Validate, spawn ffmpeg and register the job as running.
    ///
    /// Returns as soon as the process is launched. Spawn failures are
    /// returned here and the job is never registered. Must be called from
    /// within a tokio runtime.
    pub fn start(&self, params: ProcessingParams) -> SubtrimResult<JobId> {
        let config = &self.inner.config;
        let args = build_ffmpeg_args(&params, &config.encoding)?;

        let mut jobs = self.inner.jobs();
        let active: Vec<Arc<JobSlot>> = jobs
            .values()
            .filter(|slot| !slot.state().is_terminal())
            .cloned()
            .collect();

        if let (Some(first), BusyPolicy::RejectIfBusy) = (active.first(), config.busy_policy) {
            let active_id = first.snapshot().id;
            warn!(active = %active_id, "Rejecting start, a job is already running");
            return Err(SubtrimError::Busy { active: active_id });
        }

        // A failed spawn leaves running jobs untouched.
        let id = JobId::new();
        let child = spawn_transcoder(&config.ffmpeg_path, &args)?;
        let pid = child.id();

        for slot in &active {
            let outcome = slot.request_cancel();
            info!(superseded = %slot.snapshot().id, ?outcome, "Superseding running job");
        }

        let (slot, cancel_rx) = JobSlot::new(id, Arc::new(params), pid);
        slot.mark_running()?;
        let slot = Arc::new(slot);
        jobs.insert(id, Arc::clone(&slot));
        drop(jobs);

        info!(job_id = %id, pid, "Job started");

        let limits = WorkerLimits {
            cancel_grace: config.cancel_grace,
            tail_lines: config.diagnostic_tail_lines,
            drain_timeout: config.reader_drain_timeout,
        };
        let worker = JobWorker::new(slot, child, cancel_rx, self.inner.emitter.clone(), limits);
        let registry = self.clone();
        tokio::spawn(async move {
            worker.run().await;
            registry.release(id);
        });

        Ok(id)
    }

    /// Snapshot of a job, `None` when unknown
    pub fn get(&self, id: JobId) -> Option<JobSnapshot> {
        self.inner.jobs().get(&id).map(|slot| slot.snapshot())
    }

    /// Drop a finished job's slot. Jobs still running are left in place.
    pub fn remove(&self, id: JobId) -> Option<JobSnapshot> {
        let mut jobs = self.inner.jobs();
        let finished = jobs.get(&id).map(|slot| slot.state().is_terminal())?;
        if !finished {
            return None;
        }
        let removed = jobs.remove(&id).map(|slot| slot.snapshot());
        let now_idle = jobs.is_empty();
        drop(jobs);
        if now_idle {
            self.inner.idle.notify_waiters();
        }
        removed
    }

    /// Request cancellation; a no-op for unknown or finished jobs
    pub fn cancel(&self, id: JobId) -> CancelOutcome {
        let slot = self.inner.jobs().get(&id).cloned();
        match slot {
            Some(slot) => slot.request_cancel(),
            None => CancelOutcome::NotFound,
        }
    }

    /// Cancel every running job; returns how many were newly cancelled
    pub fn cancel_all(&self) -> usize {
        let slots: Vec<Arc<JobSlot>> = self.inner.jobs().values().cloned().collect();
        slots
            .iter()
            .filter(|slot| slot.request_cancel() == CancelOutcome::Requested)
            .count()
    }

    /// Jobs that have not reached a terminal state
    pub fn active_jobs(&self) -> Vec<JobSnapshot> {
        self.inner
            .jobs()
            .values()
            .map(|slot| slot.snapshot())
            .filter(|snapshot| !snapshot.state.is_terminal())
            .collect()
    }

    pub fn is_busy(&self) -> bool {
        self.inner
            .jobs()
            .values()
            .any(|slot| !slot.state().is_terminal())
    }

    pub fn len(&self) -> usize {
        self.inner.jobs().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.jobs().is_empty()
    }

    /// Wait until every slot has been cleared
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            if self.is_empty() {
                return;
            }
            notified.await;
        }
    }

    /// Cancel all jobs and wait for them to clear; false on timeout
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        let cancelled = self.cancel_all();
        if cancelled > 0 {
            info!(cancelled, "Cancelling jobs for shutdown");
        }
        let drained = tokio::time::timeout(timeout, self.wait_idle()).await.is_ok();
        if !drained {
            warn!(remaining = self.len(), "Jobs still running at shutdown");
        }
        drained
    }

    fn release(&self, id: JobId) {
        let now_idle = {
            let mut jobs = self.inner.jobs();
            jobs.remove(&id);
            jobs.is_empty()
        };
        if now_idle {
            self.inner.idle.notify_waiters();
        }
    }
}
