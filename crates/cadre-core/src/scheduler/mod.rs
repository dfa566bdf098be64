//! Recurring task engine
//!
//! Runs named jobs on fixed intervals. A poll loop wakes every
//! `tick_interval_ms`, runs every enabled job whose `next_run` has passed,
//! and records each run in a bounded history.
//!
//! Job-table and history mutations happen under one lock, but actions run
//! with the lock released so they may call back into the scheduler. A job is
//! claimed under the lock before its action starts and the claim is held
//! until its `next_run` is committed, so overlapping
//! [`run_due`](Scheduler::run_due) and [`run_job`](Scheduler::run_job) calls
//! never run the same job twice.

pub mod history;
pub mod job;

pub use history::{HistoryEntry, RunOutcome};
pub use job::{action_fn, FnAction, Interval, JobAction, JobInfo, JobSpec};

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Instrument, Span};

use crate::config::SchedulerConfig;
use crate::error::SchedulerError;
use crate::types::{now, Metadata};
use history::History;
use job::{Job, RunClaim};

/// Handle to a recurring task engine. Clones share the same jobs and loop.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

struct Inner {
    config: SchedulerConfig,
    state: Mutex<SchedulerState>,
    runner: Mutex<Option<Runner>>,
    span: Span,
}

struct SchedulerState {
    jobs: Vec<Job>,
    history: History,
}

/// A claimed job's inputs, copied out so the action runs unlocked
struct PendingRun {
    name: String,
    action: Arc<dyn JobAction>,
    args: Vec<Value>,
    kwargs: Metadata,
    run_count: u64,
    claim: RunClaim,
}

impl PendingRun {
    fn claim(job: &Job) -> Option<Self> {
        Some(Self {
            claim: job.claim()?,
            name: job.name.clone(),
            action: job.action.clone(),
            args: job.args.clone(),
            kwargs: job.kwargs.clone(),
            run_count: job.run_count,
        })
    }
}

struct Runner {
    cancel: CancellationToken,
    /// `None` when the loop runs in a caller's task via `run_blocking`
    handle: Option<JoinHandle<()>>,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self::with_span(config, tracing::info_span!("scheduler"))
    }

    /// Log inside `span` instead of the default `scheduler` span
    pub fn with_span(config: SchedulerConfig, span: Span) -> Self {
        let history = History::new(config.history_capacity);
        Self {
            inner: Arc::new(Inner {
                config,
                state: Mutex::new(SchedulerState {
                    jobs: Vec::new(),
                    history,
                }),
                runner: Mutex::new(None),
                span,
            }),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }

    /// Register a job, replacing any job with the same name in place.
    pub async fn add_job(&self, spec: JobSpec) -> Result<(), SchedulerError> {
        let period = match spec.interval {
            Some(interval) if interval.is_zero() => {
                return Err(SchedulerError::InvalidInterval(spec.name));
            }
            Some(interval) => Some(
                interval
                    .to_duration()
                    .ok_or_else(|| SchedulerError::InvalidInterval(spec.name.clone()))?,
            ),
            None => None,
        };

        let name = spec.name.clone();
        let job = Job::new(spec, period, now())
            .ok_or_else(|| SchedulerError::InvalidInterval(name.clone()))?;
        let description = job.info().interval_description;

        let mut guard = self.inner.state.lock().await;
        let state = &mut *guard;
        match state.jobs.iter().position(|j| j.name == job.name) {
            Some(idx) => state.jobs[idx] = job,
            None => state.jobs.push(job),
        }

        info!(parent: &self.inner.span, "Added job: {} ({})", name, description);
        Ok(())
    }

    /// Remove a job. Returns whether it existed.
    pub async fn remove_job(&self, name: &str) -> bool {
        let mut state = self.inner.state.lock().await;
        let before = state.jobs.len();
        state.jobs.retain(|j| j.name != name);
        let removed = state.jobs.len() < before;
        if removed {
            info!(parent: &self.inner.span, "Removed job: {}", name);
        }
        removed
    }

    /// Pause or resume a job's automatic runs
    pub async fn set_enabled(&self, name: &str, enabled: bool) -> Result<(), SchedulerError> {
        let mut state = self.inner.state.lock().await;
        let job = state
            .jobs
            .iter_mut()
            .find(|j| j.name == name)
            .ok_or_else(|| SchedulerError::UnknownJob(name.to_string()))?;
        job.enabled = enabled;
        Ok(())
    }

    /// Run every enabled job that is due, in insertion order.
    ///
    /// A failing job is recorded in history and the remaining due jobs still
    /// run; the first failure is then returned. A failed job keeps its
    /// `next_run`, so it is retried on the next tick. Jobs already running
    /// elsewhere are skipped.
    pub async fn run_due(&self) -> Result<BTreeMap<String, Value>, SchedulerError> {
        let span = self.inner.span.clone();
        async {
            let pending: Vec<PendingRun> = {
                let state = self.inner.state.lock().await;
                let at = now();
                state
                    .jobs
                    .iter()
                    .filter(|j| j.is_due(at))
                    .filter_map(PendingRun::claim)
                    .collect()
            };

            let mut results = BTreeMap::new();
            let mut first_error = None;
            for run in pending {
                let name = run.name.clone();
                match self.execute(run).await {
                    Ok(value) => {
                        results.insert(name, value);
                    }
                    Err(e) => {
                        first_error.get_or_insert(e);
                    }
                }
            }

            match first_error {
                Some(e) => Err(e),
                None => Ok(results),
            }
        }
        .instrument(span)
        .await
    }

    /// Run one job now, whether or not it is due or enabled
    pub async fn run_job(&self, name: &str) -> Result<Value, SchedulerError> {
        let span = self.inner.span.clone();
        async {
            let run = {
                let state = self.inner.state.lock().await;
                let job = state
                    .jobs
                    .iter()
                    .find(|j| j.name == name)
                    .ok_or_else(|| SchedulerError::UnknownJob(name.to_string()))?;
                PendingRun::claim(job)
                    .ok_or_else(|| SchedulerError::JobRunning(name.to_string()))?
            };
            self.execute(run).await
        }
        .instrument(span)
        .await
    }

    /// Spawn the poll loop onto the current Tokio runtime and return.
    ///
    /// Starting a running scheduler logs a warning and does nothing.
    pub async fn start(&self) {
        let mut runner = self.inner.runner.lock().await;
        if runner.is_some() {
            warn!(parent: &self.inner.span, "Scheduler already running");
            return;
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(self.clone().poll(cancel.clone()));
        *runner = Some(Runner {
            cancel,
            handle: Some(handle),
        });
        info!(parent: &self.inner.span, "Scheduler started");
    }

    /// Run the poll loop in the caller's task until [`stop`](Self::stop) is
    /// called from elsewhere.
    pub async fn run_blocking(&self) {
        let cancel = {
            let mut runner = self.inner.runner.lock().await;
            if runner.is_some() {
                warn!(parent: &self.inner.span, "Scheduler already running");
                return;
            }
            let cancel = CancellationToken::new();
            *runner = Some(Runner {
                cancel: cancel.clone(),
                handle: None,
            });
            cancel
        };

        info!(parent: &self.inner.span, "Scheduler started (blocking)");
        self.clone().poll(cancel).await;
    }

    /// Stop the poll loop and wait up to `stop_timeout_secs` for it to exit.
    ///
    /// A job already running is allowed to finish. Idempotent.
    pub async fn stop(&self) {
        let Some(runner) = self.inner.runner.lock().await.take() else {
            return;
        };
        runner.cancel.cancel();

        if let Some(handle) = runner.handle {
            let timeout = Duration::from_secs(self.inner.config.stop_timeout_secs);
            match tokio::time::timeout(timeout, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(parent: &self.inner.span, "Poll loop ended abnormally: {}", e),
                Err(_) => warn!(
                    parent: &self.inner.span,
                    "Poll loop did not exit within {:?}", timeout
                ),
            }
        }
        info!(parent: &self.inner.span, "Scheduler stopped");
    }

    pub async fn is_running(&self) -> bool {
        self.inner.runner.lock().await.is_some()
    }

    /// Snapshot of every job, in insertion order
    pub async fn get_jobs(&self) -> Vec<JobInfo> {
        let state = self.inner.state.lock().await;
        state.jobs.iter().map(Job::info).collect()
    }

    /// The newest `limit` history entries, oldest first
    pub async fn get_history(&self, limit: usize) -> Vec<HistoryEntry> {
        self.inner.state.lock().await.history.tail(limit)
    }

    pub async fn job_count(&self) -> usize {
        self.inner.state.lock().await.jobs.len()
    }

    /// Run a claimed job's action, then commit the outcome under the lock
    async fn execute(&self, run: PendingRun) -> Result<Value, SchedulerError> {
        info!("Executing job: {}", run.name);

        let outcome = AssertUnwindSafe(run.action.run(&run.args, &run.kwargs))
            .catch_unwind()
            .await;
        let outcome = match outcome {
            Ok(result) => result.map_err(|e| e.to_string()),
            Err(_) => Err("job action panicked".to_string()),
        };

        let mut guard = self.inner.state.lock().await;
        let state = &mut *guard;
        // gone if removed or replaced while the action ran
        let job = state.jobs.iter_mut().find(|j| j.holds(&run.claim));

        match outcome {
            Ok(value) => {
                let run_count = match job {
                    Some(job) => {
                        job.record_success(now());
                        job.run_count
                    }
                    None => run.run_count + 1,
                };
                info!("Job {} completed (run {})", run.name, run_count);
                state
                    .history
                    .push(HistoryEntry::success(run.name.as_str(), run_count));
                Ok(value)
            }
            Err(message) => {
                error!("Job {} failed: {}", run.name, message);
                state
                    .history
                    .push(HistoryEntry::failure(run.name.as_str(), message.as_str()));
                Err(SchedulerError::JobFailed {
                    name: run.name,
                    message,
                })
            }
        }
    }

    async fn poll(self, cancel: CancellationToken) {
        let span = self.inner.span.clone();
        async move {
            let period = Duration::from_millis(self.inner.config.tick_interval_ms.max(1));
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            debug!("Poll loop running every {:?}", period);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = self.run_due().await {
                            error!("Scheduler error: {}", e);
                        }
                    }
                }
            }
            debug!("Poll loop exited");
        }
        .instrument(span)
        .await
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}
