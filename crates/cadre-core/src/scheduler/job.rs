//! Recurring jobs

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{Metadata, Timestamp};

/// Work performed by a job
#[async_trait]
pub trait JobAction: Send + Sync {
    async fn run(&self, args: &[Value], kwargs: &Metadata) -> anyhow::Result<Value>;
}

/// Adapter that lets a plain closure act as a [`JobAction`]
pub struct FnAction<F>(F);

impl<F> fmt::Debug for FnAction<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnAction")
    }
}

#[async_trait]
impl<F> JobAction for FnAction<F>
where
    F: Fn(&[Value], &Metadata) -> anyhow::Result<Value> + Send + Sync,
{
    async fn run(&self, args: &[Value], kwargs: &Metadata) -> anyhow::Result<Value> {
        (self.0)(args, kwargs)
    }
}

/// Wrap a synchronous closure as a job action
pub fn action_fn<F>(f: F) -> FnAction<F>
where
    F: Fn(&[Value], &Metadata) -> anyhow::Result<Value> + Send + Sync,
{
    FnAction(f)
}

/// Time between runs of a recurring job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interval {
    Seconds(u64),
    Minutes(u64),
    Hours(u64),
}

impl Interval {
    pub fn is_zero(self) -> bool {
        matches!(
            self,
            Interval::Seconds(0) | Interval::Minutes(0) | Interval::Hours(0)
        )
    }

    /// `None` if the interval overflows a chrono duration
    pub fn to_duration(self) -> Option<Duration> {
        let secs = match self {
            Interval::Seconds(n) => Some(n),
            Interval::Minutes(n) => n.checked_mul(60),
            Interval::Hours(n) => n.checked_mul(3600),
        }?;
        Duration::try_seconds(i64::try_from(secs).ok()?)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interval::Seconds(n) => write!(f, "every_{n}s"),
            Interval::Minutes(n) => write!(f, "every_{n}m"),
            Interval::Hours(n) => write!(f, "every_{n}h"),
        }
    }
}

/// Description of a job to add to the scheduler
pub struct JobSpec {
    pub(crate) name: String,
    pub(crate) action: Arc<dyn JobAction>,
    pub(crate) args: Vec<Value>,
    pub(crate) kwargs: Metadata,
    pub(crate) interval: Option<Interval>,
    pub(crate) run_immediately: bool,
}

impl JobSpec {
    /// A one-shot job; call [`every`](Self::every) to make it recurring
    pub fn new(name: impl Into<String>, action: impl JobAction + 'static) -> Self {
        Self {
            name: name.into(),
            action: Arc::new(action),
            args: Vec::new(),
            kwargs: Metadata::new(),
            interval: None,
            run_immediately: false,
        }
    }

    pub fn every(mut self, interval: Interval) -> Self {
        self.interval = Some(interval);
        self
    }

    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }

    pub fn with_kwargs(mut self, kwargs: Metadata) -> Self {
        self.kwargs = kwargs;
        self
    }

    /// First run on the next tick instead of one interval from now
    pub fn run_immediately(mut self) -> Self {
        self.run_immediately = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for JobSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobSpec")
            .field("name", &self.name)
            .field("interval", &self.interval)
            .field("run_immediately", &self.run_immediately)
            .finish()
    }
}

/// A job registered with the scheduler
pub(crate) struct Job {
    pub(crate) name: String,
    pub(crate) action: Arc<dyn JobAction>,
    pub(crate) args: Vec<Value>,
    pub(crate) kwargs: Metadata,
    pub(crate) interval: Option<Interval>,
    pub(crate) period: Option<Duration>,
    pub(crate) next_run: Option<Timestamp>,
    pub(crate) last_run: Option<Timestamp>,
    pub(crate) run_count: u64,
    pub(crate) enabled: bool,
    running: Arc<AtomicBool>,
}

/// Exclusive right to run one job, released on drop
pub(crate) struct RunClaim(Arc<AtomicBool>);

impl Drop for RunClaim {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Job {
    /// `period` is the already validated duration of `spec.interval`.
    ///
    /// `None` when one period from `now` is past the latest representable
    /// time.
    pub(crate) fn new(spec: JobSpec, period: Option<Duration>, now: Timestamp) -> Option<Self> {
        let first = match period {
            Some(p) => Some(now.checked_add_signed(p)?),
            None => None,
        };
        let next_run = if spec.run_immediately {
            Some(now)
        } else {
            // a one-shot job without run_immediately waits for a manual trigger
            first
        };

        Some(Self {
            name: spec.name,
            action: spec.action,
            args: spec.args,
            kwargs: spec.kwargs,
            interval: spec.interval,
            period,
            next_run,
            last_run: None,
            run_count: 0,
            enabled: true,
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Mark the job as running. `None` while another run is in flight.
    pub(crate) fn claim(&self) -> Option<RunClaim> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunClaim(self.running.clone()))
    }

    /// Whether `claim` was taken on this job and not on an earlier job of
    /// the same name
    pub(crate) fn holds(&self, claim: &RunClaim) -> bool {
        Arc::ptr_eq(&self.running, &claim.0)
    }

    pub(crate) fn is_due(&self, now: Timestamp) -> bool {
        self.enabled && self.next_run.is_some_and(|t| t <= now)
    }

    /// A next run past the latest representable time means no further runs
    pub(crate) fn record_success(&mut self, at: Timestamp) {
        self.last_run = Some(at);
        self.run_count += 1;
        self.next_run = self.period.and_then(|p| at.checked_add_signed(p));
    }

    pub(crate) fn info(&self) -> JobInfo {
        JobInfo {
            name: self.name.clone(),
            interval_description: self
                .interval
                .map(|i| i.to_string())
                .unwrap_or_else(|| "once".to_string()),
            last_run: self.last_run,
            next_run: self.next_run,
            run_count: self.run_count,
            enabled: self.enabled,
        }
    }
}

/// Public view of a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobInfo {
    pub name: String,
    pub interval_description: String,
    pub last_run: Option<Timestamp>,
    pub next_run: Option<Timestamp>,
    pub run_count: u64,
    pub enabled: bool,
}
