//! Cadre Core - goal delegation and recurring tasks for teams of workers
//!
//! A team pairs a domain [`Playbook`] with a set of [`Worker`]s. The
//! playbook turns a free-text goal into typed task specs; the
//! [`Orchestrator`] routes each task to the least-loaded worker that
//! declares the task's type as a capability, runs it, and hands the
//! finished tasks back to the playbook to build a [`GoalReport`].
//!
//! The [`Scheduler`] runs named jobs on fixed intervals with a bounded run
//! history, so a goal can be re-executed on a cadence.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use cadre_core::{metadata, EchoWorker, Orchestrator, RepositoryPlaybook};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> cadre_core::Result<()> {
//! let mut team = Orchestrator::new(RepositoryPlaybook::new("payments-api"));
//! team.register_worker("reviewer", Arc::new(EchoWorker::new("reviewer")), ["code_review"])?;
//!
//! let report = team
//!     .execute_goal("review the latest PR", &metadata(json!({"pr_number": 42, "check_docs": false})))
//!     .await?;
//!
//! assert_eq!(report.summary.successful, 1);
//! # Ok(())
//! # }
//! ```
//!
//! # Layers
//!
//! 1. **Tasks** (`task`): task specs, records and the status state machine
//! 2. **Teams** (`team`): workers, capability registry, delegation and execution
//! 3. **Playbooks** (`playbook`): goal planning and result aggregation per domain
//! 4. **Scheduler** (`scheduler`): interval jobs with a cancellable poll loop

#![deny(unsafe_code)]
#![warn(rust_2018_idioms, missing_debug_implementations)]

pub mod config;
pub mod error;
pub mod playbook;
pub mod scheduler;
pub mod task;
pub mod team;
pub mod types;

// Re-export commonly used types for convenience
pub use config::{MemberConfig, OrchestratorConfig, SchedulerConfig, TeamConfig};
pub use error::{CadreError, Result};
pub use playbook::{
    BakeryPlaybook, GoalReport, Playbook, RepositoryPlaybook, StorePlaybook, Summary,
};
pub use scheduler::{action_fn, Interval, JobAction, JobInfo, JobSpec, Scheduler};
pub use task::{Task, TaskPriority, TaskSpec, TaskStatus};
pub use team::{EchoWorker, FailingWorker, Orchestrator, TeamFactory, TeamStatus, Worker};
pub use types::{metadata, ContextExt, Metadata, Timestamp};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
