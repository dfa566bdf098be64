//! Playbooks - per-domain goal planning and result aggregation
//!
//! A playbook turns a free-form goal plus a context map into an ordered list
//! of [`TaskSpec`]s, and folds the finished tasks back into a [`GoalReport`].
//! Both halves are pure: no I/O and no worker calls.
//!
//! Goals are routed through an ordered trigger table. The first trigger
//! whose words all appear (case-insensitively) in the goal picks the bundle;
//! a goal matching nothing becomes a single `general` task.

pub mod bakery;
pub mod report;
pub mod repository;
pub mod store;

pub use bakery::BakeryPlaybook;
pub use report::{DomainMetrics, FailureRecord, GoalReport, Summary, TaskOutcome};
pub use repository::RepositoryPlaybook;
pub use store::StorePlaybook;

use serde_json::Value;

use crate::task::{Task, TaskSpec};
use crate::types::Metadata;

/// Task type emitted for goals no trigger recognises
pub const GENERAL_TASK_TYPE: &str = "general";

/// Domain planner and aggregator used by an orchestrator
pub trait Playbook: Send + Sync {
    /// Display name of the team this playbook drives
    fn team_name(&self) -> &str;

    /// Decompose a goal into ordered task specs. Deterministic.
    fn plan(&self, goal: &str, context: &Metadata) -> Vec<TaskSpec>;

    /// Fold the tasks of one goal into a report
    fn aggregate(&self, tasks: &[Task]) -> GoalReport;
}

/// A goal trigger: alternatives, each matching when all of its words occur
#[derive(Debug, Clone, Copy)]
pub struct Trigger {
    alternatives: &'static [&'static [&'static str]],
}

impl Trigger {
    pub const fn new(alternatives: &'static [&'static [&'static str]]) -> Self {
        Self { alternatives }
    }

    /// `goal` must already be lowercased
    pub fn matches(&self, goal: &str) -> bool {
        self.alternatives
            .iter()
            .any(|words| words.iter().all(|w| goal.contains(w)))
    }
}

/// First route whose trigger matches `goal`
pub fn route<R: Copy>(goal: &str, table: &[(Trigger, R)]) -> Option<R> {
    let goal = goal.to_lowercase();
    table
        .iter()
        .find(|(trigger, _)| trigger.matches(&goal))
        .map(|(_, route)| *route)
}

/// Fallback plan: the goal itself as one task, context forwarded unchanged
pub fn general_task(goal: &str, context: &Metadata) -> TaskSpec {
    tracing::warn!("Unknown goal pattern: {}. Using general task planning.", goal);
    TaskSpec::new(GENERAL_TASK_TYPE, goal).with_metadata(context.clone())
}

/// String field of a loosely shaped JSON object, or `default`
pub(crate) fn str_field(value: &Value, key: &str, default: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or(default)
        .to_string()
}
