//! Task records and their state machine
//!
//! ```text
//! PENDING ──> DELEGATED ──> IN_PROGRESS ──> COMPLETED
//!    │                           │
//!    └──────────> FAILED <───────┘
//! ```
//!
//! A task is created from a [`TaskSpec`] emitted by a playbook. The delegator
//! moves it out of `Pending`, the executor drives it to a terminal state.
//! Nothing else mutates it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::TaskError;
use crate::types::{now, Metadata, Timestamp};

/// Task execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Delegated,
    InProgress,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (self, next),
            (Pending, Delegated)
                | (Pending, Failed)
                | (Delegated, InProgress)
                | (InProgress, Completed)
                | (InProgress, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Delegated => "delegated",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task priority levels
///
/// Informational only: tasks run in the order the playbook emitted them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskPriority {
    Low = 1,
    #[default]
    Medium = 2,
    High = 3,
    Critical = 4,
}

/// A task as planned, before the orchestrator gives it an identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Human-readable description
    pub description: String,

    /// Routing tag matched against worker capabilities
    pub task_type: String,

    /// Priority (not used for ordering)
    pub priority: TaskPriority,

    /// Arguments forwarded verbatim to the worker
    pub metadata: Metadata,
}

impl TaskSpec {
    pub fn new(task_type: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            task_type: task_type.into(),
            priority: TaskPriority::Medium,
            metadata: Metadata::new(),
        }
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A unit of delegated work
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Task {
    id: String,
    description: String,
    task_type: String,
    priority: TaskPriority,
    status: TaskStatus,
    assigned_worker: Option<String>,
    created_at: Timestamp,
    completed_at: Option<Timestamp>,
    result: Option<Value>,
    error: Option<String>,
    metadata: Metadata,
}

impl Task {
    /// Create a pending task from a planned spec
    pub fn new(id: impl Into<String>, spec: TaskSpec) -> Self {
        Self {
            id: id.into(),
            description: spec.description,
            task_type: spec.task_type,
            priority: spec.priority,
            status: TaskStatus::Pending,
            assigned_worker: None,
            created_at: now(),
            completed_at: None,
            result: None,
            error: None,
            metadata: spec.metadata,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn task_type(&self) -> &str {
        &self.task_type
    }

    pub fn priority(&self) -> TaskPriority {
        self.priority
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn assigned_worker(&self) -> Option<&str> {
        self.assigned_worker.as_deref()
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn completed_at(&self) -> Option<Timestamp> {
        self.completed_at
    }

    /// Success payload, present iff the task completed
    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    /// Failure reason, present iff the task failed
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// PENDING -> DELEGATED
    pub fn mark_delegated(&mut self, worker: impl Into<String>) -> Result<(), TaskError> {
        self.transition(TaskStatus::Delegated)?;
        self.assigned_worker = Some(worker.into());
        Ok(())
    }

    /// PENDING -> FAILED, when no worker can take the task
    pub fn mark_unroutable(&mut self, error: impl Into<String>) -> Result<(), TaskError> {
        self.transition(TaskStatus::Failed)?;
        self.error = Some(error.into());
        Ok(())
    }

    /// DELEGATED -> IN_PROGRESS
    pub fn start(&mut self) -> Result<(), TaskError> {
        self.transition(TaskStatus::InProgress)
    }

    /// IN_PROGRESS -> COMPLETED
    pub fn complete(&mut self, result: Value) -> Result<(), TaskError> {
        self.transition(TaskStatus::Completed)?;
        self.result = Some(result);
        self.completed_at = Some(now());
        Ok(())
    }

    /// IN_PROGRESS -> FAILED
    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), TaskError> {
        self.transition(TaskStatus::Failed)?;
        self.error = Some(error.into());
        self.completed_at = Some(now());
        Ok(())
    }

    fn transition(&mut self, next: TaskStatus) -> Result<(), TaskError> {
        if !self.status.can_transition_to(next) {
            return Err(TaskError::InvalidTransition {
                id: self.id.clone(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec() -> TaskSpec {
        TaskSpec::new("recipe_scale", "Scale recipe: rye")
            .with_priority(TaskPriority::High)
            .with_arg("servings", 40)
    }

    #[test]
    fn test_new_task_is_pending() {
        let task = Task::new("task_1", spec());
        assert_eq!(task.status(), TaskStatus::Pending);
        assert_eq!(task.priority(), TaskPriority::High);
        assert_eq!(task.metadata()["servings"], json!(40));
        assert!(task.result().is_none());
        assert!(task.error().is_none());
        assert!(task.assigned_worker().is_none());
    }

    #[test]
    fn test_happy_path() {
        let mut task = Task::new("task_1", spec());
        task.mark_delegated("baker").unwrap();
        assert_eq!(task.assigned_worker(), Some("baker"));
        task.start().unwrap();
        task.complete(json!({"ok": true})).unwrap();

        assert_eq!(task.status(), TaskStatus::Completed);
        assert!(task.completed_at().is_some());
        assert_eq!(task.result(), Some(&json!({"ok": true})));
        assert!(task.error().is_none());
    }

    #[test]
    fn test_unroutable_task_fails_from_pending() {
        let mut task = Task::new("task_2", spec());
        task.mark_unroutable("no worker for type recipe_scale").unwrap();
        assert_eq!(task.status(), TaskStatus::Failed);
        assert!(task.status().is_terminal());
        assert!(task.result().is_none());
    }

    #[test]
    fn test_invalid_transitions_rejected() {
        let mut task = Task::new("task_3", spec());
        assert!(task.start().is_err());
        assert!(task.complete(json!(1)).is_err());

        task.mark_delegated("baker").unwrap();
        task.start().unwrap();
        task.fail("oven on fire").unwrap();

        let err = task.start().unwrap_err();
        assert_eq!(
            err,
            TaskError::InvalidTransition {
                id: "task_3".to_string(),
                from: TaskStatus::Failed,
                to: TaskStatus::InProgress,
            }
        );
        assert_eq!(task.error(), Some("oven on fire"));
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&TaskStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
        assert_eq!(
            serde_json::to_string(&TaskPriority::Critical).unwrap(),
            "\"CRITICAL\""
        );
    }
}
