//! Capability-based task assignment
//!
//! Picks the least-loaded capable worker for each pending task. Load is the
//! worker's lifetime `assigned` counter, so assignment is deterministic given
//! the registry's state and the task order.

use crate::error::TaskError;
use crate::task::Task;
use crate::team::registry::CapabilityRegistry;

/// Routes pending tasks to workers
#[derive(Debug, Clone, Copy, Default)]
pub struct Delegator;

impl Delegator {
    pub fn new() -> Self {
        Self
    }

    /// Assign `task` to a capable worker.
    ///
    /// Returns `Ok(false)` when no worker claims the task's type; the task is
    /// then marked failed with a reason. Errors only when the task is not
    /// pending.
    pub fn delegate(
        &self,
        registry: &mut CapabilityRegistry,
        task: &mut Task,
    ) -> Result<bool, TaskError> {
        let Some(idx) = registry.least_loaded(task.task_type()) else {
            tracing::warn!("No worker capable of handling task type: {}", task.task_type());
            task.mark_unroutable(format!("no worker for type {}", task.task_type()))?;
            return Ok(false);
        };

        let name = registry.entry_at(idx).name().to_string();
        task.mark_delegated(name.as_str())?;
        registry.record_assigned(idx);

        tracing::info!("Delegated task '{}' to {}", task.description(), name);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{TaskSpec, TaskStatus};
    use crate::team::worker::EchoWorker;
    use std::sync::Arc;

    fn registry() -> CapabilityRegistry {
        let mut registry = CapabilityRegistry::new();
        registry
            .register("a", Arc::new(EchoWorker::new("a")), ["x"])
            .unwrap();
        registry
            .register("b", Arc::new(EchoWorker::new("b")), ["x", "y"])
            .unwrap();
        registry
    }

    #[test]
    fn test_unroutable_task_fails() {
        let mut registry = registry();
        let mut task = Task::new("task_1", TaskSpec::new("z", "nobody does z"));

        let routed = Delegator::new().delegate(&mut registry, &mut task).unwrap();

        assert!(!routed);
        assert_eq!(task.status(), TaskStatus::Failed);
        assert_eq!(task.error(), Some("no worker for type z"));
        assert!(registry.iter().all(|e| e.assigned() == 0));
    }

    #[test]
    fn test_round_robin_between_equal_workers() {
        let mut registry = registry();
        let delegator = Delegator::new();
        let mut assigned = Vec::new();

        for n in 0..5 {
            let mut task = Task::new(format!("task_{n}"), TaskSpec::new("x", "work"));
            assert!(delegator.delegate(&mut registry, &mut task).unwrap());
            assigned.push(task.assigned_worker().unwrap().to_string());
        }

        assert_eq!(assigned, vec!["a", "b", "a", "b", "a"]);
        assert_eq!(registry.get("a").unwrap().assigned(), 3);
        assert_eq!(registry.get("b").unwrap().assigned(), 2);
    }

    #[test]
    fn test_only_capable_worker_chosen() {
        let mut registry = registry();
        let mut task = Task::new("task_1", TaskSpec::new("y", "only b"));

        Delegator::new().delegate(&mut registry, &mut task).unwrap();

        assert_eq!(task.assigned_worker(), Some("b"));
        assert_eq!(task.status(), TaskStatus::Delegated);
    }

    #[test]
    fn test_non_pending_task_rejected() {
        let mut registry = registry();
        let delegator = Delegator::new();
        let mut task = Task::new("task_1", TaskSpec::new("x", "twice"));

        delegator.delegate(&mut registry, &mut task).unwrap();
        assert!(delegator.delegate(&mut registry, &mut task).is_err());
        assert_eq!(registry.get("a").unwrap().assigned(), 1);
    }
}
