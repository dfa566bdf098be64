//! Task execution
//!
//! Invokes the assigned worker with the task's metadata and records the
//! outcome on both the task and the worker's counters. Worker failures,
//! panics included, are data, not errors: they end up in the task record and
//! the batch goes on.

use std::panic::AssertUnwindSafe;

use futures::FutureExt;

use crate::error::{Result, TeamError};
use crate::task::Task;
use crate::team::registry::CapabilityRegistry;

/// Runs delegated tasks against their workers, one at a time
#[derive(Debug, Clone, Copy, Default)]
pub struct Executor;

impl Executor {
    pub fn new() -> Self {
        Self
    }

    /// Execute a delegated task.
    ///
    /// Errors only on contract violations: a task without an assigned worker,
    /// an assignment naming an unregistered worker, or a task that is not in
    /// the delegated state.
    pub async fn run(&self, registry: &mut CapabilityRegistry, task: &mut Task) -> Result<()> {
        let name = task
            .assigned_worker()
            .ok_or_else(|| TeamError::UnassignedTask(task.id().to_string()))?
            .to_string();
        let worker = registry
            .get(&name)
            .map(|entry| entry.worker())
            .ok_or_else(|| TeamError::UnknownWorker(name.clone()))?;

        task.start()?;
        tracing::info!("Executing task '{}' with {}", task.description(), name);

        let outcome = AssertUnwindSafe(worker.execute(task.metadata()))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(anyhow::anyhow!("worker panicked")));

        match outcome {
            Ok(result) => {
                task.complete(result)?;
                registry.record_completed(&name);
                tracing::info!("Task completed: {}", task.description());
            }
            Err(err) => {
                let message = err.to_string();
                tracing::error!("Task failed: {} - {}", task.description(), message);
                task.fail(message)?;
                registry.record_failed(&name);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CadreError;
    use crate::task::{TaskSpec, TaskStatus};
    use crate::team::delegator::Delegator;
    use crate::team::worker::{EchoWorker, FailingWorker};
    use serde_json::json;
    use std::sync::Arc;

    fn registry() -> CapabilityRegistry {
        let mut registry = CapabilityRegistry::new();
        registry
            .register("echo", Arc::new(EchoWorker::new("echo")), ["x"])
            .unwrap();
        registry
            .register("broken", Arc::new(FailingWorker::new("broken", "boom")), ["y"])
            .unwrap();
        registry
    }

    async fn delegate_and_run(registry: &mut CapabilityRegistry, task: &mut Task) {
        assert!(Delegator::new().delegate(registry, task).unwrap());
        Executor::new().run(registry, task).await.unwrap();
    }

    #[tokio::test]
    async fn test_successful_execution() {
        let mut registry = registry();
        let mut task = Task::new("task_1", TaskSpec::new("x", "echo it").with_arg("k", "v"));

        delegate_and_run(&mut registry, &mut task).await;

        assert_eq!(task.status(), TaskStatus::Completed);
        assert_eq!(task.result().unwrap()["task_args"], json!({"k": "v"}));
        assert_eq!(registry.get("echo").unwrap().completed(), 1);
    }

    #[tokio::test]
    async fn test_worker_error_recorded() {
        let mut registry = registry();
        let mut task = Task::new("task_1", TaskSpec::new("y", "will fail"));

        delegate_and_run(&mut registry, &mut task).await;

        assert_eq!(task.status(), TaskStatus::Failed);
        assert_eq!(task.error(), Some("boom"));
        assert!(task.result().is_none());
        assert!(task.completed_at().is_some());
        assert_eq!(registry.get("broken").unwrap().failed(), 1);
    }

    struct PanickingWorker;

    #[async_trait::async_trait]
    impl crate::team::worker::Worker for PanickingWorker {
        fn name(&self) -> &str {
            "panicky"
        }

        async fn execute(
            &self,
            _args: &crate::types::Metadata,
        ) -> anyhow::Result<serde_json::Value> {
            panic!("oven on fire")
        }
    }

    #[tokio::test]
    async fn test_worker_panic_recorded_as_failure() {
        let mut registry = registry();
        registry
            .register("panicky", Arc::new(PanickingWorker), ["z"])
            .unwrap();
        let mut task = Task::new("task_1", TaskSpec::new("z", "will panic"));

        delegate_and_run(&mut registry, &mut task).await;

        assert_eq!(task.status(), TaskStatus::Failed);
        assert_eq!(task.error(), Some("worker panicked"));
        assert_eq!(registry.get("panicky").unwrap().failed(), 1);
    }

    #[tokio::test]
    async fn test_unassigned_task_is_contract_violation() {
        let mut registry = registry();
        let mut task = Task::new("task_9", TaskSpec::new("x", "never delegated"));

        let err = Executor::new().run(&mut registry, &mut task).await.unwrap_err();

        assert!(matches!(
            err,
            CadreError::Team(TeamError::UnassignedTask(ref id)) if id == "task_9"
        ));
        assert_eq!(task.status(), TaskStatus::Pending);
    }

    #[tokio::test]
    async fn test_unknown_worker_is_contract_violation() {
        let mut task = Task::new("task_1", TaskSpec::new("x", "orphan"));
        task.mark_delegated("ghost").unwrap();

        let err = Executor::new()
            .run(&mut CapabilityRegistry::new(), &mut task)
            .await
            .unwrap_err();

        assert!(matches!(err, CadreError::Team(TeamError::UnknownWorker(_))));
    }
}
