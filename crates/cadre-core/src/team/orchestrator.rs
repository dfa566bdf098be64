//! Goal orchestrator
//!
//! ```text
//! goal + context
//!      │
//!      v
//! ┌──────────┐   TaskSpec[]   ┌───────────┐   Task[]    ┌──────────┐
//! │ Playbook │ ─────────────> │ Delegator │ ──────────> │ Executor │
//! │  .plan   │                │ (registry)│             │ (await)  │
//! └──────────┘                └───────────┘             └──────────┘
//!                                                            │
//!                          GoalReport <── Playbook.aggregate ┘
//! ```
//!
//! One orchestrator owns one team: its playbook, its capability registry and
//! the store of every task it has created. Tasks run sequentially in the
//! order the playbook emitted them.

use std::sync::Arc;

use tracing::{info, Instrument, Span};

use crate::config::OrchestratorConfig;
use crate::error::Result;
use crate::playbook::{GoalReport, Playbook};
use crate::task::{Task, TaskSpec, TaskStatus};
use crate::team::delegator::Delegator;
use crate::team::executor::Executor;
use crate::team::registry::CapabilityRegistry;
use crate::team::status::{TaskCounts, TeamStatus, WorkerStatus};
use crate::team::store::TaskStore;
use crate::team::worker::Worker;
use crate::types::Metadata;

/// Leader of a team of workers
pub struct Orchestrator {
    playbook: Box<dyn Playbook>,
    registry: CapabilityRegistry,
    tasks: TaskStore,
    task_counter: u64,
    delegator: Delegator,
    executor: Executor,
    config: OrchestratorConfig,
    span: Span,
}

impl Orchestrator {
    pub fn new(playbook: impl Playbook + 'static) -> Self {
        Self::from_boxed(Box::new(playbook))
    }

    pub fn from_boxed(playbook: Box<dyn Playbook>) -> Self {
        let config = OrchestratorConfig::default();
        let span = tracing::info_span!("team", name = %playbook.team_name());
        info!(parent: &span, "Orchestrator initialized for team: {}", playbook.team_name());

        Self {
            playbook,
            registry: CapabilityRegistry::new(),
            tasks: TaskStore::new(config.task_store_capacity),
            task_counter: 0,
            delegator: Delegator::new(),
            executor: Executor::new(),
            config,
            span,
        }
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.tasks.set_capacity(config.task_store_capacity);
        self.config = config;
        self
    }

    /// Log inside `span` instead of the default `team{name}` span
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn team_name(&self) -> &str {
        self.playbook.team_name()
    }

    pub fn playbook(&self) -> &dyn Playbook {
        self.playbook.as_ref()
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Add a worker to the team. Names must be unique.
    pub fn register_worker<I, S>(
        &mut self,
        name: impl Into<String>,
        worker: Arc<dyn Worker>,
        capabilities: I,
    ) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let _enter = self.span.enter();
        self.registry.register(name, worker, capabilities)?;
        Ok(())
    }

    /// Run every worker's `initialize` hook that has not run yet.
    ///
    /// Failures are logged and do not stop the remaining workers. Called
    /// lazily by [`execute_goal`](Self::execute_goal) and
    /// [`run_task`](Self::run_task).
    pub async fn initialize(&mut self) {
        let pending = self.registry.pending_initialization();
        if pending.is_empty() {
            return;
        }

        let span = self.span.clone();
        async {
            info!("Initializing {} team...", self.playbook.team_name());
            for (name, worker) in pending {
                match worker.initialize().await {
                    Ok(()) => info!("Initialized {}", name),
                    Err(e) => tracing::error!("Failed to initialize {}: {}", name, e),
                }
                self.registry.set_initialized(&name, true);
            }
            info!("{} team ready", self.playbook.team_name());
        }
        .instrument(span)
        .await
    }

    /// Run every initialized worker's `cleanup` hook. Idempotent; also runs
    /// on drop.
    pub fn close(&mut self) {
        let initialized: Vec<(String, Arc<dyn Worker>)> = self
            .registry
            .iter()
            .filter(|e| e.is_initialized())
            .map(|e| (e.name().to_string(), e.worker()))
            .collect();
        if initialized.is_empty() {
            return;
        }

        let _enter = self.span.enter();
        info!("Cleaning up {} team...", self.playbook.team_name());
        for (name, worker) in initialized {
            if let Err(e) = worker.cleanup() {
                tracing::error!("Error cleaning up {}: {}", name, e);
            }
            self.registry.set_initialized(&name, false);
        }
    }

    /// Plan, delegate, execute and aggregate one goal.
    ///
    /// Task failures (no capable worker, worker errors) are reported in the
    /// returned [`GoalReport`]. Only contract violations return `Err`.
    pub async fn execute_goal(&mut self, goal: &str, context: &Metadata) -> Result<GoalReport> {
        self.initialize().await;

        let span = self.span.clone();
        async {
            info!("Goal: {}", goal);
            let specs = self.playbook.plan(goal, context);
            info!("Planned {} tasks", specs.len());

            let mut tasks: Vec<Task> = specs
                .into_iter()
                .map(|spec| Task::new(self.next_task_id(), spec))
                .collect();

            let outcome = self.dispatch(&mut tasks).await;
            let report = outcome.map(|()| self.playbook.aggregate(&tasks));
            for task in tasks {
                self.tasks.insert(task);
            }

            if let Ok(report) = &report {
                info!(
                    "Goal completed: {}/{} tasks succeeded ({})",
                    report.summary.successful, report.summary.total, report.summary.success_rate
                );
            }
            report
        }
        .instrument(span)
        .await
    }

    /// Delegate and execute a single ad-hoc task outside any goal.
    ///
    /// The returned task is terminal: completed, failed by its worker, or
    /// failed because no worker could take it.
    pub async fn run_task(&mut self, spec: TaskSpec) -> Result<Task> {
        self.initialize().await;

        let span = self.span.clone();
        async {
            let mut task = Task::new(self.next_task_id(), spec);
            let outcome = self.dispatch(std::slice::from_mut(&mut task)).await;
            self.tasks.insert(task.clone());
            outcome.map(|()| task)
        }
        .instrument(span)
        .await
    }

    /// A task created by this orchestrator, unless evicted from the store
    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    /// Worker counters and task counts by status
    pub fn get_team_status(&self) -> TeamStatus {
        let workers = self
            .registry
            .iter()
            .map(|e| WorkerStatus {
                name: e.name().to_string(),
                capabilities: e.capabilities().to_vec(),
                tasks_assigned: e.assigned(),
                tasks_completed: e.completed(),
                tasks_failed: e.failed(),
                success_rate: e.success_rate(),
            })
            .collect();

        TeamStatus {
            team_name: self.team_name().to_string(),
            workers,
            tasks: TaskCounts {
                total: self.tasks.len(),
                pending: self.tasks.count(TaskStatus::Pending),
                delegated: self.tasks.count(TaskStatus::Delegated),
                in_progress: self.tasks.count(TaskStatus::InProgress),
                completed: self.tasks.count(TaskStatus::Completed),
                failed: self.tasks.count(TaskStatus::Failed),
            },
        }
    }

    fn next_task_id(&mut self) -> String {
        self.task_counter += 1;
        format!("task_{}", self.task_counter)
    }

    /// Delegate all tasks in order, then execute the delegated ones in order
    async fn dispatch(&mut self, tasks: &mut [Task]) -> Result<()> {
        for task in tasks.iter_mut() {
            self.delegator.delegate(&mut self.registry, task)?;
        }

        for task in tasks
            .iter_mut()
            .filter(|t| t.status() == TaskStatus::Delegated)
        {
            self.executor.run(&mut self.registry, task).await?;
        }

        Ok(())
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("team", &self.team_name())
            .field("registry", &self.registry)
            .field("tasks", &self.tasks.len())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playbook::StorePlaybook;
    use crate::team::worker::{EchoWorker, FailingWorker};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Lifecycle {
        initialized: AtomicUsize,
        cleaned: AtomicUsize,
    }

    struct TrackedWorker {
        hooks: Arc<Lifecycle>,
        fail_init: bool,
    }

    #[async_trait]
    impl Worker for TrackedWorker {
        fn name(&self) -> &str {
            "tracked"
        }

        async fn execute(&self, _args: &Metadata) -> anyhow::Result<Value> {
            Ok(json!("done"))
        }

        async fn initialize(&self) -> anyhow::Result<()> {
            self.hooks.initialized.fetch_add(1, Ordering::SeqCst);
            if self.fail_init {
                anyhow::bail!("no credentials");
            }
            Ok(())
        }

        fn cleanup(&self) -> anyhow::Result<()> {
            self.hooks.cleaned.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn store_team() -> Orchestrator {
        let mut team = Orchestrator::new(StorePlaybook::default());
        team.register_worker(
            "orders",
            Arc::new(EchoWorker::new("orders")),
            ["order_processing"],
        )
        .unwrap();
        team.register_worker(
            "analyst",
            Arc::new(EchoWorker::new("analyst")),
            ["sales_forecasting"],
        )
        .unwrap();
        team
    }

    #[tokio::test]
    async fn test_execute_goal_daily_bundle() {
        let mut team = store_team();
        let report = team
            .execute_goal("daily operations", &Metadata::new())
            .await
            .unwrap();

        assert_eq!(report.team, "Shopify Store Team");
        assert_eq!(report.summary.total, 2);
        assert_eq!(report.summary.successful, 2);
        assert_eq!(report.results_for("order_processing")[0].id, "task_1");
        assert_eq!(
            report.results_for("sales_forecasting")[0].assigned_worker.as_deref(),
            Some("analyst")
        );
    }

    #[tokio::test]
    async fn test_task_ids_unique_across_goals() {
        let mut team = store_team();
        team.execute_goal("daily", &Metadata::new()).await.unwrap();
        let report = team.execute_goal("daily", &Metadata::new()).await.unwrap();

        assert_eq!(report.results_for("order_processing")[0].id, "task_3");
        assert!(team.task("task_1").is_some());
        assert_eq!(team.get_team_status().tasks.total, 4);
    }

    #[tokio::test]
    async fn test_unroutable_tasks_reported() {
        let mut team = store_team();
        let report = team
            .execute_goal("weekly review", &Metadata::new())
            .await
            .unwrap();

        // forecasting succeeds, segmentation and social media have no worker
        assert_eq!(report.summary.successful, 1);
        assert_eq!(report.summary.failed, 2);
        assert_eq!(report.failures[0].error, "no worker for type customer_segmentation");

        let status = team.get_team_status();
        assert_eq!(status.tasks.failed, 2);
        assert_eq!(status.worker("analyst").unwrap().tasks_completed, 1);
        assert_eq!(status.worker("orders").unwrap().tasks_assigned, 0);
    }

    #[tokio::test]
    async fn test_run_task() {
        let mut team = store_team();
        team.register_worker(
            "broken",
            Arc::new(FailingWorker::new("broken", "API down")),
            ["email_marketing"],
        )
        .unwrap();

        let task = team
            .run_task(TaskSpec::new("email_marketing", "Draft newsletter"))
            .await
            .unwrap();

        assert_eq!(task.id(), "task_1");
        assert_eq!(task.status(), TaskStatus::Failed);
        assert_eq!(task.error(), Some("API down"));
        assert_eq!(team.task("task_1").unwrap().status(), TaskStatus::Failed);
    }

    #[tokio::test]
    async fn test_lifecycle_hooks() {
        let hooks = Arc::new(Lifecycle::default());
        {
            let mut team = Orchestrator::new(StorePlaybook::default());
            team.register_worker(
                "ok",
                Arc::new(TrackedWorker {
                    hooks: Arc::clone(&hooks),
                    fail_init: false,
                }),
                ["order_processing"],
            )
            .unwrap();
            team.register_worker(
                "bad",
                Arc::new(TrackedWorker {
                    hooks: Arc::clone(&hooks),
                    fail_init: true,
                }),
                ["order_processing"],
            )
            .unwrap();

            let report = team
                .execute_goal("process orders", &Metadata::new())
                .await
                .unwrap();
            assert_eq!(report.summary.successful, 1);

            team.execute_goal("process orders", &Metadata::new())
                .await
                .unwrap();
            assert_eq!(hooks.initialized.load(Ordering::SeqCst), 2);

            team.close();
            team.close();
            assert_eq!(hooks.cleaned.load(Ordering::SeqCst), 2);

            team.initialize().await;
            assert_eq!(hooks.initialized.load(Ordering::SeqCst), 4);
        }
        // dropped: cleanup ran again for the re-initialized workers
        assert_eq!(hooks.cleaned.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_task_store_bounded() {
        let mut team =
            store_team().with_config(OrchestratorConfig::new().with_task_store_capacity(3));

        for _ in 0..3 {
            team.execute_goal("daily", &Metadata::new()).await.unwrap();
        }

        let status = team.get_team_status();
        assert_eq!(status.tasks.total, 3);
        assert!(team.task("task_1").is_none());
        assert!(team.task("task_6").is_some());
    }

    #[test]
    fn test_duplicate_worker_rejected() {
        let mut team = store_team();
        let err = team
            .register_worker("orders", Arc::new(EchoWorker::new("orders")), ["x"])
            .unwrap_err();
        assert!(err.to_string().contains("orders"));
        assert_eq!(team.registry().len(), 2);
    }
}
