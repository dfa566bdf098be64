//! Scheduler job that re-executes a goal against a shared team

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use cadre_core::{JobAction, Metadata, Orchestrator};
use serde_json::Value;
use tokio::sync::Mutex;

/// Runs `goal` with the job's kwargs as context and returns the report
pub struct GoalAction {
    team: Arc<Mutex<Orchestrator>>,
    goal: String,
    attempts: Arc<AtomicU64>,
}

impl GoalAction {
    pub fn new(team: Arc<Mutex<Orchestrator>>, goal: impl Into<String>) -> Self {
        Self {
            team,
            goal: goal.into(),
            attempts: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Shared counter of started runs, successful or not
    pub fn attempts(&self) -> Arc<AtomicU64> {
        self.attempts.clone()
    }
}

#[async_trait]
impl JobAction for GoalAction {
    async fn run(&self, _args: &[Value], kwargs: &Metadata) -> anyhow::Result<Value> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let report = self.team.lock().await.execute_goal(&self.goal, kwargs).await?;
        Ok(serde_json::to_value(report)?)
    }
}
