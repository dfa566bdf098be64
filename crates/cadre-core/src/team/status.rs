//! Team status snapshot

use serde::Serialize;

/// Per-worker counters as seen by [`TeamStatus`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkerStatus {
    pub name: String,
    pub capabilities: Vec<String>,
    pub tasks_assigned: u64,
    pub tasks_completed: u64,
    pub tasks_failed: u64,
    /// Percentage, 0 when nothing was assigned
    pub success_rate: f64,
}

/// Task counts by status across the orchestrator's store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskCounts {
    pub total: usize,
    pub pending: usize,
    pub delegated: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub failed: usize,
}

/// Snapshot returned by `Orchestrator::get_team_status`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamStatus {
    pub team_name: String,
    /// Registration order
    pub workers: Vec<WorkerStatus>,
    pub tasks: TaskCounts,
}

impl TeamStatus {
    pub fn worker(&self, name: &str) -> Option<&WorkerStatus> {
        self.workers.iter().find(|w| w.name == name)
    }

    /// Operator hints derived from the counters
    pub fn recommendations(&self) -> Vec<String> {
        let mut out = Vec::new();

        for worker in &self.workers {
            if worker.tasks_assigned > 0 && worker.success_rate < 50.0 {
                out.push(format!(
                    "{} has low success rate ({:.1}%) - consider reviewing configuration or providing more context",
                    worker.name, worker.success_rate
                ));
            } else if worker.success_rate >= 100.0 && worker.tasks_completed > 5 {
                out.push(format!(
                    "{} performing excellently ({} tasks completed)",
                    worker.name, worker.tasks_completed
                ));
            }
        }

        if self.tasks.failed * 2 > self.tasks.completed {
            out.push(
                "High failure rate - review task complexity and worker capabilities".to_string(),
            );
        }

        out
    }
}
