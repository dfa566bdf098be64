//! Goal report

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::task::{Task, TaskStatus};

/// Outcome counts for one goal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    /// `"75.0%"`, or `"0%"` for an empty goal
    pub success_rate: String,
}

/// A successful task as it appears in the report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskOutcome {
    pub id: String,
    pub description: String,
    pub assigned_worker: Option<String>,
    pub result: Value,
}

/// A failed task as it appears in the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    pub id: String,
    pub description: String,
    pub error: String,
}

/// Named domain counters, e.g. `operational_metrics`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainMetrics {
    pub name: String,
    pub counters: BTreeMap<String, i64>,
}

impl DomainMetrics {
    /// All `keys` present, starting at zero
    pub fn new(name: impl Into<String>, keys: &[&str]) -> Self {
        Self {
            name: name.into(),
            counters: keys.iter().map(|k| (k.to_string(), 0)).collect(),
        }
    }

    pub fn add(&mut self, key: &str, amount: i64) {
        *self.counters.entry(key.to_string()).or_insert(0) += amount;
    }

    pub fn get(&self, key: &str) -> i64 {
        self.counters.get(key).copied().unwrap_or(0)
    }
}

/// Aggregated result of one goal
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalReport {
    pub team: String,
    /// Domain labels such as `bakery -> "Artisan Bakery"`
    pub labels: BTreeMap<String, String>,
    pub summary: Summary,
    /// Successful outcomes grouped by task type, in completion order
    pub results: IndexMap<String, Vec<TaskOutcome>>,
    pub failures: Vec<FailureRecord>,
    pub metrics: Option<DomainMetrics>,
}

impl GoalReport {
    /// Fold tasks into summary, results and failures. Labels and metrics are
    /// added by the caller.
    pub fn collect(team: impl Into<String>, tasks: &[Task]) -> Self {
        let mut results: IndexMap<String, Vec<TaskOutcome>> = IndexMap::new();
        let mut failures = Vec::new();

        for task in tasks {
            match task.status() {
                TaskStatus::Completed => {
                    results
                        .entry(task.task_type().to_string())
                        .or_default()
                        .push(TaskOutcome {
                            id: task.id().to_string(),
                            description: task.description().to_string(),
                            assigned_worker: task.assigned_worker().map(str::to_string),
                            result: task.result().cloned().unwrap_or(Value::Null),
                        });
                }
                TaskStatus::Failed => failures.push(FailureRecord {
                    id: task.id().to_string(),
                    description: task.description().to_string(),
                    error: task.error().unwrap_or_default().to_string(),
                }),
                _ => {}
            }
        }

        let successful = results.values().map(Vec::len).sum();
        Self {
            team: team.into(),
            labels: BTreeMap::new(),
            summary: Summary {
                total: tasks.len(),
                successful,
                failed: failures.len(),
                success_rate: success_rate(successful, tasks.len()),
            },
            results,
            failures,
            metrics: None,
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_metrics(mut self, metrics: DomainMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Successful tasks of one type
    pub fn results_for(&self, task_type: &str) -> &[TaskOutcome] {
        self.results.get(task_type).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Percentage with one decimal, `"0%"` when there is nothing to rate
pub fn success_rate(successful: usize, total: usize) -> String {
    if total == 0 {
        "0%".to_string()
    } else {
        format!("{:.1}%", successful as f64 / total as f64 * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskSpec;
    use serde_json::json;

    fn finished(id: &str, task_type: &str, ok: bool) -> Task {
        let mut task = Task::new(id, TaskSpec::new(task_type, format!("{task_type} work")));
        task.mark_delegated("w").unwrap();
        task.start().unwrap();
        if ok {
            task.complete(json!({"id": id})).unwrap();
        } else {
            task.fail("broke").unwrap();
        }
        task
    }

    #[test]
    fn test_success_rate_format() {
        assert_eq!(success_rate(0, 0), "0%");
        assert_eq!(success_rate(3, 4), "75.0%");
        assert_eq!(success_rate(1, 3), "33.3%");
        assert_eq!(success_rate(2, 2), "100.0%");
    }

    #[test]
    fn test_collect_groups_by_type() {
        let tasks = vec![
            finished("task_1", "x", true),
            finished("task_2", "y", false),
            finished("task_3", "x", true),
        ];

        let report = GoalReport::collect("Team", &tasks).with_label("store", "Shop");

        assert_eq!(report.summary.total, 3);
        assert_eq!(report.summary.successful, 2);
        assert_eq!(report.summary.failed, 1);
        let ids: Vec<&str> = report.results_for("x").iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["task_1", "task_3"]);
        assert_eq!(report.failures[0].error, "broke");
        assert_eq!(report.labels["store"], "Shop");
        assert!(report.results_for("y").is_empty());
    }

    #[test]
    fn test_result_groups_in_first_completion_order() {
        let tasks = vec![
            finished("task_1", "zeta", true),
            finished("task_2", "alpha", true),
            finished("task_3", "zeta", true),
            finished("task_4", "mid", true),
        ];

        let report = GoalReport::collect("Team", &tasks);

        let keys: Vec<&str> = report.results.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
        assert_eq!(report.results_for("zeta").len(), 2);
    }

    #[test]
    fn test_pending_tasks_only_counted_in_total() {
        let tasks = vec![Task::new("task_1", TaskSpec::new("x", "idle"))];
        let report = GoalReport::collect("Team", &tasks);
        assert_eq!(report.summary.total, 1);
        assert_eq!(report.summary.successful + report.summary.failed, 0);
        assert_eq!(report.summary.success_rate, "0.0%");
    }

    #[test]
    fn test_metrics_start_at_zero() {
        let mut metrics = DomainMetrics::new("quality_metrics", &["a", "b"]);
        metrics.add("a", 3);
        assert_eq!(metrics.get("a"), 3);
        assert_eq!(metrics.get("b"), 0);
        assert_eq!(metrics.counters.len(), 2);
    }
}
