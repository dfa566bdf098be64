//! Execution history ring buffer

use std::collections::VecDeque;

use serde::Serialize;

use crate::types::{now, Timestamp};

/// How a job run ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Success { run_count: u64 },
    Failed { error: String },
}

/// One job run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub job_name: String,
    pub timestamp: Timestamp,
    #[serde(flatten)]
    pub outcome: RunOutcome,
}

impl HistoryEntry {
    pub fn success(job_name: impl Into<String>, run_count: u64) -> Self {
        Self {
            job_name: job_name.into(),
            timestamp: now(),
            outcome: RunOutcome::Success { run_count },
        }
    }

    pub fn failure(job_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            job_name: job_name.into(),
            timestamp: now(),
            outcome: RunOutcome::Failed {
                error: error.into(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, RunOutcome::Success { .. })
    }
}

/// Bounded history, oldest entries evicted first
#[derive(Debug)]
pub(crate) struct History {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl History {
    /// `capacity == 0` keeps everything
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity,
        }
    }

    pub(crate) fn push(&mut self, entry: HistoryEntry) {
        if self.capacity > 0 && self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Newest `limit` entries, oldest first
    pub(crate) fn tail(&self, limit: usize) -> Vec<HistoryEntry> {
        let skip = self.entries.len().saturating_sub(limit);
        self.entries.iter().skip(skip).cloned().collect()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tail_is_chronological() {
        let mut history = History::new(0);
        for n in 1..=5 {
            history.push(HistoryEntry::success("job", n));
        }

        let tail = history.tail(2);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].outcome, RunOutcome::Success { run_count: 4 });
        assert_eq!(tail[1].outcome, RunOutcome::Success { run_count: 5 });
        assert_eq!(history.tail(100).len(), 5);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut history = History::new(3);
        for n in 1..=5 {
            history.push(HistoryEntry::success("job", n));
        }

        assert_eq!(history.len(), 3);
        assert_eq!(history.tail(3)[0].outcome, RunOutcome::Success { run_count: 3 });
    }

    #[test]
    fn test_entry_serialization() {
        let ok = serde_json::to_value(HistoryEntry::success("sync", 2)).unwrap();
        assert_eq!(ok["status"], json!("success"));
        assert_eq!(ok["run_count"], json!(2));
        assert_eq!(ok["job_name"], json!("sync"));

        let failed = serde_json::to_value(HistoryEntry::failure("sync", "timeout")).unwrap();
        assert_eq!(failed["status"], json!("failed"));
        assert_eq!(failed["error"], json!("timeout"));
        assert!(failed.get("run_count").is_none());
    }
}
