//! Capability registry
//!
//! Maps worker names to the task types they claim to handle, plus running
//! counters. Entries keep registration order, which the delegator relies on
//! for tie-breaking.

use std::fmt;
use std::sync::Arc;

use crate::error::TeamError;
use crate::team::worker::Worker;

/// A registered worker and its bookkeeping
pub struct WorkerEntry {
    name: String,
    worker: Arc<dyn Worker>,
    capabilities: Vec<String>,
    assigned: u64,
    completed: u64,
    failed: u64,
    initialized: bool,
}

impl WorkerEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn worker(&self) -> Arc<dyn Worker> {
        Arc::clone(&self.worker)
    }

    pub fn capabilities(&self) -> &[String] {
        &self.capabilities
    }

    pub fn can_handle(&self, task_type: &str) -> bool {
        self.capabilities.iter().any(|c| c == task_type)
    }

    pub fn assigned(&self) -> u64 {
        self.assigned
    }

    pub fn completed(&self) -> u64 {
        self.completed
    }

    pub fn failed(&self) -> u64 {
        self.failed
    }

    /// Completed over assigned, as a percentage. Zero when nothing was assigned.
    pub fn success_rate(&self) -> f64 {
        if self.assigned == 0 {
            0.0
        } else {
            self.completed as f64 / self.assigned as f64 * 100.0
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}

impl fmt::Debug for WorkerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerEntry")
            .field("name", &self.name)
            .field("capabilities", &self.capabilities)
            .field("assigned", &self.assigned)
            .field("completed", &self.completed)
            .field("failed", &self.failed)
            .field("initialized", &self.initialized)
            .finish()
    }
}

/// Registry of workers, owned by one orchestrator
#[derive(Debug, Default)]
pub struct CapabilityRegistry {
    entries: Vec<WorkerEntry>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a worker under a unique name.
    ///
    /// Duplicate capability tags are collapsed, first occurrence wins.
    pub fn register<I, S>(
        &mut self,
        name: impl Into<String>,
        worker: Arc<dyn Worker>,
        capabilities: I,
    ) -> Result<(), TeamError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        if self.get(&name).is_some() {
            return Err(TeamError::DuplicateWorker(name));
        }

        let mut caps: Vec<String> = Vec::new();
        for cap in capabilities {
            let cap = cap.into();
            if !caps.contains(&cap) {
                caps.push(cap);
            }
        }

        tracing::info!("Registered worker '{}' with capabilities: {:?}", name, caps);
        self.entries.push(WorkerEntry {
            name,
            worker,
            capabilities: caps,
            assigned: 0,
            completed: 0,
            failed: 0,
            initialized: false,
        });
        Ok(())
    }

    /// All workers able to handle `task_type`, in registration order
    pub fn find_capable(&self, task_type: &str) -> Vec<&WorkerEntry> {
        self.entries
            .iter()
            .filter(|e| e.can_handle(task_type))
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&WorkerEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &WorkerEntry> {
        self.entries.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Index of the capable worker with the fewest assignments; ties go to
    /// the earliest registration.
    pub(crate) fn least_loaded(&self, task_type: &str) -> Option<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.can_handle(task_type))
            .min_by_key(|(_, e)| e.assigned)
            .map(|(idx, _)| idx)
    }

    pub(crate) fn entry_at(&self, idx: usize) -> &WorkerEntry {
        &self.entries[idx]
    }

    pub(crate) fn record_assigned(&mut self, idx: usize) {
        self.entries[idx].assigned += 1;
    }

    pub(crate) fn record_completed(&mut self, name: &str) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.name == name) {
            entry.completed += 1;
        }
    }

    pub(crate) fn record_failed(&mut self, name: &str) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.name == name) {
            entry.failed += 1;
        }
    }

    /// Workers whose `initialize` hook has not run yet
    pub(crate) fn pending_initialization(&self) -> Vec<(String, Arc<dyn Worker>)> {
        self.entries
            .iter()
            .filter(|e| !e.initialized)
            .map(|e| (e.name.clone(), e.worker()))
            .collect()
    }

    pub(crate) fn set_initialized(&mut self, name: &str, initialized: bool) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.name == name) {
            entry.initialized = initialized;
        }
    }
}
