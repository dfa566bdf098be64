//! Bounded task store
//!
//! Keeps every task an orchestrator created, keyed by id, up to a capacity.
//! When full, the oldest task is evicted first.

use std::collections::{HashMap, VecDeque};

use crate::task::{Task, TaskStatus};

#[derive(Debug)]
pub(crate) struct TaskStore {
    tasks: HashMap<String, Task>,
    order: VecDeque<String>,
    capacity: usize,
}

impl TaskStore {
    /// `capacity == 0` disables eviction
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            tasks: HashMap::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    pub(crate) fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        self.evict();
    }

    pub(crate) fn insert(&mut self, task: Task) {
        let id = task.id().to_string();
        if self.tasks.insert(id.clone(), task).is_none() {
            self.order.push_back(id);
        }
        self.evict();
    }

    pub(crate) fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.len()
    }

    pub(crate) fn count(&self, status: TaskStatus) -> usize {
        self.tasks.values().filter(|t| t.status() == status).count()
    }

    fn evict(&mut self) {
        if self.capacity == 0 {
            return;
        }
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.tasks.remove(&oldest);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskSpec;

    fn task(n: usize) -> Task {
        Task::new(format!("task_{n}"), TaskSpec::new("x", "t"))
    }

    #[test]
    fn test_oldest_evicted_first() {
        let mut store = TaskStore::new(2);
        store.insert(task(1));
        store.insert(task(2));
        store.insert(task(3));

        assert_eq!(store.len(), 2);
        assert!(store.get("task_1").is_none());
        assert!(store.get("task_2").is_some());
        assert!(store.get("task_3").is_some());
    }

    #[test]
    fn test_zero_capacity_is_unbounded() {
        let mut store = TaskStore::new(0);
        for n in 0..50 {
            store.insert(task(n));
        }
        assert_eq!(store.len(), 50);
        assert_eq!(store.count(TaskStatus::Pending), 50);

        store.set_capacity(10);
        assert_eq!(store.len(), 10);
        assert!(store.get("task_40").is_some());
    }
}
