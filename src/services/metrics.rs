//! Per-worker creation counters shared by every worker of one import.
//!
//! Each key is written by exactly one worker; the progress loop sums all
//! keys without coordinating with writers, so totals are eventually
//! consistent while workers run and exact once they are done.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity a worker publishes its counter under
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerKey {
    pub thread_name: String,
    pub task_id: String,
}

impl WorkerKey {
    #[must_use]
    pub fn new(thread_name: impl Into<String>, task_id: impl Into<String>) -> Self {
        Self {
            thread_name: thread_name.into(),
            task_id: task_id.into(),
        }
    }
}

impl std::fmt::Display for WorkerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.thread_name, self.task_id)
    }
}

#[derive(Debug, Default)]
pub struct MetricsRegistry {
    counters: DashMap<WorkerKey, u64>,
    publishes: AtomicU64,
}

impl MetricsRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the running total of documents created by a worker.
    pub fn publish(&self, key: &WorkerKey, created: u64) {
        self.counters.insert(key.clone(), created);
        self.publishes.fetch_add(1, Ordering::Relaxed);
    }

    /// Drop every counter, e.g. when a new root worker starts.
    pub fn reset(&self) {
        self.counters.clear();
    }

    #[must_use]
    pub fn get(&self, key: &WorkerKey) -> Option<u64> {
        self.counters.get(key).map(|v| *v)
    }

    /// Sum over all workers.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.counters.iter().map(|entry| *entry.value()).sum()
    }

    /// Counters sorted by key.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(WorkerKey, u64)> {
        let mut out: Vec<(WorkerKey, u64)> = self
            .counters
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        out.sort();
        out
    }

    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.counters.len()
    }

    /// How many times any worker published
    #[must_use]
    pub fn publish_count(&self) -> u64 {
        self.publishes.load(Ordering::Relaxed)
    }
}
