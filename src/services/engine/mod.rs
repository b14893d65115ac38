//! Import engine: the worker pool, the workers walking subtrees, and the
//! driver polling them to completion.
//!
//! Workers never wait on each other. A worker that decides to hand a subtree
//! off commits what it has, submits a new worker for the subtree, and moves
//! on. Invariants held across the engine:
//!
//! - A session is owned by exactly one worker and never crosses threads.
//! - A forked subtree's root folder is created once, by the forking worker.
//! - Published counters only ever cover committed creations.

pub mod importer;
pub mod pool;
pub mod progress;
pub mod worker;

pub use importer::Importer;
pub use pool::{PoolHandle, WorkerPool};
pub use worker::ImportWorker;

use crate::models::WorkerSummary;
use crate::services::factory::TargetEntryFactory;
use crate::services::filters::{ImporterListener, ImportingDocumentFilter};
use crate::services::metrics::MetricsRegistry;
use crate::services::policy::ThreadingPolicy;
use crate::services::store::TargetStore;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Task id carried by the root worker
pub const ROOT_TASK_ID: &str = "T0";

/// State shared by every worker of one import; read-only apart from the
/// task id sequence and the outcome list.
pub struct ImportContext {
    pub store: Arc<dyn TargetStore>,
    pub factory: Arc<dyn TargetEntryFactory>,
    pub policy: Arc<dyn ThreadingPolicy>,
    pub document_filters: Vec<Arc<dyn ImportingDocumentFilter>>,
    pub listeners: Vec<Arc<dyn ImporterListener>>,
    pub metrics: Arc<MetricsRegistry>,
    pub pool: PoolHandle,
    pub batch_size: usize,
    pub transaction_timeout: Duration,
    next_task: AtomicU64,
    outcomes: Mutex<Vec<WorkerSummary>>,
}

impl ImportContext {
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        store: Arc<dyn TargetStore>,
        factory: Arc<dyn TargetEntryFactory>,
        policy: Arc<dyn ThreadingPolicy>,
        document_filters: Vec<Arc<dyn ImportingDocumentFilter>>,
        listeners: Vec<Arc<dyn ImporterListener>>,
        metrics: Arc<MetricsRegistry>,
        pool: PoolHandle,
        batch_size: usize,
        transaction_timeout: Duration,
    ) -> Self {
        Self {
            store,
            factory,
            policy,
            document_filters,
            listeners,
            metrics,
            pool,
            batch_size: batch_size.max(1),
            transaction_timeout,
            next_task: AtomicU64::new(1),
            outcomes: Mutex::new(Vec::new()),
        }
    }

    /// Allocate an id for a forked worker.
    pub fn next_task_id(&self) -> String {
        format!("T{}", self.next_task.fetch_add(1, Ordering::Relaxed))
    }

    pub fn record_outcome(&self, summary: WorkerSummary) {
        self.outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(summary);
    }

    /// Outcomes recorded so far, ordered by task number
    #[must_use]
    pub fn outcomes(&self) -> Vec<WorkerSummary> {
        let mut outcomes = self
            .outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        outcomes.sort_by_key(|o| task_number(&o.task_id));
        outcomes
    }
}

fn task_number(task_id: &str) -> u64 {
    task_id
        .strip_prefix('T')
        .and_then(|n| n.parse().ok())
        .unwrap_or(u64::MAX)
}
