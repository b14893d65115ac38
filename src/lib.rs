//! Concurrent Hierarchical Import Library
//!
//! This library walks an external tree of folders and leaves and recreates it
//! inside a transactional target store. Work is spread over a fixed pool of
//! worker threads: at each folder a pluggable threading policy decides whether
//! the current worker keeps descending or hands the subtree to a new worker.
//! Each worker commits in batches through its own session.

pub mod cli;
pub mod io;
pub mod models;
pub mod services;

pub use models::{EntryKind, EntryRef, ImportReport, StoredEntry, WorkerState, WorkerSummary};
pub use services::engine::Importer;
pub use services::factory::{CreationError, DefaultEntryFactory, TargetEntryFactory};
pub use services::filters::{ImporterFilter, ImporterListener, ImportingDocumentFilter};
pub use services::metrics::MetricsRegistry;
pub use services::policy::{DefaultThreadingPolicy, ThreadingPolicy};
pub use services::source::SourceNode;
pub use services::store::{InMemoryStore, StoreError, TargetSession, TargetStore};

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors that abort a worker or a whole import
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Creation(#[from] CreationError),

    #[error("Destination does not exist: {0}")]
    DestinationNotFound(String),

    #[error("Import vetoed: {0}")]
    Vetoed(String),

    #[error("Worker panicked: {0}")]
    WorkerPanicked(String),

    #[error("Worker pool is shut down")]
    PoolShutdown,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Partial failure: {completed} workers completed, {failed} failed")]
    PartialFailure { completed: usize, failed: usize },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Options for an import run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    pub job_name: String,
    pub repository: String,
    pub destination_path: String,
    /// Creations per transaction before a commit is forced
    pub batch_size: usize,
    pub pool_size: usize,
    /// Queued tasks beyond this block the submitting worker
    pub queue_capacity: usize,
    pub transaction_timeout_secs: u64,
    /// Import the root's children straight into the destination
    pub skip_root_container_creation: bool,
    /// Create the destination path when it does not exist
    pub create_destination: bool,
    /// Turn worker failures into an overall error
    pub fail_on_worker_error: bool,
    pub progress_interval_ms: u64,
    pub poll_interval_ms: u64,
    /// Queue depth at which the default policy stops forking
    pub max_fork_queue_depth: usize,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            job_name: "import".to_string(),
            repository: "default".to_string(),
            destination_path: "/".to_string(),
            batch_size: 50,
            pool_size: 5,
            queue_capacity: 10_000,
            transaction_timeout_secs: 300,
            skip_root_container_creation: false,
            create_destination: false,
            fail_on_worker_error: false,
            progress_interval_ms: 5_000,
            poll_interval_ms: 200,
            max_fork_queue_depth: services::policy::DEFAULT_MAX_QUEUE_DEPTH,
        }
    }
}

impl ImportOptions {
    #[must_use]
    pub fn transaction_timeout(&self) -> Duration {
        Duration::from_secs(self.transaction_timeout_secs)
    }

    #[must_use]
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::InvalidConfig("batch size must be positive".into()));
        }
        if self.pool_size == 0 {
            return Err(Error::InvalidConfig("pool size must be positive".into()));
        }
        if self.queue_capacity == 0 {
            return Err(Error::InvalidConfig(
                "queue capacity must be positive".into(),
            ));
        }
        // Every running worker may fork once past the ceiling; a full queue
        // with all threads blocked in submit never drains
        if self.max_fork_queue_depth + self.pool_size > self.queue_capacity {
            return Err(Error::InvalidConfig(format!(
                "queue capacity {} must hold the fork ceiling {} plus one task per worker ({})",
                self.queue_capacity, self.max_fork_queue_depth, self.pool_size
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(Error::InvalidConfig(
                "poll interval must be positive".into(),
            ));
        }
        if self.transaction_timeout_secs == 0 {
            return Err(Error::InvalidConfig(
                "transaction timeout must be positive".into(),
            ));
        }
        if !self.destination_path.starts_with('/') {
            return Err(Error::InvalidConfig(format!(
                "destination path must be absolute: {}",
                self.destination_path
            )));
        }
        Ok(())
    }
}

/// Import a tree with the default factory and policy
///
/// # Arguments
/// * `store` - The store to import into
/// * `root` - Root of the source tree
/// * `opts` - Import options
///
/// # Returns
/// The import report, listing every worker and the documents created
pub fn import_tree(
    store: Arc<dyn TargetStore>,
    root: Box<dyn SourceNode>,
    opts: &ImportOptions,
) -> Result<ImportReport> {
    Importer::new(store, opts.clone()).run(root)
}
