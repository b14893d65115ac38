//! Data models for target entries, worker outcomes, and import reports

use serde::{Deserialize, Serialize};

/// Kind of an entry in the target store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Folder,
    Leaf,
}

/// Handle on an entry created in the target store.
///
/// The engine only passes these around; it never mutates the entry behind it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryRef {
    pub id: u64,
    pub path: String,
}

/// Content attached to a leaf entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryContent {
    pub filename: String,
    pub size: u64,
    /// Ingested bytes; `None` when the factory records metadata only
    #[serde(skip)]
    pub data: Option<Vec<u8>>,
}

/// Everything a session needs to create a new entry under a parent
#[derive(Debug, Clone)]
pub struct EntryDraft {
    pub name: String,
    pub kind: EntryKind,
    pub doc_type: String,
    pub content: Option<EntryContent>,
}

impl EntryDraft {
    #[must_use]
    pub fn folder(name: impl Into<String>, doc_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Folder,
            doc_type: doc_type.into(),
            content: None,
        }
    }

    #[must_use]
    pub fn leaf(
        name: impl Into<String>,
        doc_type: impl Into<String>,
        content: Option<EntryContent>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Leaf,
            doc_type: doc_type.into(),
            content,
        }
    }
}

/// A committed entry as held by a store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub id: u64,
    pub parent_id: Option<u64>,
    pub name: String,
    pub path: String,
    pub kind: EntryKind,
    pub doc_type: String,
    pub content: Option<EntryContent>,
}

impl StoredEntry {
    #[must_use]
    pub fn entry_ref(&self) -> EntryRef {
        EntryRef {
            id: self.id,
            path: self.path.clone(),
        }
    }
}

/// Lifecycle state of an import worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Created,
    Running,
    Completed,
    Failed,
}

impl WorkerState {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerState::Created => "created",
            WorkerState::Running => "running",
            WorkerState::Completed => "completed",
            WorkerState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final record of a single worker's run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerSummary {
    pub task_id: String,
    pub thread_name: String,
    /// Source path of the subtree this worker owned
    pub root_path: String,
    pub state: WorkerState,
    pub created: u64,
    pub committed: u64,
    pub commit_cycles: u64,
    pub error: Option<String>,
}

/// Throughput observation emitted by the importer's progress loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThroughputSnapshot {
    pub timestamp_ms: u64,
    pub created_documents: u64,
    pub active_workers: usize,
    pub average_docs_per_sec: f64,
    pub recent_docs_per_sec: Option<f64>,
}

/// Result of a whole import run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportReport {
    pub job_name: String,
    pub repository: String,
    pub destination_path: String,
    pub created: u64,
    pub workers: Vec<WorkerSummary>,
    pub failed_workers: usize,
    pub elapsed_ms: u64,
    pub average_docs_per_sec: f64,
    pub throughput: Vec<ThroughputSnapshot>,
}

impl ImportReport {
    #[must_use]
    pub fn completed_workers(&self) -> usize {
        self.workers
            .iter()
            .filter(|w| w.state == WorkerState::Completed)
            .count()
    }

    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.failed_workers > 0
    }
}
