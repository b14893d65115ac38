//! Transactional target store boundary.
//!
//! A store hands out sessions; each session is owned by exactly one worker and
//! is never shared across threads. Creations made through a session stay
//! private to it until `commit` succeeds.

pub mod memory;

use crate::models::{EntryDraft, EntryRef};
use std::time::Duration;
use thiserror::Error;

pub use memory::{InMemoryStore, MemorySession};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Entry not found: {0}")]
    NotFound(String),

    #[error("Entry already exists: {0}")]
    Conflict(String),

    #[error("Transaction timed out after {elapsed_ms} ms (limit {timeout_ms} ms)")]
    TransactionTimeout { elapsed_ms: u64, timeout_ms: u64 },

    #[error("Transaction was marked rollback-only")]
    RollbackOnly,

    #[error("No active transaction")]
    NoTransaction,

    #[error("Session is closed")]
    Closed,

    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// A store the importer writes into
pub trait TargetStore: Send + Sync {
    /// Identifier of the repository, used in logs and reports
    fn repository(&self) -> &str;

    /// Open a new session. The caller owns it exclusively.
    fn open_session(&self) -> StoreResult<Box<dyn TargetSession>>;

    /// Look up a committed entry by absolute path.
    fn resolve_path(&self, path: &str) -> StoreResult<Option<EntryRef>>;

    /// Create every missing folder along `path` and return the last one.
    fn create_path(&self, path: &str) -> StoreResult<EntryRef>;
}

/// A unit of exclusive access to the store
pub trait TargetSession {
    /// Start a transaction bounded by `timeout`.
    fn begin(&mut self, timeout: Duration) -> StoreResult<()>;

    /// Whether a transaction is currently open.
    fn in_transaction(&self) -> bool;

    /// Re-fetch an entry through this session.
    fn resolve(&mut self, entry: &EntryRef) -> StoreResult<EntryRef>;

    /// Create a child of `parent` (or of the store root when `None`).
    fn create_entry(&mut self, parent: Option<&EntryRef>, draft: EntryDraft)
    -> StoreResult<EntryRef>;

    /// Push pending creations to the store's transaction log.
    fn flush(&mut self) -> StoreResult<()>;

    /// Make the current transaction durable and visible to other sessions.
    fn commit(&mut self) -> StoreResult<()>;

    /// Discard the current transaction.
    fn rollback(&mut self) -> StoreResult<()>;

    /// A transaction marked rollback-only can no longer commit.
    fn is_rollback_only(&self) -> bool;

    /// Release the session, rolling back anything uncommitted.
    fn close(&mut self);
}

/// Split an absolute store path into its components, rejecting empty segments.
pub fn path_segments(path: &str) -> StoreResult<Vec<&str>> {
    if !path.starts_with('/') {
        return Err(StoreError::InvalidPath(path.to_string()));
    }

    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let segments: Vec<&str> = trimmed[1..].split('/').collect();
    if segments.iter().any(|s| s.is_empty() || *s == "." || *s == "..") {
        return Err(StoreError::InvalidPath(path.to_string()));
    }
    Ok(segments)
}

/// Join a child name onto a parent path.
#[must_use]
pub fn child_path(parent: Option<&str>, name: &str) -> String {
    match parent {
        Some("/") | None => format!("/{name}"),
        Some(parent) => format!("{parent}/{name}"),
    }
}
