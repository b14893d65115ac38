//! In-memory transactional store.
//!
//! Committed entries live behind a single `RwLock`; each session stages its
//! creations privately and publishes them atomically on commit.

use super::{StoreError, StoreResult, TargetSession, TargetStore, child_path, path_segments};
use crate::models::{EntryDraft, EntryKind, EntryRef, StoredEntry};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

const ROOT_ID: u64 = 0;
const ROOT_PATH: &str = "/";

#[derive(Default)]
struct StoreState {
    entries: HashMap<u64, StoredEntry>,
    by_path: HashMap<String, u64>,
    commit_log: Vec<usize>,
}

struct StoreInner {
    repository: String,
    state: RwLock<StoreState>,
    next_id: AtomicU64,
    sessions_opened: AtomicU64,
}

impl StoreInner {
    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Thread-safe in-memory store. Clones share the same underlying state.
#[derive(Clone)]
pub struct InMemoryStore {
    inner: Arc<StoreInner>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new("default")
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore")
            .field("repository", &self.inner.repository)
            .field("entries", &self.entry_count())
            .finish()
    }
}

impl InMemoryStore {
    #[must_use]
    pub fn new(repository: impl Into<String>) -> Self {
        let root = StoredEntry {
            id: ROOT_ID,
            parent_id: None,
            name: String::new(),
            path: ROOT_PATH.to_string(),
            kind: EntryKind::Folder,
            doc_type: "Root".to_string(),
            content: None,
        };

        let mut state = StoreState::default();
        state.by_path.insert(ROOT_PATH.to_string(), ROOT_ID);
        state.entries.insert(ROOT_ID, root);

        Self {
            inner: Arc::new(StoreInner {
                repository: repository.into(),
                state: RwLock::new(state),
                next_id: AtomicU64::new(ROOT_ID + 1),
                sessions_opened: AtomicU64::new(0),
            }),
        }
    }

    /// Open a concrete session (the trait method boxes this).
    #[must_use]
    pub fn session(&self) -> MemorySession {
        self.inner.sessions_opened.fetch_add(1, Ordering::Relaxed);
        MemorySession {
            inner: Arc::clone(&self.inner),
            tx: None,
            closed: false,
        }
    }

    /// Number of committed entries, not counting the store root.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.inner.read().entries.len().saturating_sub(1)
    }

    /// Committed entries sorted by path, not counting the store root.
    #[must_use]
    pub fn entries(&self) -> Vec<StoredEntry> {
        let state = self.inner.read();
        let mut entries: Vec<StoredEntry> = state
            .entries
            .values()
            .filter(|e| e.id != ROOT_ID)
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        entries
    }

    /// Look up a committed entry by path.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<StoredEntry> {
        let state = self.inner.read();
        state
            .by_path
            .get(path)
            .and_then(|id| state.entries.get(id))
            .cloned()
    }

    /// Committed direct children of the entry at `path`, sorted by name.
    #[must_use]
    pub fn children_of(&self, path: &str) -> Vec<StoredEntry> {
        let state = self.inner.read();
        let Some(parent_id) = state.by_path.get(path).copied() else {
            return Vec::new();
        };
        let mut children: Vec<StoredEntry> = state
            .entries
            .values()
            .filter(|e| e.parent_id == Some(parent_id))
            .cloned()
            .collect();
        children.sort_by(|a, b| a.name.cmp(&b.name));
        children
    }

    /// Number of entries published by each successful commit, in commit order.
    #[must_use]
    pub fn commit_log(&self) -> Vec<usize> {
        self.inner.read().commit_log.clone()
    }

    #[must_use]
    pub fn sessions_opened(&self) -> u64 {
        self.inner.sessions_opened.load(Ordering::Relaxed)
    }
}

impl TargetStore for InMemoryStore {
    fn repository(&self) -> &str {
        &self.inner.repository
    }

    fn open_session(&self) -> StoreResult<Box<dyn TargetSession>> {
        Ok(Box::new(self.session()))
    }

    fn resolve_path(&self, path: &str) -> StoreResult<Option<EntryRef>> {
        path_segments(path)?;
        let normalized = normalize(path);
        Ok(self.get(&normalized).map(|e| e.entry_ref()))
    }

    fn create_path(&self, path: &str) -> StoreResult<EntryRef> {
        let segments = path_segments(path)?;
        let mut state = self.inner.write();
        let mut current = ROOT_ID;
        let mut current_path = ROOT_PATH.to_string();

        for segment in segments {
            let next_path = child_path(Some(current_path.as_str()), segment);
            if let Some(id) = state.by_path.get(&next_path).copied() {
                let kind = state.entries.get(&id).map(|e| e.kind);
                if kind != Some(EntryKind::Folder) {
                    return Err(StoreError::InvalidPath(format!(
                        "{next_path} is not a folder"
                    )));
                }
                current = id;
            } else {
                let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
                let entry = StoredEntry {
                    id,
                    parent_id: Some(current),
                    name: segment.to_string(),
                    path: next_path.clone(),
                    kind: EntryKind::Folder,
                    doc_type: "Folder".to_string(),
                    content: None,
                };
                state.by_path.insert(next_path.clone(), id);
                state.entries.insert(id, entry);
                log::debug!("Created container {next_path}");
                current = id;
            }
            current_path = next_path;
        }

        Ok(EntryRef {
            id: current,
            path: current_path,
        })
    }
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        ROOT_PATH.to_string()
    } else {
        trimmed.to_string()
    }
}

struct Transaction {
    started: Instant,
    timeout: Duration,
    staged: Vec<StoredEntry>,
    staged_paths: HashMap<String, usize>,
    flushed: usize,
    rollback_only: bool,
}

impl Transaction {
    fn new(timeout: Duration) -> Self {
        Self {
            started: Instant::now(),
            timeout,
            staged: Vec::new(),
            staged_paths: HashMap::new(),
            flushed: 0,
            rollback_only: false,
        }
    }

    fn find(&self, id: u64) -> Option<&StoredEntry> {
        self.staged.iter().find(|e| e.id == id)
    }
}

/// Session on an [`InMemoryStore`]
pub struct MemorySession {
    inner: Arc<StoreInner>,
    tx: Option<Transaction>,
    closed: bool,
}

impl MemorySession {
    fn ensure_open(&self) -> StoreResult<()> {
        if self.closed {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    /// Creations staged in the open transaction and not yet committed.
    #[must_use]
    pub fn staged_count(&self) -> usize {
        self.tx.as_ref().map_or(0, |tx| tx.staged.len())
    }

    /// Force the open transaction into rollback-only mode.
    pub fn set_rollback_only(&mut self) {
        if let Some(tx) = self.tx.as_mut() {
            tx.rollback_only = true;
        }
    }

    fn lookup(&self, id: u64) -> Option<StoredEntry> {
        if let Some(entry) = self.tx.as_ref().and_then(|tx| tx.find(id)) {
            return Some(entry.clone());
        }
        self.inner.read().entries.get(&id).cloned()
    }
}

impl TargetSession for MemorySession {
    fn begin(&mut self, timeout: Duration) -> StoreResult<()> {
        self.ensure_open()?;
        if let Some(previous) = self.tx.take()
            && !previous.staged.is_empty()
        {
            log::warn!(
                "Discarding {} uncommitted entries from a transaction left open",
                previous.staged.len()
            );
        }
        self.tx = Some(Transaction::new(timeout));
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.tx.is_some()
    }

    fn resolve(&mut self, entry: &EntryRef) -> StoreResult<EntryRef> {
        self.ensure_open()?;
        self.lookup(entry.id)
            .map(|e| e.entry_ref())
            .ok_or_else(|| StoreError::NotFound(entry.path.clone()))
    }

    fn create_entry(
        &mut self,
        parent: Option<&EntryRef>,
        draft: EntryDraft,
    ) -> StoreResult<EntryRef> {
        self.ensure_open()?;
        if self.tx.is_none() {
            return Err(StoreError::NoTransaction);
        }

        if draft.name.is_empty() || draft.name.contains('/') {
            return Err(StoreError::InvalidPath(draft.name));
        }

        let parent_id = parent.map_or(ROOT_ID, |p| p.id);
        let parent_entry = self.lookup(parent_id).ok_or_else(|| {
            StoreError::NotFound(parent.map_or(ROOT_PATH, |p| p.path.as_str()).to_string())
        })?;
        if parent_entry.kind != EntryKind::Folder {
            return Err(StoreError::InvalidPath(format!(
                "{} is not a folder",
                parent_entry.path
            )));
        }

        let path = child_path(Some(parent_entry.path.as_str()), &draft.name);
        if self.inner.read().by_path.contains_key(&path) {
            return Err(StoreError::Conflict(path));
        }

        let Some(tx) = self.tx.as_mut() else {
            return Err(StoreError::NoTransaction);
        };
        if tx.staged_paths.contains_key(&path) {
            return Err(StoreError::Conflict(path));
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let entry = StoredEntry {
            id,
            parent_id: Some(parent_id),
            name: draft.name,
            path: path.clone(),
            kind: draft.kind,
            doc_type: draft.doc_type,
            content: draft.content,
        };
        tx.staged_paths.insert(path.clone(), tx.staged.len());
        tx.staged.push(entry);

        Ok(EntryRef { id, path })
    }

    fn flush(&mut self) -> StoreResult<()> {
        self.ensure_open()?;
        let tx = self.tx.as_mut().ok_or(StoreError::NoTransaction)?;
        tx.flushed = tx.staged.len();
        Ok(())
    }

    fn commit(&mut self) -> StoreResult<()> {
        self.ensure_open()?;
        let tx = self.tx.take().ok_or(StoreError::NoTransaction)?;

        if tx.rollback_only {
            return Err(StoreError::RollbackOnly);
        }

        let elapsed = tx.started.elapsed();
        if elapsed > tx.timeout {
            return Err(StoreError::TransactionTimeout {
                elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                timeout_ms: u64::try_from(tx.timeout.as_millis()).unwrap_or(u64::MAX),
            });
        }

        if tx.flushed < tx.staged.len() {
            log::trace!(
                "Commit publishes {} entries that were never flushed",
                tx.staged.len() - tx.flushed
            );
        }

        let mut state = self.inner.write();
        if let Some(existing) = tx.staged.iter().find(|e| state.by_path.contains_key(&e.path)) {
            return Err(StoreError::Conflict(existing.path.clone()));
        }

        let published = tx.staged.len();
        for entry in tx.staged {
            state.by_path.insert(entry.path.clone(), entry.id);
            state.entries.insert(entry.id, entry);
        }
        state.commit_log.push(published);
        Ok(())
    }

    fn rollback(&mut self) -> StoreResult<()> {
        self.ensure_open()?;
        let tx = self.tx.take().ok_or(StoreError::NoTransaction)?;
        if !tx.staged.is_empty() {
            log::debug!("Rolled back {} staged entries", tx.staged.len());
        }
        Ok(())
    }

    fn is_rollback_only(&self) -> bool {
        self.tx.as_ref().is_some_and(|tx| tx.rollback_only)
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        if let Some(tx) = self.tx.take()
            && !tx.staged.is_empty()
        {
            log::debug!(
                "Session closed with {} uncommitted entries; rolling back",
                tx.staged.len()
            );
        }
        self.closed = true;
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        self.close();
    }
}
