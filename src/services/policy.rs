//! Threading policies deciding when a folder's subtree gets its own worker

use crate::models::EntryRef;
use crate::services::source::SourceNode;

/// Inputs the policy sees at a folder boundary
#[derive(Debug, Clone, Copy)]
pub struct ForkSignals {
    /// Entries the asking worker created so far
    pub created_by_worker: u64,
    pub batch_size: usize,
    /// Tasks waiting in the pool's queue
    pub queue_depth: usize,
}

/// Decides whether a freshly created folder is handed to a new worker.
///
/// Called at every folder boundary from many workers at once, so
/// implementations must be cheap and deterministic for identical inputs.
pub trait ThreadingPolicy: Send + Sync {
    fn should_fork(
        &self,
        parent: Option<&EntryRef>,
        node: &dyn SourceNode,
        signals: ForkSignals,
    ) -> bool;
}

/// Default queue depth above which no more forks are made
pub const DEFAULT_MAX_QUEUE_DEPTH: usize = 5;

/// Forks once a worker has done a third of a batch, as long as the pool
/// queue is shallow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultThreadingPolicy {
    pub max_queue_depth: usize,
}

impl Default for DefaultThreadingPolicy {
    fn default() -> Self {
        Self {
            max_queue_depth: DEFAULT_MAX_QUEUE_DEPTH,
        }
    }
}

impl DefaultThreadingPolicy {
    #[must_use]
    pub fn new(max_queue_depth: usize) -> Self {
        Self { max_queue_depth }
    }
}

impl ThreadingPolicy for DefaultThreadingPolicy {
    fn should_fork(
        &self,
        _parent: Option<&EntryRef>,
        _node: &dyn SourceNode,
        signals: ForkSignals,
    ) -> bool {
        if signals.queue_depth >= self.max_queue_depth {
            return false;
        }
        // Tiny subtrees are not worth a worker
        signals.created_by_worker >= (signals.batch_size / 3) as u64
    }
}

/// Keeps every subtree in the worker that reached it.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverFork;

impl ThreadingPolicy for NeverFork {
    fn should_fork(&self, _: Option<&EntryRef>, _: &dyn SourceNode, _: ForkSignals) -> bool {
        false
    }
}

/// Forks at every eligible folder; mainly for exercising the fork path.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysFork;

impl ThreadingPolicy for AlwaysFork {
    fn should_fork(&self, _: Option<&EntryRef>, _: &dyn SourceNode, _: ForkSignals) -> bool {
        true
    }
}
