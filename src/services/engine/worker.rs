//! Import worker: walks one subtree inside its own session, committing in
//! batches and handing subtrees to new workers when the policy says so.

use super::{ImportContext, ROOT_TASK_ID};
use crate::models::{EntryRef, WorkerState, WorkerSummary};
use crate::services::factory::CreationError;
use crate::services::metrics::WorkerKey;
use crate::services::policy::ForkSignals;
use crate::services::source::SourceNode;
use crate::services::store::TargetSession;
use crate::{Error, Result};
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::thread;

/// A unit of import work bound to one subtree. Runs exactly once.
pub struct ImportWorker {
    ctx: Arc<ImportContext>,
    task_id: String,
    root_node: Box<dyn SourceNode>,
    destination: Option<EntryRef>,
    is_root: bool,
    skip_container_creation: bool,
}

impl std::fmt::Debug for ImportWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImportWorker")
            .field("task_id", &self.task_id)
            .field("root", &self.root_node.source_path())
            .field("destination", &self.destination)
            .finish_non_exhaustive()
    }
}

impl ImportWorker {
    /// Worker importing the whole source tree into `destination`.
    #[must_use]
    pub fn root(
        ctx: Arc<ImportContext>,
        root_node: Box<dyn SourceNode>,
        destination: Option<EntryRef>,
        skip_root_container_creation: bool,
    ) -> Self {
        Self {
            ctx,
            task_id: ROOT_TASK_ID.to_string(),
            root_node,
            destination,
            is_root: true,
            skip_container_creation: skip_root_container_creation,
        }
    }

    /// Worker owning a subtree whose folder the parent already created.
    #[must_use]
    pub fn forked(
        ctx: Arc<ImportContext>,
        task_id: String,
        root_node: Box<dyn SourceNode>,
        folder: EntryRef,
    ) -> Self {
        Self {
            ctx,
            task_id,
            root_node,
            destination: Some(folder),
            is_root: false,
            skip_container_creation: true,
        }
    }

    /// Import the subtree. Failures, panics included, are contained in the
    /// returned summary; they are also recorded on the context and reported
    /// to listeners.
    pub fn run(self) -> WorkerSummary {
        let Self {
            ctx,
            task_id,
            root_node,
            destination,
            is_root,
            skip_container_creation,
        } = self;
        let thread_name = thread::current().name().unwrap_or("main").to_string();
        let key = WorkerKey::new(thread_name.clone(), task_id.clone());
        let root_path = root_node.source_path();

        if is_root {
            ctx.metrics.reset();
        }

        log::info!("[{task_id}] Starting import of {root_path} on {thread_name}");

        let mut summary = WorkerSummary {
            task_id: task_id.clone(),
            thread_name,
            root_path: root_path.clone(),
            state: WorkerState::Running,
            created: 0,
            committed: 0,
            commit_cycles: 0,
            error: None,
        };

        let result = match ctx.store.open_session() {
            Ok(session) => {
                let mut walk = Walk {
                    ctx: Arc::clone(&ctx),
                    session,
                    key,
                    skip_container_creation,
                    pending_count: 0,
                    created_count: 0,
                    committed_count: 0,
                    commit_cycles: 0,
                    forks: 0,
                };
                let result =
                    catch_unwind(AssertUnwindSafe(|| walk.execute(root_node, destination)))
                        .unwrap_or_else(|payload| {
                            Err(Error::WorkerPanicked(panic_message(payload.as_ref())))
                        });

                if result.is_err() {
                    // Publish what actually survived; the open batch is
                    // rolled back when the session closes
                    walk.publish();
                }
                walk.session.close();

                summary.created = walk.created_count;
                summary.committed = walk.committed_count;
                summary.commit_cycles = walk.commit_cycles;
                if result.is_ok() {
                    log::info!(
                        "[{task_id}] Finished {root_path}: {} documents created, {} forks",
                        walk.created_count,
                        walk.forks
                    );
                }
                result
            }
            Err(e) => Err(Error::Store(e)),
        };

        match result {
            Ok(()) => summary.state = WorkerState::Completed,
            Err(e) => {
                summary.state = WorkerState::Failed;
                summary.error = Some(e.to_string());
                log::error!("[{task_id}] Import of {root_path} aborted: {e}");
                for listener in &ctx.listeners {
                    listener.import_error(&summary);
                }
            }
        }

        ctx.record_outcome(summary.clone());
        summary
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Mutable state of a running worker
struct Walk {
    ctx: Arc<ImportContext>,
    session: Box<dyn TargetSession>,
    key: WorkerKey,
    /// Set exactly once, for a subtree root whose folder already exists
    skip_container_creation: bool,
    pending_count: usize,
    created_count: u64,
    committed_count: u64,
    commit_cycles: u64,
    forks: u64,
}

impl Walk {
    fn execute(&mut self, root: Box<dyn SourceNode>, destination: Option<EntryRef>) -> Result<()> {
        self.session.begin(self.ctx.transaction_timeout)?;

        // The destination may have been committed by another session
        let destination = match destination {
            Some(entry) => Some(self.session.resolve(&entry)?),
            None => None,
        };

        self.visit(destination.as_ref(), root, 0)?;
        self.commit(true)
    }

    fn visit(
        &mut self,
        parent: Option<&EntryRef>,
        node: Box<dyn SourceNode>,
        depth: u32,
    ) -> Result<()> {
        if !self.ctx.factory.is_folderish(node.as_ref()) {
            return self.visit_leaf(parent, node.as_ref());
        }

        if !self.admits(node.as_ref()) {
            return Ok(());
        }

        let folder = if self.skip_container_creation {
            self.skip_container_creation = false;
            parent.cloned()
        } else {
            match self
                .ctx
                .factory
                .create_folder(self.session.as_mut(), parent, node.as_ref())
            {
                Ok(entry) => {
                    self.created_count += 1;
                    self.commit(false)?;

                    // A worker always walks into its own subtree root
                    if depth > 0 && self.should_fork(parent, node.as_ref()) {
                        return self.fork(entry, node);
                    }
                    Some(entry)
                }
                Err(err) => {
                    return self.folder_failed(parent, node.as_ref(), err);
                }
            }
        };

        let children = match node.children() {
            Ok(children) => children,
            Err(source) => {
                let err = CreationError::Listing {
                    path: node.source_path(),
                    source,
                };
                return self.folder_failed(parent, node.as_ref(), err);
            }
        };

        for child in children {
            match child {
                Ok(child) => self.visit(folder.as_ref(), child, depth + 1)?,
                Err(source) => {
                    let err = CreationError::Listing {
                        path: node.source_path(),
                        source,
                    };
                    self.folder_failed(parent, node.as_ref(), err)?;
                }
            }
        }
        Ok(())
    }

    fn visit_leaf(&mut self, parent: Option<&EntryRef>, node: &dyn SourceNode) -> Result<()> {
        if !self.admits(node) {
            return Ok(());
        }

        match self
            .ctx
            .factory
            .create_leaf(self.session.as_mut(), parent, node)
        {
            Ok(_) => {
                self.created_count += 1;
                log::trace!("[{}] Created {}", self.key.task_id, node.source_path());
                self.commit(false)
            }
            Err(err) => {
                if self.ctx.factory.on_leaf_creation_error(parent, node, &err) {
                    Ok(())
                } else {
                    Err(Error::Creation(err))
                }
            }
        }
    }

    /// Ask the factory whether to go on; `Ok` means the subtree is skipped.
    fn folder_failed(
        &mut self,
        parent: Option<&EntryRef>,
        node: &dyn SourceNode,
        err: CreationError,
    ) -> Result<()> {
        if self.ctx.factory.on_folder_creation_error(parent, node, &err) {
            Ok(())
        } else {
            Err(Error::Creation(err))
        }
    }

    fn admits(&self, node: &dyn SourceNode) -> bool {
        self.ctx
            .document_filters
            .iter()
            .all(|filter| filter.should_import_document(node))
    }

    fn should_fork(&self, parent: Option<&EntryRef>, node: &dyn SourceNode) -> bool {
        let signals = ForkSignals {
            created_by_worker: self.created_count,
            batch_size: self.ctx.batch_size,
            queue_depth: self.ctx.pool.queue_depth(),
        };
        self.ctx.policy.should_fork(parent, node, signals)
    }

    fn fork(&mut self, folder: EntryRef, node: Box<dyn SourceNode>) -> Result<()> {
        // The new worker re-fetches the folder from its own session
        self.commit(true)?;

        let task_id = self.ctx.next_task_id();
        log::debug!(
            "[{}] Forking {} to {task_id}",
            self.key.task_id,
            node.source_path()
        );

        let worker = ImportWorker::forked(Arc::clone(&self.ctx), task_id, node, folder);
        self.ctx.pool.submit(Box::new(move || {
            worker.run();
        }))?;
        self.forks += 1;
        Ok(())
    }

    /// Count a creation and commit when a batch is full, or whenever `force`
    /// is set and something is pending.
    fn commit(&mut self, force: bool) -> Result<()> {
        if !force {
            self.pending_count += 1;
        }
        if self.pending_count == 0 {
            return Ok(());
        }
        if !force && self.pending_count % self.ctx.batch_size != 0 {
            return Ok(());
        }

        let batch = self.pending_count;
        self.session.flush()?;
        if self.session.is_rollback_only() {
            self.session.rollback()?;
            log::warn!(
                "[{}] Transaction marked rollback-only; {batch} documents rolled back",
                self.key.task_id
            );
        } else {
            self.session.commit()?;
            self.committed_count += batch as u64;
        }
        self.session.begin(self.ctx.transaction_timeout)?;

        self.commit_cycles += 1;
        self.pending_count = 0;
        self.publish();

        log::debug!(
            "[{}] Committed {batch} documents ({} so far on {})",
            self.key.task_id,
            self.committed_count,
            self.key.thread_name
        );
        Ok(())
    }

    fn publish(&self) {
        self.ctx.metrics.publish(&self.key, self.committed_count);
    }
}
