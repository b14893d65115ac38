//! Import driver: owns the pool, starts the root worker, and polls until the
//! whole tree has been handled.

use super::progress::ThroughputThrottler;
use super::{ImportContext, ImportWorker, WorkerPool};
use crate::models::{EntryRef, ImportReport, ThroughputSnapshot, WorkerState};
use crate::services::factory::{DefaultEntryFactory, TargetEntryFactory};
use crate::services::filters::{ImporterFilter, ImporterListener, ImportingDocumentFilter};
use crate::services::metrics::MetricsRegistry;
use crate::services::policy::{DefaultThreadingPolicy, ThreadingPolicy};
use crate::services::source::SourceNode;
use crate::services::store::TargetStore;
use crate::{Error, ImportOptions, Result};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

pub struct Importer {
    store: Arc<dyn TargetStore>,
    options: ImportOptions,
    factory: Arc<dyn TargetEntryFactory>,
    policy: Arc<dyn ThreadingPolicy>,
    filters: Vec<Arc<dyn ImporterFilter>>,
    document_filters: Vec<Arc<dyn ImportingDocumentFilter>>,
    listeners: Vec<Arc<dyn ImporterListener>>,
    metrics: Arc<MetricsRegistry>,
}

impl Importer {
    /// Importer with the default factory and threading policy.
    #[must_use]
    pub fn new(store: Arc<dyn TargetStore>, options: ImportOptions) -> Self {
        let policy = DefaultThreadingPolicy::new(options.max_fork_queue_depth);
        Self {
            store,
            options,
            factory: Arc::new(DefaultEntryFactory::default()),
            policy: Arc::new(policy),
            filters: Vec::new(),
            document_filters: Vec::new(),
            listeners: Vec::new(),
            metrics: Arc::new(MetricsRegistry::new()),
        }
    }

    #[must_use]
    pub fn with_factory(mut self, factory: Arc<dyn TargetEntryFactory>) -> Self {
        self.factory = factory;
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: Arc<dyn ThreadingPolicy>) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: Arc<dyn ImporterFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    #[must_use]
    pub fn with_document_filter(mut self, filter: Arc<dyn ImportingDocumentFilter>) -> Self {
        self.document_filters.push(filter);
        self
    }

    #[must_use]
    pub fn with_listener(mut self, listener: Arc<dyn ImporterListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Share an externally owned registry, e.g. to watch counters from outside.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = metrics;
        self
    }

    #[must_use]
    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    #[must_use]
    pub fn metrics(&self) -> Arc<MetricsRegistry> {
        Arc::clone(&self.metrics)
    }

    /// Import `root` into the configured destination.
    ///
    /// Batches committed before a failure stay committed; a partial import
    /// is reported, not undone.
    pub fn run(&self, root: Box<dyn SourceNode>) -> Result<ImportReport> {
        let job = self.options.job_name.clone();
        for listener in &self.listeners {
            listener.before_import();
        }

        let result = self.do_run(root);

        let error = result.as_ref().err();
        for filter in &self.filters {
            filter.handle_after_import(error);
        }
        for listener in &self.listeners {
            listener.after_import();
        }

        match &result {
            Ok(report) => log::info!(
                "[{job}] Imported {} documents in {:.1}s ({:.1} docs/s, {} workers, {} failed)",
                report.created,
                report.elapsed_ms as f64 / 1000.0,
                report.average_docs_per_sec,
                report.workers.len(),
                report.failed_workers
            ),
            Err(e) => log::error!(
                "[{job}] Import failed after {} documents: {e}",
                self.metrics.total()
            ),
        }
        result
    }

    fn do_run(&self, root: Box<dyn SourceNode>) -> Result<ImportReport> {
        self.options.validate()?;
        let opts = &self.options;
        let started = Instant::now();

        let destination = self.resolve_destination()?;
        let pool = WorkerPool::new(opts.pool_size, opts.queue_capacity)?;

        for filter in &self.filters {
            if let Err(e) = filter.handle_before_import() {
                pool.shutdown_now();
                return Err(e);
            }
        }

        let ctx = Arc::new(ImportContext::new(
            Arc::clone(&self.store),
            Arc::clone(&self.factory),
            Arc::clone(&self.policy),
            self.document_filters.clone(),
            self.listeners.clone(),
            Arc::clone(&self.metrics),
            pool.handle(),
            opts.batch_size,
            opts.transaction_timeout(),
        ));

        log::info!(
            "[{}] Importing {} into {}:{} ({} threads, batch {}, queue {})",
            opts.job_name,
            root.source_path(),
            self.store.repository(),
            opts.destination_path,
            opts.pool_size,
            opts.batch_size,
            opts.queue_capacity
        );

        let worker = ImportWorker::root(
            Arc::clone(&ctx),
            root,
            destination,
            opts.skip_root_container_creation,
        );
        if let Err(e) = pool.submit(Box::new(move || {
            worker.run();
        })) {
            pool.shutdown_now();
            return Err(e);
        }

        let throughput = self.wait_for_completion(&pool, started);
        let panicked = pool.panicked();
        pool.shutdown();

        let workers = ctx.outcomes();
        let failed_workers = panicked
            + workers
                .iter()
                .filter(|w| w.state == WorkerState::Failed)
                .count();
        let created = self.metrics.total();
        let elapsed = started.elapsed();

        let report = ImportReport {
            job_name: opts.job_name.clone(),
            repository: self.store.repository().to_string(),
            destination_path: opts.destination_path.clone(),
            created,
            failed_workers,
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            average_docs_per_sec: super::progress::docs_per_sec(created, elapsed).unwrap_or(0.0),
            throughput,
            workers,
        };

        if report.failed_workers > 0 {
            log::warn!(
                "[{}] {} of {} workers failed; the import is partial",
                opts.job_name,
                report.failed_workers,
                report.workers.len() + panicked
            );
            if opts.fail_on_worker_error {
                return Err(Error::PartialFailure {
                    completed: report.completed_workers(),
                    failed: report.failed_workers,
                });
            }
        }

        Ok(report)
    }

    fn resolve_destination(&self) -> Result<Option<EntryRef>> {
        let path = &self.options.destination_path;
        match self.store.resolve_path(path)? {
            Some(entry) => Ok(Some(entry)),
            None if self.options.create_destination => {
                log::info!("Creating destination container {path}");
                Ok(Some(self.store.create_path(path)?))
            }
            None => Err(Error::DestinationNotFound(path.clone())),
        }
    }

    /// Poll until no task is queued or running, logging throughput on the way.
    fn wait_for_completion(&self, pool: &WorkerPool, started: Instant) -> Vec<ThroughputSnapshot> {
        let mut throttler =
            ThroughputThrottler::with_interval(started, self.options.progress_interval());
        let mut snapshots = Vec::new();
        let poll = self.options.poll_interval();

        loop {
            thread::sleep(poll);

            let pending = pool.pending();
            let active = pool.active();
            let created = self.metrics.total();

            if let Some(snapshot) = throttler.consider(Instant::now(), created, active) {
                log_snapshot(&self.options.job_name, &snapshot, pool.queue_depth());
                snapshots.push(snapshot);
            }

            if pending == 0 {
                break;
            }
        }

        let last = throttler.force_emit(Instant::now(), self.metrics.total(), 0);
        if snapshots
            .last()
            .is_none_or(|prev| prev.created_documents != last.created_documents)
        {
            snapshots.push(last);
        }
        snapshots
    }
}

fn log_snapshot(job: &str, snapshot: &ThroughputSnapshot, queue_depth: usize) {
    match snapshot.recent_docs_per_sec {
        Some(recent) => log::info!(
            "[{job}] {} documents, {:.1} docs/s average, {recent:.1} docs/s current, {} workers active, {queue_depth} queued",
            snapshot.created_documents,
            snapshot.average_docs_per_sec,
            snapshot.active_workers
        ),
        None => log::info!(
            "[{job}] {} documents, {:.1} docs/s average, {} workers active, {queue_depth} queued",
            snapshot.created_documents,
            snapshot.average_docs_per_sec,
            snapshot.active_workers
        ),
    }
}
