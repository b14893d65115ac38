//! Lifecycle filters, per-node admission filters, and import listeners

use crate::models::WorkerSummary;
use crate::services::source::SourceNode;
use regex::Regex;

/// Hooks run around the whole import
pub trait ImporterFilter: Send + Sync {
    /// Runs before any worker starts. An error vetoes the import.
    fn handle_before_import(&self) -> crate::Result<()> {
        Ok(())
    }

    /// Runs once the pool has shut down, with the run's terminal error if any.
    fn handle_after_import(&self, _error: Option<&crate::Error>) {}
}

/// Decides per node whether it is imported at all
pub trait ImportingDocumentFilter: Send + Sync {
    fn should_import_document(&self, node: &dyn SourceNode) -> bool;
}

/// Observes the import's lifecycle
pub trait ImporterListener: Send + Sync {
    fn before_import(&self) {}

    fn after_import(&self) {}

    /// A worker aborted its subtree.
    fn import_error(&self, _worker: &WorkerSummary) {}
}

/// Skips nodes whose name matches any of the configured patterns
#[derive(Debug, Clone, Default)]
pub struct NamePatternFilter {
    patterns: Vec<Regex>,
}

impl NamePatternFilter {
    /// Compile the exclusion patterns.
    pub fn new<I, S>(patterns: I) -> crate::Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| {
                Regex::new(p.as_ref()).map_err(|e| {
                    crate::Error::InvalidConfig(format!("bad exclude pattern '{}': {e}", p.as_ref()))
                })
            })
            .collect::<crate::Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl ImportingDocumentFilter for NamePatternFilter {
    fn should_import_document(&self, node: &dyn SourceNode) -> bool {
        let name = node.name();
        match self.patterns.iter().find(|p| p.is_match(name)) {
            Some(pattern) => {
                log::debug!("Excluding {} (matches {pattern})", node.source_path());
                false
            }
            None => true,
        }
    }
}

/// Writes lifecycle events to the log
#[derive(Debug, Clone, Default)]
pub struct LoggingListener {
    pub job_name: String,
}

impl LoggingListener {
    #[must_use]
    pub fn new(job_name: impl Into<String>) -> Self {
        Self {
            job_name: job_name.into(),
        }
    }
}

impl ImporterListener for LoggingListener {
    fn before_import(&self) {
        log::info!("[{}] Import starting", self.job_name);
    }

    fn after_import(&self) {
        log::info!("[{}] Import finished", self.job_name);
    }

    fn import_error(&self, worker: &WorkerSummary) {
        log::error!(
            "[{}] Worker {} ({}) failed on {}: {}",
            self.job_name,
            worker.task_id,
            worker.thread_name,
            worker.root_path,
            worker.error.as_deref().unwrap_or("unknown error")
        );
    }
}
