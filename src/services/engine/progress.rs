//! Throughput reporting for the importer's polling loop.

use crate::models::ThroughputSnapshot;
use std::time::{Duration, Instant};

const MIN_INTERVAL: Duration = Duration::from_millis(100);

/// Default time between two throughput reports
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(5);

/// Time-based throttler that also reports whenever the number of active
/// workers changes.
#[derive(Debug)]
pub struct ThroughputThrottler {
    interval: Duration,
    started: Instant,
    last_emit: Option<Instant>,
    last_emit_docs: u64,
    last_active: Option<usize>,
}

impl ThroughputThrottler {
    #[must_use]
    pub fn new(started: Instant) -> Self {
        Self::with_interval(started, DEFAULT_REPORT_INTERVAL)
    }

    #[must_use]
    pub fn with_interval(started: Instant, interval: Duration) -> Self {
        Self {
            interval: interval.max(MIN_INTERVAL),
            started,
            last_emit: None,
            last_emit_docs: 0,
            last_active: None,
        }
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Consider emitting a snapshot for the current counters.
    pub fn consider(
        &mut self,
        now: Instant,
        created: u64,
        active_workers: usize,
    ) -> Option<ThroughputSnapshot> {
        let since_last = now.saturating_duration_since(self.last_emit.unwrap_or(self.started));
        let active_changed = self.last_active != Some(active_workers);

        if since_last >= self.interval || active_changed {
            return Some(self.emit(now, created, active_workers));
        }
        None
    }

    /// Emit a snapshot regardless of thresholds.
    pub fn force_emit(
        &mut self,
        now: Instant,
        created: u64,
        active_workers: usize,
    ) -> ThroughputSnapshot {
        self.emit(now, created, active_workers)
    }

    fn emit(&mut self, now: Instant, created: u64, active_workers: usize) -> ThroughputSnapshot {
        let since_start = now.saturating_duration_since(self.started);
        let recent = self.last_emit.and_then(|last| {
            docs_per_sec(
                created.saturating_sub(self.last_emit_docs),
                now.saturating_duration_since(last),
            )
        });

        self.last_emit = Some(now);
        self.last_emit_docs = created;
        self.last_active = Some(active_workers);

        ThroughputSnapshot {
            timestamp_ms: u64::try_from(since_start.as_millis()).unwrap_or(u64::MAX),
            created_documents: created,
            active_workers,
            average_docs_per_sec: docs_per_sec(created, since_start).unwrap_or(0.0),
            recent_docs_per_sec: recent,
        }
    }
}

/// Documents per second over `elapsed`, `None` when no time has passed.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn docs_per_sec(docs: u64, elapsed: Duration) -> Option<f64> {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return None;
    }
    Some(docs as f64 / secs)
}
