//! Unit tests for throughput reporting

use std::time::{Duration, Instant};
use treeimport::services::engine::progress::{ThroughputThrottler, docs_per_sec};

#[test]
fn test_docs_per_sec() {
    assert_eq!(docs_per_sec(100, Duration::from_secs(2)), Some(50.0));
    assert_eq!(docs_per_sec(100, Duration::ZERO), None);
}

#[test]
fn test_first_observation_is_reported() {
    let start = Instant::now();
    let mut throttler = ThroughputThrottler::with_interval(start, Duration::from_secs(5));

    let snapshot = throttler
        .consider(start + Duration::from_millis(200), 10, 2)
        .unwrap();
    assert_eq!(snapshot.created_documents, 10);
    assert_eq!(snapshot.active_workers, 2);
    assert_eq!(snapshot.timestamp_ms, 200);
    assert_eq!(snapshot.recent_docs_per_sec, None);
}

#[test]
fn test_quiet_within_interval_unless_workers_change() {
    let start = Instant::now();
    let mut throttler = ThroughputThrottler::with_interval(start, Duration::from_secs(5));
    throttler.consider(start + Duration::from_secs(1), 10, 2).unwrap();

    assert!(throttler.consider(start + Duration::from_secs(2), 20, 2).is_none());
    let changed = throttler.consider(start + Duration::from_secs(3), 30, 3).unwrap();
    assert_eq!(changed.active_workers, 3);
    // 20 documents over the 2s since the last report
    assert_eq!(changed.recent_docs_per_sec, Some(10.0));
    assert_eq!(changed.average_docs_per_sec, 10.0);
}

#[test]
fn test_reports_after_interval() {
    let start = Instant::now();
    let mut throttler = ThroughputThrottler::with_interval(start, Duration::from_secs(5));
    throttler.consider(start + Duration::from_secs(1), 0, 1).unwrap();

    assert!(throttler.consider(start + Duration::from_secs(5), 40, 1).is_none());
    let snapshot = throttler.consider(start + Duration::from_secs(6), 50, 1).unwrap();
    assert_eq!(snapshot.recent_docs_per_sec, Some(10.0));
}

#[test]
fn test_interval_has_a_floor() {
    let throttler = ThroughputThrottler::with_interval(Instant::now(), Duration::ZERO);
    assert_eq!(throttler.interval(), Duration::from_millis(100));
    assert_eq!(
        ThroughputThrottler::new(Instant::now()).interval(),
        Duration::from_secs(5)
    );
}

#[test]
fn test_force_emit_ignores_thresholds() {
    let start = Instant::now();
    let mut throttler = ThroughputThrottler::with_interval(start, Duration::from_secs(5));
    throttler.consider(start + Duration::from_secs(1), 5, 1).unwrap();

    let snapshot = throttler.force_emit(start + Duration::from_secs(2), 8, 1);
    assert_eq!(snapshot.created_documents, 8);
    assert_eq!(snapshot.average_docs_per_sec, 4.0);
}
