//! Unit tests for the metrics registry

use std::sync::Arc;
use std::thread;
use treeimport::MetricsRegistry;
use treeimport::services::metrics::WorkerKey;

#[test]
fn test_publish_replaces_previous_value() {
    let metrics = MetricsRegistry::new();
    let key = WorkerKey::new("import-worker-0", "T0");

    metrics.publish(&key, 10);
    metrics.publish(&key, 25);

    assert_eq!(metrics.get(&key), Some(25));
    assert_eq!(metrics.total(), 25);
    assert_eq!(metrics.publish_count(), 2);
}

#[test]
fn test_same_thread_different_tasks_are_kept_apart() {
    let metrics = MetricsRegistry::new();
    metrics.publish(&WorkerKey::new("import-worker-0", "T0"), 4);
    metrics.publish(&WorkerKey::new("import-worker-0", "T3"), 6);

    assert_eq!(metrics.worker_count(), 2);
    assert_eq!(metrics.total(), 10);
}

#[test]
fn test_reset_and_snapshot() {
    let metrics = MetricsRegistry::new();
    metrics.publish(&WorkerKey::new("b", "T1"), 2);
    metrics.publish(&WorkerKey::new("a", "T2"), 3);

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot[0].0.to_string(), "a/T2");
    assert_eq!(snapshot[1], (WorkerKey::new("b", "T1"), 2));

    metrics.reset();
    assert_eq!(metrics.total(), 0);
    assert_eq!(metrics.worker_count(), 0);
    assert_eq!(metrics.get(&WorkerKey::new("a", "T2")), None);
}

#[test]
fn test_concurrent_publishers() {
    let metrics = Arc::new(MetricsRegistry::new());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let metrics = Arc::clone(&metrics);
            thread::spawn(move || {
                let key = WorkerKey::new(format!("import-worker-{i}"), format!("T{i}"));
                for n in 1..=100 {
                    metrics.publish(&key, n);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(metrics.total(), 800);
    assert_eq!(metrics.publish_count(), 800);
}
