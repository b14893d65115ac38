//! Unit tests for threading policies

use treeimport::services::policy::{
    AlwaysFork, DEFAULT_MAX_QUEUE_DEPTH, DefaultThreadingPolicy, ForkSignals, NeverFork,
    ThreadingPolicy,
};
use treeimport::services::source::MemorySourceNode;

fn signals(created_by_worker: u64, batch_size: usize, queue_depth: usize) -> ForkSignals {
    ForkSignals {
        created_by_worker,
        batch_size,
        queue_depth,
    }
}

#[test]
fn test_default_policy_waits_for_a_third_of_a_batch() {
    let policy = DefaultThreadingPolicy::default();
    let node = MemorySourceNode::folder("f", vec![]);

    assert!(!policy.should_fork(None, &node, signals(15, 50, 0)));
    assert!(policy.should_fork(None, &node, signals(16, 50, 0)));
    assert!(policy.should_fork(None, &node, signals(1_000, 50, 4)));
}

#[test]
fn test_default_policy_stops_on_deep_queue() {
    let policy = DefaultThreadingPolicy::default();
    let node = MemorySourceNode::folder("f", vec![]);

    assert_eq!(policy.max_queue_depth, DEFAULT_MAX_QUEUE_DEPTH);
    assert!(!policy.should_fork(None, &node, signals(1_000, 50, 5)));
    assert!(!policy.should_fork(None, &node, signals(1_000, 50, 500)));

    let tolerant = DefaultThreadingPolicy::new(100);
    assert!(tolerant.should_fork(None, &node, signals(1_000, 50, 99)));
}

#[test]
fn test_small_batches_fork_immediately() {
    let policy = DefaultThreadingPolicy::default();
    let node = MemorySourceNode::folder("f", vec![]);

    // batch_size / 3 rounds down to zero
    assert!(policy.should_fork(None, &node, signals(0, 2, 0)));
}

#[test]
fn test_fixed_policies() {
    let node = MemorySourceNode::folder("f", vec![]);

    assert!(!NeverFork.should_fork(None, &node, signals(1_000, 1, 0)));
    assert!(AlwaysFork.should_fork(None, &node, signals(0, 50, 1_000)));
}
