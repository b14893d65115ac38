//! Fixed-size worker pool fed by a bounded queue.
//!
//! Submitting into a full queue blocks the caller until a slot frees up. This
//! is the only backpressure against runaway forking.

use crate::{Error, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Unit of work run on a pool thread
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Prefix of pool thread names
pub const THREAD_NAME_PREFIX: &str = "import-worker";

const IDLE_WAIT: Duration = Duration::from_millis(50);

#[derive(Debug, Default)]
struct PoolState {
    /// Queued plus running
    pending: AtomicUsize,
    active: AtomicUsize,
    completed: AtomicUsize,
    panicked: AtomicUsize,
    discarded: AtomicUsize,
    accepting: AtomicBool,
    draining: AtomicBool,
    aborted: AtomicBool,
}

/// Cloneable submission side of a [`WorkerPool`]
#[derive(Clone)]
pub struct PoolHandle {
    sender: Sender<Job>,
    state: Arc<PoolState>,
}

impl std::fmt::Debug for PoolHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolHandle")
            .field("queued", &self.sender.len())
            .field("pending", &self.state.pending.load(Ordering::Relaxed))
            .finish()
    }
}

impl PoolHandle {
    /// Queue a job, blocking while the queue is full.
    pub fn submit(&self, job: Job) -> Result<()> {
        if !self.state.accepting.load(Ordering::Acquire) {
            return Err(Error::PoolShutdown);
        }

        // Counted before it is visible, so a parent never lets pending hit
        // zero while its fork is in flight
        self.state.pending.fetch_add(1, Ordering::AcqRel);
        if self.sender.send(job).is_err() {
            self.state.pending.fetch_sub(1, Ordering::AcqRel);
            return Err(Error::PoolShutdown);
        }
        Ok(())
    }

    /// Tasks waiting in the queue
    #[must_use]
    pub fn queue_depth(&self) -> usize {
        self.sender.len()
    }

    /// Tasks queued or running
    #[must_use]
    pub fn pending(&self) -> usize {
        self.state.pending.load(Ordering::Acquire)
    }

    /// Tasks currently running
    #[must_use]
    pub fn active(&self) -> usize {
        self.state.active.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.pending() == 0
    }
}

pub struct WorkerPool {
    handle: PoolHandle,
    handles: Vec<JoinHandle<()>>,
    capacity: usize,
}

impl WorkerPool {
    /// Spawn `size` named threads consuming a queue of `capacity` slots.
    pub fn new(size: usize, capacity: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::InvalidConfig("pool size must be positive".into()));
        }
        if capacity == 0 {
            return Err(Error::InvalidConfig("queue capacity must be positive".into()));
        }

        let (sender, receiver) = bounded::<Job>(capacity);
        let state = Arc::new(PoolState {
            accepting: AtomicBool::new(true),
            ..PoolState::default()
        });

        let mut handles = Vec::with_capacity(size);
        for id in 0..size {
            let receiver = receiver.clone();
            let state = Arc::clone(&state);
            let handle = thread::Builder::new()
                .name(format!("{THREAD_NAME_PREFIX}-{id}"))
                .spawn(move || worker_loop(&receiver, &state))?;
            handles.push(handle);
        }

        log::debug!("Worker pool started: {size} threads, queue capacity {capacity}");

        Ok(Self {
            handle: PoolHandle { sender, state },
            handles,
            capacity,
        })
    }

    #[must_use]
    pub fn handle(&self) -> PoolHandle {
        self.handle.clone()
    }

    pub fn submit(&self, job: Job) -> Result<()> {
        self.handle.submit(job)
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.handles.len()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn queue_depth(&self) -> usize {
        self.handle.queue_depth()
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.handle.pending()
    }

    #[must_use]
    pub fn active(&self) -> usize {
        self.handle.active()
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.handle.is_idle()
    }

    /// Jobs that ran to completion (panicked jobs included)
    #[must_use]
    pub fn completed(&self) -> usize {
        self.handle.state.completed.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn panicked(&self) -> usize {
        self.handle.state.panicked.load(Ordering::Acquire)
    }

    /// Stop accepting work, let queued and running jobs finish, join threads.
    pub fn shutdown(self) {
        self.stop(false);
    }

    /// Stop accepting work, drop queued jobs, join threads once running jobs
    /// return. Running jobs are not interrupted. Returns the number of
    /// discarded jobs.
    pub fn shutdown_now(self) -> usize {
        self.stop(true)
    }

    fn stop(mut self, abort: bool) -> usize {
        let state = &self.handle.state;
        state.accepting.store(false, Ordering::Release);
        if abort {
            state.aborted.store(true, Ordering::Release);
        }
        state.draining.store(true, Ordering::Release);

        for handle in self.handles.drain(..) {
            let name = handle.thread().name().unwrap_or("?").to_string();
            if handle.join().is_err() {
                log::error!("Pool thread {name} terminated abnormally");
            }
        }

        let discarded = state.discarded.load(Ordering::Acquire);
        if discarded > 0 {
            log::warn!("Discarded {discarded} queued tasks on forced shutdown");
        }
        log::debug!(
            "Worker pool stopped ({} completed, {} panicked)",
            state.completed.load(Ordering::Acquire),
            state.panicked.load(Ordering::Acquire)
        );
        discarded
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if self.handles.is_empty() {
            return;
        }
        let state = &self.handle.state;
        state.accepting.store(false, Ordering::Release);
        state.aborted.store(true, Ordering::Release);
        state.draining.store(true, Ordering::Release);
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

fn worker_loop(receiver: &Receiver<Job>, state: &PoolState) {
    loop {
        match receiver.recv_timeout(IDLE_WAIT) {
            Ok(job) => {
                if state.aborted.load(Ordering::Acquire) {
                    drop(job);
                    state.discarded.fetch_add(1, Ordering::AcqRel);
                    state.pending.fetch_sub(1, Ordering::AcqRel);
                    continue;
                }
                run_job(job, state);
            }
            Err(RecvTimeoutError::Timeout) => {
                if state.draining.load(Ordering::Acquire) && receiver.is_empty() {
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

fn run_job(job: Job, state: &PoolState) {
    state.active.fetch_add(1, Ordering::AcqRel);
    if catch_unwind(AssertUnwindSafe(job)).is_err() {
        state.panicked.fetch_add(1, Ordering::AcqRel);
        log::error!(
            "Task panicked on {}",
            thread::current().name().unwrap_or("unnamed thread")
        );
    }
    state.active.fetch_sub(1, Ordering::AcqRel);
    state.completed.fetch_add(1, Ordering::AcqRel);
    state.pending.fetch_sub(1, Ordering::AcqRel);
}
