use parking_lot::{Condvar, Mutex};
use std::any::Any;
use std::collections::VecDeque;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Worker count used when none (or a nonsensical one) is requested.
pub const DEFAULT_THREADS: usize = 5;
/// Requests above this fall back to [`DEFAULT_THREADS`].
pub const MAX_THREADS: usize = 256;

/// Parses a user-supplied thread count. Missing, non-numeric, zero, negative
/// or absurdly large values fall back to [`DEFAULT_THREADS`].
pub fn thread_count(raw: Option<&str>) -> usize {
    match raw.map(str::trim).and_then(|s| s.parse::<i64>().ok()) {
        Some(n) if n >= 1 && n as usize <= MAX_THREADS => n as usize,
        _ => DEFAULT_THREADS,
    }
}

type Job = Box<dyn FnOnce() + Send + 'static>;

struct Shared {
    tasks: Mutex<VecDeque<Job>>,
    available: Condvar,
    pending: Mutex<usize>,
    drained: Condvar,
    shutdown: AtomicBool,
}

impl Shared {
    fn submit(&self, job: Job) -> bool {
        let mut tasks = self.tasks.lock();
        // checked under the task lock so shutdown cannot strand a job
        if self.shutdown.load(Ordering::Acquire) {
            tracing::warn!("work queue is shut down; dropping task");
            return false;
        }
        *self.pending.lock() += 1;
        tasks.push_back(job);
        drop(tasks);
        self.available.notify_one();
        true
    }

    fn complete(&self, finished: usize) {
        let mut pending = self.pending.lock();
        *pending = pending.saturating_sub(finished);
        if *pending == 0 {
            self.drained.notify_all();
        }
    }

    fn next_job(&self) -> Option<Job> {
        let mut tasks = self.tasks.lock();
        loop {
            if self.shutdown.load(Ordering::Acquire) {
                return None;
            }
            if let Some(job) = tasks.pop_front() {
                return Some(job);
            }
            self.available.wait(&mut tasks);
        }
    }
}

fn run_worker(shared: Arc<Shared>) {
    let name = thread::current().name().unwrap_or("worker").to_string();
    tracing::debug!(worker = %name, "worker started");
    while let Some(job) = shared.next_job() {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
            tracing::error!(worker = %name, reason = %panic_message(&*payload), "task panicked");
        }
        shared.complete(1);
    }
    tracing::debug!(worker = %name, "worker stopped");
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

/// Cloneable handle for submitting work, meant to be moved into tasks that
/// schedule further tasks (the crawler does this for every discovered link).
#[derive(Clone)]
pub struct Spawner {
    shared: Arc<Shared>,
}

impl Spawner {
    /// Returns false if the queue has been shut down and the task was dropped.
    pub fn execute<F>(&self, task: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.shared.submit(Box::new(task))
    }
}

/// Fixed pool of worker threads pulling from one shared task list, with a
/// pending-work counter so callers can wait for everything submitted so far,
/// including work submitted by running tasks, to complete.
pub struct WorkQueue {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkQueue {
    pub fn new(threads: usize) -> io::Result<Self> {
        let threads = threads.max(1);
        let shared = Arc::new(Shared {
            tasks: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
            pending: Mutex::new(0),
            drained: Condvar::new(),
            shutdown: AtomicBool::new(false),
        });
        let mut workers = Vec::with_capacity(threads);
        for i in 0..threads {
            let shared = Arc::clone(&shared);
            let handle = thread::Builder::new()
                .name(format!("worker-{i}"))
                .spawn(move || run_worker(shared))?;
            workers.push(handle);
        }
        tracing::info!(threads, "work queue started");
        Ok(Self { shared, workers })
    }

    pub fn with_default_threads() -> io::Result<Self> {
        Self::new(DEFAULT_THREADS)
    }

    /// Queues a task without blocking. Returns false if the queue has been
    /// shut down and the task was dropped.
    pub fn execute<F>(&self, task: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.shared.submit(Box::new(task))
    }

    pub fn spawner(&self) -> Spawner {
        Spawner { shared: Arc::clone(&self.shared) }
    }

    /// Blocks until every submitted task, and everything those tasks
    /// submitted, has completed. Workers keep running. Must not be called from
    /// inside a task of this queue.
    pub fn finish(&self) {
        let mut pending = self.shared.pending.lock();
        while *pending > 0 {
            self.shared.drained.wait(&mut pending);
        }
    }

    /// Stops workers from taking new tasks. Tasks still queued are dropped;
    /// tasks already running are left to complete.
    pub fn shutdown(&self) {
        let abandoned: Vec<Job> = {
            let mut tasks = self.shared.tasks.lock();
            self.shared.shutdown.store(true, Ordering::Release);
            tasks.drain(..).collect()
        };
        self.shared.available.notify_all();
        if !abandoned.is_empty() {
            tracing::warn!(count = abandoned.len(), "abandoning queued tasks");
            let count = abandoned.len();
            drop(abandoned);
            self.shared.complete(count);
        }
    }

    /// `finish`, then `shutdown`, then wait for every worker to exit.
    pub fn join(mut self) {
        self.finish();
        self.shutdown();
        self.join_workers();
    }

    fn join_workers(&mut self) {
        let current = thread::current().id();
        for handle in self.workers.drain(..) {
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                tracing::error!("worker thread exited abnormally");
            }
        }
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Tasks submitted but not yet completed.
    pub fn pending(&self) -> usize {
        *self.shared.pending.lock()
    }

    pub fn is_shutdown(&self) -> bool {
        self.shared.shutdown.load(Ordering::Acquire)
    }
}

impl Drop for WorkQueue {
    fn drop(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        self.shutdown();
        self.join_workers();
    }
}
