use crate::config::{PoolConfig, WaitPolicy};
use crate::err::{PoolError, Result};
use crate::handle::panic_message;
use crate::queue::BlockingQueue;
use crate::thread_pool::ThreadPool;
use log::{debug, error, info, warn};
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};

type Job = Box<dyn FnOnce() + Send + 'static>;

type SpawnFn = fn(usize, &str, Arc<Shared>) -> io::Result<Worker>;

enum Message {
    Run(Job),
    Shutdown,
}

/// Counters of a `SharedQueueThreadPool`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    /// jobs accepted by `submit`
    pub submitted: usize,
    /// jobs that ran, panicked ones included
    pub executed: usize,
    /// jobs that panicked
    pub panicked: usize,
}

struct Shared {
    queue: BlockingQueue<Message>,
    shutdown: AtomicBool,
    wait_policy: WaitPolicy,
    submitted: AtomicUsize,
    executed: AtomicUsize,
    panicked: AtomicUsize,
}

impl Shared {
    fn next_message(&self) -> Message {
        if let WaitPolicy::SpinThenBlock { spins } = self.wait_policy {
            for _ in 0..spins {
                if let Some(message) = self.queue.try_pop() {
                    return message;
                }
                thread::yield_now();
            }
        }
        self.queue.wait_and_pop()
    }

    /// Returns false if the queue was already closed.
    fn close(&self, workers: usize) -> bool {
        self.shutdown.store(true, Ordering::Release);
        self.queue.close_with((0..workers).map(|_| Message::Shutdown))
    }
}

/// SharedQueueThreadPool
///
/// A fixed set of workers pulling jobs off one `BlockingQueue`.
///
/// Shutdown drains: every job accepted by `submit` before `shutdown` runs
/// before the workers exit, since the stop messages are queued behind them.
///
/// ```rust
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use workq::thread_pool::{SharedQueueThreadPool, ThreadPool};
///
/// let counter = Arc::new(AtomicUsize::new(0));
/// let pool = SharedQueueThreadPool::new(4)?;
/// for _ in 0..100 {
///     let counter = Arc::clone(&counter);
///     pool.submit(move || {
///         counter.fetch_add(1, Ordering::SeqCst);
///     })?;
/// }
/// drop(pool);
/// assert_eq!(counter.load(Ordering::SeqCst), 100);
/// # Ok::<(), workq::PoolError>(())
/// ```
pub struct SharedQueueThreadPool {
    shared: Arc<Shared>,
    workers: Mutex<Vec<Worker>>,
    thread_ids: Vec<ThreadId>,
}

impl SharedQueueThreadPool {
    /// Start a pool as described by `config`
    pub fn with_config(config: PoolConfig) -> Result<Self> {
        SharedQueueThreadPool::start(config, Worker::new)
    }

    fn start(config: PoolConfig, spawn: SpawnFn) -> Result<Self> {
        config.validate()?;
        let size = config.resolved_threads();
        let shared = Arc::new(Shared {
            queue: BlockingQueue::new(),
            shutdown: AtomicBool::new(false),
            wait_policy: config.wait_policy,
            submitted: AtomicUsize::new(0),
            executed: AtomicUsize::new(0),
            panicked: AtomicUsize::new(0),
        });

        let mut workers = Vec::new();
        for id in 0..size {
            match spawn(id, &config.thread_name, Arc::clone(&shared)) {
                Ok(worker) => workers.push(worker),
                Err(source) => {
                    error!("worker-{} failed to start: {}", id, source);
                    shared.close(workers.len());
                    for worker in &mut workers {
                        worker.join();
                    }
                    return Err(PoolError::SpawnError { id, source });
                }
            }
        }

        let thread_ids = workers.iter().filter_map(Worker::thread_id).collect();
        info!("thread pool started with {} workers, {:?}", size, config.wait_policy);
        Ok(SharedQueueThreadPool {
            shared,
            workers: Mutex::new(workers),
            thread_ids,
        })
    }

    /// Number of workers
    pub fn size(&self) -> usize {
        self.thread_ids.len()
    }

    /// Whether `shutdown` has been called
    pub fn is_shutdown(&self) -> bool {
        self.shared.shutdown.load(Ordering::Acquire)
    }

    /// Snapshot of the counters
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            submitted: self.shared.submitted.load(Ordering::SeqCst),
            executed: self.shared.executed.load(Ordering::SeqCst),
            panicked: self.shared.panicked.load(Ordering::SeqCst),
        }
    }
}

impl ThreadPool for SharedQueueThreadPool {
    fn new(size: usize) -> Result<Self> {
        SharedQueueThreadPool::with_config(PoolConfig::default().threads(size))
    }

    fn submit<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_shutdown() {
            return Err(PoolError::ShutDown);
        }
        self.shared.submitted.fetch_add(1, Ordering::SeqCst);
        if self.shared.queue.try_push(Message::Run(Box::new(job))).is_err() {
            self.shared.submitted.fetch_sub(1, Ordering::SeqCst);
            return Err(PoolError::ShutDown);
        }
        Ok(())
    }

    /// Stop accepting jobs, let the queue drain, and join every worker.
    ///
    /// Called from inside one of this pool's jobs it only stops intake, since
    /// a worker can't join itself.
    fn shutdown(&self) {
        if self.shared.close(self.size()) {
            info!(
                "thread pool shutting down, {} jobs pending",
                self.shared.queue.len().saturating_sub(self.size())
            );
        }
        if self.thread_ids.contains(&thread::current().id()) {
            warn!("shutdown called from a worker thread, not joining");
            return;
        }
        let mut workers = self.workers.lock().unwrap_or_else(PoisonError::into_inner);
        for worker in workers.iter_mut() {
            worker.join();
        }
    }
}

impl Drop for SharedQueueThreadPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct Worker {
    id: usize,
    thread: Option<JoinHandle<()>>,
}

impl Worker {
    fn new(id: usize, name: &str, shared: Arc<Shared>) -> io::Result<Self> {
        let handle = thread::Builder::new()
            .name(format!("{}-{}", name, id))
            .spawn(move || run(id, &shared))?;
        Ok(Worker {
            id,
            thread: Some(handle),
        })
    }

    fn thread_id(&self) -> Option<ThreadId> {
        self.thread.as_ref().map(|handle| handle.thread().id())
    }

    fn join(&mut self) {
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                error!("worker-{} exited abnormally", self.id);
            }
        }
    }
}

fn run(id: usize, shared: &Shared) {
    debug!("worker-{} started", id);
    loop {
        match shared.next_message() {
            Message::Run(job) => {
                if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
                    shared.panicked.fetch_add(1, Ordering::SeqCst);
                    error!("worker-{} panic: {}", id, panic_message(&*payload));
                }
                shared.executed.fetch_add(1, Ordering::SeqCst);
            }
            Message::Shutdown => {
                debug!("worker-{} shutting down", id);
                break;
            }
        }
    }
}
