//! thread pool

mod rayon;
mod shared_queue;

pub use self::rayon::RayonThreadPool;
pub use shared_queue::{PoolStats, SharedQueueThreadPool};

use crate::err::Result;
use crate::handle::TaskHandle;
use std::panic::{self, AssertUnwindSafe};

/// ThreadPool
pub trait ThreadPool {
    /// new a thread pool with size, 0 means one worker per logical cpu
    fn new(size: usize) -> Result<Self>
    where
        Self: Sized;

    /// Queue `job` for execution on some worker.
    ///
    /// Fails with `PoolError::ShutDown` once `shutdown` has been called.
    fn submit<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static;

    /// Stop accepting jobs. Calling it again is a no-op.
    fn shutdown(&self);

    /// Submit `f` and get a handle to its return value or panic.
    fn execute<F, T>(&self, f: F) -> Result<TaskHandle<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (handle, completer) = TaskHandle::pair();
        self.submit(move || completer.complete(panic::catch_unwind(AssertUnwindSafe(f))))?;
        Ok(handle)
    }
}
