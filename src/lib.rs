#![deny(missing_docs)]
//! A fixed-size worker pool fed by a blocking work queue
pub use config::{PoolConfig, WaitPolicy, MAX_THREADS};
pub use err::{PoolError, Result};
pub use handle::TaskHandle;
pub use lock::{
    ExclusiveLock, HierarchicalLock, HierarchyGuard, LockGuard, LockKind, NoLock, RawLock,
    SharedLock,
};
pub use queue::BlockingQueue;
pub use stack::ThreadSafeStack;
pub use thread_pool::{PoolStats, RayonThreadPool, SharedQueueThreadPool, ThreadPool};

mod config;
mod handle;
mod lock;
mod queue;
mod stack;

pub mod err;
pub mod thread_pool;
