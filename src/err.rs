//! err

use std::io;
use thiserror::Error;

/// PoolError
#[derive(Error, Debug)]
pub enum PoolError {
    /// Open or read file error
    #[error("io error: {0:?}")]
    IoError(#[from] io::Error),

    /// json serialize error
    #[error("serialize json error: {0:?}")]
    JSONSerializeError(#[from] serde_json::Error),

    /// A worker thread could not be started
    #[error("spawn worker-{id} error: {source:?}")]
    SpawnError {
        /// index of the worker that failed to start
        id: usize,
        /// the underlying os error
        #[source]
        source: io::Error,
    },

    /// The pool no longer accepts jobs
    #[error("thread pool is shut down")]
    ShutDown,

    /// The task panicked while running
    #[error("task panicked: {0}")]
    TaskPanicked(String),

    /// The task was dropped before it produced a value
    #[error("task dropped before completion")]
    TaskDropped,

    /// Waiting for a task timed out
    #[error("timed out waiting for task")]
    Timeout,

    /// A lock was acquired out of hierarchy order
    #[error("lock hierarchy violated: holding level {held}, requested level {requested}")]
    HierarchyViolation {
        /// lowest level currently held by this thread
        held: u64,
        /// level of the lock being acquired
        requested: u64,
    },

    /// Pop on an empty stack
    #[error("stack is empty")]
    EmptyStack,

    /// A config value the pool can't be built from
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// error carried as a message
    #[error("{0}")]
    StringError(String),
}

/// Alias for a Result with the error type PoolError.
pub type Result<T> = std::result::Result<T, PoolError>;
