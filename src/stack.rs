//! ThreadSafeStack

use crate::err::{PoolError, Result};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// LIFO stack behind a mutex. Popping an empty stack is an error, not a panic.
#[derive(Debug)]
pub struct ThreadSafeStack<T> {
    data: Mutex<Vec<T>>,
}

impl<T> ThreadSafeStack<T> {
    /// new an empty stack
    pub fn new() -> Self {
        ThreadSafeStack {
            data: Mutex::new(Vec::new()),
        }
    }

    /// push
    pub fn push(&self, value: T) {
        self.lock().push(value);
    }

    /// Remove the top value, `PoolError::EmptyStack` if there is none
    pub fn pop(&self) -> Result<T> {
        self.lock().pop().ok_or(PoolError::EmptyStack)
    }

    /// Like `pop` but with `None` for an empty stack
    pub fn try_pop(&self) -> Option<T> {
        self.lock().pop()
    }

    /// Snapshot; stale as soon as it returns.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Snapshot; stale as soon as it returns.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<T>> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Clone> Clone for ThreadSafeStack<T> {
    fn clone(&self) -> Self {
        ThreadSafeStack {
            data: Mutex::new(self.lock().clone()),
        }
    }
}

impl<T> Default for ThreadSafeStack<T> {
    fn default() -> Self {
        Self::new()
    }
}
