//! BlockingQueue

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// `BlockingQueue` is a FIFO queue shared between producer and consumer threads.
///
/// All state lives behind a single mutex. `push` wakes exactly one thread
/// parked in `wait_and_pop`.
///
/// Example
///
/// ```rust
/// use workq::BlockingQueue;
///
/// let queue = BlockingQueue::new();
/// queue.push(1);
/// queue.push(2);
/// assert_eq!(queue.wait_and_pop(), 1);
/// assert_eq!(queue.try_pop(), Some(2));
/// assert_eq!(queue.try_pop(), None);
/// ```
pub struct BlockingQueue<T> {
    state: Mutex<State<T>>,
    available: Condvar,
}

struct State<T> {
    items: VecDeque<T>,
    closed: bool,
}

impl<T> BlockingQueue<T> {
    /// Create an empty queue
    pub fn new() -> Self {
        BlockingQueue {
            state: Mutex::new(State {
                items: VecDeque::new(),
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Append `item` at the tail and wake one waiter.
    pub fn push(&self, item: T) {
        let mut state = self.lock();
        state.items.push_back(item);
        drop(state);
        self.available.notify_one();
    }

    /// Append `item` unless the queue has been closed, in which case it is handed back.
    pub fn try_push(&self, item: T) -> Result<(), T> {
        let mut state = self.lock();
        if state.closed {
            return Err(item);
        }
        state.items.push_back(item);
        drop(state);
        self.available.notify_one();
        Ok(())
    }

    /// Block until an item is available, then remove and return the head.
    pub fn wait_and_pop(&self) -> T {
        let mut state = self.lock();
        loop {
            if let Some(item) = state.items.pop_front() {
                return item;
            }
            state = self
                .available
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Remove and return the head, or `None` right away if the queue is empty.
    pub fn try_pop(&self) -> Option<T> {
        self.lock().items.pop_front()
    }

    /// Append `tail` and mark the queue closed, as one step.
    ///
    /// Returns `false` without touching the queue when it was already closed.
    pub fn close_with<I>(&self, tail: I) -> bool
    where
        I: IntoIterator<Item = T>,
    {
        let mut state = self.lock();
        if state.closed {
            return false;
        }
        state.items.extend(tail);
        state.closed = true;
        drop(state);
        self.available.notify_all();
        true
    }

    /// Whether `close_with` has been called
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Snapshot; stale as soon as it returns.
    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    /// Snapshot; stale as soon as it returns.
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Default for BlockingQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
