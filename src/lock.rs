//! Lock strategies behind one `{lock, unlock, try_lock}` interface.
//!
//! The strategy is picked once with [`LockKind::build`]; code holding a
//! `Box<dyn RawLock>` doesn't care which one it got.

use crate::err::{PoolError, Result};
use log::warn;
use std::cell::Cell;
use std::marker::PhantomData;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// A lock without an attached value
pub trait RawLock: Send + Sync {
    /// Block until the lock is acquired
    fn lock(&self);

    /// Release a lock acquired by `lock` or a successful `try_lock`
    fn unlock(&self);

    /// Acquire without blocking; false if it is held elsewhere
    fn try_lock(&self) -> bool;
}

/// Unlocks on drop
///
/// ```rust
/// use workq::{LockGuard, LockKind, RawLock};
///
/// let lock = LockKind::Exclusive.build();
/// {
///     let _guard = LockGuard::acquire(&*lock);
///     assert!(!lock.try_lock());
/// }
/// assert!(lock.try_lock());
/// lock.unlock();
/// ```
pub struct LockGuard<'a, L: RawLock + ?Sized> {
    lock: &'a L,
}

impl<'a, L: RawLock + ?Sized> LockGuard<'a, L> {
    /// `lock` and hold it until the guard is dropped
    pub fn acquire(lock: &'a L) -> Self {
        lock.lock();
        LockGuard { lock }
    }

    /// `try_lock`, `None` if it is busy
    pub fn try_acquire(lock: &'a L) -> Option<Self> {
        if lock.try_lock() {
            Some(LockGuard { lock })
        } else {
            None
        }
    }
}

impl<L: RawLock + ?Sized> Drop for LockGuard<'_, L> {
    fn drop(&mut self) {
        self.lock.unlock();
    }
}

/// Which lock strategy to build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockKind {
    /// no locking at all
    None,
    /// one holder at a time
    Exclusive,
    /// any number of holders, see `SharedLock`
    Shared,
}

impl LockKind {
    /// Construct the chosen strategy
    pub fn build(self) -> Box<dyn RawLock> {
        match self {
            LockKind::None => Box::new(NoLock),
            LockKind::Exclusive => Box::new(ExclusiveLock::new()),
            LockKind::Shared => Box::new(SharedLock::new()),
        }
    }
}

fn lock_state<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Does nothing; for data that is never shared.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLock;

impl RawLock for NoLock {
    fn lock(&self) {}

    fn unlock(&self) {}

    fn try_lock(&self) -> bool {
        true
    }
}

/// ExclusiveLock
#[derive(Debug, Default)]
pub struct ExclusiveLock {
    held: Mutex<bool>,
    released: Condvar,
}

impl ExclusiveLock {
    /// new an unlocked lock
    pub fn new() -> Self {
        Self::default()
    }
}

impl RawLock for ExclusiveLock {
    fn lock(&self) {
        let mut held = lock_state(&self.held);
        while *held {
            held = self
                .released
                .wait(held)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *held = true;
    }

    fn unlock(&self) {
        let mut held = lock_state(&self.held);
        if !*held {
            warn!("unlock of an ExclusiveLock that is not held");
            return;
        }
        *held = false;
        drop(held);
        self.released.notify_one();
    }

    fn try_lock(&self) -> bool {
        let mut held = lock_state(&self.held);
        if *held {
            return false;
        }
        *held = true;
        true
    }
}

#[derive(Debug, Default)]
struct SharedState {
    readers: usize,
    writer: bool,
}

/// Reader-writer lock.
///
/// The `RawLock` methods take the shared side; writers use the
/// `*_exclusive` methods.
#[derive(Debug, Default)]
pub struct SharedLock {
    state: Mutex<SharedState>,
    changed: Condvar,
}

impl SharedLock {
    /// new an unlocked lock
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until no reader or writer holds the lock, then take it alone
    pub fn lock_exclusive(&self) {
        let mut state = lock_state(&self.state);
        while state.writer || state.readers > 0 {
            state = self
                .changed
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        state.writer = true;
    }

    /// Non-blocking `lock_exclusive`
    pub fn try_lock_exclusive(&self) -> bool {
        let mut state = lock_state(&self.state);
        if state.writer || state.readers > 0 {
            return false;
        }
        state.writer = true;
        true
    }

    /// Release the writer side
    pub fn unlock_exclusive(&self) {
        let mut state = lock_state(&self.state);
        if !state.writer {
            warn!("unlock_exclusive of a SharedLock without a writer");
            return;
        }
        state.writer = false;
        drop(state);
        self.changed.notify_all();
    }
}

impl RawLock for SharedLock {
    fn lock(&self) {
        let mut state = lock_state(&self.state);
        while state.writer {
            state = self
                .changed
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        state.readers += 1;
    }

    fn unlock(&self) {
        let mut state = lock_state(&self.state);
        if state.readers == 0 {
            warn!("unlock of a SharedLock without readers");
            return;
        }
        state.readers -= 1;
        let last = state.readers == 0;
        drop(state);
        if last {
            self.changed.notify_all();
        }
    }

    fn try_lock(&self) -> bool {
        let mut state = lock_state(&self.state);
        if state.writer {
            return false;
        }
        state.readers += 1;
        true
    }
}

thread_local! {
    static CURRENT_LEVEL: Cell<u64> = Cell::new(u64::MAX);
}

/// A lock with a level in a lock hierarchy.
///
/// A thread holding a lock at level `n` may only take locks below `n`,
/// which rules out lock-order deadlocks between hierarchy-aware code.
///
/// ```rust
/// use workq::HierarchicalLock;
///
/// let high = HierarchicalLock::new(10_000);
/// let low = HierarchicalLock::new(5_000);
///
/// let _h = high.lock()?;
/// let _l = low.lock()?;
/// # Ok::<(), workq::PoolError>(())
/// ```
pub struct HierarchicalLock<L: RawLock = ExclusiveLock> {
    inner: L,
    level: u64,
}

/// Restores the thread's previous level and unlocks on drop
///
/// The level lives in a thread local, so the guard must be dropped on the
/// thread that took it:
///
/// ```compile_fail
/// use workq::HierarchicalLock;
///
/// let lock = HierarchicalLock::new(10);
/// let guard = lock.lock().unwrap();
/// std::thread::scope(|s| {
///     s.spawn(move || drop(guard));
/// });
/// ```
pub struct HierarchyGuard<'a, L: RawLock> {
    lock: &'a HierarchicalLock<L>,
    previous: u64,
    _not_send: PhantomData<*const ()>,
}

impl HierarchicalLock<ExclusiveLock> {
    /// Exclusive lock at `level`
    pub fn new(level: u64) -> Self {
        HierarchicalLock::with_lock(ExclusiveLock::new(), level)
    }
}

impl<L: RawLock> HierarchicalLock<L> {
    /// Wrap `inner` at `level`
    pub fn with_lock(inner: L, level: u64) -> Self {
        HierarchicalLock { inner, level }
    }

    /// level
    pub fn level(&self) -> u64 {
        self.level
    }

    /// Acquire, or fail if this thread already holds a lock at or below `level`.
    pub fn lock(&self) -> Result<HierarchyGuard<'_, L>> {
        self.check()?;
        self.inner.lock();
        Ok(self.enter())
    }

    /// `Ok(None)` when the lock is busy.
    pub fn try_lock(&self) -> Result<Option<HierarchyGuard<'_, L>>> {
        self.check()?;
        if !self.inner.try_lock() {
            return Ok(None);
        }
        Ok(Some(self.enter()))
    }

    fn check(&self) -> Result<()> {
        let held = CURRENT_LEVEL.with(Cell::get);
        if held <= self.level {
            return Err(PoolError::HierarchyViolation {
                held,
                requested: self.level,
            });
        }
        Ok(())
    }

    fn enter(&self) -> HierarchyGuard<'_, L> {
        let previous = CURRENT_LEVEL.with(|level| level.replace(self.level));
        HierarchyGuard {
            lock: self,
            previous,
            _not_send: PhantomData,
        }
    }
}

impl<L: RawLock> Drop for HierarchyGuard<'_, L> {
    fn drop(&mut self) {
        CURRENT_LEVEL.with(|level| level.set(self.previous));
        self.lock.inner.unlock();
    }
}
