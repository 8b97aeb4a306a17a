//! TaskHandle

use crate::err::{PoolError, Result};
use std::any::Any;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TryRecvError};
use std::thread;
use std::time::Duration;

type Outcome<T> = thread::Result<T>;

/// Receiving side of a job submitted through `ThreadPool::execute`.
pub struct TaskHandle<T> {
    receiver: Receiver<Outcome<T>>,
}

/// Sending side, moved into the job.
pub(crate) struct Completer<T> {
    sender: SyncSender<Outcome<T>>,
}

impl<T> TaskHandle<T> {
    pub(crate) fn pair() -> (TaskHandle<T>, Completer<T>) {
        let (sender, receiver) = mpsc::sync_channel(1);
        (TaskHandle { receiver }, Completer { sender })
    }

    /// Block until the task finishes
    pub fn join(self) -> Result<T> {
        match self.receiver.recv() {
            Ok(outcome) => unpack(outcome),
            Err(_) => Err(PoolError::TaskDropped),
        }
    }

    /// Block for at most `timeout`. On `Timeout` the handle can be joined again.
    pub fn join_timeout(&self, timeout: Duration) -> Result<T> {
        match self.receiver.recv_timeout(timeout) {
            Ok(outcome) => unpack(outcome),
            Err(RecvTimeoutError::Timeout) => Err(PoolError::Timeout),
            Err(RecvTimeoutError::Disconnected) => Err(PoolError::TaskDropped),
        }
    }

    /// Non-blocking; `None` while the task is still pending.
    pub fn try_join(&self) -> Option<Result<T>> {
        match self.receiver.try_recv() {
            Ok(outcome) => Some(unpack(outcome)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(PoolError::TaskDropped)),
        }
    }
}

impl<T> Completer<T> {
    pub(crate) fn complete(self, outcome: Outcome<T>) {
        // the handle may already be gone, nobody is waiting then
        let _ = self.sender.send(outcome);
    }
}

fn unpack<T>(outcome: Outcome<T>) -> Result<T> {
    outcome.map_err(|payload| PoolError::TaskPanicked(panic_message(&*payload)))
}

/// Best effort text of a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}
