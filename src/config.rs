//! config

use crate::err::{PoolError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const DEFAULT_THREAD_NAME: &str = "workq-worker";

/// Upper bound on `threads`
pub const MAX_THREADS: usize = 1 << 15;

/// How an idle worker waits for the next job
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum WaitPolicy {
    /// Park on the queue's condition variable
    #[default]
    Block,
    /// Poll `spins` times, yielding between polls, then park
    SpinThenBlock {
        /// number of non-blocking attempts before parking
        spins: u32,
    },
}

/// PoolConfig
///
/// ```rust
/// use workq::{PoolConfig, WaitPolicy};
///
/// let config = PoolConfig::default()
///     .threads(4)
///     .wait_policy(WaitPolicy::SpinThenBlock { spins: 64 })
///     .thread_name("io");
/// assert_eq!(config.resolved_threads(), 4);
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct PoolConfig {
    /// number of workers, 0 means one per logical cpu
    pub threads: usize,
    /// idle strategy of every worker
    pub wait_policy: WaitPolicy,
    /// prefix of worker thread names
    pub thread_name: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            threads: 0,
            wait_policy: WaitPolicy::Block,
            thread_name: DEFAULT_THREAD_NAME.to_owned(),
        }
    }
}

impl PoolConfig {
    /// Load a json config file; missing fields take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<PoolConfig> {
        let content = fs::read_to_string(path)?;
        let config: PoolConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no pool can start with: more than `MAX_THREADS`
    /// workers, or a thread name with a NUL byte.
    pub fn validate(&self) -> Result<()> {
        if self.threads > MAX_THREADS {
            return Err(PoolError::InvalidConfig(format!(
                "threads {} exceeds {}",
                self.threads, MAX_THREADS
            )));
        }
        if self.thread_name.contains('\0') {
            return Err(PoolError::InvalidConfig(
                "thread_name contains a nul byte".to_owned(),
            ));
        }
        Ok(())
    }

    /// set worker count
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// set wait policy
    pub fn wait_policy(mut self, wait_policy: WaitPolicy) -> Self {
        self.wait_policy = wait_policy;
        self
    }

    /// set thread name prefix
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Worker count with 0 replaced by the hardware parallelism.
    pub fn resolved_threads(&self) -> usize {
        match self.threads {
            0 => num_cpus::get(),
            n => n,
        }
    }
}
