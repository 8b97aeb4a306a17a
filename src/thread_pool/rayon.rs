//! ThreadPool type from rayon crate

use crate::config::PoolConfig;
use crate::err::{PoolError, Result};
use crate::handle::panic_message;
use crate::thread_pool::ThreadPool;
use log::{debug, error};
use std::sync::atomic::{AtomicBool, Ordering};

/// RayonThreadPool type from rayon crate
///
/// Unlike `SharedQueueThreadPool` it does not drain on drop: rayon offers no
/// way to wait for spawned jobs. Use `execute` handles to wait for results.
pub struct RayonThreadPool {
    pool: rayon::ThreadPool,
    shutdown: AtomicBool,
}

impl RayonThreadPool {
    /// Build from `config`; the wait policy does not apply to rayon workers.
    pub fn with_config(config: PoolConfig) -> Result<Self> {
        config.validate()?;
        let prefix = config.thread_name.clone();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.resolved_threads())
            .thread_name(move |i| format!("{}-{}", prefix, i))
            .panic_handler(|payload| error!("rayon worker panic: {}", panic_message(&*payload)))
            .build()
            .map_err(|e| PoolError::StringError(format!("{:?}", e)))?;
        debug!(
            "rayon pool started with {} workers",
            pool.current_num_threads()
        );
        Ok(RayonThreadPool {
            pool,
            shutdown: AtomicBool::new(false),
        })
    }
}

impl ThreadPool for RayonThreadPool {
    fn new(size: usize) -> Result<Self>
    where
        Self: Sized,
    {
        RayonThreadPool::with_config(PoolConfig::default().threads(size))
    }

    fn submit<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        if self.shutdown.load(Ordering::Acquire) {
            return Err(PoolError::ShutDown);
        }
        self.pool.spawn(job);
        Ok(())
    }

    fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }
}
