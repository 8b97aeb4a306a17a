use crossbeam_utils::sync::WaitGroup;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use workq::thread_pool::{RayonThreadPool, SharedQueueThreadPool, ThreadPool};
use workq::{PoolConfig, PoolError, Result, WaitPolicy};

fn init_log() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn spawn_counter<P: ThreadPool>(pool: P) -> Result<()> {
    const TASK_NUM: usize = 20;
    const ADD_COUNT: usize = 1000;

    let wg = WaitGroup::new();
    let counter = Arc::new(AtomicUsize::new(0));

    for _ in 0..TASK_NUM {
        let counter = Arc::clone(&counter);
        let wg = wg.clone();
        pool.submit(move || {
            for _ in 0..ADD_COUNT {
                counter.fetch_add(1, Ordering::SeqCst);
            }
            drop(wg);
        })?;
    }

    wg.wait();
    assert_eq!(counter.load(Ordering::SeqCst), TASK_NUM * ADD_COUNT);
    Ok(())
}

fn spawn_panic_task<P: ThreadPool>() -> Result<()> {
    const TASK_NUM: usize = 1000;

    let pool = P::new(4)?;
    for _ in 0..TASK_NUM {
        pool.submit(move || {
            // keeps the expected panics out of the test output
            panic_control::disable_hook_in_current_thread();
            panic!();
        })?;
    }

    spawn_counter(pool)
}

#[test]
fn shared_queue_thread_pool_spawn_counter() -> Result<()> {
    init_log();
    let pool = SharedQueueThreadPool::new(4)?;
    spawn_counter(pool)
}

#[test]
fn rayon_thread_pool_spawn_counter() -> Result<()> {
    init_log();
    let pool = RayonThreadPool::new(4)?;
    spawn_counter(pool)
}

#[test]
fn shared_queue_thread_pool_panic_task() -> Result<()> {
    init_log();
    spawn_panic_task::<SharedQueueThreadPool>()
}

#[test]
fn spin_then_block_spawn_counter() -> Result<()> {
    init_log();
    let config = PoolConfig::default()
        .threads(4)
        .wait_policy(WaitPolicy::SpinThenBlock { spins: 32 });
    spawn_counter(SharedQueueThreadPool::with_config(config)?)
}

#[test]
fn zero_size_uses_hardware_parallelism() -> Result<()> {
    let pool = SharedQueueThreadPool::new(0)?;
    assert_eq!(pool.size(), num_cpus::get());
    Ok(())
}

#[test]
fn executes_every_job_exactly_once() -> Result<()> {
    init_log();
    const JOBS: usize = 5000;

    let counter = Arc::new(AtomicUsize::new(0));
    let pool = SharedQueueThreadPool::new(3)?;
    for _ in 0..JOBS {
        let counter = Arc::clone(&counter);
        pool.submit(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })?;
    }
    pool.shutdown();

    assert_eq!(counter.load(Ordering::SeqCst), JOBS);
    let stats = pool.stats();
    assert_eq!(stats.submitted, JOBS);
    assert_eq!(stats.executed, JOBS);
    assert_eq!(stats.panicked, 0);
    Ok(())
}

#[test]
fn concurrent_submit_from_ten_producers() -> Result<()> {
    init_log();
    let pool = Arc::new(SharedQueueThreadPool::new(4)?);
    let counter = Arc::new(AtomicUsize::new(0));

    let producers: Vec<_> = (0..10)
        .map(|_| {
            let pool = Arc::clone(&pool);
            let counter = Arc::clone(&counter);
            thread::spawn(move || {
                for _ in 0..1000 {
                    let counter = Arc::clone(&counter);
                    pool.submit(move || {
                        counter.fetch_add(1, Ordering::SeqCst);
                    })
                    .unwrap();
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }

    pool.shutdown();
    assert_eq!(counter.load(Ordering::SeqCst), 10000);
    Ok(())
}

#[test]
fn drop_drains_pending_jobs() -> Result<()> {
    init_log();
    const JOBS: usize = 200;

    let counter = Arc::new(AtomicUsize::new(0));
    let gate = Arc::new(Barrier::new(2));
    let pool = SharedQueueThreadPool::new(1)?;

    // hold the only worker so everything below stays queued
    let worker_gate = Arc::clone(&gate);
    pool.submit(move || {
        worker_gate.wait();
        thread::sleep(Duration::from_millis(50));
    })?;
    for _ in 0..JOBS {
        let counter = Arc::clone(&counter);
        pool.submit(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })?;
    }
    gate.wait();
    assert!(counter.load(Ordering::SeqCst) < JOBS);

    drop(pool);
    assert_eq!(counter.load(Ordering::SeqCst), JOBS);
    Ok(())
}

#[test]
fn submit_after_shutdown_is_rejected() -> Result<()> {
    let pool = SharedQueueThreadPool::new(2)?;
    pool.shutdown();
    pool.shutdown();
    assert!(pool.is_shutdown());

    let ran = Arc::new(AtomicUsize::new(0));
    let job_ran = Arc::clone(&ran);
    let res = pool.submit(move || {
        job_ran.fetch_add(1, Ordering::SeqCst);
    });
    assert!(matches!(res, Err(PoolError::ShutDown)));
    assert_eq!(ran.load(Ordering::SeqCst), 0);
    assert_eq!(pool.stats().submitted, 0);

    let rayon = RayonThreadPool::new(2)?;
    rayon.shutdown();
    assert!(matches!(rayon.submit(|| {}), Err(PoolError::ShutDown)));
    Ok(())
}

#[test]
fn panics_are_counted_and_workers_survive() -> Result<()> {
    init_log();
    let pool = SharedQueueThreadPool::new(2)?;
    for _ in 0..10 {
        pool.submit(|| {
            panic_control::disable_hook_in_current_thread();
            panic!("boom");
        })?;
    }
    let value = pool.execute(|| 7)?.join()?;
    assert_eq!(value, 7);

    pool.shutdown();
    let stats = pool.stats();
    assert_eq!(stats.panicked, 10);
    assert_eq!(stats.executed, 11);
    Ok(())
}

#[test]
fn execute_returns_value() -> Result<()> {
    let pool = SharedQueueThreadPool::new(2)?;
    let handles: Vec<_> = (0..16u64)
        .map(|i| pool.execute(move || i * i))
        .collect::<Result<_>>()?;
    let squares = handles
        .into_iter()
        .map(|h| h.join())
        .collect::<Result<Vec<_>>>()?;
    assert_eq!(squares, (0..16u64).map(|i| i * i).collect::<Vec<_>>());
    Ok(())
}

#[test]
fn execute_reports_panic() -> Result<()> {
    let pool = RayonThreadPool::new(2)?;
    let handle = pool.execute(|| -> u32 {
        panic_control::disable_hook_in_current_thread();
        panic!("not even")
    })?;
    match handle.join() {
        Err(PoolError::TaskPanicked(msg)) => assert_eq!(msg, "not even"),
        other => panic!("unexpected {:?}", other.map(|_| ())),
    }
    Ok(())
}

#[test]
fn join_timeout_keeps_handle_usable() -> Result<()> {
    let pool = SharedQueueThreadPool::new(1)?;
    let gate = Arc::new(Barrier::new(2));
    let job_gate = Arc::clone(&gate);
    let handle = pool.execute(move || {
        job_gate.wait();
        "done"
    })?;

    assert!(handle.try_join().is_none());
    assert!(matches!(
        handle.join_timeout(Duration::from_millis(20)),
        Err(PoolError::Timeout)
    ));
    gate.wait();
    assert_eq!(handle.join_timeout(Duration::from_secs(5))?, "done");
    Ok(())
}

#[test]
fn shutdown_from_inside_a_job_does_not_deadlock() -> Result<()> {
    init_log();
    let pool = Arc::new(SharedQueueThreadPool::new(2)?);
    let inner = Arc::clone(&pool);
    let handle = pool.execute(move || inner.shutdown())?;
    handle.join()?;
    assert!(pool.is_shutdown());
    Ok(())
}
