use clap::parser::ValueSource;
use clap::{value_parser, Arg, ArgMatches, Command};
use log::{error, info};
use std::process::exit;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use workq::thread_pool::{RayonThreadPool, SharedQueueThreadPool, ThreadPool};
use workq::{PoolConfig, PoolError, Result, WaitPolicy};

fn main() {
    env_logger::init();

    let matches = cli().get_matches();
    info!("workq-bench - {}", env!("CARGO_PKG_VERSION"));

    match run(&matches) {
        Ok(true) => {}
        Ok(false) => exit(1),
        Err(e) => {
            error!("{}", e);
            eprintln!("{}", e);
            exit(1);
        }
    }
}

fn run(matches: &ArgMatches) -> Result<bool> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => PoolConfig::from_file(path)?,
        None => PoolConfig::default(),
    };
    if let Some(threads) = matches.get_one::<usize>("threads") {
        config.threads = *threads;
    }
    let spins = *matches.get_one::<u32>("spins").expect("default");
    let spins_given = matches.value_source("spins") == Some(ValueSource::CommandLine);
    match matches.get_one::<String>("wait").map(String::as_str) {
        Some("spin") => config.wait_policy = WaitPolicy::SpinThenBlock { spins },
        Some(_) => config.wait_policy = WaitPolicy::Block,
        // --spins alone implies --wait spin
        None if spins_given => config.wait_policy = WaitPolicy::SpinThenBlock { spins },
        None => {}
    }
    let producers = *matches.get_one::<usize>("producers").expect("default");
    let jobs = *matches.get_one::<usize>("jobs").expect("default");
    let pool_name = matches.get_one::<String>("pool").expect("default");
    info!("POOL {} {:?}", pool_name, config);

    let expected = producers * jobs;
    let start = Instant::now();
    let executed = match pool_name.as_str() {
        "rayon" => drive(RayonThreadPool::with_config(config)?, producers, jobs)?,
        _ => drive(SharedQueueThreadPool::with_config(config)?, producers, jobs)?,
    };
    println!(
        "executed {} of {} jobs in {:?}",
        executed,
        expected,
        start.elapsed()
    );
    Ok(executed == expected)
}

/// Submit `jobs` counter increments from each of `producers` threads and wait for all of them.
fn drive<P>(pool: P, producers: usize, jobs: usize) -> Result<usize>
where
    P: ThreadPool + Send + Sync + 'static,
{
    let pool = Arc::new(pool);
    let counter = Arc::new(AtomicUsize::new(0));

    let producers: Vec<_> = (0..producers)
        .map(|_| {
            let pool = Arc::clone(&pool);
            let counter = Arc::clone(&counter);
            thread::spawn(move || -> Result<()> {
                let mut handles = Vec::with_capacity(jobs);
                for _ in 0..jobs {
                    let counter = Arc::clone(&counter);
                    handles.push(pool.execute(move || {
                        counter.fetch_add(1, Ordering::SeqCst);
                    })?);
                }
                for handle in handles {
                    handle.join()?;
                }
                Ok(())
            })
        })
        .collect();

    for producer in producers {
        producer
            .join()
            .map_err(|_| PoolError::StringError("producer panicked".to_owned()))??;
    }
    pool.shutdown();
    Ok(counter.load(Ordering::SeqCst))
}

fn cli() -> Command {
    Command::new("workq-bench")
        .about("Drive a worker pool from many producer threads")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("threads")
                .short('t')
                .long("threads")
                .value_name("N")
                .value_parser(value_parser!(usize))
                .help("worker count, 0 for one per cpu"),
        )
        .arg(
            Arg::new("producers")
                .short('p')
                .long("producers")
                .value_name("M")
                .value_parser(value_parser!(usize))
                .default_value("10")
                .help("producer threads"),
        )
        .arg(
            Arg::new("jobs")
                .short('j')
                .long("jobs")
                .value_name("J")
                .value_parser(value_parser!(usize))
                .default_value("1000")
                .help("jobs submitted by each producer"),
        )
        .arg(
            Arg::new("pool")
                .long("pool")
                .value_name("POOL")
                .value_parser(["shared", "rayon"])
                .default_value("shared")
                .help("pool implementation"),
        )
        .arg(
            Arg::new("wait")
                .short('w')
                .long("wait")
                .value_name("POLICY")
                .value_parser(["block", "spin"])
                .help("idle policy of shared queue workers"),
        )
        .arg(
            Arg::new("spins")
                .long("spins")
                .value_name("S")
                .value_parser(value_parser!(u32))
                .default_value("64")
                .help("polls before blocking, implies --wait spin"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("json pool config, flags override it"),
        )
}
