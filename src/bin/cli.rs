//! TallyKV CLI
//!
//! Command-line interface over an embedded TallyKV data directory.

use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand};
use crossbeam::channel;
use rand::Rng;
use tallykv::{Config, Engine, Key};
use tracing_subscriber::{fmt, EnvFilter};

/// TallyKV CLI
#[derive(Parser, Debug)]
#[command(name = "tallykv")]
#[command(about = "Append-only key-value store with index-free lookups")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./tallykv_data")]
    data_dir: String,

    /// Partition files per date
    #[arg(short, long, default_value = "10")]
    partitions: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Save a value and print its key
    Save {
        /// The value to save
        value: String,
    },

    /// Print the value stored under a key
    Query {
        /// 32-character key returned by save
        key: String,
    },

    /// Rewind the counter store (bootstrap/testing only)
    ResetCounter,

    /// Save random values, then query every one back
    Bench {
        /// Number of values to save
        #[arg(short, long, default_value = "10000")]
        count: usize,

        /// Largest random value in bytes
        #[arg(short, long, default_value = "1024")]
        max_size: usize,

        /// Worker threads for both phases
        #[arg(short, long, default_value = "4")]
        threads: usize,
    },
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tallykv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    let config = Config::builder()
        .data_dir(&args.data_dir)
        .partitions(args.partitions)
        .build();

    let engine = match Engine::open(config) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    let outcome = match args.command {
        Commands::Save { value } => engine.save(value.as_bytes()).map(|key| {
            println!("{}", key);
        }),
        Commands::Query { key } => engine.query(&key).map(|value| {
            println!("{}", String::from_utf8_lossy(&value));
        }),
        Commands::ResetCounter => engine.reset_counter().map(|_| {
            println!("counter reset");
        }),
        Commands::Bench {
            count,
            max_size,
            threads,
        } => {
            run_bench(&engine, count, max_size, threads.max(1));
            Ok(())
        }
    };

    if let Err(e) = outcome {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

/// Two-phase load test: parallel saves, then parallel queries in a
/// different order than the saves completed
fn run_bench(engine: &Arc<Engine>, count: usize, max_size: usize, threads: usize) {
    let (job_tx, job_rx) = channel::unbounded::<usize>();
    let (saved_tx, saved_rx) = channel::unbounded::<(Key, Vec<u8>)>();

    for i in 0..count {
        let _ = job_tx.send(i);
    }
    drop(job_tx);

    let started = Instant::now();
    crossbeam::scope(|scope| {
        for _ in 0..threads {
            let job_rx = job_rx.clone();
            let saved_tx = saved_tx.clone();
            scope.spawn(move |_| {
                let mut rng = rand::thread_rng();
                for _ in job_rx.iter() {
                    let mut value = vec![0u8; rng.gen_range(1..=max_size.max(1))];
                    rng.fill(&mut value[..]);
                    match engine.save(&value) {
                        Ok(key) => {
                            let _ = saved_tx.send((key, value));
                        }
                        Err(e) => tracing::error!("save failed: {}", e),
                    }
                }
            });
        }
    })
    .unwrap_or_else(|_| tracing::error!("save worker panicked"));
    drop(saved_tx);

    let mut saved: Vec<(Key, Vec<u8>)> = saved_rx.iter().collect();
    let save_elapsed = started.elapsed();
    tracing::info!(
        "saved {} values in {:.2?} ({:.0} ops/s)",
        saved.len(),
        save_elapsed,
        saved.len() as f64 / save_elapsed.as_secs_f64()
    );

    // Reverse so the query phase does not walk files in append order
    saved.reverse();

    let (check_tx, check_rx) = channel::unbounded::<(Key, Vec<u8>)>();
    for item in saved {
        let _ = check_tx.send(item);
    }
    drop(check_tx);

    let (miss_tx, miss_rx) = channel::unbounded::<Key>();
    let started = Instant::now();
    crossbeam::scope(|scope| {
        for _ in 0..threads {
            let check_rx = check_rx.clone();
            let miss_tx = miss_tx.clone();
            scope.spawn(move |_| {
                for (key, expected) in check_rx.iter() {
                    match engine.query_key(&key) {
                        Ok(value) if value == expected => {}
                        _ => {
                            let _ = miss_tx.send(key);
                        }
                    }
                }
            });
        }
    })
    .unwrap_or_else(|_| tracing::error!("query worker panicked"));
    drop(miss_tx);

    let misses: Vec<Key> = miss_rx.iter().collect();
    let query_elapsed = started.elapsed();
    tracing::info!(
        "queried {} values in {:.2?} ({:.0} ops/s), {} mismatches",
        count,
        query_elapsed,
        count as f64 / query_elapsed.as_secs_f64(),
        misses.len()
    );
    for key in misses.iter().take(10) {
        tracing::warn!("mismatch for key {}", key);
    }

    let stats = engine.stats();
    tracing::info!(
        probes = stats.probes,
        records_scanned = stats.records_scanned,
        corrupt_skips = stats.corrupt_skips,
        "scanner statistics"
    );
}
