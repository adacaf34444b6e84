//! pagepool workload driver - exercises a sharded buffer pool from many threads

use anyhow::{bail, Context, Result};
use byteorder::{ByteOrder, LittleEndian};
use clap::Parser as ClapParser;
use log::{debug, info};
use pagepool::config::BufferPoolConfig;
use pagepool::storage::{
    BufferPool, DiskManager, MemoryDiskManager, PageId, PageManager, ParallelBufferPoolManager,
    StorageError,
};
use parking_lot::Mutex;
use rand::Rng;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

/// pagepool - drive a sharded buffer pool with a random page workload
#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Frames per buffer pool instance
    #[arg(short, long, default_value = "64")]
    pool_size: usize,

    /// Number of buffer pool instances
    #[arg(short = 'n', long, default_value = "4")]
    instances: u32,

    /// Worker threads
    #[arg(short, long, default_value = "4")]
    threads: usize,

    /// Operations per worker thread
    #[arg(short, long, default_value = "10000")]
    ops: usize,

    /// Page file; an in-memory disk is used when omitted
    #[arg(short = 'f', long)]
    data_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Default)]
struct Stats {
    created: AtomicUsize,
    fetched: AtomicUsize,
    pool_full: AtomicUsize,
}

/// Bytes 0..4 hold the page id, bytes 4..12 a per-page write counter.
fn stamp(data: &mut [u8], page_id: PageId) {
    LittleEndian::write_u32(&mut data[0..4], page_id.0);
    let writes = LittleEndian::read_u64(&data[4..12]);
    LittleEndian::write_u64(&mut data[4..12], writes + 1);
}

fn check_stamp(data: &[u8], page_id: PageId) -> Result<()> {
    let stored = LittleEndian::read_u32(&data[0..4]);
    if stored != page_id.0 {
        bail!("page {} holds bytes stamped for page {}", page_id, stored);
    }
    Ok(())
}

fn worker(
    worker_id: usize,
    bpm: &ParallelBufferPoolManager,
    pages: &Mutex<Vec<PageId>>,
    stats: &Stats,
    ops: usize,
) -> Result<()> {
    let mut rng = rand::thread_rng();

    for _ in 0..ops {
        let known = pages.lock().len();
        if known == 0 || rng.gen_bool(0.2) {
            match bpm.new_page_write() {
                Ok((page_id, mut guard)) => {
                    stamp(&mut guard[..], page_id);
                    drop(guard);
                    pages.lock().push(page_id);
                    stats.created.fetch_add(1, Ordering::Relaxed);
                }
                Err(StorageError::BufferPoolFull) => {
                    stats.pool_full.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => return Err(e).context("new page failed"),
            }
            continue;
        }

        let page_id = pages.lock()[rng.gen_range(0..known)];
        let result = if rng.gen_bool(0.5) {
            bpm.fetch_page_write(page_id).map(|mut guard| -> Result<()> {
                stamp(&mut guard[..], page_id);
                Ok(())
            })
        } else {
            bpm.fetch_page_read(page_id)
                .map(|guard| check_stamp(&guard[..], page_id))
        };

        match result {
            Ok(checked) => {
                checked?;
                stats.fetched.fetch_add(1, Ordering::Relaxed);
            }
            Err(StorageError::BufferPoolFull) => {
                stats.pool_full.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => return Err(e).with_context(|| format!("worker {} failed", worker_id)),
        }
    }

    debug!("worker {} finished", worker_id);
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config = BufferPoolConfig {
        pool_size: args.pool_size,
        num_instances: args.instances,
    };

    let disk: Arc<dyn DiskManager> = match &args.data_file {
        Some(path) => {
            info!("using page file {}", path.display());
            Arc::new(PageManager::create(path).context("Failed to create page file")?)
        }
        None => {
            info!("using in-memory disk");
            Arc::new(MemoryDiskManager::new())
        }
    };

    let bpm = config
        .build(disk)
        .context("Invalid buffer pool configuration")?;
    let pages = Mutex::new(Vec::new());
    let stats = Stats::default();

    println!("Buffer pool configuration:");
    println!("   - Instances: {}", config.num_instances);
    println!("   - Frames per instance: {}", config.pool_size);
    println!("   - Total frames: {}", bpm.pool_size());
    println!("   - Threads: {}", args.threads);
    println!("   - Operations per thread: {}", args.ops);

    let started = Instant::now();
    thread::scope(|scope| -> Result<()> {
        let handles: Vec<_> = (0..args.threads)
            .map(|worker_id| {
                let (bpm, pages, stats) = (&bpm, &pages, &stats);
                scope.spawn(move || worker(worker_id, bpm, pages, stats, args.ops))
            })
            .collect();

        for handle in handles {
            match handle.join() {
                Ok(result) => result?,
                Err(_) => bail!("worker thread panicked"),
            }
        }
        Ok(())
    })?;

    bpm.flush_all().context("Failed to flush buffer pool")?;
    let elapsed = started.elapsed();

    println!();
    println!("Workload finished in {:.2?}", elapsed);
    println!("   - Pages created: {}", stats.created.load(Ordering::Relaxed));
    println!("   - Pages fetched: {}", stats.fetched.load(Ordering::Relaxed));
    println!("   - Pool full: {}", stats.pool_full.load(Ordering::Relaxed));

    Ok(())
}
