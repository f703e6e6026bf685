//! Several worker threads sharing one pool, with a trimmer enforcing a budget.
//!
//! Run with: `cargo run --example shared_pool --features concurrency`

use std::thread;

use pixelpool::prelude::*;
use tracing_subscriber::EnvFilter;

const BUDGET: usize = 16;

fn main() -> Result<(), PoolError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let pool: ConcurrentSizeFormatStrategy<HeapBitmap> = ConcurrentSizeFormatStrategy::new();

    let workers: Vec<_> = (0..4u32)
        .map(|worker| {
            let pool = pool.clone();
            thread::spawn(move || -> Result<usize, PoolError> {
                let mut reused = 0;
                for i in 0..200u32 {
                    let side = 16 * (1 + (worker + i) % 6);
                    let bitmap = match pool.get(side, side, PixelFormat::Argb8888)? {
                        Some(bitmap) => {
                            reused += 1;
                            bitmap
                        },
                        None => HeapBitmap::new(side, side, PixelFormat::Argb8888),
                    };
                    pool.put(bitmap);
                    pool.trim_to(BUDGET)?;
                }
                Ok(reused)
            })
        })
        .collect();

    for (worker, handle) in workers.into_iter().enumerate() {
        match handle.join() {
            Ok(result) => println!("worker {worker}: reused {} buffers", result?),
            Err(_) => eprintln!("worker {worker} panicked"),
        }
    }

    println!("pooled: {} buffers in {} buckets", pool.len(), pool.group_count());
    Ok(())
}
