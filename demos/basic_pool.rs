//! Recycle decoded frames through a pool instead of reallocating them.
//!
//! Run with: `RUST_LOG=pixelpool=trace cargo run --example basic_pool`

use pixelpool::prelude::*;
use tracing_subscriber::EnvFilter;

fn decode_into(bitmap: &mut HeapBitmap, frame: u8) {
    bitmap.pixels_mut().fill(frame);
}

fn main() -> Result<(), PoolError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut pool = StrategyBuilder::new().build::<HeapBitmap>();
    let mut allocations = 0;

    for frame in 0..10u8 {
        let mut bitmap = match pool.get(320, 240, PixelFormat::Argb8888)? {
            Some(bitmap) => bitmap,
            None => {
                allocations += 1;
                HeapBitmap::new(320, 240, PixelFormat::Argb8888)
            },
        };
        decode_into(&mut bitmap, frame);
        println!("frame {frame}: {}", pool.describe_buffer(&bitmap));
        pool.put(bitmap);
    }

    println!("allocations: {allocations}");
    println!("{pool}");
    Ok(())
}
