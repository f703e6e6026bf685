//! Show which pooled buffer serves each request under the default waste bound.
//!
//! Run with: `cargo run --example best_fit`

use pixelpool::prelude::*;

fn main() -> Result<(), PoolError> {
    let mut pool = StrategyBuilder::new().build::<HeapBitmap>();
    for side in [16, 32, 64, 128] {
        pool.put(HeapBitmap::new(side, side, PixelFormat::Argb8888));
    }
    pool.put(HeapBitmap::new(64, 64, PixelFormat::Rgb565));
    println!("pooled: {pool}");

    let requests = [
        (32, 32, PixelFormat::Argb8888),
        (20, 20, PixelFormat::Argb8888),
        (8, 8, PixelFormat::Argb8888),
        (40, 40, PixelFormat::Hidden),
        (64, 64, PixelFormat::Argb4444),
        (64, 64, PixelFormat::Rgb565),
    ];
    for (w, h, format) in requests {
        let request = pool.describe_request(w, h, format);
        match pool.get(w, h, format)? {
            Some(bitmap) => println!(
                "{request:>20} -> reused {} bytes ({} spare)",
                bitmap.allocation_bytes(),
                bitmap.allocation_bytes() - bitmap.byte_count()
            ),
            None => println!("{request:>20} -> miss"),
        }
    }

    println!("left: {pool}");
    Ok(())
}
