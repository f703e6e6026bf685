#![no_main]

use libfuzzer_sys::fuzz_target;
use pixelpool::buffer::{HeapBitmap, PixelBuffer, PixelFormat, footprint};
use pixelpool::policy::size_format::{DEFAULT_MAX_WASTE_MULTIPLE, SizeFormatStrategy};

// Fuzz arbitrary operation sequences on SizeFormatStrategy
//
// Every hit must fit the request, stay within the waste bound and come back
// reconfigured; the size index must agree with the map after each step.
fuzz_target!(|data: &[u8]| {
    let mut pool: SizeFormatStrategy<HeapBitmap> = SizeFormatStrategy::new();

    for chunk in data.chunks_exact(4) {
        let op = chunk[0] % 3;
        let width = u32::from(chunk[1] % 32);
        let height = u32::from(chunk[2] % 32);
        let format = PixelFormat::ALL[usize::from(chunk[3]) % PixelFormat::ALL.len()];

        match op {
            0 => {
                // put
                pool.put(HeapBitmap::new(width.max(1), height.max(1), format));
            }
            1 => {
                // get
                let target = footprint(width, height, format).unwrap();
                if let Some(bitmap) = pool.get(width, height, format).unwrap() {
                    assert!(bitmap.allocation_bytes() >= target);
                    assert!(bitmap.allocation_bytes() <= target * DEFAULT_MAX_WASTE_MULTIPLE);
                    assert_eq!((bitmap.width(), bitmap.height(), bitmap.format()), (width, height, format));
                }
            }
            _ => {
                // remove_last
                let before = pool.len();
                match pool.remove_last().unwrap() {
                    Some(_) => assert_eq!(pool.len(), before - 1),
                    None => assert!(pool.is_empty()),
                }
            }
        }

        pool.debug_validate_invariants();
    }
});
