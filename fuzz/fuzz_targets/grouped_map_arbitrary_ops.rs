#![no_main]

use libfuzzer_sys::fuzz_target;
use pixelpool::buffer::PixelFormat;
use pixelpool::ds::{GroupedLruMap, KeyPool};
use pixelpool::policy::size_format::BucketKey;

// Fuzz arbitrary operation sequences on GroupedLruMap
//
// Tests random sequences of put, get and remove_last with recycled keys,
// checking ring/index agreement after every step.
fuzz_target!(|data: &[u8]| {
    let mut pool: KeyPool<BucketKey> = KeyPool::new(4);
    let mut map: GroupedLruMap<BucketKey, u8> = GroupedLruMap::new();
    let mut stored = 0usize;

    for pair in data.chunks_exact(2) {
        let op = pair[0] % 3;
        let value = pair[1];
        let footprint = usize::from(value % 16);

        match op {
            0 => {
                // put
                let mut key = pool.acquire();
                key.init(footprint, PixelFormat::Argb8888);
                map.put(key, value, &mut pool);
                stored += 1;
            }
            1 => {
                // get
                let mut key = pool.acquire();
                key.init(footprint, PixelFormat::Argb8888);
                if map.get(key, &mut pool).is_some() {
                    stored -= 1;
                }
            }
            _ => {
                // remove_last
                match map.remove_last(&mut pool) {
                    Some(_) => stored -= 1,
                    None => assert!(map.is_empty()),
                }
            }
        }

        assert_eq!(map.len(), stored);
        map.debug_validate_invariants();
        pool.debug_validate_invariants();
    }
});
