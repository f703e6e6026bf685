//! # Pool Strategy Trait
//!
//! The caller-facing surface of a buffer pool. A pipeline owns one strategy,
//! hands buffers to it when done with them, asks it for buffers before
//! allocating, and calls `remove_last` when its own budget says the pool has
//! grown too large. Deciding *when* to shrink is the caller's job.
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────┐
//!   │                  PoolStrategy<B>                     │
//!   │                                                      │
//!   │  put(&mut, B)                                        │
//!   │  get(&mut, w, h, format) → Result<Option<B>>         │
//!   │  remove_last(&mut) → Result<Option<B>>               │
//!   │  trim_to(&mut, n) → Result<Vec<B>>      (provided)   │
//!   │  size_of(&, &B) → usize                              │
//!   │  describe_buffer(&, &B) / describe_request(&, ..)    │
//!   │  len(&) / is_empty(&)                                │
//!   └──────────────────────────┬───────────────────────────┘
//!                              │
//!                              ▼
//!                ┌────────────────────────────┐
//!                │   SizeFormatStrategy<B>    │
//!                └────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use pixelpool::buffer::{HeapBitmap, PixelBuffer, PixelFormat};
//! use pixelpool::policy::size_format::SizeFormatStrategy;
//! use pixelpool::traits::PoolStrategy;
//!
//! fn acquire<P: PoolStrategy<HeapBitmap>>(pool: &mut P, w: u32, h: u32) -> HeapBitmap {
//!     match pool.get(w, h, PixelFormat::Argb8888) {
//!         Ok(Some(bitmap)) => bitmap,
//!         _ => HeapBitmap::new(w, h, PixelFormat::Argb8888),
//!     }
//! }
//!
//! let mut pool: SizeFormatStrategy<HeapBitmap> = SizeFormatStrategy::new();
//! let first = acquire(&mut pool, 8, 8);
//! pool.put(first);
//! let again = acquire(&mut pool, 4, 4);
//! assert_eq!(again.allocation_bytes(), 256);
//! ```

use crate::buffer::{PixelBuffer, PixelFormat};
use crate::error::PoolError;

/// Operations every buffer pool strategy supports.
pub trait PoolStrategy<B: PixelBuffer> {
    /// Takes ownership of `buffer` for later reuse.
    fn put(&mut self, buffer: B);

    /// Returns a pooled buffer reconfigured to `width x height` of `format`,
    /// or `Ok(None)` if nothing suitable is pooled.
    fn get(&mut self, width: u32, height: u32, format: PixelFormat) -> Result<Option<B>, PoolError>;

    /// Removes one buffer from the least recently requested bucket.
    fn remove_last(&mut self) -> Result<Option<B>, PoolError>;

    /// Bytes `buffer` would occupy in the pool.
    fn size_of(&self, buffer: &B) -> usize;

    fn describe_buffer(&self, buffer: &B) -> String;

    fn describe_request(&self, width: u32, height: u32, format: PixelFormat) -> String;

    /// Buffers currently pooled.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evicts until at most `max_buffers` remain; returns the evicted
    /// buffers in eviction order.
    fn trim_to(&mut self, max_buffers: usize) -> Result<Vec<B>, PoolError> {
        let mut evicted = Vec::new();
        while self.len() > max_buffers {
            match self.remove_last()? {
                Some(buffer) => evicted.push(buffer),
                None => break,
            }
        }
        Ok(evicted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::HeapBitmap;
    use crate::policy::size_format::SizeFormatStrategy;

    fn fill<P: PoolStrategy<HeapBitmap>>(pool: &mut P) {
        for side in 1..=4 {
            pool.put(HeapBitmap::new(side, side, PixelFormat::Alpha8));
        }
    }

    #[test]
    fn trim_to_evicts_down_to_target() {
        let mut pool: SizeFormatStrategy<HeapBitmap> = SizeFormatStrategy::new();
        fill(&mut pool);

        let evicted = PoolStrategy::trim_to(&mut pool, 1).unwrap();
        let sizes: Vec<_> = evicted.iter().map(|b| b.allocation_bytes()).collect();
        assert_eq!(sizes, vec![16, 9, 4]);
        assert_eq!(PoolStrategy::len(&pool), 1);
    }

    #[test]
    fn trim_to_above_len_is_noop() {
        let mut pool: SizeFormatStrategy<HeapBitmap> = SizeFormatStrategy::new();
        fill(&mut pool);
        assert!(PoolStrategy::trim_to(&mut pool, 10).unwrap().is_empty());
        assert!(!PoolStrategy::is_empty(&pool));
    }

    #[test]
    fn trait_object_dispatch() {
        let mut pool: SizeFormatStrategy<HeapBitmap> = SizeFormatStrategy::new();
        let strategy: &mut dyn PoolStrategy<HeapBitmap> = &mut pool;
        strategy.put(HeapBitmap::new(2, 2, PixelFormat::Rgb565));
        assert_eq!(strategy.describe_request(2, 2, PixelFormat::Rgb565), "[8](RGB_565)");
        let got = strategy.get(2, 2, PixelFormat::Rgb565).unwrap().unwrap();
        assert_eq!(strategy.size_of(&got), 8);
        assert_eq!(strategy.describe_buffer(&got), "[8](RGB_565)");
        assert!(strategy.is_empty());
    }
}
