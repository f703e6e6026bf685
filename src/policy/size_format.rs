//! Size-and-format bucketed pool strategy with bounded best-fit matching.
//!
//! Buffers are bucketed by `(footprint, format)`. A [`GroupedLruMap`] holds the
//! buckets in recency-of-lookup order; a [`SizeIndex`] mirrors how many
//! buffers each bucket holds so a request can be matched against the smallest
//! pooled footprint that is large enough, without walking the buckets.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                     SizeFormatStrategy<B>                            │
//!   │                                                                      │
//!   │   groups: GroupedLruMap<BucketKey, B>        sizes: SizeIndex        │
//!   │   ┌───────────────────────────────────┐     ┌──────────────────────┐ │
//!   │   │ MRU ──► [1600](A) ──► [400](A) ──►│     │ ARGB_8888 {400=1,    │ │
//!   │   │         [b]           [b]         │     │            1600=1}   │ │
//!   │   │     ──► [200](R) ──► LRU          │     │ RGB_565   {200=2}    │ │
//!   │   │         [b, b]                    │     └──────────────────────┘ │
//!   │   └───────────────────────────────────┘                              │
//!   │                                                                      │
//!   │   keys: KeyPool<BucketKey>      compat: FormatCompatibility          │
//!   └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Matching
//!
//! For a request of `target` bytes in `format`, each format of the request's
//! compatibility class is tried in class order. The first one whose smallest
//! pooled footprint `>= target` is also `<= target * max_waste_multiple`
//! names the bucket to pop from; later formats are not considered. If none
//! qualifies, the exact `(target, format)` bucket is looked up, which misses
//! but still records the request's recency.
//!
//! ```text
//!   get(10x10 ARGB_8888)   target = 400, limit = 400 * 8 = 3200
//!
//!   ceiling(ARGB_8888, 400) = 1600   1600 <= 3200   ──► pop [1600](ARGB_8888)
//!                                                        reconfigure to 10x10
//! ```
//!
//! A returned buffer is always reconfigured to exactly the requested width,
//! height and format; its allocation is never changed.
//!
//! ## Operations
//!
//! | Operation              | Recency effect                | Complexity           |
//! |------------------------|-------------------------------|----------------------|
//! | `put(buffer)`          | new bucket goes to LRU end    | O(log n)             |
//! | `get(w, h, format)`    | matched bucket moves to MRU   | O(c log n)           |
//! | `remove_last()`        | none; prunes empty buckets    | O(log n) amortized   |
//!
//! `c` is the size of the compatibility class, `n` the number of distinct
//! footprints pooled for a format.
//!
//! ## Thread Safety
//!
//! [`SizeFormatStrategy`] needs `&mut self` for every pool operation. With the
//! `concurrency` feature, [`ConcurrentSizeFormatStrategy`] wraps the whole
//! strategy in one `parking_lot::RwLock`; no caller ever observes the map
//! and the size index out of step.
//!
//! ## Example
//!
//! ```
//! use pixelpool::buffer::{HeapBitmap, PixelBuffer, PixelFormat};
//! use pixelpool::policy::size_format::SizeFormatStrategy;
//!
//! let mut pool: SizeFormatStrategy<HeapBitmap> = SizeFormatStrategy::new();
//! pool.put(HeapBitmap::new(20, 20, PixelFormat::Argb8888));
//!
//! let bitmap = pool.get(10, 10, PixelFormat::Argb8888).unwrap().unwrap();
//! assert_eq!(bitmap.allocation_bytes(), 1600);
//! assert_eq!((bitmap.width(), bitmap.height()), (10, 10));
//! assert!(pool.is_empty());
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};
#[cfg(feature = "concurrency")]
use std::sync::Arc;

#[cfg(feature = "concurrency")]
use parking_lot::RwLock;
use tracing::{debug, error, trace};

use crate::buffer::{PixelBuffer, PixelFormat, footprint};
use crate::ds::{GroupedLruMap, KeyPool, KeyState, Poolable, SizeIndex};
use crate::error::{InvariantError, PoolError};
use crate::policy::compat::FormatCompatibility;
use crate::traits::PoolStrategy;

#[cfg(feature = "metrics")]
use crate::metrics::metrics_impl::PoolMetrics;
#[cfg(feature = "metrics")]
use crate::metrics::snapshot::PoolMetricsSnapshot;
#[cfg(feature = "metrics")]
use crate::metrics::traits::{MetricsSnapshotProvider, PoolMetricsRecorder};

/// Largest accepted ratio of pooled footprint to requested footprint.
pub const DEFAULT_MAX_WASTE_MULTIPLE: usize = 8;

/// Bucket identity: byte footprint plus pixel format.
///
/// Equality and hashing ignore the lifecycle tag.
#[derive(Debug, Clone, Copy)]
pub struct BucketKey {
    footprint: usize,
    format: PixelFormat,
    state: KeyState,
}

impl BucketKey {
    pub fn new(footprint: usize, format: PixelFormat) -> Self {
        Self {
            footprint,
            format,
            state: KeyState::Lent,
        }
    }

    /// Overwrites the identity of a recycled key.
    pub fn init(&mut self, footprint: usize, format: PixelFormat) {
        self.footprint = footprint;
        self.format = format;
    }

    pub fn footprint(&self) -> usize {
        self.footprint
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }
}

impl Default for BucketKey {
    fn default() -> Self {
        Self::new(0, PixelFormat::Argb8888)
    }
}

impl PartialEq for BucketKey {
    fn eq(&self, other: &Self) -> bool {
        self.footprint == other.footprint && self.format == other.format
    }
}

impl Eq for BucketKey {}

impl Hash for BucketKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.footprint.hash(state);
        self.format.hash(state);
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]({})", self.footprint, self.format)
    }
}

impl Poolable for BucketKey {
    fn state(&self) -> KeyState {
        self.state
    }

    fn set_state(&mut self, state: KeyState) {
        self.state = state;
    }
}

fn acquire_key(keys: &mut KeyPool<BucketKey>, footprint: usize, format: PixelFormat) -> BucketKey {
    let mut key = keys.acquire();
    key.init(footprint, format);
    key
}

/// Pool strategy keyed by `(allocation_bytes, format)` with best-fit lookup.
pub struct SizeFormatStrategy<B> {
    groups: GroupedLruMap<BucketKey, B>,
    sizes: SizeIndex,
    keys: KeyPool<BucketKey>,
    compat: FormatCompatibility,
    max_waste_multiple: usize,
    #[cfg(feature = "metrics")]
    metrics: PoolMetrics,
}

impl<B: PixelBuffer> SizeFormatStrategy<B> {
    /// Creates a strategy with the standard compatibility table (no wide
    /// gamut), a waste multiple of [`DEFAULT_MAX_WASTE_MULTIPLE`] and the
    /// default key pool capacity.
    ///
    /// Use [`StrategyBuilder`](crate::builder::StrategyBuilder) for anything else.
    pub fn new() -> Self {
        Self::with_parts(
            FormatCompatibility::standard(false),
            DEFAULT_MAX_WASTE_MULTIPLE,
            KeyPool::default(),
        )
    }

    pub(crate) fn with_parts(
        compat: FormatCompatibility,
        max_waste_multiple: usize,
        keys: KeyPool<BucketKey>,
    ) -> Self {
        Self {
            groups: GroupedLruMap::new(),
            sizes: SizeIndex::new(),
            keys,
            compat,
            max_waste_multiple,
            #[cfg(feature = "metrics")]
            metrics: PoolMetrics::new(),
        }
    }

    /// Takes ownership of `buffer` and pools it under its allocation size
    /// and current format.
    pub fn put(&mut self, buffer: B) {
        let bytes = buffer.allocation_bytes();
        let format = buffer.format();
        let key = acquire_key(&mut self.keys, bytes, format);

        trace!(footprint = bytes, %format, "put buffer");
        self.groups.put(key, buffer, &mut self.keys);
        self.sizes.increment(format, bytes);

        #[cfg(feature = "metrics")]
        self.metrics.record_put();
    }

    /// Returns a pooled buffer able to hold `width x height` pixels of
    /// `format`, reconfigured to exactly that, or `Ok(None)` if none fits.
    ///
    /// The matched bucket becomes the most recently used, even on a miss.
    ///
    /// # Errors
    ///
    /// - [`PoolError::InvalidRequest`] if the requested footprint overflows.
    /// - [`PoolError::Invariant`] if the popped buffer is not recorded in the
    ///   size index under the key it was found by.
    pub fn get(&mut self, width: u32, height: u32, format: PixelFormat) -> Result<Option<B>, PoolError> {
        #[cfg(feature = "metrics")]
        self.metrics.record_get_call();

        let Some(target) = footprint(width, height, format) else {
            return Err(PoolError::InvalidRequest {
                width,
                height,
                format,
            });
        };

        let best = self.find_best_key(target, format);
        let (matched_bytes, matched_format) = (best.footprint, best.format);

        let Some(mut buffer) = self.groups.get(best, &mut self.keys) else {
            trace!(footprint = target, %format, "pool miss");
            #[cfg(feature = "metrics")]
            self.metrics.record_miss();
            return Ok(None);
        };

        let (actual_bytes, actual_format) = (buffer.allocation_bytes(), buffer.format());
        if (actual_bytes, actual_format) != (matched_bytes, matched_format) {
            error!(
                matched_footprint = matched_bytes,
                matched_format = %matched_format,
                actual_footprint = actual_bytes,
                actual_format = %actual_format,
                "pooled buffer does not match its bucket"
            );
            return Err(InvariantError::new(format!(
                "bucket [{matched_bytes}]({matched_format}) held a [{actual_bytes}]({actual_format}) buffer"
            ))
            .into());
        }
        self.decrement(actual_format, actual_bytes)?;

        buffer.reconfigure(width, height, format);

        if actual_bytes == target && actual_format == format {
            trace!(footprint = target, %format, "exact hit");
            #[cfg(feature = "metrics")]
            self.metrics.record_exact_hit();
        } else {
            trace!(
                footprint = target,
                %format,
                pooled_footprint = actual_bytes,
                pooled_format = %actual_format,
                "best-fit hit"
            );
            #[cfg(feature = "metrics")]
            self.metrics.record_best_fit_hit();
        }
        Ok(Some(buffer))
    }

    /// Removes a buffer from the least recently used non-empty bucket.
    ///
    /// # Errors
    ///
    /// [`PoolError::Invariant`] if the evicted buffer was not recorded in the
    /// size index. The buffer is dropped; the pool should be discarded.
    pub fn remove_last(&mut self) -> Result<Option<B>, PoolError> {
        #[cfg(feature = "metrics")]
        self.metrics.record_remove_last_call();

        let Some(buffer) = self.groups.remove_last(&mut self.keys) else {
            return Ok(None);
        };
        let (bytes, format) = (buffer.allocation_bytes(), buffer.format());
        self.decrement(format, bytes)?;
        trace!(footprint = bytes, %format, "evicted buffer");

        #[cfg(feature = "metrics")]
        self.metrics.record_evicted();
        Ok(Some(buffer))
    }

    /// Bytes `buffer` occupies in the pool.
    pub fn size_of(&self, buffer: &B) -> usize {
        buffer.allocation_bytes()
    }

    /// Renders `buffer` as `[bytes](FORMAT)`.
    pub fn describe_buffer(&self, buffer: &B) -> String {
        format!("[{}]({})", buffer.allocation_bytes(), buffer.format())
    }

    /// Renders a request as `[bytes](FORMAT)`; `[overflow](FORMAT)` if the
    /// footprint overflows.
    pub fn describe_request(&self, width: u32, height: u32, format: PixelFormat) -> String {
        match footprint(width, height, format) {
            Some(bytes) => format!("[{bytes}]({format})"),
            None => format!("[overflow]({format})"),
        }
    }

    /// Buffers currently pooled.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Buckets currently tracked, including empty ones awaiting pruning.
    pub fn group_count(&self) -> usize {
        self.groups.group_count()
    }

    pub fn max_waste_multiple(&self) -> usize {
        self.max_waste_multiple
    }

    pub fn compatibility(&self) -> &FormatCompatibility {
        &self.compat
    }

    pub fn key_pool(&self) -> &KeyPool<BucketKey> {
        &self.keys
    }

    /// Iterates `(bucket, buffer count)` from most to least recently used.
    pub fn buckets(&self) -> impl Iterator<Item = (&BucketKey, usize)> + '_ {
        self.groups.iter_groups()
    }

    /// Verifies the map's own invariants, then that every bucket's buffer
    /// count equals its size index entry and the totals agree.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.groups.check_invariants()?;
        for (key, count) in self.groups.iter_groups() {
            let indexed = self.sizes.count(key.format, key.footprint);
            if indexed != count {
                return Err(InvariantError::new(format!(
                    "bucket {key} holds {count} buffers, size index records {indexed}"
                )));
            }
        }
        if self.sizes.total() != self.groups.len() {
            return Err(InvariantError::new(format!(
                "size index records {} buffers, map holds {}",
                self.sizes.total(),
                self.groups.len()
            )));
        }
        Ok(())
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        if let Err(err) = self.check_invariants() {
            panic!("size format strategy invariant violated: {err}");
        }
        self.keys.debug_validate_invariants();
    }

    fn find_best_key(&mut self, target: usize, format: PixelFormat) -> BucketKey {
        let ideal = acquire_key(&mut self.keys, target, format);
        let limit = target.saturating_mul(self.max_waste_multiple);

        for &candidate in self.compat.candidates(format) {
            let Some(pooled) = self.sizes.ceiling(candidate, target) else {
                continue;
            };
            if pooled > limit {
                continue;
            }
            if pooled == target && candidate == format {
                return ideal;
            }
            self.keys.release(ideal);
            debug!(
                footprint = target,
                %format,
                pooled_footprint = pooled,
                pooled_format = %candidate,
                "substituting larger compatible bucket"
            );
            return acquire_key(&mut self.keys, pooled, candidate);
        }
        ideal
    }

    fn decrement(&mut self, format: PixelFormat, bytes: usize) -> Result<(), PoolError> {
        self.sizes.decrement(format, bytes).map_err(|err| {
            error!(footprint = bytes, %format, error = %err, "size index out of sync");
            PoolError::from(err)
        })
    }
}

impl<B: PixelBuffer> Default for SizeFormatStrategy<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> fmt::Debug for SizeFormatStrategy<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SizeFormatStrategy")
            .field("buffers", &self.groups.len())
            .field("buckets", &self.groups.group_count())
            .field("max_waste_multiple", &self.max_waste_multiple)
            .finish_non_exhaustive()
    }
}

impl<B> fmt::Display for SizeFormatStrategy<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SizeFormatStrategy{{groups={}, sizes=({})}}",
            self.groups, self.sizes
        )
    }
}

impl<B: PixelBuffer> PoolStrategy<B> for SizeFormatStrategy<B> {
    fn put(&mut self, buffer: B) {
        SizeFormatStrategy::put(self, buffer);
    }

    fn get(&mut self, width: u32, height: u32, format: PixelFormat) -> Result<Option<B>, PoolError> {
        SizeFormatStrategy::get(self, width, height, format)
    }

    fn remove_last(&mut self) -> Result<Option<B>, PoolError> {
        SizeFormatStrategy::remove_last(self)
    }

    fn size_of(&self, buffer: &B) -> usize {
        SizeFormatStrategy::size_of(self, buffer)
    }

    fn describe_buffer(&self, buffer: &B) -> String {
        SizeFormatStrategy::describe_buffer(self, buffer)
    }

    fn describe_request(&self, width: u32, height: u32, format: PixelFormat) -> String {
        SizeFormatStrategy::describe_request(self, width, height, format)
    }

    fn len(&self) -> usize {
        SizeFormatStrategy::len(self)
    }

    fn is_empty(&self) -> bool {
        SizeFormatStrategy::is_empty(self)
    }
}

#[cfg(feature = "metrics")]
impl<B> SizeFormatStrategy<B> {
    pub fn metrics_snapshot(&self) -> PoolMetricsSnapshot {
        PoolMetricsSnapshot {
            put_calls: self.metrics.put_calls,
            get_calls: self.metrics.get_calls,
            exact_hits: self.metrics.exact_hits,
            best_fit_hits: self.metrics.best_fit_hits,
            misses: self.metrics.misses,
            remove_last_calls: self.metrics.remove_last_calls,
            evicted: self.metrics.evicted,
            buffers: self.groups.len(),
            groups: self.groups.group_count(),
            pooled_keys: self.keys.len(),
        }
    }

    pub fn reset_metrics(&mut self) {
        self.metrics.reset();
    }
}

#[cfg(feature = "metrics")]
impl<B> MetricsSnapshotProvider<PoolMetricsSnapshot> for SizeFormatStrategy<B> {
    fn snapshot(&self) -> PoolMetricsSnapshot {
        self.metrics_snapshot()
    }
}

// SizeFormatStrategy is Send when B is Send and Sync when B is Sync; all
// mutation goes through &mut self. Sharing across threads goes through
// ConcurrentSizeFormatStrategy.

/// Thread-safe wrapper: one `RwLock` around the whole strategy.
///
/// Pool operations take the write lock; diagnostics take the read lock.
/// Clones share the same pool.
#[cfg(feature = "concurrency")]
pub struct ConcurrentSizeFormatStrategy<B> {
    inner: Arc<RwLock<SizeFormatStrategy<B>>>,
}

#[cfg(feature = "concurrency")]
impl<B> Clone for ConcurrentSizeFormatStrategy<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[cfg(feature = "concurrency")]
impl<B> fmt::Debug for ConcurrentSizeFormatStrategy<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pool = self.inner.read();
        f.debug_struct("ConcurrentSizeFormatStrategy")
            .field("buffers", &pool.groups.len())
            .field("buckets", &pool.groups.group_count())
            .finish_non_exhaustive()
    }
}

#[cfg(feature = "concurrency")]
impl<B> fmt::Display for ConcurrentSizeFormatStrategy<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pool = self.inner.read();
        fmt::Display::fmt(&*pool, f)
    }
}

#[cfg(feature = "concurrency")]
impl<B> Default for ConcurrentSizeFormatStrategy<B>
where
    B: PixelBuffer + Send + Sync,
{
    fn default() -> Self {
        Self::from_strategy(SizeFormatStrategy::new())
    }
}

#[cfg(feature = "concurrency")]
impl<B> ConcurrentSizeFormatStrategy<B>
where
    B: PixelBuffer + Send + Sync,
{
    /// Wraps a strategy with default configuration.
    ///
    /// ```
    /// use pixelpool::buffer::{HeapBitmap, PixelFormat};
    /// use pixelpool::policy::size_format::ConcurrentSizeFormatStrategy;
    ///
    /// let pool: ConcurrentSizeFormatStrategy<HeapBitmap> = ConcurrentSizeFormatStrategy::new();
    /// let shared = pool.clone();
    /// std::thread::spawn(move || shared.put(HeapBitmap::new(4, 4, PixelFormat::Alpha8)))
    ///     .join()
    ///     .unwrap();
    /// assert_eq!(pool.len(), 1);
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_strategy(strategy: SizeFormatStrategy<B>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(strategy)),
        }
    }

    pub fn put(&self, buffer: B) {
        self.inner.write().put(buffer);
    }

    /// See [`SizeFormatStrategy::get`]. Takes the write lock: lookups change
    /// recency.
    pub fn get(&self, width: u32, height: u32, format: PixelFormat) -> Result<Option<B>, PoolError> {
        self.inner.write().get(width, height, format)
    }

    pub fn remove_last(&self) -> Result<Option<B>, PoolError> {
        self.inner.write().remove_last()
    }

    /// Evicts until at most `max_buffers` remain, under a single lock.
    /// Returns the evicted buffers, least recently requested first.
    pub fn trim_to(&self, max_buffers: usize) -> Result<Vec<B>, PoolError> {
        let mut pool = self.inner.write();
        let mut evicted = Vec::new();
        while pool.len() > max_buffers {
            match pool.remove_last()? {
                Some(buffer) => evicted.push(buffer),
                None => break,
            }
        }
        Ok(evicted)
    }

    pub fn size_of(&self, buffer: &B) -> usize {
        buffer.allocation_bytes()
    }

    pub fn describe_buffer(&self, buffer: &B) -> String {
        self.inner.read().describe_buffer(buffer)
    }

    pub fn describe_request(&self, width: u32, height: u32, format: PixelFormat) -> String {
        self.inner.read().describe_request(width, height, format)
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn group_count(&self) -> usize {
        self.inner.read().group_count()
    }

    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.inner.read().check_invariants()
    }
}

#[cfg(all(feature = "metrics", feature = "concurrency"))]
impl<B> MetricsSnapshotProvider<PoolMetricsSnapshot> for ConcurrentSizeFormatStrategy<B> {
    fn snapshot(&self) -> PoolMetricsSnapshot {
        self.inner.read().metrics_snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::HeapBitmap;

    fn pool() -> SizeFormatStrategy<HeapBitmap> {
        SizeFormatStrategy::new()
    }

    fn argb(bytes: usize) -> HeapBitmap {
        HeapBitmap::with_allocation(bytes, 1, 1, PixelFormat::Argb8888)
    }

    mod bucket_key {
        use super::*;

        #[test]
        fn equality_ignores_lifecycle_tag() {
            let mut a = BucketKey::new(400, PixelFormat::Argb8888);
            let b = BucketKey::new(400, PixelFormat::Argb8888);
            a.pin();
            assert_eq!(a, b);
            assert_ne!(a, BucketKey::new(400, PixelFormat::Hidden));
            assert_ne!(a, BucketKey::new(401, PixelFormat::Argb8888));
        }

        #[test]
        fn display_renders_bytes_and_format() {
            assert_eq!(BucketKey::new(200, PixelFormat::Rgb565).to_string(), "[200](RGB_565)");
        }

        #[test]
        fn init_overwrites_identity() {
            let mut key = BucketKey::default();
            key.init(64, PixelFormat::Alpha8);
            assert_eq!((key.footprint(), key.format()), (64, PixelFormat::Alpha8));
        }
    }

    mod matching {
        use super::*;

        #[test]
        fn exact_put_then_get() {
            let mut pool = pool();
            pool.put(HeapBitmap::new(5, 5, PixelFormat::Argb8888));

            let got = pool.get(5, 5, PixelFormat::Argb8888).unwrap().unwrap();
            assert_eq!(got.allocation_bytes(), 100);
            assert!(pool.get(5, 5, PixelFormat::Argb8888).unwrap().is_none());
            pool.debug_validate_invariants();
        }

        #[test]
        fn larger_buffer_within_waste_limit_is_reconfigured() {
            let mut pool = pool();
            pool.put(argb(700));

            let got = pool.get(5, 5, PixelFormat::Argb8888).unwrap().unwrap();
            assert_eq!(got.allocation_bytes(), 700);
            assert_eq!((got.width(), got.height()), (5, 5));
            assert_eq!(got.byte_count(), 100);
            pool.debug_validate_invariants();
        }

        #[test]
        fn exact_match_preferred_over_larger() {
            let mut pool = pool();
            pool.put(argb(100));
            pool.put(argb(700));

            let got = pool.get(5, 5, PixelFormat::Argb8888).unwrap().unwrap();
            assert_eq!(got.allocation_bytes(), 100);
            assert_eq!(pool.len(), 1);
        }

        #[test]
        fn buffer_beyond_waste_limit_is_not_used() {
            let mut pool = pool();
            pool.put(argb(900));

            assert!(pool.get(5, 5, PixelFormat::Argb8888).unwrap().is_none());
            assert_eq!(pool.len(), 1);
            pool.debug_validate_invariants();
        }

        #[test]
        fn waste_limit_is_inclusive() {
            let mut pool = pool();
            pool.put(argb(800));
            let got = pool.get(5, 5, PixelFormat::Argb8888).unwrap().unwrap();
            assert_eq!(got.allocation_bytes(), 800);
        }

        #[test]
        fn smaller_buffers_never_match() {
            let mut pool = pool();
            pool.put(argb(96));
            assert!(pool.get(5, 5, PixelFormat::Argb8888).unwrap().is_none());
        }

        #[test]
        fn compatible_format_is_served_and_retagged() {
            let mut pool = pool();
            pool.put(HeapBitmap::new(5, 5, PixelFormat::Hidden));

            let got = pool.get(5, 5, PixelFormat::Argb8888).unwrap().unwrap();
            assert_eq!(got.format(), PixelFormat::Argb8888);
            assert!(pool.is_empty());
            pool.debug_validate_invariants();
        }

        #[test]
        fn incompatible_format_never_matches() {
            let mut pool = pool();
            // Same byte width as ARGB_4444, different class.
            pool.put(HeapBitmap::new(10, 10, PixelFormat::Rgb565));
            assert!(pool.get(10, 10, PixelFormat::Argb4444).unwrap().is_none());
            assert!(pool.get(5, 5, PixelFormat::Argb8888).unwrap().is_none());
            assert_eq!(pool.len(), 1);
        }

        #[test]
        fn first_acceptable_format_in_class_order_wins() {
            let mut pool = pool();
            // Class order for ARGB_8888 requests is [ARGB_8888, HIDDEN].
            pool.put(HeapBitmap::new(5, 5, PixelFormat::Hidden));
            pool.put(argb(400));

            let got = pool.get(5, 5, PixelFormat::Argb8888).unwrap().unwrap();
            assert_eq!(got.allocation_bytes(), 400);
            assert_eq!(pool.len(), 1);
        }

        #[test]
        fn f16_only_shares_with_wide_gamut() {
            let mut narrow = pool();
            narrow.put(HeapBitmap::new(10, 10, PixelFormat::Argb8888));
            assert!(narrow.get(5, 5, PixelFormat::RgbaF16).unwrap().is_none());

            let mut wide: SizeFormatStrategy<HeapBitmap> = SizeFormatStrategy::with_parts(
                FormatCompatibility::standard(true),
                DEFAULT_MAX_WASTE_MULTIPLE,
                KeyPool::default(),
            );
            wide.put(HeapBitmap::new(10, 10, PixelFormat::Argb8888));
            let got = wide.get(5, 5, PixelFormat::RgbaF16).unwrap().unwrap();
            assert_eq!(got.format(), PixelFormat::RgbaF16);
            assert_eq!(got.byte_count(), 200);
        }

        #[test]
        fn zero_sized_request_only_matches_zero_footprint() {
            let mut pool = pool();
            pool.put(argb(4));
            assert!(pool.get(0, 10, PixelFormat::Argb8888).unwrap().is_none());

            pool.put(HeapBitmap::new(0, 0, PixelFormat::Argb8888));
            let got = pool.get(0, 10, PixelFormat::Argb8888).unwrap().unwrap();
            assert_eq!(got.allocation_bytes(), 0);
        }

        #[test]
        fn overflowing_request_is_rejected() {
            let mut pool = pool();
            let err = pool.get(u32::MAX, u32::MAX, PixelFormat::RgbaF16).unwrap_err();
            assert!(matches!(err, PoolError::InvalidRequest { .. }));
            assert_eq!(pool.group_count(), 0);
        }

        #[test]
        fn empty_pool_always_misses() {
            let mut pool = pool();
            for format in PixelFormat::ALL {
                assert!(pool.get(3, 3, format).unwrap().is_none());
            }
            assert!(pool.remove_last().unwrap().is_none());
            pool.debug_validate_invariants();
        }
    }

    mod recency {
        use super::*;

        #[test]
        fn new_buckets_start_least_recent() {
            let mut pool = pool();
            pool.put(argb(100));
            pool.put(argb(200));
            pool.put(argb(300));

            let order: Vec<_> = pool.buckets().map(|(k, _)| k.footprint()).collect();
            assert_eq!(order, vec![100, 200, 300]);
            assert_eq!(pool.remove_last().unwrap().unwrap().allocation_bytes(), 300);
        }

        #[test]
        fn miss_touches_bucket_recency() {
            let mut pool = pool();
            pool.put(argb(100));
            pool.put(argb(400));
            // The miss creates [400](RGB_565) at the head.
            assert!(pool.get(10, 20, PixelFormat::Rgb565).unwrap().is_none());
            let head = pool.buckets().next().map(|(k, n)| (k.to_string(), n));
            assert_eq!(head, Some(("[400](RGB_565)".to_string(), 0)));

            // Draining the 100 bucket through lookups still leaves it ahead of 400.
            pool.put(argb(100));
            assert!(pool.get(5, 5, PixelFormat::Argb8888).unwrap().is_some());
            assert!(pool.get(5, 5, PixelFormat::Argb8888).unwrap().is_some());
            assert_eq!(pool.remove_last().unwrap().unwrap().allocation_bytes(), 400);
            pool.debug_validate_invariants();
        }

        #[test]
        fn remove_last_prunes_empty_buckets() {
            let mut pool = pool();
            pool.put(argb(100));
            assert!(pool.get(1, 1, PixelFormat::Alpha8).unwrap().is_none());
            assert_eq!(pool.group_count(), 2);

            assert!(pool.get(5, 5, PixelFormat::Argb8888).unwrap().is_some());
            assert!(pool.remove_last().unwrap().is_none());
            assert_eq!(pool.group_count(), 0);
            pool.debug_validate_invariants();
        }
    }

    mod diagnostics {
        use std::cell::Cell;
        use std::rc::Rc;

        use super::*;

        #[test]
        fn size_of_and_descriptions() {
            let pool = pool();
            let bitmap = HeapBitmap::with_allocation(1600, 10, 10, PixelFormat::Argb8888);
            assert_eq!(pool.size_of(&bitmap), 1600);
            assert_eq!(pool.describe_buffer(&bitmap), "[1600](ARGB_8888)");
            assert_eq!(pool.describe_request(10, 10, PixelFormat::Rgb565), "[200](RGB_565)");
            assert_eq!(
                pool.describe_request(u32::MAX, u32::MAX, PixelFormat::RgbaF16),
                "[overflow](RGBA_F16)"
            );
        }

        #[test]
        fn display_shows_groups_and_sizes() {
            let mut pool = pool();
            pool.put(HeapBitmap::new(5, 5, PixelFormat::Argb8888));
            pool.put(HeapBitmap::new(5, 5, PixelFormat::Argb8888));
            pool.put(HeapBitmap::new(10, 10, PixelFormat::Rgb565));
            assert_eq!(
                pool.to_string(),
                "SizeFormatStrategy{groups=GroupedLruMap( {[100](ARGB_8888):2}, {[200](RGB_565):1} ), \
                 sizes=(RGB_565[{200=1}], ARGB_8888[{100=2}])}"
            );
        }

        #[test]
        fn check_invariants_detects_index_drift() {
            let mut pool = pool();
            pool.put(argb(100));
            pool.sizes.increment(PixelFormat::Argb8888, 100);
            let err = pool.check_invariants().unwrap_err();
            assert!(err.message().contains("[100](ARGB_8888)"));
        }

        #[test]
        fn desynced_index_fails_remove_last() {
            let mut pool = pool();
            pool.put(argb(100));
            pool.sizes.decrement(PixelFormat::Argb8888, 100).unwrap();

            let err = pool.remove_last().unwrap_err();
            assert!(err.is_invariant());
            assert!(err.to_string().contains("tried to decrement empty size"));
        }

        #[test]
        fn desynced_index_fails_get() {
            let mut pool = pool();
            pool.put(argb(100));
            pool.sizes.decrement(PixelFormat::Argb8888, 100).unwrap();

            let err = pool.get(5, 5, PixelFormat::Argb8888).unwrap_err();
            assert!(err.is_invariant());
            assert!(err.to_string().contains("tried to decrement empty size: [100](ARGB_8888)"));
        }

        /// Buffer whose reported allocation can be changed while it sits in the pool.
        #[derive(Debug)]
        struct ShiftingBuffer {
            allocation: Rc<Cell<usize>>,
            width: u32,
            height: u32,
            format: PixelFormat,
        }

        impl PixelBuffer for ShiftingBuffer {
            fn width(&self) -> u32 {
                self.width
            }

            fn height(&self) -> u32 {
                self.height
            }

            fn format(&self) -> PixelFormat {
                self.format
            }

            fn allocation_bytes(&self) -> usize {
                self.allocation.get()
            }

            fn reconfigure(&mut self, width: u32, height: u32, format: PixelFormat) {
                self.width = width;
                self.height = height;
                self.format = format;
            }
        }

        #[test]
        fn buffer_that_changed_size_while_pooled_fails_get() {
            let mut pool: SizeFormatStrategy<ShiftingBuffer> = SizeFormatStrategy::new();
            let allocation = Rc::new(Cell::new(100));
            pool.put(ShiftingBuffer {
                allocation: Rc::clone(&allocation),
                width: 5,
                height: 5,
                format: PixelFormat::Argb8888,
            });
            allocation.set(200);

            let err = pool.get(5, 5, PixelFormat::Argb8888).unwrap_err();
            assert!(err.is_invariant());
            assert!(
                err.to_string()
                    .contains("bucket [100](ARGB_8888) held a [200](ARGB_8888) buffer")
            );
        }
    }

    mod keys {
        use super::*;

        #[test]
        fn bucket_keys_are_pinned_and_spares_pooled() {
            let mut pool = pool();
            pool.put(argb(100));
            pool.put(argb(100));
            pool.put(argb(700));
            pool.get(5, 5, PixelFormat::Argb8888).unwrap();
            pool.get(50, 50, PixelFormat::Alpha8).unwrap();

            assert!(pool.buckets().all(|(k, _)| k.is_pinned()));
            assert!(pool.key_pool().len() <= pool.key_pool().capacity());
            pool.debug_validate_invariants();
        }

        #[test]
        fn steady_state_lookups_reuse_keys() {
            let mut pool = pool();
            for _ in 0..50 {
                pool.put(argb(100));
                pool.get(5, 5, PixelFormat::Argb8888).unwrap();
            }
            // One key pinned by the bucket, one spare cycling.
            assert!(pool.key_pool().built() <= 2);
        }
    }

    #[cfg(feature = "metrics")]
    mod metrics {
        use super::*;

        #[test]
        fn counts_hits_misses_and_evictions() {
            let mut pool = pool();
            pool.put(argb(100));
            pool.put(argb(700));
            pool.put(argb(700));
            pool.get(5, 5, PixelFormat::Argb8888).unwrap();
            pool.get(5, 5, PixelFormat::Argb8888).unwrap();
            pool.get(1, 1, PixelFormat::Alpha8).unwrap();
            pool.remove_last().unwrap();

            let snap = pool.snapshot();
            assert_eq!(snap.put_calls, 3);
            assert_eq!(snap.get_calls, 3);
            assert_eq!(snap.exact_hits, 1);
            assert_eq!(snap.best_fit_hits, 1);
            assert_eq!(snap.misses, 1);
            assert_eq!(snap.remove_last_calls, 1);
            assert_eq!(snap.evicted, 1);
            assert_eq!(snap.buffers, 0);

            pool.reset_metrics();
            assert_eq!(pool.snapshot().put_calls, 0);
        }

        #[test]
        fn rejected_requests_count_as_get_calls() {
            let mut pool = pool();
            pool.put(argb(100));
            pool.get(5, 5, PixelFormat::Argb8888).unwrap();
            let err = pool.get(u32::MAX, u32::MAX, PixelFormat::RgbaF16).unwrap_err();
            assert!(!err.is_invariant());

            let snap = pool.snapshot();
            assert_eq!(snap.get_calls, 2);
            assert_eq!(snap.exact_hits, 1);
            assert_eq!(snap.misses, 0);
            assert!((snap.hit_rate() - 0.5).abs() < f64::EPSILON);
        }
    }
}
