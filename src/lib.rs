//! pixelpool: a reusable pixel-buffer pool with size/format bucketing and
//! bounded best-fit matching.
//!
//! Image pipelines allocate and free many same-sized pixel buffers. This crate
//! keeps released buffers in buckets keyed by `(allocation bytes, format)`,
//! orders the buckets by how recently they were *requested*, and serves a
//! request from the smallest compatible pooled buffer that is no more than
//! a configurable multiple larger than needed.
//!
//! ## Layout
//!
//! | Module        | Contents                                                    |
//! |---------------|-------------------------------------------------------------|
//! | [`buffer`]    | `PixelFormat`, the `PixelBuffer` host trait, `HeapBitmap`   |
//! | [`ds`]        | `SlotArena`, `KeyPool`, `GroupedLruMap`, `SizeIndex`        |
//! | [`policy`]    | compatibility table and `SizeFormatStrategy`                |
//! | [`builder`]   | `StrategyBuilder`                                           |
//! | [`traits`]    | `PoolStrategy`                                              |
//! | [`error`]     | `PoolError`, `InvariantError`, `ConfigError`                |
//! | `metrics`     | counters and snapshots (feature `metrics`)                  |
//!
//! ## Features
//!
//! - `metrics`: per-strategy counters, snapshots and a Prometheus text exporter.
//! - `concurrency`: `ConcurrentSizeFormatStrategy`, a lock-wrapped strategy.
//!
//! ## Example
//!
//! ```
//! use pixelpool::prelude::*;
//!
//! let mut pool = StrategyBuilder::new().build::<HeapBitmap>();
//! pool.put(HeapBitmap::new(64, 64, PixelFormat::Argb8888));
//!
//! // A smaller request reuses the 64x64 allocation.
//! let thumb = pool.get(32, 32, PixelFormat::Argb8888)?.expect("pooled");
//! assert_eq!(thumb.byte_count(), 32 * 32 * 4);
//! assert_eq!(thumb.allocation_bytes(), 64 * 64 * 4);
//! # Ok::<(), PoolError>(())
//! ```

pub mod buffer;
pub mod builder;
pub mod ds;
pub mod error;
pub mod policy;

#[cfg(feature = "metrics")]
pub mod metrics;

pub mod prelude;
pub mod traits;

pub use crate::buffer::{HeapBitmap, PixelBuffer, PixelFormat};
pub use crate::builder::StrategyBuilder;
pub use crate::ds::{GroupedLruMap, KeyPool, SizeIndex, SlotArena, SlotId};
pub use crate::error::{ConfigError, InvariantError, PoolError};
#[cfg(feature = "metrics")]
pub use crate::metrics::snapshot::PoolMetricsSnapshot;
pub use crate::policy::compat::FormatCompatibility;
#[cfg(feature = "concurrency")]
pub use crate::policy::size_format::ConcurrentSizeFormatStrategy;
pub use crate::policy::size_format::{BucketKey, SizeFormatStrategy};
pub use crate::traits::PoolStrategy;
