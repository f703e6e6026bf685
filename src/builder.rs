//! Strategy builder.
//!
//! Collects the tunables of a [`SizeFormatStrategy`] and validates them once,
//! so a constructed strategy never has to re-check its configuration.
//!
//! | Setting              | Default                              |
//! |----------------------|--------------------------------------|
//! | `max_waste_multiple` | [`DEFAULT_MAX_WASTE_MULTIPLE`] (8)    |
//! | `key_pool_capacity`  | [`DEFAULT_KEY_POOL_CAPACITY`] (20)    |
//! | `wide_gamut`         | `false`                              |
//! | `compatibility`      | `FormatCompatibility::standard(wide_gamut)` |
//!
//! ## Example
//!
//! ```rust
//! use pixelpool::builder::StrategyBuilder;
//! use pixelpool::buffer::{HeapBitmap, PixelFormat};
//!
//! let mut pool = StrategyBuilder::new()
//!     .max_waste_multiple(4)
//!     .wide_gamut(true)
//!     .build::<HeapBitmap>();
//!
//! pool.put(HeapBitmap::new(10, 10, PixelFormat::Argb8888));
//! // 400 bytes of ARGB_8888 can serve 200 bytes of RGBA_F16 on wide-gamut hosts.
//! assert!(pool.get(5, 5, PixelFormat::RgbaF16).unwrap().is_some());
//! ```

use crate::buffer::PixelBuffer;
use crate::ds::{DEFAULT_KEY_POOL_CAPACITY, KeyPool};
use crate::error::ConfigError;
use crate::policy::compat::FormatCompatibility;
#[cfg(feature = "concurrency")]
use crate::policy::size_format::ConcurrentSizeFormatStrategy;
use crate::policy::size_format::{DEFAULT_MAX_WASTE_MULTIPLE, SizeFormatStrategy};

/// Builder for [`SizeFormatStrategy`].
#[derive(Debug, Clone)]
pub struct StrategyBuilder {
    max_waste_multiple: usize,
    key_pool_capacity: usize,
    wide_gamut: bool,
    compatibility: Option<FormatCompatibility>,
}

impl StrategyBuilder {
    pub fn new() -> Self {
        Self {
            max_waste_multiple: DEFAULT_MAX_WASTE_MULTIPLE,
            key_pool_capacity: DEFAULT_KEY_POOL_CAPACITY,
            wide_gamut: false,
            compatibility: None,
        }
    }

    /// Largest accepted ratio of pooled to requested footprint. Must be > 0.
    pub fn max_waste_multiple(mut self, multiple: usize) -> Self {
        self.max_waste_multiple = multiple;
        self
    }

    /// Spare key records kept for reuse. Zero disables recycling.
    pub fn key_pool_capacity(mut self, capacity: usize) -> Self {
        self.key_pool_capacity = capacity;
        self
    }

    /// Lets `RgbaF16` share buffers with the 32-bit formats. Ignored when an
    /// explicit table is set with [`compatibility`](Self::compatibility).
    pub fn wide_gamut(mut self, enabled: bool) -> Self {
        self.wide_gamut = enabled;
        self
    }

    /// Replaces the standard compatibility table.
    pub fn compatibility(mut self, table: FormatCompatibility) -> Self {
        self.compatibility = Some(table);
        self
    }

    /// Validates the configuration and builds the strategy.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `max_waste_multiple` is zero or the
    /// compatibility table fails [`FormatCompatibility::validate`].
    pub fn try_build<B: PixelBuffer>(self) -> Result<SizeFormatStrategy<B>, ConfigError> {
        if self.max_waste_multiple == 0 {
            return Err(ConfigError::new("max_waste_multiple must be > 0"));
        }
        let compat = match self.compatibility {
            Some(table) => table,
            None => FormatCompatibility::standard(self.wide_gamut),
        };
        compat.validate()?;
        Ok(SizeFormatStrategy::with_parts(
            compat,
            self.max_waste_multiple,
            KeyPool::new(self.key_pool_capacity),
        ))
    }

    /// Builds the strategy.
    ///
    /// # Panics
    ///
    /// Panics on invalid configuration; see [`try_build`](Self::try_build).
    pub fn build<B: PixelBuffer>(self) -> SizeFormatStrategy<B> {
        match self.try_build() {
            Ok(strategy) => strategy,
            Err(err) => panic!("invalid strategy configuration: {err}"),
        }
    }

    /// Builds a strategy shared behind a lock.
    ///
    /// # Errors
    ///
    /// Same as [`try_build`](Self::try_build).
    #[cfg(feature = "concurrency")]
    pub fn try_build_concurrent<B>(self) -> Result<ConcurrentSizeFormatStrategy<B>, ConfigError>
    where
        B: PixelBuffer + Send + Sync,
    {
        self.try_build()
            .map(ConcurrentSizeFormatStrategy::from_strategy)
    }
}

impl Default for StrategyBuilder {
    fn default() -> Self {
        Self::new()
    }
}
