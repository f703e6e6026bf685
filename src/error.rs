//! Error types for the pixelpool library.
//!
//! ## Key Components
//!
//! - [`InvariantError`]: Returned when the pool's internal structures disagree
//!   with each other (e.g. the size index has no entry for a buffer the
//!   grouped map just handed back). Never recoverable.
//! - [`ConfigError`]: Returned when strategy configuration is invalid
//!   (e.g. a zero waste multiple or an empty compatibility class).
//! - [`PoolError`]: What pool operations return; wraps invariant failures and
//!   rejected requests.
//!
//! A lookup that finds nothing is *not* an error: pool operations return
//! `Ok(None)` for misses.
//!
//! ## Example Usage
//!
//! ```
//! use pixelpool::builder::StrategyBuilder;
//! use pixelpool::buffer::HeapBitmap;
//! use pixelpool::error::ConfigError;
//!
//! let bad = StrategyBuilder::new().max_waste_multiple(0).try_build::<HeapBitmap>();
//! let err: ConfigError = bad.unwrap_err();
//! assert!(err.to_string().contains("max_waste_multiple"));
//! ```

use std::fmt;

use crate::buffer::PixelFormat;

// ---------------------------------------------------------------------------
// InvariantError
// ---------------------------------------------------------------------------

/// Error returned when internal pool invariants are violated.
///
/// Produced by `check_invariants` methods and by eviction/lookup paths when
/// the size index and the grouped map have desynchronised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantError(String);

impl InvariantError {
    /// Creates a new `InvariantError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for InvariantError {}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when strategy configuration parameters are invalid.
///
/// Produced by [`StrategyBuilder::try_build`](crate::builder::StrategyBuilder::try_build)
/// and [`FormatCompatibility::validate`](crate::policy::compat::FormatCompatibility::validate).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(String);

impl ConfigError {
    /// Creates a new `ConfigError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// PoolError
// ---------------------------------------------------------------------------

/// Error returned by pool operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// The size index and the grouped map disagree. The pool is corrupt and
    /// the operation was aborted.
    Invariant(InvariantError),
    /// The requested dimensions do not describe an addressable footprint.
    InvalidRequest {
        width: u32,
        height: u32,
        format: PixelFormat,
    },
}

impl PoolError {
    /// Returns `true` for internal-consistency failures.
    pub fn is_invariant(&self) -> bool {
        matches!(self, PoolError::Invariant(_))
    }
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolError::Invariant(err) => write!(f, "pool invariant violated: {err}"),
            PoolError::InvalidRequest {
                width,
                height,
                format,
            } => write!(
                f,
                "invalid buffer request: {width}x{height} {format} overflows the addressable footprint"
            ),
        }
    }
}

impl std::error::Error for PoolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PoolError::Invariant(err) => Some(err),
            PoolError::InvalidRequest { .. } => None,
        }
    }
}

impl From<InvariantError> for PoolError {
    fn from(err: InvariantError) -> Self {
        PoolError::Invariant(err)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- InvariantError ---------------------------------------------------

    #[test]
    fn invariant_display_shows_message() {
        let err = InvariantError::new("size index out of sync");
        assert_eq!(err.to_string(), "size index out of sync");
        assert_eq!(err.message(), "size index out of sync");
    }

    #[test]
    fn invariant_implements_std_error() {
        fn assert_error<T: std::error::Error>() {}
        assert_error::<InvariantError>();
    }

    // -- ConfigError ------------------------------------------------------

    #[test]
    fn config_display_shows_message() {
        let err = ConfigError::new("max_waste_multiple must be > 0");
        assert_eq!(err.to_string(), "max_waste_multiple must be > 0");
        assert_eq!(err.clone(), err);
    }

    // -- PoolError --------------------------------------------------------

    #[test]
    fn pool_error_wraps_invariant() {
        let err: PoolError = InvariantError::new("tried to decrement empty size").into();
        assert!(err.is_invariant());
        assert!(err.to_string().contains("tried to decrement empty size"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn pool_error_invalid_request_mentions_dimensions() {
        let err = PoolError::InvalidRequest {
            width: u32::MAX,
            height: u32::MAX,
            format: PixelFormat::RgbaF16,
        };
        assert!(!err.is_invariant());
        let msg = err.to_string();
        assert!(msg.contains("4294967295x4294967295"));
        assert!(msg.contains("RGBA_F16"));
        assert!(!msg.contains("RgbaF16"));
        assert!(std::error::Error::source(&err).is_none());
    }
}
