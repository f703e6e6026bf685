pub use crate::buffer::{HeapBitmap, PixelBuffer, PixelFormat, footprint};
pub use crate::builder::StrategyBuilder;
pub use crate::error::{ConfigError, InvariantError, PoolError};
#[cfg(feature = "metrics")]
pub use crate::metrics::snapshot::PoolMetricsSnapshot;
#[cfg(feature = "metrics")]
pub use crate::metrics::traits::{MetricsExporter, MetricsSnapshotProvider};
pub use crate::policy::compat::FormatCompatibility;
#[cfg(feature = "concurrency")]
pub use crate::policy::size_format::ConcurrentSizeFormatStrategy;
pub use crate::policy::size_format::{DEFAULT_MAX_WASTE_MULTIPLE, SizeFormatStrategy};
pub use crate::traits::PoolStrategy;
