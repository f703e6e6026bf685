//! Pixel-format compatibility table.
//!
//! Handing back a buffer whose memory layout differs from the request would
//! corrupt the interpretation of its contents, so a request may only be served
//! from formats listed as interchangeable with the requested one. The table
//! is plain data; the matching algorithm in
//! [`SizeFormatStrategy`](crate::policy::size_format::SizeFormatStrategy)
//! knows nothing about individual formats.
//!
//! ## Standard table
//!
//! | Requested              | Searched, in order                         |
//! |------------------------|--------------------------------------------|
//! | `Argb8888`, `Hidden`   | `Argb8888`, `Hidden` (+ `RgbaF16` if wide) |
//! | `RgbaF16` (wide gamut) | `Argb8888`, `Hidden`, `RgbaF16`            |
//! | `RgbaF16` (otherwise)  | `RgbaF16`                                  |
//! | `Rgb565`               | `Rgb565`                                   |
//! | `Argb4444`             | `Argb4444`                                 |
//! | `Alpha8`               | `Alpha8`                                   |
//!
//! `Rgb565` and `Argb4444` share a byte width but are kept apart; the latter
//! is deprecated on most hosts and mixing them buys little.
//!
//! Formats without an entry are searched on their own.
//!
//! ## Example
//!
//! ```
//! use pixelpool::buffer::PixelFormat;
//! use pixelpool::policy::compat::FormatCompatibility;
//!
//! let table = FormatCompatibility::standard(false)
//!     .with_class(&[PixelFormat::Rgb565, PixelFormat::Argb4444]);
//! assert_eq!(
//!     table.candidates(PixelFormat::Argb4444),
//!     &[PixelFormat::Rgb565, PixelFormat::Argb4444]
//! );
//! assert_eq!(table.candidates(PixelFormat::Alpha8), &[PixelFormat::Alpha8]);
//! ```

use rustc_hash::FxHashMap;

use crate::buffer::PixelFormat;
use crate::error::ConfigError;

/// Maps each requested format to the ordered formats that may serve it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatCompatibility {
    classes: FxHashMap<PixelFormat, Vec<PixelFormat>>,
}

impl FormatCompatibility {
    /// A table with no entries: every format only matches itself.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The standard table. `wide_gamut` admits `RgbaF16` into the 32-bit
    /// class, for hosts that can reconfigure between them.
    pub fn standard(wide_gamut: bool) -> Self {
        let mut argb = vec![PixelFormat::Argb8888, PixelFormat::Hidden];
        if wide_gamut {
            argb.push(PixelFormat::RgbaF16);
        }
        Self::empty()
            .with_class(&argb)
            .with_class(&[PixelFormat::Rgb565])
            .with_class(&[PixelFormat::Argb4444])
            .with_class(&[PixelFormat::Alpha8])
    }

    /// Makes every member of `class` interchangeable with every other,
    /// searched in the order given. Replaces existing entries for the members.
    pub fn with_class(mut self, class: &[PixelFormat]) -> Self {
        for &format in class {
            self.classes.insert(format, class.to_vec());
        }
        self
    }

    /// Sets the search order for requests of `format` alone, leaving other
    /// entries untouched. Useful for one-way compatibility.
    pub fn with_candidates(mut self, format: PixelFormat, candidates: &[PixelFormat]) -> Self {
        self.classes.insert(format, candidates.to_vec());
        self
    }

    /// Formats that may serve a request for `format`, in search order.
    pub fn candidates(&self, format: PixelFormat) -> &[PixelFormat] {
        match self.classes.get(&format) {
            Some(class) => class,
            None => {
                let all: &'static [PixelFormat] = &PixelFormat::ALL;
                let pos = all.iter().position(|f| *f == format).unwrap_or(0);
                &all[pos..=pos]
            },
        }
    }

    /// Checks that every entry is non-empty, lists its own format, and has no
    /// duplicates.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut formats: Vec<_> = self.classes.keys().copied().collect();
        formats.sort_unstable();
        for format in formats {
            let candidates = self.candidates(format);
            if candidates.is_empty() {
                return Err(ConfigError::new(format!(
                    "compatibility entry for {format} is empty"
                )));
            }
            if !candidates.contains(&format) {
                return Err(ConfigError::new(format!(
                    "compatibility entry for {format} does not include {format} itself"
                )));
            }
            for (i, candidate) in candidates.iter().enumerate() {
                if candidates[..i].contains(candidate) {
                    return Err(ConfigError::new(format!(
                        "compatibility entry for {format} lists {candidate} twice"
                    )));
                }
            }
        }
        Ok(())
    }
}
