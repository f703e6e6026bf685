//! Per-format sorted census of pooled buffer footprints.
//!
//! A summary of what the grouped map holds: for each [`PixelFormat`], an
//! ordered map from footprint to how many buffers of exactly that footprint
//! and format are pooled. It answers "smallest pooled footprint at least N"
//! in O(log n) without walking the groups. It never stores buffers and is
//! never the authority on whether one is present.
//!
//! ```text
//!   ARGB_8888 ─► BTreeMap { 400 → 2, 1600 → 1, 4096 → 3 }
//!   RGB_565   ─► BTreeMap { 200 → 1 }
//!
//!   ceiling(ARGB_8888, 500) = Some(1600)
//! ```
//!
//! Entries whose count reaches zero are removed, as are formats left with no
//! entries, so ceiling queries never land on a size that is no longer pooled.

use std::collections::BTreeMap;
use std::fmt;

use rustc_hash::FxHashMap;

use crate::buffer::PixelFormat;
use crate::error::InvariantError;

#[derive(Debug, Default)]
pub struct SizeIndex {
    sizes: FxHashMap<PixelFormat, BTreeMap<usize, usize>>,
    total: usize,
}

impl SizeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one more pooled buffer of `footprint` bytes in `format`.
    pub fn increment(&mut self, format: PixelFormat, footprint: usize) {
        *self
            .sizes
            .entry(format)
            .or_default()
            .entry(footprint)
            .or_insert(0) += 1;
        self.total += 1;
    }

    /// Records that one pooled buffer of `footprint` bytes in `format` left
    /// the pool.
    ///
    /// Fails if no such buffer was recorded, which means this index and the
    /// grouped map have diverged.
    pub fn decrement(&mut self, format: PixelFormat, footprint: usize) -> Result<(), InvariantError> {
        let sizes = self
            .sizes
            .get_mut(&format)
            .ok_or_else(|| Self::empty_size(format, footprint))?;
        let count = sizes
            .get_mut(&footprint)
            .ok_or_else(|| Self::empty_size(format, footprint))?;
        *count -= 1;
        if *count == 0 {
            sizes.remove(&footprint);
            if sizes.is_empty() {
                self.sizes.remove(&format);
            }
        }
        self.total -= 1;
        Ok(())
    }

    /// Smallest recorded footprint `>= footprint` for `format`.
    pub fn ceiling(&self, format: PixelFormat, footprint: usize) -> Option<usize> {
        self.sizes
            .get(&format)?
            .range(footprint..)
            .next()
            .map(|(&size, _)| size)
    }

    /// Buffers recorded for exactly `(format, footprint)`.
    pub fn count(&self, format: PixelFormat, footprint: usize) -> usize {
        self.sizes
            .get(&format)
            .and_then(|sizes| sizes.get(&footprint))
            .copied()
            .unwrap_or(0)
    }

    /// Buffers recorded across all formats and footprints.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Iterates `(format, footprint, count)` ordered by format then footprint.
    pub fn entries(&self) -> impl Iterator<Item = (PixelFormat, usize, usize)> + '_ {
        let mut formats: Vec<_> = self.sizes.keys().copied().collect();
        formats.sort_unstable();
        formats.into_iter().flat_map(move |format| {
            self.sizes
                .get(&format)
                .into_iter()
                .flat_map(move |sizes| sizes.iter().map(move |(&size, &count)| (format, size, count)))
        })
    }

    fn empty_size(format: PixelFormat, footprint: usize) -> InvariantError {
        InvariantError::new(format!(
            "tried to decrement empty size: [{footprint}]({format})"
        ))
    }
}

impl fmt::Display for SizeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut current = None;
        for (format, size, count) in self.entries() {
            if current == Some(format) {
                f.write_str(", ")?;
            } else {
                if current.is_some() {
                    f.write_str("}], ")?;
                }
                write!(f, "{format}[{{")?;
                current = Some(format);
            }
            write!(f, "{size}={count}")?;
        }
        if current.is_some() {
            f.write_str("}]")?;
        }
        Ok(())
    }
}
