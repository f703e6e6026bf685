//! Pixel formats and the host buffer interface.
//!
//! The pool never allocates or frees pixel memory itself. It stores values
//! implementing [`PixelBuffer`], keys them by [`allocation_bytes`] and
//! [`format`], and on reuse asks the buffer to [`reconfigure`] itself in
//! place for the new request.
//!
//! [`HeapBitmap`] is a plain `Vec<u8>`-backed implementation, used by the
//! tests, benches and demos and suitable wherever pixel data lives in
//! ordinary heap memory.
//!
//! ## Footprint vs. byte count
//!
//! ```text
//!   HeapBitmap (allocated as 20x20 ARGB_8888, then reconfigured to 10x10)
//!   ┌───────────────────────────────────────────────────────────────┐
//!   │ 400 bytes in use │              1200 bytes spare              │
//!   └───────────────────────────────────────────────────────────────┘
//!   allocation_bytes() = 1600   (the pool's footprint; never changes)
//!   byte_count()       = 400    (width * height * bytes_per_pixel)
//! ```
//!
//! [`allocation_bytes`]: PixelBuffer::allocation_bytes
//! [`format`]: PixelBuffer::format
//! [`reconfigure`]: PixelBuffer::reconfigure

use std::fmt;

/// Pixel layout tag.
///
/// Formats sharing a bytes-per-pixel layout may be interchangeable for reuse;
/// which ones actually are is decided by
/// [`FormatCompatibility`](crate::policy::compat::FormatCompatibility), not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PixelFormat {
    /// Single alpha channel, 1 byte per pixel.
    Alpha8,
    /// 16-bit RGB without alpha.
    Rgb565,
    /// 16-bit ARGB, 4 bits per channel. Deprecated by most hosts.
    Argb4444,
    /// 32-bit ARGB, 8 bits per channel.
    Argb8888,
    /// 64-bit half-float RGBA. Only reusable on hosts with wide-gamut support.
    RgbaF16,
    /// Layout the host does not name (legacy or hidden configs). Treated as
    /// 4 bytes per pixel.
    Hidden,
}

impl PixelFormat {
    /// All known formats, in declaration order.
    pub const ALL: [PixelFormat; 6] = [
        PixelFormat::Alpha8,
        PixelFormat::Rgb565,
        PixelFormat::Argb4444,
        PixelFormat::Argb8888,
        PixelFormat::RgbaF16,
        PixelFormat::Hidden,
    ];

    /// Bytes occupied by a single pixel.
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Alpha8 => 1,
            PixelFormat::Rgb565 | PixelFormat::Argb4444 => 2,
            PixelFormat::Argb8888 | PixelFormat::Hidden => 4,
            PixelFormat::RgbaF16 => 8,
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PixelFormat::Alpha8 => "ALPHA_8",
            PixelFormat::Rgb565 => "RGB_565",
            PixelFormat::Argb4444 => "ARGB_4444",
            PixelFormat::Argb8888 => "ARGB_8888",
            PixelFormat::RgbaF16 => "RGBA_F16",
            PixelFormat::Hidden => "HIDDEN",
        };
        f.write_str(name)
    }
}

/// Bytes needed to hold `width * height` pixels of `format`.
///
/// Returns `None` when the product does not fit in `usize`.
///
/// ```
/// use pixelpool::buffer::{footprint, PixelFormat};
///
/// assert_eq!(footprint(10, 10, PixelFormat::Argb8888), Some(400));
/// assert_eq!(footprint(10, 10, PixelFormat::Rgb565), Some(200));
/// assert_eq!(footprint(0, 10, PixelFormat::Alpha8), Some(0));
/// ```
pub fn footprint(width: u32, height: u32, format: PixelFormat) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(format.bytes_per_pixel())
}

/// A fixed-capacity pixel buffer owned by the host graphics layer.
pub trait PixelBuffer {
    /// Current logical width in pixels.
    fn width(&self) -> u32;

    /// Current logical height in pixels.
    fn height(&self) -> u32;

    /// Current pixel layout.
    fn format(&self) -> PixelFormat;

    /// Size of the underlying allocation in bytes. Stable for the buffer's
    /// lifetime; this is the footprint the pool keys on.
    fn allocation_bytes(&self) -> usize;

    /// Bytes used by the current configuration.
    fn byte_count(&self) -> usize {
        footprint(self.width(), self.height(), self.format()).unwrap_or(usize::MAX)
    }

    /// Reinterprets the existing allocation as `width x height` pixels of
    /// `format` without reallocating.
    ///
    /// Callers guarantee `footprint(width, height, format) <= allocation_bytes()`.
    fn reconfigure(&mut self, width: u32, height: u32, format: PixelFormat);
}

/// Heap-backed [`PixelBuffer`].
#[derive(Clone, PartialEq, Eq)]
pub struct HeapBitmap {
    data: Vec<u8>,
    width: u32,
    height: u32,
    format: PixelFormat,
}

impl HeapBitmap {
    /// Allocates a zeroed bitmap sized exactly for `width x height` of `format`.
    ///
    /// # Panics
    ///
    /// Panics if the footprint overflows `usize`. Use [`HeapBitmap::try_new`]
    /// for dimensions from untrusted input.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        match Self::try_new(width, height, format) {
            Some(bitmap) => bitmap,
            None => panic!("bitmap footprint overflows usize: {width}x{height} {format:?}"),
        }
    }

    /// Allocates a zeroed bitmap, or `None` if the footprint overflows.
    pub fn try_new(width: u32, height: u32, format: PixelFormat) -> Option<Self> {
        let bytes = footprint(width, height, format)?;
        Some(Self {
            data: vec![0; bytes],
            width,
            height,
            format,
        })
    }

    /// Allocates `allocation` bytes and configures them as `width x height`
    /// of `format`, leaving any remainder spare.
    ///
    /// # Panics
    ///
    /// Panics if the configuration does not fit in `allocation`.
    pub fn with_allocation(allocation: usize, width: u32, height: u32, format: PixelFormat) -> Self {
        let mut bitmap = Self {
            data: vec![0; allocation],
            width: 0,
            height: 0,
            format,
        };
        bitmap.reconfigure(width, height, format);
        bitmap
    }

    /// Pixel bytes of the current configuration.
    pub fn pixels(&self) -> &[u8] {
        &self.data[..self.byte_count()]
    }

    /// Mutable pixel bytes of the current configuration.
    pub fn pixels_mut(&mut self) -> &mut [u8] {
        let used = self.byte_count();
        &mut self.data[..used]
    }
}

impl PixelBuffer for HeapBitmap {
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
        self.data.len()
    }

    /// # Panics
    ///
    /// Panics if the new configuration needs more bytes than are allocated.
    fn reconfigure(&mut self, width: u32, height: u32, format: PixelFormat) {
        let needed = footprint(width, height, format);
        match needed {
            Some(bytes) if bytes <= self.data.len() => {
                self.width = width;
                self.height = height;
                self.format = format;
            },
            _ => panic!(
                "cannot reconfigure {} byte bitmap as {width}x{height} {format:?}",
                self.data.len()
            ),
        }
    }
}

impl fmt::Debug for HeapBitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeapBitmap")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("allocation_bytes", &self.data.len())
            .finish()
    }
}
