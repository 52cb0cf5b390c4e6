//! Raster data model shared by the preview and export paths.
//!
//! A [`PixelBuffer`] is what a page render produces and what the threshold
//! filter rewrites: tightly packed RGBA bytes, row-major, top-left origin.
//! The length invariant `width * height * 4` is checked once at construction
//! so the filter can walk the bytes in steps of four without bounds worries.

use crate::error::PdfCleanError;
use image::{DynamicImage, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Owned RGBA pixel buffer.
///
/// Each raster request produces a fresh buffer; buffers are never shared
/// between the preview and export paths.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap raw RGBA bytes, validating `data.len() == width * height * 4`.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, PdfCleanError> {
        let expected = expected_len(width, height)?;
        if data.len() != expected {
            return Err(PdfCleanError::InvalidPixelBuffer {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// A buffer filled with a single RGBA colour.
    pub fn from_pixel(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self, PdfCleanError> {
        let len = expected_len(width, height)?;
        let data = rgba.iter().copied().cycle().take(len).collect();
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Convert any decoded image to RGBA8.
    pub fn from_image(image: DynamicImage) -> Self {
        let rgba = image.into_rgba8();
        let (width, height) = rgba.dimensions();
        Self {
            width,
            height,
            data: rgba.into_raw(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of pixels (`width * height`).
    pub fn pixel_count(&self) -> usize {
        self.data.len() / 4
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Mutable access for in-place filters. The slice cannot be resized.
    pub(crate) fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// RGBA value at `(x, y)`, or `None` outside the buffer.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    /// Hand the bytes to the `image` crate without copying.
    pub fn into_rgba_image(self) -> Result<RgbaImage, PdfCleanError> {
        let (width, height, actual) = (self.width, self.height, self.data.len());
        RgbaImage::from_raw(width, height, self.data).ok_or(PdfCleanError::InvalidPixelBuffer {
            width,
            height,
            expected: width as usize * height as usize * 4,
            actual,
        })
    }
}

impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

fn expected_len(width: u32, height: u32) -> Result<usize, PdfCleanError> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| PdfCleanError::InvalidConfig(format!("raster {width}x{height} is too large")))
}

/// Brightness cutoff in `[0, 255]`. Pixels strictly darker are whitened.
///
/// Higher values classify more pixels as dark. `0` never whitens anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Threshold(u8);

impl Threshold {
    /// Slider starting position.
    pub const DEFAULT: Threshold = Threshold(128);

    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u8 {
        self.0
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<u8> for Threshold {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl TryFrom<u32> for Threshold {
    type Error = PdfCleanError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        u8::try_from(value).map(Self).map_err(|_| {
            PdfCleanError::InvalidConfig(format!("threshold must be 0–255, got {value}"))
        })
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Physical page size in PDF points (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width_points: f32,
    pub height_points: f32,
}

impl PageSize {
    pub fn new(width_points: f32, height_points: f32) -> Self {
        Self {
            width_points,
            height_points,
        }
    }

    /// Pixel dimensions of a render at `scale` (1.0 = 72 DPI).
    pub fn pixels_at(&self, scale: f32) -> (u32, u32) {
        (
            (self.width_points * scale).round().max(1.0) as u32,
            (self.height_points * scale).round().max(1.0) as u32,
        )
    }
}
