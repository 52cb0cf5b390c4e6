//! Brightness-threshold cleanup: whiten every pixel darker than the cutoff.
//!
//! Brightness is the plain mean of R, G and B. No gamma, no luma weights:
//! the cutoff a user picks on the slider maps directly onto channel values.
//! The comparison is strict, so a pixel whose brightness equals the
//! threshold is kept. Alpha is never touched.
//!
//! The test is evaluated as `r + g + b < 3 * t` on integers, which is exactly
//! `(r + g + b) / 3 < t` over the reals without any rounding in between.
//!
//! The map is per-pixel and order-independent. Whitened pixels have
//! brightness 255 and can never be darkened again, so applying the same
//! threshold twice equals applying it once.

use crate::raster::{PixelBuffer, Threshold};
use tracing::trace;

/// Unweighted mean of the three colour channels.
pub fn brightness(r: u8, g: u8, b: u8) -> f32 {
    (r as f32 + g as f32 + b as f32) / 3.0
}

#[inline]
fn is_dark(px: &[u8], cutoff: u16) -> bool {
    (px[0] as u16 + px[1] as u16 + px[2] as u16) < cutoff
}

/// Rewrite `buffer` in place. Returns the number of pixels whitened.
pub fn apply(buffer: &mut PixelBuffer, threshold: Threshold) -> usize {
    let cutoff = 3 * threshold.value() as u16;
    let mut whitened = 0;
    if cutoff == 0 {
        return whitened;
    }

    for px in buffer.as_bytes_mut().chunks_exact_mut(4) {
        if is_dark(px, cutoff) {
            px[0] = 255;
            px[1] = 255;
            px[2] = 255;
            whitened += 1;
        }
    }

    trace!(threshold = threshold.value(), whitened, "threshold applied");
    whitened
}

/// Copying form of [`apply`]; `source` is left untouched.
pub fn filtered(source: &PixelBuffer, threshold: Threshold) -> PixelBuffer {
    let mut out = source.clone();
    apply(&mut out, threshold);
    out
}
