//! Image encoding: filtered `PixelBuffer` → PNG bytes, and back.
//!
//! PNG is lossless, so the hard white/keep boundary the threshold filter
//! draws survives into the output document unchanged. JPEG would smear
//! ringing artefacts back into the whitened regions.
//!
//! The preview capture is also kept PNG-encoded. [`to_data_url`] wraps a
//! frame for UI hosts that display it directly.

use crate::raster::PixelBuffer;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use tracing::debug;

/// Encode an RGBA buffer as PNG without copying the pixels.
pub fn encode_png(buffer: &PixelBuffer) -> Result<Vec<u8>, image::ImageError> {
    let mut out = Vec::new();
    PngEncoder::new(&mut out).write_image(
        buffer.as_bytes(),
        buffer.width(),
        buffer.height(),
        ExtendedColorType::Rgba8,
    )?;
    debug!(
        "Encoded {}x{} raster → {} bytes PNG",
        buffer.width(),
        buffer.height(),
        out.len()
    );
    Ok(out)
}

/// Decode any PNG into an RGBA buffer.
pub fn decode_png(bytes: &[u8]) -> Result<PixelBuffer, image::ImageError> {
    let image = image::load_from_memory_with_format(bytes, image::ImageFormat::Png)?;
    Ok(PixelBuffer::from_image(image))
}

/// `data:image/png;base64,…` URI for embedding a frame in HTML.
pub fn to_data_url(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png))
}
