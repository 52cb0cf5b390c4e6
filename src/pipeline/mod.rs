//! Pipeline stages for PDF threshold cleanup.
//!
//! Each submodule implements exactly one step. The two controllers
//! ([`preview`] and [`export`]) compose the same stages at different scales
//! and never share a raster.
//!
//! ## Data Flow
//!
//! ```text
//!                 ┌─▶ preview: page 1 @0.8x ─▶ PNG capture ─▶ decode ─▶ threshold ─▶ frame
//! input ─▶ render ┤
//!  (%PDF)  (pdfium)└─▶ export:  page N @2.0x ─▶ threshold ─▶ encode ─▶ assemble ─▶ bytes
//! ```
//!
//! 1. [`input`]    : validate the upload and own its bytes
//! 2. [`render`]   : rasterise pages; blocking, called from `spawn_blocking`
//! 3. [`threshold`]: whiten every pixel darker than the cutoff
//! 4. [`encode`]   : lossless PNG in and out
//! 5. [`assemble`] : one full-bleed image per output page
//! 6. [`preview`]  : debounced re-filtering of the page-1 capture
//! 7. [`export`]   : the page-by-page job with progress reporting

pub mod assemble;
pub mod encode;
pub mod export;
pub mod input;
pub mod preview;
pub mod render;
pub mod threshold;
