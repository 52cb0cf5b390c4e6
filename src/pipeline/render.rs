//! PDF rasterisation: render pages to [`PixelBuffer`]s via pdfium.
//!
//! ## Why a trait?
//!
//! The preview and export controllers only need three things from a
//! document: how many pages it has, how big each page is in points, and a
//! raster of a page at some scale. [`RasterSource`] is that seam. pdfium
//! backs it in production; tests drive the controllers with in-memory
//! sources and never touch a native library.
//!
//! ## Why blocking?
//!
//! pdfium wraps a C++ library with thread-local state. Everything here is
//! synchronous and is called from `tokio::task::spawn_blocking` by the
//! async entry points in [`crate::clean`].

use crate::error::PdfCleanError;
use crate::pipeline::input::SourceDocument;
use crate::raster::{PageSize, PixelBuffer};
use pdfium_render::prelude::*;
use std::path::PathBuf;
use tracing::{debug, info};

/// Anything that can rasterise pages of a document.
///
/// Page numbers are 1-indexed. Every `render` call returns a freshly owned
/// buffer; sources never hand out shared pixels.
pub trait RasterSource {
    fn page_count(&self) -> usize;

    /// Page dimensions in PDF points.
    fn page_size(&self, page_num: usize) -> Result<PageSize, PdfCleanError>;

    /// RGBA raster of `page_num` at `scale` (1.0 = 72 DPI).
    fn render(&self, page_num: usize, scale: f32) -> Result<PixelBuffer, PdfCleanError>;
}

/// Bind to a pdfium library.
///
/// Resolution order:
/// 1. `PDFIUM_LIB_PATH`: a library file, or a directory containing one
/// 2. the platform library name in the current directory
/// 3. the system library search path
pub fn bind_pdfium() -> Result<Pdfium, PdfCleanError> {
    let bindings = match std::env::var_os("PDFIUM_LIB_PATH") {
        Some(p) => {
            let p = PathBuf::from(p);
            let lib = if p.is_dir() {
                Pdfium::pdfium_platform_library_name_at_path(&p)
            } else {
                p
            };
            debug!("Binding pdfium from PDFIUM_LIB_PATH: {}", lib.display());
            Pdfium::bind_to_library(&lib)
        }
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| PdfCleanError::PdfiumBindingFailed(e.to_string()))?;

    Ok(Pdfium::new(bindings))
}

/// Parse the source bytes, mapping pdfium failures onto input errors.
pub fn open_document<'a>(
    pdfium: &'a Pdfium,
    source: &'a SourceDocument,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, PdfCleanError> {
    pdfium
        .load_pdf_from_byte_slice(source.bytes(), password)
        .map_err(|e| {
            let err_str = format!("{:?}", e);
            let name = source.name().to_string();
            if err_str.contains("Password") || err_str.contains("password") {
                if password.is_some() {
                    PdfCleanError::WrongPassword { name }
                } else {
                    PdfCleanError::PasswordRequired { name }
                }
            } else {
                PdfCleanError::CorruptPdf {
                    name,
                    detail: err_str,
                }
            }
        })
}

/// [`RasterSource`] over an open pdfium document.
pub struct PdfiumRaster<'a> {
    document: PdfDocument<'a>,
}

impl<'a> PdfiumRaster<'a> {
    pub fn new(document: PdfDocument<'a>) -> Self {
        let raster = Self { document };
        info!("PDF loaded: {} pages", raster.page_count());
        raster
    }

    pub fn document(&self) -> &PdfDocument<'a> {
        &self.document
    }

    fn page(&self, page_num: usize) -> Result<PdfPage<'a>, PdfCleanError> {
        if page_num == 0 || page_num > self.page_count() {
            return Err(PdfCleanError::RasterisationFailed {
                page: page_num,
                detail: format!("page out of range (document has {})", self.page_count()),
            });
        }
        self.document
            .pages()
            .get((page_num - 1) as u16)
            .map_err(|e| PdfCleanError::RasterisationFailed {
                page: page_num,
                detail: format!("{:?}", e),
            })
    }
}

impl RasterSource for PdfiumRaster<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn page_size(&self, page_num: usize) -> Result<PageSize, PdfCleanError> {
        let page = self.page(page_num)?;
        Ok(PageSize::new(page.width().value, page.height().value))
    }

    fn render(&self, page_num: usize, scale: f32) -> Result<PixelBuffer, PdfCleanError> {
        let page = self.page(page_num)?;
        let render_config = PdfRenderConfig::new().scale_page_by_factor(scale);

        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            PdfCleanError::RasterisationFailed {
                page: page_num,
                detail: format!("{:?}", e),
            }
        })?;

        let buffer = PixelBuffer::from_image(bitmap.as_image());
        debug!(
            "Rendered page {} at {:.2}x → {}x{} px",
            page_num,
            scale,
            buffer.width(),
            buffer.height()
        );
        Ok(buffer)
    }
}
