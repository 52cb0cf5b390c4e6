//! Output document assembly: one full-bleed image per page.
//!
//! Each cleaned page becomes a new page sized to the *source* page's point
//! dimensions, with the PNG stretched to cover it exactly. Raster pixel
//! dimensions never leak into the page geometry, so a 2× export and a 3×
//! export of the same file produce pages of identical physical size.

use crate::error::PdfCleanError;
use crate::raster::PageSize;
use pdfium_render::prelude::*;
use tracing::debug;

/// Accepts encoded page images in order and serialises a document.
pub trait DocumentAssembler {
    /// Append a page of `size` points covered by the PNG in `png`.
    fn add_image_page(&mut self, size: PageSize, png: &[u8]) -> Result<(), PdfCleanError>;

    /// Pages appended so far.
    fn page_count(&self) -> usize;

    /// Serialise the document. Consumes the assembler.
    fn finish(self) -> Result<Vec<u8>, PdfCleanError>;
}

/// [`DocumentAssembler`] writing a new pdfium document.
pub struct PdfiumAssembler<'a> {
    document: PdfDocument<'a>,
}

impl<'a> PdfiumAssembler<'a> {
    pub fn new(pdfium: &'a Pdfium) -> Result<Self, PdfCleanError> {
        let document = pdfium
            .create_new_pdf()
            .map_err(|e| PdfCleanError::AssemblyFailed(format!("create document: {:?}", e)))?;
        Ok(Self { document })
    }
}

impl DocumentAssembler for PdfiumAssembler<'_> {
    fn add_image_page(&mut self, size: PageSize, png: &[u8]) -> Result<(), PdfCleanError> {
        let page_num = self.page_count() + 1;
        let image = image::load_from_memory_with_format(png, image::ImageFormat::Png)
            .map_err(|e| PdfCleanError::EncodeFailed {
                page: page_num,
                detail: format!("embedded PNG unreadable: {e}"),
            })?;

        let width = PdfPoints::new(size.width_points);
        let height = PdfPoints::new(size.height_points);

        let mut page = self
            .document
            .pages_mut()
            .create_page_at_end(PdfPagePaperSize::Custom(width, height))
            .map_err(|e| PdfCleanError::AssemblyFailed(format!("add page {page_num}: {:?}", e)))?;

        page.objects_mut()
            .create_image_object(
                PdfPoints::new(0.0),
                PdfPoints::new(0.0),
                &image,
                Some(width),
                Some(height),
            )
            .map_err(|e| {
                PdfCleanError::AssemblyFailed(format!("draw image on page {page_num}: {:?}", e))
            })?;

        debug!(
            "Appended page {} ({:.1}x{:.1} pt)",
            page_num, size.width_points, size.height_points
        );
        Ok(())
    }

    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn finish(self) -> Result<Vec<u8>, PdfCleanError> {
        self.document
            .save_to_bytes()
            .map_err(|e| PdfCleanError::AssemblyFailed(format!("save: {:?}", e)))
    }
}
