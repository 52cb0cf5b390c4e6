//! Export pipeline: rasterise → filter → encode → append, page by page.
//!
//! Pages are processed strictly in source order and appended in that same
//! order. The whole document shares one threshold. Any page failure aborts
//! the job: the assembler is dropped unsaved and the caller receives the
//! error, never a partial document.
//!
//! Every page is re-rasterised at the export scale. The low-resolution
//! preview capture is a different raster for a different purpose and is
//! never reused here.

use crate::error::PdfCleanError;
use crate::pipeline::assemble::DocumentAssembler;
use crate::pipeline::encode;
use crate::pipeline::render::RasterSource;
use crate::pipeline::threshold;
use crate::progress::{CleanProgressCallback, NoopProgressCallback};
use crate::raster::Threshold;
use std::time::Instant;
use tracing::{debug, info, warn};

/// `round(completed / total * 100)`, rounding halves up.
///
/// Capped at 99 until the last page is done: past 200 pages plain rounding
/// would report 100 while work remains.
pub fn percent_complete(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let completed = completed.min(total);
    let rounded = (200 * completed as u64 + total as u64) / (2 * total as u64);
    if completed < total {
        rounded.min(99) as u8
    } else {
        100
    }
}

/// Progress counter for one export run.
///
/// Starts at zero, only moves forward, and reaches 100 % exactly when the
/// last page completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportJob {
    total: usize,
    completed: usize,
}

impl ExportJob {
    pub fn start(total: usize) -> Self {
        Self {
            total,
            completed: 0,
        }
    }

    /// Mark one more page done and return the new percentage.
    pub fn complete_page(&mut self) -> u8 {
        if self.completed < self.total {
            self.completed += 1;
        }
        self.percent()
    }

    pub fn percent(&self) -> u8 {
        percent_complete(self.completed, self.total)
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn is_finished(&self) -> bool {
        self.total > 0 && self.completed == self.total
    }
}

/// Timing and volume of a finished export.
#[derive(Debug, Clone, Default)]
pub struct ExportSummary {
    pub pages: usize,
    pub whitened_pixels: u64,
    pub render_duration_ms: u64,
    pub encode_duration_ms: u64,
}

/// Drives the threshold filter over every page of a [`RasterSource`].
pub struct ExportPipeline<'c> {
    threshold: Threshold,
    scale: f32,
    label: String,
    progress: &'c dyn CleanProgressCallback,
}

impl<'c> ExportPipeline<'c> {
    pub fn new(threshold: Threshold, scale: f32) -> Self {
        Self {
            threshold,
            scale,
            label: "document".to_string(),
            progress: &NoopProgressCallback,
        }
    }

    /// Name used in errors and logs.
    pub fn named(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_progress(mut self, progress: &'c dyn CleanProgressCallback) -> Self {
        self.progress = progress;
        self
    }

    /// Run the job to completion. Emits exactly one terminal event.
    pub fn run<S, A>(&self, source: &S, assembler: A) -> Result<(Vec<u8>, ExportSummary), PdfCleanError>
    where
        S: RasterSource + ?Sized,
        A: DocumentAssembler,
    {
        match self.run_pages(source, assembler) {
            Ok((bytes, summary)) => {
                self.progress.on_export_complete(summary.pages);
                Ok((bytes, summary))
            }
            Err(e) => {
                warn!("Export of '{}' aborted: {}", self.label, e);
                self.progress.on_export_failed(&e.to_string());
                Err(e)
            }
        }
    }

    fn run_pages<S, A>(
        &self,
        source: &S,
        mut assembler: A,
    ) -> Result<(Vec<u8>, ExportSummary), PdfCleanError>
    where
        S: RasterSource + ?Sized,
        A: DocumentAssembler,
    {
        let total = source.page_count();
        if total == 0 {
            return Err(PdfCleanError::EmptyDocument {
                name: self.label.clone(),
            });
        }

        info!(
            "Cleaning '{}': {} pages, threshold {}, scale {:.2}x",
            self.label, total, self.threshold, self.scale
        );

        let mut job = ExportJob::start(total);
        let mut summary = ExportSummary::default();
        self.progress.on_export_start(total);

        for page_num in 1..=total {
            self.progress.on_page_start(page_num, total);

            // ── 1. Rasterise at the export scale ──────────────────────────
            let size = source.page_size(page_num)?;
            let render_start = Instant::now();
            let mut raster = source.render(page_num, self.scale)?;
            summary.render_duration_ms += render_start.elapsed().as_millis() as u64;

            // ── 2. Filter in place ────────────────────────────────────────
            let whitened = threshold::apply(&mut raster, self.threshold);
            summary.whitened_pixels += whitened as u64;

            // ── 3. Encode losslessly ──────────────────────────────────────
            let encode_start = Instant::now();
            let png = encode::encode_png(&raster).map_err(|e| PdfCleanError::EncodeFailed {
                page: page_num,
                detail: e.to_string(),
            })?;
            summary.encode_duration_ms += encode_start.elapsed().as_millis() as u64;
            drop(raster);

            // ── 4. Append a page at the source's point size ───────────────
            assembler.add_image_page(size, &png)?;

            let percent = job.complete_page();
            debug!(
                "Page {}/{} cleaned: {} px whitened, {}%",
                page_num, total, whitened, percent
            );
            self.progress.on_page_complete(page_num, total, percent);
        }

        summary.pages = assembler.page_count();
        let bytes = assembler.finish()?;
        info!("Assembled '{}': {} bytes", self.label, bytes.len());
        Ok((bytes, summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_rounds_like_math_round() {
        assert_eq!(percent_complete(1, 3), 33);
        assert_eq!(percent_complete(2, 3), 67);
        assert_eq!(percent_complete(1, 8), 13); // 12.5 rounds up
        assert_eq!(percent_complete(3, 3), 100);
        assert_eq!(percent_complete(0, 0), 0);
        assert_eq!(percent_complete(249, 250), 99);
        assert_eq!(percent_complete(250, 250), 100);
    }

    #[test]
    fn five_page_job_emits_twenty_percent_steps() {
        let mut job = ExportJob::start(5);
        assert_eq!(job.percent(), 0);
        let steps: Vec<u8> = (0..5).map(|_| job.complete_page()).collect();
        assert_eq!(steps, vec![20, 40, 60, 80, 100]);
        assert!(job.is_finished());
    }

    #[test]
    fn hundred_only_on_last_page() {
        for total in 1..=250usize {
            let mut job = ExportJob::start(total);
            let mut last = 0;
            for page in 1..=total {
                let p = job.complete_page();
                assert!(p >= last, "progress went backwards at {page}/{total}");
                if page < total {
                    assert!(p < 100, "hit 100 early at {page}/{total}");
                }
                last = p;
            }
            assert_eq!(last, 100);
        }
    }

    #[test]
    fn complete_page_saturates() {
        let mut job = ExportJob::start(1);
        assert_eq!(job.complete_page(), 100);
        assert_eq!(job.complete_page(), 100);
        assert_eq!(job.completed(), 1);
    }
}
