//! # edgequake-pdfclean
//!
//! Clean up scanned or photographed PDFs by whitening every pixel darker
//! than a user-chosen brightness threshold.
//!
//! ## What it does
//!
//! A brightness cutoff `t` in `[0, 255]` is applied to every page: a pixel
//! whose unweighted mean `(R + G + B) / 3` is strictly below `t` becomes
//! white; everything else is left alone. The cleaned pages are re-embedded
//! as full-bleed images in a new PDF with the same page count, order and
//! physical page sizes. Text is not preserved as text.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     validate %PDF magic, own the bytes
//!  ├─ 2. Preview   page 1 at 0.8x, re-filtered on every threshold change
//!  ├─ 3. Render    every page at 2.0x via pdfium (spawn_blocking)
//!  ├─ 4. Filter    r + g + b < 3t  →  white, alpha untouched
//!  ├─ 5. Encode    lossless PNG
//!  └─ 6. Assemble  image-only PDF, delivered as cleaned-<name>
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdfclean::{clean, load_source, CleanConfig, Threshold};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let source = load_source("scan.pdf").await?;
//!     let config = CleanConfig::builder().threshold(Threshold::new(160)).build()?;
//!     let output = clean(&source, &config).await?;
//!     std::fs::write(&output.filename, &output.bytes)?;
//!     eprintln!("{} pages, {} px whitened",
//!         output.stats.total_pages,
//!         output.stats.whitened_pixels);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfclean` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-pdfclean = { version = "0.1", default-features = false }
//! ```
//!
//! ## pdfium
//!
//! Rendering and assembly need a pdfium shared library at runtime. Set
//! `PDFIUM_LIB_PATH` to the library (or its directory); otherwise the
//! working directory and then the system search path are tried.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod clean;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod raster;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use clean::{clean, clean_sync, clean_to_file, deliver, inspect, inspect_source, load_preview};
pub use config::{CleanConfig, CleanConfigBuilder};
pub use error::{Operation, PdfCleanError, PreviewError};
pub use output::{CleanOutput, CleanStats, DocumentInfo};
pub use pipeline::assemble::DocumentAssembler;
pub use pipeline::export::{ExportJob, ExportPipeline, ExportSummary};
pub use pipeline::input::{load_source, SourceDocument};
pub use pipeline::preview::{PreviewController, PreviewFrame};
pub use pipeline::render::RasterSource;
pub use progress::{CleanProgressCallback, NoopProgressCallback, ProgressCallback};
pub use raster::{PageSize, PixelBuffer, Threshold};
pub use stream::{clean_stream, ExportEvent, ExportEventStream};
