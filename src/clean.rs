//! Async entry points: preview, export, delivery, inspection.
//!
//! Each function moves a cheap [`SourceDocument`] handle onto a blocking
//! thread, binds pdfium there and does all native work on that thread.
//! Nothing pdfium-owned ever crosses an `.await`.

use crate::config::CleanConfig;
use crate::error::PdfCleanError;
use crate::output::{CleanOutput, CleanStats, DocumentInfo};
use crate::pipeline::assemble::PdfiumAssembler;
use crate::pipeline::encode;
use crate::pipeline::export::ExportPipeline;
use crate::pipeline::input::{self, SourceDocument};
use crate::pipeline::preview::{self, PreviewController};
use crate::pipeline::render::{self, PdfiumRaster, RasterSource};
use crate::progress::{CleanProgressCallback, NoopProgressCallback};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// Capture page 1 at the preview scale and return a controller showing it
/// filtered at `config.threshold`.
///
/// # Errors
/// Load-time failures (`CorruptPdf`, `PasswordRequired`, `EmptyDocument`,
/// binding or raster errors) are fatal; later preview renders are not.
pub async fn load_preview(
    source: &SourceDocument,
    config: &CleanConfig,
) -> Result<PreviewController, PdfCleanError> {
    config.validate()?;
    let doc = source.clone();
    let password = config.password.clone();
    let scale = config.preview_scale;
    let threshold = config.threshold;

    let (capture, initial) = blocking(move || {
        let pdfium = render::bind_pdfium()?;
        let raster = PdfiumRaster::new(render::open_document(&pdfium, &doc, password.as_deref())?);
        if raster.page_count() == 0 {
            return Err(PdfCleanError::EmptyDocument {
                name: doc.name().to_string(),
            });
        }
        let first = raster.render(1, scale)?;
        let capture = encode::encode_png(&first).map_err(|e| PdfCleanError::EncodeFailed {
            page: 1,
            detail: e.to_string(),
        })?;
        let initial = preview::render_frame(&capture, threshold);
        Ok((capture, initial))
    })
    .await?;

    info!(
        "Preview capture of '{}' ready ({} bytes PNG at {:.2}x)",
        source.name(),
        capture.len(),
        scale
    );

    let mut controller = PreviewController::new(capture, config.debounce());
    if let Err(e) = controller.accept(threshold, initial) {
        warn!("Initial preview of '{}' failed: {}", source.name(), e);
    }
    Ok(controller)
}

/// Clean every page and return the serialised document.
///
/// The progress callback in `config` (if any) sees one `on_export_start`,
/// one `on_page_*` pair per page and exactly one terminal event.
pub async fn clean(
    source: &SourceDocument,
    config: &CleanConfig,
) -> Result<CleanOutput, PdfCleanError> {
    if let Err(e) = config.validate() {
        if let Some(cb) = &config.progress_callback {
            cb.on_export_failed(&e.to_string());
        }
        return Err(e);
    }
    let total_start = Instant::now();
    let doc = source.clone();
    let password = config.password.clone();
    let threshold = config.threshold;
    let scale = config.export_scale;
    let callback = config.progress_callback.clone();

    let (bytes, summary) = blocking(move || {
        let noop = NoopProgressCallback;
        let progress: &dyn CleanProgressCallback = match callback.as_deref() {
            Some(cb) => cb,
            None => &noop,
        };

        let prepared = render::bind_pdfium().and_then(|pdfium| {
            let document = render::open_document(&pdfium, &doc, password.as_deref())?;
            let raster = PdfiumRaster::new(document);
            let pipeline = ExportPipeline::new(threshold, scale)
                .named(doc.name())
                .with_progress(progress);
            let assembler = PdfiumAssembler::new(&pdfium)?;
            Ok(pipeline.run(&raster, assembler))
        });

        match prepared {
            Ok(result) => result,
            // The pipeline never started, so it reported nothing.
            Err(e) => {
                progress.on_export_failed(&e.to_string());
                Err(e)
            }
        }
    })
    .await?;

    let stats = CleanStats {
        total_pages: summary.pages,
        threshold,
        export_scale: scale,
        output_bytes: bytes.len(),
        whitened_pixels: summary.whitened_pixels,
        render_duration_ms: summary.render_duration_ms,
        encode_duration_ms: summary.encode_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Cleaned '{}': {} pages, {} bytes, {}ms",
        source.name(),
        stats.total_pages,
        stats.output_bytes,
        stats.total_duration_ms
    );

    Ok(CleanOutput {
        bytes,
        filename: source.output_filename(&config.output_prefix),
        stats,
    })
}

/// Load `input`, clean it and write the result.
///
/// `output` may be a file path, an existing directory (the derived
/// `cleaned-<name>` is used inside it) or `None` (derived name in the
/// current directory). Nothing is written if any page fails.
pub async fn clean_to_file(
    input_path: impl AsRef<Path>,
    output: Option<&Path>,
    config: &CleanConfig,
) -> Result<(PathBuf, CleanStats), PdfCleanError> {
    let source = input::load_source(input_path).await?;
    let out = clean(&source, config).await?;

    let target = input::resolve_output_path(output, &out.filename);
    let dir = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let filename = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or(out.filename);

    let written = deliver(out.bytes, &dir, &filename).await?;
    Ok((written, out.stats))
}

/// Synchronous wrapper around [`clean_to_file`].
///
/// Creates a temporary tokio runtime internally.
pub fn clean_sync(
    input_path: impl AsRef<Path>,
    output: Option<&Path>,
    config: &CleanConfig,
) -> Result<(PathBuf, CleanStats), PdfCleanError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| PdfCleanError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(clean_to_file(input_path, output, config))
}

/// Write `bytes` to `dir/filename` atomically.
///
/// The bytes go to a temp file in `dir` first and are renamed into place,
/// so a reader never sees a half-written PDF.
pub async fn deliver(
    bytes: Vec<u8>,
    dir: &Path,
    filename: &str,
) -> Result<PathBuf, PdfCleanError> {
    let target = dir.join(filename);
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| PdfCleanError::OutputWriteFailed {
            path: target.clone(),
            source: e,
        })?;

    let dir = dir.to_path_buf();
    let path = target.clone();
    blocking(move || {
        let write_err = |source: std::io::Error| PdfCleanError::OutputWriteFailed {
            path: path.clone(),
            source,
        };
        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(write_err)?;
        tmp.write_all(&bytes).map_err(write_err)?;
        tmp.persist(&path).map_err(|e| write_err(e.error))?;
        Ok(())
    })
    .await?;

    info!("Wrote {}", target.display());
    Ok(target)
}

/// Page count, first-page size and version of a PDF on disk.
///
/// No filtering happens and nothing is written.
pub async fn inspect(
    input_path: impl AsRef<Path>,
    password: Option<&str>,
) -> Result<DocumentInfo, PdfCleanError> {
    let source = input::load_source(input_path).await?;
    inspect_source(&source, password).await
}

/// [`inspect`] for an already loaded document.
pub async fn inspect_source(
    source: &SourceDocument,
    password: Option<&str>,
) -> Result<DocumentInfo, PdfCleanError> {
    let doc = source.clone();
    let password = password.map(str::to_string);

    blocking(move || {
        let pdfium = render::bind_pdfium()?;
        let document = render::open_document(&pdfium, &doc, password.as_deref())?;
        let pdf_version = format!("{:?}", document.version());
        let raster = PdfiumRaster::new(document);
        let page_count = raster.page_count();
        let first_page = if page_count > 0 {
            Some(raster.page_size(1)?)
        } else {
            None
        };
        Ok(DocumentInfo {
            name: doc.name().to_string(),
            page_count,
            first_page,
            pdf_version,
            file_size: doc.bytes().len(),
        })
    })
    .await
}

/// Run pdfium work on the blocking pool.
async fn blocking<T, F>(f: F) -> Result<T, PdfCleanError>
where
    F: FnOnce() -> Result<T, PdfCleanError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| PdfCleanError::Internal(format!("Blocking task panicked: {}", e)))?
}
