//! Error types for the edgequake-pdfclean library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`PdfCleanError`]: **Terminal for the operation**: the upload is
//!   rejected, or the export job aborts. No partial document is ever
//!   returned alongside one of these.
//!
//! * [`PreviewError`]: **Non-fatal**: a single preview render failed. The
//!   preview controller logs it and keeps showing the previous frame.
//!
//! Every `PdfCleanError` carries a diagnostic `Display` form for logs and a
//! short [`PdfCleanError::user_message`] for the person who clicked the
//! button. Nothing is retried; the user re-uploads or re-runs the export.

use std::path::PathBuf;
use thiserror::Error;

/// All terminal errors returned by the edgequake-pdfclean library.
#[derive(Debug, Error)]
pub enum PdfCleanError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The upload is not a PDF. Rejected before any processing.
    #[error("'{name}' is not a PDF document (first bytes: {magic:?})")]
    InvalidInputType { name: String, magic: Vec<u8> },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{name}' is corrupt: {detail}")]
    CorruptPdf { name: String, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{name}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { name: String },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{name}'")]
    WrongPassword { name: String },

    /// The document opened but has no pages to clean.
    #[error("PDF '{name}' has no pages")]
    EmptyDocument { name: String },

    // ── Export errors ─────────────────────────────────────────────────────
    /// pdfium could not rasterise a page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// A filtered page could not be encoded as PNG.
    #[error("Image encoding failed for page {page}: {detail}")]
    EncodeFailed { page: usize, detail: String },

    /// The output document could not be built or serialised.
    #[error("Output document assembly failed: {0}")]
    AssemblyFailed(String),

    /// A raster did not satisfy `len == width * height * 4`.
    #[error("Invalid pixel buffer: {width}x{height} needs {expected} bytes, got {actual}")]
    InvalidPixelBuffer {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output PDF file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium (or the directory containing it),\n\
place the library next to the binary, or install it system-wide.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PdfCleanError {
    /// `true` for failures that abort an export job part-way through.
    pub fn is_export_failure(&self) -> bool {
        matches!(
            self,
            PdfCleanError::RasterisationFailed { .. }
                | PdfCleanError::EncodeFailed { .. }
                | PdfCleanError::AssemblyFailed(_)
                | PdfCleanError::InvalidPixelBuffer { .. }
                | PdfCleanError::EmptyDocument { .. }
        )
    }

    /// Short notification text for end users after an export.
    /// The full cause goes to the log.
    pub fn user_message(&self) -> &'static str {
        self.user_message_for(Operation::Export)
    }

    /// Short notification text for the operation that failed.
    ///
    /// Input and password problems read the same everywhere. An unreadable
    /// document reports as a preview failure at load time and as the
    /// generic export failure once the user has asked for the cleaned PDF.
    pub fn user_message_for(&self, operation: Operation) -> &'static str {
        match self {
            PdfCleanError::InvalidInputType { .. } => "Please upload a PDF file.",
            PdfCleanError::FileNotFound { .. } | PdfCleanError::PermissionDenied { .. } => {
                "Could not read the selected file."
            }
            PdfCleanError::PasswordRequired { .. } | PdfCleanError::WrongPassword { .. } => {
                "The PDF is password protected."
            }
            PdfCleanError::InvalidConfig(_) => "Invalid cleanup settings.",
            _ => operation.failure_message(),
        }
    }
}

/// The user-visible operation an error is reported against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Loading the document and rendering the page-1 preview.
    Preview,
    /// Cleaning every page and delivering the result.
    Export,
}

impl Operation {
    /// Generic notification when nothing more specific applies.
    pub fn failure_message(self) -> &'static str {
        match self {
            Operation::Preview => "Could not create a preview for the PDF.",
            Operation::Export => "Could not clean the PDF.",
        }
    }
}

/// A non-fatal error for a single preview render.
///
/// The preview controller logs it and leaves the previous frame in place.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PreviewError {
    /// The cached page capture could not be decoded.
    #[error("Preview capture could not be decoded: {detail}")]
    DecodeFailed { detail: String },

    /// A rendered frame could not be encoded for display.
    #[error("Preview render failed: {detail}")]
    RenderFailed { detail: String },
}
