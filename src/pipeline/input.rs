//! Input resolution: turn an upload into a validated, owned [`SourceDocument`].
//!
//! ## Why check magic bytes up front?
//!
//! A non-PDF upload must be rejected before anything else happens: no
//! preview capture, no pdfium call, no state change. Checking for `%PDF`
//! gives the caller a clear `InvalidInputType` instead of a pdfium parse
//! error several layers down.

use crate::error::PdfCleanError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// The original document bytes plus the file name used to derive the output
/// name. Read-only once constructed; cloning shares the bytes, so preview
/// and export jobs can each move a handle onto a blocking thread.
#[derive(Clone)]
pub struct SourceDocument {
    name: String,
    bytes: Arc<[u8]>,
}

impl SourceDocument {
    /// Validate in-memory bytes (drag-and-drop, HTTP upload body, …).
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, PdfCleanError> {
        let name = name.into();
        if !bytes.starts_with(PDF_MAGIC) {
            let magic = bytes.iter().take(PDF_MAGIC.len()).copied().collect();
            return Err(PdfCleanError::InvalidInputType { name, magic });
        }
        Ok(Self {
            name,
            bytes: bytes.into(),
        })
    }

    /// File name as uploaded, e.g. `scan.pdf`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Name the cleaned document is delivered under: `prefix` + original name.
    pub fn output_filename(&self, prefix: &str) -> String {
        format!("{prefix}{}", self.name)
    }
}

impl std::fmt::Debug for SourceDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceDocument")
            .field("name", &self.name)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// Read and validate a local PDF file.
pub async fn load_source(path: impl AsRef<Path>) -> Result<SourceDocument, PdfCleanError> {
    let path = path.as_ref().to_path_buf();

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(PdfCleanError::PermissionDenied { path });
        }
        Err(_) => return Err(PdfCleanError::FileNotFound { path }),
    };

    let doc = SourceDocument::from_bytes(file_name(&path), bytes)?;
    debug!("Loaded PDF '{}' ({} bytes)", doc.name(), doc.bytes().len());
    Ok(doc)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document.pdf".to_string())
}

/// Resolve where the cleaned file should land.
///
/// An existing directory (or no path at all) means "use the derived file
/// name"; anything else is taken as the full output path.
pub fn resolve_output_path(output: Option<&Path>, derived_name: &str) -> PathBuf {
    match output {
        Some(p) if p.is_dir() => p.join(derived_name),
        Some(p) => p.to_path_buf(),
        None => PathBuf::from(derived_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn rejects_non_pdf_bytes() {
        let err = SourceDocument::from_bytes("photo.png", b"\x89PNG....".to_vec()).unwrap_err();
        match err {
            PdfCleanError::InvalidInputType { name, magic } => {
                assert_eq!(name, "photo.png");
                assert_eq!(magic, b"\x89PNG".to_vec());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rejects_empty_upload() {
        let err = SourceDocument::from_bytes("empty.pdf", Vec::new()).unwrap_err();
        assert!(matches!(err, PdfCleanError::InvalidInputType { .. }));
    }

    #[test]
    fn output_filename_is_prefixed() {
        let doc = SourceDocument::from_bytes("report.pdf", b"%PDF-1.7\n".to_vec()).unwrap();
        assert_eq!(doc.output_filename("cleaned-"), "cleaned-report.pdf");
    }

    #[tokio::test]
    async fn load_source_reads_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invoice.pdf");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"%PDF-1.4\n%%EOF\n")
            .unwrap();

        let doc = load_source(&path).await.unwrap();
        assert_eq!(doc.name(), "invoice.pdf");
        assert!(doc.bytes().starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn load_source_missing_file() {
        let err = load_source("/definitely/not/here.pdf").await.unwrap_err();
        assert!(matches!(err, PdfCleanError::FileNotFound { .. }));
    }

    #[test]
    fn resolve_output_into_directory() {
        let dir = tempfile::tempdir().unwrap();
        let p = resolve_output_path(Some(dir.path()), "cleaned-a.pdf");
        assert_eq!(p, dir.path().join("cleaned-a.pdf"));
        assert_eq!(
            resolve_output_path(None, "cleaned-a.pdf"),
            PathBuf::from("cleaned-a.pdf")
        );
        assert_eq!(
            resolve_output_path(Some(Path::new("/tmp/out.pdf")), "cleaned-a.pdf"),
            PathBuf::from("/tmp/out.pdf")
        );
    }
}
