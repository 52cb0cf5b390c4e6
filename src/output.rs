//! Result types returned by the cleaning entry points.

use crate::raster::{PageSize, Threshold};
use serde::{Deserialize, Serialize};

/// The delivered document.
#[derive(Clone)]
pub struct CleanOutput {
    /// Serialised PDF.
    pub bytes: Vec<u8>,
    /// Suggested file name: the configured prefix plus the source name.
    pub filename: String,
    pub stats: CleanStats,
}

impl std::fmt::Debug for CleanOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CleanOutput")
            .field("bytes", &self.bytes.len())
            .field("filename", &self.filename)
            .field("stats", &self.stats)
            .finish()
    }
}

/// Numbers describing one export run. Printed by `pdfclean --json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleanStats {
    pub total_pages: usize,
    pub threshold: Threshold,
    pub export_scale: f32,
    pub output_bytes: usize,
    /// Pixels turned white across the whole document.
    pub whitened_pixels: u64,
    pub render_duration_ms: u64,
    pub encode_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// What [`crate::inspect`] reports about a document without cleaning it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub name: String,
    pub page_count: usize,
    /// Size of page 1; `None` for a document with no pages.
    pub first_page: Option<PageSize>,
    /// e.g. `"Pdf1_7"`.
    pub pdf_version: String,
    pub file_size: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_serialise_threshold_as_number() {
        let stats = CleanStats {
            total_pages: 3,
            threshold: Threshold::new(180),
            export_scale: 2.0,
            ..Default::default()
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["threshold"], 180);
        assert_eq!(json["total_pages"], 3);
    }

    #[test]
    fn output_debug_hides_bytes() {
        let out = CleanOutput {
            bytes: vec![0; 4096],
            filename: "cleaned-a.pdf".into(),
            stats: CleanStats::default(),
        };
        let dbg = format!("{out:?}");
        assert!(dbg.contains("4096"));
        assert!(dbg.contains("cleaned-a.pdf"));
    }
}
