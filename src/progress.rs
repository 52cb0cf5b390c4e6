//! Progress-callback trait for export-job events.
//!
//! Inject an [`Arc<dyn CleanProgressCallback>`] via
//! [`crate::config::CleanConfigBuilder::progress_callback`] to receive
//! real-time events while the export pipeline walks the document.
//!
//! # Event order
//!
//! ```text
//! on_export_start(N)
//!   on_page_start(1, N)  on_page_complete(1, N, pct)
//!   …
//!   on_page_start(N, N)  on_page_complete(N, N, 100)
//! on_export_complete(N)            ← or on_export_failed(err), exactly once
//! ```
//!
//! `percent` is `round(completed / total * 100)`: it never decreases within
//! a job and equals 100 only after the last page. A failed job emits a
//! single `on_export_failed`, never per-page errors.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdfclean::{CleanProgressCallback, CleanConfig};
//! use std::sync::{Arc, Mutex};
//!
//! #[derive(Default)]
//! struct Recorder {
//!     seen: Mutex<Vec<u8>>,
//! }
//!
//! impl CleanProgressCallback for Recorder {
//!     fn on_page_complete(&self, _page_num: usize, _total_pages: usize, percent: u8) {
//!         self.seen.lock().unwrap().push(percent);
//!     }
//! }
//!
//! let config = CleanConfig::builder()
//!     .progress_callback(Arc::new(Recorder::default()) as Arc<dyn CleanProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the export pipeline as it processes each page.
///
/// Export work runs on a blocking thread, so implementations must be
/// `Send + Sync`. All methods default to no-ops.
pub trait CleanProgressCallback: Send + Sync {
    /// Called once before the first page is rasterised. Progress is 0 here.
    fn on_export_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called before page `page_num` (1-indexed) is rasterised.
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called after page `page_num` has been filtered, encoded and appended.
    fn on_page_complete(&self, page_num: usize, total_pages: usize, percent: u8) {
        let _ = (page_num, total_pages, percent);
    }

    /// Called once after the output document has been serialised.
    fn on_export_complete(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called once when the job aborts. No output is produced.
    fn on_export_failed(&self, error: &str) {
        let _ = error;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl CleanProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::CleanConfig`].
pub type ProgressCallback = Arc<dyn CleanProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl CleanProgressCallback for Recorder {
        fn on_export_start(&self, total_pages: usize) {
            self.events.lock().unwrap().push(format!("start {total_pages}"));
        }

        fn on_page_complete(&self, page_num: usize, _total_pages: usize, percent: u8) {
            self.events
                .lock()
                .unwrap()
                .push(format!("page {page_num} {percent}%"));
        }

        fn on_export_failed(&self, error: &str) {
            self.events.lock().unwrap().push(format!("failed {error}"));
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_export_start(5);
        cb.on_page_start(1, 5);
        cb.on_page_complete(1, 5, 20);
        cb.on_export_failed("boom");
        cb.on_export_complete(5);
    }

    #[test]
    fn overridden_methods_receive_events() {
        let rec = Recorder::default();
        rec.on_export_start(2);
        rec.on_page_start(1, 2);
        rec.on_page_complete(1, 2, 50);
        rec.on_export_failed("raster");
        rec.on_export_complete(2);

        let events = rec.events.lock().unwrap();
        assert_eq!(
            *events,
            vec!["start 2", "page 1 50%", "failed raster"]
        );
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_export_start(10);
        cb.on_page_complete(1, 10, 10);
    }
}
