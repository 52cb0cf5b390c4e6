//! Streaming export API: observe a job as a sequence of events.
//!
//! [`clean_stream`] starts the export in the background and returns
//! immediately. The stream yields `Started`, one `Progress` per page and
//! then exactly one terminal `Finished` or `Failed`, after which it ends.
//! Any progress callback already set on the config still receives its
//! events as well.

use crate::clean::clean;
use crate::config::CleanConfig;
use crate::error::PdfCleanError;
use crate::output::CleanOutput;
use crate::pipeline::input::SourceDocument;
use crate::progress::{CleanProgressCallback, ProgressCallback};
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::Stream;
use tracing::info;

/// One observation of a running export.
#[derive(Debug)]
pub enum ExportEvent {
    Started {
        total_pages: usize,
    },
    Progress {
        page_num: usize,
        total_pages: usize,
        percent: u8,
    },
    Finished(CleanOutput),
    Failed {
        /// Generic text safe to show to an end user.
        message: &'static str,
        /// Diagnostic cause.
        detail: String,
    },
}

impl ExportEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished(_) | Self::Failed { .. })
    }
}

/// A boxed stream of export events.
pub type ExportEventStream = Pin<Box<dyn Stream<Item = ExportEvent> + Send>>;

struct ChannelProgress {
    tx: mpsc::UnboundedSender<ExportEvent>,
    inner: Option<ProgressCallback>,
}

impl CleanProgressCallback for ChannelProgress {
    fn on_export_start(&self, total_pages: usize) {
        let _ = self.tx.send(ExportEvent::Started { total_pages });
        if let Some(cb) = &self.inner {
            cb.on_export_start(total_pages);
        }
    }

    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        if let Some(cb) = &self.inner {
            cb.on_page_start(page_num, total_pages);
        }
    }

    fn on_page_complete(&self, page_num: usize, total_pages: usize, percent: u8) {
        let _ = self.tx.send(ExportEvent::Progress {
            page_num,
            total_pages,
            percent,
        });
        if let Some(cb) = &self.inner {
            cb.on_page_complete(page_num, total_pages, percent);
        }
    }

    // Terminal events are sent by the driving task, which owns the output.
    fn on_export_complete(&self, total_pages: usize) {
        if let Some(cb) = &self.inner {
            cb.on_export_complete(total_pages);
        }
    }

    fn on_export_failed(&self, error: &str) {
        if let Some(cb) = &self.inner {
            cb.on_export_failed(error);
        }
    }
}

/// Clean `source` in the background, streaming progress.
///
/// Must be called from within a tokio runtime. Dropping the stream does not
/// cancel the job; export runs to completion or failure.
pub fn clean_stream(source: &SourceDocument, config: &CleanConfig) -> ExportEventStream {
    let (tx, rx) = mpsc::unbounded_channel();
    let source = source.clone();

    let mut config = config.clone();
    config.progress_callback = Some(Arc::new(ChannelProgress {
        tx: tx.clone(),
        inner: config.progress_callback.take(),
    }));

    info!("Starting streaming export of '{}'", source.name());
    tokio::spawn(async move {
        let terminal = match clean(&source, &config).await {
            Ok(output) => ExportEvent::Finished(output),
            Err(e) => failed(&e),
        };
        let _ = tx.send(terminal);
    });

    Box::pin(UnboundedReceiverStream::new(rx))
}

fn failed(e: &PdfCleanError) -> ExportEvent {
    ExportEvent::Failed {
        message: e.user_message(),
        detail: e.to_string(),
    }
}
