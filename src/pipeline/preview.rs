//! Live preview: re-filter a cached page-1 capture on every threshold change.
//!
//! ## Pristine source, every time
//!
//! The controller keeps exactly one *unfiltered* capture of page 1, taken
//! at load time and stored PNG-encoded. Each render decodes a fresh copy of
//! it and filters that copy. Filtering an already-filtered frame would not
//! be reversible: once a pixel is whitened at 200 it stays white at 50.
//! Going 50 → 200 → 50 therefore reproduces the first frame bit for bit.
//!
//! ## Debounce
//!
//! Slider motion produces bursts of changes. [`PreviewController::on_threshold_change`]
//! aborts the pending render task and schedules a new one after the
//! debounce delay. The decode and filter run on tokio's blocking pool.
//! `abort()` cannot interrupt a render that is already running there, so a
//! generation counter is checked again before publishing and a frame whose
//! request was superseded is dropped. Only the latest threshold is ever shown.
//!
//! `is_busy` counts renders in flight rather than toggling one flag, so an
//! overlapping render finishing cannot clear it under a newer one.
//!
//! ## Failure
//!
//! If the capture cannot be decoded the render is dropped with a warning.
//! The previous frame stays published and the busy count is released.

use crate::error::{PdfCleanError, PreviewError};
use crate::pipeline::{encode, threshold};
use crate::raster::{PixelBuffer, Threshold};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// One rendered preview image and the threshold that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewFrame {
    pub threshold: Threshold,
    pub image: PixelBuffer,
}

impl PreviewFrame {
    pub fn to_png(&self) -> Result<Vec<u8>, PreviewError> {
        encode::encode_png(&self.image).map_err(|e| PreviewError::RenderFailed {
            detail: e.to_string(),
        })
    }

    /// `data:image/png;base64,…` form for HTML hosts.
    pub fn to_data_url(&self) -> Result<String, PreviewError> {
        Ok(encode::to_data_url(&self.to_png()?))
    }
}

/// Decode `capture` and filter it. Pure: the capture bytes are not touched.
pub fn render_frame(capture: &[u8], threshold: Threshold) -> Result<PreviewFrame, PreviewError> {
    let mut image = encode::decode_png(capture).map_err(|e| PreviewError::DecodeFailed {
        detail: e.to_string(),
    })?;
    threshold::apply(&mut image, threshold);
    Ok(PreviewFrame { threshold, image })
}

type FrameSlot = Option<Arc<PreviewFrame>>;

struct Shared {
    capture: Arc<[u8]>,
    generation: AtomicU64,
    in_flight: AtomicUsize,
    renders: AtomicUsize,
    frames: watch::Sender<FrameSlot>,
}

/// Counts one running render for as long as it lives.
struct Busy<'a>(&'a AtomicUsize);

impl Drop for Busy<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Shared {
    fn begin(&self) -> Busy<'_> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        Busy(&self.in_flight)
    }

    /// Publish the outcome of the render requested as `generation`.
    ///
    /// A frame whose request has since been superseded is dropped; on
    /// failure the current frame is left in place.
    fn finish(
        &self,
        generation: u64,
        threshold: Threshold,
        result: Result<PreviewFrame, PreviewError>,
    ) -> Result<Arc<PreviewFrame>, PreviewError> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        let frame = match result {
            Ok(frame) => Arc::new(frame),
            Err(e) => {
                warn!("Preview render at threshold {} failed: {}", threshold, e);
                return Err(e);
            }
        };

        if self.generation.load(Ordering::SeqCst) == generation {
            debug!("Preview rendered at threshold {}", threshold);
            self.frames.send_replace(Some(Arc::clone(&frame)));
        } else {
            debug!("Dropping stale preview at threshold {}", threshold);
        }
        Ok(frame)
    }
}

/// Debounced, cancel-safe preview state for one loaded document.
///
/// [`on_threshold_change`](Self::on_threshold_change) spawns onto the
/// current tokio runtime and must be called from within one.
pub struct PreviewController {
    shared: Arc<Shared>,
    debounce: Duration,
    pending: Option<JoinHandle<()>>,
}

impl PreviewController {
    /// Wrap an already PNG-encoded, unfiltered capture.
    pub fn new(capture_png: Vec<u8>, debounce: Duration) -> Self {
        let (frames, _) = watch::channel(None);
        Self {
            shared: Arc::new(Shared {
                capture: capture_png.into(),
                generation: AtomicU64::new(0),
                in_flight: AtomicUsize::new(0),
                renders: AtomicUsize::new(0),
                frames,
            }),
            debounce,
            pending: None,
        }
    }

    /// Capture an unfiltered raster (encodes it to PNG).
    pub fn from_raster(raster: &PixelBuffer, debounce: Duration) -> Result<Self, PdfCleanError> {
        let png = encode::encode_png(raster).map_err(|e| PdfCleanError::EncodeFailed {
            page: 1,
            detail: e.to_string(),
        })?;
        Ok(Self::new(png, debounce))
    }

    /// Schedule a render of `threshold` after the debounce delay, cancelling
    /// whatever was pending.
    ///
    /// The decode and filter run on the blocking pool so the runtime's
    /// timers and the caller's polling of [`is_busy`](Self::is_busy) keep
    /// going while a large capture is processed.
    pub fn on_threshold_change(&mut self, threshold: Threshold) {
        let generation = self.supersede();
        let shared = Arc::clone(&self.shared);
        let delay = self.debounce;

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if shared.generation.load(Ordering::SeqCst) != generation {
                return;
            }

            let _busy = shared.begin();
            let capture = Arc::clone(&shared.capture);
            let result =
                match tokio::task::spawn_blocking(move || render_frame(&capture, threshold)).await {
                    Ok(result) => result,
                    Err(e) => Err(PreviewError::RenderFailed {
                        detail: format!("Preview task panicked: {}", e),
                    }),
                };
            let _ = shared.finish(generation, threshold, result);
        }));
    }

    /// Render immediately on the calling thread, bypassing the debounce.
    /// Cancels any pending render.
    pub fn render_now(&mut self, threshold: Threshold) -> Result<Arc<PreviewFrame>, PreviewError> {
        let generation = self.supersede();
        let _busy = self.shared.begin();
        let result = render_frame(&self.shared.capture, threshold);
        self.shared.finish(generation, threshold, result)
    }

    /// Publish a frame rendered elsewhere (e.g. on the blocking thread that
    /// took the capture). Cancels any pending render.
    pub fn accept(
        &mut self,
        threshold: Threshold,
        result: Result<PreviewFrame, PreviewError>,
    ) -> Result<Arc<PreviewFrame>, PreviewError> {
        let generation = self.supersede();
        self.shared.finish(generation, threshold, result)
    }

    /// Wait for the pending render (if any) to finish or be cancelled.
    pub async fn settled(&mut self) {
        if let Some(pending) = self.pending.take() {
            let _ = pending.await;
        }
    }

    /// `true` while at least one render is running.
    pub fn is_busy(&self) -> bool {
        self.shared.in_flight.load(Ordering::SeqCst) > 0
    }

    /// Most recently published frame.
    pub fn current_frame(&self) -> Option<Arc<PreviewFrame>> {
        self.shared.frames.borrow().clone()
    }

    /// Receive every published frame.
    pub fn subscribe(&self) -> watch::Receiver<FrameSlot> {
        self.shared.frames.subscribe()
    }

    /// Renders attempted so far (including failed ones).
    pub fn render_count(&self) -> usize {
        self.shared.renders.load(Ordering::SeqCst)
    }

    /// The unfiltered capture as PNG bytes.
    pub fn capture_png(&self) -> &[u8] {
        &self.shared.capture
    }

    fn cancel_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }

    /// Cancel the pending render and claim a fresh generation.
    fn supersede(&mut self) -> u64 {
        self.cancel_pending();
        self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl Drop for PreviewController {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 16×1 gradient from black to near-white, fully opaque.
    fn gradient() -> PixelBuffer {
        let data = (0..16u8)
            .flat_map(|i| {
                let v = i * 16;
                [v, v, v, 255]
            })
            .collect();
        PixelBuffer::new(16, 1, data).unwrap()
    }

    fn controller() -> PreviewController {
        PreviewController::from_raster(&gradient(), Duration::from_millis(100)).unwrap()
    }

    #[test]
    fn render_now_filters_fresh_copy() {
        let mut ctl = controller();
        let frame = ctl.render_now(Threshold::new(64)).unwrap();
        // 0, 16, 32, 48 are below 64; 64 itself is kept.
        assert_eq!(frame.image.pixel(3, 0), Some([255, 255, 255, 255]));
        assert_eq!(frame.image.pixel(4, 0), Some([64, 64, 64, 255]));
        assert_eq!(ctl.current_frame().unwrap().threshold.value(), 64);
    }

    #[test]
    fn moving_back_reproduces_earlier_frame() {
        let mut ctl = controller();
        let p1 = ctl.render_now(Threshold::new(50)).unwrap();
        let p2 = ctl.render_now(Threshold::new(200)).unwrap();
        let p3 = ctl.render_now(Threshold::new(50)).unwrap();
        assert_ne!(p1.image, p2.image);
        assert_eq!(p1.image, p3.image);
    }

    #[test]
    fn decode_failure_keeps_previous_frame() {
        let mut ctl = PreviewController::new(b"not a png".to_vec(), Duration::from_millis(100));
        let previous = Arc::new(PreviewFrame {
            threshold: Threshold::new(10),
            image: gradient(),
        });
        ctl.shared.frames.send_replace(Some(Arc::clone(&previous)));

        let err = ctl.render_now(Threshold::new(90)).unwrap_err();
        assert!(matches!(err, PreviewError::DecodeFailed { .. }));
        assert_eq!(ctl.current_frame(), Some(previous));
        assert!(!ctl.is_busy());
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_changes_renders_only_latest() {
        let mut ctl = controller();
        ctl.on_threshold_change(Threshold::new(20));
        tokio::time::advance(Duration::from_millis(40)).await;
        ctl.on_threshold_change(Threshold::new(120));
        tokio::time::advance(Duration::from_millis(99)).await;
        ctl.on_threshold_change(Threshold::new(200));
        ctl.settled().await;

        assert_eq!(ctl.render_count(), 1);
        assert_eq!(ctl.current_frame().unwrap().threshold.value(), 200);
        assert!(!ctl.is_busy());
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_renders_before_debounce_elapses() {
        let mut ctl = controller();
        let mut rx = ctl.subscribe();
        ctl.on_threshold_change(Threshold::new(80));
        tokio::time::advance(Duration::from_millis(50)).await;
        tokio::task::yield_now().await;
        assert_eq!(ctl.render_count(), 0);
        assert!(ctl.current_frame().is_none());

        ctl.settled().await;
        assert!(rx.has_changed().unwrap());
        let frame = rx.borrow_and_update().clone().unwrap();
        assert_eq!(frame.threshold.value(), 80);
    }

    #[tokio::test(start_paused = true)]
    async fn debounced_path_is_reversible() {
        let mut ctl = controller();

        ctl.on_threshold_change(Threshold::new(50));
        ctl.settled().await;
        let p1 = ctl.current_frame().unwrap();

        ctl.on_threshold_change(Threshold::new(200));
        ctl.settled().await;

        ctl.on_threshold_change(Threshold::new(50));
        ctl.settled().await;
        let p3 = ctl.current_frame().unwrap();

        assert_eq!(p1.image, p3.image);
        assert_eq!(ctl.render_count(), 3);
    }

    #[test]
    fn superseded_render_is_not_published() {
        let mut ctl = controller();
        ctl.render_now(Threshold::new(10)).unwrap();

        let stale = ctl.shared.generation.load(Ordering::SeqCst);
        ctl.shared.generation.fetch_add(1, Ordering::SeqCst);
        let late = render_frame(ctl.capture_png(), Threshold::new(200));
        let frame = ctl.shared.finish(stale, Threshold::new(200), late).unwrap();

        assert_eq!(frame.threshold.value(), 200);
        assert_eq!(ctl.current_frame().unwrap().threshold.value(), 10);
        assert_eq!(ctl.render_count(), 2);
    }

    #[test]
    fn overlapping_renders_keep_busy_until_last_ends() {
        let ctl = controller();
        let first = ctl.shared.begin();
        let second = ctl.shared.begin();
        drop(first);
        assert!(ctl.is_busy());
        drop(second);
        assert!(!ctl.is_busy());
    }

    #[test]
    fn accept_publishes_frame_rendered_elsewhere() {
        let mut ctl = controller();
        let frame = render_frame(ctl.capture_png(), Threshold::new(64));
        ctl.accept(Threshold::new(64), frame).unwrap();
        assert_eq!(ctl.current_frame().unwrap().threshold.value(), 64);
        assert!(!ctl.is_busy());
    }

    // Single-threaded runtime: if the render ran on the worker, the loop
    // below could never observe it in progress.
    #[tokio::test]
    async fn busy_is_visible_while_large_capture_renders() {
        let big = PixelBuffer::from_pixel(2000, 2000, [40, 40, 40, 255]).unwrap();
        let mut ctl = PreviewController::from_raster(&big, Duration::from_millis(5)).unwrap();
        ctl.on_threshold_change(Threshold::new(128));

        let mut seen_busy = false;
        for _ in 0..5000 {
            tokio::time::sleep(Duration::from_millis(1)).await;
            if ctl.is_busy() {
                seen_busy = true;
                break;
            }
            if ctl.current_frame().is_some() {
                break;
            }
        }
        ctl.settled().await;

        assert!(seen_busy, "render never observed in progress");
        assert!(!ctl.is_busy());
        let frame = ctl.current_frame().unwrap();
        assert_eq!(frame.threshold.value(), 128);
        assert_eq!(frame.image.pixel(1999, 1999), Some([255, 255, 255, 255]));
    }

    #[test]
    fn frame_data_url() {
        let mut ctl = controller();
        let frame = ctl.render_now(Threshold::new(0)).unwrap();
        assert!(frame
            .to_data_url()
            .unwrap()
            .starts_with("data:image/png;base64,"));
        assert_eq!(frame.image, gradient());
    }
}
