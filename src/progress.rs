//! Progress reporting and cancellation support.
//!
//! This module provides [`ProgressCallback`] for monitoring a thumbnail
//! request, [`CancellationToken`] for cooperative cancellation, and
//! [`ProgressInfo`] for progress snapshots.
//!
//! Percentages follow the pipeline's fixed schedule: frame extraction covers
//! 0–60 %, compositing reports 70 %, watermarking 80–90 %, and export 100 %.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use thumbsheet::{
//!     GenerateOptions, ProgressCallback, ProgressInfo, ThumbnailError, ThumbnailSpec,
//!     VideoFile, WatermarkSpec, pipeline,
//! };
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         println!("[{:?}] {:.0}%", info.stage, info.percentage);
//!     }
//! }
//!
//! let mut video = VideoFile::open("input.mp4")?;
//! let options = GenerateOptions::new().with_progress(Arc::new(PrintProgress));
//! let sheet = pipeline::render(&mut video, &ThumbnailSpec::grid(3, 4), &WatermarkSpec::None, &options)?;
//! # Ok::<(), ThumbnailError>(())
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::{Duration, Instant};

/// The pipeline stage currently running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Stage {
    /// Decoding sampled frames.
    Extraction,
    /// Tiling frames into the grid (or fitting the single frame).
    Compositing,
    /// Blending the watermark.
    Watermarking,
    /// Encoding and writing the output file.
    Exporting,
}

/// A snapshot of request progress.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Which stage is running.
    pub stage: Stage,
    /// Frames extracted so far.
    pub current: u64,
    /// Total frames the request extracts.
    pub total: u64,
    /// Overall completion percentage (0.0 – 100.0).
    pub percentage: f32,
    /// Wall-clock time elapsed since the request started.
    pub elapsed: Duration,
    /// Timestamp of the frame just extracted, during extraction.
    pub current_timestamp: Option<Duration>,
}

/// Trait for receiving progress updates.
///
/// Implementations must be [`Send`] and [`Sync`] because a request may run
/// on a [`Worker`](crate::Worker) thread.
///
/// Progress callbacks are **infallible**: they observe but cannot halt the
/// request. Use [`CancellationToken`] for cooperative cancellation.
pub trait ProgressCallback: Send + Sync {
    /// Called after every extracted frame and at each stage boundary.
    fn on_progress(&self, info: &ProgressInfo);
}

/// A no-op implementation that discards all progress notifications.
///
/// This is the default when no callback is configured.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Cooperative cancellation token backed by an [`AtomicBool`].
///
/// Clone this token and share it between threads; call
/// [`cancel`](CancellationToken::cancel) from any thread to stop the
/// associated request. The pipeline checks the token before every frame and
/// before export, so a cancelled request never writes a file.
///
/// # Example
///
/// ```
/// use thumbsheet::CancellationToken;
///
/// let token = CancellationToken::new();
/// assert!(!token.is_cancelled());
///
/// token.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new, non-cancelled token.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation.
    ///
    /// All clones of this token will observe the cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Share of the overall percentage taken by frame extraction.
const EXTRACTION_SHARE: f32 = 60.0;

/// Internal helper that tracks timing and emits callbacks.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    total: u64,
    current: u64,
    batch_size: u64,
    start_time: Instant,
    items_since_last_report: u64,
}

impl ProgressTracker {
    pub(crate) fn new(callback: Arc<dyn ProgressCallback>, total: u64, batch_size: u64) -> Self {
        Self {
            callback,
            total,
            current: 0,
            batch_size: batch_size.max(1),
            start_time: Instant::now(),
            items_since_last_report: 0,
        }
    }

    /// Record one extracted frame and fire the callback when the batch
    /// threshold or the last frame is reached.
    pub(crate) fn frame_extracted(&mut self, timestamp: Duration) {
        self.current += 1;
        self.items_since_last_report += 1;

        if self.items_since_last_report >= self.batch_size || self.current == self.total {
            let fraction = if self.total > 0 {
                self.current as f32 / self.total as f32
            } else {
                1.0
            };
            self.report(Stage::Extraction, fraction * EXTRACTION_SHARE, Some(timestamp));
            self.items_since_last_report = 0;
        }
    }

    /// Report reaching a fixed point of the schedule.
    pub(crate) fn stage(&self, stage: Stage, percentage: f32) {
        self.report(stage, percentage, None);
    }

    fn report(&self, stage: Stage, percentage: f32, timestamp: Option<Duration>) {
        let info = ProgressInfo {
            stage,
            current: self.current,
            total: self.total,
            percentage: percentage.clamp(0.0, 100.0),
            elapsed: self.start_time.elapsed(),
            current_timestamp: timestamp,
        };
        self.callback.on_progress(&info);
    }
}
