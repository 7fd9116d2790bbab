//! Shared helpers for integration tests.
//!
//! [`SyntheticVideo`] is an in-memory [`FrameSource`] so the pipeline can be
//! exercised without FFmpeg fixtures.

#![allow(dead_code)]

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use image::{DynamicImage, Rgb, RgbImage};
use thumbsheet::{
    CancellationToken, FrameSource, ProgressCallback, ProgressInfo, ThumbnailError, VideoMetadata,
};

pub const SAMPLE_VIDEO: &str = "tests/fixtures/sample_video.mp4";

pub fn metadata(seconds: u64, width: u32, height: u32) -> VideoMetadata {
    VideoMetadata {
        duration: Duration::from_secs(seconds),
        width,
        height,
        frames_per_second: 25.0,
        frame_count: seconds * 25,
        codec: "synthetic".to_string(),
        format: "memory".to_string(),
    }
}

pub fn solid(width: u32, height: u32, color: [u8; 3]) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)))
}

/// Whether two colors differ by at most `tolerance` per channel.
pub fn close(actual: [u8; 3], expected: [u8; 3], tolerance: u8) -> bool {
    actual
        .iter()
        .zip(expected)
        .all(|(a, e)| a.abs_diff(e) <= tolerance)
}

/// Deterministic shade for the `index`-th extracted frame.
pub fn shade(index: usize) -> [u8; 3] {
    let value = (40 + index * 30 % 200) as u8;
    [value, 255 - value, 128]
}

/// An in-memory video that returns solid frames and records every request.
pub struct SyntheticVideo {
    metadata: VideoMetadata,
    pub requested: Vec<Duration>,
    cancel_after: Option<(usize, CancellationToken)>,
    fail_at: Option<usize>,
}

impl SyntheticVideo {
    pub fn new(seconds: u64, width: u32, height: u32) -> Self {
        Self {
            metadata: metadata(seconds, width, height),
            requested: Vec::new(),
            cancel_after: None,
            fail_at: None,
        }
    }

    /// Cancel `token` once `frames` frames have been served.
    pub fn cancelling_after(mut self, frames: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((frames, token));
        self
    }

    /// Fail the `index`-th request with a decode error.
    pub fn failing_at(mut self, index: usize) -> Self {
        self.fail_at = Some(index);
        self
    }
}

impl FrameSource for SyntheticVideo {
    fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    fn frame_at(&mut self, timestamp: Duration) -> Result<DynamicImage, ThumbnailError> {
        if timestamp > self.metadata.duration {
            return Err(ThumbnailError::OutOfRange {
                timestamp,
                duration: self.metadata.duration,
            });
        }
        let index = self.requested.len();
        self.requested.push(timestamp);
        if self.fail_at == Some(index) {
            return Err(ThumbnailError::Decode(format!("synthetic failure at {timestamp:?}")));
        }
        if let Some((frames, token)) = &self.cancel_after {
            if self.requested.len() >= *frames {
                token.cancel();
            }
        }
        Ok(solid(self.metadata.width, self.metadata.height, shade(index)))
    }
}

/// Collects every progress report.
#[derive(Default)]
pub struct RecordingProgress {
    pub reports: Mutex<Vec<ProgressInfo>>,
}

impl RecordingProgress {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn snapshot(&self) -> Vec<ProgressInfo> {
        self.reports.lock().unwrap().clone()
    }
}

impl ProgressCallback for RecordingProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.reports.lock().unwrap().push(info.clone());
    }
}
