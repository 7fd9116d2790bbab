//! Decoding backend abstraction.
//!
//! The pipeline only needs two capabilities from a decoder: the metadata of
//! the opened video and a decoded frame at a timestamp. [`FrameSource`]
//! captures exactly that, so the sampling, compositing and watermark logic
//! never touches FFmpeg directly. [`VideoFile`](crate::VideoFile) is the
//! FFmpeg-backed implementation; tests and alternative backends provide
//! their own.

use std::time::Duration;

use image::DynamicImage;

use crate::{error::ThumbnailError, metadata::VideoMetadata};

/// A video that can report metadata and decode frames at timestamps.
///
/// Implementations must return [`ThumbnailError::OutOfRange`] for a
/// timestamp beyond [`VideoMetadata::duration`].
pub trait FrameSource {
    /// Metadata of the opened video.
    fn metadata(&self) -> &VideoMetadata;

    /// Decode the frame displayed at `timestamp`.
    fn frame_at(&mut self, timestamp: Duration) -> Result<DynamicImage, ThumbnailError>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn metadata(&self) -> &VideoMetadata {
        (**self).metadata()
    }

    fn frame_at(&mut self, timestamp: Duration) -> Result<DynamicImage, ThumbnailError> {
        (**self).frame_at(timestamp)
    }
}

/// Reject a timestamp that lies beyond the end of the video.
pub(crate) fn check_in_range(
    timestamp: Duration,
    metadata: &VideoMetadata,
) -> Result<(), ThumbnailError> {
    if timestamp > metadata.duration {
        return Err(ThumbnailError::OutOfRange {
            timestamp,
            duration: metadata.duration,
        });
    }
    Ok(())
}
