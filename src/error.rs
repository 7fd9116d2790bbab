//! Error types for the `thumbsheet` crate.
//!
//! This module defines [`ThumbnailError`], the unified error type returned by
//! every fallible operation in the crate. Variants carry the context a user
//! needs to fix the cause: the offending path, the out-of-range timestamp, or
//! the grid dimensions that did not add up.

use std::{io::Error as IoError, path::PathBuf, time::Duration};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use thiserror::Error;

/// The unified error type for all `thumbsheet` operations.
///
/// Every public method that can fail returns `Result<T, ThumbnailError>`.
/// Nothing is retried internally; callers re-run the request after fixing
/// the cause.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ThumbnailError {
    /// The input file is missing, corrupt, unsupported, or has no usable
    /// video stream.
    #[error("Failed to read media file at {path}: {reason}")]
    UnreadableMedia {
        /// Path that was passed to [`crate::VideoFile::open`].
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The sampling request cannot be satisfied (zero count, zero duration,
    /// or a duration too short for the requested number of timestamps).
    #[error("Invalid sampling request: {0}")]
    InvalidSampling(String),

    /// A timestamp lies beyond the end of the video.
    #[error("Timestamp {timestamp:?} is out of range (video lasts {duration:?})")]
    OutOfRange {
        /// The requested timestamp.
        timestamp: Duration,
        /// The duration of the video.
        duration: Duration,
    },

    /// The number of frames does not match the grid layout.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// What the layout required.
        expected: String,
        /// What was actually supplied.
        actual: String,
    },

    /// A watermark asset (logo image) could not be loaded.
    #[error("Missing watermark asset at {path}: {reason}")]
    MissingAsset {
        /// Path of the asset.
        path: PathBuf,
        /// Underlying reason the load failed.
        reason: String,
    },

    /// The output image could not be written.
    #[error("Failed to write {path}: {reason}")]
    Write {
        /// Destination path.
        path: PathBuf,
        /// Underlying reason the write failed.
        reason: String,
    },

    /// The preferences file is not a JSON object.
    #[error("Failed to parse preferences: {0}")]
    PreferencesParse(String),

    /// The operation was cancelled via a [`CancellationToken`](crate::CancellationToken).
    #[error("Operation cancelled")]
    Cancelled,

    /// A generation request is already running on this worker.
    #[error("A thumbnail request is already in progress")]
    Busy,

    /// A video frame could not be decoded.
    #[error("Failed to decode video frame: {0}")]
    Decode(String),

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    Ffmpeg(String),

    /// An error from the `image` crate.
    #[error("Image processing error: {0}")]
    Image(#[from] ImageError),

    /// An I/O error outside of export (e.g. reading preferences).
    #[error("I/O error: {0}")]
    Io(#[from] IoError),
}

impl From<FfmpegError> for ThumbnailError {
    fn from(error: FfmpegError) -> Self {
        ThumbnailError::Ffmpeg(error.to_string())
    }
}

impl ThumbnailError {
    pub(crate) fn write(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        ThumbnailError::Write {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn unreadable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        ThumbnailError::UnreadableMedia {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
