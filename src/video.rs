//! FFmpeg-backed video access.
//!
//! [`VideoFile`] opens a container read-only, selects the best video stream,
//! caches its [`VideoMetadata`], and decodes single frames at arbitrary
//! timestamps. It is the default [`FrameSource`] used by the pipeline and
//! the CLI.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    time::Duration,
};

use ffmpeg_next::{
    Rational,
    codec::context::Context as CodecContext,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::{DynamicImage, RgbImage};

use crate::{
    conversion,
    error::ThumbnailError,
    metadata::VideoMetadata,
    source::{FrameSource, check_in_range},
};

/// An opened video file.
///
/// Created via [`VideoFile::open`]. Holds the demuxer context and the cached
/// metadata of the best video stream. Every [`frame_at`](FrameSource::frame_at)
/// call builds a fresh decoder, seeks to the nearest keyframe before the
/// target, and decodes forward.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
///
/// use thumbsheet::{FrameSource, ThumbnailError, VideoFile};
///
/// let mut video = VideoFile::open("input.mp4")?;
/// let frame = video.frame_at(Duration::from_secs(5))?;
/// frame.save("frame_5s.png")?;
/// # Ok::<(), ThumbnailError>(())
/// ```
pub struct VideoFile {
    input_context: Input,
    metadata: VideoMetadata,
    video_stream_index: usize,
    time_base: Rational,
    path: PathBuf,
}

impl Debug for VideoFile {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("VideoFile")
            .field("path", &self.path)
            .field("metadata", &self.metadata)
            .field("video_stream_index", &self.video_stream_index)
            .finish_non_exhaustive()
    }
}

impl VideoFile {
    /// Open a video file.
    ///
    /// Initializes FFmpeg (idempotent), opens the container, locates the best
    /// video stream and reads its metadata.
    ///
    /// # Errors
    ///
    /// Returns [`ThumbnailError::UnreadableMedia`] if the file cannot be
    /// opened, has no video stream, or reports a zero duration or size.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ThumbnailError> {
        let path = path.as_ref().to_path_buf();
        log::debug!("Opening video file: {}", path.display());

        ffmpeg_next::init().map_err(|error| {
            ThumbnailError::unreadable(&path, format!("FFmpeg initialisation failed: {error}"))
        })?;

        let input_context = ffmpeg_next::format::input(&path)
            .map_err(|error| ThumbnailError::unreadable(&path, error))?;

        let stream = input_context
            .streams()
            .best(Type::Video)
            .ok_or_else(|| ThumbnailError::unreadable(&path, "no video stream found"))?;
        let video_stream_index = stream.index();
        let time_base = stream.time_base();

        let decoder = CodecContext::from_parameters(stream.parameters())
            .and_then(|context| context.decoder().video())
            .map_err(|error| {
                ThumbnailError::unreadable(
                    &path,
                    format!("unsupported video codec in stream {video_stream_index}: {error}"),
                )
            })?;

        let (width, height) = (decoder.width(), decoder.height());
        if width == 0 || height == 0 {
            return Err(ThumbnailError::unreadable(
                &path,
                "video stream reports zero dimensions",
            ));
        }

        let frames_per_second = conversion::rational_to_rate(stream.avg_frame_rate())
            .or_else(|| conversion::rational_to_rate(stream.rate()))
            .ok_or_else(|| ThumbnailError::unreadable(&path, "unknown frame rate"))?;

        // Prefer the container duration, fall back to the stream's own.
        let mut duration = conversion::container_duration(input_context.duration());
        if duration.is_zero() && stream.duration() > 0 {
            duration = conversion::pts_to_duration(stream.duration(), time_base);
        }
        if duration.is_zero() {
            return Err(ThumbnailError::unreadable(&path, "unknown or zero duration"));
        }

        let codec = decoder
            .codec()
            .map(|codec| codec.name().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let metadata = VideoMetadata {
            duration,
            width,
            height,
            frames_per_second,
            frame_count: (duration.as_secs_f64() * frames_per_second) as u64,
            codec,
            format: input_context.format().name().to_string(),
        };
        log::debug!(
            "Opened {}: {} {} @ {:.3} fps, {:?}",
            path.display(),
            metadata.codec,
            metadata.resolution(),
            metadata.frames_per_second,
            metadata.duration
        );

        Ok(Self {
            input_context,
            metadata,
            video_stream_index,
            time_base,
            path,
        })
    }

    /// Path the file was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn decode_at(&mut self, timestamp: Duration) -> Result<DynamicImage, ThumbnailError> {
        let stream = self
            .input_context
            .stream(self.video_stream_index)
            .ok_or_else(|| ThumbnailError::Decode("video stream disappeared".to_string()))?;
        let decoder_context = CodecContext::from_parameters(stream.parameters())?;
        let mut decoder = decoder_context.decoder().video()?;

        let (width, height) = (self.metadata.width, self.metadata.height);
        let mut scaler = ScalingContext::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            Pixel::RGB24,
            width,
            height,
            ScalingFlags::BILINEAR,
        )?;

        // Accept the frame whose display interval covers the target.
        let half_frame = Duration::from_secs_f64(0.5 / self.metadata.frames_per_second);
        let threshold = timestamp.saturating_sub(half_frame);

        let seek_target = conversion::duration_to_seek_timestamp(timestamp);
        self.input_context.seek(seek_target, ..seek_target)?;

        let mut decoded_frame = VideoFrame::empty();
        let mut rgb_frame = VideoFrame::empty();
        let mut have_frame = false;

        for (stream, packet) in self.input_context.packets() {
            if stream.index() != self.video_stream_index {
                continue;
            }
            decoder.send_packet(&packet)?;

            while decoder.receive_frame(&mut decoded_frame).is_ok() {
                scaler.run(&decoded_frame, &mut rgb_frame)?;
                have_frame = true;
                if frame_time(&decoded_frame, self.time_base) >= threshold {
                    return frame_to_image(&rgb_frame, width, height);
                }
            }
        }

        decoder.send_eof()?;
        while decoder.receive_frame(&mut decoded_frame).is_ok() {
            scaler.run(&decoded_frame, &mut rgb_frame)?;
            have_frame = true;
            if frame_time(&decoded_frame, self.time_base) >= threshold {
                return frame_to_image(&rgb_frame, width, height);
            }
        }

        // Container durations often run slightly past the last video frame.
        if have_frame {
            log::debug!(
                "No frame at or after {timestamp:?}; using the last decoded frame of {}",
                self.path.display()
            );
            return frame_to_image(&rgb_frame, width, height);
        }

        Err(ThumbnailError::Decode(format!(
            "no decodable frame at {timestamp:?} in {}",
            self.path.display()
        )))
    }
}

impl FrameSource for VideoFile {
    fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    fn frame_at(&mut self, timestamp: Duration) -> Result<DynamicImage, ThumbnailError> {
        check_in_range(timestamp, &self.metadata)?;
        log::debug!("Extracting frame at {timestamp:?}");
        self.decode_at(timestamp)
    }
}

fn frame_time(frame: &VideoFrame, time_base: Rational) -> Duration {
    let pts = frame.timestamp().or_else(|| frame.pts()).unwrap_or(0);
    conversion::pts_to_duration(pts, time_base)
}

fn frame_to_image(
    rgb_frame: &VideoFrame,
    width: u32,
    height: u32,
) -> Result<DynamicImage, ThumbnailError> {
    let buffer = conversion::frame_to_buffer(rgb_frame, width, height, 3);
    let rgb_image = RgbImage::from_raw(width, height, buffer).ok_or_else(|| {
        ThumbnailError::Decode("decoded frame buffer has unexpected size".to_string())
    })?;
    Ok(DynamicImage::ImageRgb8(rgb_image))
}
