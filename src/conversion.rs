//! Internal conversion helpers.
//!
//! Pixel-data copying and timestamp conversion between [`Duration`] and the
//! FFmpeg time bases used for seeking and PTS interpretation.

use std::time::Duration;

use ffmpeg_next::{Rational, frame::Video as VideoFrame};

/// Copy pixel data from an FFmpeg video frame into a tightly-packed buffer.
///
/// FFmpeg pads each row to its own alignment, so the plane stride can be
/// wider than `width * bytes_per_pixel`.
pub(crate) fn frame_to_buffer(
    video_frame: &VideoFrame,
    width: u32,
    height: u32,
    bytes_per_pixel: usize,
) -> Vec<u8> {
    let stride = video_frame.stride(0);
    let row_length = (width as usize) * bytes_per_pixel;
    let data = video_frame.data(0);

    if stride == row_length {
        return data[..row_length * (height as usize)].to_vec();
    }

    data.chunks(stride)
        .take(height as usize)
        .flat_map(|row| &row[..row_length])
        .copied()
        .collect()
}

/// Rescale a PTS value from stream time base to a [`Duration`].
///
/// Negative timestamps (pre-roll) clamp to zero.
pub(crate) fn pts_to_duration(pts: i64, time_base: Rational) -> Duration {
    let seconds =
        pts as f64 * time_base.numerator() as f64 / time_base.denominator().max(1) as f64;
    Duration::from_secs_f64(seconds.max(0.0))
}

/// Convert a [`Duration`] to a seek timestamp in AV_TIME_BASE (microseconds).
///
/// `input.seek()` with no stream index expects container-level timestamps,
/// independent of any stream time base.
pub(crate) fn duration_to_seek_timestamp(duration: Duration) -> i64 {
    i64::try_from(duration.as_micros()).unwrap_or(i64::MAX)
}

/// Convert the container duration reported by FFmpeg (microseconds, possibly
/// negative when unknown) to a [`Duration`].
pub(crate) fn container_duration(microseconds: i64) -> Duration {
    if microseconds > 0 {
        Duration::from_micros(microseconds as u64)
    } else {
        Duration::ZERO
    }
}

/// Frame rate as a float, or `None` for an unset rational.
pub(crate) fn rational_to_rate(rate: Rational) -> Option<f64> {
    if rate.denominator() == 0 || rate.numerator() <= 0 {
        None
    } else {
        Some(rate.numerator() as f64 / rate.denominator() as f64)
    }
}
