//! Timestamp sampling.
//!
//! [`sample`] turns a video duration and a [`SamplingPolicy`] into the
//! ordered list of timestamps the pipeline will extract. All arithmetic is
//! done in integer nanoseconds so evenly-spaced timestamps are exact and
//! strictly inside the video: decoders are unreliable at the very first and
//! very last frame.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use thumbsheet::{SamplingPolicy, sample};
//!
//! let timestamps = sample(Duration::from_secs(100), &SamplingPolicy::EvenlySpaced { count: 5 })?;
//! let seconds: Vec<u64> = timestamps.iter().map(Duration::as_secs).collect();
//! assert_eq!(seconds, [10, 30, 50, 70, 90]);
//! # Ok::<(), thumbsheet::ThumbnailError>(())
//! ```

use std::{collections::BTreeSet, time::Duration};

use crate::error::ThumbnailError;

/// Rule deciding which timestamps are extracted from a video.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SamplingPolicy {
    /// One frame at the midpoint of the video.
    #[default]
    Single,
    /// One frame at an explicit timestamp.
    At(Duration),
    /// `count` frames at the centers of `count` equal slices of the video.
    EvenlySpaced {
        /// Number of timestamps.
        count: u32,
    },
    /// `count` distinct uniformly random timestamps, sorted ascending.
    ///
    /// A fixed `seed` makes the sequence reproducible.
    Random {
        /// Number of timestamps.
        count: u32,
        /// Seed for the generator. `None` seeds from system entropy.
        seed: Option<u64>,
    },
}

impl SamplingPolicy {
    /// Number of timestamps this policy produces.
    pub fn frame_count(&self) -> u32 {
        match self {
            SamplingPolicy::Single | SamplingPolicy::At(_) => 1,
            SamplingPolicy::EvenlySpaced { count } | SamplingPolicy::Random { count, .. } => *count,
        }
    }

    /// Whether the policy yields a single still rather than a grid.
    pub fn is_single(&self) -> bool {
        matches!(self, SamplingPolicy::Single | SamplingPolicy::At(_))
    }
}

/// Produce the ordered timestamps `policy` selects from a video of
/// `duration`.
///
/// # Errors
///
/// - [`ThumbnailError::InvalidSampling`] for a zero duration, a zero count,
///   or a duration too short to hold `count` distinct interior timestamps.
/// - [`ThumbnailError::OutOfRange`] for [`SamplingPolicy::At`] beyond the
///   end of the video.
pub fn sample(duration: Duration, policy: &SamplingPolicy) -> Result<Vec<Duration>, ThumbnailError> {
    if duration.is_zero() {
        return Err(ThumbnailError::InvalidSampling(
            "duration must be greater than zero".to_string(),
        ));
    }

    match *policy {
        SamplingPolicy::Single => Ok(vec![duration / 2]),
        SamplingPolicy::At(timestamp) => {
            if timestamp > duration {
                return Err(ThumbnailError::OutOfRange {
                    timestamp,
                    duration,
                });
            }
            Ok(vec![timestamp])
        }
        SamplingPolicy::EvenlySpaced { count } => evenly_spaced(duration, count),
        SamplingPolicy::Random { count, seed } => {
            let mut rng = match seed {
                Some(seed) => fastrand::Rng::with_seed(seed),
                None => fastrand::Rng::new(),
            };
            random(duration, count, &mut rng)
        }
    }
}

fn evenly_spaced(duration: Duration, count: u32) -> Result<Vec<Duration>, ThumbnailError> {
    check_count(count)?;
    let total = duration.as_nanos();
    let slices = 2 * count as u128;
    // floor(total * (2i + 1) / 2n) is positive and strictly increasing
    // only when every half-slice spans at least one nanosecond.
    if total < slices {
        return Err(ThumbnailError::InvalidSampling(format!(
            "{duration:?} is too short for {count} evenly spaced timestamps"
        )));
    }

    Ok((0..count as u128)
        .map(|index| nanos_to_duration(total * (2 * index + 1) / slices))
        .collect())
}

fn random(
    duration: Duration,
    count: u32,
    rng: &mut fastrand::Rng,
) -> Result<Vec<Duration>, ThumbnailError> {
    check_count(count)?;
    let total = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
    // Draws come from 1..total, which holds total - 1 distinct values.
    if total <= count as u64 {
        return Err(ThumbnailError::InvalidSampling(format!(
            "{duration:?} is too short for {count} distinct random timestamps"
        )));
    }

    let mut drawn = BTreeSet::new();
    while drawn.len() < count as usize {
        drawn.insert(rng.u64(1..total));
    }
    Ok(drawn.into_iter().map(Duration::from_nanos).collect())
}

fn check_count(count: u32) -> Result<(), ThumbnailError> {
    if count == 0 {
        return Err(ThumbnailError::InvalidSampling(
            "frame count must be at least 1".to_string(),
        ));
    }
    Ok(())
}

fn nanos_to_duration(nanos: u128) -> Duration {
    const NANOS_PER_SECOND: u128 = 1_000_000_000;
    Duration::new(
        (nanos / NANOS_PER_SECOND) as u64,
        (nanos % NANOS_PER_SECOND) as u32,
    )
}
