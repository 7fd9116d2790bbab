//! Timestamp sampling tests.

use std::time::Duration;

use thumbsheet::{SamplingPolicy, ThumbnailError, sample};

fn strictly_inside(timestamps: &[Duration], duration: Duration) -> bool {
    timestamps.windows(2).all(|pair| pair[0] < pair[1])
        && timestamps
            .iter()
            .all(|timestamp| !timestamp.is_zero() && *timestamp < duration)
}

// ── Single / At ────────────────────────────────────────────────────

#[test]
fn single_uses_midpoint() {
    let timestamps = sample(Duration::from_secs(10), &SamplingPolicy::Single).unwrap();
    assert_eq!(timestamps, [Duration::from_secs(5)]);
}

#[test]
fn at_returns_requested_timestamp() {
    let at = Duration::from_millis(2_500);
    let timestamps = sample(Duration::from_secs(10), &SamplingPolicy::At(at)).unwrap();
    assert_eq!(timestamps, [at]);
}

#[test]
fn at_beyond_duration_is_out_of_range() {
    let result = sample(
        Duration::from_secs(10),
        &SamplingPolicy::At(Duration::from_secs(11)),
    );
    assert!(matches!(result, Err(ThumbnailError::OutOfRange { .. })));
}

// ── Evenly spaced ──────────────────────────────────────────────────

#[test]
fn evenly_spaced_centers_each_slice() {
    let timestamps = sample(
        Duration::from_secs(100),
        &SamplingPolicy::EvenlySpaced { count: 5 },
    )
    .unwrap();
    let seconds: Vec<u64> = timestamps.iter().map(Duration::as_secs).collect();
    assert_eq!(seconds, [10, 30, 50, 70, 90]);
}

#[test]
fn evenly_spaced_single_count_is_midpoint() {
    let timestamps = sample(
        Duration::from_secs(8),
        &SamplingPolicy::EvenlySpaced { count: 1 },
    )
    .unwrap();
    assert_eq!(timestamps, [Duration::from_secs(4)]);
}

#[test]
fn evenly_spaced_is_strictly_increasing_inside_video() {
    let duration = Duration::from_millis(7_003);
    let timestamps = sample(duration, &SamplingPolicy::EvenlySpaced { count: 13 }).unwrap();
    assert_eq!(timestamps.len(), 13);
    assert!(strictly_inside(&timestamps, duration));
}

#[test]
fn evenly_spaced_rejects_too_short_duration() {
    let result = sample(
        Duration::from_nanos(5),
        &SamplingPolicy::EvenlySpaced { count: 3 },
    );
    assert!(matches!(result, Err(ThumbnailError::InvalidSampling(_))));
}

// ── Random ─────────────────────────────────────────────────────────

#[test]
fn random_with_seed_is_reproducible() {
    let policy = SamplingPolicy::Random {
        count: 9,
        seed: Some(42),
    };
    let first = sample(Duration::from_secs(60), &policy).unwrap();
    let second = sample(Duration::from_secs(60), &policy).unwrap();
    assert_eq!(first, second);
}

#[test]
fn random_is_sorted_distinct_and_inside_video() {
    let duration = Duration::from_secs(30);
    let timestamps = sample(
        duration,
        &SamplingPolicy::Random {
            count: 25,
            seed: Some(7),
        },
    )
    .unwrap();
    assert_eq!(timestamps.len(), 25);
    assert!(strictly_inside(&timestamps, duration));
}

#[test]
fn random_without_seed_still_satisfies_bounds() {
    let duration = Duration::from_secs(3);
    let timestamps = sample(duration, &SamplingPolicy::Random { count: 4, seed: None }).unwrap();
    assert_eq!(timestamps.len(), 4);
    assert!(strictly_inside(&timestamps, duration));
}

#[test]
fn random_redraws_duplicates() {
    // Only three interior nanoseconds exist, so all three must be drawn.
    let timestamps = sample(
        Duration::from_nanos(4),
        &SamplingPolicy::Random {
            count: 3,
            seed: Some(1),
        },
    )
    .unwrap();
    assert_eq!(
        timestamps,
        [1, 2, 3].map(Duration::from_nanos)
    );
}

#[test]
fn random_rejects_too_short_duration() {
    let result = sample(
        Duration::from_nanos(3),
        &SamplingPolicy::Random {
            count: 3,
            seed: Some(1),
        },
    );
    assert!(matches!(result, Err(ThumbnailError::InvalidSampling(_))));
}

// ── Invalid requests ───────────────────────────────────────────────

#[test]
fn zero_duration_is_invalid() {
    for policy in [
        SamplingPolicy::Single,
        SamplingPolicy::EvenlySpaced { count: 3 },
        SamplingPolicy::Random { count: 3, seed: None },
    ] {
        let result = sample(Duration::ZERO, &policy);
        assert!(
            matches!(result, Err(ThumbnailError::InvalidSampling(_))),
            "{policy:?} accepted a zero duration"
        );
    }
}

#[test]
fn zero_count_is_invalid() {
    let duration = Duration::from_secs(10);
    assert!(matches!(
        sample(duration, &SamplingPolicy::EvenlySpaced { count: 0 }),
        Err(ThumbnailError::InvalidSampling(_))
    ));
    assert!(matches!(
        sample(duration, &SamplingPolicy::Random { count: 0, seed: Some(3) }),
        Err(ThumbnailError::InvalidSampling(_))
    ));
}

#[test]
fn policy_frame_counts() {
    assert_eq!(SamplingPolicy::Single.frame_count(), 1);
    assert_eq!(SamplingPolicy::At(Duration::from_secs(1)).frame_count(), 1);
    assert_eq!(SamplingPolicy::EvenlySpaced { count: 12 }.frame_count(), 12);
    assert!(SamplingPolicy::default().is_single());
    assert!(!SamplingPolicy::Random { count: 4, seed: None }.is_single());
}
