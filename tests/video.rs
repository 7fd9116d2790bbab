//! FFmpeg-backed video tests.
//!
//! Tests that need a real video require fixture files from
//! `tests/fixtures/generate_fixtures.sh` and return early without them.

mod common;

use std::{path::Path, time::Duration};

use thumbsheet::{
    ExportTarget, FileExporter, FrameSource, GenerateOptions, ThumbnailError, ThumbnailSpec,
    VideoFile, WatermarkSpec, pipeline,
};

use common::SAMPLE_VIDEO;

#[test]
fn open_nonexistent_file() {
    let result = VideoFile::open("this_file_does_not_exist.mp4");
    let error = result.unwrap_err();
    assert!(matches!(error, ThumbnailError::UnreadableMedia { .. }));
    assert!(
        error.to_string().contains("Failed to read media file"),
        "Error message should mention the unreadable file: {error}",
    );
}

#[test]
fn open_invalid_file() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let invalid_file_path = temporary_directory.path().join("invalid.mp4");
    std::fs::write(&invalid_file_path, b"this is not a media file")
        .expect("Failed to write invalid file");

    let result = VideoFile::open(&invalid_file_path);
    assert!(matches!(
        result,
        Err(ThumbnailError::UnreadableMedia { .. })
    ));
}

#[test]
fn metadata_is_sane() {
    if !Path::new(SAMPLE_VIDEO).exists() {
        return;
    }

    let video = VideoFile::open(SAMPLE_VIDEO).expect("Failed to open test video");
    let metadata = video.metadata();
    assert!(metadata.width > 0 && metadata.height > 0);
    assert!(metadata.frames_per_second > 0.0);
    assert!(!metadata.duration.is_zero());
    assert!(metadata.frame_count > 0);
    assert!(!metadata.codec.is_empty());
    assert_eq!(video.path(), Path::new(SAMPLE_VIDEO));
}

#[test]
fn frame_matches_video_resolution() {
    if !Path::new(SAMPLE_VIDEO).exists() {
        return;
    }

    let mut video = VideoFile::open(SAMPLE_VIDEO).expect("Failed to open test video");
    let (width, height) = (video.metadata().width, video.metadata().height);
    let midpoint = video.metadata().duration / 2;
    let frame = video.frame_at(midpoint).expect("Failed to decode frame");
    assert_eq!((frame.width(), frame.height()), (width, height));
}

#[test]
fn frame_past_end_is_out_of_range() {
    if !Path::new(SAMPLE_VIDEO).exists() {
        return;
    }

    let mut video = VideoFile::open(SAMPLE_VIDEO).expect("Failed to open test video");
    let beyond = video.metadata().duration + Duration::from_secs(3600);
    let error = video.frame_at(beyond).unwrap_err();
    assert!(
        error.to_string().contains("out of range"),
        "Error message should mention out of range: {error}",
    );
}

#[test]
fn seeking_backwards_works() {
    if !Path::new(SAMPLE_VIDEO).exists() {
        return;
    }

    let mut video = VideoFile::open(SAMPLE_VIDEO).expect("Failed to open test video");
    let duration = video.metadata().duration;
    video.frame_at(duration * 3 / 4).expect("Failed to decode late frame");
    video.frame_at(duration / 4).expect("Failed to decode early frame");
}

#[test]
fn grid_from_real_video() {
    if !Path::new(SAMPLE_VIDEO).exists() {
        return;
    }

    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let mut video = VideoFile::open(SAMPLE_VIDEO).expect("Failed to open test video");
    let generated = pipeline::generate(
        &mut video,
        &ThumbnailSpec::grid(2, 3).with_cell_size(160, 90),
        &WatermarkSpec::None,
        &FileExporter,
        &ExportTarget::from_path(temporary_directory.path().join("grid.jpg")).unwrap(),
        &GenerateOptions::default(),
    )
    .expect("Failed to generate grid");

    let written = image::open(&generated.path).expect("Failed to read grid");
    assert_eq!((written.width(), written.height()), (480, 180));
}
