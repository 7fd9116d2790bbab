//! # thumbsheet
//!
//! Generate still thumbnails and contact-sheet grids from video files, with
//! an optional text or image watermark.
//!
//! A request is described by a [`ThumbnailSpec`] (how many frames, sampled
//! how, laid out how), a [`WatermarkSpec`] and an [`ExportTarget`]. The
//! [`pipeline`] samples timestamps, decodes frames through a
//! [`FrameSource`], tiles them, blends the watermark and hands the result to
//! an [`Exporter`]. Decoding is powered by FFmpeg via the
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) crate.
//!
//! ## Quick Start
//!
//! ### A single still
//!
//! ```no_run
//! use thumbsheet::{
//!     ExportTarget, FileExporter, GenerateOptions, ThumbnailSpec, VideoFile, WatermarkSpec,
//!     pipeline,
//! };
//!
//! let mut video = VideoFile::open("input.mp4").unwrap();
//! pipeline::generate(
//!     &mut video,
//!     &ThumbnailSpec::single(),
//!     &WatermarkSpec::None,
//!     &FileExporter,
//!     &ExportTarget::from_path("still.jpg").unwrap(),
//!     &GenerateOptions::default(),
//! )
//! .unwrap();
//! ```
//!
//! ### A watermarked contact sheet
//!
//! ```no_run
//! use thumbsheet::{
//!     ExportTarget, FileExporter, GenerateOptions, Position, TextWatermark, ThumbnailSpec,
//!     VideoFile, WatermarkSpec, pipeline,
//! };
//!
//! let mut video = VideoFile::open("input.mp4").unwrap();
//! let watermark = WatermarkSpec::Text(
//!     TextWatermark::new("© 2026").with_opacity(0.7).with_position(Position::BottomRight),
//! );
//! pipeline::generate(
//!     &mut video,
//!     &ThumbnailSpec::grid(3, 4).with_cell_size(320, 180),
//!     &watermark,
//!     &FileExporter,
//!     &ExportTarget::from_path("sheet.png").unwrap(),
//!     &GenerateOptions::default(),
//! )
//! .unwrap();
//! ```
//!
//! ## Features
//!
//! - **Sampling**: midpoint, explicit timestamp, evenly spaced, or seeded
//!   random timestamps, always strictly inside the video
//! - **Grids**: any rows × columns layout with fill or letterbox cells
//! - **Watermarks**: text (system, file or built-in font) or image, with
//!   opacity and five anchor positions
//! - **Export**: JPEG (with quality) or PNG
//! - **Preferences**: a forgiving JSON preferences file
//! - **Progress & cancellation**: per-stage callbacks and a
//!   `CancellationToken`; a cancelled request never writes a file
//! - **Background work**: a single-flight [`Worker`] with a progress channel
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

mod conversion;
pub mod error;
pub mod export;
pub mod ffmpeg;
pub mod font;
pub mod grid;
pub mod metadata;
pub mod options;
pub mod pipeline;
pub mod preferences;
pub mod progress;
pub mod sampling;
pub mod source;
pub mod video;
pub mod watermark;
pub mod worker;

pub use error::ThumbnailError;
pub use export::{DEFAULT_JPEG_QUALITY, ExportFormat, ExportTarget, Exporter, FileExporter};
pub use ffmpeg::{FfmpegLogLevel, get_ffmpeg_log_level, set_ffmpeg_log_level};
pub use font::FontChoice;
pub use grid::{CellFit, CellSize, composite, fit_to_cell};
pub use metadata::VideoMetadata;
pub use options::GenerateOptions;
pub use pipeline::{Generated, ThumbnailSpec};
pub use preferences::{
    DEFAULT_PREFERENCES_FILE, LoadedPreferences, PreferenceWarning, Preferences, ThumbnailMode,
    WatermarkKind,
};
pub use progress::{CancellationToken, ProgressCallback, ProgressInfo, Stage};
pub use sampling::{SamplingPolicy, sample};
pub use source::FrameSource;
pub use video::VideoFile;
pub use watermark::{Color, ImageWatermark, Position, TextWatermark, WatermarkSpec};
pub use worker::{JobHandle, Request, Worker};
