//! The thumbnail pipeline.
//!
//! A request runs straight through: sample → extract (×n) → composite (grid
//! mode) → watermark → export. [`render`] stops before export and is what a
//! preview uses; [`generate`] runs to completion. Export only happens after
//! every earlier stage has succeeded, so a failed or cancelled request never
//! leaves a partial file behind.

use std::{path::PathBuf, time::Duration};

use image::DynamicImage;

use crate::{
    error::ThumbnailError,
    export::{ExportTarget, Exporter},
    grid::{self, CellFit, CellSize},
    metadata::VideoMetadata,
    options::GenerateOptions,
    progress::{ProgressTracker, Stage},
    sampling::{self, SamplingPolicy},
    source::FrameSource,
    watermark::{self, WatermarkSpec},
};

/// Cell width used when a grid request does not set a cell size.
pub const DEFAULT_CELL_WIDTH: u32 = 320;

/// Layout and sampling of one thumbnail.
///
/// # Example
///
/// ```
/// use thumbsheet::{CellFit, ThumbnailSpec};
///
/// let spec = ThumbnailSpec::grid(3, 4).with_cell_size(240, 135).with_fit(CellFit::Fill);
/// assert!(spec.validate().is_ok());
/// assert_eq!(spec.policy.frame_count(), 12);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct ThumbnailSpec {
    /// Which timestamps to extract.
    pub policy: SamplingPolicy,
    /// Grid rows (1 for single mode).
    pub rows: u32,
    /// Grid columns (1 for single mode).
    pub columns: u32,
    /// Size of each cell. `None` keeps the source resolution in single mode
    /// and derives a [`DEFAULT_CELL_WIDTH`]-wide cell with the video's aspect
    /// ratio in grid mode.
    pub cell: Option<CellSize>,
    /// How frames are fitted into cells.
    pub fit: CellFit,
}

impl ThumbnailSpec {
    /// One frame at the midpoint of the video.
    pub fn single() -> Self {
        Self::with_policy(SamplingPolicy::Single, 1, 1)
    }

    /// One frame at `timestamp`.
    pub fn at(timestamp: Duration) -> Self {
        Self::with_policy(SamplingPolicy::At(timestamp), 1, 1)
    }

    /// An evenly sampled `rows` × `columns` grid.
    pub fn grid(rows: u32, columns: u32) -> Self {
        let count = rows.saturating_mul(columns);
        Self::with_policy(SamplingPolicy::EvenlySpaced { count }, rows, columns)
    }

    /// A randomly sampled `rows` × `columns` grid.
    pub fn random_grid(rows: u32, columns: u32, seed: Option<u64>) -> Self {
        let count = rows.saturating_mul(columns);
        Self::with_policy(SamplingPolicy::Random { count, seed }, rows, columns)
    }

    fn with_policy(policy: SamplingPolicy, rows: u32, columns: u32) -> Self {
        Self {
            policy,
            rows,
            columns,
            cell: None,
            fit: CellFit::default(),
        }
    }

    /// Set an explicit cell size.
    pub fn with_cell_size(mut self, width: u32, height: u32) -> Self {
        self.cell = Some(CellSize::new(width, height));
        self
    }

    /// Set the cell fit mode.
    pub fn with_fit(mut self, fit: CellFit) -> Self {
        self.fit = fit;
        self
    }

    /// Check the layout against the sampling policy.
    ///
    /// # Errors
    ///
    /// - [`ThumbnailError::InvalidSampling`] when the policy samples no
    ///   frames.
    /// - [`ThumbnailError::DimensionMismatch`] when rows or columns are zero,
    ///   a single-frame policy is not laid out 1×1, a grid's
    ///   `rows * columns` differs from the frame count, or the cell size has
    ///   a zero side.
    pub fn validate(&self) -> Result<(), ThumbnailError> {
        let count = self.policy.frame_count();
        if count == 0 {
            return Err(ThumbnailError::InvalidSampling(
                "frame count must be at least 1".to_string(),
            ));
        }
        if self.rows == 0 || self.columns == 0 {
            return Err(ThumbnailError::DimensionMismatch {
                expected: "at least one row and one column".to_string(),
                actual: format!("{}x{}", self.rows, self.columns),
            });
        }
        if self.policy.is_single() && (self.rows, self.columns) != (1, 1) {
            return Err(ThumbnailError::DimensionMismatch {
                expected: "a 1x1 layout for a single-frame thumbnail".to_string(),
                actual: format!("{}x{}", self.rows, self.columns),
            });
        }
        let cells = u64::from(self.rows) * u64::from(self.columns);
        if cells != u64::from(count) {
            return Err(ThumbnailError::DimensionMismatch {
                expected: format!("{}x{} = {cells} frames", self.rows, self.columns),
                actual: format!("{count} sampled frames"),
            });
        }
        match self.cell {
            Some(cell) if cell.width == 0 || cell.height == 0 => {
                Err(ThumbnailError::DimensionMismatch {
                    expected: "a non-zero cell size".to_string(),
                    actual: format!("{}x{}", cell.width, cell.height),
                })
            }
            _ => Ok(()),
        }
    }

    /// The cell size used for a video with `metadata`.
    pub fn resolve_cell(&self, metadata: &VideoMetadata) -> CellSize {
        self.cell.unwrap_or_else(|| {
            if self.policy.is_single() {
                return CellSize::new(metadata.width, metadata.height);
            }
            let height = (DEFAULT_CELL_WIDTH as f64 / metadata.aspect_ratio()).round() as u32;
            CellSize::new(DEFAULT_CELL_WIDTH, height.max(1))
        })
    }
}

impl Default for ThumbnailSpec {
    fn default() -> Self {
        Self::single()
    }
}

/// A finished, exported thumbnail.
#[derive(Debug, Clone)]
pub struct Generated {
    /// Path the thumbnail was written to.
    pub path: PathBuf,
    /// The exported raster, e.g. for an on-screen preview.
    pub image: DynamicImage,
}

/// Run the pipeline up to (not including) export.
///
/// # Errors
///
/// Returns validation and sampling errors from [`ThumbnailSpec::validate`]
/// and [`sampling::sample`], extraction errors from the source,
/// [`ThumbnailError::MissingAsset`] from the watermark, or
/// [`ThumbnailError::Cancelled`].
pub fn render<S: FrameSource + ?Sized>(
    source: &mut S,
    spec: &ThumbnailSpec,
    watermark: &WatermarkSpec,
    options: &GenerateOptions,
) -> Result<DynamicImage, ThumbnailError> {
    run(source, spec, watermark, options).map(|(image, _)| image)
}

/// Render a preview scaled so its longer edge is at most `max_dimension`.
///
/// # Errors
///
/// Same as [`render`].
pub fn preview<S: FrameSource + ?Sized>(
    source: &mut S,
    spec: &ThumbnailSpec,
    watermark: &WatermarkSpec,
    options: &GenerateOptions,
    max_dimension: u32,
) -> Result<DynamicImage, ThumbnailError> {
    let image = render(source, spec, watermark, options)?;
    Ok(grid::shrink_to_fit(image, max_dimension.max(1)))
}

/// Run the full pipeline and export the result.
///
/// # Errors
///
/// Same as [`render`], plus [`ThumbnailError::Write`] from the exporter.
///
/// # Example
///
/// ```no_run
/// use thumbsheet::{
///     ExportTarget, FileExporter, GenerateOptions, ThumbnailError, ThumbnailSpec, VideoFile,
///     WatermarkSpec, pipeline,
/// };
///
/// let mut video = VideoFile::open("input.mp4")?;
/// let generated = pipeline::generate(
///     &mut video,
///     &ThumbnailSpec::grid(3, 3),
///     &WatermarkSpec::None,
///     &FileExporter,
///     &ExportTarget::from_path("sheet.jpg")?,
///     &GenerateOptions::default(),
/// )?;
/// println!("wrote {}", generated.path.display());
/// # Ok::<(), ThumbnailError>(())
/// ```
pub fn generate<S, E>(
    source: &mut S,
    spec: &ThumbnailSpec,
    watermark: &WatermarkSpec,
    exporter: &E,
    target: &ExportTarget,
    options: &GenerateOptions,
) -> Result<Generated, ThumbnailError>
where
    S: FrameSource + ?Sized,
    E: Exporter + ?Sized,
{
    let (image, tracker) = run(source, spec, watermark, options)?;
    if options.is_cancelled() {
        return Err(ThumbnailError::Cancelled);
    }

    let path = exporter.export(&image, target)?;
    tracker.stage(Stage::Exporting, 100.0);
    log::debug!("Thumbnail written to {}", path.display());
    Ok(Generated { path, image })
}

fn run<S: FrameSource + ?Sized>(
    source: &mut S,
    spec: &ThumbnailSpec,
    watermark: &WatermarkSpec,
    options: &GenerateOptions,
) -> Result<(DynamicImage, ProgressTracker), ThumbnailError> {
    spec.validate()?;
    let metadata = source.metadata().clone();
    let cell = spec.resolve_cell(&metadata);
    let timestamps = sampling::sample(metadata.duration, &spec.policy)?;
    log::debug!(
        "Rendering {}x{} thumbnail from {} sampled frames ({:?})",
        spec.rows,
        spec.columns,
        timestamps.len(),
        spec.policy
    );

    let mut tracker = ProgressTracker::new(
        options.progress.clone(),
        timestamps.len() as u64,
        options.batch_size,
    );

    let mut frames = Vec::with_capacity(timestamps.len());
    for timestamp in timestamps {
        if options.is_cancelled() {
            log::debug!("Request cancelled after {} frames", frames.len());
            return Err(ThumbnailError::Cancelled);
        }
        frames.push(source.frame_at(timestamp)?);
        tracker.frame_extracted(timestamp);
    }

    let base = if spec.policy.is_single() {
        let frame = frames
            .into_iter()
            .next()
            .ok_or_else(|| ThumbnailError::Decode("no frame was extracted".to_string()))?;
        if (frame.width(), frame.height()) == (cell.width, cell.height) {
            DynamicImage::ImageRgb8(frame.into_rgb8())
        } else {
            DynamicImage::ImageRgb8(grid::fit_to_cell(&frame, cell, spec.fit))
        }
    } else {
        grid::composite(&frames, spec.rows, spec.columns, cell, spec.fit)?
    };
    tracker.stage(Stage::Compositing, 70.0);

    tracker.stage(Stage::Watermarking, 80.0);
    let marked = watermark::apply(&base, watermark)?;
    tracker.stage(Stage::Watermarking, 90.0);

    Ok((marked, tracker))
}
