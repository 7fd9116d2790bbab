//! Contact-sheet grid composition.
//!
//! [`composite`] scales every frame to a uniform cell and tiles the cells
//! row-major into one raster with no gaps. The fit mode ([`CellFit`]) applies
//! to the whole grid so every cell looks alike.

use image::{DynamicImage, GenericImage, GenericImageView, Rgb, RgbImage, imageops::FilterType};

use crate::error::ThumbnailError;

/// Size of a single grid cell in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellSize {
    /// Cell width in pixels.
    pub width: u32,
    /// Cell height in pixels.
    pub height: u32,
}

impl CellSize {
    /// Create a cell size.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for CellSize {
    fn default() -> Self {
        Self::new(320, 180)
    }
}

impl From<(u32, u32)> for CellSize {
    fn from((width, height): (u32, u32)) -> Self {
        Self::new(width, height)
    }
}

/// How a frame is scaled into a cell whose aspect ratio differs from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CellFit {
    /// Scale to cover the cell and crop the overflow around the center.
    Fill,
    /// Scale to fit inside the cell and pad the remainder with black.
    #[default]
    Letterbox,
}

impl CellFit {
    /// Lower-case name used in preferences and on the command line.
    pub fn name(self) -> &'static str {
        match self {
            CellFit::Fill => "fill",
            CellFit::Letterbox => "letterbox",
        }
    }

    /// Parse a name produced by [`name`](CellFit::name).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "fill" | "crop" => Some(CellFit::Fill),
            "letterbox" | "fit" => Some(CellFit::Letterbox),
            _ => None,
        }
    }
}

/// Tile `frames` into a `rows` × `columns` grid of `cell`-sized tiles.
///
/// The result is an RGB8 raster of `columns * cell.width` by
/// `rows * cell.height` pixels. Frames fill the grid left to right, top to
/// bottom.
///
/// # Errors
///
/// Returns [`ThumbnailError::DimensionMismatch`] when
/// `frames.len() != rows * columns`, or when the layout has a zero
/// dimension or overflows `u32`.
///
/// # Example
///
/// ```
/// use image::DynamicImage;
/// use thumbsheet::{CellFit, CellSize, composite};
///
/// let frames = vec![DynamicImage::new_rgb8(64, 36); 5];
/// let sheet = composite(&frames, 1, 5, CellSize::new(32, 18), CellFit::Fill)?;
/// assert_eq!((sheet.width(), sheet.height()), (160, 18));
/// # Ok::<(), thumbsheet::ThumbnailError>(())
/// ```
pub fn composite(
    frames: &[DynamicImage],
    rows: u32,
    columns: u32,
    cell: CellSize,
    fit: CellFit,
) -> Result<DynamicImage, ThumbnailError> {
    log::debug!(
        "Compositing {} frames into a {rows}x{columns} grid of {}x{} cells ({})",
        frames.len(),
        cell.width,
        cell.height,
        fit.name()
    );

    let expected = (rows as usize).checked_mul(columns as usize);
    if expected != Some(frames.len()) {
        return Err(ThumbnailError::DimensionMismatch {
            expected: format!("{rows}x{columns} frames"),
            actual: format!("{} frames", frames.len()),
        });
    }
    if rows == 0 || columns == 0 || cell.width == 0 || cell.height == 0 {
        return Err(ThumbnailError::DimensionMismatch {
            expected: "non-zero grid and cell dimensions".to_string(),
            actual: format!("{rows}x{columns} grid of {}x{} cells", cell.width, cell.height),
        });
    }

    let (grid_width, grid_height) = cell
        .width
        .checked_mul(columns)
        .zip(cell.height.checked_mul(rows))
        .ok_or_else(|| ThumbnailError::DimensionMismatch {
            expected: "a grid no larger than u32::MAX pixels per side".to_string(),
            actual: format!("{rows}x{columns} grid of {}x{} cells", cell.width, cell.height),
        })?;

    let mut grid = RgbImage::new(grid_width, grid_height);
    for (index, frame) in frames.iter().enumerate() {
        let index = index as u32;
        let x = (index % columns) * cell.width;
        let y = (index / columns) * cell.height;
        let tile = fit_to_cell(frame, cell, fit);
        grid.copy_from(&tile, x, y)?;
    }

    Ok(DynamicImage::ImageRgb8(grid))
}

/// Scale one frame to exactly `cell` using `fit`.
pub fn fit_to_cell(frame: &DynamicImage, cell: CellSize, fit: CellFit) -> RgbImage {
    match fit {
        CellFit::Fill => frame
            .resize_to_fill(cell.width, cell.height, FilterType::Triangle)
            .to_rgb8(),
        CellFit::Letterbox => {
            let scaled = frame
                .resize(cell.width, cell.height, FilterType::Triangle)
                .to_rgb8();
            if scaled.dimensions() == (cell.width, cell.height) {
                return scaled;
            }
            let mut tile = RgbImage::from_pixel(cell.width, cell.height, Rgb([0, 0, 0]));
            let x = (cell.width - scaled.width()) / 2;
            let y = (cell.height - scaled.height()) / 2;
            image::imageops::replace(&mut tile, &scaled, i64::from(x), i64::from(y));
            tile
        }
    }
}

/// Compute dimensions that fit within `max_dimension` preserving aspect ratio.
pub(crate) fn fit_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (max_dimension, max_dimension);
    }
    let scale = max_dimension as f64 / width.max(height) as f64;
    let new_width = ((width as f64) * scale).round() as u32;
    let new_height = ((height as f64) * scale).round() as u32;
    (new_width.max(1), new_height.max(1))
}

/// Downscale `image` so its longer edge is at most `max_dimension`.
///
/// Images already within the bound are returned unchanged.
pub(crate) fn shrink_to_fit(image: DynamicImage, max_dimension: u32) -> DynamicImage {
    let (width, height) = image.dimensions();
    if width.max(height) <= max_dimension {
        return image;
    }
    let (new_width, new_height) = fit_dimensions(width, height, max_dimension);
    image.resize_exact(new_width, new_height, FilterType::Triangle)
}
