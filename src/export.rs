//! Writing finished thumbnails to disk.
//!
//! [`Exporter`] is the output-side counterpart of
//! [`FrameSource`](crate::FrameSource): the pipeline hands it a finished
//! raster and an [`ExportTarget`]. [`FileExporter`] encodes JPEG or PNG with
//! the `image` crate.

use std::{
    fs::{self, File},
    io::BufWriter,
    path::{Path, PathBuf},
};

use image::{DynamicImage, ImageFormat, codecs::jpeg::JpegEncoder};

use crate::error::ThumbnailError;

/// Default JPEG quality (1–100).
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Output image format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExportFormat {
    /// Lossy JPEG. Alpha is dropped.
    #[default]
    Jpeg,
    /// Lossless PNG.
    Png,
}

impl ExportFormat {
    /// Canonical file extension.
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Jpeg => "jpg",
            ExportFormat::Png => "png",
        }
    }

    /// Parse an extension or format name (`jpg`, `jpeg`, `png`), ignoring
    /// case and a leading dot.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(ExportFormat::Jpeg),
            "png" => Some(ExportFormat::Png),
            _ => None,
        }
    }
}

/// Where and how a thumbnail is written.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct ExportTarget {
    /// Destination path.
    pub path: PathBuf,
    /// Encoding format.
    pub format: ExportFormat,
    /// JPEG quality (1–100). Ignored for PNG.
    pub jpeg_quality: u8,
}

impl ExportTarget {
    /// Create a target with an explicit format.
    ///
    /// A path without an extension gets the format's extension appended.
    pub fn new(path: impl Into<PathBuf>, format: ExportFormat) -> Self {
        let mut path = path.into();
        if path.extension().is_none() {
            path.set_extension(format.extension());
        }
        Self {
            path,
            format,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }

    /// Create a target whose format is inferred from the path's extension.
    ///
    /// # Errors
    ///
    /// Returns [`ThumbnailError::Write`] for a missing or unsupported
    /// extension.
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self, ThumbnailError> {
        let path = path.into();
        let format = path
            .extension()
            .and_then(|extension| extension.to_str())
            .and_then(ExportFormat::from_extension)
            .ok_or_else(|| {
                ThumbnailError::write(&path, "unsupported extension (expected .jpg, .jpeg or .png)")
            })?;
        Ok(Self::new(path, format))
    }

    /// Set the JPEG quality, clamped to 1–100.
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }
}

/// Something that can persist a finished raster.
pub trait Exporter {
    /// Write `image` to `target`, returning the path actually written.
    fn export(&self, image: &DynamicImage, target: &ExportTarget) -> Result<PathBuf, ThumbnailError>;
}

/// Writes thumbnails to the local filesystem.
///
/// Parent directories are created as needed and existing files are
/// overwritten; confirming an overwrite is the caller's job.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileExporter;

impl Exporter for FileExporter {
    fn export(&self, image: &DynamicImage, target: &ExportTarget) -> Result<PathBuf, ThumbnailError> {
        let path = &target.path;
        check_extension(path, target.format)?;
        log::debug!(
            "Exporting {}x{} {:?} to {}",
            image.width(),
            image.height(),
            target.format,
            path.display()
        );

        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|error| ThumbnailError::write(path, error))?;
        }

        let file = File::create(path).map_err(|error| ThumbnailError::write(path, error))?;
        let mut writer = BufWriter::new(file);
        match target.format {
            ExportFormat::Jpeg => {
                let encoder = JpegEncoder::new_with_quality(&mut writer, target.jpeg_quality);
                DynamicImage::ImageRgb8(image.to_rgb8())
                    .write_with_encoder(encoder)
                    .map_err(|error| ThumbnailError::write(path, error))?;
            }
            ExportFormat::Png => image
                .write_to(&mut writer, ImageFormat::Png)
                .map_err(|error| ThumbnailError::write(path, error))?,
        }
        writer
            .into_inner()
            .map_err(|error| ThumbnailError::write(path, error.error()))?
            .sync_all()
            .map_err(|error| ThumbnailError::write(path, error))?;

        Ok(path.clone())
    }
}

/// An extension that names a different format than `format` would make the
/// file lie about its content.
fn check_extension(path: &Path, format: ExportFormat) -> Result<(), ThumbnailError> {
    let extension = path.extension().and_then(|extension| extension.to_str());
    match extension.map(ExportFormat::from_extension) {
        Some(Some(found)) if found == format => Ok(()),
        Some(Some(found)) => Err(ThumbnailError::write(
            path,
            format!("extension names {found:?} but the target format is {format:?}"),
        )),
        Some(None) => Err(ThumbnailError::write(
            path,
            "unsupported extension (expected .jpg, .jpeg or .png)",
        )),
        None => Err(ThumbnailError::write(path, "missing file extension")),
    }
}
