//! Watermark rendering.
//!
//! [`apply`] alpha-composites a text string or an image logo onto a copy of
//! a base raster. The base is borrowed and never modified, so callers can
//! render several variants from the same frame.
//!
//! # Example
//!
//! ```
//! use image::DynamicImage;
//! use thumbsheet::{Color, FontChoice, Position, TextWatermark, WatermarkSpec, watermark};
//!
//! let base = DynamicImage::new_rgb8(320, 180);
//! let spec = WatermarkSpec::Text(
//!     TextWatermark::new("preview")
//!         .with_font(FontChoice::Builtin)
//!         .with_color(Color::rgb(255, 255, 0))
//!         .with_position(Position::BottomRight),
//! );
//! let marked = watermark::apply(&base, &spec)?;
//! assert_eq!(marked.width(), 320);
//! # Ok::<(), thumbsheet::ThumbnailError>(())
//! ```

use std::path::PathBuf;

use image::{DynamicImage, GrayImage, Rgb, RgbImage, RgbaImage, imageops::FilterType};

use crate::{
    error::ThumbnailError,
    font::{self, FontChoice},
};

/// Distance in pixels the overlay keeps from every edge, when it fits.
pub const EDGE_MARGIN: u32 = 16;

/// Where the watermark is anchored on the base raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Position {
    /// Top-left corner.
    TopLeft,
    /// Top-right corner.
    TopRight,
    /// Center of the image.
    #[default]
    Center,
    /// Bottom-left corner.
    BottomLeft,
    /// Bottom-right corner.
    BottomRight,
}

impl Position {
    /// Relative pivot (x, y) the overlay is centered on.
    fn pivot(self) -> (f64, f64) {
        match self {
            Position::TopLeft => (0.05, 0.05),
            Position::TopRight => (0.95, 0.05),
            Position::Center => (0.5, 0.5),
            Position::BottomLeft => (0.05, 0.95),
            Position::BottomRight => (0.95, 0.95),
        }
    }

    /// Kebab-case name used in preferences and on the command line.
    pub fn name(self) -> &'static str {
        match self {
            Position::TopLeft => "top-left",
            Position::TopRight => "top-right",
            Position::Center => "center",
            Position::BottomLeft => "bottom-left",
            Position::BottomRight => "bottom-right",
        }
    }

    /// Parse a name produced by [`name`](Position::name). Underscores and
    /// case are ignored.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "top-left" => Some(Position::TopLeft),
            "top-right" => Some(Position::TopRight),
            "center" | "centre" => Some(Position::Center),
            "bottom-left" => Some(Position::BottomLeft),
            "bottom-right" => Some(Position::BottomRight),
            _ => None,
        }
    }
}

/// An RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub [u8; 3]);

impl Color {
    /// White, the fallback for unparseable colors.
    pub const WHITE: Color = Color([255, 255, 255]);

    /// Create a color from components.
    pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Color([red, green, blue])
    }

    /// Parse `#RRGGBB`, `#RGB`, or a basic color name.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if let Some(hex) = value.strip_prefix('#') {
            return parse_hex(hex);
        }
        let named = match value.to_ascii_lowercase().as_str() {
            "white" => Color::rgb(255, 255, 255),
            "black" => Color::rgb(0, 0, 0),
            "red" => Color::rgb(255, 0, 0),
            "green" => Color::rgb(0, 128, 0),
            "lime" => Color::rgb(0, 255, 0),
            "blue" => Color::rgb(0, 0, 255),
            "yellow" => Color::rgb(255, 255, 0),
            "cyan" => Color::rgb(0, 255, 255),
            "magenta" => Color::rgb(255, 0, 255),
            "gray" | "grey" => Color::rgb(128, 128, 128),
            "orange" => Color::rgb(255, 165, 0),
            _ => return None,
        };
        Some(named)
    }

    /// Parse like [`parse`](Color::parse), falling back to white.
    pub fn parse_or_white(value: &str) -> Self {
        Self::parse(value).unwrap_or_else(|| {
            log::warn!("Unrecognised color {value:?}; using white");
            Color::WHITE
        })
    }

    /// `#RRGGBB` form.
    pub fn to_hex(self) -> String {
        let [red, green, blue] = self.0;
        format!("#{red:02X}{green:02X}{blue:02X}")
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

fn parse_hex(hex: &str) -> Option<Color> {
    if !hex.is_ascii() {
        return None;
    }
    let channel = |digits: &str| u8::from_str_radix(digits, 16).ok();
    match hex.len() {
        6 => Some(Color([
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
        ])),
        3 => {
            let short = |index: usize| channel(&hex[index..=index]).map(|value| value * 17);
            Some(Color([short(0)?, short(1)?, short(2)?]))
        }
        _ => None,
    }
}

/// A text watermark.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct TextWatermark {
    /// Text to draw. Surrounding whitespace is ignored.
    pub content: String,
    /// Font to draw with.
    pub font: FontChoice,
    /// Font size in pixels (at least [`font::MIN_FONT_SIZE`], at most the
    /// base image's height).
    pub size: f32,
    /// Text color.
    pub color: Color,
    /// Opacity in `[0, 1]`.
    pub opacity: f32,
    /// Anchor on the base image.
    pub position: Position,
}

impl TextWatermark {
    /// Create a white, half-opaque, centered 48 px watermark.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            font: FontChoice::default(),
            size: 48.0,
            color: Color::WHITE,
            opacity: 0.5,
            position: Position::Center,
        }
    }

    /// Set the font.
    pub fn with_font(mut self, font: FontChoice) -> Self {
        self.font = font;
        self
    }

    /// Set the font size in pixels.
    pub fn with_size(mut self, size: f32) -> Self {
        self.size = size;
        self
    }

    /// Set the text color.
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    /// Set the opacity, clamped to `[0, 1]`. NaN and infinities become 0.
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = unit_interval(opacity);
        self
    }

    /// Set the anchor position.
    pub fn with_position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }
}

/// An image (logo) watermark.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct ImageWatermark {
    /// Path of the logo image.
    pub path: PathBuf,
    /// Size of the logo's longer side relative to the base's shorter side,
    /// in `(0, 1]`.
    pub scale: f32,
    /// Opacity in `[0, 1]`.
    pub opacity: f32,
    /// Anchor on the base image.
    pub position: Position,
}

impl ImageWatermark {
    /// Create a half-opaque, centered logo watermark at scale 0.3.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            scale: 0.3,
            opacity: 0.5,
            position: Position::Center,
        }
    }

    /// Set the relative scale.
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    /// Set the opacity, clamped to `[0, 1]`. NaN and infinities become 0.
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = unit_interval(opacity);
        self
    }

    /// Set the anchor position.
    pub fn with_position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }
}

/// What, if anything, to draw over the thumbnail.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum WatermarkSpec {
    /// No watermark.
    #[default]
    None,
    /// A text watermark.
    Text(TextWatermark),
    /// An image watermark.
    Image(ImageWatermark),
}

/// Return a copy of `base` with the watermark described by `spec` blended on.
///
/// # Errors
///
/// Returns [`ThumbnailError::MissingAsset`] when an image watermark's path
/// does not resolve to a readable image.
pub fn apply(base: &DynamicImage, spec: &WatermarkSpec) -> Result<DynamicImage, ThumbnailError> {
    match spec {
        WatermarkSpec::None => Ok(base.clone()),
        WatermarkSpec::Text(text) => apply_text(base, text),
        WatermarkSpec::Image(logo) => apply_image(base, logo),
    }
}

fn apply_text(base: &DynamicImage, spec: &TextWatermark) -> Result<DynamicImage, ThumbnailError> {
    let content = spec.content.trim();
    let opacity = unit_interval(spec.opacity);
    if content.is_empty() || opacity <= 0.0 {
        return Ok(base.clone());
    }
    log::debug!(
        "Applying text watermark {content:?} ({} px, {}, opacity {opacity:.2})",
        spec.size,
        spec.position.name()
    );

    let loaded = font::load(&spec.font);
    let mask = font::render_mask(&loaded, content, spec.size, (base.width(), base.height()));
    let overlay = tint(&mask, spec.color);
    Ok(blend(base, &overlay, spec.position, opacity))
}

fn apply_image(base: &DynamicImage, spec: &ImageWatermark) -> Result<DynamicImage, ThumbnailError> {
    // Validate the asset before the opacity short-circuit so a bad path is
    // always reported.
    let logo = image::open(&spec.path).map_err(|error| ThumbnailError::MissingAsset {
        path: spec.path.clone(),
        reason: error.to_string(),
    })?;

    let opacity = unit_interval(spec.opacity);
    if opacity <= 0.0 {
        return Ok(base.clone());
    }
    log::debug!(
        "Applying image watermark {} (scale {:.2}, {}, opacity {opacity:.2})",
        spec.path.display(),
        spec.scale,
        spec.position.name()
    );

    let shorter_side = base.width().min(base.height()) as f32;
    let scale = if spec.scale.is_finite() { spec.scale.clamp(0.05, 1.0) } else { 0.05 };
    let target = (shorter_side * scale).round().max(1.0) as u32;
    let logo = logo.resize(target, target, FilterType::Lanczos3).to_rgba8();
    Ok(blend(base, &logo, spec.position, opacity))
}

/// Clamp to `[0, 1]`, mapping non-finite values to 0.
fn unit_interval(value: f32) -> f32 {
    if value.is_finite() { value.clamp(0.0, 1.0) } else { 0.0 }
}

/// Turn a coverage mask into an RGBA overlay of a single color.
fn tint(mask: &GrayImage, color: Color) -> RgbaImage {
    let [red, green, blue] = color.0;
    RgbaImage::from_fn(mask.width(), mask.height(), |x, y| {
        image::Rgba([red, green, blue, mask.get_pixel(x, y).0[0]])
    })
}

/// Blend `overlay` onto a copy of `base` centered on `position`'s pivot.
fn blend(base: &DynamicImage, overlay: &RgbaImage, position: Position, opacity: f32) -> DynamicImage {
    let mut output: RgbImage = base.to_rgb8();
    let (base_width, base_height) = output.dimensions();
    let (left, top) = place(
        (base_width, base_height),
        overlay.dimensions(),
        position,
    );

    for (x, y, pixel) in overlay.enumerate_pixels() {
        let target_x = left + i64::from(x);
        let target_y = top + i64::from(y);
        if target_x < 0
            || target_y < 0
            || target_x >= i64::from(base_width)
            || target_y >= i64::from(base_height)
        {
            continue;
        }
        let alpha = f32::from(pixel.0[3]) / 255.0 * opacity;
        if alpha <= 0.0 {
            continue;
        }
        let Rgb(under) = output.get_pixel_mut(target_x as u32, target_y as u32);
        for channel in 0..3 {
            let mixed = f32::from(under[channel]) * (1.0 - alpha) + f32::from(pixel.0[channel]) * alpha;
            under[channel] = mixed.round().clamp(0.0, 255.0) as u8;
        }
    }

    DynamicImage::ImageRgb8(output)
}

/// Top-left corner of an overlay centered on the pivot, with the center
/// clamped so the overlay stays inside the margin. When the overlay is too
/// large for that, it is centered on the affected axis.
pub(crate) fn place(base: (u32, u32), overlay: (u32, u32), position: Position) -> (i64, i64) {
    let (pivot_x, pivot_y) = position.pivot();
    let center_x = constrain(base.0, overlay.0, base.0 as f64 * pivot_x);
    let center_y = constrain(base.1, overlay.1, base.1 as f64 * pivot_y);
    (
        (center_x - overlay.0 as f64 / 2.0).round() as i64,
        (center_y - overlay.1 as f64 / 2.0).round() as i64,
    )
}

fn constrain(base: u32, overlay: u32, center: f64) -> f64 {
    let half = overlay as f64 / 2.0;
    let margin = EDGE_MARGIN as f64;
    let low = margin + half;
    let high = base as f64 - margin - half;
    if low > high {
        base as f64 / 2.0
    } else {
        center.clamp(low, high)
    }
}
