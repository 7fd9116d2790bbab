//! Text rasterization for text watermarks.
//!
//! Text is rendered into a grayscale coverage mask (0 = empty, 255 = fully
//! inked); the watermark module tints and blends it. Outline fonts go through
//! `ab_glyph`. When no outline font is available the built-in 8×8 bitmap
//! font from `font8x8` is scaled up by whole pixels, so text watermarks work
//! on machines without any installed fonts.

use std::path::{Path, PathBuf};

use ab_glyph::{Font, FontVec, GlyphId, PxScale, ScaleFont, point};
use font8x8::{BASIC_FONTS, UnicodeFonts};
use image::{GrayImage, Luma};

/// Smallest font size accepted, in pixels.
pub const MIN_FONT_SIZE: f32 = 8.0;

const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Which font a text watermark is drawn with.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FontChoice {
    /// The first common system font found, else the built-in bitmap font.
    #[default]
    System,
    /// The built-in 8×8 bitmap font, scaled to the requested size.
    Builtin,
    /// A TrueType/OpenType font file. Falls back to [`FontChoice::System`]
    /// with a warning when the file cannot be loaded.
    File(PathBuf),
}

impl FontChoice {
    /// Path of an explicit font file, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            FontChoice::File(path) => Some(path),
            _ => None,
        }
    }
}

pub(crate) enum LoadedFont {
    Outline(FontVec),
    Bitmap,
}

pub(crate) fn load(choice: &FontChoice) -> LoadedFont {
    match choice {
        FontChoice::Builtin => LoadedFont::Bitmap,
        FontChoice::File(path) => match read_outline_font(path) {
            Ok(font) => LoadedFont::Outline(font),
            Err(reason) => {
                log::warn!(
                    "Cannot load font {}: {reason}; falling back to a system font",
                    path.display()
                );
                load_system_font()
            }
        },
        FontChoice::System => load_system_font(),
    }
}

fn load_system_font() -> LoadedFont {
    SYSTEM_FONT_CANDIDATES
        .iter()
        .map(Path::new)
        .filter(|path| path.is_file())
        .find_map(|path| read_outline_font(path).ok())
        .map(LoadedFont::Outline)
        .unwrap_or_else(|| {
            log::debug!("No system font found; using the built-in bitmap font");
            LoadedFont::Bitmap
        })
}

fn read_outline_font(path: &Path) -> Result<FontVec, String> {
    let data = std::fs::read(path).map_err(|error| error.to_string())?;
    FontVec::try_from_vec(data).map_err(|error| error.to_string())
}

/// Render one line of `text` at `size` pixels into a coverage mask.
///
/// Control characters are skipped. The mask is at least 1×1 and never
/// larger than `bounds`: the size is capped at the bounding height, and text
/// wider than the bounds keeps its middle section.
pub(crate) fn render_mask(font: &LoadedFont, text: &str, size: f32, bounds: (u32, u32)) -> GrayImage {
    let (max_width, max_height) = (bounds.0.max(1), bounds.1.max(1));
    let size = if size.is_finite() { size } else { MIN_FONT_SIZE };
    let size = size.min(max_height as f32).max(MIN_FONT_SIZE);
    match font {
        LoadedFont::Outline(font) => render_outline(font, text, size, max_width, max_height),
        LoadedFont::Bitmap => render_bitmap(text, size, max_width, max_height),
    }
}

fn render_outline(font: &FontVec, text: &str, size: f32, max_width: u32, max_height: u32) -> GrayImage {
    let scale = PxScale::from(size);
    let scaled = font.as_scaled(scale);

    let mut glyphs = Vec::new();
    let mut caret = 0.0_f32;
    let mut previous: Option<GlyphId> = None;
    for character in text.chars().filter(|c| !c.is_control()) {
        let id = scaled.glyph_id(character);
        if let Some(previous) = previous {
            caret += scaled.kern(previous, id);
        }
        glyphs.push(id.with_scale_and_position(scale, point(caret, scaled.ascent())));
        caret += scaled.h_advance(id);
        previous = Some(id);
    }

    let natural_width = f64::from(caret.ceil().max(1.0));
    let width = natural_width.min(f64::from(max_width)) as u32;
    let shift = ((natural_width - f64::from(width)) / 2.0).floor() as i64;
    let height = ((scaled.ascent() - scaled.descent()).ceil().max(1.0) as u32).min(max_height);
    let mut mask = GrayImage::new(width, height);

    for glyph in glyphs {
        let Some(outlined) = font.outline_glyph(glyph) else {
            continue;
        };
        let bounds = outlined.px_bounds();
        outlined.draw(|x, y, coverage| {
            let px = bounds.min.x as i64 + i64::from(x) - shift;
            let py = bounds.min.y as i64 + i64::from(y);
            if px < 0 || py < 0 || px >= i64::from(width) || py >= i64::from(height) {
                return;
            }
            let value = (coverage.clamp(0.0, 1.0) * 255.0).round() as u8;
            let pixel = mask.get_pixel_mut(px as u32, py as u32);
            pixel.0[0] = pixel.0[0].max(value);
        });
    }

    mask
}

fn render_bitmap(text: &str, size: f32, max_width: u32, max_height: u32) -> GrayImage {
    let factor = ((size / 8.0).round() as u32).clamp(1, (max_height / 8).max(1));
    let cell = 8 * factor;
    let glyphs: Vec<[u8; 8]> = text
        .chars()
        .filter(|c| !c.is_control())
        .filter_map(|c| BASIC_FONTS.get(c).or_else(|| BASIC_FONTS.get('?')))
        .collect();

    let natural_width = (glyphs.len() as u64 * u64::from(cell)).max(1);
    let width = natural_width.min(u64::from(max_width)) as u32;
    let shift = (natural_width - u64::from(width)) / 2;
    let height = cell.min(max_height);
    let mut mask = GrayImage::new(width, height);

    for (index, rows) in glyphs.iter().enumerate() {
        let origin_x = index as u64 * u64::from(cell);
        if origin_x + u64::from(cell) <= shift || origin_x >= shift + u64::from(width) {
            continue;
        }
        for (row, bits) in rows.iter().enumerate() {
            for column in 0..8u32 {
                // Bit 0 is the leftmost pixel.
                if bits & (1 << column) == 0 {
                    continue;
                }
                let x0 = origin_x + u64::from(column * factor);
                let y0 = row as u32 * factor;
                for dy in 0..factor {
                    for dx in 0..factor {
                        let x = x0 + u64::from(dx);
                        let y = y0 + dy;
                        if x < shift || x - shift >= u64::from(width) || y >= height {
                            continue;
                        }
                        mask.put_pixel((x - shift) as u32, y, Luma([255]));
                    }
                }
            }
        }
    }

    mask
}
