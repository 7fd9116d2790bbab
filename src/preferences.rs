//! Persisted user preferences.
//!
//! Preferences are a flat JSON object covering sampling mode, grid layout,
//! output and watermark settings. Saving is a plain `serde` serialization.
//! Loading is deliberately forgiving: every key is validated on its own, and
//! a missing or malformed key keeps its default (malformed keys are reported
//! as [`PreferenceWarning`]s) instead of failing the whole load.
//!
//! Preferences are a value, not a process-wide singleton: convert them into
//! the specs a request needs with [`Preferences::thumbnail_spec`],
//! [`Preferences::watermark_spec`] and [`Preferences::export_target`].
//!
//! # Example
//!
//! ```
//! use thumbsheet::Preferences;
//!
//! let loaded = Preferences::from_json(r#"{ "mode": "grid", "rows": 2, "columns": 4, "opacity": 7 }"#)?;
//! assert_eq!(loaded.preferences.columns, 4);
//! // Out-of-range opacity keeps its default and is reported.
//! assert_eq!(loaded.preferences.opacity, 0.5);
//! assert_eq!(loaded.warnings.len(), 1);
//! # Ok::<(), thumbsheet::ThumbnailError>(())
//! ```

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::{
    error::ThumbnailError,
    export::{ExportFormat, ExportTarget},
    font::FontChoice,
    grid::CellFit,
    pipeline::ThumbnailSpec,
    sampling::SamplingPolicy,
    watermark::{Color, ImageWatermark, Position, TextWatermark, WatermarkSpec},
};

/// Default preferences file name, relative to the working directory.
pub const DEFAULT_PREFERENCES_FILE: &str = "thumbnail_settings.json";

const MAX_GRID_SIDE: u64 = 100;
const MAX_CELL_SIDE: u64 = 8192;

/// Single still or contact-sheet grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ThumbnailMode {
    /// One frame.
    #[default]
    Single,
    /// A rows × columns grid.
    Grid,
}

/// Which watermark variant is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WatermarkKind {
    /// No watermark.
    #[default]
    None,
    /// Text watermark.
    Text,
    /// Image watermark.
    Image,
}

/// Flat, persisted preferences.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Preferences {
    /// Single still or grid.
    pub mode: ThumbnailMode,
    /// Explicit single-mode timestamp in seconds; `None` uses the midpoint.
    pub timestamp: Option<f64>,
    /// Grid rows.
    pub rows: u32,
    /// Grid columns.
    pub columns: u32,
    /// Random rather than evenly spaced grid sampling.
    pub randomize: bool,
    /// Seed for random sampling; `None` uses system entropy.
    pub random_seed: Option<u64>,
    /// Cell width in pixels; `None` derives it.
    pub cell_width: Option<u32>,
    /// Cell height in pixels; `None` derives it.
    pub cell_height: Option<u32>,
    /// How frames fit their cells.
    #[serde(serialize_with = "serialize_fit")]
    pub fit: CellFit,
    /// Output path.
    pub output_path: PathBuf,
    /// Output format.
    #[serde(serialize_with = "serialize_format")]
    pub output_format: ExportFormat,
    /// Watermark variant.
    pub watermark: WatermarkKind,
    /// Watermark opacity in `[0, 1]`.
    pub opacity: f32,
    /// Watermark anchor.
    #[serde(serialize_with = "serialize_position")]
    pub position: Position,
    /// Text watermark content.
    pub text: String,
    /// Text watermark font file; `None` uses a system or built-in font.
    pub font_path: Option<PathBuf>,
    /// Text watermark size in pixels.
    pub font_size: f32,
    /// Text watermark color (`#RRGGBB`, `#RGB`, or a color name).
    pub color: String,
    /// Image watermark path.
    pub image_path: Option<PathBuf>,
    /// Image watermark scale relative to the thumbnail's shorter side.
    pub scale: f32,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            mode: ThumbnailMode::Single,
            timestamp: None,
            rows: 2,
            columns: 3,
            randomize: false,
            random_seed: None,
            cell_width: None,
            cell_height: None,
            fit: CellFit::default(),
            output_path: PathBuf::from("thumbnail.jpg"),
            output_format: ExportFormat::Jpeg,
            watermark: WatermarkKind::None,
            opacity: 0.5,
            position: Position::Center,
            text: String::new(),
            font_path: None,
            font_size: 48.0,
            color: "#FFFFFF".to_string(),
            image_path: None,
            scale: 0.3,
        }
    }
}

fn serialize_fit<S: serde::Serializer>(fit: &CellFit, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(fit.name())
}

fn serialize_format<S: serde::Serializer>(
    format: &ExportFormat,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(format.extension())
}

fn serialize_position<S: serde::Serializer>(
    position: &Position,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(position.name())
}

/// A preference key that was present but malformed and fell back to its
/// default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferenceWarning {
    /// The offending key.
    pub key: String,
    /// What was wrong with it.
    pub message: String,
}

impl Display for PreferenceWarning {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "preference `{}`: {}", self.key, self.message)
    }
}

/// Result of loading preferences: the values plus any recovered problems.
#[derive(Debug, Clone)]
#[must_use]
pub struct LoadedPreferences {
    /// The loaded preferences, with defaults substituted where needed.
    pub preferences: Preferences,
    /// Keys that were malformed and fell back to their defaults.
    pub warnings: Vec<PreferenceWarning>,
}

impl Preferences {
    /// Parse preferences from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`ThumbnailError::PreferencesParse`] only when the text is not
    /// JSON or its root is not an object. Problems with individual keys are
    /// returned as warnings.
    pub fn from_json(text: &str) -> Result<LoadedPreferences, ThumbnailError> {
        let root: Value = serde_json::from_str(text)
            .map_err(|error| ThumbnailError::PreferencesParse(error.to_string()))?;
        let Value::Object(object) = root else {
            return Err(ThumbnailError::PreferencesParse(
                "the root value must be a JSON object".to_string(),
            ));
        };

        let mut reader = FieldReader {
            object: &object,
            warnings: Vec::new(),
        };
        let defaults = Preferences::default();
        let preferences = Preferences {
            mode: reader.named("mode", defaults.mode, |name| match name {
                "single" => Some(ThumbnailMode::Single),
                "grid" => Some(ThumbnailMode::Grid),
                _ => None,
            }),
            timestamp: reader.optional_seconds("timestamp"),
            rows: reader.integer("rows", defaults.rows, MAX_GRID_SIDE),
            columns: reader.integer("columns", defaults.columns, MAX_GRID_SIDE),
            randomize: reader.boolean("randomize", defaults.randomize),
            random_seed: reader.optional_seed("random_seed"),
            cell_width: reader.optional_integer("cell_width", MAX_CELL_SIDE),
            cell_height: reader.optional_integer("cell_height", MAX_CELL_SIDE),
            fit: reader.named("fit", defaults.fit, CellFit::from_name),
            output_path: reader
                .optional_path("output_path")
                .unwrap_or(defaults.output_path),
            output_format: reader.named(
                "output_format",
                defaults.output_format,
                ExportFormat::from_extension,
            ),
            watermark: reader.named("watermark", defaults.watermark, |name| match name {
                "none" => Some(WatermarkKind::None),
                "text" => Some(WatermarkKind::Text),
                "image" => Some(WatermarkKind::Image),
                _ => None,
            }),
            opacity: reader.fraction("opacity", defaults.opacity, true),
            position: reader.named("position", defaults.position, Position::from_name),
            text: reader.string("text", defaults.text),
            font_path: reader.optional_path("font_path"),
            font_size: reader.float_in("font_size", defaults.font_size, 8.0, 512.0),
            color: reader.color("color", defaults.color),
            image_path: reader.optional_path("image_path"),
            scale: reader.fraction("scale", defaults.scale, false),
        };

        for warning in &reader.warnings {
            log::warn!("{warning}; using the default");
        }
        Ok(LoadedPreferences {
            preferences,
            warnings: reader.warnings,
        })
    }

    /// Load preferences from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ThumbnailError::Io`] if the file cannot be read, or
    /// [`ThumbnailError::PreferencesParse`] if it is not a JSON object.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<LoadedPreferences, ThumbnailError> {
        let path = path.as_ref();
        log::debug!("Loading preferences from {}", path.display());
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Load preferences, substituting defaults for an unreadable or
    /// unparseable file.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Preferences {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(loaded) => loaded.preferences,
            Err(error) => {
                log::warn!(
                    "Cannot load preferences from {}: {error}; using defaults",
                    path.display()
                );
                Preferences::default()
            }
        }
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, ThumbnailError> {
        serde_json::to_string_pretty(self)
            .map_err(|error| ThumbnailError::PreferencesParse(error.to_string()))
    }

    /// Write the preferences to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`ThumbnailError::Write`] if the file cannot be written.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ThumbnailError> {
        let path = path.as_ref();
        let json = self.to_json()?;
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|error| ThumbnailError::write(path, error))?;
        }
        fs::write(path, json + "\n").map_err(|error| ThumbnailError::write(path, error))?;
        log::debug!("Saved preferences to {}", path.display());
        Ok(())
    }

    /// Capture the settings of a request as preferences.
    pub fn capture(spec: &ThumbnailSpec, watermark: &WatermarkSpec, target: &ExportTarget) -> Self {
        let defaults = Preferences::default();
        let mut preferences = Preferences {
            rows: spec.rows,
            columns: spec.columns,
            cell_width: spec.cell.map(|cell| cell.width),
            cell_height: spec.cell.map(|cell| cell.height),
            fit: spec.fit,
            output_path: target.path.clone(),
            output_format: target.format,
            ..defaults
        };

        match spec.policy {
            SamplingPolicy::Single => preferences.mode = ThumbnailMode::Single,
            SamplingPolicy::At(timestamp) => {
                preferences.mode = ThumbnailMode::Single;
                preferences.timestamp = Some(timestamp.as_secs_f64());
            }
            SamplingPolicy::EvenlySpaced { .. } => preferences.mode = ThumbnailMode::Grid,
            SamplingPolicy::Random { seed, .. } => {
                preferences.mode = ThumbnailMode::Grid;
                preferences.randomize = true;
                preferences.random_seed = seed;
            }
        }
        if preferences.mode == ThumbnailMode::Single {
            preferences.rows = defaults.rows;
            preferences.columns = defaults.columns;
        }

        match watermark {
            WatermarkSpec::None => {}
            WatermarkSpec::Text(text) => {
                preferences.watermark = WatermarkKind::Text;
                preferences.text = text.content.clone();
                preferences.font_path = text.font.path().map(Path::to_path_buf);
                preferences.font_size = text.size;
                preferences.color = text.color.to_hex();
                preferences.opacity = text.opacity;
                preferences.position = text.position;
            }
            WatermarkSpec::Image(logo) => {
                preferences.watermark = WatermarkKind::Image;
                preferences.image_path = Some(logo.path.clone());
                preferences.scale = logo.scale;
                preferences.opacity = logo.opacity;
                preferences.position = logo.position;
            }
        }

        preferences
    }

    /// The thumbnail layout these preferences describe.
    pub fn thumbnail_spec(&self) -> ThumbnailSpec {
        let spec = match self.mode {
            ThumbnailMode::Single => match self.timestamp.map(Duration::try_from_secs_f64) {
                Some(Ok(timestamp)) => ThumbnailSpec::at(timestamp),
                Some(Err(_)) => {
                    log::warn!("Ignoring unrepresentable timestamp {:?}", self.timestamp);
                    ThumbnailSpec::single()
                }
                None => ThumbnailSpec::single(),
            },
            ThumbnailMode::Grid if self.randomize => {
                ThumbnailSpec::random_grid(self.rows, self.columns, self.random_seed)
            }
            ThumbnailMode::Grid => ThumbnailSpec::grid(self.rows, self.columns),
        };
        let spec = spec.with_fit(self.fit);
        match (self.cell_width, self.cell_height) {
            (Some(width), Some(height)) => spec.with_cell_size(width, height),
            _ => spec,
        }
    }

    /// The watermark these preferences describe.
    pub fn watermark_spec(&self) -> WatermarkSpec {
        match self.watermark {
            WatermarkKind::None => WatermarkSpec::None,
            WatermarkKind::Text => WatermarkSpec::Text(
                TextWatermark::new(self.text.clone())
                    .with_font(
                        self.font_path
                            .clone()
                            .map(FontChoice::File)
                            .unwrap_or_default(),
                    )
                    .with_size(self.font_size)
                    .with_color(Color::parse_or_white(&self.color))
                    .with_opacity(self.opacity)
                    .with_position(self.position),
            ),
            WatermarkKind::Image => match &self.image_path {
                Some(path) => WatermarkSpec::Image(
                    ImageWatermark::new(path.clone())
                        .with_scale(self.scale)
                        .with_opacity(self.opacity)
                        .with_position(self.position),
                ),
                None => {
                    log::warn!("Image watermark enabled without an image path; skipping it");
                    WatermarkSpec::None
                }
            },
        }
    }

    /// The export target these preferences describe.
    ///
    /// An output path whose extension names the other format is corrected to
    /// match `output_format`.
    pub fn export_target(&self) -> ExportTarget {
        let mut path = self.output_path.clone();
        let named = path
            .extension()
            .and_then(|extension| extension.to_str())
            .and_then(ExportFormat::from_extension);
        if named.is_some_and(|format| format != self.output_format) {
            path.set_extension(self.output_format.extension());
        }
        ExportTarget::new(path, self.output_format)
    }
}

/// Per-key validation over a JSON object, collecting warnings.
struct FieldReader<'a> {
    object: &'a Map<String, Value>,
    warnings: Vec<PreferenceWarning>,
}

impl FieldReader<'_> {
    fn warn(&mut self, key: &str, message: impl Into<String>) {
        self.warnings.push(PreferenceWarning {
            key: key.to_string(),
            message: message.into(),
        });
    }

    fn named<T>(&mut self, key: &str, default: T, parse: impl Fn(&str) -> Option<T>) -> T {
        match self.object.get(key) {
            None => default,
            Some(Value::String(name)) => match parse(&name.trim().to_ascii_lowercase()) {
                Some(value) => value,
                None => {
                    self.warn(key, format!("unknown value {name:?}"));
                    default
                }
            },
            Some(other) => {
                self.warn(key, format!("expected a string, found {other}"));
                default
            }
        }
    }

    fn integer(&mut self, key: &str, default: u32, max: u64) -> u32 {
        match self.object.get(key) {
            None => default,
            Some(value) => match value.as_u64() {
                Some(number) if (1..=max).contains(&number) => number as u32,
                _ => {
                    self.warn(key, format!("expected an integer in 1..={max}, found {value}"));
                    default
                }
            },
        }
    }

    fn optional_integer(&mut self, key: &str, max: u64) -> Option<u32> {
        match self.object.get(key) {
            None | Some(Value::Null) => None,
            Some(value) => match value.as_u64() {
                Some(number) if (1..=max).contains(&number) => Some(number as u32),
                _ => {
                    self.warn(key, format!("expected an integer in 1..={max}, found {value}"));
                    None
                }
            },
        }
    }

    fn optional_seed(&mut self, key: &str) -> Option<u64> {
        match self.object.get(key) {
            None | Some(Value::Null) => None,
            Some(value) => value.as_u64().or_else(|| {
                self.warn(key, format!("expected a non-negative integer, found {value}"));
                None
            }),
        }
    }

    fn optional_seconds(&mut self, key: &str) -> Option<f64> {
        match self.object.get(key) {
            None | Some(Value::Null) => None,
            Some(value) => match value.as_f64() {
                Some(seconds) if Duration::try_from_secs_f64(seconds).is_ok() => Some(seconds),
                _ => {
                    self.warn(key, format!("expected a non-negative number of seconds, found {value}"));
                    None
                }
            },
        }
    }

    fn boolean(&mut self, key: &str, default: bool) -> bool {
        match self.object.get(key) {
            None => default,
            Some(Value::Bool(flag)) => *flag,
            Some(other) => {
                self.warn(key, format!("expected true or false, found {other}"));
                default
            }
        }
    }

    fn float_in(&mut self, key: &str, default: f32, min: f32, max: f32) -> f32 {
        match self.object.get(key) {
            None => default,
            Some(value) => match value.as_f64() {
                Some(number) if (min as f64..=max as f64).contains(&number) => number as f32,
                _ => {
                    self.warn(key, format!("expected a number in {min}..={max}, found {value}"));
                    default
                }
            },
        }
    }

    /// A number in `[0, 1]`, or `(0, 1]` when zero is not allowed.
    fn fraction(&mut self, key: &str, default: f32, allow_zero: bool) -> f32 {
        match self.object.get(key) {
            None => default,
            Some(value) => match value.as_f64() {
                Some(number) if number <= 1.0 && (number > 0.0 || (allow_zero && number == 0.0)) => {
                    number as f32
                }
                _ => {
                    let range = if allow_zero { "[0, 1]" } else { "(0, 1]" };
                    self.warn(key, format!("expected a number in {range}, found {value}"));
                    default
                }
            },
        }
    }

    fn string(&mut self, key: &str, default: String) -> String {
        match self.object.get(key) {
            None => default,
            Some(Value::String(text)) => text.clone(),
            Some(other) => {
                self.warn(key, format!("expected a string, found {other}"));
                default
            }
        }
    }

    fn color(&mut self, key: &str, default: String) -> String {
        let value = self.string(key, default.clone());
        if Color::parse(&value).is_some() {
            value
        } else {
            self.warn(key, format!("unrecognised color {value:?}"));
            default
        }
    }

    fn optional_path(&mut self, key: &str) -> Option<PathBuf> {
        match self.object.get(key) {
            None | Some(Value::Null) => None,
            Some(Value::String(text)) if text.trim().is_empty() => None,
            Some(Value::String(text)) => Some(PathBuf::from(text)),
            Some(other) => {
                self.warn(key, format!("expected a path string, found {other}"));
                None
            }
        }
    }
}
