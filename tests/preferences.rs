//! Preferences load/save tests.

use std::{path::PathBuf, time::Duration};

use thumbsheet::{
    CellFit, CellSize, Color, ExportFormat, ExportTarget, FontChoice, ImageWatermark, Position,
    Preferences, SamplingPolicy, TextWatermark, ThumbnailError, ThumbnailMode, ThumbnailSpec,
    WatermarkKind, WatermarkSpec,
};

#[test]
fn missing_keys_use_defaults_silently() {
    let loaded = Preferences::from_json(r#"{ "mode": "grid", "rows": 4 }"#).unwrap();
    assert!(loaded.warnings.is_empty());
    assert_eq!(loaded.preferences.mode, ThumbnailMode::Grid);
    assert_eq!(loaded.preferences.rows, 4);
    assert_eq!(loaded.preferences.columns, 3);
    assert_eq!(loaded.preferences.opacity, 0.5);
}

#[test]
fn empty_object_is_all_defaults() {
    let loaded = Preferences::from_json("{}").unwrap();
    assert!(loaded.warnings.is_empty());
    assert_eq!(loaded.preferences, Preferences::default());
}

#[test]
fn out_of_range_opacity_falls_back_with_warning() {
    let loaded = Preferences::from_json(r#"{ "opacity": 1.5, "text": "kept" }"#).unwrap();
    assert_eq!(loaded.preferences.opacity, 0.5);
    assert_eq!(loaded.preferences.text, "kept");
    assert_eq!(loaded.warnings.len(), 1);
    assert_eq!(loaded.warnings[0].key, "opacity");
}

#[test]
fn malformed_keys_are_reported_individually() {
    let loaded = Preferences::from_json(
        r#"{
            "rows": "three",
            "columns": 0,
            "position": "middle",
            "color": "chartreuse-ish",
            "randomize": "yes",
            "output_format": "gif",
            "scale": 0,
            "font_size": 12
        }"#,
    )
    .unwrap();

    let keys: Vec<&str> = loaded.warnings.iter().map(|warning| warning.key.as_str()).collect();
    assert_eq!(
        keys,
        ["rows", "columns", "randomize", "output_format", "position", "color", "scale"]
    );

    let defaults = Preferences::default();
    assert_eq!(loaded.preferences.rows, defaults.rows);
    assert_eq!(loaded.preferences.columns, defaults.columns);
    assert_eq!(loaded.preferences.position, Position::Center);
    assert_eq!(loaded.preferences.color, "#FFFFFF");
    assert_eq!(loaded.preferences.font_size, 12.0);
    assert!(loaded.warnings[0].to_string().contains("rows"));
}

#[test]
fn nulls_clear_optional_values() {
    let loaded = Preferences::from_json(
        r#"{ "timestamp": null, "random_seed": null, "font_path": null, "image_path": "" }"#,
    )
    .unwrap();
    assert!(loaded.warnings.is_empty());
    assert_eq!(loaded.preferences.timestamp, None);
    assert_eq!(loaded.preferences.random_seed, None);
    assert_eq!(loaded.preferences.image_path, None);
}

#[test]
fn non_json_is_a_parse_error() {
    let result = Preferences::from_json("not json at all");
    assert!(matches!(result, Err(ThumbnailError::PreferencesParse(_))));
}

#[test]
fn non_object_root_is_a_parse_error() {
    let result = Preferences::from_json("[1, 2, 3]");
    assert!(matches!(result, Err(ThumbnailError::PreferencesParse(_))));
}

#[test]
fn save_then_load_round_trips() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let path = temporary_directory.path().join("nested").join("prefs.json");

    let preferences = Preferences {
        mode: ThumbnailMode::Grid,
        timestamp: Some(12.5),
        rows: 3,
        columns: 5,
        randomize: true,
        random_seed: Some(99),
        cell_width: Some(160),
        cell_height: Some(90),
        fit: CellFit::Fill,
        output_path: PathBuf::from("sheets/out.png"),
        output_format: ExportFormat::Png,
        watermark: WatermarkKind::Text,
        opacity: 0.25,
        position: Position::BottomLeft,
        text: "sample".to_string(),
        font_path: Some(PathBuf::from("fonts/custom.ttf")),
        font_size: 32.0,
        color: "#00FF00".to_string(),
        image_path: Some(PathBuf::from("logo.png")),
        scale: 0.5,
    };
    preferences.save(&path).unwrap();

    let loaded = Preferences::load(&path).unwrap();
    assert!(loaded.warnings.is_empty(), "{:?}", loaded.warnings);
    assert_eq!(loaded.preferences, preferences);
}

#[test]
fn saved_json_uses_flat_readable_values() {
    let json = Preferences::default().to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["mode"], "single");
    assert_eq!(value["fit"], "letterbox");
    assert_eq!(value["output_format"], "jpg");
    assert_eq!(value["position"], "center");
    assert_eq!(value["watermark"], "none");
}

#[test]
fn load_or_default_tolerates_missing_file() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let preferences = Preferences::load_or_default(temporary_directory.path().join("absent.json"));
    assert_eq!(preferences, Preferences::default());
}

#[test]
fn load_missing_file_is_an_io_error() {
    let result = Preferences::load("definitely/not/here.json");
    assert!(matches!(result, Err(ThumbnailError::Io(_))));
}

// ── Conversions ────────────────────────────────────────────────────

#[test]
fn grid_preferences_build_random_grid_spec() {
    let preferences = Preferences {
        mode: ThumbnailMode::Grid,
        rows: 2,
        columns: 4,
        randomize: true,
        random_seed: Some(5),
        cell_width: Some(100),
        cell_height: Some(50),
        ..Preferences::default()
    };
    let spec = preferences.thumbnail_spec();
    assert_eq!(spec.policy, SamplingPolicy::Random { count: 8, seed: Some(5) });
    assert_eq!((spec.rows, spec.columns), (2, 4));
    assert_eq!(spec.cell, Some(CellSize::new(100, 50)));
    assert!(spec.validate().is_ok());
}

#[test]
fn single_preferences_use_timestamp() {
    let preferences = Preferences {
        timestamp: Some(3.5),
        ..Preferences::default()
    };
    let spec = preferences.thumbnail_spec();
    assert_eq!(spec.policy, SamplingPolicy::At(Duration::from_millis(3_500)));
    assert_eq!((spec.rows, spec.columns), (1, 1));
    assert_eq!(spec.cell, None);
}

#[test]
fn unrepresentable_timestamp_falls_back_with_warning() {
    let loaded = Preferences::from_json(r#"{ "mode": "single", "timestamp": 1e20 }"#).unwrap();
    assert_eq!(loaded.preferences.timestamp, None);
    assert_eq!(loaded.warnings.len(), 1);
    assert_eq!(loaded.warnings[0].key, "timestamp");
    assert_eq!(loaded.preferences.thumbnail_spec().policy, SamplingPolicy::Single);
}

#[test]
fn out_of_range_timestamp_set_directly_uses_midpoint() {
    let preferences = Preferences {
        timestamp: Some(1e20),
        ..Preferences::default()
    };
    assert_eq!(preferences.thumbnail_spec().policy, SamplingPolicy::Single);
}

#[test]
fn half_specified_cell_size_is_ignored() {
    let preferences = Preferences {
        cell_width: Some(100),
        ..Preferences::default()
    };
    assert_eq!(preferences.thumbnail_spec().cell, None);
}

#[test]
fn text_preferences_build_text_watermark() {
    let preferences = Preferences {
        watermark: WatermarkKind::Text,
        text: "mark".to_string(),
        font_path: Some(PathBuf::from("fonts/custom.ttf")),
        color: "#102030".to_string(),
        opacity: 0.8,
        position: Position::TopRight,
        ..Preferences::default()
    };
    let WatermarkSpec::Text(text) = preferences.watermark_spec() else {
        panic!("expected a text watermark");
    };
    assert_eq!(text.content, "mark");
    assert_eq!(text.font, FontChoice::File(PathBuf::from("fonts/custom.ttf")));
    assert_eq!(text.color, Color::rgb(0x10, 0x20, 0x30));
    assert_eq!(text.opacity, 0.8);
    assert_eq!(text.position, Position::TopRight);
}

#[test]
fn image_watermark_without_path_is_skipped() {
    let preferences = Preferences {
        watermark: WatermarkKind::Image,
        ..Preferences::default()
    };
    assert_eq!(preferences.watermark_spec(), WatermarkSpec::None);
}

#[test]
fn export_target_matches_format() {
    let preferences = Preferences {
        output_path: PathBuf::from("out/sheet.png"),
        output_format: ExportFormat::Jpeg,
        ..Preferences::default()
    };
    let target = preferences.export_target();
    assert_eq!(target.path, PathBuf::from("out/sheet.jpg"));
    assert_eq!(target.format, ExportFormat::Jpeg);
}

#[test]
fn capture_reflects_request() {
    let spec = ThumbnailSpec::random_grid(2, 2, Some(11))
        .with_cell_size(64, 36)
        .with_fit(CellFit::Fill);
    let watermark = WatermarkSpec::Image(
        ImageWatermark::new("logo.png")
            .with_scale(0.4)
            .with_opacity(0.6)
            .with_position(Position::BottomRight),
    );
    let target = ExportTarget::new("out.png", ExportFormat::Png);

    let preferences = Preferences::capture(&spec, &watermark, &target);
    assert_eq!(preferences.mode, ThumbnailMode::Grid);
    assert!(preferences.randomize);
    assert_eq!(preferences.random_seed, Some(11));
    assert_eq!(preferences.watermark, WatermarkKind::Image);
    assert_eq!(preferences.image_path, Some(PathBuf::from("logo.png")));
    assert_eq!(preferences.thumbnail_spec(), spec);
    assert_eq!(preferences.watermark_spec(), watermark);
    assert_eq!(preferences.export_target(), target);
}

#[test]
fn capture_of_text_watermark_round_trips() {
    let watermark = WatermarkSpec::Text(
        TextWatermark::new("hello")
            .with_color(Color::rgb(1, 2, 3))
            .with_size(20.0),
    );
    let preferences = Preferences::capture(
        &ThumbnailSpec::at(Duration::from_secs(2)),
        &watermark,
        &ExportTarget::new("a.jpg", ExportFormat::Jpeg),
    );
    assert_eq!(preferences.color, "#010203");
    assert_eq!(preferences.timestamp, Some(2.0));
    assert_eq!(preferences.watermark_spec(), watermark);
}
