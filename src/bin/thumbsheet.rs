use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use thumbsheet::{
    CellFit, Color, DEFAULT_JPEG_QUALITY, DEFAULT_PREFERENCES_FILE, ExportFormat, Exporter,
    FfmpegLogLevel, FileExporter, FontChoice, FrameSource, GenerateOptions, Position, Preferences,
    Request, Stage, ThumbnailMode, VideoFile, WatermarkKind, WatermarkSpec, Worker, pipeline,
};

const CLI_AFTER_HELP: &str = "Examples:\n  thumbsheet metadata input.mp4 --json\n  thumbsheet generate input.mp4 --out still.jpg --timestamp 0:01:30\n  thumbsheet generate input.mp4 --out sheet.png --mode grid --rows 3 --columns 4 --progress\n  thumbsheet generate input.mp4 --preferences thumbnail_settings.json\n  thumbsheet completions zsh > _thumbsheet";

#[derive(Debug, Parser)]
#[command(
    name = "thumbsheet",
    version,
    about = "Generate thumbnails and contact sheets from video files",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show additional logging output.
    #[arg(long, global = true)]
    verbose: bool,

    /// Show a progress bar.
    #[arg(long, global = true)]
    progress: bool,

    /// Allow overwriting existing output files.
    #[arg(long, global = true)]
    overwrite: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long, global = true)]
    log_level: Option<FfmpegLogLevel>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print metadata for a video file.
    #[command(
        about = "Print video metadata",
        visible_alias = "probe",
        after_help = "Examples:\n  thumbsheet metadata input.mp4\n  thumbsheet metadata input.mp4 --json"
    )]
    Metadata {
        /// Input video path.
        input: PathBuf,

        /// Output metadata as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate a thumbnail or contact sheet.
    #[command(
        about = "Generate a thumbnail",
        after_help = "Flags override values loaded with --preferences.\n\nExamples:\n  thumbsheet generate input.mp4 --out thumb.jpg\n  thumbsheet generate input.mp4 --out grid.png --mode grid --rows 2 --columns 3 --random --seed 7\n  thumbsheet generate input.mp4 --out marked.jpg --text \"(c) me\" --position bottom-right --opacity 0.6"
    )]
    Generate(Box<GenerateArgs>),

    /// Create or inspect a preferences file.
    #[command(about = "Manage the preferences file")]
    Preferences {
        #[command(subcommand)]
        action: PreferencesAction,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Parser)]
struct GenerateArgs {
    /// Input video path.
    input: PathBuf,

    /// Output image path (.jpg, .jpeg or .png).
    #[arg(long)]
    out: Option<PathBuf>,

    /// Load defaults from a preferences file.
    #[arg(long)]
    preferences: Option<PathBuf>,

    /// Save the effective settings to a preferences file.
    #[arg(long)]
    save_preferences: Option<PathBuf>,

    /// Thumbnail mode: single | grid.
    #[arg(long, value_parser = parse_mode)]
    mode: Option<ThumbnailMode>,

    /// Single-mode timestamp (seconds, MM:SS or HH:MM:SS).
    #[arg(long, value_parser = parse_timecode)]
    timestamp: Option<Duration>,

    /// Grid rows.
    #[arg(long)]
    rows: Option<u32>,

    /// Grid columns.
    #[arg(long)]
    columns: Option<u32>,

    /// Sample grid timestamps randomly.
    #[arg(long)]
    random: bool,

    /// Seed for random sampling.
    #[arg(long)]
    seed: Option<u64>,

    /// Cell size as WIDTHxHEIGHT.
    #[arg(long, value_parser = parse_cell_size)]
    cell: Option<(u32, u32)>,

    /// Cell fit: fill | letterbox.
    #[arg(long, value_parser = parse_fit)]
    fit: Option<CellFit>,

    /// Output format: jpg | png. Defaults to the output extension.
    #[arg(long, value_parser = parse_format)]
    format: Option<ExportFormat>,

    /// JPEG quality (1-100).
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY)]
    quality: u8,

    /// Text watermark.
    #[arg(long, conflicts_with = "image")]
    text: Option<String>,

    /// Image watermark path.
    #[arg(long)]
    image: Option<PathBuf>,

    /// Disable any watermark from the preferences file.
    #[arg(long, conflicts_with_all = ["text", "image"])]
    no_watermark: bool,

    /// Watermark opacity (0-1).
    #[arg(long, value_parser = parse_opacity)]
    opacity: Option<f32>,

    /// Watermark position: top-left | top-right | center | bottom-left | bottom-right.
    #[arg(long, value_parser = parse_position)]
    position: Option<Position>,

    /// Text color (#RRGGBB, #RGB or a color name).
    #[arg(long, value_parser = parse_color)]
    color: Option<Color>,

    /// Font file for the text watermark.
    #[arg(long, conflicts_with = "builtin_font")]
    font: Option<PathBuf>,

    /// Draw the text watermark with the built-in bitmap font.
    #[arg(long)]
    builtin_font: bool,

    /// Font size in pixels (8-512).
    #[arg(long, value_parser = parse_font_size)]
    font_size: Option<f32>,

    /// Image watermark scale relative to the thumbnail's shorter side (0-1].
    #[arg(long, value_parser = parse_scale)]
    scale: Option<f32>,

    /// Write a preview whose longer edge is at most this many pixels.
    #[arg(long)]
    preview: Option<u32>,
}

#[derive(Debug, Subcommand)]
enum PreferencesAction {
    /// Write a preferences file with default values.
    Init {
        #[arg(default_value = DEFAULT_PREFERENCES_FILE)]
        path: PathBuf,
    },
    /// Print the effective preferences and any problems found.
    Show {
        #[arg(default_value = DEFAULT_PREFERENCES_FILE)]
        path: PathBuf,
    },
}

fn parse_timecode(value: &str) -> Result<Duration, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("time value cannot be empty".to_string());
    }

    let invalid = || format!("invalid time format: {trimmed}");
    let seconds = if let Ok(seconds) = trimmed.parse::<f64>() {
        seconds
    } else {
        let parts: Vec<&str> = trimmed.split(':').collect();
        let (hours, minutes, seconds) = match parts.as_slice() {
            [minutes, seconds] => ("0", *minutes, *seconds),
            [hours, minutes, seconds] => (*hours, *minutes, *seconds),
            _ => return Err(invalid()),
        };
        let hours = hours.parse::<u64>().map_err(|_| invalid())?;
        let minutes = minutes.parse::<u64>().map_err(|_| invalid())?;
        let seconds = seconds.parse::<f64>().map_err(|_| invalid())?;
        hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds
    };

    Duration::try_from_secs_f64(seconds).map_err(|_| invalid())
}

fn parse_number_in(value: &str, accepts: impl Fn(f32) -> bool, range: &str) -> Result<f32, String> {
    match value.trim().parse::<f32>() {
        Ok(number) if number.is_finite() && accepts(number) => Ok(number),
        _ => Err(format!("expected a number in {range}, got {value}")),
    }
}

fn parse_opacity(value: &str) -> Result<f32, String> {
    parse_number_in(value, |opacity| (0.0..=1.0).contains(&opacity), "0-1")
}

fn parse_font_size(value: &str) -> Result<f32, String> {
    parse_number_in(value, |size| (8.0..=512.0).contains(&size), "8-512")
}

fn parse_scale(value: &str) -> Result<f32, String> {
    parse_number_in(value, |scale| scale > 0.0 && scale <= 1.0, "(0, 1]")
}

fn parse_cell_size(value: &str) -> Result<(u32, u32), String> {
    let invalid = || format!("expected WIDTHxHEIGHT, got {value}");
    let (width, height) = value
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(invalid)?;
    let width = width.trim().parse::<u32>().map_err(|_| invalid())?;
    let height = height.trim().parse::<u32>().map_err(|_| invalid())?;
    if width == 0 || height == 0 {
        return Err(format!("cell size must be non-zero, got {value}"));
    }
    Ok((width, height))
}

fn parse_mode(value: &str) -> Result<ThumbnailMode, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "single" => Ok(ThumbnailMode::Single),
        "grid" => Ok(ThumbnailMode::Grid),
        _ => Err(format!("unsupported mode: {value} (single|grid)")),
    }
}

fn parse_fit(value: &str) -> Result<CellFit, String> {
    CellFit::from_name(&value.trim().to_ascii_lowercase())
        .ok_or_else(|| format!("unsupported fit: {value} (fill|letterbox)"))
}

fn parse_format(value: &str) -> Result<ExportFormat, String> {
    ExportFormat::from_extension(value).ok_or_else(|| format!("unsupported format: {value} (jpg|png)"))
}

fn parse_position(value: &str) -> Result<Position, String> {
    Position::from_name(&value.trim().to_ascii_lowercase())
        .ok_or_else(|| format!("unsupported position: {value}"))
}

fn parse_color(value: &str) -> Result<Color, String> {
    Color::parse(value).ok_or_else(|| format!("unsupported color: {value}"))
}

fn ensure_writable_path(path: &Path, overwrite: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        if overwrite {
            eprintln!(
                "{} {}",
                "warning:".yellow().bold(),
                format!("overwriting {}", path.display()).yellow()
            );
        } else {
            return Err(format!(
                "output already exists: {} (use --overwrite to replace)",
                path.display()
            )
            .into());
        }
    }
    Ok(())
}

fn init_logging(global: &GlobalOptions) {
    let level = if global.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::builder()
        .filter_level(level)
        .parse_default_env()
        .init();

    if let Some(level) = global.log_level {
        thumbsheet::set_ffmpeg_log_level(level);
    } else if !global.verbose {
        thumbsheet::set_ffmpeg_log_level(FfmpegLogLevel::Error);
    }
}

/// Fold command-line overrides into the loaded preferences.
fn merge_arguments(mut preferences: Preferences, args: &GenerateArgs) -> Preferences {
    if let Some(out) = &args.out {
        preferences.output_path = out.clone();
        if let Some(format) = out
            .extension()
            .and_then(|extension| extension.to_str())
            .and_then(ExportFormat::from_extension)
        {
            preferences.output_format = format;
        }
    }
    if let Some(format) = args.format {
        preferences.output_format = format;
    }

    if let Some(timestamp) = args.timestamp {
        preferences.mode = ThumbnailMode::Single;
        preferences.timestamp = Some(timestamp.as_secs_f64());
    }
    if args.rows.is_some() || args.columns.is_some() || args.random {
        preferences.mode = ThumbnailMode::Grid;
    }
    if let Some(mode) = args.mode {
        preferences.mode = mode;
    }
    if let Some(rows) = args.rows {
        preferences.rows = rows;
    }
    if let Some(columns) = args.columns {
        preferences.columns = columns;
    }
    if args.random {
        preferences.randomize = true;
    }
    if args.seed.is_some() {
        preferences.random_seed = args.seed;
    }
    if let Some((width, height)) = args.cell {
        preferences.cell_width = Some(width);
        preferences.cell_height = Some(height);
    }
    if let Some(fit) = args.fit {
        preferences.fit = fit;
    }

    if args.no_watermark {
        preferences.watermark = WatermarkKind::None;
    }
    if let Some(text) = &args.text {
        preferences.watermark = WatermarkKind::Text;
        preferences.text = text.clone();
    }
    if let Some(image) = &args.image {
        preferences.watermark = WatermarkKind::Image;
        preferences.image_path = Some(image.clone());
    }
    if let Some(opacity) = args.opacity {
        preferences.opacity = opacity;
    }
    if let Some(position) = args.position {
        preferences.position = position;
    }
    if let Some(color) = args.color {
        preferences.color = color.to_hex();
    }
    if let Some(font) = &args.font {
        preferences.font_path = Some(font.clone());
    }
    if let Some(size) = args.font_size {
        preferences.font_size = size;
    }
    if let Some(scale) = args.scale {
        preferences.scale = scale;
    }

    preferences
}

fn progress_bar() -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let bar = ProgressBar::new(100);
    let style = ProgressStyle::with_template("{spinner:.green} {bar:40.cyan/blue} {pos:>3}% {msg}")?;
    bar.set_style(style.progress_chars("##-"));
    Ok(bar)
}

fn stage_label(stage: Stage) -> &'static str {
    match stage {
        Stage::Extraction => "extracting frames",
        Stage::Compositing => "compositing",
        Stage::Watermarking => "watermarking",
        Stage::Exporting => "exporting",
        _ => "working",
    }
}

fn generate(args: &GenerateArgs, global: &GlobalOptions) -> Result<(), Box<dyn std::error::Error>> {
    let preferences = match &args.preferences {
        Some(path) => {
            let loaded = Preferences::load(path)?;
            for warning in &loaded.warnings {
                eprintln!("{} {}", "warning:".yellow().bold(), warning.to_string().yellow());
            }
            loaded.preferences
        }
        None => Preferences::default(),
    };
    let preferences = merge_arguments(preferences, args);

    let spec = preferences.thumbnail_spec();
    let mut watermark = preferences.watermark_spec();
    if args.builtin_font {
        if let WatermarkSpec::Text(text) = &mut watermark {
            text.font = FontChoice::Builtin;
        }
    }
    let target = preferences.export_target().with_jpeg_quality(args.quality);
    spec.validate()?;
    ensure_writable_path(&target.path, global.overwrite)?;

    if let Some(path) = &args.save_preferences {
        Preferences::capture(&spec, &watermark, &target).save(path)?;
        if global.verbose {
            eprintln!("saved preferences -> {}", path.display());
        }
    }

    let video = VideoFile::open(&args.input)?;
    if global.verbose {
        let metadata = video.metadata();
        eprintln!(
            "opened {} ({}, {:.2}s)",
            args.input.display(),
            metadata.resolution(),
            metadata.duration.as_secs_f64()
        );
    }

    if let Some(max_dimension) = args.preview {
        let mut video = video;
        let image = pipeline::preview(
            &mut video,
            &spec,
            &watermark,
            &GenerateOptions::default(),
            max_dimension,
        )?;
        let path = FileExporter.export(&image, &target)?;
        println!(
            "{} {}",
            "preview".green().bold(),
            format!("{} ({}x{})", path.display(), image.width(), image.height()).green()
        );
        return Ok(());
    }

    let worker = Worker::new();
    let job = worker.submit(video, FileExporter, Request::new(spec, watermark, target))?;

    let bar = if global.progress {
        Some(progress_bar()?)
    } else {
        None
    };
    for info in job.progress().iter() {
        if let Some(bar) = &bar {
            bar.set_position(info.percentage.round() as u64);
            bar.set_message(stage_label(info.stage));
        } else if global.verbose {
            eprintln!(
                "{} {:>3.0}% {}",
                "progress".cyan().bold(),
                info.percentage,
                stage_label(info.stage)
            );
        }
    }

    let generated = job.wait();
    if let Some(bar) = bar {
        match &generated {
            Ok(_) => bar.finish_with_message("done"),
            Err(_) => bar.abandon_with_message("failed"),
        }
    }
    let generated = generated?;

    println!(
        "{} {}",
        "saved".green().bold(),
        format!(
            "{} ({}x{})",
            generated.path.display(),
            generated.image.width(),
            generated.image.height()
        )
        .green()
    );
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(&cli.global);

    match cli.command {
        Commands::Metadata { input, json } => {
            let video = VideoFile::open(&input)?;
            let metadata = video.metadata();
            if json {
                let payload = json!({
                    "path": input.display().to_string(),
                    "format": metadata.format,
                    "codec": metadata.codec,
                    "duration_seconds": metadata.duration.as_secs_f64(),
                    "width": metadata.width,
                    "height": metadata.height,
                    "fps": metadata.frames_per_second,
                    "frame_count": metadata.frame_count,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!("Format: {}", metadata.format);
                println!("Duration: {:.3}s", metadata.duration.as_secs_f64());
                println!(
                    "Video: {} @ {:.2} fps [{}]",
                    metadata.resolution(),
                    metadata.frames_per_second,
                    metadata.codec,
                );
                println!("Frames: {}", metadata.frame_count);
            }
        }
        Commands::Generate(args) => generate(&args, &cli.global)?,
        Commands::Preferences { action } => match action {
            PreferencesAction::Init { path } => {
                ensure_writable_path(&path, cli.global.overwrite)?;
                Preferences::default().save(&path)?;
                println!("{} {}", "saved".green().bold(), path.display());
            }
            PreferencesAction::Show { path } => {
                let loaded = Preferences::load(&path)?;
                for warning in &loaded.warnings {
                    eprintln!("{} {}", "warning:".yellow().bold(), warning.to_string().yellow());
                }
                println!("{}", loaded.preferences.to_json()?);
            }
        },
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "thumbsheet", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use std::{path::PathBuf, time::Duration};

    use thumbsheet::{FfmpegLogLevel, Preferences, ThumbnailMode, WatermarkKind};

    use super::{
        Cli, GenerateArgs, merge_arguments, parse_cell_size, parse_color, parse_font_size,
        parse_mode, parse_opacity, parse_scale, parse_timecode,
    };
    use clap::{CommandFactory, Parser};

    fn generate_args(arguments: &[&str]) -> GenerateArgs {
        let mut argv = vec!["thumbsheet-generate", "input.mp4"];
        argv.extend_from_slice(arguments);
        GenerateArgs::parse_from(argv)
    }

    #[test]
    fn parse_timecode_formats() {
        assert_eq!(parse_timecode("75").unwrap().as_secs(), 75);
        assert_eq!(parse_timecode("01:15").unwrap().as_secs(), 75);
        assert_eq!(
            parse_timecode("00:01:15.5").unwrap(),
            Duration::from_millis(75_500)
        );
        assert!(parse_timecode("").is_err());
        assert!(parse_timecode("-3").is_err());
        assert!(parse_timecode("1:2:3:4").is_err());
        assert!(parse_timecode("1e30").is_err());
        assert!(parse_timecode("NaN").is_err());
    }

    #[test]
    fn parse_cell_size_accepts_width_by_height() {
        assert_eq!(parse_cell_size("320x180").unwrap(), (320, 180));
        assert_eq!(parse_cell_size("640X360").unwrap(), (640, 360));
        assert!(parse_cell_size("320").is_err());
        assert!(parse_cell_size("0x180").is_err());
    }

    #[test]
    fn watermark_numbers_are_range_checked() {
        assert_eq!(parse_opacity("0.25"), Ok(0.25));
        assert!(parse_opacity("NaN").is_err());
        assert!(parse_opacity("1.5").is_err());
        assert_eq!(parse_font_size("64"), Ok(64.0));
        assert!(parse_font_size("1e9").is_err());
        assert!(parse_font_size("inf").is_err());
        assert!(parse_scale("0").is_err());
        assert_eq!(parse_scale("1"), Ok(1.0));
        assert!(GenerateArgs::try_parse_from(["generate", "input.mp4", "--opacity", "NaN"]).is_err());
    }

    #[test]
    fn parse_mode_and_color() {
        assert_eq!(parse_mode("GRID").unwrap(), ThumbnailMode::Grid);
        assert!(parse_mode("smart").is_err());
        assert_eq!(parse_color("#ff0000").unwrap().0, [255, 0, 0]);
        assert!(parse_color("not-a-color").is_err());
    }

    #[test]
    fn log_level_flag_parses_names() {
        let cli = Cli::parse_from(["thumbsheet", "--log-level", "warn", "metadata", "input.mp4"]);
        assert_eq!(cli.global.log_level, Some(FfmpegLogLevel::Warning));
        assert!(Cli::try_parse_from(["thumbsheet", "--log-level", "loud", "metadata", "x"]).is_err());
        assert_eq!("Debug".parse::<FfmpegLogLevel>(), Ok(FfmpegLogLevel::Debug));
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn grid_flags_switch_to_grid_mode() {
        let args = generate_args(&["--rows", "3", "--columns", "4", "--out", "sheet.png"]);
        let merged = merge_arguments(Preferences::default(), &args);
        assert_eq!(merged.mode, ThumbnailMode::Grid);
        assert_eq!((merged.rows, merged.columns), (3, 4));
        assert_eq!(merged.output_path, PathBuf::from("sheet.png"));
        assert_eq!(merged.export_target().path, PathBuf::from("sheet.png"));
    }

    #[test]
    fn flags_override_loaded_preferences() {
        let loaded = Preferences::from_json(
            r#"{ "mode": "grid", "watermark": "text", "text": "kept", "opacity": 0.2 }"#,
        )
        .unwrap();
        let args = generate_args(&["--mode", "single", "--opacity", "0.9"]);
        let merged = merge_arguments(loaded.preferences, &args);
        assert_eq!(merged.mode, ThumbnailMode::Single);
        assert_eq!(merged.watermark, WatermarkKind::Text);
        assert_eq!(merged.text, "kept");
        assert_eq!(merged.opacity, 0.9);

        let cleared = merge_arguments(merged, &generate_args(&["--no-watermark"]));
        assert_eq!(cleared.watermark, WatermarkKind::None);
    }
}
