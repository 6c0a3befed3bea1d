//! geotrace: command-line front end for the contour pipeline.
//!
//! One subcommand per step of the interactive workflow:
//!
//! - `palette`: dominant colors of an image
//! - `contour-image`: the filled raster of the regions nearest to the
//!   selected colors
//! - `contours`: plain Otsu contours of an image
//! - `transform`: map contours into a reference space from point pairs
//!
//! Results go to stdout as JSON (or to the file named by `--output`).
//! Progress messages and diagnostics go to stderr.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin geotrace -- palette --clusters 6 map.png
//! cargo run --release --bin geotrace -- contour-image map.png \
//!     --palette '[[250,40,10],[10,60,230]]' --selected '[[250,40,10]]' \
//!     --output fields.png --report
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod wire;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand, ValueEnum};
use geotrace_pipeline::diagnostics::{self, Clock};
use geotrace_pipeline::transform::{self, reprojection_errors};
use geotrace_pipeline::{
    Color, ContourApproximation, ContourConfig, Dimensions, EraseRect, HomographyMethod, Palette,
    QuantizeConfig, RansacConfig, RgbImage, Transform,
};
use serde::de::DeserializeOwned;

use crate::wire::{
    ColoursResponse, ContoursInput, ContoursResponse, TransformResponse, WirePair,
    contours_to_pixels, contours_to_wire, pairs_from_wire,
};

/// Extract color-selected contours from raster images and georeference
/// them with point correspondences.
#[derive(Parser)]
#[command(name = "geotrace", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the dominant colors of an image.
    Palette(PaletteArgs),
    /// Write the filled contour raster for a color selection.
    ContourImage(ContourImageArgs),
    /// Print the outer contours of an Otsu-thresholded image.
    Contours(ContoursArgs),
    /// Map contours into a reference space from point correspondences.
    Transform(TransformArgs),
}

/// Diagnostics output shared by the pipeline subcommands.
#[derive(Args)]
struct ReportArgs {
    /// Print per-stage diagnostics to stderr.
    #[arg(long)]
    report: bool,

    /// Print diagnostics as JSON instead of a human-readable report.
    #[arg(long, requires = "report")]
    json: bool,
}

#[derive(Args)]
struct PaletteArgs {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Contrast scale applied before clustering.
    #[arg(long, default_value_t = QuantizeConfig::DEFAULT_CONTRAST_ALPHA)]
    contrast_alpha: f64,

    /// Contrast bias applied before clustering.
    #[arg(long, default_value_t = QuantizeConfig::DEFAULT_CONTRAST_BETA, allow_hyphen_values = true)]
    contrast_beta: f64,

    /// Number of colors to find.
    #[arg(long, default_value_t = QuantizeConfig::DEFAULT_CLUSTERS)]
    clusters: usize,

    /// Pixels sampled per mini-batch step.
    #[arg(long, default_value_t = QuantizeConfig::DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Upper bound on passes over the pixels.
    #[arg(long, default_value_t = QuantizeConfig::DEFAULT_MAX_ITER)]
    max_iter: usize,

    /// RNG seed.
    #[arg(long, default_value_t = QuantizeConfig::DEFAULT_SEED)]
    seed: u64,

    /// Write the contrast-adjusted image to this PNG file.
    #[arg(long)]
    adjusted: Option<PathBuf>,

    /// Full quantize config as a JSON string.
    ///
    /// When provided, all other clustering flags are ignored.
    #[arg(long)]
    config_json: Option<String>,

    #[command(flatten)]
    report: ReportArgs,
}

#[derive(Args)]
struct ContourImageArgs {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Palette as JSON `[[r, g, b], ...]`, or `@FILE` to read it from a file.
    #[arg(long)]
    palette: String,

    /// Selected colors as JSON `[[r, g, b], ...]`, or `@FILE`.
    #[arg(long)]
    selected: String,

    /// Erase rectangles as JSON `[{"x", "y", "width", "height"}, ...]`, or `@FILE`.
    #[arg(long)]
    erase: Option<String>,

    /// Contrast scale applied before classification.
    #[arg(long, default_value_t = ContourConfig::DEFAULT_CONTRAST_ALPHA)]
    contrast_alpha: f64,

    /// Contrast bias applied before classification.
    #[arg(long, default_value_t = ContourConfig::DEFAULT_CONTRAST_BETA, allow_hyphen_values = true)]
    contrast_beta: f64,

    /// Dilation passes on the mask before tracing.
    #[arg(long, default_value_t = ContourConfig::DEFAULT_DILATE_ITERATIONS)]
    dilate_iterations: u32,

    /// Erosion passes on the filled raster after tracing.
    #[arg(long, default_value_t = ContourConfig::DEFAULT_ERODE_ITERATIONS)]
    erode_iterations: u32,

    /// Drop contours enclosing less than this many square pixels.
    #[arg(long, default_value_t = ContourConfig::DEFAULT_MIN_AREA)]
    min_area: f64,

    /// Vertex reduction for traced boundaries.
    #[arg(long, value_enum, default_value_t = Approximation::Simple)]
    approximation: Approximation,

    /// Where to write the filled raster (PNG).
    #[arg(long)]
    output: PathBuf,

    /// Also write the traced contours as an SVG overlay.
    #[arg(long)]
    svg: Option<PathBuf>,

    /// Full contour config as a JSON string.
    ///
    /// When provided, all other contour flags (including `--erase`) are
    /// ignored.
    #[arg(long)]
    config_json: Option<String>,

    #[command(flatten)]
    report: ReportArgs,
}

#[derive(Args)]
struct ContoursArgs {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Also write the contours as an SVG overlay.
    #[arg(long)]
    svg: Option<PathBuf>,
}

#[derive(Args)]
struct TransformArgs {
    /// JSON file with contours (`[[[x, y], ...], ...]` or `{"contours": ...}`).
    #[arg(long)]
    contours: PathBuf,

    /// JSON file with `[[{"x", "y"}, {"x", "y"}], ...]` source/destination pairs.
    #[arg(long)]
    pairs: PathBuf,

    /// Transform model.
    #[arg(long, value_enum, default_value_t = Mode::Affine)]
    mode: Mode,

    /// Inlier distance for `--mode ransac`.
    #[arg(long, default_value_t = RansacConfig::DEFAULT_INLIER_THRESHOLD)]
    inlier_threshold: f64,

    /// Also write the transformed contours as GeoJSON.
    #[arg(long)]
    geojson: Option<PathBuf>,
}

/// Vertex reduction selection.
#[derive(Clone, Copy, ValueEnum)]
enum Approximation {
    /// Keep every boundary pixel.
    Full,
    /// Keep only the endpoints of straight runs.
    Simple,
}

/// Transform model selection.
#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// Exact affine map from the first three pairs.
    Affine,
    /// Least-squares homography from all pairs.
    Projective,
    /// Homography fitted on the RANSAC consensus set.
    Ransac,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let result = match cli.command {
        Command::Palette(args) => run_palette(&args),
        Command::ContourImage(args) => run_contour_image(&args),
        Command::Contours(args) => run_contours(&args),
        Command::Transform(args) => run_transform(&args),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("{msg}");
            ExitCode::FAILURE
        }
    }
}

fn run_palette(args: &PaletteArgs) -> Result<(), String> {
    let config = quantize_config_from_cli(args)?;
    let image = read_image(&args.image_path)?;

    let (quantized, diagnostics) = diagnostics::quantize_with_diagnostics(&image, &config, &StdClock)
        .map_err(|e| format!("Pipeline error: {e}"))?;

    if let Some(ref path) = args.adjusted {
        write_png(&quantized.adjusted, path)?;
    }
    if args.report.report {
        emit_report(&args.report, &diagnostics, &diagnostics.report())?;
    }

    print_json(&ColoursResponse {
        colours: quantized.palette.into_colors(),
    })
}

fn run_contour_image(args: &ContourImageArgs) -> Result<(), String> {
    let config = contour_config_from_cli(args)?;
    let palette: Vec<Color> = parse_json_arg("--palette", &args.palette)?;
    let selected: Vec<Color> = parse_json_arg("--selected", &args.selected)?;
    let image = read_image(&args.image_path)?;

    let (stages, diagnostics) = diagnostics::build_contour_raster_with_diagnostics(
        &image,
        &Palette::new(palette),
        &selected,
        &config,
        &StdClock,
    )
    .map_err(|e| format!("Pipeline error: {e}"))?;

    write_png(&stages.eroded, &args.output)?;
    if let Some(ref svg_path) = args.svg {
        let config_json = serde_json::to_string(&config).map_err(|e| e.to_string())?;
        write_svg(&stages.contours, Dimensions::of(&image), &args.image_path, Some(config_json.as_str()), svg_path)?;
    }
    if args.report.report {
        emit_report(&args.report, &diagnostics, &diagnostics.report())?;
    }
    Ok(())
}

fn run_contours(args: &ContoursArgs) -> Result<(), String> {
    let image = read_image(&args.image_path)?;
    let contours = geotrace_pipeline::trace_raw_contours(&image);
    eprintln!("Traced {} contours", contours.len());

    if let Some(ref svg_path) = args.svg {
        write_svg(&contours, Dimensions::of(&image), &args.image_path, None, svg_path)?;
    }
    print_json(&ContoursResponse {
        contours: contours_to_pixels(&contours),
    })
}

fn run_transform(args: &TransformArgs) -> Result<(), String> {
    let contours = read_json::<ContoursInput>(&args.contours)?.into_contours();
    let pairs = pairs_from_wire(&read_json::<Vec<WirePair>>(&args.pairs)?);

    let fitted = match args.mode {
        Mode::Affine => transform::estimate_affine(&pairs).map(Transform::Affine),
        Mode::Projective => transform::estimate_homography(&pairs, HomographyMethod::LeastSquares)
            .map(Transform::Projective),
        Mode::Ransac => transform::estimate_homography(
            &pairs,
            HomographyMethod::Ransac(RansacConfig {
                inlier_threshold: args.inlier_threshold,
                ..RansacConfig::default()
            }),
        )
        .map(Transform::Projective),
    }
    .map_err(|e| format!("Transform error: {e}"))?;

    let mapped = fitted.apply_contours(&contours);
    if let Some(ref path) = args.geojson {
        let geojson = geotrace_export::to_geojson(&mapped).map_err(|e| format!("Export error: {e}"))?;
        write_file(path, geojson.as_bytes())?;
    }

    print_json(&TransformResponse {
        trans_contours: contours_to_wire(&mapped),
        matrix: fitted.rows(),
        reprojection_errors: reprojection_errors(&fitted, &pairs),
    })
}

/// Build a [`QuantizeConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored.
fn quantize_config_from_cli(args: &PaletteArgs) -> Result<QuantizeConfig, String> {
    if let Some(ref json) = args.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }
    Ok(QuantizeConfig {
        contrast_alpha: args.contrast_alpha,
        contrast_beta: args.contrast_beta,
        clusters: args.clusters,
        batch_size: args.batch_size,
        max_iter: args.max_iter,
        seed: args.seed,
        ..QuantizeConfig::default()
    })
}

/// Build a [`ContourConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored.
fn contour_config_from_cli(args: &ContourImageArgs) -> Result<ContourConfig, String> {
    if let Some(ref json) = args.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }
    let erase: Vec<EraseRect> = match args.erase {
        Some(ref value) => parse_json_arg("--erase", value)?,
        None => Vec::new(),
    };
    Ok(ContourConfig {
        contrast_alpha: args.contrast_alpha,
        contrast_beta: args.contrast_beta,
        dilate_iterations: args.dilate_iterations,
        erode_iterations: args.erode_iterations,
        min_area: args.min_area,
        erase,
        approximation: match args.approximation {
            Approximation::Full => ContourApproximation::Full,
            Approximation::Simple => ContourApproximation::Simple,
        },
        ..ContourConfig::default()
    })
}

/// Parse a JSON flag value, reading it from a file when it starts with `@`.
fn parse_json_arg<T: DeserializeOwned>(flag: &str, value: &str) -> Result<T, String> {
    if let Some(path) = value.strip_prefix('@') {
        return read_json(Path::new(path));
    }
    serde_json::from_str(value).map_err(|e| format!("Error parsing {flag}: {e}"))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("Error reading {}: {e}", path.display()))?;
    serde_json::from_str(&text).map_err(|e| format!("Error parsing {}: {e}", path.display()))
}

fn read_image(path: &Path) -> Result<RgbImage, String> {
    let bytes = std::fs::read(path).map_err(|e| format!("Error reading {}: {e}", path.display()))?;
    eprintln!("Image: {} ({} bytes)", path.display(), bytes.len());
    geotrace_pipeline::decode::decode_rgb(&bytes).map_err(|e| format!("Pipeline error: {e}"))
}

fn write_png(image: &RgbImage, path: &Path) -> Result<(), String> {
    image
        .save_with_format(path, image::ImageFormat::Png)
        .map_err(|e| format!("Error writing {}: {e}", path.display()))?;
    eprintln!("PNG written to {}", path.display());
    Ok(())
}

fn write_svg(
    contours: &[geotrace_pipeline::Contour],
    dimensions: Dimensions,
    image_path: &Path,
    config_json: Option<&str>,
    svg_path: &Path,
) -> Result<(), String> {
    let title = image_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("geotrace");
    let metadata = geotrace_export::SvgMetadata {
        title: Some(title),
        description: None,
        config_json,
    };
    let svg = geotrace_export::to_svg(contours, dimensions, &metadata);
    write_file(svg_path, svg.as_bytes())
}

fn write_file(path: &Path, contents: &[u8]) -> Result<(), String> {
    std::fs::write(path, contents).map_err(|e| format!("Error writing {}: {e}", path.display()))?;
    eprintln!("Written {} ({} bytes)", path.display(), contents.len());
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), String> {
    let json = serde_json::to_string(value).map_err(|e| format!("Error serializing output: {e}"))?;
    println!("{json}");
    Ok(())
}

fn emit_report<T: serde::Serialize>(args: &ReportArgs, diagnostics: &T, text: &str) -> Result<(), String> {
    if args.json {
        let json = serde_json::to_string_pretty(diagnostics)
            .map_err(|e| format!("Error serializing diagnostics: {e}"))?;
        eprintln!("{json}");
    } else {
        eprintln!("{text}");
    }
    Ok(())
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}
