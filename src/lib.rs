//! cvconv: bounding-box annotation converter.
//!
//! cvconv moves computer vision annotations between a canonical JSON
//! document and delimiter-separated text layouts (CSV, YOLO label files and
//! the like). Boxes are held in one canonical form and converted to any of
//! six coordinate formats at the boundary.
//!
//! # Modules
//!
//! - [`ir`]: Canonical model (images, annotations, box formats, transforms)
//! - [`dsv`]: Delimiter-separated-values reader and writer
//! - [`config`]: DSV options and preset loading
//! - [`conversion`]: End-to-end conversions and their reports
//! - [`error`]: Error types for cvconv operations

pub mod config;
pub mod conversion;
pub mod dsv;
pub mod error;
pub mod ir;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::warn;

pub use error::ConvertError;

use ir::{AnnotationFormats, BoxFormat};

/// The cvconv CLI application.
#[derive(Parser)]
#[command(name = "cvconv")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Output format for the conversion report ('text' or 'json').
    #[arg(long, global = true, default_value = "text")]
    report: String,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Convert canonical JSON to delimiter-separated text.
    Std2dsv(Std2DsvArgs),
    /// Convert delimiter-separated text to canonical JSON.
    Dsv2std(Dsv2StdArgs),
    /// Merge several canonical JSON files into one.
    Merge(MergeArgs),
}

/// Arguments for the std2dsv subcommand.
#[derive(clap::Args)]
struct Std2DsvArgs {
    /// Canonical JSON input file.
    input: PathBuf,

    /// Output file, or output folder when the configuration writes one file
    /// per image.
    output: PathBuf,

    /// DSV configuration: a YAML file or the preset name 'yolo'.
    #[arg(long, env = "CVCONV_CONFIG")]
    config: Option<String>,
}

/// Arguments for the dsv2std subcommand.
#[derive(clap::Args)]
struct Dsv2StdArgs {
    /// DSV input file, or folder when the configuration reads one file per
    /// image.
    input: PathBuf,

    /// Canonical JSON output file.
    output: PathBuf,

    /// DSV configuration: a YAML file or the preset name 'yolo'.
    #[arg(long, env = "CVCONV_CONFIG")]
    config: Option<String>,

    /// Folder holding the images, used to read their dimensions.
    #[arg(long)]
    images: Option<PathBuf>,

    /// Box format of the JSON output (coco, voc, center, relativeCoco,
    /// relativeVoc, relativeCenter).
    #[arg(long, default_value = "coco")]
    format: String,
}

/// Arguments for the merge subcommand.
#[derive(clap::Args)]
struct MergeArgs {
    /// Text file listing one canonical JSON file per line.
    list: PathBuf,

    /// Merged canonical JSON output file.
    output: PathBuf,

    /// Box format of the merged output.
    #[arg(long, default_value = "coco")]
    format: String,
}

/// Run the cvconv CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), ConvertError> {
    let cli = Cli::parse();

    let report = match cli.command {
        Some(Commands::Std2dsv(args)) => {
            let config = config::load_config(args.config.as_deref())?.with_output(args.output);
            conversion::std_to_dsv(&args.input, &config)?
        }
        Some(Commands::Dsv2std(args)) => {
            let config = config::load_config(args.config.as_deref())?;
            let formats = AnnotationFormats::with_bounding_box(args.format.parse::<BoxFormat>()?);
            conversion::dsv_to_std(
                &args.input,
                &args.output,
                &config,
                args.images.as_deref(),
                &formats,
            )?
        }
        Some(Commands::Merge(args)) => {
            let formats = AnnotationFormats::with_bounding_box(args.format.parse::<BoxFormat>()?);
            conversion::merge(&args.list, &args.output, &formats)?
        }
        None => {
            println!("cvconv {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Bounding-box annotation converter.");
            println!();
            println!("Run 'cvconv --help' for usage information.");
            return Ok(());
        }
    };

    if report.is_lossy() {
        warn!("{} input record(s) were dropped", report.warning_count());
    }

    match cli.report.as_str() {
        "json" => {
            let json = serde_json::to_string_pretty(&report).map_err(|source| {
                ConvertError::JsonWrite {
                    path: PathBuf::from("<stdout>"),
                    source,
                }
            })?;
            println!("{}", json);
        }
        _ => print!("{}", report),
    }
    Ok(())
}
