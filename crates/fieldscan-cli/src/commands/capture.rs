//! Capture command - grab a frame from a camera and extract fields.

use std::path::PathBuf;

use clap::Args;
use console::style;

use fieldscan_core::capture::{FfmpegCamera, StdinTriggers};
use fieldscan_core::{save_to_json, DocumentScanner};

use super::build_backend;
use super::config::load_config;
use super::render::{render_result, OutputFormat};

/// Arguments for the capture command.
#[derive(Args)]
pub struct CaptureArgs {
    /// Capture device (e.g. /dev/video0)
    #[arg(short, long)]
    device: Option<String>,

    /// ffmpeg input format (e.g. v4l2, avfoundation, dshow)
    #[arg(long)]
    input_format: Option<String>,

    /// JSON file the record is written to
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Model directory
    #[arg(short, long)]
    model_dir: Option<PathBuf>,

    /// Do not open the ffplay preview window
    #[arg(long)]
    no_preview: bool,
}

pub async fn run(args: CaptureArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(device) = args.device {
        config.capture.device = device;
    }
    if let Some(input_format) = args.input_format {
        config.capture.input_format = input_format;
    }
    if let Some(model_dir) = args.model_dir {
        config.ocr.model_dir = model_dir;
    }
    if args.no_preview {
        config.capture.preview = false;
    }

    let backend = build_backend(&config)?;
    let scanner = DocumentScanner::from_config(backend, &config)?;

    let mut camera = FfmpegCamera::new(config.capture.clone());
    let mut triggers = StdinTriggers::new();

    println!(
        "{} Reading {} ({}). Type {} + Enter to capture, {} + Enter to quit.",
        style("ℹ").blue(),
        config.capture.device,
        config.capture.input_format,
        style("s").bold(),
        style("q").bold()
    );

    let result = scanner.process_capture(&mut camera, &mut triggers)?;

    if result.is_empty() {
        println!("{} No frame captured.", style("ℹ").blue());
        return Ok(());
    }

    let output_path = args.output.unwrap_or(config.output.json_path);
    save_to_json(&result, &output_path)?;

    println!("{}", render_result(&result, OutputFormat::Text)?);
    println!(
        "{} Data saved to {}",
        style("✓").green(),
        output_path.display()
    );

    Ok(())
}
