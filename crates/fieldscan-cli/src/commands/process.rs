//! Process command - extract fields from a single PDF or image.

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use fieldscan_core::{save_to_json, select_field, DocumentScanner, FieldName};

use super::build_backend;
use super::config::load_config;
use super::render::{render_result, render_selection, OutputFormat};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file (PDF or image)
    #[arg(required = true)]
    input: PathBuf,

    /// Only report this field for every page (e.g. "invoice_number")
    #[arg(long)]
    field: Option<String>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Model directory
    #[arg(short, long)]
    model_dir: Option<PathBuf>,

    /// Skip the 1 degree augmentation rotation
    #[arg(long)]
    no_augment: bool,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    if let Some(model_dir) = &args.model_dir {
        config.ocr.model_dir = model_dir.clone();
    }
    if args.no_augment {
        config.normalize.augment = false;
    }

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    if let Some(field) = &args.field {
        if field.parse::<FieldName>().is_err() {
            warn!("'{}' is not a known field, every page will report Not Found", field);
        }
    }

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?,
    );
    pb.enable_steady_tick(Duration::from_millis(100));

    pb.set_message("Loading OCR engine...");
    let backend = build_backend(&config)?;
    let scanner = DocumentScanner::from_config(backend, &config)?;

    pb.set_message("Extracting fields...");
    let result = scanner.process_path(&args.input);
    pb.finish_and_clear();
    let result = result?;

    debug!("Extracted {} records", result.len());

    let output = match &args.field {
        Some(field) => render_selection(&select_field(&result, field), args.format)?,
        None => render_result(&result, args.format)?,
    };

    match &args.output {
        // Whole results in JSON go through the core writer
        Some(output_path) if args.field.is_none() && matches!(args.format, OutputFormat::Json) => {
            save_to_json(&result, output_path)?;
            println!(
                "{} Output written to {}",
                style("✓").green(),
                output_path.display()
            );
        }
        Some(output_path) => {
            fs::write(output_path, &output)?;
            println!(
                "{} Output written to {}",
                style("✓").green(),
                output_path.display()
            );
        }
        None => println!("{}", output),
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}
