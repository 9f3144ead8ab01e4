//! Models command - check and download OCR model files.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use console::style;
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};

use fieldscan_core::models::config::OcrBackendKind;
use fieldscan_core::ScanConfig;

use super::config::load_config;

/// Arguments for the models command.
#[derive(Args)]
pub struct ModelsArgs {
    #[command(subcommand)]
    command: ModelsCommand,

    /// Model directory (default: ocr.model_dir from config)
    #[arg(short, long, global = true)]
    model_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum ModelsCommand {
    /// Check which model files are present
    Status,

    /// Download model files
    Download(DownloadArgs),
}

#[derive(Args)]
struct DownloadArgs {
    /// Base URL the model files are served from
    #[arg(long)]
    base_url: Option<String>,

    /// Force re-download even if files exist
    #[arg(long)]
    force: bool,
}

pub async fn run(args: ModelsArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(model_dir) = args.model_dir {
        config.ocr.model_dir = model_dir;
    }

    match args.command {
        ModelsCommand::Status => check_status(&config),
        ModelsCommand::Download(download_args) => download_models(&config, download_args).await,
    }
}

fn check_status(config: &ScanConfig) -> anyhow::Result<()> {
    let model_dir = &config.ocr.model_dir;

    println!("{}", style("Model Status").bold());
    println!("Model directory: {}", model_dir.display());
    if config.ocr.backend == OcrBackendKind::Tesseract {
        println!(
            "{} Configured backend is tesseract; these files are only used by the onnx backend.",
            style("ℹ").blue()
        );
    }
    println!();

    let mut all_present = true;
    let mut total_size: u64 = 0;

    for filename in config.ocr.model_files() {
        let path = model_dir.join(filename);
        let (status, size_str) = match fs::metadata(&path) {
            Ok(metadata) if metadata.len() > 0 => {
                total_size += metadata.len();
                (style("✓").green(), format_size(metadata.len()))
            }
            Ok(_) => {
                all_present = false;
                (style("⚠").yellow(), "empty".to_string())
            }
            Err(_) => {
                all_present = false;
                (style("✗").red(), "missing".to_string())
            }
        };

        println!("    {} {:<25} {:>10}", status, filename, size_str);
    }

    println!();
    if all_present {
        println!(
            "{} Ready ({} total)",
            style("✓").green(),
            format_size(total_size)
        );
    } else {
        println!(
            "{} Run 'fieldscan models download --base-url <URL>' to download",
            style("⚠").yellow()
        );
    }

    Ok(())
}

async fn download_models(config: &ScanConfig, args: DownloadArgs) -> anyhow::Result<()> {
    let Some(base_url) = args.base_url.or_else(|| config.ocr.model_base_url.clone()) else {
        anyhow::bail!(
            "No model base URL configured. Pass --base-url or run \
             'fieldscan config set ocr.model_base_url <URL>'."
        );
    };
    let base_url = base_url.trim_end_matches('/');

    let output_dir = &config.ocr.model_dir;
    fs::create_dir_all(output_dir)?;

    println!(
        "{} Downloading models to {}",
        style("ℹ").blue(),
        output_dir.display()
    );
    println!();

    let client = reqwest::Client::builder()
        .user_agent(concat!("fieldscan-cli/", env!("CARGO_PKG_VERSION")))
        .timeout(std::time::Duration::from_secs(300))
        .build()?;

    let mut success_count = 0;
    let mut skip_count = 0;
    let mut error_count = 0;

    for filename in config.ocr.model_files() {
        let path = output_dir.join(filename);

        if !args.force {
            if let Ok(metadata) = fs::metadata(&path) {
                if metadata.len() > 0 {
                    println!(
                        "  {} {} (already exists, {})",
                        style("✓").green(),
                        filename,
                        format_size(metadata.len())
                    );
                    skip_count += 1;
                    continue;
                }
            }
        }

        let url = format!("{}/{}", base_url, filename);

        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  {spinner:.green} {msg:<30} [{bar:25.cyan/blue}] {bytes}/{total_bytes}")?
                .progress_chars("=>-"),
        );
        pb.set_message(filename.to_string());

        match download_file(&client, &url, &path, &pb).await {
            Ok(()) => {
                pb.finish_with_message(format!("{} {}", style("✓").green(), filename));
                success_count += 1;
            }
            Err(e) => {
                pb.finish_with_message(format!("{} {} - {}", style("✗").red(), filename, e));
                error_count += 1;
            }
        }
    }

    println!();
    println!(
        "   {} downloaded, {} already present, {} failed",
        success_count, skip_count, error_count
    );
    println!();
    check_status(config)?;

    if error_count > 0 {
        anyhow::bail!("{} model files failed to download", error_count);
    }

    Ok(())
}

async fn download_file(
    client: &reqwest::Client,
    url: &str,
    path: &Path,
    pb: &ProgressBar,
) -> anyhow::Result<()> {
    let response = client.get(url).send().await?;

    if !response.status().is_success() {
        anyhow::bail!("HTTP {}", response.status());
    }

    if let Some(content_length) = response.content_length() {
        pb.set_length(content_length);
    }

    // Stream into a temp file, renamed once complete
    let temp_path = path.with_extension("tmp");
    let mut file = File::create(&temp_path)?;

    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk)?;
        downloaded += chunk.len() as u64;
        pb.set_position(downloaded);
    }

    file.flush()?;
    drop(file);

    fs::rename(&temp_path, path)?;

    Ok(())
}

fn format_size(bytes: u64) -> String {
    if bytes >= 1_000_000_000 {
        format!("{:.1}GB", bytes as f64 / 1_000_000_000.0)
    } else if bytes >= 1_000_000 {
        format!("{:.1}MB", bytes as f64 / 1_000_000.0)
    } else if bytes >= 1_000 {
        format!("{:.1}KB", bytes as f64 / 1_000.0)
    } else {
        format!("{}B", bytes)
    }
}
