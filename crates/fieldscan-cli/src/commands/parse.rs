//! Parse command - run the field parser on already recognized text.

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use clap::Args;
use console::style;

use fieldscan_core::{select_field, ExtractionResult, FieldParser, LineFieldParser};

use super::render::{render_result, render_selection, OutputFormat};

/// Arguments for the parse command.
#[derive(Args)]
pub struct ParseArgs {
    /// Text file, or "-" for stdin
    #[arg(required = true)]
    input: PathBuf,

    /// Only report this field
    #[arg(long)]
    field: Option<String>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,
}

pub async fn run(args: ParseArgs) -> anyhow::Result<()> {
    let text = if args.input.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        fs::read_to_string(&args.input)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", args.input.display(), e))?
    };

    let result = ExtractionResult::from(vec![LineFieldParser::new().parse(&text)]);

    let output = match &args.field {
        Some(field) => render_selection(&select_field(&result, field), args.format)?,
        None => render_result(&result, args.format)?,
    };

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    Ok(())
}
