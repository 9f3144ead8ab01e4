//! Output formatting shared by the commands.

use fieldscan_core::{to_json_string, ExtractionResult, FieldName, FieldSelection};

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

/// Render every record of a result.
pub fn render_result(result: &ExtractionResult, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(to_json_string(result)?),
        OutputFormat::Csv => format_csv(result),
        OutputFormat::Text => Ok(format_text(result)),
    }
}

/// Render one field per record.
pub fn render_selection(
    selections: &[FieldSelection],
    format: OutputFormat,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(to_json_string(selections)?),
        OutputFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(vec![]);
            let field = selections.first().map(|s| s.field.as_str()).unwrap_or("value");
            wtr.write_record(["page", field])?;
            for (i, selection) in selections.iter().enumerate() {
                wtr.write_record([(i + 1).to_string().as_str(), selection.value_or_not_found()])?;
            }
            Ok(String::from_utf8(wtr.into_inner()?)?)
        }
        OutputFormat::Text => {
            let mut output = String::new();
            for (i, selection) in selections.iter().enumerate() {
                output.push_str(&format!(
                    "Page {}: {} = {}\n",
                    i + 1,
                    selection.field,
                    selection.value_or_not_found()
                ));
            }
            Ok(output)
        }
    }
}

fn format_csv(result: &ExtractionResult) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header = vec!["page"];
    header.extend(FieldName::ALL.iter().map(|f| f.as_str()));
    wtr.write_record(&header)?;

    for (i, record) in result.iter().enumerate() {
        let page = (i + 1).to_string();
        let mut row = vec![page.as_str()];
        row.extend(
            FieldName::ALL
                .iter()
                .map(|&f| record.field(f).unwrap_or_default()),
        );
        wtr.write_record(&row)?;
    }

    Ok(String::from_utf8(wtr.into_inner()?)?)
}

fn format_text(result: &ExtractionResult) -> String {
    let mut output = String::new();

    for (i, record) in result.iter().enumerate() {
        output.push_str(&format!("Page {}:\n", i + 1));

        let mut any = false;
        for (name, value) in record.iter().filter(|(name, _)| *name != FieldName::RawText) {
            output.push_str(&format!("  {:<15} {}\n", name.as_str(), value));
            any = true;
        }
        if !any {
            output.push_str("  (no fields found)\n");
        }
    }

    if result.is_empty() {
        output.push_str("No records.\n");
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldscan_core::{select_field, FieldParser, LineFieldParser};

    fn sample() -> ExtractionResult {
        let parser = LineFieldParser::new();
        ["Invoice #: 9\nTotal: 4", "blank"]
            .into_iter()
            .map(|t| parser.parse(t))
            .collect()
    }

    #[test]
    fn test_csv_has_one_row_per_record() {
        let csv = render_result(&sample(), OutputFormat::Csv).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], "page,invoice_number,order_number,date,total,raw_text");
        assert_eq!(lines[1], "1,9,,,Total: 4,\"Invoice #: 9");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_text_skips_raw_text() {
        let text = render_result(&sample(), OutputFormat::Text).unwrap();

        assert!(text.contains("invoice_number  9"));
        assert!(text.contains("Page 2:\n  (no fields found)"));
        assert!(!text.contains("raw_text"));
    }

    #[test]
    fn test_selection_formats() {
        let result = sample();
        let selections = select_field(&result, "total");

        let json = render_selection(&selections, OutputFormat::Json).unwrap();
        assert_eq!(
            json,
            "[\n    {\n        \"total\": \"Total: 4\"\n    },\n    {\n        \"total\": \"Not Found\"\n    }\n]"
        );

        let csv = render_selection(&selections, OutputFormat::Csv).unwrap();
        assert_eq!(csv, "page,total\n1,Total: 4\n2,Not Found\n");
    }
}
