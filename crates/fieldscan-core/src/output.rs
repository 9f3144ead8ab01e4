//! JSON persistence of extraction results.

use std::fs;
use std::path::Path;

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use tracing::info;

use crate::error::Result;
use crate::models::record::ExtractionResult;

/// Serialize a result (or any projection of one) as JSON indented with four spaces.
pub fn to_json_string<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;

    // serde_json only ever writes valid UTF-8
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Write a result to `path`, replacing any existing file.
pub fn save_to_json(result: &ExtractionResult, path: &Path) -> Result<()> {
    let json = to_json_string(result)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, json)?;

    info!("Saved {} records to {}", result.len(), path.display());
    Ok(())
}
