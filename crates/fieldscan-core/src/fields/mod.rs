//! Field extraction from recognized text.

mod parser;
pub mod patterns;
mod select;

pub use parser::LineFieldParser;
pub use select::{select_field, FieldSelection, NOT_FOUND};

use crate::models::record::FieldRecord;

/// Trait for turning recognized text into a field record.
///
/// Parsing never fails: a field that does not match is simply absent.
pub trait FieldParser {
    /// Parse one page of text. The record always carries `raw_text`.
    fn parse(&self, text: &str) -> FieldRecord;
}
