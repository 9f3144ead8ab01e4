//! Patterns and keywords used for line classification.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // "Invoice", "Invoice #", "Invoice No.", "Invoice Number" + optional ':'/'#', then the value token
    pub static ref INVOICE_NUMBER: Regex = Regex::new(
        r"(?i)invoice\s*(?:#|no\.?|number)?\s*[:#]?\s*(\S+)"
    ).unwrap();
}

/// Keyword classifying a line as an order line.
pub const ORDER_KEYWORD: &str = "order";

/// Keyword classifying a line as a date line.
pub const DATE_KEYWORD: &str = "date";

/// Keyword classifying a line as a total line.
pub const TOTAL_KEYWORD: &str = "total";
