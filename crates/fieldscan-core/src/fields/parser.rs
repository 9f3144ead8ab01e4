//! Line-oriented field parser.

use tracing::debug;

use crate::models::record::{FieldName, FieldRecord};

use super::patterns::{DATE_KEYWORD, INVOICE_NUMBER, ORDER_KEYWORD, TOTAL_KEYWORD};
use super::FieldParser;

/// Heuristic parser that classifies each line of recognized text.
///
/// Two policies are layered on every line:
/// - the invoice-number pattern is matched unconditionally, so the last
///   matching line wins;
/// - a keyword branch (`order`, then `date`, then `total`) classifies the
///   line into at most one field, and the first line classified into a
///   field keeps it.
///
/// The keyword fields hold the whole trimmed line, not just the value.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineFieldParser;

impl LineFieldParser {
    pub fn new() -> Self {
        Self
    }

    fn classify(line: &str) -> Option<FieldName> {
        let lower = line.to_lowercase();
        if lower.contains(ORDER_KEYWORD) {
            Some(FieldName::OrderNumber)
        } else if lower.contains(DATE_KEYWORD) {
            Some(FieldName::Date)
        } else if lower.contains(TOTAL_KEYWORD) {
            Some(FieldName::Total)
        } else {
            None
        }
    }
}

impl FieldParser for LineFieldParser {
    fn parse(&self, text: &str) -> FieldRecord {
        let mut record = FieldRecord::new();

        for line in text.split('\n') {
            let line = line.trim();

            if let Some(caps) = INVOICE_NUMBER.captures(line) {
                record.insert(FieldName::InvoiceNumber, &caps[1]);
            }

            if let Some(field) = Self::classify(line) {
                if !record.contains(field) {
                    record.insert(field, line);
                }
            }
        }

        record.insert(FieldName::RawText, text);

        debug!(
            "Parsed {} fields from {} chars of text",
            record.len() - 1,
            text.len()
        );

        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(text: &str) -> FieldRecord {
        LineFieldParser::new().parse(text)
    }

    #[test]
    fn test_invoice_number_with_hash_and_colon() {
        let record = parse("ACME Corp\nInvoice #: INV-2024-001\nThank you");
        assert_eq!(record.field(FieldName::InvoiceNumber), Some("INV-2024-001"));
    }

    #[test]
    fn test_invoice_number_variants() {
        assert_eq!(parse("INVOICE NO. 5531").get("invoice_number"), Some("5531"));
        assert_eq!(parse("invoice number: X-9").get("invoice_number"), Some("X-9"));
        assert_eq!(parse("Invoice#42").get("invoice_number"), Some("42"));
        assert_eq!(parse("Invoice 77/B").get("invoice_number"), Some("77/B"));
        assert_eq!(parse("Invoice").get("invoice_number"), None);
    }

    #[test]
    fn test_invoice_number_last_match_wins() {
        let record = parse("Invoice No: A1\nsomething\nInvoice Number A2");
        assert_eq!(record.field(FieldName::InvoiceNumber), Some("A2"));
    }

    #[test]
    fn test_keyword_fields_store_whole_line() {
        let record = parse("Order #12345 confirmed\nTotal: $99.00");

        assert_eq!(record.field(FieldName::OrderNumber), Some("Order #12345 confirmed"));
        assert_eq!(record.field(FieldName::Total), Some("Total: $99.00"));
        assert!(!record.contains(FieldName::Date));
    }

    #[test]
    fn test_keyword_fields_first_match_wins() {
        let record = parse("Total: 10\nOrder A\nGrand total: 12\nOrder B");

        assert_eq!(record.field(FieldName::Total), Some("Total: 10"));
        assert_eq!(record.field(FieldName::OrderNumber), Some("Order A"));
    }

    #[test]
    fn test_priority_ignores_keyword_position() {
        // "date" appears before "order" in the line, but order has priority.
        let record = parse("Date of order: 2024-03-01");

        assert_eq!(record.field(FieldName::OrderNumber), Some("Date of order: 2024-03-01"));
        assert!(!record.contains(FieldName::Date));
    }

    #[test]
    fn test_classified_line_does_not_fall_through() {
        let record = parse("Order placed\nOrder date: 2024-01-02");

        assert_eq!(record.field(FieldName::OrderNumber), Some("Order placed"));
        assert!(!record.contains(FieldName::Date));
    }

    #[test]
    fn test_invoice_line_also_classified() {
        let record = parse("Invoice Date: 2024-05-06");

        assert_eq!(record.field(FieldName::InvoiceNumber), Some("Date:"));
        assert_eq!(record.field(FieldName::Date), Some("Invoice Date: 2024-05-06"));
    }

    #[test]
    fn test_lines_are_trimmed() {
        let record = parse("   DUE DATE 01/02/2024\r\n\tSubTotal 4.00  ");

        assert_eq!(record.field(FieldName::Date), Some("DUE DATE 01/02/2024"));
        assert_eq!(record.field(FieldName::Total), Some("SubTotal 4.00"));
    }

    #[test]
    fn test_raw_text_is_identity() {
        for text in ["", "\n\n", "  Invoice #: 1  \r\nTotal 2\n", "ünïcödé order ✓"] {
            let record = parse(text);
            assert_eq!(record.raw_text(), text);
            assert_eq!(record.keys().last(), Some(&FieldName::RawText));
        }
    }

    #[test]
    fn test_nothing_matched() {
        let record = parse("hello\nworld");
        assert_eq!(record.keys(), vec![FieldName::RawText]);
    }

    #[test]
    fn test_key_order_follows_first_insertion() {
        let record = parse("Order 1\nInvoice # 5\nDate 3\nInvoice # 6");

        assert_eq!(
            record.keys(),
            vec![
                FieldName::OrderNumber,
                FieldName::InvoiceNumber,
                FieldName::Date,
                FieldName::RawText
            ]
        );
        assert_eq!(record.field(FieldName::InvoiceNumber), Some("6"));
    }
}
