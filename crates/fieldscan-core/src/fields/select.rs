//! Caller-level projection of one field out of every record.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::models::record::FieldRecord;

/// Placeholder reported when a record lacks the requested field.
pub const NOT_FOUND: &str = "Not Found";

/// One record's value for a requested field.
///
/// Serializes as a one-key object: `{"<field>": "<value or Not Found>"}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSelection {
    pub field: String,
    pub value: Option<String>,
}

impl FieldSelection {
    /// The value, or [`NOT_FOUND`].
    pub fn value_or_not_found(&self) -> &str {
        self.value.as_deref().unwrap_or(NOT_FOUND)
    }
}

impl Serialize for FieldSelection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.field, self.value_or_not_found())?;
        map.end()
    }
}

/// Pick `field` out of every record, in record order.
pub fn select_field<'a, I>(records: I, field: &str) -> Vec<FieldSelection>
where
    I: IntoIterator<Item = &'a FieldRecord>,
{
    records
        .into_iter()
        .map(|record| FieldSelection {
            field: field.to_string(),
            value: record.get(field).map(str::to_string),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{FieldParser, LineFieldParser};
    use crate::models::record::ExtractionResult;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_select_field_per_record() {
        let parser = LineFieldParser::new();
        let result: ExtractionResult = ["Invoice #: A-1\nTotal 5", "Order 9"]
            .into_iter()
            .map(|text| parser.parse(text))
            .collect();

        let selected = select_field(&result, "invoice_number");
        let json = serde_json::to_string(&selected).unwrap();

        assert_eq!(
            json,
            r#"[{"invoice_number":"A-1"},{"invoice_number":"Not Found"}]"#
        );
    }

    #[test]
    fn test_unknown_field_is_not_found() {
        let record = LineFieldParser::new().parse("Order 1");
        let selected = select_field([&record], "vendor");

        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].value_or_not_found(), NOT_FOUND);
    }

    #[test]
    fn test_empty_result() {
        assert!(select_field(&ExtractionResult::empty(), "total").is_empty());
    }
}
