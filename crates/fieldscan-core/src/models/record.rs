//! Per-page field records and the ordered extraction result.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Names of the fields a record can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldName {
    /// Invoice identifier token.
    InvoiceNumber,
    /// Full line mentioning an order.
    OrderNumber,
    /// Full line mentioning a date.
    Date,
    /// Full line mentioning a total.
    Total,
    /// Complete recognized text of the page.
    RawText,
}

impl FieldName {
    /// All field names, in declaration order.
    pub const ALL: [FieldName; 5] = [
        FieldName::InvoiceNumber,
        FieldName::OrderNumber,
        FieldName::Date,
        FieldName::Total,
        FieldName::RawText,
    ];

    /// The wire name of the field.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldName::InvoiceNumber => "invoice_number",
            FieldName::OrderNumber => "order_number",
            FieldName::Date => "date",
            FieldName::Total => "total",
            FieldName::RawText => "raw_text",
        }
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldName::ALL
            .iter()
            .copied()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| format!("unknown field: {}", s))
    }
}

/// Fields extracted from one page or frame.
///
/// Keys keep their insertion order; overwriting a key keeps its position.
/// `raw_text` is always present on records produced by the parser.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldRecord {
    fields: Vec<(FieldName, String)>,
}

impl FieldRecord {
    pub(crate) fn new() -> Self {
        Self { fields: Vec::new() }
    }

    pub(crate) fn insert(&mut self, name: FieldName, value: impl Into<String>) {
        let value = value.into();
        match self.fields.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Look up a field by its wire name. Unknown names yield `None`.
    pub fn get(&self, name: &str) -> Option<&str> {
        name.parse::<FieldName>().ok().and_then(|n| self.field(n))
    }

    /// Look up a field.
    pub fn field(&self, name: FieldName) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Whether the field is present.
    pub fn contains(&self, name: FieldName) -> bool {
        self.field(name).is_some()
    }

    /// The full recognized text.
    pub fn raw_text(&self) -> &str {
        self.field(FieldName::RawText).unwrap_or_default()
    }

    /// Iterate over fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (FieldName, &str)> {
        self.fields.iter().map(|(key, value)| (*key, value.as_str()))
    }

    /// Field names in insertion order.
    pub fn keys(&self) -> Vec<FieldName> {
        self.fields.iter().map(|(key, _)| *key).collect()
    }

    /// Number of fields, `raw_text` included.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for FieldRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key.as_str(), value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FieldRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RecordVisitor;

        impl<'de> Visitor<'de> for RecordVisitor {
            type Value = FieldRecord;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of field names to strings")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut record = FieldRecord::new();
                while let Some((key, value)) = access.next_entry::<String, String>()? {
                    let name = key.parse::<FieldName>().map_err(de::Error::custom)?;
                    record.insert(name, value);
                }
                if !record.contains(FieldName::RawText) {
                    return Err(de::Error::missing_field("raw_text"));
                }
                Ok(record)
            }
        }

        deserializer.deserialize_map(RecordVisitor)
    }
}

/// Ordered records, one per page or frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractionResult {
    records: Vec<FieldRecord>,
}

impl ExtractionResult {
    /// Create an empty result.
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, record: FieldRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in page order.
    pub fn records(&self) -> &[FieldRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldRecord> {
        self.records.iter()
    }

    pub fn into_records(self) -> Vec<FieldRecord> {
        self.records
    }
}

impl From<Vec<FieldRecord>> for ExtractionResult {
    fn from(records: Vec<FieldRecord>) -> Self {
        Self { records }
    }
}

impl FromIterator<FieldRecord> for ExtractionResult {
    fn from_iter<I: IntoIterator<Item = FieldRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ExtractionResult {
    type Item = FieldRecord;
    type IntoIter = std::vec::IntoIter<FieldRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a ExtractionResult {
    type Item = &'a FieldRecord;
    type IntoIter = std::slice::Iter<'a, FieldRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
