//! WASM bindings for document field extraction.
//!
//! Text recognition happens on the JavaScript side; these bindings parse the
//! recognized text into field records and project fields out of them.

use serde::Serialize;
use wasm_bindgen::prelude::*;

use fieldscan_core::{ExtractionResult, FieldParser, FieldRecord, LineFieldParser};

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Version information.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    // Records serialize as maps; plain objects keep them usable from JS
    let serializer = serde_wasm_bindgen::Serializer::json_compatible();
    value
        .serialize(&serializer)
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Parse one page of recognized text into a field record.
#[wasm_bindgen]
pub fn parse_fields(text: &str) -> Result<JsValue, JsValue> {
    to_js(&LineFieldParser::new().parse(text))
}

/// Pick `field` out of every record, `"Not Found"` where it is missing.
///
/// `records` is an array of records as returned by [`parse_fields`].
#[wasm_bindgen]
pub fn select_field(records: JsValue, field: &str) -> Result<JsValue, JsValue> {
    let result: ExtractionResult = serde_wasm_bindgen::from_value(records)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;

    to_js(&fieldscan_core::select_field(&result, field))
}

/// Collects the pages of one document as they are recognized.
#[wasm_bindgen]
pub struct FieldExtractor {
    parser: LineFieldParser,
    records: Vec<FieldRecord>,
}

#[wasm_bindgen]
impl FieldExtractor {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            parser: LineFieldParser::new(),
            records: Vec::new(),
        }
    }

    /// Parse the next page and return its record.
    #[wasm_bindgen]
    pub fn add_page(&mut self, text: &str) -> Result<JsValue, JsValue> {
        let record = self.parser.parse(text);
        let value = to_js(&record)?;
        self.records.push(record);
        Ok(value)
    }

    /// Number of pages added so far.
    #[wasm_bindgen(getter)]
    pub fn length(&self) -> usize {
        self.records.len()
    }

    /// All records, in page order.
    #[wasm_bindgen]
    pub fn records(&self) -> Result<JsValue, JsValue> {
        to_js(&self.records)
    }

    /// One field per page.
    #[wasm_bindgen]
    pub fn select(&self, field: &str) -> Result<JsValue, JsValue> {
        to_js(&fieldscan_core::select_field(&self.records, field))
    }

    /// Drop every page.
    #[wasm_bindgen]
    pub fn clear(&mut self) {
        self.records.clear();
    }
}

impl Default for FieldExtractor {
    fn default() -> Self {
        Self::new()
    }
}
