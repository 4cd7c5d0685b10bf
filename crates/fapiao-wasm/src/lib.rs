//! WASM bindings for Chinese VAT invoice extraction.
//!
//! The browser extracts positioned text with its own PDF library and hands
//! the fragments here; records are passed back and forth as plain objects.

use serde::Serialize;
use serde::de::DeserializeOwned;
use wasm_bindgen::prelude::*;

use fapiao_core::invoice::rules::{extract_date, parse_cn_amount};
use fapiao_core::{
    InvoiceParser, InvoiceRecord, InvoiceSegmenter, PageLayout, PositionedFragment,
    RegexInvoiceParser,
};

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

fn js_error(message: impl std::fmt::Display) -> JsValue {
    js_sys::Error::new(&message.to_string()).into()
}

// Records flatten their fields, which would otherwise come out as a JS `Map`.
fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(js_error)
}

fn from_js<T: DeserializeOwned>(value: JsValue) -> Result<T, JsValue> {
    serde_wasm_bindgen::from_value(value).map_err(js_error)
}

/// Version information.
#[wasm_bindgen]
pub fn version() -> String {
    fapiao_core::VERSION.to_string()
}

/// Build a page layout from `{text, x, y}` fragments in any order.
#[wasm_bindgen]
pub fn layout_from_fragments(fragments: JsValue) -> Result<JsValue, JsValue> {
    let fragments: Vec<PositionedFragment> = from_js(fragments)?;
    to_js(&PageLayout::from_fragments(fragments))
}

/// Extract the fields of one invoice from a page layout.
#[wasm_bindgen]
pub fn parse_invoice(layout: JsValue) -> Result<JsValue, JsValue> {
    let layout: PageLayout = from_js(layout)?;
    to_js(&RegexInvoiceParser::new().parse_layout(&layout))
}

/// Extract the fields of every invoice on a page layout.
#[wasm_bindgen]
pub fn parse_multiple_invoices(layout: JsValue) -> Result<JsValue, JsValue> {
    let layout: PageLayout = from_js(layout)?;
    to_js(&InvoiceSegmenter::new().parse_multiple(&layout))
}

/// Extract invoice fields from plain text.
#[wasm_bindgen]
pub fn extract_invoice_from_text(text: &str) -> Result<JsValue, JsValue> {
    to_js(&RegexInvoiceParser::new().parse_text(text))
}

/// Recompute duplicate flags and return the updated records.
#[wasm_bindgen]
pub fn check_duplicates(records: JsValue, enabled: bool) -> Result<JsValue, JsValue> {
    let mut records: Vec<InvoiceRecord> = from_js(records)?;
    fapiao_core::check_duplicates(&mut records, enabled);
    to_js(&records)
}

/// Identity key of a record, or `undefined` when it cannot be told.
#[wasm_bindgen]
pub fn dedupe_key(record: JsValue) -> Result<Option<String>, JsValue> {
    let record: InvoiceRecord = from_js(record)?;
    Ok(fapiao_core::dedupe_key(&record))
}

/// Parse an amount such as `1,234.50`.
#[wasm_bindgen]
pub fn parse_amount(amount: &str) -> Option<String> {
    parse_cn_amount(amount).map(|d| format!("{:.2}", d))
}

/// Parse a `YYYY年M月D日` date into `YYYY-MM-DD`.
#[wasm_bindgen]
pub fn parse_date(date_str: &str) -> Option<String> {
    extract_date(date_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_parse_date() {
        assert_eq!(parse_date("开票日期：2024年3月5日").as_deref(), Some("2024-03-05"));
        assert_eq!(parse_date("no date"), None);
    }

    #[wasm_bindgen_test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1,234.5").as_deref(), Some("1234.50"));
    }

    #[wasm_bindgen_test]
    fn test_parse_invoice_roundtrip_through_js() {
        let layout = to_js(&PageLayout::from_text("发票号码：24442000000012345678")).unwrap();
        let fields: serde_json::Value = from_js(parse_invoice(layout).unwrap()).unwrap();
        assert_eq!(fields["invoiceNumber"], "24442000000012345678");
        assert_eq!(fields["invoiceCode"], "");
    }
}
