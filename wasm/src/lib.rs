//! WebAssembly module for the card stock tracker
//!
//! Provides client-side computation for:
//! - Unit / total money synchronization on receive and issue forms
//! - Pagination clamping
//! - Available quantity and issue checks
//! - Batch code suggestions
//! - Offline form validation

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use shared::ledger::{plan_issue, IssueRequest};
use shared::validation::{parse_timestamp, validate_issue, validate_receive, IssueForm, ReceiveForm};
use shared::{generate_batch_code, normalize_pagination, sync_unit_total, BatchCounters, ChangedField, MoneyInput};
use std::str::FromStr;
use uuid::Uuid;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    web_sys::console::debug_1(&JsValue::from_str("card-stock-wasm loaded"));
}

fn js_error(context: &str, err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&format!("{}: {}", context, err))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value).map_err(|e| js_error("Serialization failed", e))
}

fn parse_amount(field: &str, raw: Option<String>) -> Result<Option<Decimal>, JsValue> {
    match raw.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => Decimal::from_str(raw)
            .map(Some)
            .map_err(|e| js_error(&format!("Invalid {}", field), e)),
        None => Ok(None),
    }
}

/// Keep a unit/total pair in step with the quantity.
///
/// `changed_field` is `unit`, `total` or `qty`. Returns `{"unit": ..., "total": ...}`
/// with amounts as strings.
#[wasm_bindgen]
pub fn sync_money(
    qty: i32,
    unit: Option<String>,
    total: Option<String>,
    changed_field: &str,
) -> Result<String, JsValue> {
    let changed_field: ChangedField = serde_json::from_value(serde_json::Value::from(changed_field))
        .map_err(|e| js_error("Invalid changed field", e))?;
    let pair = sync_unit_total(&MoneyInput {
        qty: i64::from(qty),
        unit: parse_amount("unit", unit)?,
        total: parse_amount("total", total)?,
        changed_field,
    })
    .map_err(|e| js_error("Invalid amount", e))?;
    to_json(&pair)
}

#[derive(Serialize)]
struct PageJson {
    page: i64,
    limit: i64,
}

/// Clamp list paging the same way the server does. Returns `{"page": .., "limit": ..}`.
#[wasm_bindgen]
pub fn clamp_pagination(page: Option<i32>, limit: Option<i32>) -> String {
    let request = normalize_pagination(page.map(i64::from), limit.map(i64::from));
    // Two integers always serialize
    serde_json::to_string(&PageJson {
        page: request.page,
        limit: request.limit,
    })
    .unwrap_or_default()
}

/// Quantity still available to issue from a batch
#[wasm_bindgen]
pub fn available_quantity(qty_received: i32, qty_issued: i32) -> i32 {
    let counters = BatchCounters {
        qty_received: i64::from(qty_received),
        qty_issued: i64::from(qty_issued),
    };
    i32::try_from(counters.available()).unwrap_or(i32::MAX)
}

/// Message explaining why `qty` cannot be issued from the batch, if it cannot
#[wasm_bindgen]
pub fn issue_qty_error(qty_received: i32, qty_issued: i32, qty: i32) -> Option<String> {
    let counters = BatchCounters {
        qty_received: i64::from(qty_received),
        qty_issued: i64::from(qty_issued),
    };
    let request = IssueRequest {
        item_type_id: Uuid::nil(),
        qty: i64::from(qty),
        unit_price: None,
        total_price: None,
    };
    plan_issue(counters, Uuid::nil(), &request)
        .err()
        .map(|e| e.to_string())
}

fn suggest_batch_code(received_at: DateTime<Utc>, seed: u128) -> String {
    generate_batch_code(received_at, Uuid::from_u128(seed))
}

/// Suggest a batch code for a receipt. Falls back to now when the date is missing.
#[wasm_bindgen]
pub fn new_batch_code(received_at: Option<String>) -> Result<String, JsValue> {
    let received_at = match received_at.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => parse_timestamp(raw).ok_or_else(|| js_error("Invalid receivedAt", raw))?,
        None => DateTime::from_timestamp_millis(js_sys::Date::now() as i64)
            .ok_or_else(|| js_error("Invalid clock", js_sys::Date::now()))?,
    };
    let seed = (js_sys::Math::random() * u64::MAX as f64) as u128;
    Ok(suggest_batch_code(received_at, seed << 64 | seed))
}

/// Validate a receive form given as camelCase JSON of strings.
/// Returns `{}` when valid, else a map of field to message.
#[wasm_bindgen]
pub fn validate_receive_form(form_json: &str) -> Result<String, JsValue> {
    let form: ReceiveForm =
        serde_json::from_str(form_json).map_err(|e| js_error("Invalid receive form JSON", e))?;
    match validate_receive(&form) {
        Ok(_) => Ok("{}".to_string()),
        Err(errors) => to_json(&errors),
    }
}

/// Validate an issue form given as camelCase JSON of strings.
/// Returns `{}` when valid, else a map of field to message.
#[wasm_bindgen]
pub fn validate_issue_form(form_json: &str) -> Result<String, JsValue> {
    let form: IssueForm =
        serde_json::from_str(form_json).map_err(|e| js_error("Invalid issue form JSON", e))?;
    match validate_issue(&form) {
        Ok(_) => Ok("{}".to_string()),
        Err(errors) => to_json(&errors),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_sync_money_unit_to_total() {
        let json = sync_money(50, Some("2.00".to_string()), None, "unit").unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["total"], "100.00");
        assert_eq!(value["unit"], "2.00");
    }

    #[test]
    fn test_sync_money_total_to_unit() {
        let json = sync_money(4, None, Some("10".to_string()), "total").unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let unit = Decimal::from_str(value["unit"].as_str().unwrap()).unwrap();
        assert_eq!(unit, Decimal::new(250, 2));
    }

    #[test]
    fn test_clamp_pagination() {
        assert_eq!(clamp_pagination(Some(0), Some(500)), r#"{"page":1,"limit":100}"#);
        assert_eq!(clamp_pagination(None, None), r#"{"page":1,"limit":20}"#);
    }

    #[test]
    fn test_available_quantity() {
        assert_eq!(available_quantity(100, 20), 80);
        assert_eq!(available_quantity(5, 9), 0);
    }

    #[test]
    fn test_issue_qty_error() {
        assert!(issue_qty_error(100, 20, 80).is_none());
        let message = issue_qty_error(100, 20, 81).unwrap();
        assert!(message.contains("81"));
        assert!(message.contains("80"));
        assert!(issue_qty_error(100, 0, 0).is_some());
    }

    #[test]
    fn test_suggest_batch_code() {
        let at = Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap();
        let code = suggest_batch_code(at, 0xabcdef << 104);
        assert_eq!(code, "B-20240315-ABCDEF");
    }

    #[test]
    fn test_validate_issue_form_errors() {
        let json = validate_issue_form(r#"{"qty": "-3", "issuedToName": "Shop"}"#).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value.get("qty").is_some());
        assert!(value.get("itemTypeId").is_some());
        assert!(value.get("issuedToName").is_none());
    }

    #[test]
    fn test_validate_receive_form_ok() {
        let form = format!(
            r#"{{"itemTypeId": "{}", "qtyReceived": "10", "unitCost": "1.25"}}"#,
            Uuid::new_v4()
        );
        assert_eq!(validate_receive_form(&form).unwrap(), "{}");
    }
}
