//! Input validation for the card stock tracker
//!
//! Every request body is turned into a typed command here, or into a
//! field → message map the API returns with a 400.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::ledger::Amendment;
use crate::money::MAX_MONEY;

pub const MAX_NOTES_LEN: usize = 2000;
pub const MAX_NAME_LEN: usize = 200;
/// Largest quantity a single receipt, issue or amendment may carry
pub const MAX_QTY: i64 = 1_000_000_000;

/// Per-field validation messages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Record a message; the first message for a field wins
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn into_map(self) -> BTreeMap<String, String> {
        self.0
    }

    /// `Ok(value)` when nothing was recorded
    pub fn into_result<T>(self, value: impl FnOnce() -> T) -> Result<T, Self> {
        if self.is_empty() {
            Ok(value())
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for FieldErrors {}

impl From<validator::ValidationErrors> for FieldErrors {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut out = FieldErrors::new();
        for (field, list) in errors.field_errors() {
            if let Some(first) = list.first() {
                let message = first
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", field));
                out.add(to_camel_case(field), message);
            }
        }
        out
    }
}

fn to_camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.push(c.to_ascii_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

// ============================================================================
// Field parsers
// ============================================================================

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn required<'a>(errors: &mut FieldErrors, field: &str, value: Option<&'a str>) -> Option<&'a str> {
    let value = present(value);
    if value.is_none() {
        errors.add(field, format!("{} is required", field));
    }
    value
}

fn parse_id(errors: &mut FieldErrors, field: &str, value: Option<&str>) -> Option<Uuid> {
    let raw = required(errors, field, value)?;
    match Uuid::parse_str(raw) {
        Ok(id) => Some(id),
        Err(_) => {
            errors.add(field, format!("{} must be a valid id", field));
            None
        }
    }
}

fn parse_positive_qty(errors: &mut FieldErrors, field: &str, value: Option<&str>) -> Option<i64> {
    let raw = required(errors, field, value)?;
    match raw.parse::<i64>() {
        Ok(qty) => check_qty(errors, field, qty),
        Err(_) => {
            errors.add(field, format!("{} must be a whole number", field));
            None
        }
    }
}

fn check_qty(errors: &mut FieldErrors, field: &str, qty: i64) -> Option<i64> {
    if qty <= 0 {
        errors.add(field, format!("{} must be greater than zero", field));
        None
    } else if qty > MAX_QTY {
        errors.add(field, format!("{} must be at most {}", field, MAX_QTY));
        None
    } else {
        Some(qty)
    }
}

fn parse_money(errors: &mut FieldErrors, field: &str, value: Option<&str>) -> Option<Decimal> {
    let raw = present(value)?;
    match Decimal::from_str(raw) {
        Ok(amount) => check_money(errors, field, amount),
        Err(_) => {
            errors.add(field, format!("{} must be a number", field));
            None
        }
    }
}

fn check_money(errors: &mut FieldErrors, field: &str, amount: Decimal) -> Option<Decimal> {
    if amount.is_sign_negative() && !amount.is_zero() {
        errors.add(field, format!("{} cannot be negative", field));
        None
    } else if amount > MAX_MONEY {
        errors.add(field, format!("{} must be at most {}", field, MAX_MONEY));
        None
    } else {
        Some(amount)
    }
}

fn optional_text(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<&str>,
    max_len: usize,
) -> Option<String> {
    let text = present(value)?;
    if text.chars().count() > max_len {
        errors.add(field, format!("{} must be at most {} characters", field, max_len));
        return None;
    }
    Some(text.to_string())
}

fn required_text(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<&str>,
    max_len: usize,
) -> Option<String> {
    required(errors, field, value)?;
    optional_text(errors, field, value, max_len)
}

/// Parse an RFC 3339 timestamp or a plain `YYYY-MM-DD` date (midnight UTC)
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|d| Utc.from_utc_datetime(&d.and_time(NaiveTime::MIN)))
}

/// Parse an inclusive end-of-range date. Plain dates cover the whole day, so
/// the returned exclusive bound is the following midnight.
pub fn parse_end_bound(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc) + Duration::milliseconds(1));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|d| Utc.from_utc_datetime(&d.and_time(NaiveTime::MIN)) + Duration::days(1))
}

fn parse_optional_timestamp(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<&str>,
) -> Option<DateTime<Utc>> {
    let raw = present(value)?;
    let parsed = parse_timestamp(raw);
    if parsed.is_none() {
        errors.add(field, format!("{} must be a date (YYYY-MM-DD) or RFC 3339 timestamp", field));
    }
    parsed
}

// ============================================================================
// Receive
// ============================================================================

/// Receive form fields as submitted
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReceiveForm {
    pub item_type_id: Option<String>,
    pub batch_code: Option<String>,
    pub qty_received: Option<String>,
    pub received_at: Option<String>,
    pub notes: Option<String>,
    pub unit_cost: Option<String>,
    pub total_cost: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReceiveCommand {
    pub item_type_id: Uuid,
    pub batch_code: Option<String>,
    pub qty_received: i64,
    pub received_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub unit_cost: Option<Decimal>,
    pub total_cost: Option<Decimal>,
}

pub fn validate_receive(form: &ReceiveForm) -> Result<ReceiveCommand, FieldErrors> {
    let mut errors = FieldErrors::new();

    let item_type_id = parse_id(&mut errors, "itemTypeId", form.item_type_id.as_deref());
    let batch_code = optional_text(&mut errors, "batchCode", form.batch_code.as_deref(), 64);
    let qty_received = parse_positive_qty(&mut errors, "qtyReceived", form.qty_received.as_deref());
    let received_at = parse_optional_timestamp(&mut errors, "receivedAt", form.received_at.as_deref());
    let notes = optional_text(&mut errors, "notes", form.notes.as_deref(), MAX_NOTES_LEN);
    let unit_cost = parse_money(&mut errors, "unitCost", form.unit_cost.as_deref());
    let total_cost = parse_money(&mut errors, "totalCost", form.total_cost.as_deref());

    match (item_type_id, qty_received) {
        (Some(item_type_id), Some(qty_received)) if errors.is_empty() => Ok(ReceiveCommand {
            item_type_id,
            batch_code,
            qty_received,
            received_at,
            notes,
            unit_cost,
            total_cost,
        }),
        _ => Err(errors),
    }
}

// ============================================================================
// Issue
// ============================================================================

/// Issue form fields as submitted
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IssueForm {
    pub item_type_id: Option<String>,
    pub batch_id: Option<String>,
    pub qty: Option<String>,
    pub issued_to_type: Option<String>,
    pub issued_to_name: Option<String>,
    pub notes: Option<String>,
    pub unit_price: Option<String>,
    pub total_price: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IssueCommand {
    pub item_type_id: Uuid,
    pub batch_id: Uuid,
    pub qty: i64,
    pub issued_to_type: String,
    pub issued_to_name: String,
    pub notes: Option<String>,
    pub unit_price: Option<Decimal>,
    pub total_price: Option<Decimal>,
}

pub fn validate_issue(form: &IssueForm) -> Result<IssueCommand, FieldErrors> {
    let mut errors = FieldErrors::new();

    let item_type_id = parse_id(&mut errors, "itemTypeId", form.item_type_id.as_deref());
    let batch_id = parse_id(&mut errors, "batchId", form.batch_id.as_deref());
    let qty = parse_positive_qty(&mut errors, "qty", form.qty.as_deref());
    let issued_to_type = required_text(&mut errors, "issuedToType", form.issued_to_type.as_deref(), 50);
    let issued_to_name =
        required_text(&mut errors, "issuedToName", form.issued_to_name.as_deref(), MAX_NAME_LEN);
    let notes = optional_text(&mut errors, "notes", form.notes.as_deref(), MAX_NOTES_LEN);
    let unit_price = parse_money(&mut errors, "unitPrice", form.unit_price.as_deref());
    let total_price = parse_money(&mut errors, "totalPrice", form.total_price.as_deref());

    match (item_type_id, batch_id, qty, issued_to_type, issued_to_name) {
        (Some(item_type_id), Some(batch_id), Some(qty), Some(issued_to_type), Some(issued_to_name))
            if errors.is_empty() =>
        {
            Ok(IssueCommand {
                item_type_id,
                batch_id,
                qty,
                issued_to_type,
                issued_to_name,
                notes,
                unit_price,
                total_price,
            })
        }
        _ => Err(errors),
    }
}

// ============================================================================
// Amend
// ============================================================================

/// `PATCH /transactions/:id` body
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmendTransactionInput {
    pub qty: Option<i64>,
    pub unit_cost: Option<Decimal>,
    pub total_cost: Option<Decimal>,
    pub unit_price: Option<Decimal>,
    pub total_price: Option<Decimal>,
    pub issued_to_type: Option<String>,
    pub issued_to_name: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AmendCommand {
    pub amendment: Amendment,
    pub issued_to_type: Option<String>,
    pub issued_to_name: Option<String>,
    pub notes: Option<String>,
}

pub fn validate_amend(input: &AmendTransactionInput) -> Result<AmendCommand, FieldErrors> {
    let mut errors = FieldErrors::new();

    if let Some(qty) = input.qty {
        check_qty(&mut errors, "qty", qty);
    }
    let mut money = |field: &str, value: Option<Decimal>| match value {
        Some(amount) => check_money(&mut errors, field, amount),
        None => None,
    };
    let amendment = Amendment {
        qty: input.qty,
        unit_cost: money("unitCost", input.unit_cost),
        total_cost: money("totalCost", input.total_cost),
        unit_price: money("unitPrice", input.unit_price),
        total_price: money("totalPrice", input.total_price),
    };

    let issued_to_type = optional_text(&mut errors, "issuedToType", input.issued_to_type.as_deref(), 50);
    let issued_to_name =
        optional_text(&mut errors, "issuedToName", input.issued_to_name.as_deref(), MAX_NAME_LEN);
    let notes = optional_text(&mut errors, "notes", input.notes.as_deref(), MAX_NOTES_LEN);

    if errors.is_empty() && amendment == Amendment::default() && issued_to_type.is_none()
        && issued_to_name.is_none() && notes.is_none()
    {
        errors.add("body", "at least one field must be provided");
    }

    errors.into_result(|| AmendCommand {
        amendment,
        issued_to_type,
        issued_to_name,
        notes,
    })
}

// ============================================================================
// Item types
// ============================================================================

/// `POST /item-types` body
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemTypeInput {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: String,
    #[validate(
        length(min = 1, max = 32, message = "code must be 1-32 characters"),
        custom = "validate_item_code"
    )]
    pub code: String,
}

/// `PATCH /item-types/:id` body
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemTypeInput {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: Option<String>,
    pub is_active: Option<bool>,
}

/// Item codes are upper-case letters, digits, `-` and `_`
pub fn validate_item_code(code: &str) -> Result<(), ValidationError> {
    if code
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-' || c == '_')
    {
        Ok(())
    } else {
        let mut err = ValidationError::new("item_code");
        err.message = Some("code must be upper-case letters, digits, '-' or '_'".into());
        Err(err)
    }
}

pub fn validate_create_item_type(input: &CreateItemTypeInput) -> Result<CreateItemTypeInput, FieldErrors> {
    let normalized = CreateItemTypeInput {
        name: input.name.trim().to_string(),
        code: input.code.trim().to_ascii_uppercase(),
    };
    normalized.validate()?;
    Ok(normalized)
}

pub fn validate_update_item_type(input: &UpdateItemTypeInput) -> Result<UpdateItemTypeInput, FieldErrors> {
    let normalized = UpdateItemTypeInput {
        name: input.name.as_ref().map(|n| n.trim().to_string()),
        is_active: input.is_active,
    };
    normalized.validate()?;
    if normalized.name.is_none() && normalized.is_active.is_none() {
        return Err(FieldErrors::single("body", "at least one field must be provided"));
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn receive_form() -> ReceiveForm {
        ReceiveForm {
            item_type_id: Some(Uuid::new_v4().to_string()),
            qty_received: Some("50".to_string()),
            unit_cost: Some("2.00".to_string()),
            ..Default::default()
        }
    }

    fn issue_form() -> IssueForm {
        IssueForm {
            item_type_id: Some(Uuid::new_v4().to_string()),
            batch_id: Some(Uuid::new_v4().to_string()),
            qty: Some("5".to_string()),
            issued_to_type: Some("EMPLOYEE".to_string()),
            issued_to_name: Some("Dana".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_receive() {
        let cmd = validate_receive(&receive_form()).unwrap();
        assert_eq!(cmd.qty_received, 50);
        assert_eq!(cmd.unit_cost, Some(Decimal::new(200, 2)));
        assert_eq!(cmd.total_cost, None);
        assert_eq!(cmd.batch_code, None);
    }

    #[test]
    fn test_receive_collects_all_field_errors() {
        let form = ReceiveForm {
            item_type_id: Some("nope".to_string()),
            qty_received: Some("-4".to_string()),
            received_at: Some("yesterday".to_string()),
            unit_cost: Some("-1".to_string()),
            ..Default::default()
        };
        let errors = validate_receive(&form).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.get("itemTypeId").is_some());
        assert_eq!(errors.get("qtyReceived"), Some("qtyReceived must be greater than zero"));
        assert!(errors.get("receivedAt").is_some());
        assert_eq!(errors.get("unitCost"), Some("unitCost cannot be negative"));
    }

    #[test]
    fn test_receive_blank_fields_are_absent() {
        let mut form = receive_form();
        form.batch_code = Some("   ".to_string());
        form.total_cost = Some(String::new());
        let cmd = validate_receive(&form).unwrap();
        assert_eq!(cmd.batch_code, None);
        assert_eq!(cmd.total_cost, None);
    }

    #[test]
    fn test_receive_requires_qty() {
        let mut form = receive_form();
        form.qty_received = None;
        let errors = validate_receive(&form).unwrap_err();
        assert_eq!(errors.get("qtyReceived"), Some("qtyReceived is required"));
    }

    #[test]
    fn test_valid_issue() {
        let cmd = validate_issue(&issue_form()).unwrap();
        assert_eq!(cmd.qty, 5);
        assert_eq!(cmd.issued_to_name, "Dana");
    }

    #[test]
    fn test_issue_requires_batch_and_recipient() {
        let mut form = issue_form();
        form.batch_id = None;
        form.issued_to_name = Some(" ".to_string());
        let errors = validate_issue(&form).unwrap_err();
        assert_eq!(errors.get("batchId"), Some("batchId is required"));
        assert_eq!(errors.get("issuedToName"), Some("issuedToName is required"));
    }

    #[test]
    fn test_issue_rejects_fractional_qty() {
        let mut form = issue_form();
        form.qty = Some("1.5".to_string());
        let errors = validate_issue(&form).unwrap_err();
        assert_eq!(errors.get("qty"), Some("qty must be a whole number"));
    }

    #[test]
    fn test_amend_requires_a_field() {
        let errors = validate_amend(&AmendTransactionInput::default()).unwrap_err();
        assert!(errors.get("body").is_some());
    }

    #[test]
    fn test_amend_rejects_zero_qty() {
        let input = AmendTransactionInput {
            qty: Some(0),
            ..Default::default()
        };
        assert!(validate_amend(&input).unwrap_err().get("qty").is_some());
    }

    #[test]
    fn test_amend_notes_only() {
        let input = AmendTransactionInput {
            notes: Some("recount".to_string()),
            ..Default::default()
        };
        let cmd = validate_amend(&input).unwrap();
        assert_eq!(cmd.amendment, Amendment::default());
        assert_eq!(cmd.notes.as_deref(), Some("recount"));
    }

    #[test]
    fn test_create_item_type_normalizes_code() {
        let input = CreateItemTypeInput {
            name: "  Gift card 50 ".to_string(),
            code: "gc-50".to_string(),
        };
        let valid = validate_create_item_type(&input).unwrap();
        assert_eq!(valid.name, "Gift card 50");
        assert_eq!(valid.code, "GC-50");
    }

    #[test]
    fn test_create_item_type_rejects_bad_code() {
        let input = CreateItemTypeInput {
            name: "Gift".to_string(),
            code: "GC 50".to_string(),
        };
        let errors = validate_create_item_type(&input).unwrap_err();
        assert!(errors.get("code").is_some());

        let input = CreateItemTypeInput {
            name: " ".to_string(),
            code: "GC".to_string(),
        };
        assert_eq!(
            validate_create_item_type(&input).unwrap_err().get("name"),
            Some("name must be 1-100 characters")
        );
    }

    #[test]
    fn test_update_item_type_requires_field() {
        assert!(validate_update_item_type(&UpdateItemTypeInput::default()).is_err());
        let input = UpdateItemTypeInput {
            name: None,
            is_active: Some(false),
        };
        assert!(validate_update_item_type(&input).is_ok());
    }

    #[test]
    fn test_parse_bounds() {
        let start = parse_timestamp("2024-03-01").unwrap();
        let end = parse_end_bound("2024-03-31").unwrap();
        assert_eq!(start.to_rfc3339(), "2024-03-01T00:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2024-04-01T00:00:00+00:00");
        assert!(parse_timestamp("2024-03-01T10:00:00Z").is_some());
        assert!(parse_timestamp("03/01/2024").is_none());
    }

    #[test]
    fn test_field_errors_from_validator_use_camel_case() {
        assert_eq!(to_camel_case("issued_to_name"), "issuedToName");
        assert_eq!(to_camel_case("qty"), "qty");
    }

    #[test]
    fn test_receive_rejects_oversized_values() {
        let mut form = receive_form();
        form.qty_received = Some("9000000000000000000".to_string());
        form.unit_cost = Some("1000000000000".to_string());
        let errors = validate_receive(&form).unwrap_err();
        assert_eq!(errors.get("qtyReceived"), Some("qtyReceived must be at most 1000000000"));
        assert_eq!(errors.get("unitCost"), Some("unitCost must be at most 999999999999.99"));
    }

    #[test]
    fn test_money_at_the_limit_is_accepted() {
        let mut form = issue_form();
        form.total_price = Some("999999999999.99".to_string());
        form.qty = Some(MAX_QTY.to_string());
        let cmd = validate_issue(&form).unwrap();
        assert_eq!(cmd.total_price, Some(MAX_MONEY));
        assert_eq!(cmd.qty, MAX_QTY);
    }

    #[test]
    fn test_amend_rejects_oversized_qty() {
        let input = AmendTransactionInput {
            qty: Some(i64::MAX),
            ..Default::default()
        };
        let errors = validate_amend(&input).unwrap_err();
        assert!(errors.get("qty").is_some());
    }
}
