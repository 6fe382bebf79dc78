//! HTTP handlers

pub mod health;
pub mod inventory;
pub mod item_type;
pub mod report;
pub mod transaction;
pub mod upload;

pub use health::health_check;
pub use inventory::{issue_stock, list_batches, receive_stock};
pub use item_type::{create_item_type, list_item_types, update_item_type};
pub use report::{dashboard, issues_report, receipts_report, stock_balance, user_activity};
pub use transaction::{amend_transaction, get_transaction, list_transactions, reverse_transaction};
pub use upload::get_upload;

use shared::validation::{parse_end_bound, parse_timestamp};
use shared::{DateRange, FieldErrors};

use crate::error::AppResult;

/// `startDate` / `endDate` query values as a half-open range. A plain end
/// date includes that whole day.
pub(crate) fn date_range(start: Option<&str>, end: Option<&str>) -> AppResult<DateRange> {
    let mut errors = FieldErrors::new();
    fn present(v: Option<&str>) -> Option<&str> {
        v.map(str::trim).filter(|v| !v.is_empty())
    }

    let start = present(start).and_then(|raw| {
        let parsed = parse_timestamp(raw);
        if parsed.is_none() {
            errors.add("startDate", "startDate must be a date (YYYY-MM-DD) or RFC 3339 timestamp");
        }
        parsed
    });
    let end = present(end).and_then(|raw| {
        let parsed = parse_end_bound(raw);
        if parsed.is_none() {
            errors.add("endDate", "endDate must be a date (YYYY-MM-DD) or RFC 3339 timestamp");
        }
        parsed
    });

    if let (Some(s), Some(e)) = (start, end) {
        if s >= e {
            errors.add("endDate", "endDate must not be before startDate");
        }
    }

    errors
        .into_result(|| DateRange { start, end })
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_range_whole_days() {
        let range = date_range(Some("2024-03-01"), Some("2024-03-01")).unwrap();
        assert_eq!(range.start.unwrap().to_rfc3339(), "2024-03-01T00:00:00+00:00");
        assert_eq!(range.end.unwrap().to_rfc3339(), "2024-03-02T00:00:00+00:00");
    }

    #[test]
    fn test_date_range_open_and_invalid() {
        assert_eq!(date_range(None, Some(" ")).unwrap(), DateRange::default());
        assert!(date_range(Some("tomorrow"), None).is_err());
        assert!(date_range(Some("2024-03-05"), Some("2024-03-01")).is_err());
    }
}
