//! Pagination and date-range tests
//!
//! Tests for list endpoint paging including:
//! - Property 7: Page And Limit Are Clamped
//! - Property 8: Pages Cover Every Row Exactly Once
//! - Property 9: Inclusive End Date Covers The Whole Day
//! - Property 14: Any Page Number Yields A Valid Offset

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use shared::pagination::{total_pages, DEFAULT_PAGE_SIZE, MAX_PAGE, MAX_PAGE_SIZE};
use shared::validation::{parse_end_bound, parse_timestamp};
use shared::{normalize_pagination, DateRange, PageRequest, PaginatedResponse};

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Page 0 with a huge limit becomes page 1 of 100
    #[test]
    fn test_clamp_out_of_range() {
        assert_eq!(
            normalize_pagination(Some(0), Some(500)),
            PageRequest { page: 1, limit: 100 }
        );
    }

    /// Missing values fall back to page 1 of 20
    #[test]
    fn test_defaults() {
        let page = normalize_pagination(None, None);
        assert_eq!(page.page, 1);
        assert_eq!(page.limit, DEFAULT_PAGE_SIZE);
        assert_eq!(page, PageRequest::default());
    }

    /// Offsets follow the page number
    #[test]
    fn test_skip() {
        assert_eq!(normalize_pagination(Some(3), Some(25)).skip(), 50);
    }

    /// The largest page number is capped before the offset is computed
    #[test]
    fn test_huge_page_offset() {
        let request = normalize_pagination(Some(i64::MAX), Some(100));
        assert_eq!(request.page, MAX_PAGE);
        assert!(request.skip() >= 0);
        assert_eq!(request.skip(), (MAX_PAGE - 1) * 100);
    }

    /// A hand-built request past the cap saturates instead of wrapping
    #[test]
    fn test_unclamped_skip_saturates() {
        let request = PageRequest { page: i64::MAX, limit: 100 };
        assert_eq!(request.skip(), i64::MAX);
    }

    /// Total pages for an empty result is zero
    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(0, 20), 0);
        assert_eq!(total_pages(20, 20), 1);
        assert_eq!(total_pages(21, 20), 2);
    }

    /// Response metadata echoes the clamped request
    #[test]
    fn test_response_meta() {
        let response = PaginatedResponse::new(vec!["a"; 5], normalize_pagination(Some(2), Some(5)), 12);
        assert_eq!(response.pagination.page, 2);
        assert_eq!(response.pagination.limit, 5);
        assert_eq!(response.pagination.total, 12);
        assert_eq!(response.pagination.total_pages, 3);
    }

    /// A plain end date includes the last day
    #[test]
    fn test_end_date_is_inclusive() {
        let range = DateRange {
            start: parse_timestamp("2024-03-01"),
            end: parse_end_bound("2024-03-31"),
        };
        assert!(range.contains(Utc.with_ymd_and_hms(2024, 3, 31, 23, 59, 59).unwrap()));
        assert!(!range.contains(Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap()));
        assert!(!range.contains(Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 59).unwrap()));
    }

    /// Garbage dates are not parsed
    #[test]
    fn test_bad_dates() {
        assert!(parse_timestamp("31/03/2024").is_none());
        assert!(parse_end_bound("yesterday").is_none());
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

fn any_page() -> impl Strategy<Value = Option<i64>> {
    proptest::option::of(-1_000i64..1_000)
}

fn day_strategy() -> impl Strategy<Value = NaiveDate> {
    (0i64..3_650).prop_map(|offset| {
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + Duration::days(offset)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property 7: Page And Limit Are Clamped
    /// For any input, page >= 1 and 1 <= limit <= 100
    #[test]
    fn prop_page_and_limit_clamped(page in any_page(), limit in any_page()) {
        let request = normalize_pagination(page, limit);
        prop_assert!(request.page >= 1);
        prop_assert!(request.limit >= 1 && request.limit <= MAX_PAGE_SIZE);
        prop_assert!(request.skip() >= 0);
    }

    /// Property 8: Pages Cover Every Row Exactly Once
    /// Walking pages 1..=totalPages visits each row index once
    #[test]
    fn prop_pages_cover_rows(total in 0i64..500, limit in 1i64..=100) {
        let pages = total_pages(total, limit);
        let mut seen = 0i64;
        for page in 1..=pages {
            let request = normalize_pagination(Some(page), Some(limit));
            prop_assert_eq!(request.skip(), seen);
            seen += request.limit.min(total - request.skip());
        }
        prop_assert_eq!(seen, total);
    }

    /// Property 9: Inclusive End Date Covers The Whole Day
    /// A range ending on a plain date contains every second of that day
    #[test]
    fn prop_end_date_inclusive(day in day_strategy(), seconds in 0u32..86_400) {
        let raw = day.format("%Y-%m-%d").to_string();
        let range = DateRange { start: parse_timestamp(&raw), end: parse_end_bound(&raw) };

        let midnight = Utc.from_utc_datetime(&day.and_hms_opt(0, 0, 0).unwrap());
        prop_assert!(range.contains(midnight + Duration::seconds(i64::from(seconds))));
        prop_assert!(!range.contains(midnight + Duration::days(1)));
    }

    /// Property 14: Any Page Number Yields A Valid Offset
    /// Over the whole i64 range the clamped page stays in bounds and skip() never goes negative
    #[test]
    fn prop_any_page_has_offset(page in any::<i64>(), limit in any::<i64>()) {
        let request = normalize_pagination(Some(page), Some(limit));
        prop_assert!(request.page >= 1 && request.page <= MAX_PAGE);
        prop_assert!(request.skip() >= 0);
        prop_assert!(request.skip() <= i64::MAX - request.limit);
    }
}
