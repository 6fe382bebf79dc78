//! Financial and activity reports
//!
//! Loads the filtered transactions once and hands them to the shared
//! aggregation functions.

use serde::Serialize;
use shared::reports::{
    activity_by_user, issues_by_recipient, monthly_series, movement_summary, rollup_by_item_type,
    totals, ItemTypeRollup, MonthBucket, MovementSummary, RecipientRollup, ReportLine,
    StockTotals, UserActivity, SERIES_MONTHS,
};
use shared::TransactionType;
use sqlx::PgPool;

use crate::error::AppResult;
use crate::repositories::{TransactionFilter, TransactionRepository};

const RECENT_TRANSACTIONS: usize = 10;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardReport {
    pub totals: StockTotals,
    pub by_item_type: Vec<ItemTypeRollup>,
    pub monthly: Vec<MonthBucket>,
    pub recent_transactions: Vec<ReportLine>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockBalanceReport {
    pub items: Vec<ItemTypeRollup>,
    pub totals: StockTotals,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuesReport {
    pub transactions: Vec<ReportLine>,
    pub summary: MovementSummary,
    pub by_recipient: Vec<RecipientRollup>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptsReport {
    pub transactions: Vec<ReportLine>,
    pub summary: MovementSummary,
    pub monthly: Vec<MonthBucket>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserActivityReport {
    pub users: Vec<UserActivity>,
}

#[derive(Clone)]
pub struct ReportService {
    db: PgPool,
}

impl ReportService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn lines(&self, filter: &TransactionFilter) -> AppResult<Vec<ReportLine>> {
        let lines = TransactionRepository::report_lines(&self.db, filter).await?;
        tracing::debug!("Aggregating {} transactions in {} mode", lines.len(), filter.mode);
        Ok(lines)
    }

    pub async fn dashboard(&self, filter: &TransactionFilter) -> AppResult<DashboardReport> {
        let lines = self.lines(filter).await?;
        let by_item_type = rollup_by_item_type(&lines);

        Ok(DashboardReport {
            totals: totals(&by_item_type),
            monthly: monthly_series(&lines, SERIES_MONTHS),
            recent_transactions: lines.iter().rev().take(RECENT_TRANSACTIONS).cloned().collect(),
            by_item_type,
        })
    }

    pub async fn stock_balance(&self, filter: &TransactionFilter) -> AppResult<StockBalanceReport> {
        let lines = self.lines(filter).await?;
        let items = rollup_by_item_type(&lines);

        Ok(StockBalanceReport {
            totals: totals(&items),
            items,
        })
    }

    pub async fn issues(&self, filter: &TransactionFilter) -> AppResult<IssuesReport> {
        let lines = self.lines(&with_type(filter, TransactionType::Issue)).await?;

        Ok(IssuesReport {
            summary: movement_summary(&lines, TransactionType::Issue),
            by_recipient: issues_by_recipient(&lines),
            transactions: newest_first(lines),
        })
    }

    pub async fn receipts(&self, filter: &TransactionFilter) -> AppResult<ReceiptsReport> {
        let lines = self.lines(&with_type(filter, TransactionType::Receive)).await?;

        Ok(ReceiptsReport {
            summary: movement_summary(&lines, TransactionType::Receive),
            monthly: monthly_series(&lines, SERIES_MONTHS),
            transactions: newest_first(lines),
        })
    }

    pub async fn user_activity(&self, filter: &TransactionFilter) -> AppResult<UserActivityReport> {
        let lines = self.lines(filter).await?;

        Ok(UserActivityReport {
            users: activity_by_user(&lines),
        })
    }
}

fn with_type(filter: &TransactionFilter, kind: TransactionType) -> TransactionFilter {
    TransactionFilter {
        transaction_type: Some(kind),
        ..*filter
    }
}

fn newest_first(mut lines: Vec<ReportLine>) -> Vec<ReportLine> {
    lines.reverse();
    lines
}
