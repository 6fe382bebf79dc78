//! Read-side report aggregation
//!
//! Rollups over a transaction set that was already filtered by item type,
//! date range and mode. Everything is a single pass with in-memory maps.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

use crate::models::{TransactionStatus, TransactionType};
use crate::money::round_money;

/// Number of monthly buckets kept in time series
pub const SERIES_MONTHS: usize = 6;

/// One transaction as seen by the reports
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportLine {
    pub transaction_id: Uuid,
    pub item_type_id: Uuid,
    pub item_type_name: String,
    pub item_type_code: String,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub status: TransactionStatus,
    pub qty: i64,
    pub unit_cost: Option<Decimal>,
    pub total_cost: Option<Decimal>,
    pub unit_price: Option<Decimal>,
    pub total_price: Option<Decimal>,
    pub issued_to_type: Option<String>,
    pub issued_to_name: Option<String>,
    pub batch_code: Option<String>,
    pub created_by_id: Uuid,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl ReportLine {
    /// Posted receipts and issues; reversed entries and their reversals cancel out
    pub fn counts_toward_stock(&self) -> bool {
        self.status == TransactionStatus::Posted
            && matches!(
                self.transaction_type,
                TransactionType::Receive | TransactionType::Issue
            )
    }

    fn is(&self, kind: TransactionType) -> bool {
        self.counts_toward_stock() && self.transaction_type == kind
    }
}

/// Explicit total, else `unit * qty`, else zero. Saturates instead of overflowing.
fn line_amount(qty: i64, unit: Option<Decimal>, total: Option<Decimal>) -> Decimal {
    match (total, unit) {
        (Some(total), _) => total,
        (None, Some(unit)) => unit.saturating_mul(Decimal::from(qty)),
        (None, None) => Decimal::ZERO,
    }
}

pub fn sum_cost(line: &ReportLine) -> Decimal {
    line_amount(line.qty, line.unit_cost, line.total_cost)
}

pub fn sum_revenue(line: &ReportLine) -> Decimal {
    line_amount(line.qty, line.unit_price, line.total_price)
}

fn ratio(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator.is_zero() {
        return Decimal::ZERO;
    }
    numerator.checked_div(denominator).unwrap_or_else(|| {
        if numerator.is_sign_negative() != denominator.is_sign_negative() {
            Decimal::MIN
        } else {
            Decimal::MAX
        }
    })
}

/// Stock and money rollup for one item type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemTypeRollup {
    pub item_type_id: Uuid,
    pub item_type_name: String,
    pub item_type_code: String,
    pub received_qty: i64,
    pub issued_qty: i64,
    pub balance: i64,
    pub received_cost: Decimal,
    pub issued_revenue: Decimal,
    pub avg_unit_cost: Decimal,
    pub avg_unit_price: Decimal,
    pub inventory_value: Decimal,
    pub cost_of_issued: Decimal,
    pub gross_profit: Decimal,
    pub margin_percent: Decimal,
}

impl ItemTypeRollup {
    fn empty(line: &ReportLine) -> Self {
        Self {
            item_type_id: line.item_type_id,
            item_type_name: line.item_type_name.clone(),
            item_type_code: line.item_type_code.clone(),
            received_qty: 0,
            issued_qty: 0,
            balance: 0,
            received_cost: Decimal::ZERO,
            issued_revenue: Decimal::ZERO,
            avg_unit_cost: Decimal::ZERO,
            avg_unit_price: Decimal::ZERO,
            inventory_value: Decimal::ZERO,
            cost_of_issued: Decimal::ZERO,
            gross_profit: Decimal::ZERO,
            margin_percent: Decimal::ZERO,
        }
    }

    fn finish(mut self) -> Self {
        let received = Decimal::from(self.received_qty);
        let issued = Decimal::from(self.issued_qty);
        self.balance = self.received_qty.saturating_sub(self.issued_qty);

        let avg_unit_cost = ratio(self.received_cost, received);
        self.avg_unit_cost = round_money(avg_unit_cost);
        self.avg_unit_price = round_money(ratio(self.issued_revenue, issued));
        self.inventory_value = round_money(Decimal::from(self.balance).saturating_mul(avg_unit_cost));
        self.cost_of_issued = round_money(issued.saturating_mul(avg_unit_cost));
        self.received_cost = round_money(self.received_cost);
        self.issued_revenue = round_money(self.issued_revenue);
        self.gross_profit = self.issued_revenue.saturating_sub(self.cost_of_issued);
        self.margin_percent = round_money(
            ratio(self.gross_profit, self.issued_revenue).saturating_mul(Decimal::ONE_HUNDRED),
        );
        self
    }
}

/// Group by item type, ordered by item type name
pub fn rollup_by_item_type(lines: &[ReportLine]) -> Vec<ItemTypeRollup> {
    let mut groups: HashMap<Uuid, ItemTypeRollup> = HashMap::new();

    for line in lines.iter().filter(|l| l.counts_toward_stock()) {
        let entry = groups
            .entry(line.item_type_id)
            .or_insert_with(|| ItemTypeRollup::empty(line));
        match line.transaction_type {
            TransactionType::Receive => {
                entry.received_qty = entry.received_qty.saturating_add(line.qty);
                entry.received_cost = entry.received_cost.saturating_add(sum_cost(line));
            }
            TransactionType::Issue => {
                entry.issued_qty = entry.issued_qty.saturating_add(line.qty);
                entry.issued_revenue = entry.issued_revenue.saturating_add(sum_revenue(line));
            }
            _ => {}
        }
    }

    let mut rollups: Vec<ItemTypeRollup> = groups.into_values().map(ItemTypeRollup::finish).collect();
    rollups.sort_by(|a, b| {
        a.item_type_name
            .cmp(&b.item_type_name)
            .then(a.item_type_code.cmp(&b.item_type_code))
    });
    rollups
}

/// Totals across item types
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockTotals {
    pub item_type_count: usize,
    pub received_qty: i64,
    pub issued_qty: i64,
    pub balance: i64,
    pub received_cost: Decimal,
    pub issued_revenue: Decimal,
    pub inventory_value: Decimal,
    pub gross_profit: Decimal,
}

pub fn totals(rollups: &[ItemTypeRollup]) -> StockTotals {
    rollups.iter().fold(
        StockTotals {
            item_type_count: rollups.len(),
            ..Default::default()
        },
        |mut acc, r| {
            acc.received_qty = acc.received_qty.saturating_add(r.received_qty);
            acc.issued_qty = acc.issued_qty.saturating_add(r.issued_qty);
            acc.balance = acc.balance.saturating_add(r.balance);
            acc.received_cost = acc.received_cost.saturating_add(r.received_cost);
            acc.issued_revenue = acc.issued_revenue.saturating_add(r.issued_revenue);
            acc.inventory_value = acc.inventory_value.saturating_add(r.inventory_value);
            acc.gross_profit = acc.gross_profit.saturating_add(r.gross_profit);
            acc
        },
    )
}

/// One `YYYY-MM` bucket of the money time series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthBucket {
    pub month: String,
    pub cost: Decimal,
    pub revenue: Decimal,
    pub profit: Decimal,
}

/// Cost of receipts and revenue of issues per month, newest `max_buckets` kept, ascending
pub fn monthly_series(lines: &[ReportLine], max_buckets: usize) -> Vec<MonthBucket> {
    let mut months: BTreeMap<String, (Decimal, Decimal)> = BTreeMap::new();

    for line in lines.iter().filter(|l| l.counts_toward_stock()) {
        let key = line.created_at.format("%Y-%m").to_string();
        let (cost, revenue) = months.entry(key).or_insert((Decimal::ZERO, Decimal::ZERO));
        match line.transaction_type {
            TransactionType::Receive => *cost = cost.saturating_add(sum_cost(line)),
            TransactionType::Issue => *revenue = revenue.saturating_add(sum_revenue(line)),
            _ => {}
        }
    }

    let skip = months.len().saturating_sub(max_buckets);
    months
        .into_iter()
        .skip(skip)
        .map(|(month, (cost, revenue))| {
            let cost = round_money(cost);
            let revenue = round_money(revenue);
            MonthBucket {
                month,
                cost,
                revenue,
                profit: revenue.saturating_sub(cost),
            }
        })
        .collect()
}

/// Transaction counts for one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserActivity {
    pub user_id: Uuid,
    pub username: String,
    pub receive_count: u64,
    pub issue_count: u64,
    pub adjustment_count: u64,
    pub reversal_count: u64,
    pub total: u64,
    pub last_activity_at: DateTime<Utc>,
}

/// Per-user counts by transaction type, busiest users first
pub fn activity_by_user(lines: &[ReportLine]) -> Vec<UserActivity> {
    let mut users: HashMap<Uuid, UserActivity> = HashMap::new();

    for line in lines {
        let entry = users.entry(line.created_by_id).or_insert_with(|| UserActivity {
            user_id: line.created_by_id,
            username: line.created_by.clone(),
            receive_count: 0,
            issue_count: 0,
            adjustment_count: 0,
            reversal_count: 0,
            total: 0,
            last_activity_at: line.created_at,
        });
        match line.transaction_type {
            TransactionType::Receive => entry.receive_count += 1,
            TransactionType::Issue => entry.issue_count += 1,
            TransactionType::Adjustment => entry.adjustment_count += 1,
            TransactionType::Reversal => entry.reversal_count += 1,
        }
        entry.total += 1;
        entry.last_activity_at = entry.last_activity_at.max(line.created_at);
    }

    let mut activity: Vec<UserActivity> = users.into_values().collect();
    activity.sort_by(|a, b| b.total.cmp(&a.total).then(a.username.cmp(&b.username)));
    activity
}

/// Issued quantity and revenue per recipient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientRollup {
    pub issued_to_name: String,
    pub issued_to_type: Option<String>,
    pub issue_count: u64,
    pub qty: i64,
    pub revenue: Decimal,
}

pub fn issues_by_recipient(lines: &[ReportLine]) -> Vec<RecipientRollup> {
    let mut recipients: BTreeMap<String, RecipientRollup> = BTreeMap::new();

    for line in lines.iter().filter(|l| l.is(TransactionType::Issue)) {
        let name = line
            .issued_to_name
            .clone()
            .unwrap_or_else(|| "Unknown".to_string());
        let entry = recipients
            .entry(name.clone())
            .or_insert_with(|| RecipientRollup {
                issued_to_name: name,
                issued_to_type: line.issued_to_type.clone(),
                issue_count: 0,
                qty: 0,
                revenue: Decimal::ZERO,
            });
        entry.issue_count += 1;
        entry.qty = entry.qty.saturating_add(line.qty);
        entry.revenue = entry.revenue.saturating_add(sum_revenue(line));
    }

    let mut rollups: Vec<RecipientRollup> = recipients.into_values().collect();
    rollups.sort_by(|a, b| b.qty.cmp(&a.qty).then(a.issued_to_name.cmp(&b.issued_to_name)));
    rollups
}

/// Quantity and money totals of one transaction type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementSummary {
    pub count: u64,
    pub qty: i64,
    pub amount: Decimal,
}

/// Summary of posted receipts (amount = cost) or issues (amount = revenue)
pub fn movement_summary(lines: &[ReportLine], kind: TransactionType) -> MovementSummary {
    let mut summary = lines
        .iter()
        .filter(|l| l.is(kind))
        .fold(MovementSummary::default(), |mut acc, line| {
            acc.count += 1;
            acc.qty = acc.qty.saturating_add(line.qty);
            let amount = match kind {
                TransactionType::Issue => sum_revenue(line),
                _ => sum_cost(line),
            };
            acc.amount = acc.amount.saturating_add(amount);
            acc
        });
    summary.amount = round_money(summary.amount);
    summary
}
