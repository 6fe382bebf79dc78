//! Batch ledger rules
//!
//! Pure guard clauses that keep a batch's received/issued counters consistent
//! with the transaction ledger. The backend re-reads the batch row inside a
//! database transaction, asks these functions for a plan and writes the plan;
//! nothing here performs I/O.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Transaction, TransactionStatus, TransactionType};
use crate::money::{
    sync_supplied, sync_unit_total, AmountTooLarge, ChangedField, MoneyInput, MoneyPair, MAX_MONEY,
};

/// Received/issued counters of one batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCounters {
    pub qty_received: i64,
    pub qty_issued: i64,
}

impl BatchCounters {
    pub fn available(&self) -> i64 {
        (self.qty_received - self.qty_issued).max(0)
    }

    /// `0 <= qty_issued <= qty_received`
    pub fn is_consistent(&self) -> bool {
        self.qty_issued >= 0 && self.qty_issued <= self.qty_received
    }

    fn checked(self) -> Result<Self, LedgerError> {
        if self.is_consistent() {
            Ok(self)
        } else {
            Err(LedgerError::CountersOutOfRange {
                qty_received: self.qty_received,
                qty_issued: self.qty_issued,
            })
        }
    }

    /// Move the counter a transaction type drives by `delta`
    fn shifted(self, transaction_type: TransactionType, delta: i64) -> Result<Self, LedgerError> {
        let overflow = || LedgerError::CountersOutOfRange {
            qty_received: self.qty_received,
            qty_issued: self.qty_issued,
        };
        let next = match transaction_type {
            TransactionType::Receive => BatchCounters {
                qty_received: self.qty_received.checked_add(delta).ok_or_else(overflow)?,
                ..self
            },
            TransactionType::Issue => BatchCounters {
                qty_issued: self.qty_issued.checked_add(delta).ok_or_else(overflow)?,
                ..self
            },
            TransactionType::Adjustment | TransactionType::Reversal => self,
        };
        next.checked()
    }
}

/// Ledger rule violations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("{field} must be greater than zero")]
    NonPositiveQty { field: &'static str },

    #[error("Requested quantity {requested} exceeds available quantity {available}")]
    InsufficientStock { requested: i64, available: i64 },

    #[error("Batch does not belong to the selected item type")]
    BatchItemTypeMismatch,

    #[error("Only POSTED transactions can be changed (status is {0})")]
    NotPosted(TransactionStatus),

    #[error("Change would leave {qty_issued} issued against {qty_received} received")]
    CountersOutOfRange { qty_received: i64, qty_issued: i64 },

    #[error("{0} transactions cannot be reversed")]
    NotReversible(TransactionType),

    #[error("{field} would make an amount exceed the maximum of {max}", max = MAX_MONEY)]
    AmountTooLarge { field: &'static str },

    #[error("{field} does not apply to {transaction_type} transactions")]
    FieldNotApplicable {
        field: &'static str,
        transaction_type: TransactionType,
    },
}

impl LedgerError {
    /// Request field the violation is reported against
    pub fn field(&self) -> Option<&'static str> {
        match self {
            LedgerError::NonPositiveQty { field } => Some(field),
            LedgerError::InsufficientStock { .. } => Some("qty"),
            LedgerError::BatchItemTypeMismatch => Some("batchId"),
            LedgerError::CountersOutOfRange { .. } => Some("qty"),
            LedgerError::FieldNotApplicable { field, .. } => Some(field),
            LedgerError::AmountTooLarge { field } => Some(field),
            LedgerError::NotPosted(_) | LedgerError::NotReversible(_) => None,
        }
    }

    /// Violations about the transaction's state rather than the request's data
    pub fn is_forbidden(&self) -> bool {
        matches!(self, LedgerError::NotPosted(_) | LedgerError::NotReversible(_))
    }
}

/// Oversized amounts are reported against the side the user supplied
fn too_large(unit: Option<Decimal>, unit_field: &'static str, total_field: &'static str) -> LedgerError {
    LedgerError::AmountTooLarge {
        field: if unit.is_some() { unit_field } else { total_field },
    }
}

/// Counters and cost for a new batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceivePlan {
    pub counters: BatchCounters,
    pub cost: MoneyPair,
}

pub fn plan_receive(
    qty_received: i64,
    unit_cost: Option<Decimal>,
    total_cost: Option<Decimal>,
) -> Result<ReceivePlan, LedgerError> {
    if qty_received <= 0 {
        return Err(LedgerError::NonPositiveQty {
            field: "qtyReceived",
        });
    }
    Ok(ReceivePlan {
        counters: BatchCounters {
            qty_received,
            qty_issued: 0,
        },
        cost: sync_supplied(qty_received, unit_cost, total_cost)
            .map_err(|_| too_large(unit_cost, "unitCost", "totalCost"))?,
    })
}

/// New counters and price for an issue against a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IssuePlan {
    pub counters: BatchCounters,
    pub price: MoneyPair,
}

#[derive(Debug, Clone, Copy)]
pub struct IssueRequest {
    pub item_type_id: Uuid,
    pub qty: i64,
    pub unit_price: Option<Decimal>,
    pub total_price: Option<Decimal>,
}

pub fn plan_issue(
    batch: BatchCounters,
    batch_item_type_id: Uuid,
    request: &IssueRequest,
) -> Result<IssuePlan, LedgerError> {
    if batch_item_type_id != request.item_type_id {
        return Err(LedgerError::BatchItemTypeMismatch);
    }
    if request.qty <= 0 {
        return Err(LedgerError::NonPositiveQty { field: "qty" });
    }
    let available = batch.available();
    if request.qty > available {
        return Err(LedgerError::InsufficientStock {
            requested: request.qty,
            available,
        });
    }
    Ok(IssuePlan {
        counters: batch.shifted(TransactionType::Issue, request.qty)?,
        price: sync_supplied(request.qty, request.unit_price, request.total_price)
            .map_err(|_| too_large(request.unit_price, "unitPrice", "totalPrice"))?,
    })
}

/// Fields a client may change on a posted transaction. `None` leaves a field as is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Amendment {
    pub qty: Option<i64>,
    pub unit_cost: Option<Decimal>,
    pub total_cost: Option<Decimal>,
    pub unit_price: Option<Decimal>,
    pub total_price: Option<Decimal>,
}

/// Result of amending a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmendPlan {
    pub qty: i64,
    /// New batch counters, present only when they change
    pub batch: Option<BatchCounters>,
    pub cost: MoneyPair,
    pub price: MoneyPair,
}

pub fn plan_amendment(
    transaction: &Transaction,
    batch: Option<BatchCounters>,
    change: &Amendment,
) -> Result<AmendPlan, LedgerError> {
    if transaction.status != TransactionStatus::Posted {
        return Err(LedgerError::NotPosted(transaction.status));
    }

    let kind = transaction.transaction_type;
    let not_applicable = |field| LedgerError::FieldNotApplicable {
        field,
        transaction_type: kind,
    };
    if kind != TransactionType::Receive {
        if change.unit_cost.is_some() {
            return Err(not_applicable("unitCost"));
        }
        if change.total_cost.is_some() {
            return Err(not_applicable("totalCost"));
        }
    }
    if kind != TransactionType::Issue {
        if change.unit_price.is_some() {
            return Err(not_applicable("unitPrice"));
        }
        if change.total_price.is_some() {
            return Err(not_applicable("totalPrice"));
        }
    }

    let qty = change.qty.unwrap_or(transaction.qty);
    if qty <= 0 {
        return Err(LedgerError::NonPositiveQty { field: "qty" });
    }
    let delta = qty - transaction.qty;

    let batch = match batch {
        Some(current) if delta != 0 => {
            let next = current.shifted(kind, delta)?;
            (next != current).then_some(next)
        }
        _ => None,
    };

    let cost = resync(
        qty,
        MoneyPair {
            unit: transaction.unit_cost,
            total: transaction.total_cost,
        },
        change.unit_cost,
        change.total_cost,
        delta != 0,
    )
    .map_err(|_| too_large(change.unit_cost.or(transaction.unit_cost), "unitCost", "totalCost"))?;
    let price = resync(
        qty,
        MoneyPair {
            unit: transaction.unit_price,
            total: transaction.total_price,
        },
        change.unit_price,
        change.total_price,
        delta != 0,
    )
    .map_err(|_| too_large(change.unit_price.or(transaction.unit_price), "unitPrice", "totalPrice"))?;

    Ok(AmendPlan {
        qty,
        batch,
        cost,
        price,
    })
}

fn resync(
    qty: i64,
    current: MoneyPair,
    unit: Option<Decimal>,
    total: Option<Decimal>,
    qty_changed: bool,
) -> Result<MoneyPair, AmountTooLarge> {
    let changed_field = match ChangedField::from_supplied(unit, total) {
        Some(field) => field,
        None if qty_changed => ChangedField::Qty,
        None => return Ok(current),
    };
    sync_unit_total(&MoneyInput {
        qty,
        unit: unit.or(current.unit),
        total: total.or(current.total),
        changed_field,
    })
}

/// Recipient fields may only change on a posted ISSUE
pub fn check_recipient_change(
    transaction: &Transaction,
    issued_to_type: bool,
    issued_to_name: bool,
) -> Result<(), LedgerError> {
    if transaction.status != TransactionStatus::Posted {
        return Err(LedgerError::NotPosted(transaction.status));
    }
    if transaction.transaction_type == TransactionType::Issue {
        return Ok(());
    }
    let field = match (issued_to_type, issued_to_name) {
        (true, _) => "issuedToType",
        (false, true) => "issuedToName",
        (false, false) => return Ok(()),
    };
    Err(LedgerError::FieldNotApplicable {
        field,
        transaction_type: transaction.transaction_type,
    })
}

/// Batch counters after reversing a posted RECEIVE or ISSUE
pub fn plan_reversal(
    transaction: &Transaction,
    batch: Option<BatchCounters>,
) -> Result<Option<BatchCounters>, LedgerError> {
    if transaction.status != TransactionStatus::Posted {
        return Err(LedgerError::NotPosted(transaction.status));
    }
    match transaction.transaction_type {
        TransactionType::Receive | TransactionType::Issue => {}
        other => return Err(LedgerError::NotReversible(other)),
    }
    batch
        .map(|c| c.shifted(transaction.transaction_type, -transaction.qty))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn counters(received: i64, issued: i64) -> BatchCounters {
        BatchCounters {
            qty_received: received,
            qty_issued: issued,
        }
    }

    fn posted(kind: TransactionType, qty: i64) -> Transaction {
        let now = Utc::now();
        Transaction {
            id: Uuid::new_v4(),
            transaction_type: kind,
            status: TransactionStatus::Posted,
            item_type_id: Uuid::nil(),
            batch_id: Some(Uuid::nil()),
            qty,
            unit_cost: None,
            total_cost: None,
            unit_price: None,
            total_price: None,
            issued_to_type: None,
            issued_to_name: None,
            notes: None,
            reversal_of: None,
            created_by_id: Uuid::nil(),
            created_at: now,
            updated_at: now,
        }
    }

    fn issue(item_type_id: Uuid, qty: i64) -> IssueRequest {
        IssueRequest {
            item_type_id,
            qty,
            unit_price: None,
            total_price: None,
        }
    }

    #[test]
    fn test_receive_syncs_cost() {
        let plan = plan_receive(50, Some(dec("2.00")), None).unwrap();
        assert_eq!(plan.counters, counters(50, 0));
        assert_eq!(plan.cost.unit, Some(dec("2.00")));
        assert_eq!(plan.cost.total, Some(dec("100.00")));
    }

    #[test]
    fn test_receive_without_cost() {
        let plan = plan_receive(5, None, None).unwrap();
        assert_eq!(plan.cost, MoneyPair::default());
    }

    #[test]
    fn test_receive_rejects_zero_qty() {
        assert_eq!(
            plan_receive(0, None, None),
            Err(LedgerError::NonPositiveQty { field: "qtyReceived" })
        );
    }

    #[test]
    fn test_issue_up_to_available() {
        let item = Uuid::new_v4();
        let batch = counters(100, 20);

        assert_eq!(
            plan_issue(batch, item, &issue(item, 81)),
            Err(LedgerError::InsufficientStock {
                requested: 81,
                available: 80
            })
        );

        let plan = plan_issue(batch, item, &issue(item, 80)).unwrap();
        assert_eq!(plan.counters, counters(100, 100));
        assert_eq!(plan.counters.available(), 0);
    }

    #[test]
    fn test_issue_rejects_non_positive_qty() {
        let item = Uuid::new_v4();
        let err = plan_issue(counters(10, 0), item, &issue(item, 0)).unwrap_err();
        assert_eq!(err, LedgerError::NonPositiveQty { field: "qty" });
        assert_eq!(err.field(), Some("qty"));
    }

    #[test]
    fn test_issue_rejects_foreign_batch() {
        let err = plan_issue(counters(10, 0), Uuid::new_v4(), &issue(Uuid::new_v4(), 1))
            .unwrap_err();
        assert_eq!(err, LedgerError::BatchItemTypeMismatch);
        assert_eq!(err.field(), Some("batchId"));
    }

    #[test]
    fn test_issue_syncs_price() {
        let item = Uuid::new_v4();
        let request = IssueRequest {
            item_type_id: item,
            qty: 4,
            unit_price: None,
            total_price: Some(dec("10.00")),
        };
        let plan = plan_issue(counters(10, 0), item, &request).unwrap();
        assert_eq!(plan.price.unit, Some(dec("2.50")));
    }

    #[test]
    fn test_amend_issue_qty_within_stock() {
        let tx = posted(TransactionType::Issue, 20);
        let plan = plan_amendment(
            &tx,
            Some(counters(100, 20)),
            &Amendment {
                qty: Some(30),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(plan.qty, 30);
        assert_eq!(plan.batch, Some(counters(100, 30)));
    }

    #[test]
    fn test_amend_issue_beyond_received_rejected() {
        let tx = posted(TransactionType::Issue, 20);
        let err = plan_amendment(
            &tx,
            Some(counters(100, 20)),
            &Amendment {
                qty: Some(101),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert_eq!(
            err,
            LedgerError::CountersOutOfRange {
                qty_received: 100,
                qty_issued: 101
            }
        );
    }

    #[test]
    fn test_amend_receive_below_issued_rejected() {
        let tx = posted(TransactionType::Receive, 100);
        let err = plan_amendment(
            &tx,
            Some(counters(100, 60)),
            &Amendment {
                qty: Some(50),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::CountersOutOfRange { .. }));

        let plan = plan_amendment(
            &tx,
            Some(counters(100, 60)),
            &Amendment {
                qty: Some(60),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(plan.batch, Some(counters(60, 60)));
    }

    #[test]
    fn test_amend_qty_rederives_total() {
        let mut tx = posted(TransactionType::Receive, 50);
        tx.unit_cost = Some(dec("2.00"));
        tx.total_cost = Some(dec("100.00"));
        let plan = plan_amendment(
            &tx,
            Some(counters(50, 0)),
            &Amendment {
                qty: Some(40),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(plan.cost.unit, Some(dec("2.00")));
        assert_eq!(plan.cost.total, Some(dec("80.00")));
        assert_eq!(plan.price, MoneyPair::default());
    }

    #[test]
    fn test_amend_total_cost_rederives_unit() {
        let mut tx = posted(TransactionType::Receive, 40);
        tx.unit_cost = Some(dec("2.00"));
        tx.total_cost = Some(dec("80.00"));
        let plan = plan_amendment(
            &tx,
            None,
            &Amendment {
                total_cost: Some(dec("100")),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(plan.cost.unit, Some(dec("2.50")));
        assert_eq!(plan.batch, None);
    }

    #[test]
    fn test_amend_reversed_is_forbidden() {
        let mut tx = posted(TransactionType::Issue, 5);
        tx.status = TransactionStatus::Reversed;
        let err = plan_amendment(&tx, None, &Amendment::default()).unwrap_err();
        assert_eq!(err, LedgerError::NotPosted(TransactionStatus::Reversed));
        assert!(err.is_forbidden());
    }

    #[test]
    fn test_amend_price_on_receive_not_applicable() {
        let tx = posted(TransactionType::Receive, 5);
        let err = plan_amendment(
            &tx,
            None,
            &Amendment {
                unit_price: Some(dec("1")),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert_eq!(err.field(), Some("unitPrice"));
    }

    #[test]
    fn test_amend_without_qty_change_keeps_batch() {
        let tx = posted(TransactionType::Issue, 5);
        let plan = plan_amendment(&tx, Some(counters(10, 5)), &Amendment::default()).unwrap();
        assert_eq!(plan.batch, None);
        assert_eq!(plan.qty, 5);
    }

    #[test]
    fn test_reverse_issue_returns_stock() {
        let tx = posted(TransactionType::Issue, 30);
        let next = plan_reversal(&tx, Some(counters(100, 50))).unwrap();
        assert_eq!(next, Some(counters(100, 20)));
    }

    #[test]
    fn test_reverse_receive_blocked_by_issues() {
        let tx = posted(TransactionType::Receive, 100);
        assert!(plan_reversal(&tx, Some(counters(100, 1))).is_err());
        assert_eq!(
            plan_reversal(&tx, Some(counters(100, 0))).unwrap(),
            Some(counters(0, 0))
        );
    }

    #[test]
    fn test_reverse_reversal_not_allowed() {
        let tx = posted(TransactionType::Reversal, 3);
        assert_eq!(
            plan_reversal(&tx, None),
            Err(LedgerError::NotReversible(TransactionType::Reversal))
        );
    }

    #[test]
    fn test_amend_qty_overflow_is_rejected() {
        let tx = posted(TransactionType::Issue, 5);
        let change = Amendment {
            qty: Some(i64::MAX),
            ..Default::default()
        };
        let err = plan_amendment(&tx, Some(counters(100, 10)), &change).unwrap_err();
        assert!(matches!(err, LedgerError::CountersOutOfRange { .. }));
    }

    #[test]
    fn test_receive_total_above_max() {
        let err = plan_receive(10, Some(dec("100000000000")), None).unwrap_err();
        assert_eq!(err, LedgerError::AmountTooLarge { field: "unitCost" });
        assert_eq!(err.field(), Some("unitCost"));
    }

    #[test]
    fn test_recipient_change_on_reversed_is_forbidden() {
        let mut tx = posted(TransactionType::Receive, 5);
        tx.status = TransactionStatus::Reversed;
        let err = check_recipient_change(&tx, false, true).unwrap_err();
        assert!(err.is_forbidden());
    }

    #[test]
    fn test_recipient_change_only_on_issue() {
        let receive = posted(TransactionType::Receive, 5);
        assert_eq!(
            check_recipient_change(&receive, false, true).unwrap_err().field(),
            Some("issuedToName")
        );
        assert!(check_recipient_change(&receive, false, false).is_ok());
        assert!(check_recipient_change(&posted(TransactionType::Issue, 5), true, true).is_ok());
    }
}
