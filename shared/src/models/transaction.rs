//! Stock transaction (ledger) models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Kind of ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Receive,
    Issue,
    Adjustment,
    Reversal,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Receive => "RECEIVE",
            TransactionType::Issue => "ISSUE",
            TransactionType::Adjustment => "ADJUSTMENT",
            TransactionType::Reversal => "REVERSAL",
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RECEIVE" => Ok(TransactionType::Receive),
            "ISSUE" => Ok(TransactionType::Issue),
            "ADJUSTMENT" => Ok(TransactionType::Adjustment),
            "REVERSAL" => Ok(TransactionType::Reversal),
            other => Err(format!("unknown transaction type '{}'", other)),
        }
    }
}

/// Posting status. Reversed transactions are immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Posted,
    Reversed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Posted => "POSTED",
            TransactionStatus::Reversed => "REVERSED",
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "POSTED" => Ok(TransactionStatus::Posted),
            "REVERSED" => Ok(TransactionStatus::Reversed),
            other => Err(format!("unknown transaction status '{}'", other)),
        }
    }
}

/// A ledger entry against an item type and (usually) a batch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub status: TransactionStatus,
    pub item_type_id: Uuid,
    pub batch_id: Option<Uuid>,
    pub qty: i64,
    /// Cost side, set on RECEIVE
    pub unit_cost: Option<Decimal>,
    pub total_cost: Option<Decimal>,
    /// Price side, set on ISSUE
    pub unit_price: Option<Decimal>,
    pub total_price: Option<Decimal>,
    pub issued_to_type: Option<String>,
    pub issued_to_name: Option<String>,
    pub notes: Option<String>,
    /// Set on REVERSAL entries
    pub reversal_of: Option<Uuid>,
    pub created_by_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// File attached to a transaction. Never modified after upload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: Uuid,
    pub transaction_id: Uuid,
    pub original_name: String,
    pub stored_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub path: String,
    pub created_at: DateTime<Utc>,
}

/// Transaction with the names clients display next to it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDetail {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub item_type_name: String,
    pub item_type_code: String,
    pub batch_code: Option<String>,
    pub created_by: String,
    pub attachments: Vec<Attachment>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_type_round_trip_str() {
        for t in [
            TransactionType::Receive,
            TransactionType::Issue,
            TransactionType::Adjustment,
            TransactionType::Reversal,
        ] {
            assert_eq!(t.as_str().parse::<TransactionType>(), Ok(t));
        }
        assert_eq!("issue".parse::<TransactionType>(), Ok(TransactionType::Issue));
        assert!("transfer".parse::<TransactionType>().is_err());
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("POSTED".parse(), Ok(TransactionStatus::Posted));
        assert!("VOID".parse::<TransactionStatus>().is_err());
    }

    #[test]
    fn test_transaction_serializes_type_field() {
        let now = Utc::now();
        let tx = Transaction {
            id: Uuid::nil(),
            transaction_type: TransactionType::Receive,
            status: TransactionStatus::Posted,
            item_type_id: Uuid::nil(),
            batch_id: None,
            qty: 50,
            unit_cost: Some(Decimal::new(200, 2)),
            total_cost: Some(Decimal::new(10000, 2)),
            unit_price: None,
            total_price: None,
            issued_to_type: None,
            issued_to_name: None,
            notes: None,
            reversal_of: None,
            created_by_id: Uuid::nil(),
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["type"], "RECEIVE");
        assert_eq!(json["status"], "POSTED");
        assert_eq!(json["totalCost"], "100.00");
    }
}
