//! Stock batch models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ledger::BatchCounters;

/// A quantity of one item type received in a single delivery.
///
/// `qty_received` and `qty_issued` are running counters adjusted by the ledger
/// rules; `0 <= qty_issued <= qty_received` holds after every write.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    pub id: Uuid,
    pub item_type_id: Uuid,
    pub batch_code: String,
    pub qty_received: i64,
    pub qty_issued: i64,
    pub received_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Batch {
    /// Quantity still available to issue, never negative
    pub fn available_qty(&self) -> i64 {
        self.counters().available()
    }

    pub fn counters(&self) -> BatchCounters {
        BatchCounters {
            qty_received: self.qty_received,
            qty_issued: self.qty_issued,
        }
    }
}

/// Batch as listed to clients, with its item type and availability
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchView {
    #[serde(flatten)]
    pub batch: Batch,
    pub available_qty: i64,
    pub item_type_name: String,
    pub item_type_code: String,
}

impl BatchView {
    pub fn new(batch: Batch, item_type_name: String, item_type_code: String) -> Self {
        Self {
            available_qty: batch.available_qty(),
            batch,
            item_type_name,
            item_type_code,
        }
    }
}

/// Generate a batch code such as `B-20240315-7F3A9C`
pub fn generate_batch_code(received_at: DateTime<Utc>, entropy: Uuid) -> String {
    let suffix: String = entropy
        .simple()
        .to_string()
        .chars()
        .take(6)
        .collect::<String>()
        .to_ascii_uppercase();
    format!("B-{}-{}", received_at.format("%Y%m%d"), suffix)
}
