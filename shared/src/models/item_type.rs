//! Item type models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::SystemMode;

/// A kind of stock that batches are received into (e.g. "Gift card 50").
///
/// Item types are soft-disabled through `is_active` and never deleted, so
/// historical transactions always resolve to a name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ItemType {
    pub id: Uuid,
    pub name: String,
    /// Unique short code (e.g. "GC-50")
    pub code: String,
    pub is_active: bool,
    pub mode: SystemMode,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
