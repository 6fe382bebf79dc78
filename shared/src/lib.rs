//! Shared domain logic for the card stock tracker
//!
//! Pure types and rules shared by the backend and the browser (via WASM):
//! money synchronization, pagination, the batch ledger rules, report rollups
//! and input validation. Nothing in this crate performs I/O.

pub mod ledger;
pub mod models;
pub mod money;
pub mod pagination;
pub mod reports;
pub mod types;
pub mod validation;

pub use ledger::{BatchCounters, LedgerError};
pub use models::*;
pub use money::{
    round_money, sync_unit_total, AmountTooLarge, ChangedField, MoneyInput, MoneyPair, MAX_MONEY,
};
pub use pagination::{normalize_pagination, PageRequest};
pub use types::*;
pub use validation::FieldErrors;
