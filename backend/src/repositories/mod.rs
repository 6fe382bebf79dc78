//! Database access, one repository per entity
//!
//! Repository functions take any Postgres executor, so the same query runs on
//! the pool or inside an open `pool.begin()` transaction.

pub mod attachment;
pub mod batch;
pub mod item_type;
pub mod transaction;
pub mod user;

pub use attachment::{AttachmentRepository, NewAttachment};
pub use batch::{BatchFilter, BatchRepository, NewBatch};
pub use item_type::ItemTypeRepository;
pub use transaction::{NewTransaction, TransactionFilter, TransactionRepository, TransactionUpdate};
pub use user::UserRepository;

use std::str::FromStr;

use crate::error::{AppError, AppResult};

/// Parse a text column into a domain enum
pub(crate) fn parse_column<T>(column: &str, value: &str) -> AppResult<T>
where
    T: FromStr<Err = String>,
{
    value
        .parse()
        .map_err(|e: String| AppError::Internal(format!("invalid {} value in database: {}", column, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{SystemMode, TransactionType};

    #[test]
    fn test_parse_column() {
        let kind: TransactionType = parse_column("transaction_type", "ISSUE").unwrap();
        assert_eq!(kind, TransactionType::Issue);
        let err = parse_column::<SystemMode>("mode", "NOPE").unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }
}
