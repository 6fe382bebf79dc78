use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shared::reports::ReportLine;
use shared::{
    DateRange, PageRequest, SystemMode, Transaction, TransactionDetail, TransactionStatus,
    TransactionType,
};
use sqlx::{Executor, FromRow, Postgres};
use uuid::Uuid;

use super::parse_column;
use crate::error::{AppError, AppResult};

const COLUMNS: &str = "t.id, t.transaction_type, t.status, t.item_type_id, t.batch_id, t.qty, \
                       t.unit_cost, t.total_cost, t.unit_price, t.total_price, \
                       t.issued_to_type, t.issued_to_name, t.notes, t.reversal_of, \
                       t.created_by_id, t.created_at, t.updated_at";

const DETAIL_JOINS: &str = "FROM transactions t \
                            JOIN item_types i ON i.id = t.item_type_id \
                            JOIN users u ON u.id = t.created_by_id \
                            LEFT JOIN batches b ON b.id = t.batch_id";

/// Shared WHERE clause for list, count and report queries ($1..$5)
const FILTER: &str = "i.mode = $1 \
                      AND ($2::text IS NULL OR t.transaction_type = $2) \
                      AND ($3::uuid IS NULL OR t.item_type_id = $3) \
                      AND ($4::timestamptz IS NULL OR t.created_at >= $4) \
                      AND ($5::timestamptz IS NULL OR t.created_at < $5)";

#[derive(Debug, FromRow)]
struct TransactionRow {
    id: Uuid,
    transaction_type: String,
    status: String,
    item_type_id: Uuid,
    batch_id: Option<Uuid>,
    qty: i64,
    unit_cost: Option<Decimal>,
    total_cost: Option<Decimal>,
    unit_price: Option<Decimal>,
    total_price: Option<Decimal>,
    issued_to_type: Option<String>,
    issued_to_name: Option<String>,
    notes: Option<String>,
    reversal_of: Option<Uuid>,
    created_by_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = AppError;

    fn try_from(row: TransactionRow) -> AppResult<Self> {
        Ok(Transaction {
            id: row.id,
            transaction_type: parse_column("transaction_type", &row.transaction_type)?,
            status: parse_column("status", &row.status)?,
            item_type_id: row.item_type_id,
            batch_id: row.batch_id,
            qty: row.qty,
            unit_cost: row.unit_cost,
            total_cost: row.total_cost,
            unit_price: row.unit_price,
            total_price: row.total_price,
            issued_to_type: row.issued_to_type,
            issued_to_name: row.issued_to_name,
            notes: row.notes,
            reversal_of: row.reversal_of,
            created_by_id: row.created_by_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct DetailRow {
    #[sqlx(flatten)]
    transaction: TransactionRow,
    item_type_name: String,
    item_type_code: String,
    batch_code: Option<String>,
    created_by: String,
}

impl TryFrom<DetailRow> for TransactionDetail {
    type Error = AppError;

    fn try_from(row: DetailRow) -> AppResult<Self> {
        Ok(TransactionDetail {
            transaction: row.transaction.try_into()?,
            item_type_name: row.item_type_name,
            item_type_code: row.item_type_code,
            batch_code: row.batch_code,
            created_by: row.created_by,
            attachments: Vec::new(),
        })
    }
}

impl TryFrom<DetailRow> for ReportLine {
    type Error = AppError;

    fn try_from(row: DetailRow) -> AppResult<Self> {
        let t = row.transaction;
        Ok(ReportLine {
            transaction_id: t.id,
            item_type_id: t.item_type_id,
            item_type_name: row.item_type_name,
            item_type_code: row.item_type_code,
            transaction_type: parse_column("transaction_type", &t.transaction_type)?,
            status: parse_column("status", &t.status)?,
            qty: t.qty,
            unit_cost: t.unit_cost,
            total_cost: t.total_cost,
            unit_price: t.unit_price,
            total_price: t.total_price,
            issued_to_type: t.issued_to_type,
            issued_to_name: t.issued_to_name,
            batch_code: row.batch_code,
            created_by_id: t.created_by_id,
            created_by: row.created_by,
            created_at: t.created_at,
        })
    }
}

/// Filters shared by the transaction list and the reports
#[derive(Debug, Clone, Copy, Default)]
pub struct TransactionFilter {
    pub mode: SystemMode,
    pub transaction_type: Option<TransactionType>,
    pub item_type_id: Option<Uuid>,
    pub range: DateRange,
}

#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub transaction_type: TransactionType,
    pub item_type_id: Uuid,
    pub batch_id: Option<Uuid>,
    pub qty: i64,
    pub unit_cost: Option<Decimal>,
    pub total_cost: Option<Decimal>,
    pub unit_price: Option<Decimal>,
    pub total_price: Option<Decimal>,
    pub issued_to_type: Option<String>,
    pub issued_to_name: Option<String>,
    pub notes: Option<String>,
    pub reversal_of: Option<Uuid>,
    pub created_by_id: Uuid,
}

impl NewTransaction {
    pub fn new(transaction_type: TransactionType, item_type_id: Uuid, qty: i64, created_by_id: Uuid) -> Self {
        Self {
            transaction_type,
            item_type_id,
            batch_id: None,
            qty,
            unit_cost: None,
            total_cost: None,
            unit_price: None,
            total_price: None,
            issued_to_type: None,
            issued_to_name: None,
            notes: None,
            reversal_of: None,
            created_by_id,
        }
    }
}

/// Full set of amendable columns, already resolved against the stored row
#[derive(Debug, Clone)]
pub struct TransactionUpdate {
    pub qty: i64,
    pub unit_cost: Option<Decimal>,
    pub total_cost: Option<Decimal>,
    pub unit_price: Option<Decimal>,
    pub total_price: Option<Decimal>,
    pub issued_to_type: Option<String>,
    pub issued_to_name: Option<String>,
    pub notes: Option<String>,
}

pub struct TransactionRepository;

impl TransactionRepository {
    pub async fn insert<'e, E>(executor: E, tx: &NewTransaction) -> AppResult<Transaction>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, TransactionRow>(&format!(
            r#"
            WITH t AS (
                INSERT INTO transactions (
                    id, transaction_type, status, item_type_id, batch_id, qty,
                    unit_cost, total_cost, unit_price, total_price,
                    issued_to_type, issued_to_name, notes, reversal_of, created_by_id
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
                RETURNING *
            )
            SELECT {} FROM t
            "#,
            COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(tx.transaction_type.as_str())
        .bind(TransactionStatus::Posted.as_str())
        .bind(tx.item_type_id)
        .bind(tx.batch_id)
        .bind(tx.qty)
        .bind(tx.unit_cost)
        .bind(tx.total_cost)
        .bind(tx.unit_price)
        .bind(tx.total_price)
        .bind(&tx.issued_to_type)
        .bind(&tx.issued_to_name)
        .bind(&tx.notes)
        .bind(tx.reversal_of)
        .bind(tx.created_by_id)
        .fetch_one(executor)
        .await?
        .try_into()
    }

    /// Read the transaction and lock its row for the rest of the database transaction
    pub async fn find_for_update<'e, E>(executor: E, id: Uuid) -> AppResult<Option<Transaction>>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {} FROM transactions t WHERE t.id = $1 FOR UPDATE",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?
        .map(Transaction::try_from)
        .transpose()
    }

    /// Transaction with joined names, without attachments
    pub async fn find_detail<'e, E>(executor: E, id: Uuid) -> AppResult<Option<TransactionDetail>>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, DetailRow>(&format!(
            r#"
            SELECT {}, i.name AS item_type_name, i.code AS item_type_code,
                   b.batch_code, u.username AS created_by
            {}
            WHERE t.id = $1
            "#,
            COLUMNS, DETAIL_JOINS
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?
        .map(TransactionDetail::try_from)
        .transpose()
    }

    /// Newest first, without attachments
    pub async fn list<'e, E>(
        executor: E,
        filter: &TransactionFilter,
        page: PageRequest,
    ) -> AppResult<Vec<TransactionDetail>>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, DetailRow>(&format!(
            r#"
            SELECT {}, i.name AS item_type_name, i.code AS item_type_code,
                   b.batch_code, u.username AS created_by
            {}
            WHERE {}
            ORDER BY t.created_at DESC, t.id DESC
            LIMIT $6 OFFSET $7
            "#,
            COLUMNS, DETAIL_JOINS, FILTER
        ))
        .bind(filter.mode.as_str())
        .bind(filter.transaction_type.map(|t| t.as_str()))
        .bind(filter.item_type_id)
        .bind(filter.range.start)
        .bind(filter.range.end)
        .bind(page.limit)
        .bind(page.skip())
        .fetch_all(executor)
        .await?;

        rows.into_iter().map(TransactionDetail::try_from).collect()
    }

    pub async fn count<'e, E>(executor: E, filter: &TransactionFilter) -> AppResult<i64>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM transactions t JOIN item_types i ON i.id = t.item_type_id WHERE {}",
            FILTER
        ))
        .bind(filter.mode.as_str())
        .bind(filter.transaction_type.map(|t| t.as_str()))
        .bind(filter.item_type_id)
        .bind(filter.range.start)
        .bind(filter.range.end)
        .fetch_one(executor)
        .await?;

        Ok(total)
    }

    /// Every matching transaction as a report line, oldest first
    pub async fn report_lines<'e, E>(executor: E, filter: &TransactionFilter) -> AppResult<Vec<ReportLine>>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, DetailRow>(&format!(
            r#"
            SELECT {}, i.name AS item_type_name, i.code AS item_type_code,
                   b.batch_code, u.username AS created_by
            {}
            WHERE {}
            ORDER BY t.created_at ASC
            "#,
            COLUMNS, DETAIL_JOINS, FILTER
        ))
        .bind(filter.mode.as_str())
        .bind(filter.transaction_type.map(|t| t.as_str()))
        .bind(filter.item_type_id)
        .bind(filter.range.start)
        .bind(filter.range.end)
        .fetch_all(executor)
        .await?;

        rows.into_iter().map(ReportLine::try_from).collect()
    }

    pub async fn update<'e, E>(executor: E, id: Uuid, update: &TransactionUpdate) -> AppResult<()>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE transactions
            SET qty = $2, unit_cost = $3, total_cost = $4, unit_price = $5, total_price = $6,
                issued_to_type = $7, issued_to_name = $8, notes = $9, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(update.qty)
        .bind(update.unit_cost)
        .bind(update.total_cost)
        .bind(update.unit_price)
        .bind(update.total_price)
        .bind(&update.issued_to_type)
        .bind(&update.issued_to_name)
        .bind(&update.notes)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn mark_reversed<'e, E>(executor: E, id: Uuid) -> AppResult<()>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE transactions SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(TransactionStatus::Reversed.as_str())
            .execute(executor)
            .await?;

        Ok(())
    }
}
