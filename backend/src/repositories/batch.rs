use chrono::{DateTime, Utc};
use shared::{Batch, BatchCounters, BatchView, SystemMode};
use sqlx::{Executor, FromRow, Postgres};
use uuid::Uuid;

use crate::error::{map_unique_violation, AppResult};

const COLUMNS: &str = "b.id, b.item_type_id, b.batch_code, b.qty_received, b.qty_issued, \
                       b.received_at, b.notes, b.created_at, b.updated_at";

#[derive(Debug, FromRow)]
struct BatchRow {
    id: Uuid,
    item_type_id: Uuid,
    batch_code: String,
    qty_received: i64,
    qty_issued: i64,
    received_at: DateTime<Utc>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<BatchRow> for Batch {
    fn from(row: BatchRow) -> Self {
        Batch {
            id: row.id,
            item_type_id: row.item_type_id,
            batch_code: row.batch_code,
            qty_received: row.qty_received,
            qty_issued: row.qty_issued,
            received_at: row.received_at,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct BatchViewRow {
    #[sqlx(flatten)]
    batch: BatchRow,
    item_type_name: String,
    item_type_code: String,
}

/// Filters for `GET /inventory/batches`
#[derive(Debug, Clone, Default)]
pub struct BatchFilter {
    pub item_type_id: Option<Uuid>,
    /// Matches the item type's code, case-insensitively
    pub item_type_code: Option<String>,
    pub available_only: bool,
}

#[derive(Debug, Clone)]
pub struct NewBatch {
    pub item_type_id: Uuid,
    pub batch_code: String,
    pub counters: BatchCounters,
    pub received_at: DateTime<Utc>,
    pub notes: Option<String>,
}

pub struct BatchRepository;

impl BatchRepository {
    pub async fn list<'e, E>(executor: E, mode: SystemMode, filter: &BatchFilter) -> AppResult<Vec<BatchView>>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, BatchViewRow>(&format!(
            r#"
            SELECT {}, i.name AS item_type_name, i.code AS item_type_code
            FROM batches b
            JOIN item_types i ON i.id = b.item_type_id
            WHERE i.mode = $1
              AND ($2::uuid IS NULL OR b.item_type_id = $2)
              AND ($3::text IS NULL OR UPPER(i.code) = UPPER($3))
              AND (NOT $4 OR b.qty_received > b.qty_issued)
            ORDER BY b.received_at DESC, b.created_at DESC
            "#,
            COLUMNS
        ))
        .bind(mode.as_str())
        .bind(filter.item_type_id)
        .bind(filter.item_type_code.as_deref())
        .bind(filter.available_only)
        .fetch_all(executor)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| BatchView::new(row.batch.into(), row.item_type_name, row.item_type_code))
            .collect())
    }

    /// Read the batch and hold its row lock until the surrounding transaction ends
    pub async fn find_for_update<'e, E>(executor: E, id: Uuid) -> AppResult<Option<Batch>>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, BatchRow>(&format!(
            "SELECT {} FROM batches b WHERE b.id = $1 FOR UPDATE",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(row.map(Batch::from))
    }

    pub async fn insert<'e, E>(executor: E, batch: &NewBatch) -> AppResult<Batch>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, BatchRow>(
            r#"
            INSERT INTO batches (id, item_type_id, batch_code, qty_received, qty_issued, received_at, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, item_type_id, batch_code, qty_received, qty_issued,
                      received_at, notes, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(batch.item_type_id)
        .bind(&batch.batch_code)
        .bind(batch.counters.qty_received)
        .bind(batch.counters.qty_issued)
        .bind(batch.received_at)
        .bind(&batch.notes)
        .fetch_one(executor)
        .await
        .map_err(|e| map_unique_violation(e, "batchCode"))?;

        Ok(row.into())
    }

    pub async fn update_counters<'e, E>(executor: E, id: Uuid, counters: BatchCounters) -> AppResult<()>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE batches
            SET qty_received = $2, qty_issued = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(counters.qty_received)
        .bind(counters.qty_issued)
        .execute(executor)
        .await?;

        Ok(())
    }
}
