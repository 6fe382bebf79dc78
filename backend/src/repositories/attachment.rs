use chrono::{DateTime, Utc};
use shared::Attachment;
use sqlx::{Executor, FromRow, Postgres};
use uuid::Uuid;

use crate::error::AppResult;

const COLUMNS: &str =
    "id, transaction_id, original_name, stored_name, mime_type, size_bytes, path, created_at";

#[derive(Debug, FromRow)]
struct AttachmentRow {
    id: Uuid,
    transaction_id: Uuid,
    original_name: String,
    stored_name: String,
    mime_type: String,
    size_bytes: i64,
    path: String,
    created_at: DateTime<Utc>,
}

impl From<AttachmentRow> for Attachment {
    fn from(row: AttachmentRow) -> Self {
        Attachment {
            id: row.id,
            transaction_id: row.transaction_id,
            original_name: row.original_name,
            stored_name: row.stored_name,
            mime_type: row.mime_type,
            size_bytes: row.size_bytes,
            path: row.path,
            created_at: row.created_at,
        }
    }
}

/// File metadata for a file already written to upload storage
#[derive(Debug, Clone)]
pub struct NewAttachment {
    pub original_name: String,
    pub stored_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub path: String,
}

pub struct AttachmentRepository;

impl AttachmentRepository {
    pub async fn insert<'e, E>(executor: E, transaction_id: Uuid, file: &NewAttachment) -> AppResult<Attachment>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, AttachmentRow>(&format!(
            r#"
            INSERT INTO attachments (id, transaction_id, original_name, stored_name, mime_type, size_bytes, path)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(transaction_id)
        .bind(&file.original_name)
        .bind(&file.stored_name)
        .bind(&file.mime_type)
        .bind(file.size_bytes)
        .bind(&file.path)
        .fetch_one(executor)
        .await?;

        Ok(row.into())
    }

    pub async fn list_for<'e, E>(executor: E, transaction_ids: &[Uuid]) -> AppResult<Vec<Attachment>>
    where
        E: Executor<'e, Database = Postgres>,
    {
        if transaction_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, AttachmentRow>(&format!(
            "SELECT {} FROM attachments WHERE transaction_id = ANY($1) ORDER BY created_at ASC",
            COLUMNS
        ))
        .bind(transaction_ids)
        .fetch_all(executor)
        .await?;

        Ok(rows.into_iter().map(Attachment::from).collect())
    }

    pub async fn find_by_stored_name<'e, E>(executor: E, stored_name: &str) -> AppResult<Option<Attachment>>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, AttachmentRow>(&format!(
            "SELECT {} FROM attachments WHERE stored_name = $1",
            COLUMNS
        ))
        .bind(stored_name)
        .fetch_optional(executor)
        .await?;

        Ok(row.map(Attachment::from))
    }
}
