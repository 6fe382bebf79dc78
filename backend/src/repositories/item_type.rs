use chrono::{DateTime, Utc};
use shared::{ItemType, SystemMode};
use sqlx::{Executor, FromRow, Postgres};
use uuid::Uuid;

use super::parse_column;
use crate::error::{map_unique_violation, AppResult};

const COLUMNS: &str = "id, name, code, is_active, mode, created_at, updated_at";

#[derive(Debug, FromRow)]
struct ItemTypeRow {
    id: Uuid,
    name: String,
    code: String,
    is_active: bool,
    mode: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ItemTypeRow> for ItemType {
    type Error = crate::error::AppError;

    fn try_from(row: ItemTypeRow) -> AppResult<Self> {
        Ok(ItemType {
            id: row.id,
            name: row.name,
            code: row.code,
            is_active: row.is_active,
            mode: parse_column("mode", &row.mode)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub struct ItemTypeRepository;

impl ItemTypeRepository {
    pub async fn list<'e, E>(executor: E, mode: SystemMode, include_inactive: bool) -> AppResult<Vec<ItemType>>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, ItemTypeRow>(&format!(
            "SELECT {} FROM item_types WHERE mode = $1 AND ($2 OR is_active) ORDER BY name ASC",
            COLUMNS
        ))
        .bind(mode.as_str())
        .bind(include_inactive)
        .fetch_all(executor)
        .await?;

        rows.into_iter().map(ItemType::try_from).collect()
    }

    pub async fn find<'e, E>(executor: E, id: Uuid) -> AppResult<Option<ItemType>>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, ItemTypeRow>(&format!("SELECT {} FROM item_types WHERE id = $1", COLUMNS))
            .bind(id)
            .fetch_optional(executor)
            .await?
            .map(ItemType::try_from)
            .transpose()
    }

    pub async fn insert<'e, E>(executor: E, name: &str, code: &str, mode: SystemMode) -> AppResult<ItemType>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, ItemTypeRow>(&format!(
            "INSERT INTO item_types (id, name, code, mode) VALUES ($1, $2, $3, $4) RETURNING {}",
            COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(code)
        .bind(mode.as_str())
        .fetch_one(executor)
        .await
        .map_err(|e| map_unique_violation(e, "code"))?
        .try_into()
    }

    /// Rename and/or toggle `is_active`; `None` keeps the stored value
    pub async fn update<'e, E>(
        executor: E,
        id: Uuid,
        name: Option<&str>,
        is_active: Option<bool>,
    ) -> AppResult<Option<ItemType>>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, ItemTypeRow>(&format!(
            r#"
            UPDATE item_types
            SET name = COALESCE($2, name),
                is_active = COALESCE($3, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(id)
        .bind(name)
        .bind(is_active)
        .fetch_optional(executor)
        .await?
        .map(ItemType::try_from)
        .transpose()
    }
}
