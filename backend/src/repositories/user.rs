use shared::User;
use sqlx::{Executor, FromRow, Postgres};
use uuid::Uuid;

use crate::error::AppResult;

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            created_at: row.created_at,
        }
    }
}

pub struct UserRepository;

impl UserRepository {
    /// Users are created the first time their name is seen
    pub async fn find_or_create<'e, E>(executor: E, username: &str) -> AppResult<User>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, username)
            VALUES ($1, $2)
            ON CONFLICT (username) DO UPDATE SET username = EXCLUDED.username
            RETURNING id, username, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .fetch_one(executor)
        .await?;

        Ok(row.into())
    }
}
