use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::domain::User;
use crate::error::PersistenceError;

pub struct UserRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    password_hash: String,
    chess_com_handle: Option<String>,
    lichess_handle: Option<String>,
    last_import_at: Option<DateTime<Utc>>,
    current_rating: Option<i32>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            chess_com_handle: row.chess_com_handle,
            lichess_handle: row.lichess_handle,
            last_import_at: row.last_import_at,
            current_rating: row.current_rating,
        }
    }
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find(&self, user_id: i64) -> Result<Option<User>, PersistenceError> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"SELECT id, username, email, password_hash, chess_com_handle,
                      lichess_handle, last_import_at, current_rating
               FROM users WHERE id = ?"#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    /// Bump `last_import_at` to now and, if `rating` is `Some`, overwrite
    /// `current_rating` with the newest rating carried by the import.
    pub async fn record_import(
        &self,
        user_id: i64,
        imported_at: DateTime<Utc>,
        rating: Option<i32>,
    ) -> Result<(), PersistenceError> {
        sqlx::query(
            r#"UPDATE users SET last_import_at = ?,
                 current_rating = COALESCE(?, current_rating)
               WHERE id = ?"#,
        )
        .bind(imported_at)
        .bind(rating)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
