use sqlx::SqlitePool;

use crate::domain::Opening;
use crate::error::PersistenceError;

/// Read-only lookup of the ECO reference table; seeding it is a one-time
/// operational task outside the analysis pipeline's scope.
pub struct OpeningRepository {
    pool: SqlitePool,
}

impl OpeningRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_eco(&self, eco_code: &str) -> Result<Option<Opening>, PersistenceError> {
        let row: Option<(String, String, String, i32)> = sqlx::query_as(
            "SELECT eco_code, name, moves, ply FROM openings WHERE eco_code = ?",
        )
        .bind(eco_code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(eco_code, name, moves, ply)| Opening {
            eco_code,
            name,
            moves,
            ply,
        }))
    }
}
