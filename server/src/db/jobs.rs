use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::domain::{Job, JobKind, JobStatus};
use crate::error::PersistenceError;

pub struct JobRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct JobRow {
    id: String,
    user_id: i64,
    kind: String,
    status: String,
    progress: i32,
    total_games: i32,
    completed_games: i32,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<JobRow> for Job {
    type Error = PersistenceError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        Ok(Job {
            id: row.id,
            user_id: row.user_id,
            kind: row.kind.parse().map_err(PersistenceError::InvalidRow)?,
            status: row.status.parse().map_err(PersistenceError::InvalidRow)?,
            progress: row.progress,
            total_games: row.total_games,
            completed_games: row.completed_games,
            error_message: row.error_message,
            created_at: row.created_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
        })
    }
}

const SELECT: &str = r#"SELECT id, user_id, kind, status, progress, total_games,
           completed_games, error_message, created_at, started_at, completed_at
    FROM jobs"#;

impl JobRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// The idempotency check: any job of this kind for this user still
    /// in `pending`/`processing`.
    pub async fn find_active(
        &self,
        user_id: i64,
        kind: JobKind,
    ) -> Result<Option<Job>, PersistenceError> {
        let row: Option<JobRow> = sqlx::query_as(&format!(
            "{SELECT} WHERE user_id = ? AND kind = ? AND status IN ('pending', 'processing')"
        ))
        .bind(user_id)
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(TryInto::try_into).transpose()
    }

    pub async fn find(&self, job_id: &str) -> Result<Option<Job>, PersistenceError> {
        let row: Option<JobRow> = sqlx::query_as(&format!("{SELECT} WHERE id = ?"))
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(TryInto::try_into).transpose()
    }

    pub async fn create(&self, user_id: i64, kind: JobKind, id: &str) -> Result<(), PersistenceError> {
        sqlx::query(
            r#"INSERT INTO jobs (id, user_id, kind, status, progress)
               VALUES (?, ?, ?, 'pending', 0)"#,
        )
        .bind(id)
        .bind(user_id)
        .bind(kind.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn mark_processing(
        &self,
        job_id: &str,
        started_at: DateTime<Utc>,
    ) -> Result<(), PersistenceError> {
        sqlx::query("UPDATE jobs SET status = 'processing', started_at = ? WHERE id = ?")
            .bind(started_at)
            .bind(job_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_progress(
        &self,
        job_id: &str,
        progress: i32,
        total_games: Option<i32>,
        completed_games: Option<i32>,
    ) -> Result<(), PersistenceError> {
        sqlx::query(
            r#"UPDATE jobs SET progress = ?,
                 total_games = COALESCE(?, total_games),
                 completed_games = COALESCE(?, completed_games)
               WHERE id = ?"#,
        )
        .bind(progress)
        .bind(total_games)
        .bind(completed_games)
        .bind(job_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn mark_completed(
        &self,
        job_id: &str,
        completed_at: DateTime<Utc>,
    ) -> Result<(), PersistenceError> {
        sqlx::query(
            r#"UPDATE jobs SET status = 'completed', progress = 100, completed_at = ?
               WHERE id = ?"#,
        )
        .bind(completed_at)
        .bind(job_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn mark_failed(
        &self,
        job_id: &str,
        error_message: &str,
        completed_at: DateTime<Utc>,
    ) -> Result<(), PersistenceError> {
        sqlx::query(
            r#"UPDATE jobs SET status = 'failed', error_message = ?, completed_at = ?
               WHERE id = ?"#,
        )
        .bind(error_message)
        .bind(completed_at)
        .bind(job_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn mark_cancelled(
        &self,
        job_id: &str,
        completed_at: DateTime<Utc>,
    ) -> Result<(), PersistenceError> {
        sqlx::query(
            r#"UPDATE jobs SET status = 'cancelled', completed_at = ?,
                 error_message = 'Cancelled by user'
               WHERE id = ?"#,
        )
        .bind(completed_at)
        .bind(job_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Non-terminal analysis jobs for a user with `started_at` set —
    /// exactly the set the job coordinator recomputes progress for.
    pub async fn active_analysis_jobs(&self, user_id: i64) -> Result<Vec<Job>, PersistenceError> {
        let rows: Vec<JobRow> = sqlx::query_as(&format!(
            "{SELECT} WHERE user_id = ? AND kind = 'analysis' \
             AND status IN ('pending', 'processing') AND started_at IS NOT NULL"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }
}
