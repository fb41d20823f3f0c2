use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::domain::game::user_color_from_str;
use crate::domain::{AnalysisState, Game, GameResultKind, Provider};
use crate::error::PersistenceError;

pub struct GameRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct GameRow {
    id: i64,
    user_id: i64,
    provider: String,
    provider_id: Option<String>,
    provider_url: Option<String>,
    pgn: String,
    white_name: String,
    white_rating: Option<i32>,
    black_name: String,
    black_rating: Option<i32>,
    user_color: String,
    result: String,
    termination: Option<String>,
    time_class: Option<String>,
    opening_eco: Option<String>,
    opening_name: Option<String>,
    analysis_state: String,
    accuracy: Option<f64>,
    average_centipawn_loss: Option<f64>,
    num_blunders: i32,
    num_mistakes: i32,
    num_inaccuracies: i32,
    analyzed_at: Option<DateTime<Utc>>,
    move_count: Option<i32>,
    played_at: Option<DateTime<Utc>>,
}

impl TryFrom<GameRow> for Game {
    type Error = PersistenceError;

    fn try_from(row: GameRow) -> Result<Self, Self::Error> {
        Ok(Game {
            id: row.id,
            user_id: row.user_id,
            provider: row.provider.parse().map_err(PersistenceError::InvalidRow)?,
            provider_id: row.provider_id,
            provider_url: row.provider_url,
            pgn: row.pgn,
            white_name: row.white_name,
            white_rating: row.white_rating,
            black_name: row.black_name,
            black_rating: row.black_rating,
            user_color: user_color_from_str(&row.user_color).map_err(PersistenceError::InvalidRow)?,
            result: row.result.parse().map_err(PersistenceError::InvalidRow)?,
            termination: row.termination,
            time_class: row.time_class,
            opening_eco: row.opening_eco,
            opening_name: row.opening_name,
            analysis_state: row
                .analysis_state
                .parse()
                .map_err(PersistenceError::InvalidRow)?,
            accuracy: row.accuracy,
            average_centipawn_loss: row.average_centipawn_loss,
            num_blunders: row.num_blunders,
            num_mistakes: row.num_mistakes,
            num_inaccuracies: row.num_inaccuracies,
            analyzed_at: row.analyzed_at,
            move_count: row.move_count,
            played_at: row.played_at,
        })
    }
}

/// Fields carried by a normalized game fetched from a provider adapter,
/// ready to insert as a fresh `unanalyzed` game.
#[derive(Debug, Clone)]
pub struct NewGame {
    pub provider: Provider,
    pub provider_id: Option<String>,
    pub provider_url: Option<String>,
    pub pgn: String,
    pub white_name: String,
    pub white_rating: Option<i32>,
    pub black_name: String,
    pub black_rating: Option<i32>,
    pub user_color: analysis::UserColor,
    pub result: GameResultKind,
    pub termination: Option<String>,
    pub time_class: Option<String>,
    pub opening_eco: Option<String>,
    pub opening_name: Option<String>,
    pub played_at: Option<DateTime<Utc>>,
    pub user_rating: Option<i32>,
}

impl GameRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find(&self, game_id: i64) -> Result<Option<Game>, PersistenceError> {
        let row: Option<GameRow> = sqlx::query_as(Self::SELECT)
            .bind(game_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(TryInto::try_into).transpose()
    }

    /// `(provider, provider_id)` pairs already imported for this user —
    /// used by `import_games` to skip re-fetched duplicates.
    pub async fn existing_provider_ids(
        &self,
        user_id: i64,
        provider: Provider,
    ) -> Result<std::collections::HashSet<String>, PersistenceError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"SELECT provider_id FROM games
               WHERE user_id = ? AND provider = ? AND provider_id IS NOT NULL"#,
        )
        .bind(user_id)
        .bind(provider.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    pub async fn insert(&self, user_id: i64, game: &NewGame) -> Result<i64, PersistenceError> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"INSERT INTO games
                 (user_id, provider, provider_id, provider_url, pgn,
                  white_name, white_rating, black_name, black_rating,
                  user_color, result, termination, time_class,
                  opening_eco, opening_name, analysis_state, played_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'unanalyzed', ?)
               RETURNING id"#,
        )
        .bind(user_id)
        .bind(game.provider.as_str())
        .bind(&game.provider_id)
        .bind(&game.provider_url)
        .bind(&game.pgn)
        .bind(&game.white_name)
        .bind(game.white_rating)
        .bind(&game.black_name)
        .bind(game.black_rating)
        .bind(crate::domain::game::user_color_as_str(game.user_color))
        .bind(game.result.as_str())
        .bind(&game.termination)
        .bind(&game.time_class)
        .bind(&game.opening_eco)
        .bind(&game.opening_name)
        .bind(game.played_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    pub async fn set_analysis_state(
        &self,
        game_id: i64,
        state: AnalysisState,
    ) -> Result<(), PersistenceError> {
        sqlx::query("UPDATE games SET analysis_state = ? WHERE id = ?")
            .bind(state.as_str())
            .bind(game_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Mark a game analyzed with zero statistics — the terminal state used
    /// on an engine or parse failure, so a retry storm never recurs.
    pub async fn mark_analyzed_zero(
        &self,
        game_id: i64,
        analyzed_at: DateTime<Utc>,
    ) -> Result<(), PersistenceError> {
        sqlx::query(
            r#"UPDATE games SET analysis_state = 'analyzed', analyzed_at = ?,
                 accuracy = 0, average_centipawn_loss = 0,
                 num_blunders = 0, num_mistakes = 0, num_inaccuracies = 0,
                 move_count = 0
               WHERE id = ?"#,
        )
        .bind(analyzed_at)
        .bind(game_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn mark_analyzed(
        &self,
        game_id: i64,
        analyzed_at: DateTime<Utc>,
        stats: &analysis::Stats,
    ) -> Result<(), PersistenceError> {
        sqlx::query(
            r#"UPDATE games SET analysis_state = 'analyzed', analyzed_at = ?,
                 accuracy = ?, average_centipawn_loss = ?,
                 num_blunders = ?, num_mistakes = ?, num_inaccuracies = ?,
                 move_count = ?
               WHERE id = ?"#,
        )
        .bind(analyzed_at)
        .bind(stats.accuracy)
        .bind(stats.average_centipawn_loss)
        .bind(stats.num_blunders as i32)
        .bind(stats.num_mistakes as i32)
        .bind(stats.num_inaccuracies as i32)
        .bind(stats.num_moves as i32)
        .bind(game_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn games_needing_analysis(
        &self,
        user_id: i64,
    ) -> Result<Vec<Game>, PersistenceError> {
        let rows: Vec<GameRow> = sqlx::query_as(&format!(
            "{} WHERE user_id = ? AND analysis_state != 'analyzed'",
            Self::SELECT
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    pub async fn count_analyzed_since(
        &self,
        user_id: i64,
        since: DateTime<Utc>,
    ) -> Result<i64, PersistenceError> {
        let count: (i64,) = sqlx::query_as(
            r#"SELECT COUNT(*) FROM games
               WHERE user_id = ? AND analysis_state = 'analyzed' AND analyzed_at >= ?"#,
        )
        .bind(user_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(count.0)
    }

    /// Atomically reset every `in_progress` game of this user back to
    /// `unanalyzed` — the cancel endpoint's compensating action.
    pub async fn reset_in_progress(&self, user_id: i64) -> Result<u64, PersistenceError> {
        let result = sqlx::query(
            r#"UPDATE games SET analysis_state = 'unanalyzed'
               WHERE user_id = ? AND analysis_state = 'in_progress'"#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Delete a game's Move rows — used by `force` re-analysis before the
    /// game is reset to `in_progress` and re-enqueued.
    pub async fn delete_moves(&self, game_id: i64) -> Result<(), PersistenceError> {
        sqlx::query("DELETE FROM moves WHERE game_id = ?")
            .bind(game_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    const SELECT: &'static str = r#"SELECT id, user_id, provider, provider_id, provider_url, pgn,
               white_name, white_rating, black_name, black_rating,
               user_color, result, termination, time_class,
               opening_eco, opening_name, analysis_state, accuracy,
               average_centipawn_loss, num_blunders, num_mistakes,
               num_inaccuracies, analyzed_at, move_count, played_at
        FROM games"#;
}
