use sqlx::SqlitePool;

use crate::error::PersistenceError;

/// Recomputes a user's aggregate rollup from scratch after an analyzed
/// game. The dashboard query surface this feeds is out of scope; only the
/// "recompute this user's aggregate stats" call site that `analyze_game`
/// depends on is implemented here.
pub struct UserStatsRepository {
    pool: SqlitePool,
}

impl UserStatsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn recompute(&self, user_id: i64) -> Result<(), PersistenceError> {
        sqlx::query(
            r#"
            INSERT INTO user_stats (
                user_id, games_white, wins_white, losses_white, draws_white,
                games_black, wins_black, losses_black, draws_black,
                average_accuracy, average_centipawn_loss,
                num_blunders, num_mistakes, num_inaccuracies, peak_rating,
                updated_at
            )
            SELECT
                ? AS user_id,
                SUM(CASE WHEN user_color = 'white' THEN 1 ELSE 0 END),
                SUM(CASE WHEN user_color = 'white' AND result = 'win' THEN 1 ELSE 0 END),
                SUM(CASE WHEN user_color = 'white' AND result = 'loss' THEN 1 ELSE 0 END),
                SUM(CASE WHEN user_color = 'white' AND result = 'draw' THEN 1 ELSE 0 END),
                SUM(CASE WHEN user_color = 'black' THEN 1 ELSE 0 END),
                SUM(CASE WHEN user_color = 'black' AND result = 'win' THEN 1 ELSE 0 END),
                SUM(CASE WHEN user_color = 'black' AND result = 'loss' THEN 1 ELSE 0 END),
                SUM(CASE WHEN user_color = 'black' AND result = 'draw' THEN 1 ELSE 0 END),
                AVG(accuracy),
                AVG(average_centipawn_loss),
                COALESCE(SUM(num_blunders), 0),
                COALESCE(SUM(num_mistakes), 0),
                COALESCE(SUM(num_inaccuracies), 0),
                MAX(CASE WHEN user_color = 'white' THEN white_rating ELSE black_rating END),
                strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
            FROM games WHERE user_id = ?
            ON CONFLICT(user_id) DO UPDATE SET
                games_white = excluded.games_white,
                wins_white = excluded.wins_white,
                losses_white = excluded.losses_white,
                draws_white = excluded.draws_white,
                games_black = excluded.games_black,
                wins_black = excluded.wins_black,
                losses_black = excluded.losses_black,
                draws_black = excluded.draws_black,
                average_accuracy = excluded.average_accuracy,
                average_centipawn_loss = excluded.average_centipawn_loss,
                num_blunders = excluded.num_blunders,
                num_mistakes = excluded.num_mistakes,
                num_inaccuracies = excluded.num_inaccuracies,
                peak_rating = excluded.peak_rating,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
