use sqlx::SqlitePool;

use crate::domain::game::{classification_as_str, classification_from_str};
use crate::domain::Move;
use crate::error::PersistenceError;

pub struct MoveRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct MoveRow {
    id: i64,
    game_id: i64,
    half_move: i32,
    move_number: i32,
    is_white: bool,
    san: String,
    uci: String,
    evaluation_before: i32,
    evaluation_after: i32,
    best_move_uci: String,
    classification: String,
    centipawn_loss: i32,
    commentary: Option<String>,
}

impl TryFrom<MoveRow> for Move {
    type Error = PersistenceError;

    fn try_from(row: MoveRow) -> Result<Self, Self::Error> {
        Ok(Move {
            id: row.id,
            game_id: row.game_id,
            half_move: row.half_move,
            move_number: row.move_number,
            is_white: row.is_white,
            san: row.san,
            uci: row.uci,
            evaluation_before: row.evaluation_before,
            evaluation_after: row.evaluation_after,
            best_move_uci: row.best_move_uci,
            classification: classification_from_str(&row.classification)
                .map_err(PersistenceError::InvalidRow)?,
            centipawn_loss: row.centipawn_loss,
            commentary: row.commentary,
        })
    }
}

impl MoveRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert every analyzed move of a game in one transaction, preserving
    /// the contiguous `half_move` prefix invariant by construction (the
    /// analyzer emits them in order and this is the only writer).
    pub async fn insert_all(
        &self,
        game_id: i64,
        moves: &[analysis::MoveAnalysis],
    ) -> Result<(), PersistenceError> {
        let mut tx = self.pool.begin().await?;
        for mv in moves {
            sqlx::query(
                r#"INSERT INTO moves
                     (game_id, half_move, move_number, is_white, san, uci,
                      evaluation_before, evaluation_after, best_move_uci,
                      classification, centipawn_loss, commentary)
                   VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            )
            .bind(game_id)
            .bind(mv.half_move as i32)
            .bind(mv.move_number as i32)
            .bind(mv.is_white)
            .bind(&mv.san)
            .bind(&mv.uci)
            .bind(mv.evaluation_before)
            .bind(mv.evaluation_after)
            .bind(&mv.best_move_uci)
            .bind(classification_as_str(mv.classification))
            .bind(mv.centipawn_loss)
            .bind(&mv.commentary)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn for_game(&self, game_id: i64) -> Result<Vec<Move>, PersistenceError> {
        let rows: Vec<MoveRow> = sqlx::query_as(
            r#"SELECT id, game_id, half_move, move_number, is_white, san, uci,
                      evaluation_before, evaluation_after, best_move_uci,
                      classification, centipawn_loss, commentary
               FROM moves WHERE game_id = ? ORDER BY half_move"#,
        )
        .bind(game_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }
}
