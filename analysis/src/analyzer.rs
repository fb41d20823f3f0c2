//! The per-game move analyzer: position-reuse engine driving plus the
//! centipawn-loss/classification bookkeeping.

use chess::{format_uci_move, parse_pgn, PgnError};
use cozy_chess::Board;
use engine::{AnalysisLimit, EngineDriver};

use crate::classify::classify;
use crate::types::{MoveAnalysis, Stats, UserColor};

#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    #[error("PGN parse error: {0}")]
    Pgn(#[from] PgnError),
    #[error("engine failure: {0}")]
    Engine(#[from] engine::AnalysisError),
    #[error("analysis cancelled")]
    Cancelled,
}

/// Cooperative cancellation signal, checked between positions.
pub trait CancelSignal {
    fn is_cancelled(&self) -> bool;
}

/// Always-false cancellation signal for callers with no cancellation source.
pub struct NeverCancel;
impl CancelSignal for NeverCancel {
    fn is_cancelled(&self) -> bool {
        false
    }
}

pub struct GameAnalysis {
    pub moves: Vec<MoveAnalysis>,
    pub stats: Stats,
    pub opening_eco: Option<String>,
    pub opening_name: Option<String>,
}

/// Parse `pgn`, walk every position exactly once through `driver`, and
/// produce per-move analysis plus aggregate stats restricted to
/// `user_color`'s moves. Owns `driver` for the duration and closes it on
/// every exit path (success, cancellation, or engine failure) — scoped
/// acquisition, so a cancelled or failed analysis never leaks the subprocess.
///
/// Engine call parity: for a game of N moves this issues exactly N+1
/// `analyse` calls — one per position P0..Pn — never two per move.
#[tracing::instrument(skip(pgn, driver, cancel), fields(plies))]
pub async fn analyze_game(
    pgn: &str,
    user_color: UserColor,
    limit: AnalysisLimit,
    mut driver: EngineDriver,
    cancel: &impl CancelSignal,
) -> Result<GameAnalysis, AnalyzerError> {
    let parsed = match parse_pgn(pgn) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(error = %e, "failed to parse PGN, aborting analysis");
            driver.close().await;
            return Err(e.into());
        }
    };

    let opening_eco = parsed.tags.get("ECO").cloned();
    let opening_name = parsed.tags.get("Opening").cloned();

    let n = parsed.moves.len();
    tracing::Span::current().record("plies", n);

    // e[i] = POV eval of position P_i; best[i] = pv[0] of P_i. n+1 positions.
    let mut evals: Vec<i32> = Vec::with_capacity(n + 1);
    let mut bests: Vec<Option<cozy_chess::Move>> = Vec::with_capacity(n + 1);

    let mut board = Board::default();
    for i in 0..=n {
        if cancel.is_cancelled() {
            tracing::info!(position = i, "analysis cancelled mid-game");
            driver.close().await;
            return Err(AnalyzerError::Cancelled);
        }

        let fen = chess::format_fen(&board);
        let lines = match driver.analyse(&fen, limit, 1).await {
            Ok(lines) => lines,
            Err(e) => {
                tracing::error!(position = i, error = %e, "engine failed mid-game");
                driver.close().await;
                return Err(e.into());
            }
        };
        let line = lines.into_iter().next();
        let (cp, best) = match line {
            Some(l) => (l.score.to_cp(), l.pv.first().copied()),
            None => (0, None),
        };
        evals.push(cp);
        bests.push(best);

        if i < n {
            board.play(parsed.moves[i].mv);
        }
    }
    driver.close().await;

    let mut moves = Vec::with_capacity(n);
    let mut total_cp_loss: i64 = 0;
    let mut user_move_count: u32 = 0;
    let mut num_blunders = 0u32;
    let mut num_mistakes = 0u32;
    let mut num_inaccuracies = 0u32;

    for (i, pgn_move) in parsed.moves.iter().enumerate() {
        let is_white = i % 2 == 0;
        let e_i = evals[i];
        let e_i1 = evals[i + 1];

        let evaluation_before = e_i;
        // centipawn_loss computed from the unflipped value to avoid a
        // double-negation bug: e_i - (-e_i1) == e_i + e_i1.
        let centipawn_loss = e_i + e_i1;
        let evaluation_after = -e_i1;
        let best_move_uci = bests[i].map(format_uci_move).unwrap_or_default();

        let classification = classify(centipawn_loss, Some(evaluation_before), Some(evaluation_after));

        let made_by_user = is_white == user_color.is_white();
        if made_by_user {
            total_cp_loss += centipawn_loss.max(0) as i64;
            user_move_count += 1;
            match classification {
                crate::types::MoveClassification::Blunder => num_blunders += 1,
                crate::types::MoveClassification::Mistake => num_mistakes += 1,
                crate::types::MoveClassification::Inaccuracy => num_inaccuracies += 1,
                _ => {}
            }
        }

        moves.push(MoveAnalysis {
            half_move: i as u32,
            move_number: (i as u32) / 2 + 1,
            is_white,
            san: pgn_move.san.clone(),
            uci: format_uci_move(pgn_move.mv),
            evaluation_before,
            evaluation_after,
            best_move_uci,
            classification,
            centipawn_loss,
            commentary: None,
        });
    }

    let average_centipawn_loss = if user_move_count > 0 {
        total_cp_loss as f64 / user_move_count as f64
    } else {
        0.0
    };
    let accuracy = (100.0 - average_centipawn_loss / 10.0).clamp(0.0, 100.0);

    let stats = Stats {
        num_moves: n as u32,
        average_centipawn_loss,
        accuracy,
        num_blunders,
        num_mistakes,
        num_inaccuracies,
    };

    Ok(GameAnalysis {
        moves,
        stats,
        opening_eco,
        opening_name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_move_parity_white() {
        assert!(UserColor::White.is_white());
        assert!(!UserColor::Black.is_white());
    }
}

#[cfg(test)]
mod proptests {
    use proptest::prelude::*;

    proptest! {
        /// Testable property 2 (centipawn-loss identity): for the
        /// `evaluation_before`/`evaluation_after`/`centipawn_loss` triple
        /// the per-move loop derives from e_i and e_i1, storing
        /// `evaluation_after` flipped back to the moving player's POV must
        /// not change what `centipawn_loss` would be if recomputed from
        /// the stored fields: `cpl == eval_before - (-eval_after)`.
        #[test]
        fn centipawn_loss_matches_stored_evaluations(e_i in -20_000i32..20_000, e_i1 in -20_000i32..20_000) {
            let evaluation_before = e_i;
            let centipawn_loss = e_i + e_i1;
            let evaluation_after = -e_i1;

            prop_assert_eq!(centipawn_loss, evaluation_before - (-evaluation_after));
        }
    }
}
