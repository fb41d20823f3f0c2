use cozy_chess::{Board, Color, GameStatus, Move};
use std::collections::HashMap;

use crate::pgn::format_san;

/// A chess game: a starting position plus the sequence of moves played from
/// it. Tracks enough history to support undo; redo is intentionally not
/// supported (there is no redo stack, only the undone-move history).
#[derive(Debug, Clone)]
pub struct Game {
    position: Board,
    history: Vec<HistoryEntry>,
    pgn_tags: HashMap<String, String>,
    start_position: StartPosition,
}

/// A single played move and the state needed to reconstruct it.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub mv: Move,
    pub san: String,
    /// FEN of the position the move was played from.
    pub fen_before: String,
    /// FEN of the position that resulted from the move.
    pub fen_after: String,
}

/// Starting position of the game.
#[derive(Debug, Clone)]
pub enum StartPosition {
    Standard,
    Fen(String),
}

impl Game {
    pub fn new() -> Self {
        Self {
            position: Board::default(),
            history: Vec::new(),
            pgn_tags: HashMap::new(),
            start_position: StartPosition::Standard,
        }
    }

    pub fn from_fen(fen: &str) -> Result<Self, GameError> {
        let position = crate::fen::parse_fen(fen)?;
        Ok(Self {
            position,
            history: Vec::new(),
            pgn_tags: HashMap::new(),
            start_position: StartPosition::Fen(fen.to_string()),
        })
    }

    pub fn position(&self) -> &Board {
        &self.position
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn pgn_tags(&self) -> &HashMap<String, String> {
        &self.pgn_tags
    }

    pub fn set_tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pgn_tags.insert(key.into(), value.into());
    }

    /// Play a legal move, recording it in history.
    pub fn make_move(&mut self, mv: Move) -> Result<HistoryEntry, GameError> {
        if !self.legal_moves().contains(&mv) {
            return Err(GameError::IllegalMove);
        }

        let fen_before = self.to_fen();
        let san = format_san(&self.position, mv);
        self.position.play(mv);
        let fen_after = self.to_fen();

        let entry = HistoryEntry {
            mv,
            san,
            fen_before,
            fen_after,
        };
        self.history.push(entry.clone());
        Ok(entry)
    }

    pub fn undo(&mut self) -> Result<(), GameError> {
        if self.history.is_empty() {
            return Err(GameError::NothingToUndo);
        }
        self.history.pop();
        self.rebuild_position()
    }

    pub fn legal_moves(&self) -> Vec<Move> {
        let mut moves = Vec::new();
        self.position.generate_moves(|mvs| {
            moves.extend(mvs);
            false
        });
        moves
    }

    pub fn status(&self) -> GameStatus {
        self.position.status()
    }

    pub fn side_to_move(&self) -> Color {
        self.position.side_to_move()
    }

    pub fn to_fen(&self) -> String {
        crate::fen::format_fen(&self.position)
    }

    fn rebuild_position(&mut self) -> Result<(), GameError> {
        let mut board = match &self.start_position {
            StartPosition::Standard => Board::default(),
            StartPosition::Fen(fen) => crate::fen::parse_fen(fen)?,
        };
        for entry in &self.history {
            board = board
                .try_play(entry.mv)
                .map_err(|_| GameError::IllegalMove)?;
        }
        self.position = board;
        Ok(())
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("illegal move")]
    IllegalMove,
    #[error("nothing to undo")]
    NothingToUndo,
    #[error("FEN parse error: {0}")]
    FenError(#[from] crate::fen::FenError),
}

/// Coarse game phase, used only to steer optional coach-commentary prompts
/// (never consulted by move classification or statistics).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    Opening,
    Middlegame,
    Endgame,
}

impl GamePhase {
    /// `ply` is 0-based; `total_plies` is the game's full length.
    pub fn of(ply: usize, total_plies: usize) -> Self {
        if ply < 20 {
            GamePhase::Opening
        } else if (ply as f64) < (total_plies as f64) * 0.7 {
            GamePhase::Middlegame
        } else {
            GamePhase::Endgame
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plays_and_records_san() {
        let mut game = Game::new();
        let mv = Move {
            from: "e2".parse().unwrap(),
            to: "e4".parse().unwrap(),
            promotion: None,
        };
        let entry = game.make_move(mv).unwrap();
        assert_eq!(entry.san, "e4");
        assert_eq!(game.history().len(), 1);
    }

    #[test]
    fn undo_restores_previous_position() {
        let mut game = Game::new();
        let start_fen = game.to_fen();
        let mv = Move {
            from: "e2".parse().unwrap(),
            to: "e4".parse().unwrap(),
            promotion: None,
        };
        game.make_move(mv).unwrap();
        game.undo().unwrap();
        assert_eq!(game.to_fen(), start_fen);
    }

    #[test]
    fn rejects_illegal_move() {
        let mut game = Game::new();
        let mv = Move {
            from: "e2".parse().unwrap(),
            to: "e5".parse().unwrap(),
            promotion: None,
        };
        assert!(matches!(game.make_move(mv), Err(GameError::IllegalMove)));
    }

    #[test]
    fn phase_boundaries() {
        assert_eq!(GamePhase::of(0, 60), GamePhase::Opening);
        assert_eq!(GamePhase::of(19, 60), GamePhase::Opening);
        assert_eq!(GamePhase::of(20, 60), GamePhase::Middlegame);
        assert_eq!(GamePhase::of(41, 60), GamePhase::Middlegame);
        assert_eq!(GamePhase::of(42, 60), GamePhase::Endgame);
    }
}
