//! Output types of the move analyzer: per-move records and aggregate stats.

use serde::{Deserialize, Serialize};

/// Tag assigned to a single move by the hybrid cpl/positional classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveClassification {
    Best,
    Excellent,
    Good,
    Inaccuracy,
    Mistake,
    Blunder,
}

/// One analyzed ply, matching the `Move` entity's analysis-facet fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveAnalysis {
    /// 0-based ply index.
    pub half_move: u32,
    pub move_number: u32,
    pub is_white: bool,
    pub san: String,
    pub uci: String,
    /// Centipawn evaluation of the position before the move, from the
    /// perspective of the side to move at that position.
    pub evaluation_before: i32,
    /// Centipawn evaluation after the move, flipped back to the moving
    /// player's POV for storage (see module docs on the double-negation
    /// bookkeeping in the analyzer).
    pub evaluation_after: i32,
    pub best_move_uci: String,
    pub classification: MoveClassification,
    pub centipawn_loss: i32,
    /// Optional coach commentary; never populated by the analyzer itself.
    pub commentary: Option<String>,
}

/// Aggregate statistics over one game's analyzed moves, restricted to the
/// moves made by `user_color` (see `Stats` construction in the analyzer).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct Stats {
    pub num_moves: u32,
    pub average_centipawn_loss: f64,
    pub accuracy: f64,
    pub num_blunders: u32,
    pub num_mistakes: u32,
    pub num_inaccuracies: u32,
}

/// Which color the owning user played in a given game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserColor {
    White,
    Black,
}

impl UserColor {
    pub fn is_white(self) -> bool {
        matches!(self, UserColor::White)
    }
}
