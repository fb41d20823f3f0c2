//! Move analyzer: parses a game, walks its positions once each through an
//! engine driver, computes centipawn loss, and classifies every move.

pub mod analyzer;
pub mod classify;
pub mod types;

pub use analyzer::{analyze_game, AnalyzerError, CancelSignal, GameAnalysis, NeverCancel};
pub use classify::classify;
pub use types::{MoveAnalysis, MoveClassification, Stats, UserColor};
