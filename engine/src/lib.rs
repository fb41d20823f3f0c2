pub mod driver;
pub mod stockfish;
pub mod uci;

pub use driver::{AnalysisError, AnalysisLimit, EngineDriver, Line};
pub use stockfish::{EngineConfig, StockfishEngine};
pub use uci::{UciError, UciMessage};

use cozy_chess::Move;
use tokio::sync::mpsc;

/// Handle for communicating with a chess engine
pub struct EngineHandle {
    pub tx: mpsc::Sender<EngineCommand>,
    pub rx: mpsc::Receiver<EngineEvent>,
}

/// Commands sent to the engine
#[derive(Debug, Clone)]
pub enum EngineCommand {
    SetPosition { fen: String, moves: Vec<Move> },
    SetOption { name: String, value: Option<String> },
    Go(GoParams),
    Stop,
    Quit,
}

/// Parameters for the "go" command
#[derive(Debug, Clone, Default)]
pub struct GoParams {
    pub movetime: Option<u64>, // Move time in milliseconds
    pub depth: Option<u8>,     // Search depth
    pub infinite: bool,        // Search until "stop"
}

/// Events received from the engine
#[derive(Debug, Clone)]
pub enum EngineEvent {
    Ready,
    BestMove(Move),
    Info(EngineInfo),
    Error(String),
    RawUciMessage {
        direction: UciMessageDirection,
        message: String,
    },
}

#[derive(Debug, Clone, Copy)]
pub enum UciMessageDirection {
    ToEngine,
    FromEngine,
}

/// Engine analysis information
#[derive(Debug, Clone, Default)]
pub struct EngineInfo {
    pub depth: Option<u8>,
    pub seldepth: Option<u8>,
    pub time_ms: Option<u64>,
    pub nodes: Option<u64>,
    pub score: Option<Score>,
    pub pv: Vec<Move>, // Principal variation
    pub multipv: Option<u8>,
    pub currmove: Option<Move>,
    pub hashfull: Option<u16>,
    pub nps: Option<u64>,
}

/// A POV (side-to-move-relative) evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
    Centipawns(i32),
    /// Mate in N plies; negative means the side to move is the one getting mated.
    Mate(i8),
}

impl Score {
    /// Fold into centipawn space as `±(10_000 − N·100)`, per the engine driver contract.
    pub fn to_cp(self) -> i32 {
        match self {
            Score::Centipawns(cp) => cp,
            Score::Mate(n) if n >= 0 => 10_000 - 100 * i32::from(n),
            Score::Mate(n) => -10_000 - 100 * i32::from(n),
        }
    }

    /// Flip to the other side's perspective.
    pub fn negate(self) -> Score {
        match self {
            Score::Centipawns(cp) => Score::Centipawns(-cp),
            Score::Mate(n) => Score::Mate(-n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mate_folds_per_contract() {
        assert_eq!(Score::Mate(3).to_cp(), 10_000 - 300);
        assert_eq!(Score::Mate(-3).to_cp(), -10_000 + 300);
        assert_eq!(Score::Centipawns(42).to_cp(), 42);
    }

    #[test]
    fn negate_flips_centipawns_and_mate_sign() {
        assert_eq!(Score::Centipawns(120).negate(), Score::Centipawns(-120));
        assert_eq!(Score::Mate(4).negate(), Score::Mate(-4));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Negation is its own inverse: flipping POV twice is a no-op, for
        /// both centipawn and mate-folded scores.
        #[test]
        fn negate_is_an_involution(cp in -49_000i32..49_000, mate_n in -32i8..32) {
            let centipawns = Score::Centipawns(cp);
            prop_assert_eq!(centipawns.negate().negate(), centipawns);

            let mate = Score::Mate(mate_n);
            prop_assert_eq!(mate.negate().negate(), mate);
        }

        /// Evaluation sanity (testable property 3): a mate-folded score
        /// never leaves centipawn space, for any plausible mate distance.
        #[test]
        fn mate_fold_stays_within_eval_bounds(mate_n in -99i8..99) {
            let cp = Score::Mate(mate_n).to_cp();
            prop_assert!(cp.unsigned_abs() < 50_000);
        }
    }
}
