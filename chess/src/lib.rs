//! Board representation, FEN/PGN/SAN/UCI notation, and a small game-history
//! wrapper around `cozy_chess`.

pub mod converters;
pub mod fen;
pub mod game;
pub mod pgn;
pub mod types;
pub mod uci;

pub use converters::*;
pub use fen::{format_fen, parse_fen, FenError};
pub use game::{Game, GameError, GamePhase, HistoryEntry, StartPosition};
pub use pgn::{format_san, parse_pgn, parse_san, GameResult, PgnError, PgnGame, PgnMove, SanError};
pub use types::{PieceColor, PieceKind};
pub use uci::{convert_uci_castling_to_cozy, format_uci_move};
