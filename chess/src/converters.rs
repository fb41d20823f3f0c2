//! Small formatting helpers shared by the UCI and SAN encoders.

use cozy_chess::{Piece, Square};

/// Format a square in algebraic notation, e.g. `Square::E4` -> `"e4"`.
pub fn format_square(sq: Square) -> String {
    sq.to_string()
}

/// Format a piece kind as the lowercase letter used in UCI promotions
/// (`e7e8q`) and coordinate notation.
pub fn format_piece(piece: Piece) -> char {
    match piece {
        Piece::Pawn => 'p',
        Piece::Knight => 'n',
        Piece::Bishop => 'b',
        Piece::Rook => 'r',
        Piece::Queen => 'q',
        Piece::King => 'k',
    }
}
