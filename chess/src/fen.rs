use cozy_chess::Board;

/// Parse a FEN string into a [`Board`].
pub fn parse_fen(fen: &str) -> Result<Board, FenError> {
    if fen.trim().is_empty() {
        return Err(FenError::InvalidFormat);
    }
    fen.parse().map_err(|_| FenError::InvalidBoardLayout)
}

/// Format a [`Board`] as a FEN string.
pub fn format_fen(board: &Board) -> String {
    board.to_string()
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FenError {
    #[error("invalid FEN format")]
    InvalidFormat,
    #[error("invalid board layout")]
    InvalidBoardLayout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_starting_position() {
        let board = parse_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1").unwrap();
        assert_eq!(
            format_fen(&board),
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"
        );
    }

    #[test]
    fn rejects_empty_string() {
        assert_eq!(parse_fen(""), Err(FenError::InvalidFormat));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_fen("not a fen string").is_err());
    }
}
