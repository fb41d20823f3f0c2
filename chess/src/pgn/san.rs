//! Standard Algebraic Notation parsing and formatting.
//!
//! `parse_san` resolves a SAN token against the current legal moves of a
//! board (disambiguating by file/rank/square the same way a human reader
//! would); `format_san` is its inverse, producing a minimal-but-unambiguous
//! SAN string for a move that is already known to be legal in `board`.

use cozy_chess::{Board, File, GameStatus, Move, Piece};

use crate::types::PieceKind;

/// Parse a SAN token (e.g. `"Nf3"`, `"exd5"`, `"O-O"`, `"e8=Q+"`) into the
/// legal move it denotes in `board`.
pub fn parse_san(board: &Board, san: &str) -> Result<Move, SanError> {
    let trimmed = san.trim();
    let core = trimmed.trim_end_matches(['+', '#', '!', '?']);
    if core.is_empty() {
        return Err(SanError::InvalidFormat(san.to_string()));
    }

    if core == "O-O" || core == "0-0" {
        return find_castle(board, true, san);
    }
    if core == "O-O-O" || core == "0-0-0" {
        return find_castle(board, false, san);
    }

    let chars: Vec<char> = core.chars().collect();
    let mut idx = 0;
    let piece = match chars[0] {
        'N' => {
            idx += 1;
            Piece::Knight
        }
        'B' => {
            idx += 1;
            Piece::Bishop
        }
        'R' => {
            idx += 1;
            Piece::Rook
        }
        'Q' => {
            idx += 1;
            Piece::Queen
        }
        'K' => {
            idx += 1;
            Piece::King
        }
        _ => Piece::Pawn,
    };

    let rest: String = chars[idx..].iter().collect();

    let (mover, promotion) = match rest.find('=') {
        Some(eq_pos) => {
            let promo_char = rest[eq_pos + 1..]
                .chars()
                .next()
                .ok_or_else(|| SanError::InvalidPromotion(san.to_string()))?;
            let promo = match promo_char {
                'Q' => Piece::Queen,
                'R' => Piece::Rook,
                'B' => Piece::Bishop,
                'N' => Piece::Knight,
                _ => return Err(SanError::InvalidPromotion(san.to_string())),
            };
            (rest[..eq_pos].to_string(), Some(promo))
        }
        None => (rest, None),
    };

    let mover: String = mover.chars().filter(|c| *c != 'x').collect();
    let mover_chars: Vec<char> = mover.chars().collect();
    if mover_chars.len() < 2 {
        return Err(SanError::InvalidFormat(san.to_string()));
    }
    let dest_str: String = mover_chars[mover_chars.len() - 2..].iter().collect();
    let to = parse_square(&dest_str)?;

    let mut disambig_file: Option<char> = None;
    let mut disambig_rank: Option<char> = None;
    for c in &mover_chars[..mover_chars.len() - 2] {
        if c.is_ascii_digit() {
            disambig_rank = Some(*c);
        } else if ('a'..='h').contains(c) {
            disambig_file = Some(*c);
        }
    }

    let mut candidates = Vec::new();
    board.generate_moves(|mvs| {
        if mvs.piece == piece {
            for mv in mvs {
                if mv.to != to || mv.promotion != promotion {
                    continue;
                }
                let from = format_square_chars(mv.from);
                if let Some(f) = disambig_file {
                    if from.0 != f {
                        continue;
                    }
                }
                if let Some(r) = disambig_rank {
                    if from.1 != r {
                        continue;
                    }
                }
                candidates.push(mv);
            }
        }
        false
    });

    match candidates.len() {
        0 => Err(SanError::NoLegalMove(san.to_string())),
        1 => Ok(candidates[0]),
        _ => Err(SanError::AmbiguousMove(san.to_string())),
    }
}

/// Format `mv` (legal in `board`) as SAN, including check/mate suffixes.
pub fn format_san(board: &Board, mv: Move) -> String {
    let Some(piece) = board.piece_on(mv.from) else {
        return format_move_simple(mv);
    };
    let color = board.color_on(mv.from);

    if piece == Piece::King && board.color_on(mv.to) == color {
        let san = if mv.to.file() == File::H {
            "O-O"
        } else {
            "O-O-O"
        };
        return append_check_suffix(board, mv, san.to_string());
    }

    let is_en_passant =
        piece == Piece::Pawn && mv.from.file() != mv.to.file() && board.piece_on(mv.to).is_none();
    let is_capture = board.piece_on(mv.to).is_some() || is_en_passant;

    let mut san = String::new();
    if piece == Piece::Pawn {
        if is_capture {
            san.push(format_square_chars(mv.from).0);
        }
    } else {
        san.push(PieceKind::from(piece).to_char_upper());
        san.push_str(&disambiguation(board, mv, piece));
    }

    if is_capture {
        san.push('x');
    }

    let (to_file, to_rank) = format_square_chars(mv.to);
    san.push(to_file);
    san.push(to_rank);

    if let Some(promo) = mv.promotion {
        san.push('=');
        san.push(PieceKind::from(promo).to_char_upper());
    }

    append_check_suffix(board, mv, san)
}

fn disambiguation(board: &Board, mv: Move, piece: Piece) -> String {
    let mut others: Vec<Move> = Vec::new();
    board.generate_moves(|mvs| {
        if mvs.piece == piece {
            others.extend(mvs.into_iter().filter(|m| m.to == mv.to && m.from != mv.from));
        }
        false
    });
    if others.is_empty() {
        return String::new();
    }

    let (from_file, from_rank) = format_square_chars(mv.from);
    let file_disambiguates = others
        .iter()
        .all(|m| format_square_chars(m.from).0 != from_file);
    if file_disambiguates {
        return from_file.to_string();
    }
    let rank_disambiguates = others
        .iter()
        .all(|m| format_square_chars(m.from).1 != from_rank);
    if rank_disambiguates {
        return from_rank.to_string();
    }
    format!("{from_file}{from_rank}")
}

fn append_check_suffix(board: &Board, mv: Move, mut san: String) -> String {
    let mut after = board.clone();
    after.play(mv);
    if !after.checkers().is_empty() {
        san.push(if after.status() == GameStatus::Won {
            '#'
        } else {
            '+'
        });
    }
    san
}

fn find_castle(board: &Board, kingside: bool, original: &str) -> Result<Move, SanError> {
    let color = board.side_to_move();
    let mut found = None;
    board.generate_moves(|mvs| {
        if mvs.piece == Piece::King {
            for mv in mvs {
                if board.color_on(mv.to) == Some(color) {
                    let is_kingside = mv.to.file() == File::H;
                    if is_kingside == kingside {
                        found = Some(mv);
                    }
                }
            }
        }
        false
    });
    found.ok_or_else(|| SanError::NoLegalMove(original.to_string()))
}

fn parse_square(s: &str) -> Result<cozy_chess::Square, SanError> {
    s.parse().map_err(|_| SanError::InvalidSquare(s.to_string()))
}

fn format_square_chars(sq: cozy_chess::Square) -> (char, char) {
    let s = crate::converters::format_square(sq);
    let mut chars = s.chars();
    (chars.next().unwrap(), chars.next().unwrap())
}

fn format_move_simple(mv: Move) -> String {
    format!(
        "{}{}",
        crate::converters::format_square(mv.from),
        crate::converters::format_square(mv.to)
    )
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SanError {
    #[error("no legal move found for: {0}")]
    NoLegalMove(String),
    #[error("ambiguous move: {0}")]
    AmbiguousMove(String),
    #[error("invalid format: {0}")]
    InvalidFormat(String),
    #[error("invalid square: {0}")]
    InvalidSquare(String),
    #[error("invalid promotion: {0}")]
    InvalidPromotion(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    #[test]
    fn format_pawn_push() {
        let board: Board = START_FEN.parse().unwrap();
        let mv = Move {
            from: "e2".parse().unwrap(),
            to: "e4".parse().unwrap(),
            promotion: None,
        };
        assert_eq!(format_san(&board, mv), "e4");
    }

    #[test]
    fn format_knight_development() {
        let board: Board = START_FEN.parse().unwrap();
        let mv = Move {
            from: "g1".parse().unwrap(),
            to: "f3".parse().unwrap(),
            promotion: None,
        };
        assert_eq!(format_san(&board, mv), "Nf3");
    }

    #[test]
    fn roundtrip_opening_sequence() {
        let mut board = Board::default();
        for san in ["e4", "e5", "Nf3", "Nc6", "Bb5"] {
            let mv = parse_san(&board, san).expect("legal move");
            assert_eq!(format_san(&board, mv), san);
            board.play(mv);
        }
    }

    #[test]
    fn parses_kingside_castle() {
        let fen = "r1bqkbnr/pppp1ppp/2n5/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 4 4";
        let board: Board = fen.parse().unwrap();
        let mv = parse_san(&board, "O-O").unwrap();
        assert_eq!(format_san(&board, mv), "O-O");
    }

    #[test]
    fn disambiguates_by_file() {
        // Two white knights (b1, originally g1 rerouted to d2) can both reach f3-like
        // squares; use a position with two knights able to reach the same square.
        let fen = "4k3/8/8/8/8/8/8/N1N1K3 w - - 0 1";
        let board: Board = fen.parse().unwrap();
        let mv = Move {
            from: "a1".parse().unwrap(),
            to: "b3".parse().unwrap(),
            promotion: None,
        };
        assert_eq!(format_san(&board, mv), "Nab3");
    }

    #[test]
    fn detects_checkmate_suffix() {
        // Fool's mate final position before Qh4#.
        let fen = "rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3";
        let board: Board = fen.parse().unwrap();
        // It is white to move and already mated; instead verify from black's
        // perspective one ply earlier that Qh4 delivers mate.
        let pre_fen = "rnb1kbnr/pppp1ppp/8/4p3/6P1/5P2/PPPPP2P/RNBQKBNR b KQkq - 0 2";
        let pre: Board = pre_fen.parse().unwrap();
        let mv = parse_san(&pre, "Qh4").unwrap();
        assert_eq!(format_san(&pre, mv), "Qh4#");
        let _ = &board;
    }

    #[test]
    fn rejects_unknown_move() {
        let board = Board::default();
        assert!(parse_san(&board, "Zz9").is_err());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use cozy_chess::GameStatus;
    use proptest::prelude::*;

    fn legal_moves(board: &Board) -> Vec<Move> {
        let mut moves = Vec::new();
        board.generate_moves(|mvs| {
            moves.extend(mvs);
            false
        });
        moves
    }

    proptest! {
        /// For any sequence of moves legal-by-construction (each step picks
        /// among the position's actual legal moves), `format_san` followed
        /// by `parse_san` must recover the exact same move — the pair is
        /// inverses of each other, not just "produces a parseable string".
        #[test]
        fn san_round_trips_through_random_legal_games(picks in prop::collection::vec(any::<u32>(), 1..40)) {
            let mut board = Board::default();
            for pick in picks {
                if board.status() != GameStatus::Ongoing {
                    break;
                }
                let moves = legal_moves(&board);
                if moves.is_empty() {
                    break;
                }
                let mv = moves[pick as usize % moves.len()];
                let san = format_san(&board, mv);
                let parsed = parse_san(&board, &san).expect("format_san output must parse back");
                prop_assert_eq!(parsed, mv);
                board.play(mv);
            }
        }
    }
}
