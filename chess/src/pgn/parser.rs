use cozy_chess::{Board, Move};
use std::collections::HashMap;

use super::san::parse_san;

/// A parsed PGN game: header tags, the move list with inline annotations,
/// and the game result as written in the movetext (falling back to the
/// `Result` tag when the movetext omits it).
#[derive(Debug, Clone)]
pub struct PgnGame {
    pub tags: HashMap<String, String>,
    pub moves: Vec<PgnMove>,
    pub result: GameResult,
}

/// A single move in PGN with metadata.
#[derive(Debug, Clone)]
pub struct PgnMove {
    pub mv: Move,
    pub san: String,
    pub comment: Option<String>,
    pub nags: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameResult {
    WhiteWins,
    BlackWins,
    Draw,
    Ongoing,
}

/// Parse a PGN string (headers + movetext) into a [`PgnGame`].
///
/// Variations (`(...)`) are skipped rather than represented; comments
/// (`{...}` and `;...`) attach to the preceding move.
pub fn parse_pgn(input: &str) -> Result<PgnGame, PgnError> {
    let mut tags = HashMap::new();
    let mut movetext_lines: Vec<&str> = Vec::new();
    let mut in_header = true;

    for line in input.lines() {
        let trimmed = line.trim();
        if in_header {
            if trimmed.is_empty() {
                continue;
            }
            if let Some(tag) = trimmed.strip_prefix('[') {
                if !trimmed.ends_with(']') {
                    return Err(PgnError::InvalidTag(trimmed.to_string()));
                }
                let inner = tag.trim_end_matches(']');
                let (key, value) = parse_tag_line(inner)
                    .ok_or_else(|| PgnError::InvalidTag(trimmed.to_string()))?;
                tags.insert(key, value);
                continue;
            }
            in_header = false;
        }
        movetext_lines.push(line);
    }

    let movetext = movetext_lines.join(" ");
    let tokens = tokenize_movetext(&movetext);

    let mut board = Board::default();
    let mut moves: Vec<PgnMove> = Vec::new();
    let mut result = GameResult::Ongoing;
    let mut pending_nags: Vec<u8> = Vec::new();

    for token in tokens {
        match token {
            Token::MoveNumber => continue,
            Token::Result(r) => result = r,
            Token::Nag(n) => pending_nags.push(n),
            Token::Comment(c) => {
                if let Some(last) = moves.last_mut() {
                    last.comment = Some(match last.comment.take() {
                        Some(existing) => format!("{existing} {c}"),
                        None => c,
                    });
                }
            }
            Token::San(san) => {
                let mv = parse_san(&board, &san)?;
                board.play(mv);
                moves.push(PgnMove {
                    mv,
                    san,
                    comment: None,
                    nags: std::mem::take(&mut pending_nags),
                });
            }
        }
    }

    if matches!(result, GameResult::Ongoing) {
        if let Some(tag_result) = tags.get("Result") {
            result = parse_result_token(tag_result).unwrap_or(GameResult::Ongoing);
        }
    }

    Ok(PgnGame {
        tags,
        moves,
        result,
    })
}

enum Token {
    MoveNumber,
    Result(GameResult),
    Nag(u8),
    Comment(String),
    San(String),
}

fn tokenize_movetext(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if c == '{' {
            let start = i + 1;
            let mut j = start;
            while j < chars.len() && chars[j] != '}' {
                j += 1;
            }
            tokens.push(Token::Comment(
                chars[start..j].iter().collect::<String>().trim().to_string(),
            ));
            i = (j + 1).min(chars.len());
            continue;
        }
        if c == ';' {
            let start = i + 1;
            let mut j = start;
            while j < chars.len() && chars[j] != '\n' {
                j += 1;
            }
            tokens.push(Token::Comment(
                chars[start..j].iter().collect::<String>().trim().to_string(),
            ));
            i = j;
            continue;
        }
        if c == '(' {
            let mut depth = 1;
            let mut j = i + 1;
            while j < chars.len() && depth > 0 {
                match chars[j] {
                    '(' => depth += 1,
                    ')' => depth -= 1,
                    _ => {}
                }
                j += 1;
            }
            i = j;
            continue;
        }

        let start = i;
        let mut j = i;
        while j < chars.len() && !chars[j].is_whitespace() && chars[j] != '{' && chars[j] != '(' {
            j += 1;
        }
        let word: String = chars[start..j].iter().collect();
        i = j;
        if word.is_empty() {
            continue;
        }
        tokens.push(classify_word(&word));
    }
    tokens
}

fn classify_word(word: &str) -> Token {
    if let Some(result) = parse_result_token(word) {
        return Token::Result(result);
    }
    if let Some(rest) = word.strip_prefix('$') {
        if let Ok(n) = rest.parse::<u8>() {
            return Token::Nag(n);
        }
    }
    let after_digits = word.trim_start_matches(|c: char| c.is_ascii_digit());
    if after_digits.len() != word.len() {
        let san_part = after_digits.trim_start_matches('.');
        if san_part.is_empty() {
            return Token::MoveNumber;
        }
        return Token::San(san_part.to_string());
    }
    Token::San(word.to_string())
}

fn parse_result_token(word: &str) -> Option<GameResult> {
    match word {
        "1-0" => Some(GameResult::WhiteWins),
        "0-1" => Some(GameResult::BlackWins),
        "1/2-1/2" => Some(GameResult::Draw),
        "*" => Some(GameResult::Ongoing),
        _ => None,
    }
}

fn parse_tag_line(inner: &str) -> Option<(String, String)> {
    let inner = inner.trim();
    let space_idx = inner.find(char::is_whitespace)?;
    let key = inner[..space_idx].trim().to_string();
    let value = inner[space_idx..].trim().trim_matches('"').to_string();
    if key.is_empty() {
        return None;
    }
    Some((key, value))
}

#[derive(Debug, thiserror::Error)]
pub enum PgnError {
    #[error("invalid PGN format")]
    InvalidFormat,
    #[error("invalid tag: {0}")]
    InvalidTag(String),
    #[error("SAN parse error: {0}")]
    SanError(#[from] super::san::SanError),
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[Event "Test"]
[Site "?"]
[Date "2024.01.01"]
[Round "1"]
[White "Alice"]
[Black "Bob"]
[Result "1-0"]
[ECO "C50"]

1. e4 e5 2. Nf3 Nc6 3. Bc4 Bc5 4. c3 Nf6 5. d3 {a quiet line} O-O 1-0"#;

    #[test]
    fn parses_headers_and_moves() {
        let game = parse_pgn(SAMPLE).unwrap();
        assert_eq!(game.tags.get("ECO").map(String::as_str), Some("C50"));
        assert_eq!(game.tags.get("White").map(String::as_str), Some("Alice"));
        assert_eq!(game.moves.len(), 10);
        assert_eq!(game.moves[0].san, "e4");
        assert_eq!(game.moves[9].san, "O-O");
        assert_eq!(game.result, GameResult::WhiteWins);
    }

    #[test]
    fn attaches_comment_to_preceding_move() {
        let game = parse_pgn(SAMPLE).unwrap();
        assert_eq!(game.moves[8].comment.as_deref(), Some("a quiet line"));
    }

    #[test]
    fn falls_back_to_result_tag_when_movetext_omits_it() {
        let pgn = "[Result \"0-1\"]\n\n1. e4 e5 2. Qh5 Nc6 3. Bc4 g6 4. Qf3 Nf6 5. Qxf6";
        let game = parse_pgn(pgn).unwrap();
        assert_eq!(game.result, GameResult::BlackWins);
    }

    #[test]
    fn rejects_illegal_move() {
        let pgn = "1. e4 e5 2. Ke2 Ke7 3. Qxh8";
        let err = parse_pgn(pgn).unwrap_err();
        assert!(matches!(err, PgnError::SanError(_)));
    }
}
