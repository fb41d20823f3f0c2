use analysis::{MoveClassification, UserColor};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    ChessCom,
    Lichess,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::ChessCom => "chess_com",
            Provider::Lichess => "lichess",
        }
    }
}

impl std::str::FromStr for Provider {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chess_com" => Ok(Provider::ChessCom),
            "lichess" => Ok(Provider::Lichess),
            other => Err(format!("unknown provider {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameResultKind {
    Win,
    Loss,
    Draw,
}

impl GameResultKind {
    pub fn as_str(self) -> &'static str {
        match self {
            GameResultKind::Win => "win",
            GameResultKind::Loss => "loss",
            GameResultKind::Draw => "draw",
        }
    }
}

impl std::str::FromStr for GameResultKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "win" => Ok(GameResultKind::Win),
            "loss" => Ok(GameResultKind::Loss),
            "draw" => Ok(GameResultKind::Draw),
            other => Err(format!("unknown game result {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisState {
    Unanalyzed,
    InProgress,
    Analyzed,
}

impl AnalysisState {
    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisState::Unanalyzed => "unanalyzed",
            AnalysisState::InProgress => "in_progress",
            AnalysisState::Analyzed => "analyzed",
        }
    }
}

impl std::str::FromStr for AnalysisState {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unanalyzed" => Ok(AnalysisState::Unanalyzed),
            "in_progress" => Ok(AnalysisState::InProgress),
            "analyzed" => Ok(AnalysisState::Analyzed),
            other => Err(format!("unknown analysis state {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Game {
    pub id: i64,
    pub user_id: i64,
    pub provider: Provider,
    pub provider_id: Option<String>,
    pub provider_url: Option<String>,
    pub pgn: String,
    pub white_name: String,
    pub white_rating: Option<i32>,
    pub black_name: String,
    pub black_rating: Option<i32>,
    pub user_color: UserColor,
    pub result: GameResultKind,
    pub termination: Option<String>,
    pub time_class: Option<String>,
    pub opening_eco: Option<String>,
    pub opening_name: Option<String>,
    pub analysis_state: AnalysisState,
    pub accuracy: Option<f64>,
    pub average_centipawn_loss: Option<f64>,
    pub num_blunders: i32,
    pub num_mistakes: i32,
    pub num_inaccuracies: i32,
    pub analyzed_at: Option<DateTime<Utc>>,
    pub move_count: Option<i32>,
    pub played_at: Option<DateTime<Utc>>,
}

/// A single analyzed (or not-yet-analyzed) ply, persisted only once a game
/// has run through the move analyzer.
#[derive(Debug, Clone)]
pub struct Move {
    pub id: i64,
    pub game_id: i64,
    pub half_move: i32,
    pub move_number: i32,
    pub is_white: bool,
    pub san: String,
    pub uci: String,
    pub evaluation_before: i32,
    pub evaluation_after: i32,
    pub best_move_uci: String,
    pub classification: MoveClassification,
    pub centipawn_loss: i32,
    pub commentary: Option<String>,
}

pub fn classification_as_str(c: MoveClassification) -> &'static str {
    match c {
        MoveClassification::Best => "best",
        MoveClassification::Excellent => "excellent",
        MoveClassification::Good => "good",
        MoveClassification::Inaccuracy => "inaccuracy",
        MoveClassification::Mistake => "mistake",
        MoveClassification::Blunder => "blunder",
    }
}

pub fn classification_from_str(s: &str) -> Result<MoveClassification, String> {
    match s {
        "best" => Ok(MoveClassification::Best),
        "excellent" => Ok(MoveClassification::Excellent),
        "good" => Ok(MoveClassification::Good),
        "inaccuracy" => Ok(MoveClassification::Inaccuracy),
        "mistake" => Ok(MoveClassification::Mistake),
        "blunder" => Ok(MoveClassification::Blunder),
        other => Err(format!("unknown classification {other}")),
    }
}

pub fn user_color_as_str(c: UserColor) -> &'static str {
    match c {
        UserColor::White => "white",
        UserColor::Black => "black",
    }
}

pub fn user_color_from_str(s: &str) -> Result<UserColor, String> {
    match s {
        "white" => Ok(UserColor::White),
        "black" => Ok(UserColor::Black),
        other => Err(format!("unknown user color {other}")),
    }
}
