use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub chess_com_handle: Option<String>,
    pub lichess_handle: Option<String>,
    pub last_import_at: Option<DateTime<Utc>>,
    pub current_rating: Option<i32>,
}

impl User {
    pub fn handle_for(&self, provider: super::game::Provider) -> Option<&str> {
        match provider {
            super::game::Provider::ChessCom => self.chess_com_handle.as_deref(),
            super::game::Provider::Lichess => self.lichess_handle.as_deref(),
        }
    }
}

/// Aggregate-by-user rollup, recomputed wholesale after every analyzed game
/// rather than incremented — the dashboard query surface itself is out of
/// scope, but the recompute call site is not (worker tasks depend on it).
#[derive(Debug, Clone, Default)]
pub struct UserStats {
    pub user_id: i64,
    pub games_white: i32,
    pub wins_white: i32,
    pub losses_white: i32,
    pub draws_white: i32,
    pub games_black: i32,
    pub wins_black: i32,
    pub losses_black: i32,
    pub draws_black: i32,
    pub average_accuracy: Option<f64>,
    pub average_centipawn_loss: Option<f64>,
    pub num_blunders: i32,
    pub num_mistakes: i32,
    pub num_inaccuracies: i32,
    pub peak_rating: Option<i32>,
}
