//! Shared fixtures for the `server/tests/` integration suite: an in-memory
//! `AppState` plus a mock provider adapter, so scenario tests can dispatch
//! through the real handlers and task bodies without a live database or
//! network.

use std::sync::Arc;

use chess_analysis_server::auth::HeaderAuthProvider;
use chess_analysis_server::db::{Database, Repos};
use chess_analysis_server::domain::{GameResultKind, Provider};
use chess_analysis_server::events::NullEventBus;
use chess_analysis_server::http::{AppState, EngineSettings};
use chess_analysis_server::providers::{DateRange, NormalizedGame, ProviderAdapter, ProviderError};
use chess_analysis_server::queue::DbTaskQueue;
use chess_analysis_server::tasks::import_games::ProviderRegistry;
use sqlx::SqlitePool;

#[allow(dead_code)]
pub async fn new_state() -> (AppState, SqlitePool) {
    let db = Database::new_in_memory().await.unwrap();
    let pool = db.pool().clone();
    let repos = Repos::new(pool.clone());
    let queue = DbTaskQueue::new(pool.clone());
    let state = AppState {
        repos,
        events: Arc::new(NullEventBus::default()),
        queue,
        providers: ProviderRegistry::new(),
        auth: Arc::new(HeaderAuthProvider),
        engine: EngineSettings { depth: 12, time_ms: 500 },
    };
    (state, pool)
}

#[allow(dead_code)]
pub async fn seed_user(pool: &SqlitePool, id: i64) {
    sqlx::query("INSERT INTO users (id, username, email, password_hash) VALUES (?, ?, ?, ?)")
        .bind(id)
        .bind(format!("user{id}"))
        .bind(format!("user{id}@example.com"))
        .bind("hash")
        .execute(pool)
        .await
        .unwrap();
}

/// An adapter that always returns the same fixed history, regardless of
/// `handle`/`range` — enough to exercise the import task's dedup path
/// across repeated calls.
#[allow(dead_code)]
pub struct FixedAdapter {
    pub provider: Provider,
    pub games: Vec<NormalizedGame>,
}

#[async_trait::async_trait]
impl ProviderAdapter for FixedAdapter {
    fn provider(&self) -> Provider {
        self.provider
    }

    async fn fetch_games(
        &self,
        _handle: &str,
        _range: DateRange,
    ) -> Result<Vec<NormalizedGame>, ProviderError> {
        Ok(self.games.clone())
    }
}

#[allow(dead_code)]
pub fn sample_games(n: usize) -> Vec<NormalizedGame> {
    (0..n)
        .map(|i| NormalizedGame {
            provider_id: Some(format!("game-{i}")),
            provider_url: None,
            pgn: "1. e4 e5 2. Nf3 Nc6".to_string(),
            white_name: "alice".to_string(),
            white_rating: Some(1500),
            black_name: "bob".to_string(),
            black_rating: Some(1480),
            user_color: analysis::UserColor::White,
            user_rating: Some(1500),
            result: GameResultKind::Win,
            termination: None,
            time_class: Some("blitz".to_string()),
            opening_eco: None,
            opening_name: None,
            played_at: Some(chrono::Utc::now()),
        })
        .collect()
}
