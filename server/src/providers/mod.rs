//! Provider adapter contract: translates a provider's game history into
//! [`NormalizedGame`] records the import task can insert directly.

pub mod chess_com;
pub mod lichess;

use chrono::{DateTime, Utc};

pub use chess_com::ChessComAdapter;
pub use lichess::LichessAdapter;

use crate::domain::{GameResultKind, Provider};

/// A calendar month, used to bound a provider fetch by archive/since-until.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

#[derive(Debug, Clone)]
pub struct DateRange {
    pub from: Option<YearMonth>,
    pub to: Option<YearMonth>,
}

/// One game fetched and translated from a provider, ready to become a
/// `NewGame` row. Field shape mirrors the Game entity's import-time facet.
#[derive(Debug, Clone)]
pub struct NormalizedGame {
    pub provider_id: Option<String>,
    pub provider_url: Option<String>,
    pub pgn: String,
    pub white_name: String,
    pub white_rating: Option<i32>,
    pub black_name: String,
    pub black_rating: Option<i32>,
    pub user_color: analysis::UserColor,
    pub user_rating: Option<i32>,
    pub result: GameResultKind,
    pub termination: Option<String>,
    pub time_class: Option<String>,
    pub opening_eco: Option<String>,
    pub opening_name: Option<String>,
    pub played_at: Option<DateTime<Utc>>,
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("user '{0}' not found")]
    UserNotFound(String),
    #[error("rate limited")]
    RateLimited,
    #[error("transient provider error: {0}")]
    Transient(String),
    #[error("fatal provider error: {0}")]
    Fatal(String),
}

#[async_trait::async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn provider(&self) -> Provider;

    async fn fetch_games(
        &self,
        handle: &str,
        range: DateRange,
    ) -> Result<Vec<NormalizedGame>, ProviderError>;
}

/// Retry a fallible HTTP call with exponential backoff on `RateLimited` and
/// `Transient` failures; `UserNotFound`/`Fatal` are returned immediately.
/// Grounded in the `Retry`/`HTTPAdapter` status-forcelist policy both
/// provider services use upstream.
pub(crate) async fn with_retry<T, F, Fut>(max_attempts: u32, mut call: F) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, ProviderError>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match call().await {
            Ok(value) => return Ok(value),
            Err(ProviderError::RateLimited) | Err(ProviderError::Transient(_)) if attempt < max_attempts => {
                let backoff_ms = 500u64 * 2u64.pow(attempt - 1);
                tracing::warn!(attempt, backoff_ms, "provider call failed, retrying");
                tokio::time::sleep(std::time::Duration::from_millis(backoff_ms)).await;
            }
            Err(e) => return Err(e),
        }
    }
}

pub(crate) fn extract_opening(pgn: &str) -> (Option<String>, Option<String>) {
    match chess::parse_pgn(pgn) {
        Ok(parsed) => (
            parsed.tags.get("ECO").cloned(),
            parsed.tags.get("Opening").cloned(),
        ),
        Err(_) => (None, None),
    }
}
