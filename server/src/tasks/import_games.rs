use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;

use crate::db::{NewGame, Repos};
use crate::domain::Provider;
use crate::error::PersistenceError;
use crate::providers::{ChessComAdapter, DateRange, LichessAdapter, ProviderAdapter, ProviderError, YearMonth};
use crate::queue::Task;

const PROGRESS_BATCH: usize = 10;

/// Resolves a `Provider` to its concrete adapter; swappable in tests via
/// `ProviderRegistry::with` for a mock-server-backed adapter.
#[derive(Clone)]
pub struct ProviderRegistry {
    chess_com: Arc<dyn ProviderAdapter>,
    lichess: Arc<dyn ProviderAdapter>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            chess_com: Arc::new(ChessComAdapter::new()),
            lichess: Arc::new(LichessAdapter::new()),
        }
    }

    pub fn with(chess_com: Arc<dyn ProviderAdapter>, lichess: Arc<dyn ProviderAdapter>) -> Self {
        Self { chess_com, lichess }
    }

    pub fn get(&self, provider: Provider) -> Arc<dyn ProviderAdapter> {
        match provider {
            Provider::ChessCom => self.chess_com.clone(),
            Provider::Lichess => self.lichess.clone(),
        }
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct YearMonthPayload {
    year: i32,
    month: u32,
}

impl From<YearMonthPayload> for YearMonth {
    fn from(value: YearMonthPayload) -> Self {
        YearMonth {
            year: value.year,
            month: value.month,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Payload {
    user_id: i64,
    handle: String,
    job_id: String,
    provider: String,
    from: Option<YearMonthPayload>,
    to: Option<YearMonthPayload>,
}

/// `import_games(user_id, handle, job_id, date_range)` — runs on the
/// `imports` queue, concurrency pinned to 1.
pub struct ImportGamesTask {
    pub repos: Repos,
    pub providers: ProviderRegistry,
}

#[async_trait::async_trait]
impl Task for ImportGamesTask {
    fn name(&self) -> &'static str {
        super::IMPORT_GAMES
    }

    async fn run(&self, payload: serde_json::Value) -> Result<(), anyhow::Error> {
        let payload: Payload = serde_json::from_value(payload)?;
        let provider: Provider = payload
            .provider
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))?;
        let range = DateRange {
            from: payload.from.map(Into::into),
            to: payload.to.map(Into::into),
        };
        run_import(
            &self.repos,
            &self.providers,
            payload.user_id,
            &payload.handle,
            &payload.job_id,
            provider,
            range,
        )
        .await
    }
}

pub async fn run_import(
    repos: &Repos,
    providers: &ProviderRegistry,
    user_id: i64,
    handle: &str,
    job_id: &str,
    provider: Provider,
    range: DateRange,
) -> Result<(), anyhow::Error> {
    repos.jobs.mark_processing(job_id, Utc::now()).await?;
    repos.jobs.set_progress(job_id, 5, None, None).await?;

    let adapter = providers.get(provider);
    let fetched = match adapter.fetch_games(handle, range).await {
        Ok(games) => games,
        Err(e) => {
            fail_job(repos, job_id, &provider_error_message(&e)).await?;
            return Ok(());
        }
    };

    repos
        .jobs
        .set_progress(job_id, 10, Some(fetched.len() as i32), Some(0))
        .await?;

    let existing = repos.games.existing_provider_ids(user_id, provider).await?;

    let mut inserted = 0usize;
    let mut newest_rating: Option<(chrono::DateTime<Utc>, i32)> = None;

    for normalized in &fetched {
        if let Some(id) = &normalized.provider_id {
            if existing.contains(id) {
                continue;
            }
        }

        repos
            .games
            .insert(
                user_id,
                &NewGame {
                    provider,
                    provider_id: normalized.provider_id.clone(),
                    provider_url: normalized.provider_url.clone(),
                    pgn: normalized.pgn.clone(),
                    white_name: normalized.white_name.clone(),
                    white_rating: normalized.white_rating,
                    black_name: normalized.black_name.clone(),
                    black_rating: normalized.black_rating,
                    user_color: normalized.user_color,
                    result: normalized.result,
                    termination: normalized.termination.clone(),
                    time_class: normalized.time_class.clone(),
                    opening_eco: normalized.opening_eco.clone(),
                    opening_name: normalized.opening_name.clone(),
                    played_at: normalized.played_at,
                    user_rating: normalized.user_rating,
                },
            )
            .await?;
        inserted += 1;

        if let (Some(played_at), Some(rating)) = (normalized.played_at, normalized.user_rating) {
            if newest_rating.map(|(at, _)| played_at >= at).unwrap_or(true) {
                newest_rating = Some((played_at, rating));
            }
        }

        if inserted % PROGRESS_BATCH == 0 {
            let progress = 10 + (inserted as i64 * 80 / fetched.len().max(1) as i64) as i32;
            repos
                .jobs
                .set_progress(job_id, progress.min(99), None, Some(inserted as i32))
                .await?;
        }
    }

    repos
        .users
        .record_import(user_id, Utc::now(), newest_rating.map(|(_, rating)| rating))
        .await?;

    repos
        .jobs
        .set_progress(job_id, 100, None, Some(inserted as i32))
        .await?;
    repos.jobs.mark_completed(job_id, Utc::now()).await?;
    Ok(())
}

fn provider_error_message(e: &ProviderError) -> String {
    e.to_string()
}

async fn fail_job(repos: &Repos, job_id: &str, message: &str) -> Result<(), PersistenceError> {
    repos.jobs.mark_failed(job_id, message, Utc::now()).await
}
