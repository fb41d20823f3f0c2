//! Chess.com adapter: month-archive JSON over `reqwest`.

use serde::Deserialize;

use super::{extract_opening, with_retry, DateRange, NormalizedGame, ProviderAdapter, ProviderError};
use crate::domain::{GameResultKind, Provider};

const USER_AGENT: &str = "chess-analysis-server/0.1 (+https://example.invalid/contact)";
const MAX_ATTEMPTS: u32 = 5;

pub struct ChessComAdapter {
    client: reqwest::Client,
    base_url: String,
}

impl ChessComAdapter {
    pub fn new() -> Self {
        Self::with_base_url("https://api.chess.com/pub".to_string())
    }

    /// Used by tests to point the adapter at a local mock server.
    pub fn with_base_url(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .expect("reqwest client builds with a static user agent");
        Self { client, base_url }
    }
}

impl Default for ChessComAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct ArchivesResponse {
    archives: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GamesResponse {
    games: Vec<RawGame>,
}

#[derive(Debug, Deserialize)]
struct RawGame {
    url: Option<String>,
    pgn: Option<String>,
    white: RawPlayer,
    black: RawPlayer,
    time_class: Option<String>,
    end_time: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RawPlayer {
    username: String,
    rating: Option<i32>,
    result: String,
}

fn classify_result(raw: &str) -> GameResultKind {
    match raw {
        "win" => GameResultKind::Win,
        "checkmated" | "resigned" | "timeout" | "lose" | "abandoned" => GameResultKind::Loss,
        _ => GameResultKind::Draw,
    }
}

async fn get_json<T: for<'de> Deserialize<'de>>(
    client: &reqwest::Client,
    url: &str,
) -> Result<T, ProviderError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| ProviderError::Transient(e.to_string()))?;

    match response.status().as_u16() {
        200 => response
            .json::<T>()
            .await
            .map_err(|e| ProviderError::Fatal(format!("malformed response: {e}"))),
        403 | 429 | 500 | 502 | 503 | 504 => Err(ProviderError::Transient(format!(
            "HTTP {}",
            response.status()
        ))),
        404 | 410 => Err(ProviderError::UserNotFound(url.to_string())),
        other => Err(ProviderError::Fatal(format!("HTTP {other}"))),
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for ChessComAdapter {
    fn provider(&self) -> Provider {
        Provider::ChessCom
    }

    async fn fetch_games(
        &self,
        handle: &str,
        range: DateRange,
    ) -> Result<Vec<NormalizedGame>, ProviderError> {
        let username = handle.trim().to_lowercase();
        let archives_url = format!("{}/player/{}/games/archives", self.base_url, username);

        let archives: ArchivesResponse =
            with_retry(MAX_ATTEMPTS, || get_json(&self.client, &archives_url)).await?;

        let filtered: Vec<&String> = archives
            .archives
            .iter()
            .filter(|url| archive_in_range(url, &range))
            .collect();

        let mut games = Vec::new();
        for archive_url in filtered {
            let response: GamesResponse =
                with_retry(MAX_ATTEMPTS, || get_json(&self.client, archive_url)).await?;
            for raw in response.games {
                if let Some(normalized) = normalize(&raw, &username) {
                    games.push(normalized);
                }
            }
        }
        Ok(games)
    }
}

fn archive_in_range(url: &str, range: &DateRange) -> bool {
    let parts: Vec<&str> = url.trim_end_matches('/').rsplit('/').take(2).collect();
    let (Some(month_str), Some(year_str)) = (parts.first(), parts.get(1)) else {
        return true;
    };
    let (Ok(month), Ok(year)) = (month_str.parse::<u32>(), year_str.parse::<i32>()) else {
        return true;
    };

    if let Some(from) = range.from {
        if year < from.year || (year == from.year && month < from.month) {
            return false;
        }
    }
    if let Some(to) = range.to {
        if year > to.year || (year == to.year && month > to.month) {
            return false;
        }
    }
    true
}

fn normalize(raw: &RawGame, target_username: &str) -> Option<NormalizedGame> {
    let white_lower = raw.white.username.to_lowercase();
    let black_lower = raw.black.username.to_lowercase();

    let (user_color, user_result, user_rating) = if white_lower == target_username {
        (analysis::UserColor::White, raw.white.result.as_str(), raw.white.rating)
    } else if black_lower == target_username {
        (analysis::UserColor::Black, raw.black.result.as_str(), raw.black.rating)
    } else {
        return None;
    };

    let pgn = raw.pgn.clone().unwrap_or_default();
    let (opening_eco, opening_name) = extract_opening(&pgn);
    let provider_id = raw
        .url
        .as_ref()
        .and_then(|u| u.rsplit('/').next())
        .map(str::to_string);

    Some(NormalizedGame {
        provider_id,
        provider_url: raw.url.clone(),
        pgn,
        white_name: raw.white.username.clone(),
        white_rating: raw.white.rating,
        black_name: raw.black.username.clone(),
        black_rating: raw.black.rating,
        user_color,
        user_rating,
        result: classify_result(user_result),
        termination: Some(user_result.to_string()),
        time_class: raw.time_class.clone(),
        opening_eco,
        opening_name,
        played_at: raw
            .end_time
            .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_results() {
        assert_eq!(classify_result("win"), GameResultKind::Win);
        assert_eq!(classify_result("resigned"), GameResultKind::Loss);
        assert_eq!(classify_result("agreed"), GameResultKind::Draw);
    }

    #[test]
    fn archive_range_filters_by_year_month() {
        let range = DateRange {
            from: Some(super::super::YearMonth { year: 2024, month: 3 }),
            to: Some(super::super::YearMonth { year: 2024, month: 6 }),
        };
        assert!(archive_in_range("https://api.chess.com/pub/player/x/games/2024/04", &range));
        assert!(!archive_in_range("https://api.chess.com/pub/player/x/games/2024/01", &range));
        assert!(!archive_in_range("https://api.chess.com/pub/player/x/games/2024/08", &range));
    }
}
