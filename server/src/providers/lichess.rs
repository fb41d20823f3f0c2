//! Lichess adapter: NDJSON game stream over `reqwest`.

use serde::Deserialize;

use super::{extract_opening, with_retry, DateRange, NormalizedGame, ProviderAdapter, ProviderError};
use crate::domain::{GameResultKind, Provider};

const USER_AGENT: &str = "chess-analysis-server/0.1 (+https://example.invalid/contact)";
const MAX_ATTEMPTS: u32 = 5;
const MAX_GAMES: u32 = 200;

pub struct LichessAdapter {
    client: reqwest::Client,
    base_url: String,
}

impl LichessAdapter {
    pub fn new() -> Self {
        Self::with_base_url("https://lichess.org/api".to_string())
    }

    pub fn with_base_url(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .expect("reqwest client builds with a static user agent");
        Self { client, base_url }
    }
}

impl Default for LichessAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct RawGame {
    id: String,
    pgn: Option<String>,
    moves: Option<String>,
    status: Option<String>,
    winner: Option<String>,
    players: RawPlayers,
    #[serde(rename = "createdAt")]
    created_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RawPlayers {
    white: RawPlayer,
    black: RawPlayer,
}

#[derive(Debug, Deserialize, Default)]
struct RawPlayer {
    user: Option<RawUser>,
    rating: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    name: String,
}

fn year_month_to_millis(ym: Option<super::YearMonth>, end_of_month: bool) -> Option<i64> {
    let ym = ym?;
    let (year, month) = if end_of_month {
        if ym.month == 12 {
            (ym.year + 1, 1)
        } else {
            (ym.year, ym.month + 1)
        }
    } else {
        (ym.year, ym.month)
    };
    let date = chrono::NaiveDate::from_ymd_opt(year, month, 1)?;
    let datetime = date.and_hms_opt(0, 0, 0)?;
    let millis = datetime.and_utc().timestamp_millis();
    Some(if end_of_month { millis - 1 } else { millis })
}

async fn fetch_ndjson(
    client: &reqwest::Client,
    url: &str,
    query: &[(&str, String)],
) -> Result<String, ProviderError> {
    let response = client
        .get(url)
        .query(query)
        .send()
        .await
        .map_err(|e| ProviderError::Transient(e.to_string()))?;

    match response.status().as_u16() {
        200 => response
            .text()
            .await
            .map_err(|e| ProviderError::Fatal(format!("malformed response: {e}"))),
        404 => Err(ProviderError::UserNotFound(url.to_string())),
        429 => Err(ProviderError::RateLimited),
        500 | 502 | 503 | 504 => Err(ProviderError::Transient(format!("HTTP {}", response.status()))),
        other => Err(ProviderError::Fatal(format!("HTTP {other}"))),
    }
}

fn normalize(raw: &RawGame, target_username: &str) -> Option<NormalizedGame> {
    let white_name = raw.players.white.user.as_ref().map(|u| u.name.clone()).unwrap_or_default();
    let black_name = raw.players.black.user.as_ref().map(|u| u.name.clone()).unwrap_or_default();

    let (user_color, user_rating) = if white_name.to_lowercase() == target_username {
        (analysis::UserColor::White, raw.players.white.rating)
    } else if black_name.to_lowercase() == target_username {
        (analysis::UserColor::Black, raw.players.black.rating)
    } else {
        return None;
    };

    let user_color_str = if matches!(user_color, analysis::UserColor::White) {
        "white"
    } else {
        "black"
    };
    let result = match raw.winner.as_deref() {
        Some(w) if w == user_color_str => GameResultKind::Win,
        Some(_) => GameResultKind::Loss,
        None => GameResultKind::Draw,
    };

    let status = raw.status.clone().unwrap_or_default().to_lowercase();
    let termination = if status.contains("checkmate") {
        Some("checkmate".to_string())
    } else if status.contains("resign") {
        Some("resignation".to_string())
    } else if status.contains("time") {
        Some("timeout".to_string())
    } else if status.contains("stalemate") {
        Some("stalemate".to_string())
    } else if status.contains("draw") {
        Some("draw".to_string())
    } else {
        None
    };

    let pgn = raw
        .pgn
        .clone()
        .or_else(|| raw.moves.clone())
        .unwrap_or_default();
    let (opening_eco, opening_name) = extract_opening(&pgn);

    Some(NormalizedGame {
        provider_id: Some(raw.id.clone()),
        provider_url: Some(format!("https://lichess.org/{}", raw.id)),
        pgn,
        white_name,
        white_rating: raw.players.white.rating,
        black_name,
        black_rating: raw.players.black.rating,
        user_color,
        user_rating,
        result,
        termination,
        time_class: None,
        opening_eco,
        opening_name,
        played_at: raw
            .created_at
            .and_then(|ms| chrono::DateTime::from_timestamp_millis(ms)),
    })
}

#[async_trait::async_trait]
impl ProviderAdapter for LichessAdapter {
    fn provider(&self) -> Provider {
        Provider::Lichess
    }

    async fn fetch_games(
        &self,
        handle: &str,
        range: DateRange,
    ) -> Result<Vec<NormalizedGame>, ProviderError> {
        let username = handle.trim().to_string();
        let url = format!("{}/games/user/{}", self.base_url, username);

        let mut query = vec![
            ("max".to_string(), MAX_GAMES.to_string()),
            ("pgnInJson".to_string(), "true".to_string()),
        ];
        if let Some(since) = year_month_to_millis(range.from, false) {
            query.push(("since".to_string(), since.to_string()));
        }
        if let Some(until) = year_month_to_millis(range.to, true) {
            query.push(("until".to_string(), until.to_string()));
        }
        let query: Vec<(&str, String)> = query.iter().map(|(k, v)| (k.as_str(), v.clone())).collect();

        let body = with_retry(MAX_ATTEMPTS, || fetch_ndjson(&self.client, &url, &query)).await?;

        let username_lower = username.to_lowercase();
        let games = body
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| serde_json::from_str::<RawGame>(line).ok())
            .filter_map(|raw| normalize(&raw, &username_lower))
            .collect();
        Ok(games)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_month_end_of_month_is_exclusive_upper_bound() {
        let ym = super::super::YearMonth { year: 2024, month: 12 };
        let millis = year_month_to_millis(Some(ym), true).unwrap();
        let start_of_next = chrono::DateTime::from_timestamp_millis(millis + 1).unwrap();
        assert_eq!(start_of_next.format("%Y-%m-%d").to_string(), "2025-01-01");
    }
}
