//! Optional LLM coaching commentary: a pluggable strategy attached to the
//! user's own blunders and mistakes after the engine analysis pass
//! completes. Bounded by a 25s wall-clock timeout per call and a cap on
//! commentaries per game; a failure here never touches the analysis
//! outcome that has already been computed.

use std::time::Duration;

use analysis::MoveAnalysis;
use chess::GamePhase;
use serde::Deserialize;
use serde_json::json;

use crate::config::{CoachProvider as ConfiguredProvider, Config};

pub const MAX_COMMENTARIES_PER_GAME: usize = 5;
const CALL_TIMEOUT: Duration = Duration::from_secs(25);
const SYSTEM_PROMPT: &str = "You are an experienced chess coach providing constructive feedback. Be concise, educational, and encouraging. Focus on explaining why a move was problematic and what the player should have considered. Keep responses to 1-2 sentences.";

/// Mirrors the original's `should_analyze` gate: only blunders and
/// mistakes get commentary, never inaccuracies.
fn worth_commenting_on(mv: &MoveAnalysis) -> bool {
    matches!(
        mv.classification,
        analysis::MoveClassification::Blunder | analysis::MoveClassification::Mistake
    )
}

fn phase_name(phase: GamePhase) -> &'static str {
    match phase {
        GamePhase::Opening => "opening",
        GamePhase::Middlegame => "middlegame",
        GamePhase::Endgame => "endgame",
    }
}

fn build_prompt(mv: &MoveAnalysis, phase: GamePhase, user_color: analysis::UserColor) -> String {
    let classification = classification_name(mv.classification);
    let color = if user_color.is_white() { "white" } else { "black" };
    format!(
        "You are analyzing a chess position where the player (playing {color}) made a {classification}.\n\n\
         Move played: {san}\n\
         Classification: {classification}\n\
         Centipawn loss: {cpl}\n\
         Game phase: {phase}\n\n\
         Provide brief, educational coaching feedback (1-2 sentences) explaining:\n\
         1. Why this move was a {classification}\n\
         2. What the player should have considered instead\n\n\
         Be constructive and focus on learning.",
        color = color,
        classification = classification,
        san = mv.san,
        cpl = mv.centipawn_loss,
        phase = phase_name(phase),
    )
}

fn classification_name(c: analysis::MoveClassification) -> &'static str {
    match c {
        analysis::MoveClassification::Best => "best move",
        analysis::MoveClassification::Excellent => "excellent move",
        analysis::MoveClassification::Good => "good move",
        analysis::MoveClassification::Inaccuracy => "inaccuracy",
        analysis::MoveClassification::Mistake => "mistake",
        analysis::MoveClassification::Blunder => "blunder",
    }
}

#[async_trait::async_trait]
pub trait CoachStrategy: Send + Sync {
    async fn commentary(&self, prompt: &str) -> Option<String>;
}

/// Reads `COACH_ENABLED`/`COACH_PROVIDER` and builds the configured
/// strategy, or `None` if coaching is disabled or misconfigured — in which
/// case every move is simply left uncommented.
pub fn build_strategy(config: &Config) -> Option<Box<dyn CoachStrategy>> {
    if !config.coach_enabled {
        return None;
    }
    match config.coach_provider {
        ConfiguredProvider::ExternalApi => {
            let endpoint = config.coach_endpoint.clone()?;
            let model = config.coach_model.clone().unwrap_or_else(|| "gpt-4o-mini".to_string());
            Some(Box::new(ExternalApiCoach::new(endpoint, model)))
        }
        ConfiguredProvider::LocalLlm => {
            let endpoint = config
                .coach_endpoint
                .clone()
                .unwrap_or_else(|| "http://localhost:11434".to_string());
            let model = config.coach_model.clone().unwrap_or_else(|| "llama3.1".to_string());
            Some(Box::new(LocalLlmCoach::new(endpoint, model)))
        }
    }
}

/// Attach commentary to up to [`MAX_COMMENTARIES_PER_GAME`] of the worst
/// moves `user_color` made in `moves`, in ply order. The opponent's moves
/// are never commented on. Any call that errors or times out simply
/// leaves that move's commentary as `None`.
pub async fn annotate(
    strategy: &dyn CoachStrategy,
    moves: &mut [MoveAnalysis],
    total_plies: usize,
    user_color: analysis::UserColor,
) {
    let mut remaining = MAX_COMMENTARIES_PER_GAME;
    for mv in moves.iter_mut() {
        if remaining == 0 {
            break;
        }
        if mv.is_white != user_color.is_white() {
            continue;
        }
        if !worth_commenting_on(mv) {
            continue;
        }
        let phase = GamePhase::of(mv.half_move as usize, total_plies);
        let prompt = build_prompt(mv, phase, user_color);
        match tokio::time::timeout(CALL_TIMEOUT, strategy.commentary(&prompt)).await {
            Ok(Some(text)) => {
                mv.commentary = Some(text);
                remaining -= 1;
            }
            Ok(None) => {}
            Err(_) => {
                tracing::warn!(half_move = mv.half_move, "coach commentary call timed out");
            }
        }
    }
}

/// An OpenAI-compatible chat completions endpoint.
pub struct ExternalApiCoach {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl ExternalApiCoach {
    pub fn new(endpoint: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            model,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[async_trait::async_trait]
impl CoachStrategy for ExternalApiCoach {
    async fn commentary(&self, prompt: &str) -> Option<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({
                "model": self.model,
                "messages": [
                    { "role": "system", "content": SYSTEM_PROMPT },
                    { "role": "user", "content": prompt },
                ],
                "max_tokens": 150,
                "temperature": 0.7,
            }))
            .send()
            .await
            .map_err(|e| tracing::warn!(error = %e, "coach API request failed"))
            .ok()?;

        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "coach API returned an error status");
            return None;
        }

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| tracing::warn!(error = %e, "coach API returned a malformed response"))
            .ok()?;

        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_string())
    }
}

/// A locally hosted Ollama-style `/api/generate` endpoint.
pub struct LocalLlmCoach {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl LocalLlmCoach {
    pub fn new(endpoint: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            model,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[async_trait::async_trait]
impl CoachStrategy for LocalLlmCoach {
    async fn commentary(&self, prompt: &str) -> Option<String> {
        let url = format!("{}/api/generate", self.endpoint.trim_end_matches('/'));
        let full_prompt = format!("{SYSTEM_PROMPT}\n\n{prompt}");

        let response = self
            .client
            .post(&url)
            .json(&json!({
                "model": self.model,
                "prompt": full_prompt,
                "stream": false,
                "options": { "temperature": 0.7, "num_predict": 150 },
            }))
            .send()
            .await
            .map_err(|e| tracing::warn!(error = %e, "coach local LLM request failed"))
            .ok()?;

        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "coach local LLM returned an error status");
            return None;
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| tracing::warn!(error = %e, "coach local LLM returned a malformed response"))
            .ok()?;

        let trimmed = body.response.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis::{MoveClassification, UserColor};

    fn move_of(classification: MoveClassification) -> MoveAnalysis {
        move_of_color(classification, true)
    }

    fn move_of_color(classification: MoveClassification, is_white: bool) -> MoveAnalysis {
        MoveAnalysis {
            half_move: 10,
            move_number: 6,
            is_white,
            san: "Nf3".to_string(),
            uci: "g1f3".to_string(),
            evaluation_before: 20,
            evaluation_after: -180,
            best_move_uci: "d2d4".to_string(),
            classification,
            centipawn_loss: 200,
            commentary: None,
        }
    }

    struct AlwaysComments;

    #[async_trait::async_trait]
    impl CoachStrategy for AlwaysComments {
        async fn commentary(&self, _prompt: &str) -> Option<String> {
            Some("Consider central control instead.".to_string())
        }
    }

    struct NeverComments;

    #[async_trait::async_trait]
    impl CoachStrategy for NeverComments {
        async fn commentary(&self, _prompt: &str) -> Option<String> {
            None
        }
    }

    #[tokio::test]
    async fn only_significant_mistakes_get_commentary() {
        let mut moves = vec![
            move_of(MoveClassification::Best),
            move_of(MoveClassification::Blunder),
            move_of(MoveClassification::Good),
        ];
        annotate(&AlwaysComments, &mut moves, 40, UserColor::White).await;
        assert!(moves[0].commentary.is_none());
        assert!(moves[1].commentary.is_some());
        assert!(moves[2].commentary.is_none());
    }

    #[tokio::test]
    async fn inaccuracies_never_get_commentary() {
        let mut moves = vec![move_of(MoveClassification::Inaccuracy)];
        annotate(&AlwaysComments, &mut moves, 40, UserColor::White).await;
        assert!(moves[0].commentary.is_none());
    }

    #[tokio::test]
    async fn opponent_blunders_are_never_commented_on() {
        // User plays black; the blunder below is white's (the opponent's).
        let mut moves = vec![
            move_of_color(MoveClassification::Blunder, true),
            move_of_color(MoveClassification::Mistake, false),
        ];
        annotate(&AlwaysComments, &mut moves, 40, UserColor::Black).await;
        assert!(moves[0].commentary.is_none());
        assert!(moves[1].commentary.is_some());
    }

    #[tokio::test]
    async fn caps_at_max_commentaries_per_game() {
        let mut moves: Vec<MoveAnalysis> = (0..8).map(|_| move_of(MoveClassification::Blunder)).collect();
        annotate(&AlwaysComments, &mut moves, 40, UserColor::White).await;
        let commented = moves.iter().filter(|m| m.commentary.is_some()).count();
        assert_eq!(commented, MAX_COMMENTARIES_PER_GAME);
    }

    #[tokio::test]
    async fn failed_strategy_leaves_commentary_none() {
        let mut moves = vec![move_of(MoveClassification::Mistake)];
        annotate(&NeverComments, &mut moves, 40, UserColor::White).await;
        assert!(moves[0].commentary.is_none());
    }
}
