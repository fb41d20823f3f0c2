//! Single-position analysis on top of [`StockfishEngine`], implementing the
//! engine driver's public contract: `analyse(fen, limit, k) -> [Line]`,
//! `close()`.

use crate::stockfish::{EngineConfig, StockfishEngine};
use crate::{EngineCommand, EngineEvent, GoParams, Score};
use cozy_chess::Move;
use std::time::Duration;

/// Fraction of `limit.time_ms` allowed past the nominal budget before a
/// request is considered timed out.
const TIME_SLACK: f64 = 0.5;
const DEFAULT_GO_TIMEOUT_MS: u64 = 5_000;

/// Search limit: `depth` and `time_ms` are conjunctive — the engine stops at
/// whichever bound is hit first.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalysisLimit {
    pub depth: Option<u8>,
    pub time_ms: Option<u64>,
}

/// One principal variation returned by `analyse`.
#[derive(Debug, Clone)]
pub struct Line {
    pub pv: Vec<Move>,
    pub score: Score,
}

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("engine failure: {0}")]
    EngineFailure(String),
    #[error("engine timeout: no line produced within {0}ms")]
    EngineTimeout(u64),
}

/// Owns a single engine subprocess for the duration of one game's analysis.
pub struct EngineDriver {
    engine: StockfishEngine,
}

impl EngineDriver {
    pub async fn spawn(config: EngineConfig) -> Result<Self, AnalysisError> {
        let engine = StockfishEngine::spawn_with_config(config)
            .await
            .map_err(AnalysisError::EngineFailure)?;
        Ok(Self { engine })
    }

    /// Analyse `fen` under `limit`, returning up to `k` lines ordered best
    /// first. Only the engine's single principal variation is tracked
    /// (Stockfish's default `MultiPV` of 1), so `k` beyond 1 yields no
    /// additional lines — callers that need true multi-PV must configure
    /// the engine's `MultiPV` option before calling.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn analyse(
        &mut self,
        fen: &str,
        limit: AnalysisLimit,
        k: usize,
    ) -> Result<Vec<Line>, AnalysisError> {
        self.engine
            .send_command(EngineCommand::SetPosition {
                fen: fen.to_string(),
                moves: Vec::new(),
            })
            .await
            .map_err(AnalysisError::EngineFailure)?;

        self.engine
            .send_command(EngineCommand::Go(GoParams {
                movetime: limit.time_ms,
                depth: limit.depth,
                infinite: false,
            }))
            .await
            .map_err(AnalysisError::EngineFailure)?;

        let budget_ms = limit.time_ms.unwrap_or(DEFAULT_GO_TIMEOUT_MS);
        let timeout = Duration::from_millis((budget_ms as f64 * (1.0 + TIME_SLACK)) as u64);

        let mut best_pv: Vec<Move> = Vec::new();
        let mut best_score: Option<Score> = None;

        let wait = tokio::time::timeout(timeout, async {
            loop {
                match self.engine.recv_event().await {
                    Some(EngineEvent::Info(info)) => {
                        if let Some(score) = info.score {
                            best_score = Some(score);
                            if !info.pv.is_empty() {
                                best_pv = info.pv;
                            }
                        }
                    }
                    Some(EngineEvent::BestMove(mv)) => {
                        if best_pv.is_empty() {
                            best_pv = vec![mv];
                        }
                        return Ok(());
                    }
                    Some(EngineEvent::Error(msg)) => return Err(msg),
                    Some(_) => continue,
                    None => return Err("engine event stream closed".to_string()),
                }
            }
        })
        .await;

        match wait {
            Ok(Ok(())) => {}
            Ok(Err(msg)) => return Err(AnalysisError::EngineFailure(msg)),
            Err(_) => return Err(AnalysisError::EngineTimeout(budget_ms)),
        }

        let Some(score) = best_score else {
            return Err(AnalysisError::EngineFailure(
                "engine produced no score".to_string(),
            ));
        };

        let line = Line {
            pv: best_pv,
            score,
        };
        Ok(vec![line].into_iter().take(k.max(1)).collect())
    }

    /// Scoped acquisition: after `close`, the subprocess is guaranteed reaped.
    pub async fn close(self) {
        self.engine.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_defaults_to_no_bound() {
        let limit = AnalysisLimit::default();
        assert!(limit.depth.is_none());
        assert!(limit.time_ms.is_none());
    }
}
