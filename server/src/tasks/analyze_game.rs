use std::sync::Arc;

use chrono::Utc;
use engine::{AnalysisLimit, EngineConfig, EngineDriver};
use serde::Deserialize;

use crate::coach::CoachStrategy;
use crate::coordinator;
use crate::db::Repos;
use crate::domain::AnalysisState;
use crate::events::EventBus;
use crate::queue::Task;

#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    pub depth: u8,
    pub time_ms: u64,
}

#[derive(Debug, Deserialize)]
struct Payload {
    game_id: i64,
}

/// `analyze_game(game_id)` — runs on the default queue.
pub struct AnalyzeGameTask {
    pub repos: Repos,
    pub events: Arc<dyn EventBus>,
    pub engine: EngineSettings,
    pub coach: Option<Arc<dyn CoachStrategy>>,
}

#[async_trait::async_trait]
impl Task for AnalyzeGameTask {
    fn name(&self) -> &'static str {
        super::ANALYZE_GAME
    }

    async fn run(&self, payload: serde_json::Value) -> Result<(), anyhow::Error> {
        let Payload { game_id } = serde_json::from_value(payload)?;
        run_analyze_game(
            &self.repos,
            &self.events,
            self.engine,
            self.coach.as_deref(),
            game_id,
        )
        .await
    }
}

pub async fn run_analyze_game(
    repos: &Repos,
    events: &Arc<dyn EventBus>,
    engine: EngineSettings,
    coach: Option<&dyn CoachStrategy>,
    game_id: i64,
) -> Result<(), anyhow::Error> {
    let Some(game) = repos.games.find(game_id).await? else {
        return Ok(());
    };
    if game.analysis_state == AnalysisState::Analyzed {
        return Ok(());
    }

    repos
        .games
        .set_analysis_state(game_id, AnalysisState::InProgress)
        .await?;

    let limit = AnalysisLimit {
        depth: Some(engine.depth),
        time_ms: Some(engine.time_ms),
    };
    let driver = match EngineDriver::spawn(EngineConfig::default()).await {
        Ok(driver) => driver,
        Err(e) => {
            tracing::error!(game_id, error = %e, "engine failed to start, marking game analyzed-with-zero");
            repos.games.mark_analyzed_zero(game_id, Utc::now()).await?;
            return Ok(());
        }
    };

    let analysis = analysis::analyze_game(
        &game.pgn,
        game.user_color,
        limit,
        driver,
        &analysis::NeverCancel,
    )
    .await;

    let mut analysis = match analysis {
        Ok(a) => a,
        Err(e) => {
            tracing::error!(game_id, error = %e, "analysis failed, marking game analyzed-with-zero");
            repos.games.mark_analyzed_zero(game_id, Utc::now()).await?;
            return Ok(());
        }
    };

    if let Some(strategy) = coach {
        let total_plies = analysis.moves.len();
        crate::coach::annotate(strategy, &mut analysis.moves, total_plies, game.user_color).await;
    }

    let now = Utc::now();
    repos.moves.insert_all(game_id, &analysis.moves).await?;
    repos.games.mark_analyzed(game_id, now, &analysis.stats).await?;

    repos.user_stats.recompute(game.user_id).await?;
    coordinator::recompute_progress(repos, game.user_id).await?;
    events.publish_analysis_completed(game.user_id, game_id).await;

    Ok(())
}
