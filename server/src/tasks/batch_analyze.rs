use chrono::Utc;
use serde::Deserialize;

use crate::db::Repos;
use crate::domain::AnalysisState;
use crate::queue::{DbTaskQueue, Task, DEFAULT_QUEUE};

#[derive(Debug, Deserialize)]
struct Payload {
    user_id: i64,
    job_id: String,
}

/// `batch_analyze(user_id, job_id)` — runs on the default queue.
/// Fans out one `analyze_game` task per unanalyzed game; terminal
/// resolution is driven entirely by the job coordinator as each fanned-out
/// task completes.
pub struct BatchAnalyzeTask {
    pub repos: Repos,
    pub queue: DbTaskQueue,
}

#[async_trait::async_trait]
impl Task for BatchAnalyzeTask {
    fn name(&self) -> &'static str {
        super::BATCH_ANALYZE
    }

    async fn run(&self, payload: serde_json::Value) -> Result<(), anyhow::Error> {
        let Payload { user_id, job_id } = serde_json::from_value(payload)?;
        run_batch_analyze(&self.repos, &self.queue, user_id, &job_id).await
    }
}

pub async fn run_batch_analyze(
    repos: &Repos,
    queue: &DbTaskQueue,
    user_id: i64,
    job_id: &str,
) -> Result<(), anyhow::Error> {
    let now = Utc::now();
    repos.jobs.mark_processing(job_id, now).await?;

    let games = repos.games.games_needing_analysis(user_id).await?;
    repos
        .jobs
        .set_progress(job_id, 0, Some(games.len() as i32), Some(0))
        .await?;

    if games.is_empty() {
        repos.jobs.mark_completed(job_id, Utc::now()).await?;
        return Ok(());
    }

    for game in &games {
        repos
            .games
            .set_analysis_state(game.id, AnalysisState::InProgress)
            .await?;
        queue
            .enqueue(
                DEFAULT_QUEUE,
                super::ANALYZE_GAME,
                &serde_json::json!({ "game_id": game.id }),
            )
            .await?;
    }

    Ok(())
}
