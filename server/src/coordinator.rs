//! The job coordinator: recomputes batch-analysis progress from persistent
//! state after every `analyze_game` success, and performs the cancel
//! endpoint's compensating reset. Never increments a counter — always
//! recomputes it — so out-of-order and concurrent completions can never
//! over- or under-count.

use chrono::Utc;

use crate::db::Repos;
use crate::error::PersistenceError;

/// Recompute progress for every non-terminal analysis job of `user_id`.
/// Called after each `analyze_game` success.
pub async fn recompute_progress(repos: &Repos, user_id: i64) -> Result<(), PersistenceError> {
    let jobs = repos.jobs.active_analysis_jobs(user_id).await?;
    for job in jobs {
        let Some(started_at) = job.started_at else {
            continue;
        };
        let count = repos.games.count_analyzed_since(user_id, started_at).await?;
        let analyzed_games = count.min(job.total_games as i64) as i32;
        let progress = if job.total_games > 0 {
            (analyzed_games as i64 * 100 / job.total_games as i64) as i32
        } else {
            0
        };

        repos
            .jobs
            .set_progress(&job.id, progress, None, Some(analyzed_games))
            .await?;

        if analyzed_games >= job.total_games {
            repos.jobs.mark_completed(&job.id, Utc::now()).await?;
        }
    }
    Ok(())
}

/// Cancel endpoint compensating action: set the job cancelled and atomically
/// reset every `in_progress` game of the user back to `unanalyzed`.
pub async fn cancel_job(repos: &Repos, job_id: &str, user_id: i64) -> Result<(), PersistenceError> {
    repos.jobs.mark_cancelled(job_id, Utc::now()).await?;
    repos.games.reset_in_progress(user_id).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, Repos};
    use crate::domain::{GameResultKind, JobKind, Provider};
    use sqlx::SqlitePool;

    async fn repos_with_pool() -> (Repos, SqlitePool) {
        let db = Database::new_in_memory().await.unwrap();
        let pool = db.pool().clone();
        (Repos::new(pool.clone()), pool)
    }

    async fn seed_user(pool: &SqlitePool) -> i64 {
        sqlx::query("INSERT INTO users (id, username, email, password_hash) VALUES (1, 'u', 'u@x.com', 'h')")
            .execute(pool)
            .await
            .unwrap();
        1
    }

    #[tokio::test]
    async fn progress_recomputed_from_analyzed_count() {
        let (repos, pool) = repos_with_pool().await;
        let user_id = seed_user(&pool).await;

        let job_id = "job-1";
        repos.jobs.create(user_id, JobKind::Analysis, job_id).await.unwrap();
        repos.jobs.mark_processing(job_id, Utc::now()).await.unwrap();
        repos
            .jobs
            .set_progress(job_id, 0, Some(2), Some(0))
            .await
            .unwrap();

        let game_id = repos
            .games
            .insert(
                user_id,
                &crate::db::NewGame {
                    provider: Provider::ChessCom,
                    provider_id: Some("1".into()),
                    provider_url: None,
                    pgn: "1. e4 e5".into(),
                    white_name: "a".into(),
                    white_rating: None,
                    black_name: "b".into(),
                    black_rating: None,
                    user_color: analysis::UserColor::White,
                    result: GameResultKind::Win,
                    termination: None,
                    time_class: None,
                    opening_eco: None,
                    opening_name: None,
                    played_at: None,
                    user_rating: None,
                },
            )
            .await
            .unwrap();

        repos.games.mark_analyzed_zero(game_id, Utc::now()).await.unwrap();
        recompute_progress(&repos, user_id).await.unwrap();

        let job = repos.jobs.find(job_id).await.unwrap().unwrap();
        assert_eq!(job.completed_games, 1);
        assert_eq!(job.progress, 50);
        assert!(!job.status.is_terminal());
    }

    #[tokio::test]
    async fn cancel_resets_in_progress_games() {
        let (repos, pool) = repos_with_pool().await;
        let user_id = seed_user(&pool).await;
        let job_id = "job-2";
        repos.jobs.create(user_id, JobKind::Analysis, job_id).await.unwrap();

        let game_id = repos
            .games
            .insert(
                user_id,
                &crate::db::NewGame {
                    provider: Provider::ChessCom,
                    provider_id: Some("2".into()),
                    provider_url: None,
                    pgn: "1. e4 e5".into(),
                    white_name: "a".into(),
                    white_rating: None,
                    black_name: "b".into(),
                    black_rating: None,
                    user_color: analysis::UserColor::White,
                    result: GameResultKind::Win,
                    termination: None,
                    time_class: None,
                    opening_eco: None,
                    opening_name: None,
                    played_at: None,
                    user_rating: None,
                },
            )
            .await
            .unwrap();
        repos
            .games
            .set_analysis_state(game_id, crate::domain::AnalysisState::InProgress)
            .await
            .unwrap();

        cancel_job(&repos, job_id, user_id).await.unwrap();

        let job = repos.jobs.find(job_id).await.unwrap().unwrap();
        assert!(job.status.is_terminal());
        let game = repos.games.find(game_id).await.unwrap().unwrap();
        assert_eq!(game.analysis_state, crate::domain::AnalysisState::Unanalyzed);
    }

    async fn new_game(repos: &Repos, user_id: i64, provider_id: &str) -> i64 {
        repos
            .games
            .insert(
                user_id,
                &crate::db::NewGame {
                    provider: Provider::ChessCom,
                    provider_id: Some(provider_id.into()),
                    provider_url: None,
                    pgn: "1. e4 e5".into(),
                    white_name: "a".into(),
                    white_rating: None,
                    black_name: "b".into(),
                    black_rating: None,
                    user_color: analysis::UserColor::White,
                    result: GameResultKind::Win,
                    termination: None,
                    time_class: None,
                    opening_eco: None,
                    opening_name: None,
                    played_at: None,
                    user_rating: None,
                },
            )
            .await
            .unwrap()
    }

    /// S6 — out-of-order completion still produces monotone progress.
    /// Completions arriving as {g4, g1, g3, g2} must yield progress
    /// {25, 50, 75, 100}, because progress is recomputed from the
    /// persisted analyzed-count, not incremented per completion.
    #[tokio::test]
    async fn out_of_order_completions_produce_monotone_progress() {
        let (repos, pool) = repos_with_pool().await;
        let user_id = seed_user(&pool).await;

        let job_id = "job-s6";
        repos.jobs.create(user_id, JobKind::Analysis, job_id).await.unwrap();
        let started_at = Utc::now();
        repos.jobs.mark_processing(job_id, started_at).await.unwrap();
        repos.jobs.set_progress(job_id, 0, Some(4), Some(0)).await.unwrap();

        let g1 = new_game(&repos, user_id, "1").await;
        let g2 = new_game(&repos, user_id, "2").await;
        let g3 = new_game(&repos, user_id, "3").await;
        let g4 = new_game(&repos, user_id, "4").await;

        let mut observed_progress = Vec::new();
        for game_id in [g4, g1, g3, g2] {
            repos.games.mark_analyzed_zero(game_id, Utc::now()).await.unwrap();
            recompute_progress(&repos, user_id).await.unwrap();
            let job = repos.jobs.find(job_id).await.unwrap().unwrap();
            observed_progress.push(job.progress);
        }

        assert_eq!(observed_progress, vec![25, 50, 75, 100]);
        let windows_non_decreasing = observed_progress.windows(2).all(|w| w[1] >= w[0]);
        assert!(windows_non_decreasing);

        let job = repos.jobs.find(job_id).await.unwrap().unwrap();
        assert!(job.status.is_terminal());
        assert_eq!(job.completed_games, 4);
    }
}
