//! Re-running an import against the same provider history must not
//! duplicate games. Covers the `existing_provider_ids` dedup path in the
//! import task directly, bypassing the queue's JSON payload wrapper.

mod common;

use std::sync::Arc;

use chess_analysis_server::domain::{JobKind, Provider};
use chess_analysis_server::providers::{DateRange, ProviderAdapter};
use chess_analysis_server::tasks::import_games::{run_import, ProviderRegistry};

use common::{new_state, sample_games, seed_user, FixedAdapter};

#[tokio::test]
async fn reimport_inserts_nothing_new() {
    let (mut state, pool) = new_state().await;
    seed_user(&pool, 1).await;

    let games = sample_games(3);
    let adapter: Arc<dyn ProviderAdapter> = Arc::new(FixedAdapter {
        provider: Provider::ChessCom,
        games,
    });
    state.providers = ProviderRegistry::with(adapter.clone(), adapter.clone());

    state.repos.jobs.create(1, JobKind::Import, "job-1").await.unwrap();
    run_import(
        &state.repos,
        &state.providers,
        1,
        "alice",
        "job-1",
        Provider::ChessCom,
        DateRange { from: None, to: None },
    )
    .await
    .unwrap();

    let job1 = state.repos.jobs.find("job-1").await.unwrap().unwrap();
    assert!(job1.status.is_terminal());
    assert_eq!(job1.completed_games, 3, "first import inserts all three games");

    let (count_after_first,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM games WHERE user_id = ?")
        .bind(1i64)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count_after_first, 3);

    state.repos.jobs.create(1, JobKind::Import, "job-2").await.unwrap();
    run_import(
        &state.repos,
        &state.providers,
        1,
        "alice",
        "job-2",
        Provider::ChessCom,
        DateRange { from: None, to: None },
    )
    .await
    .unwrap();

    let job2 = state.repos.jobs.find("job-2").await.unwrap().unwrap();
    assert!(job2.status.is_terminal());
    assert_eq!(job2.completed_games, 0, "re-import must yield new_games == 0");

    let (count_after_second,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM games WHERE user_id = ?")
        .bind(1i64)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count_after_second, 3, "no duplicate rows after re-import");
}
