//! Forcing re-analysis of an already-analyzed game must replace its move
//! history rather than append to it, and must strictly advance
//! `analyzed_at`.

mod common;

use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use chrono::{Duration, Utc};

use chess_analysis_server::auth::CurrentUser;
use chess_analysis_server::db::NewGame;
use chess_analysis_server::domain::{AnalysisState, GameResultKind, Provider};
use chess_analysis_server::http::handlers::{analyze_game, AnalyzeQuery};

use common::{new_state, seed_user};

fn sample_moves(n: u32) -> Vec<analysis::MoveAnalysis> {
    (0..n)
        .map(|i| analysis::MoveAnalysis {
            half_move: i,
            move_number: i / 2 + 1,
            is_white: i % 2 == 0,
            san: "e4".to_string(),
            uci: "e2e4".to_string(),
            evaluation_before: 20,
            evaluation_after: 15,
            best_move_uci: "e2e4".to_string(),
            classification: analysis::MoveClassification::Best,
            centipawn_loss: 5,
            commentary: None,
        })
        .collect()
}

fn stats(num_moves: u32) -> analysis::Stats {
    analysis::Stats {
        num_moves,
        average_centipawn_loss: 10.0,
        accuracy: 90.0,
        num_blunders: 0,
        num_mistakes: 0,
        num_inaccuracies: 0,
    }
}

#[tokio::test]
async fn force_reanalyze_replaces_moves_and_advances_timestamp() {
    let (state, pool) = new_state().await;
    seed_user(&pool, 1).await;

    let game_id = state
        .repos
        .games
        .insert(
            1,
            &NewGame {
                provider: Provider::ChessCom,
                provider_id: Some("g1".to_string()),
                provider_url: None,
                pgn: "1. e4 e5".to_string(),
                white_name: "alice".to_string(),
                white_rating: Some(1500),
                black_name: "bob".to_string(),
                black_rating: Some(1480),
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

    state.repos.moves.insert_all(game_id, &sample_moves(4)).await.unwrap();
    let t0 = Utc::now();
    state.repos.games.mark_analyzed(game_id, t0, &stats(4)).await.unwrap();

    let user = CurrentUser { user_id: 1 };
    let (status, Json(response)) = analyze_game(
        State(state.clone()),
        user,
        Path(game_id),
        Query(AnalyzeQuery { force: true }),
    )
    .await
    .expect("forced re-analysis dispatch should succeed");
    assert_eq!(status, StatusCode::ACCEPTED);
    assert!(!response.job_id.is_empty());

    // The dispatcher's force path deletes the old moves and flips the game
    // back to in_progress before any worker runs.
    assert!(state.repos.moves.for_game(game_id).await.unwrap().is_empty());
    let mid_flight = state.repos.games.find(game_id).await.unwrap().unwrap();
    assert_eq!(mid_flight.analysis_state, AnalysisState::InProgress);

    // Simulate the worker completing the re-analysis with a fresh move set.
    state.repos.moves.insert_all(game_id, &sample_moves(6)).await.unwrap();
    let t1 = t0 + Duration::seconds(1);
    state.repos.games.mark_analyzed(game_id, t1, &stats(6)).await.unwrap();

    let game = state.repos.games.find(game_id).await.unwrap().unwrap();
    assert_eq!(game.analysis_state, AnalysisState::Analyzed);
    let analyzed_at = game.analyzed_at.expect("re-analyzed game must carry an analyzed_at");
    assert!(analyzed_at > t0, "analyzed_at must be strictly newer than before the re-analysis");
    assert_eq!(analyzed_at, t1);

    let moves = state.repos.moves.for_game(game_id).await.unwrap();
    assert_eq!(moves.len(), 6, "exactly one set of Move rows survives a forced re-analysis");
}
