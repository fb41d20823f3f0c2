//! The dispatcher's HTTP boundary: axum handlers, wrapped in a
//! `tower-http` tracing layer, over a shared [`AppState`].

pub mod handlers;
pub mod sse;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::AuthProvider;
use crate::db::Repos;
use crate::events::EventBus;
use crate::queue::DbTaskQueue;
use crate::tasks::import_games::ProviderRegistry;

#[derive(Clone, Copy)]
pub struct EngineSettings {
    pub depth: u8,
    pub time_ms: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub repos: Repos,
    pub events: Arc<dyn EventBus>,
    pub queue: DbTaskQueue,
    pub providers: ProviderRegistry,
    pub auth: Arc<dyn AuthProvider>,
    pub engine: EngineSettings,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/games/import", post(handlers::import_chess_com))
        .route("/api/games/import/lichess", post(handlers::import_lichess))
        .route("/api/games/import/status/:job_id", get(handlers::import_status))
        .route("/api/games/:id/analyze", post(handlers::analyze_game))
        .route("/api/games/analyze/all", post(handlers::analyze_all))
        .route("/api/games/analyze/cancel", post(handlers::cancel_analysis))
        .route("/api/games/analyze/cancel/:job_id", post(handlers::cancel_analysis_job))
        .route("/api/games/events/analysis", get(sse::analysis_events))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
