use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::coordinator;
use crate::domain::{AnalysisState, Job, JobKind, Provider};
use crate::error::DispatchError;
use crate::providers::{DateRange, YearMonth};
use crate::queue::{IMPORTS_QUEUE, DEFAULT_QUEUE};
use crate::tasks;

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub handle: Option<String>,
    pub from_year: Option<i32>,
    pub from_month: Option<u32>,
    pub to_year: Option<i32>,
    pub to_month: Option<u32>,
    #[serde(default)]
    pub import_all: bool,
}

#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub job_id: String,
    pub status: &'static str,
}

fn job_snapshot(job: &Job) -> serde_json::Value {
    json!({
        "job_id": job.id,
        "kind": job.kind.as_str(),
        "status": job.status.as_str(),
        "progress": job.progress,
        "total_games": job.total_games,
        "completed_games": job.completed_games,
        "error_message": job.error_message,
        "created_at": job.created_at,
        "started_at": job.started_at,
        "completed_at": job.completed_at,
    })
}

async fn dispatch_import(
    state: &AppState,
    user_id: i64,
    provider: Provider,
    request: ImportRequest,
) -> Result<Json<JobResponse>, DispatchError> {
    if let Some(existing) = state.repos.jobs.find_active(user_id, JobKind::Import).await? {
        return Err(DispatchError::Conflict {
            existing_job_id: existing.id,
        });
    }

    let handle = match request.handle {
        Some(h) if !h.trim().is_empty() => h,
        _ => {
            let user = state
                .repos
                .users
                .find(user_id)
                .await?
                .ok_or(DispatchError::NotFound)?;
            user.handle_for(provider)
                .map(str::to_string)
                .ok_or_else(|| DispatchError::Validation("no provider handle on file".into()))?
        }
    };

    let job_id = Uuid::new_v4().to_string();
    state.repos.jobs.create(user_id, JobKind::Import, &job_id).await?;

    let range = if request.import_all {
        DateRange { from: None, to: None }
    } else {
        DateRange {
            from: request
                .from_year
                .map(|year| YearMonth { year, month: request.from_month.unwrap_or(1) }),
            to: request
                .to_year
                .map(|year| YearMonth { year, month: request.to_month.unwrap_or(12) }),
        }
    };

    state
        .queue
        .enqueue(
            IMPORTS_QUEUE,
            tasks::IMPORT_GAMES,
            &json!({
                "user_id": user_id,
                "handle": handle,
                "job_id": job_id,
                "provider": provider.as_str(),
                "from": range.from.map(|ym| json!({ "year": ym.year, "month": ym.month })),
                "to": range.to.map(|ym| json!({ "year": ym.year, "month": ym.month })),
            }),
        )
        .await
        .map_err(|e| DispatchError::Internal(anyhow::anyhow!(e.to_string())))?;

    Ok(Json(JobResponse {
        job_id,
        status: "pending",
    }))
}

pub async fn import_chess_com(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<ImportRequest>,
) -> Result<(StatusCode, Json<JobResponse>), DispatchError> {
    let response = dispatch_import(&state, user.user_id, Provider::ChessCom, request).await?;
    Ok((StatusCode::ACCEPTED, response))
}

pub async fn import_lichess(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<ImportRequest>,
) -> Result<(StatusCode, Json<JobResponse>), DispatchError> {
    let response = dispatch_import(&state, user.user_id, Provider::Lichess, request).await?;
    Ok((StatusCode::ACCEPTED, response))
}

pub async fn import_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<serde_json::Value>, DispatchError> {
    let job = state
        .repos
        .jobs
        .find(&job_id)
        .await?
        .ok_or(DispatchError::NotFound)?;
    Ok(Json(job_snapshot(&job)))
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeQuery {
    #[serde(default)]
    pub force: bool,
}

pub async fn analyze_game(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Query(query): Query<AnalyzeQuery>,
) -> Result<(StatusCode, Json<JobResponse>), DispatchError> {
    let game = state
        .repos
        .games
        .find(id)
        .await?
        .filter(|g| g.user_id == user.user_id)
        .ok_or(DispatchError::NotFound)?;

    if game.analysis_state == AnalysisState::Analyzed && !query.force {
        return Ok((
            StatusCode::OK,
            Json(JobResponse {
                job_id: String::new(),
                status: "already_analyzed",
            }),
        ));
    }

    if let Some(existing) = state
        .repos
        .jobs
        .find_active(user.user_id, JobKind::Analysis)
        .await?
    {
        return Err(DispatchError::Conflict {
            existing_job_id: existing.id,
        });
    }

    if game.analysis_state == AnalysisState::Analyzed && query.force {
        state.repos.games.delete_moves(id).await?;
    }
    state
        .repos
        .games
        .set_analysis_state(id, AnalysisState::InProgress)
        .await?;

    let job_id = Uuid::new_v4().to_string();
    state.repos.jobs.create(user.user_id, JobKind::Analysis, &job_id).await?;
    state.repos.jobs.mark_processing(&job_id, Utc::now()).await?;
    state
        .repos
        .jobs
        .set_progress(&job_id, 0, Some(1), Some(0))
        .await?;

    state
        .queue
        .enqueue(DEFAULT_QUEUE, tasks::ANALYZE_GAME, &json!({ "game_id": id }))
        .await
        .map_err(|e| DispatchError::Internal(anyhow::anyhow!(e.to_string())))?;

    Ok((
        StatusCode::ACCEPTED,
        Json(JobResponse {
            job_id,
            status: "pending",
        }),
    ))
}

pub async fn analyze_all(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<(StatusCode, Json<JobResponse>), DispatchError> {
    if let Some(existing) = state
        .repos
        .jobs
        .find_active(user.user_id, JobKind::Analysis)
        .await?
    {
        return Err(DispatchError::Conflict {
            existing_job_id: existing.id,
        });
    }

    let job_id = Uuid::new_v4().to_string();
    state.repos.jobs.create(user.user_id, JobKind::Analysis, &job_id).await?;

    state
        .queue
        .enqueue(
            DEFAULT_QUEUE,
            tasks::BATCH_ANALYZE,
            &json!({ "user_id": user.user_id, "job_id": job_id }),
        )
        .await
        .map_err(|e| DispatchError::Internal(anyhow::anyhow!(e.to_string())))?;

    Ok((
        StatusCode::ACCEPTED,
        Json(JobResponse {
            job_id,
            status: "pending",
        }),
    ))
}

pub async fn cancel_analysis(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<serde_json::Value>, DispatchError> {
    let Some(job) = state
        .repos
        .jobs
        .find_active(user.user_id, JobKind::Analysis)
        .await?
    else {
        return Err(DispatchError::NotFound);
    };
    coordinator::cancel_job(&state.repos, &job.id, user.user_id).await?;
    Ok(Json(json!({ "job_id": job.id, "status": "cancelled" })))
}

pub async fn cancel_analysis_job(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(job_id): Path<String>,
) -> Result<Json<serde_json::Value>, DispatchError> {
    let job = state
        .repos
        .jobs
        .find(&job_id)
        .await?
        .filter(|j| j.user_id == user.user_id && !j.status.is_terminal())
        .ok_or(DispatchError::NotFound)?;
    coordinator::cancel_job(&state.repos, &job.id, user.user_id).await?;
    Ok(Json(json!({ "job_id": job.id, "status": "cancelled" })))
}
