//! Dispatcher idempotency: a user can never have two non-terminal jobs of
//! the same kind in flight. Covers the 409 path in the import dispatcher
//! directly against the handler, without going through a router.

mod common;

use axum::extract::{Json, State};
use axum::http::StatusCode;
use chess_analysis_server::auth::CurrentUser;
use chess_analysis_server::error::DispatchError;
use chess_analysis_server::http::handlers::{import_chess_com, ImportRequest};

use common::{new_state, seed_user};

fn import_request() -> ImportRequest {
    ImportRequest {
        handle: Some("alice".to_string()),
        from_year: None,
        from_month: None,
        to_year: None,
        to_month: None,
        import_all: true,
    }
}

/// Dispatching a second import for the same user while the first is still
/// pending yields exactly one job_id and one 409, never two accepted jobs.
#[tokio::test]
async fn second_import_dispatch_conflicts_with_the_first() {
    let (state, pool) = new_state().await;
    seed_user(&pool, 1).await;
    let user = CurrentUser { user_id: 1 };

    let (status, Json(first)) = import_chess_com(State(state.clone()), user, Json(import_request()))
        .await
        .expect("first dispatch should succeed");
    assert_eq!(status, StatusCode::ACCEPTED);
    assert!(!first.job_id.is_empty());

    let second = import_chess_com(State(state.clone()), user, Json(import_request())).await;
    match second {
        Err(DispatchError::Conflict { existing_job_id }) => {
            assert_eq!(existing_job_id, first.job_id, "409 must reference the in-flight job")
        }
        Err(other) => panic!("expected a Conflict, got a different error: {other}"),
        Ok(_) => panic!("second concurrent dispatch must not also succeed"),
    }
}
