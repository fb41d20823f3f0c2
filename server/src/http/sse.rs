//! `GET /api/games/events/analysis`: SSE stream of `game_analysis_completed`
//! events, consuming the event bus's per-user channel.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::Response;
use axum::IntoResponse;

use crate::auth::CurrentUser;
use crate::events::channel_for_user;

use super::AppState;

const POLL_TIMEOUT: Duration = Duration::from_secs(15);

pub async fn analysis_events(State(state): State<AppState>, user: CurrentUser) -> Response {
    let channel = channel_for_user(user.user_id);
    let subscription = match state.events.subscribe(&channel).await {
        Ok(sub) => sub,
        Err(e) => {
            tracing::error!(error = %e, "failed to subscribe to event bus");
            return axum::http::StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let stream = async_stream::stream! {
        let mut subscription = subscription;
        loop {
            match subscription.poll(POLL_TIMEOUT).await {
                Some(message) => {
                    yield Ok::<_, Infallible>(Event::default().data(message.payload));
                }
                None => {
                    yield Ok::<_, Infallible>(Event::default().comment("keepalive"));
                }
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default()).into_response()
}
