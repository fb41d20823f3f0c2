//! Authentication is out of scope for this service; this is a minimal
//! pluggable extractor so the dispatcher can be exercised end-to-end
//! without a real auth stack. Production deployments swap `AuthProvider`
//! for a real one.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;

use crate::http::AppState;

#[derive(Debug, Clone, Copy)]
pub struct CurrentUser {
    pub user_id: i64,
}

/// Resolves the authenticated user from a request. The HTTP auth layer
/// itself is out of scope; this trait is the seam a real implementation
/// plugs into.
#[async_trait::async_trait]
pub trait AuthProvider: Send + Sync {
    async fn authenticate(&self, parts: &Parts) -> Option<CurrentUser>;
}

/// Reads `X-User-Id` header, or `?token=<user_id>` for SSE clients that
/// cannot set custom headers. Not a real credential check.
pub struct HeaderAuthProvider;

#[async_trait::async_trait]
impl AuthProvider for HeaderAuthProvider {
    async fn authenticate(&self, parts: &Parts) -> Option<CurrentUser> {
        if let Some(header) = parts.headers.get("X-User-Id") {
            if let Ok(user_id) = header.to_str().unwrap_or_default().parse() {
                return Some(CurrentUser { user_id });
            }
        }
        let query = parts.uri.query().unwrap_or_default();
        for pair in query.split('&') {
            if let Some(value) = pair.strip_prefix("token=") {
                if let Ok(user_id) = value.parse() {
                    return Some(CurrentUser { user_id });
                }
            }
        }
        None
    }
}

#[async_trait::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        state
            .auth
            .authenticate(parts)
            .await
            .ok_or((StatusCode::UNAUTHORIZED, "missing or invalid credentials"))
    }
}
