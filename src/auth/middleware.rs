//! Session middleware for axum.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{
        header::{AUTHORIZATION, COOKIE},
        HeaderMap, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::auth::SESSION_COOKIE;
use crate::domain::User;
use crate::AppState;

/// Error response for session failures.
///
/// Always 403: an anonymous client is refused, not challenged.
#[derive(Debug, Serialize)]
pub struct AuthError {
    pub error: String,
    pub code: String,
}

impl AuthError {
    fn new(error: &str, code: &str) -> Self {
        Self {
            error: error.to_string(),
            code: code.to_string(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (StatusCode::FORBIDDEN, Json(self)).into_response()
    }
}

/// Logged-in user, placed in request extensions by [`require_session`].
#[derive(Debug, Clone)]
pub struct SessionUser(pub User);

/// Extract the session token from the request.
///
/// Looks for the session cookie first, then `Authorization: Bearer <token>`.
pub fn session_token(headers: &HeaderMap) -> Option<&str> {
    let from_cookie = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value);

    from_cookie.or_else(|| {
        headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
    })
}

/// Require a valid session whose user still exists.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let token = session_token(request.headers())
        .ok_or_else(|| AuthError::new("Authentication required", "UNAUTHENTICATED"))?;

    let claims = state.sessions.validate_token(token).map_err(|e| {
        tracing::debug!(error = %e, "Session rejected");
        AuthError::new("Invalid or expired session", "INVALID_SESSION")
    })?;

    let user = state.repository.get_user(claims.sub).await.map_err(|e| {
        tracing::warn!(user_id = %claims.sub, error = %e, "Session for unknown user");
        AuthError::new("Invalid or expired session", "INVALID_SESSION")
    })?;

    request.extensions_mut().insert(SessionUser(user));

    Ok(next.run(request).await)
}

/// Require the session user to be a superuser. Layer inside [`require_session`].
pub async fn require_superuser(request: Request<Body>, next: Next) -> Result<Response, AuthError> {
    let user = request
        .extensions()
        .get::<SessionUser>()
        .ok_or_else(|| AuthError::new("Authentication required", "UNAUTHENTICATED"))?;

    if !user.0.is_superuser {
        tracing::warn!(username = %user.0.username, "Non-superuser refused admin access");
        return Err(AuthError::new("Insufficient permissions", "FORBIDDEN"));
    }

    Ok(next.run(request).await)
}
