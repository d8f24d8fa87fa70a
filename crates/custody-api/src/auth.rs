//! # Session Authentication Middleware
//!
//! Bearer-token middleware for every `/v1` route except login.
//!
//! ```text
//! Authorization: Bearer {session_token}
//! ```
//!
//! The middleware only establishes that the token names a live session and
//! hands it to the handler as a [`SessionToken`]. Capability checks happen in
//! the custody service on every call, so a deactivation or logout takes effect
//! on the very next request even if the token passed this layer.

use axum::extract::{Request, State};
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::error::{AppError, ErrorBody, ErrorDetail};
use crate::state::AppState;

/// The caller's session token, injected by [`auth_middleware`].
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    /// The raw token, for passing to the custody service.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionToken([REDACTED])")
    }
}

/// Extracts the token the auth middleware injected into extensions.
/// Returns 401 if none is present (middleware didn't run or failed).
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for SessionToken {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionToken>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("no session in request context".into()))
    }
}

/// Extract the Bearer token from the Authorization header, check that it
/// names a live session, and inject it into request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let token = match auth_header {
        Some(value) => match value.strip_prefix("Bearer ") {
            Some(token) if !token.trim().is_empty() => token.trim().to_string(),
            Some(_) => {
                tracing::warn!("authentication failed: empty bearer token");
                return unauthorized_response("empty bearer token");
            }
            None => {
                tracing::warn!("authentication failed: non-Bearer authorization scheme");
                return unauthorized_response("authorization header must use Bearer scheme");
            }
        },
        None => {
            tracing::warn!("authentication failed: missing authorization header");
            return unauthorized_response("missing authorization header");
        }
    };

    if state.service.gate().session(&token).is_none() {
        tracing::warn!("authentication failed: unknown or expired session");
        return unauthorized_response("invalid or expired session");
    }

    request.extensions_mut().insert(SessionToken(token));
    next.run(request).await
}

fn unauthorized_response(message: &str) -> Response {
    let body = ErrorBody {
        error: ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message: message.to_string(),
            details: None,
        },
    };
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}
