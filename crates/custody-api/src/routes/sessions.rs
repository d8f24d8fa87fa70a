//! # Sessions
//!
//! - `POST /v1/sessions`: log in (unauthenticated)
//! - `DELETE /v1/sessions`: log out the current session

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{delete, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use custody_core::{Email, Role, Timestamp, ValidationError};
use custody_engine::Session;

use crate::auth::SessionToken;
use crate::error::AppError;
use crate::extractors::{extract_domain_json, IntoDomain};
use crate::state::AppState;

/// Login request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    /// Credential reference.
    pub credential: String,
    /// Role to log in as; must match the account's role.
    pub role: String,
}

/// Parsed login input.
pub struct Login {
    email: Email,
    credential: String,
    role: Role,
}

impl IntoDomain for LoginRequest {
    type Output = Login;

    fn into_domain(self) -> Result<Login, ValidationError> {
        Ok(Login {
            email: Email::new(self.email)?,
            credential: self.credential,
            role: self.role.parse()?,
        })
    }
}

/// An issued session.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionResponse {
    /// Bearer token for subsequent requests.
    pub token: String,
    pub email: String,
    /// `admin`, `officer`, `examiner`, or `head-investigator`.
    pub role: String,
    #[schema(value_type = String, format = DateTime)]
    pub issued_at: Timestamp,
    #[schema(value_type = String, format = DateTime)]
    pub expires_at: Timestamp,
}

impl From<Session> for SessionResponse {
    fn from(s: Session) -> Self {
        Self {
            token: s.token().to_string(),
            email: s.email().to_string(),
            role: s.role().to_string(),
            issued_at: s.issued_at(),
            expires_at: s.expires_at(),
        }
    }
}

/// Login route. Mounted outside the auth middleware.
pub fn public_router() -> Router<AppState> {
    Router::new().route("/v1/sessions", post(login))
}

/// Logout route.
pub fn router() -> Router<AppState> {
    Router::new().route("/v1/sessions", delete(logout))
}

/// POST /v1/sessions: Log in.
#[utoipa::path(
    post,
    path = "/v1/sessions",
    request_body = LoginRequest,
    responses(
        (status = 201, description = "Session issued", body = SessionResponse),
        (status = 401, description = "Invalid credentials", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "sessions"
)]
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    let req = extract_domain_json(body)?;
    let session = state.service.login(&req.email, &req.credential, req.role)?;
    Ok((StatusCode::CREATED, Json(session.into())))
}

/// DELETE /v1/sessions: Revoke the caller's session.
#[utoipa::path(
    delete,
    path = "/v1/sessions",
    responses(
        (status = 204, description = "Session revoked"),
        (status = 401, description = "No live session", body = crate::error::ErrorBody),
    ),
    tag = "sessions"
)]
pub async fn logout(
    State(state): State<AppState>,
    token: SessionToken,
) -> Result<StatusCode, AppError> {
    state.service.logout(token.as_str())?;
    Ok(StatusCode::NO_CONTENT)
}
