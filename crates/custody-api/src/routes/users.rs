//! # User Administration
//!
//! - `POST /v1/users`: create an operator account (Admin)
//! - `PUT /v1/users/{email}/status`: activate or deactivate (Admin)

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use custody_core::{Action, Email, Timestamp, ValidationError};
use custody_engine::{Credential, NewUser, User};

use crate::auth::SessionToken;
use crate::error::AppError;
use crate::extractors::{extract_domain_json, extract_json, IntoDomain};
use crate::state::AppState;

fn default_active() -> bool {
    true
}

/// Request to create an operator account.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub email: String,
    /// `admin`, `officer`, `examiner`, or `head-investigator`.
    pub role: String,
    /// Credential reference the user will log in with.
    pub credential: String,
    /// Defaults to `true`.
    #[serde(default = "default_active")]
    pub active: bool,
}

impl IntoDomain for CreateUserRequest {
    type Output = NewUser;

    fn into_domain(self) -> Result<NewUser, ValidationError> {
        Ok(NewUser {
            email: Email::new(self.email)?,
            role: self.role.parse()?,
            credential: Credential::new(self.credential)?,
            active: self.active,
        })
    }
}

/// Request to change an account's status.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SetUserStatusRequest {
    pub active: bool,
}

/// An operator account. Never includes the credential.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub email: String,
    pub role: String,
    pub active: bool,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: Timestamp,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            email: u.email.to_string(),
            role: u.role.to_string(),
            active: u.active,
            created_at: u.created_at,
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/users", post(create_user))
        .route("/v1/users/{email}/status", put(set_user_status))
}

/// POST /v1/users: Create an operator account.
#[utoipa::path(
    post,
    path = "/v1/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 403, description = "Caller is not an Admin", body = crate::error::ErrorBody),
        (status = 409, description = "Email already registered", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    token: SessionToken,
    body: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    // Capability before body validation.
    state
        .service
        .gate()
        .require(token.as_str(), Action::CreateUser)?;
    let new = extract_domain_json(body)?;
    let user = state.service.create_user(token.as_str(), new)?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// PUT /v1/users/{email}/status: Activate or deactivate an account.
#[utoipa::path(
    put,
    path = "/v1/users/{email}/status",
    params(("email" = String, Path, description = "Account email")),
    request_body = SetUserStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = UserResponse),
        (status = 403, description = "Caller is not an Admin", body = crate::error::ErrorBody),
        (status = 404, description = "No such user", body = crate::error::ErrorBody),
    ),
    tag = "users"
)]
pub async fn set_user_status(
    State(state): State<AppState>,
    token: SessionToken,
    Path(email): Path<String>,
    body: Result<Json<SetUserStatusRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, AppError> {
    state
        .service
        .gate()
        .require(token.as_str(), Action::SetUserStatus)?;
    let req = extract_json(body)?;
    let email = Email::new(email)?;
    let user = state
        .service
        .set_user_status(token.as_str(), &email, req.active)?;
    Ok(Json(user.into()))
}
