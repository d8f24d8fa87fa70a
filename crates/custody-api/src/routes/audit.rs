//! # Audit Log
//!
//! - `GET /v1/audit?complaint_no=`: entries oldest first, for one complaint
//!   or all of them

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use custody_core::{ComplaintNo, Timestamp};
use custody_engine::AuditEntry;

use crate::auth::SessionToken;
use crate::error::AppError;
use crate::extractors::extract_query;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AuditQueryParams {
    /// Restrict to one complaint. Unknown numbers yield an empty list.
    pub complaint_no: Option<String>,
}

/// One audit entry.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuditEntryResponse {
    /// Global position, gap-free from 1.
    pub sequence: u64,
    pub complaint_no: String,
    pub actor_email: String,
    pub actor_role: String,
    /// `created`, `inference added`, or `report generated`.
    pub action: String,
    pub from_state: Option<String>,
    pub to_state: String,
    #[schema(value_type = String, format = DateTime)]
    pub timestamp: Timestamp,
}

impl From<AuditEntry> for AuditEntryResponse {
    fn from(e: AuditEntry) -> Self {
        Self {
            sequence: e.sequence,
            complaint_no: e.complaint_no.to_string(),
            actor_email: e.actor_email.to_string(),
            actor_role: e.actor_role.to_string(),
            action: e.action,
            from_state: e.from_state.map(|s| s.to_string()),
            to_state: e.to_state.to_string(),
            timestamp: e.timestamp,
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/audit", get(query_audit))
}

/// GET /v1/audit: Query the audit log.
#[utoipa::path(
    get,
    path = "/v1/audit",
    params(AuditQueryParams),
    responses(
        (status = 200, description = "Audit entries, oldest first", body = Vec<AuditEntryResponse>),
        (status = 401, description = "No live session", body = crate::error::ErrorBody),
    ),
    tag = "audit"
)]
pub async fn query_audit(
    State(state): State<AppState>,
    token: SessionToken,
    query: Result<Query<AuditQueryParams>, QueryRejection>,
) -> Result<Json<Vec<AuditEntryResponse>>, AppError> {
    let params = extract_query(query)?;
    let complaint_no = params
        .complaint_no
        .filter(|n| !n.trim().is_empty())
        .map(ComplaintNo::new)
        .transpose()?;
    let entries = state
        .service
        .query_audit(token.as_str(), complaint_no.as_ref())?
        .map(AuditEntryResponse::from)
        .collect();
    Ok(Json(entries))
}
