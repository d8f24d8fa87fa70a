//! # Reports
//!
//! - `POST /v1/complaints/{complaint_no}/report`: finalize an examined
//!   complaint and compile its report (Examiner, HeadInvestigator)
//! - `GET /v1/complaints/{complaint_no}/report`: the archived report

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use custody_core::{Action, ComplaintNo, Timestamp};
use custody_engine::Report;

use crate::auth::SessionToken;
use crate::error::AppError;
use crate::extractors::optional_json;
use crate::routes::complaints::{claimed_actor, ComplaintResponse};
use crate::state::AppState;

/// Optional body of a report request.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct GenerateReportRequest {
    /// If present, must equal the session's email.
    #[serde(default)]
    pub actor_email: Option<String>,
}

/// A compiled report.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReportResponse {
    /// `REP-{YYYYMMDDHHMMSS}-{complaint_no}`.
    pub report_id: String,
    pub complaint_no: String,
    #[schema(value_type = String, format = DateTime)]
    pub generated_at: Timestamp,
    pub generated_by: String,
    pub examiner_email: Option<String>,
    /// Plain-text report body.
    pub body: String,
    /// The complaint as it stood when finalized.
    pub complaint: ComplaintResponse,
}

impl From<&Report> for ReportResponse {
    fn from(r: &Report) -> Self {
        Self {
            report_id: r.report_id().to_string(),
            complaint_no: r.complaint().complaint_no.to_string(),
            generated_at: r.generated_at(),
            generated_by: r.generated_by().to_string(),
            examiner_email: r.examiner().map(ToString::to_string),
            body: r.body().to_string(),
            complaint: r.complaint().into(),
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/v1/complaints/{complaint_no}/report",
        post(generate_report).get(get_report),
    )
}

/// POST /v1/complaints/{complaint_no}/report: Finalize and compile.
#[utoipa::path(
    post,
    path = "/v1/complaints/{complaint_no}/report",
    params(("complaint_no" = String, Path, description = "Complaint number")),
    request_body(content = GenerateReportRequest, description = "Optional", content_type = "application/json"),
    responses(
        (status = 201, description = "Report generated; complaint is Reported", body = ReportResponse),
        (status = 403, description = "Role may not generate reports", body = crate::error::ErrorBody),
        (status = 404, description = "No such complaint", body = crate::error::ErrorBody),
        (status = 409, description = "Complaint is not Examined", body = crate::error::ErrorBody),
        (status = 503, description = "Audit storage unavailable", body = crate::error::ErrorBody),
    ),
    tag = "reports"
)]
pub async fn generate_report(
    State(state): State<AppState>,
    token: SessionToken,
    Path(complaint_no): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<ReportResponse>), AppError> {
    // Capability before body validation.
    state
        .service
        .gate()
        .require(token.as_str(), Action::GenerateReport)?;
    let req: GenerateReportRequest = optional_json(&body)?;
    let complaint_no = ComplaintNo::new(complaint_no)?;
    let actor = claimed_actor(req.actor_email)?;
    let report = state
        .service
        .generate_report(token.as_str(), &complaint_no, actor.as_ref())?;
    Ok((StatusCode::CREATED, Json((&report).into())))
}

/// GET /v1/complaints/{complaint_no}/report: The archived report.
#[utoipa::path(
    get,
    path = "/v1/complaints/{complaint_no}/report",
    params(("complaint_no" = String, Path, description = "Complaint number")),
    responses(
        (status = 200, description = "Archived report", body = ReportResponse),
        (status = 404, description = "No such complaint, or no report yet", body = crate::error::ErrorBody),
    ),
    tag = "reports"
)]
pub async fn get_report(
    State(state): State<AppState>,
    token: SessionToken,
    Path(complaint_no): Path<String>,
) -> Result<Json<ReportResponse>, AppError> {
    let complaint_no = ComplaintNo::new(complaint_no)?;
    let report = state.service.get_report(token.as_str(), &complaint_no)?;
    Ok(Json((&report).into()))
}
