//! # Complaints
//!
//! Filing, listing, and the examiner's inference.
//!
//! ## Endpoints
//!
//! - `POST /v1/complaints`: file a complaint (Officer)
//! - `GET /v1/complaints`: list with filters and pagination
//! - `GET /v1/complaints/{complaint_no}`: one complaint
//! - `POST /v1/complaints/{complaint_no}/inference`: record the inference
//!   (Examiner), moving the complaint to `Examined`

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use custody_core::{Action, Category, ComplaintNo, Email, Severity, Timestamp, ValidationError};
use custody_engine::{Complaint, ComplaintDraft, ComplaintFilter};
use custody_state::{ComplaintState, TransitionRecord};

use crate::auth::SessionToken;
use crate::error::AppError;
use crate::extractors::{extract_json, extract_query, IntoDomain};
use crate::state::AppState;

/// Default page size for complaint listings.
pub const DEFAULT_PAGE_SIZE: usize = 100;
/// Largest accepted page size; larger requests are clamped.
pub const MAX_PAGE_SIZE: usize = 1000;

// ── Request/Response DTOs ───────────────────────────────────────────

/// Request to file a complaint. Missing strings are reported as missing
/// fields by validation, not as malformed JSON.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct CreateComplaintRequest {
    /// Caller-chosen key, 1-64 of `[A-Za-z0-9-]`.
    pub complaint_no: String,
    pub title: String,
    /// `YYYY-MM-DD`.
    pub date: String,
    pub place: String,
    /// Theft, Assault, Fraud, Harassment, Vandalism, Burglary, or Other.
    pub category: String,
    /// Low, Medium, High, or Critical. Defaults to Medium.
    pub severity: Option<String>,
    pub complaint_details: String,
    pub evidence_details: Option<String>,
    /// Opaque evidence file references; at most 10.
    pub evidence_refs: Vec<String>,
}

impl From<CreateComplaintRequest> for ComplaintDraft {
    fn from(r: CreateComplaintRequest) -> Self {
        ComplaintDraft {
            complaint_no: r.complaint_no,
            title: r.title,
            date: r.date,
            place: r.place,
            category: r.category,
            severity: r.severity,
            complaint_details: r.complaint_details,
            evidence_details: r.evidence_details,
            evidence_refs: r.evidence_refs,
        }
    }
}

/// Request to record the examiner's inference.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct InferenceRequest {
    /// The finding. Must not be blank.
    #[serde(default)]
    pub inference: String,
    /// If present, must equal the session's email.
    pub actor_email: Option<String>,
}

/// Query parameters for `GET /v1/complaints`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListComplaintsQuery {
    /// Exact category.
    pub category: Option<String>,
    /// Case-insensitive substring of title or details.
    pub search: Option<String>,
    /// Submitted, Examined, or Reported.
    pub state: Option<String>,
    /// Low, Medium, High, or Critical.
    pub severity: Option<String>,
    /// Page size; default 100, at most 1000.
    pub limit: Option<usize>,
    /// Number of matching records to skip.
    pub offset: Option<usize>,
}

/// A parsed listing request.
pub struct Listing {
    pub filter: ComplaintFilter,
    pub limit: usize,
    pub offset: usize,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl IntoDomain for ListComplaintsQuery {
    type Output = Listing;

    fn into_domain(self) -> Result<Listing, ValidationError> {
        let filter = ComplaintFilter {
            category: non_blank(self.category)
                .map(|c| Category::parse(&c))
                .transpose()?,
            search: non_blank(self.search),
            state: non_blank(self.state)
                .map(|s| s.parse::<ComplaintState>())
                .transpose()?,
            severity: non_blank(self.severity)
                .map(|s| Severity::parse(&s))
                .transpose()?,
        };
        Ok(Listing {
            filter,
            limit: self.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE),
            offset: self.offset.unwrap_or(0),
        })
    }
}

/// One accepted lifecycle transition.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TransitionResponse {
    pub from_state: String,
    pub to_state: String,
    #[schema(value_type = String, format = DateTime)]
    pub timestamp: Timestamp,
    pub actor: String,
}

impl From<&TransitionRecord> for TransitionResponse {
    fn from(t: &TransitionRecord) -> Self {
        Self {
            from_state: t.from_state.to_string(),
            to_state: t.to_state.to_string(),
            timestamp: t.timestamp,
            actor: t.actor.to_string(),
        }
    }
}

/// A complaint as returned by the API.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ComplaintResponse {
    pub complaint_no: String,
    pub title: String,
    /// `YYYY-MM-DD`.
    pub date: String,
    pub place: String,
    pub category: String,
    pub severity: String,
    pub complaint_details: String,
    pub evidence_details: String,
    pub evidence_refs: Vec<String>,
    /// Submitted, Examined, or Reported.
    pub state: String,
    pub inference: Option<String>,
    pub examiner_email: Option<String>,
    #[schema(value_type = Option<String>, format = DateTime)]
    pub inference_at: Option<Timestamp>,
    pub created_by: String,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: Timestamp,
    #[schema(value_type = Option<String>, format = DateTime)]
    pub reported_at: Option<Timestamp>,
    pub transitions: Vec<TransitionResponse>,
}

impl From<&Complaint> for ComplaintResponse {
    fn from(c: &Complaint) -> Self {
        Self {
            complaint_no: c.complaint_no.to_string(),
            title: c.title.clone(),
            date: c.date.format("%Y-%m-%d").to_string(),
            place: c.place.clone(),
            category: c.category.to_string(),
            severity: c.severity.to_string(),
            complaint_details: c.complaint_details.clone(),
            evidence_details: c.evidence_details.clone(),
            evidence_refs: c.evidence_refs.clone(),
            state: c.state().to_string(),
            inference: c.inference.as_ref().map(|i| i.text.clone()),
            examiner_email: c.inference.as_ref().map(|i| i.examiner.to_string()),
            inference_at: c.inference.as_ref().map(|i| i.recorded_at),
            created_by: c.created_by.to_string(),
            created_at: c.created_at,
            reported_at: c.reported_at,
            transitions: c.transitions().iter().map(TransitionResponse::from).collect(),
        }
    }
}

/// A page of complaints.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ComplaintListResponse {
    /// Matching complaints before pagination.
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
    pub complaints: Vec<ComplaintResponse>,
}

// ── Router ──────────────────────────────────────────────────────────

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/complaints", get(list_complaints).post(create_complaint))
        .route("/v1/complaints/{complaint_no}", get(get_complaint))
        .route(
            "/v1/complaints/{complaint_no}/inference",
            post(add_inference),
        )
}

/// Parse an optional `actor_email` from a request body.
pub(crate) fn claimed_actor(raw: Option<String>) -> Result<Option<Email>, ValidationError> {
    raw.filter(|e| !e.trim().is_empty())
        .map(|e| {
            Email::new(e.clone()).map_err(|_| ValidationError::ActorMismatch { claimed: e })
        })
        .transpose()
}

// ── Handlers ────────────────────────────────────────────────────────

/// POST /v1/complaints: File a complaint in `Submitted`.
#[utoipa::path(
    post,
    path = "/v1/complaints",
    request_body = CreateComplaintRequest,
    responses(
        (status = 201, description = "Complaint filed", body = ComplaintResponse),
        (status = 403, description = "Caller is not an Officer", body = crate::error::ErrorBody),
        (status = 409, description = "Complaint number already used", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
        (status = 503, description = "Audit storage unavailable", body = crate::error::ErrorBody),
    ),
    tag = "complaints"
)]
pub async fn create_complaint(
    State(state): State<AppState>,
    token: SessionToken,
    body: Result<Json<CreateComplaintRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ComplaintResponse>), AppError> {
    // Capability before body validation.
    state
        .service
        .gate()
        .require(token.as_str(), Action::CreateComplaint)?;
    let req = extract_json(body)?;
    let complaint = state.service.submit(token.as_str(), req.into())?;
    Ok((StatusCode::CREATED, Json((&complaint).into())))
}

/// GET /v1/complaints: List complaints in insertion order.
#[utoipa::path(
    get,
    path = "/v1/complaints",
    params(ListComplaintsQuery),
    responses(
        (status = 200, description = "Matching complaints", body = ComplaintListResponse),
        (status = 422, description = "Unknown filter value", body = crate::error::ErrorBody),
    ),
    tag = "complaints"
)]
pub async fn list_complaints(
    State(state): State<AppState>,
    token: SessionToken,
    query: Result<Query<ListComplaintsQuery>, QueryRejection>,
) -> Result<Json<ComplaintListResponse>, AppError> {
    let listing = extract_query(query)?.into_domain()?;
    let matches = state.service.list(token.as_str(), &listing.filter)?;
    let total = matches.len();
    let complaints = matches
        .iter()
        .skip(listing.offset)
        .take(listing.limit)
        .map(ComplaintResponse::from)
        .collect();
    Ok(Json(ComplaintListResponse {
        total,
        limit: listing.limit,
        offset: listing.offset,
        complaints,
    }))
}

/// GET /v1/complaints/{complaint_no}: One complaint.
#[utoipa::path(
    get,
    path = "/v1/complaints/{complaint_no}",
    params(("complaint_no" = String, Path, description = "Complaint number")),
    responses(
        (status = 200, description = "Complaint found", body = ComplaintResponse),
        (status = 404, description = "No such complaint", body = crate::error::ErrorBody),
    ),
    tag = "complaints"
)]
pub async fn get_complaint(
    State(state): State<AppState>,
    token: SessionToken,
    Path(complaint_no): Path<String>,
) -> Result<Json<ComplaintResponse>, AppError> {
    let complaint_no = ComplaintNo::new(complaint_no)?;
    let complaint = state.service.get(token.as_str(), &complaint_no)?;
    Ok(Json((&complaint).into()))
}

/// POST /v1/complaints/{complaint_no}/inference: Record the inference.
#[utoipa::path(
    post,
    path = "/v1/complaints/{complaint_no}/inference",
    params(("complaint_no" = String, Path, description = "Complaint number")),
    request_body = InferenceRequest,
    responses(
        (status = 200, description = "Inference recorded; complaint is Examined", body = ComplaintResponse),
        (status = 403, description = "Caller is not an Examiner", body = crate::error::ErrorBody),
        (status = 404, description = "No such complaint", body = crate::error::ErrorBody),
        (status = 409, description = "Complaint is not Submitted", body = crate::error::ErrorBody),
        (status = 422, description = "Blank inference or actor mismatch", body = crate::error::ErrorBody),
        (status = 503, description = "Audit storage unavailable", body = crate::error::ErrorBody),
    ),
    tag = "complaints"
)]
pub async fn add_inference(
    State(state): State<AppState>,
    token: SessionToken,
    Path(complaint_no): Path<String>,
    body: Result<Json<InferenceRequest>, JsonRejection>,
) -> Result<Json<ComplaintResponse>, AppError> {
    // Capability before body validation.
    state
        .service
        .gate()
        .require(token.as_str(), Action::AddInference)?;
    let req = extract_json(body)?;
    let complaint_no = ComplaintNo::new(complaint_no)?;
    let actor = claimed_actor(req.actor_email)?;
    let complaint = state.service.add_inference(
        token.as_str(),
        &complaint_no,
        &req.inference,
        actor.as_ref(),
    )?;
    Ok(Json((&complaint).into()))
}
