//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI 3.1 spec,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Evidence Custody API",
        version = "0.1.0",
        description = "Complaint custody lifecycle (Submitted, Examined, Reported) with role-gated operations, an append-only audit log, and compiled reports.",
        license(name = "AGPL-3.0-or-later")
    ),
    paths(
        // Sessions
        crate::routes::sessions::login,
        crate::routes::sessions::logout,
        // Users
        crate::routes::users::create_user,
        crate::routes::users::set_user_status,
        // Complaints
        crate::routes::complaints::create_complaint,
        crate::routes::complaints::list_complaints,
        crate::routes::complaints::get_complaint,
        crate::routes::complaints::add_inference,
        // Reports
        crate::routes::reports::generate_report,
        crate::routes::reports::get_report,
        // Audit
        crate::routes::audit::query_audit,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::sessions::LoginRequest,
        crate::routes::sessions::SessionResponse,
        crate::routes::users::CreateUserRequest,
        crate::routes::users::SetUserStatusRequest,
        crate::routes::users::UserResponse,
        crate::routes::complaints::CreateComplaintRequest,
        crate::routes::complaints::InferenceRequest,
        crate::routes::complaints::ComplaintResponse,
        crate::routes::complaints::ComplaintListResponse,
        crate::routes::complaints::TransitionResponse,
        crate::routes::reports::GenerateReportRequest,
        crate::routes::reports::ReportResponse,
        crate::routes::audit::AuditEntryResponse,
    )),
    tags(
        (name = "sessions", description = "Login and logout"),
        (name = "users", description = "Operator accounts (Admin)"),
        (name = "complaints", description = "Complaint filing and examination"),
        (name = "reports", description = "Finalization and compiled reports"),
        (name = "audit", description = "Append-only audit log"),
    )
)]
pub struct ApiDoc;

/// Serves `/openapi.json`.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_is_documented() {
        let spec = ApiDoc::openapi();
        let paths: Vec<&str> = spec.paths.paths.keys().map(String::as_str).collect();
        for expected in [
            "/v1/sessions",
            "/v1/users",
            "/v1/users/{email}/status",
            "/v1/complaints",
            "/v1/complaints/{complaint_no}",
            "/v1/complaints/{complaint_no}/inference",
            "/v1/complaints/{complaint_no}/report",
            "/v1/audit",
        ] {
            assert!(paths.contains(&expected), "missing {expected}");
        }
    }

    #[test]
    fn spec_serializes() {
        let json = serde_json::to_value(ApiDoc::openapi()).unwrap();
        assert_eq!(json["info"]["title"], "Evidence Custody API");
    }
}
