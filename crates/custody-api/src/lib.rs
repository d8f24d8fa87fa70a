//! # custody-api: HTTP Boundary for the Evidence Custody Stack
//!
//! Axum service exposing the custody lifecycle over JSON.
//!
//! ## Route Structure
//!
//! | Path | Module | Auth |
//! |------|--------|------|
//! | `/v1/sessions` | [`routes::sessions`] | login public, logout bearer |
//! | `/v1/users/*` | [`routes::users`] | bearer (Admin) |
//! | `/v1/complaints/*` | [`routes::complaints`], [`routes::reports`] | bearer |
//! | `/v1/audit` | [`routes::audit`] | bearer |
//! | `/openapi.json` | [`openapi`] | public |
//! | `/metrics` | Prometheus exposition | public |
//! | `/health/*` | probes | public |
//!
//! ## Middleware Stack
//!
//! Outermost first: `TraceLayer`, metrics, rate limit, then bearer-session
//! auth on the `/v1` routes that need it. The rate limiter resolves bearer
//! tokens itself so unknown tokens fall into the anonymous budget.
//!
//! The bearer layer only proves the session exists. The custody service
//! re-checks the session and the capability table on every call.

pub mod auth;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::State;
use axum::http::header;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use crate::error::AppError;
use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
///
/// Health probes (`/health/*`) are mounted outside every middleware layer
/// so they stay reachable under load and without credentials.
pub fn app(state: AppState) -> Router {
    // Session-authenticated API routes.
    let api = Router::new()
        .merge(routes::sessions::router())
        .merge(routes::users::router())
        .merge(routes::complaints::router())
        .merge(routes::reports::router())
        .merge(routes::audit::router())
        .layer(from_fn_with_state(state.clone(), auth::auth_middleware));

    // Public routes that still pass through metrics and rate limiting.
    let public = Router::new()
        .merge(routes::sessions::public_router())
        .merge(openapi::router())
        .route("/metrics", get(render_metrics));

    let service = Router::new()
        .merge(public)
        .merge(api)
        .layer(from_fn_with_state(
            state.clone(),
            middleware::rate_limit::rate_limit_middleware,
        ))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(middleware::tracing_layer::layer())
        .with_state(state);

    // Unauthenticated health probes.
    let health = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness));

    Router::new().merge(health).merge(service)
}

/// Prometheus text exposition of the installed recorder.
async fn render_metrics(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let handle = state
        .metrics
        .as_ref()
        .ok_or_else(|| AppError::NotFound("metrics recorder not installed".into()))?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    ))
}

/// Liveness probe: always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: returns 200 when the application is ready to serve.
async fn readiness() -> &'static str {
    "ready"
}
