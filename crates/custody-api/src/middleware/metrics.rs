//! # Request Metrics
//!
//! Counts requests and error responses through the `metrics` facade. The
//! binary installs a Prometheus recorder and `/metrics` renders it; without a
//! recorder the counters are no-ops.

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;

/// Total HTTP requests, labelled by method, route, and status.
pub const REQUESTS_TOTAL: &str = "custody_http_requests_total";
/// HTTP responses with a 4xx or 5xx status, labelled like [`REQUESTS_TOTAL`].
pub const ERRORS_TOTAL: &str = "custody_http_errors_total";

/// Middleware that increments request and error counters.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    // Matched route template, so complaint numbers don't explode cardinality.
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;

    let status = response.status();
    let labels = [
        ("method", method),
        ("route", route),
        ("status", status.as_u16().to_string()),
    ];
    metrics::counter!(REQUESTS_TOTAL, &labels).increment(1);
    if status.is_client_error() || status.is_server_error() {
        metrics::counter!(ERRORS_TOTAL, &labels).increment(1);
    }

    response
}
