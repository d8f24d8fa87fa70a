//! # Per-Client Rate Limiting
//!
//! Fixed-window request budgets. A request whose bearer token resolves to a
//! live session is charged to that session's account; everything else
//! (no token, malformed header, unknown or expired token) shares a single
//! anonymous budget, so minting fresh garbage tokens buys nothing.
//!
//! Budgets whose window has lapsed are swept whenever a new client appears,
//! which bounds the table by the number of clients active in one window.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use parking_lot::Mutex;

use custody_core::Email;

use crate::error::{ErrorBody, ErrorDetail};
use crate::state::AppState;

/// Rate limiter configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum requests per window.
    pub max_requests: u64,
    /// Window duration in seconds.
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 1000,
            window_secs: 60,
        }
    }
}

/// Which budget a request is charged to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClientKey {
    /// An authenticated account. All of its sessions share one budget.
    Account(Email),
    /// Every request that does not resolve to a live session.
    Anonymous,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u64,
    started: Instant,
}

/// Budgets by client, shared across clones.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: Arc<Mutex<HashMap<ClientKey, Window>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn window_len(&self) -> Duration {
        Duration::from_secs(self.config.window_secs)
    }

    /// Charge one request to `key` at `now`. Returns `false` once the budget
    /// for the current window is spent.
    pub fn check_at(&self, key: &ClientKey, now: Instant) -> bool {
        let window_len = self.window_len();
        let mut windows = self.windows.lock();

        if !windows.contains_key(key) {
            windows.retain(|_, w| now.saturating_duration_since(w.started) < window_len);
        }
        let window = windows.entry(key.clone()).or_insert(Window {
            count: 0,
            started: now,
        });
        if now.saturating_duration_since(window.started) >= window_len {
            *window = Window {
                count: 0,
                started: now,
            };
        }

        if window.count >= self.config.max_requests {
            false
        } else {
            window.count += 1;
            true
        }
    }

    /// Number of clients currently tracked.
    pub fn tracked(&self) -> usize {
        self.windows.lock().len()
    }
}

/// The budget this request draws from.
fn client_key(state: &AppState, request: &Request) -> ClientKey {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .and_then(|token| state.service.gate().session(token))
        .map_or(ClientKey::Anonymous, |session| {
            ClientKey::Account(session.email().clone())
        })
}

/// Middleware that enforces per-client rate limits.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let key = client_key(&state, &request);
    if !state.limiter.check_at(&key, Instant::now()) {
        match &key {
            ClientKey::Account(email) => tracing::warn!(email = %email, "rate limit exceeded"),
            ClientKey::Anonymous => tracing::warn!("anonymous rate limit exceeded"),
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: "RATE_LIMITED".to_string(),
                message: "rate limit exceeded".to_string(),
                details: None,
            },
        };
        return (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    }

    next.run(request).await
}
