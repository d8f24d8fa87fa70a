//! # Application State
//!
//! Shared state for the Axum application: the custody service plus the
//! configuration it was built from. Configuration is read once from the
//! environment at startup; invalid values fail startup instead of falling
//! back to defaults.

use std::path::PathBuf;
use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use thiserror::Error;

use custody_core::{Email, ValidationError};
use custody_engine::{
    read_journal, AuditJournal, Credential, CustodyService, FileJournal, JournalError,
    NullJournal, DEFAULT_SESSION_TTL_SECS,
};

use crate::middleware::rate_limit::{RateLimitConfig, RateLimiter};

/// Log output format for the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Seed Admin account created at startup.
#[derive(Clone)]
pub struct BootstrapAdmin {
    pub email: Email,
    pub credential: String,
}

impl std::fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("email", &self.email)
            .field("credential", &"[REDACTED]")
            .finish()
    }
}

/// Errors raised while reading configuration or building state.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },

    #[error("{set} is set but {missing} is not")]
    Incomplete {
        set: &'static str,
        missing: &'static str,
    },

    #[error("bootstrap admin: {0}")]
    BootstrapAdmin(#[from] ValidationError),

    #[error("cannot load audit journal: {0}")]
    Journal(#[from] JournalError),

    #[error("cannot seed bootstrap admin: {0}")]
    Seed(#[from] custody_core::CustodyError),
}

/// Application configuration.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Session lifetime in seconds.
    pub session_ttl_secs: i64,
    /// Append-only JSONL audit journal; `None` keeps the log in memory only.
    pub audit_journal_path: Option<PathBuf>,
    /// Admin account to seed on startup.
    pub bootstrap_admin: Option<BootstrapAdmin>,
    /// Per-client request budget.
    pub rate_limit: RateLimitConfig,
    /// Log output format.
    pub log_format: LogFormat,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("session_ttl_secs", &self.session_ttl_secs)
            .field("audit_journal_path", &self.audit_journal_path)
            .field("bootstrap_admin", &self.bootstrap_admin)
            .field("rate_limit", &self.rate_limit)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            audit_journal_path: None,
            bootstrap_admin: None,
            rate_limit: RateLimitConfig::default(),
            log_format: LogFormat::default(),
        }
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
    }
}

impl AppConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read configuration through `lookup`, which returns a variable's value
    /// if set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = parse_var(&lookup, "PORT", defaults.port)?;
        let session_ttl_secs =
            parse_var(&lookup, "SESSION_TTL_SECS", defaults.session_ttl_secs)?;
        if session_ttl_secs <= 0 {
            return Err(ConfigError::Invalid {
                var: "SESSION_TTL_SECS",
                value: session_ttl_secs.to_string(),
            });
        }

        let rate_limit = RateLimitConfig {
            max_requests: parse_var(
                &lookup,
                "RATE_LIMIT_MAX_REQUESTS",
                defaults.rate_limit.max_requests,
            )?,
            window_secs: parse_var(
                &lookup,
                "RATE_LIMIT_WINDOW_SECS",
                defaults.rate_limit.window_secs,
            )?,
        };
        if rate_limit.window_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "RATE_LIMIT_WINDOW_SECS",
                value: "0".into(),
            });
        }

        let audit_journal_path = lookup("AUDIT_JOURNAL_PATH")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        let bootstrap_admin = match (
            lookup("BOOTSTRAP_ADMIN_EMAIL"),
            lookup("BOOTSTRAP_ADMIN_CREDENTIAL"),
        ) {
            (None, None) => None,
            (Some(email), Some(credential)) => Some(BootstrapAdmin {
                email: Email::new(email)?,
                credential,
            }),
            (Some(_), None) => {
                return Err(ConfigError::Incomplete {
                    set: "BOOTSTRAP_ADMIN_EMAIL",
                    missing: "BOOTSTRAP_ADMIN_CREDENTIAL",
                })
            }
            (None, Some(_)) => {
                return Err(ConfigError::Incomplete {
                    set: "BOOTSTRAP_ADMIN_CREDENTIAL",
                    missing: "BOOTSTRAP_ADMIN_EMAIL",
                })
            }
        };

        let log_format = match lookup("LOG_FORMAT").as_deref().map(str::trim) {
            None | Some("") | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "LOG_FORMAT",
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            port,
            session_ttl_secs,
            audit_journal_path,
            bootstrap_admin,
            rate_limit,
            log_format,
        })
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<CustodyService>,
    pub config: AppConfig,
    /// Request budgets, sized from `config.rate_limit`.
    pub limiter: RateLimiter,
    /// Renders `/metrics`; `None` when no recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create a new application state with an in-memory service and defaults.
    pub fn new() -> Self {
        Self::with_service(CustodyService::in_memory(), AppConfig::default())
    }

    /// Wrap an existing service.
    pub fn with_service(service: CustodyService, config: AppConfig) -> Self {
        Self {
            service: Arc::new(service),
            limiter: RateLimiter::new(config.rate_limit.clone()),
            config,
            metrics: None,
        }
    }

    /// Build the service described by `config`: replay and reopen the
    /// journal, then seed the bootstrap admin.
    ///
    /// An existing journal that cannot be read, or whose sequence is broken,
    /// fails startup.
    pub fn from_config(config: AppConfig) -> Result<Self, ConfigError> {
        let service = match &config.audit_journal_path {
            Some(path) => {
                let history = if path.exists() {
                    read_journal(path)?
                } else {
                    Vec::new()
                };
                let journal: Arc<dyn AuditJournal> = Arc::new(FileJournal::open(path)?);
                CustodyService::from_history(journal, history, config.session_ttl_secs)?
            }
            None => {
                tracing::warn!("AUDIT_JOURNAL_PATH not set; audit log will not survive restart");
                CustodyService::new(Arc::new(NullJournal), config.session_ttl_secs)
            }
        };
        if let Some(admin) = &config.bootstrap_admin {
            service.bootstrap_admin(admin.email.clone(), Credential::new(admin.credential.clone())?)?;
        }
        Ok(Self::with_service(service, config))
    }

    /// Attach the Prometheus handle used by `/metrics`.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
