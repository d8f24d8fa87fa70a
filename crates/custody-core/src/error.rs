//! # Error Types: Structured Error Hierarchy
//!
//! Every fallible operation in the custody stack returns [`CustodyError`]. Its
//! variants fall into exactly seven classes, reported by [`CustodyError::kind`]:
//!
//! | Kind | Raised when |
//! |---|---|
//! | `Authentication` | no valid session, or the account behind it is inactive |
//! | `Authorization` | the caller's role is absent from the capability table |
//! | `Validation` | an input field violates its constraint |
//! | `Conflict` | a unique key (complaint number, user email) already exists |
//! | `State` | a lifecycle transition is not legal from the current state |
//! | `NotFound` | the addressed complaint, user, or report does not exist |
//! | `Storage` | the durable audit journal could not be written |
//!
//! Only `Storage` is eligible for retry; every other class is deterministic.

use thiserror::Error;

use crate::capability::{Action, DenyReason, Role};
use crate::identity::{ComplaintNo, Email};

/// A single input constraint violation.
///
/// Validation stops at the first violated constraint in declared field order,
/// so a caller always sees one actionable problem.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field was absent or blank.
    #[error("{field} is required")]
    MissingField {
        /// Name of the missing field.
        field: &'static str,
    },

    /// Complaint number is not 1-64 ASCII alphanumeric or hyphen characters.
    #[error("invalid complaint number {0:?}: expected 1-64 letters, digits, or hyphens")]
    InvalidComplaintNo(String),

    /// Email address is malformed.
    #[error("invalid email address {0:?}")]
    InvalidEmail(String),

    /// Date is not a calendar date in `YYYY-MM-DD` form.
    #[error("invalid date {0:?}: expected YYYY-MM-DD")]
    InvalidDate(String),

    /// Category name is not one of the known categories.
    #[error("unknown category {0:?}")]
    UnknownCategory(String),

    /// Severity name is not one of the known severities.
    #[error("unknown severity {0:?}")]
    UnknownSeverity(String),

    /// Role identifier is not one of the known roles.
    #[error("unknown role {0:?}")]
    UnknownRole(String),

    /// Complaint state name is not one of the known states.
    #[error("unknown state {0:?}")]
    UnknownState(String),

    /// A free-text field exceeds its maximum length.
    #[error("{field} exceeds {max} characters")]
    FieldTooLong {
        /// Name of the offending field.
        field: &'static str,
        /// Maximum permitted length in characters.
        max: usize,
    },

    /// More evidence references than a complaint may carry.
    #[error("{count} evidence references supplied; at most {max} allowed")]
    TooManyEvidenceRefs {
        /// Number supplied.
        count: usize,
        /// Maximum permitted.
        max: usize,
    },

    /// An evidence reference is blank or too long.
    #[error("evidence reference at index {index} is blank or exceeds {max} characters")]
    InvalidEvidenceRef {
        /// Zero-based position in the submitted list.
        index: usize,
        /// Maximum permitted length in characters.
        max: usize,
    },

    /// Inference text was blank.
    #[error("inference text must not be blank")]
    EmptyInference,

    /// The actor named in a request body is not the authenticated caller.
    #[error("actor {claimed} does not match the authenticated session")]
    ActorMismatch {
        /// The email the request claimed to act as.
        claimed: String,
    },
}

impl ValidationError {
    /// The input field this violation concerns.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::MissingField { field } | Self::FieldTooLong { field, .. } => Some(*field),
            Self::InvalidComplaintNo(_) => Some("complaint_no"),
            Self::InvalidEmail(_) => Some("email"),
            Self::InvalidDate(_) => Some("date"),
            Self::UnknownCategory(_) => Some("category"),
            Self::UnknownSeverity(_) => Some("severity"),
            Self::UnknownRole(_) => Some("role"),
            Self::UnknownState(_) => Some("state"),
            Self::TooManyEvidenceRefs { .. } | Self::InvalidEvidenceRef { .. } => {
                Some("evidence_refs")
            }
            Self::EmptyInference => Some("inference"),
            Self::ActorMismatch { .. } => Some("actor_email"),
        }
    }
}

/// The seven caller-facing error classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No valid session, or the account is inactive.
    Authentication,
    /// Role not permitted to perform the action.
    Authorization,
    /// Input constraint violated.
    Validation,
    /// Unique key already taken.
    Conflict,
    /// Illegal lifecycle transition.
    State,
    /// Addressed entity does not exist.
    NotFound,
    /// Durable storage unavailable.
    Storage,
}

/// Top-level error type for the custody stack.
#[derive(Error, Debug)]
pub enum CustodyError {
    /// The caller has no usable session.
    #[error("not authenticated: {0}")]
    Authentication(DenyReason),

    /// Login rejected. Deliberately does not say which check failed.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The caller's role may not perform the action.
    #[error("role {role} is not permitted to {action}")]
    Authorization {
        /// The attempted action.
        action: Action,
        /// The caller's role.
        role: Role,
    },

    /// An input field violated its constraint.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// A complaint with this number already exists.
    #[error("complaint {0} already exists")]
    DuplicateComplaintNo(ComplaintNo),

    /// A user with this email already exists.
    #[error("user {0} already exists")]
    DuplicateUser(Email),

    /// The complaint is not in a state that permits the attempted transition.
    #[error("complaint {complaint_no} is {current}; cannot {attempted}")]
    InvalidState {
        /// The complaint addressed.
        complaint_no: ComplaintNo,
        /// Its current lifecycle state.
        current: String,
        /// The transition that was attempted.
        attempted: &'static str,
    },

    /// No complaint with this number exists.
    #[error("complaint {0} not found")]
    ComplaintNotFound(ComplaintNo),

    /// No user with this email exists.
    #[error("user {0} not found")]
    UserNotFound(Email),

    /// No report has been generated for this complaint.
    #[error("no report for complaint {0}")]
    ReportNotFound(ComplaintNo),

    /// The audit journal could not be written. Nothing was changed.
    #[error("storage unavailable: {0}")]
    Storage(String),
}

impl CustodyError {
    /// Build the error a role-gate denial surfaces as.
    ///
    /// `InsufficientRole` is an authorization failure; the other reasons mean
    /// the session itself is not usable.
    pub fn denied(reason: DenyReason, action: Action, role: Role) -> Self {
        match reason {
            DenyReason::InsufficientRole => Self::Authorization { action, role },
            DenyReason::NotAuthenticated | DenyReason::AccountInactive => {
                Self::Authentication(reason)
            }
        }
    }

    /// The caller-facing class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Authentication(_) | Self::InvalidCredentials => ErrorKind::Authentication,
            Self::Authorization { .. } => ErrorKind::Authorization,
            Self::Validation(_) => ErrorKind::Validation,
            Self::DuplicateComplaintNo(_) | Self::DuplicateUser(_) => ErrorKind::Conflict,
            Self::InvalidState { .. } => ErrorKind::State,
            Self::ComplaintNotFound(_) | Self::UserNotFound(_) | Self::ReportNotFound(_) => {
                ErrorKind::NotFound
            }
            Self::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Whether a caller may reasonably retry the same request.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Storage
    }
}
