//! # Roles and the Capability Table
//!
//! The fixed mapping from [`Action`] to the [`Role`]s that may perform it.
//! It is compiled in and cannot be changed at runtime.
//!
//! | Action | Allowed roles |
//! |---|---|
//! | `CreateUser`, `SetUserStatus` | Admin |
//! | `CreateComplaint` | Officer |
//! | `ListComplaints`, `ViewComplaint` | Officer, Examiner, HeadInvestigator |
//! | `AddInference` | Examiner |
//! | `GenerateReport` | Examiner, HeadInvestigator |
//! | `ViewAuditLog` | Officer, Examiner, HeadInvestigator, Admin |

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Operator role. Serialized as `admin`, `officer`, `examiner`,
/// `head-investigator`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    /// Manages user accounts.
    Admin,
    /// Files complaints.
    Officer,
    /// Examines evidence and records inferences.
    Examiner,
    /// Oversees cases and may generate reports.
    HeadInvestigator,
}

impl Role {
    /// All roles.
    pub const ALL: [Role; 4] = [
        Self::Admin,
        Self::Officer,
        Self::Examiner,
        Self::HeadInvestigator,
    ];

    /// The wire identifier of this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Officer => "officer",
            Self::Examiner => "examiner",
            Self::HeadInvestigator => "head-investigator",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ValidationError::UnknownRole(s.to_string()))
    }
}

/// A gated operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Create an operator account.
    CreateUser,
    /// Activate or deactivate an operator account.
    SetUserStatus,
    /// File a new complaint.
    CreateComplaint,
    /// List and filter complaints.
    ListComplaints,
    /// Read a single complaint or its archived report.
    ViewComplaint,
    /// Attach the examiner's inference.
    AddInference,
    /// Finalize a complaint into a report.
    GenerateReport,
    /// Read the audit log.
    ViewAuditLog,
}

impl Action {
    /// Every action, in table order.
    pub const ALL: [Action; 8] = [
        Self::CreateUser,
        Self::SetUserStatus,
        Self::CreateComplaint,
        Self::ListComplaints,
        Self::ViewComplaint,
        Self::AddInference,
        Self::GenerateReport,
        Self::ViewAuditLog,
    ];

    /// The roles permitted to perform this action.
    pub fn allowed_roles(&self) -> &'static [Role] {
        use Role::*;
        match self {
            Self::CreateUser | Self::SetUserStatus => &[Admin],
            Self::CreateComplaint => &[Officer],
            Self::ListComplaints | Self::ViewComplaint => &[Officer, Examiner, HeadInvestigator],
            Self::AddInference => &[Examiner],
            Self::GenerateReport => &[Examiner, HeadInvestigator],
            Self::ViewAuditLog => &[Officer, Examiner, HeadInvestigator, Admin],
        }
    }

    /// Whether `role` may perform this action.
    pub fn permits(&self, role: Role) -> bool {
        self.allowed_roles().contains(&role)
    }

    /// Snake-case name of this action.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateUser => "create_user",
            Self::SetUserStatus => "set_user_status",
            Self::CreateComplaint => "create_complaint",
            Self::ListComplaints => "list_complaints",
            Self::ViewComplaint => "view_complaint",
            Self::AddInference => "add_inference",
            Self::GenerateReport => "generate_report",
            Self::ViewAuditLog => "view_audit_log",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the role gate refused a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// Session unknown, revoked, or expired.
    NotAuthenticated,
    /// Role absent from the capability table for the action.
    InsufficientRole,
    /// The account behind the session has been deactivated.
    AccountInactive,
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::NotAuthenticated => "session missing or expired",
            Self::InsufficientRole => "insufficient role",
            Self::AccountInactive => "account inactive",
        })
    }
}

/// Outcome of a role-gate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The call may proceed.
    Allow,
    /// The call is refused.
    Deny(DenyReason),
}

impl Decision {
    /// Whether this is [`Decision::Allow`].
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}
