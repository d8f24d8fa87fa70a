//! # Role Gate
//!
//! Resolves a bearer session token to a caller and checks the caller against
//! the capability table. The session is re-validated on every call: expiry,
//! revocation, and account deactivation all take effect on the very next
//! request, even for a session issued before the change.
//!
//! Evaluation order inside [`RoleGate::authorize`]:
//!
//! 1. session unknown, revoked, or expired → `NotAuthenticated`
//! 2. account missing or inactive → `AccountInactive`
//! 3. role absent from the table → `InsufficientRole`

use std::sync::Arc;

use dashmap::DashMap;
use uuid::Uuid;

use custody_core::{Action, CustodyError, Decision, DenyReason, Email, Role, Timestamp};

use crate::users::UserDirectory;

/// Default session lifetime: eight hours.
pub const DEFAULT_SESSION_TTL_SECS: i64 = 8 * 60 * 60;

/// An issued login session. Immutable once issued.
#[derive(Clone)]
pub struct Session {
    token: String,
    email: Email,
    role: Role,
    issued_at: Timestamp,
    expires_at: Timestamp,
}

impl Session {
    /// The bearer token.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Who logged in.
    pub fn email(&self) -> &Email {
        &self.email
    }

    /// The role the session was issued for.
    pub fn role(&self) -> Role {
        self.role
    }

    /// When the session was issued.
    pub fn issued_at(&self) -> Timestamp {
        self.issued_at
    }

    /// When the session stops being accepted.
    pub fn expires_at(&self) -> Timestamp {
        self.expires_at
    }

    /// Whether the session has expired as of `now`.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        now >= self.expires_at
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &"[REDACTED]")
            .field("email", &self.email)
            .field("role", &self.role)
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// The authenticated identity an operation runs as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    /// Operator email.
    pub email: Email,
    /// Operator role.
    pub role: Role,
}

/// Live sessions keyed by token.
#[derive(Debug)]
struct SessionStore {
    sessions: DashMap<String, Session>,
    ttl_secs: i64,
}

impl SessionStore {
    /// Issue a fresh session. Sessions already expired at `now` are swept.
    fn issue(&self, email: Email, role: Role, now: Timestamp) -> Session {
        self.sessions.retain(|_, s| !s.is_expired_at(now));
        let session = Session {
            token: Uuid::new_v4().to_string(),
            email,
            role,
            issued_at: now,
            expires_at: now.plus_secs(self.ttl_secs),
        };
        self.sessions.insert(session.token.clone(), session.clone());
        session
    }

    /// The live session for `token`. Expired sessions are dropped on sight.
    fn resolve(&self, token: &str, now: Timestamp) -> Option<Session> {
        let session = self.sessions.get(token).map(|s| s.clone())?;
        if session.is_expired_at(now) {
            self.sessions.remove(token);
            return None;
        }
        Some(session)
    }

    fn revoke(&self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }
}

/// Sessions plus the user directory they are checked against.
#[derive(Debug)]
pub struct RoleGate {
    users: Arc<UserDirectory>,
    sessions: SessionStore,
}

impl RoleGate {
    /// A gate over `users` issuing sessions that live for `ttl_secs`.
    pub fn new(users: Arc<UserDirectory>, ttl_secs: i64) -> Self {
        Self {
            users,
            sessions: SessionStore {
                sessions: DashMap::new(),
                ttl_secs,
            },
        }
    }

    /// The user directory this gate consults.
    pub fn users(&self) -> &UserDirectory {
        &self.users
    }

    /// Log in. The account must exist, be active, hold `role`, and the
    /// credential must match.
    pub fn login(
        &self,
        email: &Email,
        credential: &str,
        role: Role,
    ) -> Result<Session, CustodyError> {
        let user = match self.users.verify_login(email, credential, role) {
            Ok(user) => user,
            Err(err) => {
                tracing::warn!(email = %email, role = %role, "login rejected");
                return Err(err);
            }
        };
        let session = self.sessions.issue(user.email, user.role, Timestamp::now());
        tracing::info!(email = %session.email, role = %session.role, "session issued");
        Ok(session)
    }

    /// Revoke a session. Unknown tokens are `NotAuthenticated`.
    pub fn logout(&self, token: &str) -> Result<(), CustodyError> {
        if self.sessions.revoke(token) {
            Ok(())
        } else {
            Err(CustodyError::Authentication(DenyReason::NotAuthenticated))
        }
    }

    /// Decide whether the session behind `token` may perform `action`.
    pub fn authorize(&self, token: &str, action: Action) -> Decision {
        match self.evaluate(token, action, Timestamp::now()) {
            Ok(_) => Decision::Allow,
            Err((reason, _)) => Decision::Deny(reason),
        }
    }

    /// Like [`authorize`](Self::authorize), but returns the caller on success
    /// and the matching [`CustodyError`] on denial.
    pub fn require(&self, token: &str, action: Action) -> Result<Caller, CustodyError> {
        self.evaluate(token, action, Timestamp::now())
            .map_err(|(reason, role)| {
                tracing::warn!(action = %action, reason = %reason, "request denied");
                match role {
                    Some(role) => CustodyError::denied(reason, action, role),
                    None => CustodyError::Authentication(reason),
                }
            })
    }

    /// Resolve a token to its session without any capability check.
    pub fn session(&self, token: &str) -> Option<Session> {
        self.sessions.resolve(token, Timestamp::now())
    }

    fn evaluate(
        &self,
        token: &str,
        action: Action,
        now: Timestamp,
    ) -> Result<Caller, (DenyReason, Option<Role>)> {
        let session = self
            .sessions
            .resolve(token, now)
            .ok_or((DenyReason::NotAuthenticated, None))?;
        let user = match self.users.get(session.email()) {
            Some(user) if user.active => user,
            _ => return Err((DenyReason::AccountInactive, Some(session.role()))),
        };
        if !action.permits(user.role) {
            return Err((DenyReason::InsufficientRole, Some(user.role)));
        }
        Ok(Caller {
            email: user.email,
            role: user.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::{Credential, NewUser};

    fn gate_with(role: Role, ttl: i64) -> (RoleGate, Email) {
        let users = Arc::new(UserDirectory::new());
        let email = Email::new("op@example.org").unwrap();
        users
            .create(
                NewUser {
                    email: email.clone(),
                    role,
                    credential: Credential::new("pw").unwrap(),
                    active: true,
                },
                Timestamp::now(),
            )
            .unwrap();
        (RoleGate::new(users, ttl), email)
    }

    #[test]
    fn login_issues_session_with_ttl() {
        let (gate, email) = gate_with(Role::Officer, 60);
        let s = gate.login(&email, "pw", Role::Officer).unwrap();
        assert_eq!(s.role(), Role::Officer);
        assert_eq!(s.expires_at(), s.issued_at().plus_secs(60));
        assert!(!format!("{s:?}").contains(s.token()));
    }

    #[test]
    fn unknown_token_is_not_authenticated() {
        let (gate, _) = gate_with(Role::Officer, 60);
        assert_eq!(
            gate.authorize("nope", Action::ListComplaints),
            Decision::Deny(DenyReason::NotAuthenticated)
        );
    }

    #[test]
    fn expired_session_is_not_authenticated() {
        let (gate, email) = gate_with(Role::Officer, 0);
        let s = gate.login(&email, "pw", Role::Officer).unwrap();
        assert_eq!(
            gate.authorize(s.token(), Action::ListComplaints),
            Decision::Deny(DenyReason::NotAuthenticated)
        );
    }

    #[test]
    fn expired_sessions_are_swept_on_login() {
        let (gate, email) = gate_with(Role::Officer, 0);
        for _ in 0..1000 {
            gate.login(&email, "pw", Role::Officer).unwrap();
        }
        assert!(gate.sessions.sessions.len() <= 1);

        let (gate, email) = gate_with(Role::Officer, 60);
        for _ in 0..3 {
            gate.login(&email, "pw", Role::Officer).unwrap();
        }
        assert_eq!(gate.sessions.sessions.len(), 3);
    }

    #[test]
    fn role_outside_table_is_insufficient() {
        let (gate, email) = gate_with(Role::Officer, 60);
        let s = gate.login(&email, "pw", Role::Officer).unwrap();
        assert_eq!(
            gate.authorize(s.token(), Action::AddInference),
            Decision::Deny(DenyReason::InsufficientRole)
        );
        let err = gate.require(s.token(), Action::AddInference).unwrap_err();
        assert!(matches!(
            err,
            CustodyError::Authorization {
                action: Action::AddInference,
                role: Role::Officer
            }
        ));
    }

    #[test]
    fn deactivation_applies_mid_session() {
        let (gate, email) = gate_with(Role::Examiner, 60);
        let s = gate.login(&email, "pw", Role::Examiner).unwrap();
        assert!(gate.authorize(s.token(), Action::AddInference).is_allowed());

        gate.users().set_active(&email, false).unwrap();
        // Inactive wins over the role check, even for a permitted action.
        assert_eq!(
            gate.authorize(s.token(), Action::AddInference),
            Decision::Deny(DenyReason::AccountInactive)
        );
        assert_eq!(
            gate.authorize(s.token(), Action::CreateUser),
            Decision::Deny(DenyReason::AccountInactive)
        );

        gate.users().set_active(&email, true).unwrap();
        assert!(gate.authorize(s.token(), Action::AddInference).is_allowed());
    }

    #[test]
    fn logout_revokes() {
        let (gate, email) = gate_with(Role::Officer, 60);
        let s = gate.login(&email, "pw", Role::Officer).unwrap();
        gate.logout(s.token()).unwrap();
        assert_eq!(
            gate.authorize(s.token(), Action::ListComplaints),
            Decision::Deny(DenyReason::NotAuthenticated)
        );
        assert!(gate.logout(s.token()).is_err());
    }

    #[test]
    fn require_returns_caller() {
        let (gate, email) = gate_with(Role::Officer, 60);
        let s = gate.login(&email, "pw", Role::Officer).unwrap();
        let caller = gate.require(s.token(), Action::CreateComplaint).unwrap();
        assert_eq!(caller.email, email);
        assert_eq!(caller.role, Role::Officer);
    }
}
