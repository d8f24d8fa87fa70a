//! # User Directory
//!
//! Operator accounts keyed by [`Email`]. Accounts are created by an Admin and
//! can be deactivated, never deleted. The directory is what the role gate
//! consults on every call, so deactivation takes effect immediately.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use subtle::ConstantTimeEq;

use custody_core::{CustodyError, Email, Role, Timestamp, ValidationError};

/// An opaque credential reference. Never printed.
#[derive(Clone)]
pub struct Credential(String);

impl Credential {
    /// Wrap a credential reference. Blank values are rejected.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "credential",
            });
        }
        Ok(Self(value))
    }

    /// Compare against a presented credential in constant time.
    pub fn verify(&self, presented: &str) -> bool {
        let presented = presented.as_bytes();
        let expected = self.0.as_bytes();
        if presented.len() != expected.len() {
            // Keep the work done independent of where the lengths differ.
            let _ = expected.ct_eq(expected);
            return false;
        }
        presented.ct_eq(expected).into()
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential([REDACTED])")
    }
}

/// An operator account.
#[derive(Debug, Clone)]
pub struct User {
    /// Login and unique key.
    pub email: Email,
    /// Fixed at creation.
    pub role: Role,
    /// Inactive users are denied on every call.
    pub active: bool,
    /// When the account was created.
    pub created_at: Timestamp,
    credential: Credential,
}

/// Input to [`UserDirectory::create`].
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Login and unique key.
    pub email: Email,
    /// Role to assign.
    pub role: Role,
    /// Credential reference the user logs in with.
    pub credential: Credential,
    /// Whether the account starts active.
    pub active: bool,
}

/// Concurrent store of operator accounts.
#[derive(Debug, Default)]
pub struct UserDirectory {
    users: DashMap<Email, User>,
}

impl UserDirectory {
    /// An empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an account. Fails with `DuplicateUser` if the email is taken.
    pub fn create(&self, new: NewUser, now: Timestamp) -> Result<User, CustodyError> {
        match self.users.entry(new.email.clone()) {
            Entry::Occupied(_) => Err(CustodyError::DuplicateUser(new.email)),
            Entry::Vacant(slot) => {
                let user = User {
                    email: new.email,
                    role: new.role,
                    active: new.active,
                    created_at: now,
                    credential: new.credential,
                };
                slot.insert(user.clone());
                Ok(user)
            }
        }
    }

    /// Activate or deactivate an account.
    pub fn set_active(&self, email: &Email, active: bool) -> Result<User, CustodyError> {
        let mut user = self
            .users
            .get_mut(email)
            .ok_or_else(|| CustodyError::UserNotFound(email.clone()))?;
        user.active = active;
        Ok(user.clone())
    }

    /// Look up an account.
    pub fn get(&self, email: &Email) -> Option<User> {
        self.users.get(email).map(|u| u.clone())
    }

    /// Check a login attempt. Every failure is the same `InvalidCredentials`.
    pub fn verify_login(
        &self,
        email: &Email,
        presented: &str,
        role: Role,
    ) -> Result<User, CustodyError> {
        let user = self.get(email).ok_or(CustodyError::InvalidCredentials)?;
        let credential_ok = user.credential.verify(presented);
        if !credential_ok || user.role != role || !user.active {
            return Err(CustodyError::InvalidCredentials);
        }
        Ok(user)
    }

    /// Number of accounts.
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Whether the directory has no accounts.
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}
