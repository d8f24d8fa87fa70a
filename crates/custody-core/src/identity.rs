//! # Identity Newtypes
//!
//! Domain-primitive newtypes for the two natural keys of the custody stack.
//! Each identifier is a distinct type; you cannot pass an [`Email`] where a
//! [`ComplaintNo`] is expected.
//!
//! ## Validation
//!
//! Both types validate format at construction time and on deserialization, so
//! an instance in hand is always well-formed.
//!
//! - [`ComplaintNo`]: caller-supplied case number, ASCII alphanumeric plus
//!   hyphen, 1-64 characters (e.g. `CMP-001`).
//! - [`Email`]: operator login, normalized to lowercase, `local@domain` with a
//!   dotted domain, at most 254 characters.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

// ---------------------------------------------------------------------------
// ComplaintNo
// ---------------------------------------------------------------------------

/// The immutable, caller-supplied key of a complaint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ComplaintNo(String);

impl ComplaintNo {
    /// Maximum length of a complaint number.
    pub const MAX_LEN: usize = 64;

    /// Create a complaint number, validating its format.
    ///
    /// Leading and trailing whitespace is trimmed before validation.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingField`] for blank input and
    /// [`ValidationError::InvalidComplaintNo`] for anything that is not
    /// 1-64 ASCII alphanumeric or hyphen characters.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::MissingField {
                field: "complaint_no",
            });
        }
        if trimmed.len() > Self::MAX_LEN
            || !trimmed
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(ValidationError::InvalidComplaintNo(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Access the complaint number as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ComplaintNo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ComplaintNo {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ComplaintNo> for String {
    fn from(value: ComplaintNo) -> Self {
        value.0
    }
}

impl std::str::FromStr for ComplaintNo {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

// ---------------------------------------------------------------------------
// Email
// ---------------------------------------------------------------------------

/// An operator's email address, the unique key of a user account.
///
/// Stored lowercase so that `Officer@Example.org` and `officer@example.org`
/// name the same account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Maximum length of an email address (RFC 5321 path limit).
    pub const MAX_LEN: usize = 254;

    /// Create an email address, validating and normalizing it.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingField`] for blank input and
    /// [`ValidationError::InvalidEmail`] when the address lacks a local part,
    /// a dotted domain, contains whitespace, or exceeds 254 characters.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::MissingField { field: "email" });
        }
        let normalized = trimmed.to_ascii_lowercase();
        if Self::is_well_formed(&normalized) {
            Ok(Self(normalized))
        } else {
            Err(ValidationError::InvalidEmail(trimmed.to_string()))
        }
    }

    fn is_well_formed(s: &str) -> bool {
        if s.len() > Self::MAX_LEN || s.chars().any(char::is_whitespace) {
            return false;
        }
        let mut parts = s.splitn(2, '@');
        let local = parts.next().unwrap_or_default();
        let domain = match parts.next() {
            Some(d) => d,
            None => return false,
        };
        !local.is_empty()
            && !domain.contains('@')
            && domain.contains('.')
            && !domain.starts_with('.')
            && !domain.ends_with('.')
    }

    /// Access the email address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Email {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Email> for String {
    fn from(value: Email) -> Self {
        value.0
    }
}

impl std::str::FromStr for Email {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
