#![deny(missing_docs)]

//! # custody-core: Foundational Types for the Evidence Custody Stack
//!
//! Every other crate in the workspace depends on this one. It has no internal
//! crate dependencies, only `serde`, `thiserror`, and `chrono`.
//!
//! ## Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** A [`ComplaintNo`] cannot be passed
//!    where an [`Email`] is expected, and both validate their format at
//!    construction time.
//!
//! 2. **One capability table.** [`Action::allowed_roles`] is the single place
//!    that decides which [`Role`] may perform which operation. Nothing else in
//!    the stack compares roles directly.
//!
//! 3. **[`CustodyError`] hierarchy.** Structured errors with `thiserror`. Every
//!    variant belongs to exactly one [`ErrorKind`], which is what the boundary
//!    layer maps to caller-facing signals.

pub mod capability;
pub mod domain;
pub mod error;
pub mod identity;
pub mod temporal;

pub use capability::{Action, Decision, DenyReason, Role};
pub use domain::{Category, Severity};
pub use error::{CustodyError, ErrorKind, ValidationError};
pub use identity::{ComplaintNo, Email};
pub use temporal::Timestamp;
