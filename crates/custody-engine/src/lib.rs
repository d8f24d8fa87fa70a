//! # custody-engine: Evidence Custody Engine
//!
//! The stateful half of the custody stack:
//!
//! - **Role gate** (`gate.rs`, `users.rs`): operator accounts, login sessions,
//!   and the per-call capability check.
//! - **Complaint registry** (`registry.rs`, `complaint.rs`): validated
//!   complaint records keyed by complaint number, with filtered listing.
//! - **Audit log** (`audit.rs`, `journal.rs`): append-only ledger written
//!   through to a durable journal.
//! - **Report compiler** (`report.rs`): immutable report snapshots.
//! - **Lifecycle engine** (`service.rs`): [`CustodyService`], which ties the
//!   above together and is the only way complaint state changes.
//!
//! All synchronization is blocking and short-lived (`parking_lot`, `dashmap`).
//! No lock is ever held across an `.await`; callers in async contexts can call
//! straight into the service.

pub mod audit;
pub mod complaint;
pub mod gate;
pub mod journal;
pub mod registry;
pub mod report;
pub mod service;
pub mod users;

pub use audit::{AuditEntry, AuditLog, AuditQuery};
pub use complaint::{Complaint, ComplaintDraft, Inference, NewComplaint, MAX_EVIDENCE_REFS};
pub use gate::{Caller, RoleGate, Session, DEFAULT_SESSION_TTL_SECS};
pub use journal::{read_journal, AuditJournal, FileJournal, JournalError, NullJournal};
pub use registry::{ComplaintFilter, ComplaintRegistry};
pub use report::{Report, ReportArchive};
pub use service::CustodyService;
pub use users::{Credential, NewUser, User, UserDirectory};
