//! # custody-cli: Evidence Custody Operator CLI
//!
//! Offline tooling for operators. Nothing here talks to a running server;
//! every subcommand works on files or on the static capability table.
//!
//! ## Subcommands
//!
//! - `journal list`: print audit journal entries, optionally for one complaint
//! - `journal summary`: per-complaint state and entry counts
//! - `journal verify`: check sequence continuity, timestamp order, and that
//!   every recorded transition is a legal lifecycle step
//! - `capabilities`: print the role/action capability table
//!
//! Handlers return an exit code: 0 on success, 1 when a check fails.
//! Operational errors (unreadable file, bad JSON) surface as `Err` and the
//! binary exits with 2.

pub mod capabilities;
pub mod journal;
