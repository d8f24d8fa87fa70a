//! # API Route Modules
//!
//! - `sessions`: login and logout.
//! - `users`: operator account administration.
//! - `complaints`: filing, listing, and the examiner's inference.
//! - `reports`: finalization and archived reports.
//! - `audit`: audit log queries.

pub mod audit;
pub mod complaints;
pub mod reports;
pub mod sessions;
pub mod users;
