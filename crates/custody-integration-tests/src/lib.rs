//! Cross-crate integration tests for the evidence custody stack.
//!
//! The tests live under `tests/`:
//!
//! - `role_matrix.rs`: every action against every role, through the service.
//! - `lifecycle_properties.rs`: random operation sequences against a model.
//! - `journal_replay.rs`: durable journal written by the service and the
//!   HTTP surface, read back and verified with the CLI's checks.
