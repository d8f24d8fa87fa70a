//! # custody-state: Complaint Lifecycle
//!
//! The state machine that drives a complaint from submission through
//! examination to a finalized report:
//!
//! `Submitted → Examined → Reported`
//!
//! The machine is a pure value type with no storage or locking. The engine
//! crate embeds a [`Lifecycle`] in every complaint record and calls
//! [`Lifecycle::advance`] under the complaint's guard.

pub mod lifecycle;

pub use lifecycle::{
    ComplaintState, Lifecycle, LifecycleError, LifecycleEvent, TransitionRecord, CREATED_ACTION,
};
