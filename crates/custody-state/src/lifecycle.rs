//! # Complaint Lifecycle State Machine
//!
//! ```text
//! Submitted ──(add inference)──▶ Examined ──(generate report)──▶ Reported
//! ```
//!
//! Strictly linear and non-cyclic. `Reported` is terminal. Every accepted
//! transition is appended to the lifecycle's transition log together with the
//! acting operator and the time it took effect.
//!
//! ## Design Decision
//!
//! Three states with a single path do not justify typestate types: complaints
//! live in a concurrent registry and are addressed by key at runtime, so the
//! state must be a value. The enum with `transition()` returning `Result`
//! rejects illegal moves, and the transition table lives in one `match`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use custody_core::{ComplaintNo, CustodyError, Email, Timestamp, ValidationError};

// ─── State ───────────────────────────────────────────────────────────

/// The custody state of a complaint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ComplaintState {
    /// Filed by an officer, awaiting examination.
    Submitted,
    /// Examiner's inference recorded.
    Examined,
    /// Report generated. Terminal.
    Reported,
}

impl ComplaintState {
    /// The state every new complaint starts in.
    pub const INITIAL: ComplaintState = ComplaintState::Submitted;

    /// All states in lifecycle order.
    pub const ALL: [ComplaintState; 3] = [Self::Submitted, Self::Examined, Self::Reported];

    /// States reachable from this one in a single transition.
    pub fn valid_transitions(&self) -> &'static [ComplaintState] {
        match self {
            Self::Submitted => &[Self::Examined],
            Self::Examined => &[Self::Reported],
            Self::Reported => &[],
        }
    }

    /// Whether no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }

    /// Canonical name of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "Submitted",
            Self::Examined => "Examined",
            Self::Reported => "Reported",
        }
    }

    /// Apply `event` to this state, returning the resulting state.
    pub fn transition(self, event: LifecycleEvent) -> Result<ComplaintState, LifecycleError> {
        if self != event.required_state() {
            return Err(LifecycleError::InvalidTransition { from: self, event });
        }
        Ok(event.target_state())
    }
}

impl std::fmt::Display for ComplaintState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ComplaintState {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|st| st.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ValidationError::UnknownState(s.to_string()))
    }
}

// ─── Events ──────────────────────────────────────────────────────────

/// A request to advance a complaint's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// Examiner attaches an inference (`Submitted → Examined`).
    AddInference,
    /// Report generation freezes the complaint (`Examined → Reported`).
    Finalize,
}

impl LifecycleEvent {
    /// The only state this event may be applied in.
    pub fn required_state(&self) -> ComplaintState {
        match self {
            Self::AddInference => ComplaintState::Submitted,
            Self::Finalize => ComplaintState::Examined,
        }
    }

    /// The state this event moves a complaint into.
    pub fn target_state(&self) -> ComplaintState {
        match self {
            Self::AddInference => ComplaintState::Examined,
            Self::Finalize => ComplaintState::Reported,
        }
    }

    /// The action recorded in the audit log when this event is accepted.
    pub fn audit_action(&self) -> &'static str {
        match self {
            Self::AddInference => "inference added",
            Self::Finalize => "report generated",
        }
    }

    /// Imperative phrase used in error messages.
    pub fn verb(&self) -> &'static str {
        match self {
            Self::AddInference => "add inference",
            Self::Finalize => "generate report",
        }
    }
}

impl std::fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.verb())
    }
}

/// Audit action recorded when a complaint is first filed.
pub const CREATED_ACTION: &str = "created";

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors raised by the lifecycle state machine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    /// The event is not legal from the current state.
    #[error("cannot {event} from state {from}")]
    InvalidTransition {
        /// State the complaint was in.
        from: ComplaintState,
        /// Event that was attempted.
        event: LifecycleEvent,
    },
}

impl LifecycleError {
    /// Attach the complaint number and lift into the stack-wide error.
    pub fn for_complaint(self, complaint_no: &ComplaintNo) -> CustodyError {
        match self {
            Self::InvalidTransition { from, event } => CustodyError::InvalidState {
                complaint_no: complaint_no.clone(),
                current: from.to_string(),
                attempted: event.verb(),
            },
        }
    }
}

// ─── Transition Log ──────────────────────────────────────────────────

/// Record of one accepted state transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// State before the transition.
    pub from_state: ComplaintState,
    /// State after the transition.
    pub to_state: ComplaintState,
    /// When the transition took effect.
    pub timestamp: Timestamp,
    /// Operator who caused it.
    pub actor: Email,
}

/// A complaint's current state together with its transition history.
///
/// The only way to change the state is [`Lifecycle::advance`], which validates
/// the event and appends a [`TransitionRecord`] in the same step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifecycle {
    state: ComplaintState,
    transitions: Vec<TransitionRecord>,
}

impl Lifecycle {
    /// A fresh lifecycle in [`ComplaintState::INITIAL`].
    pub fn new() -> Self {
        Self {
            state: ComplaintState::INITIAL,
            transitions: Vec::new(),
        }
    }

    /// Current state.
    pub fn state(&self) -> ComplaintState {
        self.state
    }

    /// Ordered log of accepted transitions.
    pub fn transitions(&self) -> &[TransitionRecord] {
        &self.transitions
    }

    /// Check that `event` would be accepted, without applying it.
    pub fn check(&self, event: LifecycleEvent) -> Result<ComplaintState, LifecycleError> {
        self.state.transition(event)
    }

    /// Apply `event`, recording `actor` and `at` in the transition log.
    pub fn advance(
        &mut self,
        event: LifecycleEvent,
        actor: Email,
        at: Timestamp,
    ) -> Result<&TransitionRecord, LifecycleError> {
        let next = self.check(event)?;
        let record = TransitionRecord {
            from_state: self.state,
            to_state: next,
            timestamp: at,
            actor,
        };
        self.state = next;
        self.transitions.push(record);
        Ok(&self.transitions[self.transitions.len() - 1])
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
