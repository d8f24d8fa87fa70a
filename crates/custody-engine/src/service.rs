//! # Custody Service
//!
//! The lifecycle engine. Every public operation follows the same path:
//!
//! 1. the role gate resolves the session and checks the capability table;
//! 2. the complaint's guard is taken;
//! 3. the lifecycle checks the transition;
//! 4. the audit entry is appended (journal first);
//! 5. the record is mutated.
//!
//! Steps 3 to 5 run under the per-complaint guard, so a failure at any step
//! leaves the complaint and the log exactly as they were, and two concurrent
//! calls on the same complaint cannot both pass step 3.

use std::sync::Arc;

use custody_core::{
    Action, ComplaintNo, CustodyError, Email, Role, Timestamp, ValidationError,
};
use custody_state::{ComplaintState, LifecycleEvent, CREATED_ACTION};

use crate::audit::{AuditEntry, AuditEvent, AuditLog, AuditQuery};
use crate::complaint::{Complaint, ComplaintDraft, MAX_LONG_TEXT_LEN};
use crate::gate::{Caller, RoleGate, Session, DEFAULT_SESSION_TTL_SECS};
use crate::journal::{AuditJournal, JournalError, NullJournal};
use crate::registry::{ComplaintFilter, ComplaintRegistry};
use crate::report::{Report, ReportArchive};
use crate::users::{Credential, NewUser, User, UserDirectory};

fn record_transition(to: ComplaintState) {
    metrics::counter!("custody_transitions_total", "to" => to.as_str()).increment(1);
}

/// A request body may name the actor; it must be the caller.
fn ensure_actor(caller: &Caller, claimed: Option<&Email>) -> Result<(), CustodyError> {
    match claimed {
        Some(claimed) if *claimed != caller.email => Err(ValidationError::ActorMismatch {
            claimed: claimed.to_string(),
        }
        .into()),
        _ => Ok(()),
    }
}

/// Orchestrates the role gate, registry, audit log, and report archive.
#[derive(Debug)]
pub struct CustodyService {
    gate: RoleGate,
    registry: ComplaintRegistry,
    audit: AuditLog,
    reports: ReportArchive,
}

impl CustodyService {
    /// A service journaling to `journal` and issuing sessions that live for
    /// `session_ttl_secs`.
    pub fn new(journal: Arc<dyn AuditJournal>, session_ttl_secs: i64) -> Self {
        Self {
            gate: RoleGate::new(Arc::new(UserDirectory::new()), session_ttl_secs),
            registry: ComplaintRegistry::new(),
            audit: AuditLog::new(journal),
            reports: ReportArchive::new(),
        }
    }

    /// A service resuming after `history`, the entries a previous run wrote
    /// to `journal`. The audit log continues the sequence, and every
    /// complaint number in the history stays taken. Complaint records
    /// themselves are not recovered.
    pub fn from_history(
        journal: Arc<dyn AuditJournal>,
        history: Vec<AuditEntry>,
        session_ttl_secs: i64,
    ) -> Result<Self, JournalError> {
        let retired: Vec<ComplaintNo> = history.iter().map(|e| e.complaint_no.clone()).collect();
        let audit = AuditLog::with_history(journal, history)?;
        tracing::info!(entries = audit.len(), "audit history restored");
        Ok(Self {
            gate: RoleGate::new(Arc::new(UserDirectory::new()), session_ttl_secs),
            registry: ComplaintRegistry::with_retired(retired),
            audit,
            reports: ReportArchive::new(),
        })
    }

    /// A service with no durable journal and the default session lifetime.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(NullJournal), DEFAULT_SESSION_TTL_SECS)
    }

    /// The role gate.
    pub fn gate(&self) -> &RoleGate {
        &self.gate
    }

    /// The audit log, for callers that already hold a capability check.
    pub fn audit_log(&self) -> &AuditLog {
        &self.audit
    }

    /// Number of registered complaints.
    pub fn complaint_count(&self) -> usize {
        self.registry.len()
    }

    // ── Identity ─────────────────────────────────────────────────────

    /// Seed an Admin account without a session. A no-op if the email exists.
    pub fn bootstrap_admin(&self, email: Email, credential: Credential) -> Result<(), CustodyError> {
        let new = NewUser {
            email,
            role: Role::Admin,
            credential,
            active: true,
        };
        match self.gate.users().create(new, Timestamp::now()) {
            Ok(user) => {
                tracing::info!(email = %user.email, "bootstrap admin created");
                Ok(())
            }
            Err(CustodyError::DuplicateUser(email)) => {
                tracing::debug!(email = %email, "bootstrap admin already present");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Log in and receive a session.
    pub fn login(&self, email: &Email, credential: &str, role: Role) -> Result<Session, CustodyError> {
        self.gate.login(email, credential, role)
    }

    /// Revoke the caller's session.
    pub fn logout(&self, token: &str) -> Result<(), CustodyError> {
        self.gate.logout(token)
    }

    /// Create an operator account. Admin only.
    pub fn create_user(&self, token: &str, new: NewUser) -> Result<User, CustodyError> {
        let caller = self.gate.require(token, Action::CreateUser)?;
        let user = self.gate.users().create(new, Timestamp::now())?;
        tracing::info!(
            actor = %caller.email,
            email = %user.email,
            role = %user.role,
            active = user.active,
            "user created"
        );
        Ok(user)
    }

    /// Activate or deactivate an account. Admin only.
    pub fn set_user_status(
        &self,
        token: &str,
        email: &Email,
        active: bool,
    ) -> Result<User, CustodyError> {
        let caller = self.gate.require(token, Action::SetUserStatus)?;
        let user = self.gate.users().set_active(email, active)?;
        tracing::info!(actor = %caller.email, email = %user.email, active, "user status changed");
        Ok(user)
    }

    // ── Complaints ───────────────────────────────────────────────────

    /// File a complaint in `Submitted`. Officer only.
    pub fn submit(&self, token: &str, draft: ComplaintDraft) -> Result<Complaint, CustodyError> {
        let caller = self.gate.require(token, Action::CreateComplaint)?;
        let new = draft.validate()?;
        let now = Timestamp::now();
        let complaint = Complaint::from_new(new, caller.email.clone(), now);
        let created = self.registry.create(complaint, |c, publish| {
            self.audit
                .append_with(
                    AuditEvent {
                        complaint_no: c.complaint_no.clone(),
                        actor_email: caller.email.clone(),
                        actor_role: caller.role,
                        action: CREATED_ACTION,
                        from_state: None,
                        to_state: ComplaintState::INITIAL,
                    },
                    now,
                    publish,
                )
                .map(|_| ())
        })?;
        record_transition(ComplaintState::INITIAL);
        tracing::info!(
            complaint_no = %created.complaint_no,
            actor = %caller.email,
            action = CREATED_ACTION,
            "complaint submitted"
        );
        Ok(created)
    }

    /// One complaint.
    pub fn get(&self, token: &str, complaint_no: &ComplaintNo) -> Result<Complaint, CustodyError> {
        self.gate.require(token, Action::ViewComplaint)?;
        self.registry
            .get(complaint_no)
            .ok_or_else(|| CustodyError::ComplaintNotFound(complaint_no.clone()))
    }

    /// Complaints matching `filter`, in insertion order.
    pub fn list(&self, token: &str, filter: &ComplaintFilter) -> Result<Vec<Complaint>, CustodyError> {
        self.gate.require(token, Action::ListComplaints)?;
        Ok(self.registry.list(filter))
    }

    /// Record the examiner's inference (`Submitted → Examined`). Examiner only.
    ///
    /// Checked in order: authorization, existence, state, blank text. A second
    /// call on the same complaint always fails with an invalid-state error.
    pub fn add_inference(
        &self,
        token: &str,
        complaint_no: &ComplaintNo,
        text: &str,
        claimed_actor: Option<&Email>,
    ) -> Result<Complaint, CustodyError> {
        let caller = self.gate.require(token, Action::AddInference)?;
        ensure_actor(&caller, claimed_actor)?;
        let slot = self
            .registry
            .slot(complaint_no)
            .ok_or_else(|| CustodyError::ComplaintNotFound(complaint_no.clone()))?;
        let mut complaint = slot.lock();

        let event = LifecycleEvent::AddInference;
        let from = complaint.state();
        let to = complaint
            .check(event)
            .map_err(|e| e.for_complaint(complaint_no))?;

        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyInference.into());
        }
        if text.chars().count() > MAX_LONG_TEXT_LEN {
            return Err(ValidationError::FieldTooLong {
                field: "inference",
                max: MAX_LONG_TEXT_LEN,
            }
            .into());
        }

        let entry = self.audit.append(
            AuditEvent {
                complaint_no: complaint_no.clone(),
                actor_email: caller.email.clone(),
                actor_role: caller.role,
                action: event.audit_action(),
                from_state: Some(from),
                to_state: to,
            },
            Timestamp::now(),
        )?;
        complaint
            .apply(event, &caller.email, entry.timestamp, Some(text.to_string()))
            .map_err(|e| e.for_complaint(complaint_no))?;

        record_transition(to);
        tracing::info!(
            complaint_no = %complaint_no,
            actor = %caller.email,
            action = event.audit_action(),
            "inference recorded"
        );
        Ok(complaint.clone())
    }

    /// Finalize an examined complaint and compile its report
    /// (`Examined → Reported`). Examiner or HeadInvestigator.
    ///
    /// The transition, audit entry, and archived report are produced under
    /// the complaint's guard. Calling this again fails with an invalid-state
    /// error; use [`get_report`](Self::get_report) to fetch the archived copy.
    pub fn generate_report(
        &self,
        token: &str,
        complaint_no: &ComplaintNo,
        claimed_actor: Option<&Email>,
    ) -> Result<Report, CustodyError> {
        let caller = self.gate.require(token, Action::GenerateReport)?;
        ensure_actor(&caller, claimed_actor)?;
        let slot = self
            .registry
            .slot(complaint_no)
            .ok_or_else(|| CustodyError::ComplaintNotFound(complaint_no.clone()))?;
        let mut complaint = slot.lock();

        let at = self.finalize(&mut complaint, &caller)?;
        let report = Report::compile(complaint.clone(), caller.email.clone(), at);
        self.reports.store(report.clone());

        tracing::info!(
            complaint_no = %complaint_no,
            actor = %caller.email,
            report_id = report.report_id(),
            "report generated"
        );
        Ok(report)
    }

    /// The `Examined → Reported` step. Must be called with the guard held.
    fn finalize(&self, complaint: &mut Complaint, caller: &Caller) -> Result<Timestamp, CustodyError> {
        let event = LifecycleEvent::Finalize;
        let complaint_no = complaint.complaint_no.clone();
        let from = complaint.state();
        let to = complaint
            .check(event)
            .map_err(|e| e.for_complaint(&complaint_no))?;
        let entry = self.audit.append(
            AuditEvent {
                complaint_no: complaint_no.clone(),
                actor_email: caller.email.clone(),
                actor_role: caller.role,
                action: event.audit_action(),
                from_state: Some(from),
                to_state: to,
            },
            Timestamp::now(),
        )?;
        complaint
            .apply(event, &caller.email, entry.timestamp, None)
            .map_err(|e| e.for_complaint(&complaint_no))?;
        record_transition(to);
        Ok(entry.timestamp)
    }

    /// The archived report of a complaint. Requires `ViewComplaint`.
    pub fn get_report(&self, token: &str, complaint_no: &ComplaintNo) -> Result<Report, CustodyError> {
        self.gate.require(token, Action::ViewComplaint)?;
        if self.registry.get(complaint_no).is_none() {
            return Err(CustodyError::ComplaintNotFound(complaint_no.clone()));
        }
        self.reports
            .get(complaint_no)
            .ok_or_else(|| CustodyError::ReportNotFound(complaint_no.clone()))
    }

    // ── Audit ────────────────────────────────────────────────────────

    /// Audit entries for one complaint, or all of them, oldest first.
    pub fn query_audit(
        &self,
        token: &str,
        complaint_no: Option<&ComplaintNo>,
    ) -> Result<AuditQuery<'_>, CustodyError> {
        self.gate.require(token, Action::ViewAuditLog)?;
        Ok(self.audit.query(complaint_no))
    }
}

impl Default for CustodyService {
    fn default() -> Self {
        Self::in_memory()
    }
}
