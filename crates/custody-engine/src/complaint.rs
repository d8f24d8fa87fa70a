//! # Complaint Records
//!
//! [`ComplaintDraft`] is the raw, caller-supplied form of a new complaint.
//! [`ComplaintDraft::validate`] checks each field in declared order and stops
//! at the first violation, producing a [`NewComplaint`] whose fields are all
//! typed. The registry turns that into a [`Complaint`] in `Submitted`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use custody_core::{Category, ComplaintNo, Email, Severity, Timestamp, ValidationError};
use custody_state::{ComplaintState, Lifecycle, LifecycleError, LifecycleEvent, TransitionRecord};

/// Maximum evidence references per complaint.
pub const MAX_EVIDENCE_REFS: usize = 10;
/// Maximum length of one evidence reference.
pub const MAX_EVIDENCE_REF_LEN: usize = 2048;
/// Maximum length of `title` and `place`.
pub const MAX_SHORT_TEXT_LEN: usize = 200;
/// Maximum length of the free-text detail fields and the inference.
pub const MAX_LONG_TEXT_LEN: usize = 20_000;

/// Unvalidated complaint input.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComplaintDraft {
    /// Caller-chosen key.
    pub complaint_no: String,
    /// Short title.
    pub title: String,
    /// Incident date, `YYYY-MM-DD`.
    pub date: String,
    /// Where the incident happened.
    pub place: String,
    /// Category name.
    pub category: String,
    /// Severity name; `Medium` when absent.
    pub severity: Option<String>,
    /// Narrative of the complaint.
    pub complaint_details: String,
    /// Description of the evidence; empty when absent.
    pub evidence_details: Option<String>,
    /// Opaque references to captured evidence files.
    pub evidence_refs: Vec<String>,
}

/// A validated complaint ready for registration.
#[derive(Debug, Clone, PartialEq)]
pub struct NewComplaint {
    /// Key.
    pub complaint_no: ComplaintNo,
    /// Short title.
    pub title: String,
    /// Incident date.
    pub date: NaiveDate,
    /// Where the incident happened.
    pub place: String,
    /// Category.
    pub category: Category,
    /// Severity.
    pub severity: Severity,
    /// Narrative.
    pub complaint_details: String,
    /// Evidence description.
    pub evidence_details: String,
    /// Evidence file references.
    pub evidence_refs: Vec<String>,
}

fn required(field: &'static str, value: &str, max: usize) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::MissingField { field });
    }
    bounded(field, value, max)
}

fn bounded(field: &'static str, value: &str, max: usize) -> Result<String, ValidationError> {
    if value.chars().count() > max {
        return Err(ValidationError::FieldTooLong { field, max });
    }
    Ok(value.to_string())
}

impl ComplaintDraft {
    /// Validate every field in declared order.
    pub fn validate(self) -> Result<NewComplaint, ValidationError> {
        let complaint_no = ComplaintNo::new(self.complaint_no)?;
        let title = required("title", &self.title, MAX_SHORT_TEXT_LEN)?;

        let date_raw = self.date.trim();
        if date_raw.is_empty() {
            return Err(ValidationError::MissingField { field: "date" });
        }
        let date = NaiveDate::parse_from_str(date_raw, "%Y-%m-%d")
            .map_err(|_| ValidationError::InvalidDate(date_raw.to_string()))?;

        let place = required("place", &self.place, MAX_SHORT_TEXT_LEN)?;

        if self.category.trim().is_empty() {
            return Err(ValidationError::MissingField { field: "category" });
        }
        let category = Category::parse(&self.category)?;

        let severity = match self.severity.as_deref().map(str::trim) {
            None | Some("") => Severity::default(),
            Some(name) => Severity::parse(name)?,
        };

        let complaint_details =
            required("complaint_details", &self.complaint_details, MAX_LONG_TEXT_LEN)?;
        let evidence_details = bounded(
            "evidence_details",
            self.evidence_details.as_deref().unwrap_or_default().trim(),
            MAX_LONG_TEXT_LEN,
        )?;

        if self.evidence_refs.len() > MAX_EVIDENCE_REFS {
            return Err(ValidationError::TooManyEvidenceRefs {
                count: self.evidence_refs.len(),
                max: MAX_EVIDENCE_REFS,
            });
        }
        for (index, r) in self.evidence_refs.iter().enumerate() {
            if r.trim().is_empty() || r.chars().count() > MAX_EVIDENCE_REF_LEN {
                return Err(ValidationError::InvalidEvidenceRef {
                    index,
                    max: MAX_EVIDENCE_REF_LEN,
                });
            }
        }

        Ok(NewComplaint {
            complaint_no,
            title,
            date,
            place,
            category,
            severity,
            complaint_details,
            evidence_details,
            evidence_refs: self.evidence_refs,
        })
    }
}

/// The examiner's finding, recorded once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inference {
    /// The finding.
    pub text: String,
    /// Examiner who recorded it.
    pub examiner: Email,
    /// When it was recorded.
    pub recorded_at: Timestamp,
}

/// A complaint as held by the registry.
///
/// Values handed out by the registry are snapshots; changing one has no effect
/// on the stored record. The lifecycle is private so state only moves through
/// the engine's transitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Complaint {
    /// Immutable key.
    pub complaint_no: ComplaintNo,
    /// Short title.
    pub title: String,
    /// Incident date.
    pub date: NaiveDate,
    /// Where the incident happened.
    pub place: String,
    /// Category.
    pub category: Category,
    /// Severity.
    pub severity: Severity,
    /// Narrative.
    pub complaint_details: String,
    /// Evidence description.
    pub evidence_details: String,
    /// Evidence file references, in submission order.
    pub evidence_refs: Vec<String>,
    /// Examiner's finding, once recorded.
    pub inference: Option<Inference>,
    /// When the complaint was filed.
    pub created_at: Timestamp,
    /// Officer who filed it.
    pub created_by: Email,
    /// When the report was generated.
    pub reported_at: Option<Timestamp>,
    lifecycle: Lifecycle,
}

impl Complaint {
    pub(crate) fn from_new(new: NewComplaint, created_by: Email, created_at: Timestamp) -> Self {
        Self {
            complaint_no: new.complaint_no,
            title: new.title,
            date: new.date,
            place: new.place,
            category: new.category,
            severity: new.severity,
            complaint_details: new.complaint_details,
            evidence_details: new.evidence_details,
            evidence_refs: new.evidence_refs,
            inference: None,
            created_at,
            created_by,
            reported_at: None,
            lifecycle: Lifecycle::new(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ComplaintState {
        self.lifecycle.state()
    }

    /// Accepted transitions, oldest first.
    pub fn transitions(&self) -> &[TransitionRecord] {
        self.lifecycle.transitions()
    }

    pub(crate) fn check(&self, event: LifecycleEvent) -> Result<ComplaintState, LifecycleError> {
        self.lifecycle.check(event)
    }

    /// Apply a lifecycle event and the field changes that go with it.
    pub(crate) fn apply(
        &mut self,
        event: LifecycleEvent,
        actor: &Email,
        at: Timestamp,
        inference_text: Option<String>,
    ) -> Result<(), LifecycleError> {
        self.lifecycle.advance(event, actor.clone(), at)?;
        match event {
            LifecycleEvent::AddInference => {
                self.inference = Some(Inference {
                    text: inference_text.unwrap_or_default(),
                    examiner: actor.clone(),
                    recorded_at: at,
                });
            }
            LifecycleEvent::Finalize => self.reported_at = Some(at),
        }
        Ok(())
    }
}
