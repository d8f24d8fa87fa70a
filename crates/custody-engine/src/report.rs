//! # Report Compiler
//!
//! Turns a finalized complaint into an immutable [`Report`]: a frozen snapshot
//! of the complaint plus a deterministic plain-text body for downstream
//! rendering. Reports are archived by complaint number.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use custody_core::{ComplaintNo, Email, Timestamp};

use crate::complaint::Complaint;

/// A generated report. Read-only once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    report_id: String,
    complaint: Complaint,
    generated_at: Timestamp,
    generated_by: Email,
    body: String,
}

impl Report {
    pub(crate) fn compile(complaint: Complaint, generated_by: Email, generated_at: Timestamp) -> Self {
        let report_id = format!(
            "REP-{}-{}",
            generated_at.to_compact_string(),
            complaint.complaint_no
        );
        let mut body = String::new();
        // Writing into a String cannot fail.
        let _ = render_body(&mut body, &report_id, &complaint, &generated_by, generated_at);
        Self {
            report_id,
            complaint,
            generated_at,
            generated_by,
            body,
        }
    }

    /// `REP-{YYYYMMDDHHMMSS}-{complaint_no}`.
    pub fn report_id(&self) -> &str {
        &self.report_id
    }

    /// The complaint as it stood when finalized.
    pub fn complaint(&self) -> &Complaint {
        &self.complaint
    }

    /// When the report was generated.
    pub fn generated_at(&self) -> Timestamp {
        self.generated_at
    }

    /// Who generated it.
    pub fn generated_by(&self) -> &Email {
        &self.generated_by
    }

    /// Examiner who recorded the inference.
    pub fn examiner(&self) -> Option<&Email> {
        self.complaint.inference.as_ref().map(|i| &i.examiner)
    }

    /// Plain-text body.
    pub fn body(&self) -> &str {
        &self.body
    }
}

fn or_placeholder<'a>(text: &'a str, placeholder: &'a str) -> &'a str {
    if text.trim().is_empty() {
        placeholder
    } else {
        text
    }
}

fn render_body(
    out: &mut String,
    report_id: &str,
    c: &Complaint,
    generated_by: &Email,
    generated_at: Timestamp,
) -> std::fmt::Result {
    use std::fmt::Write;

    writeln!(out, "EVIDENCE CUSTODY REPORT")?;
    writeln!(out, "Report ID: {report_id}")?;
    writeln!(out, "Generated: {generated_at} by {generated_by}")?;
    writeln!(out)?;

    writeln!(out, "1. Case Summary")?;
    writeln!(out, "Complaint No: {}", c.complaint_no)?;
    writeln!(out, "Title: {}", c.title)?;
    writeln!(out, "Date: {}", c.date.format("%Y-%m-%d"))?;
    writeln!(out, "Location: {}", c.place)?;
    writeln!(out, "Category: {}", c.category)?;
    writeln!(out, "Severity: {}", c.severity)?;
    writeln!(out, "Filed by: {} on {}", c.created_by, c.created_at)?;
    writeln!(out, "Complaint Details:")?;
    writeln!(out, "{}", or_placeholder(&c.complaint_details, "No details provided"))?;
    writeln!(out)?;

    writeln!(out, "2. Evidence Analysis")?;
    writeln!(out, "Evidence Details:")?;
    writeln!(
        out,
        "{}",
        or_placeholder(&c.evidence_details, "No evidence details provided")
    )?;
    writeln!(out, "Evidence Files ({}):", c.evidence_refs.len())?;
    for (i, r) in c.evidence_refs.iter().enumerate() {
        writeln!(out, "  {}. {}", i + 1, r)?;
    }
    writeln!(out)?;

    writeln!(out, "3. Examiner's Inference")?;
    match &c.inference {
        Some(inf) => {
            writeln!(out, "Examiner: {} on {}", inf.examiner, inf.recorded_at)?;
            writeln!(out, "{}", inf.text)?;
        }
        None => {
            writeln!(out, "No inference provided")?;
        }
    }
    writeln!(out)?;

    writeln!(out, "4. Conclusion")?;
    let examiner = c
        .inference
        .as_ref()
        .map_or_else(|| "an unrecorded examiner".to_string(), |i| i.examiner.to_string());
    writeln!(
        out,
        "Complaint {} was examined by {} and finalized by {} on {}. Custody status: {}.",
        c.complaint_no,
        examiner,
        generated_by,
        generated_at,
        c.state()
    )
}

/// Generated reports keyed by complaint number.
#[derive(Debug, Default)]
pub struct ReportArchive {
    reports: DashMap<ComplaintNo, Report>,
}

impl ReportArchive {
    /// An empty archive.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn store(&self, report: Report) {
        self.reports.insert(report.complaint.complaint_no.clone(), report);
    }

    /// The archived report for a complaint.
    pub fn get(&self, complaint_no: &ComplaintNo) -> Option<Report> {
        self.reports.get(complaint_no).map(|r| r.clone())
    }

    /// Number of archived reports.
    pub fn len(&self) -> usize {
        self.reports.len()
    }

    /// Whether nothing has been archived.
    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }
}
