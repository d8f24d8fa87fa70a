//! # Journal Subcommand
//!
//! Offline inspection of the JSON-lines audit journal written by the custody
//! API (`AUDIT_JOURNAL_PATH`).
//!
//! `verify` replays the journal and reports every entry that could not have
//! been produced by the lifecycle engine:
//!
//! - sequence numbers must run 1, 2, 3, ... without gaps;
//! - timestamps must never decrease;
//! - each complaint's first entry must be `created` into `Submitted`;
//! - every later entry must start where the previous one for that complaint
//!   ended and move along a legal lifecycle edge.

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use custody_core::{ComplaintNo, Email, Timestamp};
use custody_engine::{read_journal, AuditEntry};
use custody_state::{ComplaintState, CREATED_ACTION};

/// Arguments for the `custody journal` subcommand.
#[derive(Args, Debug)]
pub struct JournalArgs {
    #[command(subcommand)]
    pub command: JournalCommand,
}

#[derive(Subcommand, Debug)]
pub enum JournalCommand {
    /// Print entries, oldest first.
    List {
        /// Path to the JSON-lines journal.
        #[arg(value_name = "JOURNAL")]
        path: PathBuf,

        /// Only entries for this complaint number.
        #[arg(long)]
        complaint: Option<String>,

        /// Emit one JSON object per line instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Per-complaint state and entry counts.
    Summary {
        /// Path to the JSON-lines journal.
        #[arg(value_name = "JOURNAL")]
        path: PathBuf,
    },

    /// Check the journal for gaps, reordering, and illegal transitions.
    Verify {
        /// Path to the JSON-lines journal.
        #[arg(value_name = "JOURNAL")]
        path: PathBuf,
    },
}

/// Execute the journal subcommand against stdout.
///
/// Returns exit code: 0 on success, 1 if `verify` finds problems.
pub fn run_journal(args: &JournalArgs) -> Result<u8> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run_journal_to(args, &mut out)
}

/// Execute the journal subcommand, writing to `out`.
pub fn run_journal_to(args: &JournalArgs, out: &mut dyn Write) -> Result<u8> {
    match &args.command {
        JournalCommand::List {
            path,
            complaint,
            json,
        } => {
            let entries = load(path)?;
            let filter = complaint
                .as_deref()
                .map(ComplaintNo::new)
                .transpose()
                .context("invalid --complaint")?;
            list(&entries, filter.as_ref(), *json, out)?;
            Ok(0)
        }
        JournalCommand::Summary { path } => {
            let entries = load(path)?;
            write_summary(&summarize(&entries), entries.len(), out)?;
            Ok(0)
        }
        JournalCommand::Verify { path } => {
            let entries = load(path)?;
            let findings = verify_entries(&entries);
            for f in &findings {
                writeln!(out, "sequence {}: {}", f.sequence, f.problem)?;
            }
            if findings.is_empty() {
                writeln!(out, "ok: {} entries verified", entries.len())?;
                Ok(0)
            } else {
                tracing::warn!(count = findings.len(), "journal verification failed");
                writeln!(out, "FAILED: {} problem(s)", findings.len())?;
                Ok(1)
            }
        }
    }
}

fn load(path: &PathBuf) -> Result<Vec<AuditEntry>> {
    let entries = read_journal(path)
        .with_context(|| format!("failed to read journal: {}", path.display()))?;
    tracing::info!(path = %path.display(), entries = entries.len(), "journal loaded");
    Ok(entries)
}

fn list(
    entries: &[AuditEntry],
    complaint: Option<&ComplaintNo>,
    json: bool,
    out: &mut dyn Write,
) -> Result<()> {
    for e in entries
        .iter()
        .filter(|e| complaint.map_or(true, |c| &e.complaint_no == c))
    {
        if json {
            serde_json::to_writer(&mut *out, e)?;
            writeln!(out)?;
        } else {
            let from = e.from_state.map_or("-", |s| s.as_str());
            writeln!(
                out,
                "{:>6}  {}  {:<12} {:<17} {} -> {}  {} ({})",
                e.sequence,
                e.timestamp,
                e.complaint_no.as_str(),
                e.action,
                from,
                e.to_state,
                e.actor_email,
                e.actor_role
            )?;
        }
    }
    Ok(())
}

/// Where one complaint stands according to the journal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplaintSummary {
    pub complaint_no: ComplaintNo,
    pub state: ComplaintState,
    pub entries: usize,
    pub last_actor: Email,
    pub last_at: Timestamp,
}

/// Summaries in order of each complaint's first entry.
pub fn summarize(entries: &[AuditEntry]) -> Vec<ComplaintSummary> {
    let mut index: HashMap<&ComplaintNo, usize> = HashMap::new();
    let mut out: Vec<ComplaintSummary> = Vec::new();
    for e in entries {
        match index.get(&e.complaint_no) {
            Some(&i) => {
                let s = &mut out[i];
                s.state = e.to_state;
                s.entries += 1;
                s.last_actor = e.actor_email.clone();
                s.last_at = e.timestamp;
            }
            None => {
                index.insert(&e.complaint_no, out.len());
                out.push(ComplaintSummary {
                    complaint_no: e.complaint_no.clone(),
                    state: e.to_state,
                    entries: 1,
                    last_actor: e.actor_email.clone(),
                    last_at: e.timestamp,
                });
            }
        }
    }
    out
}

fn write_summary(summaries: &[ComplaintSummary], total: usize, out: &mut dyn Write) -> Result<()> {
    for s in summaries {
        writeln!(
            out,
            "{:<16} {:<10} entries={} last={} by {}",
            s.complaint_no.as_str(),
            s.state.as_str(),
            s.entries,
            s.last_at,
            s.last_actor
        )?;
    }
    let count = |state: ComplaintState| summaries.iter().filter(|s| s.state == state).count();
    writeln!(
        out,
        "{} complaints, {} entries: {} submitted, {} examined, {} reported",
        summaries.len(),
        total,
        count(ComplaintState::Submitted),
        count(ComplaintState::Examined),
        count(ComplaintState::Reported)
    )?;
    Ok(())
}

/// One problem found by [`verify_entries`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    /// Sequence number of the offending entry.
    pub sequence: u64,
    pub problem: String,
}

/// Replay `entries` and report everything the engine could not have written.
pub fn verify_entries(entries: &[AuditEntry]) -> Vec<Finding> {
    let mut findings = Vec::new();
    let mut last: HashMap<&ComplaintNo, ComplaintState> = HashMap::new();
    let mut prev_at: Option<Timestamp> = None;

    for (i, e) in entries.iter().enumerate() {
        let mut flag = |problem: String| {
            findings.push(Finding {
                sequence: e.sequence,
                problem,
            })
        };

        let expected = i as u64 + 1;
        if e.sequence != expected {
            flag(format!("expected sequence {expected}"));
        }
        if let Some(prev) = prev_at {
            if e.timestamp < prev {
                flag(format!("timestamp {} is earlier than {}", e.timestamp, prev));
            }
        }
        prev_at = Some(e.timestamp);

        match (last.get(&e.complaint_no).copied(), e.from_state) {
            (None, None) => {
                if e.action != CREATED_ACTION || e.to_state != ComplaintState::INITIAL {
                    flag(format!(
                        "{} first entry is {:?} into {}",
                        e.complaint_no, e.action, e.to_state
                    ));
                }
            }
            (None, Some(from)) => {
                flag(format!("{} starts in {} with no creation entry", e.complaint_no, from));
            }
            (Some(current), None) => {
                flag(format!("{} created again while {}", e.complaint_no, current));
            }
            (Some(current), Some(from)) => {
                if from != current {
                    flag(format!(
                        "{} moves from {} but was {}",
                        e.complaint_no, from, current
                    ));
                } else if !current.valid_transitions().contains(&e.to_state) {
                    flag(format!(
                        "{} illegal transition {} -> {}",
                        e.complaint_no, current, e.to_state
                    ));
                }
            }
        }
        last.insert(&e.complaint_no, e.to_state);
    }
    findings
}
