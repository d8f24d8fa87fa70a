//! # Audit Log
//!
//! Append-only ledger of every accepted action. Each entry gets a gap-free
//! `sequence` and a timestamp clamped to be no earlier than the previous
//! entry's, so insertion order and timestamp order always agree.
//!
//! Appends go to the [`AuditJournal`] first. If the journal refuses, the
//! append fails with a storage error and the in-memory log is unchanged.
//!
//! ## Locking
//!
//! Appends serialize on a small sequencer mutex that owns the next sequence
//! number and the last timestamp. The journal write (including its fsync)
//! happens under the sequencer only; the entry list is write-locked just long
//! enough to push, so readers are never stalled behind disk I/O.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use custody_core::{ComplaintNo, CustodyError, Email, Role, Timestamp};
use custody_state::ComplaintState;

use crate::journal::{AuditJournal, JournalError};

/// An action about to be logged.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    /// Complaint acted on.
    pub complaint_no: ComplaintNo,
    /// Who acted.
    pub actor_email: Email,
    /// In which role.
    pub actor_role: Role,
    /// What happened, e.g. `"created"`.
    pub action: &'static str,
    /// State before; `None` for creation.
    pub from_state: Option<ComplaintState>,
    /// State after.
    pub to_state: ComplaintState,
}

/// One immutable ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Position in the global log, starting at 1.
    pub sequence: u64,
    /// Complaint acted on.
    pub complaint_no: ComplaintNo,
    /// Who acted.
    pub actor_email: Email,
    /// In which role.
    pub actor_role: Role,
    /// What happened.
    pub action: String,
    /// State before; `None` for creation.
    pub from_state: Option<ComplaintState>,
    /// State after.
    pub to_state: ComplaintState,
    /// When it was recorded.
    pub timestamp: Timestamp,
}

/// Next position and timestamp floor, owned by whoever is appending.
#[derive(Debug)]
struct Sequencer {
    next: u64,
    last: Option<Timestamp>,
}

/// The in-memory log fronted by a journal.
#[derive(Debug)]
pub struct AuditLog {
    sequencer: Mutex<Sequencer>,
    entries: RwLock<Vec<AuditEntry>>,
    journal: Arc<dyn AuditJournal>,
}

impl AuditLog {
    /// An empty log writing through to `journal`.
    pub fn new(journal: Arc<dyn AuditJournal>) -> Self {
        Self {
            sequencer: Mutex::new(Sequencer {
                next: 1,
                last: None,
            }),
            entries: RwLock::new(Vec::new()),
            journal,
        }
    }

    /// A log resuming after `history`, which must be numbered 1, 2, 3, ...
    /// New entries continue the sequence and never predate the last one.
    pub fn with_history(
        journal: Arc<dyn AuditJournal>,
        history: Vec<AuditEntry>,
    ) -> Result<Self, JournalError> {
        for (idx, entry) in history.iter().enumerate() {
            let expected = idx as u64 + 1;
            if entry.sequence != expected {
                return Err(JournalError::Discontinuous {
                    expected,
                    found: entry.sequence,
                });
            }
        }
        Ok(Self {
            sequencer: Mutex::new(Sequencer {
                next: history.len() as u64 + 1,
                last: history.last().map(|e| e.timestamp),
            }),
            entries: RwLock::new(history),
            journal,
        })
    }

    /// Append one entry. Fails only when the journal cannot be written.
    pub fn append(&self, event: AuditEvent, now: Timestamp) -> Result<AuditEntry, CustodyError> {
        self.append_with(event, now, || {})
    }

    /// Append one entry, running `before_publish` once the journal has
    /// accepted it and before it becomes visible to queries. If the journal
    /// refuses, `before_publish` never runs.
    pub fn append_with(
        &self,
        event: AuditEvent,
        now: Timestamp,
        before_publish: impl FnOnce(),
    ) -> Result<AuditEntry, CustodyError> {
        let mut seq = self.sequencer.lock();
        let timestamp = match seq.last {
            Some(last) => now.not_before(last),
            None => now,
        };
        let entry = AuditEntry {
            sequence: seq.next,
            complaint_no: event.complaint_no,
            actor_email: event.actor_email,
            actor_role: event.actor_role,
            action: event.action.to_string(),
            from_state: event.from_state,
            to_state: event.to_state,
            timestamp,
        };
        if let Err(e) = self.journal.record(&entry) {
            tracing::error!(
                complaint_no = %entry.complaint_no,
                action = %entry.action,
                error = %e,
                "audit journal write failed"
            );
            return Err(CustodyError::Storage(e.to_string()));
        }
        before_publish();
        self.entries.write().push(entry.clone());
        seq.next += 1;
        seq.last = Some(timestamp);
        Ok(entry)
    }

    /// Entries for one complaint, or all entries, oldest first.
    ///
    /// The returned cursor is lazy and bounded at the log length at the time
    /// of the call; later appends are not observed. [`AuditQuery::restart`]
    /// rewinds it.
    pub fn query(&self, complaint_no: Option<&ComplaintNo>) -> AuditQuery<'_> {
        AuditQuery {
            log: self,
            complaint_no: complaint_no.cloned(),
            end: self.len(),
            pos: 0,
        }
    }

    /// Total entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether nothing has been logged.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// Lazy, restartable cursor over a bounded prefix of the log.
#[derive(Debug, Clone)]
pub struct AuditQuery<'a> {
    log: &'a AuditLog,
    complaint_no: Option<ComplaintNo>,
    end: usize,
    pos: usize,
}

impl AuditQuery<'_> {
    /// Rewind to the first entry.
    pub fn restart(&mut self) {
        self.pos = 0;
    }
}

impl Iterator for AuditQuery<'_> {
    type Item = AuditEntry;

    fn next(&mut self) -> Option<AuditEntry> {
        while self.pos < self.end {
            let idx = self.pos;
            self.pos += 1;
            let entries = self.log.entries.read();
            let entry = &entries[idx];
            if self
                .complaint_no
                .as_ref()
                .map_or(true, |no| *no == entry.complaint_no)
            {
                return Some(entry.clone());
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.end - self.pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::NullJournal;
    use chrono::{TimeZone, Utc};

    #[derive(Debug)]
    struct BrokenJournal;

    impl AuditJournal for BrokenJournal {
        fn record(&self, _entry: &AuditEntry) -> Result<(), JournalError> {
            Err(JournalError::Io(std::io::Error::other("disk gone")))
        }
    }

    fn event(no: &str, action: &'static str) -> AuditEvent {
        AuditEvent {
            complaint_no: ComplaintNo::new(no).unwrap(),
            actor_email: Email::new("officer@example.org").unwrap(),
            actor_role: Role::Officer,
            action,
            from_state: None,
            to_state: ComplaintState::Submitted,
        }
    }

    fn at(secs: u32) -> Timestamp {
        Timestamp::from_datetime(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, secs).unwrap())
    }

    #[test]
    fn sequences_are_gap_free() {
        let log = AuditLog::new(Arc::new(NullJournal));
        for i in 0..5 {
            let e = log.append(event("CMP-1", "created"), at(i)).unwrap();
            assert_eq!(e.sequence, u64::from(i) + 1);
        }
    }

    #[test]
    fn timestamps_never_go_backwards() {
        let log = AuditLog::new(Arc::new(NullJournal));
        log.append(event("CMP-1", "created"), at(30)).unwrap();
        let e = log.append(event("CMP-2", "created"), at(10)).unwrap();
        assert_eq!(e.timestamp, at(30));
    }

    #[test]
    fn query_filters_by_complaint() {
        let log = AuditLog::new(Arc::new(NullJournal));
        log.append(event("CMP-1", "created"), at(1)).unwrap();
        log.append(event("CMP-2", "created"), at(2)).unwrap();
        log.append(event("CMP-1", "inference added"), at(3)).unwrap();

        let no = ComplaintNo::new("CMP-1").unwrap();
        let actions: Vec<String> = log.query(Some(&no)).map(|e| e.action).collect();
        assert_eq!(actions, ["created", "inference added"]);
        assert_eq!(log.query(None).count(), 3);
    }

    #[test]
    fn query_is_bounded_at_call_time_and_restartable() {
        let log = AuditLog::new(Arc::new(NullJournal));
        log.append(event("CMP-1", "created"), at(1)).unwrap();
        let mut q = log.query(None);
        log.append(event("CMP-2", "created"), at(2)).unwrap();

        assert_eq!(q.by_ref().count(), 1);
        assert!(q.next().is_none());
        q.restart();
        assert_eq!(q.count(), 1);
        assert_eq!(log.query(None).count(), 2);
    }

    #[test]
    fn journal_failure_leaves_log_unchanged() {
        let log = AuditLog::new(Arc::new(BrokenJournal));
        let mut published = false;
        let err = log
            .append_with(event("CMP-1", "created"), at(1), || published = true)
            .unwrap_err();
        assert!(matches!(err, CustodyError::Storage(_)));
        assert!(!published);
        assert!(log.is_empty());
    }

    /// Reads the log it belongs to from inside `record`.
    #[derive(Debug, Default)]
    struct ReadingJournal {
        log: std::sync::OnceLock<std::sync::Weak<AuditLog>>,
        seen: Mutex<Vec<usize>>,
    }

    impl AuditJournal for ReadingJournal {
        fn record(&self, _entry: &AuditEntry) -> Result<(), JournalError> {
            if let Some(log) = self.log.get().and_then(std::sync::Weak::upgrade) {
                // Would deadlock if the entry list were locked across the write.
                self.seen.lock().push(log.query(None).count());
            }
            Ok(())
        }
    }

    #[test]
    fn readers_are_not_blocked_by_journal_writes() {
        let journal = Arc::new(ReadingJournal::default());
        let log = Arc::new(AuditLog::new(journal.clone()));
        journal.log.set(Arc::downgrade(&log)).unwrap();

        log.append(event("CMP-1", "created"), at(1)).unwrap();
        log.append(event("CMP-2", "created"), at(2)).unwrap();
        assert_eq!(*journal.seen.lock(), [0, 1]);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn hook_runs_before_entry_is_visible() {
        let log = AuditLog::new(Arc::new(NullJournal));
        let mut visible_in_hook = None;
        log.append_with(event("CMP-1", "created"), at(1), || {
            visible_in_hook = Some(log.len());
        })
        .unwrap();
        assert_eq!(visible_in_hook, Some(0));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn history_resumes_sequence_and_clock() {
        let first = AuditLog::new(Arc::new(NullJournal));
        first.append(event("CMP-1", "created"), at(40)).unwrap();
        first.append(event("CMP-2", "created"), at(41)).unwrap();
        let history: Vec<AuditEntry> = first.query(None).collect();

        let log = AuditLog::with_history(Arc::new(NullJournal), history).unwrap();
        assert_eq!(log.len(), 2);
        let e = log.append(event("CMP-3", "created"), at(5)).unwrap();
        assert_eq!(e.sequence, 3);
        assert_eq!(e.timestamp, at(41));
    }

    #[test]
    fn history_with_gaps_is_rejected() {
        let first = AuditLog::new(Arc::new(NullJournal));
        for i in 0..3 {
            first.append(event("CMP-1", "created"), at(i)).unwrap();
        }
        let mut history: Vec<AuditEntry> = first.query(None).collect();
        history.remove(1);

        match AuditLog::with_history(Arc::new(NullJournal), history) {
            Err(JournalError::Discontinuous { expected, found }) => {
                assert_eq!((expected, found), (2, 3));
            }
            other => panic!("expected discontinuity, got {other:?}"),
        }
    }
}
