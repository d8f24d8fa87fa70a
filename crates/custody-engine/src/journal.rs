//! # Audit Journal
//!
//! The durable sink behind the audit log. Every entry is written here before
//! it becomes visible in memory, so a journal failure means the action did not
//! happen.
//!
//! [`FileJournal`] writes one JSON object per line and syncs after each
//! entry. A write or sync that fails part way is rolled back by truncating
//! the file to its length before the attempt. If even that fails the journal
//! is poisoned and refuses every later write, so a torn line can never be
//! followed by good ones. [`read_journal`] reads such a file back.

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use thiserror::Error;

use crate::audit::AuditEntry;

/// Errors from journal I/O.
#[derive(Error, Debug)]
pub enum JournalError {
    /// Underlying file operation failed.
    #[error("journal i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// An entry could not be encoded or a line could not be decoded.
    #[error("journal encoding error at line {line}: {source}")]
    Encoding {
        /// 1-based line number, or 0 when writing.
        line: usize,
        /// Underlying serde error.
        source: serde_json::Error,
    },

    /// A failed write could not be rolled back; the file may end in a torn
    /// line and needs operator attention.
    #[error("journal is poisoned after an unrecoverable write failure")]
    Poisoned,

    /// Replayed entries are not numbered 1, 2, 3, ...
    #[error("journal sequence broken: expected {expected}, found {found}")]
    Discontinuous {
        /// The sequence the next entry should carry.
        expected: u64,
        /// The sequence it carries.
        found: u64,
    },
}

/// A durable sink for audit entries.
pub trait AuditJournal: Send + Sync + std::fmt::Debug {
    /// Persist one entry. Must not return until the entry is durable.
    fn record(&self, entry: &AuditEntry) -> Result<(), JournalError>;
}

/// Discards everything. Used when no journal path is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullJournal;

impl AuditJournal for NullJournal {
    fn record(&self, _entry: &AuditEntry) -> Result<(), JournalError> {
        Ok(())
    }
}

#[derive(Debug)]
struct JournalFile {
    file: File,
    poisoned: bool,
}

impl JournalFile {
    /// Run `write` for `line`, then sync. On failure, cut the file back to
    /// where it was; poison the journal if that fails too.
    fn commit(
        &mut self,
        line: &[u8],
        write: impl FnOnce(&mut File, &[u8]) -> io::Result<()>,
    ) -> Result<(), JournalError> {
        if self.poisoned {
            return Err(JournalError::Poisoned);
        }
        let len = self.file.metadata()?.len();
        let result = write(&mut self.file, line).and_then(|()| self.file.sync_data());
        if let Err(e) = result {
            if let Err(rollback) = self
                .file
                .set_len(len)
                .and_then(|()| self.file.sync_data())
            {
                self.poisoned = true;
                tracing::error!(error = %rollback, "audit journal rollback failed; poisoned");
            } else {
                tracing::warn!(error = %e, "audit journal write rolled back");
            }
            return Err(e.into());
        }
        Ok(())
    }
}

/// JSON-lines file journal, opened in append mode.
#[derive(Debug)]
pub struct FileJournal {
    path: PathBuf,
    inner: Mutex<JournalFile>,
}

impl FileJournal {
    /// Open `path` for appending, creating it if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, JournalError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        tracing::info!(path = %path.display(), "audit journal opened");
        Ok(Self {
            path,
            inner: Mutex::new(JournalFile {
                file,
                poisoned: false,
            }),
        })
    }

    /// The journal file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a failed write could not be rolled back.
    pub fn is_poisoned(&self) -> bool {
        self.inner.lock().poisoned
    }

    fn record_with(
        &self,
        entry: &AuditEntry,
        write: impl FnOnce(&mut File, &[u8]) -> io::Result<()>,
    ) -> Result<(), JournalError> {
        let mut line =
            serde_json::to_vec(entry).map_err(|source| JournalError::Encoding { line: 0, source })?;
        line.push(b'\n');
        self.inner.lock().commit(&line, write)
    }
}

impl AuditJournal for FileJournal {
    fn record(&self, entry: &AuditEntry) -> Result<(), JournalError> {
        self.record_with(entry, |file, line| file.write_all(line))
    }
}

/// Read every entry from a JSON-lines journal. Blank lines are skipped.
pub fn read_journal(path: impl AsRef<Path>) -> Result<Vec<AuditEntry>, JournalError> {
    let reader = BufReader::new(File::open(path)?);
    let mut entries = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let entry = serde_json::from_str(&line).map_err(|source| JournalError::Encoding {
            line: idx + 1,
            source,
        })?;
        entries.push(entry);
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{AuditEvent, AuditLog};
    use custody_core::{ComplaintNo, Email, Role, Timestamp};
    use custody_state::ComplaintState;
    use std::sync::Arc;

    fn event(no: &str) -> AuditEvent {
        AuditEvent {
            complaint_no: ComplaintNo::new(no).unwrap(),
            actor_email: Email::new("officer@example.org").unwrap(),
            actor_role: Role::Officer,
            action: "created",
            from_state: None,
            to_state: ComplaintState::Submitted,
        }
    }

    #[test]
    fn file_journal_round_trips_entries_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let log = AuditLog::new(Arc::new(FileJournal::open(&path).unwrap()));
        log.append(event("CMP-1"), Timestamp::now()).unwrap();
        log.append(event("CMP-2"), Timestamp::now()).unwrap();

        let entries = read_journal(&path).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].sequence, 1);
        assert_eq!(entries[1].complaint_no.as_str(), "CMP-2");
        assert_eq!(entries, log.query(None).collect::<Vec<_>>());
    }

    #[test]
    fn reopening_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        {
            let j = FileJournal::open(&path).unwrap();
            let log = AuditLog::new(Arc::new(j));
            log.append(event("CMP-1"), Timestamp::now()).unwrap();
        }
        let history = read_journal(&path).unwrap();
        let log =
            AuditLog::with_history(Arc::new(FileJournal::open(&path).unwrap()), history).unwrap();
        log.append(event("CMP-2"), Timestamp::now()).unwrap();
        let sequences: Vec<u64> = read_journal(&path)
            .unwrap()
            .iter()
            .map(|e| e.sequence)
            .collect();
        assert_eq!(sequences, [1, 2]);
    }

    fn entry(sequence: u64, no: &str) -> AuditEntry {
        AuditEntry {
            sequence,
            complaint_no: ComplaintNo::new(no).unwrap(),
            actor_email: Email::new("officer@example.org").unwrap(),
            actor_role: Role::Officer,
            action: "created".into(),
            from_state: None,
            to_state: ComplaintState::Submitted,
            timestamp: Timestamp::now(),
        }
    }

    #[test]
    fn torn_write_is_rolled_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let journal = FileJournal::open(&path).unwrap();
        journal.record(&entry(1, "CMP-1")).unwrap();

        let err = journal
            .record_with(&entry(2, "CMP-2"), |file, line| {
                file.write_all(&line[..line.len() / 2])?;
                Err(io::Error::other("device full"))
            })
            .unwrap_err();
        assert!(matches!(err, JournalError::Io(_)));
        assert!(!journal.is_poisoned());

        journal.record(&entry(2, "CMP-2")).unwrap();
        let entries = read_journal(&path).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].complaint_no.as_str(), "CMP-2");
    }

    #[test]
    fn poisoned_journal_refuses_writes() {
        let dir = tempfile::tempdir().unwrap();
        let journal = FileJournal::open(dir.path().join("audit.jsonl")).unwrap();
        journal.inner.lock().poisoned = true;
        assert!(matches!(
            journal.record(&entry(1, "CMP-1")),
            Err(JournalError::Poisoned)
        ));
    }

    #[test]
    fn corrupt_line_reports_line_number() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        std::fs::write(&path, "\n{not json}\n").unwrap();
        match read_journal(&path) {
            Err(JournalError::Encoding { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected encoding error, got {other:?}"),
        }
    }
}
