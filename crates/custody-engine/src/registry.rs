//! # Complaint Registry
//!
//! Owns every complaint record and the uniqueness of `complaint_no`.
//!
//! ## Concurrency
//!
//! Records live in a sharded [`DashMap`], each behind its own
//! `Arc<parking_lot::Mutex<_>>`. That mutex is the per-complaint guard: the
//! engine holds it across check, audit append, and mutation, so operations on
//! the same complaint serialize while different complaints proceed in
//! parallel. Insertion order is kept separately in an `RwLock<Vec<_>>`.
//!
//! Lock order is always shard → order list, and `list` clones the order list
//! and releases it before touching any shard, so readers never hold two locks.
//!
//! Numbers recovered from a previous run's journal are *retired*: their
//! records are gone, but they can never be filed again.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};

use custody_core::{Category, ComplaintNo, CustodyError, Severity};
use custody_state::ComplaintState;

use crate::complaint::Complaint;

/// Predicates for [`ComplaintRegistry::list`]. Unset fields match everything;
/// set fields combine with logical AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComplaintFilter {
    /// Exact category.
    pub category: Option<Category>,
    /// Case-insensitive substring of `title` or `complaint_details`.
    pub search: Option<String>,
    /// Exact lifecycle state.
    pub state: Option<ComplaintState>,
    /// Exact severity.
    pub severity: Option<Severity>,
}

impl ComplaintFilter {
    /// Filter on category only.
    pub fn category(category: Category) -> Self {
        Self {
            category: Some(category),
            ..Self::default()
        }
    }

    /// Whether `complaint` satisfies every set predicate.
    pub fn matches(&self, complaint: &Complaint) -> bool {
        if self.category.is_some_and(|c| c != complaint.category) {
            return false;
        }
        if self.severity.is_some_and(|s| s != complaint.severity) {
            return false;
        }
        if self.state.is_some_and(|s| s != complaint.state()) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(needle) => {
                let needle = needle.to_lowercase();
                complaint.title.to_lowercase().contains(&needle)
                    || complaint.complaint_details.to_lowercase().contains(&needle)
            }
        }
    }
}

pub(crate) type Slot = Arc<Mutex<Complaint>>;

/// Concurrent complaint store.
#[derive(Debug, Default)]
pub struct ComplaintRegistry {
    records: DashMap<ComplaintNo, Slot>,
    order: RwLock<Vec<ComplaintNo>>,
    retired: HashSet<ComplaintNo>,
}

impl ComplaintRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty registry in which `retired` numbers are permanently taken.
    pub fn with_retired(retired: impl IntoIterator<Item = ComplaintNo>) -> Self {
        Self {
            retired: retired.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Whether `complaint_no` belongs to a previous run.
    pub fn is_retired(&self, complaint_no: &ComplaintNo) -> bool {
        self.retired.contains(complaint_no)
    }

    /// Register `complaint` if its key is free.
    ///
    /// `commit` runs while the key is reserved. It receives a `publish`
    /// callback that inserts the record; call it once the commit can no
    /// longer fail. If `commit` returns an error nothing is inserted, and if
    /// it succeeds without publishing the record is inserted afterwards. The
    /// engine appends the audit entry here, publishing before the entry
    /// becomes visible, so no reader sees a `created` entry for a complaint
    /// that is not there yet.
    pub(crate) fn create<F>(&self, complaint: Complaint, commit: F) -> Result<Complaint, CustodyError>
    where
        F: FnOnce(&Complaint, &mut dyn FnMut()) -> Result<(), CustodyError>,
    {
        if self.is_retired(&complaint.complaint_no) {
            return Err(CustodyError::DuplicateComplaintNo(complaint.complaint_no));
        }
        match self.records.entry(complaint.complaint_no.clone()) {
            Entry::Occupied(_) => Err(CustodyError::DuplicateComplaintNo(complaint.complaint_no)),
            Entry::Vacant(vacant) => {
                let mut vacant = Some(vacant);
                let mut publish = || {
                    if let Some(vacant) = vacant.take() {
                        vacant.insert(Arc::new(Mutex::new(complaint.clone())));
                        self.order.write().push(complaint.complaint_no.clone());
                    }
                };
                commit(&complaint, &mut publish)?;
                publish();
                Ok(complaint)
            }
        }
    }

    /// The guard for one complaint. The shard lock is released on return.
    pub(crate) fn slot(&self, complaint_no: &ComplaintNo) -> Option<Slot> {
        self.records.get(complaint_no).map(|s| Arc::clone(s.value()))
    }

    /// Snapshot of one complaint.
    pub fn get(&self, complaint_no: &ComplaintNo) -> Option<Complaint> {
        self.slot(complaint_no).map(|slot| slot.lock().clone())
    }

    /// Snapshots of every complaint matching `filter`, in insertion order.
    pub fn list(&self, filter: &ComplaintFilter) -> Vec<Complaint> {
        let order = self.order.read().clone();
        order
            .iter()
            .filter_map(|no| self.get(no))
            .filter(|c| filter.matches(c))
            .collect()
    }

    /// Number of complaints.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
