use crate::model::{Branch, Institute, Payment, StaffMember, Student, Ticket};
use std::collections::BTreeMap;

/// A row with a stable string primary key.
pub trait StoredRecord {
    fn id(&self) -> &str;
}

/// Insertion-ordered in-memory collection. The whole data layer of the
/// daemon: no persistence, no indexes, collections stay small enough that
/// linear scans are the honest implementation.
#[derive(Debug, Clone)]
pub struct RecordStore<R> {
    rows: Vec<R>,
}

impl<R> Default for RecordStore<R> {
    fn default() -> Self {
        Self { rows: Vec::new() }
    }
}

impl<R: StoredRecord> RecordStore<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(&self) -> &[R] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&R> {
        self.rows.iter().find(|r| r.id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn add(&mut self, row: R) {
        self.rows.push(row);
    }

    /// Applies a patch closure to the row with the given id. Returns false
    /// when no such row exists.
    pub fn update(&mut self, id: &str, apply: impl FnOnce(&mut R)) -> bool {
        match self.rows.iter_mut().find(|r| r.id() == id) {
            Some(row) => {
                apply(row);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.rows.len();
        self.rows.retain(|r| r.id() != id);
        self.rows.len() != before
    }

    /// Keeps only rows matching the predicate; used by cascade deletes.
    pub fn retain(&mut self, keep: impl FnMut(&R) -> bool) {
        self.rows.retain(keep);
    }
}

/// All record collections for one daemon session, plus free-form settings
/// sections. Everything here is transient by design.
#[derive(Debug, Clone, Default)]
pub struct Workspace {
    pub institutes: RecordStore<Institute>,
    pub branches: RecordStore<Branch>,
    pub students: RecordStore<Student>,
    pub staff: RecordStore<StaffMember>,
    pub payments: RecordStore<Payment>,
    pub tickets: RecordStore<Ticket>,
    pub settings: BTreeMap<String, serde_json::Value>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }
}
