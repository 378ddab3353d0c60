//! In-process [`RecordStore`] backed by a map of rows.
//!
//! Useful for tests and for callers that keep records in memory. It also
//! counts the existence queries it serves.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use super::field::EmailField;
use super::store::{RecordStore, StoreError};
use crate::types::DbId;

/// A stored row: one value per email field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredEmails {
    pub email: Option<String>,
    pub backup_email: Option<String>,
}

impl StoredEmails {
    pub fn get(&self, field: EmailField) -> Option<&str> {
        match field {
            EmailField::Email => self.email.as_deref(),
            EmailField::BackupEmail => self.backup_email.as_deref(),
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    next_id: DbId,
    rows: BTreeMap<DbId, StoredEmails>,
}

#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    inner: RwLock<Inner>,
    lookups: AtomicUsize,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Persist a new row and return its id. Ids start at 1.
    pub fn insert(&self, email: Option<&str>, backup_email: Option<&str>) -> DbId {
        let mut inner = self.write();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.rows.insert(
            id,
            StoredEmails {
                email: email.map(str::to_string),
                backup_email: backup_email.map(str::to_string),
            },
        );
        id
    }

    /// Overwrite one field of an existing row. Returns `false` if no row
    /// with `id` exists.
    pub fn update(&self, id: DbId, field: EmailField, value: Option<&str>) -> bool {
        let mut inner = self.write();
        let Some(row) = inner.rows.get_mut(&id) else {
            return false;
        };
        let slot = match field {
            EmailField::Email => &mut row.email,
            EmailField::BackupEmail => &mut row.backup_email,
        };
        *slot = value.map(str::to_string);
        true
    }

    pub fn remove(&self, id: DbId) -> Option<StoredEmails> {
        self.write().rows.remove(&id)
    }

    pub fn get(&self, id: DbId) -> Option<StoredEmails> {
        self.read().rows.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.read().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of `value_taken` queries served so far.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        // A poisoned lock still holds consistent rows: every write is a
        // single map operation.
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl RecordStore for InMemoryRecordStore {
    fn value_taken(
        &self,
        field: EmailField,
        value: &str,
        exclude: Option<DbId>,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let taken = self
            .read()
            .rows
            .iter()
            .any(|(id, row)| Some(*id) != exclude && row.get(field) == Some(value));
        std::future::ready(Ok(taken))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
