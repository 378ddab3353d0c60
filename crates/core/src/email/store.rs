//! The record store capability consumed by the uniqueness check.
//!
//! The validator depends only on [`RecordStore::value_taken`]. Indexing,
//! caching and isolation are the store's concern.

use std::future::Future;
use std::sync::Arc;

use super::field::EmailField;
use crate::types::DbId;

/// The store could not answer a query.
#[derive(Debug, thiserror::Error)]
#[error("Record store lookup failed: {source}")]
pub struct StoreError {
    source: Box<dyn std::error::Error + Send + Sync>,
}

impl StoreError {
    pub fn new(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

/// Existence query against persisted records.
pub trait RecordStore: Send + Sync {
    /// Whether a persisted record other than `exclude` already holds `value`
    /// in the column for `field`.
    fn value_taken(
        &self,
        field: EmailField,
        value: &str,
        exclude: Option<DbId>,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;
}

impl<S: RecordStore> RecordStore for &S {
    fn value_taken(
        &self,
        field: EmailField,
        value: &str,
        exclude: Option<DbId>,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send {
        (**self).value_taken(field, value, exclude)
    }
}

impl<S: RecordStore> RecordStore for Arc<S> {
    fn value_taken(
        &self,
        field: EmailField,
        value: &str,
        exclude: Option<DbId>,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send {
        (**self).value_taken(field, value, exclude)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
