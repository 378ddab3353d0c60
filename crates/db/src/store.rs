//! [`RecordStore`] backed by the `email_addresses` table.

use std::future::Future;

use mailguard_core::email::{EmailField, RecordStore, StoreError};
use mailguard_core::types::DbId;

use crate::repositories::EmailAddressRepo;
use crate::DbPool;

#[derive(Debug, Clone)]
pub struct PgRecordStore {
    pool: DbPool,
}

impl PgRecordStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

impl RecordStore for PgRecordStore {
    fn value_taken(
        &self,
        field: EmailField,
        value: &str,
        exclude: Option<DbId>,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send {
        async move {
            let taken = EmailAddressRepo::value_taken(&self.pool, field, value, exclude)
                .await
                .map_err(StoreError::new)?;
            tracing::debug!(%field, record_id = ?exclude, taken, "Uniqueness lookup");
            Ok(taken)
        }
    }
}
