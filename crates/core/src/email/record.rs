//! A record with email-bearing fields that are validated on assignment.

use serde_json::Value;

use super::field::EmailField;
use super::store::RecordStore;
use super::validator::EmailValidator;
use crate::error::CoreError;
use crate::types::DbId;

/// An email address record. `id` is `None` until the record is persisted.
///
/// Values are either loaded from storage with [`persisted`](Self::persisted)
/// or set through [`assign`](Self::assign), which runs every check first.
/// There is no other way to construct or change one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailRecord {
    id: Option<DbId>,
    email: Option<String>,
    backup_email: Option<String>,
}

impl EmailRecord {
    /// A record that has not been persisted yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a record from already-persisted values.
    pub fn persisted(id: DbId, email: Option<String>, backup_email: Option<String>) -> Self {
        Self {
            id: Some(id),
            email,
            backup_email,
        }
    }

    pub fn id(&self) -> Option<DbId> {
        self.id
    }

    pub fn get(&self, field: EmailField) -> Option<&str> {
        match field {
            EmailField::Email => self.email.as_deref(),
            EmailField::BackupEmail => self.backup_email.as_deref(),
        }
    }

    /// Validate `value` for `field` and store the accepted value.
    ///
    /// On failure the record is left unchanged.
    pub async fn assign<S: RecordStore>(
        &mut self,
        field: EmailField,
        value: &Value,
        validator: &EmailValidator<S>,
    ) -> Result<&str, CoreError> {
        let accepted = validator.validate(field, value, self.id).await?;
        let slot = match field {
            EmailField::Email => &mut self.email,
            EmailField::BackupEmail => &mut self.backup_email,
        };
        Ok(slot.insert(accepted).as_str())
    }

    pub async fn set_email<S: RecordStore>(
        &mut self,
        address: &str,
        validator: &EmailValidator<S>,
    ) -> Result<&str, CoreError> {
        self.assign(EmailField::Email, &Value::from(address), validator).await
    }

    pub async fn set_backup_email<S: RecordStore>(
        &mut self,
        address: &str,
        validator: &EmailValidator<S>,
    ) -> Result<&str, CoreError> {
        self.assign(EmailField::BackupEmail, &Value::from(address), validator).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
