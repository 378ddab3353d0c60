//! Email address row model and DTOs.

use mailguard_core::email::EmailRecord;
use mailguard_core::types::DbId;
use sqlx::FromRow;

/// Full row from the `email_addresses` table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct EmailAddress {
    pub id: DbId,
    pub email: Option<String>,
    pub backup_email: Option<String>,
}

/// DTO for inserting a row. Values are expected to have been validated.
#[derive(Debug, Clone, Default)]
pub struct CreateEmailAddress {
    pub email: Option<String>,
    pub backup_email: Option<String>,
}

impl From<EmailAddress> for EmailRecord {
    fn from(row: EmailAddress) -> Self {
        EmailRecord::persisted(row.id, row.email, row.backup_email)
    }
}
