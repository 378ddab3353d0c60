//! Repository for the `email_addresses` table.

use mailguard_core::email::EmailField;
use mailguard_core::types::DbId;
use sqlx::PgPool;

use crate::models::email_address::{CreateEmailAddress, EmailAddress};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, email, backup_email";

pub struct EmailAddressRepo;

impl EmailAddressRepo {
    /// Insert a new row, returning it.
    ///
    /// A duplicate `email` fails with the `uq_email_addresses_email`
    /// constraint; see [`crate::unique::classify_unique_violation`].
    pub async fn create(
        pool: &PgPool,
        input: &CreateEmailAddress,
    ) -> Result<EmailAddress, sqlx::Error> {
        let query = format!(
            "INSERT INTO email_addresses (email, backup_email)
             VALUES ($1, $2)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, EmailAddress>(&query)
            .bind(&input.email)
            .bind(&input.backup_email)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<EmailAddress>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM email_addresses WHERE id = $1");
        sqlx::query_as::<_, EmailAddress>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Whether a row other than `exclude` holds `value` in `field`'s column
    /// (case-sensitive).
    pub async fn value_taken(
        pool: &PgPool,
        field: EmailField,
        value: &str,
        exclude: Option<DbId>,
    ) -> Result<bool, sqlx::Error> {
        let query = format!(
            "SELECT EXISTS(
                SELECT 1 FROM email_addresses
                WHERE {column} = $1 AND ($2::BIGINT IS NULL OR id <> $2)
             )",
            column = field.column(),
        );
        let (taken,): (bool,) = sqlx::query_as(&query)
            .bind(value)
            .bind(exclude)
            .fetch_one(pool)
            .await?;
        Ok(taken)
    }
}
