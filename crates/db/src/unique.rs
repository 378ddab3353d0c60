//! Storage-level uniqueness backstop.
//!
//! The validator checks uniqueness with a read before the write, so two
//! concurrent assignments of the same address can both pass. The
//! `uq_email_addresses_email` constraint rejects the second insert; this
//! module turns that database error back into the validator's violation.

use mailguard_core::email::{EmailField, Violation};

/// PostgreSQL SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

/// Name of the unique constraint on `email_addresses.email`.
pub const EMAIL_UNIQUE_CONSTRAINT: &str = "uq_email_addresses_email";

/// Map a unique-constraint failure on the email column to a
/// `UniquenessError` violation. Any other error yields `None`.
pub fn classify_unique_violation(err: &sqlx::Error) -> Option<Violation> {
    let sqlx::Error::Database(db_err) = err else {
        return None;
    };
    if db_err.code().as_deref() != Some(UNIQUE_VIOLATION) {
        return None;
    }
    match db_err.constraint() {
        Some(EMAIL_UNIQUE_CONSTRAINT) => {
            tracing::info!(
                constraint = EMAIL_UNIQUE_CONSTRAINT,
                "Duplicate email rejected by storage constraint",
            );
            Some(Violation::uniqueness(EmailField::Email))
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
