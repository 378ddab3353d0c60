//! Field identifiers for the email-bearing attributes of a record.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Which email attribute of a record is being validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailField {
    /// The primary address.
    Email,
    /// The secondary address.
    BackupEmail,
}

impl EmailField {
    /// Every field, in declaration order.
    pub const ALL: [EmailField; 2] = [EmailField::Email, EmailField::BackupEmail];

    /// Storage column holding this field.
    pub fn column(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::BackupEmail => "backup_email",
        }
    }
}

impl fmt::Display for EmailField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for EmailField {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(Self::Email),
            "backup_email" => Ok(Self::BackupEmail),
            other => Err(CoreError::Config(format!("unknown email field '{other}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
