//! Violation taxonomy: one kind per check, each with a fixed message.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::field::EmailField;

/// Which check rejected a candidate value.
///
/// Variants are declared in pipeline order, so `Ord` follows the order in
/// which checks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationErrorKind {
    Presence,
    Type,
    Format,
    Length,
    Domain,
    Uniqueness,
}

impl ValidationErrorKind {
    /// Stable machine-readable code.
    pub fn code(self) -> &'static str {
        match self {
            Self::Presence => "PRESENCE_ERROR",
            Self::Type => "TYPE_ERROR",
            Self::Format => "FORMAT_ERROR",
            Self::Length => "LENGTH_ERROR",
            Self::Domain => "DOMAIN_ERROR",
            Self::Uniqueness => "UNIQUENESS_ERROR",
        }
    }

    /// Human-facing kind name, e.g. `PresenceError`.
    pub fn name(self) -> &'static str {
        match self {
            Self::Presence => "PresenceError",
            Self::Type => "TypeError",
            Self::Format => "FormatError",
            Self::Length => "LengthError",
            Self::Domain => "DomainError",
            Self::Uniqueness => "UniquenessError",
        }
    }
}

impl fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed rejection of a candidate value for one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct Violation {
    pub kind: ValidationErrorKind,
    pub message: String,
    pub field: EmailField,
}

impl Violation {
    pub fn new(kind: ValidationErrorKind, field: EmailField, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            field,
        }
    }

    pub fn presence(field: EmailField) -> Self {
        Self::new(ValidationErrorKind::Presence, field, "Email must be present.")
    }

    pub fn type_mismatch(field: EmailField) -> Self {
        Self::new(ValidationErrorKind::Type, field, "Email must be a string.")
    }

    pub fn format(field: EmailField) -> Self {
        Self::new(
            ValidationErrorKind::Format,
            field,
            "Email must have an '@' in the address.",
        )
    }

    pub fn length(field: EmailField) -> Self {
        Self::new(ValidationErrorKind::Length, field, "Email is too long.")
    }

    /// Domain rejection. The message names the denied providers by their
    /// leading label, so `["hotmail.com", "yahoo.com"]` reads
    /// "hotmail or yahoo".
    pub fn domain<'a>(field: EmailField, denied: impl IntoIterator<Item = &'a str>) -> Self {
        let message = format!(
            "Email cannot be a {} address.",
            provider_phrase(denied)
        );
        Self::new(ValidationErrorKind::Domain, field, message)
    }

    pub fn uniqueness(field: EmailField) -> Self {
        Self::new(ValidationErrorKind::Uniqueness, field, "Email must be unique.")
    }
}

fn provider_phrase<'a>(denied: impl IntoIterator<Item = &'a str>) -> String {
    let mut labels: Vec<&str> = Vec::new();
    for domain in denied {
        let label = domain.split('.').next().unwrap_or(domain);
        if !label.is_empty() && !labels.contains(&label) {
            labels.push(label);
        }
    }

    match labels.split_last() {
        None => "denied".to_string(),
        Some((last, [])) => (*last).to_string(),
        Some((last, rest)) => format!("{} or {last}", rest.join(", ")),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
