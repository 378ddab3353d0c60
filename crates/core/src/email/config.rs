//! Validator configuration: length bound, domain denylist and per-field
//! uniqueness policy.

use std::collections::BTreeSet;
use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

use super::field::EmailField;
use crate::error::CoreError;

/// Maximum length of an email address, in characters.
pub const MAX_EMAIL_LENGTH: NonZeroUsize = match NonZeroUsize::new(254) {
    Some(n) => n,
    None => panic!("MAX_EMAIL_LENGTH must be non-zero"),
};

/// Domains rejected when no denylist is configured.
pub const DEFAULT_DENIED_DOMAINS: [&str; 2] = ["hotmail.com", "yahoo.com"];

/// How strictly the address structure is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatPolicy {
    /// Exactly one `@` with a non-empty local part and domain part.
    #[default]
    Basic,
    /// `Basic`, plus the HTML5 email grammar from the `validator` crate.
    Strict,
}

/// How the domain part is compared against the denylist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainMatch {
    #[default]
    CaseInsensitive,
    Exact,
}

/// Per-field policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldPolicy {
    /// Whether the value must not be held by another persisted record.
    pub unique: bool,
}

/// Policy table keyed by field.
///
/// Only the primary address is unique by default. Backup addresses may be
/// shared between records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldPolicies {
    pub email: FieldPolicy,
    pub backup_email: FieldPolicy,
}

impl Default for FieldPolicies {
    fn default() -> Self {
        Self {
            email: FieldPolicy { unique: true },
            backup_email: FieldPolicy { unique: false },
        }
    }
}

impl FieldPolicies {
    pub fn get(&self, field: EmailField) -> &FieldPolicy {
        match field {
            EmailField::Email => &self.email,
            EmailField::BackupEmail => &self.backup_email,
        }
    }

    pub fn get_mut(&mut self, field: EmailField) -> &mut FieldPolicy {
        match field {
            EmailField::Email => &mut self.email,
            EmailField::BackupEmail => &mut self.backup_email,
        }
    }
}

/// Configuration for [`EmailValidator`](super::validator::EmailValidator).
///
/// All fields have defaults. Override them in code with the `with_*`
/// setters, deserialize them as part of a larger config, or load them from
/// the environment with [`ValidatorConfig::from_env`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Longest accepted value, in characters (default: `254`). Zero is
    /// unrepresentable, in code and in deserialized config alike.
    pub max_length: NonZeroUsize,
    /// Domains that are always rejected.
    pub denied_domains: BTreeSet<String>,
    pub domain_match: DomainMatch,
    pub format: FormatPolicy,
    /// Lower-case the domain part of accepted values (default: off).
    pub normalize_domain: bool,
    pub fields: FieldPolicies,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_length: MAX_EMAIL_LENGTH,
            denied_domains: DEFAULT_DENIED_DOMAINS
                .iter()
                .map(|d| d.to_string())
                .collect(),
            domain_match: DomainMatch::default(),
            format: FormatPolicy::default(),
            normalize_domain: false,
            fields: FieldPolicies::default(),
        }
    }
}

impl ValidatorConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                  |
    /// |--------------------------|--------------------------|
    /// | `EMAIL_MAX_LENGTH`       | `254`                    |
    /// | `EMAIL_DENIED_DOMAINS`   | `hotmail.com,yahoo.com`  |
    /// | `EMAIL_DOMAIN_MATCH`     | `case_insensitive`       |
    /// | `EMAIL_FORMAT`           | `basic`                  |
    /// | `EMAIL_NORMALIZE_DOMAIN` | `false`                  |
    /// | `EMAIL_UNIQUE_FIELDS`    | `email`                  |
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup("EMAIL_MAX_LENGTH") {
            config.max_length = raw.trim().parse().map_err(|_| {
                CoreError::Config(format!(
                    "EMAIL_MAX_LENGTH must be a positive number, got '{raw}'"
                ))
            })?;
        }

        if let Some(raw) = lookup("EMAIL_DENIED_DOMAINS") {
            config.denied_domains = split_list(&raw).map(str::to_string).collect();
        }

        if let Some(raw) = lookup("EMAIL_DOMAIN_MATCH") {
            config.domain_match = match raw.trim() {
                "case_insensitive" => DomainMatch::CaseInsensitive,
                "exact" => DomainMatch::Exact,
                other => {
                    return Err(CoreError::Config(format!(
                        "EMAIL_DOMAIN_MATCH must be 'case_insensitive' or 'exact', got '{other}'"
                    )))
                }
            };
        }

        if let Some(raw) = lookup("EMAIL_FORMAT") {
            config.format = match raw.trim() {
                "basic" => FormatPolicy::Basic,
                "strict" => FormatPolicy::Strict,
                other => {
                    return Err(CoreError::Config(format!(
                        "EMAIL_FORMAT must be 'basic' or 'strict', got '{other}'"
                    )))
                }
            };
        }

        if let Some(raw) = lookup("EMAIL_NORMALIZE_DOMAIN") {
            config.normalize_domain = parse_bool("EMAIL_NORMALIZE_DOMAIN", &raw)?;
        }

        if let Some(raw) = lookup("EMAIL_UNIQUE_FIELDS") {
            let unique = split_list(&raw)
                .map(str::parse::<EmailField>)
                .collect::<Result<Vec<_>, _>>()?;
            for field in EmailField::ALL {
                config.fields.get_mut(field).unique = unique.contains(&field);
            }
        }

        Ok(config)
    }

    pub fn with_max_length(mut self, max_length: NonZeroUsize) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn with_denied_domains<I, D>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<String>,
    {
        self.denied_domains = domains.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_unique(mut self, field: EmailField, unique: bool) -> Self {
        self.fields.get_mut(field).unique = unique;
        self
    }

    pub fn with_format(mut self, format: FormatPolicy) -> Self {
        self.format = format;
        self
    }

    pub fn with_domain_match(mut self, domain_match: DomainMatch) -> Self {
        self.domain_match = domain_match;
        self
    }

    pub fn with_normalized_domain(mut self, normalize: bool) -> Self {
        self.normalize_domain = normalize;
        self
    }

    /// Whether `field` is checked against the record store.
    pub fn unique_for(&self, field: EmailField) -> bool {
        self.fields.get(field).unique
    }

    /// Whether `domain` matches an entry of the denylist.
    pub fn is_denied(&self, domain: &str) -> bool {
        match self.domain_match {
            DomainMatch::Exact => self.denied_domains.contains(domain),
            DomainMatch::CaseInsensitive => {
                let domain = domain.to_lowercase();
                self.denied_domains
                    .iter()
                    .any(|denied| denied.to_lowercase() == domain)
            }
        }
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, CoreError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(CoreError::Config(format!(
            "{key} must be a boolean, got '{raw}'"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
