//! The email validator: an ordered pipeline of checks run on every
//! assignment of an email field.
//!
//! Checks run in a fixed order and the first failure wins:
//!
//! 1. presence (`null` or `""`)
//! 2. type (must be a JSON string)
//! 3. format (one `@` between a non-empty local part and domain)
//! 4. length (at most `max_length` characters)
//! 5. domain (not on the denylist)
//! 6. uniqueness (one record store query, only for unique fields)
//!
//! Steps 1-5 are pure. Step 6 is the only side effect and never runs after
//! an earlier failure.

use serde_json::Value;
use validator::ValidateEmail;

use super::config::{FormatPolicy, ValidatorConfig};
use super::field::EmailField;
use super::store::RecordStore;
use super::violation::Violation;
use crate::error::CoreError;
use crate::types::DbId;

pub struct EmailValidator<S> {
    store: S,
    config: ValidatorConfig,
}

impl<S: RecordStore> EmailValidator<S> {
    pub fn new(store: S, config: ValidatorConfig) -> Self {
        Self { store, config }
    }

    /// Validator with the default policy.
    pub fn with_defaults(store: S) -> Self {
        Self::new(store, ValidatorConfig::default())
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Validate a candidate value for `field`.
    ///
    /// `current` is the id of the record being assigned, if it is already
    /// persisted; that record never collides with itself.
    ///
    /// Returns the accepted value. It is the input unchanged unless domain
    /// normalization is enabled.
    ///
    /// # Errors
    ///
    /// - [`CoreError::Violation`] for the first check that fails.
    /// - [`CoreError::Store`] if the uniqueness query itself fails.
    pub async fn validate(
        &self,
        field: EmailField,
        value: &Value,
        current: Option<DbId>,
    ) -> Result<String, CoreError> {
        let address = self.check(field, value).inspect_err(log_rejection)?;
        self.finish(field, address, current).await
    }

    /// [`validate`](Self::validate) for a value already known to be text.
    pub async fn validate_str(
        &self,
        field: EmailField,
        address: &str,
        current: Option<DbId>,
    ) -> Result<String, CoreError> {
        self.check_address(field, address).inspect_err(log_rejection)?;
        self.finish(field, address, current).await
    }

    /// Run checks 1-5 without touching the record store.
    pub fn check<'v>(&self, field: EmailField, value: &'v Value) -> Result<&'v str, Violation> {
        match value {
            Value::Null => Err(Violation::presence(field)),
            Value::String(address) => {
                self.check_address(field, address)?;
                Ok(address.as_str())
            }
            _ => Err(Violation::type_mismatch(field)),
        }
    }

    /// Presence, format, length and domain checks on text.
    pub fn check_address(&self, field: EmailField, address: &str) -> Result<(), Violation> {
        if address.is_empty() {
            return Err(Violation::presence(field));
        }

        let domain = self.check_format(field, address)?;

        if address.chars().count() > self.config.max_length.get() {
            return Err(Violation::length(field));
        }

        if self.config.is_denied(domain) {
            return Err(Violation::domain(
                field,
                self.config.denied_domains.iter().map(String::as_str),
            ));
        }

        Ok(())
    }

    /// Returns the domain part on success.
    fn check_format<'a>(&self, field: EmailField, address: &'a str) -> Result<&'a str, Violation> {
        let (local, domain) = address
            .split_once('@')
            .ok_or_else(|| Violation::format(field))?;

        if local.is_empty() || domain.is_empty() || domain.contains('@') {
            return Err(Violation::format(field));
        }

        if self.config.format == FormatPolicy::Strict && !matches_email_grammar(local, domain) {
            return Err(Violation::format(field));
        }

        Ok(domain)
    }

    async fn finish(
        &self,
        field: EmailField,
        address: &str,
        current: Option<DbId>,
    ) -> Result<String, CoreError> {
        let accepted = if self.config.normalize_domain {
            normalize_domain(address)
        } else {
            address.to_string()
        };

        if self.config.unique_for(field) {
            let taken = self
                .store
                .value_taken(field, &accepted, current)
                .await
                .inspect_err(|e| {
                    tracing::warn!(%field, error = %e, "Uniqueness lookup failed");
                })?;
            if taken {
                let violation = Violation::uniqueness(field);
                log_rejection(&violation);
                return Err(violation.into());
            }
        }

        tracing::debug!(%field, record_id = ?current, "Email accepted");
        Ok(accepted)
    }
}

fn log_rejection(violation: &Violation) {
    tracing::info!(
        field = %violation.field,
        kind = violation.kind.code(),
        "Email rejected",
    );
}

/// Longest local part `validate_email` accepts.
const LOCAL_PART_CHUNK: usize = 64;

/// Longest domain that fits beside a one-character local part within
/// `validate_email`'s 254 limit (in bytes, which is never less than chars).
const DOMAIN_CHUNK: usize = 252;

/// HTML5 email grammar without its length limits.
///
/// `validate_email` also rejects long local parts and long addresses, which
/// belongs to the length step. The local part is checked in pieces that fit
/// its limit and an oversized domain label by label, so only the grammar
/// decides the outcome here.
fn matches_email_grammar(local: &str, domain: &str) -> bool {
    let local: Vec<char> = local.chars().collect();
    let local_ok = local.chunks(LOCAL_PART_CHUNK).all(|chunk| {
        let part: String = chunk.iter().collect();
        format!("{part}@example.com").validate_email()
    });

    let domain_ok = if domain.len() <= DOMAIN_CHUNK {
        format!("a@{domain}").validate_email()
    } else {
        domain
            .split('.')
            .all(|label| format!("a@{label}.com").validate_email())
    };

    local_ok && domain_ok
}

/// Lower-case the domain part, leaving the local part as given.
fn normalize_domain(address: &str) -> String {
    match address.split_once('@') {
        Some((local, domain)) => format!("{local}@{}", domain.to_lowercase()),
        None => address.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::num::NonZeroUsize;
    use std::sync::Arc;

    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;
    use crate::email::config::DomainMatch;
    use crate::email::memory::InMemoryRecordStore;
    use crate::email::store::StoreError;
    use crate::email::violation::ValidationErrorKind;

    fn validator() -> EmailValidator<InMemoryRecordStore> {
        EmailValidator::with_defaults(InMemoryRecordStore::new())
    }

    fn long_address() -> String {
        format!("{}@gmail.com", "a".repeat(250))
    }

    async fn rejected(
        v: &EmailValidator<impl RecordStore>,
        field: EmailField,
        value: Value,
    ) -> Violation {
        match v.validate(field, &value, None).await {
            Err(CoreError::Violation(violation)) => violation,
            other => panic!("expected a violation for {value}, got {other:?}"),
        }
    }

    struct FailingStore;

    impl RecordStore for FailingStore {
        fn value_taken(
            &self,
            _field: EmailField,
            _value: &str,
            _exclude: Option<DbId>,
        ) -> impl Future<Output = Result<bool, StoreError>> + Send {
            std::future::ready(Err(StoreError::new("database unavailable")))
        }
    }

    // -- documented scenarios ------------------------------------------------

    #[tokio::test]
    async fn empty_string_is_presence_error() {
        let v = rejected(&validator(), EmailField::Email, json!("")).await;
        assert_eq!(v.kind, ValidationErrorKind::Presence);
        assert_eq!(v.message, "Email must be present.");
        assert_eq!(v.field, EmailField::Email);
    }

    #[tokio::test]
    async fn number_is_type_error() {
        let v = rejected(&validator(), EmailField::Email, json!(982)).await;
        assert_eq!(v.kind, ValidationErrorKind::Type);
        assert_eq!(v.message, "Email must be a string.");
    }

    #[tokio::test]
    async fn duplicate_of_other_record_is_uniqueness_error() {
        let validator = validator();
        validator.store().insert(Some("test@gmail.com"), None);

        let v = rejected(&validator, EmailField::Email, json!("test@gmail.com")).await;
        assert_eq!(v.kind, ValidationErrorKind::Uniqueness);
        assert_eq!(v.message, "Email must be unique.");
    }

    #[tokio::test]
    async fn overlong_address_is_length_error() {
        let v = rejected(&validator(), EmailField::Email, json!(long_address())).await;
        assert_eq!(v.kind, ValidationErrorKind::Length);
        assert_eq!(v.message, "Email is too long.");
    }

    #[tokio::test]
    async fn denied_domain_is_domain_error() {
        let v = rejected(&validator(), EmailField::Email, json!("test@hotmail.com")).await;
        assert_eq!(v.kind, ValidationErrorKind::Domain);
        assert_eq!(v.message, "Email cannot be a hotmail or yahoo address.");
    }

    #[tokio::test]
    async fn unique_address_is_returned_unchanged() {
        let accepted = validator()
            .validate(EmailField::Email, &json!("new.unique@gmail.com"), None)
            .await
            .unwrap();
        assert_eq!(accepted, "new.unique@gmail.com");
    }

    // -- individual checks ---------------------------------------------------

    #[tokio::test]
    async fn null_is_presence_error() {
        let v = rejected(&validator(), EmailField::BackupEmail, Value::Null).await;
        assert_eq!(v.kind, ValidationErrorKind::Presence);
        assert_eq!(v.field, EmailField::BackupEmail);
    }

    #[tokio::test]
    async fn non_text_values_are_type_errors() {
        let validator = validator();
        for value in [json!(0), json!(false), json!(true), json!([]), json!({}), json!(1.5)] {
            let v = rejected(&validator, EmailField::Email, value).await;
            assert_eq!(v.kind, ValidationErrorKind::Type);
        }
    }

    #[tokio::test]
    async fn malformed_addresses_are_format_errors() {
        let validator = validator();
        for value in ["plainaddress", " ", "@gmail.com", "user@", "a@b@c.com"] {
            let v = rejected(&validator, EmailField::Email, json!(value)).await;
            assert_eq!(v.kind, ValidationErrorKind::Format, "{value}");
            assert_eq!(v.message, "Email must have an '@' in the address.");
        }
    }

    #[tokio::test]
    async fn length_bound_is_inclusive() {
        let validator = validator();
        let at_limit = format!("{}@gmail.com", "a".repeat(244));
        assert_eq!(at_limit.chars().count(), 254);
        assert!(validator
            .validate(EmailField::Email, &json!(at_limit), None)
            .await
            .is_ok());

        let over = format!("{}@gmail.com", "a".repeat(245));
        let v = rejected(&validator, EmailField::Email, json!(over)).await;
        assert_eq!(v.kind, ValidationErrorKind::Length);
    }

    #[tokio::test]
    async fn length_counts_characters_not_bytes() {
        let validator = EmailValidator::new(
            InMemoryRecordStore::new(),
            ValidatorConfig::default().with_max_length(NonZeroUsize::new(12).unwrap()),
        );
        // 12 characters, 14 bytes.
        let address = "éé@gmail.com";
        assert_eq!(address.chars().count(), 12);
        assert!(validator
            .validate_str(EmailField::Email, address, None)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn yahoo_is_denied() {
        let v = rejected(&validator(), EmailField::Email, json!("someone@yahoo.com")).await;
        assert_eq!(v.kind, ValidationErrorKind::Domain);
    }

    #[tokio::test]
    async fn domain_match_ignores_case_by_default() {
        let v = rejected(&validator(), EmailField::Email, json!("test@HOTMAIL.COM")).await;
        assert_eq!(v.kind, ValidationErrorKind::Domain);
    }

    #[tokio::test]
    async fn exact_domain_match_lets_other_case_through() {
        let validator = EmailValidator::new(
            InMemoryRecordStore::new(),
            ValidatorConfig::default().with_domain_match(DomainMatch::Exact),
        );
        assert!(validator
            .validate_str(EmailField::Email, "test@HOTMAIL.COM", None)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn subdomain_of_denied_domain_is_allowed() {
        assert!(validator()
            .validate_str(EmailField::Email, "ops@mail.yahoo.com", None)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn custom_denylist_replaces_default() {
        let validator = EmailValidator::new(
            InMemoryRecordStore::new(),
            ValidatorConfig::default().with_denied_domains(["example.org"]),
        );
        assert!(validator
            .validate_str(EmailField::Email, "x@hotmail.com", None)
            .await
            .is_ok());

        let v = rejected(&validator, EmailField::Email, json!("x@example.org")).await;
        assert_eq!(v.message, "Email cannot be a example address.");
    }

    #[tokio::test]
    async fn strict_format_rejects_what_basic_accepts() {
        let basic = validator();
        assert!(basic
            .validate_str(EmailField::Email, "a b@gmail.com", None)
            .await
            .is_ok());

        let strict = EmailValidator::new(
            InMemoryRecordStore::new(),
            ValidatorConfig::default().with_format(FormatPolicy::Strict),
        );
        let v = rejected(&strict, EmailField::Email, json!("a b@gmail.com")).await;
        assert_eq!(v.kind, ValidationErrorKind::Format);
        assert!(strict
            .validate_str(EmailField::Email, "ab@gmail.com", None)
            .await
            .is_ok());
    }

    fn strict() -> EmailValidator<InMemoryRecordStore> {
        EmailValidator::new(
            InMemoryRecordStore::new(),
            ValidatorConfig::default().with_format(FormatPolicy::Strict),
        )
    }

    #[tokio::test]
    async fn strict_overlong_address_is_length_error() {
        let v = rejected(&strict(), EmailField::Email, json!(long_address())).await;
        assert_eq!(v.kind, ValidationErrorKind::Length);
        assert_eq!(v.message, "Email is too long.");
    }

    #[tokio::test]
    async fn strict_accepts_long_local_part_within_length() {
        let address = format!("{}@gmail.com", "a".repeat(65));
        assert_eq!(address.chars().count(), 75);
        assert_eq!(
            strict()
                .validate_str(EmailField::Email, &address, None)
                .await
                .unwrap(),
            address
        );
    }

    #[tokio::test]
    async fn strict_grammar_still_runs_before_length() {
        let address = format!("{} b@gmail.com", "a".repeat(300));
        let v = rejected(&strict(), EmailField::Email, json!(address)).await;
        assert_eq!(v.kind, ValidationErrorKind::Format);
    }

    #[tokio::test]
    async fn strict_overlong_domain_is_length_error() {
        let domain = vec!["sub"; 70].join(".");
        let address = format!("ops@{domain}.com");
        assert!(domain.len() > DOMAIN_CHUNK);
        let v = rejected(&strict(), EmailField::Email, json!(address)).await;
        assert_eq!(v.kind, ValidationErrorKind::Length);
    }

    // -- ordering ------------------------------------------------------------

    #[tokio::test]
    async fn format_runs_before_length() {
        let v = rejected(&validator(), EmailField::Email, json!("a".repeat(300))).await;
        assert_eq!(v.kind, ValidationErrorKind::Format);
    }

    #[tokio::test]
    async fn length_runs_before_domain() {
        let address = format!("{}@hotmail.com", "a".repeat(250));
        let v = rejected(&validator(), EmailField::Email, json!(address)).await;
        assert_eq!(v.kind, ValidationErrorKind::Length);
    }

    #[tokio::test]
    async fn domain_runs_before_uniqueness() {
        let validator = validator();
        validator.store().insert(Some("test@hotmail.com"), None);

        let v = rejected(&validator, EmailField::Email, json!("test@hotmail.com")).await;
        assert_eq!(v.kind, ValidationErrorKind::Domain);
        assert_eq!(validator.store().lookups(), 0);
    }

    #[tokio::test]
    async fn earlier_failures_never_query_the_store() {
        let validator = validator();
        for value in [json!(""), json!(42), json!("nope"), json!(long_address())] {
            let _ = validator.validate(EmailField::Email, &value, None).await;
        }
        assert_eq!(validator.store().lookups(), 0);
    }

    #[tokio::test]
    async fn success_queries_the_store_exactly_once() {
        let validator = validator();
        validator
            .validate_str(EmailField::Email, "one@gmail.com", None)
            .await
            .unwrap();
        assert_eq!(validator.store().lookups(), 1);
    }

    // -- uniqueness policy ---------------------------------------------------

    #[tokio::test]
    async fn record_does_not_collide_with_itself() {
        let validator = validator();
        let id = validator.store().insert(Some("test@gmail.com"), None);

        let accepted = validator
            .validate_str(EmailField::Email, "test@gmail.com", Some(id))
            .await
            .unwrap();
        assert_eq!(accepted, "test@gmail.com");
    }

    #[tokio::test]
    async fn persisted_record_collides_with_another() {
        let validator = validator();
        validator.store().insert(Some("test@gmail.com"), None);
        let other = validator.store().insert(Some("other@gmail.com"), None);

        let err = validator
            .validate_str(EmailField::Email, "test@gmail.com", Some(other))
            .await
            .unwrap_err();
        assert_matches!(
            err.violation(),
            Some(Violation { kind: ValidationErrorKind::Uniqueness, .. })
        );
    }

    #[tokio::test]
    async fn backup_email_may_be_shared_by_default() {
        let validator = validator();
        validator
            .store()
            .insert(Some("a@gmail.com"), Some("shared@gmail.com"));

        assert!(validator
            .validate_str(EmailField::BackupEmail, "shared@gmail.com", None)
            .await
            .is_ok());
        assert_eq!(validator.store().lookups(), 0);
    }

    #[tokio::test]
    async fn backup_email_uniqueness_can_be_enabled() {
        let validator = EmailValidator::new(
            InMemoryRecordStore::new(),
            ValidatorConfig::default().with_unique(EmailField::BackupEmail, true),
        );
        validator
            .store()
            .insert(Some("a@gmail.com"), Some("shared@gmail.com"));

        let v = rejected(&validator, EmailField::BackupEmail, json!("shared@gmail.com")).await;
        assert_eq!(v.kind, ValidationErrorKind::Uniqueness);
        assert_eq!(v.field, EmailField::BackupEmail);
    }

    #[tokio::test]
    async fn primary_uniqueness_compares_primary_column_only() {
        let validator = validator();
        validator
            .store()
            .insert(Some("a@gmail.com"), Some("b@gmail.com"));

        assert!(validator
            .validate_str(EmailField::Email, "b@gmail.com", None)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn validation_is_idempotent() {
        let validator = validator();
        validator.store().insert(Some("taken@gmail.com"), None);

        for value in ["taken@gmail.com", "free@gmail.com", "x@yahoo.com"] {
            let first = validator.validate_str(EmailField::Email, value, None).await;
            let second = validator.validate_str(EmailField::Email, value, None).await;
            assert_eq!(
                first.as_ref().map_err(|e| e.violation().cloned()),
                second.as_ref().map_err(|e| e.violation().cloned()),
            );
        }
    }

    // -- normalization & store wiring ----------------------------------------

    #[tokio::test]
    async fn normalization_lowercases_domain_only() {
        let validator = EmailValidator::new(
            InMemoryRecordStore::new(),
            ValidatorConfig::default().with_normalized_domain(true),
        );
        let accepted = validator
            .validate_str(EmailField::Email, "John.Doe@GMail.COM", None)
            .await
            .unwrap();
        assert_eq!(accepted, "John.Doe@gmail.com");
    }

    #[tokio::test]
    async fn normalized_value_is_used_for_uniqueness() {
        let validator = EmailValidator::new(
            InMemoryRecordStore::new(),
            ValidatorConfig::default().with_normalized_domain(true),
        );
        validator.store().insert(Some("me@gmail.com"), None);

        let v = rejected(&validator, EmailField::Email, json!("me@GMAIL.com")).await;
        assert_eq!(v.kind, ValidationErrorKind::Uniqueness);
    }

    #[tokio::test]
    async fn store_failure_is_not_a_violation() {
        let validator = EmailValidator::with_defaults(FailingStore);
        let err = validator
            .validate_str(EmailField::Email, "ok@gmail.com", None)
            .await
            .unwrap_err();
        assert_matches!(&err, CoreError::Store(_));
        assert!(err.violation().is_none());
    }

    #[tokio::test]
    async fn store_failure_is_irrelevant_when_uniqueness_is_off() {
        let validator = EmailValidator::with_defaults(FailingStore);
        assert!(validator
            .validate_str(EmailField::BackupEmail, "ok@gmail.com", None)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn shared_store_can_be_injected() {
        let store = Arc::new(InMemoryRecordStore::new());
        store.insert(Some("taken@gmail.com"), None);

        let validator = EmailValidator::with_defaults(Arc::clone(&store));
        let v = rejected(&validator, EmailField::Email, json!("taken@gmail.com")).await;
        assert_eq!(v.kind, ValidationErrorKind::Uniqueness);

        let borrowed = EmailValidator::with_defaults(&*store);
        assert!(borrowed
            .validate_str(EmailField::Email, "free@gmail.com", None)
            .await
            .is_ok());
        assert_eq!(store.lookups(), 2);
    }

    #[test]
    fn check_is_pure() {
        let validator = validator();
        assert_eq!(
            validator.check(EmailField::Email, &json!("a@gmail.com")),
            Ok("a@gmail.com")
        );
        assert_eq!(validator.store().lookups(), 0);
    }
}
