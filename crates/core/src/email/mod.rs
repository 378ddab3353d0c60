//! Email field validation engine.
//!
//! Provides the field identifier, the violation taxonomy, the validator
//! configuration, the record store capability and the ordered check
//! pipeline run whenever an email-bearing field is assigned.

pub mod config;
pub mod field;
pub mod memory;
pub mod record;
pub mod store;
pub mod validator;
pub mod violation;

pub use config::{DomainMatch, FieldPolicy, FormatPolicy, ValidatorConfig};
pub use field::EmailField;
pub use memory::InMemoryRecordStore;
pub use record::EmailRecord;
pub use store::{RecordStore, StoreError};
pub use validator::EmailValidator;
pub use violation::{ValidationErrorKind, Violation};
