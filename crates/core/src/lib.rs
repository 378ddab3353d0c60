//! Email field validation for persisted records.
//!
//! The [`email`] module holds the validator pipeline, its configuration and
//! the record store capability it queries for uniqueness. Nothing in this
//! crate talks to a database directly.

pub mod email;
pub mod error;
pub mod types;
