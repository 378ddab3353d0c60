//! Repository layer: one struct per table, all methods take a `&PgPool`.

pub mod email_address_repo;

pub use email_address_repo::EmailAddressRepo;
