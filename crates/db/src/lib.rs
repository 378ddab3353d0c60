//! PostgreSQL plumbing for the email validator: pool setup, the
//! `email_addresses` repository and a [`RecordStore`] over it.
//!
//! [`RecordStore`]: mailguard_core::email::RecordStore

use sqlx::postgres::PgPoolOptions;

pub mod models;
pub mod repositories;
pub mod store;
pub mod unique;

pub use store::PgRecordStore;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to confirm the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
