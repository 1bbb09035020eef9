//! Persistence layer: sqlx/Postgres models and repositories.
//!
//! Repositories are zero-sized structs with async methods taking `&PgPool`
//! as the first argument; callers own transaction boundaries.

pub mod models;
pub mod repositories;

/// Convenience alias for the Postgres connection pool.
pub type DbPool = sqlx::PgPool;

/// Embedded migrations for this crate's schema.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Open a connection pool against `database_url`.
pub async fn connect(database_url: &str) -> Result<DbPool, sqlx::Error> {
    sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(database_url)
        .await
}
