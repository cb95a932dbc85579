/// Persistence layer.
///
/// Endpoint identities and check history live in a local libsql (SQLite)
/// file. `Store` is the query contract the monitor and the API code against;
/// `migrations` owns the schema.
pub mod migrations;
pub mod models;
pub mod repository;

pub use repository::{LibsqlStore, Store, StoreError};

use anyhow::Result;

/// Initialize database with schema.
pub async fn initialize_database(conn: &libsql::Connection) -> Result<()> {
    migrations::run_migrations(conn).await
}
