#![cfg(test)]
use sea_orm::{ConnectOptions, Database};

use crate::storage::SqlStore;

/// Fresh in-memory SQLite store with the schema applied.
///
/// A single pooled connection keeps every query on the same in-memory database.
pub(crate) async fn sqlite_store() -> anyhow::Result<SqlStore> {
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opts).await?;
    let store = SqlStore::from_connection(db);
    store.migrate().await?;
    Ok(store)
}
