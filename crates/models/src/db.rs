use std::time::Duration;

use configs::PostgresConfig;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tracing::{error, info};

use crate::errors::ModelError;

/// Pool options derived from the validated Postgres settings.
pub fn connect_options(cfg: &PostgresConfig) -> Result<ConnectOptions, ModelError> {
    let mut opts = ConnectOptions::new(cfg.url()?);
    opts.max_connections(cfg.max_connections)
        .min_connections(cfg.min_connections)
        .connect_timeout(Duration::from_secs(cfg.connect_timeout_secs))
        .acquire_timeout(Duration::from_secs(cfg.acquire_timeout_secs))
        .sqlx_logging(cfg.sqlx_logging);
    Ok(opts)
}

/// Open the pool and verify the server answers before returning it.
pub async fn connect(cfg: &PostgresConfig) -> Result<DatabaseConnection, ModelError> {
    let opts = connect_options(cfg)?;
    let db = Database::connect(opts).await.inspect_err(|e| {
        error!(host = %cfg.host, db = %cfg.name, error = %e, "postgres connect failed");
    })?;
    db.ping().await.inspect_err(|e| {
        error!(host = %cfg.host, db = %cfg.name, error = %e, "postgres ping failed");
    })?;
    info!(host = %cfg.host, db = %cfg.name, "connected to postgres");
    Ok(db)
}
