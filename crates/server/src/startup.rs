use std::{future::Future, net::SocketAddr, sync::Arc};

use configs::{AppConfig, Backend, StorageConfig};
use tracing::{info, warn};

use service::{
    runtime,
    storage::{DocumentStore, MemoryStore, SqlStore},
    Storage,
};

use crate::errors::StartupError;
use crate::routes;
use crate::state::AppState;

/// Open the configured backend; Postgres gets its migrations applied first.
pub async fn connect_storage(cfg: &StorageConfig) -> Result<Arc<dyn Storage>, StartupError> {
    let storage: Arc<dyn Storage> = match cfg.backend {
        Backend::Postgres => {
            let store = SqlStore::connect(&cfg.postgres).await?;
            store.migrate().await?;
            Arc::new(store)
        }
        Backend::Mongo => Arc::new(DocumentStore::connect(&cfg.mongo).await?),
        Backend::Memory => {
            warn!("using in-memory storage; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };
    info!(backend = ?cfg.backend, "storage ready");
    Ok(storage)
}

fn bind_addr(cfg: &AppConfig) -> anyhow::Result<SocketAddr> {
    Ok(format!("{}:{}", cfg.server.host, cfg.server.port).parse()?)
}

/// Resolves on Ctrl+C.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for Ctrl+C; serving until killed");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

/// Serve until Ctrl+C.
pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    run_until(config, shutdown_signal()).await
}

/// Build the app from `config` and serve until `shutdown` resolves, then close storage.
pub async fn run_until<F>(config: AppConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    runtime::ensure_env(&config.paths)
        .await
        .map_err(|e| StartupError::Runtime(e.to_string()))?;

    let storage = connect_storage(&config.storage).await?;
    let state = AppState::new(Arc::clone(&storage), &config.paths);
    let app = routes::build_router(state);

    let addr = bind_addr(&config)?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "http server listening");

    let served = axum::serve(listener, app).with_graceful_shutdown(shutdown).await;
    storage.close().await;
    served?;
    info!("http server stopped");
    Ok(())
}
