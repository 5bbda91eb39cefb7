use anyhow::{Context, Result};
use pulse_common::{shutdown, Signer};
use pulse_server::app::build_http_app;
use pulse_server::config::ServerConfig;
use pulse_server::snapshot::SnapshotScheduler;
use pulse_server::state::AppState;
use pulse_storage::{DatabaseRepository, MemoryRepository, Repository, SnapshotFile};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("pulse=info".parse()?))
        .init();

    let mut config = match std::env::args().nth(1) {
        Some(path) => ServerConfig::load(&path)
            .with_context(|| format!("failed to load config from {path}"))?,
        None => ServerConfig::default(),
    };
    config.apply_env()?;

    let signer = Signer::new(&config.key);
    tracing::info!(integrity = signer.is_enabled(), "Metric signing configured");

    // file mode keeps a snapshot alongside the in-memory table
    let (repository, snapshot): (Arc<dyn Repository>, Option<Arc<SnapshotFile>>) =
        if config.uses_database() {
            let repository =
                DatabaseRepository::connect(&config.database_dsn, config.pool_options(), signer.clone())
                    .await
                    .context("failed to open metric database")?;
            (Arc::new(repository), None)
        } else {
            let repository: Arc<dyn Repository> = Arc::new(MemoryRepository::new(signer.clone()));
            let file = Arc::new(SnapshotFile::new(&config.store_file));
            if config.restore {
                file.restore_into(repository.as_ref())
                    .await
                    .with_context(|| format!("failed to restore {}", config.store_file))?;
            }
            (repository, Some(file))
        };

    let mut state = AppState::new(repository.clone(), signer);
    let mut scheduler_handle = None;
    if let Some(file) = &snapshot {
        if config.store_interval_secs == 0 {
            state = state.with_sync_snapshot(file.clone());
            tracing::info!("Snapshot written after every update");
        } else {
            let scheduler =
                SnapshotScheduler::new(repository.clone(), file.clone(), config.store_interval_secs);
            scheduler_handle = Some(tokio::spawn(async move {
                scheduler.run().await;
            }));
        }
    }

    let listener = tokio::net::TcpListener::bind(&config.address)
        .await
        .with_context(|| format!("failed to bind {}", config.address))?;
    tracing::info!(
        address = %config.address,
        database = config.uses_database(),
        "Server started"
    );

    let served = axum::serve(listener, build_http_app(state))
        .with_graceful_shutdown(shutdown::signal())
        .await;
    if let Err(e) = &served {
        tracing::error!(error = %e, "HTTP server error");
    }

    if let Some(handle) = scheduler_handle {
        handle.abort();
    }
    if let Some(file) = snapshot {
        match file.persist_from(repository.as_ref()).await {
            Ok(count) => tracing::info!(count, "Final snapshot written"),
            Err(e) => tracing::error!(error = %e, "Final snapshot failed"),
        }
    }
    tracing::info!("Server stopped");

    served.map_err(Into::into)
}
