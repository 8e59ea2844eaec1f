//! Arbor — directory-tree reconcile controller daemon.
//!
//! Main entry point that wires the storage driver, the in-process event
//! bus, and the reconcile controller together.

use std::sync::Arc;

use tokio::sync::watch;
use tracing_subscriber::{fmt, EnvFilter};

use arbor_controller::{Controller, DriverClient, MemoryAppStorage, MemoryEventBus, Reconciler};
use arbor_core::config::AppConfig;
use arbor_core::error::AppError;
use arbor_core::result::AppResult;
use arbor_core::types::{DirectoryId, QueryOptions};
use arbor_database::driver::DirectoryDriver;
use arbor_entity::directory::{DirectoryEvent, NewDirectory};

/// Reconciler that records convergence in the log.
struct LogReconciler;

#[async_trait::async_trait]
impl Reconciler for LogReconciler {
    async fn reconcile(&self, event: DirectoryEvent) -> AppResult<()> {
        tracing::info!(
            event_type = %event.event_type,
            directory_id = %event.directory.id,
            name = %event.directory.name,
            "Reconciled directory"
        );
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Controller error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from file and environment
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("ARBOR_ENV").unwrap_or_else(|_| "development".to_string());

    AppConfig::load(&env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt().pretty().with_env_filter(filter).with_target(true).init();
        }
    }
}

/// Main controller run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Connecting to database...");
    let db_pool = arbor_database::DatabasePool::connect(&config.database).await?;

    arbor_database::migration::run_migrations(db_pool.pool()).await?;

    let mut driver = DirectoryDriver::new(db_pool.into_pool());
    if config.database.read_only {
        driver = driver.with_read_only();
    }
    if config.database.fast_reads {
        driver = driver.with_fast_reads();
    }
    let driver = Arc::new(driver);

    let base_dir = resolve_base_directory(&config, &driver).await?;
    tracing::info!(base_dir = %base_dir, "Starting reconcile controller");

    let bus = MemoryEventBus::new(256);

    let controller = Controller::builder(base_dir)
        .with_client(Arc::new(DriverClient::new(Arc::clone(&driver))))
        .with_watcher(Arc::new(bus.watcher()))
        .with_storage(Arc::new(MemoryAppStorage::new()))
        .with_reconciler(Arc::new(LogReconciler))
        .with_config(&config.controller)
        .build()?;

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            let _ = cancel_tx.send(true);
        }
    });

    match controller.run(cancel_rx).await {
        Err(e) if e.is_cancelled() => {
            tracing::info!("Controller stopped");
            Ok(())
        }
        other => other,
    }
}

/// Resolve the subtree root this controller owns: the configured id when
/// present, otherwise the first live root, otherwise a fresh one.
async fn resolve_base_directory(
    config: &AppConfig,
    driver: &DirectoryDriver,
) -> Result<DirectoryId, AppError> {
    if let Some(id) = config.controller.base_directory {
        return Ok(DirectoryId::from_uuid(id));
    }

    let roots = driver.list_roots(QueryOptions::new()).await?;
    if let Some(first) = roots.first() {
        return Ok(*first);
    }

    let root = driver
        .create_root(&NewDirectory {
            name: "root".to_string(),
            ..NewDirectory::default()
        })
        .await?;
    tracing::info!(directory_id = %root.id, "Created base root directory");

    Ok(root.id)
}
