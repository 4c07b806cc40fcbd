//! DeployHub Server: static-site deployment platform
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;

use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

use deployhub::bootstrap;
use deployhub_core::config::AppConfig;
use deployhub_core::error::AppError;
use deployhub_core::traits::queue::TaskQueue;
use deployhub_database::DatabasePool;
use deployhub_database::repositories::{DeploymentRepository, ProjectRepository};
use deployhub_queue::QueueManager;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Load configuration for the environment named by `DEPLOYHUB_ENV`.
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("DEPLOYHUB_ENV").unwrap_or_else(|_| "development".to_string());
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
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting DeployHub v{}", env!("CARGO_PKG_VERSION"));
    let config = Arc::new(config);

    // ── Step 1: Database connection + migrations ─────────────────
    let db = DatabasePool::connect(&config.database).await?;
    if config.database.run_migrations {
        tracing::info!("Running database migrations...");
        deployhub_database::migration::run_migrations(db.pool()).await?;
        tracing::info!("Database migrations complete");
    }

    let deployments = Arc::new(DeploymentRepository::new(db.pool().clone()));
    let projects = Arc::new(ProjectRepository::new(db.pool().clone()));

    // ── Step 2: Task queue ───────────────────────────────────────
    tracing::info!(provider = %config.queue.provider, "Initializing task queue...");
    let queue: Arc<dyn TaskQueue> = Arc::new(QueueManager::new(&config.queue).await?);
    if !queue.health_check().await? {
        return Err(AppError::service_unavailable("Task queue is not reachable"));
    }

    // ── Step 3: Storage, gateway, services, workers ──────────────
    let components =
        bootstrap::assemble(config.clone(), deployments, projects, queue).await?;

    // ── Step 4: Shutdown channel ─────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Step 5: Start background workers ─────────────────────────
    let mut worker_handles = Vec::new();
    if config.worker.enabled {
        let consumer = components.consumer;
        let consumer_cancel = shutdown_rx.clone();
        worker_handles.push(tokio::spawn(async move {
            consumer.run(consumer_cancel).await;
        }));

        let expiry = components.expiry;
        let expiry_cancel = shutdown_rx.clone();
        worker_handles.push(tokio::spawn(async move {
            expiry.run(expiry_cancel).await;
        }));

        tracing::info!(
            max_concurrent = config.worker.max_concurrent_tasks,
            expiry_interval_seconds = config.worker.expiry_interval_seconds,
            "Background workers started"
        );
    } else {
        tracing::info!("Background workers disabled");
    }

    // ── Step 6: Build and start HTTP server ──────────────────────
    let app = deployhub_api::build_router(components.state);

    let addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!(addr = %addr, "DeployHub server listening");

    // ── Step 7: Graceful shutdown ────────────────────────────────
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, starting graceful shutdown...");
        let _ = shutdown_tx.send(true);
    });

    server
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    // ── Step 8: Wait for background tasks ────────────────────────
    // Both loops drain their own in-flight work, each bounded by its task
    // deadline, so the handles are awaited in full.
    tracing::info!("Waiting for background tasks to complete...");
    for handle in worker_handles {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "Background task terminated abnormally");
        }
    }

    db.close().await;
    tracing::info!("DeployHub server shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
