//! wallet_ledger - balance transfer backend API
//!
//! Users hold a balance and send money to each other; every transfer charges
//! the sender a commission and is recorded in an append-only ledger.

use std::net::SocketAddr;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wallet_ledger::api;
use wallet_ledger::db;
use wallet_ledger::jobs::{JobScheduler, JobSchedulerConfig};
use wallet_ledger::notification::{LogMailer, NotificationDispatcher, NotificationWorker};
use wallet_ledger::{AppState, Config};

/// Initialize tracing/logging
fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "wallet_ledger=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    init_tracing(config.log_json);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!(
        environment = %config.environment,
        commission_rate = %config.commission_rate,
        "Starting wallet_ledger server"
    );
    tracing::info!("Connecting to database...");

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;

    if config.run_migrations {
        db::run_migrations(&pool).await?;
        tracing::info!("Migrations applied");
    }

    if !db::check_schema(&pool).await? {
        tracing::error!("Database schema is not complete. Please run migrations.");
        return Err(anyhow::anyhow!("Database schema incomplete"));
    }

    tracing::info!("Database connected successfully");

    // Notifications are drained off the request path
    let (notifier, events) = NotificationDispatcher::channel(config.notification_queue_capacity);
    let worker = NotificationWorker::new(pool.clone(), LogMailer).start(events);

    let scheduler = JobScheduler::with_config(
        pool.clone(),
        JobSchedulerConfig {
            idempotency_cleanup_interval: Duration::from_secs(
                config.idempotency_cleanup_interval_secs,
            ),
        },
    )
    .start();

    let app = api::build_app(AppState::new(pool.clone(), &config, notifier));

    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutting down...");
    scheduler.abort();

    // The router held the last dispatcher handle, so the worker drains and exits
    if tokio::time::timeout(Duration::from_secs(5), worker)
        .await
        .is_err()
    {
        tracing::warn!("Notification worker did not drain in time");
    }

    pool.close().await;
    tracing::info!("Database connections closed. Goodbye!");

    Ok(())
}

/// Shutdown signal handler for graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}
