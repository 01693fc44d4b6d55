use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fundbridge_api::background::{ledger_reconciliation, notification_expiry, overdue_sweep};
use fundbridge_api::config::ServerConfig;
use fundbridge_api::router::build_app_router;
use fundbridge_api::state::AppState;
use fundbridge_engine::pg::PgStore;
use fundbridge_engine::FundingEngine;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "fundbridge_api=debug,fundbridge_engine=debug,tower_http=debug".into()
    });
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);
    if json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let pool = fundbridge_db::create_pool(&config.database_url, config.db_max_connections)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    fundbridge_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    fundbridge_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Engine ---
    let store = PgStore::new(pool.clone(), config.store_timeout);
    let engine = FundingEngine::new(store);

    // --- Background jobs ---
    let cancel = CancellationToken::new();
    let jobs = vec![
        tokio::spawn(overdue_sweep::run(
            engine.tasks.clone(),
            config.jobs.overdue_sweep,
            cancel.clone(),
        )),
        tokio::spawn(ledger_reconciliation::run(
            engine.ledger.clone(),
            config.jobs.ledger_reconcile,
            cancel.clone(),
        )),
        tokio::spawn(notification_expiry::run(
            engine.inbox.clone(),
            config.jobs.notification_purge,
            cancel.clone(),
        )),
    ];
    tracing::info!(count = jobs.len(), "Background jobs started");

    // --- Router ---
    let state = AppState {
        engine,
        config: Arc::new(config.clone()),
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    cancel.cancel();
    let drain = Duration::from_secs(config.shutdown_timeout_secs);
    match tokio::time::timeout(drain, join_all(jobs)).await {
        Ok(results) => {
            for e in results.into_iter().filter_map(Result::err) {
                tracing::error!(error = %e, "Background job panicked");
            }
            tracing::info!("Background jobs stopped");
        }
        Err(_) => tracing::warn!("Background jobs did not stop within the shutdown timeout"),
    }

    pool.close().await;
    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or SIGTERM to initiate graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
