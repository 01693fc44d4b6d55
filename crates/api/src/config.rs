use std::time::Duration;

use crate::auth::jwt::JwtConfig;

/// Intervals of the periodic background jobs.
#[derive(Debug, Clone)]
pub struct JobIntervals {
    /// Persist `overdue` on in-progress tasks past their deadline.
    pub overdue_sweep: Duration,
    /// Apply completed donations missing from the ledger.
    pub ledger_reconcile: Duration,
    /// Delete expired notifications.
    pub notification_purge: Duration,
}

impl Default for JobIntervals {
    fn default() -> Self {
        Self {
            overdue_sweep: Duration::from_secs(300),
            ledger_reconcile: Duration::from_secs(60),
            notification_purge: Duration::from_secs(3600),
        }
    }
}

/// Server configuration loaded from environment variables.
///
/// All fields except the database URL and JWT secret have defaults suitable
/// for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Graceful shutdown timeout in seconds (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Upper bound on any single store call (default: `5000` ms).
    pub store_timeout: Duration,
    pub database_url: String,
    /// Pool size (default: `20`).
    pub db_max_connections: u32,
    /// Bearer-token validation settings.
    pub jwt: JwtConfig,
    pub jobs: JobIntervals,
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("{name} must be a valid {}", std::any::type_name::<T>())),
        Err(_) => default,
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                            | Default                 |
    /// |------------------------------------|-------------------------|
    /// | `HOST`                             | `0.0.0.0`               |
    /// | `PORT`                             | `3000`                  |
    /// | `CORS_ORIGINS`                     | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`             | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS`            | `30`                    |
    /// | `STORE_TIMEOUT_MS`                 | `5000`                  |
    /// | `DATABASE_URL`                     | required                |
    /// | `DB_MAX_CONNECTIONS`               | `20`                    |
    /// | `JWT_SECRET`                       | required                |
    /// | `OVERDUE_SWEEP_INTERVAL_SECS`      | `300`                   |
    /// | `RECONCILE_INTERVAL_SECS`          | `60`                    |
    /// | `NOTIFICATION_PURGE_INTERVAL_SECS` | `3600`                  |
    ///
    /// # Panics
    ///
    /// Panics on a missing required variable or an unparsable value, so
    /// misconfiguration fails at startup.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let defaults = JobIntervals::default();
        let jobs = JobIntervals {
            overdue_sweep: Duration::from_secs(env_or(
                "OVERDUE_SWEEP_INTERVAL_SECS",
                defaults.overdue_sweep.as_secs(),
            )),
            ledger_reconcile: Duration::from_secs(env_or(
                "RECONCILE_INTERVAL_SECS",
                defaults.ledger_reconcile.as_secs(),
            )),
            notification_purge: Duration::from_secs(env_or(
                "NOTIFICATION_PURGE_INTERVAL_SECS",
                defaults.notification_purge.as_secs(),
            )),
        };

        Self {
            host,
            port: env_or("PORT", 3000),
            cors_origins,
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", 30),
            shutdown_timeout_secs: env_or("SHUTDOWN_TIMEOUT_SECS", 30),
            store_timeout: Duration::from_millis(env_or("STORE_TIMEOUT_MS", 5_000)),
            database_url,
            db_max_connections: env_or(
                "DB_MAX_CONNECTIONS",
                fundbridge_db::DEFAULT_MAX_CONNECTIONS,
            ),
            jwt: JwtConfig::from_env(),
            jobs,
        }
    }
}
