//! Ledger database pool
//!
//! Every arrears operation holds one connection for the length of its
//! transaction. The HTTP server runs many of those at once; the accrual job
//! scans once and then opens one transaction per due, strictly in sequence.
//! [`DatabaseConfig`] has a preset for each of the two workloads.

use sqlx::migrate::Migrator;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;

use crate::error::DatabaseError;

/// Type alias for the PostgreSQL connection pool
pub type DatabasePool = PgPool;

/// Ledger schema, embedded from `migrations/` at build time
pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Pool settings for the ledger database
///
/// ```rust
/// use infra_db::DatabaseConfig;
///
/// let config = DatabaseConfig::for_api("postgres://localhost/stall_arrears").max_connections(20);
/// assert!(config.migrate);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    /// How long an operation waits for a free connection
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    /// Apply pending migrations on connect
    pub migrate: bool,
}

impl DatabaseConfig {
    /// Concurrent request handling with a few warm connections
    pub fn for_api(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 10,
            min_connections: 2,
            acquire_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(10 * 60),
            migrate: true,
        }
    }

    /// One due at a time; the job never needs more than the scan plus a
    /// single per-due transaction
    pub fn for_accrual_job(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 2,
            min_connections: 0,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(60),
            migrate: true,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Leaves the schema alone, for deployments that migrate out of band
    pub fn without_migrations(mut self) -> Self {
        self.migrate = false;
        self
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::for_api("postgres://localhost/stall_arrears")
    }
}

/// Opens the ledger pool and, unless disabled, brings the schema up to date
///
/// # Errors
///
/// `DatabaseError::ConnectionFailed` if no connection can be made,
/// `DatabaseError::MigrationFailed` if a pending migration fails.
pub async fn connect_ledger(config: &DatabaseConfig) -> Result<DatabasePool, DatabaseError> {
    info!(
        max_connections = config.max_connections,
        migrate = config.migrate,
        "Connecting to ledger database"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .connect(&config.url)
        .await
        .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

    if config.migrate {
        run_migrations(&pool).await?;
    }
    Ok(pool)
}

/// Applies the ledger migrations that have not run yet
pub async fn run_migrations(pool: &DatabasePool) -> Result<(), DatabaseError> {
    MIGRATOR
        .run(pool)
        .await
        .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
    info!(migrations = MIGRATOR.iter().count(), "Ledger schema up to date");
    Ok(())
}
