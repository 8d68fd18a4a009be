//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for the stall arrears ledger using SQLx.
//!
//! # Architecture
//!
//! The crate follows the repository pattern:
//! - [`repositories::LedgerRepository`] owns the SQL and row types
//! - [`adapters::PostgresLedgerAdapter`] implements the domain's
//!   `LedgerStore` port on top of it, one database transaction per
//!   ledger transaction
//!
//! Schema lives in the workspace `migrations/` directory and is embedded
//! into the binary as [`pool::MIGRATOR`]; [`connect_ledger`] applies it.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{connect_ledger, DatabaseConfig, PostgresLedgerAdapter};
//!
//! let pool = connect_ledger(&DatabaseConfig::for_api("postgres://localhost/stall_arrears")).await?;
//! let store = PostgresLedgerAdapter::new(pool);
//! ```

pub mod pool;
pub mod error;
pub mod repositories;
pub mod adapters;

pub use pool::{DatabasePool, DatabaseConfig, connect_ledger, run_migrations};
pub use error::DatabaseError;
pub use repositories::LedgerRepository;
pub use adapters::{PostgresLedgerAdapter, PostgresLedgerTransaction};
