//! Domain Adapters
//!
//! Adapter implementations for domain ports, connecting the arrears
//! domain's `LedgerStore` to PostgreSQL.
//!
//! Each adapter:
//! - Implements the domain's port trait
//! - Translates between domain models and database row types
//! - Uses the repository layer for database operations

pub mod ledger;

pub use ledger::{PostgresLedgerAdapter, PostgresLedgerTransaction};
