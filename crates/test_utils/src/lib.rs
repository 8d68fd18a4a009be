//! Test Utilities Crate
//!
//! Shared test infrastructure for the stall arrears workspace.
//!
//! # Modules
//!
//! - `fixtures`: Fixed dates, amounts and contexts used across tests
//! - `builders`: Builders for leases, dues and payments
//! - `database`: PostgreSQL testcontainer with the ledger schema applied
//! - `assertions`: Ledger-level assertion helpers
//! - `generators`: Proptest strategies for ledger inputs

pub mod fixtures;
pub mod builders;
pub mod database;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use database::*;
pub use assertions::*;
pub use generators::*;
