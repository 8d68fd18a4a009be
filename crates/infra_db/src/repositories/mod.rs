//! Repository implementations
//!
//! Repositories encapsulate SQL queries and the row types they return.
//! Mapping rows onto domain types is left to the adapters.

pub mod ledger;

pub use ledger::LedgerRepository;
