//! Ledger Store port
//!
//! The four arrears components talk to persistence only through these
//! traits. A [`LedgerStore`] hands out [`LedgerTransaction`]s; every
//! multi-step operation (record a payment and update the due and arrears, or
//! log a penalty and sweep the due into arrears) runs inside one
//! transaction and either commits as a whole or leaves no trace.
//!
//! # Adapters
//!
//! - **PostgreSQL**: `infra_db::PostgresLedgerAdapter`, row locks via
//!   `SELECT ... FOR UPDATE` and an insert-once penalty constraint
//! - **In-memory**: [`crate::memory::InMemoryLedgerStore`], for tests and
//!   local runs
//!
//! # Usage
//!
//! ```rust,ignore
//! let mut tx = store.begin().await?;
//! let arrears = tx.lock_arrears(lease_id).await?;
//! // ... mutate ...
//! tx.commit().await?;
//! ```
//!
//! Dropping a transaction without calling `commit` rolls it back.

use async_trait::async_trait;
use chrono::NaiveDate;

use core_kernel::{DomainPort, DueId, HealthCheckable, LeaseId, PortError};

use crate::arrears::{ArrearEntry, Arrears};
use crate::due::Due;
use crate::lease::Lease;
use crate::payment::Payment;
use crate::penalty::Penalty;

/// Source of ledger transactions
#[async_trait]
pub trait LedgerStore: DomainPort + HealthCheckable {
    /// Opens a new transaction
    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>, PortError>;
}

/// A unit of work against the ledger
///
/// Reads see the transaction's own uncommitted writes. Methods named
/// `lock_*` or `*_for_update` take a row lock that is held until commit or
/// rollback.
#[async_trait]
pub trait LedgerTransaction: Send {
    // ========================================================================
    // Leases
    // ========================================================================

    async fn find_lease(&mut self, lease_id: LeaseId) -> Result<Option<Lease>, PortError>;

    async fn insert_lease(&mut self, lease: &Lease) -> Result<(), PortError>;

    async fn set_lease_end(&mut self, lease_id: LeaseId, end_date: NaiveDate) -> Result<(), PortError>;

    // ========================================================================
    // Dues
    // ========================================================================

    async fn insert_due(&mut self, due: &Due) -> Result<(), PortError>;

    /// Loads a due and locks it against concurrent accrual or payment
    async fn find_due_for_update(&mut self, due_id: DueId) -> Result<Option<Due>, PortError>;

    /// Returns true if the lease already has a due on `due_date`
    async fn due_exists_on(&mut self, lease_id: LeaseId, due_date: NaiveDate) -> Result<bool, PortError>;

    /// Oldest unpaid due of a lease, locked
    async fn oldest_unpaid_due(&mut self, lease_id: LeaseId) -> Result<Option<Due>, PortError>;

    /// All unpaid dues of a lease, oldest first
    async fn unpaid_dues(&mut self, lease_id: LeaseId) -> Result<Vec<Due>, PortError>;

    /// Unpaid dues across all leases with `due_date` strictly before `before`
    async fn overdue_unpaid_dues(&mut self, before: NaiveDate) -> Result<Vec<Due>, PortError>;

    async fn mark_due_paid(&mut self, due_id: DueId) -> Result<(), PortError>;

    // ========================================================================
    // Payments
    // ========================================================================

    async fn insert_payment(&mut self, payment: &Payment) -> Result<(), PortError>;

    /// Most recent payment of the lease, not-paid markers included
    async fn last_payment(&mut self, lease_id: LeaseId) -> Result<Option<Payment>, PortError>;

    /// All payments of the lease in payment-date order
    async fn payments(&mut self, lease_id: LeaseId) -> Result<Vec<Payment>, PortError>;

    // ========================================================================
    // Arrears
    // ========================================================================

    /// Loads and locks the lease's arrears row, if one exists
    async fn lock_arrears(&mut self, lease_id: LeaseId) -> Result<Option<Arrears>, PortError>;

    /// Inserts or overwrites the lease's arrears row
    async fn save_arrears(&mut self, arrears: &Arrears) -> Result<(), PortError>;

    async fn insert_arrear_entry(&mut self, entry: &ArrearEntry) -> Result<(), PortError>;

    /// Oldest unpaid arrear entry for the lease and due date, locked
    async fn oldest_open_arrear_entry(
        &mut self,
        lease_id: LeaseId,
        due_date: NaiveDate,
    ) -> Result<Option<ArrearEntry>, PortError>;

    async fn save_arrear_entry(&mut self, entry: &ArrearEntry) -> Result<(), PortError>;

    async fn arrear_entries(&mut self, lease_id: LeaseId) -> Result<Vec<ArrearEntry>, PortError>;

    // ========================================================================
    // Penalties
    // ========================================================================

    /// Inserts the penalty unless its due already has one
    ///
    /// # Returns
    ///
    /// `true` if the row was inserted, `false` if the due was already
    /// penalized (by this or a concurrent transaction)
    async fn insert_penalty_once(&mut self, penalty: &Penalty) -> Result<bool, PortError>;

    async fn penalties(&mut self, lease_id: LeaseId) -> Result<Vec<Penalty>, PortError>;

    // ========================================================================
    // Completion
    // ========================================================================

    async fn commit(self: Box<Self>) -> Result<(), PortError>;
}
