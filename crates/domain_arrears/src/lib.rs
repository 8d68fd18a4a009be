//! Arrears Domain - rent dues, penalty accrual and payment reconciliation
//!
//! This crate contains the stall-rental ledger logic:
//! - Lease lifecycle and due scheduling
//! - Daily penalty accrual into arrears
//! - Payment reconciliation against dues and arrear entries
//! - The merged arrears history view
//!
//! Persistence is behind the [`LedgerStore`] port. An in-memory adapter is
//! always available; the PostgreSQL adapter lives in `infra_db`.

pub mod error;
pub mod config;
pub mod lease;
pub mod due;
pub mod payment;
pub mod arrears;
pub mod penalty;
pub mod ports;
pub mod memory;
pub mod tenancy;
pub mod scheduler;
pub mod accrual;
pub mod reconciler;
pub mod history;

pub use error::ArrearsError;
pub use config::ArrearsConfig;
pub use lease::{Lease, NewLease};
pub use due::Due;
pub use payment::{Payment, PaymentMethod, NOT_PAID_REMARK};
pub use arrears::{ArrearEntry, ArrearSource, Arrears, EntrySettlement};
pub use penalty::{AccrualStrategy, Penalty, PenaltyAssessment, PenaltyPolicy};
pub use ports::{LedgerStore, LedgerTransaction};
pub use memory::{FailPoint, InMemoryLedgerStore, LedgerSnapshot};
pub use tenancy::LeaseService;
pub use scheduler::DueScheduler;
pub use accrual::{AccrualOutcome, AccrualReport, AppliedPenalty, PenaltyAccrualEngine};
pub use reconciler::{Allocation, ArrearSettlement, PaymentReceipt, PaymentReconciler, RecordPayment};
pub use history::{ArrearsHistory, ArrearsLedgerView, HistoryEntry, HistoryKind};

use std::sync::Arc;

/// All arrears components wired to one store
#[derive(Clone)]
pub struct ArrearsEngine {
    pub leases: LeaseService,
    pub scheduler: DueScheduler,
    pub accrual: PenaltyAccrualEngine,
    pub reconciler: PaymentReconciler,
    pub ledger: ArrearsLedgerView,
}

impl ArrearsEngine {
    pub fn new(store: Arc<dyn LedgerStore>, config: &ArrearsConfig) -> Self {
        Self {
            leases: LeaseService::new(Arc::clone(&store), config),
            scheduler: DueScheduler::new(Arc::clone(&store), config),
            accrual: PenaltyAccrualEngine::new(Arc::clone(&store), config),
            reconciler: PaymentReconciler::new(Arc::clone(&store), config),
            ledger: ArrearsLedgerView::new(store),
        }
    }
}
