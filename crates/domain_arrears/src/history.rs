//! Arrears Ledger View
//!
//! Read-only, merged timeline of a lease's penalties and still-open dues.

use chrono::NaiveDate;
use serde::Serialize;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, instrument};

use core_kernel::{LeaseId, Money, RequestContext};

use crate::error::ArrearsError;
use crate::ports::LedgerStore;
use crate::reconciler::require_lease;

/// Kind of history line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryKind {
    PenaltyApplied,
    UnpaidDue,
}

impl HistoryKind {
    /// Sort rank on equal dates: penalties before dues
    fn rank(&self) -> u8 {
        match self {
            HistoryKind::PenaltyApplied => 0,
            HistoryKind::UnpaidDue => 1,
        }
    }
}

/// One line of arrears history
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub date: NaiveDate,
    pub kind: HistoryKind,
    pub amount: Money,
    pub description: String,
}

/// History of a lease, newest first
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArrearsHistory {
    pub lease_id: LeaseId,
    pub entries: Vec<HistoryEntry>,
    /// Sum of every penalty ever applied to the lease
    pub total_penalties: Money,
}

fn newest_first(a: &HistoryEntry, b: &HistoryEntry) -> Ordering {
    b.date
        .cmp(&a.date)
        .then_with(|| a.kind.rank().cmp(&b.kind.rank()))
}

#[derive(Clone)]
pub struct ArrearsLedgerView {
    store: Arc<dyn LedgerStore>,
}

impl ArrearsLedgerView {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self, _ctx), fields(lease_id = %lease_id))]
    pub async fn get_history(
        &self,
        _ctx: &RequestContext,
        lease_id: LeaseId,
    ) -> Result<ArrearsHistory, ArrearsError> {
        let mut tx = self.store.begin().await?;
        let lease = require_lease(tx.as_mut(), lease_id).await?;

        let penalties = tx.penalties(lease.id).await?;
        let unpaid = tx.unpaid_dues(lease.id).await?;
        debug!(penalties = penalties.len(), unpaid_dues = unpaid.len(), "Loaded history rows");

        let total_penalties: Money = penalties.iter().map(|p| p.amount).sum();

        let mut entries: Vec<HistoryEntry> = penalties
            .into_iter()
            .map(|p| HistoryEntry {
                date: p.applied_on,
                kind: HistoryKind::PenaltyApplied,
                amount: p.amount,
                description: format!("Penalty for {} days overdue", p.days_overdue),
            })
            .chain(unpaid.into_iter().map(|d| HistoryEntry {
                date: d.due_date,
                kind: HistoryKind::UnpaidDue,
                amount: d.amount,
                description: format!("Unpaid rent due {}", d.due_date),
            }))
            .collect();
        entries.sort_by(newest_first);

        Ok(ArrearsHistory {
            lease_id: lease.id,
            entries,
            total_penalties,
        })
    }
}
