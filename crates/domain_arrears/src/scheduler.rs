//! Due Scheduler
//!
//! Emits the next unpaid due for a lease, one interval after a reference
//! date. Callers pass the resolved due's own date as the reference so that
//! the due cycle stays anchored to the lease start.

use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{info, instrument};

use core_kernel::temporal::add_days;
use core_kernel::{DueId, LeaseId, Money, RequestContext};

use crate::config::ArrearsConfig;
use crate::due::Due;
use crate::error::ArrearsError;
use crate::lease::Lease;
use crate::ports::{LedgerStore, LedgerTransaction};

/// Schedules successor dues
#[derive(Clone)]
pub struct DueScheduler {
    store: Arc<dyn LedgerStore>,
    interval_days: u32,
}

impl DueScheduler {
    pub fn new(store: Arc<dyn LedgerStore>, config: &ArrearsConfig) -> Self {
        Self {
            store,
            interval_days: config.due_interval_days,
        }
    }

    /// Inserts an unpaid due dated `after_date + interval`
    ///
    /// `amount` overrides the lease's monthly rent when given.
    #[instrument(skip(self, ctx), fields(actor = %ctx.principal, lease_id = %lease_id))]
    pub async fn schedule_next_due(
        &self,
        ctx: &RequestContext,
        lease_id: LeaseId,
        after_date: NaiveDate,
        amount: Option<Money>,
    ) -> Result<Due, ArrearsError> {
        let mut tx = self.store.begin().await?;
        let lease = tx
            .find_lease(lease_id)
            .await?
            .ok_or_else(|| ArrearsError::lease_not_found(lease_id))?;

        let due = insert_next_due(tx.as_mut(), &lease, after_date, amount, self.interval_days).await?;
        tx.commit().await?;

        info!(due_id = %due.id, due_date = %due.due_date, amount = %due.amount, "Scheduled due");
        Ok(due)
    }

    /// Schedules the due that follows `due_id`, at the lease's rent
    #[instrument(skip(self, ctx), fields(actor = %ctx.principal, due_id = %due_id))]
    pub async fn schedule_successor(
        &self,
        ctx: &RequestContext,
        due_id: DueId,
    ) -> Result<Due, ArrearsError> {
        let mut tx = self.store.begin().await?;
        let resolved = tx
            .find_due_for_update(due_id)
            .await?
            .ok_or_else(|| ArrearsError::not_found("Due", due_id))?;
        let lease = tx
            .find_lease(resolved.lease_id)
            .await?
            .ok_or_else(|| ArrearsError::lease_not_found(resolved.lease_id))?;

        let due = insert_next_due(tx.as_mut(), &lease, resolved.due_date, None, self.interval_days).await?;
        tx.commit().await?;

        info!(lease_id = %lease.id, due_id = %due.id, due_date = %due.due_date, "Scheduled successor due");
        Ok(due)
    }
}

/// Inserts the next due inside an open transaction
pub(crate) async fn insert_next_due(
    tx: &mut dyn LedgerTransaction,
    lease: &Lease,
    after_date: NaiveDate,
    amount: Option<Money>,
    interval_days: u32,
) -> Result<Due, ArrearsError> {
    let amount = match amount {
        Some(amount) => amount.ensure_positive("due amount")?,
        None => lease.monthly_rent,
    };

    let due_date = add_days(after_date, interval_days)?;
    lease.ensure_accepts_due_on(due_date)?;

    if tx.due_exists_on(lease.id, due_date).await? {
        return Err(ArrearsError::AlreadyProcessed(format!(
            "lease {} already has a due on {}",
            lease.id, due_date
        )));
    }

    let due = Due::new(lease.id, due_date, amount)?;
    tx.insert_due(&due).await?;
    Ok(due)
}
