//! Lease lifecycle
//!
//! Opening a lease creates its zero arrears balance and its first due in the
//! same transaction.

use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{info, instrument};

use core_kernel::{LeaseId, RequestContext};

use crate::arrears::Arrears;
use crate::config::ArrearsConfig;
use crate::due::Due;
use crate::error::ArrearsError;
use crate::lease::{Lease, NewLease};
use crate::ports::LedgerStore;
use crate::scheduler::insert_next_due;

/// Opens and closes leases
#[derive(Clone)]
pub struct LeaseService {
    store: Arc<dyn LedgerStore>,
    interval_days: u32,
}

impl LeaseService {
    pub fn new(store: Arc<dyn LedgerStore>, config: &ArrearsConfig) -> Self {
        Self {
            store,
            interval_days: config.due_interval_days,
        }
    }

    #[instrument(skip(self, ctx, terms), fields(actor = %ctx.principal, tenant_id = %terms.tenant_id))]
    pub async fn open_lease(
        &self,
        ctx: &RequestContext,
        terms: NewLease,
    ) -> Result<(Lease, Due), ArrearsError> {
        let lease = Lease::open(terms)?;

        let mut tx = self.store.begin().await?;
        tx.insert_lease(&lease).await?;
        tx.save_arrears(&Arrears::empty(lease.id)).await?;
        let first_due =
            insert_next_due(tx.as_mut(), &lease, lease.start_date, None, self.interval_days).await?;
        tx.commit().await?;

        info!(
            lease_id = %lease.id,
            stall_id = %lease.stall_id,
            first_due = %first_due.due_date,
            "Opened lease"
        );
        Ok((lease, first_due))
    }

    #[instrument(skip(self, ctx), fields(actor = %ctx.principal, lease_id = %lease_id))]
    pub async fn close_lease(
        &self,
        ctx: &RequestContext,
        lease_id: LeaseId,
        end_date: NaiveDate,
    ) -> Result<Lease, ArrearsError> {
        let mut tx = self.store.begin().await?;
        let mut lease = tx
            .find_lease(lease_id)
            .await?
            .ok_or_else(|| ArrearsError::lease_not_found(lease_id))?;

        lease.close(end_date)?;
        tx.set_lease_end(lease_id, end_date).await?;
        tx.commit().await?;

        info!(end_date = %end_date, "Closed lease");
        Ok(lease)
    }

    pub async fn find_lease(&self, lease_id: LeaseId) -> Result<Lease, ArrearsError> {
        let mut tx = self.store.begin().await?;
        tx.find_lease(lease_id)
            .await?
            .ok_or_else(|| ArrearsError::lease_not_found(lease_id))
    }
}
