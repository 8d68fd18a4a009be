//! Payment Reconciler
//!
//! Applies incoming money to a lease's ledger. Each operation runs in one
//! transaction: the payment row, the due and arrears updates, and any new
//! arrear entry are committed together or not at all.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use core_kernel::{ArrearEntryId, DueId, LeaseId, Money, RequestContext};

use crate::arrears::{ArrearEntry, ArrearSource, Arrears, EntrySettlement};
use crate::config::ArrearsConfig;
use crate::due::Due;
use crate::error::ArrearsError;
use crate::lease::Lease;
use crate::payment::{Payment, PaymentMethod};
use crate::ports::{LedgerStore, LedgerTransaction};
use crate::scheduler::insert_next_due;

/// A payment submitted by a clerk or tenant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordPayment {
    pub lease_id: LeaseId,
    pub amount: Money,
    pub payment_date: NaiveDate,
    pub method: PaymentMethod,
    pub remarks: Option<String>,
    pub receipt_ref: Option<String>,
    pub transaction_ref: Option<String>,
    /// Also schedule the successor of the due this payment settles
    #[serde(default)]
    pub schedule_next: bool,
}

impl RecordPayment {
    pub fn new(lease_id: LeaseId, amount: Money, payment_date: NaiveDate, method: PaymentMethod) -> Self {
        Self {
            lease_id,
            amount,
            payment_date,
            method,
            remarks: None,
            receipt_ref: None,
            transaction_ref: None,
            schedule_next: false,
        }
    }

    pub fn with_remarks(mut self, remarks: impl Into<String>) -> Self {
        self.remarks = Some(remarks.into());
        self
    }

    pub fn scheduling_next(mut self) -> Self {
        self.schedule_next = true;
        self
    }
}

/// How a recorded payment was applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Allocation {
    /// The oldest open due was covered; any excess was not credited
    Settled {
        due_id: DueId,
        due_amount: Money,
        excess: Money,
    },
    /// The payment fell short; the shortfall moved into arrears
    Shortfall {
        due_id: DueId,
        due_amount: Money,
        shortfall: Money,
        arrear_entry_id: ArrearEntryId,
    },
    /// The previous payment amount was re-charged to arrears
    Recharged {
        amount: Money,
        arrear_entry_id: Option<ArrearEntryId>,
    },
    /// No open due to apply the payment to
    Unallocated,
}

/// Result of `record_payment` and `mark_not_paid`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentReceipt {
    pub payment: Payment,
    pub allocation: Allocation,
    pub arrears_total: Money,
    /// Successor due written in the same transaction, when requested
    pub next_due: Option<Due>,
}

impl PaymentReceipt {
    /// The due that was settled, for scheduling its successor
    pub fn settled_due(&self) -> Option<DueId> {
        match self.allocation {
            Allocation::Settled { due_id, .. } => Some(due_id),
            _ => None,
        }
    }
}

/// Result of `pay_arrear_entry`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArrearSettlement {
    pub entry: ArrearEntry,
    pub settlement: EntrySettlement,
    pub payment: Payment,
    pub arrears_total: Money,
}

/// Reconciles payments against dues and arrears
#[derive(Clone)]
pub struct PaymentReconciler {
    store: Arc<dyn LedgerStore>,
    interval_days: u32,
}

impl PaymentReconciler {
    pub fn new(store: Arc<dyn LedgerStore>, config: &ArrearsConfig) -> Self {
        Self {
            store,
            interval_days: config.due_interval_days,
        }
    }

    /// Records a payment and applies it to the lease's oldest unpaid due
    ///
    /// With `schedule_next`, a settled due's successor is inserted in the
    /// same transaction; if it cannot be scheduled nothing is recorded.
    #[instrument(skip(self, ctx, request), fields(actor = %ctx.principal, lease_id = %request.lease_id, amount = %request.amount))]
    pub async fn record_payment(
        &self,
        ctx: &RequestContext,
        request: RecordPayment,
    ) -> Result<PaymentReceipt, ArrearsError> {
        let amount = request.amount.ensure_positive("payment amount")?;
        if !request.method.is_tender() {
            return Err(ArrearsError::InvalidOperation(format!(
                "payment method {} cannot be recorded directly",
                request.method
            )));
        }

        let mut tx = self.store.begin().await?;
        let lease = require_lease(tx.as_mut(), request.lease_id).await?;

        let payment = Payment::new(lease.id, amount, request.payment_date, request.method, ctx.actor())
            .with_remarks(request.remarks)
            .with_receipt_ref(request.receipt_ref)
            .with_transaction_ref(request.transaction_ref);
        tx.insert_payment(&payment).await?;

        // due before arrears, the same lock order as accrual
        let open_due = tx.oldest_unpaid_due(lease.id).await?;
        let mut arrears = tx
            .lock_arrears(lease.id)
            .await?
            .unwrap_or_else(|| Arrears::empty(lease.id));

        let allocation = match open_due {
            None => Allocation::Unallocated,
            Some(due) if amount >= due.amount => {
                tx.mark_due_paid(due.id).await?;
                Allocation::Settled {
                    due_id: due.id,
                    due_amount: due.amount,
                    excess: amount - due.amount,
                }
            }
            Some(due) => {
                let shortfall = due.amount - amount;
                arrears.charge(shortfall)?;
                tx.save_arrears(&arrears).await?;

                let entry = ArrearEntry::new(
                    lease.id,
                    Some(due.id),
                    due.due_date,
                    ArrearSource::PartialPayment,
                    shortfall,
                );
                tx.insert_arrear_entry(&entry).await?;
                Allocation::Shortfall {
                    due_id: due.id,
                    due_amount: due.amount,
                    shortfall,
                    arrear_entry_id: entry.id,
                }
            }
        };

        let next_due = match &allocation {
            Allocation::Settled { due_id, .. } if request.schedule_next => {
                let settled = tx
                    .find_due_for_update(*due_id)
                    .await?
                    .ok_or_else(|| ArrearsError::not_found("Due", *due_id))?;
                Some(insert_next_due(tx.as_mut(), &lease, settled.due_date, None, self.interval_days).await?)
            }
            _ => None,
        };

        tx.commit().await?;

        match &allocation {
            Allocation::Settled { excess, .. } if excess.is_positive() => {
                warn!(payment_id = %payment.id, excess = %excess, "Overpayment excess not credited");
            }
            Allocation::Unallocated => {
                warn!(payment_id = %payment.id, "Payment recorded with no open due");
            }
            _ => {}
        }
        if let Some(due) = &next_due {
            info!(due_id = %due.id, due_date = %due.due_date, "Scheduled next due after payment");
        }
        info!(payment_id = %payment.id, arrears_total = %arrears.total, "Recorded payment");

        Ok(PaymentReceipt {
            payment,
            allocation,
            arrears_total: arrears.total,
            next_due,
        })
    }

    /// Records that the tenant did not pay
    ///
    /// Re-charges the amount of the lease's previous payment to arrears and
    /// logs a zero-amount marker. Nothing is charged when there is no
    /// previous payment or it was itself a not-paid marker. Dues are left
    /// untouched.
    #[instrument(skip(self, ctx), fields(actor = %ctx.principal, lease_id = %lease_id))]
    pub async fn mark_not_paid(
        &self,
        ctx: &RequestContext,
        lease_id: LeaseId,
        on: NaiveDate,
    ) -> Result<PaymentReceipt, ArrearsError> {
        let mut tx = self.store.begin().await?;
        let lease = require_lease(tx.as_mut(), lease_id).await?;

        let recharge = tx
            .last_payment(lease.id)
            .await?
            .map(|p| p.amount)
            .unwrap_or_else(Money::zero);

        let open_due = tx.oldest_unpaid_due(lease.id).await?;
        let mut arrears = tx
            .lock_arrears(lease.id)
            .await?
            .unwrap_or_else(|| Arrears::empty(lease.id));

        let mut arrear_entry_id = None;
        if recharge.is_positive() {
            arrears.charge(recharge)?;
            tx.save_arrears(&arrears).await?;

            let entry = ArrearEntry::new(
                lease.id,
                open_due.as_ref().map(|d| d.id),
                open_due.as_ref().map_or(on, |d| d.due_date),
                ArrearSource::NotPaid,
                recharge,
            );
            tx.insert_arrear_entry(&entry).await?;
            arrear_entry_id = Some(entry.id);
        }

        let marker = Payment::not_paid(lease.id, on, ctx.actor());
        tx.insert_payment(&marker).await?;
        tx.commit().await?;

        warn!(recharge = %recharge, arrears_total = %arrears.total, "Not-paid re-charged previous payment amount");

        Ok(PaymentReceipt {
            payment: marker,
            allocation: Allocation::Recharged {
                amount: recharge,
                arrear_entry_id,
            },
            arrears_total: arrears.total,
            next_due: None,
        })
    }

    /// Pays down the oldest open arrear entry for `due_date`
    #[instrument(skip(self, ctx), fields(actor = %ctx.principal, lease_id = %lease_id, due_date = %due_date))]
    pub async fn pay_arrear_entry(
        &self,
        ctx: &RequestContext,
        lease_id: LeaseId,
        due_date: NaiveDate,
        amount_paid: Money,
        paid_on: NaiveDate,
    ) -> Result<ArrearSettlement, ArrearsError> {
        let amount_paid = amount_paid.ensure_positive("amount paid")?;

        let mut tx = self.store.begin().await?;
        let lease = require_lease(tx.as_mut(), lease_id).await?;

        let mut entry = tx
            .oldest_open_arrear_entry(lease.id, due_date)
            .await?
            .ok_or_else(|| {
                ArrearsError::not_found("ArrearEntry", format!("{} on {}", lease.id, due_date))
            })?;

        let mut arrears = tx
            .lock_arrears(lease.id)
            .await?
            .unwrap_or_else(|| Arrears::empty(lease.id));

        let settlement = entry.settle(amount_paid);
        let removed = arrears.reduce(settlement.applied);
        if removed < settlement.applied {
            warn!(applied = %settlement.applied, removed = %removed, "Arrears total clamped at zero");
        }

        tx.save_arrear_entry(&entry).await?;
        tx.save_arrears(&arrears).await?;

        let payment = Payment::new(
            lease.id,
            amount_paid,
            paid_on,
            PaymentMethod::ArrearPayment,
            ctx.actor(),
        )
        .with_remarks(Some(format!("Arrear settlement for {}", due_date)));
        tx.insert_payment(&payment).await?;
        tx.commit().await?;

        info!(
            entry_id = %entry.id,
            applied = %settlement.applied,
            fully_paid = settlement.fully_paid,
            arrears_total = %arrears.total,
            "Settled arrear entry"
        );

        Ok(ArrearSettlement {
            entry,
            settlement,
            payment,
            arrears_total: arrears.total,
        })
    }

    /// Current arrears balance; zero for a lease that never fell behind
    #[instrument(skip(self, _ctx), fields(lease_id = %lease_id))]
    pub async fn arrears_balance(
        &self,
        _ctx: &RequestContext,
        lease_id: LeaseId,
    ) -> Result<Arrears, ArrearsError> {
        let mut tx = self.store.begin().await?;
        let lease = require_lease(tx.as_mut(), lease_id).await?;
        Ok(tx
            .lock_arrears(lease.id)
            .await?
            .unwrap_or_else(|| Arrears::empty(lease.id)))
    }
}

pub(crate) async fn require_lease(
    tx: &mut dyn LedgerTransaction,
    lease_id: LeaseId,
) -> Result<Lease, ArrearsError> {
    tx.find_lease(lease_id)
        .await?
        .ok_or_else(|| ArrearsError::lease_not_found(lease_id))
}
