//! PostgreSQL Ledger Adapter
//!
//! Implements the arrears domain's `LedgerStore` port on top of
//! [`LedgerRepository`]. Each `begin()` opens a database transaction; the
//! returned [`PostgresLedgerTransaction`] owns it, so dropping the
//! transaction without committing rolls it back.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::adapters::PostgresLedgerAdapter;
//! use domain_arrears::{ArrearsConfig, ArrearsEngine, LedgerStore};
//! use std::sync::Arc;
//!
//! let store: Arc<dyn LedgerStore> = Arc::new(PostgresLedgerAdapter::new(pool));
//! let engine = ArrearsEngine::new(store, &ArrearsConfig::default());
//! ```

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, instrument};

use core_kernel::{
    AdapterHealth, ArrearEntryId, DomainPort, DueId, HealthCheckResult, HealthCheckable, LeaseId,
    Money, PaymentId, PenaltyId, PortError, StallId, TenantId,
};
use domain_arrears::{
    ArrearEntry, ArrearSource, Arrears, Due, Lease, LedgerStore, LedgerTransaction, Payment,
    PaymentMethod, Penalty,
};

use crate::error::DatabaseError;
use crate::repositories::ledger::{
    ArrearEntryRow, ArrearsRow, DueRow, LeaseRow, LedgerRepository, PaymentRow, PenaltyRow,
};

/// PostgreSQL-backed Ledger Store
#[derive(Debug, Clone)]
pub struct PostgresLedgerAdapter {
    repository: LedgerRepository,
}

impl PostgresLedgerAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: LedgerRepository::new(pool),
        }
    }

    pub fn repository(&self) -> &LedgerRepository {
        &self.repository
    }
}

impl DomainPort for PostgresLedgerAdapter {}

#[async_trait]
impl HealthCheckable for PostgresLedgerAdapter {
    async fn health_check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();
        let result = self.repository.ping().await;
        let latency_ms = start.elapsed().as_millis() as u64;

        let (status, message) = match result {
            Ok(()) => (AdapterHealth::Healthy, None),
            Err(e) => (AdapterHealth::Unhealthy, Some(format!("Database error: {}", e))),
        };

        HealthCheckResult {
            adapter_id: "postgres-ledger-adapter".to_string(),
            status,
            latency_ms,
            message,
            checked_at: Utc::now(),
        }
    }
}

#[async_trait]
impl LedgerStore for PostgresLedgerAdapter {
    #[instrument(skip(self))]
    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>, PortError> {
        let tx = self.repository.begin().await?;
        debug!("Opened ledger transaction");
        Ok(Box::new(PostgresLedgerTransaction { tx }))
    }
}

/// An open PostgreSQL ledger transaction
pub struct PostgresLedgerTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerTransaction for PostgresLedgerTransaction {
    #[instrument(skip(self), fields(lease_id = %lease_id))]
    async fn find_lease(&mut self, lease_id: LeaseId) -> Result<Option<Lease>, PortError> {
        let row = LedgerRepository::find_lease(&mut self.tx, *lease_id.as_uuid()).await?;
        row.map(lease_from_row).transpose()
    }

    #[instrument(skip(self, lease), fields(lease_id = %lease.id))]
    async fn insert_lease(&mut self, lease: &Lease) -> Result<(), PortError> {
        LedgerRepository::insert_lease(&mut self.tx, &lease_to_row(lease)).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(lease_id = %lease_id))]
    async fn set_lease_end(&mut self, lease_id: LeaseId, end_date: NaiveDate) -> Result<(), PortError> {
        LedgerRepository::set_lease_end(&mut self.tx, *lease_id.as_uuid(), end_date).await?;
        Ok(())
    }

    #[instrument(skip(self, due), fields(lease_id = %due.lease_id, due_id = %due.id))]
    async fn insert_due(&mut self, due: &Due) -> Result<(), PortError> {
        LedgerRepository::insert_due(&mut self.tx, &due_to_row(due)).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(due_id = %due_id))]
    async fn find_due_for_update(&mut self, due_id: DueId) -> Result<Option<Due>, PortError> {
        let row = LedgerRepository::find_due_for_update(&mut self.tx, *due_id.as_uuid()).await?;
        row.map(due_from_row).transpose()
    }

    async fn due_exists_on(&mut self, lease_id: LeaseId, due_date: NaiveDate) -> Result<bool, PortError> {
        Ok(LedgerRepository::due_exists_on(&mut self.tx, *lease_id.as_uuid(), due_date).await?)
    }

    #[instrument(skip(self), fields(lease_id = %lease_id))]
    async fn oldest_unpaid_due(&mut self, lease_id: LeaseId) -> Result<Option<Due>, PortError> {
        let row = LedgerRepository::oldest_unpaid_due(&mut self.tx, *lease_id.as_uuid()).await?;
        row.map(due_from_row).transpose()
    }

    async fn unpaid_dues(&mut self, lease_id: LeaseId) -> Result<Vec<Due>, PortError> {
        LedgerRepository::unpaid_dues(&mut self.tx, *lease_id.as_uuid())
            .await?
            .into_iter()
            .map(due_from_row)
            .collect()
    }

    #[instrument(skip(self))]
    async fn overdue_unpaid_dues(&mut self, before: NaiveDate) -> Result<Vec<Due>, PortError> {
        let rows = LedgerRepository::overdue_unpaid_dues(&mut self.tx, before).await?;
        debug!(count = rows.len(), "Loaded overdue dues");
        rows.into_iter().map(due_from_row).collect()
    }

    #[instrument(skip(self), fields(due_id = %due_id))]
    async fn mark_due_paid(&mut self, due_id: DueId) -> Result<(), PortError> {
        LedgerRepository::mark_due_paid(&mut self.tx, *due_id.as_uuid()).await?;
        Ok(())
    }

    #[instrument(skip(self, payment), fields(lease_id = %payment.lease_id, payment_id = %payment.id))]
    async fn insert_payment(&mut self, payment: &Payment) -> Result<(), PortError> {
        LedgerRepository::insert_payment(&mut self.tx, &payment_to_row(payment)).await?;
        Ok(())
    }

    async fn last_payment(&mut self, lease_id: LeaseId) -> Result<Option<Payment>, PortError> {
        let row = LedgerRepository::last_payment(&mut self.tx, *lease_id.as_uuid()).await?;
        row.map(payment_from_row).transpose()
    }

    async fn payments(&mut self, lease_id: LeaseId) -> Result<Vec<Payment>, PortError> {
        LedgerRepository::payments(&mut self.tx, *lease_id.as_uuid())
            .await?
            .into_iter()
            .map(payment_from_row)
            .collect()
    }

    #[instrument(skip(self), fields(lease_id = %lease_id))]
    async fn lock_arrears(&mut self, lease_id: LeaseId) -> Result<Option<Arrears>, PortError> {
        let row = LedgerRepository::lock_arrears(&mut self.tx, *lease_id.as_uuid()).await?;
        Ok(row.map(|r| Arrears {
            lease_id: LeaseId::from_uuid(r.lease_id),
            total: Money::new(r.total_arrears),
            last_updated: r.last_updated,
        }))
    }

    #[instrument(skip(self, arrears), fields(lease_id = %arrears.lease_id, total = %arrears.total))]
    async fn save_arrears(&mut self, arrears: &Arrears) -> Result<(), PortError> {
        let row = ArrearsRow {
            lease_id: *arrears.lease_id.as_uuid(),
            total_arrears: arrears.total.amount(),
            last_updated: arrears.last_updated,
        };
        LedgerRepository::upsert_arrears(&mut self.tx, &row).await?;
        Ok(())
    }

    #[instrument(skip(self, entry), fields(lease_id = %entry.lease_id, source = %entry.source))]
    async fn insert_arrear_entry(&mut self, entry: &ArrearEntry) -> Result<(), PortError> {
        LedgerRepository::insert_arrear_entry(&mut self.tx, &entry_to_row(entry)).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(lease_id = %lease_id))]
    async fn oldest_open_arrear_entry(
        &mut self,
        lease_id: LeaseId,
        due_date: NaiveDate,
    ) -> Result<Option<ArrearEntry>, PortError> {
        let row =
            LedgerRepository::oldest_open_arrear_entry(&mut self.tx, *lease_id.as_uuid(), due_date).await?;
        row.map(entry_from_row).transpose()
    }

    async fn save_arrear_entry(&mut self, entry: &ArrearEntry) -> Result<(), PortError> {
        LedgerRepository::update_arrear_entry(&mut self.tx, &entry_to_row(entry)).await?;
        Ok(())
    }

    async fn arrear_entries(&mut self, lease_id: LeaseId) -> Result<Vec<ArrearEntry>, PortError> {
        LedgerRepository::arrear_entries(&mut self.tx, *lease_id.as_uuid())
            .await?
            .into_iter()
            .map(entry_from_row)
            .collect()
    }

    #[instrument(skip(self, penalty), fields(due_id = %penalty.due_id, amount = %penalty.amount))]
    async fn insert_penalty_once(&mut self, penalty: &Penalty) -> Result<bool, PortError> {
        let row = penalty_to_row(penalty)?;
        Ok(LedgerRepository::insert_penalty_once(&mut self.tx, &row).await?)
    }

    async fn penalties(&mut self, lease_id: LeaseId) -> Result<Vec<Penalty>, PortError> {
        LedgerRepository::penalties(&mut self.tx, *lease_id.as_uuid())
            .await?
            .into_iter()
            .map(penalty_from_row)
            .collect()
    }

    async fn commit(self: Box<Self>) -> Result<(), PortError> {
        self.tx.commit().await.map_err(DatabaseError::from)?;
        debug!("Committed ledger transaction");
        Ok(())
    }
}

// ============================================================================
// Row conversions
// ============================================================================

fn corrupt(message: String) -> PortError {
    DatabaseError::corrupt(message).into()
}

fn lease_to_row(lease: &Lease) -> LeaseRow {
    LeaseRow {
        lease_id: *lease.id.as_uuid(),
        tenant_id: *lease.tenant_id.as_uuid(),
        stall_id: *lease.stall_id.as_uuid(),
        start_date: lease.start_date,
        end_date: lease.end_date,
        monthly_rent: lease.monthly_rent.amount(),
        created_at: lease.created_at,
    }
}

fn lease_from_row(row: LeaseRow) -> Result<Lease, PortError> {
    Ok(Lease {
        id: LeaseId::from_uuid(row.lease_id),
        tenant_id: TenantId::from_uuid(row.tenant_id),
        stall_id: StallId::from_uuid(row.stall_id),
        start_date: row.start_date,
        end_date: row.end_date,
        monthly_rent: Money::new(row.monthly_rent),
        created_at: row.created_at,
    })
}

fn due_to_row(due: &Due) -> DueRow {
    DueRow {
        due_id: *due.id.as_uuid(),
        lease_id: *due.lease_id.as_uuid(),
        due_date: due.due_date,
        amount_due: due.amount.amount(),
        paid: due.paid,
        created_at: due.created_at,
    }
}

fn due_from_row(row: DueRow) -> Result<Due, PortError> {
    Ok(Due {
        id: DueId::from_uuid(row.due_id),
        lease_id: LeaseId::from_uuid(row.lease_id),
        due_date: row.due_date,
        amount: Money::new(row.amount_due),
        paid: row.paid,
        created_at: row.created_at,
    })
}

fn payment_to_row(payment: &Payment) -> PaymentRow {
    PaymentRow {
        payment_id: *payment.id.as_uuid(),
        lease_id: *payment.lease_id.as_uuid(),
        amount: payment.amount.amount(),
        payment_date: payment.payment_date,
        method: payment.method.as_str().to_string(),
        remarks: payment.remarks.clone(),
        receipt_ref: payment.receipt_ref.clone(),
        transaction_ref: payment.transaction_ref.clone(),
        recorded_by: payment.recorded_by.clone(),
        created_at: payment.created_at,
    }
}

fn payment_from_row(row: PaymentRow) -> Result<Payment, PortError> {
    let method: PaymentMethod = row.method.parse().map_err(corrupt)?;
    Ok(Payment {
        id: PaymentId::from_uuid(row.payment_id),
        lease_id: LeaseId::from_uuid(row.lease_id),
        amount: Money::new(row.amount),
        payment_date: row.payment_date,
        method,
        remarks: row.remarks,
        receipt_ref: row.receipt_ref,
        transaction_ref: row.transaction_ref,
        recorded_by: row.recorded_by,
        created_at: row.created_at,
    })
}

fn entry_to_row(entry: &ArrearEntry) -> ArrearEntryRow {
    ArrearEntryRow {
        arrear_entry_id: *entry.id.as_uuid(),
        lease_id: *entry.lease_id.as_uuid(),
        due_id: entry.due_id.map(|id| *id.as_uuid()),
        due_date: entry.due_date,
        source: entry.source.as_str().to_string(),
        original_amount: entry.original_amount.amount(),
        remaining: entry.remaining.amount(),
        paid: entry.paid,
        created_at: entry.created_at,
    }
}

fn entry_from_row(row: ArrearEntryRow) -> Result<ArrearEntry, PortError> {
    let source = ArrearSource::parse(&row.source)
        .ok_or_else(|| corrupt(format!("unknown arrear source: {}", row.source)))?;
    Ok(ArrearEntry {
        id: ArrearEntryId::from_uuid(row.arrear_entry_id),
        lease_id: LeaseId::from_uuid(row.lease_id),
        due_id: row.due_id.map(DueId::from_uuid),
        due_date: row.due_date,
        source,
        original_amount: Money::new(row.original_amount),
        remaining: Money::new(row.remaining),
        paid: row.paid,
        created_at: row.created_at,
    })
}

fn penalty_to_row(penalty: &Penalty) -> Result<PenaltyRow, PortError> {
    let days_overdue = i32::try_from(penalty.days_overdue)
        .map_err(|_| PortError::validation(format!("days_overdue out of range: {}", penalty.days_overdue)))?;
    Ok(PenaltyRow {
        penalty_id: *penalty.id.as_uuid(),
        lease_id: *penalty.lease_id.as_uuid(),
        due_id: *penalty.due_id.as_uuid(),
        penalty_amount: penalty.amount.amount(),
        days_overdue,
        applied_on: penalty.applied_on,
        created_at: penalty.created_at,
    })
}

fn penalty_from_row(row: PenaltyRow) -> Result<Penalty, PortError> {
    let days_overdue = u32::try_from(row.days_overdue)
        .map_err(|_| corrupt(format!("negative days_overdue on penalty {}", row.penalty_id)))?;
    Ok(Penalty {
        id: PenaltyId::from_uuid(row.penalty_id),
        lease_id: LeaseId::from_uuid(row.lease_id),
        due_id: DueId::from_uuid(row.due_id),
        amount: Money::new(row.penalty_amount),
        days_overdue,
        applied_on: row.applied_on,
        created_at: row.created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_payment_row_round_trip_keeps_method() {
        let payment = Payment::not_paid(LeaseId::new(), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(), "clerk");
        let restored = payment_from_row(payment_to_row(&payment)).unwrap();
        assert_eq!(restored, payment);
    }

    #[test]
    fn test_unknown_method_is_corrupt_row() {
        let mut row = payment_to_row(&Payment::new(
            LeaseId::new(),
            Money::new(dec!(10)),
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            PaymentMethod::Cash,
            "clerk",
        ));
        row.method = "cheque".to_string();

        assert!(matches!(payment_from_row(row), Err(PortError::Internal { .. })));
    }

    #[test]
    fn test_entry_row_maps_source() {
        let entry = ArrearEntry::new(
            LeaseId::new(),
            None,
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            ArrearSource::PartialPayment,
            Money::new(dec!(200)),
        );
        let row = entry_to_row(&entry);
        assert_eq!(row.source, "partial_payment");
        assert_eq!(entry_from_row(row).unwrap(), entry);
    }
}
