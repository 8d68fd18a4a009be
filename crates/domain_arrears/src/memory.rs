//! In-memory Ledger Store
//!
//! Transactions are serialized behind a single `tokio::sync::Mutex`. Each
//! transaction works on a copy of the ledger and writes it back on commit,
//! so a dropped transaction leaves the ledger untouched.
//!
//! Writes can be made to fail once through [`FailPoint`], which is how the
//! rollback behaviour of the components is tested.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use core_kernel::{
    AdapterHealth, DomainPort, DueId, HealthCheckResult, HealthCheckable, LeaseId, PortError,
};

use crate::arrears::{ArrearEntry, Arrears};
use crate::due::Due;
use crate::lease::Lease;
use crate::payment::Payment;
use crate::penalty::Penalty;
use crate::ports::{LedgerStore, LedgerTransaction};

/// A write that can be made to fail on its next call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    InsertDue,
    MarkDuePaid,
    InsertPayment,
    SaveArrears,
    InsertArrearEntry,
    InsertPenalty,
    Commit,
}

/// A point-in-time copy of the whole ledger
#[derive(Debug, Clone, Default)]
pub struct LedgerSnapshot {
    pub leases: HashMap<LeaseId, Lease>,
    pub dues: Vec<Due>,
    pub payments: Vec<Payment>,
    pub arrears: HashMap<LeaseId, Arrears>,
    pub penalties: HashMap<DueId, Penalty>,
    pub arrear_entries: Vec<ArrearEntry>,
}

impl LedgerSnapshot {
    pub fn dues_of(&self, lease_id: LeaseId) -> Vec<&Due> {
        self.dues.iter().filter(|d| d.lease_id == lease_id).collect()
    }

    pub fn payments_of(&self, lease_id: LeaseId) -> Vec<&Payment> {
        self.payments.iter().filter(|p| p.lease_id == lease_id).collect()
    }

    pub fn penalties_of(&self, lease_id: LeaseId) -> Vec<&Penalty> {
        self.penalties.values().filter(|p| p.lease_id == lease_id).collect()
    }

    pub fn entries_of(&self, lease_id: LeaseId) -> Vec<&ArrearEntry> {
        self.arrear_entries.iter().filter(|e| e.lease_id == lease_id).collect()
    }
}

/// Ledger Store backed by process memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedgerStore {
    state: Arc<Mutex<LedgerSnapshot>>,
    fail_points: Arc<Mutex<HashSet<FailPoint>>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms `point` so that its next call fails with an internal error
    pub async fn fail_next(&self, point: FailPoint) {
        self.fail_points.lock().await.insert(point);
    }

    /// Copies the committed ledger
    pub async fn snapshot(&self) -> LedgerSnapshot {
        self.state.lock().await.clone()
    }
}

impl DomainPort for InMemoryLedgerStore {}

#[async_trait]
impl HealthCheckable for InMemoryLedgerStore {
    async fn health_check(&self) -> HealthCheckResult {
        HealthCheckResult {
            adapter_id: "in-memory-ledger".to_string(),
            status: AdapterHealth::Healthy,
            latency_ms: 0,
            message: None,
            checked_at: Utc::now(),
        }
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>, PortError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(InMemoryTransaction {
            guard,
            working,
            fail_points: Arc::clone(&self.fail_points),
        }))
    }
}

struct InMemoryTransaction {
    guard: OwnedMutexGuard<LedgerSnapshot>,
    working: LedgerSnapshot,
    fail_points: Arc<Mutex<HashSet<FailPoint>>>,
}

impl InMemoryTransaction {
    async fn trip(&self, point: FailPoint) -> Result<(), PortError> {
        if self.fail_points.lock().await.remove(&point) {
            return Err(PortError::internal(format!("injected failure at {:?}", point)));
        }
        Ok(())
    }

    fn due_mut(&mut self, due_id: DueId) -> Result<&mut Due, PortError> {
        self.working
            .dues
            .iter_mut()
            .find(|d| d.id == due_id)
            .ok_or_else(|| PortError::not_found("Due", due_id))
    }
}

#[async_trait]
impl LedgerTransaction for InMemoryTransaction {
    async fn find_lease(&mut self, lease_id: LeaseId) -> Result<Option<Lease>, PortError> {
        Ok(self.working.leases.get(&lease_id).cloned())
    }

    async fn insert_lease(&mut self, lease: &Lease) -> Result<(), PortError> {
        if self.working.leases.contains_key(&lease.id) {
            return Err(PortError::conflict(format!("lease {} already exists", lease.id)));
        }
        self.working.leases.insert(lease.id, lease.clone());
        Ok(())
    }

    async fn set_lease_end(&mut self, lease_id: LeaseId, end_date: NaiveDate) -> Result<(), PortError> {
        let lease = self
            .working
            .leases
            .get_mut(&lease_id)
            .ok_or_else(|| PortError::not_found("Lease", lease_id))?;
        lease.end_date = Some(end_date);
        Ok(())
    }

    async fn insert_due(&mut self, due: &Due) -> Result<(), PortError> {
        self.trip(FailPoint::InsertDue).await?;
        self.working.dues.push(due.clone());
        Ok(())
    }

    async fn find_due_for_update(&mut self, due_id: DueId) -> Result<Option<Due>, PortError> {
        Ok(self.working.dues.iter().find(|d| d.id == due_id).cloned())
    }

    async fn due_exists_on(&mut self, lease_id: LeaseId, due_date: NaiveDate) -> Result<bool, PortError> {
        Ok(self
            .working
            .dues
            .iter()
            .any(|d| d.lease_id == lease_id && d.due_date == due_date))
    }

    async fn oldest_unpaid_due(&mut self, lease_id: LeaseId) -> Result<Option<Due>, PortError> {
        Ok(self.unpaid_dues(lease_id).await?.into_iter().next())
    }

    async fn unpaid_dues(&mut self, lease_id: LeaseId) -> Result<Vec<Due>, PortError> {
        let mut dues: Vec<Due> = self
            .working
            .dues
            .iter()
            .filter(|d| d.lease_id == lease_id && !d.paid)
            .cloned()
            .collect();
        dues.sort_by_key(|d| (d.due_date, d.created_at));
        Ok(dues)
    }

    async fn overdue_unpaid_dues(&mut self, before: NaiveDate) -> Result<Vec<Due>, PortError> {
        let mut dues: Vec<Due> = self
            .working
            .dues
            .iter()
            .filter(|d| !d.paid && d.due_date < before)
            .cloned()
            .collect();
        dues.sort_by_key(|d| (d.due_date, d.created_at));
        Ok(dues)
    }

    async fn mark_due_paid(&mut self, due_id: DueId) -> Result<(), PortError> {
        self.trip(FailPoint::MarkDuePaid).await?;
        self.due_mut(due_id)?.paid = true;
        Ok(())
    }

    async fn insert_payment(&mut self, payment: &Payment) -> Result<(), PortError> {
        self.trip(FailPoint::InsertPayment).await?;
        self.working.payments.push(payment.clone());
        Ok(())
    }

    async fn last_payment(&mut self, lease_id: LeaseId) -> Result<Option<Payment>, PortError> {
        Ok(self
            .working
            .payments
            .iter()
            .filter(|p| p.lease_id == lease_id)
            .max_by_key(|p| (p.payment_date, p.created_at))
            .cloned())
    }

    async fn payments(&mut self, lease_id: LeaseId) -> Result<Vec<Payment>, PortError> {
        let mut payments: Vec<Payment> = self
            .working
            .payments
            .iter()
            .filter(|p| p.lease_id == lease_id)
            .cloned()
            .collect();
        payments.sort_by_key(|p| (p.payment_date, p.created_at));
        Ok(payments)
    }

    async fn lock_arrears(&mut self, lease_id: LeaseId) -> Result<Option<Arrears>, PortError> {
        Ok(self.working.arrears.get(&lease_id).cloned())
    }

    async fn save_arrears(&mut self, arrears: &Arrears) -> Result<(), PortError> {
        self.trip(FailPoint::SaveArrears).await?;
        self.working.arrears.insert(arrears.lease_id, arrears.clone());
        Ok(())
    }

    async fn insert_arrear_entry(&mut self, entry: &ArrearEntry) -> Result<(), PortError> {
        self.trip(FailPoint::InsertArrearEntry).await?;
        self.working.arrear_entries.push(entry.clone());
        Ok(())
    }

    async fn oldest_open_arrear_entry(
        &mut self,
        lease_id: LeaseId,
        due_date: NaiveDate,
    ) -> Result<Option<ArrearEntry>, PortError> {
        Ok(self
            .working
            .arrear_entries
            .iter()
            .filter(|e| e.lease_id == lease_id && e.due_date == due_date && !e.paid)
            .min_by_key(|e| e.created_at)
            .cloned())
    }

    async fn save_arrear_entry(&mut self, entry: &ArrearEntry) -> Result<(), PortError> {
        let slot = self
            .working
            .arrear_entries
            .iter_mut()
            .find(|e| e.id == entry.id)
            .ok_or_else(|| PortError::not_found("ArrearEntry", entry.id))?;
        *slot = entry.clone();
        Ok(())
    }

    async fn arrear_entries(&mut self, lease_id: LeaseId) -> Result<Vec<ArrearEntry>, PortError> {
        let mut entries: Vec<ArrearEntry> = self
            .working
            .arrear_entries
            .iter()
            .filter(|e| e.lease_id == lease_id)
            .cloned()
            .collect();
        entries.sort_by_key(|e| (e.due_date, e.created_at));
        Ok(entries)
    }

    async fn insert_penalty_once(&mut self, penalty: &Penalty) -> Result<bool, PortError> {
        self.trip(FailPoint::InsertPenalty).await?;
        if self.working.penalties.contains_key(&penalty.due_id) {
            return Ok(false);
        }
        self.working.penalties.insert(penalty.due_id, penalty.clone());
        Ok(true)
    }

    async fn penalties(&mut self, lease_id: LeaseId) -> Result<Vec<Penalty>, PortError> {
        let mut penalties: Vec<Penalty> = self
            .working
            .penalties
            .values()
            .filter(|p| p.lease_id == lease_id)
            .cloned()
            .collect();
        penalties.sort_by_key(|p| (p.applied_on, p.created_at));
        Ok(penalties)
    }

    async fn commit(self: Box<Self>) -> Result<(), PortError> {
        self.trip(FailPoint::Commit).await?;
        let InMemoryTransaction {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::{Money, StallId, TenantId};
    use rust_decimal_macros::dec;

    use crate::lease::NewLease;

    fn lease() -> Lease {
        Lease::open(NewLease {
            tenant_id: TenantId::new(),
            stall_id: StallId::new(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            monthly_rent: Money::new(dec!(500)),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let store = InMemoryLedgerStore::new();
        let lease = lease();

        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_lease(&lease).await.unwrap();
        }

        assert!(store.snapshot().await.leases.is_empty());
    }

    #[tokio::test]
    async fn test_commit_publishes_writes() {
        let store = InMemoryLedgerStore::new();
        let lease = lease();

        let mut tx = store.begin().await.unwrap();
        tx.insert_lease(&lease).await.unwrap();
        tx.commit().await.unwrap();

        assert!(store.snapshot().await.leases.contains_key(&lease.id));
    }

    #[tokio::test]
    async fn test_fail_point_fires_once() {
        let store = InMemoryLedgerStore::new();
        store.fail_next(FailPoint::Commit).await;

        let tx = store.begin().await.unwrap();
        assert!(tx.commit().await.is_err());

        let tx = store.begin().await.unwrap();
        assert!(tx.commit().await.is_ok());
    }

    #[tokio::test]
    async fn test_penalty_inserted_once_per_due() {
        let store = InMemoryLedgerStore::new();
        let lease = lease();
        let due = Due::new(lease.id, NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(), lease.monthly_rent).unwrap();
        let penalty = Penalty {
            id: core_kernel::PenaltyId::new(),
            lease_id: lease.id,
            due_id: due.id,
            amount: Money::new(dec!(10)),
            days_overdue: 1,
            applied_on: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            created_at: Utc::now(),
        };

        let mut tx = store.begin().await.unwrap();
        assert!(tx.insert_penalty_once(&penalty).await.unwrap());
        assert!(!tx.insert_penalty_once(&penalty).await.unwrap());
    }

    #[tokio::test]
    async fn test_arrear_entries_ordered_by_due_date() {
        use crate::arrears::ArrearSource;

        let store = InMemoryLedgerStore::new();
        let lease = lease();
        let day = |d| NaiveDate::from_ymd_opt(2024, 3, d).unwrap();

        let mut tx = store.begin().await.unwrap();
        for d in [20, 5, 12] {
            let entry = ArrearEntry::new(lease.id, None, day(d), ArrearSource::NotPaid, Money::new(dec!(50)));
            tx.insert_arrear_entry(&entry).await.unwrap();
        }

        let dates: Vec<NaiveDate> = tx
            .arrear_entries(lease.id)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.due_date)
            .collect();
        assert_eq!(dates, vec![day(5), day(12), day(20)]);
    }
}
