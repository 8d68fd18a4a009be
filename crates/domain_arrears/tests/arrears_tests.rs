//! Component tests for domain_arrears against the in-memory ledger

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

use core_kernel::{LeaseId, Money, Rate, RequestContext, Principal, StallId, TenantId};

use domain_arrears::{
    AccrualOutcome, AccrualStrategy, Allocation, ArrearSource, ArrearsConfig, ArrearsEngine,
    ArrearsError, Due, FailPoint, HistoryKind, InMemoryLedgerStore, Lease, NewLease,
    PaymentMethod, PenaltyAccrualEngine, PenaltyPolicy, RecordPayment, NOT_PAID_REMARK,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn money(amount: Decimal) -> Money {
    Money::new(amount)
}

fn clerk() -> RequestContext {
    RequestContext::new(Principal::user("clerk-1", vec!["payment:write".to_string()]))
}

struct Ledger {
    store: Arc<InMemoryLedgerStore>,
    engine: ArrearsEngine,
    ctx: RequestContext,
}

impl Ledger {
    fn new() -> Self {
        Self::with_config(ArrearsConfig::default())
    }

    fn with_config(config: ArrearsConfig) -> Self {
        let store = Arc::new(InMemoryLedgerStore::new());
        let engine = ArrearsEngine::new(store.clone(), &config);
        Self {
            store,
            engine,
            ctx: clerk(),
        }
    }

    /// Opens a lease whose first due falls on `start + 30 days`
    async fn open(&self, start: NaiveDate, rent: Decimal) -> (Lease, Due) {
        self.engine
            .leases
            .open_lease(
                &self.ctx,
                NewLease {
                    tenant_id: TenantId::new(),
                    stall_id: StallId::new(),
                    start_date: start,
                    monthly_rent: money(rent),
                },
            )
            .await
            .unwrap()
    }

    async fn arrears_total(&self, lease_id: LeaseId) -> Money {
        self.engine
            .reconciler
            .arrears_balance(&self.ctx, lease_id)
            .await
            .unwrap()
            .total
    }

    async fn pay(&self, lease_id: LeaseId, amount: Decimal, method: PaymentMethod) -> Result<domain_arrears::PaymentReceipt, ArrearsError> {
        self.engine
            .reconciler
            .record_payment(
                &self.ctx,
                RecordPayment::new(lease_id, money(amount), date(2024, 1, 15), method),
            )
            .await
    }
}

// ============================================================================
// Lease lifecycle and Due Scheduler
// ============================================================================

mod scheduler_tests {
    use super::*;

    #[tokio::test]
    async fn test_open_lease_schedules_first_due() {
        let ledger = Ledger::new();
        let (lease, due) = ledger.open(date(2024, 1, 1), dec!(500)).await;

        assert_eq!(due.lease_id, lease.id);
        assert_eq!(due.due_date, date(2024, 1, 31));
        assert_eq!(due.amount, money(dec!(500)));
        assert!(!due.paid);

        let snapshot = ledger.store.snapshot().await;
        assert_eq!(snapshot.dues_of(lease.id).len(), 1);
        assert!(snapshot.arrears[&lease.id].total.is_zero());
    }

    #[tokio::test]
    async fn test_schedule_next_due_with_override() {
        let ledger = Ledger::new();
        let (lease, first) = ledger.open(date(2024, 1, 1), dec!(500)).await;

        let next = ledger
            .engine
            .scheduler
            .schedule_next_due(&ledger.ctx, lease.id, first.due_date, Some(money(dec!(550))))
            .await
            .unwrap();

        assert_eq!(next.due_date, date(2024, 3, 1));
        assert_eq!(next.amount, money(dec!(550)));
    }

    #[tokio::test]
    async fn test_schedule_for_unknown_lease() {
        let ledger = Ledger::new();
        let result = ledger
            .engine
            .scheduler
            .schedule_next_due(&ledger.ctx, LeaseId::new(), date(2024, 1, 1), None)
            .await;

        assert!(matches!(result, Err(ArrearsError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_schedule_rejects_non_positive_override() {
        let ledger = Ledger::new();
        let (lease, _) = ledger.open(date(2024, 1, 1), dec!(500)).await;

        let result = ledger
            .engine
            .scheduler
            .schedule_next_due(&ledger.ctx, lease.id, date(2024, 1, 31), Some(Money::zero()))
            .await;

        assert!(matches!(result, Err(ArrearsError::InvalidAmount(_))));
    }

    #[tokio::test]
    async fn test_schedule_same_date_twice_is_already_processed() {
        let ledger = Ledger::new();
        let (lease, first) = ledger.open(date(2024, 1, 1), dec!(500)).await;
        let scheduler = &ledger.engine.scheduler;

        scheduler
            .schedule_next_due(&ledger.ctx, lease.id, first.due_date, None)
            .await
            .unwrap();
        let again = scheduler
            .schedule_next_due(&ledger.ctx, lease.id, first.due_date, None)
            .await;

        assert!(matches!(again, Err(ArrearsError::AlreadyProcessed(_))));
        assert_eq!(ledger.store.snapshot().await.dues_of(lease.id).len(), 2);
    }

    #[tokio::test]
    async fn test_successor_is_anchored_to_resolved_due() {
        let ledger = Ledger::new();
        let (lease, first) = ledger.open(date(2024, 1, 1), dec!(500)).await;

        ledger.pay(lease.id, dec!(500), PaymentMethod::Cash).await.unwrap();
        let successor = ledger
            .engine
            .scheduler
            .schedule_successor(&ledger.ctx, first.id)
            .await
            .unwrap();

        assert_eq!(successor.due_date, date(2024, 3, 1));
        assert_eq!(successor.amount, lease.monthly_rent);
    }

    #[tokio::test]
    async fn test_closed_lease_refuses_due_past_end() {
        let ledger = Ledger::new();
        let (lease, first) = ledger.open(date(2024, 1, 1), dec!(500)).await;

        ledger
            .engine
            .leases
            .close_lease(&ledger.ctx, lease.id, date(2024, 2, 15))
            .await
            .unwrap();

        let result = ledger
            .engine
            .scheduler
            .schedule_next_due(&ledger.ctx, lease.id, first.due_date, None)
            .await;

        assert!(matches!(
            result,
            Err(ArrearsError::LeaseClosed { end_date, .. }) if end_date == date(2024, 2, 15)
        ));
    }

    #[tokio::test]
    async fn test_close_lease_before_start_is_invalid() {
        let ledger = Ledger::new();
        let (lease, _) = ledger.open(date(2024, 1, 1), dec!(500)).await;

        let result = ledger
            .engine
            .leases
            .close_lease(&ledger.ctx, lease.id, date(2023, 12, 31))
            .await;
        assert!(matches!(result, Err(ArrearsError::InvalidOperation(_))));

        let unknown = ledger
            .engine
            .leases
            .close_lease(&ledger.ctx, LeaseId::new(), date(2024, 6, 30))
            .await;
        assert!(matches!(unknown, Err(ArrearsError::NotFound { .. })));
    }
}

// ============================================================================
// Penalty Accrual Engine
// ============================================================================

mod accrual_tests {
    use super::*;

    #[tokio::test]
    async fn test_penalty_computation() {
        let ledger = Ledger::new();
        // 2023-12-02 + 30 days = 2024-01-01
        let (lease, due) = ledger.open(date(2023, 12, 2), dec!(1000)).await;
        assert_eq!(due.due_date, date(2024, 1, 1));

        let report = ledger
            .engine
            .accrual
            .accrue_penalties(&ledger.ctx, date(2024, 1, 11))
            .await
            .unwrap();

        let applied: Vec<_> = report.applied().collect();
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].days_overdue, 10);
        assert_eq!(applied[0].penalty_amount, money(dec!(200.00)));
        assert_eq!(applied[0].new_arrears_total, money(dec!(1200.00)));
        assert_eq!(ledger.arrears_total(lease.id).await, money(dec!(1200.00)));

        let snapshot = ledger.store.snapshot().await;
        let entries = snapshot.entries_of(lease.id);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].source, ArrearSource::Accrual);
        assert_eq!(entries[0].remaining, money(dec!(1200.00)));
        assert_eq!(entries[0].due_id, Some(due.id));
    }

    #[tokio::test]
    async fn test_accrual_is_idempotent() {
        let ledger = Ledger::new();
        let (lease, _) = ledger.open(date(2023, 12, 2), dec!(1000)).await;
        let accrual = &ledger.engine.accrual;

        accrual.accrue_penalties(&ledger.ctx, date(2024, 1, 11)).await.unwrap();
        let before = ledger.store.snapshot().await;

        let second = accrual.accrue_penalties(&ledger.ctx, date(2024, 1, 11)).await.unwrap();
        assert_eq!(second.applied_count(), 0);
        assert!(matches!(
            second.outcomes.as_slice(),
            [AccrualOutcome::AlreadyProcessed { .. }]
        ));

        let after = ledger.store.snapshot().await;
        assert_eq!(before.penalties.len(), after.penalties.len());
        assert_eq!(before.arrears[&lease.id], after.arrears[&lease.id]);
        assert_eq!(before.arrear_entries.len(), after.arrear_entries.len());
    }

    #[tokio::test]
    async fn test_penalized_due_is_not_recomputed_later() {
        let ledger = Ledger::new();
        let (lease, _) = ledger.open(date(2023, 12, 2), dec!(1000)).await;
        let accrual = &ledger.engine.accrual;

        accrual.accrue_penalties(&ledger.ctx, date(2024, 1, 11)).await.unwrap();
        let later = accrual.accrue_penalties(&ledger.ctx, date(2024, 1, 25)).await.unwrap();

        assert_eq!(later.applied_count(), 0);
        assert_eq!(ledger.arrears_total(lease.id).await, money(dec!(1200.00)));
    }

    #[tokio::test]
    async fn test_due_is_not_overdue_on_its_date() {
        let ledger = Ledger::new();
        let (_, due) = ledger.open(date(2024, 1, 1), dec!(500)).await;

        let report = ledger
            .engine
            .accrual
            .accrue_penalties(&ledger.ctx, due.due_date)
            .await
            .unwrap();

        assert!(report.outcomes.is_empty());
        assert!(report.affected_leases().is_empty());
    }

    #[tokio::test]
    async fn test_paid_due_is_never_penalized() {
        let ledger = Ledger::new();
        let (lease, _) = ledger.open(date(2024, 1, 1), dec!(500)).await;
        ledger.pay(lease.id, dec!(500), PaymentMethod::Cash).await.unwrap();

        let report = ledger
            .engine
            .accrual
            .accrue_penalties(&ledger.ctx, date(2024, 3, 1))
            .await
            .unwrap();

        assert!(report.outcomes.is_empty());
        assert!(ledger.store.snapshot().await.penalties.is_empty());
    }

    #[tokio::test]
    async fn test_failure_on_one_due_does_not_stop_batch() {
        let ledger = Ledger::new();
        let (first, _) = ledger.open(date(2023, 12, 2), dec!(1000)).await;
        let (second, _) = ledger.open(date(2023, 12, 2), dec!(400)).await;
        ledger.store.fail_next(FailPoint::InsertArrearEntry).await;

        let report = ledger
            .engine
            .accrual
            .accrue_penalties(&ledger.ctx, date(2024, 1, 11))
            .await
            .unwrap();

        assert_eq!(report.applied_count(), 1);
        assert_eq!(report.failed_count(), 1);

        // the failed due left no penalty behind and is picked up next run
        let snapshot = ledger.store.snapshot().await;
        assert_eq!(snapshot.penalties.len(), 1);

        let retry = ledger
            .engine
            .accrual
            .accrue_penalties(&ledger.ctx, date(2024, 1, 11))
            .await
            .unwrap();
        assert_eq!(retry.applied_count(), 1);
        assert_eq!(retry.failed_count(), 0);

        assert_eq!(ledger.arrears_total(first.id).await, money(dec!(1200.00)));
        assert_eq!(ledger.arrears_total(second.id).await, money(dec!(480.00)));
    }

    #[tokio::test]
    async fn test_concurrent_runs_penalize_once() {
        let ledger = Ledger::new();
        let (lease, _) = ledger.open(date(2023, 12, 2), dec!(1000)).await;
        let accrual = ledger.engine.accrual.clone();
        let other = ledger.engine.accrual.clone();
        let ctx = ledger.ctx.clone();

        let (a, b) = tokio::join!(
            accrual.accrue_penalties(&ctx, date(2024, 1, 11)),
            other.accrue_penalties(&ctx, date(2024, 1, 11)),
        );

        assert_eq!(a.unwrap().applied_count() + b.unwrap().applied_count(), 1);
        assert_eq!(ledger.store.snapshot().await.penalties_of(lease.id).len(), 1);
        assert_eq!(ledger.arrears_total(lease.id).await, money(dec!(1200.00)));
    }

    #[tokio::test]
    async fn test_affected_leases_reported() {
        let ledger = Ledger::new();
        let (late, _) = ledger.open(date(2023, 12, 2), dec!(1000)).await;
        let (on_time, _) = ledger.open(date(2023, 12, 2), dec!(1000)).await;
        ledger.pay(on_time.id, dec!(1000), PaymentMethod::MobileMoney).await.unwrap();

        let report = ledger
            .engine
            .accrual
            .accrue_penalties(&ledger.ctx, date(2024, 1, 5))
            .await
            .unwrap();

        let affected = report.affected_leases();
        assert!(affected.contains(&late.id));
        assert!(!affected.contains(&on_time.id));
        assert_eq!(report.total_penalties(), money(dec!(80.00)));
    }

    #[tokio::test]
    async fn test_principal_sweep_respects_grace_window() {
        let config = ArrearsConfig {
            accrual_strategy: AccrualStrategy::PrincipalSweep,
            grace_days: 15,
            ..ArrearsConfig::default()
        };
        let ledger = Ledger::with_config(config);
        let (lease, due) = ledger.open(date(2023, 12, 2), dec!(500)).await;
        let accrual = &ledger.engine.accrual;

        let early = accrual.accrue_penalties(&ledger.ctx, date(2024, 1, 16)).await.unwrap();
        assert!(matches!(
            early.outcomes.as_slice(),
            [AccrualOutcome::WithinGrace { days_overdue: 15, .. }]
        ));
        assert!(ledger.arrears_total(lease.id).await.is_zero());

        let swept = accrual.accrue_penalties(&ledger.ctx, date(2024, 1, 17)).await.unwrap();
        assert_eq!(swept.applied_count(), 1);
        assert_eq!(ledger.arrears_total(lease.id).await, due.amount);

        let again = accrual.accrue_penalties(&ledger.ctx, date(2024, 1, 30)).await.unwrap();
        assert_eq!(again.applied_count(), 0);
        assert_eq!(ledger.arrears_total(lease.id).await, due.amount);
    }

    #[tokio::test]
    async fn test_strategies_never_both_sweep_one_due() {
        let ledger = Ledger::new();
        let (lease, _) = ledger.open(date(2023, 12, 2), dec!(500)).await;

        let sweep = PenaltyAccrualEngine::with_policy(ledger.store.clone(), PenaltyPolicy::principal_sweep(15));
        sweep.accrue_penalties(&ledger.ctx, date(2024, 1, 20)).await.unwrap();

        let daily = PenaltyAccrualEngine::with_policy(ledger.store.clone(), PenaltyPolicy::daily(Rate::new(dec!(0.02))));
        let report = daily.accrue_penalties(&ledger.ctx, date(2024, 1, 20)).await.unwrap();

        assert_eq!(report.applied_count(), 0);
        assert_eq!(ledger.arrears_total(lease.id).await, money(dec!(500.00)));
    }
}

// ============================================================================
// Payment Reconciler
// ============================================================================

mod reconciler_tests {
    use super::*;

    #[tokio::test]
    async fn test_full_payment_clears_due() {
        let ledger = Ledger::new();
        let (lease, due) = ledger.open(date(2024, 1, 1), dec!(500)).await;

        let receipt = ledger.pay(lease.id, dec!(500.00), PaymentMethod::Cash).await.unwrap();

        assert_eq!(receipt.settled_due(), Some(due.id));
        assert!(ledger.arrears_total(lease.id).await.is_zero());
        let snapshot = ledger.store.snapshot().await;
        assert!(snapshot.dues_of(lease.id)[0].paid);
        assert_eq!(snapshot.payments_of(lease.id)[0].recorded_by, "clerk-1");
    }

    #[tokio::test]
    async fn test_overpayment_excess_is_reported_not_credited() {
        let ledger = Ledger::new();
        let (lease, _) = ledger.open(date(2024, 1, 1), dec!(500)).await;

        let receipt = ledger.pay(lease.id, dec!(650), PaymentMethod::BankTransfer).await.unwrap();

        assert!(matches!(
            receipt.allocation,
            Allocation::Settled { excess, .. } if excess == money(dec!(150))
        ));
        assert!(receipt.arrears_total.is_zero());
    }

    #[tokio::test]
    async fn test_partial_payment_adds_shortfall() {
        let ledger = Ledger::new();
        let (lease, due) = ledger.open(date(2024, 1, 1), dec!(500)).await;

        let receipt = ledger.pay(lease.id, dec!(300.00), PaymentMethod::Partial).await.unwrap();

        assert!(matches!(
            receipt.allocation,
            Allocation::Shortfall { shortfall, .. } if shortfall == money(dec!(200.00))
        ));
        assert_eq!(ledger.arrears_total(lease.id).await, money(dec!(200.00)));

        let snapshot = ledger.store.snapshot().await;
        assert!(!snapshot.dues_of(lease.id)[0].paid);
        let entries = snapshot.entries_of(lease.id);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].source, ArrearSource::PartialPayment);
        assert_eq!(entries[0].due_date, due.due_date);
    }

    #[tokio::test]
    async fn test_non_positive_amount_is_rejected() {
        let ledger = Ledger::new();
        let (lease, _) = ledger.open(date(2024, 1, 1), dec!(500)).await;

        for amount in [dec!(0), dec!(-10)] {
            let result = ledger.pay(lease.id, amount, PaymentMethod::Cash).await;
            assert!(matches!(result, Err(ArrearsError::InvalidAmount(_))));
        }
        assert!(ledger.store.snapshot().await.payments.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_lease_is_not_found() {
        let ledger = Ledger::new();
        let result = ledger.pay(LeaseId::new(), dec!(100), PaymentMethod::Cash).await;
        assert!(matches!(result, Err(ArrearsError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_synthetic_methods_cannot_be_recorded() {
        let ledger = Ledger::new();
        let (lease, _) = ledger.open(date(2024, 1, 1), dec!(500)).await;

        let result = ledger.pay(lease.id, dec!(100), PaymentMethod::NotPaid).await;
        assert!(matches!(result, Err(ArrearsError::InvalidOperation(_))));
    }

    #[tokio::test]
    async fn test_payment_without_open_due_is_unallocated() {
        let ledger = Ledger::new();
        let (lease, _) = ledger.open(date(2024, 1, 1), dec!(500)).await;
        ledger.pay(lease.id, dec!(500), PaymentMethod::Cash).await.unwrap();

        let receipt = ledger.pay(lease.id, dec!(100), PaymentMethod::Cash).await.unwrap();

        assert_eq!(receipt.allocation, Allocation::Unallocated);
        assert_eq!(ledger.store.snapshot().await.payments_of(lease.id).len(), 2);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_no_payment() {
        let ledger = Ledger::new();
        let (lease, _) = ledger.open(date(2024, 1, 1), dec!(500)).await;
        ledger.store.fail_next(FailPoint::MarkDuePaid).await;

        let result = ledger.pay(lease.id, dec!(500), PaymentMethod::Cash).await;

        assert!(matches!(result, Err(ArrearsError::Store(_))));
        let snapshot = ledger.store.snapshot().await;
        assert!(snapshot.payments.is_empty());
        assert!(!snapshot.dues_of(lease.id)[0].paid);
    }

    #[tokio::test]
    async fn test_mark_not_paid_recharges_previous_payment() {
        let ledger = Ledger::new();
        let (lease, _) = ledger.open(date(2024, 1, 1), dec!(500)).await;
        ledger.pay(lease.id, dec!(300), PaymentMethod::Partial).await.unwrap();

        let receipt = ledger
            .engine
            .reconciler
            .mark_not_paid(&ledger.ctx, lease.id, date(2024, 2, 1))
            .await
            .unwrap();

        assert!(receipt.payment.amount.is_zero());
        assert_eq!(receipt.payment.method, PaymentMethod::NotPaid);
        assert_eq!(receipt.payment.remarks.as_deref(), Some(NOT_PAID_REMARK));
        assert!(matches!(
            receipt.allocation,
            Allocation::Recharged { amount, arrear_entry_id: Some(_) } if amount == money(dec!(300))
        ));
        // 200 shortfall + 300 re-charge
        assert_eq!(receipt.arrears_total, money(dec!(500)));
        assert!(!ledger.store.snapshot().await.dues_of(lease.id)[0].paid);
    }

    #[tokio::test]
    async fn test_mark_not_paid_without_history_charges_nothing() {
        let ledger = Ledger::new();
        let (lease, _) = ledger.open(date(2024, 1, 1), dec!(500)).await;

        let receipt = ledger
            .engine
            .reconciler
            .mark_not_paid(&ledger.ctx, lease.id, date(2024, 2, 1))
            .await
            .unwrap();

        assert!(matches!(
            receipt.allocation,
            Allocation::Recharged { amount, arrear_entry_id: None } if amount.is_zero()
        ));
        assert!(receipt.arrears_total.is_zero());
        assert_eq!(ledger.store.snapshot().await.payments_of(lease.id).len(), 1);
    }

    #[tokio::test]
    async fn test_second_not_paid_recharges_the_zero_marker() {
        let ledger = Ledger::new();
        let (lease, _) = ledger.open(date(2024, 1, 1), dec!(500)).await;
        ledger.pay(lease.id, dec!(300), PaymentMethod::Partial).await.unwrap();
        let reconciler = &ledger.engine.reconciler;

        let first = reconciler
            .mark_not_paid(&ledger.ctx, lease.id, date(2024, 2, 1))
            .await
            .unwrap();
        assert_eq!(first.arrears_total, money(dec!(500)));

        // the previous payment is now the zero-amount marker
        let second = reconciler
            .mark_not_paid(&ledger.ctx, lease.id, date(2024, 2, 2))
            .await
            .unwrap();
        assert!(matches!(
            second.allocation,
            Allocation::Recharged { amount, arrear_entry_id: None } if amount.is_zero()
        ));
        assert_eq!(second.arrears_total, money(dec!(500)));
        assert_eq!(ledger.store.snapshot().await.payments_of(lease.id).len(), 3);
    }

    #[tokio::test]
    async fn test_payment_schedules_next_due_in_same_transaction() {
        let ledger = Ledger::new();
        let (lease, due) = ledger.open(date(2024, 1, 1), dec!(500)).await;

        let receipt = ledger
            .engine
            .reconciler
            .record_payment(
                &ledger.ctx,
                RecordPayment::new(lease.id, money(dec!(500)), date(2024, 1, 31), PaymentMethod::Cash)
                    .scheduling_next(),
            )
            .await
            .unwrap();

        assert_eq!(receipt.settled_due(), Some(due.id));
        let next = receipt.next_due.expect("successor scheduled");
        assert_eq!(next.due_date, date(2024, 3, 1));
        assert_eq!(ledger.store.snapshot().await.dues_of(lease.id).len(), 2);
    }

    #[tokio::test]
    async fn test_unschedulable_successor_records_no_payment() {
        let ledger = Ledger::new();
        let (lease, _) = ledger.open(date(2024, 1, 1), dec!(500)).await;
        ledger
            .engine
            .leases
            .close_lease(&ledger.ctx, lease.id, date(2024, 2, 15))
            .await
            .unwrap();

        let request = || {
            RecordPayment::new(lease.id, money(dec!(500)), date(2024, 1, 31), PaymentMethod::Cash)
                .scheduling_next()
        };
        let result = ledger.engine.reconciler.record_payment(&ledger.ctx, request()).await;
        assert!(matches!(result, Err(ArrearsError::LeaseClosed { .. })));

        let snapshot = ledger.store.snapshot().await;
        assert!(snapshot.payments_of(lease.id).is_empty());
        assert!(!snapshot.dues_of(lease.id)[0].paid);

        // a retry still finds the due open
        let retry = ledger.engine.reconciler.record_payment(&ledger.ctx, request()).await;
        assert!(matches!(retry, Err(ArrearsError::LeaseClosed { .. })));
        assert!(ledger.store.snapshot().await.payments_of(lease.id).is_empty());
    }

    #[tokio::test]
    async fn test_arrear_entry_settlement_round_trip() {
        let ledger = Ledger::new();
        let (lease, due) = ledger.open(date(2024, 1, 1), dec!(500)).await;
        let (other, other_due) = ledger.open(date(2024, 1, 1), dec!(500)).await;
        // 300.00 entries via partial payments of 200.00
        ledger.pay(lease.id, dec!(200), PaymentMethod::Partial).await.unwrap();
        ledger.pay(other.id, dec!(200), PaymentMethod::Partial).await.unwrap();
        let reconciler = &ledger.engine.reconciler;

        let partial = reconciler
            .pay_arrear_entry(&ledger.ctx, lease.id, due.due_date, money(dec!(100.00)), date(2024, 2, 2))
            .await
            .unwrap();
        assert!(!partial.settlement.fully_paid);
        assert_eq!(partial.entry.remaining, money(dec!(200.00)));
        assert_eq!(partial.arrears_total, money(dec!(200.00)));
        assert_eq!(partial.payment.method, PaymentMethod::ArrearPayment);

        let full = reconciler
            .pay_arrear_entry(&ledger.ctx, other.id, other_due.due_date, money(dec!(300.00)), date(2024, 2, 2))
            .await
            .unwrap();
        assert!(full.settlement.fully_paid);
        assert!(full.entry.paid);
        assert_eq!(full.settlement.applied, money(dec!(300.00)));
        assert!(full.arrears_total.is_zero());
    }

    #[tokio::test]
    async fn test_settling_more_than_entry_applies_remaining_only() {
        let ledger = Ledger::new();
        let (lease, due) = ledger.open(date(2024, 1, 1), dec!(500)).await;
        ledger.pay(lease.id, dec!(200), PaymentMethod::Partial).await.unwrap();
        ledger.pay(lease.id, dec!(450), PaymentMethod::Partial).await.unwrap();
        // entries: 300.00 then 50.00, both keyed on the first due date

        let settlement = ledger
            .engine
            .reconciler
            .pay_arrear_entry(&ledger.ctx, lease.id, due.due_date, money(dec!(400)), date(2024, 2, 2))
            .await
            .unwrap();

        assert_eq!(settlement.settlement.applied, money(dec!(300)));
        assert_eq!(settlement.arrears_total, money(dec!(50)));
    }

    #[tokio::test]
    async fn test_settling_missing_entry_is_not_found() {
        let ledger = Ledger::new();
        let (lease, due) = ledger.open(date(2024, 1, 1), dec!(500)).await;

        let result = ledger
            .engine
            .reconciler
            .pay_arrear_entry(&ledger.ctx, lease.id, due.due_date, money(dec!(100)), date(2024, 2, 2))
            .await;
        assert!(matches!(result, Err(ArrearsError::NotFound { .. })));

        let invalid = ledger
            .engine
            .reconciler
            .pay_arrear_entry(&ledger.ctx, lease.id, due.due_date, Money::zero(), date(2024, 2, 2))
            .await;
        assert!(matches!(invalid, Err(ArrearsError::InvalidAmount(_))));
    }
}

// ============================================================================
// Arrears Ledger View
// ============================================================================

mod history_tests {
    use super::*;

    #[tokio::test]
    async fn test_history_ordering_and_total_penalties() {
        let ledger = Ledger::new();
        let (lease, first) = ledger.open(date(2023, 12, 2), dec!(1000)).await;
        let accrual = &ledger.engine.accrual;

        accrual.accrue_penalties(&ledger.ctx, date(2024, 1, 11)).await.unwrap();
        let second = ledger
            .engine
            .scheduler
            .schedule_successor(&ledger.ctx, first.id)
            .await
            .unwrap();
        assert_eq!(second.due_date, date(2024, 1, 31));
        accrual.accrue_penalties(&ledger.ctx, date(2024, 2, 5)).await.unwrap();

        let history = ledger.engine.ledger.get_history(&ledger.ctx, lease.id).await.unwrap();

        let lines: Vec<_> = history.entries.iter().map(|e| (e.date, e.kind)).collect();
        assert_eq!(
            lines,
            vec![
                (date(2024, 2, 5), HistoryKind::PenaltyApplied),
                (date(2024, 1, 31), HistoryKind::UnpaidDue),
                (date(2024, 1, 11), HistoryKind::PenaltyApplied),
                (date(2024, 1, 1), HistoryKind::UnpaidDue),
            ]
        );
        // 200.00 for ten days, 100.00 for five
        assert_eq!(history.total_penalties, money(dec!(300.00)));

        ledger.pay(lease.id, dec!(1000), PaymentMethod::Cash).await.unwrap();
        let after_payment = ledger.engine.ledger.get_history(&ledger.ctx, lease.id).await.unwrap();
        assert_eq!(after_payment.entries.len(), 3);
        assert_eq!(after_payment.total_penalties, money(dec!(300.00)));
    }

    #[tokio::test]
    async fn test_history_of_unknown_lease() {
        let ledger = Ledger::new();
        let result = ledger.engine.ledger.get_history(&ledger.ctx, LeaseId::new()).await;
        assert!(matches!(result, Err(ArrearsError::NotFound { .. })));
    }
}

// ============================================================================
// Property tests
// ============================================================================

mod property_tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Op {
        Pay(i64),
        NotPaid,
        Settle(i64),
        Accrue(u32),
        Schedule,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (1i64..200_000).prop_map(Op::Pay),
            Just(Op::NotPaid),
            (1i64..200_000).prop_map(Op::Settle),
            (0u32..120).prop_map(Op::Accrue),
            Just(Op::Schedule),
        ]
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn arrears_stay_consistent(ops in prop::collection::vec(op(), 1..25)) {
            runtime().block_on(async {
                let ledger = Ledger::new();
                let (lease, first) = ledger.open(date(2024, 1, 1), dec!(500)).await;
                let mut last_due_date = first.due_date;

                for op in ops {
                    match op {
                        Op::Pay(minor) => {
                            let request = RecordPayment::new(lease.id, Money::from_minor(minor), date(2024, 2, 1), PaymentMethod::Cash);
                            ledger.engine.reconciler.record_payment(&ledger.ctx, request).await.unwrap();
                        }
                        Op::NotPaid => {
                            ledger.engine.reconciler.mark_not_paid(&ledger.ctx, lease.id, date(2024, 2, 1)).await.unwrap();
                        }
                        Op::Settle(minor) => {
                            let snapshot = ledger.store.snapshot().await;
                            let open = snapshot.entries_of(lease.id).into_iter().find(|e| !e.paid).map(|e| e.due_date);
                            if let Some(due_date) = open {
                                ledger.engine.reconciler
                                    .pay_arrear_entry(&ledger.ctx, lease.id, due_date, Money::from_minor(minor), date(2024, 2, 1))
                                    .await
                                    .unwrap();
                            }
                        }
                        Op::Accrue(offset) => {
                            let as_of = date(2024, 1, 1) + chrono::Days::new(u64::from(offset));
                            ledger.engine.accrual.accrue_penalties(&ledger.ctx, as_of).await.unwrap();
                        }
                        Op::Schedule => {
                            let next = ledger.engine.scheduler
                                .schedule_next_due(&ledger.ctx, lease.id, last_due_date, None)
                                .await
                                .unwrap();
                            last_due_date = next.due_date;
                        }
                    }

                    let snapshot = ledger.store.snapshot().await;
                    let total = snapshot.arrears[&lease.id].total;
                    assert!(!total.is_negative());

                    let open_remaining: Money = snapshot
                        .entries_of(lease.id)
                        .iter()
                        .filter(|e| !e.paid)
                        .map(|e| e.remaining)
                        .sum();
                    assert_eq!(open_remaining, total);

                    for due in snapshot.dues_of(lease.id) {
                        let count = snapshot.penalties.values().filter(|p| p.due_id == due.id).count();
                        assert!(count <= 1);
                    }
                }
            });
        }

        #[test]
        fn accrual_is_idempotent_for_any_day(offset in 0u32..200, rent in 1i64..1_000_000) {
            runtime().block_on(async {
                let ledger = Ledger::new();
                let (lease, _) = ledger.open(date(2024, 1, 1), Money::from_minor(rent).amount()).await;
                let as_of = date(2024, 1, 1) + chrono::Days::new(u64::from(offset));

                ledger.engine.accrual.accrue_penalties(&ledger.ctx, as_of).await.unwrap();
                let once = ledger.arrears_total(lease.id).await;
                let rerun = ledger.engine.accrual.accrue_penalties(&ledger.ctx, as_of).await.unwrap();

                assert_eq!(rerun.applied_count(), 0);
                assert_eq!(ledger.arrears_total(lease.id).await, once);
            });
        }
    }
}
