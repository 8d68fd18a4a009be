//! Penalty Accrual Engine
//!
//! Run once a day by the `arrears-accrue` job. Each overdue, unpaid due is
//! processed in its own transaction:
//!
//! 1. lock the due and re-check that it is still unpaid
//! 2. assess it against the [`PenaltyPolicy`]
//! 3. insert the penalty; if the due already has one, stop
//! 4. add `due amount + penalty` to the lease's arrears and log an entry
//!
//! Step 3 is the idempotence guard: re-running the job on the same day, or
//! two jobs racing, never penalizes a due twice. A failure on one due is
//! reported and the batch moves on.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use core_kernel::{DueId, LeaseId, Money, RequestContext};

use crate::arrears::{ArrearEntry, ArrearSource, Arrears};
use crate::config::ArrearsConfig;
use crate::due::Due;
use crate::error::ArrearsError;
use crate::penalty::{Penalty, PenaltyPolicy};
use crate::ports::LedgerStore;

/// A penalty that was applied and swept into arrears
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedPenalty {
    pub lease_id: LeaseId,
    pub due_id: DueId,
    pub penalty_amount: Money,
    pub days_overdue: u32,
    pub new_arrears_total: Money,
}

/// What happened to one candidate due
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AccrualOutcome {
    Applied(AppliedPenalty),
    /// The due already carries a penalty or was paid meanwhile
    AlreadyProcessed { lease_id: LeaseId, due_id: DueId },
    /// Overdue, but still inside the grace window
    WithinGrace {
        lease_id: LeaseId,
        due_id: DueId,
        days_overdue: u32,
    },
    Failed {
        lease_id: LeaseId,
        due_id: DueId,
        error: String,
    },
}

/// Summary of one accrual run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccrualReport {
    pub as_of: NaiveDate,
    pub outcomes: Vec<AccrualOutcome>,
}

impl AccrualReport {
    pub fn applied(&self) -> impl Iterator<Item = &AppliedPenalty> {
        self.outcomes.iter().filter_map(|o| match o {
            AccrualOutcome::Applied(applied) => Some(applied),
            _ => None,
        })
    }

    pub fn applied_count(&self) -> usize {
        self.applied().count()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| {
                matches!(
                    o,
                    AccrualOutcome::AlreadyProcessed { .. } | AccrualOutcome::WithinGrace { .. }
                )
            })
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, AccrualOutcome::Failed { .. }))
            .count()
    }

    /// Leases whose arrears changed in this run, for the tenant notifier
    pub fn affected_leases(&self) -> BTreeSet<LeaseId> {
        self.applied().map(|a| a.lease_id).collect()
    }

    pub fn total_penalties(&self) -> Money {
        self.applied().map(|a| a.penalty_amount).sum()
    }
}

enum DueStep {
    Applied(AppliedPenalty),
    AlreadyProcessed,
    WithinGrace(u32),
}

/// Converts overdue dues into penalties and arrears
#[derive(Clone)]
pub struct PenaltyAccrualEngine {
    store: Arc<dyn LedgerStore>,
    policy: PenaltyPolicy,
}

impl PenaltyAccrualEngine {
    pub fn new(store: Arc<dyn LedgerStore>, config: &ArrearsConfig) -> Self {
        Self::with_policy(store, config.penalty_policy())
    }

    pub fn with_policy(store: Arc<dyn LedgerStore>, policy: PenaltyPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &PenaltyPolicy {
        &self.policy
    }

    #[instrument(skip(self, ctx), fields(actor = %ctx.principal, strategy = %self.policy.strategy))]
    pub async fn accrue_penalties(
        &self,
        ctx: &RequestContext,
        as_of: NaiveDate,
    ) -> Result<AccrualReport, ArrearsError> {
        let mut scan = self.store.begin().await?;
        let candidates = scan.overdue_unpaid_dues(as_of).await?;
        // release the scan before the per-due transactions start
        drop(scan);
        debug!(candidates = candidates.len(), "Scanned overdue dues");

        let mut outcomes = Vec::with_capacity(candidates.len());
        for due in candidates {
            let outcome = match self.accrue_due(due.id, as_of).await {
                Ok(DueStep::Applied(applied)) => AccrualOutcome::Applied(applied),
                Ok(DueStep::AlreadyProcessed) => AccrualOutcome::AlreadyProcessed {
                    lease_id: due.lease_id,
                    due_id: due.id,
                },
                Ok(DueStep::WithinGrace(days_overdue)) => AccrualOutcome::WithinGrace {
                    lease_id: due.lease_id,
                    due_id: due.id,
                    days_overdue,
                },
                Err(error) => {
                    warn!(lease_id = %due.lease_id, due_id = %due.id, error = %error, "Accrual failed for due");
                    AccrualOutcome::Failed {
                        lease_id: due.lease_id,
                        due_id: due.id,
                        error: error.to_string(),
                    }
                }
            };
            outcomes.push(outcome);
        }

        let report = AccrualReport { as_of, outcomes };
        info!(
            as_of = %as_of,
            applied = report.applied_count(),
            skipped = report.skipped_count(),
            failed = report.failed_count(),
            total_penalties = %report.total_penalties(),
            "Accrual run complete"
        );
        Ok(report)
    }

    async fn accrue_due(&self, due_id: DueId, as_of: NaiveDate) -> Result<DueStep, ArrearsError> {
        let mut tx = self.store.begin().await?;
        let due: Due = tx
            .find_due_for_update(due_id)
            .await?
            .ok_or_else(|| ArrearsError::not_found("Due", due_id))?;

        if due.paid {
            return Ok(DueStep::AlreadyProcessed);
        }

        let assessment = match self.policy.assess(&due, as_of)? {
            Some(assessment) => assessment,
            None => return Ok(DueStep::WithinGrace(due.days_overdue(as_of).unwrap_or(0))),
        };

        let penalty = Penalty::for_due(&due, &assessment, as_of);
        if !tx.insert_penalty_once(&penalty).await? {
            debug!(due_id = %due.id, "Due already penalized");
            return Ok(DueStep::AlreadyProcessed);
        }

        let increment = assessment.arrears_increment(&due)?;
        let mut arrears = tx
            .lock_arrears(due.lease_id)
            .await?
            .unwrap_or_else(|| Arrears::empty(due.lease_id));
        arrears.charge(increment)?;
        tx.save_arrears(&arrears).await?;

        let entry = ArrearEntry::new(
            due.lease_id,
            Some(due.id),
            due.due_date,
            ArrearSource::Accrual,
            increment,
        );
        tx.insert_arrear_entry(&entry).await?;
        tx.commit().await?;

        info!(
            lease_id = %due.lease_id,
            due_id = %due.id,
            days_overdue = assessment.days_overdue,
            penalty = %assessment.penalty,
            arrears_total = %arrears.total,
            "Applied penalty"
        );

        Ok(DueStep::Applied(AppliedPenalty {
            lease_id: due.lease_id,
            due_id: due.id,
            penalty_amount: assessment.penalty,
            days_overdue: assessment.days_overdue,
            new_arrears_total: arrears.total,
        }))
    }
}
