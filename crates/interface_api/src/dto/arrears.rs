//! Arrears, history and accrual DTOs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use domain_arrears::{
    AccrualOutcome, AccrualReport, ArrearSettlement, Arrears, ArrearsHistory, HistoryKind,
};

use crate::dto::payment::PaymentView;

#[derive(Debug, Deserialize)]
pub struct SettleArrearRequest {
    pub due_date: NaiveDate,
    pub amount_paid: Decimal,
    /// Defaults to today in the market timezone
    pub paid_on: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct ArrearSettlementResponse {
    pub arrear_entry_id: Uuid,
    pub due_date: NaiveDate,
    pub applied: Decimal,
    pub remaining: Decimal,
    pub fully_paid: bool,
    pub arrears_total: Decimal,
    pub payment: PaymentView,
}

impl From<ArrearSettlement> for ArrearSettlementResponse {
    fn from(settlement: ArrearSettlement) -> Self {
        Self {
            arrear_entry_id: settlement.entry.id.into(),
            due_date: settlement.entry.due_date,
            applied: settlement.settlement.applied.amount(),
            remaining: settlement.entry.remaining.amount(),
            fully_paid: settlement.settlement.fully_paid,
            arrears_total: settlement.arrears_total.amount(),
            payment: settlement.payment.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ArrearsBalanceResponse {
    pub lease_id: Uuid,
    pub total_arrears: Decimal,
    pub last_updated: DateTime<Utc>,
}

impl From<Arrears> for ArrearsBalanceResponse {
    fn from(arrears: Arrears) -> Self {
        Self {
            lease_id: arrears.lease_id.into(),
            total_arrears: arrears.total.amount(),
            last_updated: arrears.last_updated,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryEntryResponse {
    pub date: NaiveDate,
    pub kind: HistoryKind,
    pub amount: Decimal,
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub lease_id: Uuid,
    pub total_penalties: Decimal,
    pub entries: Vec<HistoryEntryResponse>,
}

impl From<ArrearsHistory> for HistoryResponse {
    fn from(history: ArrearsHistory) -> Self {
        Self {
            lease_id: history.lease_id.into(),
            total_penalties: history.total_penalties.amount(),
            entries: history
                .entries
                .into_iter()
                .map(|e| HistoryEntryResponse {
                    date: e.date,
                    kind: e.kind,
                    amount: e.amount.amount(),
                    description: e.description,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RunAccrualRequest {
    /// Defaults to today in the market timezone
    pub as_of: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct AccrualResponse {
    pub as_of: NaiveDate,
    pub applied: usize,
    pub skipped: usize,
    pub failed: usize,
    pub total_penalties: Decimal,
    pub affected_leases: Vec<Uuid>,
    pub outcomes: Vec<AccrualOutcome>,
}

impl From<AccrualReport> for AccrualResponse {
    fn from(report: AccrualReport) -> Self {
        Self {
            as_of: report.as_of,
            applied: report.applied_count(),
            skipped: report.skipped_count(),
            failed: report.failed_count(),
            total_penalties: report.total_penalties().amount(),
            affected_leases: report.affected_leases().into_iter().map(Into::into).collect(),
            outcomes: report.outcomes,
        }
    }
}
