//! Lease and due DTOs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use core_kernel::Money;
use domain_arrears::{Due, Lease, NewLease};

#[derive(Debug, Deserialize)]
pub struct OpenLeaseRequest {
    pub tenant_id: Uuid,
    pub stall_id: Uuid,
    pub start_date: NaiveDate,
    pub monthly_rent: Decimal,
}

impl From<OpenLeaseRequest> for NewLease {
    fn from(request: OpenLeaseRequest) -> Self {
        NewLease {
            tenant_id: request.tenant_id.into(),
            stall_id: request.stall_id.into(),
            start_date: request.start_date,
            monthly_rent: Money::new(request.monthly_rent),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CloseLeaseRequest {
    pub end_date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct ScheduleDueRequest {
    /// The new due falls one interval after this date
    pub after_date: NaiveDate,
    /// Overrides the lease's monthly rent
    pub amount: Option<Decimal>,
}

#[derive(Debug, Serialize)]
pub struct LeaseResponse {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub stall_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub monthly_rent: Decimal,
    pub created_at: DateTime<Utc>,
}

impl From<Lease> for LeaseResponse {
    fn from(lease: Lease) -> Self {
        Self {
            id: lease.id.into(),
            tenant_id: lease.tenant_id.into(),
            stall_id: lease.stall_id.into(),
            start_date: lease.start_date,
            end_date: lease.end_date,
            monthly_rent: lease.monthly_rent.amount(),
            created_at: lease.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DueResponse {
    pub id: Uuid,
    pub lease_id: Uuid,
    pub due_date: NaiveDate,
    pub amount: Decimal,
    pub paid: bool,
}

impl From<Due> for DueResponse {
    fn from(due: Due) -> Self {
        Self {
            id: due.id.into(),
            lease_id: due.lease_id.into(),
            due_date: due.due_date,
            amount: due.amount.amount(),
            paid: due.paid,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OpenLeaseResponse {
    pub lease: LeaseResponse,
    pub first_due: DueResponse,
}
