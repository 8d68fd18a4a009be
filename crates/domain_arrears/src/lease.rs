//! Stall leases
//!
//! A lease binds a tenant to a stall at a monthly rent. Every due, payment,
//! penalty and arrears balance hangs off a lease.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{DateRange, LeaseId, Money, StallId, TenantId};

use crate::error::ArrearsError;

/// A tenant's lease of a single stall
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lease {
    pub id: LeaseId,
    pub tenant_id: TenantId,
    pub stall_id: StallId,
    /// First day of the lease; the first due falls one interval later
    pub start_date: NaiveDate,
    /// Last day of the lease, if it has been closed
    pub end_date: Option<NaiveDate>,
    /// Rent charged per due cycle
    pub monthly_rent: Money,
    pub created_at: DateTime<Utc>,
}

/// Input for opening a lease
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLease {
    pub tenant_id: TenantId,
    pub stall_id: StallId,
    pub start_date: NaiveDate,
    pub monthly_rent: Money,
}

impl Lease {
    /// Creates an open-ended lease, rejecting a non-positive rent
    pub fn open(terms: NewLease) -> Result<Self, ArrearsError> {
        let monthly_rent = terms.monthly_rent.ensure_positive("monthly_rent")?;

        Ok(Self {
            id: LeaseId::new_v7(),
            tenant_id: terms.tenant_id,
            stall_id: terms.stall_id,
            start_date: terms.start_date,
            end_date: None,
            monthly_rent,
            created_at: Utc::now(),
        })
    }

    pub fn term(&self) -> DateRange {
        DateRange {
            start: self.start_date,
            end: self.end_date,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.end_date.is_some()
    }

    /// Fails with `LeaseClosed` when `date` falls after the lease end
    pub fn ensure_accepts_due_on(&self, date: NaiveDate) -> Result<(), ArrearsError> {
        match self.end_date {
            Some(end_date) if date > end_date => Err(ArrearsError::LeaseClosed {
                lease_id: self.id,
                end_date,
            }),
            _ => Ok(()),
        }
    }

    /// Sets the end date, which must not precede the start date
    pub fn close(&mut self, end_date: NaiveDate) -> Result<(), ArrearsError> {
        if let Some(existing) = self.end_date {
            return Err(ArrearsError::InvalidOperation(format!(
                "lease {} already closed on {}",
                self.id, existing
            )));
        }
        if end_date < self.start_date {
            return Err(ArrearsError::InvalidOperation(format!(
                "end date {} precedes lease start {}",
                end_date, self.start_date
            )));
        }
        self.end_date = Some(end_date);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn terms(rent: Money) -> NewLease {
        NewLease {
            tenant_id: TenantId::new(),
            stall_id: StallId::new(),
            start_date: date(2024, 1, 1),
            monthly_rent: rent,
        }
    }

    #[test]
    fn test_open_rejects_zero_rent() {
        let result = Lease::open(terms(Money::zero()));
        assert!(matches!(result, Err(ArrearsError::InvalidAmount(_))));
    }

    #[test]
    fn test_closed_lease_refuses_later_dues() {
        let mut lease = Lease::open(terms(Money::new(dec!(500)))).unwrap();
        lease.close(date(2024, 3, 31)).unwrap();

        assert!(lease.ensure_accepts_due_on(date(2024, 3, 31)).is_ok());
        assert!(matches!(
            lease.ensure_accepts_due_on(date(2024, 4, 1)),
            Err(ArrearsError::LeaseClosed { .. })
        ));
        assert!(lease.term().contains(date(2024, 2, 15)));
    }

    #[test]
    fn test_close_twice_is_invalid() {
        let mut lease = Lease::open(terms(Money::new(dec!(500)))).unwrap();
        lease.close(date(2024, 6, 30)).unwrap();
        assert!(lease.close(date(2024, 7, 31)).is_err());
    }
}
