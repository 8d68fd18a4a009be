//! Rent dues
//!
//! A due is one scheduled rent obligation. It starts unpaid and is resolved
//! either by a payment covering it or by the accrual engine sweeping it,
//! with its penalty, into arrears.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{days_between, DueId, LeaseId, Money};

use crate::error::ArrearsError;

/// A scheduled rent obligation for a lease
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Due {
    pub id: DueId,
    pub lease_id: LeaseId,
    pub due_date: NaiveDate,
    pub amount: Money,
    pub paid: bool,
    pub created_at: DateTime<Utc>,
}

impl Due {
    /// Creates an unpaid due; the amount must be positive
    pub fn new(lease_id: LeaseId, due_date: NaiveDate, amount: Money) -> Result<Self, ArrearsError> {
        let amount = amount.ensure_positive("due amount")?;
        Ok(Self {
            id: DueId::new_v7(),
            lease_id,
            due_date,
            amount,
            paid: false,
            created_at: Utc::now(),
        })
    }

    /// Whole days past the due date as of `as_of`, or `None` if not yet overdue
    pub fn days_overdue(&self, as_of: NaiveDate) -> Option<u32> {
        let days = days_between(self.due_date, as_of);
        if days > 0 {
            u32::try_from(days).ok()
        } else {
            None
        }
    }

    pub fn is_overdue(&self, as_of: NaiveDate) -> bool {
        !self.paid && self.due_date < as_of
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_days_overdue() {
        let due = Due::new(LeaseId::new(), date(2024, 3, 1), Money::new(dec!(500))).unwrap();

        assert_eq!(due.days_overdue(date(2024, 2, 28)), None);
        assert_eq!(due.days_overdue(date(2024, 3, 1)), None);
        assert_eq!(due.days_overdue(date(2024, 3, 4)), Some(3));
        assert!(due.is_overdue(date(2024, 3, 2)));
    }

    #[test]
    fn test_paid_due_is_never_overdue() {
        let mut due = Due::new(LeaseId::new(), date(2024, 3, 1), Money::new(dec!(500))).unwrap();
        due.paid = true;
        assert!(!due.is_overdue(date(2024, 6, 1)));
    }

    #[test]
    fn test_rejects_negative_amount() {
        let result = Due::new(LeaseId::new(), date(2024, 3, 1), Money::new(dec!(-1)));
        assert!(matches!(result, Err(ArrearsError::InvalidAmount(_))));
    }
}
