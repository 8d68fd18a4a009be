//! Arrears balances and itemized arrear entries
//!
//! `Arrears` is the running balance per lease. `ArrearEntry` itemizes what
//! went into it (a swept due plus penalty, a partial-payment shortfall, or a
//! not-paid re-charge) so that individual items can be settled later.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{ArrearEntryId, DueId, LeaseId, Money, MoneyError};

/// Running arrears balance for one lease; never negative
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arrears {
    pub lease_id: LeaseId,
    pub total: Money,
    pub last_updated: DateTime<Utc>,
}

impl Arrears {
    /// A zero balance for a lease that has never been in arrears
    pub fn empty(lease_id: LeaseId) -> Self {
        Self {
            lease_id,
            total: Money::zero(),
            last_updated: Utc::now(),
        }
    }

    /// Adds to the balance
    pub fn charge(&mut self, amount: Money) -> Result<(), MoneyError> {
        self.total = self.total.checked_add(&amount)?;
        self.last_updated = Utc::now();
        Ok(())
    }

    /// Reduces the balance, clamping at zero; returns the amount actually removed
    pub fn reduce(&mut self, amount: Money) -> Money {
        let before = self.total;
        self.total = self.total.saturating_sub(&amount);
        self.last_updated = Utc::now();
        before - self.total
    }
}

/// What produced an arrear entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrearSource {
    /// An overdue due and its penalty swept in by the accrual engine
    Accrual,
    /// The unpaid remainder of a partial payment
    PartialPayment,
    /// The re-charge applied by `mark_not_paid`
    NotPaid,
}

impl ArrearSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArrearSource::Accrual => "accrual",
            ArrearSource::PartialPayment => "partial_payment",
            ArrearSource::NotPaid => "not_paid",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "accrual" => Some(ArrearSource::Accrual),
            "partial_payment" => Some(ArrearSource::PartialPayment),
            "not_paid" => Some(ArrearSource::NotPaid),
            _ => None,
        }
    }
}

impl fmt::Display for ArrearSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One settle-able item in a lease's arrears
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrearEntry {
    pub id: ArrearEntryId,
    pub lease_id: LeaseId,
    pub due_id: Option<DueId>,
    /// Due date the entry is keyed on for settlement
    pub due_date: NaiveDate,
    pub source: ArrearSource,
    pub original_amount: Money,
    pub remaining: Money,
    pub paid: bool,
    pub created_at: DateTime<Utc>,
}

/// Result of applying a payment to an arrear entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntrySettlement {
    /// Amount taken off the entry (and off the arrears total)
    pub applied: Money,
    pub fully_paid: bool,
}

impl ArrearEntry {
    pub fn new(
        lease_id: LeaseId,
        due_id: Option<DueId>,
        due_date: NaiveDate,
        source: ArrearSource,
        amount: Money,
    ) -> Self {
        Self {
            id: ArrearEntryId::new_v7(),
            lease_id,
            due_id,
            due_date,
            source,
            original_amount: amount,
            remaining: amount,
            paid: false,
            created_at: Utc::now(),
        }
    }

    /// Applies `amount_paid`; a payment of at least the remaining amount
    /// closes the entry and only the remaining amount is applied
    pub fn settle(&mut self, amount_paid: Money) -> EntrySettlement {
        if amount_paid >= self.remaining {
            let applied = self.remaining;
            self.remaining = Money::zero();
            self.paid = true;
            EntrySettlement {
                applied,
                fully_paid: true,
            }
        } else {
            self.remaining = self.remaining - amount_paid;
            EntrySettlement {
                applied: amount_paid,
                fully_paid: false,
            }
        }
    }
}
