//! Test Data Builders
//!
//! Builders let a test name only the fields it cares about.

use chrono::NaiveDate;
use fake::faker::name::en::Name;
use fake::Fake;
use core_kernel::{LeaseId, Money, StallId, TenantId};
use domain_arrears::{Due, Lease, NewLease, Payment, PaymentMethod, RecordPayment};
use rust_decimal::Decimal;

use crate::fixtures::{MoneyFixtures, TemporalFixtures};

/// Builder for lease terms
pub struct LeaseBuilder {
    tenant_id: TenantId,
    stall_id: StallId,
    start_date: NaiveDate,
    monthly_rent: Money,
}

impl Default for LeaseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LeaseBuilder {
    pub fn new() -> Self {
        Self {
            tenant_id: TenantId::new(),
            stall_id: StallId::new(),
            start_date: TemporalFixtures::lease_start(),
            monthly_rent: MoneyFixtures::monthly_rent(),
        }
    }

    pub fn starting(mut self, start_date: NaiveDate) -> Self {
        self.start_date = start_date;
        self
    }

    pub fn rent(mut self, amount: Decimal) -> Self {
        self.monthly_rent = Money::new(amount);
        self
    }

    pub fn stall(mut self, stall_id: StallId) -> Self {
        self.stall_id = stall_id;
        self
    }

    pub fn terms(self) -> NewLease {
        NewLease {
            tenant_id: self.tenant_id,
            stall_id: self.stall_id,
            start_date: self.start_date,
            monthly_rent: self.monthly_rent,
        }
    }

    /// Builds an open lease without touching any store
    ///
    /// # Panics
    ///
    /// Panics if the rent is not positive
    pub fn build(self) -> Lease {
        Lease::open(self.terms()).unwrap_or_else(|e| panic!("invalid test lease: {}", e))
    }
}

/// Builder for dues
pub struct DueBuilder {
    lease_id: LeaseId,
    due_date: NaiveDate,
    amount: Money,
    paid: bool,
}

impl DueBuilder {
    pub fn for_lease(lease_id: LeaseId) -> Self {
        Self {
            lease_id,
            due_date: TemporalFixtures::first_due(),
            amount: MoneyFixtures::monthly_rent(),
            paid: false,
        }
    }

    pub fn on(mut self, due_date: NaiveDate) -> Self {
        self.due_date = due_date;
        self
    }

    pub fn amount(mut self, amount: Decimal) -> Self {
        self.amount = Money::new(amount);
        self
    }

    pub fn paid(mut self) -> Self {
        self.paid = true;
        self
    }

    /// # Panics
    ///
    /// Panics if the amount is not positive
    pub fn build(self) -> Due {
        let mut due = Due::new(self.lease_id, self.due_date, self.amount)
            .unwrap_or_else(|e| panic!("invalid test due: {}", e));
        due.paid = self.paid;
        due
    }
}

/// Builder for payments and payment requests
pub struct PaymentBuilder {
    lease_id: LeaseId,
    amount: Money,
    payment_date: NaiveDate,
    method: PaymentMethod,
    remarks: Option<String>,
    recorded_by: String,
}

impl PaymentBuilder {
    /// A full cash payment of the default rent on the first due date,
    /// recorded by a random clerk name
    pub fn for_lease(lease_id: LeaseId) -> Self {
        Self {
            lease_id,
            amount: MoneyFixtures::monthly_rent(),
            payment_date: TemporalFixtures::first_due(),
            method: PaymentMethod::Cash,
            remarks: None,
            recorded_by: Name().fake(),
        }
    }

    pub fn amount(mut self, amount: Decimal) -> Self {
        self.amount = Money::new(amount);
        self
    }

    pub fn on(mut self, payment_date: NaiveDate) -> Self {
        self.payment_date = payment_date;
        self
    }

    pub fn method(mut self, method: PaymentMethod) -> Self {
        self.method = method;
        self
    }

    pub fn remarks(mut self, remarks: impl Into<String>) -> Self {
        self.remarks = Some(remarks.into());
        self
    }

    /// The request a clerk would submit
    pub fn request(self) -> RecordPayment {
        let request = RecordPayment::new(self.lease_id, self.amount, self.payment_date, self.method);
        match self.remarks {
            Some(remarks) => request.with_remarks(remarks),
            None => request,
        }
    }

    /// The stored payment record
    pub fn build(self) -> Payment {
        Payment::new(self.lease_id, self.amount, self.payment_date, self.method, self.recorded_by)
            .with_remarks(self.remarks)
    }
}
