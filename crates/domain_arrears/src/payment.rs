//! Payments
//!
//! Payments are append-only. Besides cash-in records, the ledger stores two
//! synthetic kinds: a zero-amount `NotPaid` marker written when a clerk
//! records that a tenant did not pay, and `ArrearPayment` records written
//! when an arrears entry is settled.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{LeaseId, Money, PaymentId};

/// Remark attached to the zero-amount marker written by `mark_not_paid`
pub const NOT_PAID_REMARK: &str = "Not Paid";

/// How a payment was made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Partial,
    Manual,
    BankTransfer,
    MobileMoney,
    /// Settlement of an arrears entry
    ArrearPayment,
    /// Zero-amount marker for a missed payment
    NotPaid,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Partial => "partial",
            PaymentMethod::Manual => "manual",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::MobileMoney => "mobile_money",
            PaymentMethod::ArrearPayment => "arrear_payment",
            PaymentMethod::NotPaid => "not_paid",
        }
    }

    /// Methods a caller may submit to `record_payment`
    pub fn is_tender(&self) -> bool {
        !matches!(self, PaymentMethod::ArrearPayment | PaymentMethod::NotPaid)
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(PaymentMethod::Cash),
            "partial" => Ok(PaymentMethod::Partial),
            "manual" => Ok(PaymentMethod::Manual),
            "bank_transfer" => Ok(PaymentMethod::BankTransfer),
            "mobile_money" => Ok(PaymentMethod::MobileMoney),
            "arrear_payment" => Ok(PaymentMethod::ArrearPayment),
            "not_paid" => Ok(PaymentMethod::NotPaid),
            other => Err(format!("unknown payment method: {}", other)),
        }
    }
}

/// A recorded payment against a lease
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub lease_id: LeaseId,
    pub amount: Money,
    pub payment_date: NaiveDate,
    pub method: PaymentMethod,
    pub remarks: Option<String>,
    pub receipt_ref: Option<String>,
    pub transaction_ref: Option<String>,
    /// Subject of the principal that recorded the payment
    pub recorded_by: String,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(
        lease_id: LeaseId,
        amount: Money,
        payment_date: NaiveDate,
        method: PaymentMethod,
        recorded_by: impl Into<String>,
    ) -> Self {
        Self {
            id: PaymentId::new_v7(),
            lease_id,
            amount,
            payment_date,
            method,
            remarks: None,
            receipt_ref: None,
            transaction_ref: None,
            recorded_by: recorded_by.into(),
            created_at: Utc::now(),
        }
    }

    /// The zero-amount marker for a missed payment
    pub fn not_paid(lease_id: LeaseId, on: NaiveDate, recorded_by: impl Into<String>) -> Self {
        Self::new(lease_id, Money::zero(), on, PaymentMethod::NotPaid, recorded_by)
            .with_remarks(Some(NOT_PAID_REMARK.to_string()))
    }

    pub fn with_remarks(mut self, remarks: Option<String>) -> Self {
        self.remarks = remarks;
        self
    }

    pub fn with_receipt_ref(mut self, receipt_ref: Option<String>) -> Self {
        self.receipt_ref = receipt_ref;
        self
    }

    pub fn with_transaction_ref(mut self, transaction_ref: Option<String>) -> Self {
        self.transaction_ref = transaction_ref;
        self
    }

    pub fn is_not_paid_marker(&self) -> bool {
        self.method == PaymentMethod::NotPaid
    }
}
