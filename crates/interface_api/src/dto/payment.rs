//! Payment DTOs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{LeaseId, Money};
use domain_arrears::{Allocation, Payment, PaymentMethod, PaymentReceipt, RecordPayment};

use crate::dto::lease::DueResponse;

#[derive(Debug, Deserialize, Validate)]
pub struct RecordPaymentRequest {
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    pub method: PaymentMethod,
    #[validate(length(max = 500))]
    pub remarks: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub receipt_ref: Option<String>,
    #[validate(length(min = 1, max = 128))]
    pub transaction_ref: Option<String>,
    /// Schedule the successor of the due this payment settles
    #[serde(default)]
    pub schedule_next: bool,
}

impl RecordPaymentRequest {
    pub fn into_command(self, lease_id: LeaseId) -> RecordPayment {
        RecordPayment {
            lease_id,
            amount: Money::new(self.amount),
            payment_date: self.payment_date,
            method: self.method,
            remarks: self.remarks,
            receipt_ref: self.receipt_ref,
            transaction_ref: self.transaction_ref,
            schedule_next: self.schedule_next,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NotPaidRequest {
    pub on: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct PaymentView {
    pub id: Uuid,
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    pub method: PaymentMethod,
    pub remarks: Option<String>,
    pub receipt_ref: Option<String>,
    pub transaction_ref: Option<String>,
    pub recorded_by: String,
}

impl From<Payment> for PaymentView {
    fn from(payment: Payment) -> Self {
        Self {
            id: payment.id.into(),
            amount: payment.amount.amount(),
            payment_date: payment.payment_date,
            method: payment.method,
            remarks: payment.remarks,
            receipt_ref: payment.receipt_ref,
            transaction_ref: payment.transaction_ref,
            recorded_by: payment.recorded_by,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub payment: PaymentView,
    pub allocation: Allocation,
    pub arrears_total: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_due: Option<DueResponse>,
}

impl PaymentResponse {
    pub fn new(receipt: PaymentReceipt) -> Self {
        Self {
            payment: receipt.payment.into(),
            allocation: receipt.allocation,
            arrears_total: receipt.arrears_total.amount(),
            next_due: receipt.next_due.map(DueResponse::from),
        }
    }
}
