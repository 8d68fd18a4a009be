//! Property-Based Test Generators
//!
//! Proptest strategies for ledger inputs that respect domain invariants.

use chrono::{Duration, NaiveDate};
use core_kernel::Money;
use domain_arrears::PaymentMethod;
use proptest::prelude::*;
use rust_decimal::Decimal;

use crate::fixtures::TemporalFixtures;

/// Positive amounts in minor units, up to one million
pub fn positive_amount_minor_strategy() -> impl Strategy<Value = i64> {
    1i64..100_000_000i64
}

/// Positive Money values with two decimal places
pub fn positive_money_strategy() -> impl Strategy<Value = Money> {
    positive_amount_minor_strategy().prop_map(Money::from_minor)
}

/// Daily penalty rates between 0% and 10%
pub fn daily_rate_strategy() -> impl Strategy<Value = Decimal> {
    (0u32..=1000u32).prop_map(|n| Decimal::new(n as i64, 4))
}

/// Methods a clerk may record directly
pub fn tender_method_strategy() -> impl Strategy<Value = PaymentMethod> {
    prop_oneof![
        Just(PaymentMethod::Cash),
        Just(PaymentMethod::Partial),
        Just(PaymentMethod::Manual),
        Just(PaymentMethod::BankTransfer),
        Just(PaymentMethod::MobileMoney),
    ]
}

/// Dates within roughly a year after the first fixture due
pub fn accrual_date_strategy() -> impl Strategy<Value = NaiveDate> {
    (0i64..400i64).prop_map(|offset| TemporalFixtures::first_due() + Duration::days(offset))
}
