//! Pre-built Test Fixtures
//!
//! Consistent, predictable values shared by unit and integration tests.

use chrono::NaiveDate;
use core_kernel::{Money, Principal, Rate, RequestContext};
use rust_decimal_macros::dec;

/// Fixture for Money test data
pub struct MoneyFixtures;

impl MoneyFixtures {
    /// Standard monthly stall rent
    pub fn monthly_rent() -> Money {
        Money::new(dec!(1000.00))
    }

    /// A payment that covers the rent only partially
    pub fn partial_payment() -> Money {
        Money::new(dec!(400.00))
    }

    pub fn zero() -> Money {
        Money::zero()
    }

    /// The default daily penalty rate (2% of the due per day)
    pub fn daily_rate() -> Rate {
        Rate::new(dec!(0.02))
    }
}

/// Fixture for calendar dates
///
/// A lease started on [`TemporalFixtures::lease_start`] has its first due on
/// [`TemporalFixtures::first_due`] under the default 30-day interval.
pub struct TemporalFixtures;

impl TemporalFixtures {
    pub fn lease_start() -> NaiveDate {
        date(2023, 12, 2)
    }

    pub fn first_due() -> NaiveDate {
        date(2024, 1, 1)
    }

    /// Ten days after the first due
    pub fn ten_days_late() -> NaiveDate {
        date(2024, 1, 11)
    }

    pub fn second_due() -> NaiveDate {
        date(2024, 1, 31)
    }
}

/// Fixture for request contexts
pub struct ContextFixtures;

impl ContextFixtures {
    /// A collector allowed to record payments
    pub fn collector() -> RequestContext {
        RequestContext::new(Principal::user(
            "collector-1",
            vec!["payment:write".to_string(), "arrears:read".to_string()],
        ))
    }

    /// The nightly accrual job
    pub fn accrual_job() -> RequestContext {
        RequestContext::system("accrual-job")
    }
}

/// Shorthand for a valid calendar date
///
/// # Panics
///
/// Panics if the date does not exist
pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap_or_else(|| panic!("invalid fixture date {}-{}-{}", year, month, day))
}
