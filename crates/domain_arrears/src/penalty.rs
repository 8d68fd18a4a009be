//! Penalties and the policy that computes them

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{DueId, LeaseId, Money, MoneyError, PenaltyId, Rate};

use crate::due::Due;

/// A penalty charged once against an overdue due
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Penalty {
    pub id: PenaltyId,
    pub lease_id: LeaseId,
    pub due_id: DueId,
    pub amount: Money,
    pub days_overdue: u32,
    pub applied_on: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl Penalty {
    pub fn for_due(due: &Due, assessment: &PenaltyAssessment, applied_on: NaiveDate) -> Self {
        Self {
            id: PenaltyId::new_v7(),
            lease_id: due.lease_id,
            due_id: due.id,
            amount: assessment.penalty,
            days_overdue: assessment.days_overdue,
            applied_on,
            created_at: Utc::now(),
        }
    }
}

/// How overdue dues are moved into arrears
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccrualStrategy {
    /// Charge `rate * days_overdue` of the due amount, once per due
    #[default]
    DailyPenalty,
    /// Move the principal into arrears after the grace window, no penalty
    PrincipalSweep,
}

impl AccrualStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccrualStrategy::DailyPenalty => "daily_penalty",
            AccrualStrategy::PrincipalSweep => "principal_sweep",
        }
    }
}

impl fmt::Display for AccrualStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccrualStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily_penalty" => Ok(AccrualStrategy::DailyPenalty),
            "principal_sweep" => Ok(AccrualStrategy::PrincipalSweep),
            other => Err(format!("unknown accrual strategy: {}", other)),
        }
    }
}

/// Outcome of assessing one overdue due
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PenaltyAssessment {
    pub days_overdue: u32,
    pub penalty: Money,
}

impl PenaltyAssessment {
    /// Amount swept into arrears: the due itself plus its penalty
    pub fn arrears_increment(&self, due: &Due) -> Result<Money, MoneyError> {
        due.amount.checked_add(&self.penalty)
    }
}

/// Penalty calculation parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PenaltyPolicy {
    pub daily_rate: Rate,
    /// A due must be more than this many days overdue to be swept
    pub grace_days: u32,
    pub strategy: AccrualStrategy,
}

impl PenaltyPolicy {
    pub fn daily(daily_rate: Rate) -> Self {
        Self {
            daily_rate,
            grace_days: 0,
            strategy: AccrualStrategy::DailyPenalty,
        }
    }

    pub fn principal_sweep(grace_days: u32) -> Self {
        Self {
            daily_rate: Rate::new(Decimal::ZERO),
            grace_days,
            strategy: AccrualStrategy::PrincipalSweep,
        }
    }

    /// Assesses `due` as of `as_of`; `Ok(None)` when it is not yet eligible
    pub fn assess(&self, due: &Due, as_of: NaiveDate) -> Result<Option<PenaltyAssessment>, MoneyError> {
        let days_overdue = match due.days_overdue(as_of) {
            Some(days) if days > self.grace_days => days,
            _ => return Ok(None),
        };

        let penalty = match self.strategy {
            AccrualStrategy::DailyPenalty => due
                .amount
                .multiply(self.daily_rate.as_decimal() * Decimal::from(days_overdue))?,
            AccrualStrategy::PrincipalSweep => Money::zero(),
        };

        Ok(Some(PenaltyAssessment {
            days_overdue,
            penalty,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn due(amount: Decimal) -> Due {
        Due::new(LeaseId::new(), date(2024, 1, 1), Money::new(amount)).unwrap()
    }

    #[test]
    fn test_daily_penalty_ten_days() {
        let policy = PenaltyPolicy::daily(Rate::new(dec!(0.02)));
        let due = due(dec!(1000));

        let assessment = policy.assess(&due, date(2024, 1, 11)).unwrap().unwrap();
        assert_eq!(assessment.days_overdue, 10);
        assert_eq!(assessment.penalty, Money::new(dec!(200.00)));
        assert_eq!(
            assessment.arrears_increment(&due).unwrap(),
            Money::new(dec!(1200.00))
        );
    }

    #[test]
    fn test_not_overdue_on_due_date() {
        let policy = PenaltyPolicy::daily(Rate::new(dec!(0.02)));
        assert_eq!(policy.assess(&due(dec!(1000)), date(2024, 1, 1)).unwrap(), None);
    }

    #[test]
    fn test_penalty_rounds_to_cents() {
        let policy = PenaltyPolicy::daily(Rate::new(dec!(0.02)));
        // 333.33 * 0.02 * 1 = 6.6666
        let assessment = policy.assess(&due(dec!(333.33)), date(2024, 1, 2)).unwrap().unwrap();
        assert_eq!(assessment.penalty.amount(), dec!(6.67));
    }

    #[test]
    fn test_principal_sweep_respects_grace() {
        let policy = PenaltyPolicy::principal_sweep(15);
        let due = due(dec!(500));

        assert_eq!(policy.assess(&due, date(2024, 1, 16)).unwrap(), None);

        let assessment = policy.assess(&due, date(2024, 1, 17)).unwrap().unwrap();
        assert_eq!(assessment.days_overdue, 16);
        assert!(assessment.penalty.is_zero());
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!(
            "principal_sweep".parse::<AccrualStrategy>().unwrap(),
            AccrualStrategy::PrincipalSweep
        );
        assert!("weekly".parse::<AccrualStrategy>().is_err());
    }
}
