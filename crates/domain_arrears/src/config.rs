//! Engine configuration
//!
//! Loaded by the binaries from `ARREARS_*` environment variables; every
//! field has a default so an empty environment yields a working engine.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use core_kernel::{CoreError, Rate, Timezone};

use crate::penalty::{AccrualStrategy, PenaltyPolicy};

/// Arrears engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrearsConfig {
    /// Daily penalty rate as a fraction of the due amount
    #[serde(default = "default_penalty_rate")]
    pub penalty_rate: Decimal,

    /// Days between consecutive dues
    #[serde(default = "default_due_interval_days")]
    pub due_interval_days: u32,

    #[serde(default)]
    pub accrual_strategy: AccrualStrategy,

    /// Days a due may be overdue before it is swept
    #[serde(default)]
    pub grace_days: u32,

    /// Market timezone used to resolve "today"
    #[serde(default)]
    pub timezone: Timezone,
}

fn default_penalty_rate() -> Decimal {
    dec!(0.02)
}

fn default_due_interval_days() -> u32 {
    30
}

impl Default for ArrearsConfig {
    fn default() -> Self {
        Self {
            penalty_rate: default_penalty_rate(),
            due_interval_days: default_due_interval_days(),
            accrual_strategy: AccrualStrategy::default(),
            grace_days: 0,
            timezone: Timezone::default(),
        }
    }
}

impl ArrearsConfig {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.penalty_rate < Decimal::ZERO {
            return Err(CoreError::configuration(format!(
                "penalty_rate must not be negative, got {}",
                self.penalty_rate
            )));
        }
        if self.due_interval_days == 0 {
            return Err(CoreError::configuration("due_interval_days must be at least 1"));
        }
        Ok(())
    }

    pub fn penalty_policy(&self) -> PenaltyPolicy {
        match self.accrual_strategy {
            AccrualStrategy::DailyPenalty => PenaltyPolicy {
                daily_rate: Rate::new(self.penalty_rate),
                grace_days: self.grace_days,
                strategy: AccrualStrategy::DailyPenalty,
            },
            AccrualStrategy::PrincipalSweep => PenaltyPolicy::principal_sweep(self.grace_days),
        }
    }
}
