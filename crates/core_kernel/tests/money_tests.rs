//! Unit tests for the Money module
//!
//! Tests cover money creation, rounding, arithmetic, clamping and rates.

use core_kernel::{Money, MoneyError, Rate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

mod creation {
    use super::*;

    #[test]
    fn test_new_creates_money_with_correct_amount() {
        let m = Money::new(dec!(100.50));
        assert_eq!(m.amount(), dec!(100.50));
    }

    #[test]
    fn test_new_rounds_half_away_from_zero() {
        assert_eq!(Money::new(dec!(0.125)).amount(), dec!(0.13));
        assert_eq!(Money::new(dec!(-0.125)).amount(), dec!(-0.13));
    }

    #[test]
    fn test_from_minor_converts_cents_correctly() {
        assert_eq!(Money::from_minor(50000).amount(), dec!(500.00));
    }

    #[test]
    fn test_zero_and_default_agree() {
        assert!(Money::zero().is_zero());
        assert_eq!(Money::default(), Money::zero());
    }

    #[test]
    fn test_from_decimal() {
        let m: Money = dec!(12.3).into();
        assert_eq!(m.amount(), dec!(12.30));
    }
}

mod predicates {
    use super::*;

    #[test]
    fn test_zero_is_neither_positive_nor_negative() {
        let m = Money::zero();
        assert!(!m.is_positive());
        assert!(!m.is_negative());
    }

    #[test]
    fn test_single_cent_is_positive() {
        assert!(Money::from_minor(1).is_positive());
    }

    #[test]
    fn test_ordering() {
        assert!(Money::new(dec!(300)) < Money::new(dec!(500)));
        assert_eq!(Money::new(dec!(500)).max(Money::new(dec!(300))), Money::new(dec!(500)));
    }
}

mod arithmetic {
    use super::*;

    #[test]
    fn test_add_and_sub() {
        let a = Money::new(dec!(1000.00));
        let b = Money::new(dec!(200.00));

        assert_eq!((a + b).amount(), dec!(1200.00));
        assert_eq!((a - b).amount(), dec!(800.00));
    }

    #[test]
    fn test_checked_add_overflow() {
        let max = Money::new(Decimal::MAX);
        assert_eq!(max.checked_add(&Money::new(Decimal::MAX)), Err(MoneyError::Overflow));
    }

    #[test]
    fn test_saturating_sub_exact_balance_reaches_zero() {
        let balance = Money::new(dec!(300.00));
        assert!(balance.saturating_sub(&Money::new(dec!(300.00))).is_zero());
    }

    #[test]
    fn test_saturating_sub_never_goes_negative() {
        let balance = Money::new(dec!(100.00));
        assert_eq!(balance.saturating_sub(&Money::new(dec!(100.01))), Money::zero());
    }

    #[test]
    fn test_sum_of_amounts() {
        let parts = vec![Money::new(dec!(1.10)), Money::new(dec!(2.20)), Money::new(dec!(3.30))];
        let total: Money = parts.iter().sum();
        assert_eq!(total.amount(), dec!(6.60));
    }

    #[test]
    fn test_multiply_rounds_to_cents() {
        let m = Money::new(dec!(333.33));
        assert_eq!(m.multiply(dec!(0.02)).unwrap().amount(), dec!(6.67));
    }
}

mod rates {
    use super::*;

    #[test]
    fn test_rate_round_trip_percentage() {
        let rate = Rate::from_percentage(dec!(2));
        assert_eq!(rate.as_decimal(), dec!(0.02));
        assert_eq!(rate.as_percentage(), dec!(2));
        assert!(rate.to_string().ends_with('%'));
    }

    #[test]
    fn test_daily_penalty_for_ten_days() {
        let rate = Rate::new(dec!(0.02));
        let due = Money::new(dec!(1000.00));
        let per_day = rate.apply(&due).unwrap();
        assert_eq!((per_day * dec!(10)).amount(), dec!(200.00));
    }

    #[test]
    fn test_negative_rate_detected() {
        assert!(Rate::new(dec!(-0.01)).is_negative());
        assert!(!Rate::new(dec!(0)).is_negative());
    }
}

mod serialization {
    use super::*;

    #[test]
    fn test_money_serializes_transparently() {
        let json = serde_json::to_string(&Money::new(dec!(500))).unwrap();
        assert_eq!(json, "\"500.00\"");
    }

    #[test]
    fn test_deserialization_rounds_to_cents() {
        let m: Money = serde_json::from_str("\"0.005\"").unwrap();
        assert_eq!(m.amount(), dec!(0.01));
    }

    #[test]
    fn test_money_deserializes_from_number_or_string() {
        let from_str: Money = serde_json::from_str("\"12.50\"").unwrap();
        let from_num: Money = serde_json::from_str("12.5").unwrap();
        assert_eq!(from_str, from_num);
    }
}
