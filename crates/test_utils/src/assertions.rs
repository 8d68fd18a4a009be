//! Custom Test Assertions
//!
//! Ledger-level checks with messages that name the offending rows.

use core_kernel::{LeaseId, Money};
use domain_arrears::LedgerSnapshot;
use rust_decimal::Decimal;

/// Asserts that two Money values are approximately equal within a tolerance
pub fn assert_money_approx_eq(actual: &Money, expected: &Money, tolerance: Decimal) {
    let diff = (actual.amount() - expected.amount()).abs();
    assert!(
        diff <= tolerance,
        "Money amounts differ by more than tolerance: actual={}, expected={}, diff={}, tolerance={}",
        actual,
        expected,
        diff,
        tolerance
    );
}

/// Asserts that a Money value is zero
pub fn assert_money_zero(money: &Money) {
    assert!(money.is_zero(), "Expected zero, got {}", money);
}

/// Asserts the arrears invariants of one lease
///
/// - the total is never negative
/// - the total equals the sum of the remaining balances of its open entries
/// - paid entries carry no remaining balance
pub fn assert_arrears_consistent(snapshot: &LedgerSnapshot, lease_id: LeaseId) {
    let total = snapshot
        .arrears
        .get(&lease_id)
        .map(|a| a.total)
        .unwrap_or_else(Money::zero);
    assert!(!total.is_negative(), "Arrears of lease {} went negative: {}", lease_id, total);

    let entries = snapshot.entries_of(lease_id);
    for entry in &entries {
        if entry.paid {
            assert!(
                entry.remaining.is_zero(),
                "Paid arrear entry {} still has {} remaining",
                entry.id,
                entry.remaining
            );
        }
    }

    let open: Decimal = entries
        .iter()
        .filter(|e| !e.paid)
        .map(|e| e.remaining.amount())
        .sum();
    assert_eq!(
        total.amount(),
        open,
        "Arrears total of lease {} does not match its open entries",
        lease_id
    );
}

/// Asserts that every penalty is filed under its own due
///
/// The ledger keys penalties by due, so this also confirms that no due
/// carries more than one.
pub fn assert_one_penalty_per_due(snapshot: &LedgerSnapshot) {
    for (due_id, penalty) in &snapshot.penalties {
        assert_eq!(
            *due_id, penalty.due_id,
            "Penalty {} is filed under due {} but belongs to {}",
            penalty.id, due_id, penalty.due_id
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_money_approx_eq_within_tolerance() {
        assert_money_approx_eq(&Money::new(dec!(100.004)), &Money::new(dec!(100.00)), dec!(0.01));
    }

    #[test]
    #[should_panic(expected = "differ by more than tolerance")]
    fn test_money_approx_eq_outside_tolerance() {
        assert_money_approx_eq(&Money::new(dec!(101)), &Money::new(dec!(100)), dec!(0.01));
    }

    #[test]
    fn test_empty_ledger_is_consistent() {
        let snapshot = LedgerSnapshot::default();
        assert_arrears_consistent(&snapshot, LeaseId::new());
        assert_one_penalty_per_due(&snapshot);
    }
}
