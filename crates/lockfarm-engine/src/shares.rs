//! Share calculation
//!
//! `shares = principal + principal · lockDays · bonusPerYear / 365 / 100`,
//! floored at each division. Shares are frozen into a position at deposit
//! time; changing the bonus later never touches existing positions.

use crate::constants::{DAYS_PER_YEAR, PERCENT_DENOMINATOR};
use lockfarm_core::{Amount, FarmError, Result, Shares};

/// Maps (principal, lock days) to shares for a given yearly bonus percent
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShareCalculator {
    bonus_per_year: u64,
}

impl ShareCalculator {
    pub fn new(bonus_per_year: u64) -> Self {
        Self { bonus_per_year }
    }

    pub fn bonus_per_year(&self) -> u64 {
        self.bonus_per_year
    }

    /// Shares granted for locking `principal` for `lock_days`
    pub fn shares(&self, principal: Amount, lock_days: u64) -> Result<Shares> {
        let bonus = principal
            .checked_mul(lock_days as u128)
            .and_then(|v| v.checked_mul(self.bonus_per_year as u128))
            .ok_or(FarmError::ArithmeticOverflow)?
            / DAYS_PER_YEAR
            / PERCENT_DENOMINATOR;
        principal
            .checked_add(bonus)
            .ok_or(FarmError::ArithmeticOverflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_bonus_no_lock() {
        let calc = ShareCalculator::new(0);
        assert_eq!(calc.shares(1_000, 0).unwrap(), 1_000);
        assert_eq!(calc.shares(1_000, 365).unwrap(), 1_000);
        assert_eq!(ShareCalculator::new(50).shares(1_000, 0).unwrap(), 1_000);
    }

    #[test]
    fn test_full_year_bonus() {
        // 20% per year locked for a full year
        let calc = ShareCalculator::new(20);
        assert_eq!(calc.shares(1_000, 365).unwrap(), 1_200);
    }

    #[test]
    fn test_floor_division() {
        // 100 * 30 * 10 = 30_000 / 365 = 82 / 100 = 0
        let calc = ShareCalculator::new(10);
        assert_eq!(calc.shares(100, 30).unwrap(), 100);
        // 10_000 * 30 * 10 = 3_000_000 / 365 = 8219 / 100 = 82
        assert_eq!(calc.shares(10_000, 30).unwrap(), 10_082);
    }

    #[test]
    fn test_monotonic_in_principal_and_days() {
        let calc = ShareCalculator::new(25);
        let mut prev = 0;
        for days in 0..=730 {
            let s = calc.shares(1_000_000, days).unwrap();
            assert!(s >= prev);
            prev = s;
        }
        assert!(calc.shares(2_000, 90).unwrap() >= calc.shares(1_999, 90).unwrap());
    }

    #[test]
    fn test_overflow() {
        let calc = ShareCalculator::new(u64::MAX);
        assert_eq!(calc.shares(u128::MAX, 2), Err(FarmError::ArithmeticOverflow));
    }
}
