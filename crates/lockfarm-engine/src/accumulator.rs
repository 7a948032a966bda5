//! # Reward Accumulator
//!
//! Global "reward owed per share" running total plus the funding horizon.
//!
//! The checkpoint advances to the caller's `now` even when emission is clamped
//! at `end_time`, so once the farm has ended repeated accruals are no-ops.

use crate::constants::ACC_SCALE;
use lockfarm_core::{Amount, FarmError, Result, Shares, Timestamp};
use serde::{Deserialize, Serialize};

/// Emission state shared by every position
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardAccumulator {
    /// Reward per share since inception, scaled by `ACC_SCALE`
    pub acc_reward_per_share: u128,

    /// Last time emission was folded into the accumulator
    pub last_accrual_time: Timestamp,

    /// Emission start
    pub start_time: Timestamp,

    /// Funding horizon; nothing is emitted past it
    pub end_time: Timestamp,

    /// Emission rate, immutable after initialization
    pub reward_per_second: Amount,
}

impl RewardAccumulator {
    /// Unfunded accumulator: the horizon starts equal to `start_time`
    pub fn new(reward_per_second: Amount, start_time: Timestamp) -> Self {
        Self {
            acc_reward_per_share: 0,
            last_accrual_time: start_time,
            start_time,
            end_time: start_time,
            reward_per_second,
        }
    }

    /// Whether deposits and funding are refused at `now`
    pub fn is_closed(&self, now: Timestamp) -> bool {
        now >= self.end_time
    }

    /// Compute the accumulator and checkpoint an accrual at `now` would
    /// produce, or `None` when it would be a no-op.
    fn step(&self, now: Timestamp, total_shares: Shares) -> Result<Option<(u128, Timestamp)>> {
        let effective_now = now.min(self.end_time);
        if effective_now <= self.last_accrual_time {
            return Ok(None);
        }
        if total_shares == 0 {
            return Ok(Some((self.acc_reward_per_share, effective_now)));
        }

        let elapsed = (effective_now - self.last_accrual_time) as u128;
        let emitted = elapsed
            .checked_mul(self.reward_per_second)
            .ok_or(FarmError::ArithmeticOverflow)?;
        let increment = emitted
            .checked_mul(ACC_SCALE)
            .ok_or(FarmError::ArithmeticOverflow)?
            / total_shares;
        let acc = self
            .acc_reward_per_share
            .checked_add(increment)
            .ok_or(FarmError::ArithmeticOverflow)?;

        Ok(Some((acc, now)))
    }

    /// Fold emission up to `now` into the accumulator. Returns whether the
    /// checkpoint moved.
    pub fn accrue(&mut self, now: Timestamp, total_shares: Shares) -> Result<bool> {
        match self.step(now, total_shares)? {
            Some((acc, checkpoint)) => {
                tracing::debug!(
                    "Accrued to {}: acc_reward_per_share {} -> {} over {} shares",
                    checkpoint,
                    self.acc_reward_per_share,
                    acc,
                    total_shares
                );
                self.acc_reward_per_share = acc;
                self.last_accrual_time = checkpoint;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Accumulator value `accrue(now)` would leave behind, without mutating
    pub fn preview(&self, now: Timestamp, total_shares: Shares) -> Result<u128> {
        Ok(self
            .step(now, total_shares)?
            .map(|(acc, _)| acc)
            .unwrap_or(self.acc_reward_per_share))
    }

    /// Push the horizon out by `amount / reward_per_second` seconds. The
    /// remainder below one emission-second does not extend the horizon.
    /// Returns the extension in seconds.
    pub fn extend(&mut self, amount: Amount) -> Result<u64> {
        let seconds = amount / self.reward_per_second;
        let seconds = u64::try_from(seconds).map_err(|_| FarmError::ArithmeticOverflow)?;
        self.end_time = self
            .end_time
            .checked_add(seconds)
            .ok_or(FarmError::ArithmeticOverflow)?;
        Ok(seconds)
    }

    /// Reward owed to `shares` at accumulator value `acc`
    pub fn owed(shares: Shares, acc: u128) -> Result<Amount> {
        shares
            .checked_mul(acc)
            .map(|v| v / ACC_SCALE)
            .ok_or(FarmError::ArithmeticOverflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn funded(rate: Amount, start: Timestamp, seconds: u64) -> RewardAccumulator {
        let mut acc = RewardAccumulator::new(rate, start);
        acc.extend(rate * seconds as u128).unwrap();
        acc
    }

    #[test]
    fn test_basic_accrual() {
        let mut acc = funded(10, 0, 1_000);
        assert!(acc.accrue(10, 100).unwrap());
        // 10 s * 10/s = 100 emitted over 100 shares = 1 per share
        assert_eq!(acc.acc_reward_per_share, ACC_SCALE);
        assert_eq!(RewardAccumulator::owed(100, acc.acc_reward_per_share).unwrap(), 100);
        assert_eq!(acc.last_accrual_time, 10);
    }

    #[test]
    fn test_no_shares_advances_checkpoint_only() {
        let mut acc = funded(10, 0, 1_000);
        assert!(acc.accrue(50, 0).unwrap());
        assert_eq!(acc.acc_reward_per_share, 0);
        assert_eq!(acc.last_accrual_time, 50);
    }

    #[test]
    fn test_no_op_when_time_has_not_advanced() {
        let mut acc = funded(10, 100, 1_000);
        assert!(!acc.accrue(50, 100).unwrap());
        assert_eq!(acc.last_accrual_time, 100);
        assert!(acc.accrue(110, 100).unwrap());
        assert!(!acc.accrue(110, 100).unwrap());
    }

    #[test]
    fn test_emission_clamped_at_horizon_checkpoint_unclamped() {
        let mut acc = funded(10, 0, 100);
        assert_eq!(acc.end_time, 100);

        acc.accrue(500, 1_000).unwrap();
        // Only 100 seconds emitted: 1000 reward over 1000 shares
        assert_eq!(acc.acc_reward_per_share, ACC_SCALE);
        assert_eq!(acc.last_accrual_time, 500);

        assert!(!acc.accrue(900, 1_000).unwrap());
        assert_eq!(acc.acc_reward_per_share, ACC_SCALE);
    }

    #[test]
    fn test_preview_matches_accrue_and_is_idempotent() {
        let mut acc = funded(7, 0, 10_000);
        acc.accrue(33, 900).unwrap();

        let first = acc.preview(1_234, 900).unwrap();
        let second = acc.preview(1_234, 900).unwrap();
        assert_eq!(first, second);

        acc.accrue(1_234, 900).unwrap();
        assert_eq!(acc.acc_reward_per_share, first);
    }

    #[test]
    fn test_extend_drops_residual() {
        let mut acc = RewardAccumulator::new(3, 1_000);
        assert_eq!(acc.extend(10).unwrap(), 3);
        assert_eq!(acc.end_time, 1_003);
        assert_eq!(acc.extend(2).unwrap(), 0);
        assert_eq!(acc.end_time, 1_003);
    }

    #[test]
    fn test_closed_at_horizon() {
        let acc = funded(1, 10, 5);
        assert!(!acc.is_closed(14));
        assert!(acc.is_closed(15));
    }

    #[test]
    fn test_overflow_is_reported() {
        let mut acc = RewardAccumulator::new(u128::MAX / 2, 0);
        acc.end_time = 1_000;
        assert_eq!(acc.accrue(1_000, 1), Err(FarmError::ArithmeticOverflow));
    }
}
