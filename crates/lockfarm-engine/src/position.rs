//! Stake positions
//!
//! A position is identified by `(owner, index)` where `index` is its append
//! slot in the owner's collection. Closing a position zeroes it in place so
//! indices stay stable.

use crate::accumulator::RewardAccumulator;
use crate::constants::SECONDS_PER_DAY;
use lockfarm_core::{Address, Amount, FarmError, Result, Shares, Timestamp};
use serde::{Deserialize, Serialize};

/// A single time-locked deposit
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakePosition {
    /// Depositor
    pub owner: Address,

    /// Principal still locked (zero once closed)
    pub principal: Amount,

    /// Claim on the accumulator (zero once closed)
    pub shares: Shares,

    /// Reward already accounted for at deposit time
    pub reward_debt: Amount,

    /// Deposit timestamp
    pub deposit_time: Timestamp,

    /// Withdrawal timestamp, zero while open
    pub withdraw_time: Timestamp,

    /// Lock duration chosen at deposit
    pub locked_days: u64,
}

impl StakePosition {
    pub fn is_open(&self) -> bool {
        self.principal > 0 && self.withdraw_time == 0
    }

    /// Timestamp from which the lock is respected
    pub fn unlocks_at(&self) -> Timestamp {
        self.deposit_time
            .saturating_add(self.locked_days.saturating_mul(SECONDS_PER_DAY))
    }

    pub fn lock_respected(&self, now: Timestamp) -> bool {
        self.unlocks_at() <= now
    }

    pub fn seconds_until_unlock(&self, now: Timestamp) -> u64 {
        self.unlocks_at().saturating_sub(now)
    }

    /// Pending reward at accumulator value `acc`
    pub fn pending(&self, acc: u128) -> Result<Amount> {
        if self.shares == 0 {
            return Ok(0);
        }
        RewardAccumulator::owed(self.shares, acc)?
            .checked_sub(self.reward_debt)
            .ok_or(FarmError::ArithmeticOverflow)
    }

    /// Zero the position and stamp the withdrawal time
    pub fn close(&mut self, now: Timestamp) {
        self.principal = 0;
        self.shares = 0;
        self.reward_debt = 0;
        self.withdraw_time = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::ACC_SCALE;

    fn position(deposit_time: Timestamp, locked_days: u64) -> StakePosition {
        StakePosition {
            owner: Address::from_low_u64(1),
            principal: 1_000,
            shares: 1_000,
            reward_debt: 500,
            deposit_time,
            withdraw_time: 0,
            locked_days,
        }
    }

    #[test]
    fn test_lock_uses_whole_days() {
        let pos = position(1_000, 30);
        assert_eq!(pos.unlocks_at(), 1_000 + 30 * 86_400);
        assert!(!pos.lock_respected(1_000 + 86_400));
        assert!(pos.lock_respected(1_000 + 30 * 86_400));
        assert_eq!(pos.seconds_until_unlock(1_000 + 29 * 86_400), 86_400);
        assert_eq!(pos.seconds_until_unlock(u64::MAX), 0);
    }

    #[test]
    fn test_pending_subtracts_debt() {
        let pos = position(0, 0);
        // 1000 shares at 2 reward/share = 2000, minus 500 debt
        assert_eq!(pos.pending(2 * ACC_SCALE).unwrap(), 1_500);
    }

    #[test]
    fn test_close_zeroes_in_place() {
        let mut pos = position(0, 0);
        assert!(pos.is_open());
        pos.close(42);
        assert!(!pos.is_open());
        assert_eq!(pos.principal, 0);
        assert_eq!(pos.shares, 0);
        assert_eq!(pos.pending(10 * ACC_SCALE).unwrap(), 0);
        assert_eq!(pos.withdraw_time, 42);
    }
}
