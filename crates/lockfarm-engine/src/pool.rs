//! Farm pool state
//!
//! Singleton aggregate mutated by every deposit, withdrawal and funding call.
//! `total_shares` always equals the sum of shares over open positions.

use crate::accumulator::RewardAccumulator;
use crate::penalty::PenaltyKind;
use crate::shares::ShareCalculator;
use crate::treasury::FeeTreasury;
use lockfarm_core::{Address, Amount, AssetId, FarmError, Result, Shares, Timestamp};
use serde::{Deserialize, Serialize};

/// Global farm state
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    // === Identities ===
    pub staked_asset: AssetId,
    pub reward_asset: AssetId,
    pub secondary_asset: Option<AssetId>,

    /// Account holding principal, undistributed reward and retained fees
    pub custody: Address,

    // === Totals over open positions ===
    pub total_deposits: Amount,
    pub total_shares: Shares,

    // === Emission ===
    pub accumulator: RewardAccumulator,

    // === Policy ===
    pub min_lock_days: u64,
    pub max_lock_days: u64,
    pub early_withdraw_allowed: bool,
    pub penalty: PenaltyKind,
    pub bonus_per_year: u64,

    /// Secondary reward per primary reward unit, in basis points
    pub secondary_reward_multiplier: u64,

    pub treasury: FeeTreasury,

    // === Audit counters ===
    pub total_funded_rewards: Amount,

    /// Outstanding reward liability: funded minus paid out and burned
    pub total_rewards: Amount,

    pub total_tokens_burned: Amount,
    pub total_principal_deposited: Amount,
    pub total_reward_generated: Amount,
    pub total_secondary_reward_generated: Amount,
}

impl Pool {
    /// Validate a lock duration against the configured range
    pub fn check_lock_days(&self, lock_days: u64) -> Result<()> {
        if lock_days < self.min_lock_days || lock_days > self.max_lock_days {
            return Err(FarmError::LockDurationOutOfRange {
                requested: lock_days,
                min: self.min_lock_days,
                max: self.max_lock_days,
            });
        }
        Ok(())
    }

    pub fn share_calculator(&self) -> ShareCalculator {
        ShareCalculator::new(self.bonus_per_year)
    }

    pub fn is_closed(&self, now: Timestamp) -> bool {
        self.accumulator.is_closed(now)
    }

    /// Reward held in custody beyond what the pool owes. When the staked and
    /// reward assets coincide, principal counts as owed too.
    pub fn reward_surplus(&self, custody_balance: Amount) -> Amount {
        let mut reserved = self
            .total_rewards
            .saturating_add(self.treasury.total_fee_collected);
        if self.reward_asset == self.staked_asset {
            reserved = reserved.saturating_add(self.total_deposits);
        }
        custody_balance.saturating_sub(reserved)
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            total_deposits: self.total_deposits,
            total_shares: self.total_shares,
            acc_reward_per_share: self.accumulator.acc_reward_per_share,
            last_accrual_time: self.accumulator.last_accrual_time,
            start_time: self.accumulator.start_time,
            end_time: self.accumulator.end_time,
            reward_per_second: self.accumulator.reward_per_second,
            penalty: self.penalty,
            total_funded_rewards: self.total_funded_rewards,
            total_rewards: self.total_rewards,
            paid_out: self.treasury.paid_out,
            total_tokens_burned: self.total_tokens_burned,
            total_fee_collected: self.treasury.total_fee_collected,
            total_principal_deposited: self.total_principal_deposited,
            total_reward_generated: self.total_reward_generated,
            total_secondary_reward_generated: self.total_secondary_reward_generated,
        }
    }
}

/// Read-only view of pool totals for reporting
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub total_deposits: Amount,
    pub total_shares: Shares,
    pub acc_reward_per_share: u128,
    pub last_accrual_time: Timestamp,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub reward_per_second: Amount,
    pub penalty: PenaltyKind,
    pub total_funded_rewards: Amount,
    pub total_rewards: Amount,
    pub paid_out: Amount,
    pub total_tokens_burned: Amount,
    pub total_fee_collected: Amount,
    pub total_principal_deposited: Amount,
    pub total_reward_generated: Amount,
    pub total_secondary_reward_generated: Amount,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn test_pool(reward_per_second: Amount, start_time: Timestamp) -> Pool {
        Pool {
            staked_asset: AssetId(Address::from_low_u64(0x5001)),
            reward_asset: AssetId(Address::from_low_u64(0x5002)),
            secondary_asset: None,
            custody: Address::from_low_u64(0xc0),
            total_deposits: 0,
            total_shares: 0,
            accumulator: RewardAccumulator::new(reward_per_second, start_time),
            min_lock_days: 0,
            max_lock_days: 365,
            early_withdraw_allowed: true,
            penalty: PenaltyKind::NoPenalty,
            bonus_per_year: 0,
            secondary_reward_multiplier: 0,
            treasury: FeeTreasury::new(0, Address::from_low_u64(0xfee)).unwrap(),
            total_funded_rewards: 0,
            total_rewards: 0,
            total_tokens_burned: 0,
            total_principal_deposited: 0,
            total_reward_generated: 0,
            total_secondary_reward_generated: 0,
        }
    }

    #[test]
    fn test_lock_range() {
        let mut pool = test_pool(1, 0);
        pool.min_lock_days = 7;
        pool.max_lock_days = 30;
        assert!(pool.check_lock_days(7).is_ok());
        assert!(pool.check_lock_days(30).is_ok());
        assert_eq!(
            pool.check_lock_days(6),
            Err(FarmError::LockDurationOutOfRange {
                requested: 6,
                min: 7,
                max: 30
            })
        );
        assert!(pool.check_lock_days(31).is_err());
    }

    #[test]
    fn test_reward_surplus() {
        let mut pool = test_pool(1, 0);
        pool.total_rewards = 1_000;
        pool.treasury.total_fee_collected = 50;
        assert_eq!(pool.reward_surplus(1_060), 10);
        assert_eq!(pool.reward_surplus(900), 0);

        pool.reward_asset = pool.staked_asset;
        pool.total_deposits = 10;
        assert_eq!(pool.reward_surplus(1_060), 0);
    }
}
