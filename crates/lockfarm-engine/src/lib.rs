//! # Lockfarm Engine - Time-Locked Staking with Share-Weighted Rewards
//!
//! Depositors lock a staked asset for a chosen number of days and accrue a
//! reward asset emitted at a fixed rate per second. Every position's claim is
//! measured in shares (principal plus a lock-duration bonus), and a single
//! global accumulator turns emission into "reward per share" so any position
//! can compute its entitlement without looking at any other position.
//!
//! ## Accrual
//!
//! ```text
//!   acc(t₁) = acc(t₀) + (min(t₁, end) - t₀) · rate · 10¹⁸ / totalShares
//!
//!   pending(position) = shares · acc / 10¹⁸ - rewardDebt
//! ```
//!
//! ## Position lifecycle
//!
//! | Call | Lock respected | Lock violated |
//! |------|----------------|---------------|
//! | `withdraw` | principal + reward | principal + penalty policy |
//! | `emergency_withdraw` | principal, reward forfeited | principal, reward forfeited |
//!
//! Funding extends the horizon by `amount / rate` seconds; nothing is emitted
//! past the horizon.

pub mod accumulator;
pub mod config;
pub mod events;
pub mod farm;
pub mod guard;
pub mod ledger;
pub mod penalty;
pub mod pool;
pub mod position;
pub mod shares;
pub mod treasury;

// Re-exports
pub use accumulator::RewardAccumulator;
pub use config::{ConfigError, FarmConfig};
pub use events::{EventJournal, FarmEvent};
pub use farm::{Farm, FundReceipt};
pub use guard::{Entered, ReentrancyGuard};
pub use ledger::{
    AssetPorts, DepositReceipt, EmergencyWithdrawReceipt, PositionBatch, StakePositionLedger,
    WithdrawReceipt,
};
pub use penalty::{PenaltyKind, RewardDisposition};
pub use pool::{Pool, PoolSnapshot};
pub use position::StakePosition;
pub use shares::ShareCalculator;
pub use treasury::{FeeSplit, FeeTreasury};

/// Engine constants
pub mod constants {
    use lockfarm_core::Amount;

    /// Fixed-point scale of the reward-per-share accumulator
    pub const ACC_SCALE: u128 = 1_000_000_000_000_000_000; // 10^18

    /// Seconds in a lock day
    pub const SECONDS_PER_DAY: u64 = 86_400;

    /// Days per year for the lock bonus
    pub const DAYS_PER_YEAR: u128 = 365;

    /// Percent denominator for the lock bonus and reward fee
    pub const PERCENT_DENOMINATOR: u128 = 100;

    /// Maximum reward fee percent
    pub const MAX_REWARD_FEE_PERCENT: u8 = 100;

    /// Basis points denominator of the secondary reward multiplier
    /// (10_000 = one secondary unit per primary reward unit)
    pub const SECONDARY_MULTIPLIER_DENOMINATOR: Amount = 10_000;
}

pub use constants::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale() {
        assert_eq!(ACC_SCALE, 10u128.pow(18));
    }

    #[test]
    fn test_day_length() {
        assert_eq!(SECONDS_PER_DAY, 24 * 3600);
    }
}
