//! Fee treasury
//!
//! Splits outgoing reward into a net transfer and a retained protocol fee.
//! `paid_out` counts the gross amount: whatever leaves the reward liability,
//! fee included.

use crate::constants::{MAX_REWARD_FEE_PERCENT, PERCENT_DENOMINATOR};
use lockfarm_core::{Address, Amount, AssetTransferPort, FarmError, Result};
use serde::{Deserialize, Serialize};

/// Fee and net parts of a gross payout
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSplit {
    pub fee: Amount,
    pub net: Amount,
}

/// Reward fee configuration and accounting
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeTreasury {
    /// Fee percent taken from every reward distribution (0..=100)
    pub reward_fee_percent: u8,

    /// Recipient of swept fees
    pub fee_collector: Address,

    /// Fees retained and not yet swept
    pub total_fee_collected: Amount,

    /// Gross reward distributed, fees included
    pub paid_out: Amount,
}

impl FeeTreasury {
    pub fn new(reward_fee_percent: u8, fee_collector: Address) -> Result<Self> {
        Self::check_percent(reward_fee_percent)?;
        Ok(Self {
            reward_fee_percent,
            fee_collector,
            total_fee_collected: 0,
            paid_out: 0,
        })
    }

    pub fn check_percent(percent: u8) -> Result<()> {
        if percent > MAX_REWARD_FEE_PERCENT {
            return Err(FarmError::InvalidConfiguration(format!(
                "reward fee percent {} exceeds {}",
                percent, MAX_REWARD_FEE_PERCENT
            )));
        }
        Ok(())
    }

    /// Fee/net split of `amount` (fee floored)
    pub fn split(&self, amount: Amount) -> FeeSplit {
        if self.reward_fee_percent == 0 {
            return FeeSplit { fee: 0, net: amount };
        }
        let percent = self.reward_fee_percent as u128;
        let fee = amount / PERCENT_DENOMINATOR * percent
            + amount % PERCENT_DENOMINATOR * percent / PERCENT_DENOMINATOR;
        FeeSplit {
            fee,
            net: amount - fee,
        }
    }

    /// Send `amount` of reward to `to`, retaining the fee in custody
    pub fn distribute(
        &mut self,
        asset: &dyn AssetTransferPort,
        custody: Address,
        to: Address,
        amount: Amount,
    ) -> Result<FeeSplit> {
        let split = self.split(amount);
        let total_fee_collected = self
            .total_fee_collected
            .checked_add(split.fee)
            .ok_or(FarmError::ArithmeticOverflow)?;
        let paid_out = self
            .paid_out
            .checked_add(amount)
            .ok_or(FarmError::ArithmeticOverflow)?;
        if split.net > 0 {
            asset.transfer(custody, to, split.net)?;
        }
        self.total_fee_collected = total_fee_collected;
        self.paid_out = paid_out;
        Ok(split)
    }

    /// Reset the retained fees, returning what was held
    pub fn take_collected(&mut self) -> Amount {
        std::mem::take(&mut self.total_fee_collected)
    }
}
