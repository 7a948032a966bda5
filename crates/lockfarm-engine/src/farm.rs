//! # Farm
//!
//! Public entry points over one pool and its position ledger.
//!
//! Mutating calls take the reentrancy guard first and the state lock second;
//! a nested call (for example from inside an asset transfer) fails with
//! `ReentrancyRejected` instead of deadlocking. Queries never block: if the
//! state is held by an in-flight call they are rejected the same way.

use crate::accumulator::RewardAccumulator;
use crate::config::FarmConfig;
use crate::events::{EventJournal, FarmEvent};
use crate::guard::ReentrancyGuard;
use crate::ledger::{
    AssetPorts, DepositReceipt, EmergencyWithdrawReceipt, PositionBatch, RewardSettlement,
    StakePositionLedger, WithdrawReceipt,
};
use crate::penalty::{PenaltyKind, RewardDisposition};
use crate::pool::{Pool, PoolSnapshot};
use crate::position::StakePosition;
use crate::treasury::FeeTreasury;
use lockfarm_core::{Address, Amount, AssetTransferPort, Clock, FarmError, Result, Shares, Timestamp};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Outcome of a committed funding call
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundReceipt {
    pub funder: Address,
    pub requested: Amount,
    pub received: Amount,
    /// Horizon extension in seconds
    pub extension: u64,
    pub end_time: Timestamp,
}

struct FarmState {
    owner: Address,
    pool: Pool,
    ledger: StakePositionLedger,
    journal: EventJournal,
}

impl FarmState {
    fn record_settlement(&mut self, settlement: &RewardSettlement) {
        let (owner, index, amount) = (settlement.owner, settlement.index, settlement.pending);
        match settlement.disposition {
            Some(RewardDisposition::PayOwner) => self.journal.record(FarmEvent::RewardPaid {
                owner,
                index,
                amount,
                fee: settlement.fee,
                secondary: settlement.secondary,
            }),
            Some(RewardDisposition::Burn) => self.journal.record(FarmEvent::RewardBurned {
                owner,
                index,
                amount,
            }),
            Some(RewardDisposition::Redistribute) => {
                self.journal.record(FarmEvent::RewardRedistributed {
                    owner,
                    index,
                    amount,
                    end_time: self.pool.accumulator.end_time,
                })
            }
            None => {}
        }
    }

    fn require_owner(&self, caller: Address) -> Result<()> {
        if caller != self.owner {
            tracing::warn!("Rejected administrative call from {}", caller);
            return Err(FarmError::Unauthorized);
        }
        Ok(())
    }
}

/// A single staking farm
pub struct Farm {
    guard: ReentrancyGuard,
    state: Mutex<FarmState>,
    ports: AssetPorts,
    clock: Arc<dyn Clock>,
}

impl Farm {
    /// Create a farm. `custody` is the account holding principal and reward;
    /// the asset identities are taken from the ports.
    pub fn initialize(
        config: FarmConfig,
        owner: Address,
        custody: Address,
        ports: AssetPorts,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;

        let staked_asset = ports.staked.asset_id();
        let reward_asset = ports.reward.asset_id();
        if reward_asset.is_null() {
            return Err(FarmError::InvalidConfiguration(
                "reward asset is null".into(),
            ));
        }
        if staked_asset.is_null() {
            return Err(FarmError::InvalidConfiguration(
                "staked asset is null".into(),
            ));
        }
        let now = clock.now();
        if config.start_time < now {
            return Err(FarmError::InvalidConfiguration(format!(
                "start time {} is before now {}",
                config.start_time, now
            )));
        }
        if config.secondary_reward_multiplier > 0 && ports.secondary.is_none() {
            return Err(FarmError::InvalidConfiguration(
                "secondary reward multiplier set without a secondary asset".into(),
            ));
        }

        let pool = Pool {
            staked_asset,
            reward_asset,
            secondary_asset: ports.secondary.as_ref().map(|p| p.asset_id()),
            custody,
            total_deposits: 0,
            total_shares: 0,
            accumulator: RewardAccumulator::new(config.reward_per_second(), config.start_time),
            min_lock_days: config.min_lock_days,
            max_lock_days: config.max_lock_days,
            early_withdraw_allowed: config.early_withdraw_allowed,
            penalty: config.penalty,
            bonus_per_year: config.bonus_per_year,
            secondary_reward_multiplier: config.secondary_reward_multiplier,
            treasury: FeeTreasury::new(config.reward_fee_percent, config.fee_collector)?,
            total_funded_rewards: 0,
            total_rewards: 0,
            total_tokens_burned: 0,
            total_principal_deposited: 0,
            total_reward_generated: 0,
            total_secondary_reward_generated: 0,
        };

        tracing::info!(
            "Initialized farm: staked {}, reward {}, {} per second from {}",
            staked_asset,
            reward_asset,
            config.reward_per_second,
            config.start_time
        );

        Ok(Self {
            guard: ReentrancyGuard::new(),
            state: Mutex::new(FarmState {
                owner,
                pool,
                ledger: StakePositionLedger::new(),
                journal: EventJournal::new(),
            }),
            ports,
            clock,
        })
    }

    fn mutate<T>(
        &self,
        f: impl FnOnce(&mut FarmState, &AssetPorts, Timestamp) -> Result<T>,
    ) -> Result<T> {
        let _entered = self.guard.enter()?;
        let mut state = self.state.lock();
        let now = self.clock.now();
        f(&mut state, &self.ports, now)
    }

    fn admin<T>(&self, caller: Address, f: impl FnOnce(&mut FarmState) -> Result<T>) -> Result<T> {
        self.mutate(|state, _, _| {
            state.require_owner(caller)?;
            f(state)
        })
    }

    fn query<T>(&self, f: impl FnOnce(&FarmState, Timestamp) -> Result<T>) -> Result<T> {
        let state = self
            .state
            .try_lock()
            .ok_or(FarmError::ReentrancyRejected)?;
        f(&state, self.clock.now())
    }

    // === Position entry points ===

    pub fn deposit(&self, caller: Address, amount: Amount, lock_days: u64) -> Result<DepositReceipt> {
        self.mutate(|state, ports, now| {
            let receipt =
                state
                    .ledger
                    .deposit(&mut state.pool, ports, caller, amount, lock_days, now)?;
            if let Some(index) = receipt.index {
                state.journal.record(FarmEvent::Deposited {
                    owner: caller,
                    index,
                    principal: receipt.principal,
                    shares: receipt.shares,
                });
            }
            Ok(receipt)
        })
    }

    /// Settle the position's reward, then return its principal. A principal
    /// leg refused after settlement keeps the reward event and leaves the
    /// position open with nothing pending.
    pub fn withdraw(&self, caller: Address, index: usize) -> Result<WithdrawReceipt> {
        self.mutate(|state, ports, now| {
            let mut settlement = state
                .ledger
                .settle_reward(&mut state.pool, ports, caller, index, now)?;
            state.record_settlement(&settlement);
            if let Some(err) = settlement.secondary_error.take() {
                return Err(err);
            }

            let receipt = state
                .ledger
                .release_principal(&mut state.pool, ports, settlement, now)?;
            state.journal.record(FarmEvent::Withdrawn {
                owner: caller,
                index,
                principal: receipt.principal,
            });
            Ok(receipt)
        })
    }

    pub fn emergency_withdraw(
        &self,
        caller: Address,
        index: usize,
    ) -> Result<EmergencyWithdrawReceipt> {
        self.mutate(|state, ports, now| {
            let receipt =
                state
                    .ledger
                    .emergency_withdraw(&mut state.pool, ports, caller, index, now)?;
            state.journal.record(FarmEvent::EmergencyWithdrawn {
                owner: caller,
                index,
                principal: receipt.principal,
            });
            Ok(receipt)
        })
    }

    /// Add reward supply from `caller`, extending the horizon by
    /// `received / reward_per_second` seconds
    pub fn fund(&self, caller: Address, amount: Amount) -> Result<FundReceipt> {
        self.mutate(|state, ports, now| {
            let pool = &state.pool;
            if pool.is_closed(now) {
                return Err(FarmError::FarmClosed);
            }
            if amount == 0 {
                return Err(FarmError::ZeroAmount);
            }

            let mut staged = pool.clone();
            staged.accumulator.accrue(now, staged.total_shares)?;

            // Bounds at the requested amount hold for anything smaller credited
            let mut horizon = staged.accumulator;
            horizon.extend(amount)?;
            staged
                .total_funded_rewards
                .checked_add(amount)
                .ok_or(FarmError::ArithmeticOverflow)?;

            let before = ports.reward.balance_of(staged.custody);
            ports.reward.transfer_from(caller, staged.custody, amount)?;
            let after = ports.reward.balance_of(staged.custody);
            let received = after.saturating_sub(before).min(amount);
            if received == 0 {
                tracing::warn!("Funding by {} credited nothing of {}", caller, amount);
                let end_time = staged.accumulator.end_time;
                state.pool = staged;
                return Ok(FundReceipt {
                    funder: caller,
                    requested: amount,
                    received,
                    extension: 0,
                    end_time,
                });
            }

            let extension = staged.accumulator.extend(received)?;
            staged.total_rewards = staged
                .total_rewards
                .checked_add(received)
                .ok_or(FarmError::ArithmeticOverflow)?;
            staged.total_funded_rewards = staged
                .total_funded_rewards
                .checked_add(received)
                .ok_or(FarmError::ArithmeticOverflow)?;
            let end_time = staged.accumulator.end_time;
            state.pool = staged;

            tracing::info!(
                "Funded {} by {}: horizon +{}s to {}",
                received,
                caller,
                extension,
                end_time
            );
            state.journal.record(FarmEvent::Funded {
                funder: caller,
                amount: received,
                end_time,
            });

            Ok(FundReceipt {
                funder: caller,
                requested: amount,
                received,
                extension,
                end_time,
            })
        })
    }

    // === Administration ===

    pub fn set_penalty(&self, caller: Address, penalty: PenaltyKind) -> Result<()> {
        self.admin(caller, |state| {
            state.pool.penalty = penalty;
            tracing::info!("Penalty set to {}", penalty);
            state.journal.record(FarmEvent::penalty_updated(penalty));
            Ok(())
        })
    }

    pub fn set_lock_range(&self, caller: Address, min_days: u64, max_days: u64) -> Result<()> {
        self.admin(caller, |state| {
            if min_days > max_days {
                return Err(FarmError::InvalidConfiguration(format!(
                    "min lock {} exceeds max lock {}",
                    min_days, max_days
                )));
            }
            state.pool.min_lock_days = min_days;
            state.pool.max_lock_days = max_days;
            tracing::info!("Lock range set to [{}, {}] days", min_days, max_days);
            state.journal.record(FarmEvent::config_updated(
                "lock_range",
                format!("{}..={}", min_days, max_days),
            ));
            Ok(())
        })
    }

    pub fn set_early_withdraw_allowed(&self, caller: Address, allowed: bool) -> Result<()> {
        self.admin(caller, |state| {
            state.pool.early_withdraw_allowed = allowed;
            state
                .journal
                .record(FarmEvent::config_updated("early_withdraw_allowed", allowed));
            Ok(())
        })
    }

    pub fn set_reward_fee_percent(&self, caller: Address, percent: u8) -> Result<()> {
        self.admin(caller, |state| {
            FeeTreasury::check_percent(percent)?;
            state.pool.treasury.reward_fee_percent = percent;
            tracing::info!("Reward fee set to {}%", percent);
            state
                .journal
                .record(FarmEvent::config_updated("reward_fee_percent", percent));
            Ok(())
        })
    }

    pub fn set_fee_collector(&self, caller: Address, collector: Address) -> Result<()> {
        self.admin(caller, |state| {
            state.pool.treasury.fee_collector = collector;
            state
                .journal
                .record(FarmEvent::config_updated("fee_collector", collector.to_hex()));
            Ok(())
        })
    }

    /// Applies to deposits made after the call
    pub fn set_bonus_per_year(&self, caller: Address, bonus_per_year: u64) -> Result<()> {
        self.admin(caller, |state| {
            state.pool.bonus_per_year = bonus_per_year;
            state
                .journal
                .record(FarmEvent::config_updated("bonus_per_year", bonus_per_year));
            Ok(())
        })
    }

    pub fn set_secondary_reward_multiplier(&self, caller: Address, multiplier: u64) -> Result<()> {
        let has_secondary = self.ports.secondary.is_some();
        self.admin(caller, |state| {
            if multiplier > 0 && !has_secondary {
                return Err(FarmError::InvalidConfiguration(
                    "secondary reward multiplier set without a secondary asset".into(),
                ));
            }
            state.pool.secondary_reward_multiplier = multiplier;
            state.journal.record(FarmEvent::config_updated(
                "secondary_reward_multiplier",
                multiplier,
            ));
            Ok(())
        })
    }

    /// Sweep retained reward fees to the fee collector
    pub fn withdraw_collected_fees(&self, caller: Address) -> Result<Amount> {
        self.mutate(|state, ports, _| {
            state.require_owner(caller)?;
            let treasury = &state.pool.treasury;
            let amount = treasury.total_fee_collected;
            if amount == 0 {
                return Ok(0);
            }
            let collector = treasury.fee_collector;
            ports.reward.transfer(state.pool.custody, collector, amount)?;
            state.pool.treasury.take_collected();

            tracing::info!("Swept {} collected fees to {}", amount, collector);
            state
                .journal
                .record(FarmEvent::FeesCollected { collector, amount });
            Ok(amount)
        })
    }

    /// Move tokens that are not owed to anyone out of custody. The staked
    /// asset is never recoverable; of the reward asset only the surplus is.
    pub fn recover_tokens(
        &self,
        caller: Address,
        asset: &dyn AssetTransferPort,
        to: Address,
        amount: Amount,
    ) -> Result<()> {
        self.mutate(|state, _, _| {
            state.require_owner(caller)?;
            let pool = &state.pool;
            let asset_id = asset.asset_id();
            if asset_id == pool.staked_asset {
                return Err(FarmError::ProtectedAsset);
            }
            if amount == 0 {
                return Err(FarmError::ZeroAmount);
            }
            if asset_id == pool.reward_asset {
                let available = pool.reward_surplus(asset.balance_of(pool.custody));
                if amount > available {
                    return Err(FarmError::InsufficientFunds {
                        needed: amount,
                        available,
                    });
                }
            }
            asset.transfer(pool.custody, to, amount)?;

            tracing::info!("Recovered {} of {} to {}", amount, asset_id, to);
            state.journal.record(FarmEvent::TokensRecovered {
                asset: asset_id,
                to,
                amount,
            });
            Ok(())
        })
    }

    pub fn transfer_ownership(&self, caller: Address, new_owner: Address) -> Result<()> {
        self.admin(caller, |state| {
            if new_owner.is_zero() {
                return Err(FarmError::InvalidConfiguration(
                    "new owner is the zero address".into(),
                ));
            }
            let previous = std::mem::replace(&mut state.owner, new_owner);
            tracing::info!("Ownership transferred from {} to {}", previous, new_owner);
            state.journal.record(FarmEvent::OwnershipTransferred {
                previous,
                new_owner,
            });
            Ok(())
        })
    }

    // === Queries ===

    pub fn owner(&self) -> Result<Address> {
        self.query(|state, _| Ok(state.owner))
    }

    pub fn pending_reward(&self, owner: Address, index: usize) -> Result<Amount> {
        self.query(|state, now| state.ledger.pending_reward(&state.pool, &owner, index, now))
    }

    pub fn position(&self, owner: Address, index: usize) -> Result<StakePosition> {
        self.query(|state, _| state.ledger.position(&owner, index).cloned())
    }

    pub fn deposited_amount(&self, owner: Address, index: usize) -> Result<Amount> {
        self.query(|state, _| Ok(state.ledger.position(&owner, index)?.principal))
    }

    pub fn deposit_timestamp(&self, owner: Address, index: usize) -> Result<Timestamp> {
        self.query(|state, _| Ok(state.ledger.position(&owner, index)?.deposit_time))
    }

    pub fn withdraw_timestamp(&self, owner: Address, index: usize) -> Result<Timestamp> {
        self.query(|state, _| Ok(state.ledger.position(&owner, index)?.withdraw_time))
    }

    /// Open with its lock expired
    pub fn is_withdrawable(&self, owner: Address, index: usize) -> Result<bool> {
        self.query(|state, now| {
            let position = state.ledger.position(&owner, index)?;
            Ok(position.is_open() && position.lock_respected(now))
        })
    }

    pub fn seconds_until_withdrawable(&self, owner: Address, index: usize) -> Result<u64> {
        self.query(|state, now| {
            let position = state.ledger.position(&owner, index)?;
            if !position.is_open() {
                return Ok(0);
            }
            Ok(position.seconds_until_unlock(now))
        })
    }

    pub fn position_count(&self, owner: Address) -> Result<usize> {
        self.query(|state, _| Ok(state.ledger.positions(&owner).len()))
    }

    pub fn positions_of(&self, owner: Address) -> Result<PositionBatch> {
        self.query(|state, now| state.ledger.batch(&state.pool, &owner, now))
    }

    pub fn participants(&self) -> Result<Vec<Address>> {
        self.query(|state, _| Ok(state.ledger.registry().as_slice().to_vec()))
    }

    pub fn participant_count(&self) -> Result<usize> {
        self.query(|state, _| Ok(state.ledger.registry().len()))
    }

    pub fn pool_snapshot(&self) -> Result<PoolSnapshot> {
        self.query(|state, _| Ok(state.pool.snapshot()))
    }

    pub fn total_principal_deposited(&self) -> Result<Amount> {
        self.query(|state, _| Ok(state.pool.total_principal_deposited))
    }

    pub fn total_reward_generated(&self) -> Result<Amount> {
        self.query(|state, _| Ok(state.pool.total_reward_generated))
    }

    pub fn total_secondary_reward_generated(&self) -> Result<Amount> {
        self.query(|state, _| Ok(state.pool.total_secondary_reward_generated))
    }

    /// Sum of shares over open positions, recomputed from the ledger
    pub fn ledger_open_shares(&self) -> Result<Shares> {
        self.query(|state, _| Ok(state.ledger.total_open_shares()))
    }

    pub fn registry_is_consistent(&self) -> Result<bool> {
        self.query(|state, _| {
            let registry = state.ledger.registry();
            let holders = registry
                .iter()
                .all(|owner| state.ledger.aggregate_principal(owner) > 0);
            Ok(registry.is_consistent() && holders)
        })
    }

    /// Hand the recorded events to the caller
    pub fn drain_events(&self) -> Result<Vec<FarmEvent>> {
        let mut state = self
            .state
            .try_lock()
            .ok_or(FarmError::ReentrancyRejected)?;
        Ok(state.journal.drain())
    }
}
