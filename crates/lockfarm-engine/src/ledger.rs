//! # Stake Position Ledger
//!
//! Per-owner append-only position collections plus the participant registry,
//! and the deposit / withdraw / emergency-withdraw transitions.
//!
//! Each transition works on a staged copy of the pool. An outbound transfer
//! cannot be taken back, so nothing is staged past one: a withdrawal settles
//! and commits its reward before the principal moves, and a principal leg
//! refused afterwards leaves an open position with nothing left to claim.

use crate::accumulator::RewardAccumulator;
use crate::constants::SECONDARY_MULTIPLIER_DENOMINATOR;
use crate::penalty::RewardDisposition;
use crate::pool::Pool;
use crate::position::StakePosition;
use crate::treasury::FeeSplit;
use lockfarm_core::{
    Address, Amount, AssetId, AssetTransferPort, FarmError, ParticipantRegistry, Result, Shares,
    Timestamp,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Asset ports a farm moves tokens through
#[derive(Clone)]
pub struct AssetPorts {
    pub staked: Arc<dyn AssetTransferPort>,
    pub reward: Arc<dyn AssetTransferPort>,
    pub secondary: Option<Arc<dyn AssetTransferPort>>,
}

/// Outcome of a committed deposit
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositReceipt {
    pub owner: Address,
    /// `None` when the transfer credited nothing and no position was opened
    pub index: Option<usize>,
    pub requested: Amount,
    pub principal: Amount,
    pub shares: Shares,
    pub lock_days: u64,
}

/// Outcome of a committed withdrawal
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawReceipt {
    pub owner: Address,
    pub index: usize,
    pub principal: Amount,
    pub shares: Shares,
    pub lock_respected: bool,
    /// Reward accrued by the position at withdrawal
    pub pending: Amount,
    /// `None` when nothing was pending
    pub disposition: Option<RewardDisposition>,
    /// Fee retained from a payout or burn
    pub fee: Amount,
    /// Reward that reached the owner (or the burn sink)
    pub net: Amount,
    pub secondary: Amount,
    /// Horizon extension from a re-fund, in seconds
    pub horizon_extension: u64,
    pub left_registry: bool,
}

/// Reward side of a withdrawal, committed before the principal is released
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RewardSettlement {
    pub owner: Address,
    pub index: usize,
    pub lock_respected: bool,
    /// Reward settled by the position, capped at the outstanding liability
    pub pending: Amount,
    pub disposition: Option<RewardDisposition>,
    pub fee: Amount,
    pub net: Amount,
    /// Secondary reward that reached the owner
    pub secondary: Amount,
    pub horizon_extension: u64,
    /// Refusal of the secondary leg after the primary reward was committed
    pub secondary_error: Option<FarmError>,
}

/// Outcome of a committed emergency withdrawal
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyWithdrawReceipt {
    pub owner: Address,
    pub index: usize,
    pub principal: Amount,
    pub forfeited_shares: Shares,
    pub left_registry: bool,
}

/// Per-position columns for one owner, index-aligned
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionBatch {
    pub amounts: Vec<Amount>,
    pub shares: Vec<Shares>,
    pub deposit_times: Vec<Timestamp>,
    pub withdraw_times: Vec<Timestamp>,
    pub locked_days: Vec<u64>,
    pub pending_rewards: Vec<Amount>,
    pub withdrawable: Vec<bool>,
}

fn add(a: Amount, b: Amount) -> Result<Amount> {
    a.checked_add(b).ok_or(FarmError::ArithmeticOverflow)
}

fn sub(a: Amount, b: Amount) -> Result<Amount> {
    a.checked_sub(b).ok_or(FarmError::ArithmeticOverflow)
}

fn ensure_covered(port: &dyn AssetTransferPort, custody: Address, needed: Amount) -> Result<()> {
    let available = port.balance_of(custody);
    if available < needed {
        return Err(FarmError::InsufficientFunds { needed, available });
    }
    Ok(())
}

/// Check custody against every outbound leg, summing legs of the same asset
fn ensure_legs_covered(
    custody: Address,
    legs: &[(AssetId, &dyn AssetTransferPort, Amount)],
) -> Result<()> {
    for (i, (asset, port, _)) in legs.iter().enumerate() {
        if legs[..i].iter().any(|(seen, _, _)| seen == asset) {
            continue;
        }
        let needed = legs
            .iter()
            .filter(|(other, _, _)| other == asset)
            .try_fold(0, |acc, (_, _, amount)| add(acc, *amount))?;
        ensure_covered(*port, custody, needed)?;
    }
    Ok(())
}

/// Owner → positions, plus the set of owners with nonzero aggregate principal
#[derive(Clone, Debug, Default)]
pub struct StakePositionLedger {
    positions: HashMap<Address, Vec<StakePosition>>,
    registry: ParticipantRegistry<Address>,
}

impl StakePositionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn positions(&self, owner: &Address) -> &[StakePosition] {
        self.positions.get(owner).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn position(&self, owner: &Address, index: usize) -> Result<&StakePosition> {
        self.positions(owner)
            .get(index)
            .ok_or(FarmError::PositionNotFound {
                owner: *owner,
                index,
            })
    }

    pub fn registry(&self) -> &ParticipantRegistry<Address> {
        &self.registry
    }

    /// Principal summed over the owner's positions
    pub fn aggregate_principal(&self, owner: &Address) -> Amount {
        self.positions(owner)
            .iter()
            .fold(0, |acc, p| acc.saturating_add(p.principal))
    }

    /// Shares summed over every position in the ledger
    pub fn total_open_shares(&self) -> Shares {
        self.positions
            .values()
            .flatten()
            .filter(|p| p.principal > 0)
            .fold(0, |acc, p| acc.saturating_add(p.shares))
    }

    fn open_position(&self, owner: &Address, index: usize) -> Result<StakePosition> {
        let position = self.position(owner, index)?;
        if !position.is_open() {
            return Err(FarmError::PositionClosed {
                owner: *owner,
                index,
            });
        }
        Ok(position.clone())
    }

    fn close_position(&mut self, owner: &Address, index: usize, now: Timestamp) -> bool {
        if let Some(position) = self.positions.get_mut(owner).and_then(|v| v.get_mut(index)) {
            position.close(now);
        }
        if self.aggregate_principal(owner) == 0 {
            return self.registry.remove(owner);
        }
        false
    }

    fn check_lock(pool: &Pool, position: &StakePosition, now: Timestamp) -> Result<bool> {
        let lock_respected = position.lock_respected(now);
        if !pool.early_withdraw_allowed && !lock_respected {
            return Err(FarmError::TooEarly {
                unlocks_at: position.unlocks_at(),
            });
        }
        Ok(lock_respected)
    }

    /// Lock `requested` of the staked asset for `lock_days`
    pub fn deposit(
        &mut self,
        pool: &mut Pool,
        ports: &AssetPorts,
        owner: Address,
        requested: Amount,
        lock_days: u64,
        now: Timestamp,
    ) -> Result<DepositReceipt> {
        if pool.is_closed(now) {
            return Err(FarmError::FarmClosed);
        }
        pool.check_lock_days(lock_days)?;
        if requested == 0 {
            return Err(FarmError::ZeroAmount);
        }

        let mut staged = pool.clone();
        staged.accumulator.accrue(now, staged.total_shares)?;

        // Bounds at the requested amount hold for anything smaller credited
        let calculator = staged.share_calculator();
        let max_shares = calculator.shares(requested, lock_days)?;
        add(staged.total_shares, max_shares)?;
        add(staged.total_deposits, requested)?;
        add(staged.total_principal_deposited, requested)?;
        RewardAccumulator::owed(max_shares, staged.accumulator.acc_reward_per_share)?;

        let before = ports.staked.balance_of(staged.custody);
        ports.staked.transfer_from(owner, staged.custody, requested)?;
        let after = ports.staked.balance_of(staged.custody);
        let principal = after.saturating_sub(before).min(requested);
        if principal < requested {
            tracing::warn!(
                "Deposit by {} credited {} of {} requested",
                owner,
                principal,
                requested
            );
        }
        if principal == 0 {
            // The transfer went through; only the accrual is left to commit
            *pool = staged;
            return Ok(DepositReceipt {
                owner,
                index: None,
                requested,
                principal,
                shares: 0,
                lock_days,
            });
        }

        let shares = calculator.shares(principal, lock_days)?;
        staged.total_shares = add(staged.total_shares, shares)?;
        staged.total_deposits = add(staged.total_deposits, principal)?;
        staged.total_principal_deposited = add(staged.total_principal_deposited, principal)?;
        let reward_debt = RewardAccumulator::owed(shares, staged.accumulator.acc_reward_per_share)?;

        *pool = staged;
        if self.aggregate_principal(&owner) == 0 {
            self.registry.insert(owner);
        }
        let owned = self.positions.entry(owner).or_default();
        owned.push(StakePosition {
            owner,
            principal,
            shares,
            reward_debt,
            deposit_time: now,
            withdraw_time: 0,
            locked_days: lock_days,
        });
        let index = owned.len() - 1;

        tracing::info!(
            "Deposit {}#{}: {} principal, {} shares, locked {} days",
            owner,
            index,
            principal,
            shares,
            lock_days
        );

        Ok(DepositReceipt {
            owner,
            index: Some(index),
            requested,
            principal,
            shares,
            lock_days,
        })
    }

    /// Reward the position could claim at `now`, without mutating anything
    pub fn pending_reward(
        &self,
        pool: &Pool,
        owner: &Address,
        index: usize,
        now: Timestamp,
    ) -> Result<Amount> {
        let position = self.position(owner, index)?;
        if position.shares == 0 {
            return Ok(0);
        }
        let acc = pool.accumulator.preview(now, pool.total_shares)?;
        position.pending(acc)
    }

    /// First phase of a withdrawal: settle the position's reward through the
    /// penalty policy and fee treasury, and commit it.
    ///
    /// Custody is checked against every leg of the withdrawal, principal
    /// included, before anything moves. Once this returns the position owes
    /// nothing, so a retried withdrawal only releases the principal.
    pub fn settle_reward(
        &mut self,
        pool: &mut Pool,
        ports: &AssetPorts,
        owner: Address,
        index: usize,
        now: Timestamp,
    ) -> Result<RewardSettlement> {
        let position = self.open_position(&owner, index)?;

        let mut staged = pool.clone();
        staged.accumulator.accrue(now, staged.total_shares)?;
        let acc = staged.accumulator.acc_reward_per_share;
        let lock_respected = Self::check_lock(&staged, &position, now)?;

        // Floored debts let the last claims overrun the liability by a few units
        let accrued = position.pending(acc)?;
        let pending = accrued.min(staged.total_rewards);
        if pending < accrued {
            tracing::debug!(
                "Capped reward of {}#{} at outstanding {} (accrued {})",
                owner,
                index,
                pending,
                accrued
            );
        }
        let farm_open = now < staged.accumulator.end_time;
        let disposition =
            (pending > 0).then(|| staged.penalty.resolve(lock_respected, farm_open));

        let planned = match disposition {
            Some(RewardDisposition::PayOwner) | Some(RewardDisposition::Burn) => {
                staged.treasury.split(pending)
            }
            _ => FeeSplit::default(),
        };
        let secondary = match (disposition, &ports.secondary) {
            (Some(RewardDisposition::PayOwner), Some(_)) if staged.secondary_reward_multiplier > 0 => {
                pending
                    .checked_mul(staged.secondary_reward_multiplier as u128)
                    .ok_or(FarmError::ArithmeticOverflow)?
                    / SECONDARY_MULTIPLIER_DENOMINATOR
            }
            _ => 0,
        };

        let mut legs: Vec<(AssetId, &dyn AssetTransferPort, Amount)> = vec![
            (staged.reward_asset, ports.reward.as_ref(), planned.net),
            (staged.staked_asset, ports.staked.as_ref(), position.principal),
        ];
        if let (Some(asset), Some(port)) = (staged.secondary_asset, &ports.secondary) {
            legs.push((asset, port.as_ref(), secondary));
        }
        ensure_legs_covered(staged.custody, &legs)?;
        let secondary_generated = add(staged.total_secondary_reward_generated, secondary)?;

        let mut split = FeeSplit::default();
        let mut horizon_extension = 0;
        match disposition {
            Some(RewardDisposition::PayOwner) => {
                staged.total_rewards = sub(staged.total_rewards, pending)?;
                staged.total_reward_generated = add(staged.total_reward_generated, pending)?;
                split = staged.treasury.distribute(
                    ports.reward.as_ref(),
                    staged.custody,
                    owner,
                    pending,
                )?;
            }
            Some(RewardDisposition::Burn) => {
                tracing::warn!(
                    "Burning {} reward of {}#{} withdrawn before lock expiry",
                    pending,
                    owner,
                    index
                );
                staged.total_rewards = sub(staged.total_rewards, pending)?;
                staged.total_tokens_burned = add(staged.total_tokens_burned, pending)?;
                split = staged.treasury.distribute(
                    ports.reward.as_ref(),
                    staged.custody,
                    Address::BURN,
                    pending,
                )?;
            }
            Some(RewardDisposition::Redistribute) => {
                tracing::warn!(
                    "Redistributing {} reward of {}#{} withdrawn before lock expiry",
                    pending,
                    owner,
                    index
                );
                horizon_extension = staged.accumulator.extend(pending)?;
            }
            None => {}
        }

        let reward_debt = RewardAccumulator::owed(position.shares, acc)?;
        *pool = staged;
        if let Some(open) = self.positions.get_mut(&owner).and_then(|v| v.get_mut(index)) {
            open.reward_debt = reward_debt;
        }

        let mut paid_secondary = 0;
        let mut secondary_error = None;
        if let (Some(port), true) = (&ports.secondary, secondary > 0) {
            match port.transfer(pool.custody, owner, secondary) {
                Ok(()) => {
                    pool.total_secondary_reward_generated = secondary_generated;
                    paid_secondary = secondary;
                }
                Err(e) => {
                    tracing::warn!(
                        "Secondary reward of {}#{} refused after settlement: {}",
                        owner,
                        index,
                        e
                    );
                    secondary_error = Some(FarmError::from(e));
                }
            }
        }

        Ok(RewardSettlement {
            owner,
            index,
            lock_respected,
            pending,
            disposition,
            fee: split.fee,
            net: split.net,
            secondary: paid_secondary,
            horizon_extension,
            secondary_error,
        })
    }

    /// Second phase of a withdrawal: return the principal and close the
    /// position settled by `settlement`.
    pub fn release_principal(
        &mut self,
        pool: &mut Pool,
        ports: &AssetPorts,
        settlement: RewardSettlement,
        now: Timestamp,
    ) -> Result<WithdrawReceipt> {
        let RewardSettlement {
            owner,
            index,
            lock_respected,
            pending,
            disposition,
            fee,
            net,
            secondary,
            horizon_extension,
            ..
        } = settlement;
        let position = self.open_position(&owner, index)?;
        let left_registry = self.release(pool, ports, &position, index, now)?;

        tracing::info!(
            "Withdraw {}#{}: {} principal, {} reward ({:?})",
            owner,
            index,
            position.principal,
            pending,
            disposition
        );

        Ok(WithdrawReceipt {
            owner,
            index,
            principal: position.principal,
            shares: position.shares,
            lock_respected,
            pending,
            disposition,
            fee,
            net,
            secondary,
            horizon_extension,
            left_registry,
        })
    }

    /// Return the principal and forfeit all pending reward. Touches neither
    /// the accumulator nor the reward asset.
    pub fn emergency_withdraw(
        &mut self,
        pool: &mut Pool,
        ports: &AssetPorts,
        owner: Address,
        index: usize,
        now: Timestamp,
    ) -> Result<EmergencyWithdrawReceipt> {
        let position = self.open_position(&owner, index)?;
        Self::check_lock(pool, &position, now)?;
        let left_registry = self.release(pool, ports, &position, index, now)?;

        tracing::warn!(
            "Emergency withdraw {}#{}: {} principal returned, {} shares forfeited their reward",
            owner,
            index,
            position.principal,
            position.shares
        );

        Ok(EmergencyWithdrawReceipt {
            owner,
            index,
            principal: position.principal,
            forfeited_shares: position.shares,
            left_registry,
        })
    }

    fn release(
        &mut self,
        pool: &mut Pool,
        ports: &AssetPorts,
        position: &StakePosition,
        index: usize,
        now: Timestamp,
    ) -> Result<bool> {
        ensure_covered(ports.staked.as_ref(), pool.custody, position.principal)?;
        let total_shares = sub(pool.total_shares, position.shares)?;
        let total_deposits = sub(pool.total_deposits, position.principal)?;
        ports
            .staked
            .transfer(pool.custody, position.owner, position.principal)?;

        pool.total_shares = total_shares;
        pool.total_deposits = total_deposits;
        Ok(self.close_position(&position.owner, index, now))
    }

    /// Column view over all of `owner`'s positions
    pub fn batch(&self, pool: &Pool, owner: &Address, now: Timestamp) -> Result<PositionBatch> {
        let positions = self.positions(owner);
        let acc = pool.accumulator.preview(now, pool.total_shares)?;
        let mut batch = PositionBatch::default();
        for position in positions {
            batch.amounts.push(position.principal);
            batch.shares.push(position.shares);
            batch.deposit_times.push(position.deposit_time);
            batch.withdraw_times.push(position.withdraw_time);
            batch.locked_days.push(position.locked_days);
            batch.pending_rewards.push(position.pending(acc)?);
            batch
                .withdrawable
                .push(position.is_open() && position.lock_respected(now));
        }
        Ok(batch)
    }
}
