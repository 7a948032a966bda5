//! Asset transfer capability
//!
//! The farm moves tokens only through an `AssetTransferPort`. Ports may charge
//! transfer fees, so callers measure what actually arrived by comparing
//! `balance_of` before and after a movement.

use crate::error::TransferError;
use crate::types::{Address, Amount, AssetId};
use std::collections::HashMap;
use std::sync::Arc;

/// Basis points denominator used for transfer fees
pub const TRANSFER_FEE_DENOMINATOR: Amount = 10_000;

/// Token movement capability for a single asset
pub trait AssetTransferPort: Send + Sync {
    /// Identity of the asset this port moves
    fn asset_id(&self) -> AssetId;

    /// Pull `amount` from `from` into `to` (requires the owner's approval on
    /// real assets). The credited amount may be lower than requested.
    fn transfer_from(&self, from: Address, to: Address, amount: Amount) -> Result<(), TransferError>;

    /// Push `amount` from an account the caller controls to `to`
    fn transfer(&self, from: Address, to: Address, amount: Amount) -> Result<(), TransferError>;

    /// Current balance of `account`
    fn balance_of(&self, account: Address) -> Amount;
}

type TransferHook = Arc<dyn Fn(Address, Address, Amount) + Send + Sync>;

struct MemoryAssetState {
    balances: HashMap<Address, Amount>,
    fee_bps: Amount,
    frozen: Option<String>,
    hook: Option<TransferHook>,
}

/// In-memory asset ledger with optional fee-on-transfer, freezing and a
/// callback fired in the middle of every movement.
pub struct MemoryAsset {
    id: AssetId,
    state: parking_lot::Mutex<MemoryAssetState>,
}

impl MemoryAsset {
    pub fn new(id: AssetId) -> Self {
        Self {
            id,
            state: parking_lot::Mutex::new(MemoryAssetState {
                balances: HashMap::new(),
                fee_bps: 0,
                frozen: None,
                hook: None,
            }),
        }
    }

    /// Credit `amount` to `account` out of thin air
    pub fn mint(&self, account: Address, amount: Amount) {
        let mut state = self.state.lock();
        let balance = state.balances.entry(account).or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    /// Charge `fee_bps` basis points on every movement; the fee is destroyed
    pub fn set_transfer_fee_bps(&self, fee_bps: Amount) {
        self.state.lock().fee_bps = fee_bps.min(TRANSFER_FEE_DENOMINATOR);
    }

    /// Reject every movement with `reason` until `unfreeze`
    pub fn freeze(&self, reason: impl Into<String>) {
        self.state.lock().frozen = Some(reason.into());
    }

    pub fn unfreeze(&self) {
        self.state.lock().frozen = None;
    }

    /// Install a callback run after the debit and before the credit of every
    /// movement. The asset's own lock is not held while it runs.
    pub fn set_hook<F>(&self, hook: F)
    where
        F: Fn(Address, Address, Amount) + Send + Sync + 'static,
    {
        self.state.lock().hook = Some(Arc::new(hook));
    }

    pub fn total_supply(&self) -> Amount {
        self.state.lock().balances.values().sum()
    }

    fn move_funds(&self, from: Address, to: Address, amount: Amount) -> Result<(), TransferError> {
        let (credited, hook) = {
            let mut state = self.state.lock();
            if let Some(reason) = &state.frozen {
                return Err(TransferError::Rejected(reason.clone()));
            }
            let available = state.balances.get(&from).copied().unwrap_or(0);
            if available < amount {
                return Err(TransferError::InsufficientBalance {
                    account: from,
                    available,
                    needed: amount,
                });
            }
            state.balances.insert(from, available - amount);
            let fee = amount / TRANSFER_FEE_DENOMINATOR * state.fee_bps
                + amount % TRANSFER_FEE_DENOMINATOR * state.fee_bps / TRANSFER_FEE_DENOMINATOR;
            (amount - fee, state.hook.clone())
        };

        if let Some(hook) = hook {
            hook(from, to, amount);
        }

        let mut state = self.state.lock();
        let balance = state.balances.entry(to).or_insert(0);
        *balance = balance.saturating_add(credited);
        Ok(())
    }
}

impl AssetTransferPort for MemoryAsset {
    fn asset_id(&self) -> AssetId {
        self.id
    }

    fn transfer_from(&self, from: Address, to: Address, amount: Amount) -> Result<(), TransferError> {
        self.move_funds(from, to, amount)
    }

    fn transfer(&self, from: Address, to: Address, amount: Amount) -> Result<(), TransferError> {
        self.move_funds(from, to, amount)
    }

    fn balance_of(&self, account: Address) -> Amount {
        self.state.lock().balances.get(&account).copied().unwrap_or(0)
    }
}
