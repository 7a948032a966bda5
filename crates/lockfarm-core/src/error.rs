//! Error types for Lockfarm operations
//!
//! Every error rejects the whole call: no state change of a failed call is
//! ever committed.

use crate::types::{Address, Amount, Timestamp};
use thiserror::Error;

/// Result type alias for Lockfarm operations
pub type Result<T> = std::result::Result<T, FarmError>;

/// Errors reported by an asset port when it refuses a movement
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("Insufficient balance: {account} holds {available}, needs {needed}")]
    InsufficientBalance {
        account: Address,
        available: Amount,
        needed: Amount,
    },

    #[error("Transfer rejected by asset: {0}")]
    Rejected(String),
}

/// Errors that can occur in farm operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FarmError {
    // === Configuration ===
    /// Bad initialization or setter argument
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Caller is not the farm owner
    #[error("Unauthorized: caller is not the farm owner")]
    Unauthorized,

    // === Lifecycle ===
    /// Deposit or funding at or after the funding horizon
    #[error("Farm is closed")]
    FarmClosed,

    /// Requested lock outside the configured range
    #[error("Lock duration {requested} days outside allowed range [{min}, {max}]")]
    LockDurationOutOfRange { requested: u64, min: u64, max: u64 },

    /// Index beyond the owner's position count
    #[error("Position {index} not found for {owner}")]
    PositionNotFound { owner: Address, index: usize },

    /// Position has already been withdrawn
    #[error("Position {index} of {owner} is already closed")]
    PositionClosed { owner: Address, index: usize },

    /// Withdrawal before lock expiry while early withdrawal is disabled
    #[error("Position is locked until {unlocks_at}")]
    TooEarly { unlocks_at: Timestamp },

    /// Zero amount for deposit or funding
    #[error("Amount must be greater than zero")]
    ZeroAmount,

    // === Execution ===
    /// A state-mutating entry point was entered while another was executing
    #[error("Re-entrant call rejected")]
    ReentrancyRejected,

    /// Asset port refused a movement
    #[error("Transfer failed: {0}")]
    Transfer(#[from] TransferError),

    /// Custody does not hold enough to cover the outbound transfers
    #[error("Insufficient funds in custody: need {needed}, have {available}")]
    InsufficientFunds { needed: Amount, available: Amount },

    /// Sweep attempted on the staked asset
    #[error("Staked asset cannot be recovered")]
    ProtectedAsset,

    /// Checked arithmetic overflowed
    #[error("Arithmetic overflow")]
    ArithmeticOverflow,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_error_converts() {
        let err: FarmError = TransferError::Rejected("paused".into()).into();
        assert!(matches!(err, FarmError::Transfer(TransferError::Rejected(_))));
        assert_eq!(err.to_string(), "Transfer failed: Transfer rejected by asset: paused");
    }

    #[test]
    fn test_lock_range_message() {
        let err = FarmError::LockDurationOutOfRange {
            requested: 400,
            min: 0,
            max: 365,
        };
        assert_eq!(
            err.to_string(),
            "Lock duration 400 days outside allowed range [0, 365]"
        );
    }
}
