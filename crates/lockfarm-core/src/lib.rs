//! # Lockfarm Core
//!
//! Building blocks shared by the Lockfarm staking engine and its tooling:
//! - `Address` / `AssetId` - account and asset identities
//! - `Clock` - host time oracle
//! - `AssetTransferPort` - token movement capability, with an in-memory ledger
//! - `ParticipantRegistry` - O(1) membership set with swap-remove
//! - `FarmError` - the error vocabulary of every farm call

pub mod asset;
pub mod clock;
pub mod error;
pub mod registry;
pub mod types;

pub use asset::*;
pub use clock::*;
pub use error::*;
pub use registry::*;
pub use types::*;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::asset::{AssetTransferPort, MemoryAsset};
    pub use crate::clock::{Clock, ManualClock, SystemClock};
    pub use crate::error::{FarmError, Result, TransferError};
    pub use crate::registry::ParticipantRegistry;
    pub use crate::types::*;
}
