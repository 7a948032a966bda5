//! Farm event journal
//!
//! Committed transitions append one or more events. Events of a failed call
//! are never recorded.

use crate::penalty::PenaltyKind;
use lockfarm_core::{Address, Amount, AssetId, Shares, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FarmEvent {
    Funded {
        funder: Address,
        amount: Amount,
        end_time: Timestamp,
    },
    Deposited {
        owner: Address,
        index: usize,
        principal: Amount,
        shares: Shares,
    },
    Withdrawn {
        owner: Address,
        index: usize,
        principal: Amount,
    },
    EmergencyWithdrawn {
        owner: Address,
        index: usize,
        principal: Amount,
    },
    RewardPaid {
        owner: Address,
        index: usize,
        amount: Amount,
        fee: Amount,
        secondary: Amount,
    },
    RewardBurned {
        owner: Address,
        index: usize,
        amount: Amount,
    },
    RewardRedistributed {
        owner: Address,
        index: usize,
        amount: Amount,
        end_time: Timestamp,
    },
    FeesCollected {
        collector: Address,
        amount: Amount,
    },
    TokensRecovered {
        asset: AssetId,
        to: Address,
        amount: Amount,
    },
    ConfigUpdated {
        setting: String,
        value: String,
    },
    OwnershipTransferred {
        previous: Address,
        new_owner: Address,
    },
}

impl FarmEvent {
    pub fn config_updated(setting: &str, value: impl ToString) -> Self {
        Self::ConfigUpdated {
            setting: setting.to_string(),
            value: value.to_string(),
        }
    }

    pub fn penalty_updated(penalty: PenaltyKind) -> Self {
        Self::config_updated("penalty", penalty)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Funded { .. } => "funded",
            Self::Deposited { .. } => "deposited",
            Self::Withdrawn { .. } => "withdrawn",
            Self::EmergencyWithdrawn { .. } => "emergency_withdrawn",
            Self::RewardPaid { .. } => "reward_paid",
            Self::RewardBurned { .. } => "reward_burned",
            Self::RewardRedistributed { .. } => "reward_redistributed",
            Self::FeesCollected { .. } => "fees_collected",
            Self::TokensRecovered { .. } => "tokens_recovered",
            Self::ConfigUpdated { .. } => "config_updated",
            Self::OwnershipTransferred { .. } => "ownership_transferred",
        }
    }
}

/// Append-only buffer of events awaiting the host
#[derive(Clone, Debug, Default)]
pub struct EventJournal {
    events: Vec<FarmEvent>,
}

impl EventJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: FarmEvent) {
        tracing::debug!("Event {}: {:?}", event.name(), event);
        self.events.push(event);
    }

    pub fn extend(&mut self, events: impl IntoIterator<Item = FarmEvent>) {
        for event in events {
            self.record(event);
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[FarmEvent] {
        &self.events
    }

    /// Hand over everything recorded so far
    pub fn drain(&mut self) -> Vec<FarmEvent> {
        std::mem::take(&mut self.events)
    }
}
