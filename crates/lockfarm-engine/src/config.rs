//! Farm configuration types
//!
//! Initialization parameters and initial administrative settings, loadable
//! from TOML. Every field has a default so partial files are accepted.

use crate::constants::MAX_REWARD_FEE_PERCENT;
use crate::penalty::PenaltyKind;
use lockfarm_core::{Address, Amount, FarmError, Timestamp};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors loading or saving a configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error(transparent)]
    Invalid(#[from] FarmError),
}

/// Farm initialization parameters
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FarmConfig {
    /// Reward emitted per second across all shares
    #[serde(default = "default_reward_per_second")]
    pub reward_per_second: u64,

    /// Emission start; must not be in the past at initialization
    #[serde(default)]
    pub start_time: Timestamp,

    #[serde(default)]
    pub min_lock_days: u64,

    #[serde(default = "default_max_lock_days")]
    pub max_lock_days: u64,

    /// Lock bonus percent per year of lock
    #[serde(default)]
    pub bonus_per_year: u64,

    /// Secondary reward per primary reward unit, in basis points
    #[serde(default)]
    pub secondary_reward_multiplier: u64,

    #[serde(default = "default_true")]
    pub early_withdraw_allowed: bool,

    #[serde(default)]
    pub penalty: PenaltyKind,

    /// Fee percent (0-100) taken from reward distributions
    #[serde(default)]
    pub reward_fee_percent: u8,

    #[serde(default)]
    pub fee_collector: Address,
}

fn default_reward_per_second() -> u64 {
    1
}

fn default_max_lock_days() -> u64 {
    365
}

fn default_true() -> bool {
    true
}

impl Default for FarmConfig {
    fn default() -> Self {
        Self {
            reward_per_second: default_reward_per_second(),
            start_time: 0,
            min_lock_days: 0,
            max_lock_days: default_max_lock_days(),
            bonus_per_year: 0,
            secondary_reward_multiplier: 0,
            early_withdraw_allowed: true,
            penalty: PenaltyKind::default(),
            reward_fee_percent: 0,
            fee_collector: Address::ZERO,
        }
    }
}

impl FarmConfig {
    pub fn reward_per_second(&self) -> Amount {
        self.reward_per_second as Amount
    }

    /// Check the parameters that do not depend on the clock or the ports
    pub fn validate(&self) -> Result<(), FarmError> {
        if self.reward_per_second == 0 {
            return Err(FarmError::InvalidConfiguration(
                "reward_per_second must be nonzero".into(),
            ));
        }
        if self.min_lock_days > self.max_lock_days {
            return Err(FarmError::InvalidConfiguration(format!(
                "min_lock_days {} exceeds max_lock_days {}",
                self.min_lock_days, self.max_lock_days
            )));
        }
        if self.reward_fee_percent > MAX_REWARD_FEE_PERCENT {
            return Err(FarmError::InvalidConfiguration(format!(
                "reward_fee_percent {} exceeds {}",
                self.reward_fee_percent, MAX_REWARD_FEE_PERCENT
            )));
        }
        Ok(())
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }
}
