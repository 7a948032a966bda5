//! # Penalty Policy
//!
//! Disposition of a position's pending reward at withdrawal time.
//!
//! | Lock | NoPenalty | BurnRewards | RedistributeRewards |
//! |------|-----------|-------------|---------------------|
//! | respected | pay owner | pay owner | pay owner |
//! | violated | pay owner | burn | re-fund pool while open, else burn |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Policy applied to reward of positions withdrawn before their lock expired
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PenaltyKind {
    /// Early withdrawals keep their reward
    #[default]
    NoPenalty,
    /// Early withdrawal reward is sent to the burn sink
    BurnRewards,
    /// Early withdrawal reward goes back into the emission pool
    RedistributeRewards,
}

/// Where a pending reward ends up
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardDisposition {
    PayOwner,
    Burn,
    Redistribute,
}

impl PenaltyKind {
    /// Decide the disposition of a nonzero pending reward
    pub fn resolve(&self, lock_respected: bool, farm_open: bool) -> RewardDisposition {
        if lock_respected {
            return RewardDisposition::PayOwner;
        }
        match self {
            Self::NoPenalty => RewardDisposition::PayOwner,
            Self::BurnRewards => RewardDisposition::Burn,
            Self::RedistributeRewards if farm_open => RewardDisposition::Redistribute,
            Self::RedistributeRewards => RewardDisposition::Burn,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::NoPenalty => "no_penalty",
            Self::BurnRewards => "burn_rewards",
            Self::RedistributeRewards => "redistribute_rewards",
        }
    }
}

impl fmt::Display for PenaltyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PenaltyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "no_penalty" | "none" => Ok(Self::NoPenalty),
            "burn_rewards" | "burn" => Ok(Self::BurnRewards),
            "redistribute_rewards" | "redistribute" => Ok(Self::RedistributeRewards),
            other => Err(format!("unknown penalty kind: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_respected_always_pays() {
        for kind in [
            PenaltyKind::NoPenalty,
            PenaltyKind::BurnRewards,
            PenaltyKind::RedistributeRewards,
        ] {
            assert_eq!(kind.resolve(true, true), RewardDisposition::PayOwner);
            assert_eq!(kind.resolve(true, false), RewardDisposition::PayOwner);
        }
    }

    #[test]
    fn test_lock_violated() {
        assert_eq!(
            PenaltyKind::NoPenalty.resolve(false, true),
            RewardDisposition::PayOwner
        );
        assert_eq!(
            PenaltyKind::BurnRewards.resolve(false, true),
            RewardDisposition::Burn
        );
        assert_eq!(
            PenaltyKind::RedistributeRewards.resolve(false, true),
            RewardDisposition::Redistribute
        );
        assert_eq!(
            PenaltyKind::RedistributeRewards.resolve(false, false),
            RewardDisposition::Burn
        );
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("burn".parse::<PenaltyKind>(), Ok(PenaltyKind::BurnRewards));
        assert_eq!(
            PenaltyKind::RedistributeRewards.to_string().parse::<PenaltyKind>(),
            Ok(PenaltyKind::RedistributeRewards)
        );
        assert!("slash".parse::<PenaltyKind>().is_err());
    }
}
