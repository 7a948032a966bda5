//! Core type definitions for Lockfarm
//!
//! Amounts are plain integers in the smallest unit of their asset. Shares are
//! a distinct unit (principal plus lock bonus) but share the same width so the
//! accumulator arithmetic can mix them without conversions.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Token quantity in the asset's smallest unit
pub type Amount = u128;

/// Claim units on the reward accumulator
pub type Shares = u128;

/// Seconds since the Unix epoch, as reported by the host clock
pub type Timestamp = u64;

/// Account identity (owner, custody account, fee collector, burn sink)
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address {
    bytes: [u8; 32],
}

impl Address {
    /// Null address
    pub const ZERO: Self = Self { bytes: [0u8; 32] };

    /// Sink that burned rewards are sent to
    pub const BURN: Self = Self {
        bytes: [
            0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
            0, 0, 0xde, 0xad,
        ],
    };

    pub fn new(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    /// Address whose last eight bytes hold `value` big-endian. Used for test
    /// fixtures and scenario scripts.
    pub fn from_low_u64(value: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&value.to_be_bytes());
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    pub fn is_zero(&self) -> bool {
        self.bytes == [0u8; 32]
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Parse from a hex string, with or without `0x` prefix. Shorter inputs are
    /// left-padded with zeros.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let trimmed = s.strip_prefix("0x").unwrap_or(s);
        if trimmed.len() > 64 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let padded = format!("{:0>64}", trimmed);
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(padded, &mut bytes)?;
        Ok(Self { bytes })
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", &self.to_hex()[48..])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", &self.to_hex()[48..])
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Identity of a fungible asset (staked, reward, secondary reward)
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(pub Address);

impl AssetId {
    pub const NULL: Self = Self(Address::ZERO);

    pub fn is_null(&self) -> bool {
        self.0.is_zero()
    }
}

impl fmt::Debug for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetId({})", &self.0.to_hex()[48..])
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_hex_roundtrip_with_padding() {
        let addr = Address::from_hex("0xdead").unwrap();
        assert_eq!(addr, Address::BURN);
        assert_eq!(Address::from_hex(&addr.to_hex()).unwrap(), addr);
    }

    #[test]
    fn test_address_rejects_oversized_hex() {
        let long = "ab".repeat(33);
        assert!(Address::from_hex(&long).is_err());
    }

    #[test]
    fn test_from_low_u64() {
        let addr = Address::from_low_u64(0x0102);
        assert_eq!(addr.as_bytes()[30], 0x01);
        assert_eq!(addr.as_bytes()[31], 0x02);
        assert!(!addr.is_zero());
        assert!(Address::ZERO.is_zero());
    }
}
