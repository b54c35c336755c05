//! Core type definitions for DutchLend

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::errors::Error;

/// Account or asset contract address (20 bytes, rendered as 0x-prefixed hex)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The zero address, used as the "unset" marker for lenders and treasuries
    pub const ZERO: Address = Address([0u8; 20]);

    pub fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Build an address whose low 8 bytes hold `n` (big-endian).
    ///
    /// Handy for fixtures and config defaults: `from_low_u64(1)` is
    /// `0x0000000000000000000000000000000000000001`.
    pub fn from_low_u64(n: u64) -> Self {
        let mut bytes = [0u8; 20];
        bytes[12..].copy_from_slice(&n.to_be_bytes());
        Self(bytes)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Lowercase 0x-prefixed hex
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped)
            .map_err(|e| Error::InvalidAddress(format!("{}: {}", s, e)))?;
        let bytes: [u8; 20] = bytes.try_into().map_err(|v: Vec<u8>| {
            Error::InvalidAddress(format!("{}: expected 20 bytes, got {}", s, v.len()))
        })?;
        Ok(Self(bytes))
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
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Kind of asset backing a collateral or registered in the escrow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    /// Quantity-denominated, units are interchangeable
    Fungible,
    /// Each unit individually identified
    Unique,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fungible => "fungible",
            Self::Unique => "unique",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Token amount or unique token identifier
pub type Amount = u128;

/// Unix timestamp in seconds
pub type Timestamp = u64;

/// Integer units of 1/10000
pub type BasisPoints = u16;

/// Constants
pub mod constants {
    use super::Timestamp;

    /// Basis-point denominator
    pub const BASIS_POINTS_DENOM: u128 = 10_000;

    /// Seconds in a day
    pub const SECONDS_PER_DAY: Timestamp = 86_400;

    /// Days in a year used for interest proration
    pub const DAYS_PER_YEAR: u128 = 365;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_hex_roundtrip() {
        let addr = Address::from_low_u64(1);
        assert_eq!(addr.to_hex(), "0x0000000000000000000000000000000000000001");
        let parsed: Address = "0x0000000000000000000000000000000000000001".parse().unwrap();
        assert_eq!(parsed, addr);
    }

    #[test]
    fn test_address_without_prefix() {
        let parsed: Address = "00000000000000000000000000000000000000ff".parse().unwrap();
        assert_eq!(parsed, Address::from_low_u64(255));
    }

    #[test]
    fn test_address_rejects_bad_input() {
        assert!("0x1234".parse::<Address>().is_err());
        assert!("0xzz00000000000000000000000000000000000000".parse::<Address>().is_err());
    }

    #[test]
    fn test_zero_address() {
        assert!(Address::ZERO.is_zero());
        assert!(!Address::from_low_u64(7).is_zero());
        assert_eq!(Address::default(), Address::ZERO);
    }

    #[test]
    fn test_address_serde_as_string() {
        let addr = Address::from_low_u64(2);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"0x0000000000000000000000000000000000000002\"");
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn test_asset_kind_display() {
        assert_eq!(AssetKind::Fungible.as_str(), "fungible");
        assert_eq!(AssetKind::Unique.to_string(), "unique");
    }
}
