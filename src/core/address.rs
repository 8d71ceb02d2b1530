//! Account Addresses
//!
//! 20-byte account address as used by the game contract.
//! Serialized as `0x`-prefixed lowercase hex so indexer payloads parse directly.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Byte length of an address.
pub const ADDRESS_LEN: usize = 20;

/// Account or contract address.
///
/// Implements Ord so it can key a BTreeMap deterministically.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(pub [u8; ADDRESS_LEN]);

/// Address parsing errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// Not valid hex.
    #[error("invalid hex in address: {0}")]
    InvalidHex(String),
    /// Wrong number of bytes.
    #[error("address must be 20 bytes, got {0}")]
    InvalidLength(usize),
}

impl Address {
    /// The zero address (no creator / unset).
    pub const ZERO: Address = Address([0; ADDRESS_LEN]);

    /// Create from raw bytes.
    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Create from a byte slice, rejecting any other length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, AddressError> {
        let arr: [u8; ADDRESS_LEN] = bytes
            .try_into()
            .map_err(|_| AddressError::InvalidLength(bytes.len()))?;
        Ok(Self(arr))
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// True for the zero address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0; ADDRESS_LEN]
    }

    /// Short form for log lines (`0x1234…abcd`).
    pub fn short(&self) -> String {
        format!("0x{}…{}", hex::encode(&self.0[..2]), hex::encode(&self.0[18..]))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stripped = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        let bytes = hex::decode(stripped).map_err(|e| AddressError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
