//! Packed ABI Hashing
//!
//! Keccak-256 over tightly packed ABI values, matching the contract's
//! `keccak256(abi.encodePacked(...))`:
//! - `bytes32` is written as its 32 raw bytes
//! - `uint256` is written big-endian, left-padded to 32 bytes
//! - `address` is written as its 20 raw bytes
//! - `string` is written as its UTF-8 bytes, no length prefix
//! - `uint256[]` is written element by element, each padded to 32 bytes
//!
//! Order of updates is part of the encoding.

use sha3::{Digest, Keccak256};

use super::address::Address;

/// Hash output type (256 bits / 32 bytes).
pub type Hash32 = [u8; 32];

/// Incremental keccak-256 over packed ABI values.
#[derive(Clone, Default)]
pub struct AbiPacker {
    hasher: Keccak256,
    len: usize,
}

impl AbiPacker {
    /// Create an empty packer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a `bytes32` value.
    #[inline]
    pub fn bytes32(&mut self, value: &Hash32) -> &mut Self {
        self.raw(value)
    }

    /// Append a `uint256` value.
    #[inline]
    pub fn uint256(&mut self, value: u64) -> &mut Self {
        self.raw(&uint256_be(value))
    }

    /// Append an `address` value.
    #[inline]
    pub fn address(&mut self, value: &Address) -> &mut Self {
        self.raw(value.as_bytes())
    }

    /// Append a `string` value.
    #[inline]
    pub fn string(&mut self, value: &str) -> &mut Self {
        self.raw(value.as_bytes())
    }

    /// Append a `uint256[]` value.
    pub fn uint256_array<I>(&mut self, values: I) -> &mut Self
    where
        I: IntoIterator<Item = u64>,
    {
        for value in values {
            self.uint256(value);
        }
        self
    }

    /// Number of preimage bytes written so far.
    pub fn packed_len(&self) -> usize {
        self.len
    }

    /// Finalize and return the hash.
    pub fn finalize(&self) -> Hash32 {
        self.hasher.clone().finalize().into()
    }

    fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.hasher.update(bytes);
        self.len += bytes.len();
        self
    }
}

/// Keccak-256 of arbitrary data.
pub fn keccak256(data: &[u8]) -> Hash32 {
    Keccak256::digest(data).into()
}

/// Encode a u64 as a 32-byte big-endian `uint256`.
pub fn uint256_be(value: u64) -> Hash32 {
    let mut out = [0u8; 32];
    out[24..].copy_from_slice(&value.to_be_bytes());
    out
}

/// Reduce a big-endian 256-bit value modulo a small modulus.
///
/// Returns 0 when `modulus` is 0.
pub fn mod_u256(value: &Hash32, modulus: u64) -> u64 {
    if modulus == 0 {
        return 0;
    }
    let m = modulus as u128;
    value
        .iter()
        .fold(0u128, |acc, byte| ((acc << 8) | *byte as u128) % m) as u64
}

// =============================================================================
// TESTS
// =============================================================================
