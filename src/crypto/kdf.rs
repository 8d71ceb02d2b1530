//! Per-Turn Key Derivation
//!
//! Derives a 32-byte key bound to a game, a turn, a contract and a chain:
//!
//! ```text
//! keccak256(abi.encodePacked(
//!     bytes32 secret, uint256 gameId, uint256 turn,
//!     address contract, uint256 chainId, bytes32 keccak256(scope)))
//! ```
//!
//! The preimage layout must stay bit-exact; the contract recomputes it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::abi::{keccak256, AbiPacker, Hash32};
use crate::core::address::Address;

/// Packed preimage length: bytes32 + uint256 + uint256 + address + uint256 + bytes32.
pub const KDF_PREIMAGE_LEN: usize = 32 + 32 + 32 + 20 + 32 + 32;

/// Derived 32-byte key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DerivedKey(pub Hash32);

impl DerivedKey {
    /// Raw key bytes.
    pub fn as_bytes(&self) -> &Hash32 {
        &self.0
    }

    /// `0x`-prefixed hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

// Keys stay out of logs.
impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DerivedKey(0x{}…)", hex::encode(&self.0[..4]))
    }
}

/// Domain-separation label mixed into the derivation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Scope<'a>(pub &'a str);

impl Scope<'static> {
    /// Player/game-master encryption key.
    pub const DEFAULT: Scope<'static> = Scope("default");
    /// Seed for the turn's permutation.
    pub const TURN_SALT: Scope<'static> = Scope("turnSalt");
}

impl Scope<'_> {
    /// `keccak256(scope)` as packed into the preimage.
    pub fn hash(&self) -> Hash32 {
        keccak256(self.0.as_bytes())
    }
}

/// Identifiers every per-turn key is bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyContext {
    /// Game identifier.
    pub game_id: u64,
    /// Turn number.
    pub turn: u64,
    /// Game contract address.
    pub contract: Address,
    /// Chain identifier.
    pub chain_id: u64,
}

impl KeyContext {
    /// Create a context.
    pub fn new(game_id: u64, turn: u64, contract: Address, chain_id: u64) -> Self {
        Self { game_id, turn, contract, chain_id }
    }

    /// Same context for another turn.
    pub fn with_turn(self, turn: u64) -> Self {
        Self { turn, ..self }
    }
}

/// Derive a key from a base secret.
pub fn derive_key(secret: &Hash32, ctx: &KeyContext, scope: Scope<'_>) -> DerivedKey {
    let mut packer = AbiPacker::new();
    packer
        .bytes32(secret)
        .uint256(ctx.game_id)
        .uint256(ctx.turn)
        .address(&ctx.contract)
        .uint256(ctx.chain_id)
        .bytes32(&scope.hash());
    debug_assert_eq!(packer.packed_len(), KDF_PREIMAGE_LEN);
    DerivedKey(packer.finalize())
}

// =============================================================================
// TESTS
// =============================================================================
