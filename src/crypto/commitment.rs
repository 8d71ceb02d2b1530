//! Permutation Commitment
//!
//! The game master commits to a turn's permutation before proposals are
//! revealed, and publishes the permutation with its nonce at turn end.
//! This module recomputes the commitment client-side so a reader can check
//! the revealed permutation before reconstructing the turn with it.

use serde::{Deserialize, Serialize};

use super::kdf::{derive_key, KeyContext, Scope};
use crate::core::abi::{AbiPacker, Hash32};
use crate::core::permutation::Permutation;
use crate::core::rng::generate_permutation;

/// Published commitment to a turn permutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermutationCommitment {
    /// `keccak256(abi.encodePacked(uint256[] permutation, bytes32 nonce))`.
    pub hash: Hash32,
}

impl PermutationCommitment {
    /// Commit to a permutation under a nonce.
    pub fn commit(permutation: &Permutation, nonce: &Hash32) -> Self {
        Self { hash: compute_commitment_hash(permutation, nonce) }
    }

    /// Check a permutation and nonce against this commitment.
    pub fn verify(&self, permutation: &Permutation, nonce: &Hash32) -> bool {
        compute_commitment_hash(permutation, nonce) == self.hash
    }
}

fn compute_commitment_hash(permutation: &Permutation, nonce: &Hash32) -> Hash32 {
    let mut packer = AbiPacker::new();
    packer
        .uint256_array(permutation.as_slice().iter().map(|&i| i as u64))
        .bytes32(nonce);
    packer.finalize()
}

/// A turn's revealed permutation and nonce.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnReveal {
    /// Revealed permutation.
    pub permutation: Permutation,
    /// Revealed nonce.
    pub nonce: Hash32,
}

impl TurnReveal {
    /// Verify the reveal against a commitment and the expected player count.
    pub fn verify(&self, commitment: &PermutationCommitment, players: usize) -> Result<(), CommitmentError> {
        if self.permutation.len() != players {
            return Err(CommitmentError::SizeMismatch {
                expected: players,
                got: self.permutation.len(),
            });
        }
        if !commitment.verify(&self.permutation, &self.nonce) {
            return Err(CommitmentError::Mismatch);
        }
        Ok(())
    }
}

/// The permutation the game master uses for a turn.
///
/// Seeded from the game master's key under the `turnSalt` scope, so it can
/// be regenerated from the key and the turn identifiers alone.
pub fn turn_permutation(game_master_key: &Hash32, players: usize, ctx: &KeyContext) -> Permutation {
    let seed = derive_key(game_master_key, ctx, Scope::TURN_SALT);
    generate_permutation(players, seed.0)
}

/// Game-master side: the permutation, nonce and commitment for one turn.
///
/// The seed and nonce both come from the game master's key through
/// distinct derivation scopes, so the whole triple is reproducible from the
/// key and the turn identifiers.
pub fn game_master_turn(
    game_master_key: &Hash32,
    players: usize,
    ctx: &KeyContext,
) -> (TurnReveal, PermutationCommitment) {
    let permutation = turn_permutation(game_master_key, players, ctx);
    let seed = derive_key(game_master_key, ctx, Scope::TURN_SALT);
    let nonce = derive_key(seed.as_bytes(), ctx, Scope::DEFAULT);
    let commitment = PermutationCommitment::commit(&permutation, &nonce.0);
    (TurnReveal { permutation, nonce: nonce.0 }, commitment)
}

/// Errors from checking a reveal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitmentError {
    /// Recomputed hash does not match.
    Mismatch,

    /// Revealed permutation has the wrong number of slots.
    SizeMismatch {
        /// Player count.
        expected: usize,
        /// Permutation length.
        got: usize,
    },
}

impl std::fmt::Display for CommitmentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mismatch => write!(f, "Revealed permutation doesn't match commitment"),
            Self::SizeMismatch { expected, got } => {
                write!(f, "Revealed permutation has {} slots, expected {}", got, expected)
            }
        }
    }
}

impl std::error::Error for CommitmentError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::abi::{keccak256, uint256_be};
    use crate::core::address::Address;

    fn ctx() -> KeyContext {
        KeyContext::new(1, 4, Address::new([0x10; 20]), 1)
    }

    #[test]
    fn test_commitment_hash_layout() {
        let permutation = Permutation::new(vec![1, 0]).unwrap();
        let nonce = [3u8; 32];

        let mut preimage = Vec::new();
        preimage.extend_from_slice(&uint256_be(1));
        preimage.extend_from_slice(&uint256_be(0));
        preimage.extend_from_slice(&nonce);

        assert_eq!(PermutationCommitment::commit(&permutation, &nonce).hash, keccak256(&preimage));
    }

    #[test]
    fn test_wrong_nonce_fails() {
        let permutation = Permutation::new(vec![2, 0, 1]).unwrap();
        let commitment = PermutationCommitment::commit(&permutation, &[1; 32]);

        assert!(commitment.verify(&permutation, &[1; 32]));
        assert!(!commitment.verify(&permutation, &[2; 32]));
        assert!(!commitment.verify(&Permutation::identity(3), &[1; 32]));
    }

    #[test]
    fn test_game_master_turn_is_reproducible() {
        let (reveal1, commitment1) = game_master_turn(&[9; 32], 5, &ctx());
        let (reveal2, commitment2) = game_master_turn(&[9; 32], 5, &ctx());

        assert_eq!(reveal1, reveal2);
        assert_eq!(commitment1, commitment2);
        assert!(reveal1.verify(&commitment1, 5).is_ok());

        let (other, _) = game_master_turn(&[9; 32], 5, &ctx().with_turn(5));
        assert_ne!(other.nonce, reveal1.nonce);
    }

    #[test]
    fn test_turn_permutation_from_turn_salt() {
        let key = [9u8; 32];
        let permutation = turn_permutation(&key, 6, &ctx());

        let seed = derive_key(&key, &ctx(), Scope::TURN_SALT);
        assert_eq!(permutation, generate_permutation(6, seed.0));
        assert_eq!(permutation, turn_permutation(&key, 6, &ctx()));
        assert_eq!(game_master_turn(&key, 6, &ctx()).0.permutation, permutation);

        let default_seed = derive_key(&key, &ctx(), Scope::DEFAULT);
        assert_ne!(seed, default_seed);
    }

    #[test]
    fn test_reveal_size_mismatch() {
        let (reveal, commitment) = game_master_turn(&[9; 32], 4, &ctx());
        assert_eq!(
            reveal.verify(&commitment, 5),
            Err(CommitmentError::SizeMismatch { expected: 5, got: 4 })
        );

        let tampered = TurnReveal { nonce: [0; 32], ..reveal };
        assert_eq!(tampered.verify(&commitment, 4), Err(CommitmentError::Mismatch));
    }
}
