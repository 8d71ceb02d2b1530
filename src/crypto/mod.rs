//! Key Derivation and Commitments
//!
//! Everything a player or the game master needs to agree on per-turn secrets:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  kdf.rs        - derive_key over packed ABI fields          │
//! │  shared.rs     - secp256k1 ECDH -> derive_shared_key        │
//! │  cipher.rs     - ChaCha20-Poly1305 sealed proposals         │
//! │  commitment.rs - permutation commit / reveal check          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! All functions are pure: identical inputs give identical keys.

pub mod kdf;
pub mod shared;
pub mod cipher;
pub mod commitment;

pub use kdf::{derive_key, DerivedKey, KeyContext, Scope};
pub use shared::{derive_shared_key, address_from_public_key, public_key_from_private, KeyError};
pub use cipher::{SealedProposal, CipherError};
pub use commitment::{PermutationCommitment, TurnReveal, CommitmentError, game_master_turn, turn_permutation};
