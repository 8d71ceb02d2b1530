//! # Rankify SDK
//!
//! Client-side logic for anonymized Rankify games: permutation handling,
//! per-turn key derivation, phase classification and historic turn
//! reconstruction.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       RANKIFY SDK                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── permutation.rs - Apply / reverse turn permutations      │
//! │  ├── rng.rs      - Keccak-chained shuffle                    │
//! │  ├── abi.rs      - Packed ABI encoding + keccak256           │
//! │  └── address.rs  - 20-byte account addresses                │
//! │                                                              │
//! │  crypto/         - Per-turn secrets                          │
//! │  ├── kdf.rs      - derive_key                                │
//! │  ├── shared.rs   - secp256k1 ECDH shared keys                │
//! │  ├── cipher.rs   - Sealed proposals                          │
//! │  └── commitment.rs - Permutation commit / reveal             │
//! │                                                              │
//! │  game/           - Game logic (pure)                         │
//! │  ├── phase.rs    - Phase classification                      │
//! │  ├── events.rs   - Indexed event shapes                      │
//! │  ├── state.rs    - Game / turn keys, on-chain state          │
//! │  ├── turn.rs     - Historic turn reconstruction              │
//! │  └── standings.rs- Final placings                            │
//! │                                                              │
//! │  source/         - Data access (async)                       │
//! │  ├── memory.rs   - Snapshot-backed source                    │
//! │  └── reader.rs   - InstanceReader                            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! `core/`, `crypto/` and `game/` are pure: identical inputs give identical
//! outputs on every platform. Only `source/` performs I/O, and it hands
//! validated data to the pure functions.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod core;
pub mod crypto;
pub mod error;
pub mod game;
pub mod source;

// Re-export the pure surface
pub use crate::core::address::Address;
pub use crate::core::permutation::{apply_permutation, reverse_permutation, Permutation, PermutationError};
pub use crypto::kdf::{derive_key, DerivedKey, KeyContext, Scope};
pub use crypto::shared::derive_shared_key;
pub use error::{ErrorKind, RankifyError};
pub use game::phase::{classify_game_phase, GamePhase};
pub use game::turn::{reconstruct_turn, PlayerTurnResult, TurnInput};
pub use source::{GameDataSource, InstanceReader};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
