//! Core deterministic primitives.
//!
//! Everything here is a pure function of its inputs: no clocks, no I/O,
//! no ambient randomness.

pub mod abi;
pub mod address;
pub mod permutation;
pub mod rng;

// Re-export core types
pub use abi::{keccak256, AbiPacker, Hash32};
pub use address::{Address, AddressError};
pub use permutation::{
    apply_permutation, reverse_permutation, reverse_truncated, Permutation, PermutationError,
};
pub use rng::{generate_permutation, TurnRng};
