//! Deterministic Turn Shuffling
//!
//! Keccak-chained generator used by the game master to draw a turn's
//! permutation. Given the same seed, produces the identical permutation on
//! every platform, so anyone holding the seed can recompute it later.

use super::abi::{keccak256, mod_u256, Hash32};
use super::permutation::Permutation;

/// Deterministic generator over a 32-byte keccak chain.
///
/// Each draw replaces the state with `keccak256(state)` and reads the new
/// state as a big-endian 256-bit integer.
///
/// # Example
///
/// ```
/// use rankify::core::rng::TurnRng;
///
/// let mut a = TurnRng::new([7; 32]);
/// let mut b = TurnRng::new([7; 32]);
/// assert_eq!(a.next_index(10), b.next_index(10));
/// ```
#[derive(Clone, Debug)]
pub struct TurnRng {
    state: Hash32,
}

impl TurnRng {
    /// Create from a 32-byte seed.
    pub fn new(seed: Hash32) -> Self {
        Self { state: seed }
    }

    /// Advance the chain and return the new state.
    #[inline]
    pub fn next_word(&mut self) -> Hash32 {
        self.state = keccak256(&self.state);
        self.state
    }

    /// Draw an index in `[0, bound)`.
    ///
    /// Plain modulo reduction; the bias for bounds this small is below 2^-240.
    #[inline]
    pub fn next_index(&mut self, bound: usize) -> usize {
        if bound == 0 {
            return 0;
        }
        let word = self.next_word();
        mod_u256(&word, bound as u64) as usize
    }

    /// Shuffle a slice in place using Fisher-Yates, last index first.
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        let len = slice.len();
        for i in (1..len).rev() {
            let j = self.next_index(i + 1);
            slice.swap(i, j);
        }
    }

    /// Current chain state (for checkpointing).
    pub fn state(&self) -> Hash32 {
        self.state
    }
}

/// Generate a permutation of `size` slots from `seed`.
pub fn generate_permutation(size: usize, seed: Hash32) -> Permutation {
    let mut indices: Vec<usize> = (0..size).collect();
    TurnRng::new(seed).shuffle(&mut indices);
    Permutation::from_shuffled(indices)
}

// =============================================================================
// TESTS
// =============================================================================
