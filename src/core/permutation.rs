//! Turn Permutations
//!
//! A permutation maps true player index `i` to the slot `perm[i]` the player
//! occupies in a turn's anonymized payloads. Applying it scatters player-ordered
//! data into slot order; reversing it gathers slot-ordered data back.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Permutation errors. All of them are malformed input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PermutationError {
    /// Index out of range or repeated.
    #[error("not a bijection over 0..{len}: index {index} at position {position}")]
    NotABijection {
        /// Permutation length.
        len: usize,
        /// Offending position.
        position: usize,
        /// Offending value.
        index: usize,
    },

    /// Sequence length differs from permutation length.
    #[error("sequence length {got} does not match permutation length {expected}")]
    LengthMismatch {
        /// Permutation length.
        expected: usize,
        /// Sequence length.
        got: usize,
    },
}

/// Validated bijection over `0..len`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Permutation(Vec<usize>);

impl Permutation {
    /// Validate and wrap raw indices.
    pub fn new(indices: Vec<usize>) -> Result<Self, PermutationError> {
        let len = indices.len();
        let mut seen = vec![false; len];
        for (position, &index) in indices.iter().enumerate() {
            if index >= len || seen[index] {
                return Err(PermutationError::NotABijection { len, position, index });
            }
            seen[index] = true;
        }
        Ok(Self(indices))
    }

    /// Wrap indices produced by shuffling an identity, which are a bijection
    /// by construction.
    pub(crate) fn from_shuffled(indices: Vec<usize>) -> Self {
        debug_assert!(Self::new(indices.clone()).is_ok());
        Self(indices)
    }

    /// The identity permutation of length `len`.
    pub fn identity(len: usize) -> Self {
        Self((0..len).collect())
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when there are no slots.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Slot of true index `i`.
    pub fn slot_of(&self, i: usize) -> Option<usize> {
        self.0.get(i).copied()
    }

    /// Raw indices.
    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    /// The inverse permutation (slot -> true index).
    pub fn inverse(&self) -> Self {
        let mut inv = vec![0; self.0.len()];
        for (i, &slot) in self.0.iter().enumerate() {
            inv[slot] = i;
        }
        Self(inv)
    }

    /// Extend with identity entries up to `max_size`.
    ///
    /// Payloads sized for the game's player cap carry these trailing slots.
    pub fn padded(&self, max_size: usize) -> Self {
        let mut indices = self.0.clone();
        indices.extend(self.0.len()..max_size);
        Self(indices)
    }
}

impl<'de> Deserialize<'de> for Permutation {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Vec::<usize>::deserialize(deserializer)?;
        Permutation::new(raw).map_err(serde::de::Error::custom)
    }
}

impl TryFrom<Vec<usize>> for Permutation {
    type Error = PermutationError;

    fn try_from(value: Vec<usize>) -> Result<Self, Self::Error> {
        Permutation::new(value)
    }
}

/// Place `sequence[i]` at slot `permutation[i]`.
pub fn apply_permutation<T: Clone>(
    sequence: &[T],
    permutation: &Permutation,
) -> Result<Vec<T>, PermutationError> {
    // Scattering by the permutation is gathering by its inverse.
    reverse_permutation(sequence, &permutation.inverse())
}

/// Take `sequence[i] = permuted[permutation[i]]`.
///
/// Exact inverse of [`apply_permutation`]. A longer `permuted` is rejected;
/// use [`reverse_truncated`] for over-allocated payloads.
pub fn reverse_permutation<T: Clone>(
    permuted: &[T],
    permutation: &Permutation,
) -> Result<Vec<T>, PermutationError> {
    check_len(permuted.len(), permutation)?;
    Ok(permutation.0.iter().map(|&slot| permuted[slot].clone()).collect())
}

/// Truncate `permuted` to the permutation length, then reverse.
///
/// Truncation must happen before reversal: trailing slots past the player
/// count are padding, not data.
pub fn reverse_truncated<T: Clone>(
    permuted: &[T],
    permutation: &Permutation,
) -> Result<Vec<T>, PermutationError> {
    if permuted.len() < permutation.len() {
        return Err(PermutationError::LengthMismatch {
            expected: permutation.len(),
            got: permuted.len(),
        });
    }
    reverse_permutation(&permuted[..permutation.len()], permutation)
}

fn check_len(got: usize, permutation: &Permutation) -> Result<(), PermutationError> {
    if got != permutation.len() {
        return Err(PermutationError::LengthMismatch {
            expected: permutation.len(),
            got,
        });
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
