//! Crate Errors
//!
//! Every failure falls into one of three kinds:
//! - malformed input (bad permutation, bad key bytes, inconsistent payload)
//! - not found (zero or several events where exactly one was expected)
//! - upstream failure (the data source failed), propagated unchanged

use std::fmt;

use thiserror::Error;

use crate::core::address::Address;
use crate::core::permutation::PermutationError;
use crate::crypto::shared::KeyError;
use crate::source::SourceError;

/// Coarse error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected before any result was produced.
    MalformedInput,
    /// Expected event missing or ambiguous.
    NotFound,
    /// Data source failed.
    UpstreamFailure,
}

/// Where an event lookup was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventLocation {
    /// Game contract.
    pub contract: Address,
    /// Game identifier.
    pub game_id: u64,
    /// Turn, for per-turn events.
    pub turn: Option<u64>,
}

impl fmt::Display for EventLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "game {} at {}", self.game_id, self.contract)?;
        if let Some(turn) = self.turn {
            write!(f, " turn {}", turn)?;
        }
        Ok(())
    }
}

/// Crate-level error.
#[derive(Debug, Error)]
pub enum RankifyError {
    /// Invalid permutation or length mismatch.
    #[error("permutation: {0}")]
    Permutation(#[from] PermutationError),

    /// Invalid key material.
    #[error("key: {0}")]
    Key(#[from] KeyError),

    /// Inconsistent input shape.
    #[error("malformed {what}: {reason}")]
    Malformed {
        /// What was being checked.
        what: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// Zero or several events where exactly one was expected.
    #[error("expected exactly one {event} for {location}, found {found}")]
    NotFound {
        /// Event name.
        event: &'static str,
        /// Queried identifiers.
        location: EventLocation,
        /// How many were returned.
        found: usize,
    },

    /// Data source failure.
    #[error("upstream: {0}")]
    Upstream(#[from] SourceError),
}

impl RankifyError {
    /// Shorthand for [`RankifyError::Malformed`].
    pub fn malformed(what: &'static str, reason: impl Into<String>) -> Self {
        Self::Malformed { what, reason: reason.into() }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Permutation(_) | Self::Key(_) | Self::Malformed { .. } => ErrorKind::MalformedInput,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Upstream(_) => ErrorKind::UpstreamFailure,
        }
    }
}

/// Crate result alias.
pub type Result<T, E = RankifyError> = std::result::Result<T, E>;
