//! Indexed Game Events
//!
//! Typed shapes of the contract events the indexer serves, keyed by game,
//! turn and contract. JSON uses the indexer's camelCase field names.
//! Every shape is validated on ingress so nothing untyped reaches the
//! reconstruction step.

use serde::{Deserialize, Serialize};

use crate::core::address::Address;
use crate::core::permutation::Permutation;
use crate::error::{RankifyError, Result};

/// Proposals revealed at the end of a turn, in permuted slot order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalsEnded {
    /// Game identifier.
    pub game_id: u64,
    /// Turn number.
    pub turn: u64,
    /// One entry per slot, `""` for no submission. May be padded past the
    /// player count.
    pub proposals: Vec<String>,
    /// Number of non-empty proposals.
    pub num_proposals: u64,
    /// Block timestamp (seconds).
    #[serde(default)]
    pub block_timestamp: u64,
}

impl ProposalsEnded {
    /// Check the shape independent of the player count.
    pub fn validate(&self) -> Result<()> {
        if self.num_proposals > self.proposals.len() as u64 {
            return Err(RankifyError::malformed(
                "ProposalsEnded",
                format!("{} proposals counted in {} slots", self.num_proposals, self.proposals.len()),
            ));
        }
        Ok(())
    }

    /// Check the player slots of a turn with `players` players.
    ///
    /// Slots past the player count are padding and are never inspected.
    pub fn validate_for_players(&self, players: usize) -> Result<()> {
        self.validate()?;
        let slots = self.proposals.get(..players).ok_or_else(|| {
            RankifyError::malformed(
                "ProposalsEnded",
                format!("{} slots for {} players", self.proposals.len(), players),
            )
        })?;
        let submitted = slots.iter().filter(|p| !p.is_empty()).count() as u64;
        if submitted > self.num_proposals {
            return Err(RankifyError::malformed(
                "ProposalsEnded",
                format!("{} non-empty slots but num_proposals is {}", submitted, self.num_proposals),
            ));
        }
        Ok(())
    }
}

/// Finalized votes for a turn, with the revealed permutation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VotingResults {
    /// Game identifier.
    pub game_id: u64,
    /// Turn number.
    pub turn: u64,
    /// Players in true order.
    pub players: Vec<Address>,
    /// Rows are voter slots, columns are proposal slots.
    pub finalized_voting_matrix: Vec<Vec<u64>>,
    /// Slot of each true player index.
    pub permutation: Vec<usize>,
    /// Block timestamp (seconds).
    #[serde(default)]
    pub block_timestamp: u64,
}

impl VotingResults {
    /// Validated permutation.
    pub fn permutation(&self) -> Result<Permutation> {
        Ok(Permutation::new(self.permutation.clone())?)
    }

    /// Check the shape.
    pub fn validate(&self) -> Result<()> {
        let permutation = self.permutation()?;
        if permutation.len() != self.players.len() {
            return Err(RankifyError::malformed(
                "VotingResults",
                format!("permutation has {} slots for {} players", permutation.len(), self.players.len()),
            ));
        }
        let n = permutation.len();
        if self.finalized_voting_matrix.len() < n {
            return Err(RankifyError::malformed(
                "VotingResults",
                format!("vote matrix has {} rows for {} players", self.finalized_voting_matrix.len(), n),
            ));
        }
        if let Some((row, cells)) = self
            .finalized_voting_matrix
            .iter()
            .take(n)
            .enumerate()
            .find(|(_, cells)| cells.len() < n)
        {
            return Err(RankifyError::malformed(
                "VotingResults",
                format!("vote row {} has {} cells for {} players", row, cells.len(), n),
            ));
        }
        Ok(())
    }
}

/// Registration opened.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationOpen {
    /// Game identifier.
    pub game_id: u64,
    /// Block timestamp (seconds).
    pub block_timestamp: u64,
}

/// Game started.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStarted {
    /// Game identifier.
    pub game_id: u64,
    /// Block the game started in.
    pub block_number: u64,
    /// Block timestamp (seconds).
    #[serde(default)]
    pub block_timestamp: u64,
}

/// Game over with final scores, players in true order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameOver {
    /// Game identifier.
    pub game_id: u64,
    /// Players.
    pub players: Vec<Address>,
    /// Final score per player.
    pub scores: Vec<u64>,
    /// Block timestamp (seconds).
    #[serde(default)]
    pub block_timestamp: u64,
}

impl GameOver {
    /// Check the shape.
    pub fn validate(&self) -> Result<()> {
        if self.players.len() != self.scores.len() {
            return Err(RankifyError::malformed(
                "GameOver",
                format!("{} players with {} scores", self.players.len(), self.scores.len()),
            ));
        }
        Ok(())
    }
}

/// Any indexed event, tagged by name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum IndexedEvent {
    /// Proposals revealed.
    ProposalsEnded(ProposalsEnded),
    /// Votes finalized.
    VotingResults(VotingResults),
    /// Registration opened.
    RegistrationOpen(RegistrationOpen),
    /// Game started.
    GameStarted(GameStarted),
    /// Game over.
    GameOver(GameOver),
}

impl IndexedEvent {
    /// Event name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ProposalsEnded(_) => "ProposalsEnded",
            Self::VotingResults(_) => "VotingResults",
            Self::RegistrationOpen(_) => "RegistrationOpen",
            Self::GameStarted(_) => "GameStarted",
            Self::GameOver(_) => "GameOver",
        }
    }

    /// Game the event belongs to.
    pub fn game_id(&self) -> u64 {
        match self {
            Self::ProposalsEnded(e) => e.game_id,
            Self::VotingResults(e) => e.game_id,
            Self::RegistrationOpen(e) => e.game_id,
            Self::GameStarted(e) => e.game_id,
            Self::GameOver(e) => e.game_id,
        }
    }

    /// Turn, for per-turn events.
    pub fn turn(&self) -> Option<u64> {
        match self {
            Self::ProposalsEnded(e) => Some(e.turn),
            Self::VotingResults(e) => Some(e.turn),
            _ => None,
        }
    }

    /// Check the shape of the wrapped event.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::ProposalsEnded(e) => e.validate(),
            Self::VotingResults(e) => e.validate(),
            Self::GameOver(e) => e.validate(),
            Self::RegistrationOpen(_) | Self::GameStarted(_) => Ok(()),
        }
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
