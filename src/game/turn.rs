//! Historic Turn Reconstruction
//!
//! Turns permuted, possibly over-allocated event payloads into a
//! player-indexed view of one finished turn.
//!
//! ## Scoring
//!
//! ```text
//! max_votes = floor(sqrt(vote_credits))
//!
//! for each proposer p with a non-empty proposal:
//!     for each voter v != p:
//!         contribution = max_votes        if row v sums to zero (idle voter)
//!                        votes[v][p]      otherwise
//!     score[p] = sum of contributions
//! ```
//!
//! Idle voters count as awarding the maximum to everyone, so abstaining
//! cannot zero out other players' scores.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::address::Address;
use crate::core::permutation::{reverse_truncated, Permutation};
use crate::error::{RankifyError, Result};
use crate::game::events::{ProposalsEnded, VotingResults};

/// One voter's contribution to a proposer's score.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteContribution {
    /// Voter.
    pub voter: Address,
    /// Votes awarded (substituted for idle voters).
    pub score: u64,
}

/// A player's reconstructed result for one turn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerTurnResult {
    /// Player.
    pub player: Address,
    /// Proposal text, `""` if none was submitted.
    pub proposal: String,
    /// Total score.
    pub score: u64,
    /// Positive contributions only.
    pub score_list: Vec<VoteContribution>,
    /// Timestamp of the voting-results block.
    pub block_timestamp: u64,
}

/// Everything needed to reconstruct one turn.
#[derive(Clone, Debug)]
pub struct TurnInput<'a> {
    /// Proposals in slot order, possibly padded.
    pub proposals: &'a [String],
    /// Vote matrix in slot order, possibly padded.
    pub votes: &'a [Vec<u64>],
    /// Slot of each true player index.
    pub permutation: &'a Permutation,
    /// Players in true order.
    pub players: &'a [Address],
    /// Per-turn vote budget.
    pub vote_credits: u64,
    /// Timestamp stamped on every result.
    pub block_timestamp: u64,
}

impl<'a> TurnInput<'a> {
    /// Assemble from the two turn events.
    ///
    /// `permutation` must be the validated form of `voting.permutation`.
    pub fn from_events(
        proposals: &'a ProposalsEnded,
        voting: &'a VotingResults,
        permutation: &'a Permutation,
        vote_credits: u64,
    ) -> Self {
        Self {
            proposals: &proposals.proposals,
            votes: &voting.finalized_voting_matrix,
            permutation,
            players: &voting.players,
            vote_credits,
            block_timestamp: voting.block_timestamp,
        }
    }
}

/// Largest number of votes one voter can give one proposal.
pub fn max_votes(vote_credits: u64) -> u64 {
    // Newton's method in u128 so the first step cannot overflow at u64::MAX.
    if vote_credits < 2 {
        return vote_credits;
    }
    let n = u128::from(vote_credits);
    let mut x = n;
    let mut y = (x + 1) / 2;
    while y < x {
        x = y;
        y = (x + n / x) / 2;
    }
    // floor(sqrt(u64::MAX)) fits in 32 bits.
    x as u64
}

/// Reverse a slot-ordered vote matrix into true player order, both rows and
/// columns. Padding rows and columns are truncated first.
pub fn reverse_vote_matrix(votes: &[Vec<u64>], permutation: &Permutation) -> Result<Vec<Vec<u64>>> {
    let rows = reverse_truncated(votes, permutation)?;
    rows.iter()
        .map(|row| Ok(reverse_truncated(row, permutation)?))
        .collect()
}

/// Reconstruct every player's result for one turn.
pub fn reconstruct_turn(input: &TurnInput<'_>) -> Result<Vec<PlayerTurnResult>> {
    let n = input.permutation.len();
    if input.players.len() != n {
        return Err(RankifyError::malformed(
            "turn",
            format!("{} players for a permutation of {} slots", input.players.len(), n),
        ));
    }

    if input.proposals.len() > n {
        debug!(
            dropped = input.proposals.len() - n,
            "Truncating over-allocated proposals"
        );
    }
    let proposals = reverse_truncated(input.proposals, input.permutation)?;
    let votes = reverse_vote_matrix(input.votes, input.permutation)?;
    let max = max_votes(input.vote_credits);

    let idle: Vec<bool> = votes
        .iter()
        .map(|row| row.iter().all(|&cell| cell == 0))
        .collect();
    for (v, _) in idle.iter().enumerate().filter(|(_, is_idle)| **is_idle) {
        debug!(voter = %input.players[v], max_votes = max, "Idle voter counted at max votes");
    }

    #[cfg(feature = "debug-tracing")]
    tracing::trace!(?proposals, ?votes, "Reversed turn payloads");

    proposals
        .into_iter()
        .enumerate()
        .map(|(p, proposal)| -> Result<PlayerTurnResult> {
            let player = input.players[p];
            if proposal.is_empty() {
                return Ok(PlayerTurnResult {
                    player,
                    proposal,
                    score: 0,
                    score_list: Vec::new(),
                    block_timestamp: input.block_timestamp,
                });
            }

            let contributions: Vec<VoteContribution> = (0..n)
                .filter(|&v| v != p)
                .map(|v| VoteContribution {
                    voter: input.players[v],
                    score: if idle[v] { max } else { votes[v][p] },
                })
                .collect();
            let score = contributions
                .iter()
                .try_fold(0u64, |total, c| total.checked_add(c.score))
                .ok_or_else(|| {
                    RankifyError::malformed("turn", format!("score of {} overflows u64", player))
                })?;
            let score_list = contributions.into_iter().filter(|c| c.score > 0).collect();

            Ok(PlayerTurnResult {
                player,
                proposal,
                score,
                score_list,
                block_timestamp: input.block_timestamp,
            })
        })
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================
