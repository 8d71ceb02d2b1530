//! Final standings from a `GameOver` event.

use serde::{Deserialize, Serialize};

use crate::core::address::Address;
use crate::error::Result;
use crate::game::events::GameOver;

/// A player's final placing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    /// Player.
    pub player: Address,
    /// Final score.
    pub score: u64,
    /// 1-based place; tied scores share a place.
    pub place: usize,
}

/// Rank players by score, highest first.
///
/// Ties share the higher place and the next place is skipped (1, 1, 3).
/// Equal scores keep their order from the event.
pub fn final_standings(over: &GameOver) -> Result<Vec<Standing>> {
    over.validate()?;

    let mut order: Vec<(Address, u64)> = over
        .players
        .iter()
        .copied()
        .zip(over.scores.iter().copied())
        .collect();
    // Stable sort keeps event order within a tie.
    order.sort_by(|a, b| b.1.cmp(&a.1));

    let mut standings = Vec::with_capacity(order.len());
    let mut place = 0;
    let mut prev = None;
    for (i, (player, score)) in order.into_iter().enumerate() {
        if prev != Some(score) {
            place = i + 1;
            prev = Some(score);
        }
        standings.push(Standing { player, score, place });
    }
    Ok(standings)
}

/// Everyone sharing first place.
pub fn winners(standings: &[Standing]) -> Vec<Address> {
    standings.iter().take_while(|s| s.place == 1).map(|s| s.player).collect()
}
