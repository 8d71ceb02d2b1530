//! Game State Definitions
//!
//! Identifiers for games and turns, and the typed on-chain state read.
//! Keys implement Ord so they can key a BTreeMap deterministically.

use std::fmt;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::core::address::Address;
use crate::error::{EventLocation, RankifyError, Result};
use crate::game::events::RegistrationOpen;
use crate::game::phase::{classify_game_phase, GamePhase, PhaseFlags};

// =============================================================================
// KEYS
// =============================================================================

/// A game within a contract instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameKey {
    /// Game contract.
    pub contract: Address,
    /// Game identifier.
    pub game_id: u64,
}

impl GameKey {
    /// Create a key.
    pub const fn new(contract: Address, game_id: u64) -> Self {
        Self { contract, game_id }
    }

    /// Key for one of this game's turns.
    pub const fn turn(self, turn: u64) -> TurnKey {
        TurnKey { game: self, turn }
    }

    /// Location for error reporting.
    pub fn location(&self) -> EventLocation {
        EventLocation { contract: self.contract, game_id: self.game_id, turn: None }
    }
}

impl fmt::Display for GameKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.contract.short(), self.game_id)
    }
}

/// A turn of a game. Cache key for reconstructed turns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TurnKey {
    /// Owning game.
    pub game: GameKey,
    /// Turn number.
    pub turn: u64,
}

impl TurnKey {
    /// Location for error reporting.
    pub fn location(&self) -> EventLocation {
        EventLocation { turn: Some(self.turn), ..self.game.location() }
    }
}

impl fmt::Display for TurnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/turn {}", self.game, self.turn)
    }
}

// =============================================================================
// ON-CHAIN STATE
// =============================================================================

/// Game state as read from the contract.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    /// Game over.
    pub has_ended: bool,
    /// In overtime.
    pub is_overtime: bool,
    /// On the last regular turn.
    pub is_last_turn: bool,
    /// Start timestamp (seconds), 0 if not started.
    pub started_at: u64,
    /// Registration-open timestamp (seconds), 0 if not opened.
    pub registration_open_at: u64,
    /// Creator, zero if the game does not exist.
    pub created_by: Address,
    /// Current turn number.
    pub current_turn: u64,
    /// Turn start timestamp (seconds).
    #[serde(default)]
    pub turn_started_at: u64,
    /// Seconds per turn.
    pub time_per_turn: u64,
    /// Seconds registration stays open.
    pub time_to_join: u64,
    /// Per-turn vote budget.
    pub vote_credits: u64,
    /// Regular turn count.
    pub max_turns: u64,
    /// Minimum players to start.
    #[serde(default)]
    pub min_players: u64,
    /// Player cap; payloads are sized to this.
    #[serde(default)]
    pub max_players: u64,
}

impl GameState {
    /// Flags the phase is derived from.
    pub fn phase_flags(&self) -> PhaseFlags {
        PhaseFlags {
            has_ended: self.has_ended,
            is_overtime: self.is_overtime,
            is_last_turn: self.is_last_turn,
            started_at: self.started_at,
            registration_open_at: self.registration_open_at,
            created_by: self.created_by,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> GamePhase {
        classify_game_phase(&self.phase_flags())
    }

    /// Reject shapes the contract never produces.
    pub fn validate(&self) -> Result<()> {
        if self.min_players > self.max_players && self.max_players != 0 {
            return Err(RankifyError::malformed(
                "GameState",
                format!("min players {} above max players {}", self.min_players, self.max_players),
            ));
        }
        if self.has_ended && self.started_at == 0 {
            return Err(RankifyError::malformed("GameState", "ended without a start timestamp"));
        }
        Ok(())
    }

    /// When registration closes.
    pub fn registration_deadline(&self, open: &RegistrationOpen) -> Option<DateTime<Utc>> {
        timestamp(open.block_timestamp.checked_add(self.time_to_join)?)
    }

    /// When the current turn may be ended.
    pub fn turn_deadline(&self) -> Option<DateTime<Utc>> {
        if self.turn_started_at == 0 {
            return None;
        }
        let start = timestamp(self.turn_started_at)?;
        start.checked_add_signed(Duration::seconds(i64::try_from(self.time_per_turn).ok()?))
    }
}

fn timestamp(secs: u64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(i64::try_from(secs).ok()?, 0).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started_state() -> GameState {
        GameState {
            started_at: 1_700_000_000,
            registration_open_at: 1_699_999_000,
            created_by: Address::new([5; 20]),
            current_turn: 2,
            turn_started_at: 1_700_000_600,
            time_per_turn: 300,
            time_to_join: 600,
            vote_credits: 16,
            max_turns: 5,
            min_players: 3,
            max_players: 6,
            ..Default::default()
        }
    }

    #[test]
    fn test_phase_from_state() {
        assert_eq!(started_state().phase(), GamePhase::Started);
        assert_eq!(GameState::default().phase(), GamePhase::NotFound);

        let ended = GameState { has_ended: true, is_overtime: true, ..started_state() };
        assert_eq!(ended.phase(), GamePhase::Finished);
    }

    #[test]
    fn test_deadlines() {
        let state = started_state();
        let open = RegistrationOpen { game_id: 1, block_timestamp: 1_699_999_000 };

        assert_eq!(
            state.registration_deadline(&open).unwrap().timestamp(),
            1_699_999_600
        );
        assert_eq!(state.turn_deadline().unwrap().timestamp(), 1_700_000_900);
        assert!(GameState::default().turn_deadline().is_none());
    }

    #[test]
    fn test_validate() {
        assert!(started_state().validate().is_ok());

        let bad = GameState { min_players: 7, ..started_state() };
        assert!(bad.validate().is_err());

        let ended_unstarted = GameState { has_ended: true, started_at: 0, ..started_state() };
        assert!(ended_unstarted.validate().is_err());
    }

    #[test]
    fn test_state_json_camel_case() {
        let json = r#"{
            "hasEnded": false, "isOvertime": false, "isLastTurn": true,
            "startedAt": 10, "registrationOpenAt": 5,
            "createdBy": "0x0101010101010101010101010101010101010101",
            "currentTurn": 4, "timePerTurn": 60, "timeToJoin": 60,
            "voteCredits": 9, "maxTurns": 4
        }"#;
        let state: GameState = serde_json::from_str(json).unwrap();
        assert_eq!(state.phase(), GamePhase::LastTurn);
        assert_eq!(state.vote_credits, 9);
    }

    #[test]
    fn test_keys_order_and_display() {
        let game = GameKey::new(Address::new([0xaa; 20]), 3);
        assert!(game.turn(1) < game.turn(2));
        assert_eq!(game.turn(2).location().turn, Some(2));
        assert!(game.turn(2).to_string().ends_with("#3/turn 2"));
    }
}
