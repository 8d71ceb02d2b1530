//! Game Phase Classification
//!
//! The contract exposes raw flags; the phase is derived from them on every
//! read and never stored.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::address::Address;

/// Lifecycle phase of a game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    /// Created, registration not yet open.
    Created,
    /// Registration open.
    Open,
    /// Turns in progress.
    Started,
    /// Final regular turn.
    LastTurn,
    /// Tied after the last turn, playing extra turns.
    Overtime,
    /// Game over.
    Finished,
    /// No such game.
    NotFound,
}

impl GamePhase {
    /// True once no further turns can happen.
    pub fn is_terminal(self) -> bool {
        matches!(self, GamePhase::Finished)
    }

    /// True while turns are being played.
    pub fn is_in_progress(self) -> bool {
        matches!(self, GamePhase::Started | GamePhase::LastTurn | GamePhase::Overtime)
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            GamePhase::Created => "Game created",
            GamePhase::Open => "Registration open",
            GamePhase::Started => "In progress",
            GamePhase::LastTurn => "Last turn",
            GamePhase::Overtime => "Overtime",
            GamePhase::Finished => "Game over",
            GamePhase::NotFound => "Not found",
        }
    }
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Raw on-chain flags the phase is derived from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PhaseFlags {
    /// Game over.
    pub has_ended: bool,
    /// In overtime.
    pub is_overtime: bool,
    /// On the last regular turn.
    pub is_last_turn: bool,
    /// Start timestamp, 0 if not started.
    pub started_at: u64,
    /// Registration-open timestamp, 0 if not opened.
    pub registration_open_at: u64,
    /// Creator, zero if the game does not exist.
    pub created_by: Address,
}

/// Map flags to exactly one phase. First match wins:
/// ended, overtime, last turn, started, open, created, not found.
pub fn classify_game_phase(flags: &PhaseFlags) -> GamePhase {
    if flags.has_ended {
        GamePhase::Finished
    } else if flags.is_overtime {
        GamePhase::Overtime
    } else if flags.is_last_turn {
        GamePhase::LastTurn
    } else if flags.started_at > 0 {
        GamePhase::Started
    } else if flags.registration_open_at > 0 {
        GamePhase::Open
    } else if !flags.created_by.is_zero() {
        GamePhase::Created
    } else {
        GamePhase::NotFound
    }
}
