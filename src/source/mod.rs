//! External Data Sources
//!
//! The indexer and contract reads sit behind [`GameDataSource`]. Event
//! queries return every match so the caller decides what "exactly one"
//! means; [`InstanceReader`] enforces it.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  mod.rs     - GameDataSource trait, SourceError             │
//! │  memory.rs  - Snapshot-backed source (JSON)                 │
//! │  reader.rs  - InstanceReader: fan-out, checks, turn cache   │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::game::events::{GameOver, GameStarted, ProposalsEnded, RegistrationOpen, VotingResults};
use crate::game::state::{GameKey, GameState, TurnKey};

pub mod memory;
pub mod reader;

pub use memory::{MemorySource, Snapshot};
pub use reader::InstanceReader;

/// Data source failure, surfaced to callers unchanged.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Request failed.
    #[error("request failed: {0}")]
    Request(String),

    /// Source answered with data that does not fit the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Could not read a snapshot.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// Could not decode a snapshot.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Read access to one chain's game contracts and their indexed events.
#[async_trait]
pub trait GameDataSource: Send + Sync {
    /// Current on-chain state. A game that was never created reads as all zeros.
    async fn game_state(&self, game: GameKey) -> Result<GameState, SourceError>;

    /// `ProposalsEnded` events for a turn.
    async fn proposals_ended(&self, turn: TurnKey) -> Result<Vec<ProposalsEnded>, SourceError>;

    /// `VotingResults` events for a turn.
    async fn voting_results(&self, turn: TurnKey) -> Result<Vec<VotingResults>, SourceError>;

    /// `RegistrationOpen` events for a game.
    async fn registration_open(&self, game: GameKey) -> Result<Vec<RegistrationOpen>, SourceError>;

    /// `GameStarted` events for a game.
    async fn game_started(&self, game: GameKey) -> Result<Vec<GameStarted>, SourceError>;

    /// `GameOver` events for a game.
    async fn game_over(&self, game: GameKey) -> Result<Vec<GameOver>, SourceError>;
}

#[async_trait]
impl<T> GameDataSource for Arc<T>
where
    T: GameDataSource + ?Sized,
{
    async fn game_state(&self, game: GameKey) -> Result<GameState, SourceError> {
        (**self).game_state(game).await
    }

    async fn proposals_ended(&self, turn: TurnKey) -> Result<Vec<ProposalsEnded>, SourceError> {
        (**self).proposals_ended(turn).await
    }

    async fn voting_results(&self, turn: TurnKey) -> Result<Vec<VotingResults>, SourceError> {
        (**self).voting_results(turn).await
    }

    async fn registration_open(&self, game: GameKey) -> Result<Vec<RegistrationOpen>, SourceError> {
        (**self).registration_open(game).await
    }

    async fn game_started(&self, game: GameKey) -> Result<Vec<GameStarted>, SourceError> {
        (**self).game_started(game).await
    }

    async fn game_over(&self, game: GameKey) -> Result<Vec<GameOver>, SourceError> {
        (**self).game_over(game).await
    }
}
