//! Snapshot-backed data source.
//!
//! Holds one contract's game states and indexed events in memory. Loads
//! from the JSON the indexer exports, which makes it the source for the
//! replay binary and for tests.

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::address::Address;
use crate::game::events::{
    GameOver, GameStarted, IndexedEvent, ProposalsEnded, RegistrationOpen, VotingResults,
};
use crate::game::state::{GameKey, GameState, TurnKey};
use crate::source::{GameDataSource, SourceError};

/// Exported contract state and events.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Game contract the snapshot was taken from.
    pub contract: Address,
    /// Chain the contract lives on, if recorded.
    #[serde(default)]
    pub chain_id: Option<u64>,
    /// State per game id.
    #[serde(default)]
    pub games: BTreeMap<u64, GameState>,
    /// Every indexed event, any order.
    #[serde(default)]
    pub events: Vec<IndexedEvent>,
}

/// In-memory [`GameDataSource`].
#[derive(Clone, Debug, Default)]
pub struct MemorySource {
    snapshot: Snapshot,
}

impl MemorySource {
    /// Empty source for `contract`.
    pub fn new(contract: Address) -> Self {
        Self { snapshot: Snapshot { contract, ..Default::default() } }
    }

    /// Wrap a loaded snapshot.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self { snapshot }
    }

    /// Parse a snapshot from JSON.
    pub fn from_json(json: &str) -> Result<Self, SourceError> {
        let snapshot: Snapshot = serde_json::from_str(json)?;
        debug!(
            contract = %snapshot.contract,
            games = snapshot.games.len(),
            events = snapshot.events.len(),
            "Loaded snapshot"
        );
        Ok(Self::from_snapshot(snapshot))
    }

    /// Read and parse a snapshot file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Add or replace a game's state.
    pub fn with_game(mut self, game_id: u64, state: GameState) -> Self {
        self.snapshot.games.insert(game_id, state);
        self
    }

    /// Append an event.
    pub fn with_event(mut self, event: IndexedEvent) -> Self {
        self.snapshot.events.push(event);
        self
    }

    /// Underlying snapshot.
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Contract the snapshot belongs to.
    pub fn contract(&self) -> Address {
        self.snapshot.contract
    }

    /// Known game ids, ascending.
    pub fn game_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.snapshot.games.keys().copied()
    }

    fn events<'a, T: Clone + 'a>(
        &'a self,
        game: GameKey,
        pick: impl Fn(&'a IndexedEvent) -> Option<&'a T>,
    ) -> Vec<T> {
        if game.contract != self.snapshot.contract {
            return Vec::new();
        }
        self.snapshot
            .events
            .iter()
            .filter(|event| event.game_id() == game.game_id)
            .filter_map(pick)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl GameDataSource for MemorySource {
    async fn game_state(&self, game: GameKey) -> Result<GameState, SourceError> {
        if game.contract != self.snapshot.contract {
            return Ok(GameState::default());
        }
        Ok(self.snapshot.games.get(&game.game_id).cloned().unwrap_or_default())
    }

    async fn proposals_ended(&self, turn: TurnKey) -> Result<Vec<ProposalsEnded>, SourceError> {
        Ok(self.events(turn.game, |event| match event {
            IndexedEvent::ProposalsEnded(e) if e.turn == turn.turn => Some(e),
            _ => None,
        }))
    }

    async fn voting_results(&self, turn: TurnKey) -> Result<Vec<VotingResults>, SourceError> {
        Ok(self.events(turn.game, |event| match event {
            IndexedEvent::VotingResults(e) if e.turn == turn.turn => Some(e),
            _ => None,
        }))
    }

    async fn registration_open(&self, game: GameKey) -> Result<Vec<RegistrationOpen>, SourceError> {
        Ok(self.events(game, |event| match event {
            IndexedEvent::RegistrationOpen(e) => Some(e),
            _ => None,
        }))
    }

    async fn game_started(&self, game: GameKey) -> Result<Vec<GameStarted>, SourceError> {
        Ok(self.events(game, |event| match event {
            IndexedEvent::GameStarted(e) => Some(e),
            _ => None,
        }))
    }

    async fn game_over(&self, game: GameKey) -> Result<Vec<GameOver>, SourceError> {
        Ok(self.events(game, |event| match event {
            IndexedEvent::GameOver(e) => Some(e),
            _ => None,
        }))
    }
}
