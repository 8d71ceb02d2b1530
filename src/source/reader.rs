//! Instance Reader
//!
//! Binds a [`GameDataSource`] to one contract on one chain and answers
//! game-level questions: phase, historic turns, standings, per-turn keys.
//!
//! Independent fetches run concurrently. Anything the source hands back is
//! validated before use; a source that returns an inconsistent payload is
//! reported as an upstream failure, not as caller error.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::future::try_join_all;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use crate::config::{ConfigError, SdkConfig};
use crate::core::address::Address;
use crate::crypto::kdf::{derive_key, DerivedKey, KeyContext, Scope};
use crate::crypto::shared::derive_shared_key;
use crate::error::{EventLocation, RankifyError, Result};
use crate::game::events::GameStarted;
use crate::game::phase::GamePhase;
use crate::game::standings::{final_standings, Standing};
use crate::game::state::{GameKey, GameState, TurnKey};
use crate::game::turn::{reconstruct_turn, PlayerTurnResult, TurnInput};
use crate::source::{GameDataSource, SourceError};

/// Reconstructed turns keyed by (contract, game, turn).
type TurnCache = Arc<RwLock<BTreeMap<TurnKey, Vec<PlayerTurnResult>>>>;

/// Reads one game contract through a data source.
pub struct InstanceReader<S> {
    source: S,
    contract: Address,
    chain_id: u64,
    cache: Option<TurnCache>,
    cache_capacity: usize,
}

impl<S: GameDataSource> InstanceReader<S> {
    /// Create a reader without a turn cache.
    pub fn new(source: S, contract: Address, chain_id: u64) -> Self {
        Self {
            source,
            contract,
            chain_id,
            cache: None,
            cache_capacity: 0,
        }
    }

    /// Create a reader from configuration.
    pub fn from_config(source: S, config: &SdkConfig) -> Result<Self, ConfigError> {
        let reader = Self::new(source, config.require_contract()?, config.chain_id);
        Ok(reader.with_cache(config.cache_turns))
    }

    /// Cache up to `capacity` reconstructed turns. Zero disables the cache.
    ///
    /// Historic turns never change, so cached entries are never invalidated.
    /// When full, the smallest `TurnKey` (lowest game, then lowest turn) is
    /// evicted, not the least recently used one.
    pub fn with_cache(mut self, capacity: usize) -> Self {
        self.cache = (capacity > 0).then(|| Arc::new(RwLock::new(BTreeMap::new())));
        self.cache_capacity = capacity;
        self
    }

    /// Underlying source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Contract this reader is bound to.
    pub fn contract(&self) -> Address {
        self.contract
    }

    /// Chain id mixed into derived keys.
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Key for a game of this contract.
    pub fn game(&self, game_id: u64) -> GameKey {
        GameKey::new(self.contract, game_id)
    }

    /// Derivation context for a game turn.
    pub fn key_context(&self, game_id: u64, turn: u64) -> KeyContext {
        KeyContext::new(game_id, turn, self.contract, self.chain_id)
    }

    /// Derive a per-turn key from a raw secret.
    pub fn derive_key(&self, secret: &[u8; 32], game_id: u64, turn: u64, scope: Scope<'_>) -> DerivedKey {
        derive_key(secret, &self.key_context(game_id, turn), scope)
    }

    /// Derive the key a player shares with the game master for a turn.
    pub fn shared_key(
        &self,
        private_key: &[u8],
        public_key: &[u8],
        game_id: u64,
        turn: u64,
    ) -> Result<DerivedKey> {
        Ok(derive_shared_key(private_key, public_key, &self.key_context(game_id, turn))?)
    }

    /// Current on-chain state, validated.
    #[instrument(skip(self), fields(contract = %self.contract))]
    pub async fn game_state(&self, game_id: u64) -> Result<GameState> {
        let state = self.source.game_state(self.game(game_id)).await?;
        state.validate().map_err(upstream)?;
        Ok(state)
    }

    /// Current phase.
    #[instrument(skip(self), fields(contract = %self.contract))]
    pub async fn game_phase(&self, game_id: u64) -> Result<GamePhase> {
        let phase = self.game_state(game_id).await?.phase();
        debug!(%phase, "Classified game");
        Ok(phase)
    }

    /// Reconstruct one finished turn in true player order.
    #[instrument(skip(self), fields(contract = %self.contract))]
    pub async fn historic_turn(&self, game_id: u64, turn: u64) -> Result<Vec<PlayerTurnResult>> {
        let key = self.game(game_id).turn(turn);

        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.read().await.get(&key) {
                debug!("Turn cache hit");
                return Ok(hit.clone());
            }
        }

        let (state, proposals, voting) = tokio::try_join!(
            self.source.game_state(key.game),
            self.source.proposals_ended(key),
            self.source.voting_results(key),
        )?;
        state.validate().map_err(upstream)?;
        let proposals = exactly_one(proposals, "ProposalsEnded", key.location())?;
        let voting = exactly_one(voting, "VotingResults", key.location())?;

        if proposals.game_id != game_id || proposals.turn != turn {
            return Err(upstream(RankifyError::malformed(
                "ProposalsEnded",
                format!("answered for game {} turn {}", proposals.game_id, proposals.turn),
            )));
        }
        if voting.game_id != game_id || voting.turn != turn {
            return Err(upstream(RankifyError::malformed(
                "VotingResults",
                format!("answered for game {} turn {}", voting.game_id, voting.turn),
            )));
        }
        voting.validate().map_err(upstream)?;
        let permutation = voting.permutation().map_err(upstream)?;
        proposals.validate_for_players(permutation.len()).map_err(upstream)?;
        let input = TurnInput::from_events(&proposals, &voting, &permutation, state.vote_credits);
        let results = reconstruct_turn(&input).map_err(upstream)?;
        debug!(players = results.len(), "Reconstructed turn");

        if let Some(cache) = &self.cache {
            let mut cache = cache.write().await;
            if cache.len() >= self.cache_capacity && !cache.contains_key(&key) {
                cache.pop_first();
            }
            cache.insert(key, results.clone());
        }

        Ok(results)
    }

    /// Reconstruct every finished turn of a game, keyed by turn number.
    ///
    /// Turns before the current one are finished; the current turn is too
    /// once the game has ended.
    #[instrument(skip(self), fields(contract = %self.contract))]
    pub async fn game_history(&self, game_id: u64) -> Result<BTreeMap<u64, Vec<PlayerTurnResult>>> {
        let state = self.game_state(game_id).await?;
        if state.phase() == GamePhase::NotFound {
            return Err(RankifyError::NotFound {
                event: "Game",
                location: self.game(game_id).location(),
                found: 0,
            });
        }

        let last = if state.has_ended {
            state.current_turn
        } else {
            state.current_turn.saturating_sub(1)
        };
        let turns: Vec<u64> = (1..=last).collect();
        let results = try_join_all(turns.iter().map(|&turn| self.historic_turn(game_id, turn))).await?;
        Ok(turns.into_iter().zip(results).collect())
    }

    /// Final placings of a finished game.
    #[instrument(skip(self), fields(contract = %self.contract))]
    pub async fn final_standings(&self, game_id: u64) -> Result<Vec<Standing>> {
        let game = self.game(game_id);
        let over = exactly_one(self.source.game_over(game).await?, "GameOver", game.location())?;
        final_standings(&over).map_err(upstream)
    }

    /// The block a game started in.
    #[instrument(skip(self), fields(contract = %self.contract))]
    pub async fn game_started(&self, game_id: u64) -> Result<GameStarted> {
        let game = self.game(game_id);
        exactly_one(self.source.game_started(game).await?, "GameStarted", game.location())
    }

    /// When registration closes.
    #[instrument(skip(self), fields(contract = %self.contract))]
    pub async fn registration_deadline(&self, game_id: u64) -> Result<Option<DateTime<Utc>>> {
        let game = self.game(game_id);
        let (state, opened) = tokio::try_join!(
            self.source.game_state(game),
            self.source.registration_open(game),
        )?;
        state.validate().map_err(upstream)?;
        let opened = exactly_one(opened, "RegistrationOpen", game.location())?;
        Ok(state.registration_deadline(&opened))
    }

    /// Cached turn count.
    pub async fn cached_turns(&self) -> usize {
        match &self.cache {
            Some(cache) => cache.read().await.len(),
            None => 0,
        }
    }
}

/// Require exactly one event.
fn exactly_one<T>(mut events: Vec<T>, event: &'static str, location: EventLocation) -> Result<T> {
    let found = events.len();
    match events.pop() {
        Some(only) if found == 1 => Ok(only),
        _ => {
            warn!(event, %location, found, "Expected exactly one event");
            Err(RankifyError::NotFound { event, location, found })
        }
    }
}

/// Re-label a shape error in source data as an upstream failure.
fn upstream(err: RankifyError) -> RankifyError {
    match err {
        RankifyError::Upstream(_) | RankifyError::NotFound { .. } => err,
        other => RankifyError::Upstream(SourceError::Malformed(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::permutation::{apply_permutation, Permutation};
    use crate::error::ErrorKind;
    use crate::game::events::{
        GameOver, IndexedEvent, ProposalsEnded, RegistrationOpen, VotingResults,
    };
    use crate::source::MemorySource;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const CONTRACT: Address = Address([0xaa; 20]);

    fn players() -> Vec<Address> {
        (1..=3u8).map(|i| Address::new([i; 20])).collect()
    }

    fn state(current_turn: u64, has_ended: bool) -> GameState {
        GameState {
            has_ended,
            started_at: 1_000,
            registration_open_at: 900,
            created_by: Address::new([9; 20]),
            current_turn,
            time_per_turn: 60,
            time_to_join: 100,
            vote_credits: 16,
            max_turns: 2,
            min_players: 3,
            max_players: 4,
            ..Default::default()
        }
    }

    /// Turn events for 3 players padded to 4 slots.
    fn turn_events(turn: u64) -> [IndexedEvent; 2] {
        padded_turn_events(turn, "")
    }

    /// Same turn with `filler` written into the padding slot.
    fn padded_turn_events(turn: u64, filler: &str) -> [IndexedEvent; 2] {
        let permutation = Permutation::new(vec![1, 2, 0]).unwrap();
        let slots = permutation.padded(4);

        let true_proposals = ["first", "second", "third", filler].map(String::from);
        let proposals = apply_permutation(&true_proposals, &slots).unwrap();

        // True order: player 1 gives 2 to player 2, player 2 gives 3 to player 1,
        // player 3 is idle.
        let true_votes = vec![
            vec![0u64, 2, 0, 0],
            vec![3, 0, 0, 0],
            vec![0, 0, 0, 0],
            vec![0, 0, 0, 0],
        ];
        let matrix: Vec<Vec<u64>> = apply_permutation(&true_votes, &slots)
            .unwrap()
            .iter()
            .map(|row| apply_permutation(row, &slots).unwrap())
            .collect();

        [
            IndexedEvent::ProposalsEnded(ProposalsEnded {
                game_id: 1,
                turn,
                proposals,
                num_proposals: 3,
                block_timestamp: 1_100,
            }),
            IndexedEvent::VotingResults(VotingResults {
                game_id: 1,
                turn,
                players: players(),
                finalized_voting_matrix: matrix,
                permutation: permutation.as_slice().to_vec(),
                block_timestamp: 1_200 + turn,
            }),
        ]
    }

    fn source() -> MemorySource {
        let [p1, v1] = turn_events(1);
        let [p2, v2] = turn_events(2);
        MemorySource::new(CONTRACT)
            .with_game(1, state(2, true))
            .with_event(IndexedEvent::RegistrationOpen(RegistrationOpen {
                game_id: 1,
                block_timestamp: 900,
            }))
            .with_event(p1)
            .with_event(v1)
            .with_event(p2)
            .with_event(v2)
            .with_event(IndexedEvent::GameOver(GameOver {
                game_id: 1,
                players: players(),
                scores: vec![7, 6, 7],
                block_timestamp: 1_300,
            }))
    }

    /// Counts voting-results fetches.
    struct CountingSource {
        inner: MemorySource,
        voting_calls: AtomicUsize,
    }

    #[async_trait]
    impl GameDataSource for CountingSource {
        async fn game_state(&self, game: GameKey) -> Result<GameState, SourceError> {
            self.inner.game_state(game).await
        }
        async fn proposals_ended(&self, turn: TurnKey) -> Result<Vec<ProposalsEnded>, SourceError> {
            self.inner.proposals_ended(turn).await
        }
        async fn voting_results(&self, turn: TurnKey) -> Result<Vec<VotingResults>, SourceError> {
            self.voting_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.voting_results(turn).await
        }
        async fn registration_open(&self, game: GameKey) -> Result<Vec<RegistrationOpen>, SourceError> {
            self.inner.registration_open(game).await
        }
        async fn game_started(&self, game: GameKey) -> Result<Vec<GameStarted>, SourceError> {
            self.inner.game_started(game).await
        }
        async fn game_over(&self, game: GameKey) -> Result<Vec<GameOver>, SourceError> {
            self.inner.game_over(game).await
        }
    }

    /// Fails every event query.
    struct FailingSource;

    #[async_trait]
    impl GameDataSource for FailingSource {
        async fn game_state(&self, _: GameKey) -> Result<GameState, SourceError> {
            Ok(state(2, false))
        }
        async fn proposals_ended(&self, _: TurnKey) -> Result<Vec<ProposalsEnded>, SourceError> {
            Err(SourceError::Request("indexer timed out".into()))
        }
        async fn voting_results(&self, _: TurnKey) -> Result<Vec<VotingResults>, SourceError> {
            Err(SourceError::Request("indexer timed out".into()))
        }
        async fn registration_open(&self, _: GameKey) -> Result<Vec<RegistrationOpen>, SourceError> {
            Err(SourceError::Request("indexer timed out".into()))
        }
        async fn game_started(&self, _: GameKey) -> Result<Vec<GameStarted>, SourceError> {
            Err(SourceError::Request("indexer timed out".into()))
        }
        async fn game_over(&self, _: GameKey) -> Result<Vec<GameOver>, SourceError> {
            Err(SourceError::Request("indexer timed out".into()))
        }
    }

    #[tokio::test]
    async fn test_historic_turn() {
        let reader = InstanceReader::new(source(), CONTRACT, 1);
        let results = reader.historic_turn(1, 1).await.unwrap();

        let proposals: Vec<&str> = results.iter().map(|r| r.proposal.as_str()).collect();
        assert_eq!(proposals, vec!["first", "second", "third"]);

        // Idle player 3 adds sqrt(16) = 4 to everyone else.
        let scores: Vec<u64> = results.iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![3 + 4, 2 + 4, 0]);
        assert_eq!(results[0].player, players()[0]);
        assert!(results.iter().all(|r| r.block_timestamp == 1_201));
    }

    #[tokio::test]
    async fn test_junk_in_padding_slot_is_ignored() {
        let [p1, v1] = padded_turn_events(1, "junk");
        let source = MemorySource::new(CONTRACT)
            .with_game(1, state(2, false))
            .with_event(p1)
            .with_event(v1);

        let reader = InstanceReader::new(source, CONTRACT, 1);
        let results = reader.historic_turn(1, 1).await.unwrap();

        let proposals: Vec<&str> = results.iter().map(|r| r.proposal.as_str()).collect();
        assert_eq!(proposals, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_inconsistent_state_is_upstream() {
        let bad_state = GameState { min_players: 9, ..state(2, false) };
        let [p1, v1] = turn_events(1);
        let source = MemorySource::new(CONTRACT)
            .with_game(1, bad_state)
            .with_event(IndexedEvent::RegistrationOpen(RegistrationOpen {
                game_id: 1,
                block_timestamp: 900,
            }))
            .with_event(p1)
            .with_event(v1);

        let reader = InstanceReader::new(source, CONTRACT, 1);
        let err = reader.historic_turn(1, 1).await.unwrap_err();
        assert!(matches!(err, RankifyError::Upstream(SourceError::Malformed(_))));

        let err = reader.registration_deadline(1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UpstreamFailure);
    }

    #[tokio::test]
    async fn test_cache_evicts_smallest_turn_key() {
        let [p3, v3] = turn_events(3);
        let source = source().with_event(p3).with_event(v3);
        let reader = InstanceReader::new(source, CONTRACT, 1).with_cache(2);

        // Turn 3 is inserted first but turn 1 has the smaller key.
        reader.historic_turn(1, 3).await.unwrap();
        reader.historic_turn(1, 1).await.unwrap();
        reader.historic_turn(1, 2).await.unwrap();

        let cache = reader.cache.as_ref().unwrap().read().await;
        assert_eq!(cache.keys().map(|k| k.turn).collect::<Vec<_>>(), vec![2, 3]);
    }

    #[tokio::test]
    async fn test_missing_turn_is_not_found() {
        let reader = InstanceReader::new(source(), CONTRACT, 1);
        let err = reader.historic_turn(1, 5).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        match err {
            RankifyError::NotFound { event, location, found } => {
                assert_eq!(event, "ProposalsEnded");
                assert_eq!(location.game_id, 1);
                assert_eq!(location.turn, Some(5));
                assert_eq!(found, 0);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_duplicate_events_are_not_found() {
        let [p1, _] = turn_events(1);
        let reader = InstanceReader::new(source().with_event(p1), CONTRACT, 1);
        let err = reader.historic_turn(1, 1).await.unwrap_err();
        assert!(matches!(err, RankifyError::NotFound { found: 2, .. }));
    }

    #[tokio::test]
    async fn test_upstream_failure_propagates() {
        let reader = InstanceReader::new(FailingSource, CONTRACT, 1);
        let err = reader.historic_turn(1, 1).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::UpstreamFailure);
        assert!(err.to_string().contains("indexer timed out"));
    }

    #[tokio::test]
    async fn test_inconsistent_payload_is_upstream() {
        let [p1, v1] = turn_events(1);
        let IndexedEvent::VotingResults(mut voting) = v1 else {
            panic!("expected voting results");
        };
        voting.permutation = vec![0, 0, 1];
        let source = MemorySource::new(CONTRACT)
            .with_game(1, state(2, false))
            .with_event(p1)
            .with_event(IndexedEvent::VotingResults(voting));

        let reader = InstanceReader::new(source, CONTRACT, 1);
        let err = reader.historic_turn(1, 1).await.unwrap_err();
        assert!(matches!(err, RankifyError::Upstream(SourceError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_cache_hits() {
        let source = Arc::new(CountingSource { inner: source(), voting_calls: AtomicUsize::new(0) });
        let reader = InstanceReader::new(Arc::clone(&source), CONTRACT, 1).with_cache(1);

        let first = reader.historic_turn(1, 1).await.unwrap();
        let second = reader.historic_turn(1, 1).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(source.voting_calls.load(Ordering::SeqCst), 1);

        // Capacity 1: turn 2 evicts turn 1.
        reader.historic_turn(1, 2).await.unwrap();
        assert_eq!(reader.cached_turns().await, 1);
        reader.historic_turn(1, 1).await.unwrap();
        assert_eq!(source.voting_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_uncached_reader_refetches() {
        let source = Arc::new(CountingSource { inner: source(), voting_calls: AtomicUsize::new(0) });
        let reader = InstanceReader::new(Arc::clone(&source), CONTRACT, 1);

        reader.historic_turn(1, 1).await.unwrap();
        reader.historic_turn(1, 1).await.unwrap();
        assert_eq!(source.voting_calls.load(Ordering::SeqCst), 2);
        assert_eq!(reader.cached_turns().await, 0);
    }

    #[tokio::test]
    async fn test_game_history_and_standings() {
        let reader = InstanceReader::new(source(), CONTRACT, 1);

        let history = reader.game_history(1).await.unwrap();
        assert_eq!(history.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(history[&2][0].block_timestamp, 1_202);

        let standings = reader.final_standings(1).await.unwrap();
        let places: Vec<usize> = standings.iter().map(|s| s.place).collect();
        assert_eq!(places, vec![1, 1, 3]);

        assert_eq!(reader.game_phase(1).await.unwrap(), GamePhase::Finished);
        assert_eq!(reader.game_phase(2).await.unwrap(), GamePhase::NotFound);
        assert_eq!(reader.game_history(2).await.unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_registration_deadline() {
        let reader = InstanceReader::new(source(), CONTRACT, 1);
        let deadline = reader.registration_deadline(1).await.unwrap().unwrap();
        assert_eq!(deadline.timestamp(), 1_000);

        let err = reader.game_started(1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_keys_bound_to_instance() {
        let reader = InstanceReader::new(MemorySource::new(CONTRACT), CONTRACT, 31337);
        let secret = [7u8; 32];

        let key = reader.derive_key(&secret, 1, 2, Scope::DEFAULT);
        assert_eq!(key, derive_key(&secret, &KeyContext::new(1, 2, CONTRACT, 31337), Scope::DEFAULT));

        let other_chain = InstanceReader::new(MemorySource::new(CONTRACT), CONTRACT, 1);
        assert_ne!(key, other_chain.derive_key(&secret, 1, 2, Scope::DEFAULT));

        let mut sk1 = [0u8; 32];
        sk1[31] = 1;
        let mut sk2 = [0u8; 32];
        sk2[31] = 2;
        let pk1 = crate::crypto::shared::public_key_from_private(&sk1).unwrap();
        let pk2 = crate::crypto::shared::public_key_from_private(&sk2).unwrap();
        assert_eq!(
            reader.shared_key(&sk1, &pk2, 1, 2).unwrap(),
            reader.shared_key(&sk2, &pk1, 1, 2).unwrap()
        );
        assert_eq!(
            reader.shared_key(&[1u8; 31], &pk2, 1, 2).unwrap_err().kind(),
            ErrorKind::MalformedInput
        );
    }

    #[test]
    fn test_from_config() {
        let config = SdkConfig { contract: Some(CONTRACT), cache_turns: 8, ..Default::default() };
        let reader = InstanceReader::from_config(MemorySource::new(CONTRACT), &config).unwrap();
        assert_eq!(reader.contract(), CONTRACT);
        assert!(reader.cache.is_some());

        let missing = InstanceReader::from_config(MemorySource::new(CONTRACT), &SdkConfig::default());
        assert!(missing.is_err());
    }
}
