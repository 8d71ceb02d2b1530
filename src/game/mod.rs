//! Game Logic Module
//!
//! Pure, synchronous game logic. Nothing here touches the network.
//!
//! ## Module Structure
//!
//! - `phase`: Phase classification from on-chain flags
//! - `state`: Game/turn keys and the typed on-chain state
//! - `events`: Indexed contract events, validated on ingress
//! - `turn`: Historic turn reconstruction
//! - `standings`: Final placings from a finished game

pub mod phase;
pub mod state;
pub mod events;
pub mod turn;
pub mod standings;

// Re-export key types
pub use phase::{classify_game_phase, GamePhase, PhaseFlags};
pub use state::{GameKey, GameState, TurnKey};
pub use events::{GameOver, GameStarted, IndexedEvent, ProposalsEnded, RegistrationOpen, VotingResults};
pub use turn::{max_votes, reconstruct_turn, PlayerTurnResult, TurnInput, VoteContribution};
pub use standings::{final_standings, winners, Standing};
