//! Rankify Replay
//!
//! Loads an indexer snapshot and logs every game it contains: phase,
//! each finished turn in true player order, and final standings.
//!
//! Usage: `rankify-replay [SNAPSHOT]` (or set `RANKIFY_SNAPSHOT`).

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use rankify::{
    config::SdkConfig,
    source::{InstanceReader, MemorySource},
    VERSION,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Rankify Replay v{}", VERSION);

    let mut config = SdkConfig::from_env().context("reading configuration")?;
    if let Some(path) = std::env::args().nth(1) {
        config.snapshot_path = Some(path.into());
    }
    let path = config
        .snapshot_path
        .clone()
        .context("no snapshot given: pass a path or set RANKIFY_SNAPSHOT")?;

    let source = MemorySource::from_path(&path)
        .with_context(|| format!("loading snapshot {}", path.display()))?;
    if config.contract.is_none() {
        config.contract = Some(source.contract());
    }
    let game_ids: Vec<u64> = source.game_ids().collect();

    let reader = InstanceReader::from_config(source, &config)?;
    info!("Contract {} on chain {}: {} games", reader.contract(), reader.chain_id(), game_ids.len());

    for game_id in game_ids {
        replay_game(&reader, game_id).await?;
    }

    Ok(())
}

/// Log one game.
async fn replay_game(reader: &InstanceReader<MemorySource>, game_id: u64) -> Result<()> {
    let phase = reader.game_phase(game_id).await?;
    info!("=== Game {} ({}) ===", game_id, phase);

    let history = match reader.game_history(game_id).await {
        Ok(history) => history,
        Err(e) => {
            warn!("Game {}: cannot reconstruct turns: {}", game_id, e);
            return Ok(());
        }
    };

    for (turn, results) in &history {
        info!("Turn {}", turn);
        for result in results {
            info!(
                "  {} scored {:>3} ({} voters) for {:?}",
                result.player.short(),
                result.score,
                result.score_list.len(),
                result.proposal
            );
        }
    }

    if phase.is_terminal() {
        info!("=== Final Standings ===");
        for standing in reader.final_standings(game_id).await? {
            info!("#{}: {} - Score: {}", standing.place, standing.player, standing.score);
        }
    }

    Ok(())
}
