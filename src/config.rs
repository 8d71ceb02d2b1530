//! SDK Configuration
//!
//! Read from environment variables, falling back to defaults:
//!
//! | Variable              | Meaning                          | Default |
//! |-----------------------|----------------------------------|---------|
//! | `RANKIFY_CHAIN_ID`    | Chain id mixed into derived keys | 1       |
//! | `RANKIFY_CONTRACT`    | Game contract address            | unset   |
//! | `RANKIFY_CACHE_TURNS` | Reconstructed turns to cache     | 0 (off) |
//! | `RANKIFY_SNAPSHOT`    | Snapshot path for the replay bin | unset   |

use std::path::PathBuf;

use thiserror::Error;

use crate::core::address::Address;
use crate::crypto::kdf::KeyContext;

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Variable set but unparseable.
    #[error("invalid {var}: {value:?}")]
    Invalid {
        /// Variable name.
        var: &'static str,
        /// Raw value.
        value: String,
    },

    /// Required value missing.
    #[error("missing {0}")]
    Missing(&'static str),
}

/// SDK configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdkConfig {
    /// Chain id.
    pub chain_id: u64,
    /// Game contract.
    pub contract: Option<Address>,
    /// Turn cache capacity, 0 disables caching.
    pub cache_turns: usize,
    /// Snapshot file.
    pub snapshot_path: Option<PathBuf>,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            chain_id: 1,
            contract: None,
            cache_turns: 0,
            snapshot_path: None,
        }
    }
}

impl SdkConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Create config from any variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            chain_id: parse_var(&lookup, "RANKIFY_CHAIN_ID")?.unwrap_or(defaults.chain_id),
            contract: parse_var(&lookup, "RANKIFY_CONTRACT")?,
            cache_turns: parse_var(&lookup, "RANKIFY_CACHE_TURNS")?.unwrap_or(defaults.cache_turns),
            snapshot_path: lookup("RANKIFY_SNAPSHOT").filter(|v| !v.is_empty()).map(PathBuf::from),
        })
    }

    /// Configured contract.
    pub fn require_contract(&self) -> Result<Address, ConfigError> {
        self.contract.ok_or(ConfigError::Missing("RANKIFY_CONTRACT"))
    }

    /// Derivation context for a game turn.
    pub fn key_context(&self, game_id: u64, turn: u64) -> Result<KeyContext, ConfigError> {
        Ok(KeyContext::new(game_id, turn, self.require_contract()?, self.chain_id))
    }
}

fn parse_var<T, F>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) if value.trim().is_empty() => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { var, value }),
    }
}
