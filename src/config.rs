//! Configuration management for AevumChain

use crate::blockchain::OddLeafPolicy;
use crate::error::ChainError;
use crate::miner::{DEFAULT_POLL_INTERVAL, MAX_DIFFICULTY};
use crate::transaction::Amount;
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub merkle: MerkleConfig,
    #[serde(default)]
    pub mining: MiningConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    #[serde(default = "default_difficulty")]
    pub difficulty: usize,
    #[serde(default = "default_min_transaction")]
    pub min_transaction: f64,
    #[serde(default = "default_miner_reward")]
    pub miner_reward: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MerkleConfig {
    #[serde(default)]
    pub odd_leaf: OddLeafPolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MiningConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            difficulty: default_difficulty(),
            min_transaction: default_min_transaction(),
            miner_reward: default_miner_reward(),
        }
    }
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
        }
    }
}

fn default_difficulty() -> usize {
    3
}

fn default_min_transaction() -> f64 {
    0.1
}

fn default_miner_reward() -> f64 {
    50.0
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL
}

fn to_amount(field: &str, value: f64) -> Result<Amount, ChainError> {
    Amount::checked_from_num(value)
        .ok_or_else(|| ChainError::Config(format!("{} = {} is not a representable amount", field, value)))
}

impl ChainConfig {
    pub fn min_transaction_amount(&self) -> Result<Amount, ChainError> {
        to_amount("chain.min_transaction", self.min_transaction)
    }

    pub fn miner_reward_amount(&self) -> Result<Amount, ChainError> {
        to_amount("chain.miner_reward", self.miner_reward)
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ChainError> {
        if self.chain.difficulty > MAX_DIFFICULTY {
            return Err(ChainError::Config(format!(
                "chain.difficulty must be at most {}, got {}",
                MAX_DIFFICULTY, self.chain.difficulty
            )));
        }
        if self.chain.min_transaction_amount()? < Amount::from_num(0) {
            return Err(ChainError::Config("chain.min_transaction cannot be negative".to_string()));
        }
        if self.chain.miner_reward_amount()? <= Amount::from_num(0) {
            return Err(ChainError::Config("chain.miner_reward must be greater than zero".to_string()));
        }
        if self.mining.poll_interval == 0 {
            return Err(ChainError::Config("mining.poll_interval must be greater than zero".to_string()));
        }
        Ok(())
    }
}

/// Loads `path`, falling back to defaults when the file is missing or empty.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ChainError> {
    let config_str = match fs::read_to_string(path.as_ref()) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };

    let config: Config = if config_str.trim().is_empty() {
        Config::default()
    } else {
        toml::from_str(&config_str)?
    };

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.chain.difficulty, 3);
        assert_eq!(config.chain.miner_reward, 50.0);
        assert_eq!(config.merkle.odd_leaf, OddLeafPolicy::Drop);
        assert_eq!(config.mining.poll_interval, DEFAULT_POLL_INTERVAL);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let file = write_config(
            r#"
            [chain]
            difficulty = 1

            [merkle]
            odd_leaf = "duplicate"
            "#,
        );
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.chain.difficulty, 1);
        assert_eq!(config.chain.min_transaction, 0.1);
        assert_eq!(config.merkle.odd_leaf, OddLeafPolicy::Duplicate);
    }

    #[test]
    fn test_difficulty_above_hash_length_rejected() {
        let file = write_config("[chain]\ndifficulty = 65\n");
        assert!(matches!(load_config(file.path()), Err(ChainError::Config(_))));
    }

    #[test]
    fn test_non_positive_reward_rejected() {
        let file = write_config("[chain]\nminer_reward = 0.0\n");
        assert!(matches!(load_config(file.path()), Err(ChainError::Config(_))));
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let file = write_config("[mining]\npoll_interval = 0\n");
        assert!(matches!(load_config(file.path()), Err(ChainError::Config(_))));
    }

    #[test]
    fn test_malformed_toml_rejected() {
        let file = write_config("[chain\ndifficulty = ");
        assert!(matches!(load_config(file.path()), Err(ChainError::Config(_))));
    }
}
