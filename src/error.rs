//! Error types for AevumChain

use crate::Amount;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChainError {
    #[error("Transaction signature failed to verify")]
    InvalidSignature,

    #[error("Transaction value {0} is negative")]
    NegativeValue(Amount),

    #[error("Transaction inputs too small: {total} (minimum {minimum})")]
    BelowMinimumTransfer { total: Amount, minimum: Amount },

    #[error("Referenced input {0} is not in the UTXO set")]
    UnresolvedInput(String),

    #[error("Not enough funds: balance {balance}, requested {requested}")]
    InsufficientFunds { balance: Amount, requested: Amount },

    #[error("Invalid block: {0}")]
    InvalidBlock(String),

    #[error("Invalid chain at block {height}: {reason}")]
    InvalidChain { height: usize, reason: String },

    #[error("Mining cancelled after {attempts} attempts")]
    MiningCancelled { attempts: u64 },

    #[error("Cryptographic error: {0}")]
    Crypto(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl ChainError {
    /// True for the expected, recoverable rejections of a single transaction.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            ChainError::InvalidSignature
                | ChainError::NegativeValue(_)
                | ChainError::BelowMinimumTransfer { .. }
                | ChainError::UnresolvedInput(_)
                | ChainError::InsufficientFunds { .. }
        )
    }
}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for ChainError {
    fn from(err: toml::de::Error) -> Self {
        ChainError::Config(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;
