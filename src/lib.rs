//! AevumChain - an in-memory educational UTXO ledger
//!
//! # Architecture
//!
//! ## Core Ledger
//! - [`blockchain`] - Blocks, the chain context, Merkle roots, the UTXO ledger and chain validation
//! - [`transaction`] - Transaction types and settlement against the ledger
//! - [`miner`] - Cancellable proof-of-work search
//!
//! ## Cryptography
//! - [`crypto`] - SHA-256 digests and secp256k1 signatures
//!
//! ## Key Management
//! - [`wallet`] - Wallet keys, balances and input selection
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types

#![forbid(unsafe_code)]

// ============================================================================
// Core Ledger
// ============================================================================
pub mod blockchain;
pub mod miner;
pub mod transaction;

// ============================================================================
// Cryptography
// ============================================================================
pub mod crypto;

// ============================================================================
// Key Management
// ============================================================================
pub mod wallet;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod config;
pub mod error;

pub use error::{ChainError, Result};
pub use transaction::Amount;
