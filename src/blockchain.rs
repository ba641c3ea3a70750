// Thin re-export module: implementation is in `blockchain/core.rs`, split into
// chain management, Merkle commitment, ledger state and validation.

pub mod core;
pub use self::core::*;
