//! Transaction module split into types and settlement for better modularity

pub mod types;
pub mod validation;

pub use types::*;
