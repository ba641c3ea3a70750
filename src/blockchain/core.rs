// core.rs splits responsibilities into submodules for easier maintenance.
pub mod chain;
pub mod merkle;
pub mod state;
pub mod validation;

pub use chain::*;
pub use merkle::*;
pub use state::*;
pub use validation::*;
