//! # Stakecast Consensus
//!
//! The stake-weighted consensus round engine. A round moves through four
//! phases in strict sequence:
//!
//! 1. **select** a proposer, each validator weighted by its stake;
//! 2. **propose** a candidate block over the shared chain view;
//! 3. **validate** the candidate on every reachable peer in parallel;
//! 4. **finalize** when attesting stake strictly exceeds the configured
//!    share of total stake, otherwise discard.
//!
//! Offline faults for the proposer and for individual validators are
//! injected from the engine's seeded RNG, so whole runs replay
//! deterministically from a seed.

pub mod config;
pub mod engine;
pub mod outcome;
pub mod selection;
pub mod validator;

pub use config::*;
pub use engine::*;
pub use outcome::*;
pub use selection::*;
pub use validator::*;
