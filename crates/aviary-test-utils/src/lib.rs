//! Shared test fixtures and utilities for aviary crates.
//!
//! Provides mock simulators, stub reward and termination functions,
//! deterministic RNG setup and episode-driving helpers.

pub mod episodes;
pub mod mocks;
pub mod rng;

// ---------------------------------------------------------------------------
// Re-exports for convenience
// ---------------------------------------------------------------------------

pub use episodes::{neutral_action, run_until_done, step_n};
pub use mocks::{AlwaysTerminate, ConstantReward, NeverTerminate, frozen_sim, surfaces_sim};
pub use rng::{deterministic_vec, seeded_rng};
