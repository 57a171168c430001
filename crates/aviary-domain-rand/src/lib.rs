//! Per-episode randomization for aviary.
//!
//! [`RandomizationRange`] describes how one scalar is drawn;
//! [`InitialConditionGenerator`] turns a task configuration and a seeded RNG
//! into the initial-condition mapping and targets of an episode.

pub mod initial;
pub mod ranges;

pub use initial::{EpisodeStart, InitialConditionGenerator, TargetPolicy};
pub use ranges::{RandomizationRange, RangeError};

pub mod prelude {
    pub use crate::initial::{EpisodeStart, InitialConditionGenerator, TargetPolicy};
    pub use crate::ranges::{RandomizationRange, RangeError};
}
