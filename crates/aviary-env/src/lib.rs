//! Episode lifecycle, target scheduling and preset tasks for aviary.
//!
//! [`FlightTask`] runs the per-episode state machine over any
//! [`Simulation`](aviary_core::traits::Simulation); [`FlightEnv`] pairs it
//! with a simulation and exposes the `reset`/`step` API. [`MemorySimulation`]
//! is a property-bus simulator held entirely in memory.

pub mod env;
pub mod episode;
pub mod layout;
pub mod memory;
pub mod presets;
pub mod schedule;
pub mod stats;
pub mod task;

pub use env::FlightEnv;
pub use memory::MemorySimulation;
pub use presets::build_task;
pub use task::FlightTask;

pub mod prelude {
    pub use crate::env::FlightEnv;
    pub use crate::episode::{EpisodeState, TaskPhase};
    pub use crate::layout::VariableLayout;
    pub use crate::memory::{MemoryBus, MemorySimulation, point_mass_dynamics};
    pub use crate::presets::build_task;
    pub use crate::schedule::{
        FixedTargets, PeriodicRetarget, ScheduleState, SingleRetarget, TargetScheduler,
    };
    pub use crate::stats::EpisodeStats;
    pub use crate::task::FlightTask;
}
