// aviary-core: Types, traits, config, properties, rewards, terminations and errors for aviary flight tasks.

pub mod config;
pub mod error;
pub mod geo;
pub mod property;
pub mod rewards;
pub mod seed;
pub mod terminations;
pub mod traits;
pub mod types;

pub mod prelude {
    pub use crate::config::{TaskConfig, TaskKind};
    pub use crate::error::{
        AviaryError, ConfigError, SimError, SpaceError, TaskError, ValidationError,
    };
    pub use crate::geo::{GeodeticPosition, Vector2, heading_error_deg, wrap_heading_deg};
    pub use crate::property::{Property, Unit, catalog};
    pub use crate::rewards::{ErrorSignal, HeadingReference, SnapshotSource};
    pub use crate::seed::{SeedHierarchy, Subsystem};
    pub use crate::traits::{
        CompositeReward, CompositeTermination, PropertyBus, RewardFunction, Simulation,
        TerminationCondition,
    };
    pub use crate::types::{
        Action, BoxSpace, EpisodeProgress, InitialConditions, Observation, ResetInfo,
        ResetResult, Snapshot, StepContext, StepInfo, StepResult, TargetChange, Targets,
        Termination, TerminationKind,
    };
}
