//! Mock implementations of core traits for testing.
//!
//! Provides lightweight stubs for reward functions and termination
//! conditions, plus preconfigured in-memory simulators.

use aviary_core::property::catalog;
use aviary_core::traits::{RewardFunction, TerminationCondition};
use aviary_core::types::{StepContext, TerminationKind};
use aviary_env::memory::{MemoryBus, MemorySimulation};

// ---------------------------------------------------------------------------
// Simulators
// ---------------------------------------------------------------------------

/// A simulator whose state never changes; only time advances.
pub fn frozen_sim() -> MemorySimulation {
    MemorySimulation::new()
}

/// A simulator that only moves control surfaces to their commands.
///
/// Attitude, position and speed stay at their initial values, which makes
/// steady-state reward levels and control-delta penalties easy to predict.
pub fn surfaces_sim() -> MemorySimulation {
    MemorySimulation::new().with_dynamics(follow_commands)
}

fn follow_commands(bus: &mut MemoryBus, _dt: f64) {
    let aileron = bus.value(&catalog::AILERON_CMD);
    bus.put(&catalog::AILERON_LEFT, aileron);
    bus.put(&catalog::AILERON_RIGHT, -aileron);
    bus.put(&catalog::ELEVATOR, bus.value(&catalog::ELEVATOR_CMD));
    bus.put(&catalog::RUDDER, bus.value(&catalog::RUDDER_CMD));
    bus.put(&catalog::THROTTLE, bus.value(&catalog::THROTTLE_CMD));
}

// ---------------------------------------------------------------------------
// ConstantReward
// ---------------------------------------------------------------------------

/// A reward function that always returns a fixed value.
pub struct ConstantReward {
    value: f64,
    label: &'static str,
}

impl ConstantReward {
    /// Create a reward function that always returns `value`.
    pub const fn new(value: f64) -> Self {
        Self {
            value,
            label: "ConstantReward",
        }
    }

    /// Create a reward function with a custom label.
    pub const fn with_label(value: f64, label: &'static str) -> Self {
        Self { value, label }
    }
}

impl RewardFunction for ConstantReward {
    fn compute(&self, _ctx: &StepContext<'_>) -> f64 {
        self.value
    }

    fn name(&self) -> &str {
        self.label
    }
}

// ---------------------------------------------------------------------------
// AlwaysTerminate / NeverTerminate
// ---------------------------------------------------------------------------

/// A termination condition that always signals termination.
pub struct AlwaysTerminate(pub TerminationKind);

impl Default for AlwaysTerminate {
    fn default() -> Self {
        Self(TerminationKind::Failure)
    }
}

impl TerminationCondition for AlwaysTerminate {
    fn is_terminated(&self, _ctx: &StepContext<'_>) -> bool {
        true
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "AlwaysTerminate"
    }

    fn kind(&self) -> TerminationKind {
        self.0
    }
}

/// A termination condition that never signals termination.
pub struct NeverTerminate;

impl TerminationCondition for NeverTerminate {
    fn is_terminated(&self, _ctx: &StepContext<'_>) -> bool {
        false
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "NeverTerminate"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
