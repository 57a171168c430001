use crate::error::SimError;
use crate::property::{Property, catalog, merge_unique};
use crate::types::{InitialConditions, StepContext, Termination, TerminationKind};

// ---------------------------------------------------------------------------
// PropertyBus
// ---------------------------------------------------------------------------

/// Named scalar variables exposed by the simulator.
pub trait PropertyBus {
    /// Read the current value of `property`.
    fn get(&self, property: &Property) -> Result<f64, SimError>;

    /// Write `value` to `property` as-is.
    fn set(&mut self, property: &Property, value: f64) -> Result<(), SimError>;

    /// Clamp `value` into the property bounds, write it, and return what was written.
    fn set_clamped(&mut self, property: &Property, value: f64) -> Result<f64, SimError> {
        let value = property.clamp(value);
        self.set(property, value)?;
        Ok(value)
    }
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

/// The flight-dynamics delegate a task drives.
///
/// Implementations own their property bus. One task talks to one simulation;
/// vectorized setups create one simulation per task.
pub trait Simulation: PropertyBus + Send + 'static {
    /// Monotonic simulation time in seconds.
    fn sim_time(&self) -> f64;

    /// Load `conditions` and reset the integrator to time zero.
    fn initialize(&mut self, conditions: &InitialConditions) -> Result<(), SimError>;

    /// Advance the integrator by one step.
    fn run_one_step(&mut self) -> Result<(), SimError>;

    /// Fixed integrator step in seconds, if the simulation exposes one.
    fn step_size_s(&self) -> Option<f64> {
        None
    }

    fn start_engines(&mut self) -> Result<(), SimError> {
        self.set(&catalog::ALL_ENGINE_RUNNING, -1.0)
    }

    fn raise_landing_gear(&mut self) -> Result<(), SimError> {
        self.set(&catalog::GEAR_ALL_CMD, 0.0)?;
        self.set(&catalog::GEAR, 0.0)
    }

    /// Set throttle and mixture commands on the first engine, and on the
    /// second one when `engines > 1`.
    fn set_throttle_mixture_controls(
        &mut self,
        throttle: f64,
        mixture: f64,
        engines: u32,
    ) -> Result<(), SimError> {
        self.set_clamped(&catalog::THROTTLE_CMD, throttle)?;
        self.set_clamped(&catalog::MIXTURE_CMD, mixture)?;
        if engines > 1 {
            self.set_clamped(&catalog::THROTTLE_1_CMD, throttle)?;
            self.set_clamped(&catalog::MIXTURE_1_CMD, mixture)?;
        }
        Ok(())
    }

    /// Human-readable name for this simulation.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

// ---------------------------------------------------------------------------
// RewardFunction
// ---------------------------------------------------------------------------

/// Computes a scalar reward for one step.
pub trait RewardFunction: Send + Sync + 'static {
    fn compute(&self, ctx: &StepContext<'_>) -> f64;

    fn name(&self) -> &str;

    /// Properties this reward reads from snapshots.
    fn properties(&self) -> Vec<Property> {
        Vec::new()
    }
}

// ---------------------------------------------------------------------------
// TerminationCondition
// ---------------------------------------------------------------------------

/// Decides whether an episode must end after a step.
pub trait TerminationCondition: Send + Sync + 'static {
    fn is_terminated(&self, ctx: &StepContext<'_>) -> bool;

    fn name(&self) -> &str;

    fn kind(&self) -> TerminationKind {
        TerminationKind::Failure
    }

    /// Properties this condition reads from snapshots.
    fn properties(&self) -> Vec<Property> {
        Vec::new()
    }
}

// ---------------------------------------------------------------------------
// CompositeReward
// ---------------------------------------------------------------------------

/// A weighted combination of multiple reward functions.
///
/// The total reward is the sum of each component reward multiplied by its
/// weight, so a weighted arithmetic mean is a sum with weights that add up
/// to one. Use [`breakdown`](Self::breakdown) to inspect individual
/// contributions.
pub struct CompositeReward {
    rewards: Vec<(Box<dyn RewardFunction>, f64)>,
}

impl CompositeReward {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rewards: Vec::new(),
        }
    }

    /// Add a reward function with the given weight. Returns `self` for chaining.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn add(mut self, reward: Box<dyn RewardFunction>, weight: f64) -> Self {
        self.rewards.push((reward, weight));
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }

    /// Compute each component reward and return `(name, weighted_value)` pairs.
    pub fn breakdown(&self, ctx: &StepContext<'_>) -> Vec<(&str, f64)> {
        self.rewards
            .iter()
            .map(|(reward, weight)| (reward.name(), reward.compute(ctx) * weight))
            .collect()
    }
}

impl Default for CompositeReward {
    fn default() -> Self {
        Self::new()
    }
}

impl RewardFunction for CompositeReward {
    fn compute(&self, ctx: &StepContext<'_>) -> f64 {
        self.rewards
            .iter()
            .map(|(reward, weight)| reward.compute(ctx) * weight)
            .sum()
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "CompositeReward"
    }

    fn properties(&self) -> Vec<Property> {
        let mut props = Vec::new();
        for (reward, _) in &self.rewards {
            merge_unique(&mut props, reward.properties());
        }
        props
    }
}

// ---------------------------------------------------------------------------
// CompositeTermination
// ---------------------------------------------------------------------------

/// OR-composition of multiple termination conditions.
///
/// Conditions are checked in insertion order; the first one that fires is
/// reported by [`evaluate`](Self::evaluate).
pub struct CompositeTermination {
    conditions: Vec<Box<dyn TerminationCondition>>,
}

impl CompositeTermination {
    #[must_use]
    pub fn new() -> Self {
        Self {
            conditions: Vec::new(),
        }
    }

    /// Add a termination condition. Returns `self` for chaining.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn add(mut self, condition: Box<dyn TerminationCondition>) -> Self {
        self.conditions.push(condition);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Names of the contained conditions, in check order.
    pub fn names(&self) -> Vec<&str> {
        self.conditions.iter().map(|c| c.name()).collect()
    }

    /// The first condition that fires, if any.
    pub fn evaluate(&self, ctx: &StepContext<'_>) -> Option<Termination> {
        self.conditions
            .iter()
            .find(|condition| condition.is_terminated(ctx))
            .map(|condition| Termination::new(condition.name(), condition.kind()))
    }
}

impl Default for CompositeTermination {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminationCondition for CompositeTermination {
    fn is_terminated(&self, ctx: &StepContext<'_>) -> bool {
        self.conditions
            .iter()
            .any(|condition| condition.is_terminated(ctx))
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "CompositeTermination"
    }

    fn properties(&self) -> Vec<Property> {
        let mut props = Vec::new();
        for condition in &self.conditions {
            merge_unique(&mut props, condition.properties());
        }
        props
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::types::{EpisodeProgress, Snapshot, Targets};

    // -- Mock reward functions --

    struct ConstantReward {
        value: f64,
        label: &'static str,
    }

    impl ConstantReward {
        const fn new(value: f64, label: &'static str) -> Self {
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

        fn properties(&self) -> Vec<Property> {
            vec![catalog::ROLL_RAD]
        }
    }

    // -- Mock termination conditions --

    struct AlwaysTerminate(TerminationKind);

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

    struct NeverTerminate;

    impl TerminationCondition for NeverTerminate {
        fn is_terminated(&self, _ctx: &StepContext<'_>) -> bool {
            false
        }

        #[allow(clippy::unnecessary_literal_bound)]
        fn name(&self) -> &str {
            "NeverTerminate"
        }

        fn properties(&self) -> Vec<Property> {
            vec![catalog::ROLL_RAD, catalog::PITCH_RAD]
        }
    }

    // -- Minimal bus --

    #[derive(Default)]
    struct MapBus {
        values: HashMap<&'static str, f64>,
        known: Option<Vec<&'static str>>,
        time: f64,
    }

    impl PropertyBus for MapBus {
        fn get(&self, property: &Property) -> Result<f64, SimError> {
            self.values
                .get(property.name)
                .copied()
                .ok_or_else(|| SimError::UnknownProperty(property.name.into()))
        }

        fn set(&mut self, property: &Property, value: f64) -> Result<(), SimError> {
            if let Some(known) = &self.known {
                if !known.contains(&property.name) {
                    return Err(SimError::UnknownProperty(property.name.into()));
                }
            }
            self.values.insert(property.name, value);
            Ok(())
        }
    }

    impl Simulation for MapBus {
        fn sim_time(&self) -> f64 {
            self.time
        }

        fn initialize(&mut self, conditions: &InitialConditions) -> Result<(), SimError> {
            for (property, value) in conditions.iter() {
                self.set(property, value)?;
            }
            self.time = 0.0;
            Ok(())
        }

        fn run_one_step(&mut self) -> Result<(), SimError> {
            self.time += 1.0 / 60.0;
            Ok(())
        }
    }

    fn with_ctx<R>(f: impl FnOnce(&StepContext<'_>) -> R) -> R {
        let snapshot = Snapshot::new();
        let ctx = StepContext {
            previous: &snapshot,
            current: &snapshot,
            progress: EpisodeProgress::default(),
            targets: Targets::new(0.0, 0.0),
            initial: Targets::new(0.0, 0.0),
            sim_time_s: 0.0,
            retarget: None,
        };
        f(&ctx)
    }

    // ---- PropertyBus / Simulation tests ----

    #[test]
    fn set_clamped_writes_clamped_value() {
        let mut bus = MapBus::default();
        let written = bus.set_clamped(&catalog::AILERON_CMD, 3.0).unwrap();
        assert!((written - 1.0).abs() < f64::EPSILON);
        assert!((bus.get(&catalog::AILERON_CMD).unwrap() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn default_helpers_write_engine_and_gear() {
        let mut sim = MapBus::default();
        sim.start_engines().unwrap();
        sim.raise_landing_gear().unwrap();
        assert!((sim.get(&catalog::ALL_ENGINE_RUNNING).unwrap() + 1.0).abs() < f64::EPSILON);
        assert!(sim.get(&catalog::GEAR).unwrap().abs() < f64::EPSILON);
        assert!(sim.get(&catalog::GEAR_ALL_CMD).unwrap().abs() < f64::EPSILON);
    }

    #[test]
    fn throttle_mixture_single_engine_leaves_second_untouched() {
        let mut sim = MapBus::default();
        sim.set_throttle_mixture_controls(0.8, 1.0, 1).unwrap();
        assert!((sim.get(&catalog::THROTTLE_CMD).unwrap() - 0.8).abs() < f64::EPSILON);
        assert!(sim.get(&catalog::THROTTLE_1_CMD).is_err());
    }

    #[test]
    fn throttle_mixture_twin_engine_mirrors() {
        let mut sim = MapBus::default();
        sim.set_throttle_mixture_controls(0.6, 0.9, 2).unwrap();
        assert!((sim.get(&catalog::THROTTLE_1_CMD).unwrap() - 0.6).abs() < f64::EPSILON);
        assert!((sim.get(&catalog::MIXTURE_1_CMD).unwrap() - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn set_on_unknown_property_surfaces_error() {
        let mut sim = MapBus {
            known: Some(vec![catalog::THROTTLE_CMD.name, catalog::MIXTURE_CMD.name]),
            ..MapBus::default()
        };
        let err = sim.set_throttle_mixture_controls(0.5, 1.0, 2).unwrap_err();
        assert!(matches!(err, SimError::UnknownProperty(_)));
    }

    #[test]
    fn simulation_name_defaults_to_type_name() {
        let sim = MapBus::default();
        assert!(sim.name().contains("MapBus"));
    }

    // ---- CompositeReward tests ----

    #[test]
    fn composite_reward_empty_returns_zero() {
        let reward = CompositeReward::new();
        assert!(with_ctx(|ctx| reward.compute(ctx)).abs() < f64::EPSILON);
        assert!(reward.is_empty());
    }

    #[test]
    fn composite_reward_weighted_mean() {
        let reward = CompositeReward::new()
            .add(Box::new(ConstantReward::new(1.0, "heading")), 2.0 / 6.0)
            .add(Box::new(ConstantReward::new(0.5, "altitude")), 2.0 / 6.0)
            .add(Box::new(ConstantReward::new(-0.4, "penalty")), 1.0 / 6.0)
            .add(Box::new(ConstantReward::new(0.1, "survival")), 1.0 / 6.0);
        // (2*1.0 + 2*0.5 - 0.4 + 0.1) / 6 = 2.7 / 6
        let value = with_ctx(|ctx| reward.compute(ctx));
        assert!((value - 0.45).abs() < 1e-12);
    }

    #[test]
    fn composite_reward_breakdown() {
        let reward = CompositeReward::new()
            .add(Box::new(ConstantReward::new(3.0, "a")), 2.0)
            .add(Box::new(ConstantReward::new(1.0, "b")), 0.5);
        let parts = with_ctx(|ctx| {
            reward
                .breakdown(ctx)
                .into_iter()
                .map(|(n, v)| (n.to_string(), v))
                .collect::<Vec<_>>()
        });
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].0, "a");
        assert!((parts[0].1 - 6.0).abs() < f64::EPSILON);
        assert!((parts[1].1 - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn composite_reward_merges_properties() {
        let reward = CompositeReward::new()
            .add(Box::new(ConstantReward::new(1.0, "a")), 1.0)
            .add(Box::new(ConstantReward::new(1.0, "b")), 1.0);
        assert_eq!(reward.properties(), vec![catalog::ROLL_RAD]);
        assert_eq!(reward.name(), "CompositeReward");
    }

    // ---- CompositeTermination tests ----

    #[test]
    fn composite_termination_empty_returns_none() {
        let term = CompositeTermination::new();
        assert!(with_ctx(|ctx| term.evaluate(ctx)).is_none());
        assert!(!with_ctx(|ctx| term.is_terminated(ctx)));
    }

    #[test]
    fn composite_termination_reports_first_firing() {
        let term = CompositeTermination::new()
            .add(Box::new(NeverTerminate))
            .add(Box::new(AlwaysTerminate(TerminationKind::Success)))
            .add(Box::new(AlwaysTerminate(TerminationKind::Failure)));
        let fired = with_ctx(|ctx| term.evaluate(ctx)).unwrap();
        assert_eq!(fired.name, "AlwaysTerminate");
        assert_eq!(fired.kind, TerminationKind::Success);
        assert!(with_ctx(|ctx| term.is_terminated(ctx)));
    }

    #[test]
    fn composite_termination_all_false() {
        let term = CompositeTermination::new()
            .add(Box::new(NeverTerminate))
            .add(Box::new(NeverTerminate));
        assert!(with_ctx(|ctx| term.evaluate(ctx)).is_none());
        assert_eq!(term.names(), vec!["NeverTerminate", "NeverTerminate"]);
    }

    #[test]
    fn composite_termination_merges_properties() {
        let term = CompositeTermination::new()
            .add(Box::new(NeverTerminate))
            .add(Box::new(NeverTerminate));
        assert_eq!(
            term.properties(),
            vec![catalog::ROLL_RAD, catalog::PITCH_RAD]
        );
    }

    #[test]
    fn traits_are_object_safe_and_send_sync() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn RewardFunction>();
        assert_send_sync::<dyn TerminationCondition>();
        assert_send_sync::<CompositeReward>();
        assert_send_sync::<CompositeTermination>();
    }
}
