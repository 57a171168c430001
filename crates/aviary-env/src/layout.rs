//! Observation and action layouts.

use aviary_core::config::TaskConfig;
use aviary_core::error::ConfigError;
use aviary_core::property::{Property, catalog, merge_unique};
use aviary_core::types::{BoxSpace, Observation, Snapshot};

/// Appended to every observation after the state variables.
pub const AUXILIARY: [Property; 3] = [
    catalog::LAT_GEOD_DEG,
    catalog::LNG_GEOC_DEG,
    catalog::STEPS_LEFT,
];

/// Ordered state and action variables, fixed for the lifetime of a task.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableLayout {
    state: Vec<Property>,
    action: Vec<Property>,
}

impl VariableLayout {
    #[must_use]
    pub const fn new(state: Vec<Property>, action: Vec<Property>) -> Self {
        Self { state, action }
    }

    pub fn from_config(config: &TaskConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(
            config.state_properties()?,
            config.action_properties()?,
        ))
    }

    #[must_use]
    pub fn state(&self) -> &[Property] {
        &self.state
    }

    #[must_use]
    pub fn action(&self) -> &[Property] {
        &self.action
    }

    #[must_use]
    pub fn observation_dim(&self) -> usize {
        self.state.len() + AUXILIARY.len()
    }

    #[must_use]
    pub fn action_dim(&self) -> usize {
        self.action.len()
    }

    /// Properties a snapshot must hold to build an observation.
    #[must_use]
    pub fn tracked(&self) -> Vec<Property> {
        let mut props = self.state.clone();
        merge_unique(&mut props, AUXILIARY);
        merge_unique(&mut props, self.action.iter().copied());
        props
    }

    /// State values in declaration order, then latitude, longitude and
    /// `steps_left`.
    #[must_use]
    pub fn observe(&self, snapshot: &Snapshot, steps_left: u32) -> Observation {
        let state = self.state.iter().map(|p| snapshot.value(p)).collect();
        Observation::new(
            state,
            &[
                snapshot.value(&catalog::LAT_GEOD_DEG),
                snapshot.value(&catalog::LNG_GEOC_DEG),
                f64::from(steps_left),
            ],
        )
    }

    /// Box bounded by each variable's property bounds; `steps_left` lies in
    /// `[0, step_budget]`.
    #[must_use]
    pub fn observation_space(&self, step_budget: u32) -> BoxSpace {
        let mut space = BoxSpace::from_properties(&self.state);
        for property in &AUXILIARY[..2] {
            space.low.push(property.min());
            space.high.push(property.max());
        }
        space.low.push(0.0);
        space.high.push(f64::from(step_budget));
        space
    }

    #[must_use]
    pub fn action_space(&self) -> BoxSpace {
        BoxSpace::from_properties(&self.action)
    }
}
