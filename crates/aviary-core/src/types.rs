use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, SimError, SpaceError, ValidationError};
use crate::geo;
use crate::property::{Property, catalog};
use crate::traits::PropertyBus;

// ---------------------------------------------------------------------------
// Targets
// ---------------------------------------------------------------------------

/// Heading and altitude the task currently wants the aircraft to hold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Targets {
    pub heading_deg: f64,
    pub altitude_ft: f64,
}

impl Targets {
    #[must_use]
    pub const fn new(heading_deg: f64, altitude_ft: f64) -> Self {
        Self {
            heading_deg,
            altitude_ft,
        }
    }

    /// Heading wrapped into `[0, 360)` and altitude clamped to the target
    /// altitude property bounds.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            heading_deg: geo::wrap_heading_deg(self.heading_deg),
            altitude_ft: catalog::TARGET_ALTITUDE_FT.clamp(self.altitude_ft),
        }
    }
}

/// A single target mutation, recorded when a scheduler fires.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetChange {
    /// Simulation time at which the change was applied.
    pub time_s: f64,
    /// Episode step (1-based) during which the change was applied.
    pub step: u32,
    pub before: Targets,
    pub after: Targets,
}

// ---------------------------------------------------------------------------
// InitialConditions
// ---------------------------------------------------------------------------

/// Ordered `{property -> value}` mapping applied to the simulator at reset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InitialConditions {
    values: Vec<(Property, f64)>,
}

impl InitialConditions {
    #[must_use]
    pub const fn new() -> Self {
        Self { values: Vec::new() }
    }

    /// Insert or replace the value for `property`. Bounded properties are clamped.
    pub fn set(&mut self, property: Property, value: f64) {
        let value = property.clamp(value);
        if let Some(slot) = self.values.iter_mut().find(|(p, _)| p.name == property.name) {
            slot.1 = value;
        } else {
            self.values.push((property, value));
        }
    }

    /// Builder-style [`set`](Self::set).
    #[must_use]
    pub fn with(mut self, property: Property, value: f64) -> Self {
        self.set(property, value);
        self
    }

    #[must_use]
    pub fn get(&self, property: &Property) -> Option<f64> {
        self.values
            .iter()
            .find(|(p, _)| p.name == property.name)
            .map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Property, f64)> {
        self.values.iter().map(|(p, v)| (p, *v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Fail with [`ConfigError::MissingField`] for the first absent key.
    pub fn require(&self, required: &[Property]) -> Result<(), ConfigError> {
        match required.iter().find(|p| self.get(p).is_none()) {
            Some(missing) => Err(ConfigError::MissingField(missing.name.to_string())),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Values of every tracked property captured at one instant.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    values: BTreeMap<&'static str, f64>,
}

impl Snapshot {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }

    /// Read every property in `properties` from the bus.
    pub fn capture<B: PropertyBus + ?Sized>(
        bus: &B,
        properties: &[Property],
    ) -> Result<Self, SimError> {
        let mut snapshot = Self::new();
        for property in properties {
            snapshot.insert(*property, bus.get(property)?);
        }
        Ok(snapshot)
    }

    #[must_use]
    pub fn from_pairs(pairs: &[(Property, f64)]) -> Self {
        let mut snapshot = Self::new();
        for (property, value) in pairs {
            snapshot.insert(*property, *value);
        }
        snapshot
    }

    pub fn insert(&mut self, property: Property, value: f64) {
        self.values.insert(property.name, value);
    }

    #[must_use]
    pub fn get(&self, property: &Property) -> Option<f64> {
        self.values.get(property.name).copied()
    }

    /// Value of `property`, or `0.0` when it was not captured.
    #[must_use]
    pub fn value(&self, property: &Property) -> f64 {
        self.get(property).unwrap_or(0.0)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Names of captured properties whose value is NaN or infinite.
    #[must_use]
    pub fn non_finite(&self) -> Vec<&'static str> {
        self.values
            .iter()
            .filter(|(_, v)| !v.is_finite())
            .map(|(k, _)| *k)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// EpisodeProgress / StepContext
// ---------------------------------------------------------------------------

/// Step bookkeeping handed to rewards, terminations and schedulers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EpisodeProgress {
    /// 1-based index of the current episode.
    pub episode_index: u64,
    pub step_budget: u32,
    pub steps_left: u32,
    /// Steps taken so far in this episode.
    pub step_count: u32,
}

/// Everything a reward or termination may look at for one step.
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    /// Snapshot taken at the end of the previous step (or at reset).
    pub previous: &'a Snapshot,
    /// Snapshot taken after this step's integration.
    pub current: &'a Snapshot,
    pub progress: EpisodeProgress,
    /// Targets in effect after this step's scheduling.
    pub targets: Targets,
    /// Heading and altitude at the start of the episode.
    pub initial: Targets,
    pub sim_time_s: f64,
    /// Set when the target scheduler fired during this step.
    pub retarget: Option<&'a TargetChange>,
}

// ---------------------------------------------------------------------------
// Termination
// ---------------------------------------------------------------------------

/// How an episode ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationKind {
    /// An error bound or catastrophic-state check fired.
    Failure,
    /// The objective was reached.
    Success,
    /// The step budget ran out.
    TimeLimit,
}

/// The condition that ended an episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Termination {
    pub name: String,
    pub kind: TerminationKind,
}

impl Termination {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: TerminationKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Time-limit endings are truncations; everything else terminates.
    #[must_use]
    pub const fn is_truncation(&self) -> bool {
        matches!(self.kind, TerminationKind::TimeLimit)
    }
}

// ---------------------------------------------------------------------------
// Observation
// ---------------------------------------------------------------------------

/// State-variable values followed by auxiliary values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    values: Vec<f64>,
    state_dim: usize,
}

impl Observation {
    #[must_use]
    pub fn new(state: Vec<f64>, auxiliary: &[f64]) -> Self {
        let state_dim = state.len();
        let mut values = state;
        values.extend_from_slice(auxiliary);
        Self { values, state_dim }
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// The state-variable part, in declaration order.
    #[must_use]
    pub fn state(&self) -> &[f64] {
        &self.values[..self.state_dim]
    }

    /// The auxiliary part (latitude, longitude, steps left).
    #[must_use]
    pub fn auxiliary(&self) -> &[f64] {
        &self.values[self.state_dim..]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn has_non_finite(&self) -> bool {
        self.values.iter().any(|v| !v.is_finite())
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<f64> {
        self.values
    }
}

impl std::ops::Index<usize> for Observation {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.values[index]
    }
}

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

/// Control commands, one per action variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    values: Vec<f64>,
}

impl Action {
    #[must_use]
    pub const fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    #[must_use]
    pub fn zeros(len: usize) -> Self {
        Self {
            values: vec![0.0; len],
        }
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Check dimension and reject NaN / Inf commands.
    pub fn validate(&self, expected_dim: usize) -> Result<(), ValidationError> {
        if self.values.len() != expected_dim {
            return Err(ValidationError::ActionDimMismatch {
                expected: expected_dim,
                got: self.values.len(),
            });
        }
        for v in &self.values {
            if v.is_nan() {
                return Err(ValidationError::ActionContainsNan);
            }
            if v.is_infinite() {
                return Err(ValidationError::ActionContainsInf);
            }
        }
        Ok(())
    }
}

impl From<Vec<f64>> for Action {
    fn from(values: Vec<f64>) -> Self {
        Self::new(values)
    }
}

// ---------------------------------------------------------------------------
// BoxSpace
// ---------------------------------------------------------------------------

/// Axis-aligned box of per-dimension bounds. Unbounded dimensions use +-inf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxSpace {
    pub low: Vec<f64>,
    pub high: Vec<f64>,
}

impl BoxSpace {
    pub fn new(low: Vec<f64>, high: Vec<f64>) -> Result<Self, SpaceError> {
        if low.len() != high.len() {
            return Err(SpaceError::DimensionMismatch {
                low: low.len(),
                high: high.len(),
            });
        }
        if let Some(dim) = low.iter().zip(&high).position(|(lo, hi)| lo > hi) {
            return Err(SpaceError::InvertedBounds { dim });
        }
        Ok(Self { low, high })
    }

    /// Box built from the bounds of each property, in order.
    #[must_use]
    pub fn from_properties(properties: &[Property]) -> Self {
        Self {
            low: properties.iter().map(Property::min).collect(),
            high: properties.iter().map(Property::max).collect(),
        }
    }

    #[must_use]
    pub fn shape(&self) -> Vec<usize> {
        vec![self.low.len()]
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.low.len()
    }

    #[must_use]
    pub fn contains(&self, values: &[f64]) -> bool {
        values.len() == self.low.len()
            && values
                .iter()
                .zip(self.low.iter().zip(&self.high))
                .all(|(v, (lo, hi))| (*lo..=*hi).contains(v))
    }

    /// Uniform sample inside the box. Unbounded dimensions sample `0.0`.
    pub fn sample(&self, rng: &mut impl rand::Rng) -> Vec<f64> {
        self.low
            .iter()
            .zip(&self.high)
            .map(|(lo, hi)| {
                if lo.is_finite() && hi.is_finite() && lo < hi {
                    rng.gen_range(*lo..=*hi)
                } else if lo.is_finite() && hi.is_finite() {
                    *lo
                } else {
                    0.0
                }
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Step / Reset Results
// ---------------------------------------------------------------------------

/// Result of `step()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub observation: Observation,
    pub reward: f64,
    /// Ended by a failure or success condition.
    pub terminated: bool,
    /// Ended because the step budget ran out.
    pub truncated: bool,
    pub info: StepInfo,
}

impl StepResult {
    #[must_use]
    pub const fn done(&self) -> bool {
        self.terminated || self.truncated
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepInfo {
    pub episode_length: u32,
    pub episode_reward: f64,
    pub steps_left: u32,
    pub targets: Option<Targets>,
    pub termination: Option<Termination>,
    pub target_change: Option<TargetChange>,
    pub custom: HashMap<String, f64>,
}

/// Result of `reset()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetResult {
    pub observation: Observation,
    pub info: ResetInfo,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResetInfo {
    pub seed: Option<u64>,
    pub episode_index: u64,
    pub targets: Option<Targets>,
    pub custom: HashMap<String, f64>,
}
