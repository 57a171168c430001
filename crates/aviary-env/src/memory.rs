//! In-memory simulator.
//!
//! [`MemorySimulation`] keeps the property bus in a hash map and advances
//! time by a fixed `dt`. What happens to the state on each integration step
//! is up to an optional dynamics closure; [`point_mass_dynamics`] is a
//! coarse kinematic model good enough for headless runs and smoke tests.

use std::collections::HashMap;
use std::f64::consts::FRAC_PI_2;

use aviary_core::error::SimError;
use aviary_core::geo::wrap_heading_deg;
use aviary_core::property::{Property, catalog};
use aviary_core::traits::{PropertyBus, Simulation};
use aviary_core::types::InitialConditions;

/// Integration step used unless overridden (60 Hz).
pub const DEFAULT_DT: f64 = 1.0 / 60.0;

/// Feet per degree of latitude, close enough for short flights.
const FEET_PER_DEG_LAT: f64 = 364_000.0;

const STANDARD_GRAVITY_FPS2: f64 = 32.174;

// ---------------------------------------------------------------------------
// MemoryBus
// ---------------------------------------------------------------------------

/// Hash-map property bus.
///
/// Unset properties read as `0.0` unless the bus is strict, in which case
/// reading or writing a property outside the known set fails with
/// [`SimError::UnknownProperty`].
#[derive(Debug, Clone, Default)]
pub struct MemoryBus {
    values: HashMap<&'static str, f64>,
    known: Option<Vec<&'static str>>,
}

impl MemoryBus {
    /// Value of `property`, or `0.0` when unset.
    #[must_use]
    pub fn value(&self, property: &Property) -> f64 {
        self.values.get(property.name).copied().unwrap_or(0.0)
    }

    /// Write without the strictness check.
    pub fn put(&mut self, property: &Property, value: f64) {
        self.values.insert(property.name, value);
    }

    #[must_use]
    pub fn contains(&self, property: &Property) -> bool {
        self.values.contains_key(property.name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn check(&self, property: &Property) -> Result<(), SimError> {
        match &self.known {
            Some(known) if !known.contains(&property.name) => {
                Err(SimError::UnknownProperty(property.name.into()))
            }
            _ => Ok(()),
        }
    }
}

impl PropertyBus for MemoryBus {
    fn get(&self, property: &Property) -> Result<f64, SimError> {
        self.check(property)?;
        Ok(self.value(property))
    }

    fn set(&mut self, property: &Property, value: f64) -> Result<(), SimError> {
        self.check(property)?;
        self.put(property, value);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemorySimulation
// ---------------------------------------------------------------------------

/// Per-step state update applied by [`MemorySimulation::run_one_step`].
pub type Dynamics = Box<dyn FnMut(&mut MemoryBus, f64) + Send>;

pub struct MemorySimulation {
    bus: MemoryBus,
    dt: f64,
    time_s: f64,
    steps: u64,
    dynamics: Option<Dynamics>,
    fail_at_step: Option<u64>,
}

impl MemorySimulation {
    /// A frozen simulator: time advances, state does not.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bus: MemoryBus::default(),
            dt: DEFAULT_DT,
            time_s: 0.0,
            steps: 0,
            dynamics: None,
            fail_at_step: None,
        }
    }

    /// Simulator driven by [`point_mass_dynamics`].
    #[must_use]
    pub fn point_mass() -> Self {
        Self::new().with_dynamics(point_mass_dynamics)
    }

    #[must_use]
    pub const fn with_dt(mut self, dt: f64) -> Self {
        self.dt = dt;
        self
    }

    /// Integrate at `hz` steps per simulated second.
    #[must_use]
    pub const fn with_frequency_hz(self, hz: f64) -> Self {
        self.with_dt(1.0 / hz)
    }

    #[must_use]
    pub fn with_dynamics(
        mut self,
        dynamics: impl FnMut(&mut MemoryBus, f64) + Send + 'static,
    ) -> Self {
        self.dynamics = Some(Box::new(dynamics));
        self
    }

    /// Reject properties outside `known` (the catalog when `None`).
    #[must_use]
    pub fn strict(mut self, known: Option<&[Property]>) -> Self {
        let names = known.map_or_else(
            || catalog::ALL.iter().map(|(_, p)| p.name).collect(),
            |props| props.iter().map(|p| p.name).collect(),
        );
        self.bus.known = Some(names);
        self
    }

    /// Make the integration step with this 1-based index fail.
    #[must_use]
    pub const fn fail_at_step(mut self, step: u64) -> Self {
        self.fail_at_step = Some(step);
        self
    }

    #[must_use]
    pub const fn bus(&self) -> &MemoryBus {
        &self.bus
    }

    pub const fn bus_mut(&mut self) -> &mut MemoryBus {
        &mut self.bus
    }

    /// Integration steps since the last `initialize`.
    #[must_use]
    pub const fn steps(&self) -> u64 {
        self.steps
    }

    #[must_use]
    pub const fn dt(&self) -> f64 {
        self.dt
    }
}

impl Default for MemorySimulation {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemorySimulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySimulation")
            .field("dt", &self.dt)
            .field("time_s", &self.time_s)
            .field("steps", &self.steps)
            .field("properties", &self.bus.len())
            .field("has_dynamics", &self.dynamics.is_some())
            .finish_non_exhaustive()
    }
}

impl PropertyBus for MemorySimulation {
    fn get(&self, property: &Property) -> Result<f64, SimError> {
        self.bus.get(property)
    }

    fn set(&mut self, property: &Property, value: f64) -> Result<(), SimError> {
        self.bus.set(property, value)
    }
}

impl Simulation for MemorySimulation {
    fn sim_time(&self) -> f64 {
        self.time_s
    }

    /// Clear the bus, load `conditions`, and derive the live state from the
    /// `ic/*` entries.
    fn initialize(&mut self, conditions: &InitialConditions) -> Result<(), SimError> {
        self.bus.values.clear();
        for (property, value) in conditions.iter() {
            self.bus.set(property, value)?;
        }

        let ic = |p: &Property| conditions.get(p).unwrap_or(0.0);
        let heading = ic(&catalog::INITIAL_HEADING_DEG);
        let u = ic(&catalog::INITIAL_U_FPS);
        let live = [
            (catalog::ALTITUDE_SL_FT, ic(&catalog::INITIAL_ALTITUDE_FT)),
            (catalog::HEADING_DEG, heading),
            (catalog::LAT_GEOD_DEG, ic(&catalog::INITIAL_LATITUDE_GEOD_DEG)),
            (catalog::LNG_GEOC_DEG, ic(&catalog::INITIAL_LONGITUDE_GEOC_DEG)),
            (catalog::U_FPS, u),
            (catalog::V_FPS, ic(&catalog::INITIAL_V_FPS)),
            (catalog::W_FPS, ic(&catalog::INITIAL_W_FPS)),
            (catalog::P_RADPS, ic(&catalog::INITIAL_P_RADPS)),
            (catalog::Q_RADPS, ic(&catalog::INITIAL_Q_RADPS)),
            (catalog::R_RADPS, ic(&catalog::INITIAL_R_RADPS)),
            (catalog::V_DOWN_FPS, -ic(&catalog::INITIAL_ROC_FPM) / 60.0),
            (catalog::V_NORTH_FPS, u * heading.to_radians().cos()),
            (catalog::V_EAST_FPS, u * heading.to_radians().sin()),
            (catalog::VC_FPS, u),
            (catalog::N_PILOT_Z, -1.0),
            (catalog::SIM_DT, self.dt),
            (catalog::SIM_TIME_S, 0.0),
        ];
        for (property, value) in &live {
            self.bus.set(property, *value)?;
        }

        self.time_s = 0.0;
        self.steps = 0;
        Ok(())
    }

    #[allow(clippy::cast_precision_loss)]
    fn run_one_step(&mut self) -> Result<(), SimError> {
        if self.fail_at_step == Some(self.steps + 1) {
            return Err(SimError::StepFailed(format!(
                "injected failure at step {}",
                self.steps + 1
            )));
        }
        if let Some(dynamics) = self.dynamics.as_mut() {
            dynamics(&mut self.bus, self.dt);
        }
        self.steps += 1;
        self.time_s = self.steps as f64 * self.dt;
        self.bus.put(&catalog::SIM_TIME_S, self.time_s);
        Ok(())
    }

    fn step_size_s(&self) -> Option<f64> {
        Some(self.dt)
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "MemorySimulation"
    }
}

// ---------------------------------------------------------------------------
// point_mass_dynamics
// ---------------------------------------------------------------------------

/// Coarse kinematic aircraft.
///
/// Surfaces follow their commands instantly. Aileron drives roll rate,
/// elevator drives pitch rate, a coordinated turn sets the heading rate from
/// bank angle and airspeed, throttle nudges airspeed around 0.8, and the
/// position integrates the velocity over a flat earth.
#[allow(clippy::suboptimal_flops)]
pub fn point_mass_dynamics(bus: &mut MemoryBus, dt: f64) {
    let aileron = bus.value(&catalog::AILERON_CMD);
    let elevator = bus.value(&catalog::ELEVATOR_CMD);
    let rudder = bus.value(&catalog::RUDDER_CMD);
    let throttle = bus.value(&catalog::THROTTLE_CMD);

    bus.put(&catalog::AILERON_LEFT, aileron);
    bus.put(&catalog::AILERON_RIGHT, -aileron);
    bus.put(&catalog::ELEVATOR, elevator);
    bus.put(&catalog::RUDDER, rudder);
    bus.put(&catalog::THROTTLE, throttle);

    let p = 0.5 * aileron;
    let q = -0.2 * elevator;
    let roll = (bus.value(&catalog::ROLL_RAD) + p * dt).clamp(-FRAC_PI_2 + 0.1, FRAC_PI_2 - 0.1);
    let pitch = (bus.value(&catalog::PITCH_RAD) + q * dt).clamp(-FRAC_PI_2 + 0.1, FRAC_PI_2 - 0.1);

    let u = (bus.value(&catalog::U_FPS) + (throttle - 0.8) * 5.0 * dt).max(1.0);
    let r = STANDARD_GRAVITY_FPS2 * roll.tan() / u + 0.05 * rudder;
    let heading = wrap_heading_deg(bus.value(&catalog::HEADING_DEG) + r.to_degrees() * dt);

    let v_down = -u * pitch.sin();
    let ground = u * pitch.cos();
    let v_north = ground * heading.to_radians().cos();
    let v_east = ground * heading.to_radians().sin();

    let lat = bus.value(&catalog::LAT_GEOD_DEG) + v_north * dt / FEET_PER_DEG_LAT;
    let lon_scale = FEET_PER_DEG_LAT * lat.to_radians().cos().abs().max(1e-6);
    let lon = bus.value(&catalog::LNG_GEOC_DEG) + v_east * dt / lon_scale;

    let updates = [
        (catalog::P_RADPS, p),
        (catalog::Q_RADPS, q),
        (catalog::R_RADPS, r),
        (catalog::ROLL_RAD, roll),
        (catalog::PITCH_RAD, pitch),
        (catalog::HEADING_DEG, heading),
        (catalog::U_FPS, u),
        (catalog::VC_FPS, u),
        (catalog::V_DOWN_FPS, v_down),
        (catalog::V_NORTH_FPS, v_north),
        (catalog::V_EAST_FPS, v_east),
        (catalog::ALTITUDE_RATE_FPS, -v_down),
        (
            catalog::ALTITUDE_SL_FT,
            bus.value(&catalog::ALTITUDE_SL_FT) - v_down * dt,
        ),
        (catalog::LAT_GEOD_DEG, lat),
        (catalog::LNG_GEOC_DEG, lon),
        (
            catalog::DIST_TRAVEL_M,
            bus.value(&catalog::DIST_TRAVEL_M) + ground * dt * 0.3048,
        ),
        (catalog::N_PILOT_X, 0.0),
        (catalog::N_PILOT_Y, 0.0),
        (catalog::N_PILOT_Z, -1.0 / roll.cos()),
    ];
    for (property, value) in &updates {
        bus.put(property, *value);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
