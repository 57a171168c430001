//! Simulation properties and the static property catalog.
//!
//! A [`Property`] is an immutable definition: bus key, unit and optional
//! bounds. The value itself lives on the simulator's property bus. The
//! [`catalog`] module lists every property the tasks read or write and lets
//! configuration refer to them by a short key such as `"delta_heading"`.

use std::fmt;

use serde::Serialize;

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Unit
// ---------------------------------------------------------------------------

/// Semantic unit of a property value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Feet,
    FeetPerSecond,
    FeetPerMinute,
    Meters,
    Degrees,
    Radians,
    RadiansPerSecond,
    /// Pilot-station acceleration in g.
    GForce,
    Pounds,
    Seconds,
    /// Normalized control deflection or command.
    Normalized,
    Count,
    Flag,
}

impl Unit {
    /// Short symbol used when printing the catalog.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Feet => "ft",
            Self::FeetPerSecond => "ft/s",
            Self::FeetPerMinute => "ft/min",
            Self::Meters => "m",
            Self::Degrees => "deg",
            Self::Radians => "rad",
            Self::RadiansPerSecond => "rad/s",
            Self::GForce => "g",
            Self::Pounds => "lbs",
            Self::Seconds => "s",
            Self::Normalized => "norm",
            Self::Count => "count",
            Self::Flag => "flag",
        }
    }
}

// ---------------------------------------------------------------------------
// Property
// ---------------------------------------------------------------------------

/// Definition of a named scalar on the property bus.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Property {
    /// Bus key, e.g. `position/h-sl-ft`.
    pub name: &'static str,
    pub description: &'static str,
    pub unit: Unit,
    /// Inclusive `[min, max]`, or `None` for unbounded properties.
    pub bounds: Option<[f64; 2]>,
}

impl Property {
    /// A property clamped to `[min, max]` whenever the task writes it.
    #[must_use]
    pub const fn bounded(
        name: &'static str,
        description: &'static str,
        unit: Unit,
        min: f64,
        max: f64,
    ) -> Self {
        Self {
            name,
            description,
            unit,
            bounds: Some([min, max]),
        }
    }

    /// A property without bounds.
    #[must_use]
    pub const fn unbounded(name: &'static str, description: &'static str, unit: Unit) -> Self {
        Self {
            name,
            description,
            unit,
            bounds: None,
        }
    }

    /// Copy of this property with replaced bounds.
    #[must_use]
    pub const fn with_bounds(self, min: f64, max: f64) -> Self {
        Self {
            bounds: Some([min, max]),
            ..self
        }
    }

    /// Lower bound, or `-inf` when unbounded.
    #[must_use]
    pub fn min(&self) -> f64 {
        self.bounds.map_or(f64::NEG_INFINITY, |[lo, _]| lo)
    }

    /// Upper bound, or `+inf` when unbounded.
    #[must_use]
    pub fn max(&self) -> f64 {
        self.bounds.map_or(f64::INFINITY, |[_, hi]| hi)
    }

    /// Clamp `value` into the property bounds. NaN passes through unchanged.
    #[must_use]
    pub fn clamp(&self, value: f64) -> f64 {
        match self.bounds {
            Some([lo, hi]) if !value.is_nan() => value.clamp(lo, hi),
            _ => value,
        }
    }

    /// Whether `value` lies inside the bounds (always true when unbounded).
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        match self.bounds {
            Some([lo, hi]) => (lo..=hi).contains(&value),
            None => !value.is_nan(),
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Every property known to the flight tasks.
pub mod catalog {
    use std::f64::consts::{FRAC_PI_2, PI, TAU};

    use super::{Property, Unit};

    // position and attitude
    pub const ALTITUDE_SL_FT: Property = Property::bounded(
        "position/h-sl-ft",
        "altitude above mean sea level",
        Unit::Feet,
        -1400.0,
        85000.0,
    );
    pub const PITCH_RAD: Property = Property::bounded(
        "attitude/pitch-rad",
        "pitch",
        Unit::Radians,
        -FRAC_PI_2,
        FRAC_PI_2,
    );
    pub const ROLL_RAD: Property =
        Property::bounded("attitude/roll-rad", "roll", Unit::Radians, -PI, PI);
    pub const HEADING_DEG: Property =
        Property::bounded("attitude/psi-deg", "heading", Unit::Degrees, 0.0, 360.0);
    pub const SIDESLIP_DEG: Property = Property::bounded(
        "aero/beta-deg",
        "sideslip",
        Unit::Degrees,
        -180.0,
        180.0,
    );
    pub const LAT_GEOD_DEG: Property = Property::bounded(
        "position/lat-geod-deg",
        "geodetic latitude",
        Unit::Degrees,
        -90.0,
        90.0,
    );
    pub const LNG_GEOC_DEG: Property = Property::bounded(
        "position/long-gc-deg",
        "geocentric longitude",
        Unit::Degrees,
        -180.0,
        180.0,
    );
    pub const DIST_TRAVEL_M: Property = Property::unbounded(
        "position/distance-from-start-mag-mt",
        "distance travelled from starting position",
        Unit::Meters,
    );

    // derived deltas, written by the task after every step
    pub const DELTA_HEADING: Property = Property::bounded(
        "position/delta-heading-to-target-deg",
        "signed heading error to target",
        Unit::Degrees,
        -180.0,
        180.0,
    );
    pub const DELTA_ALTITUDE: Property = Property::bounded(
        "position/delta-altitude-to-target-ft",
        "signed altitude error to target",
        Unit::Feet,
        -40000.0,
        40000.0,
    );

    // velocities
    pub const U_FPS: Property = Property::bounded(
        "velocities/u-fps",
        "body frame x-axis velocity",
        Unit::FeetPerSecond,
        -2200.0,
        2200.0,
    );
    pub const V_FPS: Property = Property::bounded(
        "velocities/v-fps",
        "body frame y-axis velocity",
        Unit::FeetPerSecond,
        -2200.0,
        2200.0,
    );
    pub const W_FPS: Property = Property::bounded(
        "velocities/w-fps",
        "body frame z-axis velocity",
        Unit::FeetPerSecond,
        -2200.0,
        2200.0,
    );
    pub const V_NORTH_FPS: Property = Property::unbounded(
        "velocities/v-north-fps",
        "velocity true north",
        Unit::FeetPerSecond,
    );
    pub const V_EAST_FPS: Property =
        Property::unbounded("velocities/v-east-fps", "velocity east", Unit::FeetPerSecond);
    pub const V_DOWN_FPS: Property =
        Property::unbounded("velocities/v-down-fps", "velocity downwards", Unit::FeetPerSecond);
    pub const VC_FPS: Property = Property::bounded(
        "velocities/vc-fps",
        "calibrated airspeed",
        Unit::FeetPerSecond,
        0.0,
        4400.0,
    );
    pub const ALTITUDE_RATE_FPS: Property =
        Property::unbounded("velocities/h-dot-fps", "rate of altitude change", Unit::FeetPerSecond);
    pub const P_RADPS: Property = Property::bounded(
        "velocities/p-rad_sec",
        "roll rate",
        Unit::RadiansPerSecond,
        -TAU,
        TAU,
    );
    pub const Q_RADPS: Property = Property::bounded(
        "velocities/q-rad_sec",
        "pitch rate",
        Unit::RadiansPerSecond,
        -TAU,
        TAU,
    );
    pub const R_RADPS: Property = Property::bounded(
        "velocities/r-rad_sec",
        "yaw rate",
        Unit::RadiansPerSecond,
        -TAU,
        TAU,
    );

    // pilot-station accelerations
    pub const N_PILOT_X: Property = Property::unbounded(
        "accelerations/n-pilot-x-norm",
        "pilot body x-axis acceleration, normalised",
        Unit::GForce,
    );
    pub const N_PILOT_Y: Property = Property::unbounded(
        "accelerations/n-pilot-y-norm",
        "pilot body y-axis acceleration, normalised",
        Unit::GForce,
    );
    pub const N_PILOT_Z: Property = Property::unbounded(
        "accelerations/n-pilot-z-norm",
        "pilot body z-axis acceleration, normalised",
        Unit::GForce,
    );

    // control surface positions
    pub const AILERON_LEFT: Property = Property::bounded(
        "fcs/left-aileron-pos-norm",
        "left aileron position, normalised",
        Unit::Normalized,
        -1.0,
        1.0,
    );
    pub const AILERON_RIGHT: Property = Property::bounded(
        "fcs/right-aileron-pos-norm",
        "right aileron position, normalised",
        Unit::Normalized,
        -1.0,
        1.0,
    );
    pub const ELEVATOR: Property = Property::bounded(
        "fcs/elevator-pos-norm",
        "elevator position, normalised",
        Unit::Normalized,
        -1.0,
        1.0,
    );
    pub const RUDDER: Property = Property::bounded(
        "fcs/rudder-pos-norm",
        "rudder position, normalised",
        Unit::Normalized,
        -1.0,
        1.0,
    );
    pub const THROTTLE: Property = Property::bounded(
        "fcs/throttle-pos-norm",
        "throttle position, normalised",
        Unit::Normalized,
        0.0,
        1.0,
    );
    pub const GEAR: Property = Property::bounded(
        "gear/gear-pos-norm",
        "landing gear position, normalised",
        Unit::Normalized,
        0.0,
        1.0,
    );

    // engines
    pub const ENGINE_RUNNING: Property = Property::bounded(
        "propulsion/engine/set-running",
        "engine running (0/1)",
        Unit::Flag,
        0.0,
        1.0,
    );
    pub const ALL_ENGINE_RUNNING: Property = Property::bounded(
        "propulsion/set-running",
        "set engine running (-1 for all engines)",
        Unit::Flag,
        -1.0,
        1.0,
    );
    pub const ENGINE_THRUST_LBS: Property = Property::unbounded(
        "propulsion/engine/thrust-lbs",
        "engine thrust",
        Unit::Pounds,
    );

    // controls commands
    pub const AILERON_CMD: Property = Property::bounded(
        "fcs/aileron-cmd-norm",
        "aileron commanded position, normalised",
        Unit::Normalized,
        -1.0,
        1.0,
    );
    pub const ELEVATOR_CMD: Property = Property::bounded(
        "fcs/elevator-cmd-norm",
        "elevator commanded position, normalised",
        Unit::Normalized,
        -1.0,
        1.0,
    );
    pub const RUDDER_CMD: Property = Property::bounded(
        "fcs/rudder-cmd-norm",
        "rudder commanded position, normalised",
        Unit::Normalized,
        -1.0,
        1.0,
    );
    pub const THROTTLE_CMD: Property = Property::bounded(
        "fcs/throttle-cmd-norm",
        "throttle commanded position, normalised",
        Unit::Normalized,
        0.0,
        1.0,
    );
    pub const MIXTURE_CMD: Property = Property::bounded(
        "fcs/mixture-cmd-norm",
        "engine mixture setting, normalised",
        Unit::Normalized,
        0.0,
        1.0,
    );
    pub const THROTTLE_1_CMD: Property = Property::bounded(
        "fcs/throttle-cmd-norm[1]",
        "second engine throttle commanded position, normalised",
        Unit::Normalized,
        0.0,
        1.0,
    );
    pub const MIXTURE_1_CMD: Property = Property::bounded(
        "fcs/mixture-cmd-norm[1]",
        "second engine mixture setting, normalised",
        Unit::Normalized,
        0.0,
        1.0,
    );
    pub const GEAR_ALL_CMD: Property = Property::bounded(
        "gear/gear-cmd-norm",
        "all landing gear commanded position",
        Unit::Normalized,
        0.0,
        1.0,
    );

    // simulation
    pub const SIM_DT: Property =
        Property::unbounded("simulation/dt", "integration timestep", Unit::Seconds);
    pub const SIM_TIME_S: Property =
        Property::unbounded("simulation/sim-time-sec", "simulation time", Unit::Seconds);
    pub const EXTREME_STATE: Property = Property::bounded(
        "detect/extreme-state",
        "simulator reports an out-of-envelope state",
        Unit::Flag,
        0.0,
        1.0,
    );

    // initial conditions
    pub const INITIAL_ALTITUDE_FT: Property = Property::bounded(
        "ic/h-sl-ft",
        "initial altitude MSL",
        Unit::Feet,
        -1400.0,
        85000.0,
    );
    pub const INITIAL_TERRAIN_ALTITUDE_FT: Property = Property::unbounded(
        "ic/terrain-elevation-ft",
        "initial terrain altitude",
        Unit::Feet,
    );
    pub const INITIAL_LONGITUDE_GEOC_DEG: Property = Property::bounded(
        "ic/long-gc-deg",
        "initial geocentric longitude",
        Unit::Degrees,
        -180.0,
        180.0,
    );
    pub const INITIAL_LATITUDE_GEOD_DEG: Property = Property::bounded(
        "ic/lat-geod-deg",
        "initial geodesic latitude",
        Unit::Degrees,
        -90.0,
        90.0,
    );
    pub const INITIAL_U_FPS: Property = Property::bounded(
        "ic/u-fps",
        "body frame x-axis velocity, initial condition",
        Unit::FeetPerSecond,
        -2200.0,
        2200.0,
    );
    pub const INITIAL_V_FPS: Property = Property::bounded(
        "ic/v-fps",
        "body frame y-axis velocity, initial condition",
        Unit::FeetPerSecond,
        -2200.0,
        2200.0,
    );
    pub const INITIAL_W_FPS: Property = Property::bounded(
        "ic/w-fps",
        "body frame z-axis velocity, initial condition",
        Unit::FeetPerSecond,
        -2200.0,
        2200.0,
    );
    pub const INITIAL_P_RADPS: Property = Property::bounded(
        "ic/p-rad_sec",
        "roll rate, initial condition",
        Unit::RadiansPerSecond,
        -TAU,
        TAU,
    );
    pub const INITIAL_Q_RADPS: Property = Property::bounded(
        "ic/q-rad_sec",
        "pitch rate, initial condition",
        Unit::RadiansPerSecond,
        -TAU,
        TAU,
    );
    pub const INITIAL_R_RADPS: Property = Property::bounded(
        "ic/r-rad_sec",
        "yaw rate, initial condition",
        Unit::RadiansPerSecond,
        -TAU,
        TAU,
    );
    pub const INITIAL_ROC_FPM: Property = Property::unbounded(
        "ic/roc-fpm",
        "initial rate of climb",
        Unit::FeetPerMinute,
    );
    pub const INITIAL_HEADING_DEG: Property = Property::bounded(
        "ic/psi-true-deg",
        "initial true heading",
        Unit::Degrees,
        0.0,
        360.0,
    );

    // targets
    pub const TARGET_ALTITUDE_FT: Property = Property::bounded(
        "tc/h-sl-ft",
        "target altitude MSL",
        Unit::Feet,
        -1400.0,
        85000.0,
    );
    pub const TARGET_HEADING_DEG: Property = Property::bounded(
        "tc/target-heading-deg",
        "target heading",
        Unit::Degrees,
        0.0,
        360.0,
    );

    // episode bookkeeping
    pub const STEPS_LEFT: Property =
        Property::unbounded("info/steps_left", "steps remaining in episode", Unit::Count);
    pub const EPISODE_INDEX: Property =
        Property::unbounded("info/nb_episodes", "episodes started so far", Unit::Count);

    /// Keys every initial-condition mapping must provide.
    pub const REQUIRED_INITIAL_CONDITIONS: [Property; 14] = [
        INITIAL_ALTITUDE_FT,
        INITIAL_TERRAIN_ALTITUDE_FT,
        INITIAL_LONGITUDE_GEOC_DEG,
        INITIAL_LATITUDE_GEOD_DEG,
        INITIAL_U_FPS,
        INITIAL_V_FPS,
        INITIAL_W_FPS,
        INITIAL_P_RADPS,
        INITIAL_Q_RADPS,
        INITIAL_R_RADPS,
        INITIAL_ROC_FPM,
        INITIAL_HEADING_DEG,
        TARGET_ALTITUDE_FT,
        TARGET_HEADING_DEG,
    ];

    /// Short configuration key for every catalog entry.
    pub const ALL: &[(&str, Property)] = &[
        ("altitude_sl_ft", ALTITUDE_SL_FT),
        ("pitch_rad", PITCH_RAD),
        ("roll_rad", ROLL_RAD),
        ("heading_deg", HEADING_DEG),
        ("sideslip_deg", SIDESLIP_DEG),
        ("lat_geod_deg", LAT_GEOD_DEG),
        ("lng_geoc_deg", LNG_GEOC_DEG),
        ("dist_travel_m", DIST_TRAVEL_M),
        ("delta_heading", DELTA_HEADING),
        ("delta_altitude", DELTA_ALTITUDE),
        ("u_fps", U_FPS),
        ("v_fps", V_FPS),
        ("w_fps", W_FPS),
        ("v_north_fps", V_NORTH_FPS),
        ("v_east_fps", V_EAST_FPS),
        ("v_down_fps", V_DOWN_FPS),
        ("vc_fps", VC_FPS),
        ("altitude_rate_fps", ALTITUDE_RATE_FPS),
        ("p_radps", P_RADPS),
        ("q_radps", Q_RADPS),
        ("r_radps", R_RADPS),
        ("n_pilot_x", N_PILOT_X),
        ("n_pilot_y", N_PILOT_Y),
        ("n_pilot_z", N_PILOT_Z),
        ("aileron_left", AILERON_LEFT),
        ("aileron_right", AILERON_RIGHT),
        ("elevator", ELEVATOR),
        ("rudder", RUDDER),
        ("throttle", THROTTLE),
        ("gear", GEAR),
        ("engine_running", ENGINE_RUNNING),
        ("all_engine_running", ALL_ENGINE_RUNNING),
        ("engine_thrust_lbs", ENGINE_THRUST_LBS),
        ("aileron_cmd", AILERON_CMD),
        ("elevator_cmd", ELEVATOR_CMD),
        ("rudder_cmd", RUDDER_CMD),
        ("throttle_cmd", THROTTLE_CMD),
        ("mixture_cmd", MIXTURE_CMD),
        ("throttle_1_cmd", THROTTLE_1_CMD),
        ("mixture_1_cmd", MIXTURE_1_CMD),
        ("gear_all_cmd", GEAR_ALL_CMD),
        ("sim_dt", SIM_DT),
        ("sim_time_s", SIM_TIME_S),
        ("extreme_state", EXTREME_STATE),
        ("initial_altitude_ft", INITIAL_ALTITUDE_FT),
        ("initial_terrain_altitude_ft", INITIAL_TERRAIN_ALTITUDE_FT),
        ("initial_longitude_geoc_deg", INITIAL_LONGITUDE_GEOC_DEG),
        ("initial_latitude_geod_deg", INITIAL_LATITUDE_GEOD_DEG),
        ("initial_u_fps", INITIAL_U_FPS),
        ("initial_v_fps", INITIAL_V_FPS),
        ("initial_w_fps", INITIAL_W_FPS),
        ("initial_p_radps", INITIAL_P_RADPS),
        ("initial_q_radps", INITIAL_Q_RADPS),
        ("initial_r_radps", INITIAL_R_RADPS),
        ("initial_roc_fpm", INITIAL_ROC_FPM),
        ("initial_heading_deg", INITIAL_HEADING_DEG),
        ("target_altitude_ft", TARGET_ALTITUDE_FT),
        ("target_heading_deg", TARGET_HEADING_DEG),
        ("steps_left", STEPS_LEFT),
        ("episode_index", EPISODE_INDEX),
    ];

    /// Look up a property by its short key.
    #[must_use]
    pub fn lookup(key: &str) -> Option<Property> {
        ALL.iter().find(|(k, _)| *k == key).map(|(_, p)| *p)
    }

    /// Look up a property by its bus name.
    #[must_use]
    pub fn by_name(name: &str) -> Option<Property> {
        ALL.iter().find(|(_, p)| p.name == name).map(|(_, p)| *p)
    }
}

/// Resolve a list of short keys into properties, preserving order.
pub fn resolve<S: AsRef<str>>(keys: &[S]) -> Result<Vec<Property>, ConfigError> {
    keys.iter()
        .map(|key| {
            let key = key.as_ref();
            catalog::lookup(key).ok_or_else(|| ConfigError::UnknownProperty(key.to_string()))
        })
        .collect()
}

/// Append `extra` to `list`, skipping properties already present (by name).
pub fn merge_unique(list: &mut Vec<Property>, extra: impl IntoIterator<Item = Property>) {
    for property in extra {
        if !list.iter().any(|p| p.name == property.name) {
            list.push(property);
        }
    }
}
