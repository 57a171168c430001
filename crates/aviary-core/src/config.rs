use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::geo::GeodeticPosition;
use crate::property::{Property, resolve};

// ---------------------------------------------------------------------------
// Serde default functions
// ---------------------------------------------------------------------------

const fn default_step_frequency_hz() -> f64 {
    5.0
}
const fn default_simulation_frequency_hz() -> f64 {
    60.0
}
fn default_aircraft_name() -> String {
    "A320".into()
}
const fn default_cruise_speed_fps() -> f64 {
    800.0
}
const fn default_engines() -> u32 {
    2
}
const fn default_throttle_cmd() -> f64 {
    0.8
}
const fn default_mixture_cmd() -> f64 {
    1.0
}
const fn default_initial_latitude_deg() -> f64 {
    43.607_181
}
const fn default_initial_longitude_deg() -> f64 {
    1.442_031
}
const fn default_altitude_range_ft() -> [f64; 2] {
    [10_000.0, 20_000.0]
}
const fn default_heading_range_deg() -> [f64; 2] {
    [0.0, 360.0]
}
const fn default_retarget_interval_s() -> f64 {
    150.0
}
const fn default_heading_step_deg() -> f64 {
    10.0
}
const fn default_altitude_step_ft() -> f64 {
    100.0
}
const fn default_retarget_window() -> [f64; 2] {
    [0.33, 0.66]
}
const fn default_max_heading_offset_deg() -> f64 {
    90.0
}
const fn default_max_altitude_offset_ft() -> f64 {
    4000.0
}
const fn default_control_delta_threshold() -> f64 {
    0.5
}
const fn default_control_delta_penalty() -> f64 {
    -0.2
}
const fn default_decay_episodes() -> f64 {
    100.0
}
const fn default_target_time_s() -> f64 {
    400.0
}
const fn default_waypoint_tolerance_deg() -> f64 {
    1e-7
}
fn default_state_variables() -> Vec<String> {
    [
        "delta_altitude",
        "delta_heading",
        "pitch_rad",
        "roll_rad",
        "v_down_fps",
        "vc_fps",
        "p_radps",
        "q_radps",
        "r_radps",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
fn default_action_variables() -> Vec<String> {
    ["aileron_cmd", "elevator_cmd", "rudder_cmd", "throttle_cmd"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Episode length used when none is configured and the task has no waypoint.
pub const DEFAULT_EPISODE_TIME_S: f64 = 1000.0;

/// Extra seconds granted after the waypoint target time.
pub const WAYPOINT_TIME_MARGIN_S: f64 = 300.0;

// ---------------------------------------------------------------------------
// TaskKind
// ---------------------------------------------------------------------------

/// Preset task variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Hold the initial heading and altitude.
    #[default]
    HeadingControl,
    /// Hold, then follow one mid-episode target change.
    ChangeHeading,
    /// Follow a target that steps away every checkpoint interval.
    PeriodicHeading,
    /// Reach a waypoint at a target time.
    Waypoint,
    /// Turn onto and level at a fixed target.
    TurnHeadingChangeLevel,
}

impl TaskKind {
    pub const ALL: [Self; 5] = [
        Self::HeadingControl,
        Self::ChangeHeading,
        Self::PeriodicHeading,
        Self::Waypoint,
        Self::TurnHeadingChangeLevel,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HeadingControl => "heading_control",
            Self::ChangeHeading => "change_heading",
            Self::PeriodicHeading => "periodic_heading",
            Self::Waypoint => "waypoint",
            Self::TurnHeadingChangeLevel => "turn_heading_change_level",
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// TaskConfig
// ---------------------------------------------------------------------------

/// Complete configuration of one flight task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskConfig {
    #[serde(default)]
    pub kind: TaskKind,

    /// Agent decisions per simulated second (default: 5).
    #[serde(default = "default_step_frequency_hz")]
    pub step_frequency_hz: f64,

    /// Episode length in simulated seconds. Defaults to 1000 s, or to the
    /// waypoint target time plus 300 s for waypoint tasks.
    #[serde(default)]
    pub episode_time_s: Option<f64>,

    /// Integrator steps per simulated second (default: 60).
    #[serde(default = "default_simulation_frequency_hz")]
    pub simulation_frequency_hz: f64,

    /// Root seed for initial conditions and target schedules.
    #[serde(default)]
    pub seed: u64,

    /// Validate every observation and warn on non-finite values.
    #[serde(default)]
    pub debug: bool,

    #[serde(default)]
    pub aircraft: AircraftConfig,

    #[serde(default)]
    pub controls: ControlsConfig,

    #[serde(default)]
    pub initial: InitialConfig,

    /// Fixed targets. Unset fields fall back to the initial heading/altitude.
    #[serde(default)]
    pub target: Option<TargetConfig>,

    #[serde(default)]
    pub bounds: BoundsConfig,

    #[serde(default)]
    pub schedule: ScheduleConfig,

    #[serde(default)]
    pub reward: RewardConfig,

    #[serde(default)]
    pub waypoint: Option<WaypointConfig>,

    #[serde(default)]
    pub variables: VariablesConfig,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            kind: TaskKind::default(),
            step_frequency_hz: default_step_frequency_hz(),
            episode_time_s: None,
            simulation_frequency_hz: default_simulation_frequency_hz(),
            seed: 0,
            debug: false,
            aircraft: AircraftConfig::default(),
            controls: ControlsConfig::default(),
            initial: InitialConfig::default(),
            target: None,
            bounds: BoundsConfig::default(),
            schedule: ScheduleConfig::default(),
            reward: RewardConfig::default(),
            waypoint: None,
            variables: VariablesConfig::default(),
        }
    }
}

impl TaskConfig {
    /// Defaults for `kind`, including the waypoint and fixed target the
    /// waypoint and turn variants need.
    #[must_use]
    pub fn for_kind(kind: TaskKind) -> Self {
        let mut config = Self {
            kind,
            ..Self::default()
        };
        match kind {
            TaskKind::Waypoint => {
                let waypoint = WaypointConfig::default();
                let start = GeodeticPosition::new(47.449_833_3, -122.311_833_3);
                let bearing = start.heading_deg_to(&waypoint.position());
                config.initial.latitude_deg = start.latitude_deg;
                config.initial.longitude_deg = start.longitude_deg;
                config.initial.altitude_ft = [5000.0, 5000.0];
                config.initial.heading_deg = [bearing, bearing];
                config.target = Some(TargetConfig {
                    heading_deg: Some(bearing),
                    altitude_ft: None,
                });
                config.waypoint = Some(waypoint);
            }
            TaskKind::TurnHeadingChangeLevel => {
                config.target = Some(TargetConfig {
                    heading_deg: Some(360.0),
                    altitude_ft: Some(3000.0),
                });
            }
            TaskKind::HeadingControl | TaskKind::ChangeHeading | TaskKind::PeriodicHeading => {}
        }
        config
    }

    /// Load, parse and validate a TOML file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Effective episode length in simulated seconds.
    #[must_use]
    pub fn episode_time_s(&self) -> f64 {
        match (self.episode_time_s, &self.waypoint) {
            (Some(seconds), _) => seconds,
            (None, Some(waypoint)) if self.kind == TaskKind::Waypoint => {
                waypoint.target_time_s + WAYPOINT_TIME_MARGIN_S
            }
            (None, _) => DEFAULT_EPISODE_TIME_S,
        }
    }

    /// `ceil(episode_time_s * step_frequency_hz)`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn step_budget(&self) -> u32 {
        (self.episode_time_s() * self.step_frequency_hz).ceil() as u32
    }

    /// Integrator steps per agent step.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn sim_steps(&self) -> u32 {
        ((self.simulation_frequency_hz / self.step_frequency_hz).floor() as u32).max(1)
    }

    /// Resolved state variables, in observation order.
    pub fn state_properties(&self) -> Result<Vec<Property>, ConfigError> {
        resolve(&self.variables.state)
    }

    /// Resolved action variables, in action order.
    pub fn action_properties(&self) -> Result<Vec<Property>, ConfigError> {
        resolve(&self.variables.action)
    }

    /// Validate configuration values.
    #[allow(clippy::too_many_lines)]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.step_frequency_hz.is_finite() && self.step_frequency_hz > 0.0) {
            return Err(ConfigError::InvalidStepFrequency(self.step_frequency_hz));
        }
        let episode_time = self.episode_time_s();
        if !(episode_time.is_finite() && episode_time > 0.0) {
            return Err(ConfigError::InvalidEpisodeTime(episode_time));
        }
        if !self.simulation_frequency_hz.is_finite()
            || self.simulation_frequency_hz < self.step_frequency_hz
        {
            return Err(ConfigError::SimulationSlowerThanAgent);
        }
        if episode_time * self.step_frequency_hz > f64::from(u32::MAX) {
            return Err(invalid(
                "episode_time_s",
                "step budget does not fit in 32 bits",
            ));
        }

        if !(self.aircraft.cruise_speed_fps.is_finite() && self.aircraft.cruise_speed_fps > 0.0) {
            return Err(invalid("aircraft.cruise_speed_fps", "must be > 0"));
        }
        if self.aircraft.engines == 0 {
            return Err(invalid("aircraft.engines", "must be >= 1"));
        }
        check_unit_interval("controls.throttle_cmd", self.controls.throttle_cmd)?;
        check_unit_interval("controls.mixture_cmd", self.controls.mixture_cmd)?;

        check_range("initial.altitude_ft", self.initial.altitude_ft)?;
        if self
            .initial
            .altitude_std_ft
            .is_some_and(|v| !(v.is_finite() && v >= 0.0))
        {
            return Err(invalid("initial.altitude_std_ft", "must be >= 0"));
        }
        check_range("initial.heading_deg", self.initial.heading_deg)?;
        if !(-90.0..=90.0).contains(&self.initial.latitude_deg) {
            return Err(invalid("initial.latitude_deg", "must be in [-90, 90]"));
        }
        if !(-180.0..=180.0).contains(&self.initial.longitude_deg) {
            return Err(invalid("initial.longitude_deg", "must be in [-180, 180]"));
        }

        for (field, value) in [
            ("bounds.max_heading_error_deg", self.bounds.max_heading_error_deg),
            ("bounds.max_altitude_error_ft", self.bounds.max_altitude_error_ft),
            ("bounds.checkpoint_heading_deg", self.bounds.checkpoint_heading_deg),
            ("bounds.checkpoint_altitude_ft", self.bounds.checkpoint_altitude_ft),
        ] {
            if let Some(v) = value {
                if !(v.is_finite() && v > 0.0) {
                    return Err(invalid(field, "must be > 0"));
                }
            }
        }
        if self.bounds.min_altitude_ft.is_some_and(|v| !v.is_finite()) {
            return Err(invalid("bounds.min_altitude_ft", "must be finite"));
        }

        if !(self.schedule.interval_s.is_finite() && self.schedule.interval_s > 0.0) {
            return Err(invalid("schedule.interval_s", "must be > 0"));
        }
        let [lo, hi] = self.schedule.window;
        if !(0.0..=1.0).contains(&lo) || !(0.0..=1.0).contains(&hi) || lo > hi {
            return Err(invalid(
                "schedule.window",
                "must satisfy 0 <= low <= high <= 1",
            ));
        }
        for (field, value) in [
            ("schedule.heading_step_deg", self.schedule.heading_step_deg),
            ("schedule.altitude_step_ft", self.schedule.altitude_step_ft),
            (
                "schedule.max_heading_offset_deg",
                self.schedule.max_heading_offset_deg,
            ),
            (
                "schedule.max_altitude_offset_ft",
                self.schedule.max_altitude_offset_ft,
            ),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(invalid(field, "must be >= 0"));
            }
        }

        if !(self.reward.control_delta_threshold.is_finite()
            && self.reward.control_delta_threshold > 0.0)
        {
            return Err(invalid("reward.control_delta_threshold", "must be > 0"));
        }
        if !self.reward.control_delta_penalty.is_finite() {
            return Err(invalid("reward.control_delta_penalty", "must be finite"));
        }

        if let Some(target) = &self.target {
            if target.heading_deg.is_some_and(|v| !v.is_finite()) {
                return Err(invalid("target.heading_deg", "must be finite"));
            }
            if target.altitude_ft.is_some_and(|v| !v.is_finite()) {
                return Err(invalid("target.altitude_ft", "must be finite"));
            }
        }

        match (&self.waypoint, self.kind) {
            (None, TaskKind::Waypoint) => {
                return Err(ConfigError::MissingField("waypoint".into()));
            }
            (Some(waypoint), _) => waypoint.validate()?,
            (None, _) => {}
        }

        if self.variables.state.is_empty() {
            return Err(ConfigError::MissingField("variables.state".into()));
        }
        if self.variables.action.is_empty() {
            return Err(ConfigError::MissingField("variables.action".into()));
        }
        self.state_properties()?;
        self.action_properties()?;
        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.into(),
        message: message.into(),
    }
}

fn check_unit_interval(field: &str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(field, "must be in [0, 1]"))
    }
}

fn check_range(field: &str, [lo, hi]: [f64; 2]) -> Result<(), ConfigError> {
    if lo.is_finite() && hi.is_finite() && lo <= hi {
        Ok(())
    } else {
        Err(invalid(field, "must be finite with low <= high"))
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AircraftConfig {
    #[serde(default = "default_aircraft_name")]
    pub name: String,

    /// Body-axis forward speed used as the initial `u` and nominal speed.
    #[serde(default = "default_cruise_speed_fps")]
    pub cruise_speed_fps: f64,

    /// Engines > 1 mirror throttle and mixture to the second engine.
    #[serde(default = "default_engines")]
    pub engines: u32,
}

impl Default for AircraftConfig {
    fn default() -> Self {
        Self {
            name: default_aircraft_name(),
            cruise_speed_fps: default_cruise_speed_fps(),
            engines: default_engines(),
        }
    }
}

/// Throttle and mixture written at the start of every episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlsConfig {
    #[serde(default = "default_throttle_cmd")]
    pub throttle_cmd: f64,

    #[serde(default = "default_mixture_cmd")]
    pub mixture_cmd: f64,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            throttle_cmd: default_throttle_cmd(),
            mixture_cmd: default_mixture_cmd(),
        }
    }
}

/// Initial-condition ranges. A range with `low == high` is a fixed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitialConfig {
    #[serde(default = "default_initial_latitude_deg")]
    pub latitude_deg: f64,

    #[serde(default = "default_initial_longitude_deg")]
    pub longitude_deg: f64,

    /// `[low, high)` altitude MSL in feet.
    #[serde(default = "default_altitude_range_ft")]
    pub altitude_ft: [f64; 2],

    /// When set, altitude is drawn from a normal distribution centred on
    /// the middle of `altitude_ft` with this standard deviation.
    #[serde(default)]
    pub altitude_std_ft: Option<f64>,

    /// `[low, high)` heading in degrees.
    #[serde(default = "default_heading_range_deg")]
    pub heading_deg: [f64; 2],

    #[serde(default)]
    pub terrain_elevation_ft: f64,
}

impl Default for InitialConfig {
    fn default() -> Self {
        Self {
            latitude_deg: default_initial_latitude_deg(),
            longitude_deg: default_initial_longitude_deg(),
            altitude_ft: default_altitude_range_ft(),
            altitude_std_ft: None,
            heading_deg: default_heading_range_deg(),
            terrain_elevation_ft: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetConfig {
    #[serde(default)]
    pub heading_deg: Option<f64>,

    #[serde(default)]
    pub altitude_ft: Option<f64>,
}

/// Overrides for the per-variant termination bounds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundsConfig {
    #[serde(default)]
    pub max_heading_error_deg: Option<f64>,

    #[serde(default)]
    pub max_altitude_error_ft: Option<f64>,

    #[serde(default)]
    pub min_altitude_ft: Option<f64>,

    #[serde(default)]
    pub checkpoint_heading_deg: Option<f64>,

    #[serde(default)]
    pub checkpoint_altitude_ft: Option<f64>,
}

/// Target scheduler parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Periodic scheduler: seconds between checkpoints.
    #[serde(default = "default_retarget_interval_s")]
    pub interval_s: f64,

    /// Periodic scheduler: heading offset per elapsed interval.
    #[serde(default = "default_heading_step_deg")]
    pub heading_step_deg: f64,

    /// Periodic scheduler: altitude offset per elapsed interval.
    #[serde(default = "default_altitude_step_ft")]
    pub altitude_step_ft: f64,

    /// Single-fire scheduler: change window as fractions of the step budget.
    #[serde(default = "default_retarget_window")]
    pub window: [f64; 2],

    #[serde(default = "default_max_heading_offset_deg")]
    pub max_heading_offset_deg: f64,

    #[serde(default = "default_max_altitude_offset_ft")]
    pub max_altitude_offset_ft: f64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_s: default_retarget_interval_s(),
            heading_step_deg: default_heading_step_deg(),
            altitude_step_ft: default_altitude_step_ft(),
            window: default_retarget_window(),
            max_heading_offset_deg: default_max_heading_offset_deg(),
            max_altitude_offset_ft: default_max_altitude_offset_ft(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardConfig {
    #[serde(default = "default_control_delta_threshold")]
    pub control_delta_threshold: f64,

    #[serde(default = "default_control_delta_penalty")]
    pub control_delta_penalty: f64,

    /// Episodes over which stabilisation shaping fades by a factor of e.
    #[serde(default = "default_decay_episodes")]
    pub decay_episodes: f64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            control_delta_threshold: default_control_delta_threshold(),
            control_delta_penalty: default_control_delta_penalty(),
            decay_episodes: default_decay_episodes(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaypointConfig {
    pub latitude_deg: f64,
    pub longitude_deg: f64,

    /// Simulated time at which the aircraft should arrive.
    #[serde(default = "default_target_time_s")]
    pub target_time_s: f64,

    #[serde(default = "default_waypoint_tolerance_deg")]
    pub tolerance_deg: f64,
}

impl Default for WaypointConfig {
    fn default() -> Self {
        Self {
            latitude_deg: 47.5,
            longitude_deg: -122.25,
            target_time_s: default_target_time_s(),
            tolerance_deg: default_waypoint_tolerance_deg(),
        }
    }
}

impl WaypointConfig {
    #[must_use]
    pub const fn position(&self) -> GeodeticPosition {
        GeodeticPosition::new(self.latitude_deg, self.longitude_deg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(-90.0..=90.0).contains(&self.latitude_deg) {
            return Err(invalid("waypoint.latitude_deg", "must be in [-90, 90]"));
        }
        if !(-180.0..=180.0).contains(&self.longitude_deg) {
            return Err(invalid("waypoint.longitude_deg", "must be in [-180, 180]"));
        }
        if !(self.target_time_s.is_finite() && self.target_time_s > 0.0) {
            return Err(invalid("waypoint.target_time_s", "must be > 0"));
        }
        if !(self.tolerance_deg.is_finite() && self.tolerance_deg > 0.0) {
            return Err(invalid("waypoint.tolerance_deg", "must be > 0"));
        }
        Ok(())
    }
}

/// Ordered catalog keys defining the observation and action layouts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariablesConfig {
    #[serde(default = "default_state_variables")]
    pub state: Vec<String>,

    #[serde(default = "default_action_variables")]
    pub action: Vec<String>,
}

impl Default for VariablesConfig {
    fn default() -> Self {
        Self {
            state: default_state_variables(),
            action: default_action_variables(),
        }
    }
}
