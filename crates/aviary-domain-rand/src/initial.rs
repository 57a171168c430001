//! Per-episode initial conditions and targets.

use aviary_core::config::TaskConfig;
use aviary_core::error::ConfigError;
use aviary_core::geo::{GeodeticPosition, heading_error_deg, wrap_heading_deg};
use aviary_core::property::catalog;
use aviary_core::types::{InitialConditions, Targets};
use rand::Rng;

use crate::ranges::{RandomizationRange, RangeError};

// ---------------------------------------------------------------------------
// TargetPolicy
// ---------------------------------------------------------------------------

/// How the episode's targets relate to its initial state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum TargetPolicy {
    /// Hold the sampled heading and altitude.
    #[default]
    SameAsInitial,
    /// Fixed values; `None` falls back to the initial value on that axis.
    Fixed {
        heading_deg: Option<f64>,
        altitude_ft: Option<f64>,
    },
}

impl TargetPolicy {
    fn resolve(self, initial: Targets) -> Targets {
        match self {
            Self::SameAsInitial => initial,
            Self::Fixed {
                heading_deg,
                altitude_ft,
            } => Targets::new(
                heading_deg.unwrap_or(initial.heading_deg),
                altitude_ft.unwrap_or(initial.altitude_ft),
            )
            .normalized(),
        }
    }
}

// ---------------------------------------------------------------------------
// EpisodeStart
// ---------------------------------------------------------------------------

/// Output of one generator draw.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeStart {
    /// Everything the simulator needs to initialize, plus target and delta
    /// properties.
    pub conditions: InitialConditions,
    pub initial: Targets,
    pub targets: Targets,
}

// ---------------------------------------------------------------------------
// InitialConditionGenerator
// ---------------------------------------------------------------------------

/// Draws initial heading and altitude and derives the rest of the
/// initial-condition mapping from them.
///
/// Body velocity starts at the airframe's cruise speed along `u`; all rates
/// start at zero.
#[derive(Debug, Clone, PartialEq)]
pub struct InitialConditionGenerator {
    altitude_ft: RandomizationRange,
    heading_deg: RandomizationRange,
    position: GeodeticPosition,
    terrain_elevation_ft: f64,
    cruise_speed_fps: f64,
    targets: TargetPolicy,
}

impl InitialConditionGenerator {
    /// Altitude `U(10000, 20000)` ft, heading over the full heading property range.
    #[must_use]
    pub const fn new(position: GeodeticPosition, cruise_speed_fps: f64) -> Self {
        Self {
            altitude_ft: RandomizationRange::Uniform {
                low: 10_000.0,
                high: 20_000.0,
            },
            heading_deg: RandomizationRange::Uniform {
                low: 0.0,
                high: 360.0,
            },
            position,
            terrain_elevation_ft: 0.0,
            cruise_speed_fps,
            targets: TargetPolicy::SameAsInitial,
        }
    }

    pub fn from_config(config: &TaskConfig) -> Result<Self, ConfigError> {
        let range = |field: &str, bounds: [f64; 2]| {
            RandomizationRange::from_bounds(bounds).map_err(|e: RangeError| {
                ConfigError::InvalidValue {
                    field: field.into(),
                    message: e.to_string(),
                }
            })
        };
        let targets = config
            .target
            .as_ref()
            .map_or(TargetPolicy::SameAsInitial, |t| TargetPolicy::Fixed {
                heading_deg: t.heading_deg,
                altitude_ft: t.altitude_ft,
            });

        let mut altitude_ft = range("initial.altitude_ft", config.initial.altitude_ft)?;
        if let Some(std) = config.initial.altitude_std_ft {
            altitude_ft = RandomizationRange::gaussian(altitude_ft.nominal(), std).map_err(|e| {
                ConfigError::InvalidValue {
                    field: "initial.altitude_std_ft".into(),
                    message: e.to_string(),
                }
            })?;
        }

        Ok(Self {
            altitude_ft,
            heading_deg: range("initial.heading_deg", config.initial.heading_deg)?,
            position: GeodeticPosition::new(
                config.initial.latitude_deg,
                config.initial.longitude_deg,
            ),
            terrain_elevation_ft: config.initial.terrain_elevation_ft,
            cruise_speed_fps: config.aircraft.cruise_speed_fps,
            targets,
        })
    }

    #[must_use]
    pub const fn with_altitude(mut self, range: RandomizationRange) -> Self {
        self.altitude_ft = range;
        self
    }

    #[must_use]
    pub const fn with_heading(mut self, range: RandomizationRange) -> Self {
        self.heading_deg = range;
        self
    }

    #[must_use]
    pub const fn with_targets(mut self, targets: TargetPolicy) -> Self {
        self.targets = targets;
        self
    }

    #[must_use]
    pub const fn with_terrain_elevation(mut self, elevation_ft: f64) -> Self {
        self.terrain_elevation_ft = elevation_ft;
        self
    }

    #[must_use]
    pub const fn position(&self) -> GeodeticPosition {
        self.position
    }

    /// Draw one episode start. Deterministic for a given RNG state.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<EpisodeStart, ConfigError> {
        let altitude = catalog::INITIAL_ALTITUDE_FT.clamp(self.altitude_ft.sample(rng));
        let heading = wrap_heading_deg(self.heading_deg.sample(rng));
        let initial = Targets::new(heading, altitude);
        let targets = self.targets.resolve(initial);

        let conditions = InitialConditions::new()
            .with(catalog::INITIAL_ALTITUDE_FT, altitude)
            .with(catalog::INITIAL_TERRAIN_ALTITUDE_FT, self.terrain_elevation_ft)
            .with(catalog::INITIAL_LONGITUDE_GEOC_DEG, self.position.longitude_deg)
            .with(catalog::INITIAL_LATITUDE_GEOD_DEG, self.position.latitude_deg)
            .with(catalog::INITIAL_U_FPS, self.cruise_speed_fps)
            .with(catalog::INITIAL_V_FPS, 0.0)
            .with(catalog::INITIAL_W_FPS, 0.0)
            .with(catalog::INITIAL_P_RADPS, 0.0)
            .with(catalog::INITIAL_Q_RADPS, 0.0)
            .with(catalog::INITIAL_R_RADPS, 0.0)
            .with(catalog::INITIAL_ROC_FPM, 0.0)
            .with(catalog::INITIAL_HEADING_DEG, heading)
            .with(catalog::TARGET_ALTITUDE_FT, targets.altitude_ft)
            .with(catalog::TARGET_HEADING_DEG, targets.heading_deg)
            .with(
                catalog::DELTA_HEADING,
                heading_error_deg(heading, targets.heading_deg),
            )
            .with(catalog::DELTA_ALTITUDE, altitude - targets.altitude_ft)
            .with(catalog::ALL_ENGINE_RUNNING, -1.0);
        conditions.require(&catalog::REQUIRED_INITIAL_CONDITIONS)?;

        Ok(EpisodeStart {
            conditions,
            initial,
            targets,
        })
    }
}
