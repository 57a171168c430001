//! Preset task variants, selected by [`TaskKind`].
//!
//! | kind | scheduler | terminations | reward |
//! |---|---|---|---|
//! | `heading_control` | fixed | budget, heading error, altitude error | `(h + a + v + roll)/4 + acc` |
//! | `change_heading` | single | budget, altitude floor | `(2h + 2a + penalty + survival)/6` |
//! | `periodic_heading` | periodic | budget, checkpoint, floor, extreme state | geometric mean |
//! | `waypoint` | fixed | budget, waypoint, altitude error | `(h + a + time)/3` |
//! | `turn_heading_change_level` | fixed target | budget, floor, extreme state | track stabilisation |
//!
//! Every bound reads `config.bounds` first and falls back to the variant
//! default.

use aviary_core::config::{TaskConfig, TaskKind};
use aviary_core::error::ConfigError;
use aviary_core::property::catalog;
use aviary_core::rewards::{
    ArrivalTimeReward, ControlDeltaPenalty, ErrorSignal, GaussianReward, GeometricMeanReward,
    HeadingReference, InverseDistanceReward, SnapshotSource, SurvivalBonus,
    TrackStabilisationReward,
};
use aviary_core::terminations::{
    AltitudeErrorTermination, AltitudeFloorTermination, ExtremeStateTermination,
    HeadingErrorTermination, RetargetCheckpointTermination, StepBudgetTermination,
    WaypointTermination,
};
use aviary_core::traits::CompositeReward;
use aviary_core::traits::CompositeTermination;

use crate::schedule::{FixedTargets, PeriodicRetarget, SingleRetarget};
use crate::task::FlightTask;

/// Altitude floor of the change-heading variant.
pub const CHANGE_HEADING_FLOOR_FT: f64 = 2000.0;
/// Altitude floor of the periodic variant.
pub const PERIODIC_FLOOR_FT: f64 = 3000.0;
/// Altitude error bound of the waypoint variant.
pub const WAYPOINT_MAX_ALTITUDE_ERROR_FT: f64 = 1000.0;
/// Altitude floor of the turn-and-level variant.
pub const TURN_FLOOR_FT: f64 = 1000.0;

/// Build the task for `config.kind`.
pub fn build_task(config: TaskConfig) -> Result<FlightTask, ConfigError> {
    match config.kind {
        TaskKind::HeadingControl => heading_control(config),
        TaskKind::ChangeHeading => change_heading(config),
        TaskKind::PeriodicHeading => periodic_heading(config),
        TaskKind::Waypoint => waypoint(config),
        TaskKind::TurnHeadingChangeLevel => turn_heading_change_level(config),
    }
}

fn expect_kind(config: &TaskConfig, kind: TaskKind) -> Result<(), ConfigError> {
    if config.kind == kind {
        Ok(())
    } else {
        Err(ConfigError::Incompatible(format!(
            "config kind {} used to build a {kind} task",
            config.kind
        )))
    }
}

// ---------------------------------------------------------------------------
// heading_control
// ---------------------------------------------------------------------------

/// Hold the initial heading and altitude.
pub fn heading_control(config: TaskConfig) -> Result<FlightTask, ConfigError> {
    expect_kind(&config, TaskKind::HeadingControl)?;
    let bounds = &config.bounds;
    let termination = CompositeTermination::new()
        .add(Box::new(StepBudgetTermination))
        .add(Box::new(HeadingErrorTermination::new(
            bounds
                .max_heading_error_deg
                .unwrap_or(HeadingErrorTermination::DEFAULT_MAX_DEG),
        )))
        .add(Box::new(AltitudeErrorTermination::new(
            bounds
                .max_altitude_error_ft
                .unwrap_or(AltitudeErrorTermination::DEFAULT_MAX_FT),
        )))
        .add_optional_floor(bounds.min_altitude_ft);

    let prev = SnapshotSource::Previous;
    let reward = CompositeReward::new()
        .add(
            Box::new(InverseDistanceReward::new(
                "heading",
                ErrorSignal::of(catalog::DELTA_HEADING, prev),
                0.1,
            )),
            0.25,
        )
        .add(
            Box::new(InverseDistanceReward::new(
                "altitude",
                ErrorSignal::of(catalog::DELTA_ALTITUDE, prev),
                0.1,
            )),
            0.25,
        )
        .add(
            Box::new(InverseDistanceReward::new(
                "ground_speed",
                ErrorSignal::GroundSpeed {
                    nominal_fps: config.aircraft.cruise_speed_fps,
                    source: prev,
                },
                0.1,
            )),
            0.25,
        )
        .add(
            Box::new(InverseDistanceReward::new(
                "roll",
                ErrorSignal::of(catalog::ROLL_RAD, prev),
                1.0,
            )),
            0.25,
        )
        .add(
            Box::new(InverseDistanceReward::new(
                "acceleration",
                ErrorSignal::AccelerationMagnitude {
                    source: SnapshotSource::Current,
                },
                1.0,
            )),
            1.0,
        );

    FlightTask::new(config, Box::new(FixedTargets), termination, Box::new(reward))
}

// ---------------------------------------------------------------------------
// change_heading
// ---------------------------------------------------------------------------

/// Hold, then follow one target change inside the mid-episode window.
pub fn change_heading(config: TaskConfig) -> Result<FlightTask, ConfigError> {
    expect_kind(&config, TaskKind::ChangeHeading)?;
    let schedule = &config.schedule;
    let scheduler = SingleRetarget::new(
        schedule.window,
        schedule.max_heading_offset_deg,
        schedule.max_altitude_offset_ft,
    )
    .map_err(|e| ConfigError::InvalidValue {
        field: "schedule".into(),
        message: e.to_string(),
    })?;

    let bounds = &config.bounds;
    let mut termination = CompositeTermination::new()
        .add(Box::new(StepBudgetTermination))
        .add(Box::new(AltitudeFloorTermination::new(
            bounds.min_altitude_ft.unwrap_or(CHANGE_HEADING_FLOOR_FT),
        )));
    termination = add_error_bounds(termination, &config);

    let prev = SnapshotSource::Previous;
    let reward = CompositeReward::new()
        .add(
            Box::new(InverseDistanceReward::new(
                "heading",
                ErrorSignal::of(catalog::DELTA_HEADING, prev),
                0.1,
            )),
            2.0 / 6.0,
        )
        .add(
            Box::new(InverseDistanceReward::new(
                "altitude",
                ErrorSignal::of(catalog::DELTA_ALTITUDE, prev),
                0.1,
            )),
            2.0 / 6.0,
        )
        .add(
            Box::new(ControlDeltaPenalty::new(
                ControlDeltaPenalty::surface_positions(),
                config.reward.control_delta_threshold,
                config.reward.control_delta_penalty,
            )),
            1.0 / 6.0,
        )
        .add(Box::new(SurvivalBonus), 1.0 / 6.0);

    FlightTask::new(config, Box::new(scheduler), termination, Box::new(reward))
}

// ---------------------------------------------------------------------------
// periodic_heading
// ---------------------------------------------------------------------------

/// Follow a target that steps away at every checkpoint.
pub fn periodic_heading(config: TaskConfig) -> Result<FlightTask, ConfigError> {
    expect_kind(&config, TaskKind::PeriodicHeading)?;
    let schedule = &config.schedule;
    let scheduler = PeriodicRetarget::new(
        schedule.interval_s,
        schedule.heading_step_deg,
        schedule.altitude_step_ft,
    );

    let bounds = &config.bounds;
    let mut termination = CompositeTermination::new()
        .add(Box::new(StepBudgetTermination))
        .add(Box::new(RetargetCheckpointTermination::new(
            bounds
                .checkpoint_heading_deg
                .unwrap_or(RetargetCheckpointTermination::DEFAULT_MAX_HEADING_DEG),
            bounds
                .checkpoint_altitude_ft
                .unwrap_or(RetargetCheckpointTermination::DEFAULT_MAX_ALTITUDE_FT),
        )))
        .add(Box::new(AltitudeFloorTermination::new(
            bounds.min_altitude_ft.unwrap_or(PERIODIC_FLOOR_FT),
        )))
        .add(Box::new(ExtremeStateTermination));
    termination = add_error_bounds(termination, &config);

    let cur = SnapshotSource::Current;
    let acceleration = GeometricMeanReward::new("acceleration")
        .add(Box::new(GaussianReward::new(
            "n_x",
            ErrorSignal::of(catalog::N_PILOT_X, cur),
            0.1,
        )))
        .add(Box::new(GaussianReward::new(
            "n_y",
            ErrorSignal::of(catalog::N_PILOT_Y, cur),
            0.1,
        )))
        .add(Box::new(GaussianReward::new(
            "n_z",
            ErrorSignal::around(catalog::N_PILOT_Z, -1.0, cur),
            1.0,
        )));
    let reward = GeometricMeanReward::new("PeriodicHeadingReward")
        .add(Box::new(GaussianReward::new(
            "heading",
            ErrorSignal::of(catalog::DELTA_HEADING, cur),
            5.0,
        )))
        .add(Box::new(GaussianReward::new(
            "altitude",
            ErrorSignal::of(catalog::DELTA_ALTITUDE, cur),
            100.0,
        )))
        .add(Box::new(acceleration))
        .add(Box::new(GaussianReward::new(
            "roll",
            ErrorSignal::of(catalog::ROLL_RAD, cur),
            0.09,
        )))
        .add(Box::new(GaussianReward::new(
            "speed",
            ErrorSignal::around(catalog::U_FPS, config.aircraft.cruise_speed_fps, cur),
            16.0,
        )));

    FlightTask::new(config, Box::new(scheduler), termination, Box::new(reward))
}

// ---------------------------------------------------------------------------
// waypoint
// ---------------------------------------------------------------------------

/// Reach the configured waypoint at its target time.
pub fn waypoint(config: TaskConfig) -> Result<FlightTask, ConfigError> {
    expect_kind(&config, TaskKind::Waypoint)?;
    let waypoint = config
        .waypoint
        .clone()
        .ok_or_else(|| ConfigError::MissingField("waypoint".into()))?;

    let bounds = &config.bounds;
    let mut termination = CompositeTermination::new()
        .add(Box::new(StepBudgetTermination))
        .add(Box::new(WaypointTermination::new(
            waypoint.position(),
            waypoint.tolerance_deg,
        )))
        .add(Box::new(AltitudeErrorTermination::new(
            bounds
                .max_altitude_error_ft
                .unwrap_or(WAYPOINT_MAX_ALTITUDE_ERROR_FT),
        )));
    if let Some(max) = bounds.max_heading_error_deg {
        termination = termination.add(Box::new(HeadingErrorTermination::new(max)));
    }
    termination = termination.add_optional_floor(bounds.min_altitude_ft);

    let prev = SnapshotSource::Previous;
    let reward = CompositeReward::new()
        .add(
            Box::new(InverseDistanceReward::new(
                "heading",
                ErrorSignal::HeadingDeviation {
                    reference: HeadingReference::Target,
                    source: prev,
                },
                0.1,
            )),
            1.0 / 3.0,
        )
        .add(
            Box::new(InverseDistanceReward::new(
                "altitude",
                ErrorSignal::of(catalog::DELTA_ALTITUDE, prev),
                0.1,
            )),
            1.0 / 3.0,
        )
        .add(
            Box::new(ArrivalTimeReward::new(
                waypoint.position(),
                waypoint.tolerance_deg,
                waypoint.target_time_s,
                0.1,
            )),
            1.0 / 3.0,
        );

    FlightTask::new(config, Box::new(FixedTargets), termination, Box::new(reward))
}

// ---------------------------------------------------------------------------
// turn_heading_change_level
// ---------------------------------------------------------------------------

/// Turn onto and level at a fixed target.
///
/// The target starts far from the sampled initial state, so the heading and
/// altitude error bounds only apply when configured explicitly.
pub fn turn_heading_change_level(config: TaskConfig) -> Result<FlightTask, ConfigError> {
    expect_kind(&config, TaskKind::TurnHeadingChangeLevel)?;
    let bounds = &config.bounds;
    let mut termination = CompositeTermination::new()
        .add(Box::new(StepBudgetTermination))
        .add(Box::new(AltitudeFloorTermination::new(
            bounds.min_altitude_ft.unwrap_or(TURN_FLOOR_FT),
        )))
        .add(Box::new(ExtremeStateTermination));
    termination = add_error_bounds(termination, &config);

    let reward =
        TrackStabilisationReward::new(HeadingReference::Target, config.reward.decay_episodes);

    FlightTask::new(config, Box::new(FixedTargets), termination, Box::new(reward))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Append the heading/altitude error bounds that are set in `config.bounds`.
fn add_error_bounds(mut termination: CompositeTermination, config: &TaskConfig) -> CompositeTermination {
    if let Some(max) = config.bounds.max_heading_error_deg {
        termination = termination.add(Box::new(HeadingErrorTermination::new(max)));
    }
    if let Some(max) = config.bounds.max_altitude_error_ft {
        termination = termination.add(Box::new(AltitudeErrorTermination::new(max)));
    }
    termination
}

trait OptionalFloor {
    fn add_optional_floor(self, min_ft: Option<f64>) -> Self;
}

impl OptionalFloor for CompositeTermination {
    fn add_optional_floor(self, min_ft: Option<f64>) -> Self {
        match min_ft {
            Some(min) => self.add(Box::new(AltitudeFloorTermination::new(min))),
            None => self,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
