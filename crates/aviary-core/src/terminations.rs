//! Termination conditions for flight-control tasks.
//!
//! Error-bound checks treat a non-finite reading as a violation, so a
//! diverging state always ends the episode.

use crate::geo::{GeodeticPosition, minimal_angle_deg};
use crate::property::{Property, catalog};
use crate::traits::TerminationCondition;
use crate::types::{StepContext, TerminationKind};

/// `true` unless `value` is finite and `|value| < bound`.
fn outside(value: f64, bound: f64) -> bool {
    value.is_nan() || value.abs() >= bound
}

// ---------------------------------------------------------------------------
// StepBudgetTermination
// ---------------------------------------------------------------------------

/// Fires when the episode has used its whole step budget.
#[derive(Debug, Clone, Copy, Default)]
pub struct StepBudgetTermination;

impl TerminationCondition for StepBudgetTermination {
    fn is_terminated(&self, ctx: &StepContext<'_>) -> bool {
        ctx.progress.steps_left == 0
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "StepBudgetTermination"
    }

    fn kind(&self) -> TerminationKind {
        TerminationKind::TimeLimit
    }
}

// ---------------------------------------------------------------------------
// HeadingErrorTermination
// ---------------------------------------------------------------------------

/// Fires when `|delta_heading| >= max_deg`.
#[derive(Debug, Clone, Copy)]
pub struct HeadingErrorTermination {
    max_deg: f64,
}

impl HeadingErrorTermination {
    pub const DEFAULT_MAX_DEG: f64 = 80.0;

    #[must_use]
    pub const fn new(max_deg: f64) -> Self {
        Self { max_deg }
    }
}

impl TerminationCondition for HeadingErrorTermination {
    fn is_terminated(&self, ctx: &StepContext<'_>) -> bool {
        outside(ctx.current.value(&catalog::DELTA_HEADING), self.max_deg)
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "HeadingErrorTermination"
    }

    fn properties(&self) -> Vec<Property> {
        vec![catalog::DELTA_HEADING]
    }
}

// ---------------------------------------------------------------------------
// AltitudeErrorTermination
// ---------------------------------------------------------------------------

/// Fires when `|delta_altitude| >= max_ft`.
#[derive(Debug, Clone, Copy)]
pub struct AltitudeErrorTermination {
    max_ft: f64,
}

impl AltitudeErrorTermination {
    pub const DEFAULT_MAX_FT: f64 = 600.0;

    #[must_use]
    pub const fn new(max_ft: f64) -> Self {
        Self { max_ft }
    }
}

impl TerminationCondition for AltitudeErrorTermination {
    fn is_terminated(&self, ctx: &StepContext<'_>) -> bool {
        outside(ctx.current.value(&catalog::DELTA_ALTITUDE), self.max_ft)
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "AltitudeErrorTermination"
    }

    fn properties(&self) -> Vec<Property> {
        vec![catalog::DELTA_ALTITUDE]
    }
}

// ---------------------------------------------------------------------------
// AltitudeFloorTermination
// ---------------------------------------------------------------------------

/// Fires when altitude MSL drops strictly below `min_ft`.
#[derive(Debug, Clone, Copy)]
pub struct AltitudeFloorTermination {
    min_ft: f64,
}

impl AltitudeFloorTermination {
    #[must_use]
    pub const fn new(min_ft: f64) -> Self {
        Self { min_ft }
    }
}

impl TerminationCondition for AltitudeFloorTermination {
    fn is_terminated(&self, ctx: &StepContext<'_>) -> bool {
        let altitude = ctx.current.value(&catalog::ALTITUDE_SL_FT);
        altitude.is_nan() || altitude < self.min_ft
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "AltitudeFloorTermination"
    }

    fn properties(&self) -> Vec<Property> {
        vec![catalog::ALTITUDE_SL_FT]
    }
}

// ---------------------------------------------------------------------------
// ExtremeStateTermination
// ---------------------------------------------------------------------------

/// Fires when the simulator raises its extreme-state flag.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtremeStateTermination;

impl TerminationCondition for ExtremeStateTermination {
    fn is_terminated(&self, ctx: &StepContext<'_>) -> bool {
        ctx.current.value(&catalog::EXTREME_STATE) != 0.0
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "ExtremeStateTermination"
    }

    fn properties(&self) -> Vec<Property> {
        vec![catalog::EXTREME_STATE]
    }
}

// ---------------------------------------------------------------------------
// WaypointTermination
// ---------------------------------------------------------------------------

/// Succeeds when the aircraft is within `tolerance_deg` of the waypoint on
/// both latitude and longitude.
#[derive(Debug, Clone, Copy)]
pub struct WaypointTermination {
    waypoint: GeodeticPosition,
    tolerance_deg: f64,
}

impl WaypointTermination {
    pub const DEFAULT_TOLERANCE_DEG: f64 = 1e-7;

    #[must_use]
    pub const fn new(waypoint: GeodeticPosition, tolerance_deg: f64) -> Self {
        Self {
            waypoint,
            tolerance_deg,
        }
    }
}

impl TerminationCondition for WaypointTermination {
    fn is_terminated(&self, ctx: &StepContext<'_>) -> bool {
        let here = GeodeticPosition::new(
            ctx.current.value(&catalog::LAT_GEOD_DEG),
            ctx.current.value(&catalog::LNG_GEOC_DEG),
        );
        here.within(&self.waypoint, self.tolerance_deg)
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "WaypointTermination"
    }

    fn kind(&self) -> TerminationKind {
        TerminationKind::Success
    }

    fn properties(&self) -> Vec<Property> {
        vec![catalog::LAT_GEOD_DEG, catalog::LNG_GEOC_DEG]
    }
}

// ---------------------------------------------------------------------------
// RetargetCheckpointTermination
// ---------------------------------------------------------------------------

/// Evaluated only on steps where the target scheduler fired: the aircraft
/// must have been holding the outgoing target within `max_heading_deg`
/// (strict) and `max_altitude_ft` (exclusive) or the episode ends.
#[derive(Debug, Clone, Copy)]
pub struct RetargetCheckpointTermination {
    max_heading_deg: f64,
    max_altitude_ft: f64,
}

impl RetargetCheckpointTermination {
    pub const DEFAULT_MAX_HEADING_DEG: f64 = 10.0;
    pub const DEFAULT_MAX_ALTITUDE_FT: f64 = 100.0;

    #[must_use]
    pub const fn new(max_heading_deg: f64, max_altitude_ft: f64) -> Self {
        Self {
            max_heading_deg,
            max_altitude_ft,
        }
    }
}

impl Default for RetargetCheckpointTermination {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_HEADING_DEG, Self::DEFAULT_MAX_ALTITUDE_FT)
    }
}

impl TerminationCondition for RetargetCheckpointTermination {
    fn is_terminated(&self, ctx: &StepContext<'_>) -> bool {
        let Some(change) = ctx.retarget else {
            return false;
        };
        let heading_error = minimal_angle_deg(
            ctx.current.value(&catalog::HEADING_DEG),
            change.before.heading_deg,
        );
        let altitude_error = ctx.current.value(&catalog::ALTITUDE_SL_FT) - change.before.altitude_ft;
        heading_error.is_nan()
            || heading_error > self.max_heading_deg
            || outside(altitude_error, self.max_altitude_ft)
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "RetargetCheckpointTermination"
    }

    fn properties(&self) -> Vec<Property> {
        vec![catalog::HEADING_DEG, catalog::ALTITUDE_SL_FT]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::CompositeTermination;
    use crate::types::{EpisodeProgress, Snapshot, TargetChange, Targets};

    fn check(
        condition: &dyn TerminationCondition,
        current: &[(Property, f64)],
        steps_left: u32,
        retarget: Option<&TargetChange>,
    ) -> bool {
        let previous = Snapshot::new();
        let current = Snapshot::from_pairs(current);
        let ctx = StepContext {
            previous: &previous,
            current: &current,
            progress: EpisodeProgress {
                episode_index: 1,
                step_budget: 10,
                steps_left,
                step_count: 10 - steps_left,
            },
            targets: Targets::new(0.0, 10_000.0),
            initial: Targets::new(0.0, 10_000.0),
            sim_time_s: 0.0,
            retarget,
        };
        condition.is_terminated(&ctx)
    }

    #[test]
    fn step_budget_fires_at_zero_only() {
        assert!(!check(&StepBudgetTermination, &[], 1, None));
        assert!(check(&StepBudgetTermination, &[], 0, None));
        assert_eq!(StepBudgetTermination.kind(), TerminationKind::TimeLimit);
    }

    #[test]
    fn heading_error_bound_is_inclusive_and_signed() {
        let t = HeadingErrorTermination::new(80.0);
        assert!(!check(&t, &[(catalog::DELTA_HEADING, 79.9)], 5, None));
        assert!(check(&t, &[(catalog::DELTA_HEADING, 80.0)], 5, None));
        assert!(check(&t, &[(catalog::DELTA_HEADING, -120.0)], 5, None));
        assert!(check(&t, &[(catalog::DELTA_HEADING, f64::NAN)], 5, None));
    }

    #[test]
    fn altitude_error_bound() {
        let t = AltitudeErrorTermination::new(600.0);
        assert!(!check(&t, &[(catalog::DELTA_ALTITUDE, -599.0)], 5, None));
        assert!(check(&t, &[(catalog::DELTA_ALTITUDE, -600.0)], 5, None));
        assert_eq!(t.kind(), TerminationKind::Failure);
    }

    #[test]
    fn altitude_floor_is_strict() {
        let t = AltitudeFloorTermination::new(2000.0);
        assert!(!check(&t, &[(catalog::ALTITUDE_SL_FT, 2000.0)], 5, None));
        assert!(check(&t, &[(catalog::ALTITUDE_SL_FT, 1999.9)], 5, None));
        assert!(check(&t, &[(catalog::ALTITUDE_SL_FT, f64::NAN)], 5, None));
    }

    #[test]
    fn extreme_state_flag() {
        assert!(!check(&ExtremeStateTermination, &[(catalog::EXTREME_STATE, 0.0)], 5, None));
        assert!(check(&ExtremeStateTermination, &[(catalog::EXTREME_STATE, 1.0)], 5, None));
        assert!(!check(&ExtremeStateTermination, &[], 5, None));
    }

    #[test]
    fn waypoint_arrival_when_on_target() {
        let wp = GeodeticPosition::new(47.449_833_3, -122.311_833_3);
        let t = WaypointTermination::new(wp, WaypointTermination::DEFAULT_TOLERANCE_DEG);
        let on = [
            (catalog::LAT_GEOD_DEG, 47.449_833_3),
            (catalog::LNG_GEOC_DEG, -122.311_833_3),
        ];
        assert!(check(&t, &on, 5, None));
        assert_eq!(t.kind(), TerminationKind::Success);
    }

    #[test]
    fn waypoint_overshoot_is_not_arrival() {
        let wp = GeodeticPosition::new(47.449_833_3, -122.311_833_3);
        let t = WaypointTermination::new(wp, 1e-7);
        let past = [
            (catalog::LAT_GEOD_DEG, 47.5),
            (catalog::LNG_GEOC_DEG, -122.2),
        ];
        assert!(!check(&t, &past, 5, None));
        let short = [
            (catalog::LAT_GEOD_DEG, 47.4),
            (catalog::LNG_GEOC_DEG, -122.4),
        ];
        assert!(!check(&t, &short, 5, None));
    }

    #[test]
    fn checkpoint_ignores_steps_without_retarget() {
        let t = RetargetCheckpointTermination::default();
        assert!(!check(&t, &[(catalog::HEADING_DEG, 180.0)], 5, None));
    }

    #[test]
    fn checkpoint_compares_against_outgoing_target() {
        let t = RetargetCheckpointTermination::default();
        let change = TargetChange {
            time_s: 150.0,
            step: 750,
            before: Targets::new(355.0, 10_000.0),
            after: Targets::new(5.0, 10_100.0),
        };
        let holding = [(catalog::HEADING_DEG, 3.0), (catalog::ALTITUDE_SL_FT, 10_050.0)];
        assert!(!check(&t, &holding, 5, Some(&change)));

        let off_heading = [(catalog::HEADING_DEG, 10.0), (catalog::ALTITUDE_SL_FT, 10_000.0)];
        assert!(check(&t, &off_heading, 5, Some(&change)));

        let off_altitude = [(catalog::HEADING_DEG, 355.0), (catalog::ALTITUDE_SL_FT, 9_900.0)];
        assert!(check(&t, &off_altitude, 5, Some(&change)));
    }

    #[test]
    fn composite_reports_budget_as_time_limit() {
        let composite = CompositeTermination::new()
            .add(Box::new(StepBudgetTermination))
            .add(Box::new(HeadingErrorTermination::new(80.0)));
        let previous = Snapshot::new();
        let current = Snapshot::from_pairs(&[(catalog::DELTA_HEADING, 0.0)]);
        let ctx = StepContext {
            previous: &previous,
            current: &current,
            progress: EpisodeProgress {
                episode_index: 1,
                step_budget: 10,
                steps_left: 0,
                step_count: 10,
            },
            targets: Targets::new(0.0, 0.0),
            initial: Targets::new(0.0, 0.0),
            sim_time_s: 2.0,
            retarget: None,
        };
        let fired = composite.evaluate(&ctx).unwrap();
        assert_eq!(fired.name, "StepBudgetTermination");
        assert!(fired.is_truncation());
        assert_eq!(composite.properties(), vec![catalog::DELTA_HEADING]);
    }
}
