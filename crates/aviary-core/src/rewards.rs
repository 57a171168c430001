//! Reward building blocks for flight-control tasks.
//!
//! Every term maps a physical error to a bounded, finite value. Unit-scale
//! terms ([`GaussianReward`], [`InverseDistanceReward`]) lie in `[0, 1]` and
//! reach `1` at zero error; non-finite errors map to `0`. Terms are combined
//! either with [`GeometricMeanReward`] or with a weighted
//! [`CompositeReward`](crate::traits::CompositeReward).

use std::f64::consts::PI;

use crate::geo::{GeodeticPosition, minimal_angle_deg};
use crate::property::{Property, catalog};
use crate::traits::RewardFunction;
use crate::types::{Snapshot, StepContext};

// ---------------------------------------------------------------------------
// Unit-scale shaping functions
// ---------------------------------------------------------------------------

/// `exp(-(error/scale)^2)`; `0` for non-finite input or a non-positive scale.
#[must_use]
pub fn gaussian(error: f64, scale: f64) -> f64 {
    if !error.is_finite() || scale.is_nan() || scale <= 0.0 {
        return 0.0;
    }
    (-(error / scale).powi(2)).exp()
}

/// `1 / sqrt(k*|error| + 1)` with the radicand floored at `1`.
#[must_use]
pub fn inverse_distance(error: f64, k: f64) -> f64 {
    if !error.is_finite() || !k.is_finite() {
        return 0.0;
    }
    1.0 / (k * error.abs() + 1.0).max(1.0).sqrt()
}

/// Map a NaN/Inf term into the zero-reward end; clamp the rest into `[0, 1]`.
fn unit_or_zero(value: f64) -> f64 {
    if value.is_finite() { value.clamp(0.0, 1.0) } else { 0.0 }
}

// ---------------------------------------------------------------------------
// ErrorSignal
// ---------------------------------------------------------------------------

/// Which snapshot a signal reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotSource {
    /// State before this step's action took effect.
    Previous,
    /// State after this step's integration.
    Current,
}

impl SnapshotSource {
    const fn pick<'a>(self, ctx: &StepContext<'a>) -> &'a Snapshot {
        match self {
            Self::Previous => ctx.previous,
            Self::Current => ctx.current,
        }
    }
}

/// Heading a [`ErrorSignal::HeadingDeviation`] is measured against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HeadingReference {
    Fixed(f64),
    /// Heading at the start of the episode.
    Initial,
    /// Heading target in effect for this step.
    Target,
}

/// A scalar physical error extracted from a step context.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorSignal {
    /// `value(property) - nominal`.
    Deviation {
        property: Property,
        nominal: f64,
        source: SnapshotSource,
    },
    /// Minimal angle between the current heading and a reference.
    HeadingDeviation {
        reference: HeadingReference,
        source: SnapshotSource,
    },
    /// `sqrt(u^2 + v^2) - nominal`.
    GroundSpeed {
        nominal_fps: f64,
        source: SnapshotSource,
    },
    /// `| ||(n_x, n_y, n_z)|| - 1 |`, zero in steady level flight.
    AccelerationMagnitude { source: SnapshotSource },
}

impl ErrorSignal {
    /// Deviation of `property` from zero.
    #[must_use]
    pub const fn of(property: Property, source: SnapshotSource) -> Self {
        Self::Deviation {
            property,
            nominal: 0.0,
            source,
        }
    }

    /// Deviation of `property` from `nominal`.
    #[must_use]
    pub const fn around(property: Property, nominal: f64, source: SnapshotSource) -> Self {
        Self::Deviation {
            property,
            nominal,
            source,
        }
    }

    #[must_use]
    pub fn evaluate(&self, ctx: &StepContext<'_>) -> f64 {
        match self {
            Self::Deviation {
                property,
                nominal,
                source,
            } => source.pick(ctx).value(property) - nominal,
            Self::HeadingDeviation { reference, source } => {
                let heading = source.pick(ctx).value(&catalog::HEADING_DEG);
                let reference = match reference {
                    HeadingReference::Fixed(h) => *h,
                    HeadingReference::Initial => ctx.initial.heading_deg,
                    HeadingReference::Target => ctx.targets.heading_deg,
                };
                minimal_angle_deg(heading, reference)
            }
            Self::GroundSpeed {
                nominal_fps,
                source,
            } => {
                let snapshot = source.pick(ctx);
                let u = snapshot.value(&catalog::U_FPS);
                let v = snapshot.value(&catalog::V_FPS);
                u.hypot(v) - nominal_fps
            }
            Self::AccelerationMagnitude { source } => {
                let snapshot = source.pick(ctx);
                let norm = [catalog::N_PILOT_X, catalog::N_PILOT_Y, catalog::N_PILOT_Z]
                    .iter()
                    .map(|p| snapshot.value(p).powi(2))
                    .sum::<f64>()
                    .sqrt();
                (norm - 1.0).abs()
            }
        }
    }

    /// Properties the signal reads.
    #[must_use]
    pub fn properties(&self) -> Vec<Property> {
        match self {
            Self::Deviation { property, .. } => vec![*property],
            Self::HeadingDeviation { .. } => vec![catalog::HEADING_DEG],
            Self::GroundSpeed { .. } => vec![catalog::U_FPS, catalog::V_FPS],
            Self::AccelerationMagnitude { .. } => {
                vec![catalog::N_PILOT_X, catalog::N_PILOT_Y, catalog::N_PILOT_Z]
            }
        }
    }
}

// ---------------------------------------------------------------------------
// GaussianReward
// ---------------------------------------------------------------------------

/// `exp(-(error/scale)^2)` of an [`ErrorSignal`].
pub struct GaussianReward {
    label: &'static str,
    signal: ErrorSignal,
    scale: f64,
}

impl GaussianReward {
    #[must_use]
    pub const fn new(label: &'static str, signal: ErrorSignal, scale: f64) -> Self {
        Self {
            label,
            signal,
            scale,
        }
    }
}

impl RewardFunction for GaussianReward {
    fn compute(&self, ctx: &StepContext<'_>) -> f64 {
        gaussian(self.signal.evaluate(ctx), self.scale)
    }

    fn name(&self) -> &str {
        self.label
    }

    fn properties(&self) -> Vec<Property> {
        self.signal.properties()
    }
}

// ---------------------------------------------------------------------------
// InverseDistanceReward
// ---------------------------------------------------------------------------

/// `1 / sqrt(k*|error| + 1)` of an [`ErrorSignal`].
pub struct InverseDistanceReward {
    label: &'static str,
    signal: ErrorSignal,
    k: f64,
}

impl InverseDistanceReward {
    #[must_use]
    pub const fn new(label: &'static str, signal: ErrorSignal, k: f64) -> Self {
        Self { label, signal, k }
    }
}

impl RewardFunction for InverseDistanceReward {
    fn compute(&self, ctx: &StepContext<'_>) -> f64 {
        inverse_distance(self.signal.evaluate(ctx), self.k)
    }

    fn name(&self) -> &str {
        self.label
    }

    fn properties(&self) -> Vec<Property> {
        self.signal.properties()
    }
}

// ---------------------------------------------------------------------------
// GeometricMeanReward
// ---------------------------------------------------------------------------

/// `(prod term_i)^(1/N)` over unit-scale terms.
///
/// Each term is clamped into `[0, 1]` (non-finite terms count as `0`), so
/// the result lies in `[0, 1]` and equals `1` only when every term does. An
/// empty mean is `1`.
pub struct GeometricMeanReward {
    label: &'static str,
    terms: Vec<Box<dyn RewardFunction>>,
}

impl GeometricMeanReward {
    #[must_use]
    pub const fn new(label: &'static str) -> Self {
        Self {
            label,
            terms: Vec::new(),
        }
    }

    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn add(mut self, term: Box<dyn RewardFunction>) -> Self {
        self.terms.push(term);
        self
    }

    /// Unit-scale value of each term, before aggregation.
    pub fn breakdown(&self, ctx: &StepContext<'_>) -> Vec<(&str, f64)> {
        self.terms
            .iter()
            .map(|t| (t.name(), unit_or_zero(t.compute(ctx))))
            .collect()
    }
}

impl RewardFunction for GeometricMeanReward {
    #[allow(clippy::cast_precision_loss)]
    fn compute(&self, ctx: &StepContext<'_>) -> f64 {
        if self.terms.is_empty() {
            return 1.0;
        }
        let product: f64 = self
            .terms
            .iter()
            .map(|t| unit_or_zero(t.compute(ctx)))
            .product();
        product.powf(1.0 / self.terms.len() as f64)
    }

    fn name(&self) -> &str {
        self.label
    }

    fn properties(&self) -> Vec<Property> {
        let mut props = Vec::new();
        for term in &self.terms {
            crate::property::merge_unique(&mut props, term.properties());
        }
        props
    }
}

// ---------------------------------------------------------------------------
// ControlDeltaPenalty
// ---------------------------------------------------------------------------

/// Fixed penalty per control channel that jumped by at least `threshold`
/// between the previous and the current snapshot.
///
/// A non-finite delta counts as a jump.
pub struct ControlDeltaPenalty {
    channels: Vec<Property>,
    threshold: f64,
    penalty: f64,
}

impl ControlDeltaPenalty {
    pub const DEFAULT_THRESHOLD: f64 = 0.5;
    pub const DEFAULT_PENALTY: f64 = -0.2;

    #[must_use]
    pub const fn new(channels: Vec<Property>, threshold: f64, penalty: f64) -> Self {
        Self {
            channels,
            threshold,
            penalty,
        }
    }

    /// Surface positions of both ailerons, elevator, rudder and throttle.
    #[must_use]
    pub fn surface_positions() -> Vec<Property> {
        vec![
            catalog::AILERON_LEFT,
            catalog::AILERON_RIGHT,
            catalog::ELEVATOR,
            catalog::RUDDER,
            catalog::THROTTLE,
        ]
    }

    /// Number of channels whose delta reached the threshold.
    #[must_use]
    pub fn violations(&self, ctx: &StepContext<'_>) -> usize {
        self.channels
            .iter()
            .filter(|channel| {
                let delta = (ctx.current.value(channel) - ctx.previous.value(channel)).abs();
                delta.is_nan() || delta >= self.threshold
            })
            .count()
    }
}

impl RewardFunction for ControlDeltaPenalty {
    #[allow(clippy::cast_precision_loss)]
    fn compute(&self, ctx: &StepContext<'_>) -> f64 {
        self.violations(ctx) as f64 * self.penalty
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "ControlDeltaPenalty"
    }

    fn properties(&self) -> Vec<Property> {
        self.channels.clone()
    }
}

// ---------------------------------------------------------------------------
// SurvivalBonus
// ---------------------------------------------------------------------------

/// `1 / max(steps_left, 1)`: grows as the episode nears its budget.
#[derive(Debug, Clone, Copy, Default)]
pub struct SurvivalBonus;

impl RewardFunction for SurvivalBonus {
    fn compute(&self, ctx: &StepContext<'_>) -> f64 {
        1.0 / f64::from(ctx.progress.steps_left.max(1))
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "SurvivalBonus"
    }
}

// ---------------------------------------------------------------------------
// ArrivalTimeReward
// ---------------------------------------------------------------------------

/// Inverse-distance reward on `|target_time - sim_time|`, paid only while
/// the aircraft sits on the waypoint. Zero elsewhere.
pub struct ArrivalTimeReward {
    waypoint: GeodeticPosition,
    tolerance_deg: f64,
    target_time_s: f64,
    k: f64,
}

impl ArrivalTimeReward {
    #[must_use]
    pub const fn new(
        waypoint: GeodeticPosition,
        tolerance_deg: f64,
        target_time_s: f64,
        k: f64,
    ) -> Self {
        Self {
            waypoint,
            tolerance_deg,
            target_time_s,
            k,
        }
    }
}

impl RewardFunction for ArrivalTimeReward {
    fn compute(&self, ctx: &StepContext<'_>) -> f64 {
        let here = GeodeticPosition::new(
            ctx.current.value(&catalog::LAT_GEOD_DEG),
            ctx.current.value(&catalog::LNG_GEOC_DEG),
        );
        if here.within(&self.waypoint, self.tolerance_deg) {
            inverse_distance(self.target_time_s - ctx.sim_time_s, self.k)
        } else {
            0.0
        }
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "ArrivalTimeReward"
    }

    fn properties(&self) -> Vec<Property> {
        vec![catalog::LAT_GEOD_DEG, catalog::LNG_GEOC_DEG]
    }
}

// ---------------------------------------------------------------------------
// TrackStabilisationReward
// ---------------------------------------------------------------------------

/// Non-positive shaping reward for turn-and-level tasks:
///
/// `-(track + altitude) - exp(-episode_index / decay) * (rates + vertical)`
///
/// where `track` is the heading error over 180 degrees, `altitude` the
/// altitude error over the initial altitude, `rates` the summed body rates
/// over `6*pi` and `vertical` the sink rate over the initial altitude, each
/// capped at `1`. The stabilisation half fades out as training progresses.
pub struct TrackStabilisationReward {
    heading: HeadingReference,
    decay_episodes: f64,
}

impl TrackStabilisationReward {
    pub const DEFAULT_DECAY_EPISODES: f64 = 100.0;

    #[must_use]
    pub const fn new(heading: HeadingReference, decay_episodes: f64) -> Self {
        Self {
            heading,
            decay_episodes,
        }
    }
}

impl Default for TrackStabilisationReward {
    fn default() -> Self {
        Self::new(HeadingReference::Target, Self::DEFAULT_DECAY_EPISODES)
    }
}

fn capped_ratio(numerator: f64, denominator: f64) -> f64 {
    let ratio = numerator.abs() / denominator.abs().max(1.0);
    if ratio.is_finite() { ratio.min(1.0) } else { 1.0 }
}

impl RewardFunction for TrackStabilisationReward {
    #[allow(clippy::cast_precision_loss)]
    fn compute(&self, ctx: &StepContext<'_>) -> f64 {
        let snapshot = ctx.current;
        let track = ErrorSignal::HeadingDeviation {
            reference: self.heading,
            source: SnapshotSource::Current,
        }
        .evaluate(ctx);
        let track_term = capped_ratio(track, 180.0);

        let initial_altitude = ctx.initial.altitude_ft;
        let altitude_term = capped_ratio(
            snapshot.value(&catalog::ALTITUDE_SL_FT) - ctx.targets.altitude_ft,
            initial_altitude,
        );

        let rates = snapshot.value(&catalog::P_RADPS).abs()
            + snapshot.value(&catalog::Q_RADPS).abs()
            + snapshot.value(&catalog::R_RADPS).abs();
        let rates_term = capped_ratio(rates, 6.0 * PI);
        let vertical_term = capped_ratio(snapshot.value(&catalog::V_DOWN_FPS), initial_altitude);

        let decay = if self.decay_episodes > 0.0 {
            (-(ctx.progress.episode_index as f64) / self.decay_episodes).exp()
        } else {
            0.0
        };

        -(track_term + altitude_term) - decay * (rates_term + vertical_term)
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "TrackStabilisationReward"
    }

    fn properties(&self) -> Vec<Property> {
        vec![
            catalog::HEADING_DEG,
            catalog::ALTITUDE_SL_FT,
            catalog::P_RADPS,
            catalog::Q_RADPS,
            catalog::R_RADPS,
            catalog::V_DOWN_FPS,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::CompositeReward;
    use crate::types::{EpisodeProgress, Targets};

    struct Fixture {
        previous: Snapshot,
        current: Snapshot,
        progress: EpisodeProgress,
        targets: Targets,
        initial: Targets,
        sim_time_s: f64,
    }

    impl Fixture {
        fn new(current: &[(Property, f64)]) -> Self {
            Self {
                previous: Snapshot::new(),
                current: Snapshot::from_pairs(current),
                progress: EpisodeProgress {
                    episode_index: 1,
                    step_budget: 100,
                    steps_left: 50,
                    step_count: 50,
                },
                targets: Targets::new(90.0, 10_000.0),
                initial: Targets::new(90.0, 10_000.0),
                sim_time_s: 0.0,
            }
        }

        fn with_previous(mut self, previous: &[(Property, f64)]) -> Self {
            self.previous = Snapshot::from_pairs(previous);
            self
        }

        fn ctx(&self) -> StepContext<'_> {
            StepContext {
                previous: &self.previous,
                current: &self.current,
                progress: self.progress,
                targets: self.targets,
                initial: self.initial,
                sim_time_s: self.sim_time_s,
                retarget: None,
            }
        }
    }

    fn level_flight() -> Vec<(Property, f64)> {
        vec![
            (catalog::DELTA_HEADING, 0.0),
            (catalog::DELTA_ALTITUDE, 0.0),
            (catalog::ROLL_RAD, 0.0),
            (catalog::U_FPS, 800.0),
            (catalog::V_FPS, 0.0),
            (catalog::N_PILOT_X, 0.0),
            (catalog::N_PILOT_Y, 0.0),
            (catalog::N_PILOT_Z, -1.0),
        ]
    }

    fn flight_geometric_mean() -> GeometricMeanReward {
        let cur = SnapshotSource::Current;
        GeometricMeanReward::new("FlightGeometricMean")
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
            .add(Box::new(
                GeometricMeanReward::new("acceleration")
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
                    ))),
            ))
            .add(Box::new(GaussianReward::new(
                "roll",
                ErrorSignal::of(catalog::ROLL_RAD, cur),
                0.09,
            )))
            .add(Box::new(GaussianReward::new(
                "speed",
                ErrorSignal::around(catalog::U_FPS, 800.0, cur),
                16.0,
            )))
    }

    // -----------------------------------------------------------------------
    // Shaping functions
    // -----------------------------------------------------------------------

    #[test]
    fn gaussian_is_one_at_zero_and_decays() {
        assert!((gaussian(0.0, 5.0) - 1.0).abs() < f64::EPSILON);
        assert!((gaussian(5.0, 5.0) - (-1.0f64).exp()).abs() < 1e-12);
        assert!(gaussian(5.0, 5.0) > gaussian(10.0, 5.0));
        assert!((gaussian(-3.0, 2.0) - gaussian(3.0, 2.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn gaussian_guards_degenerate_input() {
        assert!(gaussian(f64::NAN, 1.0).abs() < f64::EPSILON);
        assert!(gaussian(f64::INFINITY, 1.0).abs() < f64::EPSILON);
        assert!(gaussian(1.0, 0.0).abs() < f64::EPSILON);
        assert!(gaussian(1.0, f64::NAN).abs() < f64::EPSILON);
    }

    #[test]
    fn inverse_distance_is_one_at_zero_and_tends_to_zero() {
        for k in [0.01, 0.1, 1.0, 10.0] {
            assert!((inverse_distance(0.0, k) - 1.0).abs() < f64::EPSILON);
            assert!(inverse_distance(1e12, k) < 1e-3);
            assert!(inverse_distance(10.0, k) > inverse_distance(100.0, k));
        }
    }

    #[test]
    fn inverse_distance_known_value() {
        // 1 / sqrt(0.1 * 30 + 1) = 0.5
        assert!((inverse_distance(30.0, 0.1) - 0.5).abs() < 1e-12);
        assert!((inverse_distance(-30.0, 0.1) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn inverse_distance_floors_radicand() {
        assert!((inverse_distance(50.0, -1.0) - 1.0).abs() < f64::EPSILON);
        assert!(inverse_distance(f64::NAN, 0.1).abs() < f64::EPSILON);
        assert!(inverse_distance(1.0, f64::INFINITY).abs() < f64::EPSILON);
    }

    // -----------------------------------------------------------------------
    // ErrorSignal
    // -----------------------------------------------------------------------

    #[test]
    fn heading_deviation_uses_minimal_angle() {
        let mut fx = Fixture::new(&[(catalog::HEADING_DEG, 355.0)]);
        fx.targets = Targets::new(5.0, 0.0);
        let signal = ErrorSignal::HeadingDeviation {
            reference: HeadingReference::Target,
            source: SnapshotSource::Current,
        };
        assert!((signal.evaluate(&fx.ctx()) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn heading_deviation_fixed_and_initial_references() {
        let mut fx = Fixture::new(&[(catalog::HEADING_DEG, 100.0)]);
        fx.initial = Targets::new(40.0, 0.0);
        let fixed = ErrorSignal::HeadingDeviation {
            reference: HeadingReference::Fixed(90.0),
            source: SnapshotSource::Current,
        };
        let initial = ErrorSignal::HeadingDeviation {
            reference: HeadingReference::Initial,
            source: SnapshotSource::Current,
        };
        assert!((fixed.evaluate(&fx.ctx()) - 10.0).abs() < 1e-9);
        assert!((initial.evaluate(&fx.ctx()) - 60.0).abs() < 1e-9);
    }

    #[test]
    fn ground_speed_signal() {
        let fx = Fixture::new(&[(catalog::U_FPS, 300.0), (catalog::V_FPS, 400.0)]);
        let signal = ErrorSignal::GroundSpeed {
            nominal_fps: 450.0,
            source: SnapshotSource::Current,
        };
        assert!((signal.evaluate(&fx.ctx()) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn acceleration_magnitude_zero_in_level_flight() {
        let fx = Fixture::new(&level_flight());
        let signal = ErrorSignal::AccelerationMagnitude {
            source: SnapshotSource::Current,
        };
        assert!(signal.evaluate(&fx.ctx()).abs() < 1e-12);
    }

    #[test]
    fn signal_reads_requested_snapshot() {
        let fx = Fixture::new(&[(catalog::ROLL_RAD, 0.5)]).with_previous(&[(catalog::ROLL_RAD, 0.1)]);
        let prev = ErrorSignal::of(catalog::ROLL_RAD, SnapshotSource::Previous);
        let cur = ErrorSignal::of(catalog::ROLL_RAD, SnapshotSource::Current);
        assert!((prev.evaluate(&fx.ctx()) - 0.1).abs() < f64::EPSILON);
        assert!((cur.evaluate(&fx.ctx()) - 0.5).abs() < f64::EPSILON);
    }

    // -----------------------------------------------------------------------
    // GeometricMeanReward
    // -----------------------------------------------------------------------

    #[test]
    fn geometric_mean_is_one_with_zero_errors() {
        let fx = Fixture::new(&level_flight());
        let reward = flight_geometric_mean();
        assert!((reward.compute(&fx.ctx()) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn geometric_mean_non_increasing_in_each_error() {
        let reward = flight_geometric_mean();
        for (property, step) in [
            (catalog::DELTA_HEADING, 1.0),
            (catalog::DELTA_ALTITUDE, 20.0),
            (catalog::ROLL_RAD, 0.02),
            (catalog::N_PILOT_X, 0.02),
        ] {
            let mut last = f64::INFINITY;
            for i in 0..20 {
                let mut values = level_flight();
                for (p, v) in &mut values {
                    if p.name == property.name {
                        *v = f64::from(i) * step;
                    }
                }
                let value = reward.compute(&Fixture::new(&values).ctx());
                assert!(value <= last, "{property} not monotone at {i}");
                assert!((0.0..=1.0).contains(&value));
                last = value;
            }
        }
    }

    #[test]
    fn geometric_mean_nan_term_yields_zero() {
        let mut values = level_flight();
        values[0].1 = f64::NAN;
        let value = flight_geometric_mean().compute(&Fixture::new(&values).ctx());
        assert!(value.abs() < f64::EPSILON);
    }

    #[test]
    fn geometric_mean_empty_is_one() {
        let fx = Fixture::new(&[]);
        let reward = GeometricMeanReward::new("empty");
        assert!((reward.compute(&fx.ctx()) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn geometric_mean_breakdown_and_properties() {
        let fx = Fixture::new(&level_flight());
        let reward = flight_geometric_mean();
        let parts = reward.breakdown(&fx.ctx());
        assert_eq!(parts.len(), 5);
        assert_eq!(parts[2].0, "acceleration");
        assert!(reward.properties().contains(&catalog::N_PILOT_Z));
    }

    // -----------------------------------------------------------------------
    // ControlDeltaPenalty
    // -----------------------------------------------------------------------

    #[test]
    fn control_penalty_applies_once_per_jumping_channel() {
        let penalty = ControlDeltaPenalty::new(
            ControlDeltaPenalty::surface_positions(),
            ControlDeltaPenalty::DEFAULT_THRESHOLD,
            ControlDeltaPenalty::DEFAULT_PENALTY,
        );
        let fx = Fixture::new(&[(catalog::AILERON_LEFT, 0.6), (catalog::ELEVATOR, 0.1)])
            .with_previous(&[(catalog::AILERON_LEFT, 0.0), (catalog::ELEVATOR, 0.0)]);
        assert_eq!(penalty.violations(&fx.ctx()), 1);
        assert!((penalty.compute(&fx.ctx()) + 0.2).abs() < 1e-12);
    }

    #[test]
    fn control_penalty_threshold_is_inclusive() {
        let penalty = ControlDeltaPenalty::new(vec![catalog::RUDDER], 0.5, -0.2);
        let fx = Fixture::new(&[(catalog::RUDDER, 0.5)]).with_previous(&[(catalog::RUDDER, 0.0)]);
        assert_eq!(penalty.violations(&fx.ctx()), 1);
        let calm = Fixture::new(&[(catalog::RUDDER, 0.49)]).with_previous(&[(catalog::RUDDER, 0.0)]);
        assert_eq!(penalty.violations(&calm.ctx()), 0);
    }

    #[test]
    fn control_penalty_counts_nan_as_jump() {
        let penalty = ControlDeltaPenalty::new(vec![catalog::THROTTLE], 0.5, -0.2);
        let fx = Fixture::new(&[(catalog::THROTTLE, f64::NAN)]);
        assert_eq!(penalty.violations(&fx.ctx()), 1);
    }

    // -----------------------------------------------------------------------
    // SurvivalBonus / ArrivalTimeReward
    // -----------------------------------------------------------------------

    #[test]
    fn survival_bonus_floors_at_one_step() {
        let mut fx = Fixture::new(&[]);
        fx.progress.steps_left = 4;
        assert!((SurvivalBonus.compute(&fx.ctx()) - 0.25).abs() < f64::EPSILON);
        fx.progress.steps_left = 0;
        assert!((SurvivalBonus.compute(&fx.ctx()) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn arrival_time_paid_only_on_waypoint() {
        let waypoint = GeodeticPosition::new(47.449_833_3, -122.311_833_3);
        let reward = ArrivalTimeReward::new(waypoint, 1e-7, 400.0, 0.1);

        let mut on = Fixture::new(&[
            (catalog::LAT_GEOD_DEG, 47.449_833_3),
            (catalog::LNG_GEOC_DEG, -122.311_833_3),
        ]);
        on.sim_time_s = 370.0;
        assert!((reward.compute(&on.ctx()) - 0.5).abs() < 1e-12);

        let off = Fixture::new(&[
            (catalog::LAT_GEOD_DEG, 47.0),
            (catalog::LNG_GEOC_DEG, -122.311_833_3),
        ]);
        assert!(reward.compute(&off.ctx()).abs() < f64::EPSILON);
    }

    // -----------------------------------------------------------------------
    // TrackStabilisationReward
    // -----------------------------------------------------------------------

    #[test]
    fn track_stabilisation_zero_on_target_and_still() {
        let mut fx = Fixture::new(&[
            (catalog::HEADING_DEG, 0.0),
            (catalog::ALTITUDE_SL_FT, 3000.0),
        ]);
        fx.targets = Targets::new(0.0, 3000.0);
        fx.initial = Targets::new(120.0, 12_000.0);
        assert!(TrackStabilisationReward::default().compute(&fx.ctx()).abs() < 1e-12);
    }

    #[test]
    fn track_stabilisation_bounded_below() {
        let mut fx = Fixture::new(&[
            (catalog::HEADING_DEG, 180.0),
            (catalog::ALTITUDE_SL_FT, 80_000.0),
            (catalog::P_RADPS, 7.0),
            (catalog::Q_RADPS, 7.0),
            (catalog::R_RADPS, 7.0),
            (catalog::V_DOWN_FPS, 1e9),
        ]);
        fx.targets = Targets::new(0.0, 3000.0);
        fx.initial = Targets::new(0.0, 10_000.0);
        fx.progress.episode_index = 0;
        let value = TrackStabilisationReward::default().compute(&fx.ctx());
        assert!((value + 4.0).abs() < 1e-12);
    }

    #[test]
    fn track_stabilisation_penalty_decays_with_episodes() {
        let mut fx = Fixture::new(&[
            (catalog::HEADING_DEG, 0.0),
            (catalog::ALTITUDE_SL_FT, 3000.0),
            (catalog::P_RADPS, PI),
        ]);
        fx.targets = Targets::new(0.0, 3000.0);
        fx.progress.episode_index = 0;
        let early = TrackStabilisationReward::default().compute(&fx.ctx());
        fx.progress.episode_index = 500;
        let late = TrackStabilisationReward::default().compute(&fx.ctx());
        assert!(early < late);
        assert!(late <= 0.0);
    }

    // -----------------------------------------------------------------------
    // Weighted arithmetic composition
    // -----------------------------------------------------------------------

    #[test]
    fn weighted_mean_with_penalty_and_survival() {
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
                    0.5,
                    -0.2,
                )),
                1.0 / 6.0,
            )
            .add(Box::new(SurvivalBonus), 1.0 / 6.0);

        let mut fx = Fixture::new(&[(catalog::AILERON_LEFT, 0.6), (catalog::AILERON_RIGHT, -0.6)])
            .with_previous(&[(catalog::DELTA_HEADING, 30.0), (catalog::DELTA_ALTITUDE, 0.0)]);
        fx.progress.steps_left = 1;
        // (2*0.5 + 2*1.0 + 2*(-0.2) + 1.0) / 6 = 3.6 / 6
        assert!((reward.compute(&fx.ctx()) - 0.6).abs() < 1e-12);
    }
}
