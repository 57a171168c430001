//! Target schedulers.
//!
//! A [`TargetScheduler`] is asked once per step whether the targets change.
//! Heading and altitude always change together. Schedulers own their RNG and
//! are reseeded at the start of every episode, so a schedule is a pure
//! function of the episode seed and the simulated time / step budget.

use aviary_core::error::SimError;
use aviary_core::property::catalog;
use aviary_core::traits::PropertyBus;
use aviary_core::types::{EpisodeProgress, TargetChange, Targets};
use aviary_domain_rand::{RandomizationRange, RangeError};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

// ---------------------------------------------------------------------------
// ScheduleState
// ---------------------------------------------------------------------------

/// Scheduler bookkeeping that lives in the episode state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScheduleState {
    /// Periodic: simulated time of the next checkpoint.
    pub next_change_time_s: Option<f64>,
    /// Single-fire: fire once `steps_left` drops to this value.
    pub change_threshold: Option<u32>,
    /// Single-fire: targets to switch to.
    pub pending: Option<Targets>,
    pub already_changed: bool,
    /// Number of changes applied so far.
    pub changes: u32,
}

// ---------------------------------------------------------------------------
// TargetScheduler
// ---------------------------------------------------------------------------

pub trait TargetScheduler: Send + Sync + 'static {
    /// Reseed and produce the schedule state for a fresh episode.
    fn begin_episode(
        &mut self,
        targets: Targets,
        progress: &EpisodeProgress,
        seed: u64,
    ) -> ScheduleState;

    /// New targets if a change fires now, `None` otherwise.
    ///
    /// Called once per step, after integration and before `steps_left` is
    /// decremented.
    fn update(
        &mut self,
        state: &mut ScheduleState,
        targets: &Targets,
        progress: &EpisodeProgress,
        sim_time_s: f64,
    ) -> Option<Targets>;

    fn name(&self) -> &str;
}

/// Write a change's new targets to the bus and log it.
pub fn commit_change<B: PropertyBus + ?Sized>(
    bus: &mut B,
    change: &TargetChange,
) -> Result<(), SimError> {
    bus.set(&catalog::TARGET_HEADING_DEG, change.after.heading_deg)?;
    bus.set(&catalog::TARGET_ALTITUDE_FT, change.after.altitude_ft)?;
    tracing::info!(
        time_s = change.time_s,
        step = change.step,
        heading_before = change.before.heading_deg,
        heading_after = change.after.heading_deg,
        altitude_before = change.before.altitude_ft,
        altitude_after = change.after.altitude_ft,
        "target changed"
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// FixedTargets
// ---------------------------------------------------------------------------

/// Targets never change.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedTargets;

impl TargetScheduler for FixedTargets {
    fn begin_episode(
        &mut self,
        _targets: Targets,
        _progress: &EpisodeProgress,
        _seed: u64,
    ) -> ScheduleState {
        ScheduleState::default()
    }

    fn update(
        &mut self,
        _state: &mut ScheduleState,
        _targets: &Targets,
        _progress: &EpisodeProgress,
        _sim_time_s: f64,
    ) -> Option<Targets> {
        None
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "FixedTargets"
    }
}

// ---------------------------------------------------------------------------
// PeriodicRetarget
// ---------------------------------------------------------------------------

/// Steps the targets away every `interval_s` of simulated time.
///
/// At the `n`-th checkpoint the heading moves by `n * heading_step_deg` and
/// the altitude by `n * altitude_step_ft`, each with an independent random
/// sign. Headings are wrapped into `[0, 360)`; altitudes are clamped to the
/// target-altitude bounds.
#[derive(Debug, Clone)]
pub struct PeriodicRetarget {
    interval_s: f64,
    heading_step_deg: f64,
    altitude_step_ft: f64,
    rng: ChaCha8Rng,
}

impl PeriodicRetarget {
    pub const DEFAULT_INTERVAL_S: f64 = 150.0;
    pub const DEFAULT_HEADING_STEP_DEG: f64 = 10.0;
    pub const DEFAULT_ALTITUDE_STEP_FT: f64 = 100.0;

    #[must_use]
    pub fn new(interval_s: f64, heading_step_deg: f64, altitude_step_ft: f64) -> Self {
        Self {
            interval_s,
            heading_step_deg,
            altitude_step_ft,
            rng: ChaCha8Rng::seed_from_u64(0),
        }
    }

    fn sign(&mut self) -> f64 {
        if self.rng.r#gen::<bool>() { 1.0 } else { -1.0 }
    }
}

impl Default for PeriodicRetarget {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_INTERVAL_S,
            Self::DEFAULT_HEADING_STEP_DEG,
            Self::DEFAULT_ALTITUDE_STEP_FT,
        )
    }
}

impl TargetScheduler for PeriodicRetarget {
    fn begin_episode(
        &mut self,
        _targets: Targets,
        _progress: &EpisodeProgress,
        seed: u64,
    ) -> ScheduleState {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        ScheduleState {
            next_change_time_s: Some(self.interval_s),
            ..ScheduleState::default()
        }
    }

    fn update(
        &mut self,
        state: &mut ScheduleState,
        targets: &Targets,
        _progress: &EpisodeProgress,
        sim_time_s: f64,
    ) -> Option<Targets> {
        let next = state.next_change_time_s?;
        if sim_time_s.is_nan() || sim_time_s < next {
            return None;
        }

        let index = (next / self.interval_s).round();
        let altitude = targets.altitude_ft + self.sign() * index * self.altitude_step_ft;
        let heading = targets.heading_deg + self.sign() * index * self.heading_step_deg;

        state.next_change_time_s = Some(next + self.interval_s);
        state.changes += 1;
        Some(Targets::new(heading, altitude).normalized())
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "PeriodicRetarget"
    }
}

// ---------------------------------------------------------------------------
// SingleRetarget
// ---------------------------------------------------------------------------

/// Changes the targets exactly once, at a step drawn inside a mid-episode
/// window.
///
/// At episode start it samples a threshold inside `window` (fractions of the
/// step budget) and the new targets: heading offset `U(-max_heading, max_heading)`
/// wrapped, altitude offset `U(-max_altitude, max_altitude)` clamped. The
/// change fires on the first step where `steps_left <= threshold`.
#[derive(Debug, Clone)]
pub struct SingleRetarget {
    window: [f64; 2],
    heading_offset: RandomizationRange,
    altitude_offset: RandomizationRange,
    rng: ChaCha8Rng,
}

impl SingleRetarget {
    pub const DEFAULT_WINDOW: [f64; 2] = [0.33, 0.66];
    pub const DEFAULT_MAX_HEADING_OFFSET_DEG: f64 = 90.0;
    pub const DEFAULT_MAX_ALTITUDE_OFFSET_FT: f64 = 4000.0;

    pub fn new(
        window: [f64; 2],
        max_heading_offset_deg: f64,
        max_altitude_offset_ft: f64,
    ) -> Result<Self, RangeError> {
        let [lo, hi] = window;
        if !(0.0..=1.0).contains(&lo) || !(0.0..=1.0).contains(&hi) || lo > hi {
            return Err(RangeError::InvalidBounds { low: lo, high: hi });
        }
        Ok(Self {
            window,
            heading_offset: RandomizationRange::symmetric(max_heading_offset_deg)?,
            altitude_offset: RandomizationRange::symmetric(max_altitude_offset_ft)?,
            rng: ChaCha8Rng::seed_from_u64(0),
        })
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::float_cmp
    )]
    fn sample_threshold(&mut self, step_budget: u32) -> u32 {
        let budget = f64::from(step_budget);
        let [lo, hi] = self.window;
        let step = if lo == hi {
            lo * budget
        } else {
            self.rng.gen_range(lo * budget..=hi * budget)
        };
        step.round() as u32
    }
}

impl Default for SingleRetarget {
    fn default() -> Self {
        Self {
            window: Self::DEFAULT_WINDOW,
            heading_offset: RandomizationRange::Uniform {
                low: -Self::DEFAULT_MAX_HEADING_OFFSET_DEG,
                high: Self::DEFAULT_MAX_HEADING_OFFSET_DEG,
            },
            altitude_offset: RandomizationRange::Uniform {
                low: -Self::DEFAULT_MAX_ALTITUDE_OFFSET_FT,
                high: Self::DEFAULT_MAX_ALTITUDE_OFFSET_FT,
            },
            rng: ChaCha8Rng::seed_from_u64(0),
        }
    }
}

impl TargetScheduler for SingleRetarget {
    fn begin_episode(
        &mut self,
        targets: Targets,
        progress: &EpisodeProgress,
        seed: u64,
    ) -> ScheduleState {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        let threshold = self.sample_threshold(progress.step_budget);
        let pending = Targets::new(
            targets.heading_deg + self.heading_offset.sample(&mut self.rng),
            targets.altitude_ft + self.altitude_offset.sample(&mut self.rng),
        )
        .normalized();
        ScheduleState {
            change_threshold: Some(threshold),
            pending: Some(pending),
            ..ScheduleState::default()
        }
    }

    fn update(
        &mut self,
        state: &mut ScheduleState,
        _targets: &Targets,
        progress: &EpisodeProgress,
        _sim_time_s: f64,
    ) -> Option<Targets> {
        if state.already_changed {
            return None;
        }
        let threshold = state.change_threshold?;
        if progress.steps_left > threshold {
            return None;
        }
        state.already_changed = true;
        state.changes += 1;
        state.pending
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "SingleRetarget"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use aviary_core::property::Property;

    use super::*;

    fn progress(budget: u32, steps_left: u32) -> EpisodeProgress {
        EpisodeProgress {
            episode_index: 1,
            step_budget: budget,
            steps_left,
            step_count: budget - steps_left,
        }
    }

    // -- FixedTargets --

    #[test]
    fn fixed_never_fires() {
        let mut scheduler = FixedTargets;
        let targets = Targets::new(90.0, 10_000.0);
        let mut state = scheduler.begin_episode(targets, &progress(100, 100), 1);
        for t in 0..1000 {
            assert!(
                scheduler
                    .update(&mut state, &targets, &progress(100, 50), f64::from(t))
                    .is_none()
            );
        }
        assert_eq!(state.changes, 0);
    }

    // -- PeriodicRetarget --

    #[test]
    fn periodic_waits_for_first_checkpoint() {
        let mut scheduler = PeriodicRetarget::default();
        let targets = Targets::new(90.0, 10_000.0);
        let mut state = scheduler.begin_episode(targets, &progress(5000, 5000), 3);
        assert_eq!(state.next_change_time_s, Some(150.0));
        assert!(
            scheduler
                .update(&mut state, &targets, &progress(5000, 4500), 149.9)
                .is_none()
        );
    }

    #[test]
    fn periodic_offsets_grow_with_checkpoint_index() {
        let mut scheduler = PeriodicRetarget::default();
        let mut targets = Targets::new(180.0, 20_000.0);
        let mut state = scheduler.begin_episode(targets, &progress(5000, 5000), 11);

        let first = scheduler
            .update(&mut state, &targets, &progress(5000, 4250), 150.0)
            .unwrap();
        assert!(((first.heading_deg - 180.0).abs() - 10.0).abs() < 1e-9);
        assert!(((first.altitude_ft - 20_000.0).abs() - 100.0).abs() < 1e-9);
        assert_eq!(state.next_change_time_s, Some(300.0));
        targets = first;

        let second = scheduler
            .update(&mut state, &targets, &progress(5000, 3500), 300.0)
            .unwrap();
        let heading_delta = (second.heading_deg - first.heading_deg).abs();
        assert!((heading_delta - 20.0).abs() < 1e-9);
        assert!(((second.altitude_ft - first.altitude_ft).abs() - 200.0).abs() < 1e-9);
        assert_eq!(state.changes, 2);
    }

    #[test]
    fn periodic_fires_once_per_checkpoint() {
        let mut scheduler = PeriodicRetarget::default();
        let targets = Targets::new(90.0, 10_000.0);
        let mut state = scheduler.begin_episode(targets, &progress(5000, 5000), 5);
        assert!(
            scheduler
                .update(&mut state, &targets, &progress(5000, 4249), 150.1)
                .is_some()
        );
        assert!(
            scheduler
                .update(&mut state, &targets, &progress(5000, 4248), 150.3)
                .is_none()
        );
    }

    #[test]
    fn periodic_headings_stay_in_range() {
        let mut scheduler = PeriodicRetarget::new(1.0, 97.0, 0.0);
        let mut targets = Targets::new(359.0, 10_000.0);
        let mut state = scheduler.begin_episode(targets, &progress(5000, 5000), 21);
        for t in 1..=200 {
            if let Some(next) =
                scheduler.update(&mut state, &targets, &progress(5000, 100), f64::from(t))
            {
                assert!(
                    (0.0..360.0).contains(&next.heading_deg),
                    "heading {} at t={t}",
                    next.heading_deg
                );
                targets = next;
            }
        }
        assert_eq!(state.changes, 200);
    }

    #[test]
    fn periodic_altitude_is_clamped() {
        let mut scheduler = PeriodicRetarget::new(1.0, 0.0, 50_000.0);
        let mut targets = Targets::new(0.0, 80_000.0);
        let mut state = scheduler.begin_episode(targets, &progress(100, 100), 2);
        for t in 1..=20 {
            if let Some(next) =
                scheduler.update(&mut state, &targets, &progress(100, 50), f64::from(t))
            {
                assert!((-1400.0..=85_000.0).contains(&next.altitude_ft));
                targets = next;
            }
        }
    }

    #[test]
    fn periodic_is_deterministic_per_seed() {
        let run = |seed| {
            let mut scheduler = PeriodicRetarget::default();
            let mut targets = Targets::new(45.0, 12_000.0);
            let mut state = scheduler.begin_episode(targets, &progress(5000, 5000), seed);
            let mut out = Vec::new();
            for k in 1..=5 {
                let t = 150.0 * f64::from(k);
                if let Some(next) = scheduler.update(&mut state, &targets, &progress(5000, 1), t) {
                    targets = next;
                    out.push(next);
                }
            }
            out
        };
        assert_eq!(run(42), run(42));
    }

    // -- SingleRetarget --

    #[test]
    fn single_threshold_inside_window() {
        let mut scheduler = SingleRetarget::default();
        let targets = Targets::new(90.0, 10_000.0);
        for seed in 0..50 {
            let state = scheduler.begin_episode(targets, &progress(5000, 5000), seed);
            let threshold = state.change_threshold.unwrap();
            assert!((1650..=3300).contains(&threshold), "threshold {threshold}");
            let pending = state.pending.unwrap();
            assert!((0.0..360.0).contains(&pending.heading_deg));
            assert!((pending.altitude_ft - 10_000.0).abs() <= 4000.0);
        }
    }

    #[test]
    fn single_fires_exactly_once() {
        let mut scheduler = SingleRetarget::default();
        let targets = Targets::new(90.0, 10_000.0);
        let mut state = scheduler.begin_episode(targets, &progress(100, 100), 8);
        let mut fired = 0;
        for steps_left in (0..=100).rev() {
            if scheduler
                .update(&mut state, &targets, &progress(100, steps_left), 0.0)
                .is_some()
            {
                fired += 1;
                assert!(steps_left <= state.change_threshold.unwrap());
            }
        }
        assert_eq!(fired, 1);
        assert!(state.already_changed);
    }

    #[test]
    fn single_zero_window_and_offsets() {
        let mut scheduler = SingleRetarget::new([0.5, 0.5], 0.0, 0.0).unwrap();
        let targets = Targets::new(200.0, 9000.0);
        let state = scheduler.begin_episode(targets, &progress(10, 10), 1);
        assert_eq!(state.change_threshold, Some(5));
        assert_eq!(state.pending, Some(targets));
    }

    #[test]
    fn single_rejects_bad_window() {
        assert!(SingleRetarget::new([0.7, 0.3], 90.0, 4000.0).is_err());
        assert!(SingleRetarget::new([0.1, 1.5], 90.0, 4000.0).is_err());
    }

    // -- commit_change --

    #[derive(Default)]
    struct MapBus(HashMap<&'static str, f64>);

    impl PropertyBus for MapBus {
        fn get(&self, property: &Property) -> Result<f64, SimError> {
            self.0
                .get(property.name)
                .copied()
                .ok_or_else(|| SimError::UnknownProperty(property.name.into()))
        }

        fn set(&mut self, property: &Property, value: f64) -> Result<(), SimError> {
            self.0.insert(property.name, value);
            Ok(())
        }
    }

    #[test]
    fn commit_change_writes_targets() {
        let mut bus = MapBus::default();
        let change = TargetChange {
            time_s: 150.0,
            step: 750,
            before: Targets::new(90.0, 10_000.0),
            after: Targets::new(80.0, 10_100.0),
        };
        commit_change(&mut bus, &change).unwrap();
        assert!((bus.get(&catalog::TARGET_HEADING_DEG).unwrap() - 80.0).abs() < f64::EPSILON);
        assert!((bus.get(&catalog::TARGET_ALTITUDE_FT).unwrap() - 10_100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn schedulers_are_send_sync() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn TargetScheduler>();
    }
}
