//! The flight task: one episode lifecycle over a simulator's property bus.
//!
//! [`FlightTask`] is assembled from injected strategies (a
//! [`TargetScheduler`], a [`CompositeTermination`] and a reward) and drives
//! any [`Simulation`] it is handed. It keeps no reference to the simulator
//! between calls, so the caller decides who owns the bus.

use std::collections::HashMap;

use aviary_core::config::{TaskConfig, TaskKind};
use aviary_core::error::{AviaryError, ConfigError, SimError, TaskError};
use aviary_core::geo::heading_error_deg;
use aviary_core::property::{Property, catalog, merge_unique};
use aviary_core::seed::{SeedHierarchy, Subsystem};
use aviary_core::traits::{CompositeTermination, RewardFunction, Simulation, TerminationCondition};
use aviary_core::types::{
    Action, BoxSpace, EpisodeProgress, ResetInfo, ResetResult, Snapshot, StepContext, StepInfo,
    StepResult, TargetChange, Targets,
};
use aviary_domain_rand::InitialConditionGenerator;

use crate::episode::{EpisodeState, TaskPhase};
use crate::layout::VariableLayout;
use crate::schedule::{TargetScheduler, commit_change};

/// Properties every task tracks regardless of its reward and terminations.
const ALWAYS_TRACKED: [Property; 4] = [
    catalog::HEADING_DEG,
    catalog::ALTITUDE_SL_FT,
    catalog::DELTA_HEADING,
    catalog::DELTA_ALTITUDE,
];

// ---------------------------------------------------------------------------
// FlightTask
// ---------------------------------------------------------------------------

pub struct FlightTask {
    config: TaskConfig,
    layout: VariableLayout,
    generator: InitialConditionGenerator,
    scheduler: Box<dyn TargetScheduler>,
    termination: CompositeTermination,
    reward: Box<dyn RewardFunction>,
    seeds: SeedHierarchy,
    instance: u16,
    tracked: Vec<Property>,
    step_budget: u32,
    sim_steps: u32,
    /// Episodes started since construction.
    episodes_started: u64,
    /// Resets since the seed hierarchy was last replaced.
    draws: u64,
    episode: Option<EpisodeState>,
}

impl FlightTask {
    /// Validate `config` and assemble a task from the given strategies.
    pub fn new(
        config: TaskConfig,
        scheduler: Box<dyn TargetScheduler>,
        termination: CompositeTermination,
        reward: Box<dyn RewardFunction>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let layout = VariableLayout::from_config(&config)?;
        let generator = InitialConditionGenerator::from_config(&config)?;

        let mut tracked = layout.tracked();
        merge_unique(&mut tracked, ALWAYS_TRACKED);
        merge_unique(&mut tracked, reward.properties());
        merge_unique(&mut tracked, termination.properties());

        Ok(Self {
            seeds: SeedHierarchy::new(config.seed),
            step_budget: config.step_budget(),
            sim_steps: config.sim_steps(),
            config,
            layout,
            generator,
            scheduler,
            termination,
            reward,
            instance: 0,
            tracked,
            episodes_started: 0,
            draws: 0,
            episode: None,
        })
    }

    /// Distinguish this task's random streams from siblings sharing a root seed.
    #[must_use]
    pub const fn with_instance(mut self, instance: u16) -> Self {
        self.instance = instance;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &TaskConfig {
        &self.config
    }

    #[must_use]
    pub const fn kind(&self) -> TaskKind {
        self.config.kind
    }

    #[must_use]
    pub const fn layout(&self) -> &VariableLayout {
        &self.layout
    }

    #[must_use]
    pub const fn step_budget(&self) -> u32 {
        self.step_budget
    }

    /// Integrator steps per agent step.
    #[must_use]
    pub const fn sim_steps(&self) -> u32 {
        self.sim_steps
    }

    #[must_use]
    pub const fn episodes_started(&self) -> u64 {
        self.episodes_started
    }

    #[must_use]
    pub fn tracked_properties(&self) -> &[Property] {
        &self.tracked
    }

    #[must_use]
    pub fn scheduler_name(&self) -> &str {
        self.scheduler.name()
    }

    #[must_use]
    pub fn reward_name(&self) -> &str {
        self.reward.name()
    }

    #[must_use]
    pub fn termination_names(&self) -> Vec<&str> {
        self.termination.names()
    }

    #[must_use]
    pub fn phase(&self) -> TaskPhase {
        self.episode
            .as_ref()
            .map_or(TaskPhase::Uninitialized, |e| e.phase)
    }

    /// State of the current (or just finished) episode.
    #[must_use]
    pub const fn episode(&self) -> Option<&EpisodeState> {
        self.episode.as_ref()
    }

    #[must_use]
    pub fn targets(&self) -> Option<Targets> {
        self.episode.as_ref().map(|e| e.targets)
    }

    #[must_use]
    pub fn observation_space(&self) -> BoxSpace {
        self.layout.observation_space(self.step_budget)
    }

    #[must_use]
    pub fn action_space(&self) -> BoxSpace {
        self.layout.action_space()
    }

    // -----------------------------------------------------------------------
    // reset
    // -----------------------------------------------------------------------

    /// Start a new episode, discarding any episode in progress.
    ///
    /// `Some(seed)` replaces the root seed, so two resets with the same seed
    /// start identical episodes. `None` continues the current random streams.
    #[allow(clippy::cast_precision_loss)]
    pub fn reset<S: Simulation + ?Sized>(
        &mut self,
        sim: &mut S,
        seed: Option<u64>,
    ) -> Result<ResetResult, AviaryError> {
        if let Some(seed) = seed {
            self.seeds = SeedHierarchy::new(seed);
            self.draws = 0;
        }
        self.draws += 1;
        self.episodes_started += 1;
        self.episode = None;
        let episode_index = self.episodes_started;

        let mut rng = self
            .seeds
            .subsystem_rng(self.instance, self.draws, Subsystem::InitialConditions);
        let start = self.generator.generate(&mut rng)?;

        sim.initialize(&start.conditions)?;
        sim.start_engines()?;
        sim.raise_landing_gear()?;
        sim.set_throttle_mixture_controls(
            self.config.controls.throttle_cmd,
            self.config.controls.mixture_cmd,
            self.config.aircraft.engines,
        )?;
        sim.set(&catalog::STEPS_LEFT, f64::from(self.step_budget))?;
        sim.set(&catalog::EPISODE_INDEX, episode_index as f64)?;
        write_deltas(sim, &start.targets)?;

        let progress = EpisodeProgress {
            episode_index,
            step_budget: self.step_budget,
            steps_left: self.step_budget,
            step_count: 0,
        };
        let schedule_seed =
            self.seeds
                .subsystem_seed(self.instance, self.draws, Subsystem::TargetSchedule);
        let schedule = self
            .scheduler
            .begin_episode(start.targets, &progress, schedule_seed);

        let snapshot = Snapshot::capture(&*sim, &self.tracked)?;
        let observation = self.layout.observe(&snapshot, self.step_budget);

        tracing::info!(
            episode = episode_index,
            kind = %self.config.kind,
            heading = start.initial.heading_deg,
            altitude = start.initial.altitude_ft,
            target_heading = start.targets.heading_deg,
            target_altitude = start.targets.altitude_ft,
            step_budget = self.step_budget,
            "episode reset"
        );

        self.episode = Some(EpisodeState::new(
            progress,
            seed,
            start.initial,
            start.targets,
            schedule,
            snapshot,
        ));

        let mut custom = HashMap::new();
        custom.insert("step_budget".to_string(), f64::from(self.step_budget));
        custom.insert("initial_heading_deg".to_string(), start.initial.heading_deg);
        custom.insert("initial_altitude_ft".to_string(), start.initial.altitude_ft);
        Ok(ResetResult {
            observation,
            info: ResetInfo {
                seed,
                episode_index,
                targets: Some(start.targets),
                custom,
            },
        })
    }

    // -----------------------------------------------------------------------
    // step
    // -----------------------------------------------------------------------

    /// Apply `action`, advance one control interval, and evaluate the step.
    ///
    /// Fails with [`TaskError::NoEpisode`] before the first reset and with
    /// [`TaskError::EpisodeTerminated`] once the episode is done. A rejected
    /// action leaves the episode untouched.
    #[allow(clippy::too_many_lines)]
    pub fn step<S: Simulation + ?Sized>(
        &mut self,
        sim: &mut S,
        action: &Action,
    ) -> Result<StepResult, AviaryError> {
        let episode = self.episode.as_mut().ok_or(TaskError::NoEpisode)?;
        if !episode.phase.accepts_step() {
            return Err(TaskError::EpisodeTerminated {
                episode: episode.progress.episode_index,
            }
            .into());
        }
        action.validate(self.layout.action_dim())?;

        apply_action(
            sim,
            self.layout.action(),
            action,
            self.config.aircraft.engines,
        )?;
        for _ in 0..self.sim_steps {
            sim.run_one_step()?;
        }
        let sim_time_s = sim.sim_time();

        let change = self
            .scheduler
            .update(
                &mut episode.schedule,
                &episode.targets,
                &episode.progress,
                sim_time_s,
            )
            .map(|after| TargetChange {
                time_s: sim_time_s,
                step: episode.progress.step_count + 1,
                before: episode.targets,
                after,
            });
        if let Some(change) = &change {
            commit_change(sim, change)?;
            episode.apply_change(*change);
        }

        episode.advance();
        let progress = episode.progress;
        sim.set(&catalog::STEPS_LEFT, f64::from(progress.steps_left))?;
        write_deltas(sim, &episode.targets)?;

        let current = Snapshot::capture(&*sim, &self.tracked)?;
        let observation = self.layout.observe(&current, progress.steps_left);

        let ctx = StepContext {
            previous: &episode.previous,
            current: &current,
            progress,
            targets: episode.targets,
            initial: episode.initial,
            sim_time_s,
            retarget: change.as_ref(),
        };
        let termination = self.termination.evaluate(&ctx);
        let raw_reward = self.reward.compute(&ctx);
        let reward = if raw_reward.is_finite() {
            raw_reward
        } else {
            tracing::warn!(
                reward = raw_reward,
                step = progress.step_count,
                "non-finite reward replaced by 0"
            );
            0.0
        };

        if self.config.debug && observation.has_non_finite() {
            tracing::warn!(
                step = progress.step_count,
                previous = ?episode.previous,
                action = ?action.as_slice(),
                terminal = termination.is_some(),
                reward,
                non_finite = ?current.non_finite(),
                "observation contains NaN"
            );
        }

        episode.accumulate(reward);
        episode.previous = current;
        if let Some(termination) = &termination {
            tracing::debug!(
                episode = progress.episode_index,
                condition = %termination.name,
                kind = ?termination.kind,
                length = progress.step_count,
                total_reward = episode.total_reward,
                "episode ended"
            );
            episode.finish(termination.clone());
        }

        let terminated = termination.as_ref().is_some_and(|t| !t.is_truncation());
        let truncated = termination.as_ref().is_some_and(|t| t.is_truncation());
        let mut custom = HashMap::new();
        custom.insert("sim_time_s".to_string(), sim_time_s);

        Ok(StepResult {
            observation,
            reward,
            terminated,
            truncated,
            info: StepInfo {
                episode_length: progress.step_count,
                episode_reward: episode.total_reward,
                steps_left: progress.steps_left,
                targets: Some(episode.targets),
                termination,
                target_change: change,
                custom,
            },
        })
    }
}

impl std::fmt::Debug for FlightTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlightTask")
            .field("kind", &self.config.kind)
            .field("scheduler", &self.scheduler.name())
            .field("reward", &self.reward.name())
            .field("terminations", &self.termination.names())
            .field("step_budget", &self.step_budget)
            .field("sim_steps", &self.sim_steps)
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

/// Clamp and write each action value; the throttle command is mirrored to
/// the second engine on multi-engine airframes.
fn apply_action<S: Simulation + ?Sized>(
    sim: &mut S,
    properties: &[Property],
    action: &Action,
    engines: u32,
) -> Result<(), SimError> {
    for (property, value) in properties.iter().zip(action.as_slice()) {
        let written = sim.set_clamped(property, *value)?;
        if engines > 1 && property.name == catalog::THROTTLE_CMD.name {
            sim.set_clamped(&catalog::THROTTLE_1_CMD, written)?;
        }
    }
    Ok(())
}

/// Refresh the heading and altitude errors against `targets`.
fn write_deltas<S: Simulation + ?Sized>(sim: &mut S, targets: &Targets) -> Result<(), SimError> {
    let heading = sim.get(&catalog::HEADING_DEG)?;
    let altitude = sim.get(&catalog::ALTITUDE_SL_FT)?;
    sim.set(
        &catalog::DELTA_HEADING,
        heading_error_deg(heading, targets.heading_deg),
    )?;
    sim.set(&catalog::DELTA_ALTITUDE, altitude - targets.altitude_ft)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
