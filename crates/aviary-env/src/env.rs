//! Gymnasium-style environment wrapper around a simulation and a task.
//!
//! [`FlightEnv`] owns the simulation delegate and the [`FlightTask`] that
//! drives it, exposing the `reset`/`step` API that training loops expect.

use aviary_core::config::TaskConfig;
use aviary_core::error::{AviaryError, ConfigError};
use aviary_core::traits::Simulation;
use aviary_core::types::{Action, BoxSpace, ResetResult, StepResult};

use crate::memory::MemorySimulation;
use crate::presets::build_task;
use crate::stats::EpisodeStats;
use crate::task::FlightTask;

// ---------------------------------------------------------------------------
// FlightEnv
// ---------------------------------------------------------------------------

/// Environment pairing one simulation with one task.
///
/// Each call to [`step`](Self::step) forwards the action to the task, which
/// applies it, advances the simulation and reports the outcome. Finished
/// episodes are folded into [`EpisodeStats`].
pub struct FlightEnv<S: Simulation> {
    sim: S,
    task: FlightTask,
    obs_space: BoxSpace,
    act_space: BoxSpace,
    stats: EpisodeStats,
}

impl<S: Simulation> FlightEnv<S> {
    /// Create an environment. Call [`reset`](Self::reset) before stepping.
    #[must_use]
    pub fn new(sim: S, task: FlightTask) -> Self {
        let obs_space = task.observation_space();
        let act_space = task.action_space();
        Self {
            sim,
            task,
            obs_space,
            act_space,
            stats: EpisodeStats::new(),
        }
    }

    /// Build the preset task for `config.kind` and wrap it.
    ///
    /// Fails when the simulation reports an integrator step that does not
    /// match `1 / config.simulation_frequency_hz`.
    pub fn from_config(sim: S, config: TaskConfig) -> Result<Self, AviaryError> {
        check_step_size(&sim, &config)?;
        Ok(Self::new(sim, build_task(config)?))
    }

    /// Observation space descriptor.
    #[must_use]
    pub const fn observation_space(&self) -> &BoxSpace {
        &self.obs_space
    }

    /// Action space descriptor.
    #[must_use]
    pub const fn action_space(&self) -> &BoxSpace {
        &self.act_space
    }

    /// Start a new episode, optionally with a seed.
    pub fn reset(&mut self, seed: Option<u64>) -> Result<ResetResult, AviaryError> {
        self.task.reset(&mut self.sim, seed)
    }

    /// Take one step with the given action.
    pub fn step(&mut self, action: &Action) -> Result<StepResult, AviaryError> {
        let result = self.task.step(&mut self.sim, action)?;
        if result.done() {
            self.stats.record(
                result.info.episode_length,
                result.info.episode_reward,
                result.info.termination.as_ref(),
            );
        }
        Ok(result)
    }

    /// Read-only access to the simulation.
    #[must_use]
    pub const fn sim(&self) -> &S {
        &self.sim
    }

    /// Mutable access to the simulation.
    pub const fn sim_mut(&mut self) -> &mut S {
        &mut self.sim
    }

    #[must_use]
    pub const fn task(&self) -> &FlightTask {
        &self.task
    }

    #[must_use]
    pub const fn stats(&self) -> &EpisodeStats {
        &self.stats
    }

    /// Consume the environment, returning the simulation.
    pub fn into_sim(self) -> S {
        self.sim
    }
}

impl FlightEnv<MemorySimulation> {
    /// Point-mass in-memory simulator integrating at the configured
    /// simulation frequency.
    pub fn point_mass(config: TaskConfig) -> Result<Self, AviaryError> {
        let sim = MemorySimulation::point_mass().with_frequency_hz(config.simulation_frequency_hz);
        Self::from_config(sim, config)
    }
}

fn check_step_size<S: Simulation>(sim: &S, config: &TaskConfig) -> Result<(), ConfigError> {
    let Some(dt) = sim.step_size_s() else {
        return Ok(());
    };
    let expected = 1.0 / config.simulation_frequency_hz;
    if (dt - expected).abs() > 1e-9 * expected.abs().max(1.0) {
        return Err(ConfigError::Incompatible(format!(
            "{} integrates at {dt} s per step but simulation_frequency_hz = {} needs {expected} s",
            sim.name(),
            config.simulation_frequency_hz
        )));
    }
    Ok(())
}

impl<S: Simulation> std::fmt::Debug for FlightEnv<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlightEnv")
            .field("sim", &self.sim.name())
            .field("task", &self.task)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use aviary_core::config::TaskKind;
    use aviary_core::error::TaskError;

    fn short_config(kind: TaskKind) -> TaskConfig {
        let mut config = TaskConfig::for_kind(kind);
        config.episode_time_s = Some(2.0);
        config
    }

    fn neutral(env: &FlightEnv<MemorySimulation>) -> Action {
        Action::new(vec![0.0; env.action_space().size()])
    }

    #[test]
    fn spaces_match_layout() {
        let env = FlightEnv::from_config(
            MemorySimulation::point_mass(),
            short_config(TaskKind::HeadingControl),
        )
        .unwrap();
        assert_eq!(env.observation_space().size(), 12);
        assert_eq!(env.action_space().size(), 4);
    }

    #[test]
    fn step_before_reset_fails() {
        let mut env = FlightEnv::from_config(
            MemorySimulation::point_mass(),
            short_config(TaskKind::HeadingControl),
        )
        .unwrap();
        let action = neutral(&env);
        let err = env.step(&action).unwrap_err();
        assert!(matches!(err, AviaryError::Task(TaskError::NoEpisode)));
    }

    #[test]
    fn finished_episode_is_recorded() {
        let mut env = FlightEnv::from_config(
            MemorySimulation::point_mass(),
            short_config(TaskKind::HeadingControl),
        )
        .unwrap();
        env.reset(Some(3)).unwrap();
        let action = neutral(&env);
        let mut steps = 0;
        loop {
            steps += 1;
            if env.step(&action).unwrap().done() {
                break;
            }
        }
        assert!(steps <= 10);
        assert_eq!(env.stats().episodes_completed, 1);
        assert_eq!(env.stats().step_history, vec![steps]);
    }

    #[test]
    fn sim_time_advances_per_step() {
        let mut env = FlightEnv::from_config(
            MemorySimulation::point_mass(),
            short_config(TaskKind::HeadingControl),
        )
        .unwrap();
        env.reset(Some(1)).unwrap();
        let action = neutral(&env);
        env.step(&action).unwrap();
        // 60 Hz / 5 Hz
        assert_eq!(env.sim().steps(), 12);
    }

    #[test]
    fn sim_time_follows_configured_frequency() {
        let mut config = short_config(TaskKind::PeriodicHeading);
        config.simulation_frequency_hz = 120.0;
        let mut env = FlightEnv::point_mass(config).unwrap();
        env.reset(Some(1)).unwrap();
        let action = neutral(&env);
        env.step(&action).unwrap();
        assert_eq!(env.sim().steps(), 24);
        assert!((env.sim().sim_time() - 0.2).abs() < 1e-9);
        env.step(&action).unwrap();
        assert!((env.sim().sim_time() - 0.4).abs() < 1e-9);
    }

    #[test]
    fn mismatched_step_size_is_rejected() {
        let mut config = short_config(TaskKind::PeriodicHeading);
        config.simulation_frequency_hz = 120.0;
        let err = FlightEnv::from_config(MemorySimulation::point_mass(), config).unwrap_err();
        assert!(matches!(err, AviaryError::Config(ConfigError::Incompatible(_))));
    }
}
