//! Task lifecycle and per-episode state.
//!
//! A task moves `Uninitialized -> Ready -> Running -> Done`. [`reset`] is
//! the only way into `Ready` and may be called from any phase; [`step`] is
//! accepted in `Ready` and `Running` only.
//!
//! [`reset`]: crate::task::FlightTask::reset
//! [`step`]: crate::task::FlightTask::step

use aviary_core::types::{EpisodeProgress, Snapshot, TargetChange, Targets, Termination};

use crate::schedule::ScheduleState;

// ---------------------------------------------------------------------------
// TaskPhase
// ---------------------------------------------------------------------------

/// Lifecycle phase of a task.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TaskPhase {
    /// Before the first reset.
    #[default]
    Uninitialized,
    /// Reset, no step taken yet.
    Ready,
    /// At least one step taken, not terminal.
    Running,
    /// A termination condition fired. Only `reset()` leaves this phase.
    Done,
}

impl TaskPhase {
    /// Returns `true` if `step()` is legal in this phase.
    pub const fn accepts_step(self) -> bool {
        matches!(self, Self::Ready | Self::Running)
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done)
    }
}

// ---------------------------------------------------------------------------
// EpisodeState
// ---------------------------------------------------------------------------

/// Everything that lives for exactly one episode.
///
/// Created by `reset()` and discarded by the next one; nothing here leaks
/// across episodes.
#[derive(Clone, Debug)]
pub struct EpisodeState {
    pub phase: TaskPhase,
    pub progress: EpisodeProgress,
    /// Seed passed to the `reset()` that started this episode.
    pub seed: Option<u64>,
    /// Heading and altitude sampled at reset.
    pub initial: Targets,
    /// Targets currently in effect.
    pub targets: Targets,
    pub schedule: ScheduleState,
    /// Snapshot at the end of the previous step, or at reset.
    pub previous: Snapshot,
    pub total_reward: f64,
    pub termination: Option<Termination>,
    /// Every target change applied this episode, in order.
    pub changes: Vec<TargetChange>,
}

impl EpisodeState {
    #[must_use]
    pub const fn new(
        progress: EpisodeProgress,
        seed: Option<u64>,
        initial: Targets,
        targets: Targets,
        schedule: ScheduleState,
        previous: Snapshot,
    ) -> Self {
        Self {
            phase: TaskPhase::Ready,
            progress,
            seed,
            initial,
            targets,
            schedule,
            previous,
            total_reward: 0.0,
            termination: None,
            changes: Vec::new(),
        }
    }

    /// Consume one step of the budget. `steps_left` saturates at zero.
    pub const fn advance(&mut self) {
        self.progress.step_count += 1;
        self.progress.steps_left = self.progress.steps_left.saturating_sub(1);
        self.phase = TaskPhase::Running;
    }

    /// Record an applied target change and make its `after` targets current.
    pub fn apply_change(&mut self, change: TargetChange) {
        self.targets = change.after;
        self.changes.push(change);
    }

    pub fn accumulate(&mut self, reward: f64) {
        self.total_reward += reward;
    }

    pub fn finish(&mut self, termination: Termination) {
        self.termination = Some(termination);
        self.phase = TaskPhase::Done;
    }

    #[must_use]
    pub const fn is_done(&self) -> bool {
        self.phase.is_terminal()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
