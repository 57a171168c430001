//! Episode lifecycle helpers for tests.
//!
//! Thin wrappers around common [`FlightEnv`] operations that reduce
//! boilerplate in integration tests.

use aviary_core::error::AviaryError;
use aviary_core::traits::Simulation;
use aviary_core::types::{Action, StepResult};
use aviary_env::FlightEnv;

/// An all-zero action sized to the environment's action space.
pub fn neutral_action<S: Simulation>(env: &FlightEnv<S>) -> Action {
    Action::zeros(env.action_space().size())
}

/// Take `n` steps with the same action, returning every result.
///
/// Stops early on the first error.
pub fn step_n<S: Simulation>(
    env: &mut FlightEnv<S>,
    action: &Action,
    n: usize,
) -> Result<Vec<StepResult>, AviaryError> {
    (0..n).map(|_| env.step(action)).collect()
}

/// Step with the same action until the episode ends or `max_safety_steps`
/// is reached.
///
/// Returns the number of steps taken and the last result, if any.
pub fn run_until_done<S: Simulation>(
    env: &mut FlightEnv<S>,
    action: &Action,
    max_safety_steps: usize,
) -> Result<(usize, Option<StepResult>), AviaryError> {
    let mut last = None;
    for i in 0..max_safety_steps {
        let result = env.step(action)?;
        let done = result.done();
        last = Some(result);
        if done {
            return Ok((i + 1, last));
        }
    }
    Ok((max_safety_steps, last))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
