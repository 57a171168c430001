//! Episode statistics tracking.
//!
//! [`EpisodeStats`] records cumulative statistics across finished episodes:
//! episode count, total steps, per-episode length and return, and how often
//! each termination condition ended an episode.

use std::collections::BTreeMap;

use aviary_core::types::Termination;

// ---------------------------------------------------------------------------
// EpisodeStats
// ---------------------------------------------------------------------------

/// Cumulative statistics across finished episodes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EpisodeStats {
    /// Total number of finished episodes.
    pub episodes_completed: u32,
    /// Total steps across all finished episodes.
    pub total_steps: u64,
    /// Steps per finished episode.
    pub step_history: Vec<u32>,
    /// Accumulated reward per finished episode.
    pub return_history: Vec<f64>,
    /// Finished episodes per termination name.
    pub terminations: BTreeMap<String, u32>,
}

impl EpisodeStats {
    /// Create empty stats.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            episodes_completed: 0,
            total_steps: 0,
            step_history: Vec::new(),
            return_history: Vec::new(),
            terminations: BTreeMap::new(),
        }
    }

    /// Record one finished episode.
    pub fn record(&mut self, length: u32, episode_return: f64, termination: Option<&Termination>) {
        self.episodes_completed += 1;
        self.total_steps += u64::from(length);
        self.step_history.push(length);
        self.return_history.push(episode_return);
        if let Some(termination) = termination {
            *self
                .terminations
                .entry(termination.name.clone())
                .or_insert(0) += 1;
        }
    }

    /// Average episode length (steps) across all finished episodes.
    #[must_use]
    pub fn mean_episode_length(&self) -> Option<f64> {
        if self.step_history.is_empty() {
            return None;
        }
        let sum: f64 = self.step_history.iter().map(|&s| f64::from(s)).sum();
        #[allow(clippy::cast_precision_loss)]
        Some(sum / self.step_history.len() as f64)
    }

    /// Average return across all finished episodes.
    #[must_use]
    pub fn mean_return(&self) -> Option<f64> {
        if self.return_history.is_empty() {
            return None;
        }
        let sum: f64 = self.return_history.iter().sum();
        #[allow(clippy::cast_precision_loss)]
        Some(sum / self.return_history.len() as f64)
    }

    /// Number of finished episodes ended by the named condition.
    #[must_use]
    pub fn termination_count(&self, name: &str) -> u32 {
        self.terminations.get(name).copied().unwrap_or(0)
    }

    /// Reset all statistics.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
