//! Randomization ranges for per-episode sampling.
//!
//! A [`RandomizationRange`] describes how one scalar is drawn at reset.
//! Call [`sample`](RandomizationRange::sample) with a seeded RNG.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from constructing a randomization range.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum RangeError {
    #[error("invalid bounds: low ({low}) >= high ({high})")]
    InvalidBounds { low: f64, high: f64 },

    #[error("invalid standard deviation: {0} (must be >= 0 and finite)")]
    InvalidStd(f64),

    #[error("value is not finite: {0}")]
    NonFinite(f64),
}

// ---------------------------------------------------------------------------
// RandomizationRange
// ---------------------------------------------------------------------------

/// How a value is drawn on episode reset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RandomizationRange {
    /// Always the same value.
    Fixed(f64),

    /// Uniform over `[low, high)`.
    Uniform { low: f64, high: f64 },

    /// Normal distribution with the given mean and standard deviation.
    Gaussian { mean: f64, std: f64 },
}

impl RandomizationRange {
    pub const fn fixed(value: f64) -> Result<Self, RangeError> {
        if !value.is_finite() {
            return Err(RangeError::NonFinite(value));
        }
        Ok(Self::Fixed(value))
    }

    pub fn uniform(low: f64, high: f64) -> Result<Self, RangeError> {
        if !low.is_finite() || !high.is_finite() || low >= high {
            return Err(RangeError::InvalidBounds { low, high });
        }
        Ok(Self::Uniform { low, high })
    }

    pub fn gaussian(mean: f64, std: f64) -> Result<Self, RangeError> {
        if !std.is_finite() || std < 0.0 {
            return Err(RangeError::InvalidStd(std));
        }
        if !mean.is_finite() {
            return Err(RangeError::NonFinite(mean));
        }
        Ok(Self::Gaussian { mean, std })
    }

    /// `Fixed(low)` when `low == high`, otherwise `Uniform { low, high }`.
    pub fn from_bounds([low, high]: [f64; 2]) -> Result<Self, RangeError> {
        if low == high {
            Self::fixed(low)
        } else {
            Self::uniform(low, high)
        }
    }

    /// Symmetric uniform range `[-magnitude, magnitude)`; fixed at zero when
    /// `magnitude` is zero.
    pub fn symmetric(magnitude: f64) -> Result<Self, RangeError> {
        let magnitude = magnitude.abs();
        Self::from_bounds([-magnitude, magnitude])
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match *self {
            Self::Fixed(v) => v,
            Self::Uniform { low, high } => rng.gen_range(low..high),
            Self::Gaussian { mean, std } => {
                if std == 0.0 {
                    return mean;
                }
                Normal::new(mean, std).map_or(mean, |dist| dist.sample(rng))
            }
        }
    }

    /// Center / expected value.
    #[must_use]
    pub fn nominal(&self) -> f64 {
        match *self {
            Self::Fixed(v) => v,
            Self::Uniform { low, high } => (low + high) / 2.0,
            Self::Gaussian { mean, .. } => mean,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
