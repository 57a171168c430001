use thiserror::Error;

/// Top-level error type for aviary.
#[derive(Debug, Error)]
pub enum AviaryError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Simulation error: {0}")]
    Simulation(#[from] SimError),

    #[error("Task error: {0}")]
    Task(#[from] TaskError),

    #[error("Space error: {0}")]
    Space(#[from] SpaceError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Configuration errors. Always raised before the first episode starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid step_frequency_hz: {0} (must be > 0)")]
    InvalidStepFrequency(f64),

    #[error("Invalid episode_time_s: {0} (must be > 0)")]
    InvalidEpisodeTime(f64),

    #[error("simulation_frequency_hz must be >= step_frequency_hz")]
    SimulationSlowerThanAgent,

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Unknown property: {0}")]
    UnknownProperty(String),

    #[error("Incompatible configuration: {0}")]
    Incompatible(String),
}

/// Errors reported by the simulation delegate. Surfaced to the caller unchanged.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("Simulation diverged: {0}")]
    Diverged(String),

    #[error("Property not available on the bus: {0}")]
    UnknownProperty(String),

    #[error("Initialization failed: {0}")]
    InitializeFailed(String),

    #[error("Step failed: {0}")]
    StepFailed(String),
}

/// Contract violations of the task lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error("No episode in progress: call reset() first")]
    NoEpisode,

    #[error("Episode {episode} already terminated: call reset() to start a new one")]
    EpisodeTerminated { episode: u64 },
}

/// Box space definition errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SpaceError {
    #[error("Mismatched low/high dimensions: low={low}, high={high}")]
    DimensionMismatch { low: usize, high: usize },

    #[error("Invalid bounds at dimension {dim}: low > high")]
    InvertedBounds { dim: usize },
}

/// Action / observation validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Action dimension mismatch: expected {expected}, got {got}")]
    ActionDimMismatch { expected: usize, got: usize },

    #[error("Action contains NaN")]
    ActionContainsNan,

    #[error("Action contains Inf")]
    ActionContainsInf,

    #[error("Observation dimension mismatch: expected {expected}, got {got}")]
    ObservationDimMismatch { expected: usize, got: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aviary_error_from_config_error() {
        let err = ConfigError::InvalidStepFrequency(-1.0);
        let top: AviaryError = err.into();
        assert!(matches!(top, AviaryError::Config(_)));
        assert!(top.to_string().contains("-1"));
    }

    #[test]
    fn aviary_error_from_sim_error() {
        let err = SimError::Diverged("NaN in u-fps".into());
        let top: AviaryError = err.into();
        assert!(matches!(top, AviaryError::Simulation(_)));
        assert!(top.to_string().contains("NaN"));
    }

    #[test]
    fn aviary_error_from_task_error() {
        let top: AviaryError = TaskError::EpisodeTerminated { episode: 3 }.into();
        assert!(matches!(top, AviaryError::Task(_)));
        assert!(top.to_string().contains("already terminated"));
    }

    #[test]
    fn aviary_error_from_validation_error() {
        let top: AviaryError = ValidationError::ActionContainsNan.into();
        assert!(matches!(top, AviaryError::Validation(_)));
    }

    #[test]
    fn config_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let config_err: ConfigError = io_err.into();
        assert!(matches!(config_err, ConfigError::Io(_)));
    }

    #[test]
    fn task_error_display_messages() {
        assert_eq!(
            TaskError::NoEpisode.to_string(),
            "No episode in progress: call reset() first"
        );
        assert_eq!(
            TaskError::EpisodeTerminated { episode: 7 }.to_string(),
            "Episode 7 already terminated: call reset() to start a new one"
        );
    }

    #[test]
    fn validation_error_display_messages() {
        assert_eq!(
            ValidationError::ActionDimMismatch {
                expected: 4,
                got: 3
            }
            .to_string(),
            "Action dimension mismatch: expected 4, got 3"
        );
        assert_eq!(
            ValidationError::ActionContainsInf.to_string(),
            "Action contains Inf"
        );
    }

    #[test]
    fn config_error_display_messages() {
        assert_eq!(
            ConfigError::InvalidEpisodeTime(0.0).to_string(),
            "Invalid episode_time_s: 0 (must be > 0)"
        );
        assert_eq!(
            ConfigError::UnknownProperty("warp_drive".into()).to_string(),
            "Unknown property: warp_drive"
        );
        assert_eq!(
            ConfigError::MissingField("waypoint".into()).to_string(),
            "Missing required field: waypoint"
        );
    }

    #[test]
    fn space_error_display_messages() {
        assert_eq!(
            SpaceError::DimensionMismatch { low: 3, high: 5 }.to_string(),
            "Mismatched low/high dimensions: low=3, high=5"
        );
        assert_eq!(
            SpaceError::InvertedBounds { dim: 2 }.to_string(),
            "Invalid bounds at dimension 2: low > high"
        );
    }
}
