// ekfins_core/src/error.rs

use thiserror::Error;

/// Failures raised while building an error-state model or evaluating its matrices.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error("{source_name} sigma must be positive and finite, got {value}")]
    InvalidSigma { source_name: &'static str, value: f64 },

    #[error("{source_name} random walk must be non-negative and finite, got {value}")]
    InvalidWalk { source_name: &'static str, value: f64 },

    #[error("correlation time constant must be positive and finite, got {0}")]
    InvalidTimeConstant(f64),

    #[error("shape mismatch: expected {expected}, found {found}")]
    ShapeMismatch { expected: String, found: String },

    #[error("scale factor states require a sensor reading")]
    MissingReading,

    #[error("innovation covariance is not positive definite")]
    SingularInnovation,

    #[error("invalid gain curve: {0}")]
    InvalidGainCurve(String),
}

/// Failures raised while building an observation model.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ObservationError {
    #[error("measurement sigma must be positive and finite, got {0}")]
    InvalidSigma(f64),

    #[error("measurement sigma has {found} axes, observation has {expected}")]
    SigmaShape { expected: usize, found: usize },
}

/// Failures raised while loading or applying a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Figment(#[from] Box<figment::Error>),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Observation(#[from] ObservationError),
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        ConfigError::Figment(Box::new(e))
    }
}
