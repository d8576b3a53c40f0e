// ekfins_core/src/prelude.rs

// --- Core Abstractions (The main contracts of the library) ---
pub use crate::models::observation::{Observation, ObservationModel};
pub use crate::types::{Epoch, ObservationResult, ObservationTable, TrajectoryPoint};

// --- Error-State Model ---
pub use crate::frames::{NavState, N_BASE_STATES};
pub use crate::models::error_state::inertial::{
    GaussMarkov, InertialSensor, InertialSensorConfig, RandomWalk,
};
pub use crate::models::error_state::{Axis, ErrorState, StateRegistry};

// --- Concrete Observation Implementations ---
pub use crate::models::observation::{
    LatLonFix, LatLonObs, MeasurementSigma, VeVnObs, VelocityFix,
};

// --- Correction and configuration ---
pub use crate::config::{load_config, FixNoiseConfig, NavConfig};
pub use crate::error::{ConfigError, ModelError, ObservationError};
pub use crate::estimation::correction::{kalman_correct, CorrectionOutcome, GainCurve};
