// ekfins_core/src/types.rs

use nalgebra::{DMatrix, DVector};
use serde::Deserialize;
use std::collections::BTreeMap;

// --- Core Type Aliases ---
/// Discrete timestamp shared by trajectory and observation tables. Lookups are exact.
pub type Epoch = i64;

/// A time-indexed table of raw measurement rows.
pub type ObservationTable<T> = BTreeMap<Epoch, T>;

/// One sample of the filter's nominal trajectory.
///
/// Angles are in degrees, velocities in m/s. The observation models only read it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct TrajectoryPoint {
    pub lat: f64,
    pub lon: f64,
    #[serde(rename = "VE", alias = "ve")]
    pub ve: f64,
    #[serde(rename = "VN", alias = "vn")]
    pub vn: f64,
    /// Heading.
    pub h: f64,
    /// Pitch.
    pub p: f64,
    /// Roll.
    pub r: f64,
}

/// The `(z, H, R)` triple an observation contributes at one epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationResult {
    /// Innovation vector, length `m`.
    pub z: DVector<f64>,
    /// Jacobian with respect to the navigation error state, `m x N_BASE_STATES`.
    pub h: DMatrix<f64>,
    /// Measurement noise covariance, `m x m`.
    pub r: DMatrix<f64>,
}

impl ObservationResult {
    /// Returns the measurement dimension `m`.
    pub fn dim(&self) -> usize {
        self.z.nrows()
    }
}
