// ekfins_core/src/models/observation/mod.rs

use dyn_clone::DynClone;
use nalgebra::{DMatrix, DVector};
use serde::Deserialize;
use std::fmt::Debug;

use crate::error::ObservationError;
use crate::estimation::correction::GainCurve;
use crate::frames::NavState;
use crate::types::{Epoch, ObservationResult, TrajectoryPoint};

pub mod position;
pub mod velocity;

pub use position::{LatLonFix, LatLonObs};
pub use velocity::{VeVnObs, VelocityFix};

// --- OBSERVATION MODEL TRAIT ---
// Linearizes one external fix against the nominal trajectory. `z = H dx + v`
pub trait Observation: DynClone + Debug + Send + Sync {
    /// The navigation error states measured by each row of `z`, in row order.
    fn measurement_layout(&self) -> Vec<NavState>;

    /// Returns the measurement dimension `m`.
    fn dim(&self) -> usize {
        self.measurement_layout().len()
    }

    /// Returns the measurement noise covariance matrix `R`.
    fn get_r(&self) -> &DMatrix<f64>;

    /// Optional curve that scales the gain down for large normalized innovations.
    fn gain_curve(&self) -> Option<&GainCurve>;

    /// **Computes `(z, H, R)` for the fix recorded at `epoch`.**
    ///
    /// Returns `None` when the table has no row for exactly this epoch. That is the normal
    /// case between fixes, not an error.
    fn compute_obs(&self, epoch: Epoch, traj: &TrajectoryPoint) -> Option<ObservationResult>;
}

// This macro automatically generates the implementation of `Clone` for `Box<dyn Observation>`.
dyn_clone::clone_trait_object!(Observation);

/// Measurement standard deviation, either shared by all axes or given per axis.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum MeasurementSigma {
    Scalar(f64),
    PerAxis(Vec<f64>),
}

impl From<f64> for MeasurementSigma {
    fn from(sigma: f64) -> Self {
        MeasurementSigma::Scalar(sigma)
    }
}

impl From<Vec<f64>> for MeasurementSigma {
    fn from(sigmas: Vec<f64>) -> Self {
        MeasurementSigma::PerAxis(sigmas)
    }
}

impl<const N: usize> From<[f64; N]> for MeasurementSigma {
    fn from(sigmas: [f64; N]) -> Self {
        MeasurementSigma::PerAxis(sigmas.to_vec())
    }
}

impl MeasurementSigma {
    /// Builds the diagonal `dim x dim` covariance `R`.
    pub fn covariance(&self, dim: usize) -> Result<DMatrix<f64>, ObservationError> {
        let sigmas = match self {
            MeasurementSigma::Scalar(s) => vec![*s; dim],
            MeasurementSigma::PerAxis(v) if v.len() == dim => v.clone(),
            MeasurementSigma::PerAxis(v) => {
                return Err(ObservationError::SigmaShape {
                    expected: dim,
                    found: v.len(),
                })
            }
        };
        if let Some(bad) = sigmas.iter().find(|s| !(s.is_finite() && **s > 0.0)) {
            return Err(ObservationError::InvalidSigma(*bad));
        }
        let variances = DVector::from_iterator(dim, sigmas.iter().map(|s| s * s));
        Ok(DMatrix::from_diagonal(&variances))
    }
}

/// The closed set of observation types the filter understands.
#[derive(Debug, Clone)]
pub enum ObservationModel {
    Position(LatLonObs),
    Velocity(VeVnObs),
}

impl ObservationModel {
    fn inner(&self) -> &dyn Observation {
        match self {
            ObservationModel::Position(obs) => obs,
            ObservationModel::Velocity(obs) => obs,
        }
    }
}

impl Observation for ObservationModel {
    fn measurement_layout(&self) -> Vec<NavState> {
        self.inner().measurement_layout()
    }

    fn get_r(&self) -> &DMatrix<f64> {
        self.inner().get_r()
    }

    fn gain_curve(&self) -> Option<&GainCurve> {
        self.inner().gain_curve()
    }

    fn compute_obs(&self, epoch: Epoch, traj: &TrajectoryPoint) -> Option<ObservationResult> {
        self.inner().compute_obs(epoch, traj)
    }
}

impl From<LatLonObs> for ObservationModel {
    fn from(obs: LatLonObs) -> Self {
        ObservationModel::Position(obs)
    }
}

impl From<VeVnObs> for ObservationModel {
    fn from(obs: VeVnObs) -> Self {
        ObservationModel::Velocity(obs)
    }
}
