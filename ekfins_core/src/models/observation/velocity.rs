// ekfins_core/src/models/observation/velocity.rs

use log::trace;
use nalgebra::{DMatrix, DVector};
use serde::Deserialize;

use crate::error::ObservationError;
use crate::estimation::correction::GainCurve;
use crate::frames::{NavState, N_BASE_STATES};
use crate::models::observation::{MeasurementSigma, Observation};
use crate::types::{Epoch, ObservationTable, ObservationResult, TrajectoryPoint};

/// A horizontal velocity fix, East and North components in m/s.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct VelocityFix {
    #[serde(rename = "VE", alias = "ve")]
    pub ve: f64,
    #[serde(rename = "VN", alias = "vn")]
    pub vn: f64,
}

/// East/North velocity fixes.
///
/// Besides the velocity errors, a velocity fix also observes the heading error: rotating
/// the navigation frame by a small heading error rotates the measured velocity vector.
#[derive(Debug, Clone)]
pub struct VeVnObs {
    data: ObservationTable<VelocityFix>,
    r_matrix: DMatrix<f64>, // 2x2, VE then VN
    gain_curve: Option<GainCurve>,
}

impl VeVnObs {
    pub fn new(
        data: ObservationTable<VelocityFix>,
        sigma: impl Into<MeasurementSigma>,
    ) -> Result<Self, ObservationError> {
        Ok(Self {
            data,
            r_matrix: sigma.into().covariance(2)?,
            gain_curve: None,
        })
    }

    pub fn with_gain_curve(mut self, curve: GainCurve) -> Self {
        self.gain_curve = Some(curve);
        self
    }

    pub fn data(&self) -> &ObservationTable<VelocityFix> {
        &self.data
    }
}

impl Observation for VeVnObs {
    fn measurement_layout(&self) -> Vec<NavState> {
        vec![NavState::Dv1, NavState::Dv2]
    }

    fn get_r(&self) -> &DMatrix<f64> {
        &self.r_matrix
    }

    fn gain_curve(&self) -> Option<&GainCurve> {
        self.gain_curve.as_ref()
    }

    fn compute_obs(&self, epoch: Epoch, traj: &TrajectoryPoint) -> Option<ObservationResult> {
        let Some(fix) = self.data.get(&epoch) else {
            trace!("VeVnObs: no fix at epoch {}", epoch);
            return None;
        };

        let z = DVector::from_vec(vec![traj.ve - fix.ve, traj.vn - fix.vn]);

        let mut h_jac = DMatrix::zeros(2, N_BASE_STATES);
        h_jac[(0, NavState::Dv1.index())] = 1.0;
        h_jac[(1, NavState::Dv2.index())] = 1.0;
        // Heading coupling, taken from the measured velocity.
        h_jac[(0, NavState::Psi3.index())] = fix.vn;
        h_jac[(1, NavState::Psi3.index())] = -fix.ve;

        Some(ObservationResult {
            z,
            h: h_jac,
            r: self.r_matrix.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn traj_point() -> TrajectoryPoint {
        TrajectoryPoint {
            lat: 40.0,
            lon: 30.0,
            ve: 4.0,
            vn: -3.0,
            h: 15.0,
            p: 0.0,
            r: 0.0,
        }
    }

    fn model() -> VeVnObs {
        let mut data = ObservationTable::new();
        data.insert(50, VelocityFix { ve: 3.0, vn: -2.0 });
        VeVnObs::new(data, 10.0).unwrap()
    }

    #[test]
    fn test_missing_epoch_returns_none() {
        assert!(model().compute_obs(55, &traj_point()).is_none());
    }

    #[test]
    fn test_velocity_fix_reference_values() {
        let ret = model().compute_obs(50, &traj_point()).unwrap();
        assert_abs_diff_eq!(ret.z, DVector::from_vec(vec![1.0, -1.0]), epsilon = 1e-12);

        #[rustfmt::skip]
        let h_true = DMatrix::from_row_slice(2, 7, &[
            0.0, 0.0, 1.0, 0.0, 0.0, 0.0, -2.0,
            0.0, 0.0, 0.0, 1.0, 0.0, 0.0, -3.0,
        ]);
        assert_abs_diff_eq!(ret.h, h_true, epsilon = 1e-12);
        assert_eq!(ret.r, DMatrix::from_row_slice(2, 2, &[100.0, 0.0, 0.0, 100.0]));
    }

    #[test]
    fn test_only_heading_column_couples_attitude() {
        let ret = model().compute_obs(50, &traj_point()).unwrap();
        for col in [NavState::Dr1, NavState::Dr2, NavState::Phi1, NavState::Phi2] {
            assert_eq!(ret.h.column(col.index()).amax(), 0.0, "{} should be zero", col);
        }
        assert!(ret.h.column(NavState::Psi3.index()).amax() > 0.0);
    }

    #[test]
    fn test_per_axis_sigma_shape_is_checked() {
        let err = VeVnObs::new(ObservationTable::new(), vec![1.0]).unwrap_err();
        assert_eq!(
            err,
            ObservationError::SigmaShape {
                expected: 2,
                found: 1
            }
        );
    }
}
