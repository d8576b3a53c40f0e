// ekfins_core/src/models/observation/position.rs

use log::trace;
use nalgebra::{DMatrix, DVector};
use serde::Deserialize;

use crate::earth;
use crate::error::ObservationError;
use crate::estimation::correction::GainCurve;
use crate::frames::{NavState, N_BASE_STATES};
use crate::models::observation::{MeasurementSigma, Observation};
use crate::types::{Epoch, ObservationTable, ObservationResult, TrajectoryPoint};

/// A latitude/longitude fix, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct LatLonFix {
    pub lat: f64,
    pub lon: f64,
}

/// Horizontal position fixes linearized into East/North meters.
#[derive(Debug, Clone)]
pub struct LatLonObs {
    data: ObservationTable<LatLonFix>,
    r_matrix: DMatrix<f64>, // 2x2, East then North
    gain_curve: Option<GainCurve>,
}

impl LatLonObs {
    pub fn new(
        data: ObservationTable<LatLonFix>,
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

    pub fn data(&self) -> &ObservationTable<LatLonFix> {
        &self.data
    }
}

impl Observation for LatLonObs {
    fn measurement_layout(&self) -> Vec<NavState> {
        vec![NavState::Dr1, NavState::Dr2]
    }

    fn get_r(&self) -> &DMatrix<f64> {
        &self.r_matrix
    }

    fn gain_curve(&self) -> Option<&GainCurve> {
        self.gain_curve.as_ref()
    }

    fn compute_obs(&self, epoch: Epoch, traj: &TrajectoryPoint) -> Option<ObservationResult> {
        let Some(fix) = self.data.get(&epoch) else {
            trace!("LatLonObs: no fix at epoch {}", epoch);
            return None;
        };

        // Nominal minus measured, expressed in local East/North meters.
        let d_lat = traj.lat - fix.lat;
        let d_lon = traj.lon - fix.lon;
        let z = DVector::from_vec(vec![
            earth::deg_to_meters(d_lon) * traj.lat.to_radians().cos(),
            earth::deg_to_meters(d_lat),
        ]);

        let mut h_jac = DMatrix::zeros(2, N_BASE_STATES);
        h_jac[(0, NavState::Dr1.index())] = 1.0;
        h_jac[(1, NavState::Dr2.index())] = 1.0;

        Some(ObservationResult {
            z,
            h: h_jac,
            r: self.r_matrix.clone(),
        })
    }
}
