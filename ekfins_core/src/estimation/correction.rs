// ekfins_core/src/estimation/correction.rs

use log::warn;
use nalgebra::{DMatrix, DVector};
use serde::Deserialize;

use crate::error::ModelError;
use crate::types::ObservationResult;

/// Piecewise gain curve used to soften or reject outlying observations.
///
/// The curve maps the RMS normalized innovation `q` to an effective value `f(q)`: observations
/// with `q <= nominal` are applied unchanged, larger ones have their innovation covariance
/// inflated by `q / f(q)`, and observations beyond `cutoff` are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "RawGainCurve")]
pub struct GainCurve {
    nominal: f64,
    flat: f64,
    cutoff: f64,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawGainCurve {
    nominal: f64,
    flat: f64,
    cutoff: f64,
}

impl TryFrom<RawGainCurve> for GainCurve {
    type Error = ModelError;

    fn try_from(raw: RawGainCurve) -> Result<Self, Self::Error> {
        GainCurve::new(raw.nominal, raw.flat, raw.cutoff)
    }
}

impl GainCurve {
    /// Requires `0 < nominal <= flat < cutoff`.
    pub fn new(nominal: f64, flat: f64, cutoff: f64) -> Result<Self, ModelError> {
        let finite = nominal.is_finite() && flat.is_finite() && cutoff.is_finite();
        if !finite || nominal <= 0.0 || nominal > flat || flat >= cutoff {
            return Err(ModelError::InvalidGainCurve(format!(
                "expected 0 < nominal <= flat < cutoff, got ({}, {}, {})",
                nominal, flat, cutoff
            )));
        }
        Ok(Self {
            nominal,
            flat,
            cutoff,
        })
    }

    pub fn evaluate(&self, q: f64) -> f64 {
        let (l, f, c) = (self.nominal, self.flat, self.cutoff);
        if q > c {
            0.0
        } else if q > f {
            l * f * (c - q) / ((c - f) * q)
        } else if q > l {
            l
        } else {
            q
        }
    }
}

/// What one correction did to the filter.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectionOutcome {
    /// Innovation normalized by the Cholesky factor of `S`.
    pub normalized_innovation: DVector<f64>,
    /// `true` if the gain curve discarded the observation.
    pub rejected: bool,
}

/// Applies a single observation to an error-state estimate `(x, P)`.
///
/// The covariance update uses the Joseph form to keep `P` symmetric positive
/// semi-definite. On rejection or error, `x` and `P` are left untouched.
pub fn kalman_correct(
    x: &mut DVector<f64>,
    p: &mut DMatrix<f64>,
    obs: &ObservationResult,
    gain_curve: Option<&GainCurve>,
) -> Result<CorrectionOutcome, ModelError> {
    check_shapes(x, p, obs)?;
    let (z, h_jac, r_mat) = (&obs.z, &obs.h, &obs.r);

    // 1. Innovation and its covariance.
    let pht = &*p * h_jac.transpose();
    let mut s = h_jac * &pht + r_mat;
    let e = z - h_jac * &*x;

    let chol = s.clone().cholesky().ok_or(ModelError::SingularInnovation)?;
    let nu = chol
        .l()
        .solve_lower_triangular(&e)
        .ok_or(ModelError::SingularInnovation)?;

    // 2. Outlier handling.
    let mut chol = chol;
    if let Some(curve) = gain_curve {
        let q = (nu.norm_squared() / nu.nrows() as f64).sqrt();
        let f = curve.evaluate(q);
        if f == 0.0 {
            warn!("Observation rejected, normalized innovation {:.3} beyond cutoff", q);
            return Ok(CorrectionOutcome {
                normalized_innovation: nu,
                rejected: true,
            });
        }
        if f < q {
            s *= q / f;
            chol = s.cholesky().ok_or(ModelError::SingularInnovation)?;
        }
    }

    // 3. Gain, state and covariance.
    let k_gain = chol.solve(&pht.transpose()).transpose();
    *x += &k_gain * e;
    let n = x.nrows();
    let u = DMatrix::<f64>::identity(n, n) - &k_gain * h_jac;
    *p = &u * &*p * u.transpose() + &k_gain * r_mat * k_gain.transpose();

    Ok(CorrectionOutcome {
        normalized_innovation: nu,
        rejected: false,
    })
}

fn check_shapes(
    x: &DVector<f64>,
    p: &DMatrix<f64>,
    obs: &ObservationResult,
) -> Result<(), ModelError> {
    let n = x.nrows();
    let m = obs.z.nrows();
    let mismatch = |expected: String, found: String| ModelError::ShapeMismatch { expected, found };

    if p.shape() != (n, n) {
        return Err(mismatch(format!("P of shape ({n}, {n})"), format!("{:?}", p.shape())));
    }
    if obs.h.shape() != (m, n) {
        return Err(mismatch(format!("H of shape ({m}, {n})"), format!("{:?}", obs.h.shape())));
    }
    if obs.r.shape() != (m, m) {
        return Err(mismatch(format!("R of shape ({m}, {m})"), format!("{:?}", obs.r.shape())));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::observation::{Observation, VeVnObs, VelocityFix};
    use crate::types::{ObservationTable, TrajectoryPoint};
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn scalar_obs(z: f64, r: f64) -> ObservationResult {
        ObservationResult {
            z: DVector::from_element(1, z),
            h: DMatrix::from_element(1, 1, 1.0),
            r: DMatrix::from_element(1, 1, r),
        }
    }

    #[test]
    fn test_gain_curve_pieces() {
        let curve = GainCurve::new(1.0, 2.0, 4.0).unwrap();
        assert_eq!(curve.evaluate(0.5), 0.5);
        assert_eq!(curve.evaluate(1.5), 1.0);
        assert_eq!(curve.evaluate(2.0), 1.0);
        assert_relative_eq!(curve.evaluate(3.0), 1.0 * 2.0 * 1.0 / (2.0 * 3.0));
        assert_eq!(curve.evaluate(4.5), 0.0);
    }

    #[test]
    fn test_gain_curve_validation() {
        assert!(GainCurve::new(0.0, 1.0, 2.0).is_err());
        assert!(GainCurve::new(2.0, 1.0, 3.0).is_err());
        assert!(GainCurve::new(1.0, 3.0, 3.0).is_err());
        assert!(GainCurve::new(1.0, 1.0, 3.0).is_ok());
    }

    #[test]
    fn test_scalar_update_without_curve() {
        let mut x = DVector::zeros(1);
        let mut p = DMatrix::from_element(1, 1, 1.0);
        let outcome = kalman_correct(&mut x, &mut p, &scalar_obs(4.0, 3.0), None).unwrap();
        assert!(!outcome.rejected);
        assert_relative_eq!(outcome.normalized_innovation[0], 2.0, epsilon = 1e-12);
        // K = 1/4
        assert_relative_eq!(x[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(p[(0, 0)], 0.75, epsilon = 1e-12);
    }

    #[test]
    fn test_scalar_update_with_inflation() {
        let curve = GainCurve::new(1.0, 1.5, 10.0).unwrap();
        let mut x = DVector::zeros(1);
        let mut p = DMatrix::from_element(1, 1, 1.0);
        let outcome = kalman_correct(&mut x, &mut p, &scalar_obs(4.0, 3.0), Some(&curve)).unwrap();
        assert!(!outcome.rejected);
        // q = 2, f = 12/17, so S grows from 4 to 34/3 and K = 3/34.
        assert_relative_eq!(x[0], 6.0 / 17.0, epsilon = 1e-12);
        assert_relative_eq!(p[(0, 0)], 988.0 / 1156.0, epsilon = 1e-12);
    }

    #[test]
    fn test_outlier_is_rejected() {
        let _ = env_logger::builder().is_test(true).try_init();
        let curve = GainCurve::new(1.0, 2.0, 3.0).unwrap();
        let mut x = DVector::zeros(1);
        let mut p = DMatrix::from_element(1, 1, 1.0);
        let outcome =
            kalman_correct(&mut x, &mut p, &scalar_obs(100.0, 1.0), Some(&curve)).unwrap();
        assert!(outcome.rejected);
        assert_eq!(x[0], 0.0);
        assert_eq!(p[(0, 0)], 1.0);
    }

    #[test]
    fn test_velocity_fix_reduces_uncertainty() {
        let mut data = ObservationTable::new();
        data.insert(0, VelocityFix { ve: 3.0, vn: -2.0 });
        let obs = VeVnObs::new(data, 0.1).unwrap();
        let traj = TrajectoryPoint {
            ve: 4.0,
            vn: -3.0,
            ..Default::default()
        };
        let ret = obs.compute_obs(0, &traj).unwrap();

        let mut x = DVector::zeros(7);
        let mut p = DMatrix::identity(7, 7);
        let trace_before = p.trace();
        kalman_correct(&mut x, &mut p, &ret, obs.gain_curve()).unwrap();

        assert!(p.trace() < trace_before);
        assert_abs_diff_eq!(p.clone(), p.transpose(), epsilon = 1e-12);
        // The estimated velocity errors move towards the innovation.
        assert!(x[2] > 0.0);
        assert!(x[3] < 0.0);
    }

    #[test]
    fn test_shape_mismatch_is_reported() {
        let mut x = DVector::zeros(2);
        let mut p = DMatrix::identity(2, 2);
        let err = kalman_correct(&mut x, &mut p, &scalar_obs(1.0, 1.0), None).unwrap_err();
        assert!(matches!(err, ModelError::ShapeMismatch { .. }));
    }
}
