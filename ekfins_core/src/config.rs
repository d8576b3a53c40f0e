// ekfins_core/src/config.rs

use figment::providers::{Format, Toml};
use figment::Figment;
use log::info;
use serde::Deserialize;
use std::path::Path;

use crate::error::ConfigError;
use crate::estimation::correction::GainCurve;
use crate::models::error_state::inertial::{InertialSensor, InertialSensorConfig};
use crate::models::observation::{
    LatLonFix, LatLonObs, MeasurementSigma, VeVnObs, VelocityFix,
};
use crate::types::ObservationTable;

// =========================================================================
// == Top-Level Configuration ==
// =========================================================================

/// # NavConfig
/// The error-state and observation noise settings of one filter setup.
/// This struct is the root of the data parsed from a TOML file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)] // Fail if the TOML has fields not in our struct
pub struct NavConfig {
    #[serde(default)] // Absent section means a sensor with no error states
    pub gyro: InertialSensorConfig,

    #[serde(default)]
    pub accel: InertialSensorConfig,

    #[serde(default)]
    pub position_fix: Option<FixNoiseConfig>,

    #[serde(default)]
    pub velocity_fix: Option<FixNoiseConfig>,
}

/// Noise settings shared by every fix-type observation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixNoiseConfig {
    /// Either one sigma for all axes or one per axis, e.g. `sigma = [0.3, 0.5]`.
    pub sigma: MeasurementSigma,
    #[serde(default)]
    pub gain_curve: Option<GainCurve>,
}

impl FixNoiseConfig {
    pub fn build_position(
        &self,
        data: ObservationTable<LatLonFix>,
    ) -> Result<LatLonObs, ConfigError> {
        let obs = LatLonObs::new(data, self.sigma.clone())?;
        Ok(match self.gain_curve {
            Some(curve) => obs.with_gain_curve(curve),
            None => obs,
        })
    }

    pub fn build_velocity(
        &self,
        data: ObservationTable<VelocityFix>,
    ) -> Result<VeVnObs, ConfigError> {
        let obs = VeVnObs::new(data, self.sigma.clone())?;
        Ok(match self.gain_curve {
            Some(curve) => obs.with_gain_curve(curve),
            None => obs,
        })
    }
}

impl NavConfig {
    /// Parses a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(Figment::from(Toml::string(text)).extract()?)
    }

    pub fn build_gyro(&self) -> Result<InertialSensor, ConfigError> {
        Ok(InertialSensor::new(self.gyro)?)
    }

    pub fn build_accel(&self) -> Result<InertialSensor, ConfigError> {
        Ok(InertialSensor::new(self.accel)?)
    }
}

/// Loads a [`NavConfig`] from a TOML file.
pub fn load_config(path: impl AsRef<Path>) -> Result<NavConfig, ConfigError> {
    let path = path.as_ref();
    info!("Loading filter configuration from: {:?}", path);
    Ok(Figment::new().merge(Toml::file_exact(path)).extract()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;
    use crate::models::observation::Observation;
    use crate::types::TrajectoryPoint;
    use nalgebra::DMatrix;

    const EXAMPLE: &str = r#"
        [gyro]
        bias = { sigma = 1e-5, walk = 1e-7 }
        corr = { sigma = 2e-6, time = 300.0 }

        [accel]
        bias = { sigma = 0.05, walk = 1e-3 }
        scale = { sigma = 1e-3, walk = 0.0 }

        [position_fix]
        sigma = 10.0
        gain_curve = { nominal = 3.0, flat = 5.0, cutoff = 10.0 }

        [velocity_fix]
        sigma = [0.3, 0.5]
    "#;

    #[test]
    fn test_parse_full_example() {
        let config = NavConfig::from_toml_str(EXAMPLE).unwrap();

        let gyro = config.build_gyro().unwrap();
        assert_eq!(
            gyro.states().names(),
            vec!["BIAS_1", "BIAS_2", "BIAS_3", "CORR_1", "CORR_2", "CORR_3"]
        );
        let accel = config.build_accel().unwrap();
        assert_eq!(accel.n_states(), 6);
        assert_eq!(accel.state_index_by_name("SCALE_1"), Some(3));

        let position = config
            .position_fix
            .as_ref()
            .unwrap()
            .build_position(ObservationTable::new())
            .unwrap();
        assert_eq!(position.gain_curve(), Some(&GainCurve::new(3.0, 5.0, 10.0).unwrap()));

        let mut data = ObservationTable::new();
        data.insert(1, VelocityFix { ve: 0.0, vn: 0.0 });
        let velocity = config
            .velocity_fix
            .as_ref()
            .unwrap()
            .build_velocity(data)
            .unwrap();
        let ret = velocity.compute_obs(1, &TrajectoryPoint::default()).unwrap();
        assert_eq!(ret.r, DMatrix::from_row_slice(2, 2, &[0.09, 0.0, 0.0, 0.25]));
    }

    #[test]
    fn test_empty_config_gives_degenerate_sensors() {
        let config = NavConfig::from_toml_str("").unwrap();
        assert_eq!(config.build_gyro().unwrap().n_states(), 0);
        assert!(config.position_fix.is_none());
        assert!(config.velocity_fix.is_none());
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let err = NavConfig::from_toml_str("[gyro]\ndrift = { sigma = 1.0, walk = 1.0 }\n");
        assert!(matches!(err, Err(ConfigError::Figment(_))));
    }

    #[test]
    fn test_invalid_values_surface_model_errors() {
        let config =
            NavConfig::from_toml_str("[gyro]\ncorr = { sigma = 1.0, time = 0.0 }\n").unwrap();
        assert!(matches!(
            config.build_gyro(),
            Err(ConfigError::Model(ModelError::InvalidTimeConstant(_)))
        ));

        let bad_curve = "[position_fix]\nsigma = 1.0\ngain_curve = { nominal = 5.0, flat = 1.0, cutoff = 2.0 }\n";
        assert!(NavConfig::from_toml_str(bad_curve).is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(load_config("/nonexistent/ekfins.toml").is_err());
    }
}
