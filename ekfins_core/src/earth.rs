// ekfins_core/src/earth.rs

//! Earth model constants consumed by the observation models.

/// Earth radius used to linearize latitude/longitude differences, in meters.
pub const R0: f64 = 6378137.0;

/// Earth rotation rate, in rad/s.
pub const RATE: f64 = 7.292115e-5;

/// Standard gravity, in m/s^2.
pub const G0: f64 = 9.7803253359;

/// Converts an angular difference in degrees to an arc length on the `R0` sphere.
pub fn deg_to_meters(delta_deg: f64) -> f64 {
    delta_deg.to_radians() * R0
}
