use nalgebra::Vector3;

use crate::config::CentralBody;

// ---------------------------------------------------------------------------
// Earth constants (ECI frame)
// ---------------------------------------------------------------------------

pub const MU_EARTH: f64 = 3.986_004_418e14;  // m^3/s^2
pub const R_EARTH_ECI: f64 = 6_378_137.0;    // equatorial radius, m
pub const J2_EARTH: f64 = 1.082_63e-3;
pub const EARTH_ROTATION_RATE: f64 = 7.292_115e-5; // rad/s

/// Point-mass gravitational acceleration.
/// Returns zero inside a 1 m ball around the centre instead of blowing up.
pub fn gravity_pointmass(pos: &Vector3<f64>, mu: f64) -> Vector3<f64> {
    let r = pos.norm();
    if r < 1.0 {
        return Vector3::zeros();
    }
    -mu / (r * r * r) * pos
}

/// Point-mass + J2 oblateness acceleration.
pub fn gravity_j2(pos: &Vector3<f64>, mu: f64, radius: f64, j2: f64) -> Vector3<f64> {
    let r = pos.norm();
    if r < 1.0 {
        return Vector3::zeros();
    }
    let r2 = r * r;
    let z2 = pos.z * pos.z;

    let mu_over_r3 = mu / (r2 * r);
    let j2_coeff = 1.5 * j2 * radius * radius / r2;

    let xy_factor = mu_over_r3 * (1.0 + j2_coeff * (1.0 - 5.0 * z2 / r2));
    let z_factor = mu_over_r3 * (1.0 + j2_coeff * (3.0 - 5.0 * z2 / r2));

    Vector3::new(-xy_factor * pos.x, -xy_factor * pos.y, -z_factor * pos.z)
}

/// Gravity for the configured central body.
pub fn gravity_accel(pos: &Vector3<f64>, body: &CentralBody) -> Vector3<f64> {
    if body.use_j2 {
        gravity_j2(pos, body.mu, body.radius, body.j2)
    } else {
        gravity_pointmass(pos, body.mu)
    }
}
