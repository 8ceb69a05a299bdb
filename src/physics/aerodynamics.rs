use nalgebra::Vector3;

use crate::physics::atmosphere::Atmo;

/// Velocity relative to an atmosphere co-rotating with the body (inertial frame).
pub fn air_relative_velocity(
    pos: &Vector3<f64>,
    vel: &Vector3<f64>,
    rotation_rate: f64,
) -> Vector3<f64> {
    let omega = Vector3::new(0.0, 0.0, rotation_rate);
    vel - omega.cross(pos)
}

/// Dynamic pressure q = ½ρv² (Pa).
pub fn dynamic_pressure(airspeed: f64, atm: &Atmo) -> f64 {
    0.5 * atm.density * airspeed * airspeed
}

/// Aerodynamic drag force opposing the air-relative velocity.
pub fn drag_force(vel_air: &Vector3<f64>, atm: &Atmo, cd: f64, area: f64) -> Vector3<f64> {
    let speed = vel_air.norm();
    if speed > 1e-6 {
        let drag_mag = dynamic_pressure(speed, atm) * cd * area;
        -vel_air / speed * drag_mag
    } else {
        Vector3::zeros()
    }
}
