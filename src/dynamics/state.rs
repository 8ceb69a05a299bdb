use nalgebra::{Unit, Vector3};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Physical constants
// ---------------------------------------------------------------------------

pub const G0: f64 = 9.80665;

/// Below this many kg of propellant a stage counts as empty.
pub const PROPELLANT_EPS: f64 = 0.01;

// ---------------------------------------------------------------------------
// 3DOF State: position, velocity, mass, staging bookkeeping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct State {
    pub time: f64,
    pub pos: Vector3<f64>,         // m, ECI
    pub vel: Vector3<f64>,         // m/s, ECI
    pub mass: f64,                 // kg
    pub stage_idx: usize,          // active stage index
    pub stage_burn_time: f64,      // s the active stage has been firing
    pub delta_v: f64,              // m/s, integral of thrust/mass over the flight
}

impl State {
    pub fn apply(&self, d: &Deriv, dt: f64) -> State {
        State {
            time: self.time + dt,
            pos: self.pos + d.dpos * dt,
            vel: self.vel + d.dvel * dt,
            mass: (self.mass + d.dmass * dt).max(0.0),
            stage_idx: self.stage_idx,
            stage_burn_time: self.stage_burn_time + d.dburn * dt,
            delta_v: self.delta_v + d.ddelta_v * dt,
        }
    }

    pub fn radius(&self) -> f64 {
        self.pos.norm()
    }

    pub fn altitude(&self, body_radius: f64) -> f64 {
        self.pos.norm() - body_radius
    }

    pub fn speed(&self) -> f64 {
        self.vel.norm()
    }

    /// Local vertical (radial outward) unit vector.
    pub fn up(&self) -> Option<Unit<Vector3<f64>>> {
        Unit::try_new(self.pos, 1e-9)
    }

    /// Flight-path angle above the local horizontal (rad).
    pub fn flight_path_angle(&self) -> f64 {
        let speed = self.vel.norm();
        match self.up() {
            Some(up) if speed > 1e-6 => (self.vel.dot(&up) / speed).clamp(-1.0, 1.0).asin(),
            _ => 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// State derivative
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Deriv {
    pub dpos: Vector3<f64>,
    pub dvel: Vector3<f64>,
    pub dmass: f64,
    pub dburn: f64,     // 1 while the engine fires, 0 otherwise
    pub ddelta_v: f64,  // thrust acceleration magnitude
}

// ---------------------------------------------------------------------------
// GNC command output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct GncCommand {
    pub direction: Unit<Vector3<f64>>, // thrust direction, ECI
    pub throttle: f64,                 // 0 = engine off, 1 = full thrust
    pub pitch_deg: f64,                // commanded pitch above local horizontal
}

impl GncCommand {
    pub fn coast(direction: Unit<Vector3<f64>>, pitch_deg: f64) -> Self {
        Self { direction, throttle: 0.0, pitch_deg }
    }

    pub fn engine_on(&self) -> bool {
        self.throttle > 0.0
    }
}

impl Default for GncCommand {
    fn default() -> Self {
        Self { direction: Vector3::z_axis(), throttle: 0.0, pitch_deg: 90.0 }
    }
}

// ---------------------------------------------------------------------------
// Simulation config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub dt: f64,
    pub max_time: f64,
    /// Telemetry sampling period, s (0 = every step).
    pub log_interval: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            dt: 0.1,            // 10 Hz is plenty for a point-mass ascent
            max_time: 3_600.0,  // one hour covers ascent, coast and circularization
            log_interval: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(pos: Vector3<f64>, vel: Vector3<f64>) -> State {
        State {
            time: 0.0,
            pos,
            vel,
            mass: 1.0,
            stage_idx: 0,
            stage_burn_time: 0.0,
            delta_v: 0.0,
        }
    }

    #[test]
    fn flight_path_angle_of_vertical_climb() {
        let s = state(Vector3::new(7.0e6, 0.0, 0.0), Vector3::new(100.0, 0.0, 0.0));
        assert!((s.flight_path_angle() - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn flight_path_angle_of_circular_orbit_is_zero() {
        let s = state(Vector3::new(7.0e6, 0.0, 0.0), Vector3::new(0.0, 7546.0, 0.0));
        assert!(s.flight_path_angle().abs() < 1e-12);
    }

    #[test]
    fn apply_accumulates_burn_time_and_delta_v() {
        let s = state(Vector3::new(7.0e6, 0.0, 0.0), Vector3::zeros());
        let d = Deriv {
            dpos: Vector3::zeros(),
            dvel: Vector3::new(10.0, 0.0, 0.0),
            dmass: -0.1,
            dburn: 1.0,
            ddelta_v: 10.0,
        };
        let next = s.apply(&d, 0.5);
        assert!((next.stage_burn_time - 0.5).abs() < 1e-12);
        assert!((next.delta_v - 5.0).abs() < 1e-12);
        assert!((next.mass - 0.95).abs() < 1e-12);
    }
}
