use std::f64::consts::TAU;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::dynamics::state::State;

/// Inertial position/velocity sample handed to the guidance core each step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateVector {
    pub position: Vector3<f64>, // m, ECI
    pub velocity: Vector3<f64>, // m/s, ECI
    pub time: f64,              // s since mission epoch
}

impl StateVector {
    pub fn new(position: Vector3<f64>, velocity: Vector3<f64>, time: f64) -> Self {
        Self { position, velocity, time }
    }

    pub fn altitude(&self, body_radius: f64) -> f64 {
        self.position.norm() - body_radius
    }

    pub fn speed(&self) -> f64 {
        self.velocity.norm()
    }
}

impl From<&State> for StateVector {
    fn from(s: &State) -> Self {
        Self { position: s.pos, velocity: s.vel, time: s.time }
    }
}

/// Classical Keplerian orbital elements, used to construct test and
/// reference orbits.
#[derive(Debug, Clone, Copy)]
pub struct KeplerianElements {
    pub sma: f64,       // semi-major axis, m
    pub ecc: f64,       // eccentricity (0 = circular)
    pub inc: f64,       // inclination, rad
    pub raan: f64,      // right ascension of ascending node, rad
    pub argp: f64,      // argument of periapsis, rad
    pub true_anom: f64, // true anomaly, rad
}

impl KeplerianElements {
    /// Convert to an ECI state vector (position, velocity).
    pub fn to_state_vector(&self, mu: f64) -> (Vector3<f64>, Vector3<f64>) {
        let p = self.sma * (1.0 - self.ecc * self.ecc); // semi-latus rectum
        let (sin_nu, cos_nu) = self.true_anom.sin_cos();
        let r = p / (1.0 + self.ecc * cos_nu);

        // Perifocal frame (PQW)
        let r_pqw = Vector3::new(r * cos_nu, r * sin_nu, 0.0);
        let sqrt_mu_p = (mu / p).sqrt();
        let v_pqw = Vector3::new(-sqrt_mu_p * sin_nu, sqrt_mu_p * (self.ecc + cos_nu), 0.0);

        let rot = self.perifocal_to_eci();
        (rot * r_pqw, rot * v_pqw)
    }

    /// Rotation matrix PQW → ECI (3-1-3 sequence Ω, i, ω).
    fn perifocal_to_eci(&self) -> nalgebra::Matrix3<f64> {
        let (s_o, c_o) = self.raan.sin_cos();
        let (s_w, c_w) = self.argp.sin_cos();
        let (s_i, c_i) = self.inc.sin_cos();
        nalgebra::Matrix3::new(
            c_o * c_w - s_o * s_w * c_i, -c_o * s_w - s_o * c_w * c_i, s_o * s_i,
            s_o * c_w + c_o * s_w * c_i, -s_o * s_w + c_o * c_w * c_i, -c_o * s_i,
            s_w * s_i,                   c_w * s_i,                    c_i,
        )
    }

    /// Convert an ECI state vector to Keplerian elements (bound orbits).
    pub fn from_state_vector(pos: &Vector3<f64>, vel: &Vector3<f64>, mu: f64) -> Self {
        let r = pos.norm();
        let v = vel.norm();

        let h = pos.cross(vel);
        let h_mag = h.norm();
        let n = Vector3::new(-h.y, h.x, 0.0);
        let n_mag = n.norm();

        let e_vec = ((v * v - mu / r) * pos - pos.dot(vel) * vel) / mu;
        let ecc = e_vec.norm();

        let energy = 0.5 * v * v - mu / r;
        let sma = if ecc < 1.0 - 1e-10 {
            -mu / (2.0 * energy)
        } else {
            h_mag * h_mag / (mu * (1.0 - ecc * ecc).abs())
        };

        let inc = (h.z / h_mag).clamp(-1.0, 1.0).acos();

        let raan = if n_mag > 1e-10 {
            let o = (n.x / n_mag).clamp(-1.0, 1.0).acos();
            if n.y < 0.0 { TAU - o } else { o }
        } else {
            0.0
        };

        let argp = if n_mag > 1e-10 && ecc > 1e-10 {
            let w = (n.dot(&e_vec) / (n_mag * ecc)).clamp(-1.0, 1.0).acos();
            if e_vec.z < 0.0 { TAU - w } else { w }
        } else {
            0.0
        };

        let true_anom = if ecc > 1e-10 {
            let nu = (e_vec.dot(pos) / (ecc * r)).clamp(-1.0, 1.0).acos();
            if pos.dot(vel) < 0.0 { TAU - nu } else { nu }
        } else {
            0.0
        };

        KeplerianElements { sma, ecc, inc, raan, argp, true_anom }
    }

    /// Orbital period for an elliptical orbit (s).
    pub fn period(&self, mu: f64) -> f64 {
        TAU * (self.sma.powi(3) / mu).sqrt()
    }

    /// Orbit with the given apsis radii, periapsis on the +X axis.
    pub fn from_apsides(periapsis_radius: f64, apoapsis_radius: f64, inc: f64, true_anom: f64) -> Self {
        let sma = 0.5 * (periapsis_radius + apoapsis_radius);
        let ecc = (apoapsis_radius - periapsis_radius) / (apoapsis_radius + periapsis_radius);
        KeplerianElements { sma, ecc, inc, raan: 0.0, argp: 0.0, true_anom }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::gravity::{MU_EARTH, R_EARTH_ECI};

    #[test]
    fn elliptical_roundtrip() {
        let orbit = KeplerianElements {
            sma: R_EARTH_ECI + 900_000.0,
            ecc: 0.08,
            inc: 51.6_f64.to_radians(),
            raan: 1.1,
            argp: 0.4,
            true_anom: 2.0,
        };
        let (pos, vel) = orbit.to_state_vector(MU_EARTH);
        let back = KeplerianElements::from_state_vector(&pos, &vel, MU_EARTH);
        assert!((back.sma - orbit.sma).abs() < 1.0, "SMA mismatch");
        assert!((back.ecc - orbit.ecc).abs() < 1e-9);
        assert!((back.inc - orbit.inc).abs() < 1e-9);
        assert!((back.raan - orbit.raan).abs() < 1e-9);
        assert!((back.argp - orbit.argp).abs() < 1e-9);
        assert!((back.true_anom - orbit.true_anom).abs() < 1e-9);
    }

    #[test]
    fn apsides_constructor_places_periapsis_on_x() {
        let rp = R_EARTH_ECI + 150_000.0;
        let ra = R_EARTH_ECI + 250_000.0;
        let orbit = KeplerianElements::from_apsides(rp, ra, 0.0, 0.0);
        let (pos, vel) = orbit.to_state_vector(MU_EARTH);
        assert!((pos.x - rp).abs() < 1e-6);
        assert!(pos.dot(&vel).abs() < 1e-3, "no radial velocity at periapsis");
    }

    #[test]
    fn leo_period() {
        let orbit = KeplerianElements::from_apsides(R_EARTH_ECI + 400_000.0, R_EARTH_ECI + 400_000.0, 0.0, 0.0);
        let period = orbit.period(MU_EARTH);
        // ISS period ~92 min = ~5540 s
        assert!(period > 5400.0 && period < 5700.0, "LEO period should be ~92 min, got {:.0} s", period);
    }
}
