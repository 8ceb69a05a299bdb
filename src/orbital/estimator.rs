//! Orbit determination from a single Cartesian sample.
//!
//! [`compute_elements`] is a pure function. Unbound and degenerate
//! trajectories are physical outcomes, not errors: they come back as a
//! normal [`OrbitalElements`] with `is_hyperbolic` / `is_degenerate` set and
//! the undefined quantities left as `None`. Only non-finite input is an
//! [`OrbitError`].

use std::f64::consts::{PI, TAU};

use nalgebra::Vector3;
use serde::Serialize;
use thiserror::Error;

use crate::config::{CentralBody, CircularityTolerance};

/// Below this radius (m) the sample is treated as the body centre.
const MIN_RADIUS: f64 = 1.0;
/// |h| below this fraction of r·v counts as rectilinear motion.
const RECTILINEAR_H_RATIO: f64 = 1e-9;
/// Eccentricity below which the periapsis direction is undefined.
const ECC_DIRECTION_EPS: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrbitError {
    #[error("non-finite state vector (position {position:?}, velocity {velocity:?}, mu {mu})")]
    NonFiniteState {
        position: [f64; 3],
        velocity: [f64; 3],
        mu: f64,
    },
}

/// Read-only snapshot of the osculating orbit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OrbitalElements {
    /// m; negative for hyperbolic, infinite for parabolic trajectories.
    pub semi_major_axis: f64,
    pub eccentricity: f64,
    /// m; `f64::INFINITY` for unbound trajectories.
    pub apoapsis_radius: f64,
    /// m; `None` for unbound trajectories.
    pub periapsis_radius: Option<f64>,
    /// rad; `None` when the orbit plane is undefined.
    pub inclination: Option<f64>,
    pub orbital_period: Option<f64>,
    pub time_to_apoapsis: Option<f64>,
    pub time_to_periapsis: Option<f64>,
    /// rad
    pub true_anomaly: Option<f64>,
    /// J/kg
    pub specific_energy: f64,
    pub angular_momentum: Vector3<f64>,
    pub is_elliptical: bool,
    pub is_circular: bool,
    pub is_hyperbolic: bool,
    pub is_degenerate: bool,
}

impl OrbitalElements {
    pub fn apoapsis_altitude(&self, body_radius: f64) -> f64 {
        self.apoapsis_radius - body_radius
    }

    pub fn periapsis_altitude(&self, body_radius: f64) -> Option<f64> {
        self.periapsis_radius.map(|rp| rp - body_radius)
    }

    /// Periapsis clears `min_altitude`. Unbound trajectories never do.
    pub fn periapsis_above(&self, body_radius: f64, min_altitude: f64) -> bool {
        !self.is_hyperbolic
            && self
                .periapsis_altitude(body_radius)
                .is_some_and(|alt| alt >= min_altitude)
    }
}

/// Compute the osculating elements of `(position, velocity)` about a body
/// with gravitational parameter `mu`.
pub fn compute_elements(
    position: &Vector3<f64>,
    velocity: &Vector3<f64>,
    mu: f64,
    tolerance: &CircularityTolerance,
) -> Result<OrbitalElements, OrbitError> {
    let finite = position.iter().chain(velocity.iter()).all(|c| c.is_finite());
    if !finite || !mu.is_finite() || mu <= 0.0 {
        return Err(OrbitError::NonFiniteState {
            position: [position.x, position.y, position.z],
            velocity: [velocity.x, velocity.y, velocity.z],
            mu,
        });
    }

    let r = position.norm();
    let v = velocity.norm();
    let h_vec = position.cross(velocity);
    let h = h_vec.norm();

    if r < MIN_RADIUS {
        return Ok(at_centre(h_vec));
    }

    let energy = 0.5 * v * v - mu / r;

    if h <= RECTILINEAR_H_RATIO * r * v.max(1.0) {
        return Ok(rectilinear(energy, mu, h_vec));
    }

    let inclination = Some((h_vec.z / h).clamp(-1.0, 1.0).acos());

    // Radicand can dip below zero from rounding on circular orbits
    let radicand = 1.0 + 2.0 * energy * h * h / (mu * mu);
    let eccentricity = radicand.max(0.0).sqrt();

    if energy >= 0.0 {
        let semi_major_axis = if energy > 0.0 { -mu / (2.0 * energy) } else { f64::INFINITY };
        return Ok(OrbitalElements {
            semi_major_axis,
            eccentricity: eccentricity.max(1.0),
            apoapsis_radius: f64::INFINITY,
            periapsis_radius: None,
            inclination,
            orbital_period: None,
            time_to_apoapsis: None,
            time_to_periapsis: None,
            true_anomaly: None,
            specific_energy: energy,
            angular_momentum: h_vec,
            is_elliptical: false,
            is_circular: false,
            is_hyperbolic: true,
            is_degenerate: false,
        });
    }

    let a = -mu / (2.0 * energy);
    let e = eccentricity.min(1.0 - f64::EPSILON);
    let apoapsis_radius = a * (1.0 + e);
    let periapsis_radius = a * (1.0 - e);
    let mean_motion = (mu / a.powi(3)).sqrt();

    let nu = true_anomaly(position, velocity, mu, r);
    let mean_anomaly = mean_anomaly(nu, e);

    let to_periapsis = ((TAU - mean_anomaly) % TAU) / mean_motion;
    let mut to_apoapsis = PI - mean_anomaly;
    if to_apoapsis < 0.0 {
        // Already past apoapsis: next pass is one period later
        to_apoapsis += TAU;
    }
    let to_apoapsis = to_apoapsis / mean_motion;

    let is_circular = e < tolerance.eccentricity
        && (apoapsis_radius - periapsis_radius) < tolerance.apsis_difference;

    Ok(OrbitalElements {
        semi_major_axis: a,
        eccentricity: e,
        apoapsis_radius,
        periapsis_radius: Some(periapsis_radius),
        inclination,
        orbital_period: Some(TAU / mean_motion),
        time_to_apoapsis: Some(to_apoapsis),
        time_to_periapsis: Some(to_periapsis),
        true_anomaly: Some(nu),
        specific_energy: energy,
        angular_momentum: h_vec,
        is_elliptical: true,
        is_circular,
        is_hyperbolic: false,
        is_degenerate: false,
    })
}

/// True anomaly in [0, 2π). Near-circular orbits have no periapsis
/// direction and report 0.
fn true_anomaly(position: &Vector3<f64>, velocity: &Vector3<f64>, mu: f64, r: f64) -> f64 {
    let v2 = velocity.norm_squared();
    let radial = position.dot(velocity);
    let e_vec = ((v2 - mu / r) * position - radial * velocity) / mu;
    let e_mag = e_vec.norm();
    if e_mag < ECC_DIRECTION_EPS {
        return 0.0;
    }
    let nu = (e_vec.dot(position) / (e_mag * r)).clamp(-1.0, 1.0).acos();
    // Moving inward: past apoapsis, approaching periapsis
    if radial < 0.0 { TAU - nu } else { nu }
}

/// Mean anomaly in [0, 2π) from true anomaly via the eccentric anomaly.
fn mean_anomaly(nu: f64, e: f64) -> f64 {
    let cos_nu = nu.cos();
    let cos_e = ((e + cos_nu) / (1.0 + e * cos_nu)).clamp(-1.0, 1.0);
    let mut ecc_anomaly = cos_e.acos();
    if nu > PI {
        ecc_anomaly = TAU - ecc_anomaly;
    }
    (ecc_anomaly - e * ecc_anomaly.sin()).rem_euclid(TAU)
}

fn rectilinear(energy: f64, mu: f64, h_vec: Vector3<f64>) -> OrbitalElements {
    let bound = energy < 0.0;
    let a = if energy != 0.0 { -mu / (2.0 * energy) } else { f64::INFINITY };
    OrbitalElements {
        semi_major_axis: a,
        eccentricity: 1.0,
        apoapsis_radius: if bound { 2.0 * a } else { f64::INFINITY },
        periapsis_radius: bound.then_some(0.0),
        inclination: None,
        orbital_period: None,
        time_to_apoapsis: None,
        time_to_periapsis: None,
        true_anomaly: None,
        specific_energy: energy,
        angular_momentum: h_vec,
        is_elliptical: false,
        is_circular: false,
        is_hyperbolic: !bound,
        is_degenerate: true,
    }
}

fn at_centre(h_vec: Vector3<f64>) -> OrbitalElements {
    OrbitalElements {
        semi_major_axis: 0.0,
        eccentricity: 1.0,
        apoapsis_radius: 0.0,
        periapsis_radius: Some(0.0),
        inclination: None,
        orbital_period: None,
        time_to_apoapsis: None,
        time_to_periapsis: None,
        true_anomaly: None,
        specific_energy: f64::NEG_INFINITY,
        angular_momentum: h_vec,
        is_elliptical: false,
        is_circular: false,
        is_hyperbolic: false,
        is_degenerate: true,
    }
}

// ---------------------------------------------------------------------------
// Estimator: compute_elements plus a cache of the latest result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct OrbitalStateEstimator {
    mu: f64,
    tolerance: CircularityTolerance,
    last: Option<OrbitalElements>,
    last_good: Option<OrbitalElements>,
}

impl OrbitalStateEstimator {
    pub fn new(body: &CentralBody, tolerance: CircularityTolerance) -> Self {
        Self { mu: body.mu, tolerance, last: None, last_good: None }
    }

    pub fn estimate(
        &mut self,
        position: &Vector3<f64>,
        velocity: &Vector3<f64>,
    ) -> Result<OrbitalElements, OrbitError> {
        let elements = compute_elements(position, velocity, self.mu, &self.tolerance)?;
        self.last = Some(elements);
        if !elements.is_degenerate {
            self.last_good = Some(elements);
        }
        Ok(elements)
    }

    /// Most recent result, degenerate or not.
    pub fn last(&self) -> Option<&OrbitalElements> {
        self.last.as_ref()
    }

    /// Most recent non-degenerate result.
    pub fn last_good(&self) -> Option<&OrbitalElements> {
        self.last_good.as_ref()
    }

    pub fn mu(&self) -> f64 {
        self.mu
    }

    pub fn reset(&mut self) {
        self.last = None;
        self.last_good = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    use crate::orbital::elements::{KeplerianElements, StateVector};
    use crate::orbital::propagator::propagate_orbit;

    const MU: f64 = 3.986e14;

    fn tol() -> CircularityTolerance {
        CircularityTolerance::default()
    }

    #[test]
    fn circular_sample_is_circular() {
        let pos = Vector3::new(7_000_000.0, 0.0, 0.0);
        let vel = Vector3::new(0.0, 7_546.0, 0.0);
        let el = compute_elements(&pos, &vel, MU, &tol()).unwrap();

        assert!(el.eccentricity < 1e-3, "e = {}", el.eccentricity);
        assert!(el.is_circular);
        assert!(el.is_elliptical);
        assert!(!el.is_hyperbolic);
        let rp = el.periapsis_radius.unwrap();
        assert!((el.apoapsis_radius - 7_000_000.0).abs() < 10_000.0);
        assert!((rp - 7_000_000.0).abs() < 10_000.0);
        assert!(el.apoapsis_radius >= rp);
    }

    #[test]
    fn escape_speed_is_hyperbolic() {
        let pos = Vector3::new(7_000_000.0, 0.0, 0.0);
        let vel = Vector3::new(0.0, 12_000.0, 0.0);
        let el = compute_elements(&pos, &vel, MU, &tol()).unwrap();

        assert!(el.specific_energy > 0.0);
        assert!(el.is_hyperbolic);
        assert!(!el.is_elliptical && !el.is_circular);
        assert!(el.periapsis_radius.is_none());
        assert!(el.time_to_apoapsis.is_none());
        assert!(el.apoapsis_radius.is_infinite());
        assert!(el.eccentricity > 1.0);
    }

    #[test]
    fn elliptical_apsides_bracket_semi_major_axis() {
        for &(rp, ra, nu) in &[
            (6_600_000.0, 6_900_000.0, 0.3),
            (6_700_000.0, 12_000_000.0, 2.5),
            (6_500_000.0, 42_000_000.0, 4.0),
            (7_000_000.0, 7_000_100.0, 5.9),
        ] {
            let (pos, vel) = KeplerianElements::from_apsides(rp, ra, 0.4, nu).to_state_vector(MU);
            let el = compute_elements(&pos, &vel, MU, &tol()).unwrap();
            let el_rp = el.periapsis_radius.unwrap();
            assert!(el_rp <= el.semi_major_axis + 1e-6);
            assert!(el.semi_major_axis <= el.apoapsis_radius + 1e-6);
            assert!(el_rp >= 0.0);
            assert_relative_eq!(el_rp, rp, max_relative = 1e-6);
            assert_relative_eq!(el.apoapsis_radius, ra, max_relative = 1e-6);
        }
    }

    #[test]
    fn apsis_times_follow_the_anomaly() {
        let rp = 6_578_000.0;
        let ra = 6_778_000.0;
        let period = KeplerianElements::from_apsides(rp, ra, 0.0, 0.0).period(MU);

        // At periapsis: apoapsis is half a period away
        let (pos, vel) = KeplerianElements::from_apsides(rp, ra, 0.0, 0.0).to_state_vector(MU);
        let el = compute_elements(&pos, &vel, MU, &tol()).unwrap();
        assert_relative_eq!(el.time_to_apoapsis.unwrap(), period / 2.0, max_relative = 1e-6);
        assert!(el.time_to_periapsis.unwrap() < 1e-3 || el.time_to_periapsis.unwrap() > period - 1e-3);

        // Just past apoapsis: the next apoapsis is almost a full period away
        let (pos, vel) = KeplerianElements::from_apsides(rp, ra, 0.0, PI + 0.01).to_state_vector(MU);
        let el = compute_elements(&pos, &vel, MU, &tol()).unwrap();
        let tta = el.time_to_apoapsis.unwrap();
        assert!(tta > 0.9 * period && tta < period, "tta = {:.1} of {:.1}", tta, period);
        assert!(el.time_to_periapsis.unwrap() < period / 2.0);

        // Just before apoapsis
        let (pos, vel) = KeplerianElements::from_apsides(rp, ra, 0.0, PI - 0.01).to_state_vector(MU);
        let el = compute_elements(&pos, &vel, MU, &tol()).unwrap();
        assert!(el.time_to_apoapsis.unwrap() < 0.01 * period);
    }

    #[test]
    fn apsis_times_repeat_after_one_period() {
        let orbit = KeplerianElements::from_apsides(6_600_000.0, 7_400_000.0, 0.5, 60_f64.to_radians());
        let (pos, vel) = orbit.to_state_vector(MU);
        let before = compute_elements(&pos, &vel, MU, &tol()).unwrap();
        let period = before.orbital_period.unwrap();

        let steps = 4_000;
        let dt = period / steps as f64;
        let body = CentralBody { mu: MU, ..CentralBody::default() };
        let traj = propagate_orbit(&StateVector::new(pos, vel, 0.0), dt, period, &body);
        let end = traj.last().unwrap();
        let after = compute_elements(&end.position, &end.velocity, MU, &tol()).unwrap();

        let d_apo = (after.time_to_apoapsis.unwrap() - before.time_to_apoapsis.unwrap()).abs();
        let d_peri = (after.time_to_periapsis.unwrap() - before.time_to_periapsis.unwrap()).abs();
        assert!(d_apo < 0.5, "time to apoapsis drifted {:.3} s", d_apo);
        assert!(d_peri < 0.5, "time to periapsis drifted {:.3} s", d_peri);
    }

    #[test]
    fn radial_trajectory_is_degenerate_not_an_error() {
        let pos = Vector3::new(7_000_000.0, 0.0, 0.0);
        let vel = Vector3::new(1_000.0, 0.0, 0.0);
        let el = compute_elements(&pos, &vel, MU, &tol()).unwrap();
        assert!(el.is_degenerate);
        assert!(el.time_to_apoapsis.is_none());
        assert!(el.inclination.is_none());
        assert!(el.apoapsis_radius >= el.periapsis_radius.unwrap());
    }

    #[test]
    fn zero_position_is_degenerate() {
        let el = compute_elements(&Vector3::zeros(), &Vector3::new(0.0, 1.0, 0.0), MU, &tol()).unwrap();
        assert!(el.is_degenerate);
        assert_eq!(el.periapsis_radius, Some(0.0));
    }

    #[test]
    fn nan_input_is_rejected() {
        let err = compute_elements(
            &Vector3::new(f64::NAN, 0.0, 0.0),
            &Vector3::zeros(),
            MU,
            &tol(),
        );
        assert!(matches!(err, Err(OrbitError::NonFiniteState { .. })));
    }

    #[test]
    fn circular_needs_both_conditions() {
        // e ≈ 0.003 but apsides ~43 km apart: not circular under the default 5 km limit
        let orbit = KeplerianElements::from_apsides(7_000_000.0, 7_043_000.0, 0.0, 1.0);
        let (pos, vel) = orbit.to_state_vector(MU);
        let el = compute_elements(&pos, &vel, MU, &tol()).unwrap();
        assert!(el.eccentricity < 0.01);
        assert!(!el.is_circular);
    }

    #[test]
    fn estimator_keeps_last_good() {
        let mut est = OrbitalStateEstimator::new(&CentralBody::default(), tol());
        assert!(est.last().is_none());

        est.estimate(&Vector3::new(7_000_000.0, 0.0, 0.0), &Vector3::new(0.0, 7_546.0, 0.0))
            .unwrap();
        let radial = est
            .estimate(&Vector3::new(7_000_000.0, 0.0, 0.0), &Vector3::new(500.0, 0.0, 0.0))
            .unwrap();
        assert!(radial.is_degenerate);
        assert!(est.last().unwrap().is_degenerate);
        assert!(!est.last_good().unwrap().is_degenerate);

        est.reset();
        assert!(est.last_good().is_none());
    }
}
