use std::f64::consts::PI;

/// Two-impulse transfer between coplanar circular orbits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HohmannTransfer {
    pub departure_dv: f64, // m/s, raises the far apsis to the target radius
    pub arrival_dv: f64,   // m/s, circularizes at the target radius
    pub transfer_time: f64, // s, periapsis to apoapsis of the transfer ellipse
}

impl HohmannTransfer {
    pub fn total_dv(&self) -> f64 {
        self.departure_dv + self.arrival_dv
    }
}

/// Hohmann transfer from radius `r1` to `r2` (m, not altitudes).
pub fn hohmann(r1: f64, r2: f64, mu: f64) -> HohmannTransfer {
    let a = 0.5 * (r1 + r2);
    HohmannTransfer {
        departure_dv: (vis_viva_speed(r1, a, mu) - circular_velocity(r1, mu)).abs(),
        arrival_dv: (circular_velocity(r2, mu) - vis_viva_speed(r2, a, mu)).abs(),
        transfer_time: PI * (a.powi(3) / mu).sqrt(),
    }
}

/// Circular orbit speed at radius `r`.
pub fn circular_velocity(r: f64, mu: f64) -> f64 {
    (mu / r).sqrt()
}

/// Speed at radius `r` on an orbit with semi-major axis `a` (vis-viva).
/// Clamped at zero for radii the orbit cannot reach.
pub fn vis_viva_speed(r: f64, a: f64, mu: f64) -> f64 {
    (mu * (2.0 / r - 1.0 / a)).max(0.0).sqrt()
}

/// Ideal delta-v needed, from a circular orbit of radius `r_parking`, to
/// put apoapsis at `r_target`.
pub fn injection_delta_v(r_parking: f64, r_target: f64, mu: f64) -> f64 {
    hohmann(r_parking, r_target, mu).departure_dv
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::gravity::{MU_EARTH, R_EARTH_ECI};

    #[test]
    fn parking_orbit_to_geostationary() {
        let h = hohmann(R_EARTH_ECI + 220_000.0, 42_164_000.0, MU_EARTH);
        assert!((2_350.0..2_500.0).contains(&h.departure_dv), "{:?}", h);
        assert!((1_400.0..1_520.0).contains(&h.arrival_dv), "{:?}", h);
        // About five and a quarter hours
        assert!((18_500.0..19_500.0).contains(&h.transfer_time), "{:?}", h);
    }

    #[test]
    fn transfer_is_symmetric_in_cost() {
        let (lo, hi) = (R_EARTH_ECI + 300_000.0, R_EARTH_ECI + 1_200_000.0);
        let up = hohmann(lo, hi, MU_EARTH);
        let down = hohmann(hi, lo, MU_EARTH);
        assert!((up.total_dv() - down.total_dv()).abs() < 1e-9);
        assert!(hohmann(lo, lo, MU_EARTH).total_dv() < 1e-9);
    }

    #[test]
    fn vis_viva_matches_circular_speed_on_a_circle() {
        let r = R_EARTH_ECI + 300_000.0;
        assert!((vis_viva_speed(r, r, MU_EARTH) - circular_velocity(r, MU_EARTH)).abs() < 1e-9);
        assert_eq!(vis_viva_speed(3.0 * r, r, MU_EARTH), 0.0);
    }

    #[test]
    fn trans_lunar_injection_is_about_three_km_s() {
        let dv = injection_delta_v(R_EARTH_ECI + 220_000.0, 384_400_000.0, MU_EARTH);
        assert!(dv > 3_000.0 && dv < 3_250.0, "TLI dv {:.0} m/s", dv);
    }
}
