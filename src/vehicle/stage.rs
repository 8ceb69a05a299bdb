use serde::{Deserialize, Serialize};

use crate::dynamics::state::G0;

// ---------------------------------------------------------------------------
// Stage definition (one stage of a multi-stage launcher)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub name: String,
    pub dry_mass: f64,            // kg
    pub propellant_mass: f64,     // kg
    #[serde(default)]
    pub thrust_sl: f64,           // N at sea level (0 for vacuum-only engines)
    pub thrust_vac: f64,          // N in vacuum
    #[serde(default)]
    pub isp_sl: f64,              // s
    pub isp_vac: f64,             // s
    #[serde(default = "default_cd")]
    pub cd: f64,
    pub area: f64,                // m^2
    /// Burn time quoted by the engine vendor, s; checked against propellant load.
    #[serde(default)]
    pub rated_burn_time: Option<f64>,
}

fn default_cd() -> f64 {
    0.3
}

impl Stage {
    /// Thrust at a given ambient pressure ratio (1 = sea level, 0 = vacuum).
    pub fn thrust_at(&self, pressure_ratio: f64) -> f64 {
        let p = pressure_ratio.clamp(0.0, 1.0);
        (self.thrust_vac + (self.thrust_sl - self.thrust_vac) * p).max(0.0)
    }

    pub fn isp_at(&self, pressure_ratio: f64) -> f64 {
        let p = pressure_ratio.clamp(0.0, 1.0);
        let isp = self.isp_vac + (self.isp_sl - self.isp_vac) * p;
        // Vacuum-only engines keep a usable Isp so mass flow stays finite
        isp.max(1.0)
    }

    /// Mass flow is set by the chamber and is the same at every altitude.
    pub fn mass_flow(&self) -> f64 {
        self.thrust_vac / (self.isp_vac * G0)
    }

    pub fn total_mass(&self) -> f64 {
        self.dry_mass + self.propellant_mass
    }

    /// Self-consistent burn time from propellant and mass flow.
    pub fn burn_time(&self) -> f64 {
        if self.thrust_vac > 0.0 {
            self.propellant_mass / self.mass_flow()
        } else {
            0.0
        }
    }

    /// Relative mismatch between the vendor burn time and the propellant load.
    pub fn burn_time_mismatch(&self) -> Option<f64> {
        let rated = self.rated_burn_time?;
        let computed = self.burn_time();
        (computed > 0.0).then(|| (rated - computed).abs() / computed)
    }

    /// Ideal vacuum delta-v carrying `payload_mass` on top.
    pub fn delta_v(&self, payload_mass: f64) -> f64 {
        let m0 = self.total_mass() + payload_mass;
        let mf = self.dry_mass + payload_mass;
        self.isp_vac * G0 * (m0 / mf).ln()
    }
}

// ---------------------------------------------------------------------------
// Stage builder
// ---------------------------------------------------------------------------

pub struct StageBuilder {
    stage: Stage,
}

impl StageBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            stage: Stage {
                name: name.into(),
                dry_mass: 1_000.0,
                propellant_mass: 5_000.0,
                thrust_sl: 0.0,
                thrust_vac: 100_000.0,
                isp_sl: 0.0,
                isp_vac: 300.0,
                cd: default_cd(),
                area: 1.0,
                rated_burn_time: None,
            },
        }
    }

    pub fn dry_mass(mut self, v: f64) -> Self { self.stage.dry_mass = v; self }
    pub fn propellant_mass(mut self, v: f64) -> Self { self.stage.propellant_mass = v; self }
    pub fn thrust_sl(mut self, v: f64) -> Self { self.stage.thrust_sl = v; self }
    pub fn thrust_vac(mut self, v: f64) -> Self { self.stage.thrust_vac = v; self }
    pub fn isp_sl(mut self, v: f64) -> Self { self.stage.isp_sl = v; self }
    pub fn isp_vac(mut self, v: f64) -> Self { self.stage.isp_vac = v; self }
    pub fn cd(mut self, v: f64) -> Self { self.stage.cd = v; self }
    pub fn area(mut self, v: f64) -> Self { self.stage.area = v; self }
    pub fn rated_burn_time(mut self, v: f64) -> Self { self.stage.rated_burn_time = Some(v); self }

    pub fn build(self) -> Stage {
        self.stage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn booster() -> Stage {
        StageBuilder::new("S1")
            .dry_mass(20_000.0)
            .propellant_mass(300_000.0)
            .thrust_sl(6_000_000.0)
            .thrust_vac(6_600_000.0)
            .isp_sl(280.0)
            .isp_vac(310.0)
            .build()
    }

    #[test]
    fn performance_interpolates_between_sea_level_and_vacuum() {
        let s = booster();
        assert!((s.thrust_at(1.0) - 6_000_000.0).abs() < 1e-6);
        assert!((s.thrust_at(0.0) - 6_600_000.0).abs() < 1e-6);
        assert!((s.thrust_at(0.5) - 6_300_000.0).abs() < 1e-6);
        assert!((s.isp_at(0.5) - 295.0).abs() < 1e-9);
    }

    #[test]
    fn vacuum_engine_keeps_finite_isp_on_the_pad() {
        let s = StageBuilder::new("S2").thrust_vac(900_000.0).isp_vac(348.0).build();
        assert!(s.isp_at(1.0) >= 1.0);
        assert_eq!(s.thrust_at(1.0), 0.0);
    }

    #[test]
    fn burn_time_matches_mass_flow() {
        let s = booster();
        let expected = 300_000.0 / (6_600_000.0 / (310.0 * G0));
        assert!((s.burn_time() - expected).abs() < 1e-9);
    }

    #[test]
    fn rated_burn_time_mismatch() {
        let s = StageBuilder::new("S1")
            .propellant_mass(10_000.0)
            .thrust_vac(300_000.0)
            .isp_vac(300.0)
            .rated_burn_time(100.0)
            .build();
        let computed = s.burn_time();
        let mismatch = s.burn_time_mismatch().unwrap();
        assert!((mismatch - (100.0 - computed).abs() / computed).abs() < 1e-12);
    }
}
