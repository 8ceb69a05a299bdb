use serde::{Deserialize, Serialize};

use super::stage::{Stage, StageBuilder};

// ---------------------------------------------------------------------------
// Mission: ordered sequence of stages carrying a payload
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    pub name: String,
    #[serde(default)]
    pub payload_mass: f64,
    pub stages: Vec<Stage>,
}

impl Mission {
    /// Total wet mass of all stages plus payload.
    pub fn total_mass(&self) -> f64 {
        self.stages.iter().map(|s| s.total_mass()).sum::<f64>() + self.payload_mass
    }

    /// Mass carried above stage `idx` (upper stages + payload).
    pub fn upper_mass(&self, idx: usize) -> f64 {
        let upper: f64 = self
            .stages
            .get(idx + 1..)
            .map(|rest| rest.iter().map(|s| s.total_mass()).sum::<f64>())
            .unwrap_or(0.0);
        upper + self.payload_mass
    }

    /// Propellant left in stage `idx` given the current vehicle mass.
    pub fn propellant_remaining(&self, idx: usize, vehicle_mass: f64) -> f64 {
        match self.stages.get(idx) {
            Some(stage) => (vehicle_mass - stage.dry_mass - self.upper_mass(idx)).max(0.0),
            None => 0.0,
        }
    }

    /// Total ideal delta-v (each stage computed with upper stages as payload).
    pub fn total_delta_v(&self) -> f64 {
        (0..self.stages.len())
            .map(|i| self.stages[i].delta_v(self.upper_mass(i)))
            .sum()
    }

    /// Get the currently active stage.
    pub fn active_stage(&self, idx: usize) -> Option<&Stage> {
        self.stages.get(idx)
    }

    pub fn is_last_stage(&self, idx: usize) -> bool {
        idx + 1 >= self.stages.len()
    }
}

// ---------------------------------------------------------------------------
// Mission builder
// ---------------------------------------------------------------------------

pub struct MissionBuilder {
    name: String,
    payload_mass: f64,
    stages: Vec<Stage>,
}

impl MissionBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), payload_mass: 0.0, stages: vec![] }
    }

    pub fn payload(mut self, mass: f64) -> Self {
        self.payload_mass = mass;
        self
    }

    pub fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn build(self) -> Mission {
        Mission { name: self.name, payload_mass: self.payload_mass, stages: self.stages }
    }
}

// ---------------------------------------------------------------------------
// Preset missions
// ---------------------------------------------------------------------------

pub mod presets {
    use super::*;

    /// Medium-lift two-stage kerosene launcher ("Meridian").
    pub fn meridian() -> Mission {
        MissionBuilder::new("Meridian")
            .payload(8_000.0)
            .stage(
                StageBuilder::new("M1-Booster")
                    .dry_mass(25_600.0)
                    .propellant_mass(395_700.0)
                    .thrust_sl(7_607_000.0)
                    .thrust_vac(8_227_000.0)
                    .isp_sl(282.0)
                    .isp_vac(311.0)
                    .cd(0.3)
                    .area(10.5)
                    .rated_burn_time(147.0)
                    .build(),
            )
            .stage(
                StageBuilder::new("M2-Upper")
                    .dry_mass(3_900.0)
                    .propellant_mass(92_670.0)
                    .thrust_vac(934_000.0)
                    .isp_vac(348.0)
                    .cd(0.25)
                    .area(10.5)
                    .rated_burn_time(339.0)
                    .build(),
            )
            .build()
    }
}
