//! Run configuration.
//!
//! A [`Configuration`] is built once at the start of a run (defaults, or a
//! mission JSON file layered over the defaults), validated, and then handed
//! by reference to every component constructor. Nothing re-reads it mid-run.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dynamics::state::SimConfig;
use crate::gnc::PitchSchedule;
use crate::physics::gravity::{EARTH_ROTATION_RATE, J2_EARTH, MU_EARTH, R_EARTH_ECI};
use crate::vehicle::Mission;

/// Errors raised while loading or validating configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: String, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::Invalid { field: field.into(), reason: reason.into() }
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Central body the vehicle launches from and orbits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CentralBody {
    pub mu: f64,            // m^3/s^2
    pub radius: f64,        // m
    pub j2: f64,
    pub rotation_rate: f64, // rad/s
    pub use_j2: bool,
}

impl Default for CentralBody {
    fn default() -> Self {
        Self {
            mu: MU_EARTH,
            radius: R_EARTH_ECI,
            j2: J2_EARTH,
            rotation_rate: EARTH_ROTATION_RATE,
            use_j2: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchSite {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
}

impl Default for LaunchSite {
    fn default() -> Self {
        // Cape Canaveral
        Self { latitude_deg: 28.5, longitude_deg: -80.6 }
    }
}

/// One breakpoint of the altitude-keyed pitch program.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PitchPoint {
    pub altitude: f64,  // m
    pub pitch_deg: f64, // above local horizontal
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuidanceConfig {
    pub max_pitch_rate_deg_s: f64,
    /// Seconds after liftoff the vehicle holds vertical regardless of altitude.
    pub vertical_hold_time: f64,
    /// Below this speed the pitch program is not entered.
    pub min_turn_speed: f64,
    /// Attitude hold after an upper-stage ignition.
    pub staging_settle_time: f64,
    pub pitch_profile: Vec<PitchPoint>,
    /// Apoapsis raise: pitch taken off the program per km of apoapsis
    /// above the parking target.
    pub apoapsis_hold_gain_deg_per_km: f64,
    /// Apoapsis raise: keep at least this much time to apoapsis ahead.
    pub apoapsis_lead_time: f64, // s
    /// Pitch floor added per second the lead time falls short.
    pub apoapsis_lead_gain_deg_per_s: f64,
}

impl Default for GuidanceConfig {
    fn default() -> Self {
        let profile = [
            (8_000.0, 90.0),
            (20_000.0, 65.0),
            (40_000.0, 40.0),
            (70_000.0, 22.0),
            (120_000.0, 14.0),
            (220_000.0, 10.0),
        ];
        Self {
            max_pitch_rate_deg_s: 0.7,
            vertical_hold_time: 5.0,
            min_turn_speed: 50.0,
            staging_settle_time: 1.0,
            apoapsis_hold_gain_deg_per_km: 0.5,
            apoapsis_lead_time: 60.0,
            apoapsis_lead_gain_deg_per_s: 0.5,
            pitch_profile: profile
                .iter()
                .map(|&(altitude, pitch_deg)| PitchPoint { altitude, pitch_deg })
                .collect(),
        }
    }
}

/// Both conditions must hold for an orbit to count as circular.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircularityTolerance {
    pub eccentricity: f64,
    pub apsis_difference: f64, // m
}

impl Default for CircularityTolerance {
    fn default() -> Self {
        Self { eccentricity: 0.01, apsis_difference: 5_000.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircularizationConfig {
    pub circularity: CircularityTolerance,
    /// Ignite when time-to-apoapsis falls inside [0, start_window].
    pub start_window: f64,          // s
    pub delta_v_tolerance: f64,     // m/s
    pub min_burn_duration: f64,     // s
    /// Powered ascent on the last stage ends only once the apoapsis burn
    /// it leaves behind is no longer than this.
    pub max_burn_duration: f64,     // s
}

impl Default for CircularizationConfig {
    fn default() -> Self {
        Self {
            circularity: CircularityTolerance::default(),
            start_window: 25.0,
            delta_v_tolerance: 5.0,
            min_burn_duration: 25.0,
            max_burn_duration: 50.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransLunarConfig {
    /// Optimal injection time from the launch-window solution, s after liftoff.
    pub burn_time: f64,
    pub target_apoapsis_radius: f64, // m
    /// Extra fraction of the injection delta-V the stage must carry.
    pub propellant_margin: f64,
    /// Radius at which lunar influence is declared.
    pub soi_entry_radius: f64, // m
}

impl Default for TransLunarConfig {
    fn default() -> Self {
        Self {
            burn_time: 5_400.0,
            target_apoapsis_radius: 384_400_000.0,
            propellant_margin: 0.05,
            soi_entry_radius: 384_400_000.0 - 66_100_000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MissionConfig {
    pub gravity_turn_start_altitude: f64, // m
    pub target_parking_altitude: f64,     // m
    pub min_safe_periapsis_altitude: f64, // m
    pub max_dynamic_pressure: f64,        // Pa
    pub ground_impact_altitude: f64,      // m
    pub trans_lunar: Option<TransLunarConfig>,
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            gravity_turn_start_altitude: 8_000.0,
            target_parking_altitude: 220_000.0,
            min_safe_periapsis_altitude: 150_000.0,
            max_dynamic_pressure: 80_000.0,
            ground_impact_altitude: 0.0,
            trans_lunar: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub body: CentralBody,
    pub site: LaunchSite,
    pub guidance: GuidanceConfig,
    pub circularization: CircularizationConfig,
    pub mission: MissionConfig,
    pub sim: SimConfig,
}

impl Configuration {
    /// Load a mission file, filling every omitted field from the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Configuration = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("body.mu", self.body.mu)?;
        positive("body.radius", self.body.radius)?;
        if !(-90.0..=90.0).contains(&self.site.latitude_deg) {
            return Err(ConfigError::invalid("site.latitude_deg", "must lie in [-90, 90]"));
        }

        positive("guidance.max_pitch_rate_deg_s", self.guidance.max_pitch_rate_deg_s)?;
        non_negative("guidance.vertical_hold_time", self.guidance.vertical_hold_time)?;
        non_negative("guidance.min_turn_speed", self.guidance.min_turn_speed)?;
        non_negative("guidance.staging_settle_time", self.guidance.staging_settle_time)?;
        non_negative("guidance.apoapsis_hold_gain_deg_per_km", self.guidance.apoapsis_hold_gain_deg_per_km)?;
        non_negative("guidance.apoapsis_lead_time", self.guidance.apoapsis_lead_time)?;
        non_negative("guidance.apoapsis_lead_gain_deg_per_s", self.guidance.apoapsis_lead_gain_deg_per_s)?;
        PitchSchedule::new(self.guidance.pitch_profile.clone()).validate()?;

        let circ = &self.circularization;
        positive("circularization.circularity.eccentricity", circ.circularity.eccentricity)?;
        positive("circularization.circularity.apsis_difference", circ.circularity.apsis_difference)?;
        positive("circularization.start_window", circ.start_window)?;
        positive("circularization.delta_v_tolerance", circ.delta_v_tolerance)?;
        non_negative("circularization.min_burn_duration", circ.min_burn_duration)?;
        positive("circularization.max_burn_duration", circ.max_burn_duration)?;

        let m = &self.mission;
        non_negative("mission.gravity_turn_start_altitude", m.gravity_turn_start_altitude)?;
        positive("mission.target_parking_altitude", m.target_parking_altitude)?;
        positive("mission.min_safe_periapsis_altitude", m.min_safe_periapsis_altitude)?;
        positive("mission.max_dynamic_pressure", m.max_dynamic_pressure)?;
        if m.min_safe_periapsis_altitude > m.target_parking_altitude {
            return Err(ConfigError::invalid(
                "mission.min_safe_periapsis_altitude",
                "must not exceed the target parking altitude",
            ));
        }
        if let Some(tli) = &m.trans_lunar {
            non_negative("mission.trans_lunar.burn_time", tli.burn_time)?;
            non_negative("mission.trans_lunar.propellant_margin", tli.propellant_margin)?;
            if tli.target_apoapsis_radius <= self.body.radius + m.target_parking_altitude {
                return Err(ConfigError::invalid(
                    "mission.trans_lunar.target_apoapsis_radius",
                    "must lie above the parking orbit",
                ));
            }
            positive("mission.trans_lunar.soi_entry_radius", tli.soi_entry_radius)?;
        }

        positive("sim.dt", self.sim.dt)?;
        non_negative("sim.log_interval", self.sim.log_interval)?;
        if self.sim.max_time <= self.sim.dt {
            return Err(ConfigError::invalid("sim.max_time", "must exceed sim.dt"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Vehicle files
// ---------------------------------------------------------------------------

/// Load and validate a vehicle (stack of stages + payload) from JSON.
pub fn load_vehicle<P: AsRef<Path>>(path: P) -> Result<Mission, ConfigError> {
    let contents = fs::read_to_string(path)?;
    vehicle_from_json_str(&contents)
}

pub fn vehicle_from_json_str(json: &str) -> Result<Mission, ConfigError> {
    let mission: Mission = serde_json::from_str(json)?;
    validate_vehicle(&mission)?;
    Ok(mission)
}

pub fn validate_vehicle(mission: &Mission) -> Result<(), ConfigError> {
    if mission.stages.is_empty() {
        return Err(ConfigError::invalid("stages", "vehicle needs at least one stage"));
    }
    non_negative("payload_mass", mission.payload_mass)?;
    for (i, stage) in mission.stages.iter().enumerate() {
        let field = |name: &str| format!("stages[{}].{}", i, name);
        positive(&field("dry_mass"), stage.dry_mass)?;
        non_negative(&field("propellant_mass"), stage.propellant_mass)?;
        positive(&field("thrust_vac"), stage.thrust_vac)?;
        non_negative(&field("thrust_sl"), stage.thrust_sl)?;
        positive(&field("isp_vac"), stage.isp_vac)?;
        non_negative(&field("isp_sl"), stage.isp_sl)?;
        non_negative(&field("cd"), stage.cd)?;
        non_negative(&field("area"), stage.area)?;
        if stage.thrust_sl > 0.0 && stage.isp_sl <= 0.0 {
            return Err(ConfigError::invalid(field("isp_sl"), "sea-level thrust needs a sea-level Isp"));
        }
        if let Some(t) = stage.rated_burn_time {
            positive(&field("rated_burn_time"), t)?;
        }
    }
    Ok(())
}

fn positive(field: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("must be positive, got {}", value)))
    }
}

fn non_negative(field: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("must be non-negative, got {}", value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        Configuration::default().validate().unwrap();
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let json = r#"{
            "site": { "latitude_deg": 5.2, "longitude_deg": -52.8 },
            "mission": { "target_parking_altitude": 300000.0 },
            "sim": { "dt": 0.05, "max_time": 1200.0 }
        }"#;
        let config = Configuration::from_json_str(json).unwrap();
        assert_eq!(config.site.latitude_deg, 5.2);
        assert_eq!(config.mission.target_parking_altitude, 300_000.0);
        assert_eq!(config.mission.gravity_turn_start_altitude, 8_000.0);
        assert_eq!(config.circularization.min_burn_duration, 25.0);
        assert_eq!(config.sim.dt, 0.05);
    }

    #[test]
    fn rejects_non_positive_timestep() {
        let err = Configuration::from_json_str(r#"{ "sim": { "dt": 0.0 } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == "sim.dt"), "{}", err);
    }

    #[test]
    fn rejects_rising_pitch_profile() {
        let json = r#"{ "guidance": { "pitch_profile": [
            { "altitude": 8000.0, "pitch_deg": 80.0 },
            { "altitude": 20000.0, "pitch_deg": 85.0 }
        ] } }"#;
        assert!(Configuration::from_json_str(json).is_err());
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = Configuration::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn vehicle_with_negative_mass_is_rejected() {
        let json = r#"{
            "name": "Bad",
            "stages": [
                { "name": "S1", "dry_mass": -10.0, "propellant_mass": 100.0,
                  "thrust_sl": 5000.0, "thrust_vac": 5500.0,
                  "isp_sl": 250.0, "isp_vac": 280.0, "area": 1.0 }
            ]
        }"#;
        let err = vehicle_from_json_str(json).unwrap_err();
        assert!(err.to_string().contains("stages[0].dry_mass"), "{}", err);
    }

    #[test]
    fn vehicle_file_round_trip() {
        let json = r#"{
            "name": "Test",
            "payload_mass": 500.0,
            "stages": [
                { "name": "S1", "dry_mass": 1000.0, "propellant_mass": 9000.0,
                  "thrust_sl": 200000.0, "thrust_vac": 220000.0,
                  "isp_sl": 260.0, "isp_vac": 290.0, "area": 1.2 }
            ]
        }"#;
        let mission = vehicle_from_json_str(json).unwrap();
        assert_eq!(mission.stages.len(), 1);
        assert!((mission.total_mass() - 10_500.0).abs() < 1e-9);
        assert!((mission.stages[0].cd - 0.3).abs() < 1e-12, "cd should default");
    }
}
