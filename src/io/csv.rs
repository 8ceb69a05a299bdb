use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::ExportError;
use crate::config::CentralBody;
use crate::dynamics::state::{GncCommand, State};
use crate::gnc::MissionPhase;
use crate::orbital::OrbitalElements;
use crate::physics::{aerodynamics, atmosphere};

/// One logged simulation step.
///
/// Apsis altitudes and eccentricity are empty for samples with no
/// defined orbit (unbound or degenerate).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub time: f64,
    pub altitude: f64,
    pub speed: f64,
    pub mass: f64,
    pub phase: MissionPhase,
    pub stage: usize,
    pub flight_path_angle_deg: f64,
    pub pitch_deg: f64,
    pub throttle: f64,
    pub dynamic_pressure: f64,
    pub delta_v: f64,
    pub apoapsis_altitude: Option<f64>,
    pub periapsis_altitude: Option<f64>,
    pub eccentricity: Option<f64>,
}

impl TelemetryRecord {
    pub fn new(
        state: &State,
        body: &CentralBody,
        phase: MissionPhase,
        command: &GncCommand,
        elements: Option<&OrbitalElements>,
    ) -> Self {
        let altitude = state.altitude(body.radius);
        let air = aerodynamics::air_relative_velocity(&state.pos, &state.vel, body.rotation_rate);
        let q = aerodynamics::dynamic_pressure(air.norm(), &atmosphere::isa(altitude));
        let bound = elements.filter(|el| el.is_elliptical);
        TelemetryRecord {
            time: state.time,
            altitude,
            speed: state.speed(),
            mass: state.mass,
            phase,
            stage: state.stage_idx,
            flight_path_angle_deg: state.flight_path_angle().to_degrees(),
            pitch_deg: command.pitch_deg,
            throttle: command.throttle,
            dynamic_pressure: q,
            delta_v: state.delta_v,
            apoapsis_altitude: bound.map(|el| el.apoapsis_altitude(body.radius)),
            periapsis_altitude: bound.and_then(|el| el.periapsis_altitude(body.radius)),
            eccentricity: elements.map(|el| el.eccentricity),
        }
    }
}

/// Write telemetry as CSV with a header row.
pub fn write_telemetry<W: Write>(writer: W, records: &[TelemetryRecord]) -> Result<(), ExportError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for rec in records {
        wtr.serialize(rec)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write telemetry to a CSV file at the given path.
pub fn write_telemetry_file<P: AsRef<Path>>(path: P, records: &[TelemetryRecord]) -> Result<(), ExportError> {
    let file = std::fs::File::create(path)?;
    write_telemetry(file, records)
}

pub fn read_telemetry_file<P: AsRef<Path>>(path: P) -> Result<Vec<TelemetryRecord>, ExportError> {
    let mut rdr = csv::Reader::from_path(path)?;
    let mut records = Vec::new();
    for rec in rdr.deserialize() {
        records.push(rec?);
    }
    Ok(records)
}
