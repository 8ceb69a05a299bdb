use std::io::Write;
use std::path::Path;

use serde::Serialize;

use super::csv::TelemetryRecord;
use super::ExportError;
use crate::gnc::{MissionEvent, TerminalReport};
use crate::vehicle::Mission;

/// Summary statistics computed from logged telemetry.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FlightSummary {
    pub max_altitude: f64,
    pub max_altitude_time: f64,
    pub max_speed: f64,
    pub max_q: f64,
    pub max_q_time: f64,
    pub flight_time: f64,
    pub final_mass: f64,
}

impl FlightSummary {
    /// Compute summary from telemetry records.
    pub fn from_telemetry(records: &[TelemetryRecord]) -> Self {
        let mut s = FlightSummary::default();
        for r in records {
            if r.altitude > s.max_altitude {
                s.max_altitude = r.altitude;
                s.max_altitude_time = r.time;
            }
            if r.dynamic_pressure > s.max_q {
                s.max_q = r.dynamic_pressure;
                s.max_q_time = r.time;
            }
            s.max_speed = s.max_speed.max(r.speed);
        }
        if let Some(last) = records.last() {
            s.flight_time = last.time;
            s.final_mass = last.mass;
        }
        s
    }
}

#[derive(Serialize)]
struct VehicleInfo<'a> {
    name: &'a str,
    stages: usize,
    liftoff_mass: f64,
    ideal_delta_v: f64,
}

#[derive(Serialize)]
struct FlightReport<'a> {
    vehicle: VehicleInfo<'a>,
    outcome: &'a TerminalReport,
    performance: &'a FlightSummary,
    events: &'a [MissionEvent],
}

/// Write the terminal report, flight summary and mission events as JSON.
pub fn write_report<W: Write>(
    writer: W,
    mission: &Mission,
    report: &TerminalReport,
    summary: &FlightSummary,
    events: &[MissionEvent],
) -> Result<(), ExportError> {
    let doc = FlightReport {
        vehicle: VehicleInfo {
            name: &mission.name,
            stages: mission.stages.len(),
            liftoff_mass: mission.total_mass(),
            ideal_delta_v: mission.total_delta_v(),
        },
        outcome: report,
        performance: summary,
        events,
    };
    serde_json::to_writer_pretty(writer, &doc)?;
    Ok(())
}

/// Write the JSON report to a file.
pub fn write_report_file<P: AsRef<Path>>(
    path: P,
    mission: &Mission,
    report: &TerminalReport,
    summary: &FlightSummary,
    events: &[MissionEvent],
) -> Result<(), ExportError> {
    let file = std::fs::File::create(path)?;
    write_report(std::io::BufWriter::new(file), mission, report, summary, events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gnc::{FailureReason, MissionPhase};
    use crate::vehicle::presets;

    fn rec(time: f64, altitude: f64, speed: f64, q: f64) -> TelemetryRecord {
        TelemetryRecord {
            time,
            altitude,
            speed,
            mass: 1_000.0 - time,
            phase: MissionPhase::GravityTurn,
            stage: 0,
            flight_path_angle_deg: 45.0,
            pitch_deg: 45.0,
            throttle: 1.0,
            dynamic_pressure: q,
            delta_v: 0.0,
            apoapsis_altitude: None,
            periapsis_altitude: None,
            eccentricity: None,
        }
    }

    #[test]
    fn summary_finds_peaks() {
        let recs = vec![
            rec(0.0, 0.0, 400.0, 0.0),
            rec(60.0, 12_000.0, 600.0, 32_000.0),
            rec(200.0, 150_000.0, 5_000.0, 10.0),
            rec(300.0, 140_000.0, 6_000.0, 0.0),
        ];
        let s = FlightSummary::from_telemetry(&recs);
        assert_eq!(s.max_altitude, 150_000.0);
        assert_eq!(s.max_altitude_time, 200.0);
        assert_eq!(s.max_q_time, 60.0);
        assert_eq!(s.max_speed, 6_000.0);
        assert_eq!(s.flight_time, 300.0);
    }

    #[test]
    fn json_output_is_valid() {
        let report = TerminalReport {
            final_phase: MissionPhase::Failed,
            success: false,
            failure_reason: Some(FailureReason::GroundImpact),
            final_elements: None,
            total_delta_v: 1_234.5,
            final_time: 88.0,
            stage_index: 0,
        };
        let events = vec![MissionEvent::Aborted { time: 88.0, reason: FailureReason::GroundImpact }];
        let mut buf = Vec::new();
        write_report(&mut buf, &presets::meridian(), &report, &FlightSummary::default(), &events).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["vehicle"]["name"], "Meridian");
        assert_eq!(value["outcome"]["failure_reason"], "ground_impact");
        assert_eq!(value["outcome"]["final_phase"], "Failed");
        assert_eq!(value["events"][0]["event"], "aborted");
    }
}
