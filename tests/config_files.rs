use std::fs;
use std::path::PathBuf;

use ascent_sim::config::{self, ConfigError, Configuration};
use ascent_sim::gnc::{FailureReason, MissionPhase};
use ascent_sim::io::{read_telemetry_file, write_report_file, write_telemetry_file};
use ascent_sim::sim;
use ascent_sim::vehicle::presets;

fn scenario(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios").join(name)
}

#[test]
fn shipped_scenarios_load() {
    let vehicle = config::load_vehicle(scenario("meridian.json")).unwrap();
    assert_eq!(vehicle, presets::meridian());

    let leo = Configuration::load(scenario("leo_220.json")).unwrap();
    assert_eq!(leo.mission.target_parking_altitude, 220_000.0);
    assert!(leo.mission.trans_lunar.is_none());

    let tli = Configuration::load(scenario("tli.json")).unwrap();
    let leg = tli.mission.trans_lunar.expect("trans-lunar leg");
    assert_eq!(leg.burn_time, 2_400.0);
    // Omitted sections keep their defaults
    assert_eq!(tli.guidance.pitch_profile, Configuration::default().guidance.pitch_profile);
    assert_eq!(tli.circularization.delta_v_tolerance, 5.0);
}

#[test]
fn invalid_mission_file_names_the_field() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");
    fs::write(&path, r#"{ "sim": { "dt": -0.1 } }"#).unwrap();
    match Configuration::load(&path) {
        Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, "sim.dt"),
        other => panic!("expected invalid sim.dt, got {:?}", other),
    }
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = config::load_vehicle(dir.path().join("nope.json")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn short_run_exports_telemetry_and_report() {
    let mut config = Configuration::default();
    config.sim.max_time = 20.0;
    config.sim.log_interval = 2.0;
    let mission = presets::meridian();
    let outcome = sim::simulate(&mission, &config);

    // Still climbing when the clock runs out
    assert_eq!(outcome.report.final_phase, MissionPhase::Failed);
    assert_eq!(outcome.report.failure_reason, Some(FailureReason::Timeout));
    assert!(outcome.summary.max_altitude > 500.0);

    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("telemetry.csv");
    let json_path = dir.path().join("report.json");
    write_telemetry_file(&csv_path, &outcome.telemetry).unwrap();
    write_report_file(&json_path, &mission, &outcome.report, &outcome.summary, &outcome.events).unwrap();

    let back = read_telemetry_file(&csv_path).unwrap();
    assert_eq!(back.len(), outcome.telemetry.len());
    assert_eq!(back[0].phase, MissionPhase::Launch);

    let report: serde_json::Value = serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(report["outcome"]["failure_reason"], "timeout");
    assert_eq!(report["vehicle"]["stages"], 2);
}
