//! The shipped vehicle flown from the pad with the shipped defaults.

use ascent_sim::config::Configuration;
use ascent_sim::gnc::{BurnCutoff, MissionEvent, MissionPhase};
use ascent_sim::sim::{self, run_batch, Dispersion};
use ascent_sim::vehicle::presets;

#[test]
fn meridian_reaches_parking_orbit() {
    let config = Configuration::default();
    let outcome = sim::simulate(&presets::meridian(), &config);
    let report = &outcome.report;

    assert!(report.success, "ended {} ({:?}) at {:.1} s", report.final_phase, report.failure_reason, report.final_time);
    assert_eq!(report.final_phase, MissionPhase::Success);
    assert_eq!(report.stage_index, 1);

    let el = report.final_elements.expect("orbit known");
    let r = config.body.radius;
    assert!(el.eccentricity < 0.05, "e = {}", el.eccentricity);
    let peri = el.periapsis_altitude(r).expect("bound orbit");
    assert!(peri >= config.mission.min_safe_periapsis_altitude, "periapsis {:.0} m", peri);
    assert!(el.apoapsis_altitude(r) >= config.mission.target_parking_altitude);

    let separations = outcome
        .events
        .iter()
        .filter(|e| matches!(e, MissionEvent::StageSeparated { stage: 1, .. }))
        .count();
    assert_eq!(separations, 1);

    // One apoapsis burn, on the upper stage, ended by guidance
    let ignitions: Vec<_> = outcome
        .events
        .iter()
        .filter_map(|e| match e {
            MissionEvent::BurnStarted { phase, planned_delta_v, .. } => Some((*phase, *planned_delta_v)),
            _ => None,
        })
        .collect();
    assert_eq!(ignitions.len(), 1, "{:?}", ignitions);
    let (phase, planned) = ignitions[0];
    assert_eq!(phase, MissionPhase::Circularization);
    assert!(planned > 0.0 && planned < 2_500.0, "planned {planned} m/s");
    assert!(outcome.events.iter().any(|e| matches!(
        e,
        MissionEvent::BurnCutoff { phase: MissionPhase::Circularization, cutoff, .. }
            if *cutoff != BurnCutoff::PropellantExhausted
    )));

    let phases = sim::phase_history(&outcome.telemetry);
    assert_eq!(phases.first(), Some(&MissionPhase::Launch));
    for expected in [MissionPhase::GravityTurn, MissionPhase::ApoapsisRaise, MissionPhase::CoastToApoapsis] {
        assert!(phases.contains(&expected), "no {} in {:?}", expected, phases);
    }
    assert!(outcome.summary.max_q < config.mission.max_dynamic_pressure);
}

#[test]
fn dispersed_batch_reaches_orbit() {
    let config = Configuration::default();
    let mission = presets::meridian();
    let (reports, summary) = run_batch(&mission, &config, 4, 2024, &Dispersion::default());

    assert_eq!(reports.len(), 4);
    assert!(summary.successes > 0, "failures: {:?}", summary.failures);
    assert!(summary.success_rate > 0.0);
    assert!(summary.mean_delta_v.is_some_and(|dv| dv > 8_000.0));
}
