use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::runner::simulate_with;
use crate::config::Configuration;
use crate::gnc::{FailureReason, MissionPhaseController, TerminalReport};
use crate::vehicle::Mission;

/// Relative spreads applied to every stage of every run.
///
/// Each quantity is scaled by a factor drawn uniformly from
/// `[1 - spread, 1 + spread]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dispersion {
    pub thrust: f64,
    pub isp: f64,
    pub propellant: f64,
}

impl Default for Dispersion {
    fn default() -> Self {
        Self { thrust: 0.02, isp: 0.005, propellant: 0.01 }
    }
}

impl Dispersion {
    pub fn none() -> Self {
        Self { thrust: 0.0, isp: 0.0, propellant: 0.0 }
    }

    /// A copy of `mission` with every stage perturbed.
    pub fn apply<R: Rng>(&self, mission: &Mission, rng: &mut R) -> Mission {
        let mut dispersed = mission.clone();
        for stage in &mut dispersed.stages {
            let k_thrust = factor(rng, self.thrust);
            let k_isp = factor(rng, self.isp);
            stage.thrust_sl *= k_thrust;
            stage.thrust_vac *= k_thrust;
            stage.isp_sl *= k_isp;
            stage.isp_vac *= k_isp;
            stage.propellant_mass *= factor(rng, self.propellant);
        }
        dispersed
    }
}

fn factor<R: Rng>(rng: &mut R, spread: f64) -> f64 {
    if spread > 0.0 {
        rng.gen_range(1.0 - spread..=1.0 + spread)
    } else {
        1.0
    }
}

/// Aggregate outcome of a batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub runs: usize,
    pub successes: usize,
    pub success_rate: f64,
    /// Mean delta-v spent by successful runs, m/s.
    pub mean_delta_v: Option<f64>,
    pub failures: BTreeMap<FailureReason, usize>,
}

impl BatchSummary {
    pub fn from_reports(reports: &[TerminalReport]) -> Self {
        let mut summary = BatchSummary { runs: reports.len(), ..Default::default() };
        let mut dv_sum = 0.0;
        for report in reports {
            if report.success {
                summary.successes += 1;
                dv_sum += report.total_delta_v;
            } else if let Some(reason) = report.failure_reason {
                *summary.failures.entry(reason).or_insert(0) += 1;
            }
        }
        if summary.runs > 0 {
            summary.success_rate = summary.successes as f64 / summary.runs as f64;
        }
        if summary.successes > 0 {
            summary.mean_delta_v = Some(dv_sum / summary.successes as f64);
        }
        summary
    }
}

/// Fly `runs` dispersed copies of the vehicle, each with a fresh controller.
/// The same seed always yields the same reports.
pub fn run_batch(
    mission: &Mission,
    config: &Configuration,
    runs: usize,
    seed: u64,
    dispersion: &Dispersion,
) -> (Vec<TerminalReport>, BatchSummary) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut reports = Vec::with_capacity(runs);
    for run in 0..runs {
        let vehicle = dispersion.apply(mission, &mut rng);
        let mut controller = MissionPhaseController::new(config);
        let outcome = simulate_with(&vehicle, config, &mut controller);
        debug!(
            run,
            phase = %outcome.report.final_phase,
            time = outcome.report.final_time,
            "batch run finished"
        );
        reports.push(outcome.report);
    }
    let summary = BatchSummary::from_reports(&reports);
    info!(runs, successes = summary.successes, rate = summary.success_rate, "batch complete");
    (reports, summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gnc::MissionPhase;
    use crate::vehicle::presets;

    fn report(success: bool, reason: Option<FailureReason>, dv: f64) -> TerminalReport {
        TerminalReport {
            final_phase: if success { MissionPhase::Success } else { MissionPhase::Failed },
            success,
            failure_reason: reason,
            final_elements: None,
            total_delta_v: dv,
            final_time: 600.0,
            stage_index: 1,
        }
    }

    #[test]
    fn summary_counts_failures_by_reason() {
        let reports = vec![
            report(true, None, 9_000.0),
            report(true, None, 9_200.0),
            report(false, Some(FailureReason::InsufficientDeltaV), 8_000.0),
            report(false, Some(FailureReason::GroundImpact), 100.0),
            report(false, Some(FailureReason::InsufficientDeltaV), 8_100.0),
        ];
        let s = BatchSummary::from_reports(&reports);
        assert_eq!(s.runs, 5);
        assert_eq!(s.successes, 2);
        assert!((s.success_rate - 0.4).abs() < 1e-12);
        assert_eq!(s.mean_delta_v, Some(9_100.0));
        assert_eq!(s.failures[&FailureReason::InsufficientDeltaV], 2);
        assert_eq!(s.failures[&FailureReason::GroundImpact], 1);
    }

    #[test]
    fn empty_batch_has_no_mean() {
        let s = BatchSummary::from_reports(&[]);
        assert_eq!(s.success_rate, 0.0);
        assert!(s.mean_delta_v.is_none());
    }

    #[test]
    fn dispersion_is_seeded_and_bounded() {
        let m = presets::meridian();
        let d = Dispersion::default();
        let a = d.apply(&m, &mut StdRng::seed_from_u64(7));
        let b = d.apply(&m, &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
        for (orig, disp) in m.stages.iter().zip(&a.stages) {
            let k = disp.thrust_vac / orig.thrust_vac;
            assert!((1.0 - d.thrust..=1.0 + d.thrust).contains(&k));
            assert!((disp.thrust_sl / orig.thrust_sl - k).abs() < 1e-12 || orig.thrust_sl == 0.0);
            let p = disp.propellant_mass / orig.propellant_mass;
            assert!((1.0 - d.propellant..=1.0 + d.propellant).contains(&p));
        }
    }

    #[test]
    fn no_dispersion_leaves_vehicle_untouched() {
        let m = presets::meridian();
        let out = Dispersion::none().apply(&m, &mut StdRng::seed_from_u64(1));
        assert_eq!(out, m);
    }
}
