use serde::Serialize;

use super::phase::{FailureReason, Fault, MissionEvent, MissionPhase};
use crate::dynamics::state::{GncCommand, G0, PROPELLANT_EPS};
use crate::orbital::{OrbitalElements, StateVector};

/// Read-only snapshot of the active stage, supplied by the vehicle model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VehicleStageState {
    pub stage_index: usize,
    pub stage_count: usize,
    pub remaining_propellant: f64, // kg
    pub propellant_fraction: f64,  // of the stage's loaded propellant
    pub thrust: f64,               // N, vacuum
    pub isp: f64,                  // s, vacuum
    pub mass: f64,                 // kg, whole vehicle
    pub burn_elapsed: f64,         // s the active stage has fired
    pub delta_v_expended: f64,     // m/s over the whole flight
}

impl VehicleStageState {
    pub fn is_exhausted(&self) -> bool {
        self.remaining_propellant <= PROPELLANT_EPS
    }

    pub fn is_last_stage(&self) -> bool {
        self.stage_index + 1 >= self.stage_count
    }

    /// Ideal delta-v left in the active stage.
    pub fn available_delta_v(&self) -> f64 {
        let burnout = self.mass - self.remaining_propellant;
        if self.isp <= 0.0 || burnout <= 0.0 || self.remaining_propellant <= 0.0 {
            return 0.0;
        }
        self.isp * G0 * (self.mass / burnout).ln()
    }

    /// Vacuum mass flow, kg/s.
    pub fn mass_flow(&self) -> f64 {
        if self.isp > 0.0 { self.thrust / (self.isp * G0) } else { 0.0 }
    }
}

/// The vehicle side of staging.
///
/// `separate_stage` is the only way the active stage index moves. The phase
/// controller calls it from exactly one place, together with the phase
/// change into `StageSeparation`.
pub trait StageSequencer {
    fn stage_state(&self) -> VehicleStageState;

    /// Jettison the active stage. Returns the new active index, or `None`
    /// when there is no further stage to ignite.
    fn separate_stage(&mut self) -> Option<usize>;
}

/// What one controller step hands back to the simulation loop.
#[derive(Debug, Clone)]
pub struct StepOutput {
    pub command: GncCommand,
    pub phase: MissionPhase,
    pub elements: Option<OrbitalElements>,
    pub events: Vec<MissionEvent>,
}

/// Final outcome of a run, read by the batch driver and written to JSON.
#[derive(Debug, Clone, Serialize)]
pub struct TerminalReport {
    pub final_phase: MissionPhase,
    pub success: bool,
    pub failure_reason: Option<FailureReason>,
    pub final_elements: Option<OrbitalElements>,
    pub total_delta_v: f64, // m/s
    pub final_time: f64,    // s
    pub stage_index: usize,
}

/// Trait for flight controllers.
///
/// Implement this to plug a custom mission sequencer into the simulation
/// loop.
pub trait Controller {
    /// Evaluate one step: phase transitions, staging, and the engine command.
    fn step(
        &mut self,
        sample: &StateVector,
        vehicle: &mut dyn StageSequencer,
        fault: Option<Fault>,
    ) -> StepOutput;

    /// Force the mission to fail from outside the step loop (timeouts).
    fn abort(&mut self, reason: FailureReason, time: f64) -> Vec<MissionEvent>;

    fn terminal_report(&self) -> TerminalReport;

    /// Return to the pre-launch state. Called at the start of every run.
    fn reset(&mut self) {}

    /// Human-readable name for logging/display.
    fn name(&self) -> &str {
        "unnamed"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage() -> VehicleStageState {
        VehicleStageState {
            stage_index: 0,
            stage_count: 2,
            remaining_propellant: 9_000.0,
            propellant_fraction: 0.9,
            thrust: 300_000.0,
            isp: 300.0,
            mass: 12_000.0,
            burn_elapsed: 10.0,
            delta_v_expended: 250.0,
        }
    }

    #[test]
    fn available_delta_v_uses_rocket_equation() {
        let s = stage();
        let expected = 300.0 * G0 * (12_000.0_f64 / 3_000.0).ln();
        assert!((s.available_delta_v() - expected).abs() < 1e-9);
    }

    #[test]
    fn exhausted_stage_has_no_delta_v() {
        let mut s = stage();
        s.remaining_propellant = 0.0;
        assert!(s.is_exhausted());
        assert_eq!(s.available_delta_v(), 0.0);
        assert!(!s.is_last_stage());
    }
}
