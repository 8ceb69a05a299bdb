//! Mission-phase state machine.
//!
//! [`MissionPhaseController`] owns the current [`MissionPhase`] and is the
//! only thing allowed to change it. Each step it estimates the orbit,
//! evaluates the guards of the current phase (at most one transition per
//! step), then asks guidance for the engine command.

use tracing::{debug, info, warn};

use super::circularization::{BurnCutoff, BurnProgress, CircularizationPlanner};
use super::controller::{Controller, StageSequencer, StepOutput, TerminalReport, VehicleStageState};
use super::guidance::{GuidanceEngine, GuidanceInput};
use super::phase::{FailureReason, Fault, MissionEvent, MissionPhase};
use crate::config::{CentralBody, CircularizationConfig, Configuration, MissionConfig};
use crate::orbital::{injection_delta_v, OrbitalElements, OrbitalStateEstimator, StateVector};

/// Altitude (m) the vehicle must climb above the impact threshold before a
/// descent back through it counts as ground impact.
const PAD_CLEARANCE: f64 = 10.0;
/// Sinking this far (m) below the threshold counts as impact even before
/// clearing the pad.
const PAD_SINK_TOLERANCE: f64 = 1.0;

#[derive(Debug, Clone, Copy)]
struct ActiveBurn {
    started_at: f64,
    delta_v_at_start: f64,
    best_remaining: f64,
}

#[derive(Debug, Clone)]
pub struct MissionPhaseController {
    body: CentralBody,
    mission: MissionConfig,
    circularization: CircularizationConfig,
    estimator: OrbitalStateEstimator,
    planner: CircularizationPlanner,
    guidance: GuidanceEngine,
    phase: MissionPhase,
    failure_reason: Option<FailureReason>,
    burn: Option<ActiveBurn>,
    cleared_pad: bool,
    last_time: f64,
    last_delta_v: f64,
    last_stage_index: usize,
}

impl MissionPhaseController {
    pub fn new(config: &Configuration) -> Self {
        Self {
            body: config.body,
            mission: config.mission,
            circularization: config.circularization,
            estimator: OrbitalStateEstimator::new(&config.body, config.circularization.circularity),
            planner: CircularizationPlanner::new(&config.body, &config.circularization),
            guidance: GuidanceEngine::new(&config.guidance),
            phase: MissionPhase::Launch,
            failure_reason: None,
            burn: None,
            cleared_pad: false,
            last_time: 0.0,
            last_delta_v: 0.0,
            last_stage_index: 0,
        }
    }

    /// Take over a flight already past the pad, e.g. a stage handed over
    /// on a transfer orbit. `reset` still returns to `Launch`.
    pub fn resume(config: &Configuration, phase: MissionPhase) -> Self {
        let mut controller = Self::new(config);
        controller.phase = phase;
        controller.cleared_pad = phase != MissionPhase::Launch;
        controller
    }

    pub fn phase(&self) -> MissionPhase {
        self.phase
    }

    pub fn failure_reason(&self) -> Option<FailureReason> {
        self.failure_reason
    }

    pub fn guidance(&self) -> &GuidanceEngine {
        &self.guidance
    }

    /// Back to `Launch` with every piece of step-to-step memory cleared.
    pub fn reset(&mut self) {
        self.estimator.reset();
        self.guidance.reset();
        self.phase = MissionPhase::Launch;
        self.failure_reason = None;
        self.burn = None;
        self.cleared_pad = false;
        self.last_time = 0.0;
        self.last_delta_v = 0.0;
        self.last_stage_index = 0;
    }

    /// Force the mission into `Failed` from outside (e.g. a run timeout).
    /// No effect once the mission has ended.
    pub fn abort(&mut self, reason: FailureReason, time: f64) -> Vec<MissionEvent> {
        let mut events = Vec::new();
        if !self.phase.is_terminal() {
            self.fail(reason, time, &mut events);
        }
        events
    }

    pub fn terminal_report(&self) -> TerminalReport {
        TerminalReport {
            final_phase: self.phase,
            success: self.phase == MissionPhase::Success,
            failure_reason: self.failure_reason,
            final_elements: self.estimator.last_good().copied(),
            total_delta_v: self.last_delta_v,
            final_time: self.last_time,
            stage_index: self.last_stage_index,
        }
    }

    pub fn step(
        &mut self,
        sample: &StateVector,
        vehicle: &mut dyn StageSequencer,
        fault: Option<Fault>,
    ) -> StepOutput {
        let mut events = Vec::new();
        let t = sample.time;
        let altitude = sample.altitude(self.body.radius);
        let elements = self.observe(sample);

        if !self.phase.is_terminal() {
            if let Some(reason) = self.abort_condition(altitude, fault) {
                self.fail(reason, t, &mut events);
            } else {
                let stage = vehicle.stage_state();
                self.evaluate(sample, elements.as_ref(), &stage, vehicle, &mut events);
            }
        }

        let stage = vehicle.stage_state();
        self.last_time = t;
        self.last_delta_v = stage.delta_v_expended;
        self.last_stage_index = stage.stage_index;

        let input = GuidanceInput {
            phase: self.phase,
            position: sample.position,
            velocity: sample.velocity,
            altitude,
            mission_time: t,
            stage_burn_elapsed: stage.burn_elapsed,
            apoapsis_excess: elements
                .as_ref()
                .map(|el| el.apoapsis_altitude(self.body.radius) - self.mission.target_parking_altitude),
            time_to_apoapsis: elements.as_ref().and_then(|el| el.time_to_apoapsis),
        };
        let command = self.guidance.command(&input);

        StepOutput { command, phase: self.phase, elements, events }
    }

    /// Current elements, or the last good set when this sample is degenerate.
    fn observe(&mut self, sample: &StateVector) -> Option<OrbitalElements> {
        match self.estimator.estimate(&sample.position, &sample.velocity) {
            Ok(el) if !el.is_degenerate => Some(el),
            Ok(el) => {
                if self.cleared_pad {
                    warn!(time = sample.time, "degenerate orbit sample, using last good elements");
                }
                self.estimator.last_good().copied().or(Some(el))
            }
            Err(err) => {
                warn!(time = sample.time, error = %err, "orbit estimate failed, using last good elements");
                self.estimator.last_good().copied()
            }
        }
    }

    fn abort_condition(&mut self, altitude: f64, fault: Option<Fault>) -> Option<FailureReason> {
        let ground = self.mission.ground_impact_altitude;
        if altitude > ground + PAD_CLEARANCE {
            self.cleared_pad = true;
        }
        if altitude <= ground && (self.cleared_pad || altitude < ground - PAD_SINK_TOLERANCE) {
            return Some(FailureReason::GroundImpact);
        }
        match fault {
            Some(Fault::DynamicPressure { q, limit }) => {
                warn!(q, limit, "dynamic pressure limit exceeded");
                Some(FailureReason::StructuralLimitExceeded)
            }
            None => None,
        }
    }

    /// Guards of the current phase only.
    fn evaluate(
        &mut self,
        sample: &StateVector,
        elements: Option<&OrbitalElements>,
        stage: &VehicleStageState,
        vehicle: &mut dyn StageSequencer,
        events: &mut Vec<MissionEvent>,
    ) {
        let t = sample.time;
        match self.phase {
            MissionPhase::Launch => {
                if stage.is_exhausted() {
                    self.on_exhaustion(stage, vehicle, t, events);
                } else if sample.altitude(self.body.radius) >= self.mission.gravity_turn_start_altitude {
                    self.transition(MissionPhase::GravityTurn, t, events);
                }
            }
            MissionPhase::GravityTurn | MissionPhase::ApoapsisRaise => {
                if elements.is_some_and(|el| self.ready_to_coast(el, stage)) {
                    self.transition(MissionPhase::CoastToApoapsis, t, events);
                } else if stage.is_exhausted() {
                    self.on_exhaustion(stage, vehicle, t, events);
                }
            }
            MissionPhase::StageSeparation => {
                let next = match elements {
                    Some(el) if self.ready_to_coast(el, stage) => MissionPhase::CoastToApoapsis,
                    _ => MissionPhase::ApoapsisRaise,
                };
                self.transition(next, t, events);
            }
            MissionPhase::CoastToApoapsis => {
                let Some(el) = elements else { return };
                if !self.planner.should_start_burn(el, self.circularization.start_window) {
                    return;
                }
                let plan = self.planner.plan_burn(el, sample, stage);
                if plan.is_valid {
                    self.transition(MissionPhase::Circularization, t, events);
                    self.start_burn(stage, plan.required_delta_v, plan.estimated_burn_duration, t, events);
                } else if self.periapsis_safe(el) {
                    info!(time = t, "orbit already circular, no burn needed");
                    self.transition(MissionPhase::Leo, t, events);
                } else {
                    warn!(
                        time = t,
                        periapsis = el.periapsis_altitude(self.body.radius),
                        "circular orbit below the safe periapsis"
                    );
                    self.fail(FailureReason::UnsafeParkingOrbit, t, events);
                }
            }
            MissionPhase::Circularization => {
                let Some(el) = elements else { return };
                self.evaluate_circularization(el, stage, vehicle, t, events);
            }
            MissionPhase::Leo => match self.mission.trans_lunar {
                None => self.succeed(t, events),
                Some(tli) if t >= tli.burn_time => {
                    let r = sample.position.norm();
                    let needed = injection_delta_v(r, tli.target_apoapsis_radius, self.body.mu)
                        * (1.0 + tli.propellant_margin);
                    let available = stage.available_delta_v();
                    if available >= needed {
                        self.transition(MissionPhase::TransLunarInjection, t, events);
                        let duration = needed / (stage.thrust / stage.mass).max(f64::MIN_POSITIVE);
                        self.start_burn(stage, needed, duration, t, events);
                    } else {
                        warn!(available, needed, "not enough propellant for trans-lunar injection");
                        self.fail(FailureReason::InsufficientDeltaV, t, events);
                    }
                }
                Some(_) => {}
            },
            MissionPhase::TransLunarInjection => {
                let target = self.mission.trans_lunar.map(|tli| tli.target_apoapsis_radius);
                let reached = elements.is_some_and(|el| {
                    el.is_hyperbolic || target.is_some_and(|ra| el.apoapsis_radius >= ra)
                });
                if reached {
                    self.end_burn(BurnCutoff::TargetReached, stage, t, events);
                    self.transition(MissionPhase::Coast, t, events);
                } else if stage.is_exhausted() {
                    self.end_burn(BurnCutoff::PropellantExhausted, stage, t, events);
                    self.fail(FailureReason::InsufficientDeltaV, t, events);
                }
            }
            MissionPhase::Coast => {
                let soi = self.mission.trans_lunar.map(|tli| tli.soi_entry_radius);
                if soi.is_some_and(|r| sample.position.norm() >= r) {
                    self.transition(MissionPhase::LunarOrbitInsertion, t, events);
                }
            }
            MissionPhase::LunarOrbitInsertion => self.succeed(t, events),
            MissionPhase::Failed | MissionPhase::Success => {}
        }
    }

    fn evaluate_circularization(
        &mut self,
        el: &OrbitalElements,
        stage: &VehicleStageState,
        vehicle: &mut dyn StageSequencer,
        t: f64,
        events: &mut Vec<MissionEvent>,
    ) {
        let Some(burn) = self.burn else {
            // Entered without a burn record: start one now
            let remaining = self.planner.required_delta_v(el).unwrap_or(0.0).max(0.0);
            self.start_burn(stage, remaining, 0.0, t, events);
            return;
        };

        let accumulated = stage.delta_v_expended - burn.delta_v_at_start;
        let remaining = self.planner.required_delta_v(el).unwrap_or(0.0);
        let progress = BurnProgress {
            accumulated_delta_v: accumulated,
            target_delta_v: accumulated + remaining,
            burn_elapsed: t - burn.started_at,
            best_remaining: burn.best_remaining,
        };
        let cutoff = self.planner.cutoff_reason(el, &progress, stage.is_exhausted());
        if let Some(active) = self.burn.as_mut() {
            active.best_remaining = active.best_remaining.min(remaining);
        }

        let Some(cutoff) = cutoff else { return };
        debug!(
            time = t,
            accumulated,
            remaining,
            eccentricity = el.eccentricity,
            %cutoff,
            "circularization cutoff"
        );
        self.end_burn(cutoff, stage, t, events);

        if cutoff == BurnCutoff::PropellantExhausted && !stage.is_last_stage() {
            // Another stage can finish the job after separation
            self.advance_stage_and_transition(vehicle, t, events);
            return;
        }

        let converged = cutoff != BurnCutoff::PropellantExhausted
            && el.eccentricity < self.circularization.circularity.eccentricity;
        if self.periapsis_safe(el) && (el.is_circular || converged) {
            self.transition(MissionPhase::Leo, t, events);
        } else if cutoff == BurnCutoff::PropellantExhausted {
            self.fail(FailureReason::InsufficientDeltaV, t, events);
        } else {
            self.fail(FailureReason::UnsafeParkingOrbit, t, events);
        }
    }

    fn on_exhaustion(
        &mut self,
        stage: &VehicleStageState,
        vehicle: &mut dyn StageSequencer,
        t: f64,
        events: &mut Vec<MissionEvent>,
    ) {
        if stage.is_last_stage() {
            warn!(time = t, stage = stage.stage_index, "last stage burned out during ascent");
            self.fail(FailureReason::InsufficientDeltaV, t, events);
        } else {
            self.advance_stage_and_transition(vehicle, t, events);
        }
    }

    /// Jettison the active stage and enter `StageSeparation` as one
    /// operation. Nothing else may set that phase.
    fn advance_stage_and_transition(
        &mut self,
        vehicle: &mut dyn StageSequencer,
        t: f64,
        events: &mut Vec<MissionEvent>,
    ) {
        match vehicle.separate_stage() {
            Some(stage) => {
                info!(time = t, stage, "stage separation");
                events.push(MissionEvent::StageSeparated { time: t, stage });
                self.set_phase(MissionPhase::StageSeparation, t, events);
            }
            None => self.fail(FailureReason::InsufficientDeltaV, t, events),
        }
    }

    fn transition(&mut self, to: MissionPhase, t: f64, events: &mut Vec<MissionEvent>) {
        debug_assert_ne!(
            to,
            MissionPhase::StageSeparation,
            "stage separation must go through advance_stage_and_transition"
        );
        self.set_phase(to, t, events);
    }

    fn set_phase(&mut self, to: MissionPhase, t: f64, events: &mut Vec<MissionEvent>) {
        let from = self.phase;
        if from == to {
            return;
        }
        info!(time = t, %from, %to, "phase transition");
        events.push(MissionEvent::PhaseChanged { time: t, from, to });
        self.phase = to;
    }

    fn fail(&mut self, reason: FailureReason, t: f64, events: &mut Vec<MissionEvent>) {
        warn!(time = t, phase = %self.phase, %reason, "mission failed");
        self.burn = None;
        self.failure_reason = Some(reason);
        events.push(MissionEvent::Aborted { time: t, reason });
        self.set_phase(MissionPhase::Failed, t, events);
    }

    fn succeed(&mut self, t: f64, events: &mut Vec<MissionEvent>) {
        info!(time = t, "mission success");
        events.push(MissionEvent::MissionSuccess { time: t });
        self.transition(MissionPhase::Success, t, events);
    }

    fn start_burn(
        &mut self,
        stage: &VehicleStageState,
        planned_delta_v: f64,
        estimated_duration: f64,
        t: f64,
        events: &mut Vec<MissionEvent>,
    ) {
        info!(time = t, phase = %self.phase, planned_delta_v, estimated_duration, "burn ignition");
        self.burn = Some(ActiveBurn {
            started_at: t,
            delta_v_at_start: stage.delta_v_expended,
            best_remaining: planned_delta_v,
        });
        events.push(MissionEvent::BurnStarted {
            time: t,
            phase: self.phase,
            planned_delta_v,
            estimated_duration,
        });
    }

    fn end_burn(
        &mut self,
        cutoff: BurnCutoff,
        stage: &VehicleStageState,
        t: f64,
        events: &mut Vec<MissionEvent>,
    ) {
        let delta_v = self
            .burn
            .take()
            .map(|b| stage.delta_v_expended - b.delta_v_at_start)
            .unwrap_or(0.0);
        info!(time = t, phase = %self.phase, %cutoff, delta_v, "burn cutoff");
        events.push(MissionEvent::BurnCutoff { time: t, phase: self.phase, cutoff, delta_v });
    }

    /// Powered ascent ends only on the last stage, once apoapsis is high
    /// enough and the stage can still fly the burn that circularizes it.
    fn ready_to_coast(&self, el: &OrbitalElements, stage: &VehicleStageState) -> bool {
        stage.is_last_stage() && self.apoapsis_at_target(el) && self.planner.burn_fits(el, stage)
    }

    fn apoapsis_at_target(&self, el: &OrbitalElements) -> bool {
        el.is_hyperbolic
            || el.apoapsis_altitude(self.body.radius) >= self.mission.target_parking_altitude
    }

    fn periapsis_safe(&self, el: &OrbitalElements) -> bool {
        el.periapsis_above(self.body.radius, self.mission.min_safe_periapsis_altitude)
    }
}

impl Controller for MissionPhaseController {
    fn step(
        &mut self,
        sample: &StateVector,
        vehicle: &mut dyn StageSequencer,
        fault: Option<Fault>,
    ) -> StepOutput {
        MissionPhaseController::step(self, sample, vehicle, fault)
    }

    fn abort(&mut self, reason: FailureReason, time: f64) -> Vec<MissionEvent> {
        MissionPhaseController::abort(self, reason, time)
    }

    fn terminal_report(&self) -> TerminalReport {
        MissionPhaseController::terminal_report(self)
    }

    fn reset(&mut self) {
        MissionPhaseController::reset(self);
    }

    fn name(&self) -> &str {
        "MissionPhaseController"
    }
}
