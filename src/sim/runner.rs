use nalgebra::Vector3;
use tracing::{debug, info};

use super::event::{standard_detectors, FlightSample, SimEvent};
use super::integrator::rk4_step;
use crate::config::{CentralBody, Configuration, LaunchSite};
use crate::dynamics::state::{GncCommand, State};
use crate::gnc::{
    Controller, FailureReason, Fault, MissionEvent, MissionPhase, MissionPhaseController, StageSequencer,
    TerminalReport, VehicleStageState,
};
use crate::io::{FlightSummary, TelemetryRecord};
use crate::orbital::StateVector;
use crate::physics::{aerodynamics, atmosphere};
use crate::vehicle::Mission;

// ---------------------------------------------------------------------------
// Flight vehicle: integrated state plus the stage stack it flies
// ---------------------------------------------------------------------------

/// The vehicle as the simulation sees it. Staging happens only through
/// [`StageSequencer::separate_stage`].
#[derive(Debug, Clone)]
pub struct Flight<'a> {
    mission: &'a Mission,
    state: State,
}

impl<'a> Flight<'a> {
    pub fn new(mission: &'a Mission, state: State) -> Self {
        Self { mission, state }
    }

    /// Fully fuelled vehicle on the pad, co-rotating with the body.
    pub fn on_pad(mission: &'a Mission, body: &CentralBody, site: &LaunchSite) -> Self {
        Self::new(mission, pad_state(mission, body, site))
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn mission(&self) -> &Mission {
        self.mission
    }

    pub fn sample(&self) -> StateVector {
        StateVector::from(&self.state)
    }

    /// Integrate one step under `cmd`.
    pub fn advance(&mut self, body: &CentralBody, cmd: &GncCommand, dt: f64) {
        let mut next = rk4_step(&self.state, self.mission, body, cmd, dt);
        // RK4 can overshoot burnout by a fraction of a step
        if let Some(stage) = self.mission.active_stage(next.stage_idx) {
            let floor = stage.dry_mass + self.mission.upper_mass(next.stage_idx);
            next.mass = next.mass.max(floor);
        }
        self.state = next;
    }
}

impl StageSequencer for Flight<'_> {
    fn stage_state(&self) -> VehicleStageState {
        let idx = self.state.stage_idx;
        let count = self.mission.stages.len();
        match self.mission.active_stage(idx) {
            Some(stage) => {
                let remaining = self.mission.propellant_remaining(idx, self.state.mass);
                VehicleStageState {
                    stage_index: idx,
                    stage_count: count,
                    remaining_propellant: remaining,
                    propellant_fraction: if stage.propellant_mass > 0.0 {
                        remaining / stage.propellant_mass
                    } else {
                        0.0
                    },
                    thrust: stage.thrust_vac,
                    isp: stage.isp_vac,
                    mass: self.state.mass,
                    burn_elapsed: self.state.stage_burn_time,
                    delta_v_expended: self.state.delta_v,
                }
            }
            None => VehicleStageState {
                stage_index: idx,
                stage_count: count,
                remaining_propellant: 0.0,
                propellant_fraction: 0.0,
                thrust: 0.0,
                isp: 0.0,
                mass: self.state.mass,
                burn_elapsed: 0.0,
                delta_v_expended: self.state.delta_v,
            },
        }
    }

    fn separate_stage(&mut self) -> Option<usize> {
        let idx = self.state.stage_idx;
        let next = idx + 1;
        if next >= self.mission.stages.len() {
            return None;
        }
        // Spent stage goes with whatever propellant it still held
        let jettisoned = self.state.mass - self.mission.upper_mass(idx);
        self.state.mass = self.mission.upper_mass(idx);
        self.state.stage_idx = next;
        self.state.stage_burn_time = 0.0;
        debug!(time = self.state.time, jettisoned, "stage jettisoned");
        Some(next)
    }
}

fn pad_state(mission: &Mission, body: &CentralBody, site: &LaunchSite) -> State {
    let lat = site.latitude_deg.to_radians();
    let lon = site.longitude_deg.to_radians();
    let pos = body.radius * Vector3::new(lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin());
    let omega = Vector3::new(0.0, 0.0, body.rotation_rate);
    State {
        time: 0.0,
        pos,
        vel: omega.cross(&pos),
        mass: mission.total_mass(),
        stage_idx: 0,
        stage_burn_time: 0.0,
        delta_v: 0.0,
    }
}

// ---------------------------------------------------------------------------
// Full mission simulation
// ---------------------------------------------------------------------------

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct SimOutcome {
    pub telemetry: Vec<TelemetryRecord>,
    pub events: Vec<MissionEvent>,
    pub flight_events: Vec<SimEvent>,
    pub report: TerminalReport,
    pub summary: FlightSummary,
}

fn flight_sample(state: &State, body: &CentralBody) -> FlightSample {
    let altitude = state.altitude(body.radius);
    let air = aerodynamics::air_relative_velocity(&state.pos, &state.vel, body.rotation_rate);
    let vertical_speed = state.up().map(|up| state.vel.dot(&up)).unwrap_or(0.0);
    FlightSample {
        time: state.time,
        altitude,
        vertical_speed,
        dynamic_pressure: aerodynamics::dynamic_pressure(air.norm(), &atmosphere::isa(altitude)),
    }
}

/// Simulate a complete mission with a custom controller.
///
/// The controller is reset first. The run ends when the mission reaches a
/// terminal phase or `sim.max_time` elapses (reported as a timeout).
pub fn simulate_with(
    mission: &Mission,
    config: &Configuration,
    controller: &mut dyn Controller,
) -> SimOutcome {
    let body = &config.body;
    let sim = &config.sim;
    controller.reset();

    let mut flight = Flight::on_pad(mission, body, &config.site);
    let mut detectors = standard_detectors();
    let mut events = Vec::new();
    let mut flight_events = Vec::new();
    let mut telemetry = Vec::new();
    let mut next_log = 0.0;
    let mut prev_sample = flight_sample(flight.state(), body);

    info!(
        vehicle = %mission.name,
        controller = controller.name(),
        stages = mission.stages.len(),
        "simulation start"
    );

    loop {
        let q = prev_sample.dynamic_pressure;
        let fault = (q > config.mission.max_dynamic_pressure)
            .then_some(Fault::DynamicPressure { q, limit: config.mission.max_dynamic_pressure });

        let out = controller.step(&flight.sample(), &mut flight, fault);
        events.extend(out.events);

        if flight.state().time >= next_log || out.phase.is_terminal() {
            telemetry.push(TelemetryRecord::new(
                flight.state(),
                body,
                out.phase,
                &out.command,
                out.elements.as_ref(),
            ));
            next_log = flight.state().time + sim.log_interval;
        }

        if out.phase.is_terminal() {
            break;
        }
        if flight.state().time >= sim.max_time {
            events.extend(controller.abort(FailureReason::Timeout, flight.state().time));
            break;
        }

        flight.advance(body, &out.command, sim.dt);

        let sample = flight_sample(flight.state(), body);
        for det in detectors.iter_mut() {
            if let Some(kind) = det.check(&prev_sample, &sample) {
                debug!(time = sample.time, ?kind, "flight event");
                flight_events.push(SimEvent { time: sample.time, altitude: sample.altitude, kind });
            }
        }
        prev_sample = sample;
    }

    let report = controller.terminal_report();
    info!(
        phase = %report.final_phase,
        success = report.success,
        time = report.final_time,
        delta_v = report.total_delta_v,
        "simulation end"
    );
    let summary = FlightSummary::from_telemetry(&telemetry);
    SimOutcome { telemetry, events, flight_events, report, summary }
}

/// Simulate with the standard mission-phase controller.
pub fn simulate(mission: &Mission, config: &Configuration) -> SimOutcome {
    let mut controller = MissionPhaseController::new(config);
    simulate_with(mission, config, &mut controller)
}

/// Phase at the end of every telemetry record, in order, without repeats.
pub fn phase_history(telemetry: &[TelemetryRecord]) -> Vec<MissionPhase> {
    let mut phases: Vec<MissionPhase> = Vec::new();
    for rec in telemetry {
        if phases.last() != Some(&rec.phase) {
            phases.push(rec.phase);
        }
    }
    phases
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
