pub mod state;

use nalgebra::Vector3;

use crate::config::CentralBody;
use crate::physics::{aerodynamics, atmosphere, gravity};
use crate::vehicle::Mission;
use state::{Deriv, GncCommand, State, G0, PROPELLANT_EPS};

// ---------------------------------------------------------------------------
// 3DOF Equations of motion (ECI)
// ---------------------------------------------------------------------------

/// Compute point-mass state derivatives.
///
/// Forces:
///   1. Gravity (point mass, optional J2)
///   2. Thrust along the commanded direction, sea-level/vacuum interpolated
///   3. Drag opposing the velocity relative to the co-rotating atmosphere
pub fn derivatives(state: &State, mission: &Mission, body: &CentralBody, cmd: &GncCommand) -> Deriv {
    let a_gravity = gravity::gravity_accel(&state.pos, body);

    let stage = match mission.active_stage(state.stage_idx) {
        Some(s) => s,
        None => return ballistic(state, a_gravity),
    };

    let alt = state.altitude(body.radius);
    let atm = atmosphere::isa(alt);
    let p_ratio = atm.pressure_ratio();

    // --- Thrust ---
    let remaining_prop = mission.propellant_remaining(state.stage_idx, state.mass);
    let burning = cmd.engine_on() && remaining_prop > PROPELLANT_EPS;
    let (thrust, mass_flow) = if burning {
        let throttle = cmd.throttle.clamp(0.0, 1.0);
        let f = stage.thrust_at(p_ratio) * throttle;
        (f, f / (stage.isp_at(p_ratio) * G0))
    } else {
        (0.0, 0.0)
    };
    let a_thrust = if thrust > 0.0 && state.mass > 0.0 {
        cmd.direction.into_inner() * (thrust / state.mass)
    } else {
        Vector3::zeros()
    };

    // --- Drag ---
    let v_air = aerodynamics::air_relative_velocity(&state.pos, &state.vel, body.rotation_rate);
    let f_drag = aerodynamics::drag_force(&v_air, &atm, stage.cd, stage.area);
    let a_drag = if state.mass > 0.0 { f_drag / state.mass } else { Vector3::zeros() };

    Deriv {
        dpos: state.vel,
        dvel: a_gravity + a_thrust + a_drag,
        dmass: -mass_flow,
        dburn: if thrust > 0.0 { 1.0 } else { 0.0 },
        ddelta_v: a_thrust.norm(),
    }
}

fn ballistic(state: &State, a_gravity: Vector3<f64>) -> Deriv {
    // Everything jettisoned: gravity only
    Deriv {
        dpos: state.vel,
        dvel: a_gravity,
        dmass: 0.0,
        dburn: 0.0,
        ddelta_v: 0.0,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
