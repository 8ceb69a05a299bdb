use crate::config::CentralBody;
use crate::dynamics;
use crate::dynamics::state::{GncCommand, State};
use crate::vehicle::Mission;

// ---------------------------------------------------------------------------
// 3DOF RK4 integrator with constant GNC command over the step
// ---------------------------------------------------------------------------

/// Single RK4 step with constant GNC command over the step.
pub fn rk4_step(state: &State, mission: &Mission, body: &CentralBody, cmd: &GncCommand, dt: f64) -> State {
    let k1 = dynamics::derivatives(state, mission, body, cmd);
    let k2 = dynamics::derivatives(&state.apply(&k1, dt * 0.5), mission, body, cmd);
    let k3 = dynamics::derivatives(&state.apply(&k2, dt * 0.5), mission, body, cmd);
    let k4 = dynamics::derivatives(&state.apply(&k3, dt), mission, body, cmd);

    let avg = |a: f64, b: f64, c: f64, d: f64| (a + 2.0 * b + 2.0 * c + d) * (dt / 6.0);

    State {
        time: state.time + dt,
        pos: state.pos + (k1.dpos + 2.0 * k2.dpos + 2.0 * k3.dpos + k4.dpos) * (dt / 6.0),
        vel: state.vel + (k1.dvel + 2.0 * k2.dvel + 2.0 * k3.dvel + k4.dvel) * (dt / 6.0),
        mass: (state.mass + avg(k1.dmass, k2.dmass, k3.dmass, k4.dmass)).max(0.0),
        stage_idx: state.stage_idx,
        stage_burn_time: state.stage_burn_time + avg(k1.dburn, k2.dburn, k3.dburn, k4.dburn),
        delta_v: state.delta_v + avg(k1.ddelta_v, k2.ddelta_v, k3.ddelta_v, k4.ddelta_v),
    }
}
