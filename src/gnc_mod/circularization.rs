//! Apoapsis circularization: burn sizing and ignition/cutoff decisions.

use std::fmt;

use nalgebra::{Unit, Vector3};
use serde::{Deserialize, Serialize};

use super::controller::VehicleStageState;
use crate::config::{CentralBody, CircularizationConfig};
use crate::orbital::{circular_velocity, vis_viva_speed, OrbitalElements, StateVector};

/// Freshly computed each time a burn decision is needed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BurnPlan {
    pub required_delta_v: f64, // m/s
    pub direction: Unit<Vector3<f64>>,
    pub is_valid: bool,
    pub estimated_burn_duration: f64, // s
}

/// Why a burn ended. Propellant exhaustion is kept distinct from reaching
/// the target so the controller can tell success from failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BurnCutoff {
    TargetReached,
    PropellantExhausted,
    Overshoot,
}

impl fmt::Display for BurnCutoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BurnCutoff::TargetReached => "target reached",
            BurnCutoff::PropellantExhausted => "propellant exhausted",
            BurnCutoff::Overshoot => "overshoot",
        })
    }
}

/// Running totals of a burn in progress, owned by whoever started it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BurnProgress {
    pub accumulated_delta_v: f64,
    pub target_delta_v: f64,
    pub burn_elapsed: f64,
    /// Smallest remaining delta-v seen so far in this burn.
    pub best_remaining: f64,
}

#[derive(Debug, Clone)]
pub struct CircularizationPlanner {
    mu: f64,
    config: CircularizationConfig,
}

impl CircularizationPlanner {
    pub fn new(body: &CentralBody, config: &CircularizationConfig) -> Self {
        Self { mu: body.mu, config: *config }
    }

    pub fn config(&self) -> &CircularizationConfig {
        &self.config
    }

    /// Prograde delta-v at apoapsis that would make the orbit circular.
    /// `None` when there is no apoapsis to burn at.
    pub fn required_delta_v(&self, elements: &OrbitalElements) -> Option<f64> {
        if elements.is_hyperbolic || elements.is_degenerate || !elements.is_elliptical {
            return None;
        }
        let ra = elements.apoapsis_radius;
        let v_circular = circular_velocity(ra, self.mu);
        let v_at_apoapsis = vis_viva_speed(ra, elements.semi_major_axis, self.mu);
        Some(v_circular - v_at_apoapsis)
    }

    pub fn plan_burn(
        &self,
        elements: &OrbitalElements,
        state: &StateVector,
        stage: &VehicleStageState,
    ) -> BurnPlan {
        let direction = Unit::try_new(state.velocity, 1e-6)
            .or_else(|| Unit::try_new(state.position, 1e-9))
            .unwrap_or_else(Vector3::z_axis);

        let no_burn = BurnPlan {
            required_delta_v: 0.0,
            direction,
            is_valid: false,
            estimated_burn_duration: 0.0,
        };

        // Eccentricity alone is not enough: a low-perigee orbit can sit
        // under the threshold with its periapsis still in the atmosphere.
        if elements.is_circular {
            return no_burn;
        }
        let dv = match self.required_delta_v(elements) {
            Some(dv) if dv > 0.0 => dv,
            _ => return no_burn,
        };

        BurnPlan {
            required_delta_v: dv,
            direction,
            is_valid: true,
            estimated_burn_duration: burn_duration(dv, stage),
        }
    }

    /// The apoapsis burn `elements` needs is within the stage's delta-v and
    /// no longer than `max_burn_duration`. Unbound orbits never fit.
    pub fn burn_fits(&self, elements: &OrbitalElements, stage: &VehicleStageState) -> bool {
        let Some(dv) = self.required_delta_v(elements) else {
            return false;
        };
        let dv = dv.max(0.0);
        dv <= stage.available_delta_v() && burn_duration(dv, stage) <= self.config.max_burn_duration
    }

    /// Inside the ignition window just before apoapsis. Stateless: the
    /// caller latches the burn once started.
    pub fn should_start_burn(&self, elements: &OrbitalElements, window: f64) -> bool {
        matches!(elements.time_to_apoapsis, Some(t) if (0.0..=window).contains(&t))
    }

    /// Reason to end the burn now, if any. Only propellant exhaustion can
    /// end a burn before `min_burn_duration`.
    pub fn cutoff_reason(
        &self,
        elements: &OrbitalElements,
        progress: &BurnProgress,
        propellant_exhausted: bool,
    ) -> Option<BurnCutoff> {
        if propellant_exhausted {
            return Some(BurnCutoff::PropellantExhausted);
        }
        if progress.burn_elapsed < self.config.min_burn_duration {
            return None;
        }
        if elements.is_hyperbolic {
            return Some(BurnCutoff::Overshoot);
        }
        let tol = self.config.delta_v_tolerance;
        let remaining = progress.target_delta_v - progress.accumulated_delta_v;
        if remaining.abs() < tol {
            return Some(BurnCutoff::TargetReached);
        }
        if remaining > progress.best_remaining + tol {
            return Some(BurnCutoff::Overshoot);
        }
        None
    }

    pub fn should_stop_burn(
        &self,
        elements: &OrbitalElements,
        progress: &BurnProgress,
        propellant_exhausted: bool,
    ) -> bool {
        self.cutoff_reason(elements, progress, propellant_exhausted).is_some()
    }
}

/// Time to deliver `dv` at full vacuum thrust with the rocket equation.
fn burn_duration(dv: f64, stage: &VehicleStageState) -> f64 {
    let mdot = stage.mass_flow();
    if mdot <= 0.0 || stage.isp <= 0.0 {
        return f64::INFINITY;
    }
    let ve = stage.thrust / mdot;
    let propellant = stage.mass * (1.0 - (-dv / ve).exp());
    propellant / mdot
}
