use nalgebra::{Unit, Vector3};

use super::limiter::PitchRateLimiter;
use super::phase::MissionPhase;
use crate::config::{ConfigError, GuidanceConfig, PitchPoint};
use crate::dynamics::state::GncCommand;

// ---------------------------------------------------------------------------
// Pitch schedule: altitude-keyed, piecewise linear
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct PitchSchedule {
    points: Vec<PitchPoint>,
}

impl PitchSchedule {
    pub fn new(points: Vec<PitchPoint>) -> Self {
        Self { points }
    }

    /// Breakpoints must rise strictly in altitude with pitch in [0, 90]
    /// never increasing, so the interpolated program is continuous and
    /// monotone.
    pub fn validate(&self) -> Result<(), ConfigError> {
        const FIELD: &str = "guidance.pitch_profile";
        if self.points.is_empty() {
            return Err(ConfigError::invalid(FIELD, "needs at least one breakpoint"));
        }
        for (i, p) in self.points.iter().enumerate() {
            if !p.altitude.is_finite() || !p.pitch_deg.is_finite() {
                return Err(ConfigError::invalid(FIELD, format!("breakpoint {} is not finite", i)));
            }
            if !(0.0..=90.0).contains(&p.pitch_deg) {
                return Err(ConfigError::invalid(
                    FIELD,
                    format!("breakpoint {} pitch {} outside [0, 90]", i, p.pitch_deg),
                ));
            }
        }
        for (i, pair) in self.points.windows(2).enumerate() {
            if pair[1].altitude <= pair[0].altitude {
                return Err(ConfigError::invalid(
                    FIELD,
                    format!("altitudes must increase (breakpoint {})", i + 1),
                ));
            }
            if pair[1].pitch_deg > pair[0].pitch_deg {
                return Err(ConfigError::invalid(
                    FIELD,
                    format!("pitch must not increase with altitude (breakpoint {})", i + 1),
                ));
            }
        }
        Ok(())
    }

    /// Pitch above the local horizontal (deg) at `altitude`, holding the
    /// end values outside the table.
    pub fn pitch_at(&self, altitude: f64) -> f64 {
        let (first, last) = match (self.points.first(), self.points.last()) {
            (Some(f), Some(l)) => (f, l),
            _ => return 90.0,
        };
        if altitude <= first.altitude {
            return first.pitch_deg;
        }
        if altitude >= last.altitude {
            return last.pitch_deg;
        }
        for pair in self.points.windows(2) {
            let (lo, hi) = (&pair[0], &pair[1]);
            if altitude <= hi.altitude {
                let frac = (altitude - lo.altitude) / (hi.altitude - lo.altitude);
                return lo.pitch_deg + frac * (hi.pitch_deg - lo.pitch_deg);
            }
        }
        last.pitch_deg
    }

    pub fn points(&self) -> &[PitchPoint] {
        &self.points
    }
}

// ---------------------------------------------------------------------------
// Guidance engine
// ---------------------------------------------------------------------------

/// Everything guidance looks at for one step.
#[derive(Debug, Clone, Copy)]
pub struct GuidanceInput {
    pub phase: MissionPhase,
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
    pub altitude: f64,
    pub mission_time: f64,
    /// Time the active stage has been firing.
    pub stage_burn_elapsed: f64,
    /// Apoapsis altitude above the parking target, m; infinite when unbound.
    pub apoapsis_excess: Option<f64>,
    pub time_to_apoapsis: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct GuidanceEngine {
    config: GuidanceConfig,
    schedule: PitchSchedule,
    limiter: PitchRateLimiter,
    /// Last attitude the ascent program commanded.
    held: Option<(Unit<Vector3<f64>>, f64)>,
}

impl GuidanceEngine {
    pub fn new(config: &GuidanceConfig) -> Self {
        Self {
            config: config.clone(),
            schedule: PitchSchedule::new(config.pitch_profile.clone()),
            limiter: PitchRateLimiter::new(config.max_pitch_rate_deg_s),
            held: None,
        }
    }

    /// Unlimited pitch target (deg above horizontal) for the ascent program.
    pub fn target_pitch_angle(&self, altitude: f64, speed: f64, mission_time: f64) -> f64 {
        if self.holds_vertical(speed, mission_time) {
            return 90.0;
        }
        self.schedule.pitch_at(altitude)
    }

    fn holds_vertical(&self, speed: f64, mission_time: f64) -> bool {
        mission_time < self.config.vertical_hold_time || speed < self.config.min_turn_speed
    }

    /// Apoapsis raise trims the program: flatter while apoapsis sits above
    /// the parking target, steeper once apoapsis is about to slip past.
    fn apoapsis_raise_pitch(&self, scheduled: f64, input: &GuidanceInput) -> f64 {
        let mut pitch = scheduled;
        if let Some(excess) = input.apoapsis_excess.filter(|&e| e > 0.0) {
            pitch = (pitch - self.config.apoapsis_hold_gain_deg_per_km * excess / 1000.0).max(0.0);
        }
        if let Some(tta) = input.time_to_apoapsis {
            let shortfall = self.config.apoapsis_lead_time - tta;
            if shortfall > 0.0 {
                pitch = pitch.max(self.config.apoapsis_lead_gain_deg_per_s * shortfall);
            }
        }
        pitch.min(90.0)
    }

    pub fn compute_thrust_direction(&mut self, input: &GuidanceInput) -> Unit<Vector3<f64>> {
        self.steer(input).0
    }

    /// Thrust direction, throttle and realized pitch for the current phase.
    pub fn command(&mut self, input: &GuidanceInput) -> GncCommand {
        let (direction, pitch_deg) = self.steer(input);
        GncCommand {
            direction,
            throttle: if input.phase.is_powered() { 1.0 } else { 0.0 },
            pitch_deg,
        }
    }

    pub fn reset(&mut self) {
        self.limiter.reset();
        self.held = None;
    }

    pub fn limiter(&self) -> &PitchRateLimiter {
        &self.limiter
    }

    fn steer(&mut self, input: &GuidanceInput) -> (Unit<Vector3<f64>>, f64) {
        let up = Unit::try_new(input.position, 1e-9).unwrap_or_else(Vector3::z_axis);

        match input.phase {
            MissionPhase::Launch => {
                let pitch = self.limiter.limit(90.0, input.mission_time);
                let out = (up, pitch);
                self.held = Some(out);
                out
            }
            MissionPhase::GravityTurn | MissionPhase::ApoapsisRaise => {
                let settling = input.stage_burn_elapsed < self.config.staging_settle_time;
                match (self.held, settling) {
                    // Fresh ignition: hold attitude until the new stage settles
                    (Some(held), true) => held,
                    _ => {
                        let speed = input.velocity.norm();
                        let target = match input.phase {
                            MissionPhase::ApoapsisRaise if !self.holds_vertical(speed, input.mission_time) => {
                                self.apoapsis_raise_pitch(self.schedule.pitch_at(input.altitude), input)
                            }
                            _ => self.target_pitch_angle(input.altitude, speed, input.mission_time),
                        };
                        let pitch = self.limiter.limit(target, input.mission_time);
                        let out = (pitch_direction(&up, &input.velocity, pitch), pitch);
                        self.held = Some(out);
                        out
                    }
                }
            }
            // Coasting between stages: keep the ascent attitude
            MissionPhase::StageSeparation => self.held.unwrap_or_else(|| prograde(&up, &input.velocity)),
            MissionPhase::Circularization
            | MissionPhase::TransLunarInjection
            | MissionPhase::CoastToApoapsis
            | MissionPhase::Leo
            | MissionPhase::Coast
            | MissionPhase::LunarOrbitInsertion
            | MissionPhase::Failed
            | MissionPhase::Success => prograde(&up, &input.velocity),
        }
    }
}

/// Unit vector `pitch_deg` above the local horizontal, in the plane of
/// the horizontal velocity (or due east when there is none).
fn pitch_direction(up: &Unit<Vector3<f64>>, velocity: &Vector3<f64>, pitch_deg: f64) -> Unit<Vector3<f64>> {
    let horizontal = velocity - up.into_inner() * velocity.dot(up.as_ref());
    let heading = Unit::try_new(horizontal, 1e-3)
        .or_else(|| Unit::try_new(Vector3::z().cross(up.as_ref()), 1e-9))
        .unwrap_or_else(Vector3::y_axis);
    let (sin_p, cos_p) = pitch_deg.to_radians().sin_cos();
    Unit::new_normalize(heading.into_inner() * cos_p + up.into_inner() * sin_p)
}

/// Along the velocity vector; local vertical when at rest.
fn prograde(up: &Unit<Vector3<f64>>, velocity: &Vector3<f64>) -> (Unit<Vector3<f64>>, f64) {
    match Unit::try_new(*velocity, 1e-6) {
        Some(dir) => {
            let fpa = dir.dot(up.as_ref()).clamp(-1.0, 1.0).asin().to_degrees();
            (dir, fpa)
        }
        None => (*up, 90.0),
    }
}
