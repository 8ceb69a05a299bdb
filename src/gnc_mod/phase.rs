use std::fmt;

use serde::{Deserialize, Serialize};

use super::circularization::BurnCutoff;

// ---------------------------------------------------------------------------
// Mission phases
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MissionPhase {
    Launch,
    GravityTurn,
    StageSeparation,
    ApoapsisRaise,
    CoastToApoapsis,
    Circularization,
    #[serde(rename = "LEO")]
    Leo,
    TransLunarInjection,
    Coast,
    LunarOrbitInsertion,
    Failed,
    Success,
}

impl MissionPhase {
    pub const ALL: [MissionPhase; 12] = [
        MissionPhase::Launch,
        MissionPhase::GravityTurn,
        MissionPhase::StageSeparation,
        MissionPhase::ApoapsisRaise,
        MissionPhase::CoastToApoapsis,
        MissionPhase::Circularization,
        MissionPhase::Leo,
        MissionPhase::TransLunarInjection,
        MissionPhase::Coast,
        MissionPhase::LunarOrbitInsertion,
        MissionPhase::Failed,
        MissionPhase::Success,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            MissionPhase::Launch => "Launch",
            MissionPhase::GravityTurn => "GravityTurn",
            MissionPhase::StageSeparation => "StageSeparation",
            MissionPhase::ApoapsisRaise => "ApoapsisRaise",
            MissionPhase::CoastToApoapsis => "CoastToApoapsis",
            MissionPhase::Circularization => "Circularization",
            MissionPhase::Leo => "LEO",
            MissionPhase::TransLunarInjection => "TransLunarInjection",
            MissionPhase::Coast => "Coast",
            MissionPhase::LunarOrbitInsertion => "LunarOrbitInsertion",
            MissionPhase::Failed => "Failed",
            MissionPhase::Success => "Success",
        }
    }

    /// The run ends once one of these is reached.
    pub fn is_terminal(&self) -> bool {
        matches!(self, MissionPhase::Failed | MissionPhase::Success)
    }

    /// Phases in which the active stage is commanded to fire.
    pub fn is_powered(&self) -> bool {
        match self {
            MissionPhase::Launch
            | MissionPhase::GravityTurn
            | MissionPhase::ApoapsisRaise
            | MissionPhase::Circularization
            | MissionPhase::TransLunarInjection => true,
            MissionPhase::StageSeparation
            | MissionPhase::CoastToApoapsis
            | MissionPhase::Leo
            | MissionPhase::Coast
            | MissionPhase::LunarOrbitInsertion
            | MissionPhase::Failed
            | MissionPhase::Success => false,
        }
    }
}

impl fmt::Display for MissionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Failure reasons and faults
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    GroundImpact,
    InsufficientDeltaV,
    StructuralLimitExceeded,
    UnsafeParkingOrbit,
    Timeout,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::GroundImpact => "ground_impact",
            FailureReason::InsufficientDeltaV => "insufficient_delta_v",
            FailureReason::StructuralLimitExceeded => "structural_limit_exceeded",
            FailureReason::UnsafeParkingOrbit => "unsafe_parking_orbit",
            FailureReason::Timeout => "timeout",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Abort signal raised by the external fault model for the current step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Fault {
    DynamicPressure { q: f64, limit: f64 }, // Pa
}

// ---------------------------------------------------------------------------
// Events emitted by the phase controller
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MissionEvent {
    PhaseChanged { time: f64, from: MissionPhase, to: MissionPhase },
    StageSeparated { time: f64, stage: usize },
    BurnStarted { time: f64, phase: MissionPhase, planned_delta_v: f64, estimated_duration: f64 },
    BurnCutoff { time: f64, phase: MissionPhase, cutoff: BurnCutoff, delta_v: f64 },
    Aborted { time: f64, reason: FailureReason },
    MissionSuccess { time: f64 },
}

impl MissionEvent {
    pub fn time(&self) -> f64 {
        match *self {
            MissionEvent::PhaseChanged { time, .. }
            | MissionEvent::StageSeparated { time, .. }
            | MissionEvent::BurnStarted { time, .. }
            | MissionEvent::BurnCutoff { time, .. }
            | MissionEvent::Aborted { time, .. }
            | MissionEvent::MissionSuccess { time } => time,
        }
    }

    /// One-line description for printed flight logs.
    pub fn describe(&self) -> String {
        match self {
            MissionEvent::PhaseChanged { from, to, .. } => format!("{} -> {}", from, to),
            MissionEvent::StageSeparated { stage, .. } => format!("Stage separation, stage {} active", stage + 1),
            MissionEvent::BurnStarted { phase, planned_delta_v, .. } => {
                format!("{} ignition, planned {:.1} m/s", phase, planned_delta_v)
            }
            MissionEvent::BurnCutoff { phase, cutoff, delta_v, .. } => {
                format!("{} cutoff ({}), {:.1} m/s", phase, cutoff, delta_v)
            }
            MissionEvent::Aborted { reason, .. } => format!("Abort: {}", reason),
            MissionEvent::MissionSuccess { .. } => "Mission success".to_string(),
        }
    }
}
