pub mod circularization;
pub mod controller;
pub mod guidance;
pub mod limiter;
pub mod phase;
pub mod phase_controller;

pub use circularization::{BurnCutoff, BurnPlan, BurnProgress, CircularizationPlanner};
pub use controller::{Controller, StageSequencer, StepOutput, TerminalReport, VehicleStageState};
pub use guidance::{GuidanceEngine, GuidanceInput, PitchSchedule};
pub use limiter::PitchRateLimiter;
pub use phase::{FailureReason, Fault, MissionEvent, MissionPhase};
pub use phase_controller::MissionPhaseController;
