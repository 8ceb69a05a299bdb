pub mod stage;
pub mod mission;

pub use stage::{Stage, StageBuilder};
pub use mission::{Mission, MissionBuilder, presets};
