pub mod config;
pub mod physics;
pub mod dynamics;
pub mod vehicle;
mod gnc_mod;
pub mod sim;
pub mod io;
pub mod orbital;

// The gnc module: expose gnc_mod as `gnc` publicly
pub mod gnc {
    pub use crate::gnc_mod::*;
}

// Flat re-exports of the types most callers need
pub mod types {
    pub use crate::config::{CentralBody, Configuration, LaunchSite};
    pub use crate::dynamics::state::{GncCommand, SimConfig, State, G0};
    pub use crate::orbital::{OrbitalElements, StateVector};
    pub use crate::vehicle::mission::Mission;
    pub use crate::vehicle::stage::Stage;
}
