pub mod atmosphere;
pub mod gravity;
pub mod aerodynamics;

pub use atmosphere::{isa, Atmo};
pub use gravity::{gravity_accel, MU_EARTH, R_EARTH_ECI};
