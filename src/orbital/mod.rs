pub mod elements;
pub mod estimator;
pub mod maneuvers;
pub mod propagator;

pub use elements::{KeplerianElements, StateVector};
pub use estimator::{compute_elements, OrbitError, OrbitalElements, OrbitalStateEstimator};
pub use maneuvers::{circular_velocity, hohmann, injection_delta_v, vis_viva_speed, HohmannTransfer};
pub use propagator::propagate_orbit;
