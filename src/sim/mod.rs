pub mod batch;
pub mod event;
pub mod integrator;
pub mod runner;

pub use batch::{run_batch, BatchSummary, Dispersion};
pub use integrator::rk4_step;
pub use runner::{phase_history, simulate, simulate_with, Flight, SimOutcome};
