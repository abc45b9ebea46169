//! Simulation driver: parameters, the FDTD stepper, the boundary store,
//! gradient accumulation and the supersource scheduler.

pub mod boundary;
pub mod experiment;
pub mod gradient;
pub mod params;
pub mod stepper;
pub mod worker;

pub use boundary::BoundaryStore;
pub use experiment::{simulate, Simulation};
pub use params::{AbsFaces, ModelKind, SimulationParams};
pub use stepper::RecordSet;
