//! SeisMod - A Rust library for 2D acoustic seismic forward modeling
//!
//! This library propagates pressure and particle-velocity wavefields on a
//! staggered grid with an explicit 4th-order FDTD scheme and C-PML
//! absorbing boundaries, records synthetic seismograms for arbitrary
//! acquisition geometries, and computes medium-parameter sensitivity
//! kernels by adjoint-state backpropagation with boundary-halo
//! checkpointing. Supersources run independently across a worker pool.

pub mod acquisition;
pub mod engine;
pub mod error;
pub mod model;
pub mod sim;
pub mod utilities;

// Re-export commonly used types
pub use acquisition::{Ageom, RecvField, SourceFlag, SourceWavelets, Supersource};
pub use engine::grid::{SpatialGrid, TimeGrid};
pub use error::{SeisError, SeisResult};
pub use model::{Medium, Perturbation};
pub use sim::{simulate, AbsFaces, ModelKind, RecordSet, Simulation, SimulationParams};

pub mod prelude {
    //! Common imports for using the SeisMod library
    pub use crate::acquisition::{Ageom, RecvField, SourceFlag, SourceWavelets, Supersource};
    pub use crate::engine::fields::field_energy;
    pub use crate::engine::grid::{SpatialGrid, TimeGrid};
    pub use crate::error::{SeisError, SeisResult};
    pub use crate::model::{Medium, Perturbation};
    pub use crate::sim::{simulate, AbsFaces, ModelKind, RecordSet, Simulation, SimulationParams};
    pub use crate::utilities::{error_after_scaling, ricker};
}
