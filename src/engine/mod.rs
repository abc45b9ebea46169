//! Engine module containing grids, C-PML profiles, wavefield state and
//! staggered-grid derivative stencils

pub mod cpml;
pub mod fields;
pub mod grid;
pub mod stencil;

pub use cpml::{CpmlAxis, CpmlOptions};
pub use fields::{field_energy, Wavefield};
pub use grid::{ExtendedGrid, SpatialGrid, TimeGrid, HALO};
