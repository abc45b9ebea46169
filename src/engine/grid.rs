//! Uniform time/space grids and the PML-extended computational mesh.

use crate::error::{SeisError, SeisResult};

/// Thickness of the boundary halo recorded for time reversal:
/// the 4th-order stencil radius (2) plus one guard cell.
pub const HALO: usize = 3;

/// Uniform time grid with `nt` samples spaced by `dt`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeGrid {
    /// Number of time samples
    pub nt: usize,
    /// Time step in seconds
    pub dt: f64,
}

impl TimeGrid {
    /// Create a new time grid
    pub fn new(nt: usize, dt: f64) -> SeisResult<Self> {
        if nt < 2 {
            return Err(SeisError::Config(format!(
                "time grid needs at least 2 samples, got {nt}"
            )));
        }
        if !(dt.is_finite() && dt > 0.0) {
            return Err(SeisError::Config(format!("invalid time step {dt}")));
        }
        Ok(Self { nt, dt })
    }

    /// Total span of the grid in seconds
    pub fn span(&self) -> f64 {
        (self.nt - 1) as f64 * self.dt
    }

    /// Sample times
    pub fn times(&self) -> Vec<f64> {
        (0..self.nt).map(|it| it as f64 * self.dt).collect()
    }

    /// Index of the sample closest to time `t`
    pub fn nearest(&self, t: f64) -> usize {
        let it = (t / self.dt).round();
        (it.max(0.0) as usize).min(self.nt - 1)
    }
}

/// Physical (unpadded) spatial mesh. The z axis is vertical and indexed
/// first; both axes are uniformly spaced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialGrid {
    /// Number of cells along z
    pub nzd: usize,
    /// Number of cells along x
    pub nxd: usize,
    /// Grid step along z in meters
    pub dz: f64,
    /// Grid step along x in meters
    pub dx: f64,
    /// Coordinate of the first z node
    pub z0: f64,
    /// Coordinate of the first x node
    pub x0: f64,
}

impl SpatialGrid {
    /// Create a new physical mesh
    pub fn new(nzd: usize, nxd: usize, dz: f64, dx: f64, z0: f64, x0: f64) -> SeisResult<Self> {
        if nzd < 4 || nxd < 4 {
            return Err(SeisError::Config(format!(
                "physical mesh too small: {nzd}x{nxd}"
            )));
        }
        if !(dz.is_finite() && dz > 0.0 && dx.is_finite() && dx > 0.0) {
            return Err(SeisError::Config(format!("invalid grid steps dz={dz} dx={dx}")));
        }
        Ok(Self { nzd, nxd, dz, dx, z0, x0 })
    }

    /// Coordinate of the last z node
    pub fn zmax(&self) -> f64 {
        self.z0 + (self.nzd - 1) as f64 * self.dz
    }

    /// Coordinate of the last x node
    pub fn xmax(&self) -> f64 {
        self.x0 + (self.nxd - 1) as f64 * self.dx
    }

    /// Whether a point lies on the physical mesh (inclusive)
    pub fn contains(&self, z: f64, x: f64) -> bool {
        let eps_z = 1e-9 * self.dz;
        let eps_x = 1e-9 * self.dx;
        z >= self.z0 - eps_z
            && z <= self.zmax() + eps_z
            && x >= self.x0 - eps_x
            && x <= self.xmax() + eps_x
    }
}

/// The physical mesh padded by `npml` absorbing cells on every side.
///
/// Pressure nodes of the physical mesh occupy extended rows
/// `npml..npml+nzd` and columns `npml..npml+nxd`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtendedGrid {
    /// The embedded physical mesh
    pub phys: SpatialGrid,
    /// Pad thickness per side in cells
    pub npml: usize,
    /// Total rows of the extended mesh
    pub nz: usize,
    /// Total columns of the extended mesh
    pub nx: usize,
}

impl ExtendedGrid {
    /// Pad a physical mesh by `npml` cells per side
    pub fn new(phys: SpatialGrid, npml: usize) -> SeisResult<Self> {
        // HALO inert cells plus at least two damped cells per pad
        if npml < HALO + 2 {
            return Err(SeisError::Config(format!(
                "npml must be at least {}, got {npml}",
                HALO + 2
            )));
        }
        Ok(Self {
            phys,
            npml,
            nz: phys.nzd + 2 * npml,
            nx: phys.nxd + 2 * npml,
        })
    }

    /// First extended row/column of the physical mesh
    pub fn first(&self) -> usize {
        self.npml
    }

    /// One past the last extended row of the physical mesh
    pub fn z_end(&self) -> usize {
        self.npml + self.phys.nzd
    }

    /// One past the last extended column of the physical mesh
    pub fn x_end(&self) -> usize {
        self.npml + self.phys.nxd
    }

    /// Origin of the boundary halo strips (extends HALO cells into the pad)
    pub fn ib0(&self) -> usize {
        self.npml - HALO
    }

    /// Continuous extended row coordinate of a physical depth `z`
    pub fn gz(&self, z: f64) -> f64 {
        (z - self.phys.z0) / self.phys.dz + self.npml as f64
    }

    /// Continuous extended column coordinate of a physical offset `x`
    pub fn gx(&self, x: f64) -> f64 {
        (x - self.phys.x0) / self.phys.dx + self.npml as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_time_grid() {
        let tgrid = TimeGrid::new(101, 1e-3).unwrap();
        assert_abs_diff_eq!(tgrid.span(), 0.1, epsilon = 1e-12);
        assert_eq!(tgrid.nearest(0.05), 50);
        assert_eq!(tgrid.nearest(1.0), 100);
        assert!(TimeGrid::new(1, 1e-3).is_err());
        assert!(TimeGrid::new(10, -1e-3).is_err());
    }

    #[test]
    fn test_spatial_grid_contains() {
        let grid = SpatialGrid::new(50, 60, 10.0, 10.0, 0.0, 0.0).unwrap();
        assert_abs_diff_eq!(grid.zmax(), 490.0);
        assert!(grid.contains(0.0, 0.0));
        assert!(grid.contains(490.0, 590.0));
        assert!(!grid.contains(-5.0, 0.0));
        assert!(!grid.contains(0.0, 600.0));
    }

    #[test]
    fn test_extended_grid_indexing() {
        let phys = SpatialGrid::new(50, 60, 10.0, 5.0, 0.0, 0.0).unwrap();
        let egrid = ExtendedGrid::new(phys, 20).unwrap();
        assert_eq!(egrid.nz, 90);
        assert_eq!(egrid.nx, 100);
        assert_eq!(egrid.first(), 20);
        assert_eq!(egrid.z_end(), 70);
        assert_eq!(egrid.ib0(), 17);
        assert_abs_diff_eq!(egrid.gz(0.0), 20.0);
        assert_abs_diff_eq!(egrid.gx(5.0), 21.0);
    }

    #[test]
    fn test_extended_grid_rejects_thin_pad() {
        let phys = SpatialGrid::new(50, 60, 10.0, 5.0, 0.0, 0.0).unwrap();
        assert!(ExtendedGrid::new(phys, 3).is_err());
    }
}
