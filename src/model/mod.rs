//! Subsurface medium description and the on-grid material maps consumed by
//! the stepper.

pub mod stability;

use ndarray::Array2;

use crate::engine::grid::{ExtendedGrid, SpatialGrid};
use crate::error::{SeisError, SeisResult};

/// Acoustic medium on the physical mesh: bulk modulus and density.
#[derive(Debug, Clone)]
pub struct Medium {
    /// The physical mesh
    pub grid: SpatialGrid,
    /// Bulk modulus K at pressure nodes (Pa)
    pub bulk: Array2<f64>,
    /// Density ρ at pressure nodes (kg/m³)
    pub rho: Array2<f64>,
}

impl Medium {
    /// Build a medium from bulk modulus and density fields
    pub fn new(grid: SpatialGrid, bulk: Array2<f64>, rho: Array2<f64>) -> SeisResult<Self> {
        let shape = (grid.nzd, grid.nxd);
        if bulk.dim() != shape || rho.dim() != shape {
            return Err(SeisError::Config(format!(
                "medium fields must be {}x{}, got bulk {:?} rho {:?}",
                grid.nzd,
                grid.nxd,
                bulk.dim(),
                rho.dim()
            )));
        }
        if bulk.iter().any(|v| !(v.is_finite() && *v > 0.0))
            || rho.iter().any(|v| !(v.is_finite() && *v > 0.0))
        {
            return Err(SeisError::Config(
                "medium fields must be finite and positive".into(),
            ));
        }
        Ok(Self { grid, bulk, rho })
    }

    /// Build a medium from P-wave velocity and density fields
    pub fn from_velocity(grid: SpatialGrid, vp: Array2<f64>, rho: Array2<f64>) -> SeisResult<Self> {
        let bulk = &rho * &vp.mapv(|v| v * v);
        Self::new(grid, bulk, rho)
    }

    /// Uniform medium, mostly useful for tests and demos
    pub fn homogeneous(grid: SpatialGrid, vp: f64, rho: f64) -> SeisResult<Self> {
        let shape = (grid.nzd, grid.nxd);
        Self::from_velocity(
            grid,
            Array2::from_elem(shape, vp),
            Array2::from_elem(shape, rho),
        )
    }

    /// Minimum and maximum P-wave velocity
    pub fn vp_bounds(&self) -> (f64, f64) {
        let mut vmin = f64::INFINITY;
        let mut vmax = 0.0_f64;
        for (k, r) in self.bulk.iter().zip(self.rho.iter()) {
            let vp = (k / r).sqrt();
            vmin = vmin.min(vp);
            vmax = vmax.max(vp);
        }
        (vmin, vmax)
    }
}

/// Material maps on the extended mesh, in the layout the stepper reads.
///
/// The pad cells replicate the outermost physical cells. `rho_inv_vx` and
/// `rho_inv_vz` hold the harmonic mean of `rho_inv` at the staggered
/// velocity positions.
#[derive(Debug, Clone)]
pub struct MediumMaps {
    /// Bulk modulus at pressure nodes
    pub kap: Array2<f64>,
    /// Bulk modulus inverse at pressure nodes
    pub kap_inv: Array2<f64>,
    /// Density inverse at pressure nodes
    pub rho_inv: Array2<f64>,
    /// Density inverse at vx nodes
    pub rho_inv_vx: Array2<f64>,
    /// Density inverse at vz nodes
    pub rho_inv_vz: Array2<f64>,
}

impl MediumMaps {
    /// Extend a physical medium onto the padded mesh and precompute the
    /// staggered density maps.
    pub fn new(medium: &Medium, egrid: &ExtendedGrid) -> Self {
        let kap = extend(&medium.bulk, egrid);
        let rho = extend(&medium.rho, egrid);
        let kap_inv = kap.mapv(|v| 1.0 / v);
        let rho_inv = rho.mapv(|v| 1.0 / v);
        let rho_inv_vx = harmonic_mean_x(&rho_inv);
        let rho_inv_vz = harmonic_mean_z(&rho_inv);
        Self {
            kap,
            kap_inv,
            rho_inv,
            rho_inv_vx,
            rho_inv_vz,
        }
    }
}

/// Replicate the outermost physical cells into the pad.
pub fn extend(field: &Array2<f64>, egrid: &ExtendedGrid) -> Array2<f64> {
    let (nzd, nxd) = field.dim();
    let npml = egrid.npml as isize;
    let mut out = Array2::zeros((egrid.nz, egrid.nx));
    for iz in 0..egrid.nz {
        let izd = (iz as isize - npml).clamp(0, nzd as isize - 1) as usize;
        for ix in 0..egrid.nx {
            let ixd = (ix as isize - npml).clamp(0, nxd as isize - 1) as usize;
            out[[iz, ix]] = field[[izd, ixd]];
        }
    }
    out
}

/// Embed a physical-mesh field into the extended mesh, zero in the pad.
pub fn embed(field: &Array2<f64>, egrid: &ExtendedGrid) -> Array2<f64> {
    let (nzd, nxd) = field.dim();
    let npml = egrid.npml;
    let mut out = Array2::zeros((egrid.nz, egrid.nx));
    for izd in 0..nzd {
        for ixd in 0..nxd {
            out[[izd + npml, ixd + npml]] = field[[izd, ixd]];
        }
    }
    out
}

/// Crop an extended-mesh field back to the physical mesh.
pub fn crop(field: &Array2<f64>, egrid: &ExtendedGrid) -> Array2<f64> {
    let npml = egrid.npml;
    let (nzd, nxd) = (egrid.phys.nzd, egrid.phys.nxd);
    let mut out = Array2::zeros((nzd, nxd));
    for izd in 0..nzd {
        for ixd in 0..nxd {
            out[[izd, ixd]] = field[[izd + npml, ixd + npml]];
        }
    }
    out
}

/// Harmonic mean of a nodal field onto `(iz, ix+1/2)` positions.
///
/// The mean of the same two neighbors is produced regardless of traversal
/// order; the last column replicates its nodal value.
pub fn harmonic_mean_x(f: &Array2<f64>) -> Array2<f64> {
    let (nz, nx) = f.dim();
    let mut out = Array2::zeros((nz, nx));
    for iz in 0..nz {
        for ix in 0..nx - 1 {
            let (r0, r1) = (f[[iz, ix]], f[[iz, ix + 1]]);
            out[[iz, ix]] = 2.0 * r0 * r1 / (r0 + r1);
        }
        out[[iz, nx - 1]] = f[[iz, nx - 1]];
    }
    out
}

/// Harmonic mean of a nodal field onto `(iz+1/2, ix)` positions.
pub fn harmonic_mean_z(f: &Array2<f64>) -> Array2<f64> {
    let (nz, nx) = f.dim();
    let mut out = Array2::zeros((nz, nx));
    for iz in 0..nz - 1 {
        for ix in 0..nx {
            let (r0, r1) = (f[[iz, ix]], f[[iz + 1, ix]]);
            out[[iz, ix]] = 2.0 * r0 * r1 / (r0 + r1);
        }
    }
    for ix in 0..nx {
        out[[nz - 1, ix]] = f[[nz - 1, ix]];
    }
    out
}

/// Arithmetic half-sum of a nodal field onto `(iz, ix+1/2)` positions; the
/// last column keeps only its own half. Linear counterpart of the harmonic
/// mean used for perturbations, transpose pair of [`reduce_staggered`].
pub fn arithmetic_mean_x(f: &Array2<f64>) -> Array2<f64> {
    let (nz, nx) = f.dim();
    let mut out = Array2::zeros((nz, nx));
    for iz in 0..nz {
        for ix in 0..nx - 1 {
            out[[iz, ix]] = 0.5 * (f[[iz, ix]] + f[[iz, ix + 1]]);
        }
        out[[iz, nx - 1]] = 0.5 * f[[iz, nx - 1]];
    }
    out
}

/// Arithmetic half-sum of a nodal field onto `(iz+1/2, ix)` positions.
pub fn arithmetic_mean_z(f: &Array2<f64>) -> Array2<f64> {
    let (nz, nx) = f.dim();
    let mut out = Array2::zeros((nz, nx));
    for iz in 0..nz - 1 {
        for ix in 0..nx {
            out[[iz, ix]] = 0.5 * (f[[iz, ix]] + f[[iz + 1, ix]]);
        }
    }
    for ix in 0..nx {
        out[[nz - 1, ix]] = 0.5 * f[[nz - 1, ix]];
    }
    out
}

/// Transpose of the staggered spreading stencil: gradients accumulated at
/// vx/vz positions are pushed back onto pressure nodes.
pub fn reduce_staggered(gvx: &Array2<f64>, gvz: &Array2<f64>) -> Array2<f64> {
    let (nz, nx) = gvx.dim();
    let mut out = Array2::zeros((nz, nx));
    for iz in 0..nz {
        for ix in 0..nx {
            let mut g = 0.5 * gvx[[iz, ix]];
            if ix > 0 {
                g += 0.5 * gvx[[iz, ix - 1]];
            }
            g += 0.5 * gvz[[iz, ix]];
            if iz > 0 {
                g += 0.5 * gvz[[iz - 1, ix]];
            }
            out[[iz, ix]] = g;
        }
    }
    out
}

/// Medium perturbation driving Born linearized modeling, on the physical
/// mesh.
#[derive(Debug, Clone)]
pub struct Perturbation {
    /// Perturbation of the bulk modulus inverse
    pub d_kap_inv: Array2<f64>,
    /// Perturbation of the density inverse
    pub d_rho_inv: Array2<f64>,
}

impl Perturbation {
    /// Validate shapes against a physical mesh
    pub fn new(grid: &SpatialGrid, d_kap_inv: Array2<f64>, d_rho_inv: Array2<f64>) -> SeisResult<Self> {
        let shape = (grid.nzd, grid.nxd);
        if d_kap_inv.dim() != shape || d_rho_inv.dim() != shape {
            return Err(SeisError::Config(format!(
                "perturbation fields must be {}x{}",
                grid.nzd, grid.nxd
            )));
        }
        Ok(Self { d_kap_inv, d_rho_inv })
    }

    /// Zero perturbation
    pub fn zeros(grid: &SpatialGrid) -> Self {
        let shape = (grid.nzd, grid.nxd);
        Self {
            d_kap_inv: Array2::zeros(shape),
            d_rho_inv: Array2::zeros(shape),
        }
    }

    /// Scale both fields by a constant
    pub fn scaled(&self, c: f64) -> Self {
        Self {
            d_kap_inv: self.d_kap_inv.mapv(|v| c * v),
            d_rho_inv: self.d_rho_inv.mapv(|v| c * v),
        }
    }
}
