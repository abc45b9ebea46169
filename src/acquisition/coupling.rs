//! Bilinear spray/interpolation weights tying point sources and receivers
//! to the staggered grid.

use crate::engine::grid::ExtendedGrid;
use crate::error::{SeisError, SeisResult};

/// Staggered position a point couples to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stagger {
    /// Pressure nodes `(iz, ix)`
    P,
    /// Horizontal velocity nodes `(iz, ix+1/2)`
    Vx,
    /// Vertical velocity nodes `(iz+1/2, ix)`
    Vz,
}

/// Enclosing-cell index and the four bilinear weights of one point.
///
/// Weights address nodes `(iz, ix)`, `(iz+1, ix)`, `(iz, ix+1)`,
/// `(iz+1, ix+1)` on the extended mesh and sum to one.
#[derive(Debug, Clone, Copy)]
pub struct SprayWeights {
    /// Row of the upper-left node
    pub iz: usize,
    /// Column of the upper-left node
    pub ix: usize,
    /// Weights in `[w00, w10, w01, w11]` order
    pub w: [f64; 4],
}

impl SprayWeights {
    /// Compute weights for a physical coordinate at the given staggered
    /// position. Fails when the point lies outside the physical mesh.
    pub fn bilinear(z: f64, x: f64, egrid: &ExtendedGrid, stagger: Stagger) -> SeisResult<Self> {
        if !egrid.phys.contains(z, x) {
            return Err(SeisError::Config(format!(
                "point ({z}, {x}) outside the physical mesh"
            )));
        }
        let mut gz = egrid.gz(z);
        let mut gx = egrid.gx(x);
        match stagger {
            Stagger::P => {}
            Stagger::Vx => gx -= 0.5,
            Stagger::Vz => gz -= 0.5,
        }
        let iz = gz.floor() as usize;
        let ix = gx.floor() as usize;
        let fz = gz - iz as f64;
        let fx = gx - ix as f64;
        Ok(Self {
            iz,
            ix,
            w: [
                (1.0 - fz) * (1.0 - fx),
                fz * (1.0 - fx),
                (1.0 - fz) * fx,
                fz * fx,
            ],
        })
    }

    /// The four `(iz, ix, weight)` taps
    pub fn taps(&self) -> [(usize, usize, f64); 4] {
        [
            (self.iz, self.ix, self.w[0]),
            (self.iz + 1, self.ix, self.w[1]),
            (self.iz, self.ix + 1, self.w[2]),
            (self.iz + 1, self.ix + 1, self.w[3]),
        ]
    }

    /// Interpolate a field at the point
    pub fn interpolate(&self, field: &ndarray::Array2<f64>) -> f64 {
        self.taps()
            .iter()
            .map(|&(iz, ix, w)| w * field[[iz, ix]])
            .sum()
    }
}
