//! Wavefield state bundles.
//!
//! One `Wavefield` per propagating wavefield: pressure and particle
//! velocities on the extended mesh, spatial-derivative scratch, and the
//! recursive C-PML memory variables. Everything is allocated once and
//! zero-reset between supersources.

use ndarray::Array2;

/// Field bundle for one propagating wavefield.
///
/// `p` lives at integer nodes and integer times, `vx` at `(iz, ix+1/2)`
/// and `vz` at `(iz+1/2, ix)`, both at half-integer times.
#[derive(Debug, Clone)]
pub struct Wavefield {
    /// Pressure at the current integer time step
    pub p: Array2<f64>,
    /// Pressure at the previous integer time step
    pub pprev: Array2<f64>,
    /// Horizontal particle velocity at the current half step
    pub vx: Array2<f64>,
    /// Vertical particle velocity at the current half step
    pub vz: Array2<f64>,
    /// Scratch: ∂p/∂x at vx nodes
    pub dpdx: Array2<f64>,
    /// Scratch: ∂p/∂z at vz nodes
    pub dpdz: Array2<f64>,
    /// Scratch: ∂vx/∂x at p nodes
    pub dvxdx: Array2<f64>,
    /// Scratch: ∂vz/∂z at p nodes
    pub dvzdz: Array2<f64>,
    /// C-PML memory for ∂p/∂x
    pub m_dpdx: Array2<f64>,
    /// C-PML memory for ∂p/∂z
    pub m_dpdz: Array2<f64>,
    /// C-PML memory for ∂vx/∂x
    pub m_dvxdx: Array2<f64>,
    /// C-PML memory for ∂vz/∂z
    pub m_dvzdz: Array2<f64>,
}

impl Wavefield {
    /// Allocate a zeroed wavefield on an `nz` by `nx` extended mesh
    pub fn new(nz: usize, nx: usize) -> Self {
        let zeros = || Array2::<f64>::zeros((nz, nx));
        Self {
            p: zeros(),
            pprev: zeros(),
            vx: zeros(),
            vz: zeros(),
            dpdx: zeros(),
            dpdz: zeros(),
            dvxdx: zeros(),
            dvzdz: zeros(),
            m_dpdx: zeros(),
            m_dpdz: zeros(),
            m_dvxdx: zeros(),
            m_dvzdz: zeros(),
        }
    }

    /// Zero all state ahead of the next supersource
    pub fn reset(&mut self) {
        self.p.fill(0.0);
        self.pprev.fill(0.0);
        self.vx.fill(0.0);
        self.vz.fill(0.0);
        self.dpdx.fill(0.0);
        self.dpdz.fill(0.0);
        self.dvxdx.fill(0.0);
        self.dvzdz.fill(0.0);
        self.m_dpdx.fill(0.0);
        self.m_dpdz.fill(0.0);
        self.m_dvxdx.fill(0.0);
        self.m_dvzdz.fill(0.0);
    }

    /// Whether every propagating field value is finite
    pub fn is_finite(&self) -> bool {
        self.p.iter().all(|v| v.is_finite())
            && self.vx.iter().all(|v| v.is_finite())
            && self.vz.iter().all(|v| v.is_finite())
    }
}

/// Sum of squared pressure over a field, used as an energy proxy by tests
/// and the demo binary.
pub fn field_energy(p: &Array2<f64>) -> f64 {
    p.iter().map(|v| v * v).sum()
}
