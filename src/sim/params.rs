//! Simulation parameters and the immutable per-experiment bundle shared by
//! all workers.

use ndarray::Array2;

use crate::acquisition::coupling::SprayWeights;
use crate::acquisition::{RecvField, SourceFlag};
use crate::engine::cpml::{CpmlAxis, CpmlOptions};
use crate::engine::grid::{ExtendedGrid, TimeGrid};
use crate::model::{MediumMaps, Perturbation};
use crate::sim::boundary::BoundaryStore;

/// Modeling variant.
#[derive(Debug, Clone)]
pub enum ModelKind {
    /// Plain acoustic propagation
    Acoustic,
    /// Linearized (Born) modeling about the background medium
    AcousticBorn(Perturbation),
    /// Viscoacoustic propagation; awaiting a separate specification pass
    AcousticVisco,
}

/// Which faces of the physical domain absorb.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbsFaces {
    /// Top face
    pub zmin: bool,
    /// Bottom face
    pub zmax: bool,
    /// Left face
    pub xmin: bool,
    /// Right face
    pub xmax: bool,
}

impl Default for AbsFaces {
    fn default() -> Self {
        Self {
            zmin: true,
            zmax: true,
            xmin: true,
            xmax: true,
        }
    }
}

impl AbsFaces {
    /// All faces reflective
    pub fn none() -> Self {
        Self {
            zmin: false,
            zmax: false,
            xmin: false,
            xmax: false,
        }
    }

    /// Free surface on top, absorbing elsewhere
    pub fn free_surface() -> Self {
        Self {
            zmin: false,
            zmax: true,
            xmin: true,
            xmax: true,
        }
    }
}

/// Options steering a simulation.
#[derive(Debug, Clone)]
pub struct SimulationParams {
    /// Modeling variant
    pub kind: ModelKind,
    /// Number of propagating wavefields (1 or 2)
    pub npw: usize,
    /// Source injection flag per wavefield
    pub sflags: Vec<SourceFlag>,
    /// Recording enable per wavefield
    pub rflags: Vec<bool>,
    /// Which receiver fields to record
    pub rfields: Vec<RecvField>,
    /// Absorbing faces
    pub abs_faces: AbsFaces,
    /// `+1` saves the boundary halo, `-1` replays it, `0` disables both
    pub backprop_flag: i32,
    /// Saved halo stores consumed by a replay run, one per supersource;
    /// taken from the `checkpoints` of a previous `backprop_flag = +1` run
    pub checkpoints: Vec<BoundaryStore>,
    /// Accumulate the medium-parameter gradient (needs `npw = 2`)
    pub gmodel_flag: bool,
    /// Accumulate the illumination map
    pub illum_flag: bool,
    /// Record full-domain pressure snapshots
    pub snaps_flag: bool,
    /// Times at which snapshots are taken
    pub tsnaps: Vec<f64>,
    /// Peak source frequency, tunes the PML profiles
    pub fpeak: f64,
    /// Upper band edge used by the dispersion check; `2 * fpeak` if absent
    pub fmax: Option<f64>,
    /// Pad thickness per side in cells
    pub npml: usize,
    /// C-PML profile tuning
    pub cpml: CpmlOptions,
    /// Report per-supersource progress
    pub verbose: bool,
    /// Worker count; all available threads if absent
    pub nworker: Option<usize>,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            kind: ModelKind::Acoustic,
            npw: 1,
            sflags: vec![SourceFlag::Pressure],
            rflags: vec![true],
            rfields: vec![RecvField::P],
            abs_faces: AbsFaces::default(),
            backprop_flag: 0,
            checkpoints: Vec::new(),
            gmodel_flag: false,
            illum_flag: false,
            snaps_flag: false,
            tsnaps: Vec::new(),
            fpeak: 10.0,
            fmax: None,
            npml: 50,
            cpml: CpmlOptions::default(),
            verbose: false,
            nworker: None,
        }
    }
}

/// Born perturbation maps on the extended mesh, staggered where the
/// scattered sources enter the scheme.
#[derive(Debug, Clone)]
pub struct BornMaps {
    /// Bulk-modulus-inverse perturbation at pressure nodes
    pub d_kap_inv: Array2<f64>,
    /// Density-inverse perturbation at vx nodes
    pub d_rho_inv_vx: Array2<f64>,
    /// Density-inverse perturbation at vz nodes
    pub d_rho_inv_vz: Array2<f64>,
}

/// Precomputed coupling of one wavefield of one supersource.
#[derive(Debug, Clone)]
pub struct WavefieldCoupling {
    /// Spray weights of each source at pressure nodes
    pub src: Vec<SprayWeights>,
    /// Wavelets zero-padded to the time grid, `(nt, ns)`
    pub wav: Array2<f64>,
    /// Time-integrated wavelets for injection-rate sources
    pub wav_int: Array2<f64>,
    /// Receiver interpolation weights at pressure nodes
    pub recv_p: Vec<SprayWeights>,
    /// Receiver interpolation weights at vx nodes
    pub recv_vx: Vec<SprayWeights>,
    /// Receiver interpolation weights at vz nodes
    pub recv_vz: Vec<SprayWeights>,
}

/// Coupling of all wavefields of one supersource.
#[derive(Debug, Clone)]
pub struct SupersourceParams {
    /// Indexed by propagating wavefield
    pub wavefields: Vec<WavefieldCoupling>,
}

/// Immutable bundle built once per experiment and shared read-only by all
/// workers.
#[derive(Debug, Clone)]
pub struct CommonParams {
    /// Time grid
    pub tgrid: TimeGrid,
    /// Extended mesh
    pub egrid: ExtendedGrid,
    /// Material maps
    pub maps: MediumMaps,
    /// C-PML profile along z
    pub pml_z: CpmlAxis,
    /// C-PML profile along x
    pub pml_x: CpmlAxis,
    /// Modeling variant tag (perturbation lifted into `born`)
    pub born: Option<BornMaps>,
    /// Number of propagating wavefields
    pub npw: usize,
    /// Source flag per wavefield
    pub sflags: Vec<SourceFlag>,
    /// Recording enable per wavefield
    pub rflags: Vec<bool>,
    /// Recorded receiver fields
    pub rfields: Vec<RecvField>,
    /// Boundary save/replay switch
    pub backprop_flag: i32,
    /// Halo stores replayed by a `backprop_flag = -1` run, one per
    /// supersource
    pub replay: Vec<BoundaryStore>,
    /// Gradient accumulation switch
    pub gmodel_flag: bool,
    /// Illumination accumulation switch
    pub illum_flag: bool,
    /// Snapshot switch
    pub snaps_flag: bool,
    /// Snapshot sample indices
    pub itsnaps: Vec<usize>,
    /// Progress reporting
    pub verbose: bool,
    /// Worker count override
    pub nworker: Option<usize>,
    /// Per-supersource precomputed coupling
    pub supersources: Vec<SupersourceParams>,
}

impl CommonParams {
    /// Number of supersources
    pub fn nss(&self) -> usize {
        self.supersources.len()
    }
}
