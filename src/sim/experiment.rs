//! Experiment handle: build-time validation and precomputation, the
//! supersource scheduler, and output extraction.

use ndarray::{Array1, Array2};
use rayon::prelude::*;
use std::time::Instant;
use tracing::{debug, info};

use crate::acquisition::coupling::{SprayWeights, Stagger};
use crate::acquisition::{Ageom, SourceWavelets};
use crate::engine::cpml::CpmlAxis;
use crate::engine::grid::{ExtendedGrid, TimeGrid};
use crate::error::{SeisError, SeisResult};
use crate::model::stability::check_stability;
use crate::model::{arithmetic_mean_x, arithmetic_mean_z, embed, Medium, MediumMaps};
use crate::sim::boundary::BoundaryStore;
use crate::sim::params::{
    BornMaps, CommonParams, ModelKind, SimulationParams, SupersourceParams, WavefieldCoupling,
};
use crate::sim::stepper::RecordSet;
use crate::sim::worker::run_group;

/// A fully validated experiment and, after [`Simulation::run`], its
/// outputs.
#[derive(Debug)]
pub struct Simulation {
    /// The immutable parameter bundle shared by all workers
    pub cmn: CommonParams,
    /// Receiver records per supersource
    pub records: Vec<RecordSet>,
    /// Pressure snapshots per supersource at the requested times
    pub snaps: Vec<Vec<Array2<f64>>>,
    /// Illumination map on the physical mesh
    pub illum: Option<Array2<f64>>,
    /// Packed gradient, bulk modulus inverse then density inverse
    pub gradient: Option<Array1<f64>>,
    /// Opaque halo checkpoints per supersource when saving was requested
    pub checkpoints: Vec<Option<BoundaryStore>>,
}

impl Simulation {
    /// Validate the experiment description and precompute everything the
    /// workers share. All configuration and stability errors surface here.
    pub fn new(
        medium: &Medium,
        tgrid: TimeGrid,
        ageom: &Ageom,
        srcwav: &SourceWavelets,
        params: SimulationParams,
    ) -> SeisResult<Self> {
        let npw = params.npw;
        if !(npw == 1 || npw == 2) {
            return Err(SeisError::Config(format!(
                "npw must be 1 or 2, got {npw}"
            )));
        }
        if params.sflags.len() != npw || params.rflags.len() != npw {
            return Err(SeisError::Config(format!(
                "sflags/rflags must list one entry per wavefield: \
                 got {} and {} for npw={npw}",
                params.sflags.len(),
                params.rflags.len()
            )));
        }
        match &params.kind {
            ModelKind::Acoustic => {}
            ModelKind::AcousticBorn(_) if npw != 2 => {
                return Err(SeisError::Config(
                    "Born modeling needs npw = 2 (background and scattered wavefields)".into(),
                ));
            }
            ModelKind::AcousticBorn(_) if params.gmodel_flag => {
                return Err(SeisError::Config(
                    "Born sources are not injected during an adjoint run; \
                     disable gmodel_flag or use plain acoustic modeling"
                        .into(),
                ));
            }
            ModelKind::AcousticBorn(_) => {}
            ModelKind::AcousticVisco => {
                return Err(SeisError::Config(
                    "viscoacoustic modeling is a stub awaiting its own \
                     specification pass"
                        .into(),
                ));
            }
        }
        if params.gmodel_flag && npw != 2 {
            return Err(SeisError::Config(
                "gradient mode needs npw = 2 (forward and adjoint wavefields)".into(),
            ));
        }
        if !matches!(params.backprop_flag, -1 | 0 | 1) {
            return Err(SeisError::Config(format!(
                "backprop_flag must be -1, 0 or +1, got {}",
                params.backprop_flag
            )));
        }
        if params.backprop_flag == -1 {
            if params.gmodel_flag {
                return Err(SeisError::Config(
                    "gradient runs manage the halo store internally; use \
                     backprop_flag 0 or +1"
                        .into(),
                ));
            }
            if npw != 1 {
                return Err(SeisError::Config(
                    "boundary replay reconstructs a single wavefield; set npw = 1"
                        .into(),
                ));
            }
        } else if !params.checkpoints.is_empty() {
            return Err(SeisError::Config(
                "checkpoints are only consumed by a replay run (backprop_flag = -1)"
                    .into(),
            ));
        }

        ageom.validate(&medium.grid, npw)?;
        srcwav.validate(ageom, &tgrid)?;

        let (vpmin, vpmax) = medium.vp_bounds();
        let fmax = params.fmax.unwrap_or(2.0 * params.fpeak);
        check_stability(
            vpmin,
            vpmax,
            medium.grid.dz,
            medium.grid.dx,
            tgrid.dt,
            fmax,
        )?;

        let egrid = ExtendedGrid::new(medium.grid, params.npml)?;
        if params.backprop_flag == -1 {
            if params.checkpoints.len() != ageom.nss() {
                return Err(SeisError::Config(format!(
                    "replay needs one saved checkpoint per supersource: \
                     got {} for {}",
                    params.checkpoints.len(),
                    ageom.nss()
                )));
            }
            for (iss, store) in params.checkpoints.iter().enumerate() {
                if store.nt() != tgrid.nt || !store.compatible(&egrid) {
                    return Err(SeisError::Config(format!(
                        "checkpoint {iss} was recorded on a different mesh or \
                         time grid than this experiment"
                    )));
                }
            }
        }
        let maps = MediumMaps::new(medium, &egrid);
        let pml_z = CpmlAxis::build(
            egrid.nz,
            params.npml,
            medium.grid.dz,
            tgrid.dt,
            vpmax,
            params.fpeak,
            params.abs_faces.zmin,
            params.abs_faces.zmax,
            params.cpml,
        );
        let pml_x = CpmlAxis::build(
            egrid.nx,
            params.npml,
            medium.grid.dx,
            tgrid.dt,
            vpmax,
            params.fpeak,
            params.abs_faces.xmin,
            params.abs_faces.xmax,
            params.cpml,
        );

        let born = match &params.kind {
            ModelKind::AcousticBorn(pert) => {
                let shape = (medium.grid.nzd, medium.grid.nxd);
                if pert.d_kap_inv.dim() != shape || pert.d_rho_inv.dim() != shape {
                    return Err(SeisError::Config(format!(
                        "perturbation fields must match the {}x{} physical mesh",
                        shape.0, shape.1
                    )));
                }
                let d_rho_inv = embed(&pert.d_rho_inv, &egrid);
                Some(BornMaps {
                    d_kap_inv: embed(&pert.d_kap_inv, &egrid),
                    d_rho_inv_vx: arithmetic_mean_x(&d_rho_inv),
                    d_rho_inv_vz: arithmetic_mean_z(&d_rho_inv),
                })
            }
            _ => None,
        };

        let mut supersources = Vec::with_capacity(ageom.nss());
        for iss in 0..ageom.nss() {
            let mut wavefields = Vec::with_capacity(npw);
            for ipw in 0..npw {
                let ss = &ageom.geoms[ipw][iss];
                let mut src = Vec::with_capacity(ss.ns());
                for (&z, &x) in ss.sz.iter().zip(&ss.sx) {
                    src.push(SprayWeights::bilinear(z, x, &egrid, Stagger::P)?);
                }
                let mut recv_p = Vec::with_capacity(ss.nr());
                let mut recv_vx = Vec::with_capacity(ss.nr());
                let mut recv_vz = Vec::with_capacity(ss.nr());
                for (&z, &x) in ss.rz.iter().zip(&ss.rx) {
                    recv_p.push(SprayWeights::bilinear(z, x, &egrid, Stagger::P)?);
                    recv_vx.push(SprayWeights::bilinear(z, x, &egrid, Stagger::Vx)?);
                    recv_vz.push(SprayWeights::bilinear(z, x, &egrid, Stagger::Vz)?);
                }

                let raw = &srcwav.data[ipw][iss];
                let (nt_w, ns) = raw.dim();
                let mut wav = Array2::zeros((tgrid.nt, ns));
                for it in 0..nt_w {
                    for is in 0..ns {
                        wav[[it, is]] = raw[[it, is]];
                    }
                }
                let mut wav_int = Array2::zeros((tgrid.nt, ns));
                for is in 0..ns {
                    let mut acc = 0.0;
                    for it in 0..tgrid.nt {
                        acc += wav[[it, is]] * tgrid.dt;
                        wav_int[[it, is]] = acc;
                    }
                }

                wavefields.push(WavefieldCoupling {
                    src,
                    wav,
                    wav_int,
                    recv_p,
                    recv_vx,
                    recv_vz,
                });
            }

            // all recording wavefields of a supersource must agree on nr
            let recording: Vec<usize> = (0..npw)
                .filter(|&ipw| params.rflags[ipw])
                .map(|ipw| wavefields[ipw].recv_p.len())
                .collect();
            if recording.windows(2).any(|w| w[0] != w[1]) {
                return Err(SeisError::Config(format!(
                    "supersource {iss}: recording wavefields disagree on \
                     receiver count {recording:?}"
                )));
            }

            supersources.push(SupersourceParams { wavefields });
        }

        let span = tgrid.span();
        let mut itsnaps = Vec::with_capacity(params.tsnaps.len());
        for &t in &params.tsnaps {
            if !(0.0..=span).contains(&t) {
                return Err(SeisError::Config(format!(
                    "snapshot time {t} outside the [0, {span}] time grid"
                )));
            }
            itsnaps.push(tgrid.nearest(t));
        }

        let cmn = CommonParams {
            tgrid,
            egrid,
            maps,
            pml_z,
            pml_x,
            born,
            npw,
            sflags: params.sflags,
            rflags: params.rflags,
            rfields: params.rfields,
            backprop_flag: params.backprop_flag,
            replay: params.checkpoints,
            gmodel_flag: params.gmodel_flag,
            illum_flag: params.illum_flag,
            snaps_flag: params.snaps_flag,
            itsnaps,
            verbose: params.verbose,
            nworker: params.nworker,
            supersources,
        };

        debug!(
            nz = cmn.egrid.nz,
            nx = cmn.egrid.nx,
            nt = cmn.tgrid.nt,
            nss = cmn.nss(),
            "experiment built"
        );

        Ok(Self {
            cmn,
            records: Vec::new(),
            snaps: Vec::new(),
            illum: None,
            gradient: None,
            checkpoints: Vec::new(),
        })
    }

    /// Run every supersource and populate the outputs. Supersources are
    /// split into contiguous groups, one rayon task each; group results
    /// merge at a single join.
    pub fn run(&mut self) -> SeisResult<()> {
        let nss = self.cmn.nss();
        let nworker = self
            .cmn
            .nworker
            .unwrap_or_else(rayon::current_num_threads)
            .clamp(1, nss);
        if self.cmn.verbose {
            info!(nss, nworker, "running supersources");
        }
        let start = Instant::now();

        let base = nss / nworker;
        let rem = nss % nworker;
        let mut ranges = Vec::with_capacity(nworker);
        let mut lo = 0;
        for k in 0..nworker {
            let len = base + usize::from(k < rem);
            ranges.push(lo..lo + len);
            lo += len;
        }

        let groups: Vec<_> = ranges
            .into_par_iter()
            .map(|range| run_group(&self.cmn, range))
            .collect::<SeisResult<Vec<_>>>()?;

        self.records = Vec::with_capacity(nss);
        self.snaps = Vec::with_capacity(nss);
        self.checkpoints = Vec::with_capacity(nss);
        self.illum = None;
        let mut grad: Option<crate::sim::gradient::GradAccumulator> = None;

        for group in groups {
            for out in group.outputs {
                self.records.push(out.records);
                self.snaps.push(out.snaps);
                self.checkpoints.push(out.boundary);
            }
            if let Some(gi) = group.illum {
                match self.illum.as_mut() {
                    Some(total) => *total += &gi,
                    None => self.illum = Some(gi),
                }
            }
            if let Some(gg) = group.grad {
                match grad.as_mut() {
                    Some(total) => total.merge(&gg),
                    None => grad = Some(gg),
                }
            }
        }
        self.gradient = grad.map(|g| g.finalize(&self.cmn.egrid));

        if self.cmn.verbose {
            info!(elapsed = ?start.elapsed(), "simulation finished");
        }
        Ok(())
    }
}

/// Build and run in one call.
pub fn simulate(
    medium: &Medium,
    tgrid: TimeGrid,
    ageom: &Ageom,
    srcwav: &SourceWavelets,
    params: SimulationParams,
) -> SeisResult<Simulation> {
    let mut sim = Simulation::new(medium, tgrid, ageom, srcwav, params)?;
    sim.run()?;
    Ok(sim)
}
