//! The innermost FDTD machinery: the leapfrog advance, its exact inverse
//! for time-reversed reconstruction, source injection, receiver recording
//! and the Born secondary sources.

use ndarray::Array2;

use crate::acquisition::{RecvField, SourceFlag};
use crate::engine::cpml::CpmlAxis;
use crate::engine::fields::Wavefield;
use crate::engine::stencil;
use crate::model::MediumMaps;
use crate::sim::boundary::BoundaryStore;
use crate::sim::params::{BornMaps, WavefieldCoupling};

/// Records of one supersource, `(nt, nr)` per requested receiver field.
#[derive(Debug, Clone)]
pub struct RecordSet {
    /// Pressure records
    pub p: Option<Array2<f64>>,
    /// Horizontal velocity records
    pub vx: Option<Array2<f64>>,
    /// Vertical velocity records
    pub vz: Option<Array2<f64>>,
}

impl RecordSet {
    /// Allocate zeroed records for the requested fields
    pub fn new(nt: usize, nr: usize, rfields: &[RecvField]) -> Self {
        let make = |f: RecvField| {
            if rfields.contains(&f) {
                Some(Array2::zeros((nt, nr)))
            } else {
                None
            }
        };
        Self {
            p: make(RecvField::P),
            vx: make(RecvField::Vx),
            vz: make(RecvField::Vz),
        }
    }
}

/// One leapfrog step: velocities from the pressure gradient, then pressure
/// from the velocity divergence, with the recursive C-PML corrections.
///
/// The outermost two cells per axis are read-only padding. `pprev` is left
/// holding the pre-update pressure.
pub fn advance(
    w: &mut Wavefield,
    maps: &MediumMaps,
    pml_z: &CpmlAxis,
    pml_x: &CpmlAxis,
    dt: f64,
    dz: f64,
    dx: f64,
) {
    let (nz, nx) = w.p.dim();

    stencil::d_dx_forward(&w.p, &mut w.dpdx, dx);
    stencil::d_dz_forward(&w.p, &mut w.dpdz, dz);

    for iz in 2..nz - 2 {
        for ix in 2..nx - 2 {
            let d = w.dpdx[[iz, ix]];
            let m = pml_x.b_h[ix] * w.m_dpdx[[iz, ix]] + pml_x.a_h[ix] * d;
            w.m_dpdx[[iz, ix]] = m;
            w.vx[[iz, ix]] -=
                dt * maps.rho_inv_vx[[iz, ix]] * (pml_x.k_inv_h[ix] * d + m);

            let d = w.dpdz[[iz, ix]];
            let m = pml_z.b_h[iz] * w.m_dpdz[[iz, ix]] + pml_z.a_h[iz] * d;
            w.m_dpdz[[iz, ix]] = m;
            w.vz[[iz, ix]] -=
                dt * maps.rho_inv_vz[[iz, ix]] * (pml_z.k_inv_h[iz] * d + m);
        }
    }

    stencil::d_dx_backward(&w.vx, &mut w.dvxdx, dx);
    stencil::d_dz_backward(&w.vz, &mut w.dvzdz, dz);

    w.pprev.assign(&w.p);

    for iz in 2..nz - 2 {
        for ix in 2..nx - 2 {
            let dvx = w.dvxdx[[iz, ix]];
            let mx = pml_x.b[ix] * w.m_dvxdx[[iz, ix]] + pml_x.a[ix] * dvx;
            w.m_dvxdx[[iz, ix]] = mx;

            let dvz = w.dvzdz[[iz, ix]];
            let mz = pml_z.b[iz] * w.m_dvzdz[[iz, ix]] + pml_z.a[iz] * dvz;
            w.m_dvzdz[[iz, ix]] = mz;

            let corr = (pml_x.k_inv[ix] * dvx + mx) + (pml_z.k_inv[iz] * dvz + mz);
            w.p[[iz, ix]] -= dt * maps.kap[[iz, ix]] * corr;
        }
    }
}

/// Exact algebraic inverse of [`advance`] for the interior: the pressure
/// update is undone first from the current velocities, then the velocity
/// update from the restored pressure. The recorded halo is forced ahead of
/// each half so PML-corrupted pad values never reach the interior.
///
/// PML memory variables are not updated; inside the physical domain they
/// are identically zero, so the undone increments match the forward ones
/// bit for bit.
pub fn advance_reverse(
    w: &mut Wavefield,
    maps: &MediumMaps,
    pml_z: &CpmlAxis,
    pml_x: &CpmlAxis,
    bnd: &BoundaryStore,
    it: usize,
    dt: f64,
    dz: f64,
    dx: f64,
) {
    let (nz, nx) = w.p.dim();

    bnd.force_velocity(it, &mut w.vx, &mut w.vz);

    stencil::d_dx_backward(&w.vx, &mut w.dvxdx, dx);
    stencil::d_dz_backward(&w.vz, &mut w.dvzdz, dz);

    for iz in 2..nz - 2 {
        for ix in 2..nx - 2 {
            let dvx = w.dvxdx[[iz, ix]];
            let mx = pml_x.b[ix] * w.m_dvxdx[[iz, ix]] + pml_x.a[ix] * dvx;
            let dvz = w.dvzdz[[iz, ix]];
            let mz = pml_z.b[iz] * w.m_dvzdz[[iz, ix]] + pml_z.a[iz] * dvz;
            let corr = (pml_x.k_inv[ix] * dvx + mx) + (pml_z.k_inv[iz] * dvz + mz);
            w.p[[iz, ix]] += dt * maps.kap[[iz, ix]] * corr;
        }
    }

    bnd.force_pressure(it, &mut w.p);

    stencil::d_dx_forward(&w.p, &mut w.dpdx, dx);
    stencil::d_dz_forward(&w.p, &mut w.dpdz, dz);

    for iz in 2..nz - 2 {
        for ix in 2..nx - 2 {
            let d = w.dpdx[[iz, ix]];
            let m = pml_x.b_h[ix] * w.m_dpdx[[iz, ix]] + pml_x.a_h[ix] * d;
            w.vx[[iz, ix]] += dt * maps.rho_inv_vx[[iz, ix]] * (pml_x.k_inv_h[ix] * d + m);

            let d = w.dpdz[[iz, ix]];
            let m = pml_z.b_h[iz] * w.m_dpdz[[iz, ix]] + pml_z.a_h[iz] * d;
            w.vz[[iz, ix]] += dt * maps.rho_inv_vz[[iz, ix]] * (pml_z.k_inv_h[iz] * d + m);
        }
    }
}

/// Spray the wavelet sample of step `counter` onto the four pressure nodes
/// around each source. `sign = -1` removes a previously added sample during
/// reconstruction.
pub fn inject_sources(
    w: &mut Wavefield,
    cpl: &WavefieldCoupling,
    flag: SourceFlag,
    kap: &Array2<f64>,
    dt: f64,
    counter: usize,
    nt: usize,
    sign: f64,
) {
    if flag == SourceFlag::Disabled {
        return;
    }
    for (is, sw) in cpl.src.iter().enumerate() {
        let s = match flag {
            SourceFlag::Disabled => unreachable!(),
            SourceFlag::Pressure => cpl.wav[[counter, is]],
            SourceFlag::Integrated => cpl.wav_int[[counter, is]],
            SourceFlag::TimeReversed => cpl.wav[[nt - 1 - counter, is]],
        };
        for (iz, ix, wt) in sw.taps() {
            w.p[[iz, ix]] += sign * dt * kap[[iz, ix]] * wt * s;
        }
    }
}

/// Interpolate the requested fields at every receiver into sample `it` of
/// the records. Contributions accumulate so two recording wavefields sum.
pub fn record_receivers(
    w: &Wavefield,
    cpl: &WavefieldCoupling,
    rec: &mut RecordSet,
    it: usize,
) {
    if let Some(p) = rec.p.as_mut() {
        for (ir, sw) in cpl.recv_p.iter().enumerate() {
            p[[it, ir]] += sw.interpolate(&w.p);
        }
    }
    if let Some(vx) = rec.vx.as_mut() {
        for (ir, sw) in cpl.recv_vx.iter().enumerate() {
            vx[[it, ir]] += sw.interpolate(&w.vx);
        }
    }
    if let Some(vz) = rec.vz.as_mut() {
        for (ir, sw) in cpl.recv_vz.iter().enumerate() {
            vz[[it, ir]] += sw.interpolate(&w.vz);
        }
    }
}

/// Scattered-velocity secondary sources: the density-inverse perturbation
/// weighted by the background pressure gradients of the current step.
/// Applied ahead of the scattered wavefield's advance so the term enters
/// the same step's pressure update.
pub fn inject_born_velocity(w2: &mut Wavefield, w1: &Wavefield, born: &BornMaps, dt: f64) {
    let (nz, nx) = w2.p.dim();
    for iz in 2..nz - 2 {
        for ix in 2..nx - 2 {
            w2.vx[[iz, ix]] -= dt * born.d_rho_inv_vx[[iz, ix]] * w1.dpdx[[iz, ix]];
            w2.vz[[iz, ix]] -= dt * born.d_rho_inv_vz[[iz, ix]] * w1.dpdz[[iz, ix]];
        }
    }
}

/// Scattered-pressure secondary source: the bulk-modulus-inverse
/// perturbation weighted by the background pressure increment of the step.
/// Applied after the scattered wavefield's advance.
pub fn inject_born_pressure(
    w2: &mut Wavefield,
    w1: &Wavefield,
    born: &BornMaps,
    kap: &Array2<f64>,
) {
    let (nz, nx) = w2.p.dim();
    for iz in 2..nz - 2 {
        for ix in 2..nx - 2 {
            w2.p[[iz, ix]] -= kap[[iz, ix]]
                * born.d_kap_inv[[iz, ix]]
                * (w1.p[[iz, ix]] - w1.pprev[[iz, ix]]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::coupling::{SprayWeights, Stagger};
    use crate::engine::cpml::CpmlOptions;
    use crate::engine::grid::{ExtendedGrid, SpatialGrid, TimeGrid};
    use crate::model::{Medium, MediumMaps};
    use crate::utilities::ricker;
    use ndarray::Array2;

    struct Setup {
        egrid: ExtendedGrid,
        tgrid: TimeGrid,
        maps: MediumMaps,
        pml_z: CpmlAxis,
        pml_x: CpmlAxis,
        cpl: WavefieldCoupling,
    }

    fn setup() -> Setup {
        let phys = SpatialGrid::new(40, 44, 10.0, 10.0, 0.0, 0.0).unwrap();
        let npml = 10;
        let egrid = ExtendedGrid::new(phys, npml).unwrap();
        let tgrid = TimeGrid::new(150, 1.5e-3).unwrap();
        let medium = Medium::homogeneous(phys, 2000.0, 1000.0).unwrap();
        let maps = MediumMaps::new(&medium, &egrid);
        let fpeak = 15.0;
        let opts = CpmlOptions::default();
        let pml_z = CpmlAxis::build(
            egrid.nz, npml, phys.dz, tgrid.dt, 2000.0, fpeak, true, true, opts,
        );
        let pml_x = CpmlAxis::build(
            egrid.nx, npml, phys.dx, tgrid.dt, 2000.0, fpeak, true, true, opts,
        );

        let sw = SprayWeights::bilinear(195.0, 215.0, &egrid, Stagger::P).unwrap();
        let wavelet = ricker(&tgrid, fpeak, None);
        let mut wav = Array2::zeros((tgrid.nt, 1));
        for it in 0..tgrid.nt {
            wav[[it, 0]] = wavelet[it];
        }
        let cpl = WavefieldCoupling {
            src: vec![sw],
            wav_int: Array2::zeros((tgrid.nt, 1)),
            wav,
            recv_p: Vec::new(),
            recv_vx: Vec::new(),
            recv_vz: Vec::new(),
        };
        Setup {
            egrid,
            tgrid,
            maps,
            pml_z,
            pml_x,
            cpl,
        }
    }

    #[test]
    fn test_staggering_is_preserved() {
        // a pressure-only initial condition reaches the velocity buffers
        // only through the stepper, and scratch buffers never leak into p
        let s = setup();
        let mut w = Wavefield::new(s.egrid.nz, s.egrid.nx);
        let dt = s.tgrid.dt;
        let (dz, dx) = (s.egrid.phys.dz, s.egrid.phys.dx);
        w.p[[s.egrid.nz / 2, s.egrid.nx / 2]] = 1.0;
        advance(&mut w, &s.maps, &s.pml_z, &s.pml_x, dt, dz, dx);
        assert!(w.vx.iter().any(|v| *v != 0.0));
        assert!(w.vz.iter().any(|v| *v != 0.0));
        assert!(w.is_finite());
        // pprev holds the pre-update pressure
        assert_eq!(w.pprev[[s.egrid.nz / 2, s.egrid.nx / 2]], 1.0);
    }

    #[test]
    fn test_boundary_replay_reconstructs_interior_history() {
        let s = setup();
        let nt = s.tgrid.nt;
        let dt = s.tgrid.dt;
        let (dz, dx) = (s.egrid.phys.dz, s.egrid.phys.dx);
        let mut w = Wavefield::new(s.egrid.nz, s.egrid.nx);
        let mut bnd = BoundaryStore::new(&s.egrid, nt);

        // forward pass: save halos and keep the full interior history
        let mut history: Vec<Array2<f64>> = Vec::with_capacity(nt);
        for it in 0..nt {
            bnd.save_pressure(it, &w.p);
            advance(&mut w, &s.maps, &s.pml_z, &s.pml_x, dt, dz, dx);
            bnd.save_velocity(it, &w.vx, &w.vz);
            inject_sources(
                &mut w,
                &s.cpl,
                SourceFlag::Pressure,
                &s.maps.kap,
                dt,
                it,
                nt,
                1.0,
            );
            history.push(w.p.clone());
        }
        bnd.save_snapshot(&w);

        let peak = history
            .iter()
            .flat_map(|p| p.iter())
            .fold(0.0_f64, |m, v| m.max(v.abs()));
        assert!(peak > 0.0);

        // reverse pass from the final state
        let mut max_err = 0.0_f64;
        for it in (0..nt).rev() {
            inject_sources(
                &mut w,
                &s.cpl,
                SourceFlag::Pressure,
                &s.maps.kap,
                dt,
                it,
                nt,
                -1.0,
            );
            advance_reverse(&mut w, &s.maps, &s.pml_z, &s.pml_x, &bnd, it, dt, dz, dx);
            if it == 0 {
                break;
            }
            // state now holds p at time it (post-injection of step it-1)
            let expect = &history[it - 1];
            for iz in s.egrid.first()..s.egrid.z_end() {
                for ix in s.egrid.first()..s.egrid.x_end() {
                    max_err = max_err.max((w.p[[iz, ix]] - expect[[iz, ix]]).abs());
                }
            }
        }
        assert!(
            max_err / peak < 1e-10,
            "replay error {:.3e} of peak {:.3e}",
            max_err,
            peak
        );
    }
}
