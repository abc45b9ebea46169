//! Per-worker simulation state and the per-supersource time loops.
//!
//! A worker owns its wavefields, boundary store and local accumulators for
//! the whole group of supersources assigned to it; nothing here is shared
//! across workers. Reductions into the experiment-wide outputs happen at
//! the join in the scheduler.

use ndarray::Array2;
use tracing::debug;

use crate::engine::fields::Wavefield;
use crate::error::{SeisError, SeisResult};
use crate::model::crop;
use crate::sim::boundary::BoundaryStore;
use crate::sim::gradient::GradAccumulator;
use crate::sim::params::CommonParams;
use crate::sim::stepper::{
    advance, advance_reverse, inject_born_pressure, inject_born_velocity, inject_sources,
    record_receivers, RecordSet,
};

/// State owned by one worker, allocated once and reused for every
/// supersource of its group.
#[derive(Debug)]
pub struct WorkerState {
    /// One wavefield per propagating wavefield
    pub fields: Vec<Wavefield>,
    /// Halo store, present when saving or replaying
    pub boundary: Option<BoundaryStore>,
    /// Illumination accumulated over this worker's supersources
    pub illum: Option<Array2<f64>>,
    /// Gradient accumulated over this worker's supersources
    pub grad: Option<GradAccumulator>,
}

impl WorkerState {
    /// Allocate state sized for the experiment
    pub fn new(cmn: &CommonParams) -> Self {
        let (nz, nx) = (cmn.egrid.nz, cmn.egrid.nx);
        let fields = (0..cmn.npw).map(|_| Wavefield::new(nz, nx)).collect();
        let boundary = if cmn.gmodel_flag || cmn.backprop_flag == 1 {
            Some(BoundaryStore::new(&cmn.egrid, cmn.tgrid.nt))
        } else {
            None
        };
        let illum = if cmn.illum_flag {
            Some(Array2::zeros((cmn.egrid.phys.nzd, cmn.egrid.phys.nxd)))
        } else {
            None
        };
        let grad = if cmn.gmodel_flag {
            Some(GradAccumulator::new(nz, nx))
        } else {
            None
        };
        Self {
            fields,
            boundary,
            illum,
            grad,
        }
    }

    fn reset_fields(&mut self) {
        for w in &mut self.fields {
            w.reset();
        }
    }
}

/// Everything one supersource produces.
#[derive(Debug)]
pub struct SupersourceOutput {
    /// Supersource index
    pub iss: usize,
    /// Receiver records
    pub records: RecordSet,
    /// Physical-mesh pressure snapshots at the requested times
    pub snaps: Vec<Array2<f64>>,
    /// Retained halo checkpoint when requested
    pub boundary: Option<BoundaryStore>,
}

/// Merged outputs of one worker's group of supersources.
#[derive(Debug)]
pub struct GroupOutput {
    /// Per-supersource outputs
    pub outputs: Vec<SupersourceOutput>,
    /// Worker-local illumination sum
    pub illum: Option<Array2<f64>>,
    /// Worker-local gradient sum
    pub grad: Option<GradAccumulator>,
}

/// Run all supersources of one group sequentially on one worker.
pub fn run_group(cmn: &CommonParams, range: std::ops::Range<usize>) -> SeisResult<GroupOutput> {
    let mut state = WorkerState::new(cmn);
    let mut outputs = Vec::with_capacity(range.len());
    for iss in range {
        let out = run_supersource(cmn, &mut state, iss)?;
        debug!(iss, "supersource complete");
        outputs.push(out);
    }
    Ok(GroupOutput {
        outputs,
        illum: state.illum.take(),
        grad: state.grad.take(),
    })
}

/// Run one supersource: the forward time loop, and in gradient mode the
/// time-reversed reconstruction interleaved with the adjoint propagation.
/// A `backprop_flag = -1` run skips the forward loop entirely and replays
/// a saved checkpoint instead.
pub fn run_supersource(
    cmn: &CommonParams,
    state: &mut WorkerState,
    iss: usize,
) -> SeisResult<SupersourceOutput> {
    if cmn.backprop_flag == -1 {
        return replay_supersource(cmn, state, iss);
    }
    state.reset_fields();

    let ss = &cmn.supersources[iss];
    let nt = cmn.tgrid.nt;
    let dt = cmn.tgrid.dt;
    let (dz, dx) = (cmn.egrid.phys.dz, cmn.egrid.phys.dx);
    let save = cmn.gmodel_flag || cmn.backprop_flag == 1;

    let nr = (0..cmn.npw)
        .find(|&ipw| cmn.rflags[ipw])
        .map_or(0, |ipw| ss.wavefields[ipw].recv_p.len());
    let mut records = RecordSet::new(nt, nr, &cmn.rfields);
    let mut snaps = Vec::with_capacity(cmn.itsnaps.len());

    for it in 0..nt {
        if save {
            if let Some(bnd) = state.boundary.as_mut() {
                bnd.save_pressure(it, &state.fields[0].p);
            }
        }
        advance(
            &mut state.fields[0],
            &cmn.maps,
            &cmn.pml_z,
            &cmn.pml_x,
            dt,
            dz,
            dx,
        );
        if save {
            if let Some(bnd) = state.boundary.as_mut() {
                bnd.save_velocity(it, &state.fields[0].vx, &state.fields[0].vz);
            }
        }
        inject_sources(
            &mut state.fields[0],
            &ss.wavefields[0],
            cmn.sflags[0],
            &cmn.maps.kap,
            dt,
            it,
            nt,
            1.0,
        );

        if let Some(born) = cmn.born.as_ref() {
            let (head, tail) = state.fields.split_at_mut(1);
            let (w1, w2) = (&head[0], &mut tail[0]);
            inject_born_velocity(w2, w1, born, dt);
            advance(w2, &cmn.maps, &cmn.pml_z, &cmn.pml_x, dt, dz, dx);
            inject_born_pressure(w2, w1, born, &cmn.maps.kap);
            inject_sources(
                w2,
                &ss.wavefields[1],
                cmn.sflags[1],
                &cmn.maps.kap,
                dt,
                it,
                nt,
                1.0,
            );
        }

        if cmn.rflags[0] {
            record_receivers(&state.fields[0], &ss.wavefields[0], &mut records, it);
        }
        if cmn.born.is_some() && cmn.rflags[1] {
            record_receivers(&state.fields[1], &ss.wavefields[1], &mut records, it);
        }

        if let Some(illum) = state.illum.as_mut() {
            let p = &state.fields[0].p;
            let first = cmn.egrid.first();
            for izd in 0..cmn.egrid.phys.nzd {
                for ixd in 0..cmn.egrid.phys.nxd {
                    let v = p[[first + izd, first + ixd]];
                    illum[[izd, ixd]] += v * v;
                }
            }
        }

        if cmn.snaps_flag && cmn.itsnaps.contains(&it) {
            snaps.push(crop(&state.fields[0].p, &cmn.egrid));
        }
    }

    for w in &state.fields {
        if !w.is_finite() {
            return Err(SeisError::Numeric(format!(
                "non-finite wavefield state after supersource {iss}; \
                 the scheme went unstable or inputs are bad"
            )));
        }
    }

    if save {
        if let Some(bnd) = state.boundary.as_mut() {
            bnd.save_snapshot(&state.fields[0]);
        }
    }

    if cmn.gmodel_flag {
        backward_pass(cmn, state, iss)?;
    }

    let boundary = if cmn.backprop_flag == 1 {
        state.boundary.clone()
    } else {
        None
    };

    Ok(SupersourceOutput {
        iss,
        records,
        snaps,
        boundary,
    })
}

/// Reconstruct a supersource from a saved checkpoint: load the final
/// snapshot, then step the inverse scheme through reversed time while
/// forcing the recorded halo, re-recording receivers and snapshots from
/// the reconstructed states.
fn replay_supersource(
    cmn: &CommonParams,
    state: &mut WorkerState,
    iss: usize,
) -> SeisResult<SupersourceOutput> {
    state.reset_fields();

    let ss = &cmn.supersources[iss];
    let bnd = &cmn.replay[iss];
    let nt = cmn.tgrid.nt;
    let dt = cmn.tgrid.dt;
    let (dz, dx) = (cmn.egrid.phys.dz, cmn.egrid.phys.dx);

    let nr = if cmn.rflags[0] {
        ss.wavefields[0].recv_p.len()
    } else {
        0
    };
    let mut records = RecordSet::new(nt, nr, &cmn.rfields);
    let mut snaps = Vec::with_capacity(cmn.itsnaps.len());

    let w = &mut state.fields[0];
    bnd.load_snapshot(w);

    for it in (0..nt).rev() {
        // the state entering this iteration is the one the forward pass
        // held right after step `it`
        if cmn.rflags[0] {
            record_receivers(w, &ss.wavefields[0], &mut records, it);
        }
        if let Some(illum) = state.illum.as_mut() {
            let first = cmn.egrid.first();
            for izd in 0..cmn.egrid.phys.nzd {
                for ixd in 0..cmn.egrid.phys.nxd {
                    let v = w.p[[first + izd, first + ixd]];
                    illum[[izd, ixd]] += v * v;
                }
            }
        }
        if cmn.snaps_flag && cmn.itsnaps.contains(&it) {
            snaps.push(crop(&w.p, &cmn.egrid));
        }

        inject_sources(
            w,
            &ss.wavefields[0],
            cmn.sflags[0],
            &cmn.maps.kap,
            dt,
            it,
            nt,
            -1.0,
        );
        advance_reverse(w, &cmn.maps, &cmn.pml_z, &cmn.pml_x, bnd, it, dt, dz, dx);
    }

    if !w.is_finite() {
        return Err(SeisError::Numeric(format!(
            "non-finite wavefield state while replaying supersource {iss}"
        )));
    }

    // collected while stepping backwards; restore time order
    snaps.reverse();

    Ok(SupersourceOutput {
        iss,
        records,
        snaps,
        boundary: None,
    })
}

/// The backward half of a gradient run: reconstruct the forward wavefield
/// by replaying the halo, advance the adjoint wavefield through reversed
/// time, and correlate the two after every step.
fn backward_pass(cmn: &CommonParams, state: &mut WorkerState, iss: usize) -> SeisResult<()> {
    let ss = &cmn.supersources[iss];
    let nt = cmn.tgrid.nt;
    let dt = cmn.tgrid.dt;
    let (dz, dx) = (cmn.egrid.phys.dz, cmn.egrid.phys.dx);

    let (bnd, grad) = match (state.boundary.as_ref(), state.grad.as_mut()) {
        (Some(b), Some(g)) => (b, g),
        _ => {
            return Err(SeisError::Resource(
                "gradient pass without boundary store or accumulator".into(),
            ))
        }
    };

    for i_rev in 0..nt {
        let it = nt - 1 - i_rev;
        let (head, tail) = state.fields.split_at_mut(1);
        let (w1, w2) = (&mut head[0], &mut tail[0]);

        // adjoint wavefield, forward in reversed time
        advance(w2, &cmn.maps, &cmn.pml_z, &cmn.pml_x, dt, dz, dx);
        inject_sources(
            w2,
            &ss.wavefields[1],
            cmn.sflags[1],
            &cmn.maps.kap,
            dt,
            i_rev,
            nt,
            1.0,
        );

        // w1 scratch still holds the pressure gradients of the step that
        // produced p[it+1]; pair them with the adjoint velocities before
        // the reverse update overwrites them
        grad.correlate_velocity(w2, &w1.dpdx, &w1.dpdz, &cmn.maps);

        // reconstruct the forward state at it, keeping the pre-step
        // pressure for the increment correlation
        w1.pprev.assign(&w1.p);
        inject_sources(
            w1,
            &ss.wavefields[0],
            cmn.sflags[0],
            &cmn.maps.kap,
            dt,
            it,
            nt,
            -1.0,
        );
        advance_reverse(w1, &cmn.maps, &cmn.pml_z, &cmn.pml_x, bnd, it, dt, dz, dx);

        grad.correlate_pressure(w2, &w1.pprev, &w1.p, dt);
    }

    if !state.fields[1].is_finite() {
        return Err(SeisError::Numeric(format!(
            "non-finite adjoint state after supersource {iss}"
        )));
    }
    Ok(())
}
