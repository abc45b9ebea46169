//! Boundary halo store for time reversal.
//!
//! Instead of the full forward history, only a HALO-thick frame of
//! `p`, `vx`, `vz` around the physical domain is recorded every time step,
//! plus one full-mesh snapshot at the final time. Replaying the frame while
//! stepping the scheme backwards reconstructs the whole interior history.

use ndarray::{Array2, Array3};

use crate::engine::fields::Wavefield;
use crate::engine::grid::{ExtendedGrid, HALO};

/// Time-indexed strips of the three fields on one side of the domain.
#[derive(Debug, Clone)]
struct SideStrips {
    p: Array3<f64>,
    vx: Array3<f64>,
    vz: Array3<f64>,
}

impl SideStrips {
    fn new(nt: usize, rows: usize, cols: usize) -> Self {
        Self {
            p: Array3::zeros((nt, rows, cols)),
            vx: Array3::zeros((nt, rows, cols)),
            vz: Array3::zeros((nt, rows, cols)),
        }
    }
}

/// The four per-step halo strips plus the final full-mesh snapshot.
#[derive(Debug, Clone)]
pub struct BoundaryStore {
    egrid: ExtendedGrid,
    nt: usize,
    top: SideStrips,
    bottom: SideStrips,
    left: SideStrips,
    right: SideStrips,
    snap_p: Array2<f64>,
    snap_vx: Array2<f64>,
    snap_vz: Array2<f64>,
}

impl BoundaryStore {
    /// Allocate a store for `nt` steps on the given mesh
    pub fn new(egrid: &ExtendedGrid, nt: usize) -> Self {
        let span_x = egrid.phys.nxd + 2 * HALO;
        let span_z = egrid.phys.nzd + 2 * HALO;
        Self {
            egrid: *egrid,
            nt,
            top: SideStrips::new(nt, HALO, span_x),
            bottom: SideStrips::new(nt, HALO, span_x),
            left: SideStrips::new(nt, span_z, HALO),
            right: SideStrips::new(nt, span_z, HALO),
            snap_p: Array2::zeros((egrid.nz, egrid.nx)),
            snap_vx: Array2::zeros((egrid.nz, egrid.nx)),
            snap_vz: Array2::zeros((egrid.nz, egrid.nx)),
        }
    }

    /// Number of stored steps
    pub fn nt(&self) -> usize {
        self.nt
    }

    /// Whether this store was recorded on the given mesh
    pub fn compatible(&self, egrid: &ExtendedGrid) -> bool {
        self.egrid == *egrid
    }

    /// Upper-left corner `(row, col)` of each side region, in save order
    /// top, bottom, left, right.
    fn origins(&self) -> [(usize, usize); 4] {
        let ib0 = self.egrid.ib0();
        [
            (ib0, ib0),
            (self.egrid.z_end(), ib0),
            (ib0, ib0),
            (ib0, self.egrid.x_end()),
        ]
    }

    fn save_field(strip: &mut Array3<f64>, it: usize, field: &Array2<f64>, r0: usize, c0: usize) {
        let (_, rows, cols) = strip.dim();
        for i in 0..rows {
            for j in 0..cols {
                strip[[it, i, j]] = field[[r0 + i, c0 + j]];
            }
        }
    }

    fn force_field(strip: &Array3<f64>, it: usize, field: &mut Array2<f64>, r0: usize, c0: usize) {
        let (_, rows, cols) = strip.dim();
        for i in 0..rows {
            for j in 0..cols {
                field[[r0 + i, c0 + j]] = strip[[it, i, j]];
            }
        }
    }

    fn for_sides_mut(&mut self) -> [(&mut SideStrips, (usize, usize)); 4] {
        let origins = self.origins();
        [
            (&mut self.top, origins[0]),
            (&mut self.bottom, origins[1]),
            (&mut self.left, origins[2]),
            (&mut self.right, origins[3]),
        ]
    }

    fn for_sides(&self) -> [(&SideStrips, (usize, usize)); 4] {
        let origins = self.origins();
        [
            (&self.top, origins[0]),
            (&self.bottom, origins[1]),
            (&self.left, origins[2]),
            (&self.right, origins[3]),
        ]
    }

    /// Record the pressure halo at step `it` (taken ahead of the update)
    pub fn save_pressure(&mut self, it: usize, p: &Array2<f64>) {
        for (side, (r0, c0)) in self.for_sides_mut() {
            Self::save_field(&mut side.p, it, p, r0, c0);
        }
    }

    /// Record the velocity halo at step `it` (taken after the velocity
    /// update)
    pub fn save_velocity(&mut self, it: usize, vx: &Array2<f64>, vz: &Array2<f64>) {
        for (side, (r0, c0)) in self.for_sides_mut() {
            Self::save_field(&mut side.vx, it, vx, r0, c0);
            Self::save_field(&mut side.vz, it, vz, r0, c0);
        }
    }

    /// Overwrite the pressure halo with the values recorded at step `it`
    pub fn force_pressure(&self, it: usize, p: &mut Array2<f64>) {
        for (side, (r0, c0)) in self.for_sides() {
            Self::force_field(&side.p, it, p, r0, c0);
        }
    }

    /// Overwrite the velocity halo with the values recorded at step `it`
    pub fn force_velocity(&self, it: usize, vx: &mut Array2<f64>, vz: &mut Array2<f64>) {
        for (side, (r0, c0)) in self.for_sides() {
            Self::force_field(&side.vx, it, vx, r0, c0);
            Self::force_field(&side.vz, it, vz, r0, c0);
        }
    }

    /// Capture the full final state
    pub fn save_snapshot(&mut self, w: &Wavefield) {
        self.snap_p.assign(&w.p);
        self.snap_vx.assign(&w.vx);
        self.snap_vz.assign(&w.vz);
    }

    /// Restore the captured final state into a wavefield
    pub fn load_snapshot(&self, w: &mut Wavefield) {
        w.p.assign(&self.snap_p);
        w.vx.assign(&self.snap_vx);
        w.vz.assign(&self.snap_vz);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::grid::SpatialGrid;

    fn demo_egrid() -> ExtendedGrid {
        let phys = SpatialGrid::new(12, 14, 10.0, 10.0, 0.0, 0.0).unwrap();
        ExtendedGrid::new(phys, 6).unwrap()
    }

    #[test]
    fn test_save_then_force_roundtrip() {
        let egrid = demo_egrid();
        let mut store = BoundaryStore::new(&egrid, 4);
        let mut p = Array2::zeros((egrid.nz, egrid.nx));
        for ((iz, ix), v) in p.indexed_iter_mut() {
            *v = (iz * 100 + ix) as f64;
        }
        store.save_pressure(2, &p);

        let mut q = Array2::zeros((egrid.nz, egrid.nx));
        store.force_pressure(2, &mut q);

        // halo cells must match, the deep interior must stay untouched
        let ib0 = egrid.ib0();
        assert_eq!(q[[ib0, ib0]], p[[ib0, ib0]]);
        assert_eq!(q[[egrid.z_end(), ib0 + 5]], p[[egrid.z_end(), ib0 + 5]]);
        let mid = (egrid.nz / 2, egrid.nx / 2);
        assert_eq!(q[[mid.0, mid.1]], 0.0);
    }

    #[test]
    fn test_strip_shapes() {
        let egrid = demo_egrid();
        let store = BoundaryStore::new(&egrid, 7);
        assert_eq!(store.top.p.dim(), (7, HALO, egrid.phys.nxd + 2 * HALO));
        assert_eq!(store.left.p.dim(), (7, egrid.phys.nzd + 2 * HALO, HALO));
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let egrid = demo_egrid();
        let mut store = BoundaryStore::new(&egrid, 2);
        let mut w = Wavefield::new(egrid.nz, egrid.nx);
        w.p[[5, 5]] = 1.5;
        w.vx[[6, 6]] = -2.5;
        store.save_snapshot(&w);

        let mut r = Wavefield::new(egrid.nz, egrid.nx);
        store.load_snapshot(&mut r);
        assert_eq!(r.p[[5, 5]], 1.5);
        assert_eq!(r.vx[[6, 6]], -2.5);
    }
}
