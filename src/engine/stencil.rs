//! 4th-order staggered-grid first derivatives.
//!
//! Derivatives of fields at integer nodes land on half-shifted nodes and
//! vice versa. The outermost two cells per axis are read-only padding and
//! are never written.

use ndarray::Array2;

/// Leading stencil coefficient (9/8)
pub const C1: f64 = 27.0 / 24.0;
/// Trailing stencil coefficient (1/24)
pub const C2: f64 = 1.0 / 24.0;

/// ∂f/∂x of an integer-node field, result at `(iz, ix+1/2)`
pub fn d_dx_forward(f: &Array2<f64>, out: &mut Array2<f64>, dx: f64) {
    let (nz, nx) = f.dim();
    let inv = 1.0 / dx;
    for iz in 2..nz - 2 {
        for ix in 2..nx - 2 {
            out[[iz, ix]] = (C1 * (f[[iz, ix + 1]] - f[[iz, ix]])
                - C2 * (f[[iz, ix + 2]] - f[[iz, ix - 1]]))
                * inv;
        }
    }
}

/// ∂f/∂z of an integer-node field, result at `(iz+1/2, ix)`
pub fn d_dz_forward(f: &Array2<f64>, out: &mut Array2<f64>, dz: f64) {
    let (nz, nx) = f.dim();
    let inv = 1.0 / dz;
    for iz in 2..nz - 2 {
        for ix in 2..nx - 2 {
            out[[iz, ix]] = (C1 * (f[[iz + 1, ix]] - f[[iz, ix]])
                - C2 * (f[[iz + 2, ix]] - f[[iz - 1, ix]]))
                * inv;
        }
    }
}

/// ∂f/∂x of a half-shifted field, result back at integer nodes
pub fn d_dx_backward(f: &Array2<f64>, out: &mut Array2<f64>, dx: f64) {
    let (nz, nx) = f.dim();
    let inv = 1.0 / dx;
    for iz in 2..nz - 2 {
        for ix in 2..nx - 2 {
            out[[iz, ix]] = (C1 * (f[[iz, ix]] - f[[iz, ix - 1]])
                - C2 * (f[[iz, ix + 1]] - f[[iz, ix - 2]]))
                * inv;
        }
    }
}

/// ∂f/∂z of a half-shifted field, result back at integer nodes
pub fn d_dz_backward(f: &Array2<f64>, out: &mut Array2<f64>, dz: f64) {
    let (nz, nx) = f.dim();
    let inv = 1.0 / dz;
    for iz in 2..nz - 2 {
        for ix in 2..nx - 2 {
            out[[iz, ix]] = (C1 * (f[[iz, ix]] - f[[iz - 1, ix]])
                - C2 * (f[[iz + 1, ix]] - f[[iz - 2, ix]]))
                * inv;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_linear_field_has_exact_derivative() {
        // a linear ramp is differentiated exactly by any consistent stencil
        let (nz, nx) = (12, 16);
        let dx = 0.5;
        let mut f = Array2::zeros((nz, nx));
        for iz in 0..nz {
            for ix in 0..nx {
                f[[iz, ix]] = 3.0 * ix as f64 * dx;
            }
        }
        let mut out = Array2::zeros((nz, nx));
        d_dx_forward(&f, &mut out, dx);
        for iz in 2..nz - 2 {
            for ix in 2..nx - 2 {
                assert_abs_diff_eq!(out[[iz, ix]], 3.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_forward_backward_pair_is_consistent() {
        // d_backward(d_forward(quadratic)) recovers the constant curvature
        let (nz, nx) = (14, 14);
        let dz = 1.0;
        let mut f = Array2::zeros((nz, nx));
        for iz in 0..nz {
            for ix in 0..nx {
                f[[iz, ix]] = (iz as f64) * (iz as f64);
            }
        }
        let mut g = Array2::zeros((nz, nx));
        let mut lap = Array2::zeros((nz, nx));
        d_dz_forward(&f, &mut g, dz);
        d_dz_backward(&g, &mut lap, dz);
        for iz in 4..nz - 4 {
            for ix in 2..nx - 2 {
                assert_abs_diff_eq!(lap[[iz, ix]], 2.0, epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn test_padding_is_never_written() {
        let (nz, nx) = (10, 10);
        let f = Array2::from_elem((nz, nx), 7.0);
        let mut out = Array2::from_elem((nz, nx), -1.0);
        d_dx_forward(&f, &mut out, 1.0);
        for ix in 0..nx {
            assert_eq!(out[[0, ix]], -1.0);
            assert_eq!(out[[1, ix]], -1.0);
            assert_eq!(out[[nz - 2, ix]], -1.0);
            assert_eq!(out[[nz - 1, ix]], -1.0);
        }
    }
}
