//! Convolutional PML damping profiles.
//!
//! Each axis carries the recursive-convolution coefficients `a`, `b` and the
//! inverse coordinate stretch `k_inv`, evaluated at both integer and
//! half-shifted node positions. Profiles are inert (`a = 0`, `b = 1`,
//! `k_inv = 1`) everywhere except the damped part of the pads, so the
//! stepper applies them unconditionally.

use ndarray::Array1;

use crate::engine::grid::HALO;

/// C-PML profile vectors for one axis.
#[derive(Debug, Clone)]
pub struct CpmlAxis {
    /// Convolution gain at integer nodes
    pub a: Array1<f64>,
    /// Convolution decay at integer nodes
    pub b: Array1<f64>,
    /// Inverse stretch at integer nodes
    pub k_inv: Array1<f64>,
    /// Convolution gain at half-shifted nodes
    pub a_h: Array1<f64>,
    /// Convolution decay at half-shifted nodes
    pub b_h: Array1<f64>,
    /// Inverse stretch at half-shifted nodes
    pub k_inv_h: Array1<f64>,
}

/// Tuning knobs for the damping profile.
#[derive(Debug, Clone, Copy)]
pub struct CpmlOptions {
    /// Polynomial order of the damping ramp
    pub order: f64,
    /// Theoretical reflection coefficient at the peak frequency
    pub rcoef: f64,
    /// Maximum coordinate stretch
    pub kmax: f64,
}

impl Default for CpmlOptions {
    fn default() -> Self {
        Self {
            order: 2.0,
            rcoef: 1.0e-6,
            kmax: 1.0,
        }
    }
}

impl CpmlAxis {
    /// Inert profile: the axis behaves as if no PML were present.
    pub fn inert(n: usize) -> Self {
        Self {
            a: Array1::zeros(n),
            b: Array1::ones(n),
            k_inv: Array1::ones(n),
            a_h: Array1::zeros(n),
            b_h: Array1::ones(n),
            k_inv_h: Array1::ones(n),
        }
    }

    /// Build the profile for one axis of the extended mesh.
    ///
    /// `n` is the extended axis length, `npml` the pad thickness per side.
    /// Damping occupies the outer `npml - HALO` cells of each pad; the HALO
    /// innermost pad cells stay inert so the replay halo is damping-free.
    /// `absorb_low`/`absorb_high` select which face actually absorbs.
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        n: usize,
        npml: usize,
        delta: f64,
        dt: f64,
        vpmax: f64,
        fpeak: f64,
        absorb_low: bool,
        absorb_high: bool,
        opts: CpmlOptions,
    ) -> Self {
        let mut axis = Self::inert(n);
        let thickness = npml - HALO;
        let length = thickness as f64 * delta;
        let d0 = -(opts.order + 1.0) * vpmax * opts.rcoef.ln() / (2.0 * length);
        let alpha_max = std::f64::consts::PI * fpeak;

        // Normalized distance into the damped layer at continuous axis
        // coordinate `pos` (in cells); 1 at the outer edge, 0 at the inner.
        let depth = |pos: f64| -> f64 {
            let t = thickness as f64;
            let low = (t - pos) / t;
            let high = (pos - (n - 1 - thickness) as f64) / t;
            let mut d: f64 = 0.0;
            if absorb_low {
                d = d.max(low);
            }
            if absorb_high {
                d = d.max(high);
            }
            d.clamp(0.0, 1.0)
        };

        let coeffs = |d: f64| -> (f64, f64, f64) {
            if d <= 0.0 {
                return (0.0, 1.0, 1.0);
            }
            let dn = d.powf(opts.order);
            let d_damp = dn * d0;
            let k = 1.0 + (opts.kmax - 1.0) * dn;
            let alpha = alpha_max * (1.0 - d);
            let b = (-(d_damp / k + alpha) * dt).exp();
            let denom = k * (d_damp + k * alpha);
            let a = if denom.abs() > 0.0 {
                d_damp * (b - 1.0) / denom
            } else {
                0.0
            };
            (a, b, 1.0 / k)
        };

        for i in 0..n {
            let (a, b, k_inv) = coeffs(depth(i as f64));
            axis.a[i] = a;
            axis.b[i] = b;
            axis.k_inv[i] = k_inv;
            let (a, b, k_inv) = coeffs(depth(i as f64 + 0.5));
            axis.a_h[i] = a;
            axis.b_h[i] = b;
            axis.k_inv_h[i] = k_inv;
        }
        axis
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo_axis(absorb_low: bool, absorb_high: bool) -> (CpmlAxis, usize, usize) {
        let npml = 20;
        let nd = 60;
        let n = nd + 2 * npml;
        let axis = CpmlAxis::build(
            n,
            npml,
            10.0,
            1.0e-3,
            2000.0,
            15.0,
            absorb_low,
            absorb_high,
            CpmlOptions::default(),
        );
        (axis, n, npml)
    }

    #[test]
    fn test_interior_is_inert() {
        let (axis, n, npml) = demo_axis(true, true);
        for i in npml..n - npml {
            assert_eq!(axis.a[i], 0.0);
            assert_eq!(axis.b[i], 1.0);
            assert_eq!(axis.k_inv[i], 1.0);
            assert_eq!(axis.a_h[i], 0.0);
            assert_eq!(axis.b_h[i], 1.0);
        }
    }

    #[test]
    fn test_halo_cells_are_inert() {
        // the HALO innermost pad cells carry no damping
        let (axis, n, npml) = demo_axis(true, true);
        for k in 1..=HALO {
            assert_eq!(axis.a[npml - k], 0.0);
            assert_eq!(axis.b[npml - k], 1.0);
            assert_eq!(axis.a[n - npml + k - 1], 0.0);
        }
    }

    #[test]
    fn test_damping_grows_outward() {
        let (axis, _, npml) = demo_axis(true, true);
        // |a| increases toward the outer edge of the pad
        let inner = axis.a[npml - HALO - 1].abs();
        let outer = axis.a[0].abs();
        assert!(outer > inner);
        assert!(axis.b[0] < 1.0);
    }

    #[test]
    fn test_reflective_face_stays_inert() {
        let (axis, n, _) = demo_axis(false, true);
        assert_eq!(axis.a[0], 0.0);
        assert_eq!(axis.b[0], 1.0);
        assert!(axis.b[n - 1] < 1.0);
    }
}
