//! Misfit/scaling identities for real and complex signals.

use ndarray::Array2;
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use seismod::prelude::*;

#[test]
fn test_scaled_copy_recovers_alpha_real() {
    let mut rng = StdRng::seed_from_u64(3);
    let x: Vec<f64> = (0..200).map(|_| rng.gen_range(-1.0..1.0)).collect();
    for alpha in [1.0, -0.25, 17.5] {
        let y: Vec<f64> = x.iter().map(|v| alpha * v).collect();
        let (j, ahat) = error_after_scaling(&x, &y).unwrap();
        assert!((ahat - alpha).abs() < 1e-12);
        assert!(j < 1e-18);
    }
}

#[test]
fn test_scaled_copy_recovers_alpha_complex_panel() {
    // 10x10 complex panel scaled by 0.3 + 0.7i
    let mut rng = StdRng::seed_from_u64(5);
    let x = Array2::from_shape_fn((10, 10), |_| {
        Complex64::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0))
    });
    let alpha = Complex64::new(0.3, 0.7);
    let y = x.mapv(|v| alpha * v);

    let (j, ahat) = error_after_scaling(
        x.as_slice().unwrap(),
        y.as_slice().unwrap(),
    )
    .unwrap();
    assert!((ahat - alpha).norm() < 1e-12);
    assert!(j < 1e-20);
}

#[test]
fn test_residual_is_minimized() {
    // J at the returned alpha is no larger than at nearby scalings
    let mut rng = StdRng::seed_from_u64(8);
    let x: Vec<f64> = (0..100).map(|_| rng.gen_range(-1.0..1.0)).collect();
    let y: Vec<f64> = x
        .iter()
        .map(|v| 2.0 * v + 0.1 * rng.gen_range(-1.0..1.0))
        .collect();
    let (j, alpha) = error_after_scaling(&x, &y).unwrap();

    for delta in [-0.05, 0.05] {
        let a = alpha + delta;
        let j_off: f64 = x
            .iter()
            .zip(&y)
            .map(|(xv, yv)| (a * xv - yv) * (a * xv - yv))
            .sum();
        assert!(j <= j_off + 1e-12);
    }
}
