//! Utility functions: source time functions and the misfit/scaling
//! helper.

use ndarray::Array1;
use num_complex::ComplexFloat;

use crate::engine::grid::TimeGrid;
use crate::error::{SeisError, SeisResult};

/// Ricker wavelet on a time grid.
///
/// `s(t) = (1 - 2a) exp(-a)` with `a = (pi * fpeak * (t - tpeak))^2`; the
/// peak sits at `tpeak`, defaulting to `1.5 / fpeak` so the onset is
/// effectively zero.
pub fn ricker(tgrid: &TimeGrid, fpeak: f64, tpeak: Option<f64>) -> Array1<f64> {
    let t0 = tpeak.unwrap_or(1.5 / fpeak);
    let mut out = Array1::zeros(tgrid.nt);
    for (it, v) in out.iter_mut().enumerate() {
        let arg = std::f64::consts::PI * fpeak * (it as f64 * tgrid.dt - t0);
        let a = arg * arg;
        *v = (1.0 - 2.0 * a) * (-a).exp();
    }
    out
}

/// Running time integral of a wavelet.
pub fn integrate(wavelet: &Array1<f64>, dt: f64) -> Array1<f64> {
    let mut out = Array1::zeros(wavelet.len());
    let mut acc = 0.0;
    for (it, &v) in wavelet.iter().enumerate() {
        acc += v * dt;
        out[it] = acc;
    }
    out
}

/// Least-squares scaling of `x` onto `y`: the `alpha` minimizing
/// `||alpha x - y||^2` (conjugated inner products for complex signals) and
/// the residual value at the minimum.
///
/// Returns `(J, alpha)`.
pub fn error_after_scaling<T>(x: &[T], y: &[T]) -> SeisResult<(f64, T)>
where
    T: ComplexFloat<Real = f64>,
{
    if x.len() != y.len() {
        return Err(SeisError::Config(format!(
            "signals disagree in length: {} vs {}",
            x.len(),
            y.len()
        )));
    }
    let mut xx = 0.0_f64;
    let mut xy = T::zero();
    for (&a, &b) in x.iter().zip(y.iter()) {
        xx += (a.conj() * a).re();
        xy = xy + a.conj() * b;
    }
    if xx == 0.0 {
        return Err(SeisError::Config("cannot scale a zero signal".into()));
    }
    let denom = T::from(xx).ok_or_else(|| {
        SeisError::Numeric("inner product not representable in the signal type".into())
    })?;
    let alpha = xy / denom;

    let mut j = 0.0_f64;
    for (&a, &b) in x.iter().zip(y.iter()) {
        let r = alpha * a - b;
        j += (r.conj() * r).re();
    }
    Ok((j, alpha))
}
