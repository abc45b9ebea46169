//! Courant and grid-dispersion checks.

use crate::error::{SeisError, SeisResult};

/// Courant limit for the 4th-order staggered leapfrog scheme
pub const COURANT_MAX: f64 = 0.5;

/// Minimum grid points per smallest wavelength
pub const POINTS_PER_WAVELENGTH: f64 = 5.0;

/// Fail fast when the time step violates the Courant bound or the mesh is
/// too coarse for the source band.
pub fn check_stability(
    vpmin: f64,
    vpmax: f64,
    dz: f64,
    dx: f64,
    dt: f64,
    fmax: f64,
) -> SeisResult<()> {
    let courant = dt * vpmax * (1.0 / (dx * dx) + 1.0 / (dz * dz)).sqrt();
    if courant > COURANT_MAX {
        return Err(SeisError::Stability(format!(
            "Courant number {courant:.3} exceeds {COURANT_MAX} \
             (dt={dt:.3e}, vpmax={vpmax:.1}, dz={dz}, dx={dx}); reduce dt"
        )));
    }
    let wavelength = vpmin / fmax;
    let coarsest = dx.min(dz);
    if coarsest > wavelength / POINTS_PER_WAVELENGTH {
        return Err(SeisError::Stability(format!(
            "grid step {coarsest} too coarse for fmax={fmax:.1} Hz at \
             vpmin={vpmin:.1} m/s: needs <= {:.2} m for {} points per wavelength",
            wavelength / POINTS_PER_WAVELENGTH,
            POINTS_PER_WAVELENGTH
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stable_configuration_passes() {
        // 2 km/s on a 10 m mesh at 1 ms and 20 Hz
        assert!(check_stability(2000.0, 2000.0, 10.0, 10.0, 1.0e-3, 20.0).is_ok());
    }

    #[test]
    fn test_courant_violation() {
        let err = check_stability(2000.0, 2000.0, 10.0, 10.0, 5.0e-3, 20.0).unwrap_err();
        assert!(matches!(err, SeisError::Stability(_)));
        assert!(err.to_string().contains("Courant"));
    }

    #[test]
    fn test_dispersion_violation() {
        // 100 Hz at 2 km/s needs a 4 m mesh, 10 m is too coarse
        let err = check_stability(2000.0, 2000.0, 10.0, 10.0, 1.0e-3, 100.0).unwrap_err();
        assert!(matches!(err, SeisError::Stability(_)));
        assert!(err.to_string().contains("coarse"));
    }
}
