//! Error types shared across the crate.

use thiserror::Error;

/// Errors surfaced while building or running a simulation.
///
/// All input problems are reported at build time; the time loop itself is
/// not expected to fail under valid inputs.
#[derive(Error, Debug)]
pub enum SeisError {
    /// Shape, size, or option mismatch in the experiment description.
    #[error("configuration error: {0}")]
    Config(String),

    /// Courant or grid-dispersion check failed for the given medium and grids.
    #[error("stability error: {0}")]
    Stability(String),

    /// Non-finite value detected in wavefield state.
    #[error("numeric error: {0}")]
    Numeric(String),

    /// Worker pool unavailable or allocation failed.
    #[error("resource error: {0}")]
    Resource(String),
}

/// Convenience result alias used throughout the crate.
pub type SeisResult<T> = Result<T, SeisError>;
