//! Acquisition geometry: supersources, receivers, source time functions
//! and the flags steering injection and recording.

pub mod coupling;

use ndarray::Array2;

use crate::engine::grid::{SpatialGrid, TimeGrid};
use crate::error::{SeisError, SeisResult};

/// How a source wavelet is injected into the pressure field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFlag {
    /// No injection
    Disabled,
    /// Inject the time-integrated wavelet (injection-rate source)
    Integrated,
    /// Inject the wavelet as a pressure source
    Pressure,
    /// Inject the wavelet time-reversed (adjoint runs)
    TimeReversed,
}

impl SourceFlag {
    /// Map the conventional integer code `{0,1,2,3}`
    pub fn from_code(code: i32) -> SeisResult<Self> {
        match code {
            0 => Ok(Self::Disabled),
            1 => Ok(Self::Integrated),
            2 => Ok(Self::Pressure),
            3 => Ok(Self::TimeReversed),
            _ => Err(SeisError::Config(format!("unknown source flag {code}"))),
        }
    }
}

/// Receiver fields that can be recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecvField {
    /// Pressure
    P,
    /// Horizontal particle velocity
    Vx,
    /// Vertical particle velocity
    Vz,
}

/// One supersource: a group of physical sources fired simultaneously,
/// observed by a group of receivers.
#[derive(Debug, Clone, Default)]
pub struct Supersource {
    /// Source depths
    pub sz: Vec<f64>,
    /// Source offsets
    pub sx: Vec<f64>,
    /// Receiver depths
    pub rz: Vec<f64>,
    /// Receiver offsets
    pub rx: Vec<f64>,
}

impl Supersource {
    /// Single source, arbitrary receivers
    pub fn single(sz: f64, sx: f64, rz: Vec<f64>, rx: Vec<f64>) -> Self {
        Self {
            sz: vec![sz],
            sx: vec![sx],
            rz,
            rx,
        }
    }

    /// Number of sources
    pub fn ns(&self) -> usize {
        self.sz.len()
    }

    /// Number of receivers
    pub fn nr(&self) -> usize {
        self.rz.len()
    }

    fn validate(&self, grid: &SpatialGrid) -> SeisResult<()> {
        if self.sz.len() != self.sx.len() {
            return Err(SeisError::Config(format!(
                "source coordinate arrays disagree: {} z vs {} x",
                self.sz.len(),
                self.sx.len()
            )));
        }
        if self.rz.len() != self.rx.len() {
            return Err(SeisError::Config(format!(
                "receiver coordinate arrays disagree: {} z vs {} x",
                self.rz.len(),
                self.rx.len()
            )));
        }
        for (&z, &x) in self.sz.iter().zip(&self.sx) {
            if !grid.contains(z, x) {
                return Err(SeisError::Config(format!(
                    "source ({z}, {x}) outside the physical mesh"
                )));
            }
        }
        for (&z, &x) in self.rz.iter().zip(&self.rx) {
            if !grid.contains(z, x) {
                return Err(SeisError::Config(format!(
                    "receiver ({z}, {x}) outside the physical mesh"
                )));
            }
        }
        Ok(())
    }
}

/// Acquisition geometry for one propagating wavefield: its list of
/// supersources.
pub type WavefieldGeom = Vec<Supersource>;

/// Per-wavefield acquisition geometry; outer index is the propagating
/// wavefield.
#[derive(Debug, Clone)]
pub struct Ageom {
    /// `geoms[ipw][iss]`
    pub geoms: Vec<WavefieldGeom>,
}

impl Ageom {
    /// Geometry for a single propagating wavefield
    pub fn forward(supersources: Vec<Supersource>) -> Self {
        Self {
            geoms: vec![supersources],
        }
    }

    /// Number of propagating wavefields
    pub fn npw(&self) -> usize {
        self.geoms.len()
    }

    /// Number of supersources (identical across wavefields)
    pub fn nss(&self) -> usize {
        self.geoms.first().map_or(0, |g| g.len())
    }

    /// Validate coordinate arrays and positions against the physical mesh
    pub fn validate(&self, grid: &SpatialGrid, npw: usize) -> SeisResult<()> {
        if self.geoms.len() != npw {
            return Err(SeisError::Config(format!(
                "ageom describes {} wavefields, expected {npw}",
                self.geoms.len()
            )));
        }
        let nss = self.nss();
        if nss == 0 {
            return Err(SeisError::Config("ageom has no supersources".into()));
        }
        for geom in &self.geoms {
            if geom.len() != nss {
                return Err(SeisError::Config(format!(
                    "all wavefields must list {nss} supersources, got {}",
                    geom.len()
                )));
            }
            for ss in geom {
                ss.validate(grid)?;
            }
        }
        Ok(())
    }
}

/// Source time functions, `(nt, ns)` per supersource per wavefield.
#[derive(Debug, Clone)]
pub struct SourceWavelets {
    /// `data[ipw][iss]` with one column per source
    pub data: Vec<Vec<Array2<f64>>>,
}

impl SourceWavelets {
    /// Wavelets for a single propagating wavefield
    pub fn forward(wavelets: Vec<Array2<f64>>) -> Self {
        Self {
            data: vec![wavelets],
        }
    }

    /// Validate against geometry and time grid
    pub fn validate(&self, ageom: &Ageom, tgrid: &TimeGrid) -> SeisResult<()> {
        if self.data.len() != ageom.npw() {
            return Err(SeisError::Config(format!(
                "srcwav describes {} wavefields, ageom {}",
                self.data.len(),
                ageom.npw()
            )));
        }
        for (ipw, per_ss) in self.data.iter().enumerate() {
            if per_ss.len() != ageom.nss() {
                return Err(SeisError::Config(format!(
                    "srcwav wavefield {ipw} lists {} supersources, ageom {}",
                    per_ss.len(),
                    ageom.nss()
                )));
            }
            for (iss, wav) in per_ss.iter().enumerate() {
                let (nt_w, ns_w) = wav.dim();
                let ns = ageom.geoms[ipw][iss].ns();
                if ns_w != ns {
                    return Err(SeisError::Config(format!(
                        "srcwav[{ipw}][{iss}] has {ns_w} columns for {ns} sources"
                    )));
                }
                if nt_w > tgrid.nt {
                    return Err(SeisError::Config(format!(
                        "srcwav[{ipw}][{iss}] spans {nt_w} samples, longer than the \
                         {} -sample time grid",
                        tgrid.nt
                    )));
                }
            }
        }
        Ok(())
    }
}
