pub mod cache;
pub mod conductivity;
pub mod elements;
pub mod operator;
pub mod scattering;

use nalgebra::ComplexField;
use num_complex::Complex64;
use thiserror::Error;

use crate::numerics::SolverError;
use crate::physics::units::TERAHERTZ;
use crate::physics::BandError;

pub use cache::CacheStats;
pub use conductivity::{Components, Conductivity};
pub use scattering::{IntoKernelFn, IntoScatteringRate, KernelFn, ScatteringRate};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("either a scattering rate or a scattering kernel must be set")]
    MissingScattering,
    #[error("out-scattering from a scattering kernel is not implemented; set a scattering rate")]
    KernelIntegrationUnsupported,
    #[error("Fermi velocity vanishes or is not finite at surface point {index}")]
    DegenerateVelocity { index: usize },
    #[error("scattering rate is not finite at surface point {index}")]
    NonFiniteScattering { index: usize },
    #[error("tensor component {0} is out of range (expected 0, 1 or 2)")]
    InvalidComponent(usize),
    #[error("the Fermi surface is empty; the chemical potential does not cross the band")]
    EmptySurface,
    #[error(transparent)]
    Band(#[from] BandError),
    #[error(transparent)]
    Solver(#[from] SolverError),
}

/// Scalar type of the linear system: `f64` for static transport and
/// `Complex64` at finite frequency.
pub trait FemScalar: ComplexField<RealField = f64> + Copy {
    /// Inverse scattering length `1e12 (rate - 2πi f) / |v|` in m⁻¹, from a
    /// rate and frequency in THz and a speed in m/s.
    fn inverse_length(rate: f64, frequency: f64, vmag: f64) -> Self;

    fn into_complex(self) -> Complex64;
}

impl FemScalar for f64 {
    fn inverse_length(rate: f64, _frequency: f64, vmag: f64) -> Self {
        TERAHERTZ * rate / vmag
    }

    fn into_complex(self) -> Complex64 {
        Complex64::new(self, 0.0)
    }
}

impl FemScalar for Complex64 {
    fn inverse_length(rate: f64, frequency: f64, vmag: f64) -> Self {
        Complex64::new(rate, -2.0 * std::f64::consts::PI * frequency) * (TERAHERTZ / vmag)
    }

    fn into_complex(self) -> Complex64 {
        self
    }
}
