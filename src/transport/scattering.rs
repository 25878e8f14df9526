use std::fmt;
use std::sync::Arc;

use glam::DVec3;
use log::warn;

use super::elements::ElementArrays;
use super::{FemScalar, TransportError};
use crate::numerics::banded::BandedMatrix;

/// Scattering rate (THz) as a function of the wavevector (Å⁻¹).
pub type RateFn = Arc<dyn Fn(DVec3) -> f64 + Send + Sync>;

/// Scattering kernel `C(k, k')` in Å·THz.
pub type KernelFn = Arc<dyn Fn(DVec3, DVec3) -> f64 + Send + Sync>;

#[derive(Clone)]
pub enum ScatteringRate {
    Constant(f64),
    Function(RateFn),
}

impl ScatteringRate {
    pub fn at(&self, k: DVec3) -> f64 {
        match self {
            ScatteringRate::Constant(rate) => *rate,
            ScatteringRate::Function(f) => f(k),
        }
    }
}

impl fmt::Debug for ScatteringRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScatteringRate::Constant(rate) => write!(f, "Constant({rate} THz)"),
            ScatteringRate::Function(_) => f.write_str("Function(..)"),
        }
    }
}

/// Local trait allowing convenient conversion into [`ScatteringRate`].
pub trait IntoScatteringRate {
    fn into_rate(self) -> ScatteringRate;
}

impl IntoScatteringRate for f64 {
    fn into_rate(self) -> ScatteringRate {
        ScatteringRate::Constant(self)
    }
}

impl IntoScatteringRate for ScatteringRate {
    fn into_rate(self) -> ScatteringRate {
        self
    }
}

impl<F> IntoScatteringRate for F
where
    F: Fn(DVec3) -> f64 + Send + Sync + 'static,
{
    fn into_rate(self) -> ScatteringRate {
        ScatteringRate::Function(Arc::new(self))
    }
}

pub trait IntoKernelFn {
    fn into_kernel(self) -> KernelFn;
}

impl<F> IntoKernelFn for F
where
    F: Fn(DVec3, DVec3) -> f64 + Send + Sync + 'static,
{
    fn into_kernel(self) -> KernelFn {
        Arc::new(self)
    }
}

/// Discretized scattering model: inverse scattering lengths per point and the
/// out-scattering matrix `Γ`.
#[derive(Debug, Clone)]
pub struct ScatteringState<T: FemScalar> {
    pub inverse_scattering_length: Vec<T>,
    pub out_scattering: BandedMatrix<T>,
}

impl<T: FemScalar> ScatteringState<T> {
    pub fn build(
        elements: &ElementArrays,
        kpoints: &[DVec3],
        faces: &[[usize; 3]],
        rate: Option<&ScatteringRate>,
        kernel: Option<&KernelFn>,
        frequency: f64,
    ) -> Result<Self, TransportError> {
        let rate = match (rate, kernel) {
            (Some(rate), None) => rate,
            (Some(rate), Some(_)) => {
                warn!("scattering kernel is ignored: in-scattering is not implemented, using the scattering rate");
                rate
            }
            (None, Some(_)) => return Err(TransportError::KernelIntegrationUnsupported),
            (None, None) => return Err(TransportError::MissingScattering),
        };

        let inverse_scattering_length =
            inverse_scattering_lengths(rate, kpoints, &elements.vmags, frequency)?;
        let out_scattering = out_scattering_matrix(elements, faces, &inverse_scattering_length);
        Ok(Self {
            inverse_scattering_length,
            out_scattering,
        })
    }
}

/// `1e12 (rate - 2πi f) / |v|` at every periodic point (m⁻¹).
pub fn inverse_scattering_lengths<T: FemScalar>(
    rate: &ScatteringRate,
    kpoints: &[DVec3],
    vmags: &[f64],
    frequency: f64,
) -> Result<Vec<T>, TransportError> {
    kpoints
        .iter()
        .zip(vmags)
        .enumerate()
        .map(|(index, (&k, &vmag))| {
            let value = rate.at(k);
            if value.is_finite() {
                Ok(T::inverse_length(value, frequency, vmag))
            } else {
                Err(TransportError::NonFiniteScattering { index })
            }
        })
        .collect()
}

/// Out-scattering matrix `Γ` for P1 elements with a linearly interpolated
/// inverse scattering length `γ`.
///
/// Pair terms carry `A(i,j)(γ_i + γ_j)/60`, the diagonal `Σ_j A(p,j)γ_j/60`
/// and every triangle adds `Jγ/120` of its third vertex to each of its edges.
/// A constant `γ` reduces this to `γ` times the mass matrix.
pub fn out_scattering_matrix<T: FemScalar>(
    elements: &ElementArrays,
    faces: &[[usize; 3]],
    gamma: &[T],
) -> BandedMatrix<T> {
    let sums = &elements.jacobian_sums;
    let mut out = BandedMatrix::<T>::zeros(sums.n(), sums.bandwidth());

    for (i, j, a) in sums.entries() {
        let weight = T::from_real(a / 60.0);
        out.add(i, j, weight * gamma[j]);
        out.add(i, i, weight * gamma[j]);
        out.add(i, j, weight * gamma[i]);
    }

    for (&[i, j, k], &jac) in faces.iter().zip(&elements.jacobians) {
        let weight = T::from_real(jac / 120.0);
        for (a, b, opposite) in [(i, j, k), (j, k, i), (i, k, j)] {
            out.add(a, b, weight * gamma[opposite]);
            out.add(b, a, weight * gamma[opposite]);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{BandConfig, BandStructure};
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;
    use num_complex::Complex64;

    fn cylinder() -> (BandStructure, ElementArrays) {
        // open along kz, so the stitched mesh exercises the wrap-around storage
        let mut band = BandStructure::new(
            BandConfig::new("1000*(kx**2 + ky**2)", 250.0, [3.0, 3.0, 6.0]).with_resolution(12),
        )
        .unwrap();
        band.discretize().unwrap();
        let elements = ElementArrays::build(&band).unwrap();
        (band, elements)
    }

    fn mass_matrix(faces: &[[usize; 3]], jacobians: &[f64], n: usize) -> DMatrix<f64> {
        let mut m = DMatrix::zeros(n, n);
        for (&[i, j, k], &jac) in faces.iter().zip(jacobians) {
            for a in [i, j, k] {
                for b in [i, j, k] {
                    m[(a, b)] += if a == b { jac / 12.0 } else { jac / 24.0 };
                }
            }
        }
        m
    }

    #[test]
    fn constant_rate_gives_scaled_mass_matrix() {
        let (band, elements) = cylinder();
        let mesh = band.mesh();
        let gamma = vec![3.5; elements.num_points()];
        let out = out_scattering_matrix(&elements, &mesh.kfaces_periodic, &gamma).to_dense();
        let expected =
            mass_matrix(&mesh.kfaces_periodic, &elements.jacobians, elements.num_points()) * 3.5;
        let scale = expected.amax();
        for (got, want) in out.iter().zip(expected.iter()) {
            assert_relative_eq!(*got, *want, epsilon = 1e-12 * scale);
        }
    }

    #[test]
    fn out_scattering_is_symmetric_for_varying_rates() {
        let (band, elements) = cylinder();
        let mesh = band.mesh();
        let rate = ScatteringRate::Function(Arc::new(|k: DVec3| 1.0 + k.x * k.x));
        let gamma: Vec<f64> =
            inverse_scattering_lengths(&rate, &mesh.kpoints_periodic, &elements.vmags, 0.0).unwrap();
        let out = out_scattering_matrix(&elements, &mesh.kfaces_periodic, &gamma).to_dense();
        let scale = out.amax();
        assert!((&out - out.transpose()).amax() < 1e-12 * scale);
    }

    #[test]
    fn finite_frequency_adds_a_reactive_part() {
        let rate = ScatteringRate::Constant(2.0);
        let gamma: Vec<Complex64> =
            inverse_scattering_lengths(&rate, &[DVec3::ZERO], &[1e5], 0.5).unwrap();
        assert_relative_eq!(gamma[0].re, 2e12 / 1e5);
        assert_relative_eq!(gamma[0].im, -std::f64::consts::PI * 1e12 / 1e5);
    }

    #[test]
    fn scattering_configuration_is_checked() {
        let (band, elements) = cylinder();
        let mesh = band.mesh();
        let build = |rate: Option<&ScatteringRate>, kernel: Option<&KernelFn>| {
            ScatteringState::<f64>::build(
                &elements,
                &mesh.kpoints_periodic,
                &mesh.kfaces_periodic,
                rate,
                kernel,
                0.0,
            )
        };
        let kernel = (|_: DVec3, _: DVec3| 1.0).into_kernel();
        let rate = 1.0_f64.into_rate();

        assert!(matches!(build(None, None), Err(TransportError::MissingScattering)));
        assert!(matches!(
            build(None, Some(&kernel)),
            Err(TransportError::KernelIntegrationUnsupported)
        ));
        assert!(build(Some(&rate), Some(&kernel)).is_ok());

        let bad = (|k: DVec3| if k.z > 0.0 { f64::NAN } else { 1.0 }).into_rate();
        assert!(matches!(
            build(Some(&bad), None),
            Err(TransportError::NonFiniteScattering { .. })
        ));
    }
}
