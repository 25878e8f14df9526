use glam::DVec3;

use super::FemScalar;
use crate::numerics::banded::BandedMatrix;
use crate::physics::units::field_coupling;

/// Magnetic field split into magnitude (T) and unit direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldState {
    magnitude: f64,
    direction: DVec3,
}

/// How an existing derivative term follows a new field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldChange {
    /// Same direction: multiply the term by the ratio of magnitudes.
    Rescale(f64),
    /// New direction: the term has to be rebuilt.
    Redirect,
}

impl FieldState {
    pub fn new(field: DVec3) -> Self {
        let magnitude = field.length();
        let direction = if magnitude != 0.0 {
            field / magnitude
        } else {
            DVec3::ZERO
        };
        Self {
            magnitude,
            direction,
        }
    }

    pub fn magnitude(&self) -> f64 {
        self.magnitude
    }

    pub fn direction(&self) -> DVec3 {
        self.direction
    }

    pub fn vector(&self) -> DVec3 {
        self.direction * self.magnitude
    }

    pub fn change_to(&self, next: &FieldState) -> FieldChange {
        if self.direction != next.direction {
            FieldChange::Redirect
        } else if self.magnitude == 0.0 {
            // zero to zero: the term vanishes either way
            FieldChange::Rescale(1.0)
        } else {
            FieldChange::Rescale(next.magnitude / self.magnitude)
        }
    }
}

impl Default for FieldState {
    fn default() -> Self {
        Self::new(DVec3::ZERO)
    }
}

/// `Σ_c D_c B_c / 6`, the field-dependent part of the operator.
pub fn derivative_term(derivatives: &[BandedMatrix<f64>; 3], field: DVec3) -> BandedMatrix<f64> {
    let [dx, dy, dz] = derivatives;
    let (bx, by, bz) = (field.x / 6.0, field.y / 6.0, field.z / 6.0);
    let xy = dx.zip_map(dy, |x, y| x * bx + y * by);
    xy.zip_map(dz, |xy, z| xy + z * bz)
}

/// Differential operator `Γ - (e/ħ) D`.
pub fn differential_operator<T: FemScalar>(
    out_scattering: &BandedMatrix<T>,
    derivative_term: &BandedMatrix<f64>,
) -> BandedMatrix<T> {
    let coupling = field_coupling();
    out_scattering.zip_map(derivative_term, |gamma, d| gamma - T::from_real(coupling * d))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use num_complex::Complex64;

    #[test]
    fn field_changes_are_classified() {
        let b = FieldState::new(DVec3::new(0.0, 0.0, 2.0));
        assert_eq!(b.direction(), DVec3::Z);
        assert_eq!(b.magnitude(), 2.0);
        assert_eq!(b.change_to(&FieldState::new(DVec3::new(0.0, 0.0, 5.0))), FieldChange::Rescale(2.5));
        assert_eq!(b.change_to(&FieldState::new(DVec3::new(0.0, 1.0, 1.0))), FieldChange::Redirect);
        assert_eq!(b.change_to(&FieldState::default()), FieldChange::Redirect);

        let zero = FieldState::default();
        assert_eq!(zero.change_to(&FieldState::new(DVec3::ZERO)), FieldChange::Rescale(1.0));
        assert_eq!(zero.vector(), DVec3::ZERO);
    }

    #[test]
    fn operator_combines_scattering_and_field() {
        let mut dx = BandedMatrix::<f64>::zeros(5, 1);
        let mut dz = BandedMatrix::<f64>::zeros(5, 1);
        dx.add(0, 1, 6.0);
        dz.add(1, 0, -12.0);
        let dy = BandedMatrix::zeros(5, 1);
        let term = derivative_term(&[dx, dy, dz], DVec3::new(1.0, 7.0, 0.5));
        assert_relative_eq!(term.value(0, 1), 1.0);
        assert_relative_eq!(term.value(1, 0), -1.0);

        let mut gamma = BandedMatrix::<Complex64>::zeros(5, 1);
        gamma.add(0, 1, Complex64::new(3.0, -1.0));
        let op = differential_operator(&gamma, &term);
        let c = field_coupling();
        assert_relative_eq!(op.value(0, 1).re, 3.0 - c);
        assert_relative_eq!(op.value(0, 1).im, -1.0);
        assert_relative_eq!(op.value(1, 0).re, c);
    }
}
