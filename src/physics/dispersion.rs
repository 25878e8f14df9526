use std::collections::HashMap;

use glam::DVec3;
use num_dual::Dual64;

use super::expression::{is_builtin, Expr, ParseError};
use super::units::VELOCITY_UNITS;

/// Names bound to the three wavevector components and the three unit-cell axes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SymbolNames {
    pub wavevector: [String; 3],
    pub axis: [String; 3],
}

impl Default for SymbolNames {
    fn default() -> Self {
        Self {
            wavevector: ["kx".into(), "ky".into(), "kz".into()],
            axis: ["a".into(), "b".into(), "c".into()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DispersionError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("name '{0}' is reserved or used twice")]
    ReservedName(String),
}

/// A compiled dispersion relation `E(k)`.
///
/// Symbol slots are laid out as `[kx, ky, kz, a, b, c, params...]`; the
/// axis lengths and band parameters are bound at compile time and the three
/// wavevector slots are filled per evaluation.
#[derive(Clone, Debug)]
pub struct DispersionModel {
    source: String,
    expr: Expr,
    bound: Vec<f64>,
}

impl DispersionModel {
    pub fn compile(
        source: &str,
        names: &SymbolNames,
        unit_cell: [f64; 3],
        bandparams: &HashMap<String, f64>,
    ) -> Result<Self, DispersionError> {
        // sorted so that slot layout does not depend on hash order
        let mut params: Vec<(&String, &f64)> = bandparams.iter().collect();
        params.sort_by(|a, b| a.0.cmp(b.0));

        let mut symbols: Vec<&str> = Vec::with_capacity(6 + params.len());
        symbols.extend(names.wavevector.iter().map(String::as_str));
        symbols.extend(names.axis.iter().map(String::as_str));
        symbols.extend(params.iter().map(|(name, _)| name.as_str()));

        for (i, name) in symbols.iter().enumerate() {
            if is_builtin(name) || symbols[..i].contains(name) {
                return Err(DispersionError::ReservedName(name.to_string()));
            }
        }

        let expr = Expr::parse(source, &symbols)?;

        let mut bound = Vec::with_capacity(3 + params.len());
        bound.extend_from_slice(&unit_cell);
        bound.extend(params.iter().map(|(_, value)| **value));

        Ok(Self {
            source: source.to_string(),
            expr,
            bound,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Energy in meV at wavevector `k` (Å⁻¹).
    pub fn energy(&self, k: DVec3) -> f64 {
        let mut slots = Vec::with_capacity(3 + self.bound.len());
        slots.extend_from_slice(&[k.x, k.y, k.z]);
        slots.extend_from_slice(&self.bound);
        self.expr.eval(&slots)
    }

    /// Energy and its gradient `∇E` in meV·Å, by forward-mode differentiation.
    pub fn energy_and_gradient(&self, k: DVec3) -> (f64, DVec3) {
        let mut slots: Vec<Dual64> = Vec::with_capacity(3 + self.bound.len());
        slots.extend([k.x, k.y, k.z].map(|x| Dual64::new(x, 0.0)));
        slots.extend(self.bound.iter().map(|&x| Dual64::new(x, 0.0)));

        let mut gradient = [0.0; 3];
        for axis in 0..3 {
            // an axis that never appears has an identically zero derivative
            if !self.expr.depends_on(axis) {
                continue;
            }
            slots[axis] = Dual64::new(k[axis], 1.0);
            gradient[axis] = self.expr.eval(&slots).eps;
            slots[axis] = Dual64::new(k[axis], 0.0);
        }
        (self.energy(k), DVec3::from_array(gradient))
    }

    pub fn gradient(&self, k: DVec3) -> DVec3 {
        self.energy_and_gradient(k).1
    }

    /// Group velocity `∇E/ħ` in m/s.
    pub fn velocity(&self, k: DVec3) -> DVec3 {
        self.gradient(k) * VELOCITY_UNITS
    }

    pub fn energies(&self, kpoints: &[DVec3]) -> Vec<f64> {
        kpoints.iter().map(|&k| self.energy(k)).collect()
    }

    pub fn velocities(&self, kpoints: &[DVec3]) -> Vec<DVec3> {
        kpoints.iter().map(|&k| self.velocity(k)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn compile(source: &str, params: &[(&str, f64)]) -> Result<DispersionModel, DispersionError> {
        let params = params.iter().map(|(n, v)| (n.to_string(), *v)).collect();
        DispersionModel::compile(source, &SymbolNames::default(), [3.0, 3.0, 6.0], &params)
    }

    #[test]
    fn tight_binding_energy_and_velocity() {
        let model = compile("-2*t*(cos(kx*a) + cos(ky*b)) + tz*cos(kz*c)", &[("t", 100.0), ("tz", 5.0)])
            .unwrap();
        let k = DVec3::new(0.2, -0.1, 0.3);
        let expected = -200.0 * ((0.6_f64).cos() + (-0.3_f64).cos()) + 5.0 * (1.8_f64).cos();
        assert_relative_eq!(model.energy(k), expected, epsilon = 1e-10);

        let grad = model.gradient(k);
        assert_relative_eq!(grad.x, 600.0 * (0.6_f64).sin(), epsilon = 1e-10);
        assert_relative_eq!(grad.y, 600.0 * (-0.3_f64).sin(), epsilon = 1e-10);
        assert_relative_eq!(grad.z, -30.0 * (1.8_f64).sin(), epsilon = 1e-10);

        let v = model.velocity(k);
        assert_relative_eq!(v.x, grad.x * VELOCITY_UNITS, epsilon = 1e-6);
    }

    #[test]
    fn missing_wavevector_gives_zero_component() {
        let model = compile("1000*(kx**2 + ky**2)", &[]).unwrap();
        let (energy, grad) = model.energy_and_gradient(DVec3::new(0.1, 0.2, 0.7));
        assert_relative_eq!(energy, 50.0, epsilon = 1e-10);
        assert_eq!(grad.z, 0.0);
        assert_eq!(model.velocities(&[DVec3::ZERO, DVec3::X]).len(), 2);
    }

    #[test]
    fn constant_dispersion_has_zero_velocity() {
        let model = compile("42", &[]).unwrap();
        let (energy, grad) = model.energy_and_gradient(DVec3::ONE);
        assert_eq!(energy, 42.0);
        assert_eq!(grad, DVec3::ZERO);
    }

    #[test]
    fn reserved_names_are_rejected() {
        assert_eq!(
            compile("kx", &[("kx", 1.0)]).unwrap_err(),
            DispersionError::ReservedName("kx".into())
        );
        assert_eq!(
            compile("kx", &[("pi", 1.0)]).unwrap_err(),
            DispersionError::ReservedName("pi".into())
        );
        assert!(matches!(
            compile("kx + ", &[]),
            Err(DispersionError::Parse(ParseError::UnexpectedEnd))
        ));
    }
}
