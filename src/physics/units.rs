//! Physical constants (CODATA 2018, SI) and the unit conventions of the crate.
//!
//! Energies are in meV, wavevectors in Å⁻¹, lengths in Å, magnetic fields in
//! Tesla, rates and frequencies in THz. Conductivities come out in S/m.

pub const ELEMENTARY_CHARGE: f64 = 1.602176634e-19; // [C]
pub const HBAR: f64 = 1.054571817e-34; // [J s]
pub const ELECTRON_VOLT: f64 = ELEMENTARY_CHARGE; // [J]
pub const ANGSTROM: f64 = 1e-10; // [m]
pub const TERAHERTZ: f64 = 1e12; // [Hz]
pub const ELECTRON_MASS: f64 = 9.1093837015e-31; // [kg]

/// Conversion from an energy gradient in meV·Å to a group velocity in m/s.
pub const VELOCITY_UNITS: f64 = 1e-3 * ELECTRON_VOLT * ANGSTROM / HBAR;

/// Prefactor `e² / (4π³ħ)` of the Boltzmann conductivity integral.
pub fn conductivity_prefactor() -> f64 {
    ELEMENTARY_CHARGE * ELEMENTARY_CHARGE / (4.0 * std::f64::consts::PI.powi(3) * HBAR)
}

/// `ħ²/2mₑ` in meV·Å², the coefficient of a free-electron dispersion.
pub fn free_electron_coefficient() -> f64 {
    HBAR * HBAR / (2.0 * ELECTRON_MASS) / (1e-3 * ELECTRON_VOLT) / (ANGSTROM * ANGSTROM)
}

/// Coupling `e/ħ` of the magnetic field to the k-space drift term.
pub fn field_coupling() -> f64 {
    ELEMENTARY_CHARGE / HBAR
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn velocity_units_match_free_electron_scale() {
        // 1 meV·Å gradient is roughly 152 m/s
        assert_relative_eq!(VELOCITY_UNITS, 151.926745, max_relative = 1e-6);
    }

    #[test]
    fn free_electron_coefficient_in_mev_square_angstrom() {
        assert_relative_eq!(free_electron_coefficient(), 3809.98, max_relative = 1e-5);
    }
}
