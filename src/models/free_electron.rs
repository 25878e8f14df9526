use crate::physics::units::{
    free_electron_coefficient, ANGSTROM, ELEMENTARY_CHARGE, HBAR, TERAHERTZ, VELOCITY_UNITS,
};
use crate::physics::{BandConfig, BandError, BandStructure};

/// Isotropic parabolic band `E = c |k|²` and its analytic transport scales.
#[derive(Debug, Clone)]
pub struct FreeElectronParams {
    pub coefficient: f64,       // [meV Å^2] ħ²/2m*
    pub fermi_wavevector: f64,  // [Å^-1]
    pub fermi_energy: f64,      // [meV]
    pub fermi_velocity: f64,    // [m/s]
    pub lattice_constant: f64,  // [Å] cubic cell, large enough to hold the sphere
    pub effective_mass: f64,    // [m_e]
}

impl FreeElectronParams {
    /// Drude conductivity `e²τ k_F² v_F / (3π²ħ)` in S/m for a rate in THz.
    pub fn drude_conductivity(&self, scattering_rate: f64) -> f64 {
        let tau = 1.0 / (scattering_rate * TERAHERTZ);
        let kf = self.fermi_wavevector / ANGSTROM;
        ELEMENTARY_CHARGE * ELEMENTARY_CHARGE * tau * kf * kf * self.fermi_velocity
            / (3.0 * std::f64::consts::PI.powi(2) * HBAR)
    }

    /// Cyclotron frequency `eB v_F / (ħ k_F)` in rad/s.
    pub fn cyclotron_frequency(&self, field: f64) -> f64 {
        ELEMENTARY_CHARGE * field * self.fermi_velocity
            / (HBAR * self.fermi_wavevector / ANGSTROM)
    }

    /// Drude-model `(σ_xx, σ_xy)` with the field along z.
    pub fn drude_in_field(&self, scattering_rate: f64, field: f64) -> (f64, f64) {
        let sigma0 = self.drude_conductivity(scattering_rate);
        let wct = self.cyclotron_frequency(field) / (scattering_rate * TERAHERTZ);
        let denom = 1.0 + wct * wct;
        (sigma0 / denom, -sigma0 * wct / denom)
    }
}

/// Spherical Fermi surface of radius `fermi_wavevector` for a band with
/// effective mass `effective_mass` (in units of the electron mass).
pub fn free_electron_problem_def(
    fermi_wavevector: f64,
    effective_mass: f64,
    resolution: usize,
    logging: bool,
) -> Result<(BandStructure, FreeElectronParams), BandError> {
    let coefficient = free_electron_coefficient() / effective_mass;
    let fermi_energy = coefficient * fermi_wavevector * fermi_wavevector;
    let fermi_velocity = 2.0 * coefficient * fermi_wavevector * VELOCITY_UNITS;
    // sphere diameter spans 60% of the zone
    let lattice_constant = 0.6 * std::f64::consts::PI / fermi_wavevector;

    if logging {
        println!("--- Free electron band ---");
        println!("Fermi wavevector: {:.4} 1/Å", fermi_wavevector);
        println!("Fermi energy:     {:.2} meV", fermi_energy);
        println!("Fermi velocity:   {:.4e} m/s", fermi_velocity);
        println!("Lattice constant: {:.4} Å", lattice_constant);
        println!("--------------------------\n");
    }

    let band = BandStructure::new(
        BandConfig::new(
            "coef*(kx**2 + ky**2 + kz**2)",
            fermi_energy,
            [lattice_constant; 3],
        )
        .with_bandparam("coef", coefficient)
        .with_resolution(resolution),
    )?;

    let params = FreeElectronParams {
        coefficient,
        fermi_wavevector,
        fermi_energy,
        fermi_velocity,
        lattice_constant,
        effective_mass,
    };
    Ok((band, params))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::DVec3;

    #[test]
    fn preset_builds_with_default_symbol_names() {
        let (band, params) = free_electron_problem_def(0.6, 1.5, 12, false)
            .expect("free electron preset must not collide with axis names");
        assert_eq!(band.bandparams().get("coef"), Some(&params.coefficient));
        assert_relative_eq!(params.coefficient * 1.5, free_electron_coefficient(), max_relative = 1e-12);
        assert_eq!(band.resolution(), crate::physics::Resolution::Uniform(12));
        assert_eq!(band.unit_cell(), [params.lattice_constant; 3]);
        assert!(band.mesh().is_empty());
    }

    #[test]
    fn fermi_velocity_matches_the_dispersion() {
        let (band, params) = free_electron_problem_def(0.6, 1.0, 8, false).unwrap();
        let k = DVec3::new(0.0, params.fermi_wavevector, 0.0);
        assert_relative_eq!(band.energy(k), params.fermi_energy, max_relative = 1e-12);
        assert_relative_eq!(band.velocity(k).length(), params.fermi_velocity, max_relative = 1e-12);
        // v_F = ħk_F/m
        let expected = HBAR * 0.6 / ANGSTROM / crate::physics::units::ELECTRON_MASS;
        assert_relative_eq!(params.fermi_velocity, expected, max_relative = 1e-6);
    }

    #[test]
    fn drude_limits() {
        let (_, params) = free_electron_problem_def(0.6, 2.0, 8, false).unwrap();
        let (sxx, sxy) = params.drude_in_field(1.0, 0.0);
        assert_relative_eq!(sxx, params.drude_conductivity(1.0));
        assert_eq!(sxy, 0.0);
        // σ_xx is halved when ω_c τ = 1
        let field = 1e12 / params.cyclotron_frequency(1.0);
        let (sxx, sxy) = params.drude_in_field(1.0, field);
        assert_relative_eq!(sxx, 0.5 * params.drude_conductivity(1.0), max_relative = 1e-12);
        assert_relative_eq!(sxy, -sxx, max_relative = 1e-12);
    }
}
