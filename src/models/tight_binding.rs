use glam::DVec3;

use crate::physics::{BandConfig, BandError, BandStructure, Resolution};

/// Single-band tight-binding model of a layered tetragonal cuprate.
///
/// In-plane hoppings up to third neighbours plus an interlayer hopping whose
/// `(cos kx a - cos ky b)²` form factor vanishes on the zone diagonals.
pub const TIGHT_BINDING_DISPERSION: &str = "-2*t*(cos(kx*a) + cos(ky*b)) \
     - 4*tp*cos(kx*a)*cos(ky*b) \
     - 2*tpp*(cos(2*kx*a) + cos(2*ky*b)) \
     - 2*tz*(cos(kx*a) - cos(ky*b))**2*cos(kz*c)";

#[derive(Debug, Clone)]
pub struct TightBindingParams {
    pub a: f64,   // [Å] in-plane lattice constant
    pub c: f64,   // [Å] out-of-plane lattice constant
    pub t: f64,   // [meV] nearest-neighbour hopping
    pub tp: f64,  // [meV] next-nearest-neighbour hopping
    pub tpp: f64, // [meV] third-neighbour hopping
    pub tz: f64,  // [meV] interlayer hopping
    pub mu: f64,  // [meV] chemical potential
    pub resolution: [usize; 3],
    pub atoms_per_cell: usize,
}

impl Default for TightBindingParams {
    fn default() -> Self {
        let t = 160.0;
        Self {
            a: 3.75,
            c: 13.2,
            t,
            tp: -0.136 * t,
            tpp: 0.068 * t,
            tz: 0.068 * t,
            mu: -0.824 * t,
            resolution: [21, 21, 7],
            atoms_per_cell: 2,
        }
    }
}

impl TightBindingParams {
    pub fn with_chemical_potential(mut self, mu: f64) -> Self {
        self.mu = mu;
        self
    }

    pub fn with_resolution(mut self, resolution: [usize; 3]) -> Self {
        self.resolution = resolution;
        self
    }

    /// Band energy at `k` (Å⁻¹) without going through the parser.
    pub fn energy(&self, k: DVec3) -> f64 {
        let (cx, cy) = ((k.x * self.a).cos(), (k.y * self.a).cos());
        let (cx2, cy2) = ((2.0 * k.x * self.a).cos(), (2.0 * k.y * self.a).cos());
        let interlayer = (cx - cy).powi(2) * (k.z * self.c).cos();
        -2.0 * self.t * (cx + cy)
            - 4.0 * self.tp * cx * cy
            - 2.0 * self.tpp * (cx2 + cy2)
            - 2.0 * self.tz * interlayer
    }
}

pub fn tight_binding_problem_def(
    params: &TightBindingParams,
    logging: bool,
) -> Result<BandStructure, BandError> {
    if logging {
        let zone_corner = DVec3::new(
            std::f64::consts::PI / params.a,
            std::f64::consts::PI / params.a,
            0.0,
        );
        println!("--- Tight-binding band ---");
        println!("Hoppings: t = {:.2}, t' = {:.2}, t'' = {:.2}, tz = {:.2} meV", params.t, params.tp, params.tpp, params.tz);
        println!("Chemical potential: {:.2} meV", params.mu);
        println!("E(Γ) = {:.2} meV, E(M) = {:.2} meV", params.energy(DVec3::ZERO), params.energy(zone_corner));
        println!("Lattice: a = {:.3} Å, c = {:.3} Å", params.a, params.c);
        println!("--------------------------\n");
    }

    BandStructure::new(
        BandConfig::new(TIGHT_BINDING_DISPERSION, params.mu, [params.a, params.a, params.c])
            .with_bandparam("t", params.t)
            .with_bandparam("tp", params.tp)
            .with_bandparam("tpp", params.tpp)
            .with_bandparam("tz", params.tz)
            .with_resolution(Resolution::PerAxis(params.resolution))
            .with_atoms_per_cell(params.atoms_per_cell),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn parsed_dispersion_matches_closed_form() {
        let params = TightBindingParams::default();
        let band = tight_binding_problem_def(&params, false).unwrap();
        for k in [
            DVec3::ZERO,
            DVec3::new(0.3, -0.5, 0.1),
            DVec3::new(0.8, 0.2, -0.2),
        ] {
            assert_relative_eq!(band.energy(k), params.energy(k), epsilon = 1e-9);
        }
        assert_eq!(band.atoms_per_cell(), 2);
        assert_eq!(band.unit_cell(), [3.75, 3.75, 13.2]);
    }

    #[test]
    fn default_filling_crosses_the_band() {
        let params = TightBindingParams::default();
        let corner = DVec3::new(std::f64::consts::PI / params.a, std::f64::consts::PI / params.a, 0.0);
        assert!(params.energy(DVec3::ZERO) < params.mu);
        assert!(params.energy(corner) > params.mu);
    }
}
