use std::collections::HashMap;
use std::f64::consts::PI;

use glam::DVec3;
use log::{debug, info, warn};
use thiserror::Error;

use super::dispersion::{DispersionError, DispersionModel, SymbolNames};
use super::expression::ParseError;
use crate::discretization::isosurface::{extract_isosurface, ScalarGrid};
use crate::discretization::mesh::FermiSurfaceMesh;
use crate::discretization::stitch::{stitch_periodic_boundaries, wrap_difference};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BandError {
    #[error("could not parse dispersion: {0}")]
    Parse(#[from] ParseError),
    #[error("name '{0}' is reserved or used twice")]
    ReservedName(String),
    #[error("unit cell lengths must be finite and positive, got {0:?}")]
    InvalidUnitCell([f64; 3]),
    #[error("resolution must be at least 2 along every axis, got {0:?}")]
    InvalidResolution([usize; 3]),
    #[error("atoms per cell must be at least 1")]
    InvalidAtomsPerCell,
    #[error("mesh tolerances must be finite, with a positive stitch threshold, got {0:?}")]
    InvalidTolerances(MeshTolerances),
    #[error("dispersion is not finite at k = {0:?}")]
    NonFiniteEnergy([f64; 3]),
}

impl From<DispersionError> for BandError {
    fn from(err: DispersionError) -> Self {
        match err {
            DispersionError::Parse(e) => BandError::Parse(e),
            DispersionError::ReservedName(name) => BandError::ReservedName(name),
        }
    }
}

/// Number of grid points per axis used to sample the dispersion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Uniform(usize),
    PerAxis([usize; 3]),
}

impl Resolution {
    pub fn per_axis(&self) -> [usize; 3] {
        match *self {
            Resolution::Uniform(r) => [r; 3],
            Resolution::PerAxis(r) => r,
        }
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Resolution::Uniform(20)
    }
}

impl From<usize> for Resolution {
    fn from(r: usize) -> Self {
        Resolution::Uniform(r)
    }
}

impl From<[usize; 3]> for Resolution {
    fn from(r: [usize; 3]) -> Self {
        Resolution::PerAxis(r)
    }
}

/// Tolerances of the surface construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshTolerances {
    /// Fraction of a voxel within which two boundary points are the same point.
    pub stitch_threshold: f64,
    /// Vertices with `|∇E|²` below this (meV²·Å²) are not moved by the Newton step.
    pub min_gradient_norm_sq: f64,
}

impl Default for MeshTolerances {
    fn default() -> Self {
        Self {
            stitch_threshold: 1e-5,
            min_gradient_norm_sq: 1e-24,
        }
    }
}

/// Construction parameters of a [`BandStructure`].
///
/// Energies are in meV and lengths in Å. The dispersion is written in terms
/// of the wavevector names, the axis names (bound to `unit_cell`) and the
/// keys of `bandparams`.
#[derive(Debug, Clone)]
pub struct BandConfig {
    pub dispersion: String,
    pub chemical_potential: f64,
    pub unit_cell: [f64; 3],
    pub atoms_per_cell: usize,
    pub bandparams: HashMap<String, f64>,
    pub axis_names: [String; 3],
    pub wavevector_names: [String; 3],
    pub resolution: Resolution,
    pub ncorrect: usize,
    pub tolerances: MeshTolerances,
}

impl Default for BandConfig {
    fn default() -> Self {
        let names = SymbolNames::default();
        Self {
            dispersion: String::new(),
            chemical_potential: 0.0,
            unit_cell: [1.0; 3],
            atoms_per_cell: 1,
            bandparams: HashMap::new(),
            axis_names: names.axis,
            wavevector_names: names.wavevector,
            resolution: Resolution::default(),
            ncorrect: 2,
            tolerances: MeshTolerances::default(),
        }
    }
}

impl BandConfig {
    pub fn new(dispersion: impl Into<String>, chemical_potential: f64, unit_cell: [f64; 3]) -> Self {
        Self {
            dispersion: dispersion.into(),
            chemical_potential,
            unit_cell,
            ..Default::default()
        }
    }

    pub fn with_bandparam(mut self, name: impl Into<String>, value: f64) -> Self {
        self.bandparams.insert(name.into(), value);
        self
    }

    pub fn with_resolution(mut self, resolution: impl Into<Resolution>) -> Self {
        self.resolution = resolution.into();
        self
    }

    pub fn with_correction_steps(mut self, ncorrect: usize) -> Self {
        self.ncorrect = ncorrect;
        self
    }

    pub fn with_atoms_per_cell(mut self, atoms_per_cell: usize) -> Self {
        self.atoms_per_cell = atoms_per_cell;
        self
    }

    pub fn with_tolerances(mut self, tolerances: MeshTolerances) -> Self {
        self.tolerances = tolerances;
        self
    }
}

/// Outcome of one Newton pass over the surface vertices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrectionPass {
    /// Largest `|E - μ|` before the pass.
    pub max_residual: f64,
    /// Vertices left in place because their gradient vanished.
    pub skipped: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscretizationReport {
    pub grid_shape: [usize; 3],
    pub raw_points: usize,
    pub periodic_points: usize,
    pub faces: usize,
    pub corrections: Vec<CorrectionPass>,
    /// Largest `|E - μ|` after all passes.
    pub final_residual: f64,
}

/// A single electronic band and its discretized Fermi surface.
///
/// Every setter bumps [`generation`](Self::generation); the ones that change
/// the surface also drop the mesh so that it is rebuilt by the next
/// [`discretize`](Self::discretize).
#[derive(Debug, Clone)]
pub struct BandStructure {
    dispersion: String,
    chemical_potential: f64,
    unit_cell: [f64; 3],
    atoms_per_cell: usize,
    bandparams: HashMap<String, f64>,
    names: SymbolNames,
    resolution: Resolution,
    ncorrect: usize,
    tolerances: MeshTolerances,
    model: DispersionModel,
    mesh: FermiSurfaceMesh,
    generation: u64,
}

impl BandStructure {
    pub fn new(config: BandConfig) -> Result<Self, BandError> {
        validate_unit_cell(config.unit_cell)?;
        validate_resolution(config.resolution)?;
        validate_tolerances(config.tolerances)?;
        if config.atoms_per_cell == 0 {
            return Err(BandError::InvalidAtomsPerCell);
        }

        let names = SymbolNames {
            wavevector: config.wavevector_names,
            axis: config.axis_names,
        };
        let model = DispersionModel::compile(
            &config.dispersion,
            &names,
            config.unit_cell,
            &config.bandparams,
        )?;

        Ok(Self {
            dispersion: config.dispersion,
            chemical_potential: config.chemical_potential,
            unit_cell: config.unit_cell,
            atoms_per_cell: config.atoms_per_cell,
            bandparams: config.bandparams,
            names,
            resolution: config.resolution,
            ncorrect: config.ncorrect,
            tolerances: config.tolerances,
            model,
            mesh: FermiSurfaceMesh::default(),
            generation: 0,
        })
    }

    pub fn dispersion(&self) -> &str {
        &self.dispersion
    }

    pub fn chemical_potential(&self) -> f64 {
        self.chemical_potential
    }

    pub fn unit_cell(&self) -> [f64; 3] {
        self.unit_cell
    }

    pub fn atoms_per_cell(&self) -> usize {
        self.atoms_per_cell
    }

    pub fn bandparams(&self) -> &HashMap<String, f64> {
        &self.bandparams
    }

    pub fn symbol_names(&self) -> &SymbolNames {
        &self.names
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn correction_steps(&self) -> usize {
        self.ncorrect
    }

    pub fn tolerances(&self) -> MeshTolerances {
        self.tolerances
    }

    pub fn model(&self) -> &DispersionModel {
        &self.model
    }

    pub fn mesh(&self) -> &FermiSurfaceMesh {
        &self.mesh
    }

    /// Counter bumped on every state change; downstream caches compare it.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Half the reciprocal lattice vector lengths, `π/a` per axis (Å⁻¹).
    pub fn gvec(&self) -> DVec3 {
        DVec3::from_array(self.unit_cell.map(|a| PI / a))
    }

    pub fn set_dispersion(&mut self, dispersion: impl Into<String>) -> Result<(), BandError> {
        let dispersion = dispersion.into();
        self.model = compile_model(&dispersion, &self.names, self.unit_cell, &self.bandparams)?;
        self.dispersion = dispersion;
        self.invalidate_mesh();
        Ok(())
    }

    pub fn set_bandparams(&mut self, bandparams: HashMap<String, f64>) -> Result<(), BandError> {
        self.model = compile_model(&self.dispersion, &self.names, self.unit_cell, &bandparams)?;
        self.bandparams = bandparams;
        self.invalidate_mesh();
        Ok(())
    }

    pub fn set_bandparam(&mut self, name: &str, value: f64) -> Result<(), BandError> {
        let mut bandparams = self.bandparams.clone();
        bandparams.insert(name.to_string(), value);
        self.set_bandparams(bandparams)
    }

    pub fn set_symbol_names(&mut self, names: SymbolNames) -> Result<(), BandError> {
        self.model = compile_model(&self.dispersion, &names, self.unit_cell, &self.bandparams)?;
        self.names = names;
        self.invalidate_mesh();
        Ok(())
    }

    pub fn set_unit_cell(&mut self, unit_cell: [f64; 3]) -> Result<(), BandError> {
        validate_unit_cell(unit_cell)?;
        self.model = compile_model(&self.dispersion, &self.names, unit_cell, &self.bandparams)?;
        self.unit_cell = unit_cell;
        self.invalidate_mesh();
        Ok(())
    }

    pub fn set_chemical_potential(&mut self, chemical_potential: f64) {
        self.chemical_potential = chemical_potential;
        self.invalidate_mesh();
    }

    pub fn set_resolution(&mut self, resolution: impl Into<Resolution>) -> Result<(), BandError> {
        let resolution = resolution.into();
        validate_resolution(resolution)?;
        self.resolution = resolution;
        self.invalidate_mesh();
        Ok(())
    }

    /// Takes effect at the next `discretize()`; the current mesh is kept.
    pub fn set_correction_steps(&mut self, ncorrect: usize) {
        self.ncorrect = ncorrect;
        self.generation += 1;
    }

    pub fn set_atoms_per_cell(&mut self, atoms_per_cell: usize) -> Result<(), BandError> {
        if atoms_per_cell == 0 {
            return Err(BandError::InvalidAtomsPerCell);
        }
        self.atoms_per_cell = atoms_per_cell;
        self.generation += 1;
        Ok(())
    }

    pub fn set_tolerances(&mut self, tolerances: MeshTolerances) -> Result<(), BandError> {
        validate_tolerances(tolerances)?;
        self.tolerances = tolerances;
        self.invalidate_mesh();
        Ok(())
    }

    fn invalidate_mesh(&mut self) {
        self.mesh = FermiSurfaceMesh::default();
        self.generation += 1;
    }

    /// Triangulate the Fermi surface `E(k) = μ` inside the first Brillouin zone.
    ///
    /// The energy is sampled on a grid spanning `[-π/a, π/a]` per axis, the
    /// isosurface is extracted, its vertices are polished by Newton steps and
    /// finally the boundary points shared between periodic images are merged.
    pub fn discretize(&mut self) -> Result<DiscretizationReport, BandError> {
        let gvec = self.gvec();
        let configured = self.resolution.per_axis();
        let voxel_size = DVec3::from_array(configured.map(|r| 2.0 / (r - 1) as f64)) * gvec;
        // even point counts keep the grid symmetric about the zone centre
        let shape = configured.map(|r| r + r % 2);

        let grid = ScalarGrid::sample(shape, -gvec, gvec, |k| self.model.energy(k));
        if let Some(i) = grid.values.iter().position(|e| !e.is_finite()) {
            let [nx, ny, nz] = shape;
            let index = [i / (ny * nz), (i / nz) % ny, i % nz];
            let k: [f64; 3] = std::array::from_fn(|a| {
                -gvec[a] + 2.0 * gvec[a] * index[a] as f64 / (shape[a] - 1) as f64
            });
            return Err(BandError::NonFiniteEnergy(k));
        }

        let raw = extract_isosurface(&grid, self.chemical_potential);
        let scale = DVec3::from_array(shape.map(|r| 2.0 / (r - 1) as f64)) * gvec;
        let mut kpoints: Vec<DVec3> = raw.vertices.iter().map(|v| *v * scale - gvec).collect();

        let mut report = DiscretizationReport {
            grid_shape: shape,
            raw_points: kpoints.len(),
            faces: raw.faces.len(),
            ..Default::default()
        };

        if kpoints.is_empty() {
            warn!(
                "chemical potential {} meV does not cross the band; Fermi surface is empty",
                self.chemical_potential
            );
            self.mesh = FermiSurfaceMesh::default();
            self.generation += 1;
            return Ok(report);
        }

        for pass in 0..self.ncorrect {
            let outcome = newton_correct(
                &self.model,
                &mut kpoints,
                self.chemical_potential,
                self.tolerances.min_gradient_norm_sq,
            );
            if outcome.skipped > 0 {
                debug!(
                    "newton pass {pass}: {} vertices with vanishing gradient left in place",
                    outcome.skipped
                );
            }
            report.corrections.push(outcome);
        }
        report.final_residual = max_residual(&self.model, &kpoints, self.chemical_potential);

        let periodic = stitch_periodic_boundaries(
            &kpoints,
            &raw.faces,
            gvec,
            voxel_size,
            self.tolerances.stitch_threshold,
        );
        report.periodic_points = periodic.kpoints.len();

        info!(
            "discretized Fermi surface: {} points ({} periodic), {} faces, residual {:.3e} meV",
            report.raw_points, report.periodic_points, report.faces, report.final_residual
        );

        self.mesh = FermiSurfaceMesh {
            kpoints,
            kfaces: raw.faces,
            kpoints_periodic: periodic.kpoints,
            kfaces_periodic: periodic.kfaces,
        };
        self.generation += 1;
        Ok(report)
    }

    /// `k2 - k1` with the periodic boundary conditions of the zone applied;
    /// every component lies in `[-π/a, π/a)`.
    pub fn periodic_distance(&self, k1: DVec3, k2: DVec3) -> DVec3 {
        wrap_difference(k1, k2, self.gvec())
    }

    /// Element-wise [`periodic_distance`](Self::periodic_distance) of two point lists.
    pub fn periodic_distances(&self, k1: &[DVec3], k2: &[DVec3]) -> Vec<DVec3> {
        let gvec = self.gvec();
        k1.iter()
            .zip(k2)
            .map(|(&a, &b)| wrap_difference(a, b, gvec))
            .collect()
    }

    /// Effective mass in units of the electron rest mass. Not implemented; always `0.0`.
    pub fn calculate_mass(&self) -> f64 {
        0.0
    }

    pub fn energy(&self, k: DVec3) -> f64 {
        self.model.energy(k)
    }

    pub fn velocity(&self, k: DVec3) -> DVec3 {
        self.model.velocity(k)
    }

    pub fn energies(&self, kpoints: &[DVec3]) -> Vec<f64> {
        self.model.energies(kpoints)
    }

    pub fn velocities(&self, kpoints: &[DVec3]) -> Vec<DVec3> {
        self.model.velocities(kpoints)
    }
}

fn compile_model(
    dispersion: &str,
    names: &SymbolNames,
    unit_cell: [f64; 3],
    bandparams: &HashMap<String, f64>,
) -> Result<DispersionModel, BandError> {
    Ok(DispersionModel::compile(dispersion, names, unit_cell, bandparams)?)
}

fn validate_unit_cell(unit_cell: [f64; 3]) -> Result<(), BandError> {
    if unit_cell.iter().all(|a| a.is_finite() && *a > 0.0) {
        Ok(())
    } else {
        Err(BandError::InvalidUnitCell(unit_cell))
    }
}

fn validate_resolution(resolution: Resolution) -> Result<(), BandError> {
    let r = resolution.per_axis();
    if r.iter().all(|&n| n >= 2) {
        Ok(())
    } else {
        Err(BandError::InvalidResolution(r))
    }
}

fn validate_tolerances(tolerances: MeshTolerances) -> Result<(), BandError> {
    let MeshTolerances {
        stitch_threshold,
        min_gradient_norm_sq,
    } = tolerances;
    if stitch_threshold.is_finite()
        && stitch_threshold > 0.0
        && min_gradient_norm_sq.is_finite()
        && min_gradient_norm_sq >= 0.0
    {
        Ok(())
    } else {
        Err(BandError::InvalidTolerances(tolerances))
    }
}

/// One Newton step `k ← k - (E(k) - μ) ∇E / |∇E|²` on every vertex.
fn newton_correct(
    model: &DispersionModel,
    kpoints: &mut [DVec3],
    chemical_potential: f64,
    min_gradient_norm_sq: f64,
) -> CorrectionPass {
    let mut pass = CorrectionPass {
        max_residual: 0.0,
        skipped: 0,
    };
    for k in kpoints.iter_mut() {
        let (energy, gradient) = model.energy_and_gradient(*k);
        let residual = energy - chemical_potential;
        pass.max_residual = pass.max_residual.max(residual.abs());

        let norm_sq = gradient.length_squared();
        if !residual.is_finite() || !norm_sq.is_finite() || norm_sq < min_gradient_norm_sq {
            pass.skipped += 1;
            continue;
        }
        *k -= gradient * (residual / norm_sq);
    }
    pass
}

fn max_residual(model: &DispersionModel, kpoints: &[DVec3], chemical_potential: f64) -> f64 {
    kpoints
        .iter()
        .map(|&k| (model.energy(k) - chemical_potential).abs())
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sphere(resolution: usize) -> BandStructure {
        BandStructure::new(
            BandConfig::new("coef*(kx**2 + ky**2 + kz**2)", 360.0, [3.0; 3])
                .with_bandparam("coef", 1000.0)
                .with_resolution(resolution),
        )
        .unwrap()
    }

    #[test]
    fn construction_validates_parameters() {
        let cfg = |cell: [f64; 3]| BandConfig::new("kx", 0.0, cell);
        assert!(matches!(
            BandStructure::new(cfg([0.0, 1.0, 1.0])),
            Err(BandError::InvalidUnitCell(_))
        ));
        assert!(matches!(
            BandStructure::new(cfg([1.0, f64::NAN, 1.0])),
            Err(BandError::InvalidUnitCell(_))
        ));
        assert_eq!(
            BandStructure::new(cfg([1.0; 3]).with_resolution([2, 1, 4])).unwrap_err(),
            BandError::InvalidResolution([2, 1, 4])
        );
        assert_eq!(
            BandStructure::new(cfg([1.0; 3]).with_atoms_per_cell(0)).unwrap_err(),
            BandError::InvalidAtomsPerCell
        );
        assert!(matches!(
            BandStructure::new(BandConfig::new("kx *", 0.0, [1.0; 3])),
            Err(BandError::Parse(_))
        ));
        assert_eq!(
            BandStructure::new(cfg([1.0; 3]).with_bandparam("a", 2.0)).unwrap_err(),
            BandError::ReservedName("a".into())
        );
    }

    #[test]
    fn failed_reassignment_keeps_previous_state() {
        let mut band = sphere(10);
        band.discretize().unwrap();
        let generation = band.generation();

        assert!(band.set_dispersion("kx +").is_err());
        assert!(band.set_bandparam("kx", 1.0).is_err());
        assert_eq!(band.dispersion(), "coef*(kx**2 + ky**2 + kz**2)");
        assert_eq!(band.generation(), generation);
        assert!(!band.mesh().is_empty());
    }

    #[test]
    fn surface_setters_clear_the_mesh() {
        let mut band = sphere(10);
        band.discretize().unwrap();
        band.set_chemical_potential(250.0);
        assert!(band.mesh().is_empty());

        band.discretize().unwrap();
        let generation = band.generation();
        band.set_correction_steps(3);
        assert!(!band.mesh().is_empty());
        assert!(band.generation() > generation);

        band.set_bandparam("coef", 900.0).unwrap();
        assert!(band.mesh().is_empty());
    }

    #[test]
    fn sphere_is_polished_onto_the_fermi_level() {
        let mut band = sphere(16);
        let report = band.discretize().unwrap();

        assert_eq!(report.grid_shape, [16; 3]);
        assert_eq!(report.corrections.len(), 2);
        assert!(report.final_residual < report.corrections[0].max_residual);
        assert!(report.final_residual < 1e-3);

        // a closed sphere inside the zone has no boundary duplicates
        let mesh = band.mesh();
        assert_eq!(mesh.kpoints.len(), mesh.kpoints_periodic.len());
        for k in &mesh.kpoints {
            assert_relative_eq!(k.length(), 0.6, epsilon = 1e-6);
        }
        assert!(mesh.is_consistent());
    }

    #[test]
    fn odd_resolution_is_made_even() {
        let mut band = sphere(9);
        let report = band.discretize().unwrap();
        assert_eq!(report.grid_shape, [10; 3]);
    }

    #[test]
    fn band_outside_chemical_potential_gives_empty_mesh() {
        let mut band = sphere(8);
        band.set_chemical_potential(-10.0);
        let report = band.discretize().unwrap();
        assert_eq!(report.raw_points, 0);
        assert!(band.mesh().is_empty());
    }

    #[test]
    fn non_finite_dispersion_is_reported() {
        let mut band = BandStructure::new(
            BandConfig::new("log(kx - 10)", 1.0, [1.0; 3]).with_resolution(4),
        )
        .unwrap();
        assert!(matches!(band.discretize(), Err(BandError::NonFiniteEnergy(_))));
    }

    #[test]
    fn periodic_distance_wraps_into_the_zone() {
        let band = sphere(4);
        let g = PI / 3.0;
        let d = band.periodic_distance(DVec3::new(-0.9 * g, 0.0, 0.0), DVec3::new(0.9 * g, 0.0, 0.0));
        assert_relative_eq!(d.x, -0.2 * g, epsilon = 1e-12);
        assert_eq!(band.periodic_distance(DVec3::ONE, DVec3::ONE), DVec3::ZERO);

        let a = [DVec3::new(0.1, 0.2, 0.3), DVec3::new(-1.0, 0.5, 0.9)];
        let b = [DVec3::new(0.9, -0.8, 0.0), DVec3::new(1.0, -0.5, -0.9)];
        for (d, (&a, &b)) in band.periodic_distances(&a, &b).iter().zip(a.iter().zip(&b)) {
            let back = band.periodic_distance(b, a);
            for axis in 0..3 {
                assert!(d[axis].abs() <= g + 1e-12);
                if d[axis].abs() < g - 1e-12 {
                    assert_relative_eq!(d[axis], -back[axis], epsilon = 1e-12);
                }
            }
        }
    }

    #[test]
    fn tolerances_are_validated() {
        let bad = |stitch_threshold, min_gradient_norm_sq| MeshTolerances {
            stitch_threshold,
            min_gradient_norm_sq,
        };
        for tolerances in [
            bad(0.0, 1e-24),
            bad(-1e-5, 1e-24),
            bad(f64::NAN, 1e-24),
            bad(1e-5, f64::INFINITY),
            bad(1e-5, -1.0),
        ] {
            let config = BandConfig::new("kx", 0.0, [1.0; 3]).with_tolerances(tolerances);
            assert!(matches!(
                BandStructure::new(config),
                Err(BandError::InvalidTolerances(_))
            ));
        }

        let mut band = sphere(8);
        band.discretize().unwrap();
        let generation = band.generation();
        assert!(band.set_tolerances(bad(0.0, 1e-24)).is_err());
        assert_eq!(band.tolerances(), MeshTolerances::default());
        assert_eq!(band.generation(), generation);
        assert!(!band.mesh().is_empty());

        band.set_tolerances(bad(1e-4, 0.0)).unwrap();
        assert!(band.mesh().is_empty());
    }

    #[test]
    fn newton_passes_improve_almost_every_vertex() {
        let mut band = sphere(14);
        band.set_correction_steps(0);
        band.discretize().unwrap();
        let raw = band.energies(&band.mesh().kpoints);

        band.set_correction_steps(2);
        band.discretize().unwrap();
        let polished = band.energies(&band.mesh().kpoints);
        assert_eq!(raw.len(), polished.len());

        let mu = band.chemical_potential();
        let improved = raw
            .iter()
            .zip(&polished)
            .filter(|(r, p)| (*p - mu).abs() < (*r - mu).abs())
            .count();
        assert!(improved as f64 >= 0.99 * raw.len() as f64);
    }

    #[test]
    fn effective_mass_is_a_stub() {
        assert_eq!(sphere(4).calculate_mass(), 0.0);
    }
}
