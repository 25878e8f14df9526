//! Conductivity tensor from the linearized Boltzmann equation on the Fermi surface.
//!
//! Solving for the tensor column `b` means solving `A x = P[:, b]` with the
//! differential operator `A = Γ - (e/ħ)D(B)` and the velocity projections
//! `P`; the entry `σ_ab` is then `e²/(4π³ħ) P[:, a]·x`. The assembled pieces
//! are kept in layers (elements, scattering, derivative term, operator and
//! solutions) so that changing one input only rebuilds what depends on it.

use glam::DVec3;
use log::debug;
use nalgebra::{DMatrix, Matrix3};
use num_complex::Complex64;

use super::cache::{CacheStats, SolutionCache};
use super::elements::ElementArrays;
use super::operator::{derivative_term, differential_operator, FieldChange, FieldState};
use super::scattering::{IntoKernelFn, IntoScatteringRate, KernelFn, ScatteringRate, ScatteringState};
use super::{FemScalar, TransportError};
use crate::numerics::banded::BandedMatrix;
use crate::numerics::solver::solve_cyclic_banded;
use crate::numerics::timing::{record_solve, record_stage, Stage};
use crate::physics::units::conductivity_prefactor;
use crate::physics::BandStructure;

/// Selection of tensor rows or columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Components {
    #[default]
    All,
    One(usize),
    List(Vec<usize>),
}

impl Components {
    pub fn axes(&self) -> Result<Vec<usize>, TransportError> {
        let axes = match self {
            Components::All => vec![0, 1, 2],
            Components::One(axis) => vec![*axis],
            Components::List(axes) => axes.clone(),
        };
        match axes.iter().find(|&&axis| axis > 2) {
            Some(&axis) => Err(TransportError::InvalidComponent(axis)),
            None => Ok(axes),
        }
    }
}

impl From<usize> for Components {
    fn from(axis: usize) -> Self {
        Components::One(axis)
    }
}

impl From<Vec<usize>> for Components {
    fn from(axes: Vec<usize>) -> Self {
        Components::List(axes)
    }
}

impl From<&[usize]> for Components {
    fn from(axes: &[usize]) -> Self {
        Components::List(axes.to_vec())
    }
}

impl<const N: usize> From<[usize; N]> for Components {
    fn from(axes: [usize; N]) -> Self {
        Components::List(axes.to_vec())
    }
}

/// Field- and scattering-dependent layers for one scalar type.
struct Layers<T: FemScalar> {
    scattering: Option<ScatteringState<T>>,
    operator: Option<BandedMatrix<T>>,
    solutions: SolutionCache<T>,
}

impl<T: FemScalar> Default for Layers<T> {
    fn default() -> Self {
        Self {
            scattering: None,
            operator: None,
            solutions: SolutionCache::default(),
        }
    }
}

impl<T: FemScalar> Layers<T> {
    fn clear_operator(&mut self) {
        self.operator = None;
        self.solutions.clear();
    }

    fn clear_scattering(&mut self) {
        self.scattering = None;
        self.clear_operator();
    }

    /// Rebuild an existing operator after the derivative term changed.
    fn refresh_operator(&mut self, term: &BandedMatrix<f64>, stats: &mut CacheStats) {
        if self.operator.is_none() {
            return;
        }
        self.solutions.clear();
        self.operator = self
            .scattering
            .as_ref()
            .map(|s| differential_operator(&s.out_scattering, term));
        if self.operator.is_some() {
            stats.operator_builds += 1;
        }
    }

    fn solve(
        &mut self,
        inputs: &SolveInputs<'_>,
        rows: &[usize],
        cols: &[usize],
        stats: &mut CacheStats,
    ) -> Result<DMatrix<Complex64>, TransportError> {
        let elements = inputs.elements;
        let mesh = inputs.band.mesh();

        if self.scattering.is_none() {
            let state = record_stage(Stage::Scattering, || {
                ScatteringState::build(
                    elements,
                    &mesh.kpoints_periodic,
                    &mesh.kfaces_periodic,
                    inputs.rate,
                    inputs.kernel,
                    inputs.frequency,
                )
            })?;
            stats.scattering_builds += 1;
            debug!("built out-scattering matrix");
            self.scattering = Some(state);
            self.operator = None;
        }

        let operator = match (self.operator.take(), &self.scattering) {
            (Some(operator), _) => operator,
            (None, Some(scattering)) => {
                self.solutions.clear();
                stats.operator_builds += 1;
                record_stage(Stage::Operator, || {
                    differential_operator(&scattering.out_scattering, inputs.derivative_term)
                })
            }
            (None, None) => return Err(TransportError::MissingScattering),
        };
        let operator = self.operator.insert(operator);

        let missing = self.solutions.missing(cols);
        if !missing.is_empty() {
            debug!(
                "solving {} column(s) on {} points, bandwidth {}",
                missing.len(),
                operator.n(),
                operator.bandwidth()
            );
            let rhs = DMatrix::<T>::from_fn(operator.n(), missing.len(), |p, c| {
                T::from_real(elements.vhat_projections[(p, missing[c])])
            });
            let solution = record_solve(missing.len(), || solve_cyclic_banded(operator, &rhs))?;
            for (c, &axis) in missing.iter().enumerate() {
                self.solutions.insert(axis, solution.column(c).into_owned());
            }
            stats.solved_columns += missing.len();
        }

        let prefactor = conductivity_prefactor();
        let mut block = DMatrix::<Complex64>::zeros(rows.len(), cols.len());
        for (c, &col) in cols.iter().enumerate() {
            let Some(x) = self.solutions.get(col) else {
                continue;
            };
            for (r, &row) in rows.iter().enumerate() {
                let projection = elements.vhat_projections.column(row);
                let mut sum = T::zero();
                for (p, xp) in x.iter().enumerate() {
                    sum += T::from_real(projection[p]) * *xp;
                }
                block[(r, c)] = sum.into_complex() * prefactor;
            }
        }
        Ok(block)
    }
}

/// Static (zero frequency, real arithmetic) or optical (complex) system.
enum System {
    Static(Layers<f64>),
    Optical(Layers<Complex64>),
}

impl System {
    fn for_frequency(frequency: f64) -> Self {
        if frequency == 0.0 {
            System::Static(Layers::default())
        } else {
            System::Optical(Layers::default())
        }
    }

    fn clear_scattering(&mut self) {
        match self {
            System::Static(layers) => layers.clear_scattering(),
            System::Optical(layers) => layers.clear_scattering(),
        }
    }

    fn clear_operator(&mut self) {
        match self {
            System::Static(layers) => layers.clear_operator(),
            System::Optical(layers) => layers.clear_operator(),
        }
    }

    fn refresh_operator(&mut self, term: &BandedMatrix<f64>, stats: &mut CacheStats) {
        match self {
            System::Static(layers) => layers.refresh_operator(term, stats),
            System::Optical(layers) => layers.refresh_operator(term, stats),
        }
    }
}

struct SolveInputs<'a> {
    band: &'a BandStructure,
    elements: &'a ElementArrays,
    derivative_term: &'a BandedMatrix<f64>,
    rate: Option<&'a ScatteringRate>,
    kernel: Option<&'a KernelFn>,
    frequency: f64,
}

/// Conductivity of one band under a magnetic field (T), with a scattering
/// rate (THz) or kernel and an optional driving frequency (THz).
pub struct Conductivity {
    band: BandStructure,
    field: FieldState,
    scattering_rate: Option<ScatteringRate>,
    scattering_kernel: Option<KernelFn>,
    frequency: f64,
    sigma: Matrix3<Complex64>,
    elements: Option<ElementArrays>,
    /// Band generation the cached layers were built against.
    band_generation: Option<u64>,
    derivative_term: Option<BandedMatrix<f64>>,
    system: System,
    stats: CacheStats,
}

impl Conductivity {
    pub fn new(band: BandStructure) -> Self {
        Self {
            band,
            field: FieldState::default(),
            scattering_rate: None,
            scattering_kernel: None,
            frequency: 0.0,
            sigma: Matrix3::zeros(),
            elements: None,
            band_generation: None,
            derivative_term: None,
            system: System::for_frequency(0.0),
            stats: CacheStats::default(),
        }
    }

    pub fn with_field(mut self, field: DVec3) -> Self {
        self.set_field(field);
        self
    }

    pub fn with_scattering_rate(mut self, rate: impl IntoScatteringRate) -> Self {
        self.set_scattering_rate(rate);
        self
    }

    pub fn with_scattering_kernel(mut self, kernel: impl IntoKernelFn) -> Self {
        self.set_scattering_kernel(kernel);
        self
    }

    pub fn with_frequency(mut self, frequency: f64) -> Self {
        self.set_frequency(frequency);
        self
    }

    pub fn band(&self) -> &BandStructure {
        &self.band
    }

    /// Mutable access to the band; any change is picked up by the next
    /// [`calculate`](Self::calculate) through the band's generation counter.
    pub fn band_mut(&mut self) -> &mut BandStructure {
        &mut self.band
    }

    pub fn set_band(&mut self, band: BandStructure) {
        self.band = band;
        self.band_generation = None;
        self.erase_memory(true, true, true);
    }

    pub fn field(&self) -> DVec3 {
        self.field.vector()
    }

    /// Apply a new field. Along the same direction the cached derivative term
    /// is rescaled; a new direction drops it.
    pub fn set_field(&mut self, field: DVec3) {
        let next = FieldState::new(field);
        match self.field.change_to(&next) {
            FieldChange::Rescale(ratio) => {
                if let Some(term) = self.derivative_term.as_mut() {
                    if ratio != 1.0 {
                        term.scale_mut(ratio);
                    }
                    self.stats.derivative_rescales += 1;
                    self.system.refresh_operator(term, &mut self.stats);
                }
            }
            FieldChange::Redirect => self.erase_memory(false, false, true),
        }
        self.field = next;
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn set_frequency(&mut self, frequency: f64) {
        self.frequency = frequency;
        self.system = System::for_frequency(frequency);
    }

    pub fn scattering_rate(&self) -> Option<&ScatteringRate> {
        self.scattering_rate.as_ref()
    }

    pub fn set_scattering_rate(&mut self, rate: impl IntoScatteringRate) {
        self.scattering_rate = Some(rate.into_rate());
        self.system.clear_scattering();
    }

    pub fn clear_scattering_rate(&mut self) {
        self.scattering_rate = None;
        self.system.clear_scattering();
    }

    pub fn set_scattering_kernel(&mut self, kernel: impl IntoKernelFn) {
        self.scattering_kernel = Some(kernel.into_kernel());
        self.system.clear_scattering();
    }

    pub fn clear_scattering_kernel(&mut self) {
        self.scattering_kernel = None;
        self.system.clear_scattering();
    }

    /// The tensor accumulated so far; entries never calculated are zero.
    pub fn sigma(&self) -> &Matrix3<Complex64> {
        &self.sigma
    }

    /// Real part of [`sigma`](Self::sigma), the DC conductivity in S/m.
    pub fn sigma_dc(&self) -> Matrix3<f64> {
        self.sigma.map(|s| s.re)
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Half-width of the banded matrices, once the elements are built.
    pub fn bandwidth(&self) -> Option<usize> {
        self.elements.as_ref().map(|e| e.bandwidth)
    }

    pub fn elements(&self) -> Option<&ElementArrays> {
        self.elements.as_ref()
    }

    /// Calculate the `rows × cols` block of the conductivity tensor (S/m).
    ///
    /// The band is discretized first if it has no mesh. The results are also
    /// written into [`sigma`](Self::sigma).
    pub fn calculate(
        &mut self,
        rows: impl Into<Components>,
        cols: impl Into<Components>,
    ) -> Result<DMatrix<Complex64>, TransportError> {
        let rows = rows.into().axes()?;
        let cols = cols.into().axes()?;

        if self.band.mesh().is_empty() {
            self.band.discretize()?;
        }
        let generation = self.band.generation();
        if self.band_generation != Some(generation) {
            self.erase_memory(true, true, true);
        }

        let elements = match self.elements.take() {
            Some(elements) => elements,
            None => {
                let elements = record_stage(Stage::Elements, || ElementArrays::build(&self.band))?;
                self.stats.element_builds += 1;
                debug!(
                    "built elements: {} points, bandwidth {}",
                    elements.num_points(),
                    elements.bandwidth
                );
                elements
            }
        };
        let elements = self.elements.insert(elements);
        self.band_generation = Some(generation);

        let field = self.field.vector();
        let term = self.derivative_term.get_or_insert_with(|| {
            self.stats.derivative_builds += 1;
            record_stage(Stage::DerivativeTerm, || {
                derivative_term(&elements.derivatives, field)
            })
        });

        let inputs = SolveInputs {
            band: &self.band,
            elements,
            derivative_term: term,
            rate: self.scattering_rate.as_ref(),
            kernel: self.scattering_kernel.as_ref(),
            frequency: self.frequency,
        };
        let block = match &mut self.system {
            System::Static(layers) => layers.solve(&inputs, &rows, &cols, &mut self.stats),
            System::Optical(layers) => layers.solve(&inputs, &rows, &cols, &mut self.stats),
        }?;

        for (r, &row) in rows.iter().enumerate() {
            for (c, &col) in cols.iter().enumerate() {
                self.sigma[(row, col)] = block[(r, c)];
            }
        }
        Ok(block)
    }

    /// Drop cached layers to free memory or force a rebuild. The operator and
    /// the stored solutions are always dropped.
    pub fn erase_memory(&mut self, elements: bool, scattering: bool, derivative: bool) {
        if elements {
            self.elements = None;
        }
        if scattering {
            self.system.clear_scattering();
        }
        if derivative {
            self.derivative_term = None;
        }
        self.system.clear_operator();
    }
}
