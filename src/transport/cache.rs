use nalgebra::{DVector, Scalar};

/// Counters of the work done by a [`Conductivity`](super::Conductivity), for
/// checking which cached layers were reused.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub element_builds: usize,
    pub scattering_builds: usize,
    pub derivative_builds: usize,
    pub derivative_rescales: usize,
    pub operator_builds: usize,
    pub solved_columns: usize,
}

/// Solutions of `A x = proj[:, axis]`, one slot per tensor column.
#[derive(Debug, Clone)]
pub struct SolutionCache<T: Scalar> {
    columns: [Option<DVector<T>>; 3],
}

impl<T: Scalar> Default for SolutionCache<T> {
    fn default() -> Self {
        Self {
            columns: [None, None, None],
        }
    }
}

impl<T: Scalar> SolutionCache<T> {
    pub fn get(&self, axis: usize) -> Option<&DVector<T>> {
        self.columns.get(axis).and_then(Option::as_ref)
    }

    pub fn insert(&mut self, axis: usize, solution: DVector<T>) {
        self.columns[axis] = Some(solution);
    }

    pub fn clear(&mut self) {
        self.columns = [None, None, None];
    }

    pub fn is_empty(&self) -> bool {
        self.columns.iter().all(Option::is_none)
    }

    /// Requested axes without a stored solution, in first-seen order, each once.
    pub fn missing(&self, axes: &[usize]) -> Vec<usize> {
        let mut missing = Vec::with_capacity(3);
        for &axis in axes {
            if self.get(axis).is_none() && !missing.contains(&axis) {
                missing.push(axis);
            }
        }
        missing
    }
}
