use nalgebra::{ComplexField, DMatrix, DVector};
use thiserror::Error;

use super::banded::BandedMatrix;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    #[error("matrix is singular to working precision")]
    Singular,
    #[error("right-hand side has {found} rows, matrix has {expected}")]
    DimensionMismatch { expected: usize, found: usize },
}

/// Solve `A X = B` for a cyclic banded `A`.
///
/// Small systems (`n ≤ 4b + 2`) go through a dense LU factorisation. Larger
/// ones are split into the leading `n - 2b` unknowns, whose block carries no
/// wrap-around entries and is eliminated as an ordinary band matrix with
/// partial pivoting, and the trailing `2b` unknowns, which are found from the
/// dense Schur complement. Every right-hand side column is processed on its
/// own, so a column's solution does not depend on which others accompany it.
pub fn solve_cyclic_banded<T>(a: &BandedMatrix<T>, rhs: &DMatrix<T>) -> Result<DMatrix<T>, SolverError>
where
    T: ComplexField<RealField = f64> + Copy,
{
    let n = a.n();
    if rhs.nrows() != n {
        return Err(SolverError::DimensionMismatch {
            expected: n,
            found: rhs.nrows(),
        });
    }
    if n == 0 {
        return Ok(rhs.clone());
    }

    let b = a.bandwidth();
    if n <= 4 * b + 2 {
        return solve_dense(a, rhs);
    }

    let m = n - 2 * b;
    let t = 2 * b;
    let k = rhs.ncols();

    // [A12 | B1] is carried through the elimination of A11
    let mut aug = DMatrix::<T>::zeros(m, t + k);
    for i in 0..m {
        for c in 0..t {
            aug[(i, c)] = a.value(i, m + c);
        }
        for c in 0..k {
            aug[(i, t + c)] = rhs[(i, c)];
        }
    }

    let mut lead = BandLu::new(a, m);
    lead.factor_and_apply(&mut aug)?;
    lead.back_substitute(&mut aug);

    // S = A22 - A21 Y with Y = A11⁻¹ A12
    let mut schur = DMatrix::<T>::zeros(t, t);
    for r in 0..t {
        let row = m + r;
        for c in 0..t {
            let mut s = a.value(row, m + c);
            for p in coupled_columns(row, m, b, n) {
                s -= a.value(row, p) * aug[(p, c)];
            }
            schur[(r, c)] = s;
        }
    }
    let schur_lu = schur.lu();

    let mut solution = DMatrix::<T>::zeros(n, k);
    for c in 0..k {
        let mut tail = DVector::<T>::zeros(t);
        for r in 0..t {
            let row = m + r;
            let mut s = rhs[(row, c)];
            for p in coupled_columns(row, m, b, n) {
                s -= a.value(row, p) * aug[(p, t + c)];
            }
            tail[r] = s;
        }
        let tail = schur_lu.solve(&tail).ok_or(SolverError::Singular)?;

        for i in 0..m {
            let mut s = aug[(i, t + c)];
            for r in 0..t {
                s -= aug[(i, r)] * tail[r];
            }
            solution[(i, c)] = s;
        }
        for r in 0..t {
            solution[(m + r, c)] = tail[r];
        }
    }
    Ok(solution)
}

fn solve_dense<T>(a: &BandedMatrix<T>, rhs: &DMatrix<T>) -> Result<DMatrix<T>, SolverError>
where
    T: ComplexField<RealField = f64> + Copy,
{
    let lu = a.to_dense().lu();
    let mut solution = DMatrix::<T>::zeros(rhs.nrows(), rhs.ncols());
    for c in 0..rhs.ncols() {
        let x = lu
            .solve(&rhs.column(c).into_owned())
            .ok_or(SolverError::Singular)?;
        solution.set_column(c, &x);
    }
    Ok(solution)
}

/// Leading-block columns `p < m` that row `row ≥ m` can reach within the band.
fn coupled_columns(row: usize, m: usize, b: usize, n: usize) -> impl Iterator<Item = usize> {
    (0..=2 * b)
        .map(move |s| (row + n + s - b) % n)
        .filter(move |&p| p < m)
}

/// LU factors of the leading `m × m` block kept in row windows.
///
/// Row `r` stores columns `r-b ..= r+2b`; row interchanges within `b` rows of
/// the diagonal never push fill past `k + 2b`.
struct BandLu<T> {
    m: usize,
    b: usize,
    width: usize,
    rows: Vec<T>,
}

impl<T> BandLu<T>
where
    T: ComplexField<RealField = f64> + Copy,
{
    fn new(a: &BandedMatrix<T>, m: usize) -> Self {
        let b = a.bandwidth();
        let width = 3 * b + 1;
        let mut lu = Self {
            m,
            b,
            width,
            rows: vec![T::zero(); m * width],
        };
        for r in 0..m {
            for c in r.saturating_sub(b)..=(r + b).min(m - 1) {
                *lu.at(r, c) = a.value(r, c);
            }
        }
        lu
    }

    #[inline]
    fn at(&mut self, r: usize, c: usize) -> &mut T {
        &mut self.rows[r * self.width + c + self.b - r]
    }

    #[inline]
    fn get(&self, r: usize, c: usize) -> T {
        self.rows[r * self.width + c + self.b - r]
    }

    fn factor_and_apply(&mut self, aug: &mut DMatrix<T>) -> Result<(), SolverError> {
        let (m, b) = (self.m, self.b);
        for k in 0..m {
            let last_row = (k + b).min(m - 1);
            let last_col = (k + 2 * b).min(m - 1);

            let mut pivot = k;
            let mut best = self.get(k, k).modulus();
            for r in k + 1..=last_row {
                let size = self.get(r, k).modulus();
                if size > best {
                    best = size;
                    pivot = r;
                }
            }
            if best == 0.0 || !best.is_finite() {
                return Err(SolverError::Singular);
            }

            if pivot != k {
                for c in k..=last_col {
                    let upper = self.get(k, c);
                    *self.at(k, c) = self.get(pivot, c);
                    *self.at(pivot, c) = upper;
                }
                aug.swap_rows(k, pivot);
            }

            let diag = self.get(k, k);
            for r in k + 1..=last_row {
                let factor = self.get(r, k) / diag;
                if factor == T::zero() {
                    continue;
                }
                for c in k..=last_col {
                    let update = factor * self.get(k, c);
                    *self.at(r, c) -= update;
                }
                for c in 0..aug.ncols() {
                    let update = factor * aug[(k, c)];
                    aug[(r, c)] -= update;
                }
            }
        }
        Ok(())
    }

    fn back_substitute(&self, aug: &mut DMatrix<T>) {
        let (m, b) = (self.m, self.b);
        for k in (0..m).rev() {
            let last_col = (k + 2 * b).min(m - 1);
            let diag = self.get(k, k);
            for c in 0..aug.ncols() {
                let mut s = aug[(k, c)];
                for p in k + 1..=last_col {
                    s -= self.get(k, p) * aug[(p, c)];
                }
                aug[(k, c)] = s / diag;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use num_complex::Complex64;

    /// Deterministic, diagonally dominant cyclic band with a skew part.
    fn test_matrix(n: usize, b: usize) -> BandedMatrix<f64> {
        let mut a = BandedMatrix::zeros(n, b);
        for j in 0..n {
            for d in 1..=b {
                let i = (j + d) % n;
                let v = ((i * 7 + j * 3) % 11) as f64 / 11.0 - 0.5;
                a.add(i, j, v);
                a.add(j, i, 0.3 * v + 0.1);
            }
            a.add(j, j, 2.0 * b as f64 + 0.4 + (j % 3) as f64 * 0.1);
        }
        a
    }

    fn test_rhs(n: usize, k: usize) -> DMatrix<f64> {
        DMatrix::from_fn(n, k, |i, c| ((i + 2 * c) as f64 * 0.37).sin())
    }

    #[test]
    fn banded_solve_matches_dense_lu() {
        for &(n, b) in &[(5, 2), (12, 1), (31, 3), (64, 5)] {
            let a = test_matrix(n, b);
            let rhs = test_rhs(n, 3);
            let x = solve_cyclic_banded(&a, &rhs).unwrap();
            let expected = a.to_dense().lu().solve(&rhs).unwrap();
            for (got, want) in x.iter().zip(expected.iter()) {
                assert_relative_eq!(*got, *want, epsilon = 1e-9, max_relative = 1e-9);
            }
        }
    }

    #[test]
    fn columns_are_solved_independently() {
        let a = test_matrix(40, 2);
        let rhs = test_rhs(40, 3);
        let all = solve_cyclic_banded(&a, &rhs).unwrap();
        let middle = solve_cyclic_banded(&a, &rhs.columns(1, 1).into_owned()).unwrap();
        assert_eq!(all.column(1), middle.column(0));
    }

    #[test]
    fn complex_systems_are_supported() {
        let a = test_matrix(30, 2).map(|v| Complex64::new(v, 0.25 * v));
        let rhs = test_rhs(30, 2).map(|v| Complex64::new(v, -v));
        let x = solve_cyclic_banded(&a, &rhs).unwrap();
        let residual = a.to_dense() * &x - &rhs;
        assert!(residual.norm() < 1e-9);
    }

    #[test]
    fn singular_and_mismatched_systems_are_rejected() {
        let a = BandedMatrix::<f64>::zeros(20, 1);
        assert_eq!(
            solve_cyclic_banded(&a, &DMatrix::from_element(20, 1, 1.0)),
            Err(SolverError::Singular)
        );
        assert_eq!(
            solve_cyclic_banded(&a, &DMatrix::zeros(19, 1)),
            Err(SolverError::DimensionMismatch {
                expected: 20,
                found: 19
            })
        );
    }
}
