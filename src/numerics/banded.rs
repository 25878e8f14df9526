//! Cyclic banded matrices in diagonal storage.
//!
//! An `n × n` matrix whose entries `(i, j)` vanish unless the cyclic index
//! distance `min(|i-j|, n-|i-j|)` is at most `b` is stored as a `(2b+1) × n`
//! array. Entry `(i, j)` lives in column `j`, row [`banded_column`]`(i, j, b, n)`.

use nalgebra::{DMatrix, Scalar};
use num_traits::Zero;

/// Storage row of entry `(i, j)`: `b + d` where `d ≡ i - j (mod n)` is taken in
/// `[-b, b]`, the non-negative representative winning when both fit.
/// Returns `None` for entries outside the band.
#[inline]
pub fn banded_column(i: usize, j: usize, bandwidth: usize, n: usize) -> Option<usize> {
    let d = (i + n - j) % n;
    if d <= bandwidth {
        Some(bandwidth + d)
    } else if n - d <= bandwidth {
        Some(bandwidth - (n - d))
    } else {
        None
    }
}

/// Cyclic distance between two indices of a ring of length `n`.
#[inline]
pub fn cyclic_distance(a: usize, b: usize, n: usize) -> usize {
    let d = a.abs_diff(b);
    d.min(n - d)
}

#[derive(Debug, Clone, PartialEq)]
pub struct BandedMatrix<T: Scalar> {
    n: usize,
    bandwidth: usize,
    data: DMatrix<T>,
}

impl<T: Scalar + Zero + Copy> BandedMatrix<T> {
    pub fn zeros(n: usize, bandwidth: usize) -> Self {
        Self {
            n,
            bandwidth,
            data: DMatrix::zeros(2 * bandwidth + 1, n),
        }
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn bandwidth(&self) -> usize {
        self.bandwidth
    }

    /// Row index of the entry stored at `(slot, j)`.
    #[inline]
    pub fn row_of(&self, slot: usize, j: usize) -> usize {
        (j + self.n + slot - self.bandwidth) % self.n
    }

    /// Entry `(i, j)`; `None` when it lies outside the band.
    pub fn get(&self, i: usize, j: usize) -> Option<T> {
        banded_column(i, j, self.bandwidth, self.n).map(|slot| self.data[(slot, j)])
    }

    /// Entry `(i, j)`, zero outside the band.
    pub fn value(&self, i: usize, j: usize) -> T {
        self.get(i, j).unwrap_or_else(T::zero)
    }

    /// Accumulate `value` into entry `(i, j)`.
    ///
    /// # Panics
    /// When `(i, j)` lies outside the band.
    pub fn add(&mut self, i: usize, j: usize, value: T)
    where
        T: std::ops::AddAssign,
    {
        match banded_column(i, j, self.bandwidth, self.n) {
            Some(slot) => self.data[(slot, j)] += value,
            None => panic!(
                "entry ({i}, {j}) lies outside the band of half-width {} (n = {})",
                self.bandwidth, self.n
            ),
        }
    }

    /// Every distinct stored entry as `(i, j, value)`, column by column.
    pub fn entries(&self) -> impl Iterator<Item = (usize, usize, T)> + '_ {
        let slots = 2 * self.bandwidth + 1;
        (0..self.n).flat_map(move |j| {
            (0..slots).filter_map(move |slot| {
                let i = self.row_of(slot, j);
                // on small rings two slots can name the same entry
                (banded_column(i, j, self.bandwidth, self.n) == Some(slot))
                    .then(|| (i, j, self.data[(slot, j)]))
            })
        })
    }

    pub fn map<U, F>(&self, f: F) -> BandedMatrix<U>
    where
        U: Scalar + Zero + Copy,
        F: FnMut(T) -> U,
    {
        BandedMatrix {
            n: self.n,
            bandwidth: self.bandwidth,
            data: self.data.map(f),
        }
    }

    /// Element-wise combination of two matrices with the same layout.
    pub fn zip_map<U, R, F>(&self, other: &BandedMatrix<U>, f: F) -> BandedMatrix<R>
    where
        U: Scalar + Zero + Copy,
        R: Scalar + Zero + Copy,
        F: FnMut(T, U) -> R,
    {
        assert_eq!(
            (self.n, self.bandwidth),
            (other.n, other.bandwidth),
            "banded layouts differ"
        );
        BandedMatrix {
            n: self.n,
            bandwidth: self.bandwidth,
            data: self.data.zip_map(&other.data, f),
        }
    }

    pub fn to_dense(&self) -> DMatrix<T>
    where
        T: std::ops::AddAssign,
    {
        let mut dense = DMatrix::zeros(self.n, self.n);
        for (i, j, value) in self.entries() {
            dense[(i, j)] += value;
        }
        dense
    }
}

impl BandedMatrix<f64> {
    pub fn scale_mut(&mut self, factor: f64) {
        self.data *= factor;
    }
}
