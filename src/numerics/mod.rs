pub mod banded;
pub mod solver;
pub mod timing;

pub use banded::{banded_column, BandedMatrix};
pub use solver::{solve_cyclic_banded, SolverError};
