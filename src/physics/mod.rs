pub mod band;
pub mod dispersion;
pub mod expression;
pub mod units;

pub use band::{BandConfig, BandError, BandStructure, MeshTolerances, Resolution};
pub use dispersion::{DispersionModel, SymbolNames};
