//! Conductivity of a single electronic band from the linearized Boltzmann
//! equation, solved with linear finite elements on the Fermi surface.
//!
//! A [`BandStructure`] turns a dispersion relation into a periodic triangle
//! mesh of the Fermi surface; a [`Conductivity`] assembles the transport
//! operator on that mesh and solves for the conductivity tensor.

pub mod discretization;
pub mod models;
pub mod numerics;
pub mod physics;
pub mod processing;
pub mod transport;

pub use physics::{BandConfig, BandError, BandStructure};
pub use transport::{Components, Conductivity, TransportError};
