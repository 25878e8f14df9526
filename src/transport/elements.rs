//! Geometric FEM quantities of the Fermi-surface mesh.
//!
//! The surface is covered with linear (P1) triangle elements. Everything here
//! depends on the band only, not on the field or the scattering model.

use glam::DVec3;
use nalgebra::DMatrix;

use super::TransportError;
use crate::discretization::mesh::FermiSurfaceMesh;
use crate::numerics::banded::{cyclic_distance, BandedMatrix};
use crate::physics::units::ANGSTROM;
use crate::physics::BandStructure;

#[derive(Debug, Clone)]
pub struct ElementArrays {
    /// Fermi velocity at every periodic point (m/s).
    pub velocities: Vec<DVec3>,
    pub vmags: Vec<f64>,
    pub vhats: Vec<DVec3>,
    /// Half-width of the cyclic band of every assembled matrix.
    pub bandwidth: usize,
    /// Twice the area of each triangle (m⁻²).
    pub jacobians: Vec<f64>,
    /// `A(i, j)`: sum of the Jacobians of the triangles sharing vertices `i` and `j`.
    pub jacobian_sums: BandedMatrix<f64>,
    /// Field-independent derivative sums, one per Cartesian axis of the field.
    pub derivatives: [BandedMatrix<f64>; 3],
    /// `(A + diag A) v̂ / 24`, an `n × 3` matrix: the right-hand sides of the solve.
    pub vhat_projections: DMatrix<f64>,
}

impl ElementArrays {
    pub fn build(band: &BandStructure) -> Result<Self, TransportError> {
        let mesh = band.mesh();
        if mesh.is_empty() || mesh.kfaces.is_empty() {
            return Err(TransportError::EmptySurface);
        }
        let n = mesh.num_points();

        let velocities = band.velocities(&mesh.kpoints_periodic);
        let mut vmags = Vec::with_capacity(n);
        let mut vhats = Vec::with_capacity(n);
        for (index, v) in velocities.iter().enumerate() {
            let vmag = v.length();
            if vmag == 0.0 || !vmag.is_finite() {
                return Err(TransportError::DegenerateVelocity { index });
            }
            vmags.push(vmag);
            vhats.push(*v / vmag);
        }

        let bandwidth = mesh_bandwidth(&mesh.kfaces_periodic, n);
        let triangles = triangle_coordinates(mesh);

        let jacobians: Vec<f64> = triangles
            .iter()
            .map(|[p0, p1, p2]| (*p1 - *p0).cross(*p2 - *p0).length())
            .collect();
        let jacobian_sums = jacobian_sums(&mesh.kfaces_periodic, &jacobians, n, bandwidth);
        let derivatives = derivative_sums(&mesh.kfaces_periodic, &triangles, n, bandwidth);
        let vhat_projections = velocity_projections(&jacobian_sums, &vhats);

        Ok(Self {
            velocities,
            vmags,
            vhats,
            bandwidth,
            jacobians,
            jacobian_sums,
            derivatives,
            vhat_projections,
        })
    }

    pub fn num_points(&self) -> usize {
        self.vmags.len()
    }
}

/// Largest cyclic index distance between two vertices of one triangle.
pub fn mesh_bandwidth(faces: &[[usize; 3]], n: usize) -> usize {
    faces
        .iter()
        .flat_map(|&[i, j, k]| {
            [
                cyclic_distance(i, j, n),
                cyclic_distance(j, k, n),
                cyclic_distance(k, i, n),
            ]
        })
        .max()
        .unwrap_or(0)
}

/// Triangle corners in m⁻¹, from the unwrapped points so that no triangle
/// straddles the zone boundary.
fn triangle_coordinates(mesh: &FermiSurfaceMesh) -> Vec<[DVec3; 3]> {
    (0..mesh.num_faces())
        .map(|f| mesh.triangle(f).map(|k| k / ANGSTROM))
        .collect()
}

fn jacobian_sums(
    faces: &[[usize; 3]],
    jacobians: &[f64],
    n: usize,
    bandwidth: usize,
) -> BandedMatrix<f64> {
    let mut sums = BandedMatrix::zeros(n, bandwidth);
    for (&[i, j, k], &jac) in faces.iter().zip(jacobians) {
        sums.add(i, i, jac);
        sums.add(j, j, jac);
        sums.add(k, k, jac);
        for (a, b) in [(i, j), (j, k), (i, k)] {
            sums.add(a, b, jac);
            sums.add(b, a, jac);
        }
    }
    sums
}

fn derivative_sums(
    faces: &[[usize; 3]],
    triangles: &[[DVec3; 3]],
    n: usize,
    bandwidth: usize,
) -> [BandedMatrix<f64>; 3] {
    let mut derivatives: [BandedMatrix<f64>; 3] =
        std::array::from_fn(|_| BandedMatrix::zeros(n, bandwidth));
    for (face, corners) in faces.iter().zip(triangles) {
        for m in 0..3 {
            let (i, j, k) = (face[m], face[(m + 1) % 3], face[(m + 2) % 3]);
            // edge opposite to vertex j
            let edge = corners[m] - corners[(m + 2) % 3];
            for (axis, derivative) in derivatives.iter_mut().enumerate() {
                derivative.add(i, j, edge[axis]);
                derivative.add(k, j, edge[axis]);
            }
        }
    }
    derivatives
}

fn velocity_projections(jacobian_sums: &BandedMatrix<f64>, vhats: &[DVec3]) -> DMatrix<f64> {
    let mut projections = DMatrix::zeros(vhats.len(), 3);
    let mut accumulate = |p: usize, weight: f64, v: DVec3| {
        for axis in 0..3 {
            projections[(p, axis)] += weight * v[axis] / 24.0;
        }
    };
    for (i, j, a) in jacobian_sums.entries() {
        accumulate(i, a, vhats[j]);
    }
    for p in 0..vhats.len() {
        accumulate(p, jacobian_sums.value(p, p), vhats[p]);
    }
    projections
}
