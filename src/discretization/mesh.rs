use glam::DVec3;

/// The triangulated Fermi surface.
#[derive(Clone, Debug, Default)]
pub struct FermiSurfaceMesh {
    /// Surface vertices in k-space (Å⁻¹), including periodic boundary duplicates.
    pub kpoints: Vec<DVec3>,
    /// Triangles as index triples into `kpoints`.
    pub kfaces: Vec<[usize; 3]>,
    /// `kpoints` with the duplicate boundary points removed.
    pub kpoints_periodic: Vec<DVec3>,
    /// Same triangles as `kfaces` (same order), indexing into `kpoints_periodic`.
    pub kfaces_periodic: Vec<[usize; 3]>,
}

impl FermiSurfaceMesh {
    pub fn is_empty(&self) -> bool {
        self.kpoints.is_empty()
    }

    pub fn num_points(&self) -> usize {
        self.kpoints_periodic.len()
    }

    pub fn num_faces(&self) -> usize {
        self.kfaces.len()
    }

    /// Triangle corners of face `f` in unwrapped k-space coordinates.
    pub fn triangle(&self, f: usize) -> [DVec3; 3] {
        self.kfaces[f].map(|i| self.kpoints[i])
    }

    /// Total surface area in Å⁻², from the unwrapped triangles.
    pub fn area(&self) -> f64 {
        (0..self.num_faces())
            .map(|f| {
                let [p0, p1, p2] = self.triangle(f);
                0.5 * (p1 - p0).cross(p2 - p0).length()
            })
            .sum()
    }

    /// Checks that every face index is valid for its point array.
    pub fn is_consistent(&self) -> bool {
        self.kfaces.len() == self.kfaces_periodic.len()
            && self.kpoints_periodic.len() <= self.kpoints.len()
            && self.kfaces.iter().flatten().all(|&i| i < self.kpoints.len())
            && self
                .kfaces_periodic
                .iter()
                .flatten()
                .all(|&i| i < self.kpoints_periodic.len())
    }
}
