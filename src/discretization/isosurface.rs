//! Isosurface extraction from a sampled scalar field.
//!
//! Each grid voxel is split into six tetrahedra sharing the voxel's main
//! diagonal. The split is the same in every voxel, so neighbouring voxels (and
//! the two opposite faces of a periodic grid) are triangulated identically and
//! the extracted surface is conforming.

use std::collections::HashMap;

use glam::DVec3;

/// Values of a scalar field on a regular inclusive grid, x-major.
pub struct ScalarGrid {
    pub shape: [usize; 3],
    pub values: Vec<f64>,
}

impl ScalarGrid {
    /// Sample `f` on `shape` points per axis spanning `[lower, upper]` inclusive.
    pub fn sample(
        shape: [usize; 3],
        lower: DVec3,
        upper: DVec3,
        mut f: impl FnMut(DVec3) -> f64,
    ) -> Self {
        let step = |axis: usize| {
            if shape[axis] > 1 {
                (upper[axis] - lower[axis]) / (shape[axis] - 1) as f64
            } else {
                0.0
            }
        };
        let (dx, dy, dz) = (step(0), step(1), step(2));

        let mut values = Vec::with_capacity(shape[0] * shape[1] * shape[2]);
        for x in 0..shape[0] {
            for y in 0..shape[1] {
                for z in 0..shape[2] {
                    let k = DVec3::new(
                        lower.x + x as f64 * dx,
                        lower.y + y as f64 * dy,
                        lower.z + z as f64 * dz,
                    );
                    values.push(f(k));
                }
            }
        }
        Self { shape, values }
    }

    #[inline]
    fn flat(&self, c: [usize; 3]) -> usize {
        (c[0] * self.shape[1] + c[1]) * self.shape[2] + c[2]
    }
}

/// Raw extractor output: vertices in grid-index coordinates and triangles.
#[derive(Debug, Default)]
pub struct RawSurface {
    pub vertices: Vec<DVec3>,
    pub faces: Vec<[usize; 3]>,
}

const AXIS_ORDERS: [[usize; 3]; 6] = [
    [0, 1, 2],
    [0, 2, 1],
    [1, 0, 2],
    [1, 2, 0],
    [2, 0, 1],
    [2, 1, 0],
];

/// Extract the `level` isosurface of `grid`.
///
/// A grid point counts as inside when its value is strictly below `level`.
/// Triangle normals `(p1-p0)×(p2-p0)` point toward increasing field values.
pub fn extract_isosurface(grid: &ScalarGrid, level: f64) -> RawSurface {
    let mut extractor = Extractor {
        grid,
        level,
        edge_vertices: HashMap::new(),
        surface: RawSurface::default(),
    };

    let [nx, ny, nz] = grid.shape;
    for x in 0..nx.saturating_sub(1) {
        for y in 0..ny.saturating_sub(1) {
            for z in 0..nz.saturating_sub(1) {
                for order in AXIS_ORDERS {
                    let mut corner = [x, y, z];
                    let mut tet = [corner; 4];
                    for (slot, axis) in order.into_iter().enumerate() {
                        corner[axis] += 1;
                        tet[slot + 1] = corner;
                    }
                    extractor.polygonize(tet);
                }
            }
        }
    }

    extractor.surface
}

struct Extractor<'a> {
    grid: &'a ScalarGrid,
    level: f64,
    /// Surface vertex created on each crossed grid edge, keyed by (low, high) flat index.
    edge_vertices: HashMap<(usize, usize), usize>,
    surface: RawSurface,
}

impl Extractor<'_> {
    fn polygonize(&mut self, tet: [[usize; 3]; 4]) {
        let values = tet.map(|c| self.grid.values[self.grid.flat(c)]);
        let below: Vec<usize> = (0..4).filter(|&i| values[i] < self.level).collect();
        let above: Vec<usize> = (0..4).filter(|&i| values[i] >= self.level).collect();
        if below.is_empty() || above.is_empty() {
            return;
        }

        let centroid = |ids: &[usize]| {
            ids.iter().map(|&i| to_vec(tet[i])).sum::<DVec3>() / ids.len() as f64
        };
        let uphill = centroid(&above) - centroid(&below);

        match (below.as_slice(), above.as_slice()) {
            (&[a], &[b, c, d]) => {
                let tri = [
                    self.edge_vertex(tet, a, b),
                    self.edge_vertex(tet, a, c),
                    self.edge_vertex(tet, a, d),
                ];
                self.emit(tri, uphill);
            }
            (&[a, b, c], &[d]) => {
                let tri = [
                    self.edge_vertex(tet, d, a),
                    self.edge_vertex(tet, d, b),
                    self.edge_vertex(tet, d, c),
                ];
                self.emit(tri, uphill);
            }
            (&[a, b], &[c, d]) => {
                let ac = self.edge_vertex(tet, a, c);
                let ad = self.edge_vertex(tet, a, d);
                let bd = self.edge_vertex(tet, b, d);
                let bc = self.edge_vertex(tet, b, c);
                self.emit([ac, ad, bd], uphill);
                self.emit([ac, bd, bc], uphill);
            }
            _ => unreachable!("a tetrahedron has four corners"),
        }
    }

    fn edge_vertex(&mut self, tet: [[usize; 3]; 4], i: usize, j: usize) -> usize {
        let (gi, gj) = (self.grid.flat(tet[i]), self.grid.flat(tet[j]));
        let key = (gi.min(gj), gi.max(gj));
        if let Some(&v) = self.edge_vertices.get(&key) {
            return v;
        }

        // interpolate from the low end of the edge so the result does not
        // depend on which tetrahedron reaches the edge first
        let (lo, hi) = if gi < gj { (i, j) } else { (j, i) };
        let (f_lo, f_hi) = (self.grid.values[key.0], self.grid.values[key.1]);
        let t = (self.level - f_lo) / (f_hi - f_lo);
        let p_lo = to_vec(tet[lo]);
        let position = p_lo + (to_vec(tet[hi]) - p_lo) * t;

        let v = self.surface.vertices.len();
        self.surface.vertices.push(position);
        self.edge_vertices.insert(key, v);
        v
    }

    fn emit(&mut self, mut tri: [usize; 3], uphill: DVec3) {
        let v = &self.surface.vertices;
        let normal = (v[tri[1]] - v[tri[0]]).cross(v[tri[2]] - v[tri[0]]);
        if normal.dot(uphill) < 0.0 {
            tri.swap(1, 2);
        }
        self.surface.faces.push(tri);
    }
}

fn to_vec(c: [usize; 3]) -> DVec3 {
    DVec3::new(c[0] as f64, c[1] as f64, c[2] as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn sphere_grid(n: usize, center: DVec3) -> ScalarGrid {
        ScalarGrid::sample(
            [n; 3],
            DVec3::ZERO,
            DVec3::splat((n - 1) as f64),
            |p| (p - center).length_squared(),
        )
    }

    #[test]
    fn sphere_vertices_lie_near_the_level_set() {
        let center = DVec3::splat(7.3);
        let radius: f64 = 4.6;
        let surface = extract_isosurface(&sphere_grid(16, center), radius * radius);

        assert!(!surface.faces.is_empty());
        for v in &surface.vertices {
            // linear interpolation of r^2 along an edge stays within a voxel
            assert!(((*v - center).length() - radius).abs() < 0.15);
        }
    }

    #[test]
    fn closed_surface_is_consistently_oriented() {
        let center = DVec3::new(6.1, 5.7, 6.4);
        let radius: f64 = 3.9;
        let surface = extract_isosurface(&sphere_grid(14, center), radius * radius);

        // every directed edge appears once and its reverse exactly once
        let mut directed: HashMap<(usize, usize), usize> = HashMap::new();
        for f in &surface.faces {
            for m in 0..3 {
                *directed.entry((f[m], f[(m + 1) % 3])).or_default() += 1;
            }
        }
        for (&(a, b), &count) in &directed {
            assert_eq!(count, 1);
            assert_eq!(directed.get(&(b, a)), Some(&1));
        }

        // outward normals give a positive enclosed volume
        let volume: f64 = surface
            .faces
            .iter()
            .map(|f| {
                let [p0, p1, p2] = f.map(|i| surface.vertices[i] - center);
                p0.dot(p1.cross(p2)) / 6.0
            })
            .sum();
        let exact = 4.0 / 3.0 * std::f64::consts::PI * radius.powi(3);
        assert!((volume - exact).abs() / exact < 0.05, "volume {volume} vs {exact}");
    }

    #[test]
    fn uniform_field_has_no_surface() {
        let grid = ScalarGrid::sample([4; 3], DVec3::ZERO, DVec3::ONE, |_| 1.0);
        let surface = extract_isosurface(&grid, 0.5);
        assert!(surface.vertices.is_empty());
        assert!(surface.faces.is_empty());
    }
}
