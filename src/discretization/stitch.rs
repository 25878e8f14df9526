use std::collections::HashMap;

use glam::DVec3;

/// Result of merging the vertices that coincide under the periodic wrap.
pub struct PeriodicMesh {
    pub kpoints: Vec<DVec3>,
    pub kfaces: Vec<[usize; 3]>,
    /// For every input point, the index of its primary representative (itself if unique).
    pub primary: Vec<usize>,
}

impl PeriodicMesh {
    pub fn num_duplicates(&self) -> usize {
        self.primary
            .iter()
            .enumerate()
            .filter(|(i, p)| i != *p)
            .count()
    }
}

/// Bin vertices on a fine lattice (`threshold` × voxel size) folded into one
/// period, then merge every bin into its first vertex in input order.
pub fn stitch_periodic_boundaries(
    kpoints: &[DVec3],
    kfaces: &[[usize; 3]],
    gvec: DVec3,
    voxel_size: DVec3,
    threshold: f64,
) -> PeriodicMesh {
    let bin_size = voxel_size * threshold;
    let extent: [i64; 3] =
        std::array::from_fn(|a| ((2.0 * gvec[a] / bin_size[a]).round() as i64).max(1));

    let mut bins: HashMap<[i64; 3], Vec<usize>> = HashMap::new();
    for (i, k) in kpoints.iter().enumerate() {
        let key: [i64; 3] = std::array::from_fn(|a| {
            (((k[a] + gvec[a]) / bin_size[a]).round() as i64).rem_euclid(extent[a])
        });
        bins.entry(key).or_default().push(i);
    }

    let mut primary: Vec<usize> = (0..kpoints.len()).collect();
    for members in bins.values() {
        if let [first, rest @ ..] = members.as_slice() {
            for &duplicate in rest {
                primary[duplicate] = *first;
            }
        }
    }

    // prefix count of the kept points gives their new index
    let mut reindex = vec![0usize; kpoints.len()];
    let mut periodic_points = Vec::with_capacity(kpoints.len());
    for (i, k) in kpoints.iter().enumerate() {
        if primary[i] == i {
            reindex[i] = periodic_points.len();
            periodic_points.push(*k);
        }
    }

    let periodic_faces = kfaces
        .iter()
        .map(|face| face.map(|p| reindex[primary[p]]))
        .collect();

    PeriodicMesh {
        kpoints: periodic_points,
        kfaces: periodic_faces,
        primary,
    }
}

/// `k2 - k1` wrapped into one period: `((Δ + g) mod 2g) - g` per axis.
#[inline]
pub fn wrap_difference(k1: DVec3, k2: DVec3, gvec: DVec3) -> DVec3 {
    let twice = 2.0 * gvec;
    let d = k2 - k1 + gvec;
    DVec3::new(
        d.x.rem_euclid(twice.x),
        d.y.rem_euclid(twice.y),
        d.z.rem_euclid(twice.z),
    ) - gvec
}
