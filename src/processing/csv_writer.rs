use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use glam::DVec3;
use nalgebra::Matrix3;
use num_complex::Complex64;

use crate::discretization::mesh::FermiSurfaceMesh;

/// Write columns of data to a CSV file with headers
pub fn write_csv<P: AsRef<Path>>(path: P, headers: &[&str], data: &[Vec<f64>]) -> io::Result<()> {
    if !headers.is_empty() && !data.is_empty() && headers.len() != data.len() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "Headers count ({}) doesn't match data columns ({})",
                headers.len(),
                data.len()
            ),
        ));
    }

    let mut file = File::create(path)?;

    writeln!(file, "{}", headers.join(","))?;

    let n_rows = data.iter().map(|col| col.len()).max().unwrap_or(0);

    for i in 0..n_rows {
        let row: Vec<String> = data
            .iter()
            .map(|col| col.get(i).map(|x| format!("{:.15e}", x)).unwrap_or_default())
            .collect();
        writeln!(file, "{}", row.join(","))?;
    }

    Ok(())
}

/// Periodic surface points with their Fermi velocity (m/s).
pub fn write_surface_points<P: AsRef<Path>>(
    path: P,
    mesh: &FermiSurfaceMesh,
    velocities: &[DVec3],
) -> io::Result<()> {
    if velocities.len() != mesh.num_points() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "Velocity count ({}) doesn't match surface points ({})",
                velocities.len(),
                mesh.num_points()
            ),
        ));
    }
    let points = &mesh.kpoints_periodic;
    write_csv(
        path,
        &["kx", "ky", "kz", "vx", "vy", "vz"],
        &[
            points.iter().map(|k| k.x).collect(),
            points.iter().map(|k| k.y).collect(),
            points.iter().map(|k| k.z).collect(),
            velocities.iter().map(|v| v.x).collect(),
            velocities.iter().map(|v| v.y).collect(),
            velocities.iter().map(|v| v.z).collect(),
        ],
    )
}

/// Triangles of the periodic mesh as vertex index triples.
pub fn write_surface_faces<P: AsRef<Path>>(path: P, mesh: &FermiSurfaceMesh) -> io::Result<()> {
    let mut file = File::create(path)?;
    writeln!(file, "i,j,k")?;
    for [i, j, k] in &mesh.kfaces_periodic {
        writeln!(file, "{},{},{}", i, j, k)?;
    }
    Ok(())
}

/// Conductivity tensor, one row per component.
pub fn write_tensor<P: AsRef<Path>>(path: P, sigma: &Matrix3<Complex64>) -> io::Result<()> {
    let mut file = File::create(path)?;
    writeln!(file, "row,col,re,im")?;
    for i in 0..3 {
        for j in 0..3 {
            let s = sigma[(i, j)];
            writeln!(file, "{},{},{:.15e},{:.15e}", i, j, s.re, s.im)?;
        }
    }
    Ok(())
}
