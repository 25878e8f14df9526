use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use nalgebra::Matrix3;
use num_complex::Complex64;

use crate::physics::band::DiscretizationReport;
use crate::transport::{CacheStats, Conductivity};

pub struct RunSummary {
    // Band info
    pub dispersion: String,
    pub chemical_potential: f64,
    pub unit_cell: [f64; 3],

    // Mesh info
    pub grid_shape: [usize; 3],
    pub raw_points: usize,
    pub periodic_points: usize,
    pub num_faces: usize,
    pub surface_area: f64,
    pub newton_residuals: Vec<f64>,
    pub final_residual: f64,

    // Solver info
    pub bandwidth: Option<usize>,
    pub field: [f64; 3],
    pub frequency: f64,
    pub stats: CacheStats,

    // Results
    pub sigma: Matrix3<Complex64>,
    pub reference: Option<(String, f64)>,
}

impl RunSummary {
    pub fn from_run(conductivity: &Conductivity, report: &DiscretizationReport) -> Self {
        let band = conductivity.band();
        Self {
            dispersion: band.dispersion().to_string(),
            chemical_potential: band.chemical_potential(),
            unit_cell: band.unit_cell(),
            grid_shape: report.grid_shape,
            raw_points: report.raw_points,
            periodic_points: report.periodic_points,
            num_faces: report.faces,
            surface_area: band.mesh().area(),
            newton_residuals: report.corrections.iter().map(|c| c.max_residual).collect(),
            final_residual: report.final_residual,
            bandwidth: conductivity.bandwidth(),
            field: conductivity.field().to_array(),
            frequency: conductivity.frequency(),
            stats: conductivity.stats().clone(),
            sigma: *conductivity.sigma(),
            reference: None,
        }
    }

    /// Attach an analytic value to compare `σ_xx` against.
    pub fn add_reference(&mut self, label: &str, sigma_xx: f64) {
        self.reference = Some((label.to_string(), sigma_xx));
    }

    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let mut file = File::create(path)?;

        writeln!(file, "{}", "=".repeat(60))?;
        writeln!(file, "FERMI SURFACE CONDUCTIVITY SUMMARY")?;
        writeln!(file, "{}", "=".repeat(60))?;
        writeln!(file)?;

        writeln!(file, "BAND")?;
        writeln!(file, "{}", "-".repeat(60))?;
        writeln!(file, "Dispersion:          {}", self.dispersion)?;
        writeln!(file, "Chemical potential:  {:.6} meV", self.chemical_potential)?;
        writeln!(
            file,
            "Unit cell:           {:.4} x {:.4} x {:.4} Å",
            self.unit_cell[0], self.unit_cell[1], self.unit_cell[2]
        )?;
        writeln!(file)?;

        writeln!(file, "MESH STATISTICS")?;
        writeln!(file, "{}", "-".repeat(60))?;
        writeln!(
            file,
            "Sampling grid:       {} x {} x {}",
            self.grid_shape[0], self.grid_shape[1], self.grid_shape[2]
        )?;
        writeln!(file, "Raw points:          {}", self.raw_points)?;
        writeln!(file, "Periodic points:     {}", self.periodic_points)?;
        writeln!(file, "Number of faces:     {}", self.num_faces)?;
        writeln!(file, "Surface area:        {:.6e} Å⁻²", self.surface_area)?;
        for (pass, residual) in self.newton_residuals.iter().enumerate() {
            writeln!(file, "Newton pass {}:       max |E - μ| = {:.6e} meV", pass, residual)?;
        }
        writeln!(file, "Final residual:      {:.6e} meV", self.final_residual)?;
        writeln!(file)?;

        writeln!(file, "SOLVER")?;
        writeln!(file, "{}", "-".repeat(60))?;
        if let Some(bandwidth) = self.bandwidth {
            writeln!(file, "Bandwidth:           {}", bandwidth)?;
        }
        writeln!(
            file,
            "Field:               ({:.4}, {:.4}, {:.4}) T",
            self.field[0], self.field[1], self.field[2]
        )?;
        writeln!(file, "Frequency:           {:.4} THz", self.frequency)?;
        writeln!(file, "Element builds:      {}", self.stats.element_builds)?;
        writeln!(file, "Scattering builds:   {}", self.stats.scattering_builds)?;
        writeln!(
            file,
            "Derivative builds:   {} ({} rescales)",
            self.stats.derivative_builds, self.stats.derivative_rescales
        )?;
        writeln!(file, "Operator builds:     {}", self.stats.operator_builds)?;
        writeln!(file, "Solved columns:      {}", self.stats.solved_columns)?;
        writeln!(file)?;

        writeln!(file, "CONDUCTIVITY TENSOR (S/m)")?;
        writeln!(file, "{}", "-".repeat(60))?;
        for i in 0..3 {
            let row: Vec<String> = (0..3)
                .map(|j| {
                    let s = self.sigma[(i, j)];
                    format!("{:>12.4e}{:+.2e}i", s.re, s.im)
                })
                .collect();
            writeln!(file, "{}", row.join("  "))?;
        }
        writeln!(file)?;

        if let Some((label, value)) = &self.reference {
            writeln!(file, "REFERENCE")?;
            writeln!(file, "{}", "-".repeat(60))?;
            writeln!(file, "{:<20} {:.6e} S/m", format!("{}:", label), value)?;
            writeln!(
                file,
                "Relative deviation:  {:.3e}",
                (self.sigma[(0, 0)].re - value) / value
            )?;
            writeln!(file)?;
        }

        writeln!(file, "{}", "=".repeat(60))?;

        Ok(())
    }

    pub fn print_to_console(&self) {
        println!("\n{}", "=".repeat(60));
        println!("RUN SUMMARY");
        println!("{}", "=".repeat(60));
        println!(
            "Mesh:          {} points, {} faces",
            self.periodic_points, self.num_faces
        );
        println!("Residual:      {:.3e} meV", self.final_residual);
        if let Some(bandwidth) = self.bandwidth {
            println!("Bandwidth:     {}", bandwidth);
        }
        println!(
            "σ_xx, σ_xy:    {:.4e}, {:.4e} S/m",
            self.sigma[(0, 0)].re,
            self.sigma[(0, 1)].re
        );
        if let Some((label, value)) = &self.reference {
            println!("{:<15}{:.4e} S/m", format!("{}:", label), value);
        }
        println!("{}\n", "=".repeat(60));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::free_electron::free_electron_problem_def;
    use std::fs;

    #[test]
    fn summary_lists_mesh_and_tensor() {
        let (mut band, params) = free_electron_problem_def(0.6, 1.0, 10, false).unwrap();
        let report = band.discretize().unwrap();
        let mut conductivity = Conductivity::new(band).with_scattering_rate(1.0);
        conductivity.calculate(0, 0).unwrap();

        let mut summary = RunSummary::from_run(&conductivity, &report);
        summary.add_reference("Drude", params.drude_conductivity(1.0));
        assert_eq!(summary.periodic_points, conductivity.band().mesh().num_points());
        assert_eq!(summary.stats.solved_columns, 1);

        let path = std::env::temp_dir().join("fsfem_test_summary.txt");
        summary.write_to_file(&path).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("CONDUCTIVITY TENSOR"));
        assert!(content.contains("Drude:"));
        fs::remove_file(&path).ok();
    }
}
