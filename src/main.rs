use std::fs;
use std::time::Instant;

use fsfem_rs::models::free_electron::{free_electron_problem_def, FreeElectronParams};
use fsfem_rs::models::tight_binding::{tight_binding_problem_def, TightBindingParams};
use fsfem_rs::numerics::timing;
use fsfem_rs::processing::csv_writer;
use fsfem_rs::processing::summary::RunSummary;
use fsfem_rs::Conductivity;
use glam::DVec3;

const SCATTERING_RATE: f64 = 1.0; // [THz]

fn main() {
    env_logger::init();
    fs::create_dir_all("output/main").expect("Failed to create output directory");

    let (mut band, params) = free_electron_problem_def(0.6, 1.0, 24, true)
        .expect("Failed to set up free electron band");
    let report = band.discretize().expect("Failed to discretize Fermi surface");

    let mut conductivity = Conductivity::new(band).with_scattering_rate(SCATTERING_RATE);

    timing::reset_timing();
    let start = Instant::now();
    conductivity
        .calculate([0, 1, 2], [0, 1, 2])
        .expect("Failed to calculate conductivity");
    timing::finalize_and_print(start.elapsed());

    let drude = params.drude_conductivity(SCATTERING_RATE);
    println!("Zero field conductivity (S/m):");
    print_tensor(&conductivity);
    println!("Drude reference: {:.4e} S/m\n", drude);

    let mut summary = RunSummary::from_run(&conductivity, &report);
    summary.add_reference("Drude", drude);

    save_surface(&conductivity);
    field_sweep(&mut conductivity, &params);

    summary
        .write_to_file("output/main/run_summary.txt")
        .expect("Failed to write summary");
    summary.print_to_console();
    println!("Summary saved to output/main/run_summary.txt");

    tight_binding_demo();
}

fn print_tensor(conductivity: &Conductivity) {
    let sigma = conductivity.sigma_dc();
    for i in 0..3 {
        println!(
            "  {:>12.4e} {:>12.4e} {:>12.4e}",
            sigma[(i, 0)],
            sigma[(i, 1)],
            sigma[(i, 2)]
        );
    }
}

fn save_surface(conductivity: &Conductivity) {
    let mesh = conductivity.band().mesh();
    let velocities = conductivity.band().velocities(&mesh.kpoints_periodic);
    csv_writer::write_surface_points("output/main/surface_points.csv", mesh, &velocities)
        .expect("Failed to write surface points");
    csv_writer::write_surface_faces("output/main/surface_faces.csv", mesh)
        .expect("Failed to write surface faces");
    println!("Fermi surface saved to output/main/surface_points.csv and surface_faces.csv");
}

/// Magnetoresistance and Hall response against the Drude model, with the
/// field along z. Same direction, so only the field term is rescaled.
fn field_sweep(conductivity: &mut Conductivity, params: &FreeElectronParams) {
    let fields: Vec<f64> = (0..=8).map(|i| 5.0 * i as f64).collect();
    let mut sxx = Vec::with_capacity(fields.len());
    let mut sxy = Vec::with_capacity(fields.len());
    let mut drude_xx = Vec::with_capacity(fields.len());
    let mut drude_xy = Vec::with_capacity(fields.len());

    println!("Field sweep along z:");
    println!(
        "{:>8} {:>14} {:>14} {:>14} {:>14}",
        "B [T]", "σ_xx", "Drude σ_xx", "σ_xy", "Drude σ_xy"
    );
    for &b in &fields {
        conductivity.set_field(DVec3::new(0.0, 0.0, b));
        let block = conductivity
            .calculate(0, [0, 1])
            .expect("Failed to calculate conductivity in field");
        let (xx, xy) = params.drude_in_field(SCATTERING_RATE, b);
        println!(
            "{:>8.1} {:>14.4e} {:>14.4e} {:>14.4e} {:>14.4e}",
            b,
            block[(0, 0)].re,
            xx,
            block[(0, 1)].re,
            xy
        );
        sxx.push(block[(0, 0)].re);
        sxy.push(block[(0, 1)].re);
        drude_xx.push(xx);
        drude_xy.push(xy);
    }
    println!();

    csv_writer::write_csv(
        "output/main/field_sweep.csv",
        &["B", "sigma_xx", "sigma_xy", "drude_xx", "drude_xy"],
        &[fields, sxx, sxy, drude_xx, drude_xy],
    )
    .expect("Failed to write field sweep");
    println!("Field sweep saved to output/main/field_sweep.csv");
}

fn tight_binding_demo() {
    let params = TightBindingParams::default();
    let band = tight_binding_problem_def(&params, true).expect("Failed to set up tight-binding band");
    let mut conductivity = Conductivity::new(band)
        .with_scattering_rate(SCATTERING_RATE)
        .with_field(DVec3::new(0.0, 0.0, 10.0));

    match conductivity.calculate([0, 1, 2], [0, 1, 2]) {
        Ok(_) => {
            println!("Tight-binding conductivity at 10 T (S/m):");
            print_tensor(&conductivity);
            csv_writer::write_tensor("output/main/tight_binding_sigma.csv", conductivity.sigma())
                .expect("Failed to write tensor");
            println!("Tensor saved to output/main/tight_binding_sigma.csv");
        }
        Err(e) => eprintln!("Tight-binding calculation failed: {}", e),
    }
}
