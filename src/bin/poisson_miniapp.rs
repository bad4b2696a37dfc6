use eyre::WrapErr;
use fem_miniapp::config::{MeshConfig, MiniappConfig, Preconditioner};
use fem_miniapp::io::msh::load_msh_from_file;
use fem_miniapp::io::vtk::FiniteElementMeshDataSetBuilder;
use fem_miniapp::mesh::procedural::create_unit_square_uniform_tri_mesh_2d;
use fem_miniapp::mesh::Mesh;
use fem_miniapp::problem::{cross_validated_problem, problem, PoissonDefinition, PoissonProblem};
use fem_miniapp::timer::timings;
use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use structopt::StructOpt;
use tracing_subscriber::filter::LevelFilter;

/// Command line options
#[derive(StructOpt, Debug)]
#[structopt(
    name = "poisson-miniapp",
    about = "Assembles and solves a 2D Poisson problem with P1 elements"
)]
struct Options {
    /// JSON configuration file. Command line options override its values.
    #[structopt(long, parse(from_os_str))]
    config: Option<PathBuf>,

    /// Number of cells per side of the unit square mesh
    #[structopt(short = "n", long)]
    cells: Option<usize>,

    /// Load the mesh from a Gmsh MSH file instead
    #[structopt(long, parse(from_os_str), conflicts_with = "cells")]
    msh: Option<PathBuf>,

    /// Relative residual tolerance of the CG solver
    #[structopt(long)]
    tolerance: Option<f64>,

    #[structopt(long)]
    max_iter: Option<usize>,

    /// Either "none" or "jacobi"
    #[structopt(long)]
    preconditioner: Option<Preconditioner>,

    /// Only assemble through the CSR backend
    #[structopt(long)]
    no_cross_validate: bool,

    /// Write the solution to this VTK file
    #[structopt(long, parse(from_os_str))]
    vtk: Option<PathBuf>,

    #[structopt(long, default_value = "info")]
    log_level: LevelFilter,
}

impl Options {
    fn to_config(&self) -> eyre::Result<MiniappConfig> {
        let mut config = match &self.config {
            Some(path) => MiniappConfig::from_json_file(path)?,
            None => MiniappConfig::default(),
        };
        if let Some(cells_per_dim) = self.cells {
            config.mesh = MeshConfig::UnitSquare { cells_per_dim };
        }
        if let Some(path) = &self.msh {
            config.mesh = MeshConfig::Msh { path: path.clone() };
        }
        if let Some(tolerance) = self.tolerance {
            config.solver.relative_tolerance = tolerance;
        }
        if let Some(max_iter) = self.max_iter {
            config.solver.max_iterations = Some(max_iter);
        }
        if let Some(preconditioner) = self.preconditioner {
            config.solver.preconditioner = preconditioner;
        }
        if self.no_cross_validate {
            config.cross_validate = false;
        }
        if let Some(vtk) = &self.vtk {
            config.vtk_output = Some(vtk.clone());
        }
        Ok(config)
    }
}

fn create_mesh(config: &MeshConfig) -> eyre::Result<Mesh> {
    match config {
        MeshConfig::UnitSquare { cells_per_dim } => Ok(create_unit_square_uniform_tri_mesh_2d(*cells_per_dim)),
        MeshConfig::Msh { path } => load_msh_from_file(path),
    }
}

fn main() -> eyre::Result<()> {
    let options = Options::from_args();
    tracing_subscriber::fmt()
        .with_max_level(options.log_level)
        .init();

    let config = options.to_config()?;
    info!("Running with configuration:\n{}", config.to_json_string()?);

    let mesh = Arc::new(create_mesh(&config.mesh).wrap_err("failed to create mesh")?);
    info!(
        "Mesh has {} vertices and {} cells",
        mesh.vertices().len(),
        mesh.num_cells()
    );

    let definition = PoissonDefinition::default();
    let PoissonProblem { solve, mut u, .. } = if config.cross_validate {
        let cross_validated = cross_validated_problem(mesh.clone(), &definition, &config.solver)?;
        if !cross_validated.comparison.is_consistent(1e-12) {
            warn!(
                "Backends disagree: relative discrepancy {:e}",
                cross_validated.comparison.max_relative_discrepancy()
            );
        }
        cross_validated.problem
    } else {
        problem(mesh.clone(), &definition, &config.solver)?
    };

    let output = solve(&mut u)?;
    info!(
        "Solved in {} iterations, residual norm {:e}, solution norm {}",
        output.num_iterations,
        output.residual_norm,
        u.coefficients().norm()
    );

    if let Some(path) = &config.vtk_output {
        FiniteElementMeshDataSetBuilder::from_mesh(&mesh)
            .with_title("Poisson solution")
            .with_function(&u)
            .try_export(path)?;
        info!("Wrote solution to {}", path.display());
    }

    println!("{}", timings());
    Ok(())
}
