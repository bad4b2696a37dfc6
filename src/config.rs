//! Run configuration, loadable from JSON.
use eyre::{eyre, WrapErr};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MeshConfig {
    /// Uniform triangle mesh of the unit square.
    UnitSquare { cells_per_dim: usize },
    /// Triangle mesh loaded from a Gmsh MSH file.
    Msh { path: PathBuf },
}

impl Default for MeshConfig {
    fn default() -> Self {
        MeshConfig::UnitSquare { cells_per_dim: 32 }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Preconditioner {
    None,
    #[default]
    Jacobi,
}

impl FromStr for Preconditioner {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Preconditioner::None),
            "jacobi" => Ok(Preconditioner::Jacobi),
            _ => Err(eyre!("unknown preconditioner \"{}\" (expected \"none\" or \"jacobi\")", s)),
        }
    }
}

/// Settings of the conjugate gradient solver used by the solve callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub relative_tolerance: f64,
    pub max_iterations: Option<usize>,
    pub preconditioner: Preconditioner,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            relative_tolerance: 1e-10,
            max_iterations: None,
            preconditioner: Preconditioner::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiniappConfig {
    pub mesh: MeshConfig,
    pub solver: SolverConfig,
    /// Whether to additionally assemble through the global-index backend and compare.
    pub cross_validate: bool,
    /// Where to write the solution as a VTK file, if anywhere.
    pub vtk_output: Option<PathBuf>,
}

impl Default for MiniappConfig {
    fn default() -> Self {
        Self {
            mesh: MeshConfig::default(),
            solver: SolverConfig::default(),
            cross_validate: true,
            vtk_output: None,
        }
    }
}

impl MiniappConfig {
    pub fn from_json_str(json: &str) -> eyre::Result<Self> {
        serde_json::from_str(json).wrap_err("failed to parse miniapp configuration")
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).wrap_err_with(|| format!("failed to open config file {}", path.display()))?;
        serde_json::from_reader(BufReader::new(file))
            .wrap_err_with(|| format!("failed to parse config file {}", path.display()))
    }

    pub fn to_json_string(&self) -> eyre::Result<String> {
        serde_json::to_string_pretty(self).wrap_err("failed to serialize miniapp configuration")
    }
}
