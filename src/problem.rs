//! Entry points assembling the Poisson problem of the miniapp.
//!
//! [`problem`] assembles the system into a CSR matrix and returns it together with a solve
//! callback. [`cross_validated_problem`] additionally assembles the same system through the
//! global-index backend in [`crate::la::crs`] and compares the norms of both.
use crate::assembly::{
    add_diagonal, apply_lifting, assemble_matrix, assemble_vector, create_sparsity_pattern, set_bc, AssemblyError,
    SparsityPattern,
};
use crate::bc::{BcError, DirichletBc};
use crate::config::{Preconditioner, SolverConfig};
use crate::form::{poisson_forms, BilinearForm, FormError, LinearForm};
use crate::function::Function;
use crate::la::crs::{CombineMode, CrsError, CrsGraph, CrsMatrix, Export, Map, Vector};
use crate::la::csr::{self, CsrError};
use crate::mesh::Mesh;
use crate::space::{locate_dofs_geometrical, FunctionSpace};
use crate::timer::Timer;
use eyre::eyre;
use fem_miniapp_sparse::cg::{
    CgOutput, ConjugateGradient, IdentityOperator, JacobiPreconditioner, LinearOperator, RelativeResidualCriterion,
    SolveError,
};
use log::{debug, info};
use nalgebra::{DVector, Point2};
use nalgebra_sparse::CsrMatrix;
use std::convert::Infallible;
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

pub type Expression = Arc<dyn Fn(&Point2<f64>) -> f64 + Send + Sync>;
pub type BoundaryMarker = Arc<dyn Fn(&Point2<f64>) -> bool + Send + Sync>;

/// Solves the assembled system, using the coefficients of the given function as the initial
/// guess and storing the solution in them.
pub type SolveFn = Box<dyn Fn(&mut Function) -> eyre::Result<SolveOutput> + Send + Sync>;

#[derive(Debug, Error)]
pub enum ProblemError {
    #[error("Could not insert on row {row}")]
    InsertionFailed { row: usize },
    #[error("local row {0} is not part of the index map")]
    UnknownLocalRow(usize),
    #[error("insertion of {num_values} values does not match {num_rows} rows and {num_cols} columns")]
    ValueCountMismatch {
        num_rows: usize,
        num_cols: usize,
        num_values: usize,
    },
    #[error(transparent)]
    Assembly(AssemblyError),
    #[error(transparent)]
    Form(#[from] FormError),
    #[error(transparent)]
    BoundaryCondition(#[from] BcError),
    #[error(transparent)]
    Csr(#[from] CsrError),
    #[error(transparent)]
    Crs(#[from] CrsError),
}

impl From<Infallible> for ProblemError {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

impl<E> From<AssemblyError<E>> for ProblemError
where
    E: Error + Into<ProblemError> + 'static,
{
    fn from(err: AssemblyError<E>) -> Self {
        match err.into_insert_error() {
            Ok(insert_err) => insert_err.into(),
            Err(assembly_err) => ProblemError::Assembly(assembly_err),
        }
    }
}

/// The data defining a Poisson problem `-div grad u = f` with `u = u0` on the Dirichlet
/// boundary and `grad u . n = g` on the remaining boundary.
#[derive(Clone)]
pub struct PoissonDefinition {
    pub source: Expression,
    pub boundary_flux: Expression,
    pub dirichlet_value: Expression,
    pub dirichlet_boundary: BoundaryMarker,
}

impl Default for PoissonDefinition {
    /// A Gaussian source centered in the unit square, a flux of `sin(5x)` and homogeneous
    /// Dirichlet conditions on the left and right sides.
    fn default() -> Self {
        Self {
            source: Arc::new(|x| {
                let dx = x.x - 0.5;
                let dy = x.y - 0.5;
                10.0 * (-(dx * dx + dy * dy) / 0.02).exp()
            }),
            boundary_flux: Arc::new(|x| (5.0 * x.x).sin()),
            dirichlet_value: Arc::new(|_| 0.0),
            dirichlet_boundary: Arc::new(|x| x.x < f64::EPSILON || x.x > 1.0 - f64::EPSILON),
        }
    }
}

impl PoissonDefinition {
    pub fn with_source(self, f: impl Fn(&Point2<f64>) -> f64 + Send + Sync + 'static) -> Self {
        Self {
            source: Arc::new(f),
            ..self
        }
    }

    pub fn with_boundary_flux(self, g: impl Fn(&Point2<f64>) -> f64 + Send + Sync + 'static) -> Self {
        Self {
            boundary_flux: Arc::new(g),
            ..self
        }
    }

    pub fn with_dirichlet_value(self, u0: impl Fn(&Point2<f64>) -> f64 + Send + Sync + 'static) -> Self {
        Self {
            dirichlet_value: Arc::new(u0),
            ..self
        }
    }

    pub fn with_dirichlet_boundary(self, marker: impl Fn(&Point2<f64>) -> bool + Send + Sync + 'static) -> Self {
        Self {
            dirichlet_boundary: Arc::new(marker),
            ..self
        }
    }
}

impl fmt::Debug for PoissonDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoissonDefinition").finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveOutput {
    pub num_iterations: usize,
    /// The Euclidean norm of `b - A u` after the solve.
    pub residual_norm: f64,
}

/// The assembled CSR system.
pub struct PoissonProblem {
    pub a: Arc<CsrMatrix<f64>>,
    pub b: Arc<DVector<f64>>,
    /// Zero-initialized placeholder for the solution.
    pub u: Function,
    pub solve: SolveFn,
    pub space: Arc<FunctionSpace>,
    pub bc: Arc<DirichletBc>,
}

impl fmt::Debug for PoissonProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoissonProblem")
            .field("num_rows", &self.a.nrows())
            .field("nnz", &self.a.nnz())
            .field("num_constrained_dofs", &self.bc.dofs().len())
            .finish_non_exhaustive()
    }
}

/// Frobenius norm of a matrix and Euclidean norm of a right-hand side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssemblyNorms {
    pub matrix_frobenius_norm: f64,
    pub rhs_norm: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssemblyComparison {
    pub csr: AssemblyNorms,
    pub crs: AssemblyNorms,
}

impl AssemblyComparison {
    /// The larger of the relative differences between the matrix norms and the vector norms.
    pub fn max_relative_discrepancy(&self) -> f64 {
        let relative = |a: f64, b: f64| {
            let scale = a.abs().max(b.abs());
            if scale == 0.0 {
                0.0
            } else {
                (a - b).abs() / scale
            }
        };
        relative(self.csr.matrix_frobenius_norm, self.crs.matrix_frobenius_norm)
            .max(relative(self.csr.rhs_norm, self.crs.rhs_norm))
    }

    pub fn is_consistent(&self, tolerance: f64) -> bool {
        self.max_relative_discrepancy() <= tolerance
    }
}

/// The system assembled by both backends.
#[derive(Debug)]
pub struct CrossValidatedProblem {
    pub problem: PoissonProblem,
    pub crs_matrix: CrsMatrix,
    pub crs_rhs: Vector,
    pub comparison: AssemblyComparison,
}

/// Everything both backends share: space, boundary condition, forms and sparsity pattern.
struct PoissonSetup {
    space: Arc<FunctionSpace>,
    bcs: Vec<Arc<DirichletBc>>,
    a: BilinearForm,
    l: LinearForm,
    pattern: SparsityPattern,
}

fn setup(mesh: Arc<Mesh>, definition: &PoissonDefinition) -> Result<PoissonSetup, ProblemError> {
    let mut t0 = Timer::new("FunctionSpace");
    let space = FunctionSpace::lagrange_p1(mesh);
    t0.stop();

    let _t1 = Timer::new("Assemble");

    let mut u0 = Function::new(space.clone()).with_name("u0");
    u0.interpolate(definition.dirichlet_value.as_ref());
    let marker = definition.dirichlet_boundary.clone();
    let boundary_dofs = locate_dofs_geometrical(&space, |x| marker(x));
    debug!("Located {} Dirichlet dofs", boundary_dofs.len());
    let bc = Arc::new(DirichletBc::new(Arc::new(u0), boundary_dofs)?);

    let mut f = Function::new(space.clone()).with_name("f");
    f.interpolate(definition.source.as_ref());
    let mut g = Function::new(space.clone()).with_name("g");
    g.interpolate(definition.boundary_flux.as_ref());

    let (a, l) = poisson_forms(space.clone(), Arc::new(f), Arc::new(g))?;
    let pattern = create_sparsity_pattern(&a);
    debug!(
        "Sparsity pattern has {} rows and {} nonzeros",
        pattern.num_rows(),
        pattern.num_nonzeros()
    );

    Ok(PoissonSetup {
        space,
        bcs: vec![bc],
        a,
        l,
        pattern,
    })
}

/// Assembles the right-hand side with lifting and boundary values into a vector over all
/// local dofs.
fn assemble_rhs(setup: &PoissonSetup) -> Result<DVector<f64>, ProblemError> {
    let mut b = csr::create_vector(setup.space.index_map());
    assemble_vector(b.as_mut_slice(), &setup.l)?;
    apply_lifting(b.as_mut_slice(), &setup.a, &setup.bcs, None, 1.0)?;
    set_bc(b.as_mut_slice(), &setup.bcs, None, 1.0)?;
    Ok(b)
}

fn assemble_csr_system(setup: &PoissonSetup, solver_config: &SolverConfig) -> Result<PoissonProblem, ProblemError> {
    let index_map = setup.space.index_map();
    let mut a = csr::create_matrix(&setup.pattern)?;
    csr::zero_entries(&mut a);

    let mut t2 = Timer::new("Assemble matrix");
    assemble_matrix(csr::add_fn(&mut a, index_map), &setup.a, &setup.bcs)?;
    add_diagonal(csr::add_fn(&mut a, index_map), &setup.space, &setup.bcs, 1.0)?;
    t2.stop();
    info!("NormA(CSR) = {}", csr::frobenius_norm(&a));

    let mut t3 = Timer::new("Assemble vector");
    let b = assemble_rhs(setup)?;
    t3.stop();
    info!("Norm[b](CSR) = {}", csr::vector_norm(&b, index_map));

    let a = Arc::new(a);
    let b = Arc::new(b);
    Ok(PoissonProblem {
        solve: make_solver(a.clone(), b.clone(), solver_config.clone()),
        a,
        b,
        u: Function::new(setup.space.clone()),
        space: setup.space.clone(),
        bc: setup.bcs[0].clone(),
    })
}

/// Assembles the Poisson problem into a CSR matrix and vector.
///
/// The rows and columns of constrained dofs are zeroed with a unit diagonal, and the
/// right-hand side holds the boundary values at constrained dofs.
pub fn problem(
    mesh: Arc<Mesh>,
    definition: &PoissonDefinition,
    solver_config: &SolverConfig,
) -> Result<PoissonProblem, ProblemError> {
    let setup = setup(mesh, definition)?;
    assemble_csr_system(&setup, solver_config)
}

/// Returns an insertion callback which sums row-major blocks into `matrix` by global index.
///
/// Local rows and columns are translated to global indices through `global_indices`. If fewer
/// entries of a row are valid than were passed, the callback fails with
/// [`ProblemError::InsertionFailed`] carrying the global row. A local row without a global index
/// fails with [`ProblemError::UnknownLocalRow`].
pub fn sum_into_global_fn<'a>(
    matrix: &'a mut CrsMatrix,
    global_indices: &'a [usize],
) -> impl FnMut(&[usize], &[usize], &[f64]) -> Result<(), ProblemError> + 'a {
    let mut global_cols = Vec::new();
    move |rows: &[usize], cols: &[usize], data: &[f64]| {
        let nc = cols.len();
        if data.len() != rows.len() * nc {
            return Err(ProblemError::ValueCountMismatch {
                num_rows: rows.len(),
                num_cols: nc,
                num_values: data.len(),
            });
        }

        global_cols.clear();
        // Unknown local columns can never be valid entries
        global_cols.extend(
            cols.iter()
                .map(|&c| global_indices.get(c).copied().unwrap_or(usize::MAX)),
        );
        for (&row, row_data) in rows.iter().zip(data.chunks_exact(nc.max(1))) {
            let global_row = *global_indices
                .get(row)
                .ok_or(ProblemError::UnknownLocalRow(row))?;
            let num_valid = matrix.sum_into_global_values(global_row, &global_cols, row_data);
            if num_valid != nc {
                return Err(ProblemError::InsertionFailed { row: global_row });
            }
        }
        Ok(())
    }
}

/// Builds the global-index matrix from the sparsity pattern and assembles into it.
fn assemble_crs_matrix(
    setup: &PoissonSetup,
    global_indices: &[usize],
    vec_map: &Arc<Map>,
) -> Result<CrsMatrix, ProblemError> {
    let pattern = &setup.pattern;
    let diagonal_pattern = pattern.diagonal_pattern();
    let off_diagonal_pattern = pattern.off_diagonal_pattern();
    let r0 = setup.space.index_map().local_range().start;

    let mut graph = CrsGraph::new(vec_map.clone(), pattern.num_nonzeros_per_row())?;
    for i in 0..diagonal_pattern.num_nodes() {
        let mut indices: Vec<usize> = diagonal_pattern.links(i).iter().map(|&q| q + r0).collect();
        indices.extend_from_slice(off_diagonal_pattern.links(i));
        graph.insert_global_indices(global_indices[i], &indices)?;
    }
    graph.fill_complete(vec_map.clone(), vec_map.clone());

    let mut a_crs = CrsMatrix::new(Arc::new(graph))?;
    {
        let mut insert = sum_into_global_fn(&mut a_crs, global_indices);
        assemble_matrix(&mut insert, &setup.a, &setup.bcs)?;
        add_diagonal(&mut insert, &setup.space, &setup.bcs, 1.0)?;
    }
    a_crs.fill_complete(vec_map.clone(), vec_map.clone());
    Ok(a_crs)
}

/// Assembles the Poisson problem through both backends and compares the results.
///
/// The global-index backend uses an overlapping map over all local dofs for the assembled
/// right-hand side and a one-to-one map over the owned dofs for the matrix rows and the final
/// right-hand side, into which the overlapping vector is exported with [`CombineMode::Add`].
/// Ghost entries are owned by other processes and stay out of both systems.
pub fn cross_validated_problem(
    mesh: Arc<Mesh>,
    definition: &PoissonDefinition,
    solver_config: &SolverConfig,
) -> Result<CrossValidatedProblem, ProblemError> {
    let setup = setup(mesh, definition)?;
    let index_map = setup.space.index_map();
    let global_indices = index_map.global_indices();
    let size_global = index_map.size_global();

    let col_map = Arc::new(Map::new(size_global, global_indices.clone())?);
    let vec_map = Arc::new(Map::new(size_global, global_indices[..index_map.size_local()].to_vec())?);

    let a_crs = assemble_crs_matrix(&setup, &global_indices, &vec_map)?;
    let crs_matrix_norm = a_crs.frobenius_norm();
    info!("NormA(CRS) = {}", crs_matrix_norm);

    let b_dist = Vector::from_values(col_map.clone(), assemble_rhs(&setup)?)?;
    let mut b_crs = Vector::new(vec_map.clone());
    let vec_export = Export::with_remote_owners(col_map, vec_map)?;
    if !vec_export.remote_indices().is_empty() {
        debug!(
            "{} ghost entries of the right-hand side are owned by other processes",
            vec_export.remote_indices().len()
        );
    }
    b_crs.do_export(&b_dist, &vec_export, CombineMode::Add)?;
    let crs_rhs_norm = b_crs.norm2();
    info!("Norm[b](CRS) = {}", crs_rhs_norm);

    let problem = assemble_csr_system(&setup, solver_config)?;
    let comparison = AssemblyComparison {
        csr: AssemblyNorms {
            matrix_frobenius_norm: csr::frobenius_norm(&problem.a),
            rhs_norm: csr::vector_norm(&problem.b, index_map),
        },
        crs: AssemblyNorms {
            matrix_frobenius_norm: crs_matrix_norm,
            rhs_norm: crs_rhs_norm,
        },
    };
    info!(
        "Maximum relative discrepancy between backends: {:e}",
        comparison.max_relative_discrepancy()
    );

    Ok(CrossValidatedProblem {
        problem,
        crs_matrix: a_crs,
        crs_rhs: b_crs,
        comparison,
    })
}

fn run_cg<P>(
    a: &CsrMatrix<f64>,
    preconditioner: P,
    b: &DVector<f64>,
    x: &mut DVector<f64>,
    config: &SolverConfig,
) -> Result<CgOutput<f64>, SolveError<f64>>
where
    P: LinearOperator<f64>,
{
    let mut cg = ConjugateGradient::new()
        .with_operator(a)
        .with_preconditioner(preconditioner)
        .with_stopping_criterion(RelativeResidualCriterion::new(config.relative_tolerance));
    if let Some(max_iter) = config.max_iterations {
        cg = cg.with_max_iter(max_iter);
    }
    cg.solve_with_guess(b, x)
}

fn make_solver(a: Arc<CsrMatrix<f64>>, b: Arc<DVector<f64>>, config: SolverConfig) -> SolveFn {
    Box::new(move |u: &mut Function| {
        let _timer = Timer::new("Solve");
        let x = u.coefficients_mut();
        if x.len() != b.len() || a.ncols() != b.len() {
            return Err(eyre!(
                "solution has {} coefficients, but the system has {} rows and {} columns",
                x.len(),
                b.len(),
                a.ncols()
            ));
        }

        let output = match config.preconditioner {
            Preconditioner::None => run_cg(a.as_ref(), IdentityOperator, b.as_ref(), x, &config)?,
            Preconditioner::Jacobi => {
                let jacobi = JacobiPreconditioner::from_csr(a.as_ref())?;
                run_cg(a.as_ref(), jacobi, b.as_ref(), x, &config)?
            }
        };

        let mut ax = DVector::zeros(b.len());
        a.as_ref()
            .apply((&mut ax).into(), (&*x).into())
            .map_err(|err| eyre!("failed to compute residual: {}", err))?;
        let residual_norm = (b.as_ref() - ax).norm();
        info!(
            "CG finished after {} iterations with residual norm {:e}",
            output.num_iterations, residual_norm
        );

        Ok(SolveOutput {
            num_iterations: output.num_iterations,
            residual_norm,
        })
    })
}
