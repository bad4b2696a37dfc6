use crate::bc::DirichletBc;
use crate::form::{BilinearForm, FormError, LinearForm};
use crate::space::FunctionSpace;
use crate::timer::Timer;
use nalgebra::{DVector, Matrix3};
use rayon::prelude::*;
use std::convert::Infallible;
use std::error::Error;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssemblyError<E = Infallible>
where
    E: Error + 'static,
{
    #[error(transparent)]
    Form(#[from] FormError),
    #[error("vector has length {actual}, but the function space has {expected} dofs")]
    VectorLength { expected: usize, actual: usize },
    #[error("boundary condition is defined on a different function space")]
    ForeignBoundaryCondition,
    #[error(transparent)]
    Insert(E),
}

impl<E: Error + 'static> AssemblyError<E> {
    /// Separates errors raised by the insertion callback from errors raised during assembly.
    pub fn into_insert_error(self) -> Result<E, AssemblyError> {
        match self {
            AssemblyError::Insert(e) => Ok(e),
            AssemblyError::Form(e) => Err(AssemblyError::Form(e)),
            AssemblyError::VectorLength { expected, actual } => Err(AssemblyError::VectorLength { expected, actual }),
            AssemblyError::ForeignBoundaryCondition => Err(AssemblyError::ForeignBoundaryCondition),
        }
    }
}

impl AssemblyError {
    /// Converts an error from a context without insertion into any other assembly error type.
    pub fn widen<E: Error + 'static>(self) -> AssemblyError<E> {
        match self {
            AssemblyError::Form(e) => AssemblyError::Form(e),
            AssemblyError::VectorLength { expected, actual } => AssemblyError::VectorLength { expected, actual },
            AssemblyError::ForeignBoundaryCondition => AssemblyError::ForeignBoundaryCondition,
            AssemblyError::Insert(never) => match never {},
        }
    }
}

/// Per-dof boundary data: whether each dof is constrained and its prescribed value.
struct BcData {
    marker: Vec<bool>,
    values: DVector<f64>,
}

fn collect_bc_data(space: &Arc<FunctionSpace>, bcs: &[Arc<DirichletBc>]) -> Result<BcData, AssemblyError> {
    let n = space.num_dofs();
    let mut marker = vec![false; n];
    let mut values = DVector::zeros(n);
    for bc in bcs {
        let g = bc.value();
        if !Arc::ptr_eq(g.function_space(), space) {
            return Err(AssemblyError::ForeignBoundaryCondition);
        }
        bc.mark_dofs(&mut marker);
        for &dof in bc.dofs() {
            values[dof] = g.coefficients()[dof];
        }
    }
    Ok(BcData { marker, values })
}

fn check_vector_length(space: &FunctionSpace, len: usize) -> Result<(), AssemblyError> {
    let expected = space.num_dofs();
    if len == expected {
        Ok(())
    } else {
        Err(AssemblyError::VectorLength { expected, actual: len })
    }
}

fn compute_cell_matrices(a: &BilinearForm) -> Result<Vec<Matrix3<f64>>, FormError> {
    let num_cells = a.function_space().dofmap().num_cells();
    (0..num_cells)
        .into_par_iter()
        .map(|cell| a.assemble_cell_matrix(cell))
        .collect()
}

/// Assembles the bilinear form through the given insertion callback.
///
/// For every cell the callback receives the local row and column dofs and the element matrix in
/// row-major order. Rows and columns of dofs constrained by `bcs` are zeroed before insertion,
/// so the diagonal of constrained dofs must be set separately with [`add_diagonal`].
///
/// Only rows of owned dofs are passed to the callback. Contributions to ghost rows belong to
/// the owning process and are not assembled here.
pub fn assemble_matrix<F, E>(mut insert: F, a: &BilinearForm, bcs: &[Arc<DirichletBc>]) -> Result<(), AssemblyError<E>>
where
    F: FnMut(&[usize], &[usize], &[f64]) -> Result<(), E>,
    E: Error + 'static,
{
    let _timer = Timer::new("Assemble matrix (cells)");
    let space = a.function_space();
    let bc_data = collect_bc_data(space, bcs).map_err(AssemblyError::widen::<E>)?;
    let cell_matrices = compute_cell_matrices(a)?;
    let size_local = space.index_map().size_local();

    let mut rows = Vec::with_capacity(3);
    let mut values = Vec::with_capacity(9);
    for (cell, mut a_element) in cell_matrices.into_iter().enumerate() {
        let dofs = space.dofmap().cell_dofs(cell);
        for (local, &dof) in dofs.iter().enumerate() {
            if bc_data.marker[dof] {
                a_element.row_mut(local).fill(0.0);
                a_element.column_mut(local).fill(0.0);
            }
        }

        rows.clear();
        values.clear();
        for (local, &dof) in dofs.iter().enumerate() {
            if dof < size_local {
                rows.push(dof);
                values.extend(a_element.row(local).iter().copied());
            }
        }
        if rows.is_empty() {
            continue;
        }
        insert(rows.as_slice(), dofs, values.as_slice()).map_err(AssemblyError::Insert)?;
    }
    Ok(())
}

/// Inserts `diagonal` on the diagonal of every owned dof constrained by `bcs`.
pub fn add_diagonal<F, E>(
    mut insert: F,
    space: &Arc<FunctionSpace>,
    bcs: &[Arc<DirichletBc>],
    diagonal: f64,
) -> Result<(), AssemblyError<E>>
where
    F: FnMut(&[usize], &[usize], &[f64]) -> Result<(), E>,
    E: Error + 'static,
{
    for bc in bcs {
        if !Arc::ptr_eq(bc.value().function_space(), space) {
            return Err(AssemblyError::ForeignBoundaryCondition);
        }
        for &dof in bc.owned_dofs() {
            insert(&[dof], &[dof], &[diagonal]).map_err(AssemblyError::Insert)?;
        }
    }
    Ok(())
}

/// Adds the contributions of the linear form to `b`, which holds one entry per local dof.
pub fn assemble_vector(b: &mut [f64], l: &LinearForm) -> Result<(), AssemblyError> {
    let _timer = Timer::new("Assemble vector (cells and facets)");
    let space = l.function_space();
    check_vector_length(space, b.len())?;

    if l.has_cell_integrals() {
        let num_cells = space.dofmap().num_cells();
        let cell_vectors = (0..num_cells)
            .into_par_iter()
            .map(|cell| l.assemble_cell_vector(cell))
            .collect::<Result<Vec<_>, _>>()?;
        for (cell, b_element) in cell_vectors.iter().enumerate() {
            for (&dof, b_i) in space.dofmap().cell_dofs(cell).iter().zip(b_element.iter()) {
                b[dof] += b_i;
            }
        }
    }

    if l.has_facet_integrals() {
        let facet_vectors = l
            .exterior_facets()
            .par_iter()
            .map(|facet| l.assemble_facet_vector(facet))
            .collect::<Result<Vec<_>, _>>()?;
        for (facet, b_facet) in l.exterior_facets().iter().zip(&facet_vectors) {
            for (&dof, b_i) in facet.facet.0.iter().zip(b_facet.iter()) {
                b[dof] += b_i;
            }
        }
    }
    Ok(())
}

/// Modifies `b` to account for the boundary conditions in the bilinear form:
/// `b <- b - scale * A (g - x0)`, where only the columns of constrained dofs contribute.
///
/// The product is computed cell by cell, so `A` never needs to be assembled. If `x0` is `None`
/// it is taken to be zero.
pub fn apply_lifting(
    b: &mut [f64],
    a: &BilinearForm,
    bcs: &[Arc<DirichletBc>],
    x0: Option<&DVector<f64>>,
    scale: f64,
) -> Result<(), AssemblyError> {
    let space = a.function_space();
    check_vector_length(space, b.len())?;
    if let Some(x0) = x0 {
        check_vector_length(space, x0.len())?;
    }
    let bc_data = collect_bc_data(space, bcs)?;

    let dofmap = space.dofmap();
    for cell in 0..dofmap.num_cells() {
        let dofs = dofmap.cell_dofs(cell);
        if !dofs.iter().any(|&dof| bc_data.marker[dof]) {
            continue;
        }

        let a_element = a.assemble_cell_matrix(cell)?;
        for (j, &dof_j) in dofs.iter().enumerate() {
            if !bc_data.marker[dof_j] {
                continue;
            }
            let x0_j = x0.map(|x0| x0[dof_j]).unwrap_or(0.0);
            let bc_value = bc_data.values[dof_j] - x0_j;
            for (i, &dof_i) in dofs.iter().enumerate() {
                b[dof_i] -= scale * a_element[(i, j)] * bc_value;
            }
        }
    }
    Ok(())
}

/// Sets `b[dof] = scale * (g[dof] - x0[dof])` for every owned dof constrained by `bcs`.
pub fn set_bc(
    b: &mut [f64],
    bcs: &[Arc<DirichletBc>],
    x0: Option<&DVector<f64>>,
    scale: f64,
) -> Result<(), AssemblyError> {
    for bc in bcs {
        let g = bc.value();
        check_vector_length(g.function_space(), b.len())?;
        if let Some(x0) = x0 {
            check_vector_length(g.function_space(), x0.len())?;
        }
        for &dof in bc.owned_dofs() {
            let x0_dof = x0.map(|x0| x0[dof]).unwrap_or(0.0);
            b[dof] = scale * (g.coefficients()[dof] - x0_dof);
        }
    }
    Ok(())
}
