use fem_miniapp::assembly::{
    add_diagonal, apply_lifting, assemble_matrix, assemble_vector, create_sparsity_pattern, set_bc, AssemblyError,
};
use fem_miniapp::bc::DirichletBc;
use fem_miniapp::form::{BilinearForm, FormError, LinearForm};
use fem_miniapp::function::Function;
use fem_miniapp::index_map::IndexMap;
use fem_miniapp::mesh::procedural::create_unit_square_uniform_tri_mesh_2d;
use fem_miniapp::space::{locate_dofs_geometrical, FunctionSpace};
use matrixcompare::{assert_matrix_eq, assert_scalar_eq};
use nalgebra::{DMatrix, DVector};
use std::collections::BTreeSet;
use std::convert::Infallible;
use std::sync::Arc;

fn unit_square_space(cells_per_dim: usize) -> Arc<FunctionSpace> {
    FunctionSpace::lagrange_p1(Arc::new(create_unit_square_uniform_tri_mesh_2d(cells_per_dim)))
}

/// The 3x3 vertex unit square as seen by a process owning global indices 4..10, with the top row
/// of vertices as ghosts.
fn ghosted_space() -> Arc<FunctionSpace> {
    let index_map = IndexMap::new(4..10, vec![1, 2, 12], 13).unwrap();
    let mesh = create_unit_square_uniform_tri_mesh_2d(2)
        .with_vertex_map(index_map)
        .unwrap();
    FunctionSpace::lagrange_p1(Arc::new(mesh))
}

fn assemble_dense(a: &BilinearForm, bcs: &[Arc<DirichletBc>]) -> DMatrix<f64> {
    let n = a.function_space().num_dofs();
    let mut dense = DMatrix::zeros(n, n);
    assemble_matrix(
        |rows: &[usize], cols: &[usize], values: &[f64]| -> Result<(), Infallible> {
            for (i, &row) in rows.iter().enumerate() {
                for (j, &col) in cols.iter().enumerate() {
                    dense[(row, col)] += values[i * cols.len() + j];
                }
            }
            Ok(())
        },
        a,
        bcs,
    )
    .unwrap();
    dense
}

fn left_side_bc(space: &Arc<FunctionSpace>, value: impl Fn(&nalgebra::Point2<f64>) -> f64 + Sync) -> Arc<DirichletBc> {
    let mut g = Function::new(space.clone());
    g.interpolate(value);
    let dofs = locate_dofs_geometrical(space, |x| x.x < 1e-12);
    Arc::new(DirichletBc::new(Arc::new(g), dofs).unwrap())
}

#[test]
fn laplace_element_matrix_of_right_triangle() {
    let space = unit_square_space(1);
    let a = BilinearForm::laplace(space);
    // Cell 0 has vertices (0, 0), (1, 0), (1, 1), with the right angle at the second vertex
    #[rustfmt::skip]
    let expected = DMatrix::from_row_slice(3, 3, &[
         0.5, -0.5,  0.0,
        -0.5,  1.0, -0.5,
         0.0, -0.5,  0.5,
    ]);
    let a_element = a.assemble_cell_matrix(0).unwrap();
    assert_matrix_eq!(DMatrix::from_iterator(3, 3, a_element.iter().copied()), expected, comp = abs, tol = 1e-14);
    assert_eq!(a.assemble_cell_matrix(2), Err(FormError::CellOutOfBounds(2)));
}

#[test]
fn laplace_matrix_is_five_point_stencil_in_interior() {
    let space = unit_square_space(2);
    let a = assemble_dense(&BilinearForm::laplace(space), &[]);

    assert_matrix_eq!(a, a.transpose(), comp = abs, tol = 1e-14);
    // Constants are in the kernel
    let row_sums = &a * DVector::repeat(9, 1.0);
    assert_matrix_eq!(row_sums, DVector::zeros(9), comp = abs, tol = 1e-13);

    // Vertex 4 is the center of the square
    let expected_row = [0.0, -1.0, 0.0, -1.0, 4.0, -1.0, 0.0, -1.0, 0.0];
    for (col, expected) in expected_row.iter().enumerate() {
        assert_scalar_eq!(a[(4, col)], *expected, comp = abs, tol = 1e-13);
    }
}

#[test]
fn constrained_rows_and_columns_are_zeroed() {
    let space = unit_square_space(2);
    let bc = left_side_bc(&space, |_| 0.0);
    let form = BilinearForm::laplace(space.clone());
    let mut a = assemble_dense(&form, &[bc.clone()]);

    for &dof in bc.dofs() {
        assert!(a.row(dof).iter().all(|&v| v == 0.0));
        assert!(a.column(dof).iter().all(|&v| v == 0.0));
    }
    assert_scalar_eq!(a[(4, 4)], 4.0, comp = abs, tol = 1e-13);

    add_diagonal(
        |rows: &[usize], cols: &[usize], values: &[f64]| -> Result<(), Infallible> {
            a[(rows[0], cols[0])] += values[0];
            Ok(())
        },
        &space,
        &[bc.clone()],
        1.0,
    )
    .unwrap();
    for &dof in bc.dofs() {
        assert_eq!(a[(dof, dof)], 1.0);
    }
}

#[test]
fn insertion_errors_are_propagated() {
    #[derive(Debug, thiserror::Error)]
    #[error("rejected")]
    struct Rejected;

    let space = unit_square_space(1);
    let a = BilinearForm::laplace(space);
    let err = assemble_matrix(|_: &[usize], _: &[usize], _: &[f64]| Err(Rejected), &a, &[]).unwrap_err();
    assert!(matches!(err, AssemblyError::Insert(Rejected)));
}

#[test]
fn boundary_conditions_from_other_spaces_are_rejected() {
    let space = unit_square_space(1);
    let other_space = unit_square_space(1);
    let bc = left_side_bc(&other_space, |_| 0.0);
    let a = BilinearForm::laplace(space);
    let result = assemble_matrix(|_: &[usize], _: &[usize], _: &[f64]| Ok::<_, Infallible>(()), &a, &[bc]);
    assert!(matches!(result, Err(AssemblyError::ForeignBoundaryCondition)));
}

#[test]
fn source_and_flux_vectors_integrate_constants() {
    let space = unit_square_space(4);
    let mut one = Function::new(space.clone());
    one.interpolate(|_| 1.0);
    let one = Arc::new(one);

    let source = LinearForm::new(space.clone()).with_source(one.clone()).unwrap();
    let mut b = vec![0.0; space.num_dofs()];
    assemble_vector(&mut b, &source).unwrap();
    assert_scalar_eq!(b.iter().sum::<f64>(), 1.0, comp = abs, tol = 1e-13);

    let flux = LinearForm::new(space.clone()).with_boundary_flux(one).unwrap();
    assert_eq!(flux.exterior_facets().len(), 16);
    let mut b = vec![0.0; space.num_dofs()];
    assemble_vector(&mut b, &flux).unwrap();
    assert_scalar_eq!(b.iter().sum::<f64>(), 4.0, comp = abs, tol = 1e-13);
    // Interior dofs receive no flux
    assert_eq!(b[6], 0.0);

    let mut too_short = vec![0.0; 3];
    assert!(matches!(
        assemble_vector(&mut too_short, &source),
        Err(AssemblyError::VectorLength { expected: 25, actual: 3 })
    ));
}

#[test]
fn coefficients_must_live_on_the_form_space() {
    let space = unit_square_space(1);
    let foreign = Arc::new(Function::new(unit_square_space(1)).with_name("f"));
    let err = LinearForm::new(space).with_source(foreign).unwrap_err();
    assert_eq!(err, FormError::ForeignCoefficient("f".to_string()));
}

#[test]
fn lifting_and_set_bc_reproduce_boundary_values() {
    let space = unit_square_space(2);
    let bc = left_side_bc(&space, |x| 1.0 + x.y);
    let bcs = [bc.clone()];
    let form = BilinearForm::laplace(space.clone());
    let full = assemble_dense(&form, &[]);

    let mut b = vec![0.0; space.num_dofs()];
    apply_lifting(&mut b, &form, &bcs, None, 1.0).unwrap();

    // Lifting subtracts the columns of the constrained dofs, weighted by their values
    let g = bc.value().coefficients();
    let mut g_constrained = DVector::zeros(space.num_dofs());
    for &dof in bc.dofs() {
        g_constrained[dof] = g[dof];
    }
    let expected = -(&full * &g_constrained);
    assert_matrix_eq!(DVector::from_vec(b.clone()), expected, comp = abs, tol = 1e-13);

    set_bc(&mut b, &bcs, None, 1.0).unwrap();
    for &dof in bc.dofs() {
        assert_eq!(b[dof], g[dof]);
    }

    // With x0 = g, the lifting vanishes and the boundary values become zero
    let mut b = vec![0.0; space.num_dofs()];
    apply_lifting(&mut b, &form, &bcs, Some(g), 1.0).unwrap();
    set_bc(&mut b, &bcs, Some(g), 1.0).unwrap();
    assert!(b.iter().all(|&v| v.abs() < 1e-14));
}

#[test]
fn sparsity_pattern_of_single_square() {
    let space = unit_square_space(1);
    let pattern = create_sparsity_pattern(&BilinearForm::laplace(space));
    assert_eq!(pattern.num_rows(), 4);
    assert_eq!(pattern.num_nonzeros_per_row(), vec![4, 3, 3, 4]);
    assert_eq!(pattern.num_nonzeros(), 14);
    assert_eq!(pattern.global_columns(1), vec![0, 1, 3]);
    assert_eq!(pattern.off_diagonal_pattern().array().len(), 0);

    let csr_pattern = pattern.to_csr_pattern().unwrap();
    assert_eq!(csr_pattern.nnz(), 14);
    assert_eq!(csr_pattern.lane(2), &[0, 2, 3]);
}

#[test]
fn sparsity_pattern_stores_ghost_columns_by_global_index() {
    let space = ghosted_space();
    let index_map = space.index_map();
    let pattern = create_sparsity_pattern(&BilinearForm::laplace(space.clone()));
    assert_eq!(pattern.num_rows(), 6);

    let mut expected = vec![BTreeSet::new(); 6];
    for dofs in space.dofmap().iter() {
        for &row in dofs.iter().filter(|&&row| row < 6) {
            expected[row].extend(dofs.iter().map(|&col| index_map.local_to_global(col).unwrap()));
        }
    }

    let mut num_off_diagonal = 0;
    for row in 0..6 {
        assert!(pattern.diagonal_pattern().links(row).iter().all(|&col| col < 6));
        let off_diagonal = pattern.off_diagonal_pattern().links(row);
        assert!(off_diagonal.iter().all(|col| [1, 2, 12].contains(col)));
        num_off_diagonal += off_diagonal.len();
        assert_eq!(pattern.global_columns(row), expected[row].iter().copied().collect::<Vec<_>>());
    }
    assert!(num_off_diagonal > 0);

    let csr_pattern = pattern.to_csr_pattern().unwrap();
    assert_eq!(csr_pattern.major_dim(), 6);
    assert_eq!(csr_pattern.minor_dim(), 13);
}

#[test]
fn matrix_assembly_skips_ghost_rows() {
    let ghosted = assemble_dense(&BilinearForm::laplace(ghosted_space()), &[]);
    let serial = assemble_dense(&BilinearForm::laplace(unit_square_space(2)), &[]);
    // Local numbering and geometry coincide, so owned rows match the serial matrix
    assert_matrix_eq!(
        ghosted.rows(0, 6).into_owned(),
        serial.rows(0, 6).into_owned(),
        comp = abs,
        tol = 1e-14
    );
    assert!(ghosted.rows(6, 3).iter().all(|&v| v == 0.0));
}
