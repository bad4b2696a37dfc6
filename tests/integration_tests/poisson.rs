use fem_miniapp::config::{Preconditioner, SolverConfig};
use fem_miniapp::function::Function;
use fem_miniapp::la::csr::vector_norm;
use fem_miniapp::mesh::procedural::create_unit_square_uniform_tri_mesh_2d;
use fem_miniapp::problem::{problem, PoissonDefinition};
use fem_miniapp::space::FunctionSpace;
use matrixcompare::assert_scalar_eq;
use std::sync::Arc;

fn tight_solver(preconditioner: Preconditioner) -> SolverConfig {
    SolverConfig {
        relative_tolerance: 1e-12,
        max_iterations: Some(1000),
        preconditioner,
    }
}

#[test]
fn default_problem_is_solved_by_callback() -> eyre::Result<()> {
    let mesh = Arc::new(create_unit_square_uniform_tri_mesh_2d(16));
    let mut poisson = problem(mesh, &PoissonDefinition::default(), &SolverConfig::default())?;

    assert_eq!(poisson.a.nrows(), 17 * 17);
    assert_eq!(poisson.b.len(), 17 * 17);
    assert!(poisson.u.coefficients().iter().all(|&v| v == 0.0));
    // Left and right sides
    assert_eq!(poisson.bc.dofs().len(), 2 * 17);

    let output = (poisson.solve)(&mut poisson.u)?;
    assert!(output.num_iterations > 0);
    let b_norm = vector_norm(&poisson.b, poisson.space.index_map());
    assert!(output.residual_norm <= 1e-8 * b_norm);

    // Constrained dofs hold the homogeneous boundary values
    for &dof in poisson.bc.dofs() {
        assert!(poisson.u.coefficients()[dof].abs() < 1e-10);
    }
    // The Gaussian source pushes the solution up in the middle of the domain
    assert!(poisson.u.coefficients()[8 * 17 + 8] > 0.0);
    Ok(())
}

#[test]
fn linear_solution_is_reproduced_exactly() -> eyre::Result<()> {
    // u = 1 + x has zero Laplacian and zero flux through the top and bottom sides
    let definition = PoissonDefinition::default()
        .with_source(|_| 0.0)
        .with_boundary_flux(|_| 0.0)
        .with_dirichlet_value(|x| 1.0 + x.x);

    for preconditioner in [Preconditioner::None, Preconditioner::Jacobi] {
        let mesh = Arc::new(create_unit_square_uniform_tri_mesh_2d(6));
        let mut poisson = problem(mesh.clone(), &definition, &tight_solver(preconditioner))?;
        (poisson.solve)(&mut poisson.u)?;

        for (vertex, u_i) in mesh.vertices().iter().zip(poisson.u.coefficients().iter()) {
            assert_scalar_eq!(*u_i, 1.0 + vertex.x, comp = abs, tol = 1e-8);
        }
    }
    Ok(())
}

#[test]
fn constrained_rows_of_system_are_identity() -> eyre::Result<()> {
    let definition = PoissonDefinition::default().with_dirichlet_value(|x| 2.0 * x.y);
    let mesh = Arc::new(create_unit_square_uniform_tri_mesh_2d(4));
    let poisson = problem(mesh.clone(), &definition, &SolverConfig::default())?;

    for &dof in poisson.bc.dofs() {
        let row = poisson.a.row(dof);
        for (&col, &value) in row.col_indices().iter().zip(row.values()) {
            let expected = if col == dof { 1.0 } else { 0.0 };
            assert_eq!(value, expected);
        }
        assert_scalar_eq!(poisson.b[dof], 2.0 * mesh.vertices()[dof].y, comp = abs, tol = 1e-14);
    }
    Ok(())
}

#[test]
fn solve_rejects_function_of_wrong_size() -> eyre::Result<()> {
    let poisson = problem(
        Arc::new(create_unit_square_uniform_tri_mesh_2d(4)),
        &PoissonDefinition::default(),
        &SolverConfig::default(),
    )?;
    let other_space = FunctionSpace::lagrange_p1(Arc::new(create_unit_square_uniform_tri_mesh_2d(3)));
    let mut u = Function::new(other_space);
    assert!((poisson.solve)(&mut u).is_err());
    Ok(())
}
