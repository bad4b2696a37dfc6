//! Convergence tests with manufactured solutions.
use fem_miniapp::config::SolverConfig;
use fem_miniapp::error::{estimate_H1_seminorm_error, estimate_L2_error};
use fem_miniapp::mesh::procedural::create_unit_square_uniform_tri_mesh_2d;
use fem_miniapp::problem::{problem, PoissonDefinition};
use nalgebra::{Point2, Vector2};
use std::f64::consts::PI;
use std::sync::Arc;

const RESOLUTIONS: [usize; 4] = [4, 8, 16, 32];

fn solver() -> SolverConfig {
    SolverConfig {
        relative_tolerance: 1e-12,
        ..SolverConfig::default()
    }
}

/// Solves on every resolution and returns the L2 and H1 seminorm errors.
fn compute_errors<U, G>(definition: &PoissonDefinition, u: U, u_grad: G) -> eyre::Result<Vec<(f64, f64)>>
where
    U: Fn(&Point2<f64>) -> f64 + Sync,
    G: Fn(&Point2<f64>) -> Vector2<f64> + Sync,
{
    let mut errors = Vec::new();
    for &cells_per_dim in &RESOLUTIONS {
        let mesh = Arc::new(create_unit_square_uniform_tri_mesh_2d(cells_per_dim));
        let mut poisson = problem(mesh, definition, &solver())?;
        (poisson.solve)(&mut poisson.u)?;
        let l2 = estimate_L2_error(&poisson.u, &u)?;
        let h1 = estimate_H1_seminorm_error(&poisson.u, &u_grad)?;
        errors.push((l2, h1));
    }
    Ok(errors)
}

/// Checks that halving the mesh size reduces the L2 error by about 4 and the H1 seminorm
/// error by about 2.
fn assert_optimal_rates(errors: &[(f64, f64)]) {
    for pair in errors.windows(2) {
        let (l2_coarse, h1_coarse) = pair[0];
        let (l2_fine, h1_fine) = pair[1];
        let l2_rate = (l2_coarse / l2_fine).log2();
        let h1_rate = (h1_coarse / h1_fine).log2();
        assert!(l2_rate > 1.7, "L2 rate {} too low, errors: {:?}", l2_rate, errors);
        assert!(h1_rate > 0.85, "H1 rate {} too low, errors: {:?}", h1_rate, errors);
    }
}

#[test]
fn poisson_2d_mms_homogeneous_dirichlet() -> eyre::Result<()> {
    // u = sin(pi x) sin(pi y), constrained on the whole boundary
    let definition = PoissonDefinition::default()
        .with_source(|x| 2.0 * PI * PI * (PI * x.x).sin() * (PI * x.y).sin())
        .with_dirichlet_value(|_| 0.0)
        .with_dirichlet_boundary(|x| {
            let eps = 1e-12;
            x.x < eps || x.x > 1.0 - eps || x.y < eps || x.y > 1.0 - eps
        });
    let u = |x: &Point2<f64>| (PI * x.x).sin() * (PI * x.y).sin();
    let u_grad = |x: &Point2<f64>| {
        Vector2::new(
            PI * (PI * x.x).cos() * (PI * x.y).sin(),
            PI * (PI * x.x).sin() * (PI * x.y).cos(),
        )
    };

    let errors = compute_errors(&definition, u, u_grad)?;
    assert_optimal_rates(&errors);
    assert!(errors.last().unwrap().0 < 1e-2);
    Ok(())
}

#[test]
fn poisson_2d_mms_with_boundary_flux() -> eyre::Result<()> {
    // u = y^2 sin(pi x) vanishes on the left and right sides, and its outward normal derivative
    // is 2 y sin(pi x) on the top and bottom sides
    let definition = PoissonDefinition::default()
        .with_source(|x| (PI * PI * x.y * x.y - 2.0) * (PI * x.x).sin())
        .with_boundary_flux(|x| 2.0 * x.y * (PI * x.x).sin())
        .with_dirichlet_value(|_| 0.0);
    let u = |x: &Point2<f64>| x.y * x.y * (PI * x.x).sin();
    let u_grad = |x: &Point2<f64>| Vector2::new(PI * x.y * x.y * (PI * x.x).cos(), 2.0 * x.y * (PI * x.x).sin());

    let errors = compute_errors(&definition, u, u_grad)?;
    assert_optimal_rates(&errors);
    Ok(())
}
