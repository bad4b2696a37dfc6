//! Functionality for error estimation.
use crate::element::Tri3d2Element;
use crate::form::FormError;
use crate::function::Function;
use crate::quadrature::{tri_quadrature_strength_5, QuadraturePair2d};
use itertools::izip;
use nalgebra::{Point2, Vector2, Vector3};
use rayon::prelude::*;

/// Estimate the squared $L^2$ error $\norm{u_h - u}^2_{L^2}$ on the given element with the given
/// nodal values of $u_h$ and quadrature rule.
#[allow(non_snake_case)]
pub fn estimate_element_L2_error_squared(
    element: &Tri3d2Element,
    u: impl Fn(&Point2<f64>) -> f64,
    u_h_element: &Vector3<f64>,
    quadrature: &QuadraturePair2d,
) -> f64 {
    let (weights, points) = quadrature;
    let mut result = 0.0;
    for (w, xi) in izip!(weights, points) {
        let x = element.map_reference_coords(xi);
        let j = element.reference_jacobian(xi);
        let phi = element.evaluate_basis(xi);
        let u_h = phi.dot(&u_h_element.transpose());
        let error = u_h - u(&x);
        result += *w * error * error * j.determinant().abs();
    }
    result
}

/// Estimate the squared $H^1$ *seminorm* error $\seminorm{u_h - u}^2_{H^1}$ on the given element.
///
/// Returns `None` if the element is degenerate.
#[allow(non_snake_case)]
pub fn estimate_element_H1_seminorm_error_squared(
    element: &Tri3d2Element,
    u_grad: impl Fn(&Point2<f64>) -> Vector2<f64>,
    u_h_element: &Vector3<f64>,
    quadrature: &QuadraturePair2d,
) -> Option<f64> {
    let (weights, points) = quadrature;
    let u_h_grad = element.physical_gradients()? * u_h_element;
    let mut result = 0.0;
    for (w, xi) in izip!(weights, points) {
        let x = element.map_reference_coords(xi);
        let j = element.reference_jacobian(xi);
        let error = u_h_grad - u_grad(&x);
        result += *w * error.norm_squared() * j.determinant().abs();
    }
    Some(result)
}

fn gather_element_values(u_h: &Function, cell: usize) -> Vector3<f64> {
    let dofs = u_h.function_space().dofmap().cell_dofs(cell);
    let c = u_h.coefficients();
    Vector3::new(c[dofs[0]], c[dofs[1]], c[dofs[2]])
}

/// Estimate the $L^2$ error $\norm{u_h - u}_{L^2}$ over the whole mesh.
#[allow(non_snake_case)]
pub fn estimate_L2_error<U>(u_h: &Function, u: U) -> Result<f64, FormError>
where
    U: Fn(&Point2<f64>) -> f64 + Sync,
{
    let mesh = u_h.function_space().mesh();
    let quadrature = tri_quadrature_strength_5();
    let squared = (0..mesh.num_cells())
        .into_par_iter()
        .map(|cell| {
            let element = mesh
                .cell_element(cell)
                .ok_or(FormError::CellOutOfBounds(cell))?;
            let u_h_element = gather_element_values(u_h, cell);
            Ok(estimate_element_L2_error_squared(&element, &u, &u_h_element, &quadrature))
        })
        .try_reduce(|| 0.0, |a, b| Ok(a + b))?;
    Ok(squared.sqrt())
}

/// Estimate the $H^1$ *seminorm* error $\seminorm{u_h - u}_{H^1}$ over the whole mesh.
#[allow(non_snake_case)]
pub fn estimate_H1_seminorm_error<G>(u_h: &Function, u_grad: G) -> Result<f64, FormError>
where
    G: Fn(&Point2<f64>) -> Vector2<f64> + Sync,
{
    let mesh = u_h.function_space().mesh();
    let quadrature = tri_quadrature_strength_5();
    let squared = (0..mesh.num_cells())
        .into_par_iter()
        .map(|cell| {
            let element = mesh
                .cell_element(cell)
                .ok_or(FormError::CellOutOfBounds(cell))?;
            let u_h_element = gather_element_values(u_h, cell);
            estimate_element_H1_seminorm_error_squared(&element, &u_grad, &u_h_element, &quadrature)
                .ok_or(FormError::DegenerateCell(cell))
        })
        .try_reduce(|| 0.0, |a, b| Ok(a + b))?;
    Ok(squared.sqrt())
}
