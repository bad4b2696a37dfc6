//! Bilinear and linear forms for P1 Lagrange spaces, together with their element kernels.
//!
//! Forms are sums of integrals over the cells of the mesh (`dx`) or its exterior facets (`ds`).
//! Coefficients are functions living in the same space as the arguments.
use crate::element::{Segment2d2Element, Tri3d2Element};
use crate::function::Function;
use crate::mesh::BoundaryFacet;
use crate::quadrature::{self, QuadraturePair1d, QuadraturePair2d};
use crate::space::FunctionSpace;
use itertools::izip;
use nalgebra::{Matrix3, Vector2, Vector3};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("cell {0} is degenerate")]
    DegenerateCell(usize),
    #[error("cell {0} is not part of the mesh")]
    CellOutOfBounds(usize),
    #[error("coefficient `{0}` is not defined on the function space of the form")]
    ForeignCoefficient(String),
}

#[derive(Debug, Clone)]
pub enum BilinearIntegral {
    /// `inner(grad u, grad v) dx`
    Stiffness,
    /// `c u v dx`
    WeightedMass(Arc<Function>),
}

#[derive(Debug, Clone)]
pub enum LinearIntegral {
    /// `f v dx`
    Source(Arc<Function>),
    /// `g v ds` over all exterior facets
    BoundaryFlux(Arc<Function>),
}

#[derive(Debug, Clone)]
pub struct BilinearForm {
    space: Arc<FunctionSpace>,
    integrals: Vec<BilinearIntegral>,
    quadrature: QuadraturePair2d,
}

#[derive(Debug, Clone)]
pub struct LinearForm {
    space: Arc<FunctionSpace>,
    integrals: Vec<LinearIntegral>,
    exterior_facets: Vec<BoundaryFacet>,
    cell_quadrature: QuadraturePair2d,
    facet_quadrature: QuadraturePair1d,
}

fn check_coefficient(space: &Arc<FunctionSpace>, coefficient: &Function) -> Result<(), FormError> {
    if Arc::ptr_eq(space, coefficient.function_space()) {
        Ok(())
    } else {
        Err(FormError::ForeignCoefficient(coefficient.name().to_string()))
    }
}

fn cell_element(space: &FunctionSpace, cell: usize) -> Result<Tri3d2Element, FormError> {
    space
        .mesh()
        .cell_element(cell)
        .ok_or(FormError::CellOutOfBounds(cell))
}

fn gather_cell_values(coefficient: &Function, dofs: &[usize]) -> Vector3<f64> {
    let c = coefficient.coefficients();
    Vector3::new(c[dofs[0]], c[dofs[1]], c[dofs[2]])
}

impl BilinearForm {
    /// The Laplace form `inner(grad u, grad v) dx`.
    pub fn laplace(space: Arc<FunctionSpace>) -> Self {
        Self {
            space,
            integrals: vec![BilinearIntegral::Stiffness],
            // Stiffness integrands are constant on affine cells
            quadrature: quadrature::tri_quadrature_strength_1(),
        }
    }

    /// Adds the weighted mass integral `c u v dx`.
    pub fn with_weighted_mass(mut self, c: Arc<Function>) -> Result<Self, FormError> {
        check_coefficient(&self.space, &c)?;
        self.integrals.push(BilinearIntegral::WeightedMass(c));
        // Mass integrands are at most cubic
        self.quadrature = quadrature::tri_quadrature_strength_5();
        Ok(self)
    }

    pub fn function_space(&self) -> &Arc<FunctionSpace> {
        &self.space
    }

    pub fn integrals(&self) -> &[BilinearIntegral] {
        &self.integrals
    }

    /// Computes the element matrix of the given cell.
    pub fn assemble_cell_matrix(&self, cell: usize) -> Result<Matrix3<f64>, FormError> {
        let element = cell_element(&self.space, cell)?;
        let dofs = self.space.dofmap().cell_dofs(cell);
        let grad_phi = element
            .physical_gradients()
            .ok_or(FormError::DegenerateCell(cell))?;
        let (weights, points) = &self.quadrature;

        let mut a_element = Matrix3::zeros();
        for integral in &self.integrals {
            for (w, xi) in izip!(weights, points) {
                let j_det_abs = element.reference_jacobian(xi).determinant().abs();
                match integral {
                    BilinearIntegral::Stiffness => {
                        a_element += (w * j_det_abs) * grad_phi.transpose() * grad_phi;
                    }
                    BilinearIntegral::WeightedMass(c) => {
                        let phi = element.evaluate_basis(xi);
                        let c_at_xi = phi.dot(&gather_cell_values(c, dofs).transpose());
                        a_element += (w * j_det_abs * c_at_xi) * phi.transpose() * phi;
                    }
                }
            }
        }
        Ok(a_element)
    }
}

impl LinearForm {
    pub fn new(space: Arc<FunctionSpace>) -> Self {
        Self {
            space,
            integrals: Vec::new(),
            exterior_facets: Vec::new(),
            // Integrands are products of two linear functions
            cell_quadrature: quadrature::tri_quadrature_strength_2(),
            facet_quadrature: quadrature::segment_quadrature_strength_3(),
        }
    }

    /// Adds the source integral `f v dx`.
    pub fn with_source(mut self, f: Arc<Function>) -> Result<Self, FormError> {
        check_coefficient(&self.space, &f)?;
        self.integrals.push(LinearIntegral::Source(f));
        Ok(self)
    }

    /// Adds the flux integral `g v ds` over the exterior facets of the mesh.
    pub fn with_boundary_flux(mut self, g: Arc<Function>) -> Result<Self, FormError> {
        check_coefficient(&self.space, &g)?;
        if self.exterior_facets.is_empty() {
            self.exterior_facets = self.space.mesh().find_boundary_facets();
        }
        self.integrals.push(LinearIntegral::BoundaryFlux(g));
        Ok(self)
    }

    pub fn function_space(&self) -> &Arc<FunctionSpace> {
        &self.space
    }

    pub fn integrals(&self) -> &[LinearIntegral] {
        &self.integrals
    }

    pub fn exterior_facets(&self) -> &[BoundaryFacet] {
        &self.exterior_facets
    }

    pub fn has_cell_integrals(&self) -> bool {
        self.integrals
            .iter()
            .any(|integral| matches!(integral, LinearIntegral::Source(_)))
    }

    pub fn has_facet_integrals(&self) -> bool {
        self.integrals
            .iter()
            .any(|integral| matches!(integral, LinearIntegral::BoundaryFlux(_)))
    }

    /// Computes the element vector of the cell integrals on the given cell.
    pub fn assemble_cell_vector(&self, cell: usize) -> Result<Vector3<f64>, FormError> {
        let element = cell_element(&self.space, cell)?;
        let dofs = self.space.dofmap().cell_dofs(cell);
        let (weights, points) = &self.cell_quadrature;

        let mut b_element = Vector3::zeros();
        for integral in &self.integrals {
            if let LinearIntegral::Source(f) = integral {
                let f_cell = gather_cell_values(f, dofs);
                for (w, xi) in izip!(weights, points) {
                    let j_det = element.reference_jacobian(xi).determinant();
                    if j_det == 0.0 {
                        return Err(FormError::DegenerateCell(cell));
                    }
                    let phi = element.evaluate_basis(xi);
                    let f_at_xi = phi.dot(&f_cell.transpose());
                    b_element += (w * j_det.abs() * f_at_xi) * phi.transpose();
                }
            }
        }
        Ok(b_element)
    }

    /// Computes the element vector of the facet integrals on the given exterior facet,
    /// ordered as the two vertices of the facet.
    pub fn assemble_facet_vector(&self, facet: &BoundaryFacet) -> Result<Vector2<f64>, FormError> {
        let mesh = self.space.mesh();
        let element: Segment2d2Element = mesh
            .facet_element(&facet.facet)
            .ok_or(FormError::CellOutOfBounds(facet.cell))?;
        let dofs = facet.facet.0;
        let j_norm = element.jacobian_norm();
        let (weights, points) = &self.facet_quadrature;

        let mut b_facet = Vector2::zeros();
        for integral in &self.integrals {
            if let LinearIntegral::BoundaryFlux(g) = integral {
                let g_facet = Vector2::new(g.coefficients()[dofs[0]], g.coefficients()[dofs[1]]);
                for (w, xi) in izip!(weights, points) {
                    let phi = element.evaluate_basis(xi);
                    let g_at_xi = phi.dot(&g_facet.transpose());
                    b_facet += (w * j_norm * g_at_xi) * phi.transpose();
                }
            }
        }
        Ok(b_facet)
    }
}

/// Builds the forms of the Poisson problem with source `f` and boundary flux `g`:
///
/// ```text
/// a(u, v) = inner(grad u, grad v) dx
/// L(v)    = f v dx + g v ds
/// ```
pub fn poisson_forms(
    space: Arc<FunctionSpace>,
    f: Arc<Function>,
    g: Arc<Function>,
) -> Result<(BilinearForm, LinearForm), FormError> {
    let a = BilinearForm::laplace(space.clone());
    let l = LinearForm::new(space)
        .with_source(f)?
        .with_boundary_flux(g)?;
    Ok((a, l))
}
