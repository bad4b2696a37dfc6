use crate::space::FunctionSpace;
use nalgebra::{DVector, Point2};
use rayon::prelude::*;
use std::sync::Arc;

/// A finite element function, represented by its coefficients in the basis of a function space.
#[derive(Debug, Clone)]
pub struct Function {
    space: Arc<FunctionSpace>,
    coefficients: DVector<f64>,
    name: String,
}

impl Function {
    /// Creates the zero function on the given space.
    pub fn new(space: Arc<FunctionSpace>) -> Self {
        let n = space.num_dofs();
        Self {
            space,
            coefficients: DVector::zeros(n),
            name: "u".to_string(),
        }
    }

    pub fn with_name(self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn function_space(&self) -> &Arc<FunctionSpace> {
        &self.space
    }

    pub fn coefficients(&self) -> &DVector<f64> {
        &self.coefficients
    }

    pub fn coefficients_mut(&mut self) -> &mut DVector<f64> {
        &mut self.coefficients
    }

    /// Sets the coefficients to the nodal values of `expr`.
    pub fn interpolate<F>(&mut self, expr: F)
    where
        F: Fn(&Point2<f64>) -> f64 + Sync,
    {
        let coordinates = self.space.tabulate_dof_coordinates();
        self.coefficients
            .as_mut_slice()
            .par_iter_mut()
            .zip(coordinates.par_iter())
            .for_each(|(u_i, x)| *u_i = expr(x));
    }

    /// Evaluates the function at the reference coordinates `xi` of the given cell.
    ///
    /// Returns `None` if the cell index is out of bounds.
    pub fn evaluate_in_cell(&self, cell: usize, xi: &Point2<f64>) -> Option<f64> {
        let element = self.space.mesh().cell_element(cell)?;
        let dofs = self.space.dofmap().cell_dofs(cell);
        let phi = element.evaluate_basis(xi);
        Some(
            dofs.iter()
                .zip(phi.iter())
                .map(|(&dof, phi_i)| self.coefficients[dof] * phi_i)
                .sum(),
        )
    }
}
