//! Dirichlet boundary conditions.
use crate::function::Function;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BcError {
    #[error("dof {dof} is out of bounds for a space with {num_dofs} dofs")]
    DofOutOfBounds { dof: usize, num_dofs: usize },
}

/// Constrains a set of dofs to the values of a function.
#[derive(Debug, Clone)]
pub struct DirichletBc {
    value: Arc<Function>,
    dofs: Vec<usize>,
    num_owned: usize,
}

impl DirichletBc {
    /// Creates a boundary condition constraining `dofs` (local indices) to the corresponding
    /// coefficients of `value`. The dofs are sorted and de-duplicated.
    pub fn new(value: Arc<Function>, mut dofs: Vec<usize>) -> Result<Self, BcError> {
        dofs.sort_unstable();
        dofs.dedup();

        let index_map = value.function_space().index_map();
        let num_dofs = index_map.size_with_ghosts();
        if let Some(&dof) = dofs.last().filter(|&&dof| dof >= num_dofs) {
            return Err(BcError::DofOutOfBounds { dof, num_dofs });
        }

        let size_local = index_map.size_local();
        let num_owned = dofs.partition_point(|&dof| dof < size_local);
        Ok(Self { value, dofs, num_owned })
    }

    /// All constrained local dofs, sorted.
    pub fn dofs(&self) -> &[usize] {
        &self.dofs
    }

    /// Constrained dofs owned by this process.
    pub fn owned_dofs(&self) -> &[usize] {
        &self.dofs[..self.num_owned]
    }

    pub fn value(&self) -> &Arc<Function> {
        &self.value
    }

    /// Sets `marker[dof] = true` for every constrained dof.
    ///
    /// # Panics
    ///
    /// Panics if the marker is shorter than the number of dofs in the space.
    pub fn mark_dofs(&self, marker: &mut [bool]) {
        for &dof in &self.dofs {
            marker[dof] = true;
        }
    }
}
