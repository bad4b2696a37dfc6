//! Continuous piecewise-linear Lagrange function spaces.
use crate::index_map::IndexMap;
use crate::mesh::Mesh;
use log::debug;
use nalgebra::Point2;
use rayon::prelude::*;
use std::sync::Arc;

/// Maps each cell to the local indices of its degrees of freedom.
#[derive(Debug, Clone, PartialEq)]
pub struct DofMap {
    cell_dofs: Vec<[usize; 3]>,
    index_map: IndexMap,
}

impl DofMap {
    pub fn cell_dofs(&self, cell: usize) -> &[usize] {
        &self.cell_dofs[cell]
    }

    pub fn num_cells(&self) -> usize {
        self.cell_dofs.len()
    }

    pub fn index_map(&self) -> &IndexMap {
        &self.index_map
    }

    pub fn iter(&self) -> impl Iterator<Item = &[usize]> {
        self.cell_dofs.iter().map(|dofs| dofs.as_slice())
    }
}

/// A P1 Lagrange space on a triangle mesh.
///
/// Degrees of freedom coincide with mesh vertices, so the vertex index map is also the dof
/// index map.
#[derive(Debug)]
pub struct FunctionSpace {
    mesh: Arc<Mesh>,
    dofmap: DofMap,
}

impl FunctionSpace {
    pub fn lagrange_p1(mesh: Arc<Mesh>) -> Arc<Self> {
        let cell_dofs = mesh.connectivity().iter().map(|conn| conn.0).collect();
        let dofmap = DofMap {
            cell_dofs,
            index_map: mesh.vertex_map().clone(),
        };
        debug!(
            "Created P1 function space with {} dofs on {} cells",
            dofmap.index_map.size_global(),
            dofmap.num_cells()
        );
        Arc::new(Self { mesh, dofmap })
    }

    pub fn mesh(&self) -> &Arc<Mesh> {
        &self.mesh
    }

    pub fn dofmap(&self) -> &DofMap {
        &self.dofmap
    }

    pub fn index_map(&self) -> &IndexMap {
        &self.dofmap.index_map
    }

    /// Number of local dofs, including ghosts.
    pub fn num_dofs(&self) -> usize {
        self.dofmap.index_map.size_with_ghosts()
    }

    /// Physical coordinates of every local dof.
    pub fn tabulate_dof_coordinates(&self) -> Vec<Point2<f64>> {
        self.mesh.vertices().to_vec()
    }
}

/// Returns the sorted local dofs whose coordinates satisfy the given predicate.
pub fn locate_dofs_geometrical<F>(space: &FunctionSpace, marker: F) -> Vec<usize>
where
    F: Fn(&Point2<f64>) -> bool + Sync,
{
    space
        .tabulate_dof_coordinates()
        .par_iter()
        .enumerate()
        .filter(|(_, x)| marker(x))
        .map(|(dof, _)| dof)
        .collect()
}
