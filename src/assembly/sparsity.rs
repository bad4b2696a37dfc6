use crate::form::BilinearForm;
use crate::graph::AdjacencyList;
use crate::index_map::IndexMap;
use nalgebra_sparse::pattern::{SparsityPattern as CsrPattern, SparsityPatternFormatError};
use std::collections::BTreeSet;

/// The nonzero structure of the owned rows of a matrix.
///
/// Row `i` corresponds to the owned local dof `i`. Couplings to owned columns are stored in the
/// *diagonal* pattern as local indices, couplings to ghost columns in the *off-diagonal* pattern
/// as global indices. Both are sorted per row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparsityPattern {
    index_map: IndexMap,
    diagonal: AdjacencyList<usize>,
    off_diagonal: AdjacencyList<usize>,
}

impl SparsityPattern {
    pub fn index_map(&self) -> &IndexMap {
        &self.index_map
    }

    pub fn diagonal_pattern(&self) -> &AdjacencyList<usize> {
        &self.diagonal
    }

    pub fn off_diagonal_pattern(&self) -> &AdjacencyList<usize> {
        &self.off_diagonal
    }

    pub fn num_rows(&self) -> usize {
        self.diagonal.num_nodes()
    }

    /// Number of entries in each owned row, counting both diagonal and off-diagonal columns.
    pub fn num_nonzeros_per_row(&self) -> Vec<usize> {
        (0..self.num_rows())
            .map(|i| self.diagonal.num_links(i) + self.off_diagonal.num_links(i))
            .collect()
    }

    pub fn num_nonzeros(&self) -> usize {
        self.diagonal.array().len() + self.off_diagonal.array().len()
    }

    /// Global column indices of the given owned row, sorted.
    pub fn global_columns(&self, row: usize) -> Vec<usize> {
        let offset = self.index_map.local_range().start;
        let mut columns: Vec<_> = self
            .diagonal
            .links(row)
            .iter()
            .map(|&c| c + offset)
            .chain(self.off_diagonal.links(row).iter().copied())
            .collect();
        columns.sort_unstable();
        columns
    }

    /// Converts to a CSR pattern with owned rows and global columns.
    pub fn to_csr_pattern(&self) -> Result<CsrPattern, SparsityPatternFormatError> {
        let mut offsets = Vec::with_capacity(self.num_rows() + 1);
        let mut column_indices = Vec::with_capacity(self.num_nonzeros());
        offsets.push(0);
        for row in 0..self.num_rows() {
            column_indices.extend(self.global_columns(row));
            offsets.push(column_indices.len());
        }
        CsrPattern::try_from_offsets_and_indices(
            self.num_rows(),
            self.index_map.size_global(),
            offsets,
            column_indices,
        )
    }
}

/// Builds the sparsity pattern of the bilinear form from the dof couplings of every cell.
pub fn create_sparsity_pattern(a: &BilinearForm) -> SparsityPattern {
    let space = a.function_space();
    let index_map = space.index_map();
    let size_local = index_map.size_local();

    // Collecting into sets stores each entry exactly once, no matter how many cells share it
    let mut diagonal = vec![BTreeSet::new(); size_local];
    let mut off_diagonal = vec![BTreeSet::new(); size_local];
    for cell_dofs in space.dofmap().iter() {
        for &row in cell_dofs.iter().filter(|&&row| row < size_local) {
            for &col in cell_dofs {
                if col < size_local {
                    diagonal[row].insert(col);
                } else if let Some(global_col) = index_map.local_to_global(col) {
                    off_diagonal[row].insert(global_col);
                }
            }
        }
    }

    SparsityPattern {
        index_map: index_map.clone(),
        diagonal: diagonal.into_iter().collect(),
        off_diagonal: off_diagonal.into_iter().collect(),
    }
}
