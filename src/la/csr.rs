use crate::assembly::SparsityPattern;
use crate::index_map::IndexMap;
use nalgebra::DVector;
use nalgebra_sparse::pattern::SparsityPatternFormatError;
use nalgebra_sparse::CsrMatrix;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CsrError {
    #[error("invalid sparsity pattern: {0}")]
    InvalidPattern(#[from] SparsityPatternFormatError),
    #[error("row {row} is not owned by this matrix")]
    RowNotOwned { row: usize },
    #[error("local index {0} is not part of the index map")]
    UnknownLocalIndex(usize),
    #[error("entry ({row}, {col}) is not part of the sparsity pattern")]
    EntryOutsidePattern { row: usize, col: usize },
    #[error("insertion of {num_values} values does not match {num_rows} rows and {num_cols} columns")]
    ValueCountMismatch {
        num_rows: usize,
        num_cols: usize,
        num_values: usize,
    },
}

/// Creates a zero-valued matrix with the nonzero structure of the given pattern.
///
/// Rows are the owned dofs, columns are global dof indices.
pub fn create_matrix(pattern: &SparsityPattern) -> Result<CsrMatrix<f64>, CsrError> {
    let csr_pattern = pattern.to_csr_pattern()?;
    let values = vec![0.0; csr_pattern.nnz()];
    // The pattern and values have consistent sizes by construction
    CsrMatrix::try_from_pattern_and_values(csr_pattern, values).map_err(|_| CsrError::ValueCountMismatch {
        num_rows: pattern.num_rows(),
        num_cols: pattern.index_map().size_global(),
        num_values: pattern.num_nonzeros(),
    })
}

/// Returns an insertion callback which adds row-major blocks of values to `matrix`.
///
/// Rows and columns passed to the callback are local indices with respect to `index_map`.
pub fn add_fn<'a>(
    matrix: &'a mut CsrMatrix<f64>,
    index_map: &'a IndexMap,
) -> impl FnMut(&[usize], &[usize], &[f64]) -> Result<(), CsrError> + 'a {
    let mut global_cols = Vec::new();
    move |rows: &[usize], cols: &[usize], values: &[f64]| {
        if values.len() != rows.len() * cols.len() {
            return Err(CsrError::ValueCountMismatch {
                num_rows: rows.len(),
                num_cols: cols.len(),
                num_values: values.len(),
            });
        }

        global_cols.clear();
        for &col in cols {
            global_cols.push(
                index_map
                    .local_to_global(col)
                    .ok_or(CsrError::UnknownLocalIndex(col))?,
            );
        }

        for (&row, row_values) in rows.iter().zip(values.chunks_exact(cols.len().max(1))) {
            if row >= matrix.nrows() {
                return Err(CsrError::RowNotOwned { row });
            }
            let mut csr_row = matrix.row_mut(row);
            let (row_cols, row_entries) = csr_row.cols_and_values_mut();
            for (&col, value) in global_cols.iter().zip(row_values) {
                let idx = row_cols
                    .binary_search(&col)
                    .map_err(|_| CsrError::EntryOutsidePattern { row, col })?;
                row_entries[idx] += *value;
            }
        }
        Ok(())
    }
}

pub fn zero_entries(matrix: &mut CsrMatrix<f64>) {
    matrix.values_mut().fill(0.0);
}

pub fn frobenius_norm(matrix: &CsrMatrix<f64>) -> f64 {
    // An empty f64 sum is -0.0, so fold from +0.0 instead
    matrix
        .values()
        .iter()
        .fold(0.0, |acc, v| acc + v * v)
        .sqrt()
}

/// Creates a zero vector with one entry per local index, ghosts included.
pub fn create_vector(index_map: &IndexMap) -> DVector<f64> {
    DVector::zeros(index_map.size_with_ghosts())
}

/// The Euclidean norm of the owned part of `b`.
pub fn vector_norm(b: &DVector<f64>, index_map: &IndexMap) -> f64 {
    b.rows(0, index_map.size_local()).norm()
}
