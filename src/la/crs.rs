//! Row-map based sparse matrices and vectors addressed by global indices.
//!
//! A [`Map`] lists the global indices present on this process. A map may be *overlapping*,
//! containing indices that are owned elsewhere, in which case an [`Export`] moves data to a
//! one-to-one map. Matrices are built in two phases: a [`CrsGraph`] fixes the structure with
//! bounded per-row capacity, after which a [`CrsMatrix`] on that graph can only sum into
//! existing entries.
use nalgebra::DVector;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CrsError {
    #[error("global index {index} is out of bounds for a map of global size {size_global}")]
    IndexOutOfBounds { index: usize, size_global: usize },
    #[error("global index {0} occurs more than once in the map")]
    DuplicateIndex(usize),
    #[error("row {0} is not in the row map")]
    RowNotInMap(usize),
    #[error("row {row} can hold at most {capacity} entries, but {requested} were requested")]
    CapacityExceeded { row: usize, capacity: usize, requested: usize },
    #[error("expected {expected} row capacities, got {actual}")]
    CapacityCountMismatch { expected: usize, actual: usize },
    #[error("the graph is fill complete and can no longer be modified")]
    GraphFillComplete,
    #[error("the graph must be fill complete before a matrix can be created from it")]
    GraphNotFillComplete,
    #[error("the matrix must be fill complete for this operation")]
    MatrixNotFillComplete,
    #[error("global index {0} is not present in the target map")]
    NoOwner(usize),
    #[error("maps have different global sizes ({0} and {1})")]
    IncompatibleMaps(usize, usize),
    #[error("vector has {actual} entries, but its map has {expected}")]
    VectorLength { expected: usize, actual: usize },
}

/// The global indices present on this process, in local order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Map {
    global_indices: Vec<usize>,
    local_indices: FxHashMap<usize, usize>,
    size_global: usize,
}

impl Map {
    pub fn new(size_global: usize, global_indices: Vec<usize>) -> Result<Self, CrsError> {
        let mut local_indices = FxHashMap::default();
        for (local, &global) in global_indices.iter().enumerate() {
            if global >= size_global {
                return Err(CrsError::IndexOutOfBounds {
                    index: global,
                    size_global,
                });
            }
            if local_indices.insert(global, local).is_some() {
                return Err(CrsError::DuplicateIndex(global));
            }
        }
        Ok(Self {
            global_indices,
            local_indices,
            size_global,
        })
    }

    pub fn size_global(&self) -> usize {
        self.size_global
    }

    pub fn num_local(&self) -> usize {
        self.global_indices.len()
    }

    pub fn global_indices(&self) -> &[usize] {
        &self.global_indices
    }

    pub fn global_index(&self, local: usize) -> Option<usize> {
        self.global_indices.get(local).copied()
    }

    pub fn local_index(&self, global: usize) -> Option<usize> {
        self.local_indices.get(&global).copied()
    }

    pub fn contains(&self, global: usize) -> bool {
        self.local_indices.contains_key(&global)
    }
}

/// Domain and range maps fixed when filling is completed.
#[derive(Debug, Clone)]
struct FillMaps {
    domain: Arc<Map>,
    range: Arc<Map>,
}

/// The column structure of every row in a row map.
#[derive(Debug, Clone)]
pub struct CrsGraph {
    row_map: Arc<Map>,
    capacities: Vec<usize>,
    columns: Vec<Vec<usize>>,
    fill_maps: Option<FillMaps>,
}

impl CrsGraph {
    /// Creates an empty graph where local row `i` may hold at most `max_entries_per_row[i]`
    /// distinct columns.
    pub fn new(row_map: Arc<Map>, max_entries_per_row: Vec<usize>) -> Result<Self, CrsError> {
        if max_entries_per_row.len() != row_map.num_local() {
            return Err(CrsError::CapacityCountMismatch {
                expected: row_map.num_local(),
                actual: max_entries_per_row.len(),
            });
        }
        let columns = max_entries_per_row
            .iter()
            .map(|&capacity| Vec::with_capacity(capacity))
            .collect();
        Ok(Self {
            row_map,
            capacities: max_entries_per_row,
            columns,
            fill_maps: None,
        })
    }

    pub fn row_map(&self) -> &Arc<Map> {
        &self.row_map
    }

    pub fn is_fill_complete(&self) -> bool {
        self.fill_maps.is_some()
    }

    /// Adds the given global columns to a global row. Columns already present are ignored.
    pub fn insert_global_indices(&mut self, row: usize, cols: &[usize]) -> Result<(), CrsError> {
        if self.is_fill_complete() {
            return Err(CrsError::GraphFillComplete);
        }
        let local_row = self.row_map.local_index(row).ok_or(CrsError::RowNotInMap(row))?;

        let mut merged = self.columns[local_row].clone();
        merged.extend_from_slice(cols);
        merged.sort_unstable();
        merged.dedup();

        let capacity = self.capacities[local_row];
        if merged.len() > capacity {
            return Err(CrsError::CapacityExceeded {
                row,
                capacity,
                requested: merged.len(),
            });
        }
        self.columns[local_row] = merged;
        Ok(())
    }

    pub fn fill_complete(&mut self, domain_map: Arc<Map>, range_map: Arc<Map>) {
        self.fill_maps = Some(FillMaps {
            domain: domain_map,
            range: range_map,
        });
    }

    /// Sorted global columns of the given global row.
    pub fn global_row_view(&self, row: usize) -> Option<&[usize]> {
        let local_row = self.row_map.local_index(row)?;
        Some(&self.columns[local_row])
    }

    pub fn num_entries(&self) -> usize {
        self.columns.iter().map(Vec::len).sum()
    }
}

/// A sparse matrix with the structure of a fill-complete [`CrsGraph`].
#[derive(Debug, Clone)]
pub struct CrsMatrix {
    graph: Arc<CrsGraph>,
    values: Vec<Vec<f64>>,
    fill_maps: Option<FillMaps>,
}

impl CrsMatrix {
    /// Creates a zero matrix that is open for summation.
    pub fn new(graph: Arc<CrsGraph>) -> Result<Self, CrsError> {
        if !graph.is_fill_complete() {
            return Err(CrsError::GraphNotFillComplete);
        }
        let values = graph.columns.iter().map(|cols| vec![0.0; cols.len()]).collect();
        Ok(Self {
            graph,
            values,
            fill_maps: None,
        })
    }

    pub fn graph(&self) -> &Arc<CrsGraph> {
        &self.graph
    }

    pub fn is_fill_complete(&self) -> bool {
        self.fill_maps.is_some()
    }

    /// Adds `values[k]` to the entry `(row, cols[k])` for every column present in the graph.
    ///
    /// Returns the number of valid entries. Entries in columns absent from the row are
    /// skipped, and nothing is valid if the row is not in the row map or the matrix is fill
    /// complete.
    pub fn sum_into_global_values(&mut self, row: usize, cols: &[usize], values: &[f64]) -> usize {
        if self.is_fill_complete() {
            return 0;
        }
        let local_row = match self.graph.row_map.local_index(row) {
            Some(local_row) => local_row,
            None => return 0,
        };

        let row_cols = &self.graph.columns[local_row];
        let row_values = &mut self.values[local_row];
        let mut num_valid = 0;
        for (col, value) in cols.iter().zip(values) {
            if let Ok(idx) = row_cols.binary_search(col) {
                row_values[idx] += value;
                num_valid += 1;
            }
        }
        num_valid
    }

    pub fn resume_fill(&mut self) {
        self.fill_maps = None;
    }

    pub fn fill_complete(&mut self, domain_map: Arc<Map>, range_map: Arc<Map>) {
        self.fill_maps = Some(FillMaps {
            domain: domain_map,
            range: range_map,
        });
    }

    /// Sorted global columns and the corresponding values of a global row.
    pub fn global_row_view(&self, row: usize) -> Option<(&[usize], &[f64])> {
        let local_row = self.graph.row_map.local_index(row)?;
        Some((&self.graph.columns[local_row], &self.values[local_row]))
    }

    pub fn frobenius_norm(&self) -> f64 {
        self.values
            .iter()
            .flatten()
            .fold(0.0, |acc, v| acc + v * v)
            .sqrt()
    }

    /// Computes `y = A x`, with `x` on the domain map and `y` on the range map.
    ///
    /// Rows of `y` without a matrix row are set to zero.
    pub fn apply(&self, x: &Vector, y: &mut Vector) -> Result<(), CrsError> {
        let maps = self.fill_maps.as_ref().ok_or(CrsError::MatrixNotFillComplete)?;
        check_same_size(&maps.domain, x.map())?;
        check_same_size(&maps.range, y.map())?;

        y.values.fill(0.0);
        for (local_row, &row) in self.graph.row_map.global_indices().iter().enumerate() {
            let y_idx = y.map.local_index(row).ok_or(CrsError::NoOwner(row))?;
            let mut sum = 0.0;
            for (&col, value) in self.graph.columns[local_row]
                .iter()
                .zip(&self.values[local_row])
            {
                let x_idx = x.map.local_index(col).ok_or(CrsError::NoOwner(col))?;
                sum += value * x.values[x_idx];
            }
            y.values[y_idx] += sum;
        }
        Ok(())
    }
}

fn check_same_size(a: &Map, b: &Map) -> Result<(), CrsError> {
    if a.size_global() == b.size_global() {
        Ok(())
    } else {
        Err(CrsError::IncompatibleMaps(a.size_global(), b.size_global()))
    }
}

/// How exported values are combined with values already in the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombineMode {
    Add,
    Insert,
}

/// Moves values from a source map to a target map, matching entries by global index.
#[derive(Debug, Clone)]
pub struct Export {
    source: Arc<Map>,
    target: Arc<Map>,
    /// Pairs of (source local, target local) indices.
    permutation: Vec<(usize, usize)>,
    /// Global indices of the source that are owned by other processes.
    remote: Vec<usize>,
}

impl Export {
    /// Every index of the source must be present in the target. There is no other process that
    /// could receive it.
    pub fn new(source: Arc<Map>, target: Arc<Map>) -> Result<Self, CrsError> {
        let export = Self::with_remote_owners(source, target)?;
        match export.remote.first() {
            Some(&global) => Err(CrsError::NoOwner(global)),
            None => Ok(export),
        }
    }

    /// Like [`Export::new`], but source indices absent from the target are treated as owned by
    /// other processes.
    ///
    /// Their values are not part of this process' target vector, so [`Vector::do_export`] skips
    /// them. They are listed by [`Export::remote_indices`].
    pub fn with_remote_owners(source: Arc<Map>, target: Arc<Map>) -> Result<Self, CrsError> {
        check_same_size(&source, &target)?;
        let mut permutation = Vec::with_capacity(source.num_local());
        let mut remote = Vec::new();
        for (source_local, &global) in source.global_indices().iter().enumerate() {
            match target.local_index(global) {
                Some(target_local) => permutation.push((source_local, target_local)),
                None => remote.push(global),
            }
        }
        Ok(Self {
            source,
            target,
            permutation,
            remote,
        })
    }

    pub fn remote_indices(&self) -> &[usize] {
        &self.remote
    }

    pub fn source_map(&self) -> &Arc<Map> {
        &self.source
    }

    pub fn target_map(&self) -> &Arc<Map> {
        &self.target
    }
}

/// A dense vector distributed according to a map.
#[derive(Debug, Clone, PartialEq)]
pub struct Vector {
    map: Arc<Map>,
    values: DVector<f64>,
}

impl Vector {
    pub fn new(map: Arc<Map>) -> Self {
        let values = DVector::zeros(map.num_local());
        Self { map, values }
    }

    pub fn from_values(map: Arc<Map>, values: DVector<f64>) -> Result<Self, CrsError> {
        if values.len() != map.num_local() {
            return Err(CrsError::VectorLength {
                expected: map.num_local(),
                actual: values.len(),
            });
        }
        Ok(Self { map, values })
    }

    pub fn map(&self) -> &Arc<Map> {
        &self.map
    }

    pub fn values(&self) -> &DVector<f64> {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut DVector<f64> {
        &mut self.values
    }

    pub fn norm2(&self) -> f64 {
        self.values.norm()
    }

    /// Exports the values of `source` into `self` according to `export`.
    pub fn do_export(&mut self, source: &Vector, export: &Export, mode: CombineMode) -> Result<(), CrsError> {
        if source.map.as_ref() != export.source.as_ref() {
            return Err(CrsError::IncompatibleMaps(source.map.size_global(), export.source.size_global()));
        }
        if self.map.as_ref() != export.target.as_ref() {
            return Err(CrsError::IncompatibleMaps(self.map.size_global(), export.target.size_global()));
        }
        for &(source_local, target_local) in &export.permutation {
            let value = source.values[source_local];
            match mode {
                CombineMode::Add => self.values[target_local] += value,
                CombineMode::Insert => self.values[target_local] = value,
            }
        }
        Ok(())
    }
}
