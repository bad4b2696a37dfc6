use fem_miniapp::la::crs::{CombineMode, CrsError, CrsGraph, CrsMatrix, Export, Map, Vector};
use nalgebra::DVector;
use std::sync::Arc;

fn map(size_global: usize, indices: &[usize]) -> Arc<Map> {
    Arc::new(Map::new(size_global, indices.to_vec()).unwrap())
}

/// A 3x3 tridiagonal graph on global rows 0, 1, 2.
fn tridiagonal_graph() -> CrsGraph {
    let row_map = map(3, &[0, 1, 2]);
    let mut graph = CrsGraph::new(row_map.clone(), vec![2, 3, 2]).unwrap();
    graph.insert_global_indices(0, &[1, 0]).unwrap();
    graph.insert_global_indices(1, &[0, 1]).unwrap();
    graph.insert_global_indices(1, &[2, 1]).unwrap();
    graph.insert_global_indices(2, &[1, 2]).unwrap();
    graph.fill_complete(row_map.clone(), row_map);
    graph
}

#[test]
fn map_lookups() {
    let m = map(10, &[7, 2, 5]);
    assert_eq!(m.num_local(), 3);
    assert_eq!(m.global_index(1), Some(2));
    assert_eq!(m.local_index(5), Some(2));
    assert!(!m.contains(3));

    assert_eq!(Map::new(4, vec![1, 1]), Err(CrsError::DuplicateIndex(1)));
    assert_eq!(
        Map::new(4, vec![4]),
        Err(CrsError::IndexOutOfBounds {
            index: 4,
            size_global: 4
        })
    );
}

#[test]
fn graph_merges_columns_and_enforces_capacity() {
    let graph = tridiagonal_graph();
    assert_eq!(graph.global_row_view(1), Some(&[0, 1, 2][..]));
    assert_eq!(graph.num_entries(), 7);

    let mut graph = CrsGraph::new(map(3, &[0, 1, 2]), vec![1, 1, 1]).unwrap();
    assert_eq!(
        graph.insert_global_indices(0, &[0, 1]),
        Err(CrsError::CapacityExceeded {
            row: 0,
            capacity: 1,
            requested: 2
        })
    );
    assert_eq!(graph.insert_global_indices(5, &[0]), Err(CrsError::RowNotInMap(5)));
    assert_eq!(
        CrsGraph::new(map(3, &[0, 1, 2]), vec![1]).unwrap_err(),
        CrsError::CapacityCountMismatch { expected: 3, actual: 1 }
    );
}

#[test]
fn matrix_requires_fill_complete_graph() {
    let graph = CrsGraph::new(map(1, &[0]), vec![1]).unwrap();
    assert_eq!(CrsMatrix::new(Arc::new(graph)).unwrap_err(), CrsError::GraphNotFillComplete);

    let mut graph = tridiagonal_graph();
    assert_eq!(graph.insert_global_indices(0, &[0]), Err(CrsError::GraphFillComplete));
}

#[test]
fn sum_into_global_values_counts_valid_entries() {
    let graph = Arc::new(tridiagonal_graph());
    let mut matrix = CrsMatrix::new(graph).unwrap();

    assert_eq!(matrix.sum_into_global_values(0, &[0, 1], &[2.0, -1.0]), 2);
    // Column 2 is not in row 0
    assert_eq!(matrix.sum_into_global_values(0, &[0, 2], &[1.0, 5.0]), 1);
    assert_eq!(matrix.sum_into_global_values(7, &[0], &[1.0]), 0);
    assert_eq!(matrix.global_row_view(0), Some((&[0, 1][..], &[3.0, -1.0][..])));

    let row_map = matrix.graph().row_map().clone();
    matrix.fill_complete(row_map.clone(), row_map);
    assert_eq!(matrix.sum_into_global_values(0, &[0], &[1.0]), 0);
    matrix.resume_fill();
    assert_eq!(matrix.sum_into_global_values(0, &[0], &[1.0]), 1);
}

#[test]
fn apply_computes_matrix_vector_product() {
    let graph = Arc::new(tridiagonal_graph());
    let row_map = graph.row_map().clone();
    let mut matrix = CrsMatrix::new(graph).unwrap();
    for row in 0..3 {
        matrix.sum_into_global_values(row, &[row], &[2.0]);
        if row > 0 {
            matrix.sum_into_global_values(row, &[row - 1], &[-1.0]);
        }
        if row < 2 {
            matrix.sum_into_global_values(row, &[row + 1], &[-1.0]);
        }
    }

    let x = Vector::from_values(row_map.clone(), DVector::from_vec(vec![1.0, 2.0, 3.0])).unwrap();
    let mut y = Vector::new(row_map.clone());
    assert_eq!(matrix.apply(&x, &mut y), Err(CrsError::MatrixNotFillComplete));

    matrix.fill_complete(row_map.clone(), row_map);
    matrix.apply(&x, &mut y).unwrap();
    assert_eq!(y.values().as_slice(), &[0.0, 0.0, 4.0]);
    assert_eq!(matrix.frobenius_norm(), 16.0f64.sqrt());
}

#[test]
fn export_combines_overlapping_entries() {
    let source_map = map(4, &[0, 1, 2, 3]);
    let target_map = map(4, &[3, 2, 1, 0]);
    let export = Export::new(source_map.clone(), target_map.clone()).unwrap();

    let source = Vector::from_values(source_map, DVector::from_vec(vec![1.0, 2.0, 3.0, 4.0])).unwrap();
    let mut target = Vector::from_values(target_map, DVector::from_vec(vec![10.0, 10.0, 10.0, 10.0])).unwrap();
    target.do_export(&source, &export, CombineMode::Add).unwrap();
    assert_eq!(target.values().as_slice(), &[14.0, 13.0, 12.0, 11.0]);

    target.do_export(&source, &export, CombineMode::Insert).unwrap();
    assert_eq!(target.values().as_slice(), &[4.0, 3.0, 2.0, 1.0]);
    assert_eq!(target.norm2(), 30.0f64.sqrt());
}

#[test]
fn export_requires_an_owner_for_every_index() {
    let err = Export::new(map(4, &[0, 1, 2]), map(4, &[0, 1])).unwrap_err();
    assert_eq!(err, CrsError::NoOwner(2));
    assert_eq!(
        Vector::from_values(map(2, &[0, 1]), DVector::zeros(3)).unwrap_err(),
        CrsError::VectorLength { expected: 2, actual: 3 }
    );
}

#[test]
fn export_with_remote_owners_skips_foreign_indices() {
    let source_map = map(6, &[2, 3, 0, 5]);
    let target_map = map(6, &[2, 3]);
    assert_eq!(
        Export::new(source_map.clone(), target_map.clone()).unwrap_err(),
        CrsError::NoOwner(0)
    );

    let export = Export::with_remote_owners(source_map.clone(), target_map.clone()).unwrap();
    assert_eq!(export.remote_indices(), &[0, 5]);

    let source = Vector::from_values(source_map, DVector::from_vec(vec![1.0, 2.0, 30.0, 40.0])).unwrap();
    let mut target = Vector::new(target_map);
    target.do_export(&source, &export, CombineMode::Add).unwrap();
    assert_eq!(target.values().as_slice(), &[1.0, 2.0]);
}

#[test]
fn empty_matrix_has_positive_zero_norm() {
    let row_map = map(0, &[]);
    let mut graph = CrsGraph::new(row_map.clone(), Vec::new()).unwrap();
    graph.fill_complete(row_map.clone(), row_map);
    let matrix = CrsMatrix::new(Arc::new(graph)).unwrap();
    let norm = matrix.frobenius_norm();
    assert_eq!(norm, 0.0);
    assert!(norm.is_sign_positive());
}
