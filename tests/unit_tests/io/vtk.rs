use fem_miniapp::function::Function;
use fem_miniapp::io::vtk::FiniteElementMeshDataSetBuilder;
use fem_miniapp::mesh::procedural::create_unit_square_uniform_tri_mesh_2d;
use fem_miniapp::space::FunctionSpace;
use std::sync::Arc;
use vtkio::model::{Attribute, CellType, DataSet, Piece, VertexNumbers};

#[test]
fn dataset_contains_triangles_and_point_data() {
    let mesh = Arc::new(create_unit_square_uniform_tri_mesh_2d(2));
    let mut u = Function::new(FunctionSpace::lagrange_p1(mesh.clone())).with_name("temperature");
    u.interpolate(|x| x.x + x.y);

    let dataset = FiniteElementMeshDataSetBuilder::from_mesh(&mesh)
        .with_function(&u)
        .try_build()
        .unwrap();

    let pieces = match dataset {
        DataSet::UnstructuredGrid { pieces, .. } => pieces,
        _ => panic!("expected an unstructured grid"),
    };
    assert_eq!(pieces.len(), 1);
    let piece = match &pieces[0] {
        Piece::Inline(piece) => piece,
        _ => panic!("expected an inline piece"),
    };

    assert_eq!(piece.points.len(), 3 * 9);
    assert_eq!(piece.cells.types, vec![CellType::Triangle; 8]);
    match &piece.cells.cell_verts {
        VertexNumbers::Legacy { num_cells, vertices } => {
            assert_eq!(*num_cells, 8);
            assert_eq!(&vertices[..4], &[3, 0, 1, 4]);
            assert_eq!(vertices.len(), 32);
        }
        _ => panic!("expected legacy connectivity"),
    }

    assert_eq!(piece.data.point.len(), 1);
    match &piece.data.point[0] {
        Attribute::DataArray(array) => assert_eq!(array.name, "temperature"),
        _ => panic!("expected a data array"),
    }
}

#[test]
fn mismatched_attribute_length_is_an_error() {
    let mesh = create_unit_square_uniform_tri_mesh_2d(1);
    let result = FiniteElementMeshDataSetBuilder::from_mesh(&mesh)
        .with_point_scalar_attributes("too_short", vec![1.0, 2.0])
        .try_build();
    assert!(result.is_err());
}
