use fem_miniapp::function::Function;
use fem_miniapp::mesh::procedural::create_unit_square_uniform_tri_mesh_2d;
use fem_miniapp::space::{locate_dofs_geometrical, FunctionSpace};
use matrixcompare::assert_scalar_eq;
use nalgebra::Point2;
use std::sync::Arc;

#[test]
fn p1_space_dofs_coincide_with_vertices() {
    let mesh = Arc::new(create_unit_square_uniform_tri_mesh_2d(2));
    let space = FunctionSpace::lagrange_p1(mesh.clone());
    assert_eq!(space.num_dofs(), 9);
    assert_eq!(space.dofmap().num_cells(), 8);
    assert_eq!(space.dofmap().cell_dofs(0), &[0, 1, 4]);
    assert_eq!(space.tabulate_dof_coordinates(), mesh.vertices());
}

#[test]
fn locate_dofs_on_left_side() {
    let mesh = Arc::new(create_unit_square_uniform_tri_mesh_2d(2));
    let space = FunctionSpace::lagrange_p1(mesh);
    let dofs = locate_dofs_geometrical(&space, |x| x.x < 1e-12);
    assert_eq!(dofs, vec![0, 3, 6]);
    assert!(locate_dofs_geometrical(&space, |x| x.x > 2.0).is_empty());
}

#[test]
fn interpolated_linear_function_is_exact_inside_cells() {
    let mesh = Arc::new(create_unit_square_uniform_tri_mesh_2d(3));
    let space = FunctionSpace::lagrange_p1(mesh.clone());
    let mut u = Function::new(space).with_name("linear");
    u.interpolate(|x| 1.0 + 2.0 * x.x - 3.0 * x.y);
    assert_eq!(u.name(), "linear");

    let xi = Point2::new(-0.2, -0.4);
    for cell in 0..mesh.num_cells() {
        let x = mesh.cell_element(cell).unwrap().map_reference_coords(&xi);
        let expected = 1.0 + 2.0 * x.x - 3.0 * x.y;
        assert_scalar_eq!(u.evaluate_in_cell(cell, &xi).unwrap(), expected, comp = abs, tol = 1e-12);
    }
    assert!(u.evaluate_in_cell(mesh.num_cells(), &xi).is_none());
}
