//! Basic procedural mesh generation routines.
use crate::connectivity::Tri3d2Connectivity;
use crate::mesh::Mesh;
use nalgebra::{Point2, Vector2};

/// Uniform triangle mesh of the unit square [0, 1]^2 with `cells_per_dim` squares per side,
/// each split into two triangles.
pub fn create_unit_square_uniform_tri_mesh_2d(cells_per_dim: usize) -> Mesh {
    create_rectangular_uniform_tri_mesh_2d(1.0, 1, 1, cells_per_dim, &Vector2::zeros())
}

/// Generates an axis-aligned rectangular uniform triangle mesh given a unit length,
/// dimensions as multipliers of the unit length and the number of cells per unit length.
///
/// Every square cell is split along its diagonal from bottom-left to top-right into two
/// counter-clockwise triangles. A zero resolution in any direction yields an empty mesh.
pub fn create_rectangular_uniform_tri_mesh_2d(
    unit_length: f64,
    units_x: usize,
    units_y: usize,
    cells_per_unit: usize,
    bottom_left: &Vector2<f64>,
) -> Mesh {
    if cells_per_unit == 0 || units_x == 0 || units_y == 0 {
        return Mesh::from_vertices_and_connectivity(Vec::new(), Vec::new());
    }

    let cell_size = unit_length / cells_per_unit as f64;
    let num_cells_x = units_x * cells_per_unit;
    let num_cells_y = units_y * cells_per_unit;
    let num_vertices_x = num_cells_x + 1;
    let num_vertices_y = num_cells_y + 1;

    let to_global_vertex_index = |i, j| num_vertices_x * j + i;

    let mut vertices = Vec::with_capacity(num_vertices_x * num_vertices_y);
    for j in 0..num_vertices_y {
        for i in 0..num_vertices_x {
            let v = bottom_left + Vector2::new(i as f64, j as f64) * cell_size;
            vertices.push(Point2::from(v));
        }
    }

    let mut cells = Vec::with_capacity(2 * num_cells_x * num_cells_y);
    for j in 0..num_cells_y {
        for i in 0..num_cells_x {
            let v00 = to_global_vertex_index(i, j);
            let v10 = to_global_vertex_index(i + 1, j);
            let v11 = to_global_vertex_index(i + 1, j + 1);
            let v01 = to_global_vertex_index(i, j + 1);
            cells.push(Tri3d2Connectivity([v00, v10, v11]));
            cells.push(Tri3d2Connectivity([v00, v11, v01]));
        }
    }

    Mesh::from_vertices_and_connectivity(vertices, cells)
}
