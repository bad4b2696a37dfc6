use crate::connectivity::{Connectivity, Segment2d2Connectivity, Tri3d2Connectivity};
use crate::element::{Segment2d2Element, Tri3d2Element};
use crate::index_map::IndexMap;
use nalgebra::Point2;
use std::collections::BTreeMap;
use thiserror::Error;

pub mod procedural;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MeshError {
    #[error("cell {cell} references vertex {vertex}, but the mesh only has {num_vertices} vertices")]
    VertexOutOfBounds {
        cell: usize,
        vertex: usize,
        num_vertices: usize,
    },
    #[error("cell {cell} references vertex {vertex} more than once")]
    RepeatedVertex { cell: usize, vertex: usize },
    #[error("vertex map describes {size_with_ghosts} local indices, but the mesh has {num_vertices} vertices")]
    VertexMapSize {
        size_with_ghosts: usize,
        num_vertices: usize,
    },
}

/// A facet that is connected to exactly one cell.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BoundaryFacet {
    pub facet: Segment2d2Connectivity,
    /// The single cell the facet belongs to.
    pub cell: usize,
    /// The local index of the facet within the cell.
    pub local_facet: usize,
}

/// Index-based triangle mesh in two dimensions (no hanging nodes).
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    vertices: Vec<Point2<f64>>,
    connectivity: Vec<Tri3d2Connectivity>,
    vertex_map: IndexMap,
}

impl Mesh {
    /// Construct a mesh from vertices and connectivity.
    ///
    /// The connectivity is expected to only reference vertices in bounds. Use
    /// [`Mesh::try_from_vertices_and_connectivity`] for input that can not be trusted.
    pub fn from_vertices_and_connectivity(vertices: Vec<Point2<f64>>, connectivity: Vec<Tri3d2Connectivity>) -> Self {
        let vertex_map = IndexMap::serial(vertices.len());
        Self {
            vertices,
            connectivity,
            vertex_map,
        }
    }

    pub fn try_from_vertices_and_connectivity(
        vertices: Vec<Point2<f64>>,
        connectivity: Vec<Tri3d2Connectivity>,
    ) -> Result<Self, MeshError> {
        let num_vertices = vertices.len();
        for (cell, conn) in connectivity.iter().enumerate() {
            let v = conn.vertex_indices();
            for (i, &vertex) in v.iter().enumerate() {
                if vertex >= num_vertices {
                    return Err(MeshError::VertexOutOfBounds {
                        cell,
                        vertex,
                        num_vertices,
                    });
                }
                if v[..i].contains(&vertex) {
                    return Err(MeshError::RepeatedVertex { cell, vertex });
                }
            }
        }
        Ok(Self::from_vertices_and_connectivity(vertices, connectivity))
    }

    /// Replaces the serial vertex numbering with the given index map.
    ///
    /// Vertex `i` of the mesh becomes local index `i` of the map, so owned vertices must come
    /// before ghost vertices.
    pub fn with_vertex_map(self, vertex_map: IndexMap) -> Result<Self, MeshError> {
        if vertex_map.size_with_ghosts() != self.vertices.len() {
            return Err(MeshError::VertexMapSize {
                size_with_ghosts: vertex_map.size_with_ghosts(),
                num_vertices: self.vertices.len(),
            });
        }
        Ok(Self { vertex_map, ..self })
    }

    pub fn vertices(&self) -> &[Point2<f64>] {
        &self.vertices
    }

    pub fn connectivity(&self) -> &[Tri3d2Connectivity] {
        &self.connectivity
    }

    pub fn vertex_map(&self) -> &IndexMap {
        &self.vertex_map
    }

    pub fn num_cells(&self) -> usize {
        self.connectivity.len()
    }

    pub fn cell_element(&self, cell: usize) -> Option<Tri3d2Element> {
        self.connectivity
            .get(cell)?
            .vertices(&self.vertices)
            .map(Tri3d2Element::from_vertices)
    }

    pub fn facet_element(&self, facet: &Segment2d2Connectivity) -> Option<Segment2d2Element> {
        facet
            .vertices(&self.vertices)
            .map(Segment2d2Element::from_vertices)
    }

    /// Finds facets which are only connected to exactly one cell, along with the connected cell
    /// index and the local index of the facet within that cell.
    ///
    /// The result is ordered by the sorted vertex indices of the facets.
    pub fn find_boundary_facets(&self) -> Vec<BoundaryFacet> {
        // Use a BTreeMap to avoid non-determinism due to HashMap's internal randomization
        let mut facet_counts: BTreeMap<Segment2d2Connectivity, (BoundaryFacet, usize)> = BTreeMap::new();
        for (cell, conn) in self.connectivity.iter().enumerate() {
            for local_facet in 0..conn.num_faces() {
                if let Some(facet) = conn.get_face_connectivity(local_facet) {
                    let candidate = BoundaryFacet {
                        facet,
                        cell,
                        local_facet,
                    };
                    facet_counts
                        .entry(facet.sorted())
                        .and_modify(|(_, count)| *count += 1)
                        .or_insert((candidate, 1));
                }
            }
        }

        facet_counts
            .into_values()
            .filter(|&(_, count)| count == 1)
            .map(|(facet, _)| facet)
            .collect()
    }

    /// Returns a sorted list of vertices that are determined to be on the boundary.
    ///
    /// A vertex is considered to be a part of the boundary if it belongs to a boundary facet.
    pub fn find_boundary_vertices(&self) -> Vec<usize> {
        let mut indices = Vec::new();
        for boundary_facet in self.find_boundary_facets() {
            indices.extend(boundary_facet.facet.vertex_indices());
        }
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}
