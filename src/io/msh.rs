use crate::connectivity::Tri3d2Connectivity;
use crate::mesh::Mesh;
use eyre::{eyre, Context};
use log::{debug, warn};
use nalgebra::Point2;
use std::path::Path;

/// Loads a triangle [`Mesh`] from a Gmsh MSH file at the given path.
pub fn load_msh_from_file<P: AsRef<Path>>(file_path: P) -> eyre::Result<Mesh> {
    let file_path = file_path.as_ref();
    let msh_bytes =
        std::fs::read(file_path).wrap_err_with(|| format!("failed to read file {}", file_path.display()))?;
    load_msh_from_bytes(&msh_bytes).wrap_err("failed to load mesh from msh file")
}

/// Loads a triangle [`Mesh`] by parsing the given bytes as a Gmsh MSH file.
///
/// Only `Tri3` element blocks of entity dimension 2 are read, all other element blocks are ignored.
pub fn load_msh_from_bytes(bytes: &[u8]) -> eyre::Result<Mesh> {
    let mut msh_file = mshio::parse_msh_bytes(bytes).map_err(|e| eyre!("failed to parse msh file: {}", e))?;

    let msh_nodes = msh_file
        .data
        .nodes
        .take()
        .ok_or_else(|| eyre!("MSH file does not contain nodes"))?;
    let msh_elements = msh_file
        .data
        .elements
        .take()
        .ok_or_else(|| eyre!("MSH file does not contain elements"))?;

    if !msh_elements
        .element_blocks
        .iter()
        .any(element_block_is_triangle_block)
    {
        return Err(eyre!(
            "MSH file does not contain an element block of the requested type ({:?} of dim 2)",
            mshio::ElementType::Tri3
        ));
    }

    let mut vertices = Vec::new();
    for node_block in &msh_nodes.node_blocks {
        if node_block.node_tags.is_some() {
            return Err(eyre!("node block tags are not consecutive in msh file"));
        }
        if node_block.entity_dim != 2 {
            warn!(
                "Node block entity has dimension {}, reading its nodes as 2D vertices.",
                node_block.entity_dim
            );
        }
        vertices.extend(
            node_block
                .nodes
                .iter()
                .map(|node| Point2::new(node.x, node.y)),
        );
    }

    let mut connectivity = Vec::new();
    for element_block in &msh_elements.element_blocks {
        if element_block.element_tags.is_some() {
            return Err(eyre!("element block tags are not consecutive in msh file"));
        }
        if !element_block_is_triangle_block(element_block) {
            continue;
        }
        for element in &element_block.elements {
            connectivity.push(triangle_from_msh_element(element)?);
        }
    }

    debug!(
        "Loaded MSH mesh with {} vertices and {} triangles",
        vertices.len(),
        connectivity.len()
    );
    Mesh::try_from_vertices_and_connectivity(vertices, connectivity).wrap_err("MSH file describes an invalid mesh")
}

fn element_block_is_triangle_block(element_block: &mshio::ElementBlock<u64, i32>) -> bool {
    element_block.element_type == mshio::ElementType::Tri3 && element_block.entity_dim == 2
}

fn triangle_from_msh_element(element: &mshio::Element<u64>) -> eyre::Result<Tri3d2Connectivity> {
    if element.nodes.len() < 3 {
        return Err(eyre!("not enough nodes to initialize connectivity"));
    }
    let mut vertices = [0; 3];
    for (vertex, &node) in vertices.iter_mut().zip(&element.nodes) {
        // MSH node tags are 1-based
        *vertex = usize::try_from(node)
            .ok()
            .and_then(|node| node.checked_sub(1))
            .ok_or_else(|| eyre!("invalid node tag {} in msh element", node))?;
    }
    Ok(Tri3d2Connectivity(vertices))
}
