use crate::function::Function;
use crate::mesh::Mesh;
use eyre::{eyre, WrapErr};
use std::convert::TryInto;
use std::path::Path;
use vtkio::model::{
    Attribute, Attributes, ByteOrder, CellType, Cells, DataArray, DataSet, ElementType, IOBuffer, Piece,
    UnstructuredGridPiece, Version, VertexNumbers, Vtk,
};

/// Builds a VTK unstructured grid from a triangle mesh, optionally with nodal scalar fields.
pub struct FiniteElementMeshDataSetBuilder<'a> {
    mesh: &'a Mesh,
    point_scalars: Vec<(String, Vec<f64>)>,
    // Only used for exporting directly to file
    title: Option<String>,
}

impl<'a> FiniteElementMeshDataSetBuilder<'a> {
    pub fn from_mesh(mesh: &'a Mesh) -> Self {
        Self {
            mesh,
            point_scalars: Vec::new(),
            title: None,
        }
    }

    pub fn with_title(self, title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..self
        }
    }

    /// Attach one scalar value per mesh vertex.
    pub fn with_point_scalar_attributes(mut self, name: impl Into<String>, values: impl Into<Vec<f64>>) -> Self {
        self.point_scalars.push((name.into(), values.into()));
        self
    }

    /// Attach the coefficients of a P1 function, named after the function.
    pub fn with_function(self, function: &Function) -> Self {
        let values = function.coefficients().as_slice().to_vec();
        self.with_point_scalar_attributes(function.name(), values)
    }

    pub fn try_build(&self) -> eyre::Result<DataSet> {
        let num_vertices = self.mesh.vertices().len();
        let points: Vec<f64> = self
            .mesh
            .vertices()
            .iter()
            .flat_map(|v| [v.x, v.y, 0.0])
            .collect();

        // Legacy layout: N, i_1, ..., i_N for every cell
        let mut vertices: Vec<u32> = Vec::with_capacity(4 * self.mesh.num_cells());
        for cell in self.mesh.connectivity() {
            vertices.push(3);
            for &idx in cell.iter() {
                vertices.push(
                    idx.try_into()
                        .wrap_err_with(|| format!("vertex index {} does not fit in a VTK index", idx))?,
                );
            }
        }
        let num_cells: u32 = self
            .mesh
            .num_cells()
            .try_into()
            .wrap_err("too many cells for a legacy VTK file")?;

        let mut point_attributes = Vec::with_capacity(self.point_scalars.len());
        for (name, values) in &self.point_scalars {
            if values.len() != num_vertices {
                return Err(eyre!(
                    "attribute \"{}\" has {} values, but the mesh has {} vertices",
                    name,
                    values.len(),
                    num_vertices
                ));
            }
            point_attributes.push(Attribute::DataArray(DataArray {
                name: name.clone(),
                elem: ElementType::Scalars {
                    num_comp: 1,
                    lookup_table: None,
                },
                data: IOBuffer::F64(values.clone()),
            }));
        }

        let piece = UnstructuredGridPiece {
            points: points.into(),
            cells: Cells {
                cell_verts: VertexNumbers::Legacy { num_cells, vertices },
                types: vec![CellType::Triangle; self.mesh.num_cells()],
            },
            data: Attributes {
                point: point_attributes,
                cell: Vec::new(),
            },
        };

        Ok(DataSet::UnstructuredGrid {
            meta: None,
            pieces: vec![Piece::Inline(Box::new(piece))],
        })
    }

    /// Convenience function for directly exporting the dataset to a file.
    pub fn try_export(&self, filename: impl AsRef<Path>) -> eyre::Result<()> {
        let filepath = filename.as_ref();
        let fallback_title = filepath
            .file_stem()
            .map(|os_str| os_str.to_string_lossy().to_string())
            .unwrap_or_else(|| "untitled".to_string());
        let dataset = self.try_build()?;
        Vtk {
            version: Version { major: 4, minor: 1 },
            // If we don't have a title then just make the filepath the title
            title: self.title.clone().unwrap_or(fallback_title),
            byte_order: ByteOrder::BigEndian,
            data: dataset,
            file_path: None,
        }
        .export(filepath)
        .map_err(|err| eyre!("failed to export VTK file {}: {:?}", filepath.display(), err))
    }
}
