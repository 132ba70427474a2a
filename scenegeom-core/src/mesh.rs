//! Indexed triangle geometry as extracted from scene-graph nodes

use crate::{point::as_triples, Error, Result};
use serde::{Deserialize, Serialize};

/// Check that every index lies in `[0, vertex_count)`.
pub fn validate_indices(indices: &[u32], vertex_count: usize) -> Result<()> {
    match indices.iter().find(|&&i| i as usize >= vertex_count) {
        Some(&index) => Err(Error::IndexOutOfRange {
            index: index as usize,
            vertex_count,
        }),
        None => Ok(()),
    }
}

/// A triangle set with flat coordinates and per-corner index arrays.
///
/// `normals` and `tex_coords`, when present, hold one entry per vertex
/// (3 and 2 values respectively) and line up with `coords`. `normal_index`
/// and `tex_coord_index` run parallel to `coord_index` (one entry per triangle
/// corner) and address those per-vertex arrays, so welding compacts the
/// attribute arrays and remaps their indices together with the coordinates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexedTriangleSet {
    /// Flat `[x, y, z, ...]` vertex coordinates
    pub coords: Vec<f32>,
    /// Three vertex indices per triangle
    pub coord_index: Vec<u32>,
    /// Flat `[nx, ny, nz, ...]` per-vertex normals
    pub normals: Option<Vec<f32>>,
    /// Flat `[u, v, ...]` per-vertex texture coordinates
    pub tex_coords: Option<Vec<f32>>,
    pub normal_index: Option<Vec<u32>>,
    pub tex_coord_index: Option<Vec<u32>>,
}

impl IndexedTriangleSet {
    /// Create a triangle set from coordinates and a coordinate index array
    pub fn new(coords: Vec<f32>, coord_index: Vec<u32>) -> Self {
        Self {
            coords,
            coord_index,
            normals: None,
            tex_coords: None,
            normal_index: None,
            tex_coord_index: None,
        }
    }

    pub fn with_normals(mut self, normals: Vec<f32>) -> Self {
        self.normals = Some(normals);
        self
    }

    pub fn with_tex_coords(mut self, tex_coords: Vec<f32>) -> Self {
        self.tex_coords = Some(tex_coords);
        self
    }

    pub fn with_normal_index(mut self, normal_index: Vec<u32>) -> Self {
        self.normal_index = Some(normal_index);
        self
    }

    pub fn with_tex_coord_index(mut self, tex_coord_index: Vec<u32>) -> Self {
        self.tex_coord_index = Some(tex_coord_index);
        self
    }

    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.coords.len() / 3
    }

    /// Get the number of triangles
    pub fn triangle_count(&self) -> usize {
        self.coord_index.len() / 3
    }

    /// Check if the triangle set is empty
    pub fn is_empty(&self) -> bool {
        self.coords.is_empty() || self.coord_index.is_empty()
    }

    /// Per-corner auxiliary index arrays that are present.
    pub fn aux_indices_mut(&mut self) -> impl Iterator<Item = &mut Vec<u32>> + '_ {
        self.normal_index
            .iter_mut()
            .chain(self.tex_coord_index.iter_mut())
    }

    /// Check buffer shapes and index ranges.
    pub fn validate(&self) -> Result<()> {
        if self.coords.is_empty() {
            return Err(Error::invalid("empty coordinate buffer"));
        }
        as_triples(&self.coords)?;
        if self.coord_index.len() % 3 != 0 {
            return Err(Error::invalid(format!(
                "index buffer length {} is not a multiple of 3",
                self.coord_index.len()
            )));
        }

        let vertex_count = self.vertex_count();
        validate_indices(&self.coord_index, vertex_count)?;

        for (name, attribute, stride) in [
            ("normals", &self.normals, 3),
            ("tex_coords", &self.tex_coords, 2),
        ] {
            if let Some(attribute) = attribute {
                if attribute.len() != vertex_count * stride {
                    return Err(Error::invalid(format!(
                        "{} has {} values, expected {} for {} vertices",
                        name,
                        attribute.len(),
                        vertex_count * stride,
                        vertex_count
                    )));
                }
            }
        }

        for (name, aux) in [
            ("normal_index", &self.normal_index),
            ("tex_coord_index", &self.tex_coord_index),
        ] {
            if let Some(aux) = aux {
                if aux.len() != self.coord_index.len() {
                    return Err(Error::invalid(format!(
                        "{} has {} entries, coord_index has {}",
                        name,
                        aux.len(),
                        self.coord_index.len()
                    )));
                }
                validate_indices(aux, vertex_count)?;
            }
        }

        Ok(())
    }
}
