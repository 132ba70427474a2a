//! Vertex deduplication
//!
//! Collapses vertices closer than epsilon onto the first vertex of their
//! cluster, compacts the coordinate buffer in place and produces the table
//! needed to rewrite any index array that addressed the original vertices.

use crate::octree::{DuplicateReport, OctreeIndex};
use crate::{MeshOptimizer, OptimizationReport};
use scenegeom_core::{validate_indices, Error, IndexedTriangleSet, Result};
use serde::{Deserialize, Serialize};

/// Default merge tolerance, in coordinate units.
pub const DEFAULT_EPSILON: f64 = 1e-10;

/// Deduplication parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DedupConfig {
    /// Vertices strictly closer than this are merged.
    pub epsilon: f64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
        }
    }
}

impl DedupConfig {
    pub fn new(epsilon: f64) -> Self {
        Self { epsilon }
    }
}

/// Outcome of a deduplication pass.
///
/// Holds the compaction tables for the original vertex numbering:
/// `replacement[i]` is the canonical index `i` collapses onto and
/// `shift[i]` is the number of removed vertices before slot `i`. An
/// original index `i` maps to `replacement[i] - shift[replacement[i]]`;
/// the replacement has to be resolved before the shift is applied.
#[derive(Debug, Clone, PartialEq)]
pub struct Deduplication {
    original_count: usize,
    vertex_count: usize,
    report: DuplicateReport,
    shift: Vec<usize>,
    replacement: Vec<usize>,
}

impl Deduplication {
    fn unchanged(original_count: usize) -> Self {
        Self {
            original_count,
            vertex_count: original_count,
            report: DuplicateReport::default(),
            shift: Vec::new(),
            replacement: Vec::new(),
        }
    }

    /// Vertex count before compaction.
    pub fn original_count(&self) -> usize {
        self.original_count
    }

    /// Vertex count after compaction.
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn duplicate_count(&self) -> usize {
        self.report.duplicate_count()
    }

    pub fn has_duplicates(&self) -> bool {
        !self.report.is_empty()
    }

    pub fn report(&self) -> &DuplicateReport {
        &self.report
    }

    /// Number of removed vertices preceding each original slot.
    pub fn shift(&self) -> &[usize] {
        &self.shift
    }

    /// Canonical index of each original vertex (identity for survivors).
    pub fn replacement(&self) -> &[usize] {
        &self.replacement
    }

    #[inline]
    fn map(&self, index: usize) -> usize {
        let canonical = self.replacement[index];
        canonical - self.shift[canonical]
    }

    /// Composed old -> new index table.
    pub fn remap_table(&self) -> Vec<u32> {
        if !self.has_duplicates() {
            return (0..self.original_count as u32).collect();
        }
        (0..self.original_count).map(|i| self.map(i) as u32).collect()
    }

    /// Rewrite an index array that addresses the original vertices.
    ///
    /// Returns whether any entry changed. Fails with
    /// [`Error::IndexOutOfRange`] before touching the array if an entry is
    /// outside the original vertex range.
    pub fn remap_indices(&self, indices: &mut [u32]) -> Result<bool> {
        validate_indices(indices, self.original_count)?;
        if !self.has_duplicates() {
            return Ok(false);
        }

        let mut changed = false;
        for index in indices.iter_mut() {
            let mapped = self.map(*index as usize) as u32;
            if mapped != *index {
                *index = mapped;
                changed = true;
            }
        }
        Ok(changed)
    }

    /// Copying variant of [`Deduplication::remap_indices`].
    pub fn remapped(&self, indices: &[u32]) -> Result<Vec<u32>> {
        let mut out = indices.to_vec();
        self.remap_indices(&mut out)?;
        Ok(out)
    }

    /// Drop the entries of removed vertices from a per-vertex attribute
    /// buffer holding `stride` values per original vertex.
    ///
    /// Survivors keep their relative order, so the compacted buffer lines up
    /// with the compacted coordinates and with remapped indices.
    pub fn compact_attribute<T: Copy>(&self, data: &mut Vec<T>, stride: usize) -> Result<()> {
        if stride == 0 || data.len() != self.original_count * stride {
            return Err(Error::invalid(format!(
                "attribute buffer has {} values, expected {} vertices of stride {}",
                data.len(),
                self.original_count,
                stride
            )));
        }
        if !self.has_duplicates() {
            return Ok(());
        }

        let mut write = 0;
        for read in 0..self.original_count {
            if self.replacement[read] != read {
                continue;
            }
            if write != read {
                data.copy_within(read * stride..(read + 1) * stride, write * stride);
            }
            write += 1;
        }
        data.truncate(write * stride);
        Ok(())
    }
}

/// Octree-backed vertex deduplicator.
#[derive(Debug, Clone, Default)]
pub struct VertexDeduplicator {
    pub config: DedupConfig,
}

impl VertexDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(epsilon: f64) -> Self {
        Self::with_config(DedupConfig::new(epsilon))
    }

    pub fn with_config(config: DedupConfig) -> Self {
        Self { config }
    }

    /// Merge near-duplicate vertices and compact `coords` in place.
    ///
    /// `coords` is a flat `[x, y, z, ...]` buffer. On return it holds only the
    /// surviving vertices, in their original relative order.
    pub fn deduplicate(&self, coords: &mut Vec<f32>) -> Result<Deduplication> {
        let (_, report) = OctreeIndex::build(coords, self.config.epsilon)?;
        let original_count = coords.len() / 3;

        if report.is_empty() {
            tracing::debug!(vertices = original_count, "no duplicate vertices");
            return Ok(Deduplication::unchanged(original_count));
        }

        let mut replacement: Vec<usize> = (0..original_count).collect();
        for (duplicate, canonical) in report.pairs() {
            replacement[duplicate] = canonical;
        }

        let mut shift = Vec::with_capacity(original_count);
        let mut removed = 0;
        for (i, &canonical) in replacement.iter().enumerate() {
            shift.push(removed);
            if canonical != i {
                removed += 1;
            }
        }

        let dedup = Deduplication {
            original_count,
            vertex_count: original_count - removed,
            report,
            shift,
            replacement,
        };
        dedup.compact_attribute(coords, 3)?;

        tracing::debug!(
            original = original_count,
            remaining = dedup.vertex_count,
            duplicates = removed,
            "compacted vertex buffer"
        );

        Ok(dedup)
    }
}

impl MeshOptimizer for VertexDeduplicator {
    fn optimize_mesh(&self, mesh: &mut IndexedTriangleSet) -> Result<OptimizationReport> {
        mesh.validate()?;
        let triangles = mesh.triangle_count();
        let dedup = self.deduplicate(&mut mesh.coords)?;

        dedup.remap_indices(&mut mesh.coord_index)?;
        for aux in mesh.aux_indices_mut() {
            dedup.remap_indices(aux)?;
        }
        if let Some(normals) = mesh.normals.as_mut() {
            dedup.compact_attribute(normals, 3)?;
        }
        if let Some(tex_coords) = mesh.tex_coords.as_mut() {
            dedup.compact_attribute(tex_coords, 2)?;
        }

        Ok(OptimizationReport {
            original_vertices: dedup.original_count(),
            vertices: dedup.vertex_count(),
            duplicates: dedup.duplicate_count(),
            triangles,
            ..Default::default()
        })
    }
}

/// Deduplicate `coords` in place with the given tolerance.
pub fn deduplicate(coords: &mut Vec<f32>, epsilon: f64) -> Result<Deduplication> {
    VertexDeduplicator::with_params(epsilon).deduplicate(coords)
}
