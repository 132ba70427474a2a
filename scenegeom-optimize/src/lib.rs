//! Geometry optimization for scene-graph meshes
//!
//! This crate provides the two buffer-level optimizations applied to
//! triangle geometry before it is written back into a scene:
//! - Octree-based deduplication of near-coincident vertices, with index
//!   remapping for coordinate, normal and texture-coordinate indices
//! - Forsyth vertex cache optimization of the triangle order
//! - FIFO cache statistics for comparing orderings
//! - A combined pipeline with a parallel batch driver

pub mod dedup;
pub mod octree;
pub mod pipeline;
pub mod stats;
pub mod vertex_cache;

pub use dedup::*;
pub use octree::*;
pub use pipeline::*;
pub use stats::*;
pub use vertex_cache::*;

use scenegeom_core::{IndexedTriangleSet, Result};
use serde::{Deserialize, Serialize};

/// Summary of an optimization pass over one triangle set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OptimizationReport {
    pub original_vertices: usize,
    pub vertices: usize,
    pub duplicates: usize,
    pub triangles: usize,
    /// FIFO cache miss ratio before reordering, if reordering ran
    pub acmr_before: Option<f32>,
    /// FIFO cache miss ratio after reordering, if reordering ran
    pub acmr_after: Option<f32>,
}

/// Optimize a triangle set in place
pub trait MeshOptimizer {
    fn optimize_mesh(&self, mesh: &mut IndexedTriangleSet) -> Result<OptimizationReport>;
}
