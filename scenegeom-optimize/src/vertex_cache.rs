//! Vertex cache optimization
//!
//! Reorders triangles for post-transform vertex cache reuse with Tom
//! Forsyth's greedy scoring method ("Linear-Speed Vertex Cache
//! Optimisation", 2006). A FIFO cache is simulated while triangles are
//! emitted; every vertex carries a score built from its simulated cache
//! position and the number of triangles still waiting on it, and the next
//! triangle is the one whose three vertices score highest.

use crate::stats::simulate_fifo_cache;
use crate::{MeshOptimizer, OptimizationReport};
use scenegeom_core::{validate_indices, Error, IndexedTriangleSet, Result};
use serde::{Deserialize, Serialize};

/// Cache size used when none is given.
pub const DEFAULT_CACHE_SIZE: usize = 32;
/// Largest supported simulated cache.
pub const MAX_CACHE_SIZE: usize = 64;

const LAST_TRIANGLE_SCORE: f32 = 0.75;
const CACHE_DECAY_POWER: f32 = 1.5;
const VALENCE_BOOST_SCALE: f32 = 2.0;
const VALENCE_BOOST_POWER: f32 = 0.5;
const VALENCE_TABLE_SIZE: usize = 64;

const NOT_PLACED: usize = usize::MAX;

/// Vertex cache optimization parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexCacheConfig {
    /// Number of simulated FIFO cache slots, `1..=64`.
    pub cache_size: usize,
}

impl Default for VertexCacheConfig {
    fn default() -> Self {
        Self {
            cache_size: DEFAULT_CACHE_SIZE,
        }
    }
}

impl VertexCacheConfig {
    pub fn new(cache_size: usize) -> Self {
        Self { cache_size }
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_CACHE_SIZE).contains(&self.cache_size) {
            return Err(Error::CacheSizeOutOfRange(self.cache_size));
        }
        Ok(())
    }
}

// ============================================================
// Scoring
// ============================================================

/// Score lookup tables for one cache size.
#[derive(Debug, Clone)]
struct ScoreTables {
    cache: Vec<f32>,
    valence: Vec<f32>,
}

impl ScoreTables {
    fn new(cache_size: usize) -> Self {
        let cache = (0..cache_size)
            .map(|pos| {
                if pos < 3 {
                    // Vertices of the last triangle share one score so their
                    // order within it does not matter.
                    LAST_TRIANGLE_SCORE
                } else {
                    let scaler = 1.0 / (cache_size - 3) as f32;
                    (1.0 - (pos - 3) as f32 * scaler).powf(CACHE_DECAY_POWER)
                }
            })
            .collect();

        let valence = (0..VALENCE_TABLE_SIZE).map(Self::valence_boost).collect();

        Self { cache, valence }
    }

    fn valence_boost(remaining: usize) -> f32 {
        if remaining == 0 {
            return 0.0;
        }
        VALENCE_BOOST_SCALE * (remaining as f32).powf(-VALENCE_BOOST_POWER)
    }

    fn vertex_score(&self, cache_pos: Option<usize>, remaining: u32) -> f32 {
        if remaining == 0 {
            return -1.0;
        }
        let remaining = remaining as usize;
        let cache_score = cache_pos.map_or(0.0, |pos| self.cache[pos]);
        let valence_score = self
            .valence
            .get(remaining)
            .copied()
            .unwrap_or_else(|| Self::valence_boost(remaining));
        cache_score + valence_score
    }

    /// Highest score a triangle can reach with no cached vertices.
    fn max_valence_only_triangle_score(&self) -> f32 {
        3.0 * self.valence[1]
    }
}

// ============================================================
// Simulation state
// ============================================================

/// Per-run bookkeeping, discarded once the order is produced.
struct CacheSimulation<'a> {
    indices: &'a [u32],
    cache_size: usize,
    tables: ScoreTables,
    /// Triangles still waiting on each vertex
    remaining: Vec<u32>,
    /// Start of each vertex's slice in `active_faces`
    face_offsets: Vec<usize>,
    /// Per-vertex active triangle lists; the live part of a vertex's slice
    /// is its first `remaining[v]` entries
    active_faces: Vec<u32>,
    scores: Vec<f32>,
    /// Step at which a vertex was last placed into the next cache
    placed_step: Vec<usize>,
    processed: Vec<bool>,
    first_unprocessed: usize,
    cache: Vec<u32>,
    next_cache: Vec<u32>,
    full_scans: usize,
    /// Vertices of each emitted triangle found in the simulated cache
    #[cfg(test)]
    hits: Vec<usize>,
}

impl<'a> CacheSimulation<'a> {
    fn new(indices: &'a [u32], vertex_count: usize, cache_size: usize) -> Self {
        let tables = ScoreTables::new(cache_size);

        let mut remaining = vec![0u32; vertex_count];
        for &v in indices {
            remaining[v as usize] += 1;
        }

        let mut face_offsets = Vec::with_capacity(vertex_count + 1);
        let mut offset = 0;
        for &count in &remaining {
            face_offsets.push(offset);
            offset += count as usize;
        }
        face_offsets.push(offset);

        let mut cursor = face_offsets.clone();
        let mut active_faces = vec![0u32; indices.len()];
        for (corner, &v) in indices.iter().enumerate() {
            let v = v as usize;
            active_faces[cursor[v]] = (corner / 3) as u32;
            cursor[v] += 1;
        }

        let scores = remaining
            .iter()
            .map(|&count| tables.vertex_score(None, count))
            .collect();

        Self {
            indices,
            cache_size,
            tables,
            remaining,
            face_offsets,
            active_faces,
            scores,
            placed_step: vec![NOT_PLACED; vertex_count],
            processed: vec![false; indices.len() / 3],
            first_unprocessed: 0,
            cache: Vec::with_capacity(cache_size + 3),
            next_cache: Vec::with_capacity(cache_size + 3),
            full_scans: 0,
            #[cfg(test)]
            hits: Vec::new(),
        }
    }

    #[inline]
    fn triangle(&self, t: usize) -> [usize; 3] {
        let base = t * 3;
        [
            self.indices[base] as usize,
            self.indices[base + 1] as usize,
            self.indices[base + 2] as usize,
        ]
    }

    #[inline]
    fn triangle_score(&self, t: usize) -> f32 {
        self.triangle(t).iter().map(|&v| self.scores[v]).sum()
    }

    fn faces_of(&self, v: usize) -> &[u32] {
        let start = self.face_offsets[v];
        &self.active_faces[start..start + self.remaining[v] as usize]
    }

    /// Drop triangle `t` from the active list of `v` (swap with last).
    fn retire_face(&mut self, v: usize, t: usize) {
        let start = self.face_offsets[v];
        let len = self.remaining[v] as usize;
        let list = &mut self.active_faces[start..start + len];
        if let Some(pos) = list.iter().position(|&f| f as usize == t) {
            list.swap(pos, len - 1);
            self.remaining[v] -= 1;
        }
    }

    /// Best unprocessed triangle over the whole mesh.
    fn full_scan(&mut self) -> Option<usize> {
        self.full_scans += 1;
        let bound = self.tables.max_valence_only_triangle_score();

        while self.first_unprocessed < self.processed.len() && self.processed[self.first_unprocessed] {
            self.first_unprocessed += 1;
        }

        let mut best = None;
        let mut best_score = f32::NEG_INFINITY;
        for t in self.first_unprocessed..self.processed.len() {
            if self.processed[t] {
                continue;
            }
            let score = self.triangle_score(t);
            if score > best_score {
                best = Some(t);
                best_score = score;
                if score >= bound {
                    break;
                }
            }
        }

        tracing::trace!(triangle = ?best, score = best_score, "full triangle scan");
        best
    }

    /// Emit triangle `t`, update the simulated cache and return the best
    /// triangle reachable from the new cache contents.
    fn emit(&mut self, t: usize, step: usize) -> Option<usize> {
        self.processed[t] = true;
        let tri = self.triangle(t);
        #[cfg(test)]
        self.hits
            .push(tri.iter().filter(|&&v| self.cache.contains(&(v as u32))).count());
        for &v in &tri {
            self.retire_face(v, t);
        }

        let old = std::mem::take(&mut self.cache);
        let mut next = std::mem::take(&mut self.next_cache);
        next.clear();

        for &v in &tri {
            if self.placed_step[v] == step {
                continue;
            }
            self.placed_step[v] = step;
            if self.remaining[v] == 0 {
                self.scores[v] = -1.0;
            } else {
                next.push(v as u32);
            }
        }

        for &v in &old {
            let v = v as usize;
            if self.placed_step[v] == step {
                continue;
            }
            self.placed_step[v] = step;
            if next.len() < self.cache_size && self.remaining[v] > 0 {
                next.push(v as u32);
            } else {
                self.scores[v] = self.tables.vertex_score(None, self.remaining[v]);
            }
        }

        // Only reachable with caches smaller than a triangle
        while next.len() > self.cache_size {
            if let Some(v) = next.pop() {
                let v = v as usize;
                self.scores[v] = self.tables.vertex_score(None, self.remaining[v]);
            }
        }

        for (pos, &v) in next.iter().enumerate() {
            let v = v as usize;
            self.scores[v] = self.tables.vertex_score(Some(pos), self.remaining[v]);
        }

        let mut best = None;
        let mut best_score = 0.0;
        for &v in &next {
            for &f in self.faces_of(v as usize) {
                let score = self.triangle_score(f as usize);
                if score > best_score {
                    best = Some(f as usize);
                    best_score = score;
                }
            }
        }

        self.cache = next;
        self.next_cache = old;
        best
    }

    fn run(&mut self) -> Vec<usize> {
        let triangle_count = self.processed.len();
        let mut order = Vec::with_capacity(triangle_count);
        let mut candidate = None;

        for step in 0..triangle_count {
            let Some(t) = candidate.or_else(|| self.full_scan()) else {
                break;
            };
            order.push(t);
            candidate = self.emit(t, step);
        }

        tracing::debug!(
            triangles = triangle_count,
            cache_size = self.cache_size,
            full_scans = self.full_scans,
            "optimized triangle order"
        );
        order
    }
}

// ============================================================
// Public API
// ============================================================

/// Forsyth vertex cache optimizer.
#[derive(Debug, Clone, Default)]
pub struct VertexCacheOptimizer {
    pub config: VertexCacheConfig,
}

impl VertexCacheOptimizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(cache_size: usize) -> Self {
        Self::with_config(VertexCacheConfig::new(cache_size))
    }

    pub fn with_config(config: VertexCacheConfig) -> Self {
        Self { config }
    }

    fn check(&self, indices: &[u32], vertex_count: usize) -> Result<()> {
        self.config.validate()?;
        if indices.len() % 3 != 0 {
            return Err(Error::invalid(format!(
                "index buffer length {} is not a multiple of 3",
                indices.len()
            )));
        }
        validate_indices(indices, vertex_count)
    }

    /// Emission order of the triangles, as triangle numbers.
    ///
    /// The result is a permutation of `0..indices.len() / 3`, so it can be
    /// applied to any per-corner array running parallel to `indices`.
    pub fn triangle_order(&self, indices: &[u32], vertex_count: usize) -> Result<Vec<usize>> {
        self.check(indices, vertex_count)?;
        if indices.is_empty() {
            return Ok(Vec::new());
        }
        Ok(CacheSimulation::new(indices, vertex_count, self.config.cache_size).run())
    }

    /// Reordered copy of `indices`; each triangle keeps its corner order.
    pub fn optimize(&self, indices: &[u32], vertex_count: usize) -> Result<Vec<u32>> {
        let order = self.triangle_order(indices, vertex_count)?;
        Ok(apply_triangle_order(indices, &order))
    }
}

impl MeshOptimizer for VertexCacheOptimizer {
    fn optimize_mesh(&self, mesh: &mut IndexedTriangleSet) -> Result<OptimizationReport> {
        mesh.validate()?;
        let vertex_count = mesh.vertex_count();
        let before = simulate_fifo_cache(&mesh.coord_index, self.config.cache_size)?;

        let order = self.triangle_order(&mesh.coord_index, vertex_count)?;
        mesh.coord_index = apply_triangle_order(&mesh.coord_index, &order);
        for aux in mesh.aux_indices_mut() {
            *aux = apply_triangle_order(aux, &order);
        }

        let after = simulate_fifo_cache(&mesh.coord_index, self.config.cache_size)?;
        Ok(OptimizationReport {
            original_vertices: vertex_count,
            vertices: vertex_count,
            duplicates: 0,
            triangles: order.len(),
            acmr_before: Some(before.acmr()),
            acmr_after: Some(after.acmr()),
        })
    }
}

/// Gather whole triangles of `indices` in the given order.
pub fn apply_triangle_order(indices: &[u32], order: &[usize]) -> Vec<u32> {
    order
        .iter()
        .flat_map(|&t| indices[t * 3..t * 3 + 3].iter().copied())
        .collect()
}

/// Reorder `indices` for a FIFO cache of `cache_size` slots.
pub fn optimize_vertex_cache(indices: &[u32], vertex_count: usize, cache_size: usize) -> Result<Vec<u32>> {
    VertexCacheOptimizer::with_params(cache_size).optimize(indices, vertex_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sorted_triangles(indices: &[u32]) -> Vec<[u32; 3]> {
        let mut tris: Vec<[u32; 3]> = indices
            .chunks_exact(3)
            .map(|c| {
                let mut t = [c[0], c[1], c[2]];
                t.sort_unstable();
                t
            })
            .collect();
        tris.sort_unstable();
        tris
    }

    fn grid_indices(size: u32) -> Vec<u32> {
        let mut indices = Vec::new();
        for y in 0..size - 1 {
            for x in 0..size - 1 {
                let tl = y * size + x;
                let tr = tl + 1;
                let bl = (y + 1) * size + x;
                let br = bl + 1;
                indices.extend_from_slice(&[tl, bl, tr, tr, bl, br]);
            }
        }
        indices
    }

    #[test]
    fn test_score_tables() {
        let tables = ScoreTables::new(32);
        assert_relative_eq!(tables.vertex_score(None, 0), -1.0);
        assert_relative_eq!(tables.vertex_score(Some(0), 0), -1.0);
        assert_relative_eq!(tables.vertex_score(None, 1), 2.0);
        assert_relative_eq!(tables.vertex_score(None, 4), 1.0);
        assert_relative_eq!(tables.vertex_score(Some(2), 4), 1.75);
        assert_relative_eq!(tables.vertex_score(Some(3), 4), 2.0);
        assert!(tables.vertex_score(Some(31), 4) < tables.vertex_score(Some(10), 4));
        assert_relative_eq!(tables.vertex_score(None, 100), 0.2, epsilon = 1e-6);
        assert_relative_eq!(tables.max_valence_only_triangle_score(), 6.0);
    }

    #[test]
    fn test_single_triangle_unchanged() {
        for cache_size in [1, 3, 16, 64] {
            let out = optimize_vertex_cache(&[0, 1, 2], 3, cache_size).unwrap();
            assert_eq!(out, vec![0, 1, 2]);
        }
    }

    #[test]
    fn test_quad_keeps_both_triangles() {
        let out = optimize_vertex_cache(&[0, 1, 2, 2, 1, 3], 4, 4).unwrap();
        assert_eq!(out, vec![0, 1, 2, 2, 1, 3]);
    }

    #[test]
    fn test_output_is_permutation() {
        let indices = grid_indices(12);
        for cache_size in [1, 2, 3, 4, 8, 32, 64] {
            let out = optimize_vertex_cache(&indices, 144, cache_size).unwrap();
            assert_eq!(out.len(), indices.len());
            assert_eq!(sorted_triangles(&out), sorted_triangles(&indices));
        }
    }

    #[test]
    fn test_triangle_order_is_permutation() {
        let indices = grid_indices(6);
        let order = VertexCacheOptimizer::new().triangle_order(&indices, 36).unwrap();
        let mut sorted = order.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..indices.len() / 3).collect::<Vec<_>>());
    }

    #[test]
    fn test_deterministic() {
        let indices = grid_indices(10);
        let a = optimize_vertex_cache(&indices, 100, 16).unwrap();
        let b = optimize_vertex_cache(&indices, 100, 16).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_degenerate_triangles() {
        let indices = [0, 0, 1, 1, 2, 2, 0, 1, 2];
        let out = optimize_vertex_cache(&indices, 3, 4).unwrap();
        assert_eq!(sorted_triangles(&out), sorted_triangles(&indices));
    }

    #[test]
    fn test_unreferenced_vertices_allowed() {
        let out = optimize_vertex_cache(&[4, 5, 6], 10, 8).unwrap();
        assert_eq!(out, vec![4, 5, 6]);
    }

    #[test]
    fn test_empty_indices() {
        assert!(optimize_vertex_cache(&[], 0, 8).unwrap().is_empty());
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            optimize_vertex_cache(&[0, 1, 2], 3, 0),
            Err(Error::CacheSizeOutOfRange(0))
        );
        assert_eq!(
            optimize_vertex_cache(&[0, 1, 2], 3, 65),
            Err(Error::CacheSizeOutOfRange(65))
        );
        assert!(matches!(
            optimize_vertex_cache(&[0, 1], 3, 8),
            Err(Error::InvalidInput(_))
        ));
        assert_eq!(
            optimize_vertex_cache(&[0, 1, 3], 3, 8),
            Err(Error::IndexOutOfRange { index: 3, vertex_count: 3 })
        );
    }

    #[test]
    fn test_apply_triangle_order() {
        let indices = [0, 1, 2, 3, 4, 5, 6, 7, 8];
        assert_eq!(apply_triangle_order(&indices, &[2, 0, 1]), vec![6, 7, 8, 0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_mesh_optimizer_moves_aux_indices_with_triangles() {
        let indices = grid_indices(5);
        let tex: Vec<u32> = (0..indices.len() as u32).map(|i| i % 25).collect();
        let mut mesh = IndexedTriangleSet::new(vec![0.0; 25 * 3], indices.clone())
            .with_tex_coord_index(tex.clone());

        let report = VertexCacheOptimizer::with_params(8).optimize_mesh(&mut mesh).unwrap();
        assert_eq!(report.triangles, 32);
        assert!(report.acmr_before.is_some() && report.acmr_after.is_some());

        let order = VertexCacheOptimizer::with_params(8).triangle_order(&indices, 25).unwrap();
        assert_eq!(mesh.coord_index, apply_triangle_order(&indices, &order));
        assert_eq!(mesh.tex_coord_index, Some(apply_triangle_order(&tex, &order)));
    }

    #[test]
    fn test_quad_second_triangle_hits_cache() {
        let indices = [0, 1, 2, 2, 1, 3];
        let mut sim = CacheSimulation::new(&indices, 4, 4);
        assert_eq!(sim.run(), vec![0, 1]);
        // 1 and 2 are cached when the second triangle goes out
        assert_eq!(sim.hits, vec![0, 2]);
        assert!(sim.hits.iter().sum::<usize>() >= 2);
    }
}
