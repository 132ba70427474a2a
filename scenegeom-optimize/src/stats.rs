//! Vertex cache statistics

use std::collections::VecDeque;

use itertools::Itertools;
use scenegeom_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::vertex_cache::MAX_CACHE_SIZE;

/// Hit/miss counts from replaying an index stream through a FIFO cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub triangles: usize,
    pub unique_vertices: usize,
}

impl CacheStats {
    /// Average cache miss ratio: transformed vertices per triangle.
    ///
    /// 3.0 means no reuse at all; well ordered meshes land around 0.6-0.7.
    pub fn acmr(&self) -> f32 {
        if self.triangles == 0 {
            return 0.0;
        }
        self.misses as f32 / self.triangles as f32
    }

    /// Average transform to vertex ratio; 1.0 is optimal.
    pub fn atvr(&self) -> f32 {
        if self.unique_vertices == 0 {
            return 0.0;
        }
        self.misses as f32 / self.unique_vertices as f32
    }

    pub fn hit_rate(&self) -> f32 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        self.hits as f32 / total as f32
    }
}

/// Replay `indices` through a FIFO vertex cache of `cache_size` slots.
pub fn simulate_fifo_cache(indices: &[u32], cache_size: usize) -> Result<CacheStats> {
    if !(1..=MAX_CACHE_SIZE).contains(&cache_size) {
        return Err(Error::CacheSizeOutOfRange(cache_size));
    }

    let mut cache: VecDeque<u32> = VecDeque::with_capacity(cache_size + 1);
    let mut stats = CacheStats {
        triangles: indices.len() / 3,
        unique_vertices: indices.iter().unique().count(),
        ..Default::default()
    };

    for &index in indices {
        if cache.contains(&index) {
            stats.hits += 1;
        } else {
            stats.misses += 1;
            cache.push_back(index);
            if cache.len() > cache_size {
                cache.pop_front();
            }
        }
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_quad_shares_an_edge() {
        let stats = simulate_fifo_cache(&[0, 1, 2, 2, 1, 3], 4).unwrap();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 4);
        assert_eq!(stats.triangles, 2);
        assert_eq!(stats.unique_vertices, 4);
        assert_relative_eq!(stats.acmr(), 2.0);
        assert_relative_eq!(stats.atvr(), 1.0);
    }

    #[test]
    fn test_fifo_does_not_refresh_on_hit() {
        // With LRU, 0 would survive; FIFO evicts it regardless of the hit
        let stats = simulate_fifo_cache(&[0, 1, 0, 2, 0], 2).unwrap();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 4);
    }

    #[test]
    fn test_empty_stream() {
        let stats = simulate_fifo_cache(&[], 8).unwrap();
        assert_eq!(stats, CacheStats::default());
        assert_relative_eq!(stats.acmr(), 0.0);
        assert_relative_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_cache_size_checked() {
        assert_eq!(simulate_fifo_cache(&[0, 1, 2], 0), Err(Error::CacheSizeOutOfRange(0)));
        assert_eq!(simulate_fifo_cache(&[0, 1, 2], 65), Err(Error::CacheSizeOutOfRange(65)));
    }
}
