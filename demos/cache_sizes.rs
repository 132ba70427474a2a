//! Compare vertex cache orderings across cache sizes
//!
//! Run with: cargo run --package scenegeom-demos --bin cache_sizes

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use scenegeom_optimize::{simulate_fifo_cache, VertexCacheOptimizer};

fn shuffled_grid(size: u32, seed: u64) -> Vec<u32> {
    let mut tris = Vec::new();
    for y in 0..size - 1 {
        for x in 0..size - 1 {
            let tl = y * size + x;
            let tr = tl + 1;
            let bl = (y + 1) * size + x;
            let br = bl + 1;
            tris.push([tl, bl, tr]);
            tris.push([tr, bl, br]);
        }
    }
    tris.shuffle(&mut StdRng::seed_from_u64(seed));
    tris.into_iter().flatten().collect()
}

fn main() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let size = 64;
    let indices = shuffled_grid(size, 42);
    let vertex_count = (size * size) as usize;

    println!("{} triangles, {} vertices", indices.len() / 3, vertex_count);
    println!("{:>6} {:>10} {:>10} {:>8}", "cache", "shuffled", "optimized", "atvr");

    for cache_size in [4, 8, 16, 24, 32, 64] {
        let before = simulate_fifo_cache(&indices, cache_size)?;
        let optimized = VertexCacheOptimizer::with_params(cache_size).optimize(&indices, vertex_count)?;
        let after = simulate_fifo_cache(&optimized, cache_size)?;

        println!(
            "{:>6} {:>10.3} {:>10.3} {:>8.3}",
            cache_size,
            before.acmr(),
            after.acmr(),
            after.atvr()
        );
    }

    Ok(())
}
