//! Basic usage demo for scenegeom
//!
//! Builds a height-field grid the way many exporters write it, with every
//! triangle corner carrying its own vertex, then welds and reorders it.
//!
//! Run with: RUST_LOG=debug cargo run --package scenegeom-demos --bin basic_usage

use anyhow::Context;
use scenegeom_core::IndexedTriangleSet;
use scenegeom_optimize::{GeometryOptimizer, MeshOptimizer};

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn unwelded_grid(size: usize) -> IndexedTriangleSet {
    let position = |x: usize, y: usize| {
        let h = ((x as f32 * 0.4).sin() * (y as f32 * 0.4).cos()) * 0.5;
        [x as f32, y as f32, h]
    };

    let mut coords = Vec::new();
    for y in 0..size - 1 {
        for x in 0..size - 1 {
            let corners = [
                position(x, y),
                position(x, y + 1),
                position(x + 1, y),
                position(x + 1, y),
                position(x, y + 1),
                position(x + 1, y + 1),
            ];
            coords.extend(corners.into_iter().flatten());
        }
    }

    let corner_count = (coords.len() / 3) as u32;
    IndexedTriangleSet::new(coords, (0..corner_count).collect())
        .with_normal_index((0..corner_count).collect())
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    println!("scenegeom Basic Usage");
    println!("=====================");

    let mut mesh = unwelded_grid(32);
    println!(
        "Input: {} vertices, {} triangles",
        mesh.vertex_count(),
        mesh.triangle_count()
    );

    let optimizer = GeometryOptimizer::new();
    let report = optimizer
        .optimize_mesh(&mut mesh)
        .context("optimizing grid mesh")?;

    println!("\nDeduplication:");
    println!("- {} -> {} vertices", report.original_vertices, report.vertices);
    println!("- {} duplicates removed", report.duplicates);

    println!("\nVertex cache:");
    if let (Some(before), Some(after)) = (report.acmr_before, report.acmr_after) {
        println!("- ACMR before reordering: {:.3}", before);
        println!("- ACMR after reordering:  {:.3}", after);
    }

    // Independent meshes can be processed together
    let mut batch: Vec<IndexedTriangleSet> = (8..16).map(unwelded_grid).collect();
    let reports = optimizer
        .optimize_batch(&mut batch)
        .context("optimizing batch")?;

    println!("\nBatch of {} meshes:", reports.len());
    for (mesh, report) in batch.iter().zip(&reports) {
        println!(
            "- {:5} -> {:4} vertices, {:4} triangles",
            report.original_vertices,
            mesh.vertex_count(),
            report.triangles
        );
    }

    tracing::info!(meshes = reports.len() + 1, "done");
    Ok(())
}
