use scenegeom::prelude::*;

#[test]
fn test_prelude_pipeline() -> anyhow::Result<()> {
    let mut mesh = IndexedTriangleSet::new(
        vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0],
        vec![0, 1, 2, 3, 2, 1],
    );
    let report = GeometryOptimizer::new().optimize_mesh(&mut mesh)?;

    assert_eq!(report.duplicates, 1);
    assert_eq!(mesh.vertex_count(), 3);
    assert_eq!(mesh.coord_index.len(), 6);
    assert!(mesh.coord_index.iter().all(|&i| i < 3));
    Ok(())
}

#[test]
fn test_submodule_paths() -> anyhow::Result<()> {
    let mut coords = vec![1.0, 2.0, 3.0, 1.0, 2.0, 3.0];
    let dedup = scenegeom::optimize::dedup::deduplicate(&mut coords, 1e-6)?;
    assert_eq!(dedup.remap_table(), vec![0, 0]);

    let bounds = scenegeom::BoundingBox::from_triples(as_triples(&coords)?);
    assert!(bounds.is_some());
    Ok(())
}
