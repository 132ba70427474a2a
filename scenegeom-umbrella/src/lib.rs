//! # scenegeom
//!
//! Buffer-level optimization of triangle geometry for scene graphs.
//!
//! This is the umbrella crate that re-exports the scenegeom crates in one place.
//! Use the individual crates for more granular control over dependencies.
//!
//! ## Features
//!
//! - **Core**: Coordinate buffers, indexed triangle sets, bounds and errors
//! - **Optimize**: Octree vertex deduplication and vertex cache reordering
//!
//! ## Quick Start
//!
//! ```rust
//! use scenegeom::prelude::*;
//!
//! // Two triangles that each carry their own copy of the shared edge
//! let mut mesh = IndexedTriangleSet::new(
//!     vec![
//!         0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0,
//!         0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0,
//!     ],
//!     vec![0, 1, 2, 3, 4, 5],
//! );
//!
//! let report = GeometryOptimizer::new().optimize_mesh(&mut mesh)?;
//! assert_eq!(report.vertices, 4);
//! assert_eq!(mesh.coords.len(), 12);
//! # Ok::<(), scenegeom::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `default`: Enables core and optimize
//! - `optimize`: Deduplication, cache reordering and the combined pipeline

// Re-export core functionality
pub use scenegeom_core::*;

// Re-export sub-crates
#[cfg(feature = "optimize")]
pub use scenegeom_optimize as optimize;

/// Convenient imports for common use cases
pub mod prelude {
    pub use scenegeom_core::*;

    #[cfg(feature = "optimize")]
    pub use scenegeom_optimize::*;
}
