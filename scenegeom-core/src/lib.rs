//! Core data structures for scenegeom
//!
//! This crate provides the buffer-level types shared by the geometry
//! optimizers: flat coordinate views, bounding boxes, indexed triangle sets
//! and the common error type.

pub mod bounds;
pub mod error;
pub mod mesh;
pub mod point;

pub use bounds::*;
pub use error::*;
pub use mesh::*;
pub use point::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Point3, Vector3};
