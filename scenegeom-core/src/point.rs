//! Point types and flat coordinate buffer views

use crate::{Error, Result};
use nalgebra::{Point3, Vector3};

/// A 3D point with double precision coordinates
pub type Point3d = Point3<f64>;

/// A 3D vector with double precision components
pub type Vector3d = Vector3<f64>;

/// View a flat `[x, y, z, x, y, z, ...]` buffer as coordinate triples.
///
/// Fails with [`Error::InvalidInput`] when the length is not a multiple of 3.
pub fn as_triples(coords: &[f32]) -> Result<&[[f32; 3]]> {
    if coords.len() % 3 != 0 {
        return Err(Error::invalid(format!(
            "coordinate buffer length {} is not a multiple of 3",
            coords.len()
        )));
    }
    bytemuck::try_cast_slice(coords).map_err(|e| Error::invalid(e.to_string()))
}

/// Widen a coordinate triple to a double precision point.
#[inline]
pub fn to_point3d(triple: &[f32; 3]) -> Point3d {
    Point3d::new(triple[0] as f64, triple[1] as f64, triple[2] as f64)
}
