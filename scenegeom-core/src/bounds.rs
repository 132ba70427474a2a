//! Axis-aligned bounding boxes

use crate::point::{to_point3d, Point3d, Vector3d};
use serde::{Deserialize, Serialize};

/// Axis-aligned box in double precision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Point3d,
    pub max: Point3d,
}

impl BoundingBox {
    pub fn new(min: Point3d, max: Point3d) -> Self {
        Self { min, max }
    }

    /// Exact bounds of a set of coordinate triples in a single pass.
    ///
    /// Returns `None` for an empty slice.
    pub fn from_triples(triples: &[[f32; 3]]) -> Option<Self> {
        let first = to_point3d(triples.first()?);
        let mut min = first;
        let mut max = first;

        for t in &triples[1..] {
            let p = to_point3d(t);
            for i in 0..3 {
                if p[i] < min[i] {
                    min[i] = p[i];
                }
                if p[i] > max[i] {
                    max[i] = p[i];
                }
            }
        }

        Some(Self { min, max })
    }

    pub fn size(&self) -> Vector3d {
        self.max - self.min
    }

    pub fn max_extent(&self) -> f64 {
        let s = self.size();
        s.x.max(s.y).max(s.z)
    }

    pub fn center(&self) -> Point3d {
        nalgebra::center(&self.min, &self.max)
    }

    /// Grow the box outward by `eps` along every axis.
    pub fn expanded(&self, eps: f64) -> Self {
        let d = Vector3d::repeat(eps);
        Self {
            min: self.min - d,
            max: self.max + d,
        }
    }

    /// Closed containment test (boundary points are inside).
    #[inline]
    pub fn contains(&self, p: &Point3d) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    /// One of the 8 boxes obtained by bisecting every axis at the center.
    ///
    /// Bit 0 of `octant` selects the upper X half, bit 1 the upper Y half and
    /// bit 2 the upper Z half.
    pub fn octant(&self, octant: usize) -> Self {
        let c = self.center();
        let mut min = self.min;
        let mut max = c;
        for axis in 0..3 {
            if octant & (1 << axis) != 0 {
                min[axis] = c[axis];
                max[axis] = self.max[axis];
            }
        }
        Self { min, max }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_triples() {
        let bbox = BoundingBox::from_triples(&[[1.0, -2.0, 0.5], [-1.0, 4.0, 0.0], [0.0, 0.0, 3.0]])
            .unwrap();
        assert_eq!(bbox.min, Point3d::new(-1.0, -2.0, 0.0));
        assert_eq!(bbox.max, Point3d::new(1.0, 4.0, 3.0));
        assert_relative_eq!(bbox.max_extent(), 6.0);
        assert_eq!(bbox.center(), Point3d::new(0.0, 1.0, 1.5));
    }

    #[test]
    fn test_from_empty_triples() {
        assert!(BoundingBox::from_triples(&[]).is_none());
    }

    #[test]
    fn test_octants_partition_box() {
        let bbox = BoundingBox::new(Point3d::origin(), Point3d::new(2.0, 2.0, 2.0));

        let low = bbox.octant(0);
        assert_eq!(low.min, Point3d::origin());
        assert_eq!(low.max, Point3d::new(1.0, 1.0, 1.0));

        let x_only = bbox.octant(1);
        assert_eq!(x_only.min, Point3d::new(1.0, 0.0, 0.0));
        assert_eq!(x_only.max, Point3d::new(2.0, 1.0, 1.0));

        let high = bbox.octant(7);
        assert_eq!(high.min, Point3d::new(1.0, 1.0, 1.0));
        assert_eq!(high.max, Point3d::new(2.0, 2.0, 2.0));
    }

    #[test]
    fn test_expanded_contains_boundary_neighbours() {
        let bbox = BoundingBox::new(Point3d::origin(), Point3d::new(1.0, 1.0, 1.0));
        let outside = Point3d::new(1.0 + 1e-9, 0.5, 0.5);
        assert!(!bbox.contains(&outside));
        assert!(bbox.expanded(1e-6).contains(&outside));
        assert!(bbox.contains(&Point3d::new(1.0, 1.0, 1.0)));
    }
}
