//! Octree spatial index for epsilon-tolerant duplicate detection
//!
//! Cells live in a flat arena and refer to each other by index. Branch cells
//! get their 8 children lazily, the first time a vertex has to pass through
//! them; leaf cells hold the vertices assigned to them. When a vertex lands in
//! a leaf it is compared against the leaf's members, and if one of them is
//! closer than epsilon the vertex is recorded as a duplicate of that member
//! instead of joining the leaf.

use std::collections::{BTreeMap, HashMap};

use scenegeom_core::{as_triples, to_point3d, BoundingBox, Error, Point3d, Result};

/// Shallowest leaf depth.
pub const MIN_LEAF_LEVEL: u32 = 1;
/// Deepest leaf depth (at most 8^5 leaves).
pub const MAX_LEAF_LEVEL: u32 = 5;

const INVALID: usize = usize::MAX;

// ============================================================
// Cells
// ============================================================

/// One octree node.
#[derive(Debug, Clone)]
pub struct BoundedCell {
    /// Exact bounds
    pub bounds: BoundingBox,
    /// Bounds grown by epsilon, used for boundary-straddling vertices
    pub expanded: BoundingBox,
    /// Depth from the root
    pub level: u32,
    /// Depth at which cells stop subdividing
    pub leaf_level: u32,
    pub parent: Option<usize>,
    /// Arena index of the first of 8 consecutive children (INVALID until created)
    first_child: usize,
    members: Vec<usize>,
}

impl BoundedCell {
    fn new(bounds: BoundingBox, epsilon: f64, level: u32, leaf_level: u32, parent: Option<usize>) -> Self {
        Self {
            bounds,
            expanded: bounds.expanded(epsilon),
            level,
            leaf_level,
            parent,
            first_child: INVALID,
            members: Vec::new(),
        }
    }

    pub fn is_branch(&self) -> bool {
        self.level != self.leaf_level
    }

    /// Exact or epsilon-expanded containment.
    #[inline]
    pub fn contains(&self, p: &Point3d) -> bool {
        self.bounds.contains(p) || self.expanded.contains(p)
    }

    /// Arena indices of the children, if they have been created.
    pub fn children(&self) -> Option<std::ops::Range<usize>> {
        (self.first_child != INVALID).then(|| self.first_child..self.first_child + 8)
    }

    /// Vertex indices owned by this leaf (always empty for branches).
    pub fn members(&self) -> &[usize] {
        &self.members
    }
}

// ============================================================
// Duplicate report
// ============================================================

/// Duplicates detected while building an [`OctreeIndex`].
///
/// A canonical index is the first vertex of a cluster to reach its leaf.
/// Every other vertex of the cluster is a duplicate of exactly one canonical
/// index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DuplicateReport {
    /// canonical -> duplicates, in detection order
    duplicates_of: HashMap<usize, Vec<usize>>,
    /// duplicate -> canonical, ordered by duplicate index
    canonical: BTreeMap<usize, usize>,
}

impl DuplicateReport {
    fn record(&mut self, canonical: usize, duplicate: usize) {
        self.duplicates_of.entry(canonical).or_default().push(duplicate);
        self.canonical.insert(duplicate, canonical);
    }

    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }

    pub fn duplicate_count(&self) -> usize {
        self.canonical.len()
    }

    pub fn is_duplicate(&self, index: usize) -> bool {
        self.canonical.contains_key(&index)
    }

    /// Canonical index that `index` was merged into, if it is a duplicate.
    pub fn canonical_of(&self, index: usize) -> Option<usize> {
        self.canonical.get(&index).copied()
    }

    /// Duplicates recorded against a canonical index.
    pub fn duplicates_of(&self, canonical: usize) -> &[usize] {
        self.duplicates_of
            .get(&canonical)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All duplicate indices, ascending.
    pub fn duplicate_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.canonical.keys().copied()
    }

    /// `(duplicate, canonical)` pairs, ascending by duplicate.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.canonical.iter().map(|(&d, &c)| (d, c))
    }
}

// ============================================================
// Octree
// ============================================================

/// Octree over a vertex set, built once for duplicate detection.
#[derive(Debug, Clone)]
pub struct OctreeIndex {
    cells: Vec<BoundedCell>,
    positions: Vec<Point3d>,
    leaf_level: u32,
    epsilon: f64,
}

impl OctreeIndex {
    /// Leaf depth for `n` vertices: `floor(log2(n) / 3) - 1`, clamped to
    /// `[MIN_LEAF_LEVEL, MAX_LEAF_LEVEL]`.
    pub fn leaf_level_for(n: usize) -> u32 {
        if n <= 1 {
            return MIN_LEAF_LEVEL;
        }
        let level = ((n as f64).log2() / 3.0).floor() as i64 - 1;
        level.clamp(MIN_LEAF_LEVEL as i64, MAX_LEAF_LEVEL as i64) as u32
    }

    /// Build the index over a flat coordinate buffer and classify every
    /// vertex as canonical or duplicate.
    ///
    /// Two vertices are duplicates when their Euclidean distance is strictly
    /// less than `epsilon`.
    pub fn build(coords: &[f32], epsilon: f64) -> Result<(Self, DuplicateReport)> {
        if coords.is_empty() {
            return Err(Error::invalid("empty coordinate buffer"));
        }
        if !epsilon.is_finite() || epsilon < 0.0 {
            return Err(Error::invalid(format!(
                "epsilon must be finite and non-negative, got {}",
                epsilon
            )));
        }
        let triples = as_triples(coords)?;
        let bounds = BoundingBox::from_triples(triples)
            .ok_or_else(|| Error::invalid("empty coordinate buffer"))?;

        let leaf_level = Self::leaf_level_for(triples.len());
        let mut octree = OctreeIndex {
            cells: vec![BoundedCell::new(bounds, epsilon, 0, leaf_level, None)],
            positions: triples.iter().map(to_point3d).collect(),
            leaf_level,
            epsilon,
        };

        let mut report = DuplicateReport::default();
        for index in 0..triples.len() {
            octree.insert(index, &mut report);
        }

        tracing::debug!(
            vertices = triples.len(),
            leaf_level,
            cells = octree.cells.len(),
            duplicates = report.duplicate_count(),
            "built octree index"
        );

        Ok((octree, report))
    }

    pub fn leaf_level(&self) -> u32 {
        self.leaf_level
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn cells(&self) -> &[BoundedCell] {
        &self.cells
    }

    pub fn root(&self) -> &BoundedCell {
        &self.cells[0]
    }

    /// Route a vertex from the root to the first accepting leaf.
    fn insert(&mut self, index: usize, report: &mut DuplicateReport) {
        let p = self.positions[index];
        let mut cell = 0;

        while self.cells[cell].is_branch() {
            let first = self.ensure_children(cell);
            cell = (first..first + 8)
                .find(|&c| self.cells[c].contains(&p))
                .unwrap_or_else(|| first + self.octant_of(cell, &p));
        }

        self.insert_into_leaf(cell, index, report);
    }

    /// Fallback for points that no child accepts (NaN coordinates).
    fn octant_of(&self, cell: usize, p: &Point3d) -> usize {
        let c = self.cells[cell].bounds.center();
        (0..3).filter(|&axis| p[axis] > c[axis]).map(|axis| 1 << axis).sum()
    }

    fn ensure_children(&mut self, cell: usize) -> usize {
        if let Some(children) = self.cells[cell].children() {
            return children.start;
        }

        let first = self.cells.len();
        let parent = &self.cells[cell];
        let bounds = parent.bounds;
        let level = parent.level + 1;
        for octant in 0..8 {
            self.cells.push(BoundedCell::new(
                bounds.octant(octant),
                self.epsilon,
                level,
                self.leaf_level,
                Some(cell),
            ));
        }
        self.cells[cell].first_child = first;
        first
    }

    fn insert_into_leaf(&mut self, cell: usize, index: usize, report: &mut DuplicateReport) {
        let p = self.positions[index];
        let matched = self.cells[cell]
            .members
            .iter()
            .copied()
            .find(|&m| m != index && nalgebra::distance(&self.positions[m], &p) < self.epsilon);

        match matched {
            Some(canonical) => report.record(canonical, index),
            None => self.cells[cell].members.push(index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaf_level_for() {
        assert_eq!(OctreeIndex::leaf_level_for(1), 1);
        assert_eq!(OctreeIndex::leaf_level_for(3), 1);
        assert_eq!(OctreeIndex::leaf_level_for(1 << 9), 2);
        assert_eq!(OctreeIndex::leaf_level_for(1 << 12), 3);
        assert_eq!(OctreeIndex::leaf_level_for(1 << 18), 5);
        assert_eq!(OctreeIndex::leaf_level_for(1 << 30), 5);
    }

    #[test]
    fn test_rejects_invalid_input() {
        assert!(matches!(OctreeIndex::build(&[], 1e-6), Err(Error::InvalidInput(_))));
        assert!(matches!(
            OctreeIndex::build(&[0.0, 1.0], 1e-6),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            OctreeIndex::build(&[0.0, 0.0, 0.0], -1.0),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            OctreeIndex::build(&[0.0, 0.0, 0.0], f64::NAN),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_detects_near_duplicates() {
        let coords = [0.0, 0.0, 0.0, 0.0, 0.0, 1e-10, 5.0, 5.0, 5.0];
        let (_, report) = OctreeIndex::build(&coords, 1e-8).unwrap();

        assert_eq!(report.duplicate_count(), 1);
        assert!(report.is_duplicate(1));
        assert!(!report.is_duplicate(0));
        assert_eq!(report.canonical_of(1), Some(0));
        assert_eq!(report.duplicates_of(0), &[1]);
        assert!(report.duplicates_of(2).is_empty());
    }

    #[test]
    fn test_distance_at_epsilon_is_not_duplicate() {
        let coords = [0.0, 0.0, 0.0, 0.5, 0.0, 0.0];
        let (_, report) = OctreeIndex::build(&coords, 0.5).unwrap();
        assert!(report.is_empty());

        let (_, report) = OctreeIndex::build(&coords, 0.5001).unwrap();
        assert_eq!(report.canonical_of(1), Some(0));
    }

    #[test]
    fn test_first_member_wins() {
        // 2 is closer to 1, but duplicates never join a leaf so 2 matches 0
        let coords = [0.0, 0.0, 0.0, 0.3, 0.0, 0.0, 0.35, 0.0, 0.0];
        let (_, report) = OctreeIndex::build(&coords, 0.4).unwrap();
        assert_eq!(report.canonical_of(1), Some(0));
        assert_eq!(report.canonical_of(2), Some(0));
        assert_eq!(report.duplicates_of(0), &[1, 2]);
        let dups: Vec<usize> = report.duplicate_indices().collect();
        assert_eq!(dups, vec![1, 2]);
    }

    #[test]
    fn test_branches_hold_no_members() {
        let mut coords = Vec::new();
        for i in 0..600 {
            let t = i as f32;
            coords.extend_from_slice(&[t.sin() * 10.0, t.cos() * 10.0, t * 0.01]);
        }
        let (octree, _) = OctreeIndex::build(&coords, 1e-6).unwrap();
        assert_eq!(octree.leaf_level(), 2);
        assert_eq!(octree.root().level, 0);

        let mut leaf_members = 0;
        for cell in octree.cells() {
            if cell.is_branch() {
                assert!(cell.members().is_empty());
            } else {
                assert_eq!(cell.level, octree.leaf_level());
                assert!(cell.children().is_none());
                leaf_members += cell.members().len();
            }
        }
        assert_eq!(leaf_members, 600);
    }

    #[test]
    fn test_children_are_lazy() {
        // Everything lands in the lowest octant chain except one far corner
        let coords = [0.0, 0.0, 0.0, 0.1, 0.1, 0.1, 8.0, 8.0, 8.0];
        let (octree, _) = OctreeIndex::build(&coords, 1e-6).unwrap();
        // root + its 8 children; leaf level 1 so children are leaves
        assert_eq!(octree.cell_count(), 9);
        let root = octree.root();
        let children = root.children().unwrap();
        assert_eq!(octree.cells()[children.start].members(), &[0, 1]);
        assert_eq!(octree.cells()[children.end - 1].members(), &[2]);
        for c in children {
            assert_eq!(octree.cells()[c].parent, Some(0));
        }
    }

    #[test]
    fn test_single_vertex() {
        let (octree, report) = OctreeIndex::build(&[1.0, 2.0, 3.0], 1e-10).unwrap();
        assert!(report.is_empty());
        assert_eq!(octree.leaf_level(), MIN_LEAF_LEVEL);
    }
}
