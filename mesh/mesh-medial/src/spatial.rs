//! Nearest-neighbor queries over a fixed point set.
//!
//! The solver only needs "the k closest samples to this location", so it is
//! written against the [`SpatialIndex`] trait. [`KdTreeIndex`] is the default
//! implementation, backed by a kiddo k-d tree.

use std::collections::HashMap;

use kiddo::{KdTree, SquaredEuclidean};
use nalgebra::{Point3, Rotation3};
use tracing::debug;

/// A neighbor returned by a [`SpatialIndex`] query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Index of the neighbor in the indexed point set.
    pub index: usize,
    /// Euclidean distance from the query location.
    pub distance: f64,
}

/// Read-only k-nearest-neighbor queries over a fixed point set.
///
/// Implementations must return neighbors closest-first and must be safe to
/// query from many threads at once.
pub trait SpatialIndex: Sync {
    /// Number of indexed points.
    fn len(&self) -> usize;

    /// Returns true if no points are indexed.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Position of the point with the given index.
    fn point(&self, index: usize) -> Option<Point3<f64>>;

    /// Up to `k` nearest points to `query`, closest first.
    fn nearest(&self, query: &Point3<f64>, k: usize) -> Vec<Neighbor>;
}

/// [`SpatialIndex`] backed by a kiddo k-d tree.
///
/// kiddo's tree panics when a bucket overflows with items that share one
/// coordinate on the split axis, which plain scans hit on flat faces,
/// axis-aligned grids and repeated samples. The index avoids both cases:
///
/// - Coincident points are stored once in the tree; a query expands the
///   position back into all of its point indices, lowest index first.
/// - The tree is built over positions in a fixed rotated frame, so samples
///   on axis-aligned planes no longer share split coordinates. Rotation
///   keeps distances, and reported distances are measured on the original
///   points.
///
/// # Example
///
/// ```
/// use mesh_medial::spatial::{KdTreeIndex, SpatialIndex};
/// use nalgebra::Point3;
///
/// let points = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(5.0, 0.0, 0.0),
/// ];
/// let index = KdTreeIndex::build(&points, true);
///
/// let nearest = index.nearest(&Point3::new(0.9, 0.0, 0.0), 2);
/// assert_eq!(nearest[0].index, 1);
/// assert_eq!(nearest[1].index, 0);
/// ```
pub struct KdTreeIndex {
    tree: KdTree<f64, 3>,
    frame: Rotation3<f64>,
    points: Vec<Point3<f64>>,
    /// Point indices grouped by position: group `g` is
    /// `members[offsets[g]..offsets[g + 1]]`, ascending.
    offsets: Vec<usize>,
    members: Vec<usize>,
}

impl KdTreeIndex {
    /// Build the index over `points`.
    ///
    /// With `reserve` the tree is allocated for all distinct positions up
    /// front; otherwise it grows as positions are inserted.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn build(points: &[Point3<f64>], reserve: bool) -> Self {
        let (offsets, members) = group_positions(points);
        let groups = offsets.len() - 1;
        let frame = tree_frame();

        let mut tree: KdTree<f64, 3> = if reserve {
            KdTree::with_capacity(groups)
        } else {
            KdTree::new()
        };

        for (g, window) in offsets.windows(2).enumerate() {
            let p = frame * points[members[window[0]]];
            tree.add(&[p.x, p.y, p.z], g as u64);
        }

        debug!(
            points = points.len(),
            distinct = groups,
            reserve,
            "Built k-d tree"
        );

        Self {
            tree,
            frame,
            points: points.to_vec(),
            offsets,
            members,
        }
    }

    /// The indexed points, in index order.
    #[must_use]
    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    /// Number of distinct positions stored in the tree.
    #[must_use]
    pub fn distinct_len(&self) -> usize {
        self.offsets.len() - 1
    }
}

impl SpatialIndex for KdTreeIndex {
    fn len(&self) -> usize {
        self.points.len()
    }

    fn point(&self, index: usize) -> Option<Point3<f64>> {
        self.points.get(index).copied()
    }

    #[allow(clippy::cast_possible_truncation)]
    fn nearest(&self, query: &Point3<f64>, k: usize) -> Vec<Neighbor> {
        if k == 0 || self.points.is_empty() {
            return Vec::new();
        }

        let q = self.frame * query;
        let groups = self
            .tree
            .nearest_n::<SquaredEuclidean>(&[q.x, q.y, q.z], k);

        let mut neighbors = Vec::with_capacity(k);
        for group in groups {
            let g = group.item as usize;
            for &index in &self.members[self.offsets[g]..self.offsets[g + 1]] {
                if neighbors.len() == k {
                    break;
                }
                neighbors.push(Neighbor {
                    index,
                    distance: (self.points[index] - query).norm(),
                });
            }
        }
        // Stable: coincident points stay in index order
        neighbors.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        neighbors
    }
}

/// Fixed rotation applied to positions before they enter the tree.
fn tree_frame() -> Rotation3<f64> {
    Rotation3::from_euler_angles(0.571_8, 1.133_1, 0.364_9)
}

/// Group point indices by exact position, in first-occurrence order.
fn group_positions(points: &[Point3<f64>]) -> (Vec<usize>, Vec<usize>) {
    let mut slots: HashMap<[u64; 3], usize> = HashMap::with_capacity(points.len());
    let mut group_of = Vec::with_capacity(points.len());
    for p in points {
        let next = slots.len();
        let g = *slots.entry(position_key(p)).or_insert(next);
        group_of.push(g);
    }

    let mut offsets = vec![0usize; slots.len() + 1];
    for &g in &group_of {
        offsets[g + 1] += 1;
    }
    for g in 0..slots.len() {
        offsets[g + 1] += offsets[g];
    }

    let mut cursor = offsets.clone();
    let mut members = vec![0usize; points.len()];
    for (i, &g) in group_of.iter().enumerate() {
        members[cursor[g]] = i;
        cursor[g] += 1;
    }

    (offsets, members)
}

/// Bitwise key for a position; `-0.0` and `0.0` map to the same key.
fn position_key(p: &Point3<f64>) -> [u64; 3] {
    #[allow(clippy::float_cmp)]
    let bits = |v: f64| if v == 0.0 { 0 } else { v.to_bits() };
    [bits(p.x), bits(p.y), bits(p.z)]
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::cast_precision_loss, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn line_points(n: usize) -> Vec<Point3<f64>> {
        (0..n).map(|i| Point3::new(i as f64, 0.0, 0.0)).collect()
    }

    /// Axis-aligned `(2n + 1)^2` grid in the z = 0 plane.
    fn plane_grid(n: i32) -> Vec<Point3<f64>> {
        let mut points = Vec::new();
        for i in -n..=n {
            for j in -n..=n {
                points.push(Point3::new(f64::from(i), f64::from(j), 0.0));
            }
        }
        points
    }

    /// Exhaustive k-nearest distances, for comparison.
    fn brute_force_distances(points: &[Point3<f64>], query: &Point3<f64>, k: usize) -> Vec<f64> {
        let mut distances: Vec<f64> = points.iter().map(|p| (p - query).norm()).collect();
        distances.sort_by(f64::total_cmp);
        distances.truncate(k);
        distances
    }

    #[test]
    fn test_build_and_lookup() {
        let points = line_points(10);
        let index = KdTreeIndex::build(&points, true);

        assert_eq!(index.len(), 10);
        assert!(!index.is_empty());
        assert_eq!(index.point(3), Some(points[3]));
        assert_eq!(index.point(10), None);
        assert_eq!(index.points().len(), 10);
    }

    #[test]
    fn test_nearest_is_closest_first() {
        let points = line_points(50);
        let index = KdTreeIndex::build(&points, false);

        let result = index.nearest(&Point3::new(20.2, 0.0, 0.0), 3);
        assert_eq!(result.len(), 3);
        assert_eq!(result[0].index, 20);
        assert_eq!(result[1].index, 21);
        assert_eq!(result[2].index, 19);
        assert!(result[0].distance <= result[1].distance);
        assert!(result[1].distance <= result[2].distance);
    }

    #[test]
    fn test_nearest_distance_is_euclidean() {
        let points = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(3.0, 4.0, 0.1)];
        let index = KdTreeIndex::build(&points, true);

        let result = index.nearest(&Point3::new(0.0, 0.0, 0.0), 1);
        assert_eq!(result[0].index, 0);
        assert_relative_eq!(result[0].distance, 0.0);

        let result = index.nearest(&Point3::new(3.0, 4.0, 0.1), 2);
        assert_relative_eq!(result[1].distance, (25.0_f64 + 0.01).sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn test_nearest_with_fewer_points_than_k() {
        let points = vec![Point3::new(1.0, 2.0, 3.0)];
        let index = KdTreeIndex::build(&points, true);

        let result = index.nearest(&Point3::origin(), 2);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].index, 0);
    }

    #[test]
    fn test_empty_index() {
        let index = KdTreeIndex::build(&[], false);
        assert!(index.is_empty());
        assert!(index.nearest(&Point3::origin(), 2).is_empty());
    }

    #[test]
    fn test_reserve_does_not_change_results() {
        let points = line_points(100);
        let a = KdTreeIndex::build(&points, true);
        let b = KdTreeIndex::build(&points, false);

        let query = Point3::new(42.4, 0.3, -0.2);
        let ia: Vec<usize> = a.nearest(&query, 5).iter().map(|n| n.index).collect();
        let ib: Vec<usize> = b.nearest(&query, 5).iter().map(|n| n.index).collect();
        assert_eq!(ia, ib);
    }

    #[test]
    fn test_axis_aligned_plane() {
        // 41 x 41 samples share z = 0; far more than one bucket
        let points = plane_grid(20);
        let index = KdTreeIndex::build(&points, true);
        assert_eq!(index.len(), 1681);

        for query in [
            Point3::new(0.0, 0.0, -200.0),
            Point3::new(3.3, -7.1, 0.5),
            Point3::new(20.0, 20.0, 0.0),
        ] {
            let result = index.nearest(&query, 2);
            let expected = brute_force_distances(&points, &query, 2);
            assert_eq!(result.len(), 2);
            for (n, d) in result.iter().zip(&expected) {
                assert_relative_eq!(n.distance, *d, epsilon = 1e-9);
            }
        }

        let result = index.nearest(&Point3::new(4.0, -2.0, 0.0), 1);
        assert_eq!(points[result[0].index], Point3::new(4.0, -2.0, 0.0));
    }

    #[test]
    fn test_axis_aligned_lattice_matches_brute_force() {
        let mut points = Vec::new();
        for i in 0..8 {
            for j in 0..8 {
                for k in 0..8 {
                    points.push(Point3::new(f64::from(i), f64::from(j), f64::from(k)) * 0.5);
                }
            }
        }
        let index = KdTreeIndex::build(&points, false);

        for query in [
            Point3::new(1.2, 0.7, 3.9),
            Point3::new(-1.0, -1.0, -1.0),
            Point3::new(2.0, 2.0, 2.0),
        ] {
            let result = index.nearest(&query, 6);
            let expected = brute_force_distances(&points, &query, 6);
            let distances: Vec<f64> = result.iter().map(|n| n.distance).collect();
            for (a, b) in distances.iter().zip(&expected) {
                assert_relative_eq!(*a, *b, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_many_coincident_points() {
        let mut points = vec![Point3::new(1.0, 2.0, 3.0); 100];
        points.push(Point3::new(1.0, 2.0, 4.0));
        let index = KdTreeIndex::build(&points, true);

        assert_eq!(index.len(), 101);
        assert_eq!(index.distinct_len(), 2);

        let result = index.nearest(&Point3::new(1.0, 2.0, 3.0), 2);
        assert_eq!(result[0].index, 0);
        assert_eq!(result[1].index, 1);
        assert_eq!(result[1].distance, 0.0);

        let result = index.nearest(&Point3::new(1.0, 2.0, 10.0), 3);
        assert_eq!(result[0].index, 100);
        assert_eq!(result[1].index, 0);
        assert_eq!(result[2].index, 1);
    }

    #[test]
    fn test_signed_zero_is_one_position() {
        let points = vec![Point3::new(0.0, 1.0, 0.0), Point3::new(-0.0, 1.0, 0.0)];
        let index = KdTreeIndex::build(&points, true);
        assert_eq!(index.distinct_len(), 1);
        assert_eq!(index.nearest(&Point3::origin(), 2).len(), 2);
    }
}
