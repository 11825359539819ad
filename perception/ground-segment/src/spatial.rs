//! Voxel-hash neighbor index for fixed-radius queries.
//!
//! Points are bucketed into cubic cells keyed by integer coordinates. A
//! radius query visits only the cells the query ball can touch, so the cost
//! depends on local density rather than cloud size. Unlike a k-d tree this
//! stays well behaved on perfectly flat ground, where many points share a
//! coordinate.

use hashbrown::HashMap;
use nalgebra::Point3;

type CellKey = (i64, i64, i64);

/// Queries reaching further than this many cells fall back to a scan.
const MAX_CELL_REACH: i64 = 16;

/// Spatial hash over a slice of positions.
///
/// Non-finite positions are not indexed and never appear in query results.
///
/// # Example
///
/// ```
/// use ground_segment::NeighborIndex;
/// use nalgebra::Point3;
///
/// let points = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(0.03, 0.0, 0.0),
///     Point3::new(0.5, 0.0, 0.0),
/// ];
/// let index = NeighborIndex::new(&points, 0.05);
/// assert_eq!(index.radius_neighbors(0, 0.05), vec![0, 1]);
/// ```
#[derive(Debug, Clone)]
pub struct NeighborIndex<'a> {
    positions: &'a [Point3<f64>],
    cell_size: f64,
    inv_cell_size: f64,
    cells: HashMap<CellKey, Vec<usize>>,
}

impl<'a> NeighborIndex<'a> {
    /// Builds the index with cubic cells of edge `cell_size`.
    ///
    /// `cell_size` should be close to the query radius; non-positive or
    /// non-finite sizes fall back to 1.0.
    #[must_use]
    pub fn new(positions: &'a [Point3<f64>], cell_size: f64) -> Self {
        let cell_size = if cell_size.is_finite() && cell_size > 0.0 {
            cell_size
        } else {
            1.0
        };
        let mut index = Self {
            positions,
            cell_size,
            inv_cell_size: 1.0 / cell_size,
            cells: HashMap::new(),
        };
        for (i, p) in positions.iter().enumerate() {
            if let Some(key) = index.cell_of(p) {
                index.cells.entry(key).or_default().push(i);
            }
        }
        index
    }

    /// Edge length of a cell.
    #[must_use]
    pub const fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Number of occupied cells.
    #[must_use]
    pub fn occupied_cells(&self) -> usize {
        self.cells.len()
    }

    /// The indexed positions.
    #[must_use]
    pub const fn positions(&self) -> &'a [Point3<f64>] {
        self.positions
    }

    #[allow(clippy::cast_possible_truncation)]
    fn cell_of(&self, p: &Point3<f64>) -> Option<CellKey> {
        if !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite()) {
            return None;
        }
        Some((
            (p.x * self.inv_cell_size).floor() as i64,
            (p.y * self.inv_cell_size).floor() as i64,
            (p.z * self.inv_cell_size).floor() as i64,
        ))
    }

    /// Indices of all points within `radius` (inclusive) of `center`,
    /// ascending.
    #[must_use]
    pub fn radius_query(&self, center: &Point3<f64>, radius: f64) -> Vec<usize> {
        let mut found = Vec::new();
        let Some((cx, cy, cz)) = self.cell_of(center) else {
            return found;
        };
        if !(radius.is_finite() && radius >= 0.0) {
            return found;
        }

        #[allow(clippy::cast_possible_truncation)]
        let reach = (radius * self.inv_cell_size).ceil() as i64;
        let radius_sq = radius * radius;
        let within = |i: &usize| (self.positions[*i] - center).norm_squared() <= radius_sq;

        // wide queries touch more cells than there are points: scan instead
        let span = usize::try_from(2 * reach.min(MAX_CELL_REACH) + 1).unwrap_or(1);
        if reach > MAX_CELL_REACH || span.pow(3) > self.positions.len() {
            found.extend(self.cells.values().flatten().copied().filter(within));
            found.sort_unstable();
            return found;
        }

        for dx in -reach..=reach {
            for dy in -reach..=reach {
                for dz in -reach..=reach {
                    let Some(bucket) = self.cells.get(&(
                        cx.saturating_add(dx),
                        cy.saturating_add(dy),
                        cz.saturating_add(dz),
                    )) else {
                        continue;
                    };
                    found.extend(bucket.iter().copied().filter(within));
                }
            }
        }

        found.sort_unstable();
        found
    }

    /// Neighbors of the indexed point `index` (itself included).
    ///
    /// Out-of-range indices yield no neighbors.
    #[must_use]
    pub fn radius_neighbors(&self, index: usize, radius: f64) -> Vec<usize> {
        self.positions
            .get(index)
            .map(|p| self.radius_query(p, radius))
            .unwrap_or_default()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn grid(n: usize, spacing: f64) -> Vec<Point3<f64>> {
        let mut points = Vec::new();
        for i in 0..n {
            for j in 0..n {
                #[allow(clippy::cast_precision_loss)]
                points.push(Point3::new(i as f64 * spacing, j as f64 * spacing, 0.0));
            }
        }
        points
    }

    fn brute_force(points: &[Point3<f64>], center: &Point3<f64>, radius: f64) -> Vec<usize> {
        (0..points.len())
            .filter(|&i| (points[i] - center).norm() <= radius)
            .collect()
    }

    #[test]
    fn flat_grid_matches_brute_force() {
        let points = grid(15, 0.02);
        let index = NeighborIndex::new(&points, 0.05);
        for (i, p) in points.iter().enumerate().step_by(7) {
            assert_eq!(index.radius_neighbors(i, 0.05), brute_force(&points, p, 0.05));
        }
    }

    #[test]
    fn radius_larger_than_cell() {
        let points = grid(10, 0.1);
        let index = NeighborIndex::new(&points, 0.05);
        let center = Point3::new(0.45, 0.45, 0.0);
        assert_eq!(index.radius_query(&center, 0.3), brute_force(&points, &center, 0.3));
    }

    #[test]
    fn negative_coordinates() {
        let points = vec![Point3::new(-0.01, -0.01, -0.01), Point3::new(0.01, 0.01, 0.01)];
        let index = NeighborIndex::new(&points, 0.05);
        assert_eq!(index.radius_neighbors(0, 0.05), vec![0, 1]);
    }

    #[test]
    fn non_finite_points_are_skipped() {
        let points = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(f64::NAN, 0.0, 0.0)];
        let index = NeighborIndex::new(&points, 0.05);
        assert_eq!(index.radius_neighbors(0, 1.0), vec![0]);
        assert!(index.radius_neighbors(1, 1.0).is_empty());
        assert!(index.radius_neighbors(9, 1.0).is_empty());
    }

    #[test]
    fn invalid_cell_size_falls_back() {
        let points = grid(3, 1.0);
        let index = NeighborIndex::new(&points, 0.0);
        assert!((index.cell_size() - 1.0).abs() < f64::EPSILON);
        assert_eq!(index.occupied_cells(), 9);
    }
}
