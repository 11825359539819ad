//! Euclidean connected-component clustering.

use std::collections::VecDeque;

use crate::spatial::NeighborIndex;

/// Groups `members` into clusters of points chained by distances `<= tolerance`.
///
/// Only points listed in `members` take part; other indexed points are never
/// used as bridges. Clusters are seeded in ascending index order and each
/// cluster's indices are sorted, so the output is deterministic.
///
/// # Example
///
/// ```
/// use ground_segment::{cluster::euclidean_clusters, NeighborIndex};
/// use nalgebra::Point3;
///
/// let points = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(0.04, 0.0, 0.0),
///     Point3::new(0.08, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
/// ];
/// let index = NeighborIndex::new(&points, 0.05);
/// let clusters = euclidean_clusters(&index, &[0, 1, 2, 3], 0.05);
/// assert_eq!(clusters, vec![vec![0, 1, 2], vec![3]]);
/// ```
#[must_use]
pub fn euclidean_clusters(index: &NeighborIndex<'_>, members: &[usize], tolerance: f64) -> Vec<Vec<usize>> {
    let len = index.positions().len();
    let mut is_member = vec![false; len];
    for &i in members {
        if let Some(slot) = is_member.get_mut(i) {
            *slot = true;
        }
    }

    let mut seeds: Vec<usize> = members.iter().copied().filter(|&i| i < len).collect();
    seeds.sort_unstable();
    seeds.dedup();

    let mut visited = vec![false; len];
    let mut clusters = Vec::new();
    let mut queue = VecDeque::new();

    for seed in seeds {
        if visited[seed] {
            continue;
        }
        visited[seed] = true;
        queue.push_back(seed);
        let mut cluster = Vec::new();

        while let Some(current) = queue.pop_front() {
            cluster.push(current);
            for neighbor in index.radius_neighbors(current, tolerance) {
                if is_member[neighbor] && !visited[neighbor] {
                    visited[neighbor] = true;
                    queue.push_back(neighbor);
                }
            }
        }

        cluster.sort_unstable();
        clusters.push(cluster);
    }

    clusters
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn line(start: f64, count: usize, spacing: f64) -> Vec<Point3<f64>> {
        (0..count)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let x = start + i as f64 * spacing;
                Point3::new(x, 0.0, 0.0)
            })
            .collect()
    }

    #[test]
    fn separates_distant_groups() {
        let mut points = line(0.0, 10, 0.02);
        points.extend(line(2.0, 5, 0.02));
        let index = NeighborIndex::new(&points, 0.05);
        let members: Vec<usize> = (0..points.len()).collect();

        let clusters = euclidean_clusters(&index, &members, 0.05);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].len(), 10);
        assert_eq!(clusters[1], (10..15).collect::<Vec<_>>());
    }

    #[test]
    fn non_members_do_not_bridge() {
        let points = line(0.0, 3, 0.04);
        let index = NeighborIndex::new(&points, 0.05);
        // middle point excluded: ends are 0.08 apart
        let clusters = euclidean_clusters(&index, &[0, 2], 0.05);
        assert_eq!(clusters, vec![vec![0], vec![2]]);
    }

    #[test]
    fn empty_and_out_of_range_members() {
        let points = line(0.0, 3, 0.01);
        let index = NeighborIndex::new(&points, 0.05);
        assert!(euclidean_clusters(&index, &[], 0.05).is_empty());
        assert_eq!(euclidean_clusters(&index, &[7, 1, 1], 0.05), vec![vec![1]]);
    }

    #[test]
    fn every_member_in_exactly_one_cluster() {
        let mut points = line(0.0, 20, 0.03);
        points.extend(line(0.0, 20, 0.03).into_iter().map(|p| Point3::new(p.x, 1.0, 0.0)));
        let index = NeighborIndex::new(&points, 0.05);
        let members: Vec<usize> = (0..points.len()).step_by(2).collect();

        let clusters = euclidean_clusters(&index, &members, 0.07);
        let mut flat: Vec<usize> = clusters.into_iter().flatten().collect();
        flat.sort_unstable();
        assert_eq!(flat, members);
    }
}
