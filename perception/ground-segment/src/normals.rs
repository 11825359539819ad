//! Surface normal estimation by local plane fitting.
//!
//! The normal at a point is the eigenvector of the smallest eigenvalue of
//! the covariance of its radius neighborhood (PCA plane fit). The sign of
//! the result is arbitrary; consumers that care about "up" compare against
//! `|n . z|`.

use nalgebra::{Matrix3, Point3, SymmetricEigen, Vector3};
use rayon::prelude::*;

use crate::spatial::NeighborIndex;

/// Minimum neighborhood size (the point itself included) for a plane fit.
pub const MIN_NORMAL_NEIGHBORS: usize = 3;

/// Second-largest over largest covariance eigenvalue below which a
/// neighborhood counts as a line.
const MIN_PLANAR_SPREAD: f64 = 1e-6;

/// Fits a plane to the points at `neighbors` and returns its unit normal.
///
/// Returns `None` for fewer than [`MIN_NORMAL_NEIGHBORS`] points or a
/// degenerate fit, including neighborhoods that lie on a single line.
///
/// # Example
///
/// ```
/// use ground_segment::normals::fit_normal;
/// use nalgebra::Point3;
///
/// let points = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(0.0, 1.0, 0.0),
///     Point3::new(1.0, 1.0, 0.0),
/// ];
/// let n = fit_normal(&points, &[0, 1, 2, 3]).unwrap();
/// assert!((n.z.abs() - 1.0).abs() < 1e-9);
/// ```
#[must_use]
pub fn fit_normal(positions: &[Point3<f64>], neighbors: &[usize]) -> Option<Vector3<f64>> {
    if neighbors.len() < MIN_NORMAL_NEIGHBORS {
        return None;
    }

    let sum: Vector3<f64> = neighbors.iter().map(|&i| positions[i].coords).sum();
    #[allow(clippy::cast_precision_loss)]
    let centroid = sum / neighbors.len() as f64;

    let mut cov = Matrix3::zeros();
    for &i in neighbors {
        let diff = positions[i].coords - centroid;
        cov += diff * diff.transpose();
    }

    // eigenvalue order is not reliable for nearly diagonal covariances, so
    // rank the eigenvectors by their Rayleigh quotient
    let eigen = SymmetricEigen::new(cov);
    let mut axes: [(f64, Vector3<f64>); 3] = std::array::from_fn(|i| {
        let v: Vector3<f64> = eigen.eigenvectors.column(i).into_owned();
        let len_sq = v.norm_squared();
        if len_sq > 1e-20 && len_sq.is_finite() {
            (v.dot(&(cov * v)) / len_sq, v)
        } else {
            (f64::INFINITY, v)
        }
    });
    axes.sort_by(|a, b| a.0.total_cmp(&b.0));

    // collinear (or coincident) neighborhoods do not define a plane
    let (spread, largest) = (axes[1].0, axes[2].0);
    if !(largest.is_finite() && largest > 0.0) || spread <= MIN_PLANAR_SPREAD * largest {
        return None;
    }

    let normal = axes[0].1;
    let norm = normal.norm();
    if norm > 1e-10 && norm.is_finite() {
        Some(normal / norm)
    } else {
        None
    }
}

/// Estimates a normal for every indexed point from its `radius`
/// neighborhood.
///
/// Entry `i` is `None` when point `i` has too few neighbors (or is not
/// finite). With `parallel` set the work is spread over the rayon pool; the
/// output is identical either way.
#[must_use]
pub fn estimate_normals(index: &NeighborIndex<'_>, radius: f64, parallel: bool) -> Vec<Option<Vector3<f64>>> {
    let positions = index.positions();
    let normal_at = |i: usize| fit_normal(positions, &index.radius_neighbors(i, radius));

    if parallel {
        (0..positions.len()).into_par_iter().map(normal_at).collect()
    } else {
        (0..positions.len()).map(normal_at).collect()
    }
}

/// Angle in `[0, pi/2]` between the line of `normal` and the up axis.
#[must_use]
pub fn angle_from_vertical(normal: &Vector3<f64>) -> f64 {
    let cos = normal.dot(&Vector3::z()).abs() / normal.norm();
    cos.clamp(0.0, 1.0).acos()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

    fn plane(n: usize, spacing: f64, slope: f64) -> Vec<Point3<f64>> {
        let mut points = Vec::new();
        for i in 0..n {
            for j in 0..n {
                #[allow(clippy::cast_precision_loss)]
                let (x, y) = (i as f64 * spacing, j as f64 * spacing);
                points.push(Point3::new(x, y, x * slope));
            }
        }
        points
    }

    #[test]
    fn flat_plane_normal_is_vertical() {
        let points = plane(10, 0.02, 0.0);
        let index = NeighborIndex::new(&points, 0.05);
        for normal in estimate_normals(&index, 0.05, false) {
            let normal = normal.unwrap();
            assert_relative_eq!(normal.norm(), 1.0, epsilon = 1e-9);
            assert!(angle_from_vertical(&normal) < 1e-6);
        }
    }

    #[test]
    fn offset_flat_grid_is_vertical() {
        let points: Vec<_> = plane(10, 0.02, 0.0)
            .into_iter()
            .map(|p| Point3::new(p.x + 0.3, p.y, -0.4))
            .collect();
        let index = NeighborIndex::new(&points, 0.05);
        for (i, normal) in estimate_normals(&index, 0.05, false).into_iter().enumerate() {
            let normal = normal.unwrap();
            assert!(angle_from_vertical(&normal) < 1e-6, "point {i} got normal {normal:?}");
        }
    }

    #[test]
    fn collinear_points_have_no_normal() {
        // one scan ring lying on flat ground
        let points: Vec<_> = (0..6).map(|i| Point3::new(0.5 + f64::from(i) * 0.01, 0.2, -0.4)).collect();
        assert!(fit_normal(&points, &[0, 1, 2, 3, 4, 5]).is_none());

        let index = NeighborIndex::new(&points, 0.05);
        assert!(estimate_normals(&index, 0.05, false).iter().all(Option::is_none));
    }

    #[test]
    fn coincident_points_have_no_normal() {
        let points = vec![Point3::new(1.0, 1.0, 1.0); 4];
        assert!(fit_normal(&points, &[0, 1, 2, 3]).is_none());
    }

    #[test]
    fn sloped_plane_angle() {
        // z = x rises at 45 degrees
        let points = plane(10, 0.02, 1.0);
        let index = NeighborIndex::new(&points, 0.05);
        let normals = estimate_normals(&index, 0.05, false);
        let angle = angle_from_vertical(&normals[45].unwrap());
        assert_relative_eq!(angle, FRAC_PI_4, epsilon = 1e-6);
    }

    #[test]
    fn wall_is_horizontal_normal() {
        let points: Vec<_> = plane(8, 0.02, 0.0)
            .into_iter()
            .map(|p| Point3::new(1.0, p.x, p.y))
            .collect();
        let index = NeighborIndex::new(&points, 0.05);
        let normal = estimate_normals(&index, 0.05, false)[20].unwrap();
        assert_relative_eq!(angle_from_vertical(&normal), FRAC_PI_2, epsilon = 1e-6);
    }

    #[test]
    fn isolated_points_have_no_normal() {
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.01, 0.0, 0.0),
            Point3::new(5.0, 0.0, 0.0),
        ];
        let index = NeighborIndex::new(&points, 0.05);
        assert!(estimate_normals(&index, 0.05, false).iter().all(Option::is_none));
        assert!(fit_normal(&points, &[0, 1]).is_none());
    }

    #[test]
    fn parallel_matches_sequential() {
        let points = plane(20, 0.02, 0.3);
        let index = NeighborIndex::new(&points, 0.05);
        assert_eq!(estimate_normals(&index, 0.05, true), estimate_normals(&index, 0.05, false));
    }

    #[test]
    fn sign_does_not_matter() {
        assert_relative_eq!(angle_from_vertical(&Vector3::new(0.0, 0.0, -1.0)), 0.0);
        assert_relative_eq!(angle_from_vertical(&Vector3::new(0.0, 0.0, 2.0)), 0.0);
    }
}
