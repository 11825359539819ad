//! Normal-based ground/obstacle classification.
//!
//! A point is a ground candidate when its local surface is close to
//! horizontal. Candidates are then clustered, and clusters too small to be
//! real ground are handed back to the obstacles.

use std::f64::consts::{FRAC_PI_4, PI};
use std::time::Instant;

use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use sensor_types::PointCloud;
use tracing::{debug, trace};

use crate::cluster::euclidean_clusters;
use crate::error::{Result, SegmentError};
use crate::indices::IndexSet;
use crate::normals::{angle_from_vertical, estimate_normals};
use crate::spatial::NeighborIndex;

/// Parameters of one classifier run.
///
/// # Example
///
/// ```
/// use ground_segment::ClassifierParams;
///
/// let params = ClassifierParams::default()
///     .with_radius(0.1)
///     .with_min_cluster_size(50);
/// assert!(params.validate().is_ok());
/// assert!(params.with_radius(-1.0).validate().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierParams {
    /// Neighborhood radius for normal estimation and cluster connectivity.
    /// Default: `0.05`
    pub radius: f64,

    /// Maximum angle (radians) between a normal and the vertical for a
    /// ground candidate. Default: `pi/4`
    pub max_angle: f64,

    /// Smallest candidate cluster accepted as ground. Default: `20`
    pub min_cluster_size: usize,

    /// Estimate normals on the rayon pool. Default: `true`
    pub parallel: bool,
}

impl Default for ClassifierParams {
    fn default() -> Self {
        Self {
            radius: 0.05,
            max_angle: FRAC_PI_4,
            min_cluster_size: 20,
            parallel: true,
        }
    }
}

impl ClassifierParams {
    /// Creates parameters from the three tuning values.
    #[must_use]
    pub fn new(radius: f64, max_angle: f64, min_cluster_size: usize) -> Self {
        Self {
            radius,
            max_angle,
            min_cluster_size,
            ..Self::default()
        }
    }

    /// Sets the neighborhood radius.
    #[must_use]
    pub const fn with_radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    /// Sets the maximum normal angle.
    #[must_use]
    pub const fn with_max_angle(mut self, max_angle: f64) -> Self {
        self.max_angle = max_angle;
        self
    }

    /// Sets the minimum cluster size.
    #[must_use]
    pub const fn with_min_cluster_size(mut self, min_cluster_size: usize) -> Self {
        self.min_cluster_size = min_cluster_size;
        self
    }

    /// Enables or disables parallel normal estimation.
    #[must_use]
    pub const fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Returns these parameters with the radius and angle scaled, the angle
    /// clamped to `pi`. Used for the far zone.
    #[must_use]
    pub fn scaled(self, radius_scale: f64, angle_scale: f64) -> Self {
        Self {
            radius: self.radius * radius_scale,
            max_angle: (self.max_angle * angle_scale).min(PI),
            ..self
        }
    }

    /// Checks that the parameters describe a usable classifier.
    ///
    /// # Errors
    ///
    /// Returns [`SegmentError::InvalidConfig`] for a non-positive or
    /// non-finite radius, an angle outside `(0, pi]`, or a zero cluster size.
    pub fn validate(&self) -> Result<()> {
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(SegmentError::invalid_config(format!(
                "radius must be positive and finite, got {}",
                self.radius
            )));
        }
        if !(self.max_angle > 0.0 && self.max_angle <= PI) {
            return Err(SegmentError::invalid_config(format!(
                "max_angle must be in (0, pi], got {}",
                self.max_angle
            )));
        }
        if self.min_cluster_size == 0 {
            return Err(SegmentError::invalid_config("min_cluster_size must be at least 1"));
        }
        Ok(())
    }
}

/// Outcome of one classifier run over a cloud.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroundSplit {
    /// Points accepted as ground.
    pub ground: IndexSet,
    /// Every other point of the input.
    pub obstacles: IndexSet,
    /// How many points had too few neighbors for a normal.
    pub without_normal: usize,
    /// Candidate clusters rejected as too small.
    pub rejected_clusters: usize,
}

impl GroundSplit {
    /// A split of an empty cloud.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            ground: IndexSet::empty(0),
            obstacles: IndexSet::empty(0),
            without_normal: 0,
            rejected_clusters: 0,
        }
    }
}

/// Splits `cloud` into ground and obstacle index sets.
///
/// 1. Each point's normal is fitted over its `radius` neighborhood; points
///    with fewer than [`MIN_NORMAL_NEIGHBORS`](crate::MIN_NORMAL_NEIGHBORS)
///    neighbors get none and are not ground.
/// 2. Points whose normal line is within `max_angle` of vertical are
///    candidates.
/// 3. Candidates are clustered with `radius` connectivity; clusters smaller
///    than `min_cluster_size` become obstacles.
///
/// The two sets are disjoint and together cover every index of `cloud`.
/// Parameters are assumed valid (see [`ClassifierParams::validate`]).
///
/// # Example
///
/// ```
/// use ground_segment::{segment_obstacles_from_ground, ClassifierParams};
/// use sensor_types::{CloudHeader, PointCloud, Timestamp};
///
/// let mut cloud = PointCloud::new(CloudHeader::new(Timestamp::zero(), "base_link"));
/// for i in 0..10 {
///     for j in 0..10 {
///         cloud.push_coords(f64::from(i) * 0.02, f64::from(j) * 0.02, 0.0);
///     }
/// }
///
/// let split = segment_obstacles_from_ground(&cloud, &ClassifierParams::default());
/// assert_eq!(split.ground.len(), 100);
/// assert!(split.obstacles.is_empty());
/// ```
#[must_use]
pub fn segment_obstacles_from_ground(cloud: &PointCloud, params: &ClassifierParams) -> GroundSplit {
    if cloud.is_empty() {
        return GroundSplit::empty();
    }

    let started = Instant::now();
    let positions: Vec<Point3<f64>> = cloud.positions().copied().collect();
    let index = NeighborIndex::new(&positions, params.radius);
    let normals = estimate_normals(&index, params.radius, params.parallel);

    let without_normal = normals.iter().filter(|n| n.is_none()).count();
    let candidates: Vec<usize> = normals
        .iter()
        .enumerate()
        .filter_map(|(i, n)| n.filter(|n| angle_from_vertical(n) <= params.max_angle).map(|_| i))
        .collect();

    let clusters = euclidean_clusters(&index, &candidates, params.radius);
    let (kept, rejected): (Vec<_>, Vec<_>) = clusters
        .into_iter()
        .partition(|c| c.len() >= params.min_cluster_size);

    let mut ground: Vec<usize> = kept.into_iter().flatten().collect();
    ground.sort_unstable();
    let ground = IndexSet::from_sorted(cloud.len(), ground);
    let obstacles = ground.complement();

    if without_normal > 0 {
        trace!("{} of {} points had too few neighbors for a normal", without_normal, cloud.len());
    }
    debug!(
        points = cloud.len(),
        candidates = candidates.len(),
        ground = ground.len(),
        obstacles = obstacles.len(),
        rejected_clusters = rejected.len(),
        elapsed_ms = started.elapsed().as_secs_f64() * 1e3,
        "classified ground band"
    );

    GroundSplit {
        ground,
        obstacles,
        without_normal,
        rejected_clusters: rejected.len(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use sensor_types::{CloudHeader, Timestamp};

    fn header() -> CloudHeader {
        CloudHeader::new(Timestamp::from_nanos(1), "base_link")
    }

    fn patch(cloud: &mut PointCloud, x0: f64, n: usize, spacing: f64, z: impl Fn(f64) -> f64) {
        for i in 0..n {
            for j in 0..n {
                #[allow(clippy::cast_precision_loss)]
                let (x, y) = (x0 + i as f64 * spacing, j as f64 * spacing);
                cloud.push_coords(x, y, z(x));
            }
        }
    }

    #[test]
    fn params_validation() {
        assert!(ClassifierParams::default().validate().is_ok());
        assert!(ClassifierParams::default().with_radius(0.0).validate().is_err());
        assert!(ClassifierParams::default().with_radius(f64::NAN).validate().is_err());
        assert!(ClassifierParams::default().with_max_angle(0.0).validate().is_err());
        assert!(ClassifierParams::default().with_max_angle(4.0).validate().is_err());
        assert!(ClassifierParams::default().with_max_angle(PI).validate().is_ok());
        assert!(ClassifierParams::default().with_min_cluster_size(0).validate().is_err());
    }

    #[test]
    fn scaled_clamps_angle() {
        let far = ClassifierParams::new(0.05, 2.0, 20).scaled(3.0, 2.0);
        assert!((far.radius - 0.15).abs() < 1e-12);
        assert_eq!(far.max_angle, PI);
        assert_eq!(far.min_cluster_size, 20);
    }

    #[test]
    fn empty_cloud() {
        let split = segment_obstacles_from_ground(&PointCloud::new(header()), &ClassifierParams::default());
        assert!(split.ground.is_empty());
        assert!(split.obstacles.is_empty());
    }

    #[test]
    fn floor_and_wall() {
        let mut cloud = PointCloud::new(header());
        patch(&mut cloud, 0.0, 12, 0.02, |_| 0.0);
        let floor = cloud.len();
        // vertical wall well away from the floor
        for i in 0..12 {
            for j in 0..12 {
                cloud.push_coords(2.0, f64::from(i) * 0.02, 0.1 + f64::from(j) * 0.02);
            }
        }

        let split = segment_obstacles_from_ground(&cloud, &ClassifierParams::default().with_parallel(false));
        assert_eq!(split.ground, IndexSet::from_sorted(cloud.len(), (0..floor).collect()));
        assert_eq!(split.obstacles.len(), cloud.len() - floor);
        assert!(split.ground.is_disjoint(&split.obstacles));
    }

    #[test]
    fn steep_slope_is_obstacle() {
        let mut cloud = PointCloud::new(header());
        // 60 degree ramp exceeds the 45 degree default
        patch(&mut cloud, 0.0, 10, 0.02, |x| x * 3f64.sqrt());
        let split = segment_obstacles_from_ground(&cloud, &ClassifierParams::default().with_radius(0.06));
        assert!(split.ground.is_empty());
        assert_eq!(split.obstacles.len(), 100);
    }

    #[test]
    fn small_cluster_becomes_obstacle() {
        let mut cloud = PointCloud::new(header());
        patch(&mut cloud, 0.0, 10, 0.02, |_| 0.0);
        // five flat points far from the main patch
        for i in 0..5 {
            cloud.push_coords(3.0 + f64::from(i) * 0.01, 0.0, 0.0);
        }
        let extra = IndexSet::from_sorted(cloud.len(), (100..105).collect());

        let split = segment_obstacles_from_ground(&cloud, &ClassifierParams::default());
        assert_eq!(split.ground.len() + split.obstacles.len(), cloud.len());
        assert!(extra.iter().all(|i| split.obstacles.contains(i)));
        assert_eq!(split.ground.len(), 100);
    }

    #[test]
    fn sparse_points_have_no_normal() {
        let mut cloud = PointCloud::new(header());
        for i in 0..4 {
            cloud.push_coords(f64::from(i), 0.0, 0.0);
        }
        let split = segment_obstacles_from_ground(&cloud, &ClassifierParams::default());
        assert_eq!(split.without_normal, 4);
        assert_eq!(split.obstacles, IndexSet::all(4));
    }

    #[test]
    fn idempotent() {
        let mut cloud = PointCloud::new(header());
        patch(&mut cloud, 0.0, 15, 0.02, |x| 0.2 * x);
        patch(&mut cloud, 1.0, 6, 0.02, |x| x);
        let params = ClassifierParams::default();
        assert_eq!(
            segment_obstacles_from_ground(&cloud, &params),
            segment_obstacles_from_ground(&cloud, &params)
        );
        assert_eq!(
            segment_obstacles_from_ground(&cloud, &params),
            segment_obstacles_from_ground(&cloud, &params.with_parallel(false))
        );
    }
}
