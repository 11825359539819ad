//! Zone strategies: how the height bands are turned into ground and
//! obstacles.
//!
//! All strategies start from two height bands on Z in the robot frame:
//!
//! - hypothetical ground: `[floor_height, max_ground_height)`
//! - obstacles: `[max_ground_height, max_obstacles_height)`
//!
//! Points outside both bands are dropped.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use sensor_types::PointCloud;
use tracing::debug;

use crate::assemble::{ResultAssembler, SegmentationResult};
use crate::classify::{segment_obstacles_from_ground, ClassifierParams};
use crate::error::{Result, SegmentError};
use crate::filter::{pass_through, Axis, Interval};

/// Tuning of the near/far split used by [`Strategy::DualZone`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DualZoneParams {
    /// Forward distance separating the near and far ground zones.
    /// Default: `1.0`
    pub near_split: f64,

    /// Obstacle-band points closer than this on the forward axis are
    /// dropped. Default: `0.8`
    pub obstacle_min_forward: f64,

    /// Radius multiplier for the far zone. Default: `3.0`
    pub far_radius_scale: f64,

    /// Angle multiplier for the far zone. Default: `2.0`
    pub far_angle_scale: f64,
}

impl Default for DualZoneParams {
    fn default() -> Self {
        Self {
            near_split: 1.0,
            obstacle_min_forward: 0.8,
            far_radius_scale: 3.0,
            far_angle_scale: 2.0,
        }
    }
}

impl DualZoneParams {
    /// Sets the near/far split distance.
    #[must_use]
    pub const fn with_near_split(mut self, near_split: f64) -> Self {
        self.near_split = near_split;
        self
    }

    /// Sets the minimum forward distance of kept obstacle points.
    #[must_use]
    pub const fn with_obstacle_min_forward(mut self, distance: f64) -> Self {
        self.obstacle_min_forward = distance;
        self
    }

    /// Checks the values are finite and the scales positive.
    ///
    /// # Errors
    ///
    /// Returns [`SegmentError::InvalidConfig`] on a bad value.
    pub fn validate(&self) -> Result<()> {
        if !self.near_split.is_finite() || !self.obstacle_min_forward.is_finite() {
            return Err(SegmentError::invalid_config("dual-zone distances must be finite"));
        }
        for (name, scale) in [
            ("far_radius_scale", self.far_radius_scale),
            ("far_angle_scale", self.far_angle_scale),
        ] {
            if !(scale.is_finite() && scale > 0.0) {
                return Err(SegmentError::invalid_config(format!(
                    "{name} must be positive and finite, got {scale}"
                )));
            }
        }
        Ok(())
    }
}

/// How the hypothetical ground band is classified.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Strategy {
    /// Height only: the ground band is ground, the obstacle band obstacles.
    Simple,
    /// One classifier pass over the whole ground band.
    SingleZone,
    /// Separate near and far passes, the far one with looser tolerances.
    DualZone(DualZoneParams),
}

impl Strategy {
    /// Short name for logs and the CLI.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::SingleZone => "single-zone",
            Self::DualZone(_) => "dual-zone",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Height limits of the two bands, on Z in the robot frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeightBands {
    /// Lowest kept height.
    pub floor: f64,
    /// Boundary between the ground and obstacle bands.
    pub ground_ceiling: f64,
    /// Exclusive upper limit of the obstacle band.
    pub obstacle_ceiling: f64,
}

impl HeightBands {
    /// Creates the bands.
    #[must_use]
    pub const fn new(floor: f64, ground_ceiling: f64, obstacle_ceiling: f64) -> Self {
        Self {
            floor,
            ground_ceiling,
            obstacle_ceiling,
        }
    }

    /// `[floor, ground_ceiling)`.
    #[must_use]
    pub const fn ground_band(&self) -> Interval {
        Interval::new(self.floor, self.ground_ceiling)
    }

    /// `[ground_ceiling, obstacle_ceiling)`.
    #[must_use]
    pub const fn obstacle_band(&self) -> Interval {
        Interval::new(self.ground_ceiling, self.obstacle_ceiling)
    }
}

/// Runs `strategy` over a cloud already expressed in the robot frame.
///
/// The result carries `cloud`'s header. Ground and obstacles never share a
/// point.
///
/// # Errors
///
/// Only fails on an internal index mismatch, which indicates a bug.
///
/// # Example
///
/// ```
/// use ground_segment::{apply_strategy, ClassifierParams, HeightBands, Strategy};
/// use sensor_types::{CloudHeader, PointCloud, Timestamp};
///
/// let mut cloud = PointCloud::new(CloudHeader::new(Timestamp::zero(), "base_link"));
/// for z in [-2.0, -0.5, 0.5, 2.0] {
///     cloud.push_coords(1.0, 0.0, z);
/// }
///
/// let bands = HeightBands::new(-1.0, 0.0, 1.5);
/// let result = apply_strategy(&cloud, &Strategy::Simple, &bands, &ClassifierParams::default()).unwrap();
/// assert_eq!(result.ground.points[0].position.z, -0.5);
/// assert_eq!(result.obstacles.points[0].position.z, 0.5);
/// ```
pub fn apply_strategy(
    cloud: &PointCloud,
    strategy: &Strategy,
    bands: &HeightBands,
    params: &ClassifierParams,
) -> Result<SegmentationResult> {
    let started = Instant::now();
    let ground_band = pass_through(cloud, Axis::Z, bands.ground_band());
    let obstacle_band = pass_through(cloud, Axis::Z, bands.obstacle_band());
    let mut out = ResultAssembler::new(cloud.header.clone());

    match strategy {
        Strategy::Simple => {
            out.add_ground_cloud(&ground_band);
            out.add_obstacle_cloud(&obstacle_band);
        }
        Strategy::SingleZone => {
            let split = segment_obstacles_from_ground(&ground_band, params);
            out.add_ground(&ground_band, &split.ground)?;
            out.add_obstacle_cloud(&obstacle_band);
            out.add_obstacles(&ground_band, &split.obstacles)?;
        }
        Strategy::DualZone(zones) => {
            let near = pass_through(&ground_band, Axis::X, Interval::below(zones.near_split));
            let far = pass_through(&ground_band, Axis::X, Interval::at_least(zones.near_split));
            let ahead = pass_through(&obstacle_band, Axis::X, Interval::at_least(zones.obstacle_min_forward));

            let near_split = segment_obstacles_from_ground(&near, params);
            let far_params = params.scaled(zones.far_radius_scale, zones.far_angle_scale);
            let far_split = segment_obstacles_from_ground(&far, &far_params);

            out.add_ground(&near, &near_split.ground)?;
            out.add_ground(&far, &far_split.ground)?;
            out.add_obstacle_cloud(&ahead);
            out.add_obstacles(&near, &near_split.obstacles)?;
            out.add_obstacles(&far, &far_split.obstacles)?;
        }
    }

    let result = out.finish();
    debug!(
        "{} segmentation: {} in, {} ground, {} obstacles ({:.1} ms)",
        strategy,
        cloud.len(),
        result.ground.len(),
        result.obstacles.len(),
        started.elapsed().as_secs_f64() * 1e3
    );
    Ok(result)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use sensor_types::{CloudHeader, Timestamp};

    fn header() -> CloudHeader {
        CloudHeader::new(Timestamp::from_nanos(3), "base_link")
    }

    fn flat_patch(cloud: &mut PointCloud, x0: f64, n: usize, spacing: f64, z: f64) {
        for i in 0..n {
            for j in 0..n {
                #[allow(clippy::cast_precision_loss)]
                cloud.push_coords(x0 + i as f64 * spacing, j as f64 * spacing, z);
            }
        }
    }

    fn bands() -> HeightBands {
        HeightBands::new(-1.0, 0.0, 1.5)
    }

    #[test]
    fn strategy_names() {
        assert_eq!(Strategy::Simple.to_string(), "simple");
        assert_eq!(Strategy::SingleZone.name(), "single-zone");
        assert_eq!(Strategy::DualZone(DualZoneParams::default()).name(), "dual-zone");
    }

    #[test]
    fn dual_zone_params_validation() {
        assert!(DualZoneParams::default().validate().is_ok());
        let bad = DualZoneParams {
            far_radius_scale: 0.0,
            ..DualZoneParams::default()
        };
        assert!(bad.validate().is_err());
        assert!(DualZoneParams::default().with_near_split(f64::NAN).validate().is_err());
    }

    #[test]
    fn simple_heights() {
        let mut cloud = PointCloud::new(header());
        for z in [-2.0, -0.5, 0.5, 2.0] {
            cloud.push_coords(1.0, 0.0, z);
        }
        let result = apply_strategy(&cloud, &Strategy::Simple, &bands(), &ClassifierParams::default()).unwrap();
        assert_eq!(result.ground.len(), 1);
        assert_eq!(result.ground.points[0].position.z, -0.5);
        assert_eq!(result.obstacles.len(), 1);
        assert_eq!(result.obstacles.points[0].position.z, 0.5);
        assert_eq!(result.ground.header, header());
    }

    #[test]
    fn single_zone_leftovers_follow_band() {
        let mut cloud = PointCloud::new(header());
        flat_patch(&mut cloud, 0.0, 10, 0.02, -0.3);
        // isolated low point: no normal, becomes an obstacle
        cloud.push_coords(4.0, 4.0, -0.3);
        cloud.push_coords(2.0, 0.0, 0.7);

        let result = apply_strategy(&cloud, &Strategy::SingleZone, &bands(), &ClassifierParams::default()).unwrap();
        assert_eq!(result.ground.len(), 100);
        assert_eq!(result.obstacles.len(), 2);
        // obstacle band first, then classifier leftovers
        assert_eq!(result.obstacles.points[0].position.z, 0.7);
        assert_eq!(result.obstacles.points[1].position.x, 4.0);
    }

    #[test]
    fn dual_zone_near_and_far_ground() {
        let mut cloud = PointCloud::new(header());
        flat_patch(&mut cloud, 0.3, 10, 0.02, -0.4);
        flat_patch(&mut cloud, 5.0, 10, 0.06, -0.4);
        // obstacle-band point too close to the robot is dropped
        cloud.push_coords(0.5, 0.0, 0.5);
        cloud.push_coords(2.0, 0.0, 0.5);

        let zones = DualZoneParams::default();
        let result = apply_strategy(&cloud, &Strategy::DualZone(zones), &bands(), &ClassifierParams::default()).unwrap();
        assert_eq!(result.ground.len(), 200);
        assert_eq!(result.obstacles.len(), 1);
        assert_eq!(result.obstacles.points[0].position.x, 2.0);
    }

    #[test]
    fn empty_cloud_all_strategies() {
        let cloud = PointCloud::new(header());
        for strategy in [Strategy::Simple, Strategy::SingleZone, Strategy::DualZone(DualZoneParams::default())] {
            let result = apply_strategy(&cloud, &strategy, &bands(), &ClassifierParams::default()).unwrap();
            assert!(result.is_empty());
            assert_eq!(result.obstacles.header, header());
        }
    }
}
