//! Builds the two output clouds from per-zone parts.

use sensor_types::{CloudHeader, CloudPoint, PointCloud, Timestamp};

use crate::error::Result;
use crate::indices::IndexSet;

/// Ground and obstacle clouds produced for one input frame.
///
/// Both clouds carry the input's capture stamp and the target frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SegmentationResult {
    /// Traversable ground.
    pub ground: PointCloud,
    /// Everything the robot must avoid.
    pub obstacles: PointCloud,
}

impl SegmentationResult {
    /// Two empty clouds with the given header.
    #[must_use]
    pub fn empty(header: CloudHeader) -> Self {
        Self {
            ground: PointCloud::new(header.clone()),
            obstacles: PointCloud::new(header),
        }
    }

    /// Capture stamp of the frame.
    #[must_use]
    pub const fn stamp(&self) -> Timestamp {
        self.ground.header.stamp
    }

    /// Total number of classified points.
    #[must_use]
    pub fn total_len(&self) -> usize {
        self.ground.len() + self.obstacles.len()
    }

    /// Returns true if neither cloud has points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ground.is_empty() && self.obstacles.is_empty()
    }
}

/// Collects ground and obstacle parts, then materializes both clouds.
///
/// Parts are appended in the order they are added. Index-set parts are
/// checked against the zone cloud they are applied to.
///
/// # Example
///
/// ```
/// use ground_segment::{IndexSet, ResultAssembler};
/// use sensor_types::{CloudHeader, PointCloud, Timestamp};
///
/// let header = CloudHeader::new(Timestamp::from_nanos(9), "base_link");
/// let mut zone = PointCloud::new(header.clone());
/// zone.push_coords(0.0, 0.0, 0.0);
/// zone.push_coords(0.0, 0.0, 0.5);
///
/// let mut out = ResultAssembler::new(header);
/// out.add_ground(&zone, &IndexSet::from_indices(2, [0]).unwrap()).unwrap();
/// out.add_obstacles(&zone, &IndexSet::from_indices(2, [1]).unwrap()).unwrap();
///
/// let result = out.finish();
/// assert_eq!(result.ground.len(), 1);
/// assert_eq!(result.obstacles.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct ResultAssembler {
    header: CloudHeader,
    ground: Vec<CloudPoint>,
    obstacles: Vec<CloudPoint>,
}

impl ResultAssembler {
    /// Starts an empty result that will carry `header`.
    #[must_use]
    pub const fn new(header: CloudHeader) -> Self {
        Self {
            header,
            ground: Vec::new(),
            obstacles: Vec::new(),
        }
    }

    /// Appends the points of `zone` at `indices` to the ground.
    ///
    /// # Errors
    ///
    /// Returns [`SegmentError::SourceMismatch`](crate::SegmentError::SourceMismatch)
    /// if `indices` was built for another cloud.
    pub fn add_ground(&mut self, zone: &PointCloud, indices: &IndexSet) -> Result<()> {
        self.ground.extend(indices.select(zone)?.points);
        Ok(())
    }

    /// Appends the points of `zone` at `indices` to the obstacles.
    ///
    /// # Errors
    ///
    /// Returns [`SegmentError::SourceMismatch`](crate::SegmentError::SourceMismatch)
    /// if `indices` was built for another cloud.
    pub fn add_obstacles(&mut self, zone: &PointCloud, indices: &IndexSet) -> Result<()> {
        self.obstacles.extend(indices.select(zone)?.points);
        Ok(())
    }

    /// Appends a whole cloud to the ground.
    pub fn add_ground_cloud(&mut self, zone: &PointCloud) {
        self.ground.extend_from_slice(&zone.points);
    }

    /// Appends a whole cloud to the obstacles.
    pub fn add_obstacle_cloud(&mut self, zone: &PointCloud) {
        self.obstacles.extend_from_slice(&zone.points);
    }

    /// Builds the two clouds.
    #[must_use]
    pub fn finish(self) -> SegmentationResult {
        SegmentationResult {
            ground: PointCloud::from_points(self.header.clone(), self.ground),
            obstacles: PointCloud::from_points(self.header, self.obstacles),
        }
    }
}
