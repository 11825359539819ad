//! Stamped 3D point clouds.
//!
//! A [`PointCloud`] is an ordered list of [`CloudPoint`]s plus a
//! [`CloudHeader`] saying when it was captured and which frame its
//! coordinates live in. Processing stages derive new clouds (via
//! [`PointCloud::filtered`], [`PointCloud::select`], [`PointCloud::map_positions`])
//! rather than editing one in place.

use nalgebra::Point3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{FrameId, SensorError, Timestamp};

/// 8-bit RGB color attached to a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PointColor {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl PointColor {
    /// Creates a color from its channels.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// A single point with optional color and intensity.
///
/// # Example
///
/// ```
/// use sensor_types::CloudPoint;
///
/// let p = CloudPoint::from_coords(1.0, 2.0, 3.0).with_intensity(0.7);
/// assert_eq!(p.position.z, 3.0);
/// assert_eq!(p.intensity, Some(0.7));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CloudPoint {
    /// Position in meters, expressed in the cloud's frame.
    pub position: Point3<f64>,

    /// Optional RGB color.
    pub color: Option<PointColor>,

    /// Optional intensity/reflectivity.
    pub intensity: Option<f32>,
}

impl CloudPoint {
    /// Creates a point with just a position.
    #[must_use]
    pub const fn new(position: Point3<f64>) -> Self {
        Self {
            position,
            color: None,
            intensity: None,
        }
    }

    /// Creates a point from x, y, z coordinates.
    #[must_use]
    pub const fn from_coords(x: f64, y: f64, z: f64) -> Self {
        Self::new(Point3::new(x, y, z))
    }

    /// Returns the point with the given color.
    #[must_use]
    pub const fn with_color(mut self, color: PointColor) -> Self {
        self.color = Some(color);
        self
    }

    /// Returns the point with the given intensity.
    #[must_use]
    pub const fn with_intensity(mut self, intensity: f32) -> Self {
        self.intensity = Some(intensity);
        self
    }

    /// Checks that all coordinates are finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.position.iter().all(|v| v.is_finite())
    }
}

impl Default for CloudPoint {
    fn default() -> Self {
        Self::new(Point3::origin())
    }
}

/// Capture time and reference frame of a cloud.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CloudHeader {
    /// Capture timestamp.
    pub stamp: Timestamp,
    /// Frame the point coordinates are expressed in.
    pub frame: FrameId,
}

impl CloudHeader {
    /// Creates a header.
    #[must_use]
    pub fn new(stamp: Timestamp, frame: impl Into<FrameId>) -> Self {
        Self {
            stamp,
            frame: frame.into(),
        }
    }

    /// Returns a copy of this header relabeled to another frame.
    #[must_use]
    pub fn in_frame(&self, frame: FrameId) -> Self {
        Self {
            stamp: self.stamp,
            frame,
        }
    }
}

/// An ordered, stamped collection of points.
///
/// # Example
///
/// ```
/// use sensor_types::{CloudHeader, PointCloud, Timestamp};
///
/// let mut cloud = PointCloud::new(CloudHeader::new(Timestamp::from_nanos(7), "camera"));
/// cloud.push_coords(0.0, 0.0, 0.0);
/// cloud.push_coords(1.0, 0.0, 2.0);
///
/// let high = cloud.filtered(|p| p.position.z > 1.0);
/// assert_eq!(high.len(), 1);
/// assert_eq!(high.header, cloud.header);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PointCloud {
    /// Capture time and frame.
    pub header: CloudHeader,

    /// Points in capture order.
    pub points: Vec<CloudPoint>,
}

impl PointCloud {
    /// Creates an empty cloud with the given header.
    #[must_use]
    pub const fn new(header: CloudHeader) -> Self {
        Self {
            header,
            points: Vec::new(),
        }
    }

    /// Creates an empty cloud with pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(header: CloudHeader, capacity: usize) -> Self {
        Self {
            header,
            points: Vec::with_capacity(capacity),
        }
    }

    /// Creates a cloud from bare positions.
    #[must_use]
    pub fn from_positions(header: CloudHeader, positions: &[Point3<f64>]) -> Self {
        Self {
            header,
            points: positions.iter().copied().map(CloudPoint::new).collect(),
        }
    }

    /// Creates a cloud from points.
    #[must_use]
    pub const fn from_points(header: CloudHeader, points: Vec<CloudPoint>) -> Self {
        Self { header, points }
    }

    /// Returns the number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true if the cloud has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Capture timestamp.
    #[must_use]
    pub const fn stamp(&self) -> Timestamp {
        self.header.stamp
    }

    /// Frame the coordinates are expressed in.
    #[must_use]
    pub const fn frame(&self) -> &FrameId {
        &self.header.frame
    }

    /// Appends a point.
    pub fn push(&mut self, point: CloudPoint) {
        self.points.push(point);
    }

    /// Appends a bare point at the given coordinates.
    pub fn push_coords(&mut self, x: f64, y: f64, z: f64) {
        self.points.push(CloudPoint::from_coords(x, y, z));
    }

    /// Iterates over the point positions.
    pub fn positions(&self) -> impl ExactSizeIterator<Item = &Point3<f64>> + '_ {
        self.points.iter().map(|p| &p.position)
    }

    /// Returns a new cloud (same header) with the points matching `keep`,
    /// in their original order.
    #[must_use]
    pub fn filtered(&self, mut keep: impl FnMut(&CloudPoint) -> bool) -> Self {
        Self {
            header: self.header.clone(),
            points: self.points.iter().filter(|p| keep(p)).copied().collect(),
        }
    }

    /// Returns a new cloud (same header) with the points at `indices`, in the
    /// order given.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::IndexOutOfRange`] if any index is past the end.
    pub fn select(&self, indices: &[usize]) -> Result<Self, SensorError> {
        let points = indices
            .iter()
            .map(|&i| {
                self.points
                    .get(i)
                    .copied()
                    .ok_or(SensorError::IndexOutOfRange {
                        index: i,
                        len: self.points.len(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            header: self.header.clone(),
            points,
        })
    }

    /// Returns a new cloud with every position mapped by `f`, relabeled to
    /// `frame`. Colors, intensities, size and order are preserved.
    #[must_use]
    pub fn map_positions(&self, frame: FrameId, f: impl Fn(&Point3<f64>) -> Point3<f64>) -> Self {
        Self {
            header: self.header.in_frame(frame),
            points: self
                .points
                .iter()
                .map(|p| CloudPoint {
                    position: f(&p.position),
                    ..*p
                })
                .collect(),
        }
    }
}
