//! Pass-through filtering on one coordinate axis.
//!
//! Used to cut a cloud into height bands before normal estimation, and to
//! split the ground band into near and far zones on the forward axis.
//!
//! Intervals are half-open, `[lo, hi)`, on every axis. Non-finite
//! coordinates are never inside an interval.

use std::fmt;

use nalgebra::Point3;
use sensor_types::PointCloud;

use crate::indices::IndexSet;

/// A coordinate axis of the robot frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Forward.
    X,
    /// Left.
    Y,
    /// Up.
    Z,
}

impl Axis {
    /// The coordinate of `point` on this axis.
    #[must_use]
    pub fn coordinate(self, point: &Point3<f64>) -> f64 {
        match self {
            Self::X => point.x,
            Self::Y => point.y,
            Self::Z => point.z,
        }
    }
}

/// A half-open interval `[lo, hi)`; either end may be unbounded.
///
/// # Example
///
/// ```
/// use ground_segment::Interval;
///
/// let band = Interval::new(-1.0, 1.5);
/// assert!(band.contains(-1.0));
/// assert!(!band.contains(1.5));
/// assert!(Interval::at_least(0.8).contains(100.0));
/// assert!(!Interval::unbounded().contains(f64::NAN));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    /// Inclusive lower bound (`-inf` when unbounded).
    pub lo: f64,
    /// Exclusive upper bound (`+inf` when unbounded).
    pub hi: f64,
}

impl Interval {
    /// `[lo, hi)`.
    #[must_use]
    pub const fn new(lo: f64, hi: f64) -> Self {
        Self { lo, hi }
    }

    /// `(-inf, hi)`.
    #[must_use]
    pub const fn below(hi: f64) -> Self {
        Self::new(f64::NEG_INFINITY, hi)
    }

    /// `[lo, +inf)`.
    #[must_use]
    pub const fn at_least(lo: f64) -> Self {
        Self::new(lo, f64::INFINITY)
    }

    /// Every finite value.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self::new(f64::NEG_INFINITY, f64::INFINITY)
    }

    /// Returns true if `value` is finite and in `[lo, hi)`.
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        value.is_finite() && value >= self.lo && value < self.hi
    }

    /// Returns true if no value can be contained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lo.is_nan() || self.hi.is_nan() || self.lo >= self.hi
    }
}

impl Default for Interval {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.lo, self.hi)
    }
}

/// Keeps the points whose `axis` coordinate lies in `interval`.
///
/// Relative order and the header are preserved; the input is untouched.
///
/// # Example
///
/// ```
/// use ground_segment::{filter, Axis, Interval};
/// use sensor_types::{CloudHeader, PointCloud, Timestamp};
///
/// let mut cloud = PointCloud::new(CloudHeader::new(Timestamp::zero(), "base_link"));
/// for z in [-2.0, -0.5, 0.5, 2.0] {
///     cloud.push_coords(1.0, 0.0, z);
/// }
///
/// let band = filter::pass_through(&cloud, Axis::Z, Interval::new(-1.0, 1.5));
/// assert_eq!(band.len(), 2);
/// ```
#[must_use]
pub fn pass_through(cloud: &PointCloud, axis: Axis, interval: Interval) -> PointCloud {
    cloud.filtered(|p| interval.contains(axis.coordinate(&p.position)))
}

/// Positions of the points [`pass_through`] would keep.
#[must_use]
pub fn pass_through_indices(cloud: &PointCloud, axis: Axis, interval: Interval) -> IndexSet {
    let indices = cloud
        .positions()
        .enumerate()
        .filter(|(_, p)| interval.contains(axis.coordinate(p)))
        .map(|(i, _)| i)
        .collect();
    IndexSet::from_sorted(cloud.len(), indices)
}
