//! Coordinate transforms for the ground segmentation stack.
//!
//! Point clouds arrive in the sensor's frame; segmentation reasons in a
//! robot-fixed frame. This crate provides:
//!
//! # Rigid Transforms
//!
//! - [`RigidTransform`] - Rotation + translation (validated when built from a matrix)
//! - [`StampedTransform`] - Transform tagged with target/source frames and a time
//! - [`transform_cloud`] - Expresses a cloud in another frame
//!
//! # Transform Lookup
//!
//! - [`TransformProvider`] - Lookup seam consumed by the segmentation host
//! - [`TransformBuffer`] - Thread-safe store of static and time-indexed transforms
//! - [`StaticTransformProvider`] - One fixed frame pair
//! - [`TransformHistory`] - Bounded, interpolating history of one frame pair
//!
//! # Layer 0 Crate
//!
//! No middleware dependencies. Transforms can come from a live transform
//! tree, a calibration file, or a test.
//!
//! # Example
//!
//! ```
//! use sensor_fusion::{transform_cloud, RigidTransform, StampedTransform, TransformBuffer, TransformProvider};
//! use sensor_types::{CloudHeader, FrameId, PointCloud, Timestamp};
//! use nalgebra::Vector3;
//!
//! let buffer = TransformBuffer::new();
//! buffer.set_static_transform(StampedTransform::new(
//!     "base_link",
//!     "camera",
//!     Timestamp::zero(),
//!     RigidTransform::from_translation(Vector3::new(0.0, 0.0, 0.3)),
//! ));
//!
//! let mut cloud = PointCloud::new(CloudHeader::new(Timestamp::from_nanos(10), "camera"));
//! cloud.push_coords(1.0, 0.0, 0.0);
//!
//! let tf = buffer.lookup(&FrameId::new("base_link"), cloud.frame(), cloud.stamp()).unwrap();
//! let robot = transform_cloud(&cloud, &tf).unwrap();
//! assert!((robot.points[0].position.z - 0.3).abs() < 1e-12);
//! ```
//!
//! # Quality Standards
//!
//! - Zero clippy/doc warnings
//! - Zero `unwrap`/`expect` in library code

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod buffer;
mod error;
mod provider;
mod transform;

pub use buffer::{TransformHistory, DEFAULT_HISTORY_CAPACITY};
pub use error::{FusionError, Result};
pub use provider::{StaticTransformProvider, TransformBuffer, TransformProvider};
pub use transform::{transform_cloud, RigidTransform, StampedTransform};

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{
        transform_cloud, FusionError, RigidTransform, StampedTransform, StaticTransformProvider,
        TransformBuffer, TransformProvider,
    };
}
