//! Hardware-agnostic point cloud types for the ground segmentation stack.
//!
//! This crate holds the raw sensor data that flows into perception:
//!
//! - [`PointCloud`] - Ordered points with a capture [`CloudHeader`]
//! - [`CloudPoint`] - Position with optional [`PointColor`] and intensity
//! - [`FrameId`] - Name of the reference frame coordinates live in
//! - [`Timestamp`] - Nanosecond capture time
//! - [`io`] - Plain-text XYZ point files
//!
//! # Layer 0 Crate
//!
//! No middleware dependencies. The same types are used by hardware drivers,
//! recorded-data tools and tests.
//!
//! # Example
//!
//! ```
//! use sensor_types::{CloudHeader, PointCloud, Timestamp};
//!
//! let mut cloud = PointCloud::new(CloudHeader::new(Timestamp::from_secs_f64(1.0), "camera"));
//! cloud.push_coords(0.0, 0.0, 1.0);
//! assert_eq!(cloud.frame().as_str(), "camera");
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

mod cloud;
mod error;
mod frame;
pub mod io;
mod time;

pub use cloud::{CloudHeader, CloudPoint, PointCloud, PointColor};
pub use error::SensorError;
pub use frame::FrameId;
pub use time::Timestamp;

// Re-export nalgebra point types for convenience
pub use nalgebra::{Point3, Vector3};
