//! Ground and obstacle segmentation for mobile robot point clouds.
//!
//! Splits each incoming cloud into the traversable ground and the obstacles
//! a robot must avoid:
//!
//! 1. The cloud is expressed in the robot frame ([`sensor_fusion::transform_cloud`]).
//! 2. Height bands on Z separate the hypothetical ground from the obstacle
//!    band ([`filter`]).
//! 3. A [`Strategy`] classifies the ground band: by height alone, with one
//!    normal-based pass, or with separate near and far passes
//!    ([`segment_obstacles_from_ground`]).
//! 4. A [`ResultAssembler`] builds the two output clouds.
//!
//! [`GroundSegmenter`] wraps steps 1 to 4 behind the [`FrameProcessor`]
//! trait, and [`ObstacleDetector`] runs it over a queue of clouds, looking
//! transforms up and publishing to [`CloudSink`]s.
//!
//! # Example
//!
//! ```
//! use ground_segment::{GroundSegmenter, SegmentationConfig};
//! use sensor_types::{CloudHeader, PointCloud, Timestamp};
//!
//! let segmenter = GroundSegmenter::new(SegmentationConfig::single_zone()).unwrap();
//!
//! let mut cloud = PointCloud::new(CloudHeader::new(Timestamp::from_nanos(1), "base_link"));
//! for i in 0..10 {
//!     for j in 0..10 {
//!         cloud.push_coords(f64::from(i) * 0.02, f64::from(j) * 0.02, -0.3);
//!     }
//! }
//! cloud.push_coords(0.5, 0.0, 0.8);
//!
//! let result = segmenter.segment(&cloud).unwrap();
//! assert_eq!(result.ground.len(), 100);
//! assert_eq!(result.obstacles.len(), 1);
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

mod assemble;
mod classify;
pub mod cluster;
mod config;
mod detector;
mod error;
pub mod filter;
mod indices;
pub mod normals;
mod processor;
mod sink;
mod spatial;
mod strategy;

pub use assemble::{ResultAssembler, SegmentationResult};
pub use classify::{segment_obstacles_from_ground, ClassifierParams, GroundSplit};
pub use config::SegmentationConfig;
pub use detector::{cloud_channel, DetectorStats, FrameOutcome, ObstacleDetector};
pub use error::{Result, SegmentError};
pub use filter::{Axis, Interval};
pub use indices::IndexSet;
pub use normals::MIN_NORMAL_NEIGHBORS;
pub use processor::{FrameProcessor, GroundSegmenter};
pub use sink::{CloudSink, CollectingSink, FnSink, NullSink};
pub use spatial::NeighborIndex;
pub use strategy::{apply_strategy, DualZoneParams, HeightBands, Strategy};

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{
        cloud_channel, segment_obstacles_from_ground, ClassifierParams, CloudSink, CollectingSink, FrameOutcome,
        FrameProcessor, GroundSegmenter, ObstacleDetector, SegmentationConfig, SegmentationResult, Strategy,
    };
}
