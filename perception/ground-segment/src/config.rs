//! Segmentation configuration.
//!
//! Every option has a default, so a JSON document only needs the fields it
//! changes:
//!
//! ```
//! use ground_segment::SegmentationConfig;
//!
//! let config = SegmentationConfig::from_json_str(r#"{ "frame_id": "odom", "min_cluster_size": 50 }"#).unwrap();
//! assert_eq!(config.frame_id, "odom");
//! assert_eq!(config.min_cluster_size, 50);
//! assert!((config.max_obstacles_height - 1.5).abs() < f64::EPSILON);
//! ```

use std::f64::consts::FRAC_PI_4;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::classify::ClassifierParams;
use crate::error::{Result, SegmentError};
use crate::strategy::{DualZoneParams, HeightBands, Strategy};

/// All options of the ground segmentation node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Robot-fixed frame segmentation runs in. Default: `"base_link"`
    pub frame_id: String,

    /// Neighborhood radius for normals and clustering. Default: `0.05`
    pub normal_estimation_radius: f64,

    /// Maximum normal angle from vertical for ground (radians).
    /// Default: `pi/4`
    pub ground_normal_angle: f64,

    /// Smallest ground cluster kept as ground. Default: `20`
    pub min_cluster_size: usize,

    /// Points below this height are dropped. Default: `-1.0`
    pub floor_height: f64,

    /// Boundary between the ground and obstacle bands. Default: `0.0`
    pub max_ground_height: f64,

    /// Points at or above this height are dropped. Default: `1.5`
    pub max_obstacles_height: f64,

    /// Block for the cloud's transform instead of failing at once.
    /// Default: `false`
    pub wait_for_transform: bool,

    /// How long to block when waiting. Default: `1.0`
    pub transform_timeout_secs: f64,

    /// Height-only segmentation. Overrides `optimize_for_close_object`.
    /// Default: `false`
    pub simple_segmentation: bool,

    /// Use separate near and far classifier passes. Default: `true`
    pub optimize_for_close_object: bool,

    /// Depth of the input cloud queue. Default: `10`
    pub queue_size: usize,

    /// Near/far split tuning.
    pub dual_zone: DualZoneParams,

    /// Estimate normals on the rayon pool. Default: `true`
    pub parallel: bool,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            frame_id: "base_link".to_string(),
            normal_estimation_radius: 0.05,
            ground_normal_angle: FRAC_PI_4,
            min_cluster_size: 20,
            floor_height: -1.0,
            max_ground_height: 0.0,
            max_obstacles_height: 1.5,
            wait_for_transform: false,
            transform_timeout_secs: 1.0,
            simple_segmentation: false,
            optimize_for_close_object: true,
            queue_size: 10,
            dual_zone: DualZoneParams::default(),
            parallel: true,
        }
    }
}

impl SegmentationConfig {
    /// Height-only segmentation.
    #[must_use]
    pub fn simple() -> Self {
        Self {
            simple_segmentation: true,
            ..Self::default()
        }
    }

    /// One classifier pass over the whole ground band.
    #[must_use]
    pub fn single_zone() -> Self {
        Self {
            optimize_for_close_object: false,
            ..Self::default()
        }
    }

    /// Parses and validates a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`SegmentError::ConfigParse`] for malformed JSON and
    /// [`SegmentError::InvalidConfig`] for out-of-range values.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read, otherwise as
    /// [`from_json_str`](Self::from_json_str).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(sensor_types::SensorError::from)?;
        Self::from_json_str(&text)
    }

    /// Sets the target frame.
    #[must_use]
    pub fn with_frame_id(mut self, frame_id: impl Into<String>) -> Self {
        self.frame_id = frame_id.into();
        self
    }

    /// Sets the three height limits.
    #[must_use]
    pub const fn with_heights(mut self, floor: f64, max_ground: f64, max_obstacles: f64) -> Self {
        self.floor_height = floor;
        self.max_ground_height = max_ground;
        self.max_obstacles_height = max_obstacles;
        self
    }

    /// Enables waiting for transforms with the given timeout.
    #[must_use]
    pub const fn with_wait_for_transform(mut self, timeout_secs: f64) -> Self {
        self.wait_for_transform = true;
        self.transform_timeout_secs = timeout_secs;
        self
    }

    /// Sets the minimum cluster size.
    #[must_use]
    pub const fn with_min_cluster_size(mut self, size: usize) -> Self {
        self.min_cluster_size = size;
        self
    }

    /// Selects a strategy, updating the two flags that encode it.
    #[must_use]
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        match strategy {
            Strategy::Simple => self.simple_segmentation = true,
            Strategy::SingleZone => {
                self.simple_segmentation = false;
                self.optimize_for_close_object = false;
            }
            Strategy::DualZone(zones) => {
                self.simple_segmentation = false;
                self.optimize_for_close_object = true;
                self.dual_zone = zones;
            }
        }
        self
    }

    /// The strategy the flags select. The simple flag wins.
    #[must_use]
    pub const fn strategy(&self) -> Strategy {
        if self.simple_segmentation {
            Strategy::Simple
        } else if self.optimize_for_close_object {
            Strategy::DualZone(self.dual_zone)
        } else {
            Strategy::SingleZone
        }
    }

    /// Classifier parameters for the near (or only) zone.
    #[must_use]
    pub const fn classifier_params(&self) -> ClassifierParams {
        ClassifierParams {
            radius: self.normal_estimation_radius,
            max_angle: self.ground_normal_angle,
            min_cluster_size: self.min_cluster_size,
            parallel: self.parallel,
        }
    }

    /// The height bands.
    #[must_use]
    pub const fn height_bands(&self) -> HeightBands {
        HeightBands::new(self.floor_height, self.max_ground_height, self.max_obstacles_height)
    }

    /// Transform wait timeout. Values too large for a [`Duration`] saturate.
    #[must_use]
    pub fn transform_timeout(&self) -> Duration {
        if self.transform_timeout_secs > 0.0 {
            Duration::try_from_secs_f64(self.transform_timeout_secs).unwrap_or(Duration::MAX)
        } else {
            Duration::ZERO
        }
    }

    /// Checks every option.
    ///
    /// # Errors
    ///
    /// Returns [`SegmentError::InvalidConfig`] describing the first bad
    /// option.
    pub fn validate(&self) -> Result<()> {
        if self.frame_id.trim_start_matches('/').is_empty() {
            return Err(SegmentError::invalid_config("frame_id must not be empty"));
        }
        let heights = [self.floor_height, self.max_ground_height, self.max_obstacles_height];
        if heights.iter().any(|h| !h.is_finite()) {
            return Err(SegmentError::invalid_config("height limits must be finite"));
        }
        if !(self.floor_height <= self.max_ground_height && self.max_ground_height <= self.max_obstacles_height) {
            return Err(SegmentError::invalid_config(format!(
                "height limits must satisfy floor <= max_ground <= max_obstacles, got {} / {} / {}",
                self.floor_height, self.max_ground_height, self.max_obstacles_height
            )));
        }
        if !(self.transform_timeout_secs.is_finite() && self.transform_timeout_secs > 0.0) {
            return Err(SegmentError::invalid_config(format!(
                "transform_timeout_secs must be positive, got {}",
                self.transform_timeout_secs
            )));
        }
        if self.queue_size == 0 {
            return Err(SegmentError::invalid_config("queue_size must be at least 1"));
        }
        self.dual_zone.validate()?;
        self.classifier_params().validate()
    }
}
