//! Error types for ground segmentation.

use sensor_fusion::FusionError;
use sensor_types::SensorError;
use thiserror::Error;

/// Errors that can occur while configuring or running segmentation.
#[derive(Debug, Error)]
pub enum SegmentError {
    /// A configuration value is out of range or inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A configuration document could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// An index does not address a point of the cloud it was used with.
    #[error("index {index} out of range for cloud of {len} points")]
    IndexOutOfRange {
        /// Offending index.
        index: usize,
        /// Number of points in the cloud.
        len: usize,
    },

    /// An index set was applied to a cloud other than the one it was built for.
    #[error("index set built for a cloud of {expected} points, applied to one of {actual}")]
    SourceMismatch {
        /// Length of the cloud the set was built for.
        expected: usize,
        /// Length of the cloud it was applied to.
        actual: usize,
    },

    /// Transform lookup or application failed.
    #[error(transparent)]
    Fusion(#[from] FusionError),

    /// Sensor data error.
    #[error(transparent)]
    Sensor(#[from] SensorError),
}

impl SegmentError {
    /// Creates an invalid configuration error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig(reason.into())
    }

    /// Returns true if the frame failed because its transform was not
    /// available in time.
    #[must_use]
    pub fn is_transform_unavailable(&self) -> bool {
        matches!(self, Self::Fusion(err) if err.is_unavailable())
    }
}

/// Result type for segmentation operations.
pub type Result<T> = std::result::Result<T, SegmentError>;
