//! Error types for sensor-fusion crate.

use std::time::Duration;

use sensor_types::{FrameId, SensorError, Timestamp};
use thiserror::Error;

/// Errors that can occur in transform lookup and application.
#[derive(Debug, Error)]
pub enum FusionError {
    /// No transform between the two frames is known at the requested time.
    #[error("no transform from {source_frame} to {target_frame} at {stamp}: {reason}")]
    TransformUnavailable {
        /// Frame the result should be expressed in.
        target_frame: FrameId,
        /// Frame the data is currently expressed in.
        source_frame: FrameId,
        /// Requested time.
        stamp: Timestamp,
        /// Why the lookup failed.
        reason: String,
    },

    /// Waiting for a transform exceeded the timeout.
    #[error("timed out after {waited:?} waiting for transform from {source_frame} to {target_frame} at {stamp}")]
    Timeout {
        /// Frame the result should be expressed in.
        target_frame: FrameId,
        /// Frame the data is currently expressed in.
        source_frame: FrameId,
        /// Requested time.
        stamp: Timestamp,
        /// How long the caller waited.
        waited: Duration,
    },

    /// Data was expressed in a different frame than the transform expects.
    #[error("frame mismatch: expected {expected}, got {actual}")]
    FrameMismatch {
        /// Frame the transform maps from.
        expected: FrameId,
        /// Frame the data is in.
        actual: FrameId,
    },

    /// A matrix or quaternion does not describe a rigid transform.
    #[error("invalid rigid transform: {0}")]
    InvalidTransform(String),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Error from the sensor data layer.
    #[error(transparent)]
    Sensor(#[from] SensorError),
}

impl FusionError {
    /// Creates a transform-unavailable error.
    #[must_use]
    pub fn unavailable(
        target_frame: &FrameId,
        source_frame: &FrameId,
        stamp: Timestamp,
        reason: impl Into<String>,
    ) -> Self {
        Self::TransformUnavailable {
            target_frame: target_frame.clone(),
            source_frame: source_frame.clone(),
            stamp,
            reason: reason.into(),
        }
    }

    /// Creates an invalid transform error.
    #[must_use]
    pub fn invalid_transform(reason: impl Into<String>) -> Self {
        Self::InvalidTransform(reason.into())
    }

    /// Creates an invalid configuration error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig(reason.into())
    }

    /// Returns true for the errors a frame-dropping caller should treat as
    /// "transform not available (yet)".
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::TransformUnavailable { .. } | Self::Timeout { .. }
        )
    }
}

/// Result type for sensor fusion operations.
pub type Result<T> = std::result::Result<T, FusionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_unavailable() {
        let err = FusionError::unavailable(
            &FrameId::new("base_link"),
            &FrameId::new("camera"),
            Timestamp::from_nanos(1_000_000_000),
            "no data",
        );
        let text = err.to_string();
        assert!(text.contains("from camera to base_link"));
        assert!(text.contains("1.000000000"));
        assert!(err.is_unavailable());
    }

    #[test]
    fn error_timeout() {
        let err = FusionError::Timeout {
            target_frame: FrameId::new("base_link"),
            source_frame: FrameId::new("lidar"),
            stamp: Timestamp::zero(),
            waited: Duration::from_secs(1),
        };
        assert!(err.to_string().contains("timed out"));
        assert!(err.is_unavailable());
    }

    #[test]
    fn error_frame_mismatch() {
        let err = FusionError::FrameMismatch {
            expected: FrameId::new("camera"),
            actual: FrameId::new("lidar"),
        };
        assert_eq!(err.to_string(), "frame mismatch: expected camera, got lidar");
        assert!(!err.is_unavailable());
    }

    #[test]
    fn error_invalid_transform() {
        let err = FusionError::invalid_transform("determinant is -1");
        assert!(err.to_string().contains("invalid rigid transform"));
    }

    #[test]
    fn error_invalid_config() {
        let err = FusionError::invalid_config("capacity must be positive");
        assert!(err.to_string().contains("invalid configuration"));
    }
}
