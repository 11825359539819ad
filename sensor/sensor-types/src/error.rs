//! Error types for sensor data handling.

use thiserror::Error;

/// Errors that can occur when working with sensor data.
#[derive(Debug, Error)]
pub enum SensorError {
    /// An index does not address a point of the cloud.
    #[error("index {index} out of range for cloud of {len} points")]
    IndexOutOfRange {
        /// Offending index.
        index: usize,
        /// Number of points in the cloud.
        len: usize,
    },

    /// Coordinate frame mismatch.
    #[error("frame mismatch: expected {expected}, got {actual}")]
    FrameMismatch {
        /// Expected coordinate frame.
        expected: String,
        /// Actual coordinate frame.
        actual: String,
    },

    /// A line of a point file could not be parsed.
    #[error("parse error at line {line}: {reason}")]
    Parse {
        /// 1-based line number.
        line: usize,
        /// What was wrong with it.
        reason: String,
    },

    /// Unsupported point file format.
    #[error("unsupported point cloud format: {0}")]
    UnsupportedFormat(String),

    /// I/O error while reading or writing point files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SensorError {
    /// Creates a frame mismatch error.
    #[must_use]
    pub fn frame_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::FrameMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Creates a parse error.
    #[must_use]
    pub fn parse(line: usize, reason: impl Into<String>) -> Self {
        Self::Parse {
            line,
            reason: reason.into(),
        }
    }
}
