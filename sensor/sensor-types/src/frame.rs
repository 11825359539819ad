//! Named coordinate frames.
//!
//! Every point cloud is tagged with the frame its coordinates are expressed
//! in, so `sensor-fusion` can look up the transform into the robot frame.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Name of a reference frame (e.g. `base_link`, `camera_depth_optical`).
///
/// Leading `/` characters are stripped on construction so that
/// `"/base_link"` and `"base_link"` name the same frame, matching how most
/// transform trees treat the legacy prefix.
///
/// # Example
///
/// ```
/// use sensor_types::FrameId;
///
/// let a = FrameId::new("/base_link");
/// let b = FrameId::new("base_link");
/// assert_eq!(a, b);
/// assert_eq!(a.as_str(), "base_link");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "String", into = "String"))]
pub struct FrameId(String);

impl FrameId {
    /// Creates a frame id from a name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        match name.strip_prefix('/') {
            Some(stripped) => Self(stripped.trim_start_matches('/').to_string()),
            None => Self(name),
        }
    }

    /// Returns the frame name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the name is empty (frame not set).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for FrameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FrameId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for FrameId {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl From<FrameId> for String {
    fn from(frame: FrameId) -> Self {
        frame.0
    }
}

impl AsRef<str> for FrameId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_strips_leading_slashes() {
        assert_eq!(FrameId::new("//odom").as_str(), "odom");
        assert_eq!(FrameId::new("map/child").as_str(), "map/child");
    }

    #[test]
    fn frame_conversions() {
        let frame: FrameId = "laser".into();
        let name: String = frame.clone().into();
        assert_eq!(name, "laser");
        assert_eq!(frame.to_string(), "laser");
        assert!(!frame.is_empty());
        assert!(FrameId::default().is_empty());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn frame_serializes_as_string() {
        let frame = FrameId::new("/base_link");
        let json = serde_json::to_string(&frame).unwrap_or_default();
        assert_eq!(json, "\"base_link\"");

        let parsed: Result<FrameId, _> = serde_json::from_str("\"/odom\"");
        assert_eq!(parsed.ok(), Some(FrameId::new("odom")));
    }
}
