//! Per-frame processing capability.

use sensor_fusion::{transform_cloud, FusionError, StampedTransform};
use sensor_types::{FrameId, PointCloud};

use crate::assemble::SegmentationResult;
use crate::classify::ClassifierParams;
use crate::config::SegmentationConfig;
use crate::error::Result;
use crate::strategy::{apply_strategy, HeightBands, Strategy};

/// Something that turns one sensor cloud plus its pose into ground and
/// obstacle clouds.
///
/// Hosts hold a `Box<dyn FrameProcessor>` and never depend on the concrete
/// segmenter.
pub trait FrameProcessor: Send {
    /// Processes one frame. `transform` maps the cloud's frame into the
    /// robot frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the transform does not fit the cloud.
    fn process_frame(&self, cloud: &PointCloud, transform: &StampedTransform) -> Result<SegmentationResult>;

    /// Frame the results are expressed in.
    fn target_frame(&self) -> &FrameId;
}

/// The normal-based ground segmenter.
///
/// Built once from a validated [`SegmentationConfig`]; holds no per-frame
/// state, so one instance can serve frames from several threads.
///
/// # Example
///
/// ```
/// use ground_segment::{FrameProcessor, GroundSegmenter, SegmentationConfig};
/// use sensor_fusion::{RigidTransform, StampedTransform};
/// use sensor_types::{CloudHeader, PointCloud, Timestamp};
/// use nalgebra::Vector3;
///
/// let segmenter = GroundSegmenter::new(SegmentationConfig::simple()).unwrap();
///
/// let mut cloud = PointCloud::new(CloudHeader::new(Timestamp::from_nanos(5), "camera"));
/// cloud.push_coords(1.0, 0.0, -0.5);
/// cloud.push_coords(1.0, 0.0, 0.5);
///
/// // camera mounted 0.2 below the robot origin
/// let tf = StampedTransform::new(
///     "base_link",
///     "camera",
///     Timestamp::from_nanos(5),
///     RigidTransform::from_translation(Vector3::new(0.0, 0.0, -0.2)),
/// );
/// let result = segmenter.process_frame(&cloud, &tf).unwrap();
/// assert_eq!(result.ground.len(), 1);
/// assert_eq!(result.obstacles.len(), 1);
/// assert_eq!(result.ground.frame().as_str(), "base_link");
/// ```
#[derive(Debug, Clone)]
pub struct GroundSegmenter {
    config: SegmentationConfig,
    frame: FrameId,
    strategy: Strategy,
    params: ClassifierParams,
    bands: HeightBands,
}

impl GroundSegmenter {
    /// Validates `config` and builds the segmenter.
    ///
    /// # Errors
    ///
    /// Returns [`SegmentError::InvalidConfig`](crate::SegmentError::InvalidConfig)
    /// if the configuration does not validate.
    pub fn new(config: SegmentationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            frame: FrameId::new(config.frame_id.as_str()),
            strategy: config.strategy(),
            params: config.classifier_params(),
            bands: config.height_bands(),
            config,
        })
    }

    /// The configuration this segmenter was built from.
    #[must_use]
    pub const fn config(&self) -> &SegmentationConfig {
        &self.config
    }

    /// The strategy in use.
    #[must_use]
    pub const fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Segments a cloud already expressed in the robot frame.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::FrameMismatch`] (wrapped) if `cloud` is not in
    /// the target frame.
    pub fn segment(&self, cloud: &PointCloud) -> Result<SegmentationResult> {
        if cloud.frame() != &self.frame {
            return Err(FusionError::FrameMismatch {
                expected: self.frame.clone(),
                actual: cloud.frame().clone(),
            }
            .into());
        }
        apply_strategy(cloud, &self.strategy, &self.bands, &self.params)
    }
}

impl FrameProcessor for GroundSegmenter {
    fn process_frame(&self, cloud: &PointCloud, transform: &StampedTransform) -> Result<SegmentationResult> {
        if transform.target != self.frame {
            return Err(FusionError::FrameMismatch {
                expected: self.frame.clone(),
                actual: transform.target.clone(),
            }
            .into());
        }
        let robot = transform_cloud(cloud, transform)?;
        self.segment(&robot)
    }

    fn target_frame(&self) -> &FrameId {
        &self.frame
    }
}
