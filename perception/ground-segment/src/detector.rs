//! The obstacle detection host loop.
//!
//! [`ObstacleDetector`] ties a transform provider, a [`FrameProcessor`] and
//! two [`CloudSink`]s together. Each incoming cloud is handled completely
//! before the next one is taken: look up its transform, segment it and
//! publish the two results. Failures are frame-local; the loop keeps going.

use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::Arc;
use std::time::{Duration, Instant};

use sensor_fusion::{StampedTransform, TransformProvider};
use sensor_types::{CloudHeader, PointCloud};
use tracing::{debug, error, info, trace, warn};

use crate::assemble::SegmentationResult;
use crate::config::SegmentationConfig;
use crate::error::{Result, SegmentError};
use crate::processor::{FrameProcessor, GroundSegmenter};
use crate::sink::{CloudSink, NullSink};

/// What happened to one input frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// No sink was subscribed; nothing was done.
    Skipped,
    /// The frame could not be processed (usually a missing transform).
    Dropped,
    /// Results were handed to the subscribed sinks.
    Published {
        /// Points in the ground cloud.
        ground: usize,
        /// Points in the obstacle cloud.
        obstacles: usize,
    },
}

/// Running counters of a detector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetectorStats {
    /// Frames published.
    pub published: u64,
    /// Frames skipped for lack of subscribers.
    pub skipped: u64,
    /// Frames dropped after an error.
    pub dropped: u64,
}

/// Creates the bounded input queue for [`ObstacleDetector::run`].
#[must_use]
pub fn cloud_channel(queue_size: usize) -> (SyncSender<PointCloud>, Receiver<PointCloud>) {
    mpsc::sync_channel(queue_size.max(1))
}

/// Segments incoming clouds and publishes ground and obstacles.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use ground_segment::{CollectingSink, FrameOutcome, ObstacleDetector, SegmentationConfig};
/// use sensor_fusion::{RigidTransform, StampedTransform, TransformBuffer};
/// use sensor_types::{CloudHeader, PointCloud, Timestamp};
///
/// let transforms = Arc::new(TransformBuffer::new());
/// transforms.set_static_transform(StampedTransform::new(
///     "base_link",
///     "camera",
///     Timestamp::zero(),
///     RigidTransform::identity(),
/// ));
///
/// let ground = CollectingSink::new();
/// let mut detector = ObstacleDetector::new(SegmentationConfig::simple(), transforms)
///     .unwrap()
///     .with_ground_sink(ground.clone());
///
/// let mut cloud = PointCloud::new(CloudHeader::new(Timestamp::from_nanos(1), "camera"));
/// cloud.push_coords(1.0, 0.0, -0.5);
///
/// let outcome = detector.handle_frame(&cloud);
/// assert_eq!(outcome, FrameOutcome::Published { ground: 1, obstacles: 0 });
/// assert_eq!(ground.len(), 1);
/// ```
pub struct ObstacleDetector {
    processor: Box<dyn FrameProcessor>,
    transforms: Arc<dyn TransformProvider>,
    ground_sink: Box<dyn CloudSink>,
    obstacle_sink: Box<dyn CloudSink>,
    wait_for_transform: bool,
    transform_timeout: Duration,
    queue_size: usize,
    last_frame: Option<Instant>,
    stats: DetectorStats,
}

impl std::fmt::Debug for ObstacleDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObstacleDetector")
            .field("target_frame", self.processor.target_frame())
            .field("wait_for_transform", &self.wait_for_transform)
            .field("transform_timeout", &self.transform_timeout)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl ObstacleDetector {
    /// Builds a detector running a [`GroundSegmenter`] for `config`.
    ///
    /// Both sinks start unsubscribed; attach them with
    /// [`with_ground_sink`](Self::with_ground_sink) and
    /// [`with_obstacle_sink`](Self::with_obstacle_sink).
    ///
    /// # Errors
    ///
    /// Returns [`SegmentError::InvalidConfig`] if `config` does not validate.
    pub fn new(config: SegmentationConfig, transforms: Arc<dyn TransformProvider>) -> Result<Self> {
        let wait_for_transform = config.wait_for_transform;
        let transform_timeout = config.transform_timeout();
        let queue_size = config.queue_size;
        let segmenter = GroundSegmenter::new(config)?;
        info!(
            "obstacle detector: frame {}, strategy {}, wait_for_transform {}",
            segmenter.target_frame(),
            segmenter.strategy(),
            wait_for_transform
        );
        Ok(Self {
            processor: Box::new(segmenter),
            transforms,
            ground_sink: Box::new(NullSink),
            obstacle_sink: Box::new(NullSink),
            wait_for_transform,
            transform_timeout,
            queue_size,
            last_frame: None,
            stats: DetectorStats::default(),
        })
    }

    /// Replaces the frame processor.
    #[must_use]
    pub fn with_processor(mut self, processor: impl FrameProcessor + 'static) -> Self {
        self.processor = Box::new(processor);
        self
    }

    /// Sets the sink receiving ground clouds.
    #[must_use]
    pub fn with_ground_sink(mut self, sink: impl CloudSink + 'static) -> Self {
        self.ground_sink = Box::new(sink);
        self
    }

    /// Sets the sink receiving obstacle clouds.
    #[must_use]
    pub fn with_obstacle_sink(mut self, sink: impl CloudSink + 'static) -> Self {
        self.obstacle_sink = Box::new(sink);
        self
    }

    /// Counters so far.
    #[must_use]
    pub const fn stats(&self) -> DetectorStats {
        self.stats
    }

    /// Time since the last published frame, if any.
    #[must_use]
    pub fn since_last_frame(&self) -> Option<Duration> {
        self.last_frame.map(|t| t.elapsed())
    }

    /// Depth for [`cloud_channel`] matching the configuration.
    #[must_use]
    pub const fn queue_size(&self) -> usize {
        self.queue_size
    }

    /// Processes one cloud end to end.
    pub fn handle_frame(&mut self, cloud: &PointCloud) -> FrameOutcome {
        let want_ground = self.ground_sink.is_subscribed();
        let want_obstacles = self.obstacle_sink.is_subscribed();
        if !want_ground && !want_obstacles {
            trace!("no subscribers, skipping frame at {}", cloud.stamp());
            self.stats.skipped += 1;
            return FrameOutcome::Skipped;
        }

        let started = Instant::now();
        let result = match self.lookup_transform(cloud) {
            Ok(_) if cloud.is_empty() => {
                warn!("received empty point cloud at {}", cloud.stamp());
                let header = CloudHeader::new(cloud.stamp(), self.processor.target_frame().clone());
                SegmentationResult::empty(header)
            }
            Ok(transform) => match self.processor.process_frame(cloud, &transform) {
                Ok(result) => result,
                Err(err) => return self.drop_frame(cloud, &err),
            },
            Err(err) => return self.drop_frame(cloud, &err),
        };

        let outcome = FrameOutcome::Published {
            ground: result.ground.len(),
            obstacles: result.obstacles.len(),
        };
        if want_ground {
            self.ground_sink.publish(result.ground);
        }
        if want_obstacles {
            self.obstacle_sink.publish(result.obstacles);
        }

        let now = Instant::now();
        debug!(
            stamp = %cloud.stamp(),
            points = cloud.len(),
            elapsed_ms = now.duration_since(started).as_secs_f64() * 1e3,
            since_last_ms = self.last_frame.map(|t| now.duration_since(t).as_secs_f64() * 1e3),
            "frame published"
        );
        self.last_frame = Some(now);
        self.stats.published += 1;
        outcome
    }

    /// Handles clouds from `receiver` until every sender is gone.
    ///
    /// Returns the counters accumulated over the run.
    pub fn run(&mut self, receiver: &Receiver<PointCloud>) -> DetectorStats {
        info!("obstacle detector running");
        for cloud in receiver {
            self.handle_frame(&cloud);
        }
        info!(
            "input closed: {} published, {} skipped, {} dropped",
            self.stats.published, self.stats.skipped, self.stats.dropped
        );
        self.stats
    }

    fn lookup_transform(&self, cloud: &PointCloud) -> Result<StampedTransform> {
        let target = self.processor.target_frame();
        let transform = if self.wait_for_transform {
            self.transforms
                .wait_for(target, cloud.frame(), cloud.stamp(), self.transform_timeout)?
        } else {
            self.transforms.lookup(target, cloud.frame(), cloud.stamp())?
        };
        Ok(transform)
    }

    fn drop_frame(&mut self, cloud: &PointCloud, err: &SegmentError) -> FrameOutcome {
        if err.is_transform_unavailable() {
            error!(
                "could not get transform from {} to {} at {}: {}",
                cloud.frame(),
                self.processor.target_frame(),
                cloud.stamp(),
                err
            );
        } else {
            error!("dropping frame at {}: {}", cloud.stamp(), err);
        }
        self.stats.dropped += 1;
        FrameOutcome::Dropped
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::sink::{CollectingSink, FnSink};
    use sensor_fusion::{RigidTransform, TransformBuffer};
    use sensor_types::Timestamp;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    fn transforms() -> Arc<TransformBuffer> {
        let buffer = Arc::new(TransformBuffer::new());
        buffer.set_static_transform(StampedTransform::new(
            "base_link",
            "camera",
            Timestamp::zero(),
            RigidTransform::identity(),
        ));
        buffer
    }

    fn heights() -> PointCloud {
        let mut cloud = PointCloud::new(CloudHeader::new(Timestamp::from_nanos(40), "camera"));
        for z in [-2.0, -0.5, 0.5, 2.0] {
            cloud.push_coords(1.0, 0.0, z);
        }
        cloud
    }

    #[test]
    fn skipped_without_subscribers() {
        let mut detector = ObstacleDetector::new(SegmentationConfig::simple(), Arc::new(TransformBuffer::new())).unwrap();
        assert_eq!(detector.handle_frame(&heights()), FrameOutcome::Skipped);
        assert_eq!(detector.stats().skipped, 1);
        assert!(detector.since_last_frame().is_none());
    }

    #[test]
    fn publishes_to_subscribed_sinks_only() {
        let obstacles = CollectingSink::new();
        let mut detector = ObstacleDetector::new(SegmentationConfig::simple(), transforms())
            .unwrap()
            .with_obstacle_sink(obstacles.clone());

        let outcome = detector.handle_frame(&heights());
        assert_eq!(outcome, FrameOutcome::Published { ground: 1, obstacles: 1 });
        let published = obstacles.last().unwrap();
        assert_eq!(published.stamp(), Timestamp::from_nanos(40));
        assert_eq!(published.frame().as_str(), "base_link");
        assert_eq!(published.points[0].position.z, 0.5);
        assert!(detector.since_last_frame().is_some());
    }

    #[test]
    fn missing_transform_drops_frame() {
        let ground = CollectingSink::new();
        let mut detector = ObstacleDetector::new(SegmentationConfig::simple(), Arc::new(TransformBuffer::new()))
            .unwrap()
            .with_ground_sink(ground.clone());

        assert_eq!(detector.handle_frame(&heights()), FrameOutcome::Dropped);
        assert!(ground.is_empty());
        assert_eq!(detector.stats().dropped, 1);
    }

    #[test]
    fn empty_cloud_publishes_empty_results() {
        let ground = CollectingSink::new();
        let obstacles = CollectingSink::new();
        let mut detector = ObstacleDetector::new(SegmentationConfig::default(), transforms())
            .unwrap()
            .with_ground_sink(ground.clone())
            .with_obstacle_sink(obstacles.clone());

        let empty = PointCloud::new(CloudHeader::new(Timestamp::from_nanos(77), "camera"));
        let outcome = detector.handle_frame(&empty);
        assert_eq!(outcome, FrameOutcome::Published { ground: 0, obstacles: 0 });
        for sink in [&ground, &obstacles] {
            let cloud = sink.last().unwrap();
            assert!(cloud.is_empty());
            assert_eq!(cloud.stamp(), Timestamp::from_nanos(77));
            assert_eq!(cloud.frame().as_str(), "base_link");
        }
    }

    struct Rejecting(sensor_types::FrameId);

    impl FrameProcessor for Rejecting {
        fn process_frame(&self, cloud: &PointCloud, _: &StampedTransform) -> Result<SegmentationResult> {
            Err(SegmentError::SourceMismatch {
                expected: 0,
                actual: cloud.len(),
            })
        }

        fn target_frame(&self) -> &sensor_types::FrameId {
            &self.0
        }
    }

    #[test]
    fn processor_failure_drops_frame() {
        let ground = CollectingSink::new();
        let mut detector = ObstacleDetector::new(SegmentationConfig::simple(), transforms())
            .unwrap()
            .with_processor(Rejecting(sensor_types::FrameId::new("base_link")))
            .with_ground_sink(ground.clone());

        assert_eq!(detector.handle_frame(&heights()), FrameOutcome::Dropped);
        assert!(ground.is_empty());
        assert_eq!(detector.stats().dropped, 1);

        // empty clouds never reach the processor
        let empty = PointCloud::new(CloudHeader::new(Timestamp::from_nanos(5), "camera"));
        assert_eq!(detector.handle_frame(&empty), FrameOutcome::Published { ground: 0, obstacles: 0 });
        assert_eq!(ground.last().unwrap().frame().as_str(), "base_link");
    }

    #[test]
    fn run_consumes_channel() {
        let (tx, rx) = cloud_channel(4);
        let producer = thread::spawn(move || {
            for _ in 0..3 {
                tx.send(heights()).unwrap();
            }
        });

        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let mut detector = ObstacleDetector::new(SegmentationConfig::simple(), transforms())
            .unwrap()
            .with_ground_sink(FnSink::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }));
        let stats = detector.run(&rx);

        producer.join().unwrap();
        assert_eq!(stats.published, 3);
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }
}
