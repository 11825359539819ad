//! Transform lookup between named frames.
//!
//! [`TransformProvider`] is the seam the segmentation host consumes;
//! [`TransformBuffer`] is the in-process implementation. It stores static
//! transforms (valid at every time) and a [`TransformHistory`] per dynamic
//! frame pair, and wakes blocked [`TransformProvider::wait_for`] callers on
//! every insert.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use hashbrown::HashMap;
use sensor_types::{FrameId, Timestamp};
use tracing::{debug, trace};

use crate::buffer::{TransformHistory, DEFAULT_HISTORY_CAPACITY};
use crate::error::{FusionError, Result};
use crate::transform::{RigidTransform, StampedTransform};

/// Source of frame-to-frame transforms.
pub trait TransformProvider: Send + Sync {
    /// Looks up the transform mapping `source` coordinates into `target` at
    /// `stamp`, failing immediately when it is not known.
    ///
    /// A zero `stamp` asks for the latest available transform.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::TransformUnavailable`] when no transform is
    /// known for the pair at that time.
    fn lookup(&self, target: &FrameId, source: &FrameId, stamp: Timestamp) -> Result<StampedTransform>;

    /// Like [`lookup`](Self::lookup), but blocks up to `timeout` for the
    /// transform to become available.
    ///
    /// The default implementation polls once and does not wait.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::Timeout`] if the transform did not appear in
    /// time.
    fn wait_for(
        &self,
        target: &FrameId,
        source: &FrameId,
        stamp: Timestamp,
        timeout: Duration,
    ) -> Result<StampedTransform> {
        self.lookup(target, source, stamp).map_err(|err| {
            if err.is_unavailable() {
                FusionError::Timeout {
                    target_frame: target.clone(),
                    source_frame: source.clone(),
                    stamp,
                    waited: timeout,
                }
            } else {
                err
            }
        })
    }
}

/// A provider that always returns one fixed transform for one frame pair.
///
/// Useful for rigidly mounted sensors and offline tools.
#[derive(Debug, Clone)]
pub struct StaticTransformProvider {
    transform: StampedTransform,
}

impl StaticTransformProvider {
    /// Creates a provider for `transform` (and its inverse).
    #[must_use]
    pub const fn new(transform: StampedTransform) -> Self {
        Self { transform }
    }
}

impl TransformProvider for StaticTransformProvider {
    fn lookup(&self, target: &FrameId, source: &FrameId, stamp: Timestamp) -> Result<StampedTransform> {
        if target == source {
            return Ok(StampedTransform::new(target.clone(), source.clone(), stamp, RigidTransform::identity()));
        }
        let tf = &self.transform;
        if &tf.target == target && &tf.source == source {
            Ok(StampedTransform { stamp, ..tf.clone() })
        } else if &tf.target == source && &tf.source == target {
            Ok(StampedTransform { stamp, ..tf.inverse() })
        } else {
            Err(FusionError::unavailable(target, source, stamp, "frame pair not known"))
        }
    }
}

#[derive(Debug, Default)]
struct BufferState {
    statics: HashMap<(FrameId, FrameId), RigidTransform>,
    dynamics: HashMap<(FrameId, FrameId), TransformHistory>,
}

impl BufferState {
    fn find(&self, target: &FrameId, source: &FrameId, stamp: Timestamp) -> Result<RigidTransform> {
        if target == source {
            return Ok(RigidTransform::identity());
        }

        let direct = (target.clone(), source.clone());
        let reverse = (source.clone(), target.clone());

        if let Some(tf) = self.statics.get(&direct) {
            return Ok(*tf);
        }
        if let Some(tf) = self.statics.get(&reverse) {
            return Ok(tf.inverse());
        }

        let mut reason = "frame pair not known";
        if let Some(history) = self.dynamics.get(&direct) {
            if let Some(tf) = history.sample(stamp) {
                return Ok(tf);
            }
            reason = "requested time outside transform history";
        }
        if let Some(history) = self.dynamics.get(&reverse) {
            if let Some(tf) = history.sample(stamp) {
                return Ok(tf.inverse());
            }
            reason = "requested time outside transform history";
        }

        Err(FusionError::unavailable(target, source, stamp, reason))
    }
}

/// Thread-safe, time-indexed transform store.
///
/// Share it between a producer that calls [`set_transform`](Self::set_transform)
/// and consumers that look transforms up by wrapping it in an `Arc`.
///
/// Lookup order for `(target, source)`: identity when both frames are equal,
/// then the static pair, the inverted static pair, the dynamic history and
/// the inverted dynamic history. Dynamic lookups interpolate between the two
/// bracketing samples and never extrapolate.
///
/// # Example
///
/// ```
/// use sensor_fusion::{RigidTransform, StampedTransform, TransformBuffer, TransformProvider};
/// use sensor_types::{FrameId, Timestamp};
/// use nalgebra::Vector3;
///
/// let buffer = TransformBuffer::new();
/// buffer.set_static_transform(StampedTransform::new(
///     "base_link",
///     "camera",
///     Timestamp::zero(),
///     RigidTransform::from_translation(Vector3::new(0.2, 0.0, 0.4)),
/// ));
///
/// let tf = buffer
///     .lookup(&FrameId::new("base_link"), &FrameId::new("camera"), Timestamp::from_nanos(5))
///     .unwrap();
/// assert!((tf.transform.translation().z - 0.4).abs() < 1e-12);
/// ```
#[derive(Debug)]
pub struct TransformBuffer {
    state: Mutex<BufferState>,
    updated: Condvar,
    history_capacity: usize,
}

impl Default for TransformBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformBuffer {
    /// Creates an empty buffer with the default history capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_history_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    /// Creates an empty buffer keeping at most `capacity` samples per
    /// dynamic frame pair.
    #[must_use]
    pub fn with_history_capacity(capacity: usize) -> Self {
        Self {
            state: Mutex::new(BufferState::default()),
            updated: Condvar::new(),
            history_capacity: capacity.max(1),
        }
    }

    // A panicking writer cannot leave the maps half-updated, so a poisoned
    // lock is still usable.
    fn lock(&self) -> MutexGuard<'_, BufferState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records a transform valid at every time.
    pub fn set_static_transform(&self, transform: StampedTransform) {
        debug!(target_frame = %transform.target, source_frame = %transform.source, "static transform set");
        let mut state = self.lock();
        state
            .statics
            .insert((transform.target, transform.source), transform.transform);
        drop(state);
        self.updated.notify_all();
    }

    /// Records a time-stamped transform sample.
    pub fn set_transform(&self, transform: StampedTransform) {
        trace!(
            target_frame = %transform.target,
            source_frame = %transform.source,
            stamp = %transform.stamp,
            "transform sample"
        );
        let capacity = self.history_capacity;
        let mut state = self.lock();
        state
            .dynamics
            .entry((transform.target, transform.source))
            .or_insert_with(|| TransformHistory::new(capacity))
            .insert(transform.stamp, transform.transform);
        drop(state);
        self.updated.notify_all();
    }

    /// Returns true if [`lookup`](TransformProvider::lookup) would succeed.
    #[must_use]
    pub fn can_transform(&self, target: &FrameId, source: &FrameId, stamp: Timestamp) -> bool {
        self.lock().find(target, source, stamp).is_ok()
    }

    /// Drops dynamic samples older than `stamp` for every frame pair.
    pub fn prune_before(&self, stamp: Timestamp) {
        let mut state = self.lock();
        for history in state.dynamics.values_mut() {
            history.remove_before(stamp);
        }
    }

    /// Removes every stored transform.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.statics.clear();
        state.dynamics.clear();
    }
}

impl TransformProvider for TransformBuffer {
    fn lookup(&self, target: &FrameId, source: &FrameId, stamp: Timestamp) -> Result<StampedTransform> {
        let transform = self.lock().find(target, source, stamp)?;
        Ok(StampedTransform::new(target.clone(), source.clone(), stamp, transform))
    }

    fn wait_for(
        &self,
        target: &FrameId,
        source: &FrameId,
        stamp: Timestamp,
        timeout: Duration,
    ) -> Result<StampedTransform> {
        let started = Instant::now();
        // timeouts too long to represent wait without a deadline
        let deadline = started.checked_add(timeout);
        let mut state = self.lock();

        loop {
            match state.find(target, source, stamp) {
                Ok(transform) => {
                    return Ok(StampedTransform::new(target.clone(), source.clone(), stamp, transform));
                }
                Err(err) if !err.is_unavailable() => return Err(err),
                Err(_) => {}
            }

            let Some(deadline) = deadline else {
                state = self
                    .updated
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
                continue;
            };

            let now = Instant::now();
            if now >= deadline {
                return Err(FusionError::Timeout {
                    target_frame: target.clone(),
                    source_frame: source.clone(),
                    stamp,
                    waited: now - started,
                });
            }

            state = self
                .updated
                .wait_timeout(state, deadline - now)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|poisoned| poisoned.into_inner().0);
        }
    }
}
