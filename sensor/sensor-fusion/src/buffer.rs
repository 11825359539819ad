//! Time-ordered history of one frame pair's transform.

use std::collections::VecDeque;

use sensor_types::Timestamp;

use crate::transform::RigidTransform;

/// Default number of samples kept per frame pair.
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

/// A bounded, time-ordered history of transform samples.
///
/// Samples may arrive out of order; they are inserted at their sorted
/// position. When full, the oldest sample is evicted.
///
/// # Example
///
/// ```
/// use sensor_fusion::{RigidTransform, TransformHistory};
/// use sensor_types::Timestamp;
/// use nalgebra::Vector3;
///
/// let mut history = TransformHistory::new(16);
/// history.insert(Timestamp::from_nanos(0), RigidTransform::identity());
/// history.insert(
///     Timestamp::from_nanos(100),
///     RigidTransform::from_translation(Vector3::new(1.0, 0.0, 0.0)),
/// );
///
/// let mid = history.sample(Timestamp::from_nanos(50)).unwrap();
/// assert!((mid.translation().x - 0.5).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct TransformHistory {
    capacity: usize,
    samples: VecDeque<(Timestamp, RigidTransform)>,
}

impl Default for TransformHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl TransformHistory {
    /// Creates an empty history holding at most `capacity` samples.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            samples: VecDeque::with_capacity(capacity.min(1024)),
        }
    }

    /// Maximum number of samples.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of stored samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true if no sample is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Removes every sample.
    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Inserts a sample at its time-ordered position.
    ///
    /// A sample with the same stamp as an existing one replaces it.
    pub fn insert(&mut self, stamp: Timestamp, transform: RigidTransform) {
        let pos = self.samples.partition_point(|(t, _)| *t < stamp);
        if let Some(existing) = self.samples.get_mut(pos) {
            if existing.0 == stamp {
                existing.1 = transform;
                return;
            }
        }
        self.samples.insert(pos, (stamp, transform));
        if self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    /// Oldest sample.
    #[must_use]
    pub fn oldest(&self) -> Option<&(Timestamp, RigidTransform)> {
        self.samples.front()
    }

    /// Newest sample.
    #[must_use]
    pub fn latest(&self) -> Option<&(Timestamp, RigidTransform)> {
        self.samples.back()
    }

    /// Stamp range `(oldest, newest)`.
    #[must_use]
    pub fn stamp_range(&self) -> Option<(Timestamp, Timestamp)> {
        Some((self.samples.front()?.0, self.samples.back()?.0))
    }

    /// Finds the samples bracketing `stamp`.
    ///
    /// Returns indices `(before, after)`; both are equal on an exact hit.
    /// Returns `None` when `stamp` lies outside the stored range.
    #[must_use]
    pub fn find_bracket(&self, stamp: Timestamp) -> Option<(usize, usize)> {
        let (min, max) = self.stamp_range()?;
        if stamp < min || stamp > max {
            return None;
        }

        // first sample >= stamp; exists because stamp <= max
        let lo = self.samples.partition_point(|(t, _)| *t < stamp);
        if self.samples[lo].0 == stamp {
            Some((lo, lo))
        } else {
            Some((lo - 1, lo))
        }
    }

    /// Transform at `stamp`, interpolated between the bracketing samples.
    ///
    /// A zero stamp returns the latest sample. Returns `None` when the
    /// history is empty or `stamp` is outside it (no extrapolation).
    #[must_use]
    pub fn sample(&self, stamp: Timestamp) -> Option<RigidTransform> {
        if stamp.is_zero() {
            return self.latest().map(|(_, t)| *t);
        }

        let (before, after) = self.find_bracket(stamp)?;
        let (t0, a) = self.samples[before];
        if before == after {
            return Some(a);
        }
        let (t1, b) = self.samples[after];

        #[allow(clippy::cast_precision_loss)]
        let factor = (stamp.as_nanos() - t0.as_nanos()) as f64 / (t1.as_nanos() - t0.as_nanos()) as f64;
        Some(a.interpolate(&b, factor))
    }

    /// Removes samples older than `stamp`.
    pub fn remove_before(&mut self, stamp: Timestamp) {
        while self.samples.front().is_some_and(|(t, _)| *t < stamp) {
            self.samples.pop_front();
        }
    }

    /// Iterates over the samples in time order.
    pub fn iter(&self) -> impl Iterator<Item = &(Timestamp, RigidTransform)> {
        self.samples.iter()
    }
}
