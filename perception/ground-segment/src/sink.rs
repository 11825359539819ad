//! Destinations for the ground and obstacle clouds.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use sensor_types::PointCloud;

/// A consumer of segmented clouds.
///
/// The detector asks [`is_subscribed`](Self::is_subscribed) before doing any
/// work for a frame; a frame nobody is subscribed to is skipped entirely.
pub trait CloudSink: Send {
    /// Returns true if someone wants clouds from this sink.
    fn is_subscribed(&self) -> bool;

    /// Delivers one cloud.
    fn publish(&mut self, cloud: PointCloud);
}

impl<S: CloudSink + ?Sized> CloudSink for Box<S> {
    fn is_subscribed(&self) -> bool {
        (**self).is_subscribed()
    }

    fn publish(&mut self, cloud: PointCloud) {
        (**self).publish(cloud);
    }
}

/// A sink nobody listens to.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl CloudSink for NullSink {
    fn is_subscribed(&self) -> bool {
        false
    }

    fn publish(&mut self, _cloud: PointCloud) {}
}

/// Stores every published cloud; clones share the same history.
///
/// # Example
///
/// ```
/// use ground_segment::{CloudSink, CollectingSink};
/// use sensor_types::{CloudHeader, PointCloud, Timestamp};
///
/// let sink = CollectingSink::new();
/// let mut publisher = sink.clone();
/// publisher.publish(PointCloud::new(CloudHeader::new(Timestamp::zero(), "base_link")));
/// assert_eq!(sink.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    clouds: Arc<Mutex<Vec<PointCloud>>>,
}

impl CollectingSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<PointCloud>> {
        self.clouds.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of clouds received.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if nothing was received.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of the most recent cloud.
    #[must_use]
    pub fn last(&self) -> Option<PointCloud> {
        self.lock().last().cloned()
    }

    /// Removes and returns everything received so far.
    #[must_use]
    pub fn take(&self) -> Vec<PointCloud> {
        std::mem::take(&mut *self.lock())
    }
}

impl CloudSink for CollectingSink {
    fn is_subscribed(&self) -> bool {
        true
    }

    fn publish(&mut self, cloud: PointCloud) {
        self.lock().push(cloud);
    }
}

/// Forwards each cloud to a closure.
pub struct FnSink<F> {
    callback: F,
}

impl<F: FnMut(PointCloud) + Send> FnSink<F> {
    /// Wraps `callback`.
    pub const fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> fmt::Debug for FnSink<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnSink").finish_non_exhaustive()
    }
}

impl<F: FnMut(PointCloud) + Send> CloudSink for FnSink<F> {
    fn is_subscribed(&self) -> bool {
        true
    }

    fn publish(&mut self, cloud: PointCloud) {
        (self.callback)(cloud);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use sensor_types::{CloudHeader, Timestamp};

    fn cloud(n: u64) -> PointCloud {
        PointCloud::new(CloudHeader::new(Timestamp::from_nanos(n), "base_link"))
    }

    #[test]
    fn null_sink_is_never_subscribed() {
        let mut sink = NullSink;
        assert!(!sink.is_subscribed());
        sink.publish(cloud(1));
    }

    #[test]
    fn collecting_sink_shares_history() {
        let sink = CollectingSink::new();
        let mut writer = sink.clone();
        assert!(writer.is_subscribed());
        writer.publish(cloud(1));
        writer.publish(cloud(2));

        assert_eq!(sink.len(), 2);
        assert_eq!(sink.last().unwrap().stamp(), Timestamp::from_nanos(2));
        assert_eq!(sink.take().len(), 2);
        assert!(sink.is_empty());
    }

    #[test]
    fn fn_sink_forwards() {
        let mut seen = Vec::new();
        {
            let mut sink = FnSink::new(|c: PointCloud| seen.push(c.stamp()));
            sink.publish(cloud(7));
        }
        assert_eq!(seen, vec![Timestamp::from_nanos(7)]);
    }

    #[test]
    fn boxed_sink() {
        let mut sink: Box<dyn CloudSink> = Box::new(NullSink);
        assert!(!sink.is_subscribed());
        sink.publish(cloud(0));
    }
}
