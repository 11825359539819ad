//! Sorted index sets over one specific cloud.

use sensor_types::PointCloud;

use crate::error::{Result, SegmentError};

/// Strictly increasing positions into a cloud of a known length.
///
/// The set remembers how many points the cloud it was built for had, so
/// applying it to a different cloud is reported instead of silently picking
/// the wrong points.
///
/// # Example
///
/// ```
/// use ground_segment::IndexSet;
///
/// let set = IndexSet::from_indices(5, [3, 1, 3]).unwrap();
/// assert_eq!(set.as_slice(), &[1, 3]);
/// assert_eq!(set.complement().as_slice(), &[0, 2, 4]);
/// assert!(IndexSet::from_indices(5, [5]).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IndexSet {
    indices: Vec<usize>,
    source_len: usize,
}

impl IndexSet {
    /// An empty set over a cloud of `source_len` points.
    #[must_use]
    pub const fn empty(source_len: usize) -> Self {
        Self {
            indices: Vec::new(),
            source_len,
        }
    }

    /// Every index of a cloud of `source_len` points.
    #[must_use]
    pub fn all(source_len: usize) -> Self {
        Self {
            indices: (0..source_len).collect(),
            source_len,
        }
    }

    /// Builds a set from arbitrary indices; duplicates are merged.
    ///
    /// # Errors
    ///
    /// Returns [`SegmentError::IndexOutOfRange`] if any index is
    /// `>= source_len`.
    pub fn from_indices(source_len: usize, indices: impl IntoIterator<Item = usize>) -> Result<Self> {
        let mut indices: Vec<usize> = indices.into_iter().collect();
        indices.sort_unstable();
        indices.dedup();
        if let Some(&index) = indices.last() {
            if index >= source_len {
                return Err(SegmentError::IndexOutOfRange { index, len: source_len });
            }
        }
        Ok(Self { indices, source_len })
    }

    // Callers guarantee the input is strictly increasing and in range.
    pub(crate) fn from_sorted(source_len: usize, indices: Vec<usize>) -> Self {
        debug_assert!(indices.windows(2).all(|w| w[0] < w[1]));
        debug_assert!(indices.last().map_or(true, |&i| i < source_len));
        Self { indices, source_len }
    }

    /// Number of indices in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Returns true if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Length of the cloud this set addresses.
    #[must_use]
    pub const fn source_len(&self) -> usize {
        self.source_len
    }

    /// The indices, ascending.
    #[must_use]
    pub fn as_slice(&self) -> &[usize] {
        &self.indices
    }

    /// Iterates over the indices in ascending order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = usize> + '_ {
        self.indices.iter().copied()
    }

    /// Returns true if `index` is in the set.
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        self.indices.binary_search(&index).is_ok()
    }

    /// Every index of the source cloud not in this set.
    #[must_use]
    pub fn complement(&self) -> Self {
        let mut members = self.indices.iter().peekable();
        let indices = (0..self.source_len)
            .filter(|i| {
                if members.peek() == Some(&i) {
                    members.next();
                    false
                } else {
                    true
                }
            })
            .collect();
        Self {
            indices,
            source_len: self.source_len,
        }
    }

    /// Union of two sets over the same cloud.
    ///
    /// # Errors
    ///
    /// Returns [`SegmentError::SourceMismatch`] if the sets address clouds of
    /// different lengths.
    pub fn union(&self, other: &Self) -> Result<Self> {
        self.check_source(other.source_len)?;
        let mut indices = Vec::with_capacity(self.len() + other.len());
        let (mut a, mut b) = (self.indices.iter().peekable(), other.indices.iter().peekable());
        loop {
            let next = match (a.peek(), b.peek()) {
                (Some(&&x), Some(&&y)) if x < y => a.next(),
                (Some(&&x), Some(&&y)) if y < x => b.next(),
                (Some(_), Some(_)) => {
                    b.next();
                    a.next()
                }
                (Some(_), None) => a.next(),
                (None, Some(_)) => b.next(),
                (None, None) => break,
            };
            if let Some(&i) = next {
                indices.push(i);
            }
        }
        Ok(Self::from_sorted(self.source_len, indices))
    }

    /// Returns true if no index is in both sets.
    #[must_use]
    pub fn is_disjoint(&self, other: &Self) -> bool {
        let (mut i, mut j) = (0, 0);
        while i < self.indices.len() && j < other.indices.len() {
            match self.indices[i].cmp(&other.indices[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => return false,
            }
        }
        true
    }

    /// Copies the addressed points out of `cloud`, keeping its header.
    ///
    /// # Errors
    ///
    /// Returns [`SegmentError::SourceMismatch`] if `cloud` is not the length
    /// this set was built for.
    pub fn select(&self, cloud: &PointCloud) -> Result<PointCloud> {
        self.check_source(cloud.len())?;
        Ok(cloud.select(&self.indices)?)
    }

    fn check_source(&self, actual: usize) -> Result<()> {
        if actual == self.source_len {
            Ok(())
        } else {
            Err(SegmentError::SourceMismatch {
                expected: self.source_len,
                actual,
            })
        }
    }
}

impl<'a> IntoIterator for &'a IndexSet {
    type Item = &'a usize;
    type IntoIter = std::slice::Iter<'a, usize>;

    fn into_iter(self) -> Self::IntoIter {
        self.indices.iter()
    }
}
