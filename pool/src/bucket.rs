//! Map requested lengths onto power-of-two size classes.
//!
//! Bucket `i` holds buffers of exactly `MIN_BUCKET_LENGTH << i` elements:
//! - Bucket 0: 1..=16
//! - Bucket 1: 17..=32
//! - Bucket 2: 33..=64
//! - ...
//! - Bucket 26: up to 1 GiB
//!
//! Zero-length and oversized requests have no bucket and are served outside the pool.

/// Number of size classes.
pub const NUM_BUCKETS: usize = 27;

/// Canonical length of the smallest bucket.
pub const MIN_BUCKET_LENGTH: usize = 16;

/// Canonical length of the largest bucket.
pub const MAX_BUCKET_LENGTH: usize = MIN_BUCKET_LENGTH << (NUM_BUCKETS - 1);

/// A size class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Bucket(usize);

impl Bucket {
    /// Returns the smallest bucket whose canonical length is at least `size`.
    ///
    /// Returns `None` for `size == 0` and for `size > MAX_BUCKET_LENGTH`.
    #[inline]
    pub const fn for_size(size: usize) -> Option<Self> {
        if size == 0 || size > MAX_BUCKET_LENGTH {
            return None;
        }

        // Fold 1..=16 onto 15 so they land in bucket 0 (ilog2(15) == 3).
        let index = ((size - 1) | (MIN_BUCKET_LENGTH - 1)).ilog2() - 3;
        Some(Self(index as usize))
    }

    /// Returns the bucket whose canonical length is exactly `len`, if any.
    #[inline]
    pub fn for_length(len: usize) -> Option<Self> {
        Self::for_size(len).filter(|bucket| bucket.max_length() == len)
    }

    /// Returns the bucket at `index`, if it exists.
    pub const fn from_index(index: usize) -> Option<Self> {
        if index < NUM_BUCKETS {
            Some(Self(index))
        } else {
            None
        }
    }

    /// Iterates over every bucket, smallest first.
    pub fn all() -> impl Iterator<Item = Self> {
        (0..NUM_BUCKETS).map(Self)
    }

    /// Position of the bucket in `0..NUM_BUCKETS`.
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }

    /// Length of every buffer pooled in this bucket.
    #[inline]
    pub const fn max_length(self) -> usize {
        MIN_BUCKET_LENGTH << self.0
    }
}
