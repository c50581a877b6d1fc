//! Bucket storage.

use snafu::ResultExt as _;
use tracing::debug;

use crate::error::{OutOfMemorySnafu, SketchError};

/// A sketch bucket.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Bin {
    index: i32,
    count: u64,
}

impl Bin {
    const fn new(index: i32, count: u64) -> Self {
        Self { index, count }
    }

    /// Returns the bucket index.
    pub fn index(&self) -> i32 {
        self.index
    }

    /// Returns the number of observations within the bucket.
    pub fn count(&self) -> u64 {
        self.count
    }

    #[inline]
    fn increment(&mut self, n: u64) {
        self.count = self.count.saturating_add(n);
    }
}

/// A bounded, sparse store of bucket counts.
///
/// Buckets are kept as `(index, count)` pairs sorted by index, and only buckets with a non-zero count are stored. The
/// store never holds more than its configured number of buckets: when adding a new bucket would exceed that limit,
/// the lowest-indexed bucket is collapsed into the next one up. For the positive store that degrades accuracy for the
/// values closest to zero, and since negative values are indexed by magnitude, the same holds for the negative store.
/// Either way, the extreme tails stay accurate.
///
/// Once a collapse has happened, the store is flagged as collapsed until it is cleared.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BucketStore {
    /// Non-empty buckets, in ascending index order.
    bins: Vec<Bin>,

    max_num_buckets: usize,

    /// Total count across all buckets.
    count: u64,

    is_collapsed: bool,
}

impl BucketStore {
    /// Creates an empty `BucketStore` holding at most `max_num_buckets` buckets.
    ///
    /// A limit of zero is treated as a limit of one.
    pub fn new(max_num_buckets: usize) -> Self {
        Self {
            bins: Vec::new(),
            max_num_buckets: max_num_buckets.max(1),
            count: 0,
            is_collapsed: false,
        }
    }

    /// Adds `n` to the bucket at `index`.
    ///
    /// # Errors
    ///
    /// If a new bucket has to be allocated and the allocation fails, an error is returned and the store is left
    /// unchanged.
    pub fn incr(&mut self, index: i32, n: u64) -> Result<(), SketchError> {
        self.incr_within(index, n, self.max_num_buckets)
    }

    /// Adds `n` to the bucket at `index`, holding at most `limit` buckets afterwards.
    ///
    /// The limit is clamped to the store's own maximum, and to a minimum of one.
    pub(crate) fn incr_within(&mut self, index: i32, n: u64, limit: usize) -> Result<(), SketchError> {
        if n == 0 {
            return Ok(());
        }

        match self.position(index) {
            Ok(pos) => self.bins[pos].increment(n),
            Err(pos) => {
                // Reserving up front means a failed allocation never leaves a half-applied update behind. Once the
                // store has reached its limit, the vector's capacity already covers the extra slot.
                self.bins.try_reserve(1).context(OutOfMemorySnafu)?;
                self.bins.insert(pos, Bin::new(index, n));

                let limit = limit.clamp(1, self.max_num_buckets);
                while self.bins.len() > limit {
                    self.collapse_lowest();
                }
            }
        }

        self.count = self.count.saturating_add(n);
        Ok(())
    }

    /// Folds the lowest bucket into the next lowest one.
    ///
    /// Does nothing if the store holds fewer than two buckets.
    pub(crate) fn collapse_lowest(&mut self) {
        if self.bins.len() < 2 {
            return;
        }

        let lowest = self.bins.remove(0);
        self.bins[0].increment(lowest.count);

        if !self.is_collapsed {
            debug!(
                max_num_buckets = self.max_num_buckets,
                collapsed_index = lowest.index,
                "Bucket store reached its limit; collapsing lowest buckets."
            );
            self.is_collapsed = true;
        }
    }

    /// Returns the index of the bucket that holds the observation at the given rank.
    ///
    /// The rank is 0-indexed, so rank 0 is the first observation in ascending index order. Returns `None` if the rank
    /// is not less than the total count, which includes every rank of an empty store.
    pub fn key_at_rank(&self, rank: u64) -> Option<i32> {
        if rank >= self.count {
            return None;
        }

        let mut cumulative = 0u64;
        for bin in &self.bins {
            cumulative = cumulative.saturating_add(bin.count);
            if cumulative > rank {
                return Some(bin.index);
            }
        }
        None
    }

    /// Merges another store into this one.
    ///
    /// This store's bucket limit applies to the result.
    ///
    /// # Errors
    ///
    /// If a new bucket has to be allocated and the allocation fails, an error is returned. Some of `other`'s buckets
    /// may have already been merged at that point.
    pub fn merge_from(&mut self, other: &BucketStore) -> Result<(), SketchError> {
        for bin in &other.bins {
            self.incr(bin.index, bin.count)?;
        }

        if other.is_collapsed {
            self.mark_collapsed();
        }

        Ok(())
    }

    /// Flags the store as collapsed, such as when its contents came from a collapsed store.
    pub(crate) fn mark_collapsed(&mut self) {
        self.is_collapsed = true;
    }

    /// Removes all buckets.
    pub fn clear(&mut self) {
        self.bins.clear();
        self.count = 0;
        self.is_collapsed = false;
    }

    /// Returns `true` if the store contains a bucket at `index`.
    pub fn contains(&self, index: i32) -> bool {
        self.position(index).is_ok()
    }

    /// Returns the total count across all buckets.
    pub fn total_count(&self) -> u64 {
        self.count
    }

    /// Returns the number of distinct buckets held.
    pub fn num_buckets(&self) -> usize {
        self.bins.len()
    }

    /// Returns the maximum number of buckets this store will hold.
    pub fn max_num_buckets(&self) -> usize {
        self.max_num_buckets
    }

    /// Returns the lowest bucket index, or `None` if the store is empty.
    pub fn min_index(&self) -> Option<i32> {
        self.bins.first().map(Bin::index)
    }

    /// Returns the highest bucket index, or `None` if the store is empty.
    pub fn max_index(&self) -> Option<i32> {
        self.bins.last().map(Bin::index)
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns `true` if buckets have been collapsed since the store was created or last cleared.
    ///
    /// If true, accuracy guarantees may not hold for the values closest to zero.
    pub fn is_collapsed(&self) -> bool {
        self.is_collapsed
    }

    /// Returns an iterator over the buckets, in ascending index order.
    pub fn bins(&self) -> impl ExactSizeIterator<Item = &Bin> + '_ {
        self.bins.iter()
    }

    #[inline]
    fn position(&self, index: i32) -> Result<usize, usize> {
        self.bins.binary_search_by_key(&index, |bin| bin.index)
    }
}
