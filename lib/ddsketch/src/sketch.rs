//! DDSketch implementation.

use tracing::{trace, warn};

use crate::config::SketchConfig;
use crate::error::SketchError;
use crate::mapping::BucketMapping;
use crate::store::BucketStore;

/// A fast and fully-mergeable quantile sketch with relative-error guarantees.
///
/// Values are split three ways: positive values go to the positive store, negative values go to the negative store
/// (indexed by magnitude), and anything whose magnitude is below the configured minimum indexable value is counted as
/// zero. Alongside the buckets, the sketch tracks the exact count, sum, minimum, and maximum of everything added.
///
/// The configured bucket limit applies to both stores combined. When it is reached, the buckets closest to zero are
/// collapsed, which degrades accuracy near zero but keeps the tails (e.g. p99 latencies) accurate.
///
/// # Example
///
/// ```
/// use ddsketch::DDSketch;
///
/// let mut sketch = DDSketch::with_relative_accuracy(0.01).unwrap();
/// sketch.add(1.0).unwrap();
/// sketch.add(2.0).unwrap();
/// sketch.add(3.0).unwrap();
///
/// let median = sketch.quantile(0.5).unwrap();
/// assert!((median - 2.0).abs() <= 0.02);
/// ```
#[derive(Clone, Debug)]
pub struct DDSketch {
    config: SketchConfig,
    mapping: BucketMapping,

    /// Store for positive values.
    positive_store: BucketStore,

    /// Store for negative values, keyed by the index of their magnitude.
    negative_store: BucketStore,

    /// Count of values that map to zero.
    zero_count: u64,

    count: u64,
    sum: f64,
    min: f64,
    max: f64,
}

impl DDSketch {
    /// Creates an empty `DDSketch` with the given configuration.
    pub fn new(config: SketchConfig) -> Self {
        // `SketchConfig` has already validated the relative accuracy, so this can't fail.
        let mapping = match BucketMapping::new(config.relative_accuracy()) {
            Ok(mapping) => mapping,
            Err(e) => unreachable!("validated configuration rejected by mapping: {}", e),
        };

        Self {
            config,
            mapping,
            positive_store: BucketStore::new(config.max_num_buckets()),
            negative_store: BucketStore::new(config.max_num_buckets()),
            zero_count: 0,
            count: 0,
            sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    /// Creates an empty `DDSketch` with the given relative accuracy.
    ///
    /// The bucket limit and minimum indexable value take their defaults.
    ///
    /// # Errors
    ///
    /// If the relative accuracy is not between 0.0 and 1.0 (exclusive), an error is returned.
    pub fn with_relative_accuracy(relative_accuracy: f64) -> Result<Self, SketchError> {
        SketchConfig::with_relative_accuracy(relative_accuracy).map(Self::new)
    }

    /// Adds a single value to the sketch.
    ///
    /// # Errors
    ///
    /// If the value is NaN, infinite, or too large in magnitude to be indexed, an error is returned and the sketch is
    /// left unchanged. If a bucket store fails to grow, an error is returned and the sketch should no longer be used.
    pub fn add(&mut self, value: f64) -> Result<(), SketchError> {
        self.add_n(value, 1)
    }

    /// Adds a value to the sketch with the given count.
    ///
    /// This is useful for weighted values or pre-aggregated data. Adding a value with a count of zero does nothing.
    /// Counts saturate at `u64::MAX`.
    ///
    /// # Errors
    ///
    /// If the value is NaN, infinite, or too large in magnitude to be indexed, an error is returned and the sketch is
    /// left unchanged. If a bucket store fails to grow, an error is returned and the sketch should no longer be used.
    pub fn add_n(&mut self, value: f64, n: u64) -> Result<(), SketchError> {
        if !value.is_finite() {
            return Err(SketchError::NonFiniteValue { value });
        }

        let max_indexable_value = self.mapping.max_indexable_value();
        if value.abs() > max_indexable_value {
            return Err(SketchError::ValueOutOfRange {
                value,
                max_indexable_value,
            });
        }

        if n == 0 {
            return Ok(());
        }

        // Buckets first, so that a failed allocation doesn't leave the scalars counting a value the stores never saw.
        let min_indexable_value = self.config.min_indexable_value();
        if value.abs() < min_indexable_value {
            self.zero_count = self.zero_count.saturating_add(n);
        } else if value > 0.0 {
            let index = self.mapping.index(value);
            add_bounded(
                &mut self.positive_store,
                &mut self.negative_store,
                index,
                n,
                self.config.max_num_buckets(),
            )?;
        } else {
            let index = self.mapping.index(-value);
            add_bounded(
                &mut self.negative_store,
                &mut self.positive_store,
                index,
                n,
                self.config.max_num_buckets(),
            )?;
        }

        self.count = self.count.saturating_add(n);
        self.sum += value * n as f64;
        self.min = self.min.min(value);
        self.max = self.max.max(value);

        Ok(())
    }

    /// Returns the approximate value at the given quantile.
    ///
    /// The quantile must be in the range of [0, 1]. The result is always within the range of observed values.
    ///
    /// # Errors
    ///
    /// If the sketch is empty, or the quantile is NaN or out of bounds, an error is returned.
    pub fn quantile(&self, q: f64) -> Result<f64, SketchError> {
        if self.is_empty() {
            return Err(SketchError::EmptySketch);
        }

        if !(0.0..=1.0).contains(&q) {
            return Err(SketchError::InvalidQuantile { quantile: q });
        }

        // Near `u64::MAX` the float round trip can land past the last rank.
        let mut rank = ((q * (self.count - 1) as f64).floor() as u64).min(self.count - 1);

        let negative_count = self.negative_store.total_count();
        let estimate = if rank < negative_count {
            // Negative values are indexed by magnitude, so the lowest rank lives in the highest bucket.
            let reverse_rank = negative_count - 1 - rank;
            match self.negative_store.key_at_rank(reverse_rank) {
                Some(index) => -self.mapping.value(index),
                None => unreachable!("rank out of bounds on non-empty negative store"),
            }
        } else {
            rank -= negative_count;
            if rank < self.zero_count {
                0.0
            } else {
                rank -= self.zero_count;
                match self.positive_store.key_at_rank(rank) {
                    Some(index) => self.mapping.value(index),
                    None => unreachable!("rank out of bounds on non-empty sketch"),
                }
            }
        };

        Ok(estimate.max(self.min).min(self.max))
    }

    /// Merges another sketch into this one.
    ///
    /// # Errors
    ///
    /// If the two sketches do not share the same relative accuracy and minimum indexable value, an error is returned
    /// and neither sketch is changed. If a bucket store fails to grow, an error is returned and this sketch should no
    /// longer be used.
    pub fn merge(&mut self, other: &DDSketch) -> Result<(), SketchError> {
        if !self.config.is_compatible_with(&other.config) {
            warn!(ours = ?self.config, theirs = ?other.config, "Refusing to merge incompatible sketches.");
            return Err(SketchError::IncompatibleSketch {
                ours: self.config,
                theirs: other.config,
            });
        }

        if other.is_empty() {
            return Ok(());
        }

        let max_num_buckets = self.config.max_num_buckets();
        for bin in other.positive_store.bins() {
            add_bounded(
                &mut self.positive_store,
                &mut self.negative_store,
                bin.index(),
                bin.count(),
                max_num_buckets,
            )?;
        }
        for bin in other.negative_store.bins() {
            add_bounded(
                &mut self.negative_store,
                &mut self.positive_store,
                bin.index(),
                bin.count(),
                max_num_buckets,
            )?;
        }

        if other.positive_store.is_collapsed() {
            self.positive_store.mark_collapsed();
        }
        if other.negative_store.is_collapsed() {
            self.negative_store.mark_collapsed();
        }

        self.zero_count = self.zero_count.saturating_add(other.zero_count);
        self.count = self.count.saturating_add(other.count);
        self.sum += other.sum;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);

        trace!(count = self.count, merged = other.count, "Merged sketch.");

        Ok(())
    }

    /// Returns the exact minimum of all values added.
    ///
    /// # Errors
    ///
    /// If the sketch is empty, an error is returned.
    pub fn min(&self) -> Result<f64, SketchError> {
        if self.is_empty() {
            Err(SketchError::EmptySketch)
        } else {
            Ok(self.min)
        }
    }

    /// Returns the exact maximum of all values added.
    ///
    /// # Errors
    ///
    /// If the sketch is empty, an error is returned.
    pub fn max(&self) -> Result<f64, SketchError> {
        if self.is_empty() {
            Err(SketchError::EmptySketch)
        } else {
            Ok(self.max)
        }
    }

    /// Returns the average of all values added.
    ///
    /// # Errors
    ///
    /// If the sketch is empty, an error is returned.
    pub fn avg(&self) -> Result<f64, SketchError> {
        if self.is_empty() {
            Err(SketchError::EmptySketch)
        } else {
            Ok(self.sum / self.count as f64)
        }
    }

    /// Returns the sum of all values added, or zero if the sketch is empty.
    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// Returns the total number of values added to the sketch.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Returns `true` if the sketch is empty.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Clears the sketch, removing all values.
    pub fn clear(&mut self) {
        self.positive_store.clear();
        self.negative_store.clear();
        self.zero_count = 0;
        self.count = 0;
        self.sum = 0.0;
        self.min = f64::INFINITY;
        self.max = f64::NEG_INFINITY;
    }

    /// Returns the configuration of this sketch.
    pub fn config(&self) -> &SketchConfig {
        &self.config
    }

    /// Returns a reference to the bucket mapping.
    pub fn mapping(&self) -> &BucketMapping {
        &self.mapping
    }

    /// Returns a reference to the positive value store.
    pub fn positive_store(&self) -> &BucketStore {
        &self.positive_store
    }

    /// Returns a reference to the negative value store.
    pub fn negative_store(&self) -> &BucketStore {
        &self.negative_store
    }

    /// Returns the count of values mapped to zero.
    pub fn zero_count(&self) -> u64 {
        self.zero_count
    }

    /// Returns the number of distinct buckets across both stores.
    pub fn num_buckets(&self) -> usize {
        self.positive_store.num_buckets() + self.negative_store.num_buckets()
    }

    /// Returns the relative accuracy of this sketch.
    pub fn relative_accuracy(&self) -> f64 {
        self.mapping.relative_accuracy()
    }
}

impl Default for DDSketch {
    fn default() -> Self {
        Self::new(SketchConfig::default())
    }
}

/// Adds `n` to bucket `index` of `target` while keeping `target` and `other` within `max_num_buckets` combined.
fn add_bounded(
    target: &mut BucketStore, other: &mut BucketStore, index: i32, n: u64, max_num_buckets: usize,
) -> Result<(), SketchError> {
    if !target.contains(index) && target.num_buckets() + other.num_buckets() >= max_num_buckets && target.is_empty() {
        // The target has nothing of its own to collapse, so room has to come from the other store. Its lowest buckets
        // are the ones closest to zero, just like they would be for the target.
        other.collapse_lowest();
    }

    let room = max_num_buckets.saturating_sub(other.num_buckets());
    target.incr_within(index, n, room)
}
