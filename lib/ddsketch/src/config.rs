//! Sketch configuration.

use serde::Deserialize;

use crate::error::SketchError;
use crate::mapping::BucketMapping;

/// Default relative accuracy: 1%.
pub const DEFAULT_RELATIVE_ACCURACY: f64 = 0.01;

/// Default cap on the number of buckets held across the positive and negative stores.
pub const DEFAULT_MAX_NUM_BUCKETS: usize = 2048;

/// Default smallest magnitude that is indexed rather than counted as zero.
pub const DEFAULT_MIN_INDEXABLE_VALUE: f64 = 1e-9;

#[derive(Deserialize)]
#[serde(default)]
struct RawSketchConfig {
    /// Target relative error of quantile estimates.
    ///
    /// Must be between 0.0 and 1.0, exclusive. Defaults to `0.01`.
    alpha: f64,

    /// Maximum number of distinct buckets held by a sketch, across positive and negative values.
    ///
    /// Once reached, the buckets closest to zero are collapsed together. Defaults to `2048`.
    max_num_buckets: usize,

    /// Values whose magnitude is below this are counted as zero.
    ///
    /// Defaults to `1e-9`.
    min_indexable_value: f64,
}

impl Default for RawSketchConfig {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_RELATIVE_ACCURACY,
            max_num_buckets: DEFAULT_MAX_NUM_BUCKETS,
            min_indexable_value: DEFAULT_MIN_INDEXABLE_VALUE,
        }
    }
}

impl TryFrom<RawSketchConfig> for SketchConfig {
    type Error = SketchError;

    fn try_from(raw: RawSketchConfig) -> Result<Self, Self::Error> {
        Self::new(raw.alpha, raw.max_num_buckets, raw.min_indexable_value)
    }
}

/// Immutable sketch configuration.
///
/// Two sketches can only be merged when their relative accuracy and minimum indexable value agree. The bucket limit
/// is allowed to differ: the destination's limit applies after a merge.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(try_from = "RawSketchConfig")]
pub struct SketchConfig {
    relative_accuracy: f64,
    max_num_buckets: usize,
    min_indexable_value: f64,
}

impl SketchConfig {
    /// Creates a new `SketchConfig`.
    ///
    /// # Errors
    ///
    /// If the relative accuracy is not between 0.0 and 1.0 (exclusive), if fewer than two buckets are allowed, or if
    /// the minimum indexable value is not finite or is below the smallest value the relative accuracy can index, an
    /// error is returned.
    pub fn new(relative_accuracy: f64, max_num_buckets: usize, min_indexable_value: f64) -> Result<Self, SketchError> {
        let mapping = BucketMapping::new(relative_accuracy)?;

        if max_num_buckets < 2 {
            return Err(SketchError::InvalidMaxNumBuckets { max_num_buckets });
        }

        // Very fine relative accuracies can only index a narrow band of magnitudes around 1.
        let smallest_indexable_value = mapping.min_indexable_value();
        if !(min_indexable_value.is_finite() && min_indexable_value >= smallest_indexable_value) {
            return Err(SketchError::InvalidMinIndexableValue {
                min_indexable_value,
                smallest_indexable_value,
            });
        }

        Ok(Self {
            relative_accuracy,
            max_num_buckets,
            min_indexable_value,
        })
    }

    /// Creates a new `SketchConfig` with the given relative accuracy, and defaults for everything else.
    ///
    /// # Errors
    ///
    /// If the relative accuracy is not between 0.0 and 1.0 (exclusive), an error is returned.
    pub fn with_relative_accuracy(relative_accuracy: f64) -> Result<Self, SketchError> {
        Self::new(relative_accuracy, DEFAULT_MAX_NUM_BUCKETS, DEFAULT_MIN_INDEXABLE_VALUE)
    }

    /// Returns the target relative error, `alpha`.
    pub fn relative_accuracy(&self) -> f64 {
        self.relative_accuracy
    }

    /// Returns the cap on distinct buckets across both stores.
    pub fn max_num_buckets(&self) -> usize {
        self.max_num_buckets
    }

    /// Returns the smallest magnitude that is mapped to a bucket.
    pub fn min_indexable_value(&self) -> f64 {
        self.min_indexable_value
    }

    /// Returns `true` if sketches built with `other` can be merged into sketches built with this configuration.
    pub fn is_compatible_with(&self, other: &SketchConfig) -> bool {
        crate::float_eq(self.relative_accuracy, other.relative_accuracy)
            && crate::float_eq(self.min_indexable_value, other.min_indexable_value)
    }
}

impl Default for SketchConfig {
    fn default() -> Self {
        Self {
            relative_accuracy: DEFAULT_RELATIVE_ACCURACY,
            max_num_buckets: DEFAULT_MAX_NUM_BUCKETS,
            min_indexable_value: DEFAULT_MIN_INDEXABLE_VALUE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SketchConfig::default();
        assert_eq!(config.relative_accuracy(), 0.01);
        assert_eq!(config.max_num_buckets(), 2048);
        assert_eq!(config.min_indexable_value(), 1e-9);
    }

    #[test]
    fn invalid_relative_accuracy() {
        for relative_accuracy in [0.0, 1.0, -0.5, 1.5, f64::NAN] {
            let result = SketchConfig::new(relative_accuracy, 2048, 1e-9);
            assert!(
                matches!(result, Err(SketchError::InvalidRelativeAccuracy { .. })),
                "accepted relative accuracy {}",
                relative_accuracy
            );
        }
    }

    #[test]
    fn invalid_max_num_buckets() {
        assert_eq!(
            SketchConfig::new(0.01, 1, 1e-9),
            Err(SketchError::InvalidMaxNumBuckets { max_num_buckets: 1 })
        );
        assert!(SketchConfig::new(0.01, 2, 1e-9).is_ok());
    }

    #[test]
    fn invalid_min_indexable_value() {
        for min_indexable_value in [0.0, -1.0, f64::INFINITY, f64::NAN] {
            let result = SketchConfig::new(0.01, 2048, min_indexable_value);
            assert!(matches!(result, Err(SketchError::InvalidMinIndexableValue { .. })));
        }
    }

    #[test]
    fn min_indexable_value_below_mapping_range() {
        // At this accuracy, indices only fit in an `i32` for magnitudes between roughly 0.014 and 73.
        let result = SketchConfig::new(1e-9, 2048, 1e-9);
        match result {
            Err(SketchError::InvalidMinIndexableValue {
                smallest_indexable_value,
                ..
            }) => assert!(smallest_indexable_value > 0.01 && smallest_indexable_value < 0.02),
            other => panic!("expected InvalidMinIndexableValue, got {:?}", other),
        }

        assert!(SketchConfig::new(1e-9, 2048, 0.1).is_ok());
        assert!(SketchConfig::new(1e-8, 2048, 1e-9).is_ok());
    }

    #[test]
    fn compatibility_ignores_bucket_limit() {
        let a = SketchConfig::new(0.01, 2048, 1e-9).unwrap();
        let b = SketchConfig::new(0.01, 64, 1e-9).unwrap();
        let c = SketchConfig::new(0.02, 2048, 1e-9).unwrap();
        let d = SketchConfig::new(0.01, 2048, 1e-6).unwrap();

        assert!(a.is_compatible_with(&b));
        assert!(!a.is_compatible_with(&c));
        assert!(!a.is_compatible_with(&d));
    }

    #[test]
    fn deserialize_with_defaults() {
        let config: SketchConfig = serde_yaml::from_str("alpha: 0.02").unwrap();
        assert_eq!(config.relative_accuracy(), 0.02);
        assert_eq!(config.max_num_buckets(), DEFAULT_MAX_NUM_BUCKETS);
        assert_eq!(config.min_indexable_value(), DEFAULT_MIN_INDEXABLE_VALUE);
    }

    #[test]
    fn deserialize_rejects_invalid() {
        let result = serde_yaml::from_str::<SketchConfig>("alpha: 1.5");
        assert!(result.is_err());
    }
}
